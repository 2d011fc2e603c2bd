use serde::de::{Deserialize, IntoDeserializer, value::Error as ValueError};
use std::fmt;
use syllabus_models::PermissionBits;
use termion::style::{Underline, Reset};
use unicode_width::{UnicodeWidthChar, UnicodeWidthStr};

/// Parse a comma-separated list of permission names, such as
/// `course:view,course:add`.
pub fn parse_permissions(v: &str) -> Result<PermissionBits, ValueError> {
    let mut permissions = PermissionBits::empty();

    let iter = v.split(',')
        .map(str::trim)
        .filter(|name| !name.is_empty())
        .map(<&str as IntoDeserializer<ValueError>>::into_deserializer)
        .map(PermissionBits::deserialize);

    for permission in iter {
        permissions.insert(permission?);
    }

    Ok(permissions)
}

/// Print rows of data as a table fitting in the terminal.
///
/// When the table is too wide the last column is truncated.
pub fn print_table<H, T, R>(header: H, rows: T)
where
    H: TableRow,
    T: AsRef<[R]>,
    R: TableRow<Size = H::Size>,
{
    let (terminal_width, _) = termion::terminal_size().unwrap_or((80, 20));
    let widths = column_widths(&header, rows.as_ref(), usize::from(terminal_width));

    for (inx, width) in widths.iter().enumerate() {
        if inx > 0 {
            print!(" ");
        }
        print!("{}{}{}",
            Underline, Column(header.column(inx), *width), Reset);
    }
    println!();

    for row in rows.as_ref() {
        for (inx, width) in widths.iter().enumerate() {
            if inx > 0 {
                print!(" ");
            }
            print!("{}", Column(row.column(inx), *width));
        }
        println!();
    }
}

/// Compute widths of all columns, shrinking the last one to fit in
/// `max_width`.
fn column_widths<H, R>(header: &H, rows: &[R], max_width: usize) -> Vec<usize>
where
    H: TableRow,
    R: TableRow<Size = H::Size>,
{
    let mut widths = (0..H::size())
        .map(|inx| UnicodeWidthStr::width(header.column(inx)))
        .collect::<Vec<_>>();

    for row in rows {
        for (inx, width) in widths.iter_mut().enumerate() {
            *width = (*width).max(UnicodeWidthStr::width(row.column(inx)));
        }
    }

    // Sum of all longest widths and spaces separating them.
    let total_width = widths.iter().sum::<usize>() + widths.len().saturating_sub(1);

    if total_width > max_width {
        let overflow = total_width - max_width;
        if let Some(last) = widths.last_mut() {
            *last = last.saturating_sub(overflow).max(1);
        }
    }

    widths
}

pub trait TableRow {
    type Size;

    fn size() -> usize;

    fn column(&self, index: usize) -> &str;
}

macro_rules! impl_table_row {
    {
        $(
            $sizeconst:literal $size:ident => $($inx:tt : $ty:ident),+
        );+
        $(;)*
    } => {
        $(
            pub struct $size;

            impl<$($ty),+> TableRow for ($($ty,)+)
            where
                $($ty: AsRef<str>),+
            {
                type Size = $size;

                fn size() -> usize { $sizeconst }

                fn column(&self, index: usize) -> &str {
                    match index {
                        $($inx => self.$inx.as_ref(),)+
                        _ => "",
                    }
                }
            }
        )+
    };
}

impl_table_row! {
    2 Two   => 0: A, 1: B;
    3 Three => 0: A, 1: B, 2: C;
    4 Four  => 0: A, 1: B, 2: C, 3: D;
}

/// A single cell, padded or truncated to a width.
struct Column<'a>(&'a str, usize);

impl<'a> fmt::Display for Column<'a> {
    fn fmt(&self, fmt: &mut fmt::Formatter) -> fmt::Result {
        let (len, end) = self.0.char_indices()
            .scan(0, |total_len, (inx, chr)| {
                *total_len += UnicodeWidthChar::width(chr).unwrap_or(0);
                if *total_len > self.1 {
                    None
                } else {
                    Some((*total_len, inx + chr.len_utf8()))
                }
            })
            .last()
            .unwrap_or((0, 0));

        let pad = self.1.saturating_sub(len);

        write!(fmt, "{0}{1:2$}", &self.0[..end], "", pad)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parse_permission_list() {
        assert_eq!(
            parse_permissions("course:view, course:add").unwrap(),
            PermissionBits::VIEW_COURSE | PermissionBits::ADD_COURSE,
        );
        assert_eq!(parse_permissions("").unwrap(), PermissionBits::empty());
        assert!(parse_permissions("course:view,course:fly").is_err());
    }

    #[test]
    fn columns_fit_longest_cell() {
        let rows = vec![("1", "Ada"), ("22", "Grace Hopper")];
        assert_eq!(column_widths(&("ID", "Name"), &rows, 80), vec![2, 12]);
    }

    #[test]
    fn last_column_is_truncated() {
        let rows = vec![("1", "A very long course title")];
        assert_eq!(column_widths(&("ID", "Title"), &rows, 10), vec![2, 7]);
    }

    #[test]
    fn cells_are_padded_and_truncated() {
        assert_eq!(Column("abc", 5).to_string(), "abc  ");
        assert_eq!(Column("abcdef", 4).to_string(), "abcd");
    }
}
