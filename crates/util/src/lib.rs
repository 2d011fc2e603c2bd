mod secure;
mod single_init;

pub use self::{
    secure::*,
    single_init::SingleInit,
};

/// Format a byte array as a hexadecimal string.
pub fn bytes_to_hex(bytes: &[u8]) -> String {
    use std::fmt::Write;

    let mut hex = String::with_capacity(bytes.len() * 2);

    for byte in bytes {
        // Writing into a String can't fail.
        let _ = write!(hex, "{:02x}", byte);
    }

    hex
}

/// Check that a string is usable as a slug: a non-empty sequence of lowercase
/// ASCII letters, digits, hyphens, and underscores.
pub fn is_slug(value: &str) -> bool {
    !value.is_empty() && value.bytes().all(|b| match b {
        b'a'..=b'z' | b'0'..=b'9' | b'-' | b'_' => true,
        _ => false,
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn hex_is_lowercase_and_padded() {
        assert_eq!(bytes_to_hex(&[0x00, 0x0f, 0xab]), "000fab");
        assert_eq!(bytes_to_hex(&[]), "");
    }

    #[test]
    fn slugs() {
        assert!(is_slug("rust-101"));
        assert!(is_slug("intro_to_compilers"));
        assert!(!is_slug(""));
        assert!(!is_slug("Has Spaces"));
        assert!(!is_slug("UPPER"));
        assert!(!is_slug("zażółć"));
    }
}
