use diesel_derive_enum::DbEnum;
use failure::Fail;
use serde::{Deserialize, Serialize};
use std::{fmt, str::FromStr};
use syllabus_error::ApiError;

/// Kind of a content item.
///
/// This is a closed set: each kind has its own table of items, and
/// [`crate::ItemRef`] resolves an item by matching on its kind.
#[derive(Clone, Copy, DbEnum, Debug, Deserialize, Eq, Hash, PartialEq, Serialize)]
#[DieselType = "Content_kind"]
#[serde(rename_all = "lowercase")]
pub enum ContentKind {
    Text,
    File,
    Image,
    Video,
}

impl ContentKind {
    /// All content kinds.
    pub const ALL: [ContentKind; 4] = [
        ContentKind::Text,
        ContentKind::File,
        ContentKind::Image,
        ContentKind::Video,
    ];

    pub fn as_str(self) -> &'static str {
        match self {
            ContentKind::Text => "text",
            ContentKind::File => "file",
            ContentKind::Image => "image",
            ContentKind::Video => "video",
        }
    }

    /// Are items of this kind backed by an uploaded file?
    pub fn is_upload(self) -> bool {
        match self {
            ContentKind::File | ContentKind::Image => true,
            ContentKind::Text | ContentKind::Video => false,
        }
    }
}

impl fmt::Display for ContentKind {
    fn fmt(&self, fmt: &mut fmt::Formatter) -> fmt::Result {
        fmt.write_str(self.as_str())
    }
}

impl FromStr for ContentKind {
    type Err = UnknownContentKind;

    fn from_str(v: &str) -> Result<Self, Self::Err> {
        ContentKind::ALL.iter()
            .cloned()
            .find(|kind| kind.as_str() == v)
            .ok_or_else(|| UnknownContentKind(v.to_string()))
    }
}

/// Error returned when parsing a [`ContentKind`] from an unknown name.
#[derive(ApiError, Clone, Debug, Eq, Fail, PartialEq)]
#[api(code = "content:kind:unknown", status = "NOT_FOUND")]
#[fail(display = "Unknown content kind: {}", _0)]
pub struct UnknownContentKind(pub String);

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn kinds_parse_from_their_names() {
        for &kind in ContentKind::ALL.iter() {
            assert_eq!(kind.as_str().parse::<ContentKind>(), Ok(kind));
            assert_eq!(kind.to_string(), kind.as_str());
        }
    }

    #[test]
    fn unknown_kinds_are_rejected() {
        assert_eq!(
            "audio".parse::<ContentKind>(),
            Err(UnknownContentKind("audio".to_string())),
        );
        assert!("Text".parse::<ContentKind>().is_err());
    }

    #[test]
    fn unknown_kind_is_not_found() {
        let err = UnknownContentKind("audio".to_string());
        assert_eq!(err.status(), syllabus_error::StatusCode::NOT_FOUND);
        assert_eq!(err.code().as_ref().map(|c| &**c), Some("content:kind:unknown"));
    }

    #[test]
    fn kinds_serialize_lowercase() {
        assert_eq!(serde_json::to_string(&ContentKind::Image).unwrap(), "\"image\"");
        assert_eq!(
            serde_json::from_str::<ContentKind>("\"video\"").unwrap(),
            ContentKind::Video,
        );
    }

    #[test]
    fn only_files_and_images_are_uploads() {
        assert!(ContentKind::File.is_upload());
        assert!(ContentKind::Image.is_upload());
        assert!(!ContentKind::Text.is_upload());
        assert!(!ContentKind::Video.is_upload());
    }
}
