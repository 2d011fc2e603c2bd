//! Content items of all kinds.
//!
//! The set of kinds is closed (see [`ContentKind`]). Each kind is kept in its
//! own table and carries the same [`ItemBase`] attributes, followed by
//! attributes specific to the kind. Items are referenced by [`ItemRef`],
//! which is resolved by an explicit lookup in the table of its kind.

use chrono::{DateTime, Utc};
use diesel::{prelude::*, result::Error as DbError};
use failure::Fail;
use serde::{Deserialize, Serialize};
use std::path::Path;
use syllabus_error::ApiError;
use syllabus_macros::From;

use crate::db::{
    Connection,
    models as db,
    schema::{file_items, files, image_items, text_items, video_items},
    types::ContentKind,
};
use super::{File, Model, file::CreateFileError};

/// Attributes shared by items of all kinds.
#[derive(Clone, Debug, Serialize)]
pub struct ItemBase {
    /// User who created this item.
    pub owner: i32,
    pub title: String,
    pub created: DateTime<Utc>,
    pub updated: DateTime<Utc>,
}

/// A text item.
#[derive(Debug)]
pub struct Text {
    pub id: i32,
    pub base: ItemBase,
    pub content: String,
}

/// An uploaded file of any type.
#[derive(Debug)]
pub struct FileItem {
    pub id: i32,
    pub base: ItemBase,
    pub file: File,
}

/// An uploaded image.
#[derive(Debug)]
pub struct Image {
    pub id: i32,
    pub base: ItemBase,
    pub file: File,
}

/// A video, hosted elsewhere and referenced by its URL.
#[derive(Debug)]
pub struct Video {
    pub id: i32,
    pub base: ItemBase,
    pub url: String,
}

/// An item of any kind.
#[derive(Debug)]
pub enum Item {
    Text(Text),
    File(FileItem),
    Image(Image),
    Video(Video),
}

/// Reference to an item of a specific kind.
#[derive(Clone, Copy, Debug, Eq, Hash, PartialEq)]
pub enum ItemRef {
    Text(i32),
    File(i32),
    Image(i32),
    Video(i32),
}

/// Publicly visible representation of an item.
#[derive(Debug, Serialize)]
pub struct Public {
    #[serde(flatten)]
    base: ItemBase,
    #[serde(flatten)]
    data: KindPublic,
}

#[derive(Debug, Serialize)]
#[serde(untagged)]
enum KindPublic {
    Text {
        content: String,
    },
    Upload {
        file: <File as Model>::Public,
    },
    Video {
        url: String,
    },
}

impl ItemBase {
    fn new(owner: i32, title: String, created: DateTime<Utc>, updated: DateTime<Utc>)
    -> Self {
        ItemBase { owner, title, created, updated }
    }
}

impl Item {
    pub fn kind(&self) -> ContentKind {
        self.reference().kind()
    }

    /// Get a reference to this item.
    pub fn reference(&self) -> ItemRef {
        match *self {
            Item::Text(ref item) => ItemRef::Text(item.id),
            Item::File(ref item) => ItemRef::File(item.id),
            Item::Image(ref item) => ItemRef::Image(item.id),
            Item::Video(ref item) => ItemRef::Video(item.id),
        }
    }

    pub fn base(&self) -> &ItemBase {
        match *self {
            Item::Text(ref item) => &item.base,
            Item::File(ref item) => &item.base,
            Item::Image(ref item) => &item.base,
            Item::Video(ref item) => &item.base,
        }
    }

    pub fn get_public(&self) -> Public {
        let data = match *self {
            Item::Text(ref item) => KindPublic::Text {
                content: item.content.clone(),
            },
            Item::File(FileItem { ref file, .. })
            | Item::Image(Image { ref file, .. }) => KindPublic::Upload {
                file: file.get_public(),
            },
            Item::Video(ref item) => KindPublic::Video {
                url: item.url.clone(),
            },
        };

        Public {
            base: self.base().clone(),
            data,
        }
    }

    /// Update this item.
    ///
    /// Only the title and attributes specific to this item's kind can be
    /// changed. Uploaded files can't be replaced.
    pub fn update(&mut self, db: &Connection, changes: &ItemChanges)
    -> Result<(), UpdateItemError> {
        changes.check_fields(self.kind())?;

        if let Some(ref title) = changes.title {
            validate_title(title)?;
        }
        if let Some(ref url) = changes.url {
            validate_video_url(url)?;
        }

        let now = Utc::now();

        match *self {
            Item::Text(ref mut item) => {
                let title = changes.title.as_ref()
                    .map(String::as_str)
                    .unwrap_or(&item.base.title);
                let content = changes.content.as_ref()
                    .map(String::as_str)
                    .unwrap_or(&item.content);

                let data = diesel::update(text_items::table.find(item.id))
                    .set((
                        text_items::title.eq(title),
                        text_items::content.eq(content),
                        text_items::updated.eq(now),
                    ))
                    .get_result::<db::TextItem>(db)?;
                *item = text_from_db(data);
            }
            Item::File(ref mut item) => {
                let title = changes.title.as_ref()
                    .map(String::as_str)
                    .unwrap_or(&item.base.title);

                let data = diesel::update(file_items::table.find(item.id))
                    .set((file_items::title.eq(title), file_items::updated.eq(now)))
                    .get_result::<db::FileItem>(db)?;
                item.base = ItemBase::new(data.owner, data.title, data.created, data.updated);
            }
            Item::Image(ref mut item) => {
                let title = changes.title.as_ref()
                    .map(String::as_str)
                    .unwrap_or(&item.base.title);

                let data = diesel::update(image_items::table.find(item.id))
                    .set((image_items::title.eq(title), image_items::updated.eq(now)))
                    .get_result::<db::ImageItem>(db)?;
                item.base = ItemBase::new(data.owner, data.title, data.created, data.updated);
            }
            Item::Video(ref mut item) => {
                let title = changes.title.as_ref()
                    .map(String::as_str)
                    .unwrap_or(&item.base.title);
                let url = changes.url.as_ref()
                    .map(String::as_str)
                    .unwrap_or(&item.url);

                let data = diesel::update(video_items::table.find(item.id))
                    .set((
                        video_items::title.eq(title),
                        video_items::url.eq(url),
                        video_items::updated.eq(now),
                    ))
                    .get_result::<db::VideoItem>(db)?;
                *item = video_from_db(data);
            }
        }

        Ok(())
    }
}

impl ItemRef {
    /// Construct a reference from its stored parts.
    pub fn from_parts(kind: ContentKind, id: i32) -> ItemRef {
        match kind {
            ContentKind::Text => ItemRef::Text(id),
            ContentKind::File => ItemRef::File(id),
            ContentKind::Image => ItemRef::Image(id),
            ContentKind::Video => ItemRef::Video(id),
        }
    }

    pub fn kind(self) -> ContentKind {
        match self {
            ItemRef::Text(_) => ContentKind::Text,
            ItemRef::File(_) => ContentKind::File,
            ItemRef::Image(_) => ContentKind::Image,
            ItemRef::Video(_) => ContentKind::Video,
        }
    }

    pub fn id(self) -> i32 {
        match self {
            ItemRef::Text(id)
            | ItemRef::File(id)
            | ItemRef::Image(id)
            | ItemRef::Video(id) => id,
        }
    }

    /// Load referenced item.
    pub fn load(self, db: &Connection) -> Result<Item, DbError> {
        Ok(match self {
            ItemRef::Text(id) => Item::Text(text_from_db(
                text_items::table
                    .filter(text_items::id.eq(id))
                    .get_result(db)?)),
            ItemRef::File(id) => {
                let (data, file) = file_items::table
                    .filter(file_items::id.eq(id))
                    .inner_join(files::table)
                    .get_result::<(db::FileItem, db::File)>(db)?;

                Item::File(FileItem {
                    id: data.id,
                    base: ItemBase::new(data.owner, data.title, data.created, data.updated),
                    file: File::from_db(file),
                })
            }
            ItemRef::Image(id) => {
                let (data, file) = image_items::table
                    .filter(image_items::id.eq(id))
                    .inner_join(files::table)
                    .get_result::<(db::ImageItem, db::File)>(db)?;

                Item::Image(Image {
                    id: data.id,
                    base: ItemBase::new(data.owner, data.title, data.created, data.updated),
                    file: File::from_db(file),
                })
            }
            ItemRef::Video(id) => Item::Video(video_from_db(
                video_items::table
                    .filter(video_items::id.eq(id))
                    .get_result(db)?)),
        })
    }

    /// Delete referenced item.
    ///
    /// Stored files are kept, as they may be shared with other items.
    pub fn delete(self, db: &Connection) -> Result<(), DbError> {
        match self {
            ItemRef::Text(id) => diesel::delete(
                text_items::table.filter(text_items::id.eq(id))).execute(db)?,
            ItemRef::File(id) => diesel::delete(
                file_items::table.filter(file_items::id.eq(id))).execute(db)?,
            ItemRef::Image(id) => diesel::delete(
                image_items::table.filter(image_items::id.eq(id))).execute(db)?,
            ItemRef::Video(id) => diesel::delete(
                video_items::table.filter(video_items::id.eq(id))).execute(db)?,
        };

        Ok(())
    }
}

fn text_from_db(data: db::TextItem) -> Text {
    Text {
        id: data.id,
        base: ItemBase::new(data.owner, data.title, data.created, data.updated),
        content: data.content,
    }
}

fn video_from_db(data: db::VideoItem) -> Video {
    Video {
        id: data.id,
        base: ItemBase::new(data.owner, data.title, data.created, data.updated),
        url: data.url,
    }
}

/// An uploaded file, not yet stored.
#[derive(Clone, Copy, Debug)]
pub struct Upload<'a> {
    /// Directory in which files are stored.
    pub storage: &'a Path,
    pub data: &'a [u8],
    /// MIME type given by the uploader.
    pub mime: &'a str,
}

/// Data for a new item.
#[derive(Clone, Copy, Debug)]
pub enum NewItem<'a> {
    Text {
        title: &'a str,
        content: &'a str,
    },
    File {
        title: &'a str,
        upload: Upload<'a>,
    },
    Image {
        title: &'a str,
        upload: Upload<'a>,
    },
    Video {
        title: &'a str,
        url: &'a str,
    },
}

impl<'a> NewItem<'a> {
    pub fn kind(&self) -> ContentKind {
        match *self {
            NewItem::Text { .. } => ContentKind::Text,
            NewItem::File { .. } => ContentKind::File,
            NewItem::Image { .. } => ContentKind::Image,
            NewItem::Video { .. } => ContentKind::Video,
        }
    }

    /// Verify that this item can be created.
    pub fn validate(&self) -> Result<(), InvalidItem> {
        match *self {
            NewItem::Text { title, .. } | NewItem::File { title, .. } =>
                validate_title(title),
            NewItem::Image { title, upload } => {
                validate_title(title)?;
                validate_image_mime(upload.mime)
            }
            NewItem::Video { title, url } => {
                validate_title(title)?;
                validate_video_url(url)
            }
        }
    }

    /// Create this item, owned by `owner`.
    ///
    /// Uploaded files are stored only after the item was validated. This
    /// should be called within a transaction, so that a file is not left
    /// behind when a later step fails.
    pub(crate) fn insert(&self, db: &Connection, owner: i32)
    -> Result<ItemRef, CreateItemError> {
        self.validate()?;

        Ok(match *self {
            NewItem::Text { title, content } => ItemRef::Text(
                diesel::insert_into(text_items::table)
                    .values(db::NewTextItem { owner, title, content })
                    .returning(text_items::id)
                    .get_result(db)?),
            NewItem::File { title, upload } => {
                let file = upload.store(db)?;
                ItemRef::File(diesel::insert_into(file_items::table)
                    .values(db::NewFileItem { owner, title, file: file.id() })
                    .returning(file_items::id)
                    .get_result(db)?)
            }
            NewItem::Image { title, upload } => {
                let file = upload.store(db)?;
                ItemRef::Image(diesel::insert_into(image_items::table)
                    .values(db::NewImageItem { owner, title, file: file.id() })
                    .returning(image_items::id)
                    .get_result(db)?)
            }
            NewItem::Video { title, url } => ItemRef::Video(
                diesel::insert_into(video_items::table)
                    .values(db::NewVideoItem { owner, title, url })
                    .returning(video_items::id)
                    .get_result(db)?),
        })
    }
}

impl<'a> Upload<'a> {
    fn store(&self, db: &Connection) -> Result<File, CreateFileError> {
        File::from_data(db, self.storage, self.data, self.mime)
    }
}

/// Changes to an existing item.
#[derive(Clone, Debug, Default, Deserialize)]
pub struct ItemChanges {
    pub title: Option<String>,
    /// New content of a text item.
    pub content: Option<String>,
    /// New URL of a video item.
    pub url: Option<String>,
}

impl ItemChanges {
    /// Verify that these changes only touch fields of an item of `kind`.
    fn check_fields(&self, kind: ContentKind) -> Result<(), UpdateItemError> {
        if self.content.is_some() && kind != ContentKind::Text {
            return Err(UpdateItemError::UnexpectedField("content"));
        }

        if self.url.is_some() && kind != ContentKind::Video {
            return Err(UpdateItemError::UnexpectedField("url"));
        }

        Ok(())
    }
}

pub fn validate_title(title: &str) -> Result<(), InvalidItem> {
    if title.trim().is_empty() {
        Err(InvalidItem::EmptyTitle)
    } else {
        Ok(())
    }
}

/// Verify that a MIME type names an image.
pub fn validate_image_mime(value: &str) -> Result<(), InvalidItem> {
    match value.parse::<mime::Mime>() {
        Ok(ref parsed) if parsed.type_() == mime::IMAGE => Ok(()),
        _ => Err(InvalidItem::NotAnImage(value.to_string())),
    }
}

/// Verify that a video URL is an absolute HTTP(S) URL.
pub fn validate_video_url(url: &str) -> Result<(), InvalidItem> {
    match url::Url::parse(url) {
        Ok(ref parsed)
            if (parsed.scheme() == "http" || parsed.scheme() == "https")
                && parsed.host().is_some() => Ok(()),
        _ => Err(InvalidItem::BadUrl(url.to_string())),
    }
}

#[derive(ApiError, Debug, Fail)]
pub enum InvalidItem {
    #[fail(display = "Item's title cannot be empty")]
    #[api(code = "content:invalid:empty-title", status = "BAD_REQUEST")]
    EmptyTitle,
    #[fail(display = "{} is not an image type", _0)]
    #[api(code = "content:invalid:not-an-image", status = "BAD_REQUEST")]
    NotAnImage(String),
    #[fail(display = "{} is not an absolute HTTP(S) URL", _0)]
    #[api(code = "content:invalid:bad-url", status = "BAD_REQUEST")]
    BadUrl(String),
}

#[derive(ApiError, Debug, Fail, From)]
pub enum CreateItemError {
    #[fail(display = "Database error: {}", _0)]
    #[api(internal)]
    Database(#[cause] #[from] DbError),
    #[fail(display = "{}", _0)]
    Invalid(#[cause] #[from] InvalidItem),
    #[fail(display = "{}", _0)]
    File(#[cause] #[from] CreateFileError),
}

#[derive(ApiError, Debug, Fail, From)]
pub enum UpdateItemError {
    #[fail(display = "Database error: {}", _0)]
    #[api(internal)]
    Database(#[cause] #[from] DbError),
    #[fail(display = "{}", _0)]
    Invalid(#[cause] #[from] InvalidItem),
    #[fail(display = "Field {} can't be changed for this kind of item", _0)]
    #[api(code = "content:update:unexpected-field", status = "BAD_REQUEST")]
    UnexpectedField(&'static str),
}
