use chrono::{DateTime, Utc};

use super::{schema::*, types::ContentKind};

#[derive(Clone, Debug, Identifiable, Queryable)]
pub struct User {
    pub id: i32,
    pub email: String,
    pub name: String,
    pub password: Vec<u8>,
    pub salt: Vec<u8>,
    pub is_super: bool,
    pub permissions: i32,
}

#[derive(Clone, Copy, Debug, Insertable)]
#[table_name = "users"]
pub struct NewUser<'a> {
    pub email: &'a str,
    pub name: &'a str,
    pub password: &'a [u8],
    pub salt: &'a [u8],
    pub is_super: bool,
    pub permissions: i32,
}

#[derive(Clone, Copy, Debug, Identifiable, Queryable)]
pub struct Session {
    pub id: i32,
    pub user: i32,
    pub expires: DateTime<Utc>,
    pub last_used: DateTime<Utc>,
    pub permissions: i32,
}

#[derive(Clone, Copy, Debug, Insertable)]
#[table_name = "sessions"]
pub struct NewSession {
    pub user: i32,
    pub expires: DateTime<Utc>,
    pub last_used: DateTime<Utc>,
    pub permissions: i32,
}

#[derive(Clone, Debug, Identifiable, Queryable)]
pub struct Subject {
    pub id: i32,
    pub title: String,
    pub slug: String,
}

#[derive(Clone, Copy, Debug, Insertable)]
#[table_name = "subjects"]
pub struct NewSubject<'a> {
    pub title: &'a str,
    pub slug: &'a str,
}

#[derive(Clone, Debug, Identifiable, Queryable)]
pub struct Course {
    pub id: i32,
    pub owner: i32,
    pub subject: i32,
    pub title: String,
    pub slug: String,
    pub overview: String,
    pub created: DateTime<Utc>,
}

#[derive(Clone, Copy, Debug, Insertable)]
#[table_name = "courses"]
pub struct NewCourse<'a> {
    pub owner: i32,
    pub subject: i32,
    pub title: &'a str,
    pub slug: &'a str,
    pub overview: &'a str,
}

#[derive(AsChangeset, Clone, Copy, Debug, Default)]
#[table_name = "courses"]
pub struct CourseChanges<'a> {
    pub subject: Option<i32>,
    pub title: Option<&'a str>,
    pub slug: Option<&'a str>,
    pub overview: Option<&'a str>,
}

#[derive(Clone, Debug, Identifiable, Queryable)]
pub struct Module {
    pub id: i32,
    pub course: i32,
    pub title: String,
    pub description: String,
    pub order: i32,
}

/// A module which has not been persisted yet.
///
/// `order` is `None` until assigned, see [`crate::ordering`].
#[derive(Clone, Debug, Insertable)]
#[table_name = "modules"]
pub struct NewModule {
    pub course: i32,
    pub title: String,
    pub description: String,
    pub order: Option<i32>,
}

#[derive(AsChangeset, Clone, Copy, Debug, Default)]
#[table_name = "modules"]
pub struct ModuleChanges<'a> {
    pub title: Option<&'a str>,
    pub description: Option<&'a str>,
}

#[derive(Clone, Copy, Debug, Identifiable, Queryable)]
#[table_name = "contents"]
pub struct Content {
    pub id: i32,
    pub module: i32,
    pub kind: ContentKind,
    pub item: i32,
    pub order: i32,
}

/// A content container which has not been persisted yet.
#[derive(Clone, Copy, Debug, Insertable)]
#[table_name = "contents"]
pub struct NewContent {
    pub module: i32,
    pub kind: ContentKind,
    pub item: i32,
    pub order: Option<i32>,
}

#[derive(Clone, Debug, Identifiable, Queryable)]
pub struct File {
    pub id: i32,
    pub mime: String,
    pub path: String,
    pub hash: Vec<u8>,
}

#[derive(Clone, Copy, Debug, Insertable)]
#[table_name = "files"]
pub struct NewFile<'a> {
    pub mime: &'a str,
    pub path: &'a str,
    pub hash: &'a [u8],
}

#[derive(Clone, Debug, Identifiable, Queryable)]
pub struct TextItem {
    pub id: i32,
    pub owner: i32,
    pub title: String,
    pub created: DateTime<Utc>,
    pub updated: DateTime<Utc>,
    pub content: String,
}

#[derive(Clone, Copy, Debug, Insertable)]
#[table_name = "text_items"]
pub struct NewTextItem<'a> {
    pub owner: i32,
    pub title: &'a str,
    pub content: &'a str,
}

#[derive(Clone, Debug, Identifiable, Queryable)]
pub struct FileItem {
    pub id: i32,
    pub owner: i32,
    pub title: String,
    pub created: DateTime<Utc>,
    pub updated: DateTime<Utc>,
    pub file: i32,
}

#[derive(Clone, Copy, Debug, Insertable)]
#[table_name = "file_items"]
pub struct NewFileItem<'a> {
    pub owner: i32,
    pub title: &'a str,
    pub file: i32,
}

#[derive(Clone, Debug, Identifiable, Queryable)]
pub struct ImageItem {
    pub id: i32,
    pub owner: i32,
    pub title: String,
    pub created: DateTime<Utc>,
    pub updated: DateTime<Utc>,
    pub file: i32,
}

#[derive(Clone, Copy, Debug, Insertable)]
#[table_name = "image_items"]
pub struct NewImageItem<'a> {
    pub owner: i32,
    pub title: &'a str,
    pub file: i32,
}

#[derive(Clone, Debug, Identifiable, Queryable)]
pub struct VideoItem {
    pub id: i32,
    pub owner: i32,
    pub title: String,
    pub created: DateTime<Utc>,
    pub updated: DateTime<Utc>,
    pub url: String,
}

#[derive(Clone, Copy, Debug, Insertable)]
#[table_name = "video_items"]
pub struct NewVideoItem<'a> {
    pub owner: i32,
    pub title: &'a str,
    pub url: &'a str,
}
