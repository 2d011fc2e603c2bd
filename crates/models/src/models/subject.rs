use diesel::{prelude::*, result::{DatabaseErrorKind, Error as DbError}};
use failure::Fail;
use serde::Serialize;
use syllabus_error::ApiError;
use syllabus_util::is_slug;

use crate::db::{Connection, models as db, schema::subjects};
use super::{FindModelResult, Model};

/// A subject groups courses of a single field of study.
#[derive(Debug)]
pub struct Subject {
    data: db::Subject,
}

#[derive(Debug, Serialize)]
pub struct Public {
    id: i32,
    title: String,
    slug: String,
}

impl Model for Subject {
    const ERROR_CATEGORY: &'static str = "subject";

    type Id = i32;
    type Database = db::Subject;
    type Public = Public;

    fn by_id(db: &Connection, id: i32) -> FindModelResult<Self> {
        subjects::table
            .filter(subjects::id.eq(id))
            .get_result::<db::Subject>(db)
            .map(Self::from_db)
            .map_err(From::from)
    }

    fn from_db(data: db::Subject) -> Self {
        Subject { data }
    }

    fn into_db(self) -> db::Subject {
        self.data
    }

    fn id(&self) -> i32 {
        self.data.id
    }

    fn get_public(&self) -> Public {
        Public {
            id: self.data.id,
            title: self.data.title.clone(),
            slug: self.data.slug.clone(),
        }
    }
}

impl Subject {
    /// Get all subjects, ordered by title.
    pub fn all(db: &Connection) -> Result<Vec<Subject>, DbError> {
        subjects::table
            .order_by(subjects::title)
            .get_results::<db::Subject>(db)
            .map(|v| v.into_iter().map(Self::from_db).collect())
    }

    pub fn by_slug(db: &Connection, slug: &str) -> FindModelResult<Subject> {
        subjects::table
            .filter(subjects::slug.eq(slug))
            .get_result::<db::Subject>(db)
            .map(Self::from_db)
            .map_err(From::from)
    }

    /// Create a new subject.
    pub fn create(db: &Connection, title: &str, slug: &str)
    -> Result<Subject, CreateSubjectError> {
        if title.trim().is_empty() {
            return Err(CreateSubjectError::EmptyTitle);
        }

        if !is_slug(slug) {
            return Err(CreateSubjectError::InvalidSlug);
        }

        let data = diesel::insert_into(subjects::table)
            .values(db::NewSubject { title, slug })
            .get_result::<db::Subject>(db)?;

        Ok(Subject { data })
    }
}

impl std::ops::Deref for Subject {
    type Target = db::Subject;

    fn deref(&self) -> &db::Subject {
        &self.data
    }
}

#[derive(ApiError, Debug, Fail)]
pub enum CreateSubjectError {
    #[fail(display = "Database error: {}", _0)]
    #[api(internal)]
    Database(#[cause] DbError),
    #[fail(display = "Subject's title cannot be empty")]
    #[api(code = "subject:create:empty-title", status = "BAD_REQUEST")]
    EmptyTitle,
    #[fail(display = "Slug may only contain lowercase letters, digits, \
        hyphens, and underscores")]
    #[api(code = "subject:create:invalid-slug", status = "BAD_REQUEST")]
    InvalidSlug,
    #[fail(display = "Slug is already used by another subject")]
    #[api(code = "subject:create:slug-taken", status = "BAD_REQUEST")]
    SlugTaken,
}

impl From<DbError> for CreateSubjectError {
    fn from(e: DbError) -> Self {
        match e {
            DbError::DatabaseError(DatabaseErrorKind::UniqueViolation, _)
                => CreateSubjectError::SlugTaken,
            _ => CreateSubjectError::Database(e),
        }
    }
}
