//! Data and behaviours modelled as objects.

use diesel::result::Error as DbError;
use failure::Fail;
use serde::Serialize;
use std::{borrow::Cow, fmt, marker::PhantomData};
use syllabus_error::{ApiError, StatusCode};

use crate::db::Connection;

pub mod content;
pub mod course;
pub mod file;
pub mod item;
pub mod module;
pub mod subject;
pub mod user;

pub use self::{
    content::Content,
    course::Course,
    file::File,
    item::{Item, ItemBase, ItemRef},
    module::Module,
    subject::Subject,
    user::User,
};

/// Abstract interface over database models.
pub trait Model: Sized {
    /// Category of errors concerning this model, used to construct error
    /// codes such as `course:not-found`.
    const ERROR_CATEGORY: &'static str;

    type Id;

    /// Type of database rows backing this model.
    type Database;

    /// Type of the publicly visible representation of this model.
    type Public: Serialize;

    /// Find a model by its ID.
    fn by_id(db: &Connection, id: Self::Id) -> FindModelResult<Self>;

    /// Construct this model from a database row.
    fn from_db(data: Self::Database) -> Self;

    /// Unpack this model into a database row.
    fn into_db(self) -> Self::Database;

    fn id(&self) -> Self::Id;

    /// Get publicly visible representation of this model.
    fn get_public(&self) -> Self::Public;
}

/// A model owned, directly or through its parent, by a user.
pub trait Owned: Model {
    /// Find a model by its ID, but only if it is owned by `owner`.
    ///
    /// A model owned by someone else is reported as not found.
    fn by_id_owned(db: &Connection, id: Self::Id, owner: i32)
    -> FindModelResult<Self>;
}

pub type FindModelResult<T> = Result<T, FindModelError<T>>;

/// Error returned when looking up a model.
pub enum FindModelError<M> {
    /// Database error.
    Database(PhantomData<fn() -> M>, DbError),
    /// No model found for a given ID.
    NotFound(PhantomData<fn() -> M>),
}

impl<M> FindModelError<M> {
    pub fn not_found() -> Self {
        FindModelError::NotFound(PhantomData)
    }

    /// Turn this error into a database error, treating a missing model as
    /// [`DbError::NotFound`].
    ///
    /// Use this when the model is known to exist, for example because it is
    /// referenced by a foreign key.
    pub fn assert_exists(self) -> DbError {
        match self {
            FindModelError::Database(_, err) => err,
            FindModelError::NotFound(_) => DbError::NotFound,
        }
    }
}

impl<M> From<DbError> for FindModelError<M> {
    fn from(err: DbError) -> Self {
        match err {
            DbError::NotFound => FindModelError::NotFound(PhantomData),
            _ => FindModelError::Database(PhantomData, err),
        }
    }
}

impl<M> fmt::Debug for FindModelError<M> {
    fn fmt(&self, fmt: &mut fmt::Formatter) -> fmt::Result {
        match self {
            FindModelError::Database(_, err) =>
                fmt.debug_tuple("Database").field(err).finish(),
            FindModelError::NotFound(_) => fmt.write_str("NotFound"),
        }
    }
}

impl<M: Model> fmt::Display for FindModelError<M> {
    fn fmt(&self, fmt: &mut fmt::Formatter) -> fmt::Result {
        match self {
            FindModelError::Database(_, err) => write!(fmt, "Database error: {}", err),
            FindModelError::NotFound(_) => write!(fmt, "No such {}", M::ERROR_CATEGORY),
        }
    }
}

impl<M: Model + 'static> Fail for FindModelError<M> {
    fn cause(&self) -> Option<&dyn Fail> {
        match self {
            FindModelError::Database(_, err) => Some(err),
            FindModelError::NotFound(_) => None,
        }
    }
}

impl<M: Model + 'static> ApiError for FindModelError<M> {
    fn status(&self) -> StatusCode {
        match self {
            FindModelError::Database(..) => StatusCode::INTERNAL_SERVER_ERROR,
            FindModelError::NotFound(_) => StatusCode::NOT_FOUND,
        }
    }

    fn code(&self) -> Option<Cow<str>> {
        match self {
            FindModelError::Database(..) => None,
            FindModelError::NotFound(_) =>
                Some(Cow::Owned(format!("{}:not-found", M::ERROR_CATEGORY))),
        }
    }
}

/// Assert that a model exists.
pub trait AssertExists {
    type Model;

    /// Convert a [`FindModelResult`] into a plain database result, see
    /// [`FindModelError::assert_exists`].
    fn assert_exists(self) -> Result<Self::Model, DbError>;
}

impl<M> AssertExists for FindModelResult<M> {
    type Model = M;

    fn assert_exists(self) -> Result<M, DbError> {
        self.map_err(FindModelError::assert_exists)
    }
}
