use blake2::blake2b::Blake2b;
use diesel::{prelude::*, result::Error as DbError};
use failure::Fail;
use serde::Serialize;
use std::{fs, io::{self, Write}, path::{Path, PathBuf}};
use syllabus_error::ApiError;
use syllabus_macros::From;
use syllabus_util::bytes_to_hex;
use tempfile::NamedTempFile;

use crate::db::{Connection, models as db, schema::files};
use super::{FindModelResult, Model};

/// Length of file digests, in bytes.
const HASH_LENGTH: usize = 64;

/// A file stored on disk.
///
/// Files are content-addressed: uploading the same data twice with the same
/// MIME type yields the same file.
#[derive(Debug)]
pub struct File {
    data: db::File,
}

/// A subset of file's data that can safely be publicly exposed.
#[derive(Debug, Serialize)]
pub struct Public {
    id: i32,
    mime: String,
    url: String,
}

impl Model for File {
    const ERROR_CATEGORY: &'static str = "file";

    type Id = i32;
    type Database = db::File;
    type Public = Public;

    fn by_id(db: &Connection, id: i32) -> FindModelResult<File> {
        files::table
            .filter(files::id.eq(id))
            .get_result::<db::File>(db)
            .map(File::from_db)
            .map_err(From::from)
    }

    fn from_db(data: Self::Database) -> Self {
        File { data }
    }

    fn into_db(self) -> Self::Database {
        self.data
    }

    fn id(&self) -> i32 {
        self.data.id
    }

    fn get_public(&self) -> Public {
        Public {
            id: self.data.id,
            mime: self.data.mime.clone(),
            url: download_url(self.data.id),
        }
    }
}

impl File {
    /// Create new file from a data in memory.
    ///
    /// If a file with the same contents and MIME type already exists it is
    /// returned instead.
    pub fn from_data<P, B>(
        db: &Connection,
        storage_path: P,
        data: B,
        mime: &str,
    ) -> Result<File, CreateFileError>
    where
        P: AsRef<Path>,
        B: AsRef<[u8]>,
    {
        let mut hash = Blake2b::new(HASH_LENGTH);
        hash.update(data.as_ref());
        let hash = hash.finalize();

        if let Some(data) = files::table
            .filter(files::hash.eq(hash.as_bytes()).and(files::mime.eq(mime)))
            .get_result::<db::File>(db)
            .optional()?
        {
            return Ok(File { data });
        }

        let path = storage_path.as_ref().join(bytes_to_hex(hash.as_bytes()));

        // Write into a temporary file first, so that a partially written file
        // is never visible under its final name. The same data may already be
        // there under another MIME type, in which case it is replaced with
        // identical contents.
        let mut tmp = NamedTempFile::new_in(storage_path.as_ref())?;
        tmp.write_all(data.as_ref())?;
        tmp.persist(&path)?;

        let path = path.to_str().ok_or_else(|| CreateFileError::InvalidPath(path.clone()))?;

        let data = diesel::insert_into(files::table)
            .values(db::NewFile {
                mime,
                path,
                hash: hash.as_bytes(),
            })
            .get_result::<db::File>(db)?;

        log::debug!("Stored file {} ({}) at {}", data.id, data.mime, data.path);

        Ok(File { data })
    }

    /// Path to this file's contents.
    pub fn path(&self) -> &Path {
        Path::new(&self.data.path)
    }

    /// Read contents of this file into memory.
    pub fn read(&self) -> Result<Vec<u8>, io::Error> {
        fs::read(&self.data.path)
    }
}

impl std::ops::Deref for File {
    type Target = db::File;

    fn deref(&self) -> &db::File {
        &self.data
    }
}

/// Path under which a file can be downloaded.
pub fn download_url(id: i32) -> String {
    format!("/api/v1/files/{}", id)
}

#[derive(ApiError, Debug, Fail, From)]
pub enum CreateFileError {
    /// Database error.
    #[fail(display = "Database error: {}", _0)]
    #[api(internal)]
    Database(#[cause] #[from] DbError),
    /// System error.
    #[fail(display = "System error: {}", _0)]
    #[api(internal)]
    System(#[cause] #[from] io::Error),
    /// Storage path can't be represented in the database.
    #[fail(display = "Invalid storage path {:?}", _0)]
    #[api(internal)]
    InvalidPath(PathBuf),
}

impl From<tempfile::PersistError> for CreateFileError {
    fn from(e: tempfile::PersistError) -> Self {
        CreateFileError::System(e.error)
    }
}

