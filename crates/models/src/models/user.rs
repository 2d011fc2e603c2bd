use diesel::{
    Connection as _,
    prelude::*,
    result::{DatabaseErrorKind, Error as DbError},
};
use failure::Fail;
use rand::RngCore;
use serde::Serialize;
use syllabus_error::ApiError;
use syllabus_macros::From;

use crate::{
    db::{Connection, models as db, schema::{sessions, users}},
    permissions::PermissionBits,
};
use super::{FindModelError, FindModelResult, Model};

static ARGON2_CONFIG: argon2::Config = argon2::Config {
    ad: &[],
    hash_length: 32,
    lanes: 1,
    mem_cost: 4096,
    secret: &[],
    thread_mode: argon2::ThreadMode::Sequential,
    time_cost: 3,
    variant: argon2::Variant::Argon2id,
    version: argon2::Version::Version13,
};

/// A single user in the system.
#[derive(Debug)]
pub struct User {
    data: db::User,
}

/// A subset of user's data that can safely be publicly exposed.
#[derive(Debug, Serialize)]
pub struct Public {
    id: i32,
    name: String,
    is_super: bool,
    permissions: PermissionBits,
}

impl Model for User {
    const ERROR_CATEGORY: &'static str = "user";

    type Id = i32;
    type Database = db::User;
    type Public = Public;

    fn by_id(db: &Connection, id: Self::Id) -> FindModelResult<Self> {
        users::table
            .filter(users::id.eq(id))
            .get_result(db)
            .map(Self::from_db)
            .map_err(From::from)
    }

    fn from_db(data: Self::Database) -> Self {
        User { data }
    }

    fn into_db(self) -> Self::Database {
        self.data
    }

    fn id(&self) -> Self::Id {
        self.data.id
    }

    fn get_public(&self) -> Public {
        let db::User { id, ref name, is_super, .. } = self.data;

        Public {
            id,
            name: name.clone(),
            is_super,
            permissions: self.permissions(),
        }
    }
}

impl User {
    /// Get all users.
    pub fn all(db: &Connection) -> Result<Vec<User>, DbError> {
        users::table
            .order_by(users::id)
            .get_results::<db::User>(db)
            .map(|v| v.into_iter().map(Self::from_db).collect())
    }

    /// Find an user by email address.
    pub fn by_email(db: &Connection, email: &str) -> FindModelResult<User> {
        users::table
            .filter(users::email.eq(email))
            .get_result(db)
            .map(Self::from_db)
            .map_err(From::from)
    }

    /// Create a new user.
    pub fn create(
        db: &Connection,
        email: &str,
        name: &str,
        password: &str,
        is_super: bool,
        permissions: PermissionBits,
    ) -> Result<User, CreateUserError> {
        if name.is_empty() {
            return Err(CreateUserError::EmptyName);
        }

        if password.is_empty() {
            return Err(CreateUserError::EmptyPassword);
        }

        let (salt, hash) = hash_password(password)?;

        let data = diesel::insert_into(users::table)
            .values(db::NewUser {
                email,
                name,
                password: &hash,
                salt: &salt,
                is_super,
                permissions: permissions.bits(),
            })
            .get_result::<db::User>(db)?;

        log::info!("Created user {} <{}>", data.id, data.email);

        Ok(User { data })
    }

    /// Find an user for given email and try to authenticate as them.
    pub fn authenticate(db: &Connection, email: &str, password: &str)
    -> Result<User, UserAuthenticateError> {
        let user = User::by_email(db, email)?;

        if user.check_password(password)? {
            Ok(user)
        } else {
            Err(UserAuthenticateError::BadPassword)
        }
    }

    /// Verify correctness of a password.
    pub fn check_password(&self, password: &str) -> Result<bool, argon2::Error> {
        argon2::verify_raw(
            password.as_bytes(),
            &self.data.salt,
            &self.data.password,
            &ARGON2_CONFIG,
        )
    }

    /// Get permissions this user holds.
    ///
    /// Super users hold all permissions.
    pub fn permissions(&self) -> PermissionBits {
        if self.data.is_super {
            PermissionBits::all()
        } else {
            PermissionBits::from_bits_truncate(self.data.permissions)
        }
    }

    /// Change user's permissions.
    pub fn set_permissions(&mut self, db: &Connection, permissions: PermissionBits)
    -> Result<(), DbError> {
        self.data = diesel::update(&self.data)
            .set(users::permissions.eq(permissions.bits()))
            .get_result::<db::User>(db)?;
        Ok(())
    }

    /// Change user's password.
    ///
    /// All of user's sessions are terminated.
    pub fn change_password(&mut self, db: &Connection, password: &str)
    -> Result<(), ChangePasswordError> {
        if password.is_empty() {
            return Err(ChangePasswordError::EmptyPassword);
        }

        let (salt, hash) = hash_password(password)?;

        let data = db.transaction(|| {
            diesel::delete(sessions::table.filter(sessions::user.eq(self.data.id)))
                .execute(db)?;

            diesel::update(&self.data)
                .set((users::salt.eq(&salt[..]), users::password.eq(&hash[..])))
                .get_result::<db::User>(db)
        })?;

        self.data = data;

        Ok(())
    }
}

impl std::ops::Deref for User {
    type Target = db::User;

    fn deref(&self) -> &db::User {
        &self.data
    }
}

/// Generate a new salt and hash a password with it.
fn hash_password(password: &str) -> Result<([u8; 16], Vec<u8>), argon2::Error> {
    let mut salt = [0; 16];
    rand::thread_rng().fill_bytes(&mut salt);

    let hash = argon2::hash_raw(password.as_bytes(), &salt, &ARGON2_CONFIG)?;

    Ok((salt, hash))
}

#[derive(ApiError, Debug, Fail)]
pub enum CreateUserError {
    /// Creation failed due to a database error.
    #[fail(display = "Database error: {}", _0)]
    #[api(internal)]
    Database(#[cause] DbError),
    /// Hashing the password failed.
    #[fail(display = "Cannot hash password: {}", _0)]
    #[api(internal)]
    Hash(#[cause] argon2::Error),
    /// Duplicate user.
    #[fail(display = "Duplicate user")]
    #[api(code = "user:new:exists", status = "BAD_REQUEST")]
    Duplicate,
    #[fail(display = "User's name cannot be empty")]
    #[api(code = "user:new:empty-name", status = "BAD_REQUEST")]
    EmptyName,
    #[fail(display = "User's password cannot be empty")]
    #[api(code = "user:new:empty-password", status = "BAD_REQUEST")]
    EmptyPassword,
}

impl From<DbError> for CreateUserError {
    fn from(e: DbError) -> Self {
        match e {
            DbError::DatabaseError(DatabaseErrorKind::UniqueViolation, _)
                => CreateUserError::Duplicate,
            _ => CreateUserError::Database(e),
        }
    }
}

impl From<argon2::Error> for CreateUserError {
    fn from(e: argon2::Error) -> Self {
        CreateUserError::Hash(e)
    }
}

#[derive(ApiError, Debug, Fail, From)]
pub enum UserAuthenticateError {
    /// Authentication failed due to a database error.
    #[fail(display = "Database error: {}", _0)]
    #[api(internal)]
    Database(#[cause] #[from] DbError),
    /// Verifying the password failed.
    #[fail(display = "Cannot verify password: {}", _0)]
    #[api(internal)]
    Hash(#[cause] #[from] argon2::Error),
    /// No user found for given email address.
    #[fail(display = "No such user")]
    #[api(code = "user:not-found", status = "NOT_FOUND")]
    NotFound,
    /// Provided password was not valid for the user.
    #[fail(display = "Bad password")]
    #[api(code = "user:authenticate:bad-password", status = "FORBIDDEN")]
    BadPassword,
}

impl From<FindModelError<User>> for UserAuthenticateError {
    fn from(e: FindModelError<User>) -> Self {
        match e {
            FindModelError::Database(_, e) => UserAuthenticateError::Database(e),
            FindModelError::NotFound(_) => UserAuthenticateError::NotFound,
        }
    }
}

#[derive(ApiError, Debug, Fail, From)]
pub enum ChangePasswordError {
    #[fail(display = "Database error: {}", _0)]
    #[api(internal)]
    Internal(#[cause] #[from] DbError),
    #[fail(display = "Cannot hash password: {}", _0)]
    #[api(internal)]
    Hash(#[cause] #[from] argon2::Error),
    #[fail(display = "Password cannot be empty")]
    #[api(code = "user:change-password:empty", status = "BAD_REQUEST")]
    EmptyPassword,
}
