use actix_web::{FromRequest, HttpRequest, dev::Payload};
use failure::Fail;
use futures::future::{self, FutureResult};
use std::ops::Deref;
use syllabus_error::{ApiError, Error};
use syllabus_models::db::{Connection, Pool, PooledConnection};

/// Extract a database connection for a request.
pub struct Database(PooledConnection);

impl FromRequest for Database {
    type Error = Error;
    type Future = FutureResult<Database, Error>;
    type Config = ();

    fn from_request(req: &HttpRequest, _: &mut Payload) -> Self::Future {
        let pool = match req.app_data::<Pool>() {
            Some(pool) => pool,
            None => return future::err(DatabasePoolMissing.into()),
        };

        future::result(pool.get().map_err(Error::from).map(Database))
    }
}

impl Deref for Database {
    type Target = Connection;

    fn deref(&self) -> &Connection {
        &self.0
    }
}

/// Error returned by [`Database`]'s implementation of [`FromRequest`] when
/// connection pool has not been configured.
#[derive(ApiError, Debug, Fail)]
#[api(internal)]
#[fail(display = "database pool needs to be set for Database extraction to work")]
pub struct DatabasePoolMissing;
