use diesel::pg::PgConnection;
use failure::Fail;
use r2d2_diesel::ConnectionManager;
use serde::Deserialize;
use std::env;
use syllabus_macros::From;
use syllabus_util::SingleInit;

pub mod models;
pub mod schema;
pub mod types;

pub type Connection = PgConnection;

/// Connections to the course database, shared by all workers.
pub type Pool = r2d2::Pool<ConnectionManager<PgConnection>>;

pub type PooledConnection = r2d2::PooledConnection<ConnectionManager<PgConnection>>;

/// The `[database]` section of configuration.
#[derive(Clone, Debug, Deserialize)]
pub struct Config {
    pub url: String,
}

/// URL of the course database. `DATABASE_URL` overrides the `[database]`
/// section.
pub fn database_url(cfg: Option<&Config>) -> Result<String, GetDatabaseUrlError> {
    match env::var("DATABASE_URL") {
        Ok(url) => Ok(url),
        Err(env::VarError::NotUnicode(_)) => Err(GetDatabaseUrlError::VarInvalidUnicode),
        Err(env::VarError::NotPresent) => cfg
            .map(|db| db.url.clone())
            .ok_or(GetDatabaseUrlError::NotConfigured),
    }
}

#[derive(Debug, Fail)]
pub enum GetDatabaseUrlError {
    #[fail(display = "No database connection configured")]
    NotConfigured,
    #[fail(display = "DATABASE_URL contains invalid Unicode")]
    VarInvalidUnicode,
}

/// Open a connection outside of the pool, for administrative commands.
pub fn connect(cfg: Option<&Config>) -> Result<Connection, ConnectionError> {
    use diesel::Connection;

    Ok(PgConnection::establish(&database_url(cfg)?)?)
}

static POOL: SingleInit<Pool> = SingleInit::uninit();

/// Get the process-wide connection pool, creating it on first success.
pub fn configure_pool(cfg: Option<&Config>) -> Result<Pool, ConnectionError> {
    POOL.get_or_try_init(|| {
        let pool = Pool::new(ConnectionManager::new(database_url(cfg)?))?;

        // Fail at startup rather than on the first request.
        let conn = pool.get()?;

        // Release builds bring the schema up to date.
        if cfg!(not(debug_assertions)) {
            embedded_migrations::run_with_output(&*conn, &mut std::io::stderr())
                .map_err(ConnectionError::Migration)?;
        }

        Ok(pool)
    }).map(Clone::clone)
}

#[derive(Debug, Fail, From)]
pub enum ConnectionError {
    #[fail(display = "{}", _0)]
    Configuration(#[cause] #[from] GetDatabaseUrlError),
    #[fail(display = "{}", _0)]
    Pool(#[cause] #[from] r2d2::Error),
    #[fail(display = "{}", _0)]
    Database(#[cause] #[from] diesel::ConnectionError),
    #[cfg(debug_assertions)]
    #[fail(display = "could not perform migrations")]
    Migration(()),
    #[cfg(not(debug_assertions))]
    #[fail(display = "{}", _0)]
    Migration(#[cause] diesel_migrations::RunMigrationsError),
}

#[cfg(not(debug_assertions))]
diesel_migrations::embed_migrations!();

// Debug builds apply migrations with the diesel CLI.
#[cfg(debug_assertions)]
mod embedded_migrations {
    use diesel::pg::PgConnection;

    pub fn run_with_output<W>(_: &PgConnection, _: &mut W) -> Result<(), ()> {
        Ok(())
    }
}
