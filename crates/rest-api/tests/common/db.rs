//! Managing the test database.

use diesel::{Connection as _, connection::SimpleConnection, pg::PgConnection};
use diesel_migrations::run_pending_migrations_in_directory;
use failure::Error;
use r2d2_diesel::ConnectionManager;
use std::{path::Path, sync::Mutex};
use syllabus_models::db::{Connection, Pool};

pub struct Database {
    lock: Mutex<()>,
    pool: Pool,
    seed: Box<dyn Fn(&Connection) -> Result<(), Error> + Sync>,
}

impl Database {
    /// Obtain an exclusive lock to the test database.
    ///
    /// Database is cleared and re-seeded before `f` is called.
    pub fn lock<F, R>(&self, f: F) -> Result<R, Error>
    where
        F: FnOnce(Pool) -> Result<R, Error>,
    {
        let _guard = match self.lock.lock() {
            Ok(guard) => guard,
            Err(poison) => poison.into_inner(),
        };

        let conn = self.pool.get()?;
        conn.batch_execute(CLEAR_DATABASE)?;
        (self.seed)(&conn)?;

        f(self.pool.clone())
    }
}

/// Setup the test database.
///
/// The database is taken from `DATABASE_URL`. Unless `TEST_DONT_CREATE_DATABASE`
/// is set its public schema is re-created and all migrations are applied.
/// Returns `None` when no database was configured.
///
/// Each integration test suite should create a single database:
///
/// ```ignore
/// lazy_static! {
///     static ref DATABASE: Option<Database> = setup_db(|db| {
///         // Seed database
///     }).expect("Cannot set up test database");
/// }
/// ```
pub fn setup_db<F>(seed: F) -> Result<Option<Database>, Error>
where
    F: Fn(&Connection) -> Result<(), Error> + Sync + 'static,
{
    let url = match std::env::var("DATABASE_URL") {
        Ok(url) => url,
        Err(_) => return Ok(None),
    };

    if std::env::var_os("TEST_DONT_CREATE_DATABASE").is_none() {
        eprintln!("Re-creating database. Set TEST_DONT_CREATE_DATABASE to skip");

        let conn = PgConnection::establish(&url)?;
        conn.batch_execute("drop schema public cascade; create schema public;")?;

        let migrations = Path::new(env!("CARGO_MANIFEST_DIR"))
            .join("..")
            .join("models")
            .join("migrations");
        run_pending_migrations_in_directory(&conn, &migrations, &mut std::io::sink())?;
    }

    Ok(Some(Database {
        lock: Mutex::new(()),
        pool: Pool::new(ConnectionManager::new(url))?,
        seed: Box::new(seed),
    }))
}

const CLEAR_DATABASE: &str = r#"
do $$
declare
    stmt text;
begin
    select 'truncate '
        || string_agg(format('%I.%I', schemaname, tablename), ', ')
    into stmt
    from pg_tables
    where schemaname = 'public'
      and tablename not like '\_\_diesel\_%';

    execute stmt;

    for stmt in (
        select 'alter sequence ' || quote_ident(relname) || ' restart with 1;'
        from pg_class
        where relkind = 'S'
    ) loop
        execute stmt;
    end loop;
end; $$
"#;
