//! Test framework shared by integration test suites.
//!
//! Suites in this directory run against a PostgreSQL database named by
//! `DATABASE_URL`. When it is not set, tests are skipped.

#![allow(dead_code)]

mod client;
mod db;

use actix_web::{App, test};
use failure::Error;
use lazy_static::lazy_static;
use syllabus_models::{Config, Storage, db::Pool};
use syllabus_web::SessionManager;

pub use self::{
    client::{Client, PASSWORD, Response},
    db::{Database, setup_db},
};

/// Secret used to seal session cookies.
const SECRET: [u8; 32] = [7; 32];

lazy_static! {
    static ref CONFIG: Config = Config {
        database: None,
        storage: Storage {
            path: tempfile::tempdir()
                .expect("Cannot create storage directory")
                .into_path(),
        },
    };
}

/// Run a test case against a freshly seeded database.
pub fn run_test<F>(db: &Option<Database>, case: F)
where
    F: FnOnce(&mut Client, &Pool) -> Result<(), Error>,
{
    let _ = env_logger::builder().is_test(true).try_init();

    let db = match db {
        Some(db) => db,
        None => {
            eprintln!("DATABASE_URL is not set, skipping");
            return;
        }
    };

    CONFIG.register();

    let result = db.lock(|pool| {
        let mut app = test::init_service(App::new()
            .data(pool.clone())
            .wrap(SessionManager::new(&SECRET, pool.clone()))
            .configure(syllabus_rest_api::configure));
        let mut dispatch = |request: test::TestRequest| Response::read(
            test::call_service(&mut app, request.to_request()));

        case(&mut Client::new(&mut dispatch), &pool)
    });

    if let Err(err) = result {
        panic!("{}", err);
    }
}
