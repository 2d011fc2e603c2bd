//! Syllabus's REST API.

use actix_web::web::{self, ServiceConfig};

mod config;
mod contents;
mod courses;
mod files;
mod modules;
mod sessions;
mod subjects;

pub use self::config::Config;

pub type Result<T, E=syllabus_error::Error> = std::result::Result<T, E>;

/// Configure [`App`] for an API server.
pub fn configure(cfg: &mut ServiceConfig) {
    cfg.service(
        web::scope("/api/v1")
            .configure(contents::configure)
            .configure(courses::configure)
            .configure(files::configure)
            .configure(modules::configure)
            .configure(sessions::configure)
            .configure(subjects::configure)
    );
}
