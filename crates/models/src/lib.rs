#[macro_use] extern crate diesel;

#[cfg(not(debug_assertions))]
#[macro_use]
extern crate diesel_migrations;

mod config;

pub mod db;
pub mod models;
pub mod ordering;
pub mod permissions;

pub use self::{
    config::{Config, ConfigError, Storage},
    db::types::ContentKind,
    models::*,
    permissions::PermissionBits,
};
