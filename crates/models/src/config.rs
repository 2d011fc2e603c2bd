use failure::Fail;
use serde::Deserialize;
use std::path::PathBuf;
use syllabus_util::SingleInit;

use crate::db::Config as DbConfig;

static CONFIG: SingleInit<&'static Config> = SingleInit::uninit();

#[derive(Clone, Debug, Deserialize)]
pub struct Config {
    pub database: Option<DbConfig>,
    pub storage: Storage,
}

/// File storage configuration.
#[derive(Clone, Debug, Deserialize)]
pub struct Storage {
    /// Path to a directory in which uploaded files will be kept.
    pub path: PathBuf,
}

impl Config {
    /// Get global configuration.
    ///
    /// ## Panics
    ///
    /// This function will panic if called before [`Config::register`].
    pub fn global() -> &'static Config {
        CONFIG.get().expect("model configuration must be initialized before \
            calling Config::global")
    }

    /// Check that this configuration can be used.
    pub fn validate(&self) -> Result<(), ConfigError> {
        if !self.storage.path.is_dir() {
            return Err(ConfigError::StorageMissing(self.storage.path.clone()));
        }

        Ok(())
    }

    /// Register this configuration as the global static configuration
    /// ([`Config::global`]).
    pub fn register(&'static self) {
        CONFIG.get_or_init(|| self);
    }
}

#[derive(Debug, Fail)]
pub enum ConfigError {
    #[fail(display = "storage path {:?} is not a directory", _0)]
    StorageMissing(PathBuf),
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn storage_must_be_a_directory() {
        let dir = tempfile::tempdir().unwrap();

        let config = Config {
            database: None,
            storage: Storage { path: dir.path().to_path_buf() },
        };
        assert!(config.validate().is_ok());

        let config = Config {
            database: None,
            storage: Storage { path: dir.path().join("missing") },
        };
        match config.validate() {
            Err(ConfigError::StorageMissing(path)) =>
                assert_eq!(path, dir.path().join("missing")),
            Ok(()) => panic!("missing storage directory accepted"),
        }
    }
}
