use failure::Fail;
use log::LevelFilter;
use serde::Deserialize;
use std::{collections::HashMap, fs, path::Path};
use syllabus_models::Config as ModelConfig;
use syllabus_util::SingleInit;

use crate::Result;

/// Name of the configuration file, looked up in the working directory.
const CONFIG_FILE: &str = "config.toml";

static CONFIG: SingleInit<Config> = SingleInit::uninit();

pub fn load() -> Result<&'static Config> {
    CONFIG.get_or_try_init(|| read(CONFIG_FILE))
}

/// Read and parse a configuration file.
fn read<P: AsRef<Path>>(path: P) -> Result<Config> {
    let data = fs::read(path).map_err(ReadConfigurationError)?;
    toml::from_slice(&data).map_err(|e| ConfigurationError(e).into())
}

#[derive(Clone, Debug, Deserialize)]
pub struct Config {
    pub server: syllabus_rest_api::Config,
    #[serde(default)]
    pub logging: Logging,
    pub sentry: Option<Sentry>,
    #[serde(flatten)]
    pub model: ModelConfig,
}

impl Config {
    /// Validate configuration correctness.
    pub fn validate(&self) -> Result<(), failure::Error> {
        self.model.validate()?;

        Ok(())
    }

    /// Register this configuration as the global static configuration.
    pub fn register(&'static self) {
        self.model.register();
    }
}

/// Logging configuration.
#[derive(Clone, Debug, Deserialize)]
pub struct Logging {
    /// Default logging level.
    #[serde(default = "default_level_filter")]
    pub level: LevelFilter,
    /// Actix-web logging level.
    pub network: Option<LevelFilter>,
    /// Custom filters.
    #[serde(default)]
    pub filters: HashMap<String, LevelFilter>,
}

/// Sentry.io configuration.
#[derive(Clone, Debug, Deserialize)]
pub struct Sentry {
    /// Client key.
    pub dsn: String,
}

#[derive(Debug, Fail)]
#[fail(display = "Cannot read configuration file")]
pub struct ReadConfigurationError(#[fail(cause)] std::io::Error);

#[derive(Debug, Fail)]
#[fail(display = "Invalid configuration: {}", _0)]
pub struct ConfigurationError(#[fail(cause)] toml::de::Error);

fn default_level_filter() -> LevelFilter {
    LevelFilter::Info
}

impl Default for Logging {
    fn default() -> Self {
        Logging {
            level: default_level_filter(),
            network: None,
            filters: HashMap::new(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    const MINIMAL: &str = r#"
        [server]
        domain = "localhost"

        [storage]
        path = "/var/lib/syllabus/files"
    "#;

    #[test]
    fn minimal_configuration() {
        let config: Config = toml::from_str(MINIMAL).unwrap();

        assert_eq!(config.server.domain, "localhost");
        assert!(config.model.database.is_none());
        assert!(config.sentry.is_none());
        assert_eq!(config.logging.level, LevelFilter::Info);
        assert!(config.logging.filters.is_empty());
    }

    #[test]
    fn full_configuration() {
        let config: Config = toml::from_str(r#"
            [server]
            address = "0.0.0.0:8000"
            domain = "courses.example.org"

            [database]
            url = "postgres://localhost/syllabus"

            [storage]
            path = "/srv/files"

            [logging]
            level = "warn"
            network = "info"
            filters = { syllabus_models = "debug" }

            [sentry]
            dsn = "https://key@sentry.example.org/1"
        "#).unwrap();

        assert_eq!(config.server.address.port(), 8000);
        assert_eq!(
            config.model.database.as_ref().map(|db| db.url.as_str()),
            Some("postgres://localhost/syllabus"),
        );
        assert_eq!(config.model.storage.path, Path::new("/srv/files"));
        assert_eq!(config.logging.level, LevelFilter::Warn);
        assert_eq!(config.logging.network, Some(LevelFilter::Info));
        assert_eq!(config.logging.filters["syllabus_models"], LevelFilter::Debug);
        assert!(config.sentry.is_some());
    }

    #[test]
    fn storage_is_required() {
        let result = toml::from_str::<Config>(r#"
            [server]
            domain = "localhost"
        "#);

        assert!(result.is_err());
    }

    #[test]
    fn read_from_file() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        file.write_all(MINIMAL.as_bytes()).unwrap();

        let config = read(file.path()).unwrap();
        assert_eq!(config.server.domain, "localhost");

        let missing = file.path().with_extension("missing");
        assert!(read(missing).is_err());
    }
}
