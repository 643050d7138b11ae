use std::fs;
use std::path::{Path, PathBuf};
use std::str::FromStr;
use std::time::Duration;

use directories::ProjectDirs;
use figment::{
    providers::{Env, Format, Serialized, Toml},
    Figment,
};
use serde::{Deserialize, Serialize};

use crate::error::SchemaError;
use crate::schema::{Dialect, TableNames};

const CONFIG_FILENAME: &str = "schemaforge.toml";
const ENV_PREFIX: &str = "SCHEMAFORGE_";

#[derive(Serialize, Deserialize, Debug, Clone, PartialEq)]
pub struct LoggingConfig {
    pub level: String,
}

impl LoggingConfig {
    const LOG_LEVELS: [&str; 5] = ["error", "warn", "info", "debug", "trace"];
    const DEFAULT_LEVEL: &str = "info";

    fn default() -> Self {
        LoggingConfig {
            level: Self::DEFAULT_LEVEL.to_string(),
        }
    }

    fn ensure_valid(&mut self) {
        let str_original = self.level.clone();
        self.level = self.level.trim().to_ascii_lowercase();
        if !Self::LOG_LEVELS.contains(&self.level.as_str()) {
            eprintln!(
                "Config error: log level of '{}' is invalid - using default of '{}'",
                str_original,
                Self::DEFAULT_LEVEL
            );
            self.level = Self::DEFAULT_LEVEL.to_owned();
        }
    }
}

#[derive(Serialize, Deserialize, Debug, Clone, PartialEq)]
pub struct ProviderConfig {
    /// One of `sqlite`, `mssql`, `postgresql`, `mysql`.
    pub driver: String,
    /// Database name. For SQLite a file path, relative paths resolve
    /// against the configuration directory.
    pub name: String,
    pub pool_size: u32,
    pub query_timeout_secs: u64,
    pub tables: TableNames,
}

impl ProviderConfig {
    const DEFAULT_DRIVER: &str = "sqlite";
    const DEFAULT_NAME: &str = "schemaforge.db";
    const DEFAULT_POOL_SIZE: u32 = 4;
    const DEFAULT_QUERY_TIMEOUT_SECS: u64 = 15;

    fn default() -> Self {
        ProviderConfig {
            driver: Self::DEFAULT_DRIVER.to_owned(),
            name: Self::DEFAULT_NAME.to_owned(),
            pool_size: Self::DEFAULT_POOL_SIZE,
            query_timeout_secs: Self::DEFAULT_QUERY_TIMEOUT_SECS,
            tables: TableNames::default(),
        }
    }

    pub fn dialect(&self) -> Result<Dialect, SchemaError> {
        Dialect::from_str(&self.driver).map_err(|_| {
            SchemaError::ConfigError(format!("unsupported provider driver '{}'", self.driver))
        })
    }

    pub fn query_timeout(&self) -> Duration {
        Duration::from_secs(self.query_timeout_secs)
    }

    /// Where the SQLite database file lives.
    pub fn database_path(&self, config_dir: &Path) -> PathBuf {
        let name = Path::new(&self.name);
        if name.is_absolute() {
            name.to_path_buf()
        } else {
            config_dir.join(name)
        }
    }

    fn ensure_valid(&mut self) -> Result<(), SchemaError> {
        self.driver = self.driver.trim().to_ascii_lowercase();
        self.dialect()?;

        if self.name.trim().is_empty() {
            return Err(SchemaError::ConfigError(
                "provider name must not be empty".to_string(),
            ));
        }

        if self.pool_size == 0 {
            eprintln!(
                "Config error: pool_size of 0 is invalid - using default of '{}'",
                Self::DEFAULT_POOL_SIZE
            );
            self.pool_size = Self::DEFAULT_POOL_SIZE;
        }

        if self.query_timeout_secs == 0 {
            eprintln!(
                "Config error: query_timeout_secs of 0 is invalid - using default of '{}'",
                Self::DEFAULT_QUERY_TIMEOUT_SECS
            );
            self.query_timeout_secs = Self::DEFAULT_QUERY_TIMEOUT_SECS;
        }

        self.tables.validate()
    }
}

#[derive(Serialize, Deserialize, Debug, Clone, PartialEq)]
pub struct Config {
    pub logging: LoggingConfig,
    pub provider: ProviderConfig,
    /// Directory of the loaded configuration file.
    #[serde(skip)]
    pub config_dir: PathBuf,
}

impl Config {
    /// The per-user configuration file used when none is given on the
    /// command line.
    pub fn default_path() -> Option<PathBuf> {
        ProjectDirs::from("", "", "schemaforge")
            .map(|dirs| dirs.config_dir().join(CONFIG_FILENAME))
    }

    fn default() -> Self {
        Config {
            logging: LoggingConfig::default(),
            provider: ProviderConfig::default(),
            config_dir: PathBuf::new(),
        }
    }

    /// Loads the configuration from a TOML file, overlaid with
    /// `SCHEMAFORGE_`-prefixed environment variables (`__` separates
    /// sections, e.g. `SCHEMAFORGE_PROVIDER__POOL_SIZE`).
    ///
    /// When `write_default` is set and the file doesn't exist, the defaults
    /// are written there first. Invalid log levels and pool settings fall
    /// back to defaults; an invalid driver or table name is an error.
    pub fn load_config(config_path: &Path, write_default: bool) -> Result<Self, SchemaError> {
        let default_config = Config::default();

        if write_default && !config_path.exists() {
            if let Some(parent) = config_path.parent() {
                if let Err(e) = fs::create_dir_all(parent) {
                    eprintln!(
                        "Failed to create configuration directory {}: {}",
                        parent.display(),
                        e
                    );
                }
            }
            match toml::to_string_pretty(&default_config) {
                Ok(toml_string) => {
                    if let Err(e) = fs::write(config_path, toml_string) {
                        eprintln!(
                            "Failed to write default config to {}: {}",
                            config_path.display(),
                            e
                        );
                    }
                }
                Err(_) => eprintln!("Failed to serialize default config."),
            }
        }

        let figment = Figment::from(Serialized::defaults(default_config))
            .merge(Toml::file(config_path))
            .merge(Env::prefixed(ENV_PREFIX).split("__"));

        let mut config: Config = figment.extract()?;
        config.config_dir = config_path
            .parent()
            .map(Path::to_path_buf)
            .unwrap_or_default();
        config.ensure_valid()?;

        Ok(config)
    }

    fn ensure_valid(&mut self) -> Result<(), SchemaError> {
        self.logging.ensure_valid();
        self.provider.ensure_valid()
    }

    pub fn database_path(&self) -> PathBuf {
        self.provider.database_path(&self.config_dir)
    }
}
