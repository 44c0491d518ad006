//! Environment-driven configuration.
//!
//! # Responsibility
//! - Resolve which gateway adapter backs the directory and how the
//!   identifying field is validated.
//! - Resolve logging level and directory.
//!
//! # Invariants
//! - Parsing is independent of the process environment (`from_lookup`), so it
//!   is testable without mutating global state.

use crate::db::DbError;
use crate::gateway::{LocalGateway, SqliteGateway, UserGateway};
use crate::logging::default_log_level;
use crate::validation::IdentifierKind;
use log::info;
use std::error::Error;
use std::fmt::{Display, Formatter};
use std::path::PathBuf;
use std::sync::Arc;

pub const DB_URL_ENV: &str = "UPA_DB_URL";
pub const IDENTIFIER_ENV: &str = "UPA_IDENTIFIER";
pub const LOG_LEVEL_ENV: &str = "UPA_LOG_LEVEL";
pub const LOG_DIR_ENV: &str = "UPA_LOG_DIR";

const DEFAULT_DB_URL: &str = "sqlite://./data/upa.db";
const SQLITE_SCHEME: &str = "sqlite://";
const JSON_SCHEME: &str = "json://";

#[derive(Debug)]
pub enum ConfigError {
    InvalidStoreUrl(String),
    InvalidIdentifier(String),
    Store(DbError),
}

impl Display for ConfigError {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::InvalidStoreUrl(value) => write!(
                f,
                "unsupported {DB_URL_ENV} `{value}`; expected sqlite://<path>, json://<path> or memory:"
            ),
            Self::InvalidIdentifier(value) => write!(
                f,
                "unsupported {IDENTIFIER_ENV} `{value}`; expected login|email"
            ),
            Self::Store(err) => write!(f, "failed to open store: {err}"),
        }
    }
}

impl Error for ConfigError {
    fn source(&self) -> Option<&(dyn Error + 'static)> {
        match self {
            Self::Store(err) => Some(err),
            _ => None,
        }
    }
}

impl From<DbError> for ConfigError {
    fn from(value: DbError) -> Self {
        Self::Store(value)
    }
}

/// Backing store for the gateway.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum StoreConfig {
    /// Process-local, lost on exit.
    Memory,
    /// Process-local, mirrored to a JSON file.
    JsonFile(PathBuf),
    /// Durable SQLite database.
    Sqlite(PathBuf),
}

impl StoreConfig {
    /// Parses `memory:`, `json://<path>` or `sqlite://<path>`.
    pub fn parse(url: &str) -> Result<Self, ConfigError> {
        let trimmed = url.trim();
        if trimmed.eq_ignore_ascii_case("memory:") || trimmed.eq_ignore_ascii_case("memory") {
            return Ok(Self::Memory);
        }

        let (scheme_len, build): (usize, fn(PathBuf) -> Self) =
            if trimmed.starts_with(SQLITE_SCHEME) {
                (SQLITE_SCHEME.len(), Self::Sqlite)
            } else if trimmed.starts_with(JSON_SCHEME) {
                (JSON_SCHEME.len(), Self::JsonFile)
            } else {
                return Err(ConfigError::InvalidStoreUrl(trimmed.to_string()));
            };

        let path = trimmed.get(scheme_len..).unwrap_or_default().trim();
        if path.is_empty() {
            return Err(ConfigError::InvalidStoreUrl(trimmed.to_string()));
        }
        Ok(build(PathBuf::from(path)))
    }
}

/// Fully resolved application configuration.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AppConfig {
    pub store: StoreConfig,
    pub identifier: IdentifierKind,
    pub log_level: String,
    /// Logging stays off when unset.
    pub log_dir: Option<PathBuf>,
}

impl AppConfig {
    /// Reads configuration from the process environment.
    pub fn from_env() -> Result<Self, ConfigError> {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Reads configuration through `lookup`. Blank values count as unset.
    pub fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Result<Self, ConfigError> {
        let read = |key: &str| {
            lookup(key)
                .map(|value| value.trim().to_string())
                .filter(|value| !value.is_empty())
        };

        let store = StoreConfig::parse(&read(DB_URL_ENV).unwrap_or_else(|| DEFAULT_DB_URL.to_string()))?;
        let identifier = match read(IDENTIFIER_ENV) {
            Some(value) => {
                IdentifierKind::parse(&value).ok_or(ConfigError::InvalidIdentifier(value))?
            }
            None => IdentifierKind::default(),
        };

        Ok(Self {
            store,
            identifier,
            log_level: read(LOG_LEVEL_ENV).unwrap_or_else(|| default_log_level().to_string()),
            log_dir: read(LOG_DIR_ENV).map(PathBuf::from),
        })
    }
}

/// Builds the gateway adapter selected by `store`.
pub fn open_gateway(store: &StoreConfig) -> Result<Arc<dyn UserGateway>, ConfigError> {
    let gateway: Arc<dyn UserGateway> = match store {
        StoreConfig::Memory => Arc::new(LocalGateway::in_memory()),
        StoreConfig::JsonFile(path) => Arc::new(LocalGateway::open(path.clone())),
        StoreConfig::Sqlite(path) => Arc::new(SqliteGateway::open(path)?),
    };
    info!("event=gateway_open module=config status=ok store={store:?}");
    Ok(gateway)
}

#[cfg(test)]
mod tests {
    use super::{AppConfig, ConfigError, StoreConfig};
    use crate::validation::IdentifierKind;
    use std::collections::HashMap;
    use std::path::PathBuf;

    fn lookup(pairs: &[(&str, &str)]) -> impl Fn(&str) -> Option<String> {
        let map = pairs
            .iter()
            .map(|(key, value)| (key.to_string(), value.to_string()))
            .collect::<HashMap<_, _>>();
        move |key| map.get(key).cloned()
    }

    #[test]
    fn defaults_to_sqlite_login_store() {
        let config = AppConfig::from_lookup(lookup(&[])).unwrap();
        assert_eq!(config.store, StoreConfig::Sqlite(PathBuf::from("./data/upa.db")));
        assert_eq!(config.identifier, IdentifierKind::Login);
        assert!(config.log_dir.is_none());
        assert!(!config.log_level.is_empty());
    }

    #[test]
    fn reads_every_variable() {
        let config = AppConfig::from_lookup(lookup(&[
            ("UPA_DB_URL", "json:///tmp/upa/users.json"),
            ("UPA_IDENTIFIER", "email"),
            ("UPA_LOG_LEVEL", "warn"),
            ("UPA_LOG_DIR", "/var/log/upa"),
        ]))
        .unwrap();
        assert_eq!(
            config.store,
            StoreConfig::JsonFile(PathBuf::from("/tmp/upa/users.json"))
        );
        assert_eq!(config.identifier, IdentifierKind::Email);
        assert_eq!(config.log_level, "warn");
        assert_eq!(config.log_dir, Some(PathBuf::from("/var/log/upa")));
    }

    #[test]
    fn blank_values_count_as_unset() {
        let config = AppConfig::from_lookup(lookup(&[("UPA_DB_URL", "  "), ("UPA_LOG_DIR", "")]))
            .unwrap();
        assert!(matches!(config.store, StoreConfig::Sqlite(_)));
        assert!(config.log_dir.is_none());
    }

    #[test]
    fn rejects_unknown_store_and_identifier() {
        let store = StoreConfig::parse("postgres://db").unwrap_err();
        assert!(matches!(store, ConfigError::InvalidStoreUrl(_)));
        assert!(StoreConfig::parse("sqlite://").is_err());
        assert_eq!(StoreConfig::parse(" memory: ").unwrap(), StoreConfig::Memory);

        let identifier = AppConfig::from_lookup(lookup(&[("UPA_IDENTIFIER", "phone")])).unwrap_err();
        assert!(matches!(identifier, ConfigError::InvalidIdentifier(_)));
    }
}
