//! Server configuration from `LISTSHARE_*` environment variables.

use listshare_core::{default_log_level, Visibility};
use std::error::Error;
use std::fmt::{Display, Formatter};
use std::net::SocketAddr;
use std::path::PathBuf;

pub const DB_PATH_VAR: &str = "LISTSHARE_DB_PATH";
pub const BIND_ADDR_VAR: &str = "LISTSHARE_BIND_ADDR";
pub const JWT_SECRET_VAR: &str = "LISTSHARE_JWT_SECRET";
pub const LOG_LEVEL_VAR: &str = "LISTSHARE_LOG_LEVEL";
pub const LOG_DIR_VAR: &str = "LISTSHARE_LOG_DIR";
pub const LIST_VISIBILITY_VAR: &str = "LISTSHARE_LIST_VISIBILITY";

const DEFAULT_BIND_ADDR: &str = "127.0.0.1:3000";
const DEFAULT_DB_FILE_NAME: &str = "listshare.db";

#[derive(Debug, PartialEq, Eq)]
pub enum ConfigError {
    Missing(&'static str),
    Invalid {
        key: &'static str,
        value: String,
        reason: String,
    },
}

impl Display for ConfigError {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Missing(key) => write!(f, "{key} must be set"),
            Self::Invalid { key, value, reason } => {
                write!(f, "invalid {key} `{value}`: {reason}")
            }
        }
    }
}

impl Error for ConfigError {}

#[derive(Debug, Clone, PartialEq)]
pub struct ServerConfig {
    pub db_path: PathBuf,
    pub bind_addr: SocketAddr,
    pub jwt_secret: String,
    pub log_level: String,
    pub log_dir: PathBuf,
    pub visibility: Visibility,
}

impl ServerConfig {
    pub fn from_env() -> Result<Self, ConfigError> {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Builds the config from `lookup`; blank values count as unset.
    pub fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Result<Self, ConfigError> {
        let read = |key: &str| {
            lookup(key)
                .map(|value| value.trim().to_string())
                .filter(|value| !value.is_empty())
        };

        let jwt_secret = read(JWT_SECRET_VAR).ok_or(ConfigError::Missing(JWT_SECRET_VAR))?;

        let bind_addr = read(BIND_ADDR_VAR).unwrap_or_else(|| DEFAULT_BIND_ADDR.to_string());
        let bind_addr = bind_addr
            .parse::<SocketAddr>()
            .map_err(|err| ConfigError::Invalid {
                key: BIND_ADDR_VAR,
                value: bind_addr.clone(),
                reason: err.to_string(),
            })?;

        let visibility = match read(LIST_VISIBILITY_VAR) {
            Some(value) => value
                .parse::<Visibility>()
                .map_err(|reason| ConfigError::Invalid {
                    key: LIST_VISIBILITY_VAR,
                    value,
                    reason,
                })?,
            None => Visibility::default(),
        };

        let db_path = read(DB_PATH_VAR)
            .map(PathBuf::from)
            .unwrap_or_else(|| std::env::temp_dir().join(DEFAULT_DB_FILE_NAME));
        let log_dir = read(LOG_DIR_VAR)
            .map(PathBuf::from)
            .unwrap_or_else(|| std::env::temp_dir().join("listshare").join("logs"));
        let log_level = read(LOG_LEVEL_VAR).unwrap_or_else(|| default_log_level().to_string());

        Ok(Self {
            db_path,
            bind_addr,
            jwt_secret,
            log_level,
            log_dir,
            visibility,
        })
    }
}
