//! Application-level configuration loading, including the lobby race policy.

use std::{env, fs, io::ErrorKind, path::PathBuf};

use serde::Deserialize;
use tracing::{info, warn};

use crate::dto::validation::{MAX_PIN_LENGTH, MIN_PIN_LENGTH};

/// Default location on disk where the server looks for the JSON configuration.
const DEFAULT_CONFIG_PATH: &str = "config/app.json";
/// Environment variable that overrides [`DEFAULT_CONFIG_PATH`].
const CONFIG_PATH_ENV: &str = "TRIVIA_BOARD_BACK_CONFIG_PATH";
/// Environment variable that overrides the admin token from the file.
const ADMIN_TOKEN_ENV: &str = "ADMIN_TOKEN";

const DEFAULT_STORE_RETRY_ATTEMPTS: u32 = 1;
const DEFAULT_DISPLAY_NAME_MAX_LEN: usize = 32;

/// How concurrent membership mutations on the same board are ordered.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum JoinSerialization {
    /// Hold a per-board lock around every read-modify-write; first writer wins.
    PerBoard,
    /// No lock: two joins with the same name may both pass the uniqueness check.
    Unserialized,
}

#[derive(Debug, Clone)]
/// Immutable runtime configuration shared across the application.
pub struct AppConfig {
    serialization: JoinSerialization,
    store_retry_attempts: u32,
    display_name_max_len: usize,
    blocked_names: Vec<String>,
    pin_length: usize,
    admin_token: Option<String>,
}

impl AppConfig {
    /// Load the application configuration from disk, falling back to built-in defaults.
    pub fn load() -> Self {
        let path = resolve_config_path();
        let config = match fs::read_to_string(&path) {
            Ok(contents) => match serde_json::from_str::<RawConfig>(&contents) {
                Ok(raw) => {
                    let app_config: Self = raw.into();
                    info!(
                        path = %path.display(),
                        serialization = ?app_config.serialization,
                        "loaded lobby configuration"
                    );
                    app_config
                }
                Err(err) => {
                    warn!(
                        path = %path.display(),
                        error = %err,
                        "failed to parse config; falling back to defaults"
                    );
                    Self::default()
                }
            },
            Err(err) if err.kind() == ErrorKind::NotFound => {
                info!(
                    path = %path.display(),
                    "config file not found; using built-in defaults"
                );
                Self::default()
            }
            Err(err) => {
                warn!(
                    path = %path.display(),
                    error = %err,
                    "failed to read config; falling back to defaults"
                );
                Self::default()
            }
        };

        match env::var(ADMIN_TOKEN_ENV) {
            Ok(token) if !token.trim().is_empty() => config.with_admin_token(token),
            _ => config,
        }
    }

    /// Replace the admin token.
    pub fn with_admin_token(mut self, token: impl Into<String>) -> Self {
        self.admin_token = Some(token.into());
        self
    }

    /// Replace the race policy.
    pub fn with_serialization(mut self, serialization: JoinSerialization) -> Self {
        self.serialization = serialization;
        self
    }

    /// Replace the number of immediate retries after a storage failure.
    pub fn with_store_retry_attempts(mut self, attempts: u32) -> Self {
        self.store_retry_attempts = attempts;
        self
    }

    pub fn serialization(&self) -> JoinSerialization {
        self.serialization
    }

    pub fn store_retry_attempts(&self) -> u32 {
        self.store_retry_attempts
    }

    pub fn display_name_max_len(&self) -> usize {
        self.display_name_max_len
    }

    pub fn blocked_names(&self) -> &[String] {
        &self.blocked_names
    }

    pub fn pin_length(&self) -> usize {
        self.pin_length
    }

    pub fn admin_token(&self) -> Option<&str> {
        self.admin_token.as_deref()
    }
}

impl Default for AppConfig {
    fn default() -> Self {
        Self {
            serialization: JoinSerialization::PerBoard,
            store_retry_attempts: DEFAULT_STORE_RETRY_ATTEMPTS,
            display_name_max_len: DEFAULT_DISPLAY_NAME_MAX_LEN,
            blocked_names: Vec::new(),
            pin_length: MIN_PIN_LENGTH,
            admin_token: None,
        }
    }
}

#[derive(Debug, Deserialize)]
/// JSON representation of the configuration file located at [`DEFAULT_CONFIG_PATH`].
struct RawConfig {
    #[serde(default = "default_serialization")]
    serialization: JoinSerialization,
    #[serde(default = "default_store_retry_attempts")]
    store_retry_attempts: u32,
    #[serde(default = "default_display_name_max_len")]
    display_name_max_len: usize,
    #[serde(default)]
    blocked_names: Vec<String>,
    #[serde(default = "default_pin_length")]
    pin_length: usize,
    #[serde(default)]
    admin_token: Option<String>,
}

impl From<RawConfig> for AppConfig {
    fn from(value: RawConfig) -> Self {
        Self {
            serialization: value.serialization,
            store_retry_attempts: value.store_retry_attempts,
            display_name_max_len: value.display_name_max_len.max(1),
            blocked_names: value.blocked_names,
            pin_length: value.pin_length.clamp(MIN_PIN_LENGTH, MAX_PIN_LENGTH),
            admin_token: value.admin_token.filter(|token| !token.trim().is_empty()),
        }
    }
}

fn default_serialization() -> JoinSerialization {
    JoinSerialization::PerBoard
}

fn default_store_retry_attempts() -> u32 {
    DEFAULT_STORE_RETRY_ATTEMPTS
}

fn default_display_name_max_len() -> usize {
    DEFAULT_DISPLAY_NAME_MAX_LEN
}

fn default_pin_length() -> usize {
    MIN_PIN_LENGTH
}

/// Resolve the configuration path taking the environment override into account.
fn resolve_config_path() -> PathBuf {
    env::var_os(CONFIG_PATH_ENV)
        .map(PathBuf::from)
        .filter(|path| !path.as_os_str().is_empty())
        .unwrap_or_else(|| PathBuf::from(DEFAULT_CONFIG_PATH))
}
