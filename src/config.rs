//! Configuration management for Studyflow
//!
//! This module handles loading, parsing, validating, and managing
//! configuration from files, environment variables, and CLI overrides.

use crate::error::{Result, StudyflowError};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

/// Main configuration structure for Studyflow
///
/// Holds the backend location, chat behavior, credential storage and
/// logging settings.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct Config {
    /// Backend endpoints and request settings
    #[serde(default)]
    pub server: ServerConfig,
    /// Real-time chat behavior
    #[serde(default)]
    pub chat: ChatConfig,
    /// Credential persistence
    #[serde(default)]
    pub auth: AuthConfig,
    /// Log output
    #[serde(default)]
    pub logging: LoggingConfig,
}

/// Backend server configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ServerConfig {
    /// Root URL of the REST backend; `/api` is appended per request
    #[serde(default = "default_api_url")]
    pub api_url: String,

    /// Root URL of the Socket.IO server (defaults to `api_url`)
    #[serde(default)]
    pub socket_url: Option<String>,

    /// Per-request timeout for REST calls
    #[serde(default = "default_request_timeout")]
    pub request_timeout_seconds: u64,
}

impl ServerConfig {
    /// The URL the event channel connects to.
    pub fn socket_url(&self) -> &str {
        self.socket_url.as_deref().unwrap_or(&self.api_url)
    }
}

fn default_api_url() -> String {
    "http://localhost:8000".to_string()
}

fn default_request_timeout() -> u64 {
    30
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            api_url: default_api_url(),
            socket_url: None,
            request_timeout_seconds: default_request_timeout(),
        }
    }
}

/// Chat configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ChatConfig {
    /// Idle time after the last keystroke before `typing=false` is sent
    #[serde(default = "default_typing_timeout_ms")]
    pub typing_timeout_ms: u64,

    /// Maximum number of messages rendered when a conversation opens
    #[serde(default = "default_history_limit")]
    pub history_limit: usize,
}

fn default_typing_timeout_ms() -> u64 {
    2000
}

fn default_history_limit() -> usize {
    200
}

impl Default for ChatConfig {
    fn default() -> Self {
        Self {
            typing_timeout_ms: default_typing_timeout_ms(),
            history_limit: default_history_limit(),
        }
    }
}

/// Where the bearer token is persisted between runs
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Default)]
#[serde(rename_all = "snake_case")]
pub enum TokenStoreKind {
    /// OS native credential store
    #[default]
    Keyring,
    /// JSON file in the platform data directory (or `auth.token_file`)
    File,
    /// Process memory only; nothing survives a restart
    Memory,
}

impl TokenStoreKind {
    /// Parse a store name as used in env vars.
    pub fn parse_str(s: &str) -> Option<Self> {
        match s.to_lowercase().as_str() {
            "keyring" => Some(Self::Keyring),
            "file" => Some(Self::File),
            "memory" => Some(Self::Memory),
            _ => None,
        }
    }
}

/// Credential persistence configuration
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct AuthConfig {
    /// Token store backend
    #[serde(default)]
    pub token_store: TokenStoreKind,

    /// Explicit token file path for the `file` store
    #[serde(default)]
    pub token_file: Option<PathBuf>,
}

/// Logging configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LoggingConfig {
    /// Log level (trace, debug, info, warn, error)
    #[serde(default = "default_log_level")]
    pub level: String,

    /// Enable JSON-formatted logs
    #[serde(default)]
    pub json_format: bool,

    /// Log file path (if None, STDERR only)
    #[serde(default)]
    pub file_path: Option<PathBuf>,
}

fn default_log_level() -> String {
    "info".to_string()
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: default_log_level(),
            json_format: false,
            file_path: None,
        }
    }
}

impl Config {
    /// Load configuration from file with environment and CLI overrides
    ///
    /// # Arguments
    ///
    /// * `path` - Path to configuration file
    /// * `cli` - CLI arguments for overrides
    ///
    /// # Returns
    ///
    /// Returns the loaded and merged configuration
    ///
    /// # Errors
    ///
    /// Returns error if the file exists but cannot be read or parsed
    pub fn load(path: &str, cli: &crate::cli::Cli) -> Result<Self> {
        let mut config = if Path::new(path).exists() {
            Self::from_file(path)?
        } else {
            tracing::warn!("Config file not found at {}, using defaults", path);
            Self::default()
        };

        config.apply_env_vars();
        config.apply_cli_overrides(cli);

        Ok(config)
    }

    fn from_file(path: &str) -> Result<Self> {
        let contents = std::fs::read_to_string(path)
            .map_err(|e| StudyflowError::Config(format!("Failed to read config file: {}", e)))?;
        serde_yaml::from_str(&contents)
            .map_err(|e| StudyflowError::Config(format!("Failed to parse config: {}", e)).into())
    }

    fn apply_env_vars(&mut self) {
        if let Ok(api_url) = std::env::var("STUDYFLOW_API_URL") {
            self.server.api_url = api_url;
        }

        if let Ok(socket_url) = std::env::var("STUDYFLOW_SOCKET_URL") {
            self.server.socket_url = Some(socket_url);
        }

        if let Ok(timeout) = std::env::var("STUDYFLOW_REQUEST_TIMEOUT_SECONDS") {
            if let Ok(value) = timeout.parse() {
                self.server.request_timeout_seconds = value;
            } else {
                tracing::warn!("Invalid STUDYFLOW_REQUEST_TIMEOUT_SECONDS: {}", timeout);
            }
        }

        if let Ok(store) = std::env::var("STUDYFLOW_TOKEN_STORE") {
            match TokenStoreKind::parse_str(&store) {
                Some(kind) => self.auth.token_store = kind,
                None => tracing::warn!("Invalid STUDYFLOW_TOKEN_STORE: {}", store),
            }
        }

        if let Ok(timeout) = std::env::var("STUDYFLOW_TYPING_TIMEOUT_MS") {
            if let Ok(value) = timeout.parse() {
                self.chat.typing_timeout_ms = value;
            } else {
                tracing::warn!("Invalid STUDYFLOW_TYPING_TIMEOUT_MS: {}", timeout);
            }
        }

        if let Ok(level) = std::env::var("STUDYFLOW_LOG_LEVEL") {
            self.logging.level = level;
        }

        if let Ok(json) = std::env::var("STUDYFLOW_JSON_LOGS") {
            match json.to_lowercase().as_str() {
                "1" | "true" | "yes" => self.logging.json_format = true,
                "0" | "false" | "no" => self.logging.json_format = false,
                _ => tracing::warn!("Invalid STUDYFLOW_JSON_LOGS: {}", json),
            }
        }
    }

    fn apply_cli_overrides(&mut self, cli: &crate::cli::Cli) {
        if let Some(api_url) = &cli.api_url {
            self.server.api_url = api_url.clone();
        }

        if cli.verbose {
            self.logging.level = "debug".to_string();
            tracing::debug!("Verbose mode enabled");
        }
    }

    /// Validate the configuration
    ///
    /// # Errors
    ///
    /// Returns [`StudyflowError::Config`] if a URL is not http(s), a timeout
    /// is zero, or the history limit is zero.
    pub fn validate(&self) -> Result<()> {
        if self.server.api_url.trim().is_empty() {
            return Err(StudyflowError::Config("server.api_url cannot be empty".to_string()).into());
        }

        validate_http_url("server.api_url", &self.server.api_url)?;
        if let Some(socket_url) = &self.server.socket_url {
            validate_http_url("server.socket_url", socket_url)?;
        }

        if self.server.request_timeout_seconds == 0 {
            return Err(StudyflowError::Config(
                "server.request_timeout_seconds must be greater than 0".to_string(),
            )
            .into());
        }

        if self.chat.typing_timeout_ms == 0 {
            return Err(StudyflowError::Config(
                "chat.typing_timeout_ms must be greater than 0".to_string(),
            )
            .into());
        }

        if self.chat.history_limit == 0 {
            return Err(StudyflowError::Config(
                "chat.history_limit must be greater than 0".to_string(),
            )
            .into());
        }

        Ok(())
    }
}

fn validate_http_url(field: &str, value: &str) -> Result<()> {
    let parsed = url::Url::parse(value)
        .map_err(|e| StudyflowError::Config(format!("Invalid {}: {} ({})", field, value, e)))?;
    match parsed.scheme() {
        "http" | "https" => Ok(()),
        other => Err(StudyflowError::Config(format!(
            "Invalid {} scheme: {}. Must be one of: http, https",
            field, other
        ))
        .into()),
    }
}
