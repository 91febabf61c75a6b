//! Configuration for the PrepClass toolkit.
//!
//! Maps directly to `prepclass.toml`. Every section is optional and has
//! sensible defaults. The completion API key is deliberately NOT part of
//! this file: it is read from the environment at the binary boundary and
//! handed to the client as an explicit constructor argument.

use serde::{Deserialize, Serialize};

/// Top-level PrepClass configuration, loadable from TOML.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct PrepclassConfig {
    /// General settings.
    #[serde(default)]
    pub general: GeneralConfig,
    /// Completion service settings.
    #[serde(default)]
    pub llm: LlmConfig,
    /// Persistence / session store settings.
    #[serde(default)]
    pub persistence: PersistenceConfig,
}

impl PrepclassConfig {
    /// Load configuration from a TOML string.
    ///
    /// # Errors
    /// Returns [`crate::CoreError::Config`] if the TOML is invalid.
    pub fn from_toml(toml_str: &str) -> crate::error::Result<Self> {
        toml::from_str(toml_str).map_err(|e| crate::CoreError::Config(e.to_string()))
    }

    /// Load configuration from a TOML file.
    ///
    /// # Errors
    /// Returns an error if the file cannot be read or parsed.
    pub fn from_file(path: &std::path::Path) -> crate::error::Result<Self> {
        let content = std::fs::read_to_string(path)?;
        Self::from_toml(&content)
    }
}

// ---------------------------------------------------------------------------
// Sub-configs
// ---------------------------------------------------------------------------

/// General system settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct GeneralConfig {
    /// Log level: trace, debug, info, warn, error.
    #[serde(default = "default_log_level")]
    pub log_level: String,
}

impl Default for GeneralConfig {
    fn default() -> Self {
        Self {
            log_level: "info".to_string(),
        }
    }
}

/// Completion service configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LlmConfig {
    /// Base URL of the OpenAI-compatible API.
    #[serde(default = "default_base_url")]
    pub base_url: String,
    /// Model identifier sent with every request.
    #[serde(default = "default_model")]
    pub model: String,
    /// Hard timeout for any completion call in milliseconds.
    #[serde(default = "default_60000")]
    pub request_timeout_ms: u64,
    /// Max retries for transient (network/timeout) failures.
    /// Auth and rate-limit failures are never retried.
    #[serde(default)]
    pub max_retries: u32,
}

impl Default for LlmConfig {
    fn default() -> Self {
        Self {
            base_url: "https://api.openai.com".to_string(),
            model: "gpt-4o".to_string(),
            request_timeout_ms: 60_000,
            max_retries: 0,
        }
    }
}

/// Persistence / session store configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PersistenceConfig {
    /// Path to the SQLite database file.
    #[serde(default = "default_db_path")]
    pub db_path: String,
    /// Use WAL mode for concurrent reads.
    #[serde(default = "default_true")]
    pub wal_mode: bool,
    /// SQLite busy timeout in milliseconds.
    #[serde(default = "default_5000")]
    pub busy_timeout_ms: u32,
}

impl Default for PersistenceConfig {
    fn default() -> Self {
        Self {
            db_path: "prepclass.db".to_string(),
            wal_mode: true,
            busy_timeout_ms: 5000,
        }
    }
}

// ---------------------------------------------------------------------------
// Serde default helpers
// ---------------------------------------------------------------------------

fn default_true() -> bool { true }
fn default_log_level() -> String { "info".to_string() }
fn default_base_url() -> String { "https://api.openai.com".to_string() }
fn default_model() -> String { "gpt-4o".to_string() }
fn default_db_path() -> String { "prepclass.db".to_string() }
fn default_5000() -> u32 { 5000 }
fn default_60000() -> u64 { 60_000 }

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
