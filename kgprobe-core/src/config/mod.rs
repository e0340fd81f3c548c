//! Configuration management for kgprobe.
//!
//! Connection settings (endpoints, providers, API keys) come from the process
//! environment only. Non-sensitive harness tuning comes from a TOML file.
//!
//! # Configuration Sources
//!
//! ## Connection (Environment Variables)
//! - `VECTOR_DB_URL`, `VECTOR_DB_KEY`, `VECTOR_DB_PROVIDER`
//! - `GRAPH_DATABASE_URL`, `GRAPH_DATABASE_PROVIDER`, `GRAPH_DATABASE_USERNAME`,
//!   `GRAPH_DATABASE_PASSWORD`, `GRAPH_DATABASE_NAME`
//! - `LLM_PROVIDER`, `LLM_MODEL`, `LLM_ENDPOINT`, `LLM_API_KEY`
//! - `EMBEDDING_ENDPOINT`, `EMBEDDING_MODEL`, `EMBEDDING_API_KEY`, `EMBEDDING_DIMENSIONS`
//!
//! A dotenv file is applied first when `KGPROBE_ENV_FILE` names one.
//!
//! ## Settings (TOML File)
//! Located at `~/.config/kgprobe/config.toml` (or `$KGPROBE_CONFIG_DIR/config.toml`):
//! ```toml
//! plan = "connection"
//!
//! [probe]
//! timeout_seconds = 30
//! dataset = "test_dataset"
//! question = "What is Cognee?"
//!
//! [vector]
//! test_collection = "test_cognee_collection"
//!
//! [logging]
//! level = "info"
//! ```

pub mod connection;
mod settings;

use std::path::PathBuf;

pub use connection::{Connection, ConnectionEntry, mask_secret};
pub use settings::{
    LoggingSettings, PipelineSettings, ProbeSettings, Settings, SettingsError, VectorSettings,
};

/// Env var naming an explicit dotenv file to load before reading the environment.
pub const ENV_FILE_VAR: &str = "KGPROBE_ENV_FILE";

/// Load `.env` from the working directory if it exists.
pub fn load_dotenv() {
    // Silently ignore errors (file might not exist)
    let _ = dotenvy::dotenv();
}

/// Errors raised while loading or validating configuration.
#[derive(Debug, thiserror::Error)]
pub enum ConfigurationError {
    #[error("configuration source not found: {}", .0.display())]
    SourceMissing(PathBuf),

    #[error("failed to read configuration source {}: {source}", path.display())]
    Dotenv {
        path: PathBuf,
        #[source]
        source: dotenvy::Error,
    },

    #[error("settings error: {0}")]
    Settings(#[from] SettingsError),

    #[error("missing required setting: {0}")]
    MissingValue(&'static str),

    #[error("invalid value for {key}: {reason}")]
    InvalidValue { key: &'static str, reason: String },
}

/// Where connection settings are read from.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ConfigSource {
    /// Process environment only.
    Environment,
    /// Apply `.env` from the working directory when present, then the environment.
    DefaultDotenv,
    /// Apply this dotenv file (it must exist), then the environment.
    DotenvFile(PathBuf),
}

impl ConfigSource {
    /// Pick the source from `KGPROBE_ENV_FILE`, defaulting to `.env` discovery.
    pub fn from_env() -> Self {
        match std::env::var(ENV_FILE_VAR) {
            Ok(path) if !path.trim().is_empty() => Self::DotenvFile(PathBuf::from(path.trim())),
            _ => Self::DefaultDotenv,
        }
    }

    fn apply(&self) -> Result<(), ConfigurationError> {
        match self {
            Self::Environment => Ok(()),
            Self::DefaultDotenv => {
                load_dotenv();
                Ok(())
            }
            Self::DotenvFile(path) => {
                if !path.exists() {
                    return Err(ConfigurationError::SourceMissing(path.clone()));
                }
                dotenvy::from_path(path).map_err(|source| ConfigurationError::Dotenv {
                    path: path.clone(),
                    source,
                })
            }
        }
    }
}

/// Combined configuration: connection values from env plus TOML settings.
#[derive(Debug, Clone, Default)]
pub struct Config {
    pub connection: Connection,
    pub settings: Settings,
}

impl Config {
    /// Build a config from the process environment without touching any file
    /// source. Settings that fail to load fall back to defaults and the error
    /// is handed back for the caller to report.
    pub fn from_process_env() -> (Self, Option<SettingsError>) {
        let (settings, err) = match Settings::load() {
            Ok(settings) => (settings, None),
            Err(err) => (Settings::default(), Some(err)),
        };
        let config = Self {
            connection: Connection::from_env(),
            settings,
        };
        (config, err)
    }

    /// Request timeout for raw endpoint probes.
    pub fn probe_timeout(&self) -> std::time::Duration {
        std::time::Duration::from_secs(self.settings.probe.timeout_seconds)
    }
}

/// Load configuration from `source`.
///
/// Missing connection keys are not an error here; they surface as `None` in
/// [`Connection`] and are reported downstream. Only an explicitly named source
/// that cannot be read, or an unparsable settings file, fails.
pub fn load_configuration(source: &ConfigSource) -> Result<Config, ConfigurationError> {
    source.apply()?;
    let connection = Connection::from_env();
    let settings = Settings::load()?;
    tracing::debug!(?source, "Configuration loaded");
    Ok(Config {
        connection,
        settings,
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn missing_dotenv_file_is_a_configuration_error() {
        let dir = tempfile::tempdir().unwrap();
        let source = ConfigSource::DotenvFile(dir.path().join("absent.env"));

        let err = load_configuration(&source).unwrap_err();
        assert!(matches!(err, ConfigurationError::SourceMissing(_)));
        assert!(err.to_string().contains("absent.env"));
    }

    #[test]
    fn environment_source_applies_nothing() {
        assert!(ConfigSource::Environment.apply().is_ok());
    }
}
