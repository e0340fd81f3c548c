//! Shared configuration for the kgprobe workspace.

pub mod config;

pub use config::{
    Config, ConfigSource, ConfigurationError, Connection, ConnectionEntry, LoggingSettings,
    PipelineSettings, ProbeSettings, Settings, SettingsError, VectorSettings, load_configuration,
    load_dotenv, mask_secret,
};
