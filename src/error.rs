//! Error types for the ticker and configuration layers.
//!
//! Errors raised by the caller's work never pass through these types.

use std::path::PathBuf;
use std::time::Duration;
use thiserror::Error;

/// Errors from the background ticker lifecycle.
#[derive(Error, Debug)]
pub enum TickerError {
    #[error("Ticker was already started")]
    AlreadyStarted,

    #[error("Ticker did not stop within {waited:?}")]
    StopTimeout { waited: Duration },

    #[error("Ticker hook panicked")]
    HookPanicked,

    #[error("Failed to spawn ticker thread: {0}")]
    Spawn(#[from] std::io::Error),
}

/// Errors from loading or saving settings.
#[derive(Error, Debug)]
pub enum ConfigError {
    #[error("Failed to load config: {0}")]
    Load(#[from] Box<figment::Error>),

    #[error("Failed to serialize config: {0}")]
    Serialize(#[from] toml::ser::Error),

    #[error("Cannot write config to {path}: {source}")]
    Write {
        path: PathBuf,
        source: std::io::Error,
    },
}

pub type TickerResult<T> = Result<T, TickerError>;
pub type ConfigResult<T> = Result<T, ConfigError>;
