//! Common error types for the PVS tooling

use std::path::PathBuf;
use thiserror::Error;

/// Common result type for PVS operations
pub type Result<T> = std::result::Result<T, Error>;

/// Common error types across the PVS crates
///
/// Only conditions that abort a run live here. A subject with no README, no
/// mask directory or no cluster table is not an error; see [`crate::Outcome`].
#[derive(Error, Debug)]
pub enum Error {
    /// I/O operation error (wraps std::io::Error)
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    /// CSV read/write error (roster, cluster tables, reports)
    #[error("CSV error: {0}")]
    Csv(#[from] csv::Error),

    /// Configuration loading or validation error
    #[error("Configuration error: {0}")]
    Config(String),

    /// TOML parse error
    #[error("TOML parse error: {0}")]
    Toml(#[from] toml::de::Error),

    /// Required file or directory missing
    #[error("Not found: {0}")]
    NotFound(PathBuf),

    /// Invalid input data
    #[error("Invalid input: {0}")]
    InvalidInput(String),

    /// Internal error
    #[error("Internal error: {0}")]
    Internal(String),
}
