// src/errors.rs

//! Crate-wide error aliases and helpers.

use std::path::PathBuf;

use thiserror::Error;

#[derive(Error, Debug)]
pub enum DirpubError {
    #[error("Configuration error: {0}")]
    ConfigError(String),

    #[error("Path {0:?} is not a directory")]
    NotADirectory(PathBuf),

    #[error("IO error: {0}")]
    IoError(#[from] std::io::Error),

    #[error("Unable to read file {path:?}: {reason}")]
    ReadFailed { path: PathBuf, reason: String },

    #[error("Unable to connect to queue server: {0}")]
    ConnectionError(String),

    #[error("Unable to send message to the queue: {0}")]
    SendError(String),

    #[error("Unable to move file from {from:?} to {to:?}: {reason}")]
    MoveFailed {
        from: PathBuf,
        to: PathBuf,
        reason: String,
    },

    #[error("TOML parsing error: {0}")]
    TomlError(#[from] toml::de::Error),

    #[error(transparent)]
    Other(#[from] anyhow::Error),
}

pub use anyhow::Error;
pub type Result<T> = std::result::Result<T, DirpubError>;
