use std::path::PathBuf;
use thiserror::Error;

#[derive(Error, Debug)]
pub enum MacroscopeError {
    #[error("Configuration error: {0}")]
    Config(#[from] ConfigError),

    #[error("Storage error: {0}")]
    Storage(#[from] StorageError),
}

#[derive(Error, Debug)]
pub enum ConfigError {
    #[error("Failed to read config file '{path}': {source}")]
    ReadFile {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("Failed to parse config JSON: {0}")]
    ParseJson(#[from] serde_json::Error),

    #[error("Config validation failed: {message}")]
    Validation { message: String },

    #[error("Schema validation failed: {errors}")]
    SchemaValidation { errors: String },

    #[error("Invalid CVE pattern '{id}': {reason}")]
    InvalidPattern { id: String, reason: String },

    #[error("Invalid signature rule '{id}': {reason}")]
    InvalidRule { id: String, reason: String },

    #[error("Failed to read CVE feed '{path}': {source}")]
    ReadFeed {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
}

#[derive(Error, Debug)]
pub enum StorageError {
    #[error("Failed to create directory '{path}': {source}")]
    CreateDirectory {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("Output path '{0}' is not a directory")]
    NotADirectory(PathBuf),

    #[error("Failed to write file '{path}': {source}")]
    WriteFile {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
}

/// Failures inside an extractor. These never leave the pipeline: the
/// extractor boundary logs them and returns an empty payload list.
#[derive(Error, Debug)]
pub enum ExtractError {
    #[error(transparent)]
    Format(#[from] crate::formats::FormatError),
}

#[derive(Error, Debug)]
pub enum PluginError {
    #[error("unknown plugin '{0}'")]
    Unknown(String),

    #[error("plugin panicked: {0}")]
    Panicked(String),

    #[error("{0}")]
    Failed(String),
}

pub type Result<T> = std::result::Result<T, MacroscopeError>;
