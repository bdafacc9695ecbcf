//! Error types for the form vocabulary and configuration

use thiserror::Error;

/// Result type alias using the common Error
pub type Result<T> = std::result::Result<T, Error>;

/// Errors raised while loading configuration or parsing form options
#[derive(Error, Debug)]
pub enum Error {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("TOML error: {0}")]
    Toml(#[from] toml::de::Error),

    #[error("Invalid configuration: {0}")]
    InvalidConfig(String),

    #[error("Unknown {field} option: {value}")]
    UnknownOption { field: String, value: String },
}

impl Error {
    pub fn unknown_option(field: impl Into<String>, value: impl Into<String>) -> Self {
        Self::UnknownOption {
            field: field.into(),
            value: value.into(),
        }
    }
}
