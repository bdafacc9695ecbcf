//! Error types for E2E testing

use thiserror::Error;

#[derive(Error, Debug)]
pub enum E2eError {
    #[error("Unknown {field} option: {value}")]
    UnknownOption { field: String, value: String },

    #[error("Element \"{label}\" not visible after {timeout_ms} ms")]
    ElementNotVisible { label: String, timeout_ms: u64 },

    #[error("Timeout waiting for: {0}")]
    Timeout(String),

    #[error("Driver error: {0}")]
    Driver(String),

    #[error("Playwright not found. Install with: npx playwright install")]
    PlaywrightNotFound,

    #[error("Playwright error: {0}")]
    Playwright(String),

    #[error("Target page unreachable after {0} attempts")]
    TargetUnreachable(usize),

    #[error("Fixture parse error: {0}")]
    FixtureParse(String),

    #[error("Configuration error: {0}")]
    Config(String),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("YAML error: {0}")]
    Yaml(#[from] serde_yaml::Error),

    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),
}

impl E2eError {
    pub fn unknown_option(field: impl Into<String>, value: impl Into<String>) -> Self {
        Self::UnknownOption {
            field: field.into(),
            value: value.into(),
        }
    }
}

impl From<subform_common::Error> for E2eError {
    fn from(err: subform_common::Error) -> Self {
        match err {
            subform_common::Error::UnknownOption { field, value } => {
                E2eError::UnknownOption { field, value }
            }
            subform_common::Error::Io(e) => E2eError::Io(e),
            other => E2eError::Config(other.to_string()),
        }
    }
}

pub type E2eResult<T> = Result<T, E2eError>;
