//! Subform Common Library
//!
//! Configuration, form vocabulary and field validation shared by the
//! subscription form test suite.

pub mod config;
pub mod error;
pub mod types;
pub mod validator;

// Re-export commonly used types
pub use config::FormConfig;
pub use error::{Error, Result};
pub use types::*;
pub use validator::{is_valid_email, FieldValidator};

/// Subform version
pub const VERSION: &str = env!("CARGO_PKG_VERSION");
