//! Field validation predicates
//!
//! These classify raw input strings the same way the form does, without a
//! browser. They are smoke checks for test fixtures, not full validation: the
//! email rule in particular accepts anything shaped like `local@domain.tld`.

use once_cell::sync::Lazy;
use regex::Regex;

use crate::config::ValidationRules;

// Browser whitespace: Unicode White_Space without NEL, plus the byte order mark
static EMAIL_RE: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"^[^@\x{FEFF}[\s--\x{85}]]+@[^@\x{FEFF}[\s--\x{85}]]+\.[^@\x{FEFF}[\s--\x{85}]]+$")
        .expect("valid email regex")
});

fn is_browser_whitespace(c: char) -> bool {
    c == '\u{FEFF}' || (c.is_whitespace() && c != '\u{85}')
}

/// Length as the page's script measures it, in UTF-16 code units
fn text_length(s: &str) -> usize {
    s.encode_utf16().count()
}

/// `true` if `email` looks like `local@domain.tld` with no whitespace
pub fn is_valid_email(email: &str) -> bool {
    EMAIL_RE.is_match(email)
}

/// Length-based checks parameterised by the configured thresholds
#[derive(Debug, Clone, Copy, Default)]
pub struct FieldValidator {
    rules: ValidationRules,
}

impl FieldValidator {
    pub fn new(rules: ValidationRules) -> Self {
        Self { rules }
    }

    pub fn is_valid_email(&self, email: &str) -> bool {
        is_valid_email(email)
    }

    /// Long enough, and not blank once trimmed.
    ///
    /// The length check runs on the untrimmed value, so two spaces pass it
    /// and are only rejected by the blank check.
    pub fn is_valid_name(&self, name: &str) -> bool {
        text_length(name) >= self.rules.name_min_length
            && !name.chars().all(is_browser_whitespace)
    }

    /// Long enough, whitespace included
    pub fn is_valid_message(&self, message: &str) -> bool {
        text_length(message) >= self.rules.message_min_length
    }
}
