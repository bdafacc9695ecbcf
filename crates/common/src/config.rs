//! Subscription form configuration
//!
//! Locators, option tables, validation thresholds and timeouts live in one
//! immutable [`FormConfig`]. The compiled-in [`Default`] describes the live
//! form; a TOML file may overlay any part of it.

use serde::{Deserialize, Serialize};
use std::path::Path;
use std::time::Duration;

use crate::error::{Error, Result};
use crate::types::{FormElement, FormField, Purpose, WithdrawalMethod};

/// Page under test
pub const DEFAULT_URL: &str = "https://qatest.datasub.com/";

/// Visible text of the submit button
pub const SUBMIT_BUTTON_TEXT: &str = "Request A Quote";

/// Status text shown once the form has been accepted
pub const SUCCESS_MARKER: &str = "Форма отправлена";

/// Service select value meaning "nothing chosen yet"
pub const DEFAULT_SERVICE: &str = "A Service";

/// Selector for a submit button carrying the given text
pub fn submit_locator(text: &str) -> String {
    format!(r#"button[type="submit"]:has-text("{}")"#, text)
}

/// Top-level form configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct FormConfig {
    /// Address of the page hosting the form
    pub url: String,

    /// Text inputs, select, button and status region
    pub fields: FieldLocators,

    /// Purpose radio buttons
    pub purpose: PurposeLocators,

    /// Withdrawal checkboxes
    pub withdrawal: WithdrawalLocators,

    /// Service dropdown options
    pub service: ServiceConfig,

    /// Field validation thresholds
    pub rules: ValidationRules,

    /// Submission detection
    pub submission: SubmissionConfig,

    /// Bounded waits
    pub timeouts: TimeoutConfig,
}

impl Default for FormConfig {
    fn default() -> Self {
        Self {
            url: DEFAULT_URL.to_string(),
            fields: FieldLocators::default(),
            purpose: PurposeLocators::default(),
            withdrawal: WithdrawalLocators::default(),
            service: ServiceConfig::default(),
            rules: ValidationRules::default(),
            submission: SubmissionConfig::default(),
            timeouts: TimeoutConfig::default(),
        }
    }
}

impl FormConfig {
    /// Parse a configuration overlay from TOML
    pub fn from_toml(content: &str) -> Result<Self> {
        let config: Self = toml::from_str(content)?;
        config.validate()?;
        Ok(config)
    }

    /// Load a configuration overlay from a TOML file
    pub fn from_file(path: &Path) -> Result<Self> {
        let content = std::fs::read_to_string(path)?;
        Self::from_toml(&content)
    }

    /// Check cross-field invariants
    pub fn validate(&self) -> Result<()> {
        if self.url.trim().is_empty() {
            return Err(Error::InvalidConfig("url must not be empty".to_string()));
        }
        if self.service.options.is_empty() {
            return Err(Error::InvalidConfig(
                "service.options must list at least one option".to_string(),
            ));
        }
        if !self.service.has_option(&self.service.default) {
            return Err(Error::InvalidConfig(format!(
                "service.default '{}' is not one of service.options",
                self.service.default
            )));
        }
        if self.timeouts.visibility_ms == 0 {
            return Err(Error::InvalidConfig(
                "timeouts.visibility_ms must be positive".to_string(),
            ));
        }
        Ok(())
    }

    /// Resolve an element to its field; option elements may be unmapped
    pub fn field(&self, element: FormElement) -> Option<&FormField> {
        match element {
            FormElement::Name => Some(&self.fields.name),
            FormElement::Email => Some(&self.fields.email),
            FormElement::Service => Some(&self.fields.service),
            FormElement::Message => Some(&self.fields.message),
            FormElement::Submit => Some(&self.fields.submit),
            FormElement::Status => Some(&self.fields.status),
            FormElement::PurposeBusiness => self.purpose.get(Purpose::Business),
            FormElement::PurposePersonal => self.purpose.get(Purpose::Personal),
            FormElement::WithdrawCash => self.withdrawal.get(WithdrawalMethod::Cash),
            FormElement::WithdrawCard => self.withdrawal.get(WithdrawalMethod::Card),
            FormElement::WithdrawCrypto => {
                self.withdrawal.get(WithdrawalMethod::Cryptocurrency)
            }
        }
    }

    /// Values a dropdown element offers, `None` for anything that is not a dropdown
    pub fn options(&self, element: FormElement) -> Option<&[String]> {
        match element {
            FormElement::Service => Some(&self.service.options),
            _ => None,
        }
    }

    pub fn visibility_timeout(&self) -> Duration {
        Duration::from_millis(self.timeouts.visibility_ms)
    }

    pub fn submission_timeout(&self) -> Duration {
        Duration::from_millis(self.timeouts.submission_ms)
    }
}

/// Locators for the single-instance elements
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct FieldLocators {
    pub name: FormField,
    pub email: FormField,
    pub service: FormField,
    pub message: FormField,
    pub submit: FormField,
    pub status: FormField,
}

impl Default for FieldLocators {
    fn default() -> Self {
        Self {
            name: FormField::new("#name", "Name"),
            email: FormField::new("#email", "Email"),
            service: FormField::new("#service", "Service"),
            message: FormField::new("#message", "Message"),
            submit: FormField::new(submit_locator(SUBMIT_BUTTON_TEXT), SUBMIT_BUTTON_TEXT),
            status: FormField::new("#formStatus", "Status"),
        }
    }
}

/// Purpose option to radio button mapping
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct PurposeLocators {
    pub business: Option<FormField>,
    pub personal: Option<FormField>,
}

impl PurposeLocators {
    pub fn get(&self, purpose: Purpose) -> Option<&FormField> {
        match purpose {
            Purpose::Business => self.business.as_ref(),
            Purpose::Personal => self.personal.as_ref(),
        }
    }
}

impl Default for PurposeLocators {
    fn default() -> Self {
        Self {
            business: Some(FormField::new("#purposeBusiness", "Business")),
            personal: Some(FormField::new("#purposePersonal", "Personal")),
        }
    }
}

/// Withdrawal option to checkbox mapping
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct WithdrawalLocators {
    pub cash: Option<FormField>,
    pub card: Option<FormField>,
    pub cryptocurrency: Option<FormField>,
}

impl WithdrawalLocators {
    pub fn get(&self, method: WithdrawalMethod) -> Option<&FormField> {
        match method {
            WithdrawalMethod::Cash => self.cash.as_ref(),
            WithdrawalMethod::Card => self.card.as_ref(),
            WithdrawalMethod::Cryptocurrency => self.cryptocurrency.as_ref(),
        }
    }
}

impl Default for WithdrawalLocators {
    fn default() -> Self {
        Self {
            cash: Some(FormField::new("#withdrawCash", "Cash")),
            card: Some(FormField::new("#withdrawCard", "Card")),
            cryptocurrency: Some(FormField::new("#withdrawCrypto", "Cryptocurrency")),
        }
    }
}

/// Service dropdown configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ServiceConfig {
    /// Values the dropdown offers
    pub options: Vec<String>,

    /// Sentinel value of an untouched dropdown
    pub default: String,
}

impl ServiceConfig {
    pub fn has_option(&self, value: &str) -> bool {
        self.options.iter().any(|o| o == value)
    }
}

impl Default for ServiceConfig {
    fn default() -> Self {
        Self {
            options: vec![
                DEFAULT_SERVICE.to_string(),
                "B Service".to_string(),
                "C Service".to_string(),
            ],
            default: DEFAULT_SERVICE.to_string(),
        }
    }
}

/// Minimum lengths, counted in characters
#[derive(Debug, Clone, Copy, Serialize, Deserialize)]
#[serde(default)]
pub struct ValidationRules {
    pub name_min_length: usize,
    pub message_min_length: usize,
}

impl Default for ValidationRules {
    fn default() -> Self {
        Self {
            name_min_length: 2,
            message_min_length: 10,
        }
    }
}

/// How a successful submission shows up on the page
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct SubmissionConfig {
    /// Substring of the status region text after a successful submit
    pub success_marker: String,
}

impl Default for SubmissionConfig {
    fn default() -> Self {
        Self {
            success_marker: SUCCESS_MARKER.to_string(),
        }
    }
}

/// Bounded waits, in milliseconds
#[derive(Debug, Clone, Copy, Serialize, Deserialize)]
#[serde(default)]
pub struct TimeoutConfig {
    /// Wait for a control to become visible before acting on it
    pub visibility_ms: u64,

    /// Wait for the status region to report success after submit
    pub submission_ms: u64,
}

impl Default for TimeoutConfig {
    fn default() -> Self {
        Self {
            visibility_ms: 5000,
            submission_ms: 10000,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_config_describes_live_form() {
        let config = FormConfig::default();
        config.validate().unwrap();

        assert_eq!(config.url, DEFAULT_URL);
        assert_eq!(config.rules.name_min_length, 2);
        assert_eq!(config.rules.message_min_length, 10);
        assert_eq!(
            config.fields.submit.locator,
            r#"button[type="submit"]:has-text("Request A Quote")"#
        );
        assert_eq!(config.visibility_timeout(), Duration::from_secs(5));
    }

    #[test]
    fn test_every_element_resolves_by_default() {
        let config = FormConfig::default();
        for element in FormElement::INTERACTIVE {
            assert!(config.field(element).is_some(), "{:?} has no locator", element);
        }
        assert_eq!(
            config.field(FormElement::WithdrawCrypto).map(|f| f.label.as_str()),
            Some("Cryptocurrency")
        );
    }

    #[test]
    fn test_only_the_service_element_has_options() {
        let config = FormConfig::default();
        assert_eq!(
            config.options(FormElement::Service).map(<[String]>::len),
            Some(3)
        );
        assert!(config.options(FormElement::Name).is_none());
        assert!(config.options(FormElement::PurposeBusiness).is_none());
    }

    #[test]
    fn test_toml_overlay_keeps_unspecified_defaults() {
        let config = FormConfig::from_toml(
            r##"
url = "http://127.0.0.1:8080/form"

[rules]
name_min_length = 3

[fields.name]
locator = "[data-testid='name']"
label = "Full name"
"##,
        )
        .unwrap();

        assert_eq!(config.url, "http://127.0.0.1:8080/form");
        assert_eq!(config.rules.name_min_length, 3);
        assert_eq!(config.rules.message_min_length, 10);
        assert_eq!(config.fields.name.label, "Full name");
        assert_eq!(config.fields.email.locator, "#email");
        assert_eq!(config.service.default, DEFAULT_SERVICE);
    }

    #[test]
    fn test_sentinel_must_be_an_option() {
        let err = FormConfig::from_toml(
            r#"
[service]
options = ["B Service"]
default = "A Service"
"#,
        )
        .unwrap_err();
        assert!(matches!(err, Error::InvalidConfig(_)));
    }

    #[test]
    fn test_unmapped_option_resolves_to_none() {
        let mut config = FormConfig::default();
        config.withdrawal.cryptocurrency = None;
        assert!(config.field(FormElement::WithdrawCrypto).is_none());
        assert!(config.field(FormElement::WithdrawCash).is_some());
    }
}
