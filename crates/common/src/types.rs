//! Form vocabulary: elements, option enumerations and input bundles

use serde::{Deserialize, Serialize};
use std::str::FromStr;

use crate::error::Error;

/// One interactive element of the form, addressed by a stable locator
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FormField {
    /// Opaque selector handed to the browser driver
    pub locator: String,

    /// Display name used in assertion messages
    pub label: String,
}

impl FormField {
    pub fn new(locator: impl Into<String>, label: impl Into<String>) -> Self {
        Self {
            locator: locator.into(),
            label: label.into(),
        }
    }
}

/// Every element of the subscription form the page object knows about
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum FormElement {
    Name,
    Email,
    Service,
    PurposeBusiness,
    PurposePersonal,
    WithdrawCash,
    WithdrawCard,
    WithdrawCrypto,
    Message,
    Submit,
    Status,
}

impl FormElement {
    /// Elements a user can see and operate before submitting
    pub const INTERACTIVE: [FormElement; 10] = [
        FormElement::Name,
        FormElement::Email,
        FormElement::Service,
        FormElement::PurposeBusiness,
        FormElement::PurposePersonal,
        FormElement::Message,
        FormElement::Submit,
        FormElement::WithdrawCash,
        FormElement::WithdrawCard,
        FormElement::WithdrawCrypto,
    ];
}

/// Purpose of the request, a single-choice radio group
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(try_from = "String")]
pub enum Purpose {
    Business,
    Personal,
}

impl Purpose {
    pub const ALL: [Purpose; 2] = [Purpose::Business, Purpose::Personal];

    pub fn as_str(&self) -> &'static str {
        match self {
            Purpose::Business => "Business",
            Purpose::Personal => "Personal",
        }
    }

    pub fn element(&self) -> FormElement {
        match self {
            Purpose::Business => FormElement::PurposeBusiness,
            Purpose::Personal => FormElement::PurposePersonal,
        }
    }
}

impl std::fmt::Display for Purpose {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Purpose {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Purpose::ALL
            .into_iter()
            .find(|p| p.as_str() == s)
            .ok_or_else(|| Error::unknown_option("purpose", s))
    }
}

impl TryFrom<String> for Purpose {
    type Error = Error;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        value.parse()
    }
}

/// Withdrawal method, one independent checkbox per option
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(try_from = "String")]
pub enum WithdrawalMethod {
    Cash,
    Card,
    Cryptocurrency,
}

impl WithdrawalMethod {
    pub const ALL: [WithdrawalMethod; 3] = [
        WithdrawalMethod::Cash,
        WithdrawalMethod::Card,
        WithdrawalMethod::Cryptocurrency,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            WithdrawalMethod::Cash => "Cash",
            WithdrawalMethod::Card => "Card",
            WithdrawalMethod::Cryptocurrency => "Cryptocurrency",
        }
    }

    pub fn element(&self) -> FormElement {
        match self {
            WithdrawalMethod::Cash => FormElement::WithdrawCash,
            WithdrawalMethod::Card => FormElement::WithdrawCard,
            WithdrawalMethod::Cryptocurrency => FormElement::WithdrawCrypto,
        }
    }
}

impl std::fmt::Display for WithdrawalMethod {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for WithdrawalMethod {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        WithdrawalMethod::ALL
            .into_iter()
            .find(|m| m.as_str() == s)
            .ok_or_else(|| Error::unknown_option("withdrawal", s))
    }
}

impl TryFrom<String> for WithdrawalMethod {
    type Error = Error;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        value.parse()
    }
}

/// Everything `fill_all` writes into the form, in submission order
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FormInput {
    pub name: String,
    pub email: String,
    pub service: String,
    pub purpose: Purpose,
    #[serde(default)]
    pub withdrawal: Vec<WithdrawalMethod>,
    pub message: String,
}
