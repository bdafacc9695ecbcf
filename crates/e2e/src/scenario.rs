//! Declarative YAML scenarios
//!
//! A scenario pairs one [`FormInput`] with the outcome the form should show
//! for it. Every scenario runs through the same sequence of steps in
//! [`execute`]; what differs is the data and the expectations.

use std::path::Path;
use std::time::Instant;

use serde::{Deserialize, Serialize};
use subform_common::{FormElement, FormInput, WithdrawalMethod};
use tracing::{debug, info, warn};

use crate::error::{E2eError, E2eResult};
use crate::page::SubscriptionForm;

const BUILTIN_FIXTURES: &str = include_str!("../fixtures/subscription.yaml");

/// A complete scenario parsed from YAML
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Scenario {
    /// Unique name for this scenario
    pub name: String,

    /// Human-readable description
    #[serde(default)]
    pub description: String,

    /// Tags for filtering scenarios
    #[serde(default)]
    pub tags: Vec<String>,

    /// Values typed into the form
    pub input: FormInput,

    /// What the form and validator should report
    pub expect: Expectation,
}

/// Expected outcome of a scenario
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Expectation {
    pub name_valid: bool,
    pub email_valid: bool,
    pub message_valid: bool,

    /// Check that nothing is selected before the form is filled
    #[serde(default)]
    pub pristine_before_fill: bool,

    pub service_selected: bool,
    pub purpose_selected: bool,
    pub submitted: bool,
}

/// A fixture file: a list of scenarios
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ScenarioSet {
    pub scenarios: Vec<Scenario>,
}

impl ScenarioSet {
    /// The scenarios shipped with the crate
    pub fn builtin() -> E2eResult<Self> {
        Self::from_yaml(BUILTIN_FIXTURES)
    }

    /// Parse a fixture set from a YAML string
    pub fn from_yaml(yaml: &str) -> E2eResult<Self> {
        let set: Self = serde_yaml::from_str(yaml)?;
        set.validate()?;
        Ok(set)
    }

    /// Parse a fixture set from a YAML file
    pub fn from_file(path: &Path) -> E2eResult<Self> {
        let content = std::fs::read_to_string(path)?;
        Self::from_yaml(&content)
    }

    fn validate(&self) -> E2eResult<()> {
        for (i, scenario) in self.scenarios.iter().enumerate() {
            if scenario.name.trim().is_empty() {
                return Err(E2eError::FixtureParse(format!("scenario #{} has no name", i + 1)));
            }
            if self.scenarios[..i].iter().any(|s| s.name == scenario.name) {
                return Err(E2eError::FixtureParse(format!(
                    "duplicate scenario name: {}",
                    scenario.name
                )));
            }
        }
        Ok(())
    }

    pub fn find(&self, name: &str) -> Option<&Scenario> {
        self.scenarios.iter().find(|s| s.name == name)
    }

    /// Filter scenarios by tag
    pub fn filter_by_tag(&self, tag: &str) -> Vec<&Scenario> {
        self.scenarios
            .iter()
            .filter(|s| s.tags.iter().any(|t| t == tag))
            .collect()
    }
}

/// One assertion made while running a scenario
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Check {
    pub description: String,
    pub expected: bool,
    pub actual: bool,
}

impl Check {
    pub fn passed(&self) -> bool {
        self.expected == self.actual
    }
}

/// Result of running a single scenario
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ScenarioReport {
    pub name: String,
    pub success: bool,
    pub duration_ms: u64,
    pub checks: Vec<Check>,
    pub error: Option<String>,
}

impl ScenarioReport {
    /// A scenario that never got to run
    pub fn aborted(name: &str, error: &E2eError) -> Self {
        Self {
            name: name.to_string(),
            success: false,
            duration_ms: 0,
            checks: Vec::new(),
            error: Some(error.to_string()),
        }
    }

    pub fn failed_checks(&self) -> impl Iterator<Item = &Check> {
        self.checks.iter().filter(|c| !c.passed())
    }
}

#[derive(Default)]
struct Checks(Vec<Check>);

impl Checks {
    fn expect(&mut self, actual: bool, expected: bool, description: impl Into<String>) {
        let check = Check {
            description: description.into(),
            expected,
            actual,
        };
        if check.passed() {
            debug!("ok: {}", check.description);
        } else {
            warn!(
                "failed: {} (expected {}, got {})",
                check.description, check.expected, check.actual
            );
        }
        self.0.push(check);
    }
}

fn label(form: &SubscriptionForm, element: FormElement) -> String {
    form.config()
        .field(element)
        .map(|f| f.label.clone())
        .unwrap_or_else(|| format!("{:?}", element))
}

/// Run `scenario` against a form whose driver is not shared with anything else
pub async fn execute(form: &SubscriptionForm, scenario: &Scenario) -> ScenarioReport {
    let start = Instant::now();
    info!("Running scenario: {}", scenario.name);

    let mut checks = Checks::default();
    let outcome = run_steps(form, scenario, &mut checks).await;
    let checks = checks.0;

    let error = outcome.err().map(|e| e.to_string());
    let success = error.is_none() && checks.iter().all(Check::passed);

    ScenarioReport {
        name: scenario.name.clone(),
        success,
        duration_ms: start.elapsed().as_millis() as u64,
        checks,
        error,
    }
}

async fn run_steps(form: &SubscriptionForm, scenario: &Scenario, checks: &mut Checks) -> E2eResult<()> {
    let input = &scenario.input;
    let expect = &scenario.expect;
    let config = form.config();
    let withdrawal_options: Vec<WithdrawalMethod> = WithdrawalMethod::ALL
        .into_iter()
        .filter(|m| config.withdrawal.get(*m).is_some())
        .collect();

    form.open().await?;
    form.scroll_to_form().await?;

    for element in FormElement::INTERACTIVE {
        let visible = form.is_visible(element).await?;
        checks.expect(visible, true, format!("\"{}\" should be visible", label(form, element)));
    }

    if expect.pristine_before_fill {
        checks.expect(
            form.is_purpose_selected().await?,
            false,
            "no purpose should be selected before filling",
        );
        checks.expect(
            form.is_service_selected().await?,
            false,
            format!("\"{}\" should hold its default before filling", label(form, FormElement::Service)),
        );
        for method in &withdrawal_options {
            checks.expect(
                form.is_withdrawal_selected(*method).await?,
                false,
                format!("\"{}\" should be unchecked before filling", method),
            );
        }
    }

    form.fill_all(input).await?;

    let validator = form.validator();
    checks.expect(
        validator.is_valid_name(&input.name),
        expect.name_valid,
        format!("name {:?} validity", input.name),
    );
    checks.expect(
        validator.is_valid_email(&input.email),
        expect.email_valid,
        format!("email {:?} validity", input.email),
    );
    checks.expect(
        validator.is_valid_message(&input.message),
        expect.message_valid,
        format!("message {:?} validity", input.message),
    );

    checks.expect(
        form.is_purpose_selected().await?,
        expect.purpose_selected,
        format!("purpose \"{}\" selection", input.purpose),
    );
    checks.expect(
        form.is_service_selected().await?,
        expect.service_selected,
        format!("\"{}\" selection", label(form, FormElement::Service)),
    );
    for method in &withdrawal_options {
        let wanted = input.withdrawal.contains(method);
        checks.expect(
            form.is_withdrawal_selected(*method).await?,
            wanted,
            format!(
                "\"{}\" should be {}",
                method,
                if wanted { "checked" } else { "unchecked" }
            ),
        );
    }

    form.submit().await?;

    let submitted = if expect.submitted {
        form.wait_for_submission(config.submission_timeout()).await
    } else {
        form.is_submitted().await
    };
    checks.expect(submitted, expect.submitted, "form submission status");

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use subform_common::Purpose;

    #[test]
    fn test_builtin_fixtures() {
        let set = ScenarioSet::builtin().unwrap();
        assert_eq!(set.scenarios.len(), 2);

        let valid = set.find("valid-submission").unwrap();
        assert_eq!(valid.input.name, "Иван Тестов");
        assert_eq!(valid.input.purpose, Purpose::Business);
        assert_eq!(
            valid.input.withdrawal,
            vec![WithdrawalMethod::Cash, WithdrawalMethod::Card]
        );
        assert!(valid.expect.submitted);

        let invalid = set.find("invalid-submission").unwrap();
        assert_eq!(invalid.input.service, "A Service");
        assert!(invalid.input.withdrawal.is_empty());
        assert!(invalid.expect.pristine_before_fill);
        assert!(!invalid.expect.submitted);
    }

    #[test]
    fn test_filter_by_tag() {
        let set = ScenarioSet::builtin().unwrap();
        let names: Vec<&str> = set
            .filter_by_tag("negative")
            .iter()
            .map(|s| s.name.as_str())
            .collect();
        assert_eq!(names, vec!["invalid-submission"]);
        assert!(set.filter_by_tag("missing").is_empty());
    }

    #[test]
    fn test_unknown_option_in_fixture() {
        let yaml = r#"
scenarios:
  - name: bad-withdrawal
    input:
      name: Test
      email: a@b.c
      service: B Service
      purpose: Business
      withdrawal: [Wire]
      message: long enough message
    expect:
      name_valid: true
      email_valid: true
      message_valid: true
      service_selected: true
      purpose_selected: true
      submitted: true
"#;
        let err = ScenarioSet::from_yaml(yaml).unwrap_err();
        assert!(err.to_string().contains("Unknown withdrawal option: Wire"), "{}", err);
    }

    #[test]
    fn test_duplicate_names_rejected() {
        let set = ScenarioSet::builtin().unwrap();
        let mut scenarios = set.scenarios.clone();
        scenarios.push(set.scenarios[0].clone());
        let yaml = serde_yaml::to_string(&ScenarioSet { scenarios }).unwrap();

        assert!(matches!(
            ScenarioSet::from_yaml(&yaml),
            Err(E2eError::FixtureParse(_))
        ));
    }
}
