//! Subscription form page object
//!
//! [`SubscriptionForm`] turns intention-level steps ("choose a purpose",
//! "submit") into driver calls against one loaded page. Locators, option
//! tables and timeouts come from the injected [`FormConfig`].
//!
//! Operations propagate driver failures unchanged, with two exceptions:
//! bounded visibility waits report [`E2eError::ElementNotVisible`] naming the
//! field, and [`SubscriptionForm::is_submitted`] reads any failure as "not
//! submitted".

use std::sync::Arc;
use std::time::Duration;

use subform_common::{
    FieldValidator, FormConfig, FormElement, FormField, FormInput, Purpose, WithdrawalMethod,
};
use tokio::time::Instant;
use tracing::debug;

use crate::driver::{BrowserDriver, CheckOptions, WaitState};
use crate::error::{E2eError, E2eResult};

const SUBMISSION_POLL: Duration = Duration::from_millis(250);

/// Page object for the subscription form
#[derive(Clone)]
pub struct SubscriptionForm {
    driver: Arc<dyn BrowserDriver>,
    config: Arc<FormConfig>,
    validator: FieldValidator,
}

impl SubscriptionForm {
    pub fn new(driver: Arc<dyn BrowserDriver>, config: Arc<FormConfig>) -> Self {
        let validator = FieldValidator::new(config.rules);
        Self {
            driver,
            config,
            validator,
        }
    }

    pub fn config(&self) -> &FormConfig {
        &self.config
    }

    /// Validator using the same thresholds as this form
    pub fn validator(&self) -> &FieldValidator {
        &self.validator
    }

    fn field(&self, element: FormElement) -> E2eResult<&FormField> {
        self.config.field(element).ok_or_else(|| unmapped(element))
    }

    fn purpose_field(&self, purpose: Purpose) -> E2eResult<&FormField> {
        self.config
            .purpose
            .get(purpose)
            .ok_or_else(|| E2eError::unknown_option("purpose", purpose.as_str()))
    }

    fn withdrawal_field(&self, method: WithdrawalMethod) -> E2eResult<&FormField> {
        self.config
            .withdrawal
            .get(method)
            .ok_or_else(|| E2eError::unknown_option("withdrawal", method.as_str()))
    }

    /// Wait for `field` to render, reporting expiry against its label
    async fn wait_visible(&self, field: &FormField) -> E2eResult<()> {
        let timeout = self.config.visibility_timeout();
        match self
            .driver
            .wait_for(&field.locator, WaitState::Visible, timeout)
            .await
        {
            Err(E2eError::Timeout(_)) => Err(E2eError::ElementNotVisible {
                label: field.label.clone(),
                timeout_ms: timeout.as_millis() as u64,
            }),
            other => other,
        }
    }

    /// Load the form page
    pub async fn open(&self) -> E2eResult<()> {
        debug!("Opening {}", self.config.url);
        self.driver.navigate(&self.config.url).await
    }

    /// Bring the form into view and wait until it renders
    pub async fn scroll_to_form(&self) -> E2eResult<()> {
        let name = self.field(FormElement::Name)?;
        self.driver.scroll_into_view(&name.locator).await?;
        self.wait_visible(name).await
    }

    /// Replace the content of a text input or textarea
    pub async fn fill(&self, element: FormElement, text: &str) -> E2eResult<()> {
        let field = self.field(element)?;
        debug!("Filling {} ({} chars)", field.label, text.chars().count());
        self.driver.fill(&field.locator, text).await
    }

    /// Pick one value of a dropdown
    pub async fn select_from_list(&self, element: FormElement, value: &str) -> E2eResult<()> {
        let field = self.field(element)?;
        let options = self
            .config
            .options(element)
            .ok_or_else(|| E2eError::Config(format!("\"{}\" is not a dropdown", field.label)))?;
        if !options.iter().any(|o| o == value) {
            return Err(E2eError::unknown_option(field.label.as_str(), value));
        }
        debug!("Selecting {} = {}", field.label, value);
        self.driver.select_option(&field.locator, value).await
    }

    /// Check the radio button bound to `purpose`
    pub async fn choose(&self, purpose: Purpose) -> E2eResult<()> {
        let field = self.purpose_field(purpose)?;
        debug!("Choosing purpose {}", purpose);
        self.driver
            .check(&field.locator, CheckOptions::default())
            .await
    }

    /// Make sure every listed withdrawal option ends up checked.
    ///
    /// All options are resolved before the first interaction. Options that are
    /// already checked are left alone so a previous selection is never
    /// toggled off; options not listed are not touched.
    pub async fn toggle(&self, options: &[WithdrawalMethod]) -> E2eResult<()> {
        let fields = options
            .iter()
            .map(|m| self.withdrawal_field(*m))
            .collect::<E2eResult<Vec<_>>>()?;

        for field in fields {
            self.wait_visible(field).await?;
            if self.driver.is_checked(&field.locator).await? {
                debug!("{} already checked", field.label);
                continue;
            }
            debug!("Checking {}", field.label);
            self.driver.check(&field.locator, CheckOptions::forced()).await?;
        }
        Ok(())
    }

    /// Press the submit button. The outcome is not awaited.
    pub async fn submit(&self) -> E2eResult<()> {
        let submit = self.field(FormElement::Submit)?;
        self.wait_visible(submit).await?;
        debug!("Submitting form");
        self.driver.click(&submit.locator).await
    }

    /// Fill every field, one step after another
    pub async fn fill_all(&self, input: &FormInput) -> E2eResult<()> {
        self.fill(FormElement::Name, &input.name).await?;
        self.fill(FormElement::Email, &input.email).await?;
        self.select_from_list(FormElement::Service, &input.service).await?;
        self.choose(input.purpose).await?;
        self.toggle(&input.withdrawal).await?;
        self.fill(FormElement::Message, &input.message).await
    }

    /// Current visibility, without waiting
    pub async fn is_visible(&self, element: FormElement) -> E2eResult<bool> {
        let field = self.field(element)?;
        self.driver.is_visible(&field.locator).await
    }

    pub async fn is_name_input_visible(&self) -> E2eResult<bool> {
        self.is_visible(FormElement::Name).await
    }

    pub async fn is_email_input_visible(&self) -> E2eResult<bool> {
        self.is_visible(FormElement::Email).await
    }

    pub async fn is_service_select_visible(&self) -> E2eResult<bool> {
        self.is_visible(FormElement::Service).await
    }

    pub async fn is_purpose_business_visible(&self) -> E2eResult<bool> {
        self.is_visible(FormElement::PurposeBusiness).await
    }

    pub async fn is_purpose_personal_visible(&self) -> E2eResult<bool> {
        self.is_visible(FormElement::PurposePersonal).await
    }

    pub async fn is_message_textarea_visible(&self) -> E2eResult<bool> {
        self.is_visible(FormElement::Message).await
    }

    pub async fn is_submit_button_visible(&self) -> E2eResult<bool> {
        self.is_visible(FormElement::Submit).await
    }

    pub async fn is_withdraw_cash_visible(&self) -> E2eResult<bool> {
        self.is_visible(FormElement::WithdrawCash).await
    }

    pub async fn is_withdraw_card_visible(&self) -> E2eResult<bool> {
        self.is_visible(FormElement::WithdrawCard).await
    }

    pub async fn is_withdraw_crypto_visible(&self) -> E2eResult<bool> {
        self.is_visible(FormElement::WithdrawCrypto).await
    }

    pub async fn is_name_input_empty(&self) -> E2eResult<bool> {
        let field = self.field(FormElement::Name)?;
        Ok(self.driver.input_value(&field.locator).await?.is_empty())
    }

    pub async fn is_email_input_empty(&self) -> E2eResult<bool> {
        let field = self.field(FormElement::Email)?;
        Ok(self.driver.input_value(&field.locator).await?.is_empty())
    }

    /// The dropdown holds anything other than its "nothing chosen" sentinel
    pub async fn is_service_selected(&self) -> E2eResult<bool> {
        let field = self.field(FormElement::Service)?;
        let value = self.driver.input_value(&field.locator).await?;
        Ok(value != self.config.service.default)
    }

    /// Either purpose radio button is checked
    pub async fn is_purpose_selected(&self) -> E2eResult<bool> {
        let mut selected = false;
        for purpose in Purpose::ALL {
            if let Some(field) = self.config.purpose.get(purpose) {
                selected |= self.driver.is_checked(&field.locator).await?;
            }
        }
        Ok(selected)
    }

    pub async fn is_withdrawal_selected(&self, method: WithdrawalMethod) -> E2eResult<bool> {
        let field = self.withdrawal_field(method)?;
        self.driver.is_checked(&field.locator).await
    }

    /// Whether the status region reports a successful submission.
    ///
    /// A missing region or any driver failure while reading it counts as
    /// "no evidence of submission" and yields `false`.
    pub async fn is_submitted(&self) -> bool {
        match self.read_submission_status().await {
            Ok(submitted) => submitted,
            Err(e) => {
                debug!("Submission status unreadable, treating as not submitted: {}", e);
                false
            }
        }
    }

    async fn read_submission_status(&self) -> E2eResult<bool> {
        let status = self.field(FormElement::Status)?;
        if !self.driver.is_visible(&status.locator).await? {
            return Ok(false);
        }
        let text = self.driver.text_content(&status.locator).await?;
        Ok(text.map_or(false, |t| t.contains(&self.config.submission.success_marker)))
    }

    /// Poll [`Self::is_submitted`] until it reads `true` or `timeout` passes
    pub async fn wait_for_submission(&self, timeout: Duration) -> bool {
        let deadline = Instant::now() + timeout;
        loop {
            if self.is_submitted().await {
                return true;
            }
            let now = Instant::now();
            if now >= deadline {
                return false;
            }
            tokio::time::sleep(SUBMISSION_POLL.min(deadline - now)).await;
        }
    }
}

fn unmapped(element: FormElement) -> E2eError {
    match element {
        FormElement::PurposeBusiness => E2eError::unknown_option("purpose", Purpose::Business.as_str()),
        FormElement::PurposePersonal => E2eError::unknown_option("purpose", Purpose::Personal.as_str()),
        FormElement::WithdrawCash => {
            E2eError::unknown_option("withdrawal", WithdrawalMethod::Cash.as_str())
        }
        FormElement::WithdrawCard => {
            E2eError::unknown_option("withdrawal", WithdrawalMethod::Card.as_str())
        }
        FormElement::WithdrawCrypto => {
            E2eError::unknown_option("withdrawal", WithdrawalMethod::Cryptocurrency.as_str())
        }
        other => E2eError::Config(format!("no locator configured for {:?}", other)),
    }
}
