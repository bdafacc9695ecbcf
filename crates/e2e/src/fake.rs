//! In-memory subscription form
//!
//! [`FakePage`] renders the form described by a [`FormConfig`] without a
//! browser so the page object, scenarios and runner can be exercised offline.
//! It follows the same rules as the live page: the radio group is exclusive,
//! the select only accepts its listed options, hidden controls refuse
//! unforced interaction, and submitting a valid form shows the success marker
//! in the status region.
//!
//! Timing uses [`tokio::time`], so tests running with paused time can step
//! through delayed reveals deterministically.

use std::collections::{HashMap, HashSet};
use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use parking_lot::Mutex;
use subform_common::{FieldValidator, FormConfig, FormElement};
use tokio::time::Instant;

use crate::driver::{BrowserDriver, CheckOptions, WaitState};
use crate::error::{E2eError, E2eResult};
use crate::runner::DriverLauncher;

const POLL_INTERVAL: Duration = Duration::from_millis(25);

/// Text shown when the form refuses a submission
pub const REJECTION_TEXT: &str = "Проверьте правильность заполнения формы";

/// One call received by the fake, in arrival order
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum DriverCall {
    Navigate(String),
    Fill { locator: String, text: String },
    SelectOption { locator: String, value: String },
    Check { locator: String, force: bool },
    IsChecked(String),
    Click(String),
    IsVisible(String),
    TextContent(String),
    InputValue(String),
    WaitFor { locator: String, state: WaitState },
    ScrollIntoView(String),
}

impl DriverCall {
    /// Whether the call changes page state
    pub fn is_mutation(&self) -> bool {
        matches!(
            self,
            DriverCall::Fill { .. }
                | DriverCall::SelectOption { .. }
                | DriverCall::Check { .. }
                | DriverCall::Click(_)
        )
    }
}

#[derive(Debug, Clone)]
enum ElementKind {
    Text,
    Select { options: Vec<String> },
    Radio { group: &'static str },
    Checkbox,
    Button,
    Status,
}

#[derive(Debug, Clone)]
struct FakeElement {
    kind: ElementKind,
    value: String,
    checked: bool,
    text: Option<String>,
    visible: bool,
    reveal_at: Option<Instant>,
}

impl FakeElement {
    fn new(kind: ElementKind) -> Self {
        Self {
            kind,
            value: String::new(),
            checked: false,
            text: Some(String::new()),
            visible: true,
            reveal_at: None,
        }
    }

    fn is_visible(&self, now: Instant) -> bool {
        self.visible && self.reveal_at.map_or(true, |at| now >= at)
    }
}

#[derive(Debug, Default)]
struct PageState {
    url: Option<String>,
    elements: HashMap<String, FakeElement>,
    journal: Vec<DriverCall>,

    // Applied on every render
    reveal_delays: HashMap<String, Duration>,
    hidden: HashSet<String>,
    faults: HashSet<String>,
    reject_submissions: bool,
}

/// Simulated subscription form page
pub struct FakePage {
    config: FormConfig,
    validator: FieldValidator,
    state: Mutex<PageState>,
}

impl FakePage {
    /// A blank page; `navigate` to the configured URL renders the form
    pub fn new(config: FormConfig) -> Self {
        let validator = FieldValidator::new(config.rules);
        Self {
            config,
            validator,
            state: Mutex::new(PageState::default()),
        }
    }

    /// A page that already shows the form
    pub fn rendered(config: FormConfig) -> Self {
        let page = Self::new(config);
        {
            let mut state = page.state.lock();
            state.url = Some(page.config.url.clone());
            page.render(&mut state);
        }
        page
    }

    fn locator(&self, element: FormElement) -> String {
        self.config
            .field(element)
            .map(|f| f.locator.clone())
            .unwrap_or_default()
    }

    /// Render `element` only after `delay` has elapsed since navigation
    pub fn reveal_after(&self, element: FormElement, delay: Duration) {
        let locator = self.locator(element);
        let mut state = self.state.lock();
        if let Some(el) = state.elements.get_mut(&locator) {
            el.reveal_at = Some(Instant::now() + delay);
        }
        state.reveal_delays.insert(locator, delay);
    }

    /// Keep `element` hidden
    pub fn hide(&self, element: FormElement) {
        let locator = self.locator(element);
        let mut state = self.state.lock();
        if let Some(el) = state.elements.get_mut(&locator) {
            el.visible = false;
        }
        state.hidden.insert(locator);
    }

    /// Fail every call that targets `element`
    pub fn fail_on(&self, element: FormElement) {
        let locator = self.locator(element);
        self.state.lock().faults.insert(locator);
    }

    /// Refuse every submission regardless of the form contents
    pub fn reject_submissions(&self) {
        self.state.lock().reject_submissions = true;
    }

    /// Tick a control as if the user had done it
    pub fn set_checked(&self, element: FormElement, checked: bool) {
        let locator = self.locator(element);
        if let Some(el) = self.state.lock().elements.get_mut(&locator) {
            el.checked = checked;
        }
    }

    pub fn journal(&self) -> Vec<DriverCall> {
        self.state.lock().journal.clone()
    }

    pub fn clear_journal(&self) {
        self.state.lock().journal.clear();
    }

    /// Current checked state, `None` if the element is not rendered
    pub fn checked(&self, element: FormElement) -> Option<bool> {
        let locator = self.locator(element);
        self.state.lock().elements.get(&locator).map(|el| el.checked)
    }

    /// Current input value, `None` if the element is not rendered
    pub fn value(&self, element: FormElement) -> Option<String> {
        let locator = self.locator(element);
        self.state.lock().elements.get(&locator).map(|el| el.value.clone())
    }

    pub fn url(&self) -> Option<String> {
        self.state.lock().url.clone()
    }

    fn render(&self, state: &mut PageState) {
        let now = Instant::now();
        let config = &self.config;
        let mut elements = HashMap::new();

        for field in [&config.fields.name, &config.fields.email, &config.fields.message] {
            elements.insert(field.locator.clone(), FakeElement::new(ElementKind::Text));
        }

        let mut select = FakeElement::new(ElementKind::Select {
            options: config.service.options.clone(),
        });
        select.value = config.service.default.clone();
        elements.insert(config.fields.service.locator.clone(), select);

        for field in [&config.purpose.business, &config.purpose.personal]
            .into_iter()
            .flatten()
        {
            elements.insert(
                field.locator.clone(),
                FakeElement::new(ElementKind::Radio { group: "purpose" }),
            );
        }

        for field in [
            &config.withdrawal.cash,
            &config.withdrawal.card,
            &config.withdrawal.cryptocurrency,
        ]
        .into_iter()
        .flatten()
        {
            elements.insert(field.locator.clone(), FakeElement::new(ElementKind::Checkbox));
        }

        let mut submit = FakeElement::new(ElementKind::Button);
        submit.text = Some(config.fields.submit.label.clone());
        elements.insert(config.fields.submit.locator.clone(), submit);

        let mut status = FakeElement::new(ElementKind::Status);
        status.visible = false;
        elements.insert(config.fields.status.locator.clone(), status);

        for (locator, delay) in &state.reveal_delays {
            if let Some(el) = elements.get_mut(locator) {
                el.reveal_at = Some(now + *delay);
            }
        }
        for locator in &state.hidden {
            if let Some(el) = elements.get_mut(locator) {
                el.visible = false;
            }
        }

        state.elements = elements;
    }

    /// Journal the call and fail it if a fault targets the locator
    fn begin(&self, state: &mut PageState, call: DriverCall, locator: &str) -> E2eResult<()> {
        state.journal.push(call);
        if state.faults.contains(locator) {
            return Err(E2eError::Driver(format!("injected failure on {}", locator)));
        }
        Ok(())
    }

    fn submit(&self, state: &mut PageState) {
        let config = &self.config;
        let view: &PageState = state;
        let value = |locator: &str| {
            view.elements
                .get(locator)
                .map(|el| el.value.clone())
                .unwrap_or_default()
        };

        let purpose_chosen = [&config.purpose.business, &config.purpose.personal]
            .into_iter()
            .flatten()
            .any(|f| view.elements.get(&f.locator).map_or(false, |el| el.checked));

        let accepted = !view.reject_submissions
            && self.validator.is_valid_name(&value(&config.fields.name.locator))
            && self.validator.is_valid_email(&value(&config.fields.email.locator))
            && self.validator.is_valid_message(&value(&config.fields.message.locator))
            && value(&config.fields.service.locator) != config.service.default
            && purpose_chosen;

        if let Some(status) = state.elements.get_mut(&config.fields.status.locator) {
            status.visible = true;
            status.text = Some(if accepted {
                format!("{} успешно", config.submission.success_marker)
            } else {
                REJECTION_TEXT.to_string()
            });
        }
    }
}

fn missing(locator: &str) -> E2eError {
    E2eError::Driver(format!("no element matches {}", locator))
}

fn element<'a>(state: &'a mut PageState, locator: &str) -> E2eResult<&'a mut FakeElement> {
    state.elements.get_mut(locator).ok_or_else(|| missing(locator))
}

#[async_trait]
impl BrowserDriver for FakePage {
    async fn navigate(&self, url: &str) -> E2eResult<()> {
        let mut state = self.state.lock();
        state.journal.push(DriverCall::Navigate(url.to_string()));
        state.url = Some(url.to_string());
        if url == self.config.url {
            self.render(&mut state);
        } else {
            state.elements.clear();
        }
        Ok(())
    }

    async fn fill(&self, locator: &str, text: &str) -> E2eResult<()> {
        let mut state = self.state.lock();
        let call = DriverCall::Fill {
            locator: locator.to_string(),
            text: text.to_string(),
        };
        self.begin(&mut state, call, locator)?;

        let el = element(&mut state, locator)?;
        if !el.is_visible(Instant::now()) {
            return Err(E2eError::Driver(format!("{} is not visible", locator)));
        }
        match el.kind {
            ElementKind::Text => {
                el.value = text.to_string();
                Ok(())
            }
            _ => Err(E2eError::Driver(format!("{} is not a text input", locator))),
        }
    }

    async fn select_option(&self, locator: &str, value: &str) -> E2eResult<()> {
        let mut state = self.state.lock();
        let call = DriverCall::SelectOption {
            locator: locator.to_string(),
            value: value.to_string(),
        };
        self.begin(&mut state, call, locator)?;

        let el = element(&mut state, locator)?;
        match &el.kind {
            ElementKind::Select { options } if options.iter().any(|o| o == value) => {
                el.value = value.to_string();
                Ok(())
            }
            ElementKind::Select { .. } => Err(E2eError::Driver(format!(
                "{} has no option {}",
                locator, value
            ))),
            _ => Err(E2eError::Driver(format!("{} is not a select", locator))),
        }
    }

    async fn check(&self, locator: &str, options: CheckOptions) -> E2eResult<()> {
        let mut state = self.state.lock();
        let call = DriverCall::Check {
            locator: locator.to_string(),
            force: options.force,
        };
        self.begin(&mut state, call, locator)?;

        let el = element(&mut state, locator)?;
        if !options.force && !el.is_visible(Instant::now()) {
            return Err(E2eError::Driver(format!("{} is not visible", locator)));
        }
        let group = match el.kind {
            ElementKind::Checkbox => None,
            ElementKind::Radio { group } => Some(group),
            _ => return Err(E2eError::Driver(format!("{} is not a checkbox or radio", locator))),
        };
        el.checked = true;

        if let Some(group) = group {
            for (other, el) in state.elements.iter_mut() {
                let same_group = matches!(el.kind, ElementKind::Radio { group: g } if g == group);
                if same_group && other != locator {
                    el.checked = false;
                }
            }
        }
        Ok(())
    }

    async fn is_checked(&self, locator: &str) -> E2eResult<bool> {
        let mut state = self.state.lock();
        self.begin(&mut state, DriverCall::IsChecked(locator.to_string()), locator)?;

        let el = element(&mut state, locator)?;
        match el.kind {
            ElementKind::Checkbox | ElementKind::Radio { .. } => Ok(el.checked),
            _ => Err(E2eError::Driver(format!("{} is not a checkbox or radio", locator))),
        }
    }

    async fn click(&self, locator: &str) -> E2eResult<()> {
        let mut state = self.state.lock();
        self.begin(&mut state, DriverCall::Click(locator.to_string()), locator)?;

        let el = element(&mut state, locator)?;
        if !el.is_visible(Instant::now()) {
            return Err(E2eError::Driver(format!("{} is not visible", locator)));
        }
        if matches!(el.kind, ElementKind::Button) {
            self.submit(&mut state);
        }
        Ok(())
    }

    async fn is_visible(&self, locator: &str) -> E2eResult<bool> {
        let mut state = self.state.lock();
        self.begin(&mut state, DriverCall::IsVisible(locator.to_string()), locator)?;

        let now = Instant::now();
        Ok(state
            .elements
            .get(locator)
            .map_or(false, |el| el.is_visible(now)))
    }

    async fn text_content(&self, locator: &str) -> E2eResult<Option<String>> {
        let mut state = self.state.lock();
        self.begin(&mut state, DriverCall::TextContent(locator.to_string()), locator)?;

        Ok(element(&mut state, locator)?.text.clone())
    }

    async fn input_value(&self, locator: &str) -> E2eResult<String> {
        let mut state = self.state.lock();
        self.begin(&mut state, DriverCall::InputValue(locator.to_string()), locator)?;

        let el = element(&mut state, locator)?;
        match el.kind {
            ElementKind::Text | ElementKind::Select { .. } => Ok(el.value.clone()),
            _ => Err(E2eError::Driver(format!("{} is not an input", locator))),
        }
    }

    async fn wait_for(&self, locator: &str, state: WaitState, timeout: Duration) -> E2eResult<()> {
        {
            let mut page = self.state.lock();
            let call = DriverCall::WaitFor {
                locator: locator.to_string(),
                state,
            };
            self.begin(&mut page, call, locator)?;
        }

        let deadline = Instant::now() + timeout;
        loop {
            let now = Instant::now();
            let reached = {
                let page = self.state.lock();
                let el = page.elements.get(locator);
                match state {
                    WaitState::Visible => el.map_or(false, |el| el.is_visible(now)),
                    WaitState::Hidden => el.map_or(true, |el| !el.is_visible(now)),
                    WaitState::Attached => el.is_some(),
                    WaitState::Detached => el.is_none(),
                }
            };
            if reached {
                return Ok(());
            }
            if now >= deadline {
                return Err(E2eError::Timeout(format!(
                    "{} to be {} ({} ms)",
                    locator,
                    state.as_str(),
                    timeout.as_millis()
                )));
            }
            tokio::time::sleep(POLL_INTERVAL.min(deadline - now)).await;
        }
    }

    async fn scroll_into_view(&self, locator: &str) -> E2eResult<()> {
        let mut state = self.state.lock();
        self.begin(&mut state, DriverCall::ScrollIntoView(locator.to_string()), locator)?;
        element(&mut state, locator)?;
        Ok(())
    }
}

type PageSetup = Arc<dyn Fn(&FakePage) + Send + Sync>;

/// Launches a fresh [`FakePage`] per scenario
#[derive(Clone)]
pub struct FakeLauncher {
    config: FormConfig,
    setup: Option<PageSetup>,
    launched: Arc<Mutex<Vec<Arc<FakePage>>>>,
}

impl FakeLauncher {
    pub fn new(config: FormConfig) -> Self {
        Self {
            config,
            setup: None,
            launched: Arc::new(Mutex::new(Vec::new())),
        }
    }

    /// Run `setup` on every page before handing it out
    pub fn with_setup(mut self, setup: impl Fn(&FakePage) + Send + Sync + 'static) -> Self {
        self.setup = Some(Arc::new(setup));
        self
    }

    /// Pages handed out so far
    pub fn pages(&self) -> Vec<Arc<FakePage>> {
        self.launched.lock().clone()
    }
}

#[async_trait]
impl DriverLauncher for FakeLauncher {
    async fn launch(&self) -> E2eResult<Arc<dyn BrowserDriver>> {
        let page = Arc::new(FakePage::new(self.config.clone()));
        if let Some(setup) = &self.setup {
            setup(page.as_ref());
        }
        self.launched.lock().push(page.clone());
        Ok(page)
    }
}
