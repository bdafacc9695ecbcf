//! Browser driver capability set
//!
//! The page object never talks to a browser directly. Everything it needs is
//! expressed through [`BrowserDriver`], which is implemented by the Playwright
//! bridge for live runs and by [`crate::fake::FakePage`] for offline tests.

use std::time::Duration;

use async_trait::async_trait;
use serde::{Deserialize, Serialize};

use crate::error::E2eResult;

/// Element state to wait for
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum WaitState {
    #[default]
    Visible,
    Hidden,
    Attached,
    Detached,
}

impl WaitState {
    pub fn as_str(&self) -> &'static str {
        match self {
            WaitState::Visible => "visible",
            WaitState::Hidden => "hidden",
            WaitState::Attached => "attached",
            WaitState::Detached => "detached",
        }
    }
}

/// Options for checking a checkbox or radio button
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct CheckOptions {
    /// Skip actionability checks (e.g. a custom control overlaying the input)
    pub force: bool,
}

impl CheckOptions {
    pub fn forced() -> Self {
        Self { force: true }
    }
}

/// Operations against one loaded page.
///
/// Every call may suspend while the browser works. Locators are opaque
/// selector strings. `is_visible` answers for the current render without
/// waiting and reports `false` for elements that do not exist; a `wait_for`
/// that runs out of time fails with [`crate::E2eError::Timeout`].
#[async_trait]
pub trait BrowserDriver: Send + Sync {
    async fn navigate(&self, url: &str) -> E2eResult<()>;

    async fn fill(&self, locator: &str, text: &str) -> E2eResult<()>;

    async fn select_option(&self, locator: &str, value: &str) -> E2eResult<()>;

    async fn check(&self, locator: &str, options: CheckOptions) -> E2eResult<()>;

    async fn is_checked(&self, locator: &str) -> E2eResult<bool>;

    async fn click(&self, locator: &str) -> E2eResult<()>;

    async fn is_visible(&self, locator: &str) -> E2eResult<bool>;

    async fn text_content(&self, locator: &str) -> E2eResult<Option<String>>;

    async fn input_value(&self, locator: &str) -> E2eResult<String>;

    async fn wait_for(&self, locator: &str, state: WaitState, timeout: Duration) -> E2eResult<()>;

    async fn scroll_into_view(&self, locator: &str) -> E2eResult<()>;

    /// Release the browser. Further calls are undefined.
    async fn close(&self) -> E2eResult<()> {
        Ok(())
    }
}
