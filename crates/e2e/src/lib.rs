//! Subscription Form E2E Test Framework
//!
//! This crate provides a Rust-controlled UI test suite for the subscription
//! form that:
//! - Wraps the form in a page object over a narrow browser driver trait
//! - Controls Playwright through a long-lived Node.js bridge
//! - Parses declarative YAML scenarios
//! - Runs each scenario in its own browser, optionally in parallel
//!
//! # Architecture
//!
//! ```text
//! ┌─────────────────────────────────────────────────────────────┐
//! │                  Scenario Runner (Rust)                     │
//! ├─────────────────────────────────────────────────────────────┤
//! │  ScenarioRunner                                             │
//! │    ├── preflight(url)                                       │
//! │    ├── launcher.launch() -> Arc<dyn BrowserDriver>          │
//! │    └── execute(SubscriptionForm, Scenario) -> Report        │
//! ├─────────────────────────────────────────────────────────────┤
//! │  SubscriptionForm (page object)                             │
//! │    ├── fill / select_from_list / choose / toggle / submit   │
//! │    ├── is_*_visible / is_*_selected / is_*_empty            │
//! │    └── is_submitted                                         │
//! ├─────────────────────────────────────────────────────────────┤
//! │  BrowserDriver                                              │
//! │    ├── PlaywrightDriver (node bridge, JSON lines)           │
//! │    └── FakePage (in-memory form)                            │
//! └─────────────────────────────────────────────────────────────┘
//! ```

pub mod driver;
pub mod error;
pub mod fake;
pub mod page;
pub mod playwright;
pub mod runner;
pub mod scenario;
pub mod target;

pub use driver::{BrowserDriver, CheckOptions, WaitState};
pub use error::{E2eError, E2eResult};
pub use page::SubscriptionForm;
pub use runner::{DriverLauncher, ScenarioRunner};
pub use scenario::{Scenario, ScenarioSet};
