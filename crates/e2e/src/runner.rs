//! Scenario runner: one browser per scenario, bounded parallelism

use std::path::PathBuf;
use std::sync::Arc;
use std::time::{Duration, Instant};

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use futures::stream::{self, StreamExt};
use serde::{Deserialize, Serialize};
use subform_common::FormConfig;
use tracing::{error, info, warn};

use crate::driver::BrowserDriver;
use crate::error::{E2eError, E2eResult};
use crate::page::SubscriptionForm;
use crate::playwright::{PlaywrightConfig, PlaywrightDriver};
use crate::scenario::{self, Scenario, ScenarioReport, ScenarioSet};
use crate::target;

/// Produces an isolated driver for each scenario
#[async_trait]
pub trait DriverLauncher: Send + Sync {
    async fn launch(&self) -> E2eResult<Arc<dyn BrowserDriver>>;
}

/// Launches a Playwright bridge per scenario
#[derive(Debug, Clone, Default)]
pub struct PlaywrightLauncher {
    config: PlaywrightConfig,
}

impl PlaywrightLauncher {
    pub fn new(config: PlaywrightConfig) -> Self {
        Self { config }
    }
}

#[async_trait]
impl DriverLauncher for PlaywrightLauncher {
    async fn launch(&self) -> E2eResult<Arc<dyn BrowserDriver>> {
        let driver = PlaywrightDriver::launch(self.config.clone()).await?;
        Ok(Arc::new(driver))
    }
}

/// Result of running all selected scenarios
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SuiteResult {
    pub started_at: DateTime<Utc>,
    pub total: usize,
    pub passed: usize,
    pub failed: usize,
    pub duration_ms: u64,
    pub results: Vec<ScenarioReport>,
}

impl SuiteResult {
    pub fn success(&self) -> bool {
        self.failed == 0
    }
}

/// Configuration for the runner
#[derive(Debug, Clone)]
pub struct RunnerConfig {
    /// Scenarios allowed to run at the same time
    pub workers: usize,

    /// Check that the form page answers before launching browsers
    pub preflight: bool,
    pub preflight_timeout: Duration,

    /// Output directory for results
    pub output_dir: PathBuf,
}

impl Default for RunnerConfig {
    fn default() -> Self {
        Self {
            workers: 1,
            preflight: false,
            preflight_timeout: Duration::from_secs(30),
            output_dir: PathBuf::from("test-results"),
        }
    }
}

/// Runs scenarios against the form
pub struct ScenarioRunner<L> {
    form_config: Arc<FormConfig>,
    launcher: L,
    config: RunnerConfig,
}

impl<L: DriverLauncher> ScenarioRunner<L> {
    /// Create a runner with default configuration
    pub fn new(form_config: FormConfig, launcher: L) -> Self {
        Self::with_config(form_config, launcher, RunnerConfig::default())
    }

    /// Create a runner with custom configuration
    pub fn with_config(form_config: FormConfig, launcher: L, config: RunnerConfig) -> Self {
        Self {
            form_config: Arc::new(form_config),
            launcher,
            config,
        }
    }

    /// Run every scenario of the set
    pub async fn run_all(&self, set: &ScenarioSet) -> E2eResult<SuiteResult> {
        let selected: Vec<&Scenario> = set.scenarios.iter().collect();
        self.run_scenarios(&selected).await
    }

    /// Run scenarios matching a tag
    pub async fn run_tagged(&self, set: &ScenarioSet, tag: &str) -> E2eResult<SuiteResult> {
        self.run_scenarios(&set.filter_by_tag(tag)).await
    }

    /// Run a specific scenario by name
    pub async fn run_named(&self, set: &ScenarioSet, name: &str) -> E2eResult<SuiteResult> {
        let scenario = set
            .find(name)
            .ok_or_else(|| E2eError::FixtureParse(format!("Scenario not found: {}", name)))?;
        self.run_scenarios(&[scenario]).await
    }

    /// Run a list of scenarios, up to `workers` at a time
    pub async fn run_scenarios(&self, scenarios: &[&Scenario]) -> E2eResult<SuiteResult> {
        let started_at = Utc::now();
        let start = Instant::now();

        if self.config.preflight {
            target::wait_until_reachable(&self.form_config.url, self.config.preflight_timeout)
                .await?;
        }

        info!(
            "Running {} scenario(s) with {} worker(s)...",
            scenarios.len(),
            self.config.workers.max(1)
        );

        let results: Vec<ScenarioReport> = stream::iter(scenarios.iter().copied())
            .map(|scenario| self.run_scenario(scenario))
            .buffered(self.config.workers.max(1))
            .collect()
            .await;

        let passed = results.iter().filter(|r| r.success).count();
        let failed = results.len() - passed;
        let duration_ms = start.elapsed().as_millis() as u64;

        info!("Scenario results: {} passed, {} failed ({} ms)", passed, failed, duration_ms);

        Ok(SuiteResult {
            started_at,
            total: results.len(),
            passed,
            failed,
            duration_ms,
            results,
        })
    }

    /// Run one scenario on a freshly launched driver
    pub async fn run_scenario(&self, scenario: &Scenario) -> ScenarioReport {
        let driver = match self.launcher.launch().await {
            Ok(driver) => driver,
            Err(e) => {
                error!("✗ {} - could not launch browser: {}", scenario.name, e);
                return ScenarioReport::aborted(&scenario.name, &e);
            }
        };

        let form = SubscriptionForm::new(driver.clone(), self.form_config.clone());
        let report = scenario::execute(&form, scenario).await;

        if let Err(e) = driver.close().await {
            warn!("Failed to close browser for {}: {}", scenario.name, e);
        }

        if report.success {
            info!("✓ {} ({} ms)", report.name, report.duration_ms);
        } else if let Some(e) = &report.error {
            error!("✗ {} - {}", report.name, e);
        } else {
            for check in report.failed_checks() {
                error!(
                    "✗ {} - {} (expected {}, got {})",
                    report.name, check.description, check.expected, check.actual
                );
            }
        }
        report
    }

    /// Write results to JSON file
    pub fn write_results(&self, results: &SuiteResult) -> E2eResult<PathBuf> {
        std::fs::create_dir_all(&self.config.output_dir)?;

        let path = self.config.output_dir.join("test-results.json");
        let json = serde_json::to_string_pretty(results)?;
        std::fs::write(&path, json)?;

        info!("Results written to: {}", path.display());
        Ok(path)
    }
}
