//! Playwright browser automation
//!
//! A small Node.js bridge script owns one browser page and executes requests
//! read line by line from stdin, answering each with one JSON line on stdout:
//!
//! ```text
//! -> {"id":7,"op":"check","locator":"#withdrawCash","force":true}
//! <- {"id":7,"ok":true,"value":null}
//! <- {"id":8,"ok":false,"timeout":true,"error":"locator.waitFor: Timeout 5000ms exceeded"}
//! ```

use std::path::PathBuf;
use std::process::Stdio;
use std::sync::atomic::{AtomicU64, Ordering};
use std::time::Duration;

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use tempfile::TempDir;
use tokio::io::{AsyncBufReadExt, AsyncWriteExt, BufReader, Lines};
use tokio::process::{Child, ChildStdin, ChildStdout, Command as TokioCommand};
use tokio::sync::Mutex;
use tracing::{debug, info, warn};

use crate::driver::{BrowserDriver, CheckOptions, WaitState};
use crate::error::{E2eError, E2eResult};

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum Browser {
    #[default]
    Chromium,
    Firefox,
    Webkit,
}

impl Browser {
    pub fn as_str(&self) -> &'static str {
        match self {
            Browser::Chromium => "chromium",
            Browser::Firefox => "firefox",
            Browser::Webkit => "webkit",
        }
    }
}

/// Configuration for Playwright
#[derive(Debug, Clone)]
pub struct PlaywrightConfig {
    pub browser: Browser,
    pub headless: bool,
    pub viewport_width: u32,
    pub viewport_height: u32,

    /// Default timeout Playwright applies to every action
    pub action_timeout_ms: u64,

    /// Upper bound for one bridge round trip on top of any explicit wait
    pub bridge_timeout_ms: u64,

    /// Upper bound for launching the browser
    pub launch_timeout_ms: u64,

    /// Node executable
    pub node_binary: String,

    /// Module search path containing the `playwright` package
    pub node_path: Option<PathBuf>,
}

impl Default for PlaywrightConfig {
    fn default() -> Self {
        Self {
            browser: Browser::Chromium,
            headless: true,
            viewport_width: 1280,
            viewport_height: 720,
            action_timeout_ms: 10_000,
            bridge_timeout_ms: 15_000,
            launch_timeout_ms: 30_000,
            node_binary: "node".to_string(),
            node_path: None,
        }
    }
}

const BRIDGE_TEMPLATE: &str = r#"
const { chromium, firefox, webkit } = require('playwright');
const readline = require('readline');

const reply = (msg) => process.stdout.write(JSON.stringify(msg) + '\n');

(async () => {
  const browser = await __BROWSER__.launch({ headless: __HEADLESS__ });
  const context = await browser.newContext({
    viewport: { width: __WIDTH__, height: __HEIGHT__ }
  });
  const page = await context.newPage();
  page.setDefaultTimeout(__ACTION_TIMEOUT__);
  reply({ id: 0, ok: true, value: 'ready' });

  const rl = readline.createInterface({ input: process.stdin });
  for await (const line of rl) {
    if (!line.trim()) continue;
    const req = JSON.parse(line);
    try {
      let value = null;
      switch (req.op) {
        case 'navigate': await page.goto(req.url); break;
        case 'fill': await page.fill(req.locator, req.text); break;
        case 'select_option': await page.selectOption(req.locator, req.value); break;
        case 'check': await page.check(req.locator, { force: req.force }); break;
        case 'is_checked': value = await page.isChecked(req.locator); break;
        case 'click': await page.click(req.locator); break;
        case 'is_visible': value = await page.isVisible(req.locator); break;
        case 'text_content': value = await page.textContent(req.locator); break;
        case 'input_value': value = await page.inputValue(req.locator); break;
        case 'wait_for':
          await page.locator(req.locator).waitFor({ state: req.state, timeout: req.timeout_ms });
          break;
        case 'scroll_into_view': await page.locator(req.locator).scrollIntoViewIfNeeded(); break;
        case 'close':
          reply({ id: req.id, ok: true, value: null });
          await browser.close();
          process.exit(0);
        default: throw new Error('unknown op: ' + req.op);
      }
      reply({ id: req.id, ok: true, value });
    } catch (error) {
      reply({ id: req.id, ok: false, timeout: error.name === 'TimeoutError', error: error.message });
    }
  }
  await browser.close();
})().catch((error) => {
  reply({ id: 0, ok: false, error: error.message });
  process.exit(1);
});
"#;

/// Render the bridge script for a configuration
pub fn build_bridge_script(config: &PlaywrightConfig) -> String {
    BRIDGE_TEMPLATE
        .replace("__BROWSER__", config.browser.as_str())
        .replace("__HEADLESS__", if config.headless { "true" } else { "false" })
        .replace("__WIDTH__", &config.viewport_width.to_string())
        .replace("__HEIGHT__", &config.viewport_height.to_string())
        .replace("__ACTION_TIMEOUT__", &config.action_timeout_ms.to_string())
}

/// One request to the bridge; serialized with an `op` tag
#[derive(Debug, Serialize)]
#[serde(tag = "op", rename_all = "snake_case")]
enum BridgeRequest<'a> {
    Navigate { url: &'a str },
    Fill { locator: &'a str, text: &'a str },
    SelectOption { locator: &'a str, value: &'a str },
    Check { locator: &'a str, force: bool },
    IsChecked { locator: &'a str },
    Click { locator: &'a str },
    IsVisible { locator: &'a str },
    TextContent { locator: &'a str },
    InputValue { locator: &'a str },
    WaitFor { locator: &'a str, state: WaitState, timeout_ms: u64 },
    ScrollIntoView { locator: &'a str },
    Close,
}

impl BridgeRequest<'_> {
    fn describe(&self) -> String {
        match self {
            BridgeRequest::Navigate { url } => format!("navigate:{}", url),
            BridgeRequest::Fill { locator, .. } => format!("fill:{}", locator),
            BridgeRequest::SelectOption { locator, .. } => format!("select:{}", locator),
            BridgeRequest::Check { locator, .. } => format!("check:{}", locator),
            BridgeRequest::IsChecked { locator } => format!("is_checked:{}", locator),
            BridgeRequest::Click { locator } => format!("click:{}", locator),
            BridgeRequest::IsVisible { locator } => format!("is_visible:{}", locator),
            BridgeRequest::TextContent { locator } => format!("text_content:{}", locator),
            BridgeRequest::InputValue { locator } => format!("input_value:{}", locator),
            BridgeRequest::WaitFor { locator, state, .. } => {
                format!("wait_for:{}:{}", locator, state.as_str())
            }
            BridgeRequest::ScrollIntoView { locator } => format!("scroll:{}", locator),
            BridgeRequest::Close => "close".to_string(),
        }
    }

    fn encode(&self, id: u64) -> E2eResult<String> {
        let mut message = serde_json::to_value(self)?;
        message["id"] = id.into();
        Ok(serde_json::to_string(&message)?)
    }
}

#[derive(Debug, Deserialize)]
struct BridgeResponse {
    id: u64,
    ok: bool,
    #[serde(default)]
    value: serde_json::Value,
    #[serde(default)]
    error: Option<String>,
    #[serde(default)]
    timeout: bool,
}

impl BridgeResponse {
    fn into_result(self, what: &str) -> E2eResult<serde_json::Value> {
        if self.ok {
            return Ok(self.value);
        }
        let message = self.error.unwrap_or_else(|| "unknown bridge error".to_string());
        if self.timeout {
            Err(E2eError::Timeout(format!("{} ({})", what, message)))
        } else {
            Err(E2eError::Driver(format!("{}: {}", what, message)))
        }
    }
}

fn expect_bool(value: serde_json::Value, what: &str) -> E2eResult<bool> {
    value
        .as_bool()
        .ok_or_else(|| E2eError::Playwright(format!("{}: expected boolean, got {}", what, value)))
}

struct BridgeSession {
    child: Child,
    stdin: ChildStdin,
    stdout: Lines<BufReader<ChildStdout>>,
}

impl BridgeSession {
    /// Write one request and read until its response arrives
    async fn roundtrip(&mut self, id: u64, line: &str) -> E2eResult<BridgeResponse> {
        self.stdin.write_all(line.as_bytes()).await?;
        self.stdin.write_all(b"\n").await?;
        self.stdin.flush().await?;
        self.read_response(id).await
    }

    async fn read_response(&mut self, id: u64) -> E2eResult<BridgeResponse> {
        loop {
            let line = self
                .stdout
                .next_line()
                .await?
                .ok_or_else(|| E2eError::Playwright("bridge process exited".to_string()))?;

            match serde_json::from_str::<BridgeResponse>(&line) {
                Ok(response) if response.id == id => return Ok(response),
                // Late answer to a request that already timed out on our side
                Ok(response) => debug!("Discarding stale bridge response {}", response.id),
                Err(_) => debug!("bridge: {}", line),
            }
        }
    }
}

/// Browser driver backed by a Playwright bridge process
pub struct PlaywrightDriver {
    session: Mutex<Option<BridgeSession>>,
    next_id: AtomicU64,
    bridge_timeout: Duration,

    /// Holds the bridge script for the lifetime of the process
    _script_dir: TempDir,
}

impl PlaywrightDriver {
    /// Start a bridge and wait until its page is ready
    pub async fn launch(config: PlaywrightConfig) -> E2eResult<Self> {
        Self::check_playwright_installed().await?;

        let script_dir = tempfile::tempdir()?;
        let script_path = script_dir.path().join("bridge.js");
        std::fs::write(&script_path, build_bridge_script(&config))?;

        info!(
            "Launching {} ({})",
            config.browser.as_str(),
            if config.headless { "headless" } else { "headed" }
        );

        let mut cmd = TokioCommand::new(&config.node_binary);
        cmd.arg(&script_path)
            .current_dir(script_dir.path())
            .stdin(Stdio::piped())
            .stdout(Stdio::piped())
            .stderr(Stdio::piped())
            .kill_on_drop(true);
        if let Some(node_path) = &config.node_path {
            cmd.env("NODE_PATH", node_path);
        }

        let mut child = cmd.spawn().map_err(|e| {
            E2eError::Playwright(format!("Failed to spawn {}: {}", config.node_binary, e))
        })?;

        let stdin = child
            .stdin
            .take()
            .ok_or_else(|| E2eError::Playwright("bridge stdin unavailable".to_string()))?;
        let stdout = child
            .stdout
            .take()
            .ok_or_else(|| E2eError::Playwright("bridge stdout unavailable".to_string()))?;
        if let Some(stderr) = child.stderr.take() {
            tokio::spawn(async move {
                let mut lines = BufReader::new(stderr).lines();
                while let Ok(Some(line)) = lines.next_line().await {
                    warn!("bridge stderr: {}", line);
                }
            });
        }

        let mut session = BridgeSession {
            child,
            stdin,
            stdout: BufReader::new(stdout).lines(),
        };

        let launch_timeout = Duration::from_millis(config.launch_timeout_ms);
        let ready = tokio::time::timeout(launch_timeout, session.read_response(0))
            .await
            .map_err(|_| E2eError::Timeout("browser launch".to_string()))??;
        ready.into_result("launch")?;

        debug!("Playwright bridge ready");

        Ok(Self {
            session: Mutex::new(Some(session)),
            next_id: AtomicU64::new(1),
            bridge_timeout: Duration::from_millis(config.bridge_timeout_ms),
            _script_dir: script_dir,
        })
    }

    /// Check if Playwright is installed
    async fn check_playwright_installed() -> E2eResult<()> {
        if command_succeeds("npx", &["playwright", "--version"]).await {
            Ok(())
        } else {
            Err(E2eError::PlaywrightNotFound)
        }
    }

    async fn call(&self, request: BridgeRequest<'_>, extra: Duration) -> E2eResult<serde_json::Value> {
        let what = request.describe();
        let id = self.next_id.fetch_add(1, Ordering::Relaxed);
        let line = request.encode(id)?;
        debug!("-> {}", what);

        let mut guard = self.session.lock().await;
        let session = guard
            .as_mut()
            .ok_or_else(|| E2eError::Playwright("bridge is closed".to_string()))?;

        let response = tokio::time::timeout(self.bridge_timeout + extra, session.roundtrip(id, &line))
            .await
            .map_err(|_| E2eError::Timeout(format!("bridge response to {}", what)))??;

        response.into_result(&what)
    }
}

#[async_trait]
impl BrowserDriver for PlaywrightDriver {
    async fn navigate(&self, url: &str) -> E2eResult<()> {
        self.call(BridgeRequest::Navigate { url }, Duration::ZERO).await?;
        Ok(())
    }

    async fn fill(&self, locator: &str, text: &str) -> E2eResult<()> {
        self.call(BridgeRequest::Fill { locator, text }, Duration::ZERO).await?;
        Ok(())
    }

    async fn select_option(&self, locator: &str, value: &str) -> E2eResult<()> {
        self.call(BridgeRequest::SelectOption { locator, value }, Duration::ZERO)
            .await?;
        Ok(())
    }

    async fn check(&self, locator: &str, options: CheckOptions) -> E2eResult<()> {
        let request = BridgeRequest::Check {
            locator,
            force: options.force,
        };
        self.call(request, Duration::ZERO).await?;
        Ok(())
    }

    async fn is_checked(&self, locator: &str) -> E2eResult<bool> {
        let value = self.call(BridgeRequest::IsChecked { locator }, Duration::ZERO).await?;
        expect_bool(value, "is_checked")
    }

    async fn click(&self, locator: &str) -> E2eResult<()> {
        self.call(BridgeRequest::Click { locator }, Duration::ZERO).await?;
        Ok(())
    }

    async fn is_visible(&self, locator: &str) -> E2eResult<bool> {
        let value = self.call(BridgeRequest::IsVisible { locator }, Duration::ZERO).await?;
        expect_bool(value, "is_visible")
    }

    async fn text_content(&self, locator: &str) -> E2eResult<Option<String>> {
        let value = self.call(BridgeRequest::TextContent { locator }, Duration::ZERO).await?;
        Ok(value.as_str().map(String::from))
    }

    async fn input_value(&self, locator: &str) -> E2eResult<String> {
        let value = self.call(BridgeRequest::InputValue { locator }, Duration::ZERO).await?;
        value
            .as_str()
            .map(String::from)
            .ok_or_else(|| E2eError::Playwright(format!("input_value: expected string, got {}", value)))
    }

    async fn wait_for(&self, locator: &str, state: WaitState, timeout: Duration) -> E2eResult<()> {
        let request = BridgeRequest::WaitFor {
            locator,
            state,
            timeout_ms: timeout.as_millis() as u64,
        };
        self.call(request, timeout).await?;
        Ok(())
    }

    async fn scroll_into_view(&self, locator: &str) -> E2eResult<()> {
        self.call(BridgeRequest::ScrollIntoView { locator }, Duration::ZERO)
            .await?;
        Ok(())
    }

    async fn close(&self) -> E2eResult<()> {
        let Some(mut session) = self.session.lock().await.take() else {
            return Ok(());
        };

        let id = self.next_id.fetch_add(1, Ordering::Relaxed);
        let line = BridgeRequest::Close.encode(id)?;
        let grace = Duration::from_secs(2);
        let _ = tokio::time::timeout(grace, session.roundtrip(id, &line)).await;

        if tokio::time::timeout(grace, session.child.wait()).await.is_ok() {
            return Ok(());
        }

        #[cfg(unix)]
        if let Some(pid) = session.child.id() {
            use nix::sys::signal::{kill, Signal};
            use nix::unistd::Pid;

            if kill(Pid::from_raw(pid as i32), Signal::SIGTERM).is_ok()
                && tokio::time::timeout(grace, session.child.wait()).await.is_ok()
            {
                return Ok(());
            }
        }

        warn!("Bridge did not exit, killing it");
        session.child.kill().await?;
        Ok(())
    }
}

/// Run `program` to completion without blocking the runtime
async fn command_succeeds(program: &str, args: &[&str]) -> bool {
    TokioCommand::new(program)
        .args(args)
        .stdin(Stdio::null())
        .stdout(Stdio::null())
        .stderr(Stdio::null())
        .kill_on_drop(true)
        .status()
        .await
        .map_or(false, |status| status.success())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_bridge_script_uses_config() {
        let script = build_bridge_script(&PlaywrightConfig {
            browser: Browser::Firefox,
            headless: false,
            viewport_width: 1920,
            viewport_height: 1080,
            action_timeout_ms: 2500,
            ..Default::default()
        });

        assert!(script.contains("await firefox.launch({ headless: false })"));
        assert!(script.contains("width: 1920, height: 1080"));
        assert!(script.contains("page.setDefaultTimeout(2500)"));
        assert!(!script.contains("__"));
    }

    #[test]
    fn test_request_encoding() {
        let line = BridgeRequest::WaitFor {
            locator: "#withdrawCash",
            state: WaitState::Visible,
            timeout_ms: 5000,
        }
        .encode(7)
        .unwrap();
        let json: serde_json::Value = serde_json::from_str(&line).unwrap();

        assert_eq!(json["id"], 7);
        assert_eq!(json["op"], "wait_for");
        assert_eq!(json["locator"], "#withdrawCash");
        assert_eq!(json["state"], "visible");
        assert_eq!(json["timeout_ms"], 5000);

        let close: serde_json::Value =
            serde_json::from_str(&BridgeRequest::Close.encode(9).unwrap()).unwrap();
        assert_eq!(close["op"], "close");
        assert_eq!(close["id"], 9);
    }

    #[test]
    fn test_response_mapping() {
        let ok: BridgeResponse =
            serde_json::from_str(r#"{"id":3,"ok":true,"value":true}"#).unwrap();
        assert_eq!(ok.into_result("is_checked").unwrap(), serde_json::Value::Bool(true));

        let timeout: BridgeResponse = serde_json::from_str(
            r#"{"id":4,"ok":false,"timeout":true,"error":"Timeout 5000ms exceeded"}"#,
        )
        .unwrap();
        assert!(matches!(timeout.into_result("wait_for"), Err(E2eError::Timeout(_))));

        let failed: BridgeResponse =
            serde_json::from_str(r#"{"id":5,"ok":false,"error":"strict mode violation"}"#).unwrap();
        match failed.into_result("click:#x") {
            Err(E2eError::Driver(msg)) => assert!(msg.contains("strict mode violation")),
            other => panic!("unexpected result: {:?}", other),
        }
    }

    #[test]
    fn test_null_text_content_is_none() {
        let response: BridgeResponse =
            serde_json::from_str(r#"{"id":1,"ok":true,"value":null}"#).unwrap();
        let value = response.into_result("text_content").unwrap();
        assert_eq!(value.as_str(), None);
    }

    #[tokio::test]
    async fn test_missing_program_is_not_installed() {
        assert!(!command_succeeds("subform-no-such-binary", &[]).await);
        assert!(command_succeeds("sh", &["-c", "exit 0"]).await);
        assert!(!command_succeeds("sh", &["-c", "exit 3"]).await);
    }

    #[tokio::test(flavor = "current_thread")]
    async fn test_install_check_leaves_the_runtime_free() {
        let start = std::time::Instant::now();
        let (_, ticked_at) = tokio::join!(command_succeeds("sh", &["-c", "sleep 0.5"]), async {
            tokio::time::sleep(Duration::from_millis(20)).await;
            start.elapsed()
        });
        assert!(ticked_at < Duration::from_millis(400), "timer starved for {:?}", ticked_at);
    }
}
