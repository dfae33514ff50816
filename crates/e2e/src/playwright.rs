//! Playwright browser automation
//!
//! Every call renders a standalone Node script, launches a fresh browser and
//! replays the steps recorded since the last navigation, so the page is back
//! in the state the previous step left it before the new step runs.

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use std::path::PathBuf;
use std::process::{Command, Stdio};
use tokio::process::Command as TokioCommand;
use tracing::debug;

use crate::driver::{BrowserDriver, DriverKind};
use crate::error::{E2eError, E2eResult};
use crate::spec::TestStep;

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Browser {
    #[default]
    Chromium,
    Firefox,
    Webkit,
}

impl Browser {
    fn as_str(&self) -> &'static str {
        match self {
            Browser::Chromium => "chromium",
            Browser::Firefox => "firefox",
            Browser::Webkit => "webkit",
        }
    }
}

/// Configuration for Playwright
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct PlaywrightConfig {
    pub base_url: String,
    pub viewport_width: u32,
    pub viewport_height: u32,
    pub browser: Browser,
    pub headless: bool,
    /// Exported as `NODE_PATH` so scripts can `require('playwright')`
    pub node_modules: Option<PathBuf>,
}

impl Default for PlaywrightConfig {
    fn default() -> Self {
        Self {
            base_url: "http://127.0.0.1:8080".to_string(),
            viewport_width: 1280,
            viewport_height: 720,
            browser: Browser::Chromium,
            headless: true,
            node_modules: None,
        }
    }
}

/// Real-browser driver backed by Playwright
pub struct PlaywrightDriver {
    config: PlaywrightConfig,

    /// Scratch directory for generated scripts and captures
    work_dir: tempfile::TempDir,

    /// Steps since the last navigation, replayed before each new call
    history: Vec<TestStep>,
}

impl PlaywrightDriver {
    /// Create a new Playwright driver
    pub fn new(config: PlaywrightConfig) -> E2eResult<Self> {
        Self::check_playwright_installed()?;

        Ok(Self {
            config,
            work_dir: tempfile::tempdir()?,
            history: Vec::new(),
        })
    }

    /// Check if Playwright is installed
    fn check_playwright_installed() -> E2eResult<()> {
        let output = Command::new("npx")
            .args(["playwright", "--version"])
            .stdout(Stdio::null())
            .stderr(Stdio::null())
            .status();

        match output {
            Ok(status) if status.success() => Ok(()),
            _ => Err(E2eError::PlaywrightNotFound),
        }
    }

    /// JavaScript replaying the recorded history followed by `tail`
    fn script_with(&self, tail: &str) -> String {
        let mut body = String::new();
        for step in &self.history {
            if let Some(js) = step_to_js(step, &self.config.base_url) {
                body.push_str(&js);
                body.push('\n');
            }
        }
        body.push_str(tail);
        build_script(&self.config, &body)
    }

    /// Execute a script via node and return its stdout
    async fn run_script(&self, script: &str) -> E2eResult<String> {
        let script_path = self.work_dir.path().join("step.js");
        std::fs::write(&script_path, script)?;

        debug!("Running Playwright script: {}", script_path.display());

        let mut cmd = TokioCommand::new("node");
        cmd.arg(&script_path).current_dir(self.work_dir.path());
        if let Some(node_modules) = &self.config.node_modules {
            cmd.env("NODE_PATH", node_modules);
        }

        let output = cmd.output().await?;

        if !output.status.success() {
            let stderr = String::from_utf8_lossy(&output.stderr);
            return Err(E2eError::Driver(failure_message(&stderr)));
        }

        Ok(String::from_utf8_lossy(&output.stdout).into_owned())
    }
}

#[async_trait]
impl BrowserDriver for PlaywrightDriver {
    fn kind(&self) -> DriverKind {
        DriverKind::Browser
    }

    async fn execute(&mut self, step: &TestStep) -> E2eResult<()> {
        let js = step_to_js(step, &self.config.base_url).ok_or_else(|| {
            E2eError::Driver(format!("step '{}' has no browser implementation", step.name()))
        })?;

        let script = match step {
            // Navigation starts a new history
            TestStep::Navigate { .. } => build_script(&self.config, &js),
            _ => self.script_with(&js),
        };
        self.run_script(&script).await?;

        match step {
            TestStep::Navigate { .. } => self.history = vec![step.clone()],
            TestStep::Click { .. } | TestStep::Fill { .. } | TestStep::Press { .. } => {
                self.history.push(step.clone())
            }
            _ => {}
        }

        Ok(())
    }

    async fn screenshot(&mut self) -> E2eResult<Vec<u8>> {
        let path = self.work_dir.path().join("capture.png");
        let tail = format!(
            "    await page.screenshot({{ path: {}, fullPage: true }});",
            js_string(&path.to_string_lossy())
        );
        let script = self.script_with(&tail);
        self.run_script(&script).await?;

        let bytes = std::fs::read(&path)?;
        std::fs::remove_file(&path)?;
        Ok(bytes)
    }

    async fn page_content(&mut self) -> E2eResult<String> {
        let script = self.script_with("    process.stdout.write(await page.content());");
        self.run_script(&script).await
    }

    async fn reset(&mut self) -> E2eResult<()> {
        self.history.clear();
        Ok(())
    }
}

/// Wrap a step body in browser setup and teardown
fn build_script(config: &PlaywrightConfig, body: &str) -> String {
    format!(
        r#"
const {{ chromium, firefox, webkit }} = require('playwright');
const {{ expect }} = require('@playwright/test');

(async () => {{
  const browser = await {browser}.launch({{ headless: {headless} }});
  const context = await browser.newContext({{
    viewport: {{ width: {width}, height: {height} }}
  }});
  const page = await context.newPage();

  try {{
{body}
  }} catch (error) {{
    console.error(JSON.stringify({{ success: false, error: error.message }}));
    process.exitCode = 1;
  }} finally {{
    await browser.close();
  }}
}})();
"#,
        browser = config.browser.as_str(),
        headless = config.headless,
        width = config.viewport_width,
        height = config.viewport_height,
        body = body,
    )
}

/// Convert a step to JavaScript. `None` for steps the browser does not run.
fn step_to_js(step: &TestStep, base_url: &str) -> Option<String> {
    let js = match step {
        TestStep::Navigate { url, wait_for_selector } => {
            let mut js = format!("    await page.goto({});", js_string(&resolve_url(base_url, url)));
            if let Some(selector) = wait_for_selector {
                js.push_str(&format!("\n    await page.waitForSelector({});", js_string(selector)));
            }
            js
        }
        TestStep::Click { selector, timeout_ms } => format!(
            "    await page.click({}, {{ timeout: {} }});",
            js_string(selector),
            timeout_ms.unwrap_or(5000)
        ),
        TestStep::Fill { selector, value } => format!(
            "    await page.fill({}, {});",
            js_string(selector),
            js_string(value)
        ),
        TestStep::Press { selector, key } => match selector {
            Some(sel) => format!(
                "    await page.locator({}).press({});",
                js_string(sel),
                js_string(key)
            ),
            None => format!("    await page.keyboard.press({});", js_string(key)),
        },
        TestStep::Wait { selector, timeout_ms, state } => format!(
            "    await page.waitForSelector({}, {{ state: '{}', timeout: {} }});",
            js_string(selector),
            state.as_str(),
            timeout_ms
        ),
        TestStep::Sleep { ms } => format!("    await page.waitForTimeout({});", ms),
        TestStep::Assert { selector, visible, text, text_contains, count } => {
            let target = format!("page.locator({})", js_string(selector.as_deref().unwrap_or("body")));
            let mut assertions = Vec::new();

            match visible {
                Some(true) => assertions.push(format!("    await expect({}).toBeVisible();", target)),
                Some(false) => assertions.push(format!("    await expect({}).toBeHidden();", target)),
                None => {}
            }
            if let Some(t) = text {
                assertions.push(format!("    await expect({}).toHaveText({});", target, js_string(t)));
            }
            if let Some(tc) = text_contains {
                assertions.push(format!("    await expect({}).toContainText({});", target, js_string(tc)));
            }
            if let Some(c) = count {
                assertions.push(format!("    await expect({}).toHaveCount({});", target, c));
            }

            assertions.join("\n")
        }
        TestStep::Log { message } => format!("    console.error('[TEST] ' + {});", js_string(message)),
        TestStep::TakeScreenshot | TestStep::HtmlDump | TestStep::Breakpoint => return None,
    };
    Some(js)
}

/// Relative URLs are joined onto the base URL
pub(crate) fn resolve_url(base_url: &str, url: &str) -> String {
    if url.starts_with("http://") || url.starts_with("https://") {
        url.to_string()
    } else {
        format!(
            "{}/{}",
            base_url.trim_end_matches('/'),
            url.trim_start_matches('/')
        )
    }
}

/// Quote a value as a JavaScript string literal
fn js_string(value: &str) -> String {
    serde_json::Value::String(value.to_string()).to_string()
}

/// Pull the error message out of the script's JSON failure line
fn failure_message(stderr: &str) -> String {
    stderr
        .lines()
        .rev()
        .find_map(|line| {
            serde_json::from_str::<serde_json::Value>(line.trim())
                .ok()
                .and_then(|v| v.get("error").and_then(|e| e.as_str()).map(String::from))
        })
        .unwrap_or_else(|| format!("Script failed: {}", stderr.trim()))
}
