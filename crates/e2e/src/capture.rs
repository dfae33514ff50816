//! Failure diagnostics: dump a screenshot or the page HTML when a step fails

use async_trait::async_trait;
use std::io::{BufRead, Write};
use tracing::{debug, info};

use crate::artifact::{Artifact, ArtifactKind, TraceStore};
use crate::driver::{BrowserDriver, DriverKind};
use crate::error::E2eResult;
use crate::hooks::{LifecycleHook, ScenarioScope, StepScope, SuiteScope};
use crate::spec::TestStep;

/// Default domain the trace directory is served under
pub const DEFAULT_LOCAL_DOMAIN: &str = "https://skeleton.docker";

/// Captures artifacts on step failure and provides the `take_screenshot`,
/// `html_dump` and `breakpoint` steps.
///
/// Console output (failure messages, preview links, breakpoint prompt) goes to
/// the injected writer, not to the log.
pub struct ErrorCaptureHook {
    store: TraceStore,
    console: Box<dyn Write + Send>,
    input: Box<dyn BufRead + Send>,
    scenario_label: Option<String>,
}

impl ErrorCaptureHook {
    /// Hook writing to stdout and reading breakpoints from stdin
    pub fn new(store: TraceStore) -> Self {
        Self::with_io(
            store,
            Box::new(std::io::stdout()),
            Box::new(std::io::BufReader::new(std::io::stdin())),
        )
    }

    pub fn with_io(
        store: TraceStore,
        console: Box<dyn Write + Send>,
        input: Box<dyn BufRead + Send>,
    ) -> Self {
        Self {
            store,
            console,
            input,
            scenario_label: None,
        }
    }

    /// Label of the scenario being traced, set only for browser runs
    pub fn scenario_label(&self) -> Option<&str> {
        self.scenario_label.as_deref()
    }

    /// Store `content` and print where it can be viewed
    fn dump(&mut self, kind: ArtifactKind, content: Vec<u8>) -> E2eResult<Artifact> {
        let artifact = self.store.write(kind, content)?;
        writeln!(self.console, "Preview: {}", self.store.preview_url(&artifact))?;
        self.console.flush()?;

        info!(
            scenario = self.scenario_label.as_deref().unwrap_or("-"),
            path = %artifact.path.display(),
            "Captured {} artifact",
            kind.extension()
        );
        Ok(artifact)
    }

    /// Capture whatever the active driver can produce
    async fn capture(&mut self, driver: &mut dyn BrowserDriver) -> E2eResult<Artifact> {
        match ArtifactKind::for_driver(driver.kind()) {
            ArtifactKind::Screenshot => self.dump_screenshot(driver).await,
            ArtifactKind::Html => self.dump_html(driver).await,
        }
    }

    async fn dump_screenshot(&mut self, driver: &mut dyn BrowserDriver) -> E2eResult<Artifact> {
        let png = driver.screenshot().await?;
        self.dump(ArtifactKind::Screenshot, png)
    }

    async fn dump_html(&mut self, driver: &mut dyn BrowserDriver) -> E2eResult<Artifact> {
        let html = driver.page_content().await?;
        self.dump(ArtifactKind::Html, html.into_bytes())
    }

    fn breakpoint(&mut self) -> E2eResult<()> {
        write!(
            self.console,
            "\x1b[s    \x1b[93m[Breakpoint] Press \x1b[1;93m[RETURN]\x1b[0;93m to continue...\x1b[0m"
        )?;
        self.console.flush()?;

        // EOF also resumes so a closed stdin cannot hang the run
        let mut line = String::new();
        self.input.read_line(&mut line)?;

        write!(self.console, "\x1b[u")?;
        self.console.flush()?;
        Ok(())
    }
}

#[async_trait]
impl LifecycleHook for ErrorCaptureHook {
    async fn before_suite(&mut self, _suite: &SuiteScope) -> E2eResult<()> {
        self.store.clean()
    }

    async fn before_scenario(&mut self, scenario: &ScenarioScope) -> E2eResult<()> {
        self.scenario_label = None;

        if scenario.driver_kind != DriverKind::Browser {
            return Ok(());
        }

        if scenario.is_empty() {
            return Ok(());
        }

        debug!("Tracing scenario {}", scenario.label);
        self.scenario_label = Some(scenario.label.clone());
        Ok(())
    }

    async fn handle_step(
        &mut self,
        step: &TestStep,
        driver: &mut dyn BrowserDriver,
    ) -> E2eResult<bool> {
        match step {
            TestStep::TakeScreenshot => {
                self.dump_screenshot(driver).await?;
                Ok(true)
            }
            TestStep::HtmlDump => {
                self.dump_html(driver).await?;
                Ok(true)
            }
            TestStep::Breakpoint => {
                self.breakpoint()?;
                Ok(true)
            }
            _ => Ok(false),
        }
    }

    async fn after_step(
        &mut self,
        scope: &StepScope<'_>,
        driver: &mut dyn BrowserDriver,
    ) -> E2eResult<()> {
        if !scope.result.is_failure() {
            return Ok(());
        }

        writeln!(self.console, "{}", scope.result.error.as_deref().unwrap_or(""))?;
        self.console.flush()?;

        self.capture(driver).await?;
        Ok(())
    }
}
