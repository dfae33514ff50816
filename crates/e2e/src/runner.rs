//! Main test runner: drives features through the hooks and the driver

use serde::{Deserialize, Serialize};
use std::path::PathBuf;
use std::time::Instant;
use tracing::{debug, error, info};

use crate::driver::BrowserDriver;
use crate::error::{E2eError, E2eResult};
use crate::hooks::{HookDispatcher, ScenarioScope, StepResult, StepScope, SuiteScope};
use crate::spec::{Feature, Scenario, TestStep};

/// Result of running a single scenario
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ScenarioResult {
    pub feature: String,
    pub name: String,
    pub label: String,
    pub success: bool,
    pub duration_ms: u64,
    pub steps: Vec<StepResult>,
    pub error: Option<String>,
}

/// Result of running all selected scenarios
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SuiteResult {
    pub total: usize,
    pub passed: usize,
    pub failed: usize,
    pub duration_ms: u64,
    pub finished_at: String,
    pub results: Vec<ScenarioResult>,
}

impl SuiteResult {
    pub fn success(&self) -> bool {
        self.failed == 0
    }
}

/// Which scenarios to run
#[derive(Debug, Clone, Default)]
pub enum ScenarioFilter {
    #[default]
    All,
    /// Scenario or its feature carries the tag
    Tag(String),
    /// Exact scenario name
    Name(String),
}

impl ScenarioFilter {
    fn matches(&self, feature: &Feature, scenario: &Scenario) -> bool {
        match self {
            ScenarioFilter::All => true,
            ScenarioFilter::Tag(tag) => feature.has_tag(tag) || scenario.has_tag(tag),
            ScenarioFilter::Name(name) => &scenario.name == name,
        }
    }
}

/// Main E2E test runner
pub struct TestRunner {
    driver: Box<dyn BrowserDriver>,
    hooks: HookDispatcher,

    /// Feature files directory
    features_dir: PathBuf,

    /// Output directory for results
    output_dir: PathBuf,
}

impl TestRunner {
    pub fn new(
        driver: Box<dyn BrowserDriver>,
        hooks: HookDispatcher,
        features_dir: impl Into<PathBuf>,
        output_dir: impl Into<PathBuf>,
    ) -> Self {
        Self {
            driver,
            hooks,
            features_dir: features_dir.into(),
            output_dir: output_dir.into(),
        }
    }

    /// Run every scenario in the features directory
    pub async fn run_all(&mut self) -> E2eResult<SuiteResult> {
        self.run_filtered(&ScenarioFilter::All).await
    }

    /// Run scenarios selected by `filter`
    pub async fn run_filtered(&mut self, filter: &ScenarioFilter) -> E2eResult<SuiteResult> {
        let features = Feature::load_all(&self.features_dir)?;

        if let ScenarioFilter::Name(name) = filter {
            let found = features
                .iter()
                .any(|f| f.scenarios.iter().any(|s| &s.name == name));
            if !found {
                return Err(E2eError::FeatureParse(format!("Scenario not found: {}", name)));
            }
        }

        self.run_features(&features, filter).await
    }

    /// Run the selected scenarios of already loaded features.
    ///
    /// A hook error aborts the suite and is returned as is; step failures are
    /// recorded in the result.
    pub async fn run_features(
        &mut self,
        features: &[Feature],
        filter: &ScenarioFilter,
    ) -> E2eResult<SuiteResult> {
        let start = Instant::now();

        let selected: Vec<(&Feature, &Scenario)> = features
            .iter()
            .flat_map(|f| f.scenarios.iter().map(move |s| (f, s)))
            .filter(|(f, s)| filter.matches(f, s))
            .collect();

        let suite = SuiteScope {
            feature_count: features.len(),
            scenario_count: selected.len(),
            driver_kind: self.driver.kind(),
        };
        self.hooks.before_suite(&suite).await?;

        info!("Running {} scenario(s) with the {} driver...", selected.len(), suite.driver_kind);

        let mut results = Vec::with_capacity(selected.len());
        let mut passed = 0;
        let mut failed = 0;

        for (feature, scenario) in selected {
            let result = self.run_scenario(feature, scenario).await?;
            if result.success {
                passed += 1;
                info!("✓ {} ({} ms)", result.name, result.duration_ms);
            } else {
                failed += 1;
                error!(
                    "✗ {} - {}",
                    result.name,
                    result.error.as_deref().unwrap_or("unknown error")
                );
            }
            results.push(result);
        }

        let duration_ms = start.elapsed().as_millis() as u64;

        info!(
            "Test Results: {} passed, {} failed ({} ms)",
            passed, failed, duration_ms
        );

        let suite_result = SuiteResult {
            total: results.len(),
            passed,
            failed,
            duration_ms,
            finished_at: chrono::Utc::now().to_rfc3339(),
            results,
        };

        self.hooks.after_suite(&suite_result).await?;
        Ok(suite_result)
    }

    /// Run a single scenario: background first, then its own steps
    async fn run_scenario(&mut self, feature: &Feature, scenario: &Scenario) -> E2eResult<ScenarioResult> {
        let start = Instant::now();
        let scope = ScenarioScope::new(feature, scenario, self.driver.kind());
        debug!("Running scenario: {} ({})", scenario.name, scope.label);

        self.driver.reset().await?;
        self.hooks.before_scenario(&scope).await?;

        let mut step_results = Vec::new();
        let mut scenario_error: Option<String> = None;

        for step in feature.background.iter().chain(scenario.steps.iter()) {
            let result = if scenario_error.is_some() {
                StepResult::skipped(step.name())
            } else {
                self.execute_step(step).await
            };

            let step_scope = StepScope {
                scenario: &scope,
                step,
                result: &result,
            };
            self.hooks.after_step(&step_scope, self.driver.as_mut()).await?;

            if result.is_failure() {
                scenario_error = Some(
                    result
                        .error
                        .clone()
                        .unwrap_or_else(|| format!("step {} failed", result.step_name)),
                );
            }
            step_results.push(result);
        }

        let result = ScenarioResult {
            feature: feature.name.clone(),
            name: scenario.name.clone(),
            label: scope.label.clone(),
            success: scenario_error.is_none(),
            duration_ms: start.elapsed().as_millis() as u64,
            steps: step_results,
            error: scenario_error,
        };

        self.hooks.after_scenario(&scope, &result).await?;
        Ok(result)
    }

    /// Let the hooks claim the step, otherwise hand it to the driver
    async fn execute_step(&mut self, step: &TestStep) -> StepResult {
        let start = Instant::now();
        let step_name = step.name();
        debug!("Executing step: {}", step_name);

        let outcome = match self.hooks.handle_step(step, self.driver.as_mut()).await {
            Ok(true) => Ok(()),
            Ok(false) => self.driver.execute(step).await,
            Err(e) => Err(e),
        };

        let duration_ms = start.elapsed().as_millis() as u64;
        match outcome {
            Ok(()) => StepResult::passed(step_name, duration_ms),
            Err(e) => {
                let message = e.message();
                let message = (!message.is_empty()).then_some(message);
                StepResult::failed(step_name, duration_ms, message)
            }
        }
    }

    /// Write test results to JSON file
    pub fn write_results(&self, results: &SuiteResult) -> E2eResult<PathBuf> {
        std::fs::create_dir_all(&self.output_dir)?;

        let path = self.output_dir.join("test-results.json");
        let json = serde_json::to_string_pretty(results)?;
        std::fs::write(&path, json)?;

        info!("Results written to: {}", path.display());
        Ok(path)
    }
}
