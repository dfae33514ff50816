//! Test lifecycle hooks
//!
//! Hooks are registered by name on a [`HookDispatcher`] and invoked by the
//! runner at fixed points of a suite run. Dispatch follows registration order
//! and stops at the first error, which aborts the run.

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use std::path::PathBuf;
use tracing::debug;

use crate::driver::{BrowserDriver, DriverKind};
use crate::error::{E2eError, E2eResult};
use crate::runner::{ScenarioResult, SuiteResult};
use crate::spec::{tags_contain, Feature, Scenario, TestStep};

/// Outcome of a single step
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum StepStatus {
    Passed,
    Failed,
    Skipped,
}

/// Result of executing a test step
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StepResult {
    pub step_name: String,
    pub status: StepStatus,
    pub duration_ms: u64,
    /// Failure message, if the failure carried one
    pub error: Option<String>,
}

impl StepResult {
    pub fn passed(step_name: String, duration_ms: u64) -> Self {
        Self {
            step_name,
            status: StepStatus::Passed,
            duration_ms,
            error: None,
        }
    }

    pub fn failed(step_name: String, duration_ms: u64, error: Option<String>) -> Self {
        Self {
            step_name,
            status: StepStatus::Failed,
            duration_ms,
            error,
        }
    }

    pub fn skipped(step_name: String) -> Self {
        Self {
            step_name,
            status: StepStatus::Skipped,
            duration_ms: 0,
            error: None,
        }
    }

    pub fn is_failure(&self) -> bool {
        self.status == StepStatus::Failed
    }
}

/// What the suite is about to run
#[derive(Debug, Clone)]
pub struct SuiteScope {
    pub feature_count: usize,
    pub scenario_count: usize,
    pub driver_kind: DriverKind,
}

/// One scenario run, alive from scenario start to scenario end
#[derive(Debug, Clone)]
pub struct ScenarioScope {
    /// `<feature file name>.<scenario line>`
    pub label: String,
    pub feature_name: String,
    pub feature_file: PathBuf,
    pub feature_tags: Vec<String>,
    pub feature_has_background: bool,
    pub scenario_name: String,
    pub scenario_tags: Vec<String>,
    pub scenario_line: usize,
    pub has_steps: bool,
    pub driver_kind: DriverKind,
}

impl ScenarioScope {
    pub fn new(feature: &Feature, scenario: &Scenario, driver_kind: DriverKind) -> Self {
        Self {
            label: format!("{}.{}", feature.file_name(), scenario.line),
            feature_name: feature.name.clone(),
            feature_file: feature.path.clone(),
            feature_tags: feature.tags.clone(),
            feature_has_background: feature.has_background(),
            scenario_name: scenario.name.clone(),
            scenario_tags: scenario.tags.clone(),
            scenario_line: scenario.line,
            has_steps: scenario.has_steps(),
            driver_kind,
        }
    }

    pub fn scenario_has_tag(&self, tag: &str) -> bool {
        tags_contain(&self.scenario_tags, tag)
    }

    pub fn feature_has_tag(&self, tag: &str) -> bool {
        tags_contain(&self.feature_tags, tag)
    }

    /// Nothing would execute for this scenario
    pub fn is_empty(&self) -> bool {
        !self.has_steps && !self.feature_has_background
    }
}

/// A step that has just finished
#[derive(Debug, Clone, Copy)]
pub struct StepScope<'a> {
    pub scenario: &'a ScenarioScope,
    pub step: &'a TestStep,
    pub result: &'a StepResult,
}

/// Callbacks a hook may implement. All default to no-ops.
#[async_trait]
pub trait LifecycleHook: Send {
    async fn before_suite(&mut self, _suite: &SuiteScope) -> E2eResult<()> {
        Ok(())
    }

    async fn before_scenario(&mut self, _scenario: &ScenarioScope) -> E2eResult<()> {
        Ok(())
    }

    /// Run `step` if this hook defines it. Returns `false` to let the next
    /// hook or the driver handle it. An error fails the step.
    async fn handle_step(
        &mut self,
        _step: &TestStep,
        _driver: &mut dyn BrowserDriver,
    ) -> E2eResult<bool> {
        Ok(false)
    }

    async fn after_step(
        &mut self,
        _scope: &StepScope<'_>,
        _driver: &mut dyn BrowserDriver,
    ) -> E2eResult<()> {
        Ok(())
    }

    async fn after_scenario(
        &mut self,
        _scenario: &ScenarioScope,
        _result: &ScenarioResult,
    ) -> E2eResult<()> {
        Ok(())
    }

    async fn after_suite(&mut self, _result: &SuiteResult) -> E2eResult<()> {
        Ok(())
    }
}

/// Ordered registry of named hooks
#[derive(Default)]
pub struct HookDispatcher {
    hooks: Vec<(String, Box<dyn LifecycleHook>)>,
}

impl HookDispatcher {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn register(&mut self, name: impl Into<String>, hook: Box<dyn LifecycleHook>) -> &mut Self {
        let name = name.into();
        debug!("Registered hook '{}'", name);
        self.hooks.push((name, hook));
        self
    }

    pub fn names(&self) -> Vec<&str> {
        self.hooks.iter().map(|(name, _)| name.as_str()).collect()
    }

    pub async fn before_suite(&mut self, suite: &SuiteScope) -> E2eResult<()> {
        for (name, hook) in &mut self.hooks {
            hook.before_suite(suite).await.map_err(|e| wrap(name, e))?;
        }
        Ok(())
    }

    pub async fn before_scenario(&mut self, scenario: &ScenarioScope) -> E2eResult<()> {
        for (name, hook) in &mut self.hooks {
            hook.before_scenario(scenario).await.map_err(|e| wrap(name, e))?;
        }
        Ok(())
    }

    /// Offer `step` to each hook in turn. Step errors are returned unwrapped
    /// since they fail the step rather than the run.
    pub async fn handle_step(
        &mut self,
        step: &TestStep,
        driver: &mut dyn BrowserDriver,
    ) -> E2eResult<bool> {
        for (name, hook) in &mut self.hooks {
            if hook.handle_step(step, driver).await? {
                debug!("Step '{}' handled by hook '{}'", step.name(), name);
                return Ok(true);
            }
        }
        Ok(false)
    }

    pub async fn after_step(
        &mut self,
        scope: &StepScope<'_>,
        driver: &mut dyn BrowserDriver,
    ) -> E2eResult<()> {
        for (name, hook) in &mut self.hooks {
            hook.after_step(scope, driver).await.map_err(|e| wrap(name, e))?;
        }
        Ok(())
    }

    pub async fn after_scenario(
        &mut self,
        scenario: &ScenarioScope,
        result: &ScenarioResult,
    ) -> E2eResult<()> {
        for (name, hook) in &mut self.hooks {
            hook.after_scenario(scenario, result)
                .await
                .map_err(|e| wrap(name, e))?;
        }
        Ok(())
    }

    pub async fn after_suite(&mut self, result: &SuiteResult) -> E2eResult<()> {
        for (name, hook) in &mut self.hooks {
            hook.after_suite(result).await.map_err(|e| wrap(name, e))?;
        }
        Ok(())
    }
}

fn wrap(name: &str, source: E2eError) -> E2eError {
    E2eError::Hook {
        name: name.to_string(),
        source: Box::new(source),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::{Arc, Mutex};

    struct Recorder {
        name: &'static str,
        log: Arc<Mutex<Vec<String>>>,
        fail: bool,
    }

    #[async_trait]
    impl LifecycleHook for Recorder {
        async fn before_suite(&mut self, _suite: &SuiteScope) -> E2eResult<()> {
            self.log.lock().unwrap().push(self.name.to_string());
            if self.fail {
                return Err(E2eError::DatasetImport("boom".to_string()));
            }
            Ok(())
        }
    }

    fn suite() -> SuiteScope {
        SuiteScope {
            feature_count: 1,
            scenario_count: 1,
            driver_kind: DriverKind::Simulated,
        }
    }

    #[tokio::test]
    async fn test_dispatch_follows_registration_order() {
        let log = Arc::new(Mutex::new(Vec::new()));
        let mut dispatcher = HookDispatcher::new();
        dispatcher
            .register("first", Box::new(Recorder { name: "first", log: log.clone(), fail: false }))
            .register("second", Box::new(Recorder { name: "second", log: log.clone(), fail: false }));

        dispatcher.before_suite(&suite()).await.unwrap();
        assert_eq!(*log.lock().unwrap(), vec!["first", "second"]);
        assert_eq!(dispatcher.names(), vec!["first", "second"]);
    }

    #[tokio::test]
    async fn test_dispatch_stops_at_first_error() {
        let log = Arc::new(Mutex::new(Vec::new()));
        let mut dispatcher = HookDispatcher::new();
        dispatcher
            .register("failing", Box::new(Recorder { name: "failing", log: log.clone(), fail: true }))
            .register("never", Box::new(Recorder { name: "never", log: log.clone(), fail: false }));

        let err = dispatcher.before_suite(&suite()).await.unwrap_err();
        match err {
            E2eError::Hook { name, source } => {
                assert_eq!(name, "failing");
                assert!(matches!(*source, E2eError::DatasetImport(_)));
            }
            other => panic!("unexpected error: {}", other),
        }
        assert_eq!(*log.lock().unwrap(), vec!["failing"]);
    }

    #[test]
    fn test_scenario_scope_label_and_emptiness() {
        let feature = Feature::from_yaml(
            r#"
name: Login
scenarios:
  - name: Empty
"#,
        )
        .unwrap();
        let mut feature = feature;
        feature.path = PathBuf::from("features/login.yaml");

        let scope = ScenarioScope::new(&feature, &feature.scenarios[0], DriverKind::Browser);
        assert_eq!(scope.label, "login.yaml.4");
        assert!(scope.is_empty());
    }
}
