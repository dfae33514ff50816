//! Skeleton acceptance test framework
//!
//! This crate drives the Skeleton web application through declarative YAML
//! features:
//! - Spawns the web server as a subprocess
//! - Runs steps through a real browser (Playwright) or an HTTP simulator
//! - Restores the baseline dataset before each scenario
//! - Dumps a screenshot or the page HTML when a step fails
//!
//! # Architecture
//!
//! ```text
//! ┌─────────────────────────────────────────────────────────────┐
//! │                    E2E Test Runner (Rust)                   │
//! ├─────────────────────────────────────────────────────────────┤
//! │  TestRunner                                                 │
//! │    ├── driver: Box<dyn BrowserDriver>                       │
//! │    │     ├── PlaywrightDriver (browser)                     │
//! │    │     └── HttpDriver (simulated)                         │
//! │    └── hooks: HookDispatcher                                │
//! │          ├── FixtureHook      before_scenario               │
//! │          └── ErrorCaptureHook before_suite / after_step     │
//! ├─────────────────────────────────────────────────────────────┤
//! │  Feature (YAML)                                             │
//! │    ├── name, tags, background: [Step]                       │
//! │    └── scenarios: [{ name, tags, steps: [Step] }]           │
//! └─────────────────────────────────────────────────────────────┘
//! ```

pub mod artifact;
pub mod capture;
pub mod config;
pub mod driver;
pub mod error;
pub mod fixtures;
pub mod hooks;
pub mod http_driver;
pub mod playwright;
pub mod runner;
pub mod server;
pub mod spec;

pub use artifact::{Artifact, ArtifactKind, TraceStore};
pub use capture::ErrorCaptureHook;
pub use config::E2eConfig;
pub use driver::{BrowserDriver, DriverKind};
pub use error::{E2eError, E2eResult};
pub use fixtures::{DatasetLoader, FixtureHook};
pub use hooks::{HookDispatcher, LifecycleHook};
pub use runner::{ScenarioFilter, SuiteResult, TestRunner};
pub use spec::{Feature, Scenario, TestStep};
