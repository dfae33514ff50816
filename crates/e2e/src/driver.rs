//! Browser driver abstraction

use async_trait::async_trait;
use serde::{Deserialize, Serialize};

use crate::error::E2eResult;
use crate::spec::TestStep;

/// Which kind of automation backend executes the steps
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum DriverKind {
    /// A real browser that renders pages and runs JavaScript
    Browser,
    /// An HTTP-level simulator without rendering
    Simulated,
}

impl DriverKind {
    pub fn supports_screenshots(&self) -> bool {
        matches!(self, DriverKind::Browser)
    }
}

impl std::fmt::Display for DriverKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            DriverKind::Browser => write!(f, "browser"),
            DriverKind::Simulated => write!(f, "simulated"),
        }
    }
}

/// Automation backend used by the runner and by hooks that inspect the page
#[async_trait]
pub trait BrowserDriver: Send + Sync {
    fn kind(&self) -> DriverKind;

    /// Execute one step against the current page
    async fn execute(&mut self, step: &TestStep) -> E2eResult<()>;

    /// PNG bytes of the current page
    async fn screenshot(&mut self) -> E2eResult<Vec<u8>>;

    /// HTML source of the current page
    async fn page_content(&mut self) -> E2eResult<String>;

    /// Forget session state between scenarios
    async fn reset(&mut self) -> E2eResult<()> {
        Ok(())
    }
}
