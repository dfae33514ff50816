//! Error types for E2E testing

use std::path::PathBuf;
use thiserror::Error;

#[derive(Error, Debug)]
pub enum E2eError {
    #[error("Server failed to start: {0}")]
    ServerStartup(String),

    #[error("Server health check failed after {0} attempts")]
    ServerHealthCheck(usize),

    #[error("Playwright not found. Install with: npx playwright install")]
    PlaywrightNotFound,

    #[error("Driver error: {0}")]
    Driver(String),

    #[error("Capture not supported: {0}")]
    UnsupportedCapture(String),

    #[error("Feature parse error: {0}")]
    FeatureParse(String),

    #[error("Could not create folder \"{}\"", path.display())]
    StorageUnavailable { path: PathBuf },

    #[error("Dataset import failed: {0}")]
    DatasetImport(String),

    #[error("Hook '{name}' failed: {source}")]
    Hook {
        name: String,
        #[source]
        source: Box<E2eError>,
    },

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("YAML error: {0}")]
    Yaml(#[from] serde_yaml::Error),

    #[error("Config error: {0}")]
    Toml(#[from] toml::de::Error),

    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),

    #[error(transparent)]
    Common(#[from] skeleton_common::Error),
}

pub type E2eResult<T> = Result<T, E2eError>;

impl E2eError {
    /// Message shown for a failed step, without the variant prefix
    pub fn message(&self) -> String {
        match self {
            E2eError::Driver(msg) | E2eError::UnsupportedCapture(msg) => msg.clone(),
            other => other.to_string(),
        }
    }
}
