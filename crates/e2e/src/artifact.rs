//! Trace artifact storage under `public/behat_trace`

use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};
use std::path::{Path, PathBuf};
use tracing::{debug, info};

use crate::driver::DriverKind;
use crate::error::{E2eError, E2eResult};

/// Trace root, relative to the public web directory
pub const TRACE_DIR: &str = "behat_trace";

/// Kind of diagnostic artifact
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ArtifactKind {
    Screenshot,
    Html,
}

impl ArtifactKind {
    pub const ALL: [ArtifactKind; 2] = [ArtifactKind::Html, ArtifactKind::Screenshot];

    /// Screenshots when the driver can take them, HTML otherwise
    pub fn for_driver(kind: DriverKind) -> Self {
        if kind.supports_screenshots() {
            ArtifactKind::Screenshot
        } else {
            ArtifactKind::Html
        }
    }

    /// File extension, also the subdirectory name
    pub fn extension(&self) -> &'static str {
        match self {
            ArtifactKind::Screenshot => "png",
            ArtifactKind::Html => "html",
        }
    }
}

/// A captured file
#[derive(Debug, Clone)]
pub struct Artifact {
    pub kind: ArtifactKind,
    pub filename: String,
    pub path: PathBuf,
    pub content: Vec<u8>,
}

impl Artifact {
    /// Path relative to the public directory, e.g. `behat_trace/html/<file>`
    pub fn web_path(&self) -> String {
        format!("{}/{}/{}", TRACE_DIR, self.kind.extension(), self.filename)
    }
}

/// Writes artifacts below `<project_root>/public/behat_trace` and builds
/// preview URLs for them
#[derive(Debug, Clone)]
pub struct TraceStore {
    public_dir: PathBuf,
    local_domain: String,
}

impl TraceStore {
    pub fn new(project_root: impl AsRef<Path>, local_domain: impl Into<String>) -> Self {
        Self {
            public_dir: project_root.as_ref().join("public"),
            local_domain: local_domain.into(),
        }
    }

    pub fn root(&self) -> PathBuf {
        self.public_dir.join(TRACE_DIR)
    }

    pub fn kind_dir(&self, kind: ArtifactKind) -> PathBuf {
        self.root().join(kind.extension())
    }

    /// Make sure the trace root exists and drop all previous artifacts
    pub fn clean(&self) -> E2eResult<()> {
        let root = self.root();
        if !root.exists() {
            std::fs::create_dir_all(&root)?;
        }

        for kind in ArtifactKind::ALL {
            let dir = self.kind_dir(kind);
            if dir.exists() {
                std::fs::remove_dir_all(&dir)?;
                debug!("Removed {}", dir.display());
            }
        }

        info!("Trace directory ready at {}", root.display());
        Ok(())
    }

    /// Persist `content` under a fresh random name
    pub fn write(&self, kind: ArtifactKind, content: Vec<u8>) -> E2eResult<Artifact> {
        let dir = self.kind_dir(kind);

        if !dir.is_dir() && std::fs::create_dir_all(&dir).is_err() && !dir.is_dir() {
            return Err(E2eError::StorageUnavailable { path: dir });
        }

        let filename = format!("{}.{}", random_token(), kind.extension());
        let path = dir.join(&filename);
        std::fs::write(&path, &content)?;

        debug!("Wrote {} bytes to {}", content.len(), path.display());
        Ok(Artifact {
            kind,
            filename,
            path,
            content,
        })
    }

    /// URL under which the web server exposes `artifact`
    pub fn preview_url(&self, artifact: &Artifact) -> String {
        format!(
            "{}/{}",
            self.local_domain.trim_end_matches('/'),
            artifact.web_path()
        )
    }
}

/// 32 hex chars from hashing a random 256-bit seed
fn random_token() -> String {
    let seed: [u8; 32] = rand::random();
    let digest = Sha256::digest(seed);
    hex::encode(&digest[..16])
}
