//! Shared test doubles for the integration tests
#![allow(dead_code)]

use async_trait::async_trait;
use std::io::Write;
use std::sync::{Arc, Mutex};

use skeleton_e2e::fixtures::DatasetLoader;
use skeleton_e2e::{BrowserDriver, DriverKind, E2eError, E2eResult, TestStep};

pub const PAGE_HTML: &str = "<html><body><h1>Welcome to Skeleton</h1></body></html>";
pub const PNG_BYTES: &[u8] = b"\x89PNG\r\n\x1a\nstub";

/// Driver recording executed steps and failing the ones listed in `failing`
#[derive(Clone)]
pub struct StubDriver {
    kind: DriverKind,
    failing: Vec<String>,
    message: Option<String>,
    pub executed: Arc<Mutex<Vec<String>>>,
    pub resets: Arc<Mutex<usize>>,
}

impl StubDriver {
    pub fn new(kind: DriverKind) -> Self {
        Self {
            kind,
            failing: Vec::new(),
            message: None,
            executed: Arc::new(Mutex::new(Vec::new())),
            resets: Arc::new(Mutex::new(0)),
        }
    }

    /// Fail steps whose name equals `step_name`
    pub fn failing_on(mut self, step_name: &str) -> Self {
        self.failing.push(step_name.to_string());
        self
    }

    pub fn with_message(mut self, message: &str) -> Self {
        self.message = Some(message.to_string());
        self
    }

    pub fn executed(&self) -> Vec<String> {
        self.executed.lock().unwrap().clone()
    }
}

#[async_trait]
impl BrowserDriver for StubDriver {
    fn kind(&self) -> DriverKind {
        self.kind
    }

    async fn execute(&mut self, step: &TestStep) -> E2eResult<()> {
        let name = step.name();
        self.executed.lock().unwrap().push(name.clone());
        if self.failing.contains(&name) {
            let message = self.message.clone().unwrap_or_default();
            return Err(E2eError::Driver(message));
        }
        Ok(())
    }

    async fn screenshot(&mut self) -> E2eResult<Vec<u8>> {
        match self.kind {
            DriverKind::Browser => Ok(PNG_BYTES.to_vec()),
            DriverKind::Simulated => Err(E2eError::UnsupportedCapture("stub".to_string())),
        }
    }

    async fn page_content(&mut self) -> E2eResult<String> {
        Ok(PAGE_HTML.to_string())
    }

    async fn reset(&mut self) -> E2eResult<()> {
        *self.resets.lock().unwrap() += 1;
        Ok(())
    }
}

/// Console writer whose contents the test can read back
#[derive(Clone, Default)]
pub struct SharedBuffer(Arc<Mutex<Vec<u8>>>);

impl SharedBuffer {
    pub fn contents(&self) -> String {
        String::from_utf8_lossy(&self.0.lock().unwrap()).into_owned()
    }
}

impl Write for SharedBuffer {
    fn write(&mut self, buf: &[u8]) -> std::io::Result<usize> {
        self.0.lock().unwrap().extend_from_slice(buf);
        Ok(buf.len())
    }

    fn flush(&mut self) -> std::io::Result<()> {
        Ok(())
    }
}

/// Loader recording every dataset it was asked to restore
#[derive(Clone, Default)]
pub struct RecordingLoader {
    pub calls: Arc<Mutex<Vec<String>>>,
    pub fail: bool,
}

impl RecordingLoader {
    pub fn calls(&self) -> Vec<String> {
        self.calls.lock().unwrap().clone()
    }
}

#[async_trait]
impl DatasetLoader for RecordingLoader {
    async fn reset(&self, name: &str) -> E2eResult<()> {
        self.calls.lock().unwrap().push(name.to_string());
        if self.fail {
            return Err(E2eError::DatasetImport(format!("cannot import {}", name)));
        }
        Ok(())
    }
}

/// All files below `dir`, sorted
pub fn files_in(dir: &std::path::Path) -> Vec<std::path::PathBuf> {
    if !dir.exists() {
        return Vec::new();
    }
    let mut files: Vec<_> = walkdir::WalkDir::new(dir)
        .into_iter()
        .filter_map(|e| e.ok())
        .filter(|e| e.file_type().is_file())
        .map(|e| e.into_path())
        .collect();
    files.sort();
    files
}
