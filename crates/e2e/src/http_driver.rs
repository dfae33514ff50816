//! HTTP-level driver without rendering or JavaScript

use async_trait::async_trait;
use std::time::Duration;
use tracing::{debug, info};

use crate::driver::{BrowserDriver, DriverKind};
use crate::error::{E2eError, E2eResult};
use crate::playwright::resolve_url;
use crate::spec::TestStep;

/// Simulated driver: navigation fetches the raw response body and page
/// assertions run against that text.
pub struct HttpDriver {
    client: reqwest::Client,
    base_url: String,
    current_url: Option<String>,
    content: String,
}

impl HttpDriver {
    pub fn new(base_url: impl Into<String>) -> E2eResult<Self> {
        let client = reqwest::Client::builder()
            .timeout(Duration::from_secs(10))
            .build()?;

        Ok(Self {
            client,
            base_url: base_url.into(),
            current_url: None,
            content: String::new(),
        })
    }

    pub fn current_url(&self) -> Option<&str> {
        self.current_url.as_deref()
    }

    async fn navigate(&mut self, url: &str) -> E2eResult<()> {
        let url = resolve_url(&self.base_url, url);
        let resp = self.client.get(&url).send().await?;
        let status = resp.status();
        self.content = resp.text().await?;

        debug!("GET {} -> {} ({} bytes)", url, status, self.content.len());
        self.current_url = Some(url);
        Ok(())
    }

    fn assert_page(&self, text: Option<&str>, text_contains: Option<&str>) -> E2eResult<()> {
        if let Some(expected) = text {
            if self.content.trim() != expected {
                return Err(E2eError::Driver(format!(
                    "page text does not equal \"{}\"",
                    expected
                )));
            }
        }

        if let Some(needle) = text_contains {
            if !self.content.contains(needle) {
                return Err(E2eError::Driver(format!(
                    "page does not contain \"{}\"",
                    needle
                )));
            }
        }

        Ok(())
    }
}

#[async_trait]
impl BrowserDriver for HttpDriver {
    fn kind(&self) -> DriverKind {
        DriverKind::Simulated
    }

    async fn execute(&mut self, step: &TestStep) -> E2eResult<()> {
        match step {
            TestStep::Navigate { url, .. } => self.navigate(url).await,
            TestStep::Assert {
                selector: None,
                visible: None,
                count: None,
                text,
                text_contains,
            } => self.assert_page(text.as_deref(), text_contains.as_deref()),
            TestStep::Sleep { ms } => {
                tokio::time::sleep(Duration::from_millis(*ms)).await;
                Ok(())
            }
            TestStep::Log { message } => {
                info!("[TEST LOG] {}", message);
                Ok(())
            }
            other => Err(E2eError::Driver(format!(
                "step '{}' requires a browser driver",
                other.name()
            ))),
        }
    }

    async fn screenshot(&mut self) -> E2eResult<Vec<u8>> {
        Err(E2eError::UnsupportedCapture(
            "screenshots require a browser driver".to_string(),
        ))
    }

    async fn page_content(&mut self) -> E2eResult<String> {
        Ok(self.content.clone())
    }

    async fn reset(&mut self) -> E2eResult<()> {
        self.current_url = None;
        self.content.clear();
        Ok(())
    }
}
