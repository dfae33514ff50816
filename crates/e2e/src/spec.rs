//! Declarative YAML feature files
//!
//! A feature file holds an optional background (steps replayed before every
//! scenario) and a list of scenarios. Tags on either level drive hook
//! behavior, e.g. `read-only` skips the dataset reset.

use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use tracing::warn;

use crate::error::{E2eError, E2eResult};

/// A feature parsed from YAML
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Feature {
    /// Human-readable feature title
    pub name: String,

    #[serde(default)]
    pub description: String,

    /// Tags inherited by every scenario of this feature
    #[serde(default)]
    pub tags: Vec<String>,

    /// Steps run before each scenario's own steps
    #[serde(default)]
    pub background: Vec<TestStep>,

    #[serde(default)]
    pub scenarios: Vec<Scenario>,

    /// File the feature was loaded from
    #[serde(skip)]
    pub path: PathBuf,
}

/// One executable scenario
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Scenario {
    pub name: String,

    #[serde(default)]
    pub tags: Vec<String>,

    #[serde(default)]
    pub steps: Vec<TestStep>,

    /// 1-based line of the scenario's `name:` entry in its file, 0 if unknown
    #[serde(skip)]
    pub line: usize,
}

/// A single step in a scenario
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "action", rename_all = "snake_case")]
pub enum TestStep {
    /// Navigate to a URL (relative to base)
    Navigate {
        url: String,
        #[serde(default)]
        wait_for_selector: Option<String>,
    },

    /// Click an element
    Click {
        selector: String,
        #[serde(default)]
        timeout_ms: Option<u64>,
    },

    /// Fill an input field
    Fill { selector: String, value: String },

    /// Press a key, optionally on a focused element
    Press {
        #[serde(default)]
        selector: Option<String>,
        key: String,
    },

    /// Wait for an element to reach a state
    Wait {
        selector: String,
        #[serde(default = "default_wait_timeout")]
        timeout_ms: u64,
        #[serde(default)]
        state: WaitState,
    },

    /// Wait for a fixed amount of time (use sparingly)
    Sleep { ms: u64 },

    /// Assert something about the page, or an element when `selector` is set
    Assert {
        #[serde(default)]
        selector: Option<String>,
        #[serde(default)]
        visible: Option<bool>,
        #[serde(default)]
        text: Option<String>,
        #[serde(default)]
        text_contains: Option<String>,
        #[serde(default)]
        count: Option<usize>,
    },

    /// Log a message (for debugging)
    Log { message: String },

    /// Store a screenshot of the current page in the trace directory
    TakeScreenshot,

    /// Store the current page HTML in the trace directory
    HtmlDump,

    /// Pause until RETURN is pressed on the terminal
    Breakpoint,
}

fn default_wait_timeout() -> u64 {
    5000 // 5 seconds default
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum WaitState {
    #[default]
    Visible,
    Hidden,
    Attached,
    Detached,
}

impl WaitState {
    pub fn as_str(&self) -> &'static str {
        match self {
            WaitState::Visible => "visible",
            WaitState::Hidden => "hidden",
            WaitState::Attached => "attached",
            WaitState::Detached => "detached",
        }
    }
}

impl TestStep {
    /// Short name used in logs and results
    pub fn name(&self) -> String {
        match self {
            TestStep::Navigate { url, .. } => format!("navigate:{}", url),
            TestStep::Click { selector, .. } => format!("click:{}", selector),
            TestStep::Fill { selector, .. } => format!("fill:{}", selector),
            TestStep::Press { key, .. } => format!("press:{}", key),
            TestStep::Wait { selector, .. } => format!("wait:{}", selector),
            TestStep::Sleep { ms } => format!("sleep:{}ms", ms),
            TestStep::Assert { selector, .. } => {
                format!("assert:{}", selector.as_deref().unwrap_or("page"))
            }
            TestStep::Log { message } => {
                format!("log:{}", message.chars().take(30).collect::<String>())
            }
            TestStep::TakeScreenshot => "take_screenshot".to_string(),
            TestStep::HtmlDump => "html_dump".to_string(),
            TestStep::Breakpoint => "breakpoint".to_string(),
        }
    }
}

impl Feature {
    /// Parse a feature from a YAML string
    pub fn from_yaml(yaml: &str) -> E2eResult<Self> {
        let mut feature: Feature = serde_yaml::from_str(yaml)?;
        feature.assign_lines(yaml);
        Ok(feature)
    }

    /// Parse a feature from a YAML file
    pub fn from_file(path: &Path) -> E2eResult<Self> {
        let content = std::fs::read_to_string(path)?;
        let mut feature = Self::from_yaml(&content)
            .map_err(|e| E2eError::FeatureParse(format!("{}: {}", path.display(), e)))?;
        feature.path = path.to_path_buf();
        Ok(feature)
    }

    /// Load all features from a directory, ordered by path
    pub fn load_all(dir: &Path) -> E2eResult<Vec<Self>> {
        let mut features = Vec::new();

        for entry in walkdir::WalkDir::new(dir)
            .sort_by_file_name()
            .into_iter()
            .filter_map(|e| e.ok())
            .filter(|e| {
                e.path()
                    .extension()
                    .map(|ext| ext == "yaml" || ext == "yml")
                    .unwrap_or(false)
            })
        {
            features.push(Self::from_file(entry.path())?);
        }

        Ok(features)
    }

    pub fn has_background(&self) -> bool {
        !self.background.is_empty()
    }

    pub fn has_tag(&self, tag: &str) -> bool {
        tags_contain(&self.tags, tag)
    }

    /// File name used in scenario labels
    pub fn file_name(&self) -> String {
        self.path
            .file_name()
            .map(|n| n.to_string_lossy().to_string())
            .unwrap_or_else(|| self.name.clone())
    }

    /// Locate each scenario's `name:` line in the source text.
    ///
    /// Scanning starts after the `scenarios:` key and only moves forward, so
    /// scenarios sharing a name resolve in document order.
    fn assign_lines(&mut self, source: &str) {
        let lines: Vec<&str> = source.lines().collect();
        let mut cursor = lines
            .iter()
            .position(|l| l.trim_start().starts_with("scenarios:"))
            .map_or(0, |i| i + 1);

        for scenario in &mut self.scenarios {
            if let Some(offset) = lines[cursor..]
                .iter()
                .position(|l| is_name_line(l, &scenario.name))
            {
                scenario.line = cursor + offset + 1;
                cursor += offset + 1;
            } else {
                warn!(
                    "Could not locate scenario '{}' in {}, its label will use line 0",
                    scenario.name,
                    self.name
                );
            }
        }
    }
}

impl Scenario {
    pub fn has_steps(&self) -> bool {
        !self.steps.is_empty()
    }

    pub fn has_tag(&self, tag: &str) -> bool {
        tags_contain(&self.tags, tag)
    }
}

/// Tags match with or without a leading `@`
pub(crate) fn tags_contain(tags: &[String], tag: &str) -> bool {
    let wanted = tag.trim_start_matches('@');
    tags.iter().any(|t| t.trim_start_matches('@') == wanted)
}

fn is_name_line(line: &str, name: &str) -> bool {
    let trimmed = line.trim_start();
    let trimmed = trimmed.strip_prefix('-').unwrap_or(trimmed).trim_start();
    match trimmed.strip_prefix("name:") {
        Some(value) => {
            let value = value.trim();
            let value = value
                .strip_prefix('"')
                .and_then(|v| v.strip_suffix('"'))
                .or_else(|| value.strip_prefix('\'').and_then(|v| v.strip_suffix('\'')))
                .unwrap_or(value);
            value == name
        }
        None => false,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const FEATURE: &str = r#"
name: User administration
tags:
  - users
background:
  - action: navigate
    url: /
scenarios:
  - name: Admin lists users
    tags: ['@read-only']
    steps:
      - action: navigate
        url: /api/users
      - action: assert
        text_contains: admin@skeleton.docker
  - name: "Empty placeholder"
  - name: Admin lists users
    steps:
      - action: html_dump
"#;

    #[test]
    fn test_parse_feature() {
        let feature = Feature::from_yaml(FEATURE).unwrap();
        assert_eq!(feature.name, "User administration");
        assert!(feature.has_background());
        assert_eq!(feature.scenarios.len(), 3);
        assert_eq!(feature.scenarios[0].steps.len(), 2);
        assert!(!feature.scenarios[1].has_steps());
        assert!(matches!(feature.scenarios[2].steps[0], TestStep::HtmlDump));
    }

    #[test]
    fn test_scenario_lines_follow_document_order() {
        let feature = Feature::from_yaml(FEATURE).unwrap();
        let lines: Vec<usize> = feature.scenarios.iter().map(|s| s.line).collect();
        assert_eq!(lines, vec![9, 16, 17]);
    }

    #[test]
    fn test_tags_match_with_or_without_at() {
        let feature = Feature::from_yaml(FEATURE).unwrap();
        assert!(feature.scenarios[0].has_tag("read-only"));
        assert!(feature.scenarios[0].has_tag("@read-only"));
        assert!(feature.has_tag("@users"));
        assert!(!feature.scenarios[2].has_tag("read-only"));
    }

    #[test]
    fn test_escaped_name_falls_back_to_line_zero() {
        let feature = Feature::from_yaml(
            r#"
name: Escapes
scenarios:
  - name: "Tab\there"
  - name: Plain
"#,
        )
        .unwrap();
        assert_eq!(feature.scenarios[0].name, "Tab\there");
        assert_eq!(feature.scenarios[0].line, 0);
        assert_eq!(feature.scenarios[1].line, 5);
    }

    #[test]
    fn test_unknown_action_is_rejected() {
        let yaml = r#"
name: broken
scenarios:
  - name: bad
    steps:
      - action: teleport
"#;
        assert!(Feature::from_yaml(yaml).is_err());
    }
}
