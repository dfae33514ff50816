//! Dataset reset before each scenario

use async_trait::async_trait;
use skeleton_common::Database;
use std::path::PathBuf;
use tokio::process::Command;
use tracing::{debug, info};

use crate::error::{E2eError, E2eResult};
use crate::hooks::{LifecycleHook, ScenarioScope};

/// Scenarios or features carrying this tag keep the current database
pub const READ_ONLY_TAG: &str = "read-only";

/// Baseline dump restored before each scenario, relative to the project root
pub const DUMP: &str = "dump/skeleton.sql";

/// Something able to replace the test database with a named dataset
#[async_trait]
pub trait DatasetLoader: Send + Sync {
    async fn reset(&self, name: &str) -> E2eResult<()>;
}

/// Replays a SQL dump into the application's SQLite database
pub struct SqliteDatasetLoader {
    db: Database,
    project_root: PathBuf,
}

impl SqliteDatasetLoader {
    pub fn new(db: Database, project_root: impl Into<PathBuf>) -> Self {
        Self {
            db,
            project_root: project_root.into(),
        }
    }
}

#[async_trait]
impl DatasetLoader for SqliteDatasetLoader {
    async fn reset(&self, name: &str) -> E2eResult<()> {
        let path = self.project_root.join(name);
        self.db.import_dump_file(&path).map_err(|e| {
            E2eError::DatasetImport(format!("{}: {}", path.display(), e))
        })
    }
}

/// Runs an external import command. `{dump}` in an argument is replaced by
/// the dataset name; without a placeholder the name is appended.
pub struct CommandDatasetLoader {
    program: String,
    args: Vec<String>,
    working_dir: PathBuf,
}

impl CommandDatasetLoader {
    pub fn new(program: impl Into<String>, args: Vec<String>, working_dir: impl Into<PathBuf>) -> Self {
        Self {
            program: program.into(),
            args,
            working_dir: working_dir.into(),
        }
    }

    fn command_args(&self, name: &str) -> Vec<String> {
        let mut substituted = false;
        let mut args: Vec<String> = self
            .args
            .iter()
            .map(|arg| {
                if arg.contains("{dump}") {
                    substituted = true;
                    arg.replace("{dump}", name)
                } else {
                    arg.clone()
                }
            })
            .collect();

        if !substituted {
            args.push(name.to_string());
        }
        args
    }
}

#[async_trait]
impl DatasetLoader for CommandDatasetLoader {
    async fn reset(&self, name: &str) -> E2eResult<()> {
        let args = self.command_args(name);
        debug!("Running {} {}", self.program, args.join(" "));

        let output = Command::new(&self.program)
            .args(&args)
            .current_dir(&self.working_dir)
            .output()
            .await
            .map_err(|e| E2eError::DatasetImport(format!("failed to spawn {}: {}", self.program, e)))?;

        if !output.status.success() {
            return Err(E2eError::DatasetImport(format!(
                "{} exited with {}: {}",
                self.program,
                output.status,
                String::from_utf8_lossy(&output.stderr).trim()
            )));
        }

        Ok(())
    }
}

/// Restores the baseline dataset before every scenario not tagged read-only
pub struct FixtureHook {
    loader: Box<dyn DatasetLoader>,
    dump: String,
}

impl FixtureHook {
    pub fn new(loader: Box<dyn DatasetLoader>) -> Self {
        Self::with_dump(loader, DUMP)
    }

    pub fn with_dump(loader: Box<dyn DatasetLoader>, dump: impl Into<String>) -> Self {
        Self {
            loader,
            dump: dump.into(),
        }
    }
}

#[async_trait]
impl LifecycleHook for FixtureHook {
    async fn before_scenario(&mut self, scenario: &ScenarioScope) -> E2eResult<()> {
        if scenario.scenario_has_tag(READ_ONLY_TAG) || scenario.feature_has_tag(READ_ONLY_TAG) {
            debug!("Keeping database for read-only scenario {}", scenario.label);
            return Ok(());
        }

        self.loader.reset(&self.dump).await?;
        info!("Loaded fixtures {} for {}", self.dump, scenario.label);
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_dump_placeholder_is_substituted() {
        let loader = CommandDatasetLoader::new(
            "sqlite3",
            vec!["var/skeleton.db".to_string(), ".read {dump}".to_string()],
            ".",
        );
        assert_eq!(loader.command_args(DUMP), vec!["var/skeleton.db", ".read dump/skeleton.sql"]);
    }

    #[test]
    fn test_dump_appended_without_placeholder() {
        let loader = CommandDatasetLoader::new(
            "bin/console",
            vec!["database:import".to_string()],
            ".",
        );
        assert_eq!(loader.command_args(DUMP), vec!["database:import", "dump/skeleton.sql"]);
    }
}
