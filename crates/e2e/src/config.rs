//! Runner configuration

use serde::{Deserialize, Serialize};
use skeleton_common::Database;
use std::path::{Path, PathBuf};

use crate::artifact::TraceStore;
use crate::capture::DEFAULT_LOCAL_DOMAIN;
use crate::driver::BrowserDriver;
use crate::error::E2eResult;
use crate::fixtures::{CommandDatasetLoader, DatasetLoader, SqliteDatasetLoader, DUMP};
use crate::http_driver::HttpDriver;
use crate::playwright::{PlaywrightConfig, PlaywrightDriver};
use crate::server::ServerConfig;

/// Runner configuration, usually read from `e2e.toml`
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct E2eConfig {
    /// Relative paths below are resolved against this directory
    pub project_root: PathBuf,

    /// Domain the public directory is reachable under, used in preview links
    pub local_domain: String,

    pub features_dir: PathBuf,

    pub output_dir: PathBuf,

    pub driver: DriverChoice,

    /// Target URL when the server is not spawned by the runner
    pub base_url: String,

    pub playwright: PlaywrightConfig,

    pub dataset: DatasetConfig,

    pub server: ServerConfig,
}

impl Default for E2eConfig {
    fn default() -> Self {
        Self {
            project_root: PathBuf::from("."),
            local_domain: DEFAULT_LOCAL_DOMAIN.to_string(),
            features_dir: PathBuf::from("features"),
            output_dir: PathBuf::from("target/e2e-results"),
            driver: DriverChoice::Playwright,
            base_url: "http://127.0.0.1:8080".to_string(),
            playwright: PlaywrightConfig::default(),
            dataset: DatasetConfig::default(),
            server: ServerConfig::default(),
        }
    }
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum DriverChoice {
    /// Real browser through Playwright
    #[default]
    Playwright,
    /// HTTP-only simulation
    Http,
}

impl std::str::FromStr for DriverChoice {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "playwright" => Ok(DriverChoice::Playwright),
            "http" => Ok(DriverChoice::Http),
            other => Err(format!("unknown driver '{}', expected playwright or http", other)),
        }
    }
}

/// Dataset restored before each scenario
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct DatasetConfig {
    /// Dump passed to the loader, relative to the project root
    pub dump: String,
    pub loader: LoaderConfig,
}

impl Default for DatasetConfig {
    fn default() -> Self {
        Self {
            dump: DUMP.to_string(),
            loader: LoaderConfig::default(),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum LoaderConfig {
    /// Replay the dump into a SQLite file, the server's by default
    Sqlite {
        #[serde(default)]
        database: Option<PathBuf>,
    },
    /// Run an external import command
    Command {
        program: String,
        #[serde(default)]
        args: Vec<String>,
    },
}

impl Default for LoaderConfig {
    fn default() -> Self {
        LoaderConfig::Sqlite { database: None }
    }
}

impl E2eConfig {
    /// Load configuration from file, defaults when the file is absent
    pub fn load(path: &Path) -> E2eResult<Self> {
        if path.exists() {
            let content = std::fs::read_to_string(path)?;
            let config: Self = toml::from_str(&content)?;
            Ok(config)
        } else {
            Ok(Self::default())
        }
    }

    /// `path` as is when absolute, below the project root otherwise
    pub fn resolve(&self, path: &Path) -> PathBuf {
        if path.is_absolute() {
            path.to_path_buf()
        } else {
            self.project_root.join(path)
        }
    }

    /// Server settings with paths resolved
    pub fn server_config(&self) -> ServerConfig {
        ServerConfig {
            binary_path: self.resolve(&self.server.binary_path),
            db_path: self.resolve(&self.server.db_path),
            public_dir: self.resolve(&self.server.public_dir),
            ..self.server.clone()
        }
    }

    pub fn trace_store(&self) -> TraceStore {
        TraceStore::new(&self.project_root, self.local_domain.clone())
    }

    pub fn build_driver(&self, base_url: &str) -> E2eResult<Box<dyn BrowserDriver>> {
        match self.driver {
            DriverChoice::Playwright => {
                let config = PlaywrightConfig {
                    base_url: base_url.to_string(),
                    ..self.playwright.clone()
                };
                Ok(Box::new(PlaywrightDriver::new(config)?))
            }
            DriverChoice::Http => Ok(Box::new(HttpDriver::new(base_url)?)),
        }
    }

    pub fn build_loader(&self) -> E2eResult<Box<dyn DatasetLoader>> {
        match &self.dataset.loader {
            LoaderConfig::Sqlite { database } => {
                let path = match database {
                    Some(path) => self.resolve(path),
                    None => self.resolve(&self.server.db_path),
                };
                let db = Database::open(&path)?;
                Ok(Box::new(SqliteDatasetLoader::new(db, &self.project_root)))
            }
            LoaderConfig::Command { program, args } => Ok(Box::new(CommandDatasetLoader::new(
                program.clone(),
                args.clone(),
                &self.project_root,
            ))),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_missing_file_gives_defaults() {
        let dir = tempfile::tempdir().unwrap();
        let config = E2eConfig::load(&dir.path().join("e2e.toml")).unwrap();

        assert_eq!(config.local_domain, "https://skeleton.docker");
        assert_eq!(config.driver, DriverChoice::Playwright);
        assert_eq!(config.dataset.dump, "dump/skeleton.sql");
        assert!(matches!(config.dataset.loader, LoaderConfig::Sqlite { database: None }));
    }

    #[test]
    fn test_partial_file_keeps_other_defaults() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("e2e.toml");
        std::fs::write(
            &path,
            r#"
local_domain = "http://localhost:8000"
driver = "http"

[dataset.loader]
type = "command"
program = "bin/console"
args = ["doctrine:database:import"]

[server]
enabled = false
"#,
        )
        .unwrap();

        let config = E2eConfig::load(&path).unwrap();
        assert_eq!(config.local_domain, "http://localhost:8000");
        assert_eq!(config.driver, DriverChoice::Http);
        assert_eq!(config.features_dir, PathBuf::from("features"));
        assert!(!config.server.enabled);
        match config.dataset.loader {
            LoaderConfig::Command { program, args } => {
                assert_eq!(program, "bin/console");
                assert_eq!(args, vec!["doctrine:database:import"]);
            }
            other => panic!("unexpected loader: {:?}", other),
        }
    }

    #[test]
    fn test_invalid_toml_is_an_error() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("e2e.toml");
        std::fs::write(&path, "driver = [").unwrap();
        assert!(E2eConfig::load(&path).is_err());
    }

    #[test]
    fn test_relative_paths_resolve_against_project_root() {
        let config = E2eConfig {
            project_root: PathBuf::from("/srv/skeleton"),
            ..Default::default()
        };
        assert_eq!(config.resolve(Path::new("features")), PathBuf::from("/srv/skeleton/features"));
        assert_eq!(config.resolve(Path::new("/tmp/x")), PathBuf::from("/tmp/x"));
        assert_eq!(
            config.server_config().public_dir,
            PathBuf::from("/srv/skeleton/public")
        );
    }

    #[test]
    fn test_driver_choice_from_str() {
        assert_eq!("http".parse::<DriverChoice>().unwrap(), DriverChoice::Http);
        assert!("selenium".parse::<DriverChoice>().is_err());
    }
}
