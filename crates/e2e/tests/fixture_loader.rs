//! Dataset reset before scenarios

mod helpers;

use std::path::{Path, PathBuf};

use helpers::{RecordingLoader, StubDriver};
use skeleton_common::{Database, UserRepository};
use skeleton_e2e::fixtures::{CommandDatasetLoader, DatasetLoader, SqliteDatasetLoader, DUMP, READ_ONLY_TAG};
use skeleton_e2e::hooks::ScenarioScope;
use skeleton_e2e::runner::ScenarioFilter;
use skeleton_e2e::{DriverKind, E2eError, Feature, FixtureHook, HookDispatcher, LifecycleHook, TestRunner};

const FEATURE: &str = r#"
name: Users
scenarios:
  - name: Browse users
    tags: ["read-only"]
    steps:
      - action: navigate
        url: /api/users
  - name: Edit a user
    steps:
      - action: navigate
        url: /api/users/1
"#;

fn feature(yaml: &str) -> Feature {
    let mut feature = Feature::from_yaml(yaml).unwrap();
    feature.path = PathBuf::from("features/users.yaml");
    feature
}

fn scope(feature: &Feature, index: usize) -> ScenarioScope {
    ScenarioScope::new(feature, &feature.scenarios[index], DriverKind::Simulated)
}

#[tokio::test]
async fn test_read_only_scenario_keeps_database() {
    let loader = RecordingLoader::default();
    let mut hook = FixtureHook::new(Box::new(loader.clone()));
    let feature = feature(FEATURE);

    hook.before_scenario(&scope(&feature, 0)).await.unwrap();

    assert!(loader.calls().is_empty());
}

#[tokio::test]
async fn test_read_only_feature_keeps_database() {
    let loader = RecordingLoader::default();
    let mut hook = FixtureHook::new(Box::new(loader.clone()));
    let mut feature = feature(FEATURE);
    feature.tags.push(format!("@{}", READ_ONLY_TAG));

    hook.before_scenario(&scope(&feature, 1)).await.unwrap();

    assert!(loader.calls().is_empty());
}

#[tokio::test]
async fn test_untagged_scenario_loads_dump_once() {
    let loader = RecordingLoader::default();
    let mut hook = FixtureHook::new(Box::new(loader.clone()));
    let feature = feature(FEATURE);

    hook.before_scenario(&scope(&feature, 1)).await.unwrap();

    assert_eq!(loader.calls(), vec![DUMP.to_string()]);
    assert_eq!(DUMP, "dump/skeleton.sql");
}

#[tokio::test]
async fn test_runner_resets_once_per_writable_scenario() {
    let dir = tempfile::tempdir().unwrap();
    let loader = RecordingLoader::default();
    let mut hooks = HookDispatcher::new();
    hooks.register("fixtures", Box::new(FixtureHook::new(Box::new(loader.clone()))));

    let mut runner = TestRunner::new(
        Box::new(StubDriver::new(DriverKind::Simulated)),
        hooks,
        dir.path().join("features"),
        dir.path().join("out"),
    );
    let result = runner
        .run_features(&[feature(FEATURE)], &ScenarioFilter::All)
        .await
        .unwrap();

    assert_eq!(result.passed, 2);
    assert_eq!(loader.calls(), vec![DUMP.to_string()]);
}

#[tokio::test]
async fn test_import_failure_aborts_run() {
    let dir = tempfile::tempdir().unwrap();
    let loader = RecordingLoader {
        fail: true,
        ..Default::default()
    };
    let driver = StubDriver::new(DriverKind::Simulated);
    let mut hooks = HookDispatcher::new();
    hooks.register("fixtures", Box::new(FixtureHook::new(Box::new(loader))));

    let mut runner = TestRunner::new(
        Box::new(driver.clone()),
        hooks,
        dir.path().join("features"),
        dir.path().join("out"),
    );
    let err = runner
        .run_features(&[feature(FEATURE)], &ScenarioFilter::All)
        .await
        .unwrap_err();

    match err {
        E2eError::Hook { name, source } => {
            assert_eq!(name, "fixtures");
            assert!(matches!(*source, E2eError::DatasetImport(_)));
        }
        other => panic!("unexpected error: {}", other),
    }
    // The read-only scenario ran, the writable one never started
    assert_eq!(driver.executed(), vec!["navigate:/api/users"]);
}

#[tokio::test]
async fn test_sqlite_loader_replaces_contents() {
    let dir = tempfile::tempdir().unwrap();
    std::fs::create_dir_all(dir.path().join("dump")).unwrap();
    std::fs::write(
        dir.path().join(DUMP),
        r#"
DROP TABLE IF EXISTS users;
CREATE TABLE users (
    id INTEGER PRIMARY KEY AUTOINCREMENT,
    email TEXT NOT NULL UNIQUE,
    roles TEXT NOT NULL DEFAULT '[]',
    password TEXT NOT NULL
);
INSERT INTO users (email, roles, password) VALUES ('fixture@skeleton.docker', '["ROLE_USER"]', 'secret');
"#,
    )
    .unwrap();

    let db = Database::open(dir.path().join("var").join("skeleton.db")).unwrap();
    let repo = UserRepository::new(db.clone());
    let mut stray = skeleton_common::User::new("stray@skeleton.docker");
    stray.set_password("secret");
    repo.insert(&mut stray).unwrap();

    let loader = SqliteDatasetLoader::new(db, dir.path());
    loader.reset(DUMP).await.unwrap();

    let users = repo.list().unwrap();
    assert_eq!(users.len(), 1);
    assert_eq!(users[0].email(), "fixture@skeleton.docker");
    assert!(repo.get_by_email("stray@skeleton.docker").unwrap().is_none());
}

#[tokio::test]
async fn test_sqlite_loader_missing_dump() {
    let dir = tempfile::tempdir().unwrap();
    let loader = SqliteDatasetLoader::new(Database::open_memory().unwrap(), dir.path());

    let err = loader.reset(DUMP).await.unwrap_err();
    assert!(matches!(err, E2eError::DatasetImport(_)));
}

#[tokio::test]
async fn test_bundled_dump_seeds_users() {
    let project_root = Path::new(env!("CARGO_MANIFEST_DIR")).join("..").join("..");
    let db = Database::open_memory().unwrap();
    let loader = SqliteDatasetLoader::new(db.clone(), &project_root);

    loader.reset(DUMP).await.unwrap();

    let repo = UserRepository::new(db);
    let admin = repo.get_by_email("admin@skeleton.docker").unwrap().unwrap();
    assert!(admin.has_role("ROLE_ADMIN"));
    assert_eq!(repo.list().unwrap().len(), 2);
}

#[cfg(unix)]
#[tokio::test]
async fn test_command_loader_exit_status() {
    let dir = tempfile::tempdir().unwrap();

    let ok = CommandDatasetLoader::new("true", Vec::new(), dir.path());
    ok.reset(DUMP).await.unwrap();

    let failing = CommandDatasetLoader::new("false", Vec::new(), dir.path());
    assert!(matches!(
        failing.reset(DUMP).await.unwrap_err(),
        E2eError::DatasetImport(_)
    ));

    let missing = CommandDatasetLoader::new("/nonexistent/console", Vec::new(), dir.path());
    assert!(matches!(
        missing.reset(DUMP).await.unwrap_err(),
        E2eError::DatasetImport(_)
    ));
}

#[cfg(unix)]
#[tokio::test]
async fn test_command_loader_receives_dump_path() {
    let dir = tempfile::tempdir().unwrap();
    let loader = CommandDatasetLoader::new(
        "sh",
        vec!["-c".to_string(), "echo \"$0\" > received".to_string(), "{dump}".to_string()],
        dir.path(),
    );

    loader.reset(DUMP).await.unwrap();

    let received = std::fs::read_to_string(dir.path().join("received")).unwrap();
    assert_eq!(received.trim(), DUMP);
}
