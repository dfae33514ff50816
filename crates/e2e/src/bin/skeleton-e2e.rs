//! Acceptance test runner entry point
//!
//! Run with: cargo run --package skeleton-e2e -- --config e2e.toml

use clap::Parser;
use std::path::PathBuf;
use tracing::info;
use tracing_subscriber::EnvFilter;

use skeleton_e2e::config::{DriverChoice, E2eConfig};
use skeleton_e2e::server::ServerHandle;
use skeleton_e2e::{E2eResult, ErrorCaptureHook, FixtureHook, HookDispatcher, ScenarioFilter, TestRunner};

#[derive(Parser, Debug)]
#[command(name = "skeleton-e2e")]
#[command(about = "Acceptance test runner for Skeleton")]
struct Args {
    /// Configuration file
    #[arg(short, long, default_value = "e2e.toml")]
    config: PathBuf,

    /// Path to feature files directory
    #[arg(short, long)]
    features: Option<PathBuf>,

    /// Run only scenarios carrying this tag
    #[arg(short, long)]
    tag: Option<String>,

    /// Run only the scenario with this name
    #[arg(short, long)]
    name: Option<String>,

    /// Driver to use (playwright, http)
    #[arg(long)]
    driver: Option<DriverChoice>,

    /// Run against an already running server at this URL
    #[arg(long)]
    base_url: Option<String>,

    /// Domain used in artifact preview links
    #[arg(long)]
    local_domain: Option<String>,

    /// Do not spawn the web server
    #[arg(long)]
    no_server: bool,

    /// Output directory for results
    #[arg(short, long)]
    output: Option<PathBuf>,
}

impl Args {
    fn apply(self, config: &mut E2eConfig) -> ScenarioFilter {
        if let Some(features) = self.features {
            config.features_dir = features;
        }
        if let Some(driver) = self.driver {
            config.driver = driver;
        }
        if let Some(base_url) = self.base_url {
            config.base_url = base_url;
            config.server.enabled = false;
        }
        if let Some(local_domain) = self.local_domain {
            config.local_domain = local_domain;
        }
        if self.no_server {
            config.server.enabled = false;
        }
        if let Some(output) = self.output {
            config.output_dir = output;
        }

        match (self.name, self.tag) {
            (Some(name), _) => ScenarioFilter::Name(name),
            (None, Some(tag)) => ScenarioFilter::Tag(tag),
            (None, None) => ScenarioFilter::All,
        }
    }
}

fn main() {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .with_writer(std::io::stderr)
        .init();

    let args = Args::parse();

    let rt = match tokio::runtime::Runtime::new() {
        Ok(rt) => rt,
        Err(e) => {
            eprintln!("Error: failed to create tokio runtime: {}", e);
            std::process::exit(2);
        }
    };

    match rt.block_on(async_main(args)) {
        Ok(true) => std::process::exit(0),
        Ok(false) => std::process::exit(1),
        Err(e) => {
            eprintln!("Error: {}", e);
            std::process::exit(2);
        }
    }
}

async fn async_main(args: Args) -> E2eResult<bool> {
    let mut config = E2eConfig::load(&args.config)?;
    let filter = args.apply(&mut config);

    // Kept alive until the run is over, dropping it stops the server
    let server = if config.server.enabled {
        Some(ServerHandle::spawn(&config.server_config()).await?)
    } else {
        None
    };
    let base_url = server
        .as_ref()
        .map(|s| s.base_url().to_string())
        .unwrap_or_else(|| config.base_url.clone());

    let driver = config.build_driver(&base_url)?;
    info!("Using {} driver against {}", driver.kind(), base_url);

    let mut hooks = HookDispatcher::new();
    hooks
        .register("error_capture", Box::new(ErrorCaptureHook::new(config.trace_store())))
        .register(
            "fixtures",
            Box::new(FixtureHook::with_dump(config.build_loader()?, config.dataset.dump.clone())),
        );

    let mut runner = TestRunner::new(
        driver,
        hooks,
        config.resolve(&config.features_dir),
        config.resolve(&config.output_dir),
    );

    let results = runner.run_filtered(&filter).await?;
    runner.write_results(&results)?;

    drop(server);
    Ok(results.success())
}
