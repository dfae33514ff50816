use std::net::SocketAddr;
use std::path::PathBuf;

use tracing::info;

use skeleton_web::server::WebServerConfig;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("info")),
        )
        .with_writer(std::io::stderr)
        .init();

    let web_addr: SocketAddr = std::env::var("SKELETON_WEB_ADDR")
        .unwrap_or_else(|_| "127.0.0.1:8080".to_string())
        .parse()?;

    let db_path = std::env::var("SKELETON_DB_PATH")
        .map(PathBuf::from)
        .unwrap_or_else(|_| skeleton_common::default_db_path());

    let public_dir = std::env::var("SKELETON_PUBLIC_DIR")
        .map(PathBuf::from)
        .unwrap_or_else(|_| PathBuf::from("public"));

    let cfg = WebServerConfig { db_path, public_dir };

    info!(
        "Starting Skeleton on http://{} (db: {}, public: {})",
        web_addr,
        cfg.db_path.display(),
        cfg.public_dir.display()
    );

    skeleton_web::server::serve(web_addr, cfg).await
}
