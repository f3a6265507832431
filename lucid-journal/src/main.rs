//! lucid-journal - journal microservice
//!
//! Cases and their entries, templates, SILVA spaces, shared workspaces,
//! HTML reports and the subscription read-out.
//! Default port: 5841

use anyhow::{Context, Result};
use clap::Parser;
use lucid_common::auth::HttpAuthProvider;
use lucid_common::config::{
    load_toml_config, prepare_root_folder, resolve_auth_settings, RootFolderResolver,
};
use std::path::PathBuf;
use std::sync::Arc;
use tracing::{info, warn};
use tracing_subscriber::EnvFilter;

use lucid_journal::{build_router, AppState};

#[derive(Debug, Parser)]
#[command(name = "lucid-journal", version, about = "Journal entities and reports")]
struct Args {
    /// Root folder holding lucid.db
    #[arg(long)]
    root_folder: Option<PathBuf>,

    /// Path to config.toml
    #[arg(long, env = "LUCID_CONFIG")]
    config: Option<PathBuf>,

    /// Listen address
    #[arg(long, env = "LUCID_JOURNAL_BIND", default_value = "127.0.0.1:5841")]
    bind: String,
}

#[tokio::main]
async fn main() -> Result<()> {
    let args = Args::parse();
    let loaded = load_toml_config(args.config.as_deref());

    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new(&loaded.config.logging.level));
    tracing_subscriber::fmt().with_env_filter(filter).init();

    info!(
        "Starting lucid-journal v{} [{}] built {} ({})",
        env!("CARGO_PKG_VERSION"),
        env!("GIT_HASH"),
        env!("BUILD_TIMESTAMP"),
        env!("BUILD_PROFILE")
    );

    if let Some(warning) = &loaded.warning {
        warn!("{}", warning);
    }
    if let Some(source) = &loaded.source {
        info!("Config: {}", source.display());
    }
    let toml = loaded.config;

    let root_folder = RootFolderResolver::new(args.root_folder).resolve(&toml);
    let db_path = prepare_root_folder(&root_folder)?;
    info!("Database: {}", db_path.display());

    let db = lucid_common::db::init_database(&db_path)
        .await
        .context("Failed to open database")?;

    let auth_settings = resolve_auth_settings(&toml)?;
    info!("Auth provider: {}", auth_settings.url);
    let auth = HttpAuthProvider::new(auth_settings)?;

    let app = build_router(AppState::new(db, Arc::new(auth)));

    let listener = tokio::net::TcpListener::bind(&args.bind)
        .await
        .with_context(|| format!("Failed to bind {}", args.bind))?;
    info!("lucid-journal listening on http://{}", args.bind);
    info!("Health check: http://{}/health", args.bind);

    axum::serve(listener, app).await?;

    Ok(())
}
