//! lucid-ai - AI-assist microservice
//!
//! Validates the caller's entitlement, forwards a templated prompt to the
//! AI gateway with a forced tool call, and returns the structured output.
//! Default port: 5840

use anyhow::{Context, Result};
use clap::Parser;
use lucid_common::auth::HttpAuthProvider;
use lucid_common::config::{
    load_toml_config, prepare_root_folder, resolve_auth_settings, resolve_gateway_settings,
    RootFolderResolver,
};
use std::path::PathBuf;
use std::sync::Arc;
use tracing::{info, warn};
use tracing_subscriber::EnvFilter;

use lucid_ai::gateway::HttpGateway;
use lucid_ai::{build_router, AppState};

#[derive(Debug, Parser)]
#[command(name = "lucid-ai", version, about = "AI-assist dispatcher")]
struct Args {
    /// Root folder holding lucid.db
    #[arg(long)]
    root_folder: Option<PathBuf>,

    /// Path to config.toml
    #[arg(long, env = "LUCID_CONFIG")]
    config: Option<PathBuf>,

    /// Listen address
    #[arg(long, env = "LUCID_AI_BIND", default_value = "127.0.0.1:5840")]
    bind: String,
}

#[tokio::main]
async fn main() -> Result<()> {
    let args = Args::parse();
    let loaded = load_toml_config(args.config.as_deref());

    // RUST_LOG wins over the config file level
    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new(&loaded.config.logging.level));
    tracing_subscriber::fmt().with_env_filter(filter).init();

    info!(
        "Starting lucid-ai v{} [{}] built {} ({})",
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

    let gateway_settings = resolve_gateway_settings(&toml)?;
    info!(
        "AI gateway: {} (model {}, timeout {}s)",
        gateway_settings.url, gateway_settings.model, gateway_settings.timeout_secs
    );
    let gateway = HttpGateway::new(&gateway_settings)?;

    let state = AppState::new(
        db,
        Arc::new(auth),
        Arc::new(gateway),
        gateway_settings.model.clone(),
    );
    let app = build_router(state);

    let listener = tokio::net::TcpListener::bind(&args.bind)
        .await
        .with_context(|| format!("Failed to bind {}", args.bind))?;
    info!("lucid-ai listening on http://{}", args.bind);
    info!("Health check: http://{}/health", args.bind);

    axum::serve(listener, app).await?;

    Ok(())
}
