//! login-gate API server
//!
//! Configuration comes from the environment, optionally layered over a TOML
//! file named by `LOGIN_GATE_CONFIG`.

use anyhow::Context;
use login_gate_api::{auth::InMemoryDirectory, create_router, state::AppState};
use login_gate_core::config::{AppConfig, LoggingConfig};
use std::sync::Arc;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let config = load_config()?;
    init_tracing(&config.logging);

    let addr = format!("{}:{}", config.server.host, config.server.port);
    tracing::info!(auth = ?config.auth, "configuration loaded");

    let directory = Arc::new(InMemoryDirectory::new());
    let state = Arc::new(AppState::new(config, directory).context("startup failed")?);
    let app = create_router(state.clone());

    let listener = tokio::net::TcpListener::bind(&addr)
        .await
        .with_context(|| format!("failed to bind {addr}"))?;
    tracing::info!("login-gate API starting on http://{}", addr);
    tracing::info!(
        "Gate protects {} (public: {:?})",
        state.config.auth.base_path,
        state.config.auth.public_paths
    );

    axum::serve(listener, app).await?;

    Ok(())
}

fn load_config() -> anyhow::Result<AppConfig> {
    let config = match std::env::var("LOGIN_GATE_CONFIG") {
        Ok(path) => AppConfig::from_file(&path)?.with_env_override()?,
        Err(_) => AppConfig::from_env()?,
    };
    config.validate()?;
    Ok(config)
}

fn init_tracing(logging: &LoggingConfig) {
    let filter = tracing_subscriber::EnvFilter::try_from_default_env().unwrap_or_else(|_| {
        format!(
            "login_gate_api={level},audit={level},tower_http=info",
            level = logging.level
        )
        .into()
    });

    let builder = tracing_subscriber::fmt().with_env_filter(filter);
    if logging.json_format {
        builder.json().init();
    } else {
        builder.init();
    }
}
