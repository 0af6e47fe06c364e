use std::sync::Arc;
use std::time::Duration;

use anyhow::Context;
use clap::Parser;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use about_gate::config::Config;
use about_gate::github::{GitHubApp, install_crypto_provider};
use about_gate::metadata::SchemaSet;
use about_gate::references::ValidatorSet;
use about_gate::server::{AppState, build_router};
use about_gate::worker::TaskDispatcher;

/// Upper bound on a single Jira or PagerDuty request.
const REFERENCE_TIMEOUT: Duration = Duration::from_secs(30);

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    install_crypto_provider();

    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "about_gate=info,tower_http=info".into()),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();

    let config = Config::parse();

    let secrets = config.github_secrets()?;
    let credentials = Arc::new(config.credentials()?);
    let policy = config.policy()?;

    let app = GitHubApp::new(
        secrets.app_id,
        &secrets.pem_key,
        config.github_api.as_deref(),
        config.check_name.clone(),
    )
    .context("failed to configure the GitHub App client")?;

    let http = reqwest::Client::builder()
        .timeout(REFERENCE_TIMEOUT)
        .build()
        .context("failed to build the HTTP client")?;
    let validators = ValidatorSet::http(http, &config.jira_api, &config.pagerduty_url, credentials);
    let schemas = SchemaSet::bundled().context("bundled schemas failed to compile")?;

    let dispatcher = Arc::new(TaskDispatcher::new(app, validators, schemas));
    let state = AppState::new(secrets.webhook_secret.into_bytes(), policy, dispatcher.clone());
    let router = build_router(state);

    let listener = tokio::net::TcpListener::bind(config.listen)
        .await
        .with_context(|| format!("failed to bind {}", config.listen))?;
    tracing::info!(
        addr = %config.listen,
        alternate_orgs = config.alternate_orgs.len(),
        check_name = %config.check_name,
        "listening"
    );

    axum::serve(listener, router)
        .with_graceful_shutdown(shutdown_signal())
        .await
        .context("server error")?;

    dispatcher.shutdown().await;
    tracing::info!("shut down");
    Ok(())
}

async fn shutdown_signal() {
    if let Err(e) = tokio::signal::ctrl_c().await {
        tracing::error!(error = %e, "failed to listen for shutdown signal");
        std::future::pending::<()>().await;
    }
    tracing::info!("shutdown signal received");
}
