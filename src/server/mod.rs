//! HTTP server for the about.yaml gate.
//!
//! # Endpoints
//!
//! - `POST /api/v1/validate-aboutyaml` - Accepts GitHub webhook deliveries
//! - `GET /api/v1/healthcheck` - Returns `{"healthcheck": "ready"}`

use std::sync::Arc;

use tower_http::trace::TraceLayer;

pub mod health;
pub mod webhook;

pub use health::health_handler;
pub use webhook::{WebhookError, webhook_handler};

use crate::policy::Policy;
use crate::worker::Dispatch;

/// Shared application state.
///
/// This is passed to all handlers via Axum's `State` extractor.
#[derive(Clone)]
pub struct AppState {
    inner: Arc<AppStateInner>,
}

struct AppStateInner {
    /// Secret for HMAC-SHA1 signature verification.
    webhook_secret: Vec<u8>,

    policy: Policy,

    dispatcher: Arc<dyn Dispatch>,
}

impl AppState {
    pub fn new(
        webhook_secret: impl Into<Vec<u8>>,
        policy: Policy,
        dispatcher: Arc<dyn Dispatch>,
    ) -> Self {
        AppState {
            inner: Arc::new(AppStateInner {
                webhook_secret: webhook_secret.into(),
                policy,
                dispatcher,
            }),
        }
    }

    /// Returns the webhook secret.
    pub fn webhook_secret(&self) -> &[u8] {
        &self.inner.webhook_secret
    }

    pub fn policy(&self) -> &Policy {
        &self.inner.policy
    }

    pub fn dispatcher(&self) -> &dyn Dispatch {
        self.inner.dispatcher.as_ref()
    }
}

/// Builds the axum Router with all endpoints.
pub fn build_router(app_state: AppState) -> axum::Router {
    use axum::routing::{get, post};

    axum::Router::new()
        .route("/api/v1/validate-aboutyaml", post(webhook_handler))
        .route("/api/v1/healthcheck", get(health_handler))
        .layer(TraceLayer::new_for_http())
        .with_state(app_state)
}
