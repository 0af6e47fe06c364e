//! Webhook endpoint handler.
//!
//! Verifies the signature, classifies the event, and hands evaluations to the
//! dispatcher before answering. The check run itself is created
//! asynchronously, so a 200 here only means "accepted".

use axum::Json;
use axum::body::Bytes;
use axum::extract::State;
use axum::http::{HeaderMap, StatusCode};
use axum::response::{IntoResponse, Response};
use serde_json::{Value, json};
use thiserror::Error;
use tracing::{debug, info, warn};

use super::AppState;
use crate::webhooks::{ClassifiedEvent, ClassifyError, classify_webhook, verify_signature};
use crate::worker::EvaluationJob;

/// Header name for GitHub event type.
const HEADER_EVENT: &str = "x-github-event";
/// Header name for GitHub's HMAC-SHA1 signature.
const HEADER_SIGNATURE: &str = "x-hub-signature";

/// Reasons a webhook is rejected.
#[derive(Debug, Error)]
pub enum WebhookError {
    /// Missing required header.
    #[error("missing required header: {0}")]
    MissingHeader(&'static str),

    /// Missing or incorrect signature.
    #[error("signature rejected")]
    SignatureRejected,

    /// An event kind the gate does not handle.
    #[error("unsupported event: {0}")]
    UnsupportedEvent(String),

    /// Invalid JSON body.
    #[error("invalid JSON body: {0}")]
    InvalidJson(#[from] serde_json::Error),
}

impl IntoResponse for WebhookError {
    fn into_response(self) -> Response {
        let message = match &self {
            WebhookError::MissingHeader(_)
            | WebhookError::SignatureRejected
            | WebhookError::UnsupportedEvent(_) => "Invalid Sender".to_string(),
            WebhookError::InvalidJson(_) => self.to_string(),
        };

        (StatusCode::BAD_REQUEST, Json(json!({ "error": message }))).into_response()
    }
}

/// The fixed acknowledgement body.
fn accepted() -> (StatusCode, Json<Value>) {
    (StatusCode::OK, Json(json!({ "Status": 200 })))
}

/// Webhook handler.
///
/// # Request
///
/// - Method: POST
/// - Required headers:
///   - `X-GitHub-Event`: `pull_request`, `check_run` or `check_suite`
///   - `X-Hub-Signature`: HMAC-SHA1 signature of the body
/// - Body: JSON webhook payload
///
/// # Response
///
/// - 200 `{"Status": 200}`: accepted (evaluated, or deliberately ignored)
/// - 400 `{"error": "Invalid Sender"}`: missing header, bad signature or
///   unsupported event
/// - 400: body is not JSON
pub async fn webhook_handler(
    State(app_state): State<AppState>,
    headers: HeaderMap,
    body: Bytes,
) -> Result<(StatusCode, Json<Value>), WebhookError> {
    let event_type =
        get_header(&headers, HEADER_EVENT).ok_or(WebhookError::MissingHeader(HEADER_EVENT))?;
    let signature = get_header(&headers, HEADER_SIGNATURE);

    debug!(event_type = %event_type, "Received webhook");

    // Verify before parsing anything.
    if !verify_signature(&body, signature.as_deref(), app_state.webhook_secret()) {
        warn!(event_type = %event_type, "Rejected webhook signature");
        return Err(WebhookError::SignatureRejected);
    }

    let payload: Value = serde_json::from_slice(&body)?;

    match classify_webhook(&event_type, &payload, app_state.policy()) {
        Ok(ClassifiedEvent::Evaluate { event, profile }) => {
            info!(
                repo = %event.repository.id,
                sha = %event.head_sha,
                pr = %event.pr_number,
                event_type = %event_type,
                action = %event.action,
                profile = profile.as_str(),
                "Dispatching evaluation"
            );
            app_state.dispatcher().dispatch(EvaluationJob { event, profile });
        }
        Ok(ClassifiedEvent::PullRequestClosed { repo, pr_number }) => {
            info!(repo = %repo, pr = %pr_number, "Pull request closed; nothing to check");
        }
        Ok(ClassifiedEvent::NoOp(reason)) => {
            debug!(event_type = %event_type, reason = ?reason, "Ignoring webhook");
        }
        Err(ClassifyError::UnsupportedEvent(kind)) => {
            warn!(event_type = %kind, "Unsupported webhook event");
            return Err(WebhookError::UnsupportedEvent(kind));
        }
        Err(ClassifyError::MalformedPayload(path)) => {
            warn!(event_type = %event_type, field = %path, "Malformed webhook payload");
        }
    }

    Ok(accepted())
}

/// Extracts a header value as a string.
fn get_header(headers: &HeaderMap, name: &'static str) -> Option<String> {
    headers
        .get(name)
        .and_then(|v| v.to_str().ok())
        .map(|s| s.to_string())
}

#[cfg(test)]
mod tests {
    use super::*;
    use http_body_util::BodyExt;

    async fn body_json(response: Response) -> Value {
        let bytes = response.into_body().collect().await.unwrap().to_bytes();
        serde_json::from_slice(&bytes).unwrap()
    }

    #[tokio::test]
    async fn sender_errors_share_one_body() {
        for err in [
            WebhookError::MissingHeader(HEADER_EVENT),
            WebhookError::SignatureRejected,
            WebhookError::UnsupportedEvent("push".into()),
        ] {
            let response = err.into_response();
            assert_eq!(response.status(), StatusCode::BAD_REQUEST);
            assert_eq!(body_json(response).await, json!({ "error": "Invalid Sender" }));
        }
    }

    #[tokio::test]
    async fn invalid_json_is_bad_request() {
        let err = serde_json::from_slice::<Value>(b"not json").unwrap_err();
        let response = WebhookError::from(err).into_response();
        assert_eq!(response.status(), StatusCode::BAD_REQUEST);
    }

    #[test]
    fn header_lookup_is_case_insensitive() {
        let mut headers = HeaderMap::new();
        headers.insert("X-GitHub-Event", "pull_request".parse().unwrap());
        assert_eq!(get_header(&headers, HEADER_EVENT).as_deref(), Some("pull_request"));
        assert_eq!(get_header(&headers, HEADER_SIGNATURE), None);
    }
}
