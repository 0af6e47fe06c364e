//! PagerDuty schedule lookup.

use std::sync::Arc;

use reqwest::header::{ACCEPT, AUTHORIZATION};
use tracing::warn;

use super::{Credentials, ReferenceCheckResult, ReferenceError, ReferenceValidator};

const PAGERDUTY_ACCEPT: &str = "application/vnd.pagerduty+json;version=2";

/// Validates `pagerduty_id` against `GET {base_url}{schedule_id}/users`.
#[derive(Debug, Clone)]
pub struct PagerDutyValidator {
    client: reqwest::Client,
    base_url: String,
    credentials: Arc<Credentials>,
}

impl PagerDutyValidator {
    pub fn new(
        client: reqwest::Client,
        base_url: impl Into<String>,
        credentials: Arc<Credentials>,
    ) -> Self {
        PagerDutyValidator {
            client,
            base_url: base_url.into(),
            credentials,
        }
    }
}

pub(crate) fn classify_status(status: u16) -> ReferenceCheckResult {
    match status {
        200 => ReferenceCheckResult::Valid,
        404 => ReferenceCheckResult::Invalid,
        401 | 403 => ReferenceCheckResult::Error(ReferenceError::AuthFailure),
        other => ReferenceCheckResult::Error(ReferenceError::ServiceFailure(format!(
            "PagerDuty returned HTTP {}",
            other
        ))),
    }
}

impl ReferenceValidator for PagerDutyValidator {
    async fn check(&self, schedule_id: &str) -> ReferenceCheckResult {
        let url = format!("{}{}/users", self.base_url, schedule_id);
        let request = self
            .client
            .get(&url)
            .header(
                AUTHORIZATION,
                format!("Token token={}", self.credentials.pagerduty_token),
            )
            .header(ACCEPT, PAGERDUTY_ACCEPT);

        match request.send().await {
            Ok(response) => {
                let status = response.status().as_u16();
                let result = classify_status(status);
                if result.is_error() {
                    warn!(schedule_id, status, %result, "PagerDuty schedule lookup failed");
                }
                result
            }
            Err(e) => {
                warn!(schedule_id, error = %e, "PagerDuty request failed");
                ReferenceCheckResult::Error(ReferenceError::ServiceFailure(e.to_string()))
            }
        }
    }
}
