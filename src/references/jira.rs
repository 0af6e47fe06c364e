//! Jira project lookup.

use std::sync::Arc;

use serde::Deserialize;
use tracing::warn;

use super::{Credentials, ReferenceCheckResult, ReferenceError, ReferenceValidator};

/// Category Jira assigns to retired projects.
const DEFUNCT_CATEGORY: &str = "Defunct";

/// Validates `jira_id` against `GET {base_url}{project_id}`.
#[derive(Debug, Clone)]
pub struct JiraValidator {
    client: reqwest::Client,
    base_url: String,
    credentials: Arc<Credentials>,
}

impl JiraValidator {
    pub fn new(
        client: reqwest::Client,
        base_url: impl Into<String>,
        credentials: Arc<Credentials>,
    ) -> Self {
        JiraValidator {
            client,
            base_url: base_url.into(),
            credentials,
        }
    }
}

#[derive(Debug, Deserialize)]
struct Project {
    #[serde(rename = "projectCategory")]
    project_category: Option<ProjectCategory>,
}

#[derive(Debug, Deserialize)]
struct ProjectCategory {
    name: Option<String>,
}

/// Maps a Jira response to a check result.
pub(crate) fn classify_response(status: u16, body: &[u8]) -> ReferenceCheckResult {
    match status {
        200 => match serde_json::from_slice::<Project>(body) {
            Ok(Project {
                project_category: Some(ProjectCategory { name: Some(name) }),
            }) => {
                if name == DEFUNCT_CATEGORY {
                    ReferenceCheckResult::Invalid
                } else {
                    ReferenceCheckResult::Valid
                }
            }
            Ok(_) => ReferenceCheckResult::Error(ReferenceError::ServiceFailure(
                "project has no category".to_string(),
            )),
            Err(e) => ReferenceCheckResult::Error(ReferenceError::ServiceFailure(format!(
                "undecodable project body: {}",
                e
            ))),
        },
        404 => ReferenceCheckResult::Invalid,
        401 | 403 => ReferenceCheckResult::Error(ReferenceError::AuthFailure),
        other => ReferenceCheckResult::Error(ReferenceError::ServiceFailure(format!(
            "Jira returned HTTP {}",
            other
        ))),
    }
}

impl ReferenceValidator for JiraValidator {
    async fn check(&self, project_id: &str) -> ReferenceCheckResult {
        let url = format!("{}{}", self.base_url, project_id);
        let request = self.client.get(&url).basic_auth(
            &self.credentials.jira_username,
            Some(&self.credentials.jira_password),
        );

        let response = match request.send().await {
            Ok(response) => response,
            Err(e) => {
                warn!(project_id, error = %e, "Jira request failed");
                return ReferenceCheckResult::Error(ReferenceError::ServiceFailure(e.to_string()));
            }
        };

        let status = response.status().as_u16();
        let body = match response.bytes().await {
            Ok(body) => body,
            Err(e) => {
                warn!(project_id, status, error = %e, "Failed to read Jira response");
                return ReferenceCheckResult::Error(ReferenceError::ServiceFailure(e.to_string()));
            }
        };

        let result = classify_response(status, &body);
        if result.is_error() {
            warn!(project_id, status, %result, "Jira project lookup failed");
        }
        result
    }
}
