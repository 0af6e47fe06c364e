//! External reference checks: does the Jira project exist, and is the
//! PagerDuty schedule real?
//!
//! Each check is tri-state. `Invalid` means the upstream answered and the
//! identifier is bad; `Error` means we could not get an answer, which cancels
//! the evaluation instead of failing it.

mod jira;
mod pagerduty;

pub use jira::JiraValidator;
pub use pagerduty::PagerDutyValidator;

use std::fmt;
use std::future::Future;
use std::sync::Arc;

use serde::{Deserialize, Serialize};
use thiserror::Error;
use tracing::debug;

/// The two identifiers a document references.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ReferenceKind {
    /// `jira_id`
    IssueTracker,
    /// `pagerduty_id`
    OnCall,
}

impl ReferenceKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            ReferenceKind::IssueTracker => "issue_tracker",
            ReferenceKind::OnCall => "on_call",
        }
    }
}

/// Why a reference check could not produce an answer.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ReferenceError {
    #[error("upstream rejected our credentials")]
    AuthFailure,

    #[error("upstream failure: {0}")]
    ServiceFailure(String),
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ReferenceCheckResult {
    Valid,
    Invalid,
    Error(ReferenceError),
}

impl ReferenceCheckResult {
    pub fn is_error(&self) -> bool {
        matches!(self, ReferenceCheckResult::Error(_))
    }
}

impl fmt::Display for ReferenceCheckResult {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ReferenceCheckResult::Valid => f.write_str("valid"),
            ReferenceCheckResult::Invalid => f.write_str("invalid"),
            ReferenceCheckResult::Error(e) => write!(f, "error ({})", e),
        }
    }
}

/// Checks one kind of identifier against its upstream service.
pub trait ReferenceValidator: Send + Sync {
    fn check(&self, id: &str) -> impl Future<Output = ReferenceCheckResult> + Send;
}

/// Upstream credentials, loaded once at startup.
///
/// Never refreshed in place: build a new [`ValidatorSet`] to rotate them.
#[derive(Clone)]
pub struct Credentials {
    pub jira_username: String,
    pub jira_password: String,
    pub pagerduty_token: String,
}

impl fmt::Debug for Credentials {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Credentials")
            .field("jira_username", &self.jira_username)
            .field("jira_password", &"<redacted>")
            .field("pagerduty_token", &"<redacted>")
            .finish()
    }
}

/// One validator per reference kind.
#[derive(Debug, Clone)]
pub struct ValidatorSet<I, O> {
    pub issue_tracker: I,
    pub on_call: O,
}

impl ValidatorSet<JiraValidator, PagerDutyValidator> {
    /// Builds the production validators sharing one HTTP client.
    pub fn http(
        client: reqwest::Client,
        jira_base_url: impl Into<String>,
        pagerduty_base_url: impl Into<String>,
        credentials: Arc<Credentials>,
    ) -> Self {
        ValidatorSet {
            issue_tracker: JiraValidator::new(client.clone(), jira_base_url, credentials.clone()),
            on_call: PagerDutyValidator::new(client, pagerduty_base_url, credentials),
        }
    }
}

impl<I: ReferenceValidator, O: ReferenceValidator> ValidatorSet<I, O> {
    /// Runs the check for `kind`.
    ///
    /// A missing identifier, or one that cannot be placed in a URL path, is
    /// `Invalid` without contacting the upstream.
    pub async fn check(&self, kind: ReferenceKind, id: Option<&str>) -> ReferenceCheckResult {
        let Some(id) = id.filter(|id| is_path_safe(id)) else {
            debug!(kind = kind.as_str(), id = ?id, "Reference identifier missing or unusable");
            return ReferenceCheckResult::Invalid;
        };

        let result = match kind {
            ReferenceKind::IssueTracker => self.issue_tracker.check(id).await,
            ReferenceKind::OnCall => self.on_call.check(id).await,
        };
        debug!(kind = kind.as_str(), id, %result, "Reference check finished");
        result
    }
}

/// Identifiers are interpolated into URL paths, so only plain segment
/// characters are accepted.
fn is_path_safe(id: &str) -> bool {
    !id.is_empty()
        && id
            .bytes()
            .all(|b| b.is_ascii_alphanumeric() || matches!(b, b'-' | b'_' | b'.'))
        && id != "."
        && id != ".."
}
