//! Classified webhook event types.
//!
//! The gate reacts to three GitHub events:
//!
//! - `pull_request` - opened, synchronize and reopened trigger a check
//! - `check_run` - a user pressed "Re-run" on our check run
//! - `check_suite` - a user re-ran the whole suite
//!
//! Everything the evaluation needs is pulled out of the payload up front, so the
//! worker never touches raw JSON.

use serde::{Deserialize, Serialize};

use crate::policy::Profile;
use crate::types::{InstallationId, PrNumber, RepoId, Sha};

/// The three event kinds the gate accepts.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum EventKind {
    PullRequest,
    CheckRun,
    CheckSuite,
}

impl EventKind {
    /// Maps an `X-GitHub-Event` header value to a kind.
    pub fn from_header(event_type: &str) -> Option<Self> {
        match event_type {
            "pull_request" => Some(EventKind::PullRequest),
            "check_run" => Some(EventKind::CheckRun),
            "check_suite" => Some(EventKind::CheckSuite),
            _ => None,
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            EventKind::PullRequest => "pull_request",
            EventKind::CheckRun => "check_run",
            EventKind::CheckSuite => "check_suite",
        }
    }
}

/// Repository identity as reported in the webhook.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Repository {
    /// Owner and name.
    pub id: RepoId,

    /// `owner/name`, exactly as GitHub sent it.
    pub full_name: String,

    /// Browser URL, used for shared-repository matching.
    pub html_url: String,

    /// Whether the repository is private. The gate only applies to private repositories.
    pub private: bool,
}

/// A webhook that requires an evaluation.
///
/// Immutable once classified; one per inbound delivery.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct WebhookEvent {
    pub kind: EventKind,

    /// The raw `action` field (e.g. "opened", "rerequested").
    pub action: String,

    pub repository: Repository,

    pub installation_id: InstallationId,

    /// The commit the check run is attached to.
    pub head_sha: Sha,

    /// The PR the commit belongs to.
    ///
    /// For check_run and check_suite events this is the first associated PR.
    pub pr_number: PrNumber,

    /// API URL of the repository the payload names. Recorded on the
    /// evaluation span; requests go through the repository-scoped client.
    pub check_url: String,

    /// Browser URL of the PR or check suite, for logs only.
    pub details_url: Option<String>,
}

/// Why an accepted event does not lead to an evaluation.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum NoOpReason {
    /// The action is not one that triggers a check (e.g. `check_suite.created`).
    IgnoredAction,
    /// Public repositories are never gated.
    PublicRepository,
    /// The repository is on the profile's shared-repository exclusion list.
    SharedRepository,
}

/// Result of classifying an accepted webhook.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum ClassifiedEvent {
    /// Run the gate against this event with the given profile.
    Evaluate {
        event: WebhookEvent,
        profile: Profile,
    },

    /// A pull request was closed. This is not gated; the dispatcher only logs it.
    PullRequestClosed { repo: RepoId, pr_number: PrNumber },

    /// Accepted, but nothing to do.
    NoOp(NoOpReason),
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn event_kind_from_header() {
        assert_eq!(
            EventKind::from_header("pull_request"),
            Some(EventKind::PullRequest)
        );
        assert_eq!(EventKind::from_header("check_run"), Some(EventKind::CheckRun));
        assert_eq!(
            EventKind::from_header("check_suite"),
            Some(EventKind::CheckSuite)
        );
        assert_eq!(EventKind::from_header("push"), None);
        assert_eq!(EventKind::from_header("Pull_Request"), None);
    }

    #[test]
    fn event_kind_roundtrips_header_string() {
        for kind in [
            EventKind::PullRequest,
            EventKind::CheckRun,
            EventKind::CheckSuite,
        ] {
            assert_eq!(EventKind::from_header(kind.as_str()), Some(kind));
        }
    }
}
