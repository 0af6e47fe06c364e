//! GitHub webhook payload classifier.
//!
//! Turns a verified webhook into a [`ClassifiedEvent`]: either an evaluation to
//! run, a closed PR, or a no-op.
//!
//! # Classification order
//!
//! 1. The `X-GitHub-Event` header must name a supported kind
//! 2. Repository identity (`owner`, `html_url`, `private`) must be present
//! 3. The owner's organization selects the [`Profile`]
//! 4. Public repositories and shared repositories are no-ops
//! 5. The kind-specific action filter and required fields are checked
//!
//! Pull request payloads have their identifying fields checked before the
//! action is looked at. Check run and check suite payloads are filtered on
//! action first, so a `check_suite.completed` with an unusual shape is still a
//! harmless no-op.

use serde_json::Value;
use thiserror::Error;

use crate::policy::{Policy, Profile};
use crate::types::{InstallationId, PrNumber, RepoId, Sha};

use super::events::{ClassifiedEvent, EventKind, NoOpReason, Repository, WebhookEvent};

/// Pull request actions that run the gate.
const PR_TRIGGER_ACTIONS: &[&str] = &["opened", "synchronize", "reopened"];

/// The only check run / check suite action that runs the gate.
const RERUN_ACTION: &str = "rerequested";

/// Why a webhook was rejected before any work was scheduled.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ClassifyError {
    /// The `X-GitHub-Event` header names an event the gate does not handle.
    #[error("unsupported event type: {0}")]
    UnsupportedEvent(String),

    /// A required field is missing or has the wrong type. Holds the field path.
    #[error("malformed payload: missing or invalid field {0}")]
    MalformedPayload(String),
}

/// Classifies a webhook payload.
///
/// # Arguments
///
/// * `event_type` - The value of the `X-GitHub-Event` header
/// * `payload` - The parsed JSON body (its signature is already verified)
/// * `policy` - Alternate-policy organizations and shared-repository lists
///
/// # Examples
///
/// ```
/// use about_gate::policy::Policy;
/// use about_gate::webhooks::{ClassifiedEvent, NoOpReason, classify_webhook};
///
/// let payload = serde_json::json!({
///     "action": "created",
///     "repository": {
///         "owner": { "login": "acme" },
///         "name": "widgets",
///         "html_url": "https://github.com/acme/widgets",
///         "private": true
///     }
/// });
///
/// let result = classify_webhook("check_suite", &payload, &Policy::default()).unwrap();
/// assert_eq!(result, ClassifiedEvent::NoOp(NoOpReason::IgnoredAction));
/// ```
pub fn classify_webhook(
    event_type: &str,
    payload: &Value,
    policy: &Policy,
) -> Result<ClassifiedEvent, ClassifyError> {
    let kind = EventKind::from_header(event_type)
        .ok_or_else(|| ClassifyError::UnsupportedEvent(event_type.to_string()))?;

    let html_url = str_at(payload, "repository.html_url")?;
    let owner = str_at(payload, "repository.owner.login")?;
    let private = bool_at(payload, "repository.private")?;

    let profile = policy.profile_for(owner);

    if !private {
        return Ok(ClassifiedEvent::NoOp(NoOpReason::PublicRepository));
    }
    if policy.is_shared(profile, html_url) {
        return Ok(ClassifiedEvent::NoOp(NoOpReason::SharedRepository));
    }

    match kind {
        EventKind::PullRequest => classify_pull_request(payload, profile),
        EventKind::CheckRun => classify_rerun(payload, profile, kind, "check_run"),
        EventKind::CheckSuite => classify_rerun(payload, profile, kind, "check_suite"),
    }
}

// ============================================================================
// pull_request event
// ============================================================================

fn classify_pull_request(payload: &Value, profile: Profile) -> Result<ClassifiedEvent, ClassifyError> {
    let action = str_at(payload, "action")?;
    let pr_number = PrNumber(u64_at(payload, "number")?);
    let repo = repo_id(payload)?;
    let installation_id = InstallationId(u64_at(payload, "installation.id")?);
    let details_url = str_at(payload, "pull_request.html_url")?;

    if action == "closed" {
        return Ok(ClassifiedEvent::PullRequestClosed { repo, pr_number });
    }
    if !PR_TRIGGER_ACTIONS.contains(&action) {
        return Ok(ClassifiedEvent::NoOp(NoOpReason::IgnoredAction));
    }

    let head_sha = sha_at(payload, "pull_request.head.sha")?;
    let check_url = str_at(payload, "pull_request.base.repo.url")?;

    Ok(ClassifiedEvent::Evaluate {
        event: WebhookEvent {
            kind: EventKind::PullRequest,
            action: action.to_string(),
            repository: repository(payload, repo)?,
            installation_id,
            head_sha,
            pr_number,
            check_url: check_url.to_string(),
            details_url: Some(details_url.to_string()),
        },
        profile,
    })
}

// ============================================================================
// check_run / check_suite events
// ============================================================================

/// Both re-run events share one shape; `object` is the top-level key
/// (`check_run` or `check_suite`) holding the run or suite.
fn classify_rerun(
    payload: &Value,
    profile: Profile,
    kind: EventKind,
    object: &'static str,
) -> Result<ClassifiedEvent, ClassifyError> {
    let action = str_at(payload, "action")?;
    if action != RERUN_ACTION {
        return Ok(ClassifiedEvent::NoOp(NoOpReason::IgnoredAction));
    }

    u64_at(payload, &format!("{object}.id"))?;
    let repo = repo_id(payload)?;
    let installation_id = InstallationId(u64_at(payload, "installation.id")?);
    let pr_number = PrNumber(u64_at(payload, &format!("{object}.pull_requests.0.number"))?);
    let head_sha = sha_at(payload, &format!("{object}.head_sha"))?;
    let check_url = str_at(payload, "repository.url")?;
    let details_url = lookup(payload, &format!("{object}.html_url"))
        .or_else(|| lookup(payload, &format!("{object}.url")))
        .and_then(Value::as_str)
        .map(str::to_string);

    Ok(ClassifiedEvent::Evaluate {
        event: WebhookEvent {
            kind,
            action: action.to_string(),
            repository: repository(payload, repo)?,
            installation_id,
            head_sha,
            pr_number,
            check_url: check_url.to_string(),
            details_url,
        },
        profile,
    })
}

// ============================================================================
// Field extraction
//
// Paths are dot-separated. A numeric segment indexes into an array, so
// `check_run.pull_requests.0.number` reads the first associated PR. Errors
// carry the path so operators can see exactly which field was missing.
// ============================================================================

fn repo_id(payload: &Value) -> Result<RepoId, ClassifyError> {
    Ok(RepoId::new(
        str_at(payload, "repository.owner.login")?,
        str_at(payload, "repository.name")?,
    ))
}

fn repository(payload: &Value, id: RepoId) -> Result<Repository, ClassifyError> {
    Ok(Repository {
        id,
        full_name: str_at(payload, "repository.full_name")?.to_string(),
        html_url: str_at(payload, "repository.html_url")?.to_string(),
        private: bool_at(payload, "repository.private")?,
    })
}

fn lookup<'a>(payload: &'a Value, path: &str) -> Option<&'a Value> {
    path.split('.').try_fold(payload, |current, segment| match current {
        Value::Array(items) => segment.parse::<usize>().ok().and_then(|i| items.get(i)),
        Value::Object(map) => map.get(segment),
        _ => None,
    })
}

fn malformed(path: &str) -> ClassifyError {
    ClassifyError::MalformedPayload(path.to_string())
}

fn str_at<'a>(payload: &'a Value, path: &str) -> Result<&'a str, ClassifyError> {
    lookup(payload, path)
        .and_then(Value::as_str)
        .ok_or_else(|| malformed(path))
}

fn u64_at(payload: &Value, path: &str) -> Result<u64, ClassifyError> {
    lookup(payload, path)
        .and_then(Value::as_u64)
        .ok_or_else(|| malformed(path))
}

fn bool_at(payload: &Value, path: &str) -> Result<bool, ClassifyError> {
    lookup(payload, path)
        .and_then(Value::as_bool)
        .ok_or_else(|| malformed(path))
}

fn sha_at(payload: &Value, path: &str) -> Result<Sha, ClassifyError> {
    Sha::parse(str_at(payload, path)?).map_err(|_| malformed(path))
}
