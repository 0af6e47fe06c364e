//! Source-control error types.
//!
//! The gate never retries, so the only distinction that matters is what an error
//! means for the verdict:
//!
//! - **NotFound** (HTTP 404) on a file fetch means "the document is absent", a
//!   normal state rather than a failure
//! - **Auth** (HTTP 401/403) means the installation token is wrong or revoked
//! - **Other** is everything else: 5xx, rate limits, network failures, bad bodies
//!
//! Auth and Other both end the evaluation as `cancelled`.

use std::fmt;
use thiserror::Error;

/// The kind of source-control error.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SourceControlErrorKind {
    /// The resource does not exist (HTTP 404).
    NotFound,

    /// Authentication or authorization failed (HTTP 401/403).
    Auth,

    /// Any other failure.
    Other,
}

/// A source-control API error.
#[derive(Debug, Error)]
pub struct SourceControlError {
    pub kind: SourceControlErrorKind,

    /// The HTTP status code, if available.
    pub status_code: Option<u16>,

    /// A human-readable description of the error.
    pub message: String,

    /// The underlying octocrab error, if available.
    #[source]
    pub source: Option<octocrab::Error>,
}

impl fmt::Display for SourceControlError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self.status_code {
            Some(code) => write!(f, "GitHub API error (HTTP {}): {}", code, self.message),
            None => write!(f, "GitHub API error: {}", self.message),
        }
    }
}

impl SourceControlError {
    /// Creates an error without an octocrab source (e.g. an undecodable response).
    pub fn other(message: impl Into<String>) -> Self {
        Self {
            kind: SourceControlErrorKind::Other,
            status_code: None,
            message: message.into(),
            source: None,
        }
    }

    /// Creates an error from a bare HTTP status.
    pub fn from_status(status_code: u16, message: impl Into<String>) -> Self {
        Self {
            kind: kind_for_status(Some(status_code)),
            status_code: Some(status_code),
            message: message.into(),
            source: None,
        }
    }

    /// Returns true if this is a 404.
    pub fn is_not_found(&self) -> bool {
        self.kind == SourceControlErrorKind::NotFound
    }

    /// Categorizes an octocrab error.
    pub fn from_octocrab(err: octocrab::Error) -> Self {
        let status_code = extract_status_code(&err);
        Self {
            kind: kind_for_status(status_code),
            status_code,
            message: err.to_string(),
            source: Some(err),
        }
    }
}

fn kind_for_status(status_code: Option<u16>) -> SourceControlErrorKind {
    match status_code {
        Some(404) => SourceControlErrorKind::NotFound,
        Some(401) | Some(403) => SourceControlErrorKind::Auth,
        _ => SourceControlErrorKind::Other,
    }
}

/// Extracts the HTTP status code from an octocrab error, if present.
///
/// API errors carry a structured status. Other variants only mention the
/// status in their message, so those fall back to matching on the text.
/// Returning `None` is safe: the error is then treated as `Other`, which
/// cancels the run rather than misreporting a missing document.
fn extract_status_code(err: &octocrab::Error) -> Option<u16> {
    if let octocrab::Error::GitHub { source, .. } = err {
        return Some(source.status_code.as_u16());
    }
    status_code_from_message(&err.to_string())
}

fn status_code_from_message(err_str: &str) -> Option<u16> {
    if let Some(idx) = err_str.find("status: ") {
        let rest = &err_str[idx + 8..];
        let end = rest
            .find(|c: char| !c.is_ascii_digit())
            .unwrap_or(rest.len());
        if let Ok(code) = rest[..end].parse() {
            return Some(code);
        }
    }

    let lower = err_str.to_lowercase();
    if mentions_status(&lower, "404") && lower.contains("not found") {
        return Some(404);
    }
    ["401", "403"]
        .into_iter()
        .find(|code| mentions_status(&lower, code))
        .and_then(|code| code.parse().ok())
}

/// True if `code` appears as a whole number right after `http` or `status`.
///
/// A bare number is not enough: SHAs, URLs and IDs contain digit runs too.
fn mentions_status(lower: &str, code: &str) -> bool {
    ["http ", "http/1.1 ", "status ", "status code "]
        .iter()
        .any(|prefix| {
            let needle = format!("{prefix}{code}");
            lower.match_indices(&needle).any(|(idx, _)| {
                !lower[idx + needle.len()..].starts_with(|c: char| c.is_ascii_digit())
            })
        })
}
