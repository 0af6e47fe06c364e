//! Fetching and decoding about.yaml at a revision.

use base64::Engine;
use base64::engine::general_purpose::STANDARD as BASE64;
use serde_json::Value;
use thiserror::Error;
use tracing::debug;

use crate::github::{SourceControl, SourceControlError};
use crate::policy::Profile;
use crate::types::Sha;

use super::schema::SchemaSet;
use super::{ABOUT_YAML_PATH, MetadataDocument, RevisionRef};

/// Loading failed for a reason other than the document being absent.
#[derive(Debug, Error)]
pub enum LoadError {
    /// The fetch itself failed.
    #[error("failed to fetch about.yaml: {0}")]
    Fetch(#[from] SourceControlError),

    /// The file exists but cannot be decoded as YAML.
    #[error("could not parse about.yaml: {0}")]
    Parse(String),
}

/// Loads the document at `revision`.
///
/// Base reads the default branch; Head reads `head_sha`.
pub async fn load_document<S: SourceControl>(
    source: &S,
    schemas: &SchemaSet,
    profile: Profile,
    revision: RevisionRef,
    head_sha: &Sha,
) -> Result<MetadataDocument, LoadError> {
    let git_ref = match revision {
        RevisionRef::Base => None,
        RevisionRef::Head => Some(head_sha),
    };

    match source.get_file_at_revision(ABOUT_YAML_PATH, git_ref).await? {
        None => {
            debug!(%revision, "about.yaml not present");
            Ok(MetadataDocument::absent(revision))
        }
        Some(content) => decode_document(revision, &content, schemas, profile),
    }
}

/// Decodes base64 file content into a document and validates it.
pub fn decode_document(
    revision: RevisionRef,
    content: &str,
    schemas: &SchemaSet,
    profile: Profile,
) -> Result<MetadataDocument, LoadError> {
    // The contents API wraps base64 at 60 columns.
    let compact: String = content.chars().filter(|c| !c.is_ascii_whitespace()).collect();
    let bytes = BASE64
        .decode(compact)
        .map_err(|e| LoadError::Parse(format!("{} revision is not valid base64: {}", revision, e)))?;
    let raw = String::from_utf8(bytes)
        .map_err(|e| LoadError::Parse(format!("{} revision is not UTF-8: {}", revision, e)))?;

    let parsed = if raw.trim().is_empty() {
        None
    } else {
        let value: Value = serde_yaml::from_str(&raw)
            .map_err(|e| LoadError::Parse(format!("{} revision: {}", revision, e)))?;
        (!value.is_null()).then_some(value)
    };

    let schema_valid = parsed
        .as_ref()
        .is_some_and(|value| schemas.is_valid(profile, value));

    if let Some(value) = &parsed
        && !schema_valid
    {
        debug!(
            %revision,
            profile = profile.as_str(),
            violations = ?schemas.violations(profile, value),
            "about.yaml failed schema validation"
        );
    }

    let string_field = |key: &str| {
        parsed
            .as_ref()
            .and_then(|v| v.get(key))
            .and_then(Value::as_str)
            .map(str::to_string)
    };

    Ok(MetadataDocument {
        revision,
        present: true,
        issue_tracker_id: string_field("jira_id"),
        on_call_id: string_field("pagerduty_id"),
        raw: Some(raw),
        parsed,
        schema_valid,
    })
}
