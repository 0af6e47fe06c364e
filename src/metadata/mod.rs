//! The about.yaml document as loaded at one revision.

mod loader;
mod schema;

pub use loader::{LoadError, decode_document, load_document};
pub use schema::{SchemaError, SchemaSet};

use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::fmt;

/// Repository path of the metadata document.
pub const ABOUT_YAML_PATH: &str = "about.yaml";

/// Which of the two revisions a document was loaded from.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RevisionRef {
    /// The repository's default branch.
    Base,
    /// The head commit of the pull request.
    Head,
}

impl fmt::Display for RevisionRef {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            RevisionRef::Base => f.write_str("base"),
            RevisionRef::Head => f.write_str("head"),
        }
    }
}

/// The document at one revision.
///
/// `present` and `schema_valid` are independent: a present document may be
/// schema-invalid, and an absent one is never schema-valid.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MetadataDocument {
    pub revision: RevisionRef,
    pub present: bool,

    /// Decoded file text.
    pub raw: Option<String>,

    /// Parsed content. `None` for absent, empty and null documents.
    pub parsed: Option<Value>,

    pub schema_valid: bool,

    /// `jira_id`, when it is a string.
    pub issue_tracker_id: Option<String>,

    /// `pagerduty_id`, when it is a string.
    pub on_call_id: Option<String>,
}

impl MetadataDocument {
    pub fn absent(revision: RevisionRef) -> Self {
        MetadataDocument {
            revision,
            present: false,
            raw: None,
            parsed: None,
            schema_valid: false,
            issue_tracker_id: None,
            on_call_id: None,
        }
    }
}
