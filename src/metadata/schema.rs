//! Bundled about.yaml schemas, one per profile.

use jsonschema::{Draft, Validator};
use serde_json::Value;
use thiserror::Error;

use crate::policy::Profile;

const DEFAULT_SCHEMA: &str = include_str!("../../schemas/default.schema.json");
const ALTERNATE_SCHEMA: &str = include_str!("../../schemas/alternate.schema.json");

const DEFAULT_EXAMPLE: &str = include_str!("../../schemas/default.example.txt");
const ALTERNATE_EXAMPLE: &str = include_str!("../../schemas/alternate.example.txt");

/// A bundled schema failed to compile.
#[derive(Debug, Error)]
#[error("invalid {profile} schema: {message}")]
pub struct SchemaError {
    pub profile: &'static str,
    pub message: String,
}

/// Compiled Draft-7 validators for both profiles.
pub struct SchemaSet {
    default: Validator,
    alternate: Validator,
}

impl SchemaSet {
    /// Compiles the bundled schemas.
    pub fn bundled() -> Result<Self, SchemaError> {
        Ok(SchemaSet {
            default: compile(Profile::Default, DEFAULT_SCHEMA)?,
            alternate: compile(Profile::Alternate, ALTERNATE_SCHEMA)?,
        })
    }

    fn validator(&self, profile: Profile) -> &Validator {
        match profile {
            Profile::Default => &self.default,
            Profile::Alternate => &self.alternate,
        }
    }

    /// Returns true if `document` is a mapping with an `organization` key that
    /// satisfies the profile's schema.
    pub fn is_valid(&self, profile: Profile, document: &Value) -> bool {
        let Some(map) = document.as_object() else {
            return false;
        };
        map.contains_key("organization") && self.validator(profile).is_valid(document)
    }

    /// Human-readable schema violations, for logs.
    pub fn violations(&self, profile: Profile, document: &Value) -> Vec<String> {
        self.validator(profile)
            .iter_errors(document)
            .map(|e| e.to_string())
            .collect()
    }

    /// The example document embedded in schema-failure findings.
    pub fn example(profile: Profile) -> &'static str {
        match profile {
            Profile::Default => DEFAULT_EXAMPLE,
            Profile::Alternate => ALTERNATE_EXAMPLE,
        }
    }
}

impl std::fmt::Debug for SchemaSet {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SchemaSet").finish_non_exhaustive()
    }
}

fn compile(profile: Profile, source: &str) -> Result<Validator, SchemaError> {
    let error = |message: String| SchemaError {
        profile: profile.as_str(),
        message,
    };
    let schema: Value = serde_json::from_str(source).map_err(|e| error(e.to_string()))?;
    jsonschema::options()
        .with_draft(Draft::Draft7)
        .build(&schema)
        .map_err(|e| error(e.to_string()))
}
