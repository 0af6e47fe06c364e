//! about-gate - A GitHub App check that gates pull requests on a valid `about.yaml`.
//!
//! Webhooks are verified and classified, then evaluated on a background task:
//! the document is loaded at the base and head revisions, its references are
//! checked against Jira and PagerDuty, and the verdict is published as a
//! check run.

pub mod config;
pub mod engine;
pub mod github;
pub mod metadata;
pub mod policy;
pub mod references;
pub mod report;
pub mod server;
pub mod types;
pub mod webhooks;
pub mod worker;

#[cfg(test)]
pub mod test_utils;
