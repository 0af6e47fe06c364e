//! Core domain types for the about.yaml gate.
//!
//! Identifiers and the verdict that every evaluation ends in.

pub mod ids;
pub mod verdict;

pub use ids::{CheckRunId, InstallationId, InvalidSha, PrNumber, RepoId, Sha};
pub use verdict::{CANCELLED_MESSAGE, ComplianceVerdict, Conclusion};
