//! GitHub App client and the source-control seam.
//!
//! Everything the gate needs from GitHub goes through the [`SourceControl`] trait:
//! reading `about.yaml` at a revision, listing a PR's changed files, and
//! creating and updating the check run. [`OctocrabClient`] is the production
//! implementation; [`GitHubApp`] mints one per evaluation.

mod app;
mod client;
mod error;
mod source;

pub use app::{GitHubApp, install_crypto_provider};
pub use client::OctocrabClient;
pub use error::{SourceControlError, SourceControlErrorKind};
pub use source::{CheckRunHandle, CheckRunUpdate, SourceControl};
