//! The source-control collaborator the gate depends on.
//!
//! Implementations are scoped to one repository (see [`OctocrabClient`]), so
//! none of the operations take a repository argument. Tests substitute an
//! in-memory implementation.
//!
//! [`OctocrabClient`]: super::OctocrabClient

use std::future::Future;
use std::sync::Arc;

use serde::{Deserialize, Serialize};

use crate::types::{CheckRunId, Conclusion, PrNumber, Sha};

use super::error::SourceControlError;

/// A check run created for a head commit.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CheckRunHandle {
    pub id: CheckRunId,

    /// API URL of the check run.
    pub url: String,

    /// Browser URL, for logs.
    pub html_url: Option<String>,
}

/// An update to a check run.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum CheckRunUpdate {
    /// Move the run from queued to in progress.
    InProgress,

    /// Complete the run.
    Completed {
        conclusion: Conclusion,
        summary: String,
    },
}

/// Repository-scoped source-control operations.
///
/// # Example (mock for testing)
///
/// ```ignore
/// struct StaticSource {
///     files: HashMap<Option<Sha>, Vec<u8>>,
/// }
///
/// impl SourceControl for StaticSource {
///     async fn get_file_at_revision(&self, _path: &str, revision: Option<&Sha>)
///         -> Result<Option<String>, SourceControlError>
///     {
///         Ok(self.files.get(&revision.cloned()).map(|b| BASE64.encode(b)))
///     }
///     // ...
/// }
/// ```
pub trait SourceControl: Send + Sync {
    /// Fetches a file at a revision, as the API's base64 content text.
    ///
    /// `revision` of `None` means the repository's default branch.
    /// Returns `Ok(None)` if the file does not exist at that revision.
    fn get_file_at_revision(
        &self,
        path: &str,
        revision: Option<&Sha>,
    ) -> impl Future<Output = Result<Option<String>, SourceControlError>> + Send;

    /// Lists the file names a pull request changes.
    fn get_pull_request_changed_files(
        &self,
        pr: PrNumber,
    ) -> impl Future<Output = Result<Vec<String>, SourceControlError>> + Send;

    /// Creates a queued check run on a head commit.
    fn create_check_run(
        &self,
        head_sha: &Sha,
    ) -> impl Future<Output = Result<CheckRunHandle, SourceControlError>> + Send;

    /// Updates a previously created check run.
    fn update_check_run(
        &self,
        handle: &CheckRunHandle,
        update: CheckRunUpdate,
    ) -> impl Future<Output = Result<(), SourceControlError>> + Send;
}

impl<T: SourceControl> SourceControl for Arc<T> {
    fn get_file_at_revision(
        &self,
        path: &str,
        revision: Option<&Sha>,
    ) -> impl Future<Output = Result<Option<String>, SourceControlError>> + Send {
        (**self).get_file_at_revision(path, revision)
    }

    fn get_pull_request_changed_files(
        &self,
        pr: PrNumber,
    ) -> impl Future<Output = Result<Vec<String>, SourceControlError>> + Send {
        (**self).get_pull_request_changed_files(pr)
    }

    fn create_check_run(
        &self,
        head_sha: &Sha,
    ) -> impl Future<Output = Result<CheckRunHandle, SourceControlError>> + Send {
        (**self).create_check_run(head_sha)
    }

    fn update_check_run(
        &self,
        handle: &CheckRunHandle,
        update: CheckRunUpdate,
    ) -> impl Future<Output = Result<(), SourceControlError>> + Send {
        (**self).update_check_run(handle, update)
    }
}
