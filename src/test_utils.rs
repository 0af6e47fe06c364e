//! Shared test utilities: in-memory collaborators and webhook fixtures.

use std::collections::HashMap;
use std::sync::Mutex;
use std::sync::atomic::{AtomicUsize, Ordering};

use axum::Json;
use axum::routing::post;
use base64::Engine;
use base64::engine::general_purpose::STANDARD as BASE64;
use serde_json::{Value, json};

use crate::github::{CheckRunHandle, CheckRunUpdate, GitHubApp, OctocrabClient, SourceControl, SourceControlError};
use crate::references::{Credentials, ReferenceCheckResult, ReferenceValidator};
use crate::types::{CheckRunId, InstallationId, PrNumber, RepoId, Sha};

/// A throwaway 2048-bit RSA key in the PKCS#1 form GitHub issues.
pub const TEST_APP_KEY: &str = include_str!("../testdata/github-app-key.pem");

/// A deterministic SHA distinguished by `n`.
pub fn sha(n: u8) -> Sha {
    Sha::parse(format!("{:040x}", n)).unwrap()
}

pub fn test_credentials() -> Credentials {
    Credentials {
        jira_username: "svc-user".to_string(),
        jira_password: "secret".to_string(),
        pagerduty_token: "pd-token".to_string(),
    }
}

/// Serves `router` on an ephemeral local port and returns its base URL.
pub async fn spawn_stub_server(router: axum::Router) -> String {
    let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    tokio::spawn(async move {
        axum::serve(listener, router).await.unwrap();
    });
    format!("http://{}", addr)
}

/// Serves `router` as a GitHub API that also issues installation tokens, and
/// returns a production client for `acme/widgets` pointed at it.
pub async fn stub_github(router: axum::Router) -> OctocrabClient {
    async fn issue_token() -> Json<Value> {
        Json(json!({
            "token": "ghs_stub",
            "expires_at": "2099-01-01T00:00:00Z",
            "permissions": { "checks": "write", "contents": "read" }
        }))
    }

    let router = router.route("/app/installations/{id}/access_tokens", post(issue_token));
    let base = spawn_stub_server(router).await;
    let app = GitHubApp::new(1, TEST_APP_KEY, Some(&base), "about-gate").unwrap();
    app.client_for(InstallationId(77), RepoId::new("acme", "widgets"))
        .await
        .unwrap()
}

// ─── Source control ───────────────────────────────────────────────────────────

/// What the stub returns for `about.yaml` at one revision.
#[derive(Debug, Clone, Default)]
pub enum StubFile {
    #[default]
    Missing,
    /// Base64 content, as the contents API returns it.
    Content(String),
    /// The fetch fails with this HTTP status.
    Fail(u16),
}

impl StubFile {
    pub fn yaml(text: &str) -> Self {
        StubFile::Content(BASE64.encode(text))
    }
}

/// An in-memory [`SourceControl`] that records every call.
#[derive(Debug, Default)]
pub struct StubSource {
    base: StubFile,
    head: StubFile,
    /// `None` makes the file listing fail.
    changed_files: Option<Vec<String>>,
    fail_create: bool,
    fail_updates: bool,
    fetched: Mutex<Vec<Option<Sha>>>,
    changed_files_calls: AtomicUsize,
    created: Mutex<Vec<Sha>>,
    updates: Mutex<Vec<CheckRunUpdate>>,
}

impl StubSource {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_base(mut self, file: StubFile) -> Self {
        self.base = file;
        self
    }

    pub fn with_head(mut self, file: StubFile) -> Self {
        self.head = file;
        self
    }

    pub fn with_changed_files<I, S>(mut self, files: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.changed_files = Some(files.into_iter().map(Into::into).collect());
        self
    }

    pub fn failing_create(mut self) -> Self {
        self.fail_create = true;
        self
    }

    pub fn failing_updates(mut self) -> Self {
        self.fail_updates = true;
        self
    }

    pub fn fetched_revisions(&self) -> Vec<Option<Sha>> {
        self.fetched.lock().unwrap().clone()
    }

    pub fn changed_files_calls(&self) -> usize {
        self.changed_files_calls.load(Ordering::SeqCst)
    }

    pub fn created_check_runs(&self) -> Vec<Sha> {
        self.created.lock().unwrap().clone()
    }

    pub fn updates(&self) -> Vec<CheckRunUpdate> {
        self.updates.lock().unwrap().clone()
    }
}

impl SourceControl for StubSource {
    async fn get_file_at_revision(
        &self,
        _path: &str,
        revision: Option<&Sha>,
    ) -> Result<Option<String>, SourceControlError> {
        self.fetched.lock().unwrap().push(revision.cloned());
        let file = if revision.is_some() { &self.head } else { &self.base };
        match file {
            StubFile::Missing => Ok(None),
            StubFile::Content(content) => Ok(Some(content.clone())),
            StubFile::Fail(status) => Err(SourceControlError::from_status(*status, "stub failure")),
        }
    }

    async fn get_pull_request_changed_files(
        &self,
        _pr: PrNumber,
    ) -> Result<Vec<String>, SourceControlError> {
        self.changed_files_calls.fetch_add(1, Ordering::SeqCst);
        self.changed_files
            .clone()
            .ok_or_else(|| SourceControlError::from_status(500, "stub failure"))
    }

    async fn create_check_run(&self, head_sha: &Sha) -> Result<CheckRunHandle, SourceControlError> {
        if self.fail_create {
            return Err(SourceControlError::from_status(403, "stub failure"));
        }
        let mut created = self.created.lock().unwrap();
        created.push(head_sha.clone());
        let id = created.len() as u64;
        Ok(CheckRunHandle {
            id: CheckRunId(id),
            url: format!("https://api.github.com/repos/acme/widgets/check-runs/{}", id),
            html_url: None,
        })
    }

    async fn update_check_run(
        &self,
        _handle: &CheckRunHandle,
        update: CheckRunUpdate,
    ) -> Result<(), SourceControlError> {
        self.updates.lock().unwrap().push(update);
        if self.fail_updates {
            return Err(SourceControlError::from_status(502, "stub failure"));
        }
        Ok(())
    }
}

// ─── Reference validators ────────────────────────────────────────────────────

/// A [`ReferenceValidator`] with canned answers.
#[derive(Debug, Default)]
pub struct StubValidator {
    always: Option<ReferenceCheckResult>,
    /// Identifiers not listed here are `Invalid`.
    by_id: HashMap<String, ReferenceCheckResult>,
    seen: Mutex<Vec<String>>,
}

impl StubValidator {
    pub fn always(result: ReferenceCheckResult) -> Self {
        StubValidator {
            always: Some(result),
            ..Default::default()
        }
    }

    pub fn by_id<'a, I>(answers: I) -> Self
    where
        I: IntoIterator<Item = (&'a str, ReferenceCheckResult)>,
    {
        StubValidator {
            by_id: answers
                .into_iter()
                .map(|(id, result)| (id.to_string(), result))
                .collect(),
            ..Default::default()
        }
    }

    pub fn calls(&self) -> usize {
        self.seen.lock().unwrap().len()
    }

    pub fn seen(&self) -> Vec<String> {
        self.seen.lock().unwrap().clone()
    }
}

impl ReferenceValidator for StubValidator {
    async fn check(&self, id: &str) -> ReferenceCheckResult {
        self.seen.lock().unwrap().push(id.to_string());
        match &self.always {
            Some(result) => result.clone(),
            None => self
                .by_id
                .get(id)
                .cloned()
                .unwrap_or(ReferenceCheckResult::Invalid),
        }
    }
}

// ─── Webhook payloads ─────────────────────────────────────────────────────────

pub const PAYLOAD_HEAD_SHA: &str = "1234567890abcdef1234567890abcdef12345678";

/// A `pull_request` payload for a private `acme/widgets` repository.
pub fn pull_request_payload(action: &str) -> Value {
    json!({
        "action": action,
        "number": 42,
        "pull_request": {
            "html_url": "https://github.com/acme/widgets/pull/42",
            "head": { "sha": PAYLOAD_HEAD_SHA },
            "base": { "repo": { "url": "https://api.github.com/repos/acme/widgets" } }
        },
        "repository": {
            "owner": { "login": "acme" },
            "name": "widgets",
            "full_name": "acme/widgets",
            "html_url": "https://github.com/acme/widgets",
            "url": "https://api.github.com/repos/acme/widgets",
            "private": true
        },
        "installation": { "id": 77 }
    })
}
