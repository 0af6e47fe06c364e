//! Octocrab client wrapper scoped to a specific repository.
//!
//! `OctocrabClient` wraps an installation-authenticated `Octocrab` instance and
//! implements [`SourceControl`] against the GitHub REST API for one repository.
//! The raw REST routes are used rather than octocrab's typed builders so that
//! request and response shapes stay exactly what the Checks API documents.

use chrono::{SecondsFormat, Utc};
use octocrab::Octocrab;
use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::report::{CHECK_RUN_TITLE, truncate_summary};
use crate::types::{CheckRunId, PrNumber, RepoId, Sha};

use super::error::SourceControlError;
use super::source::{CheckRunHandle, CheckRunUpdate, SourceControl};

/// Page size for the PR files listing (GitHub's maximum).
const FILES_PER_PAGE: usize = 100;

/// GitHub stops listing PR files after 3000 entries.
const MAX_FILE_PAGES: u32 = 30;

/// A GitHub API client scoped to a specific repository.
#[derive(Clone)]
pub struct OctocrabClient {
    /// The underlying octocrab client.
    client: Octocrab,

    /// The repository this client is scoped to.
    repo: RepoId,

    /// Name shown on the check runs this client creates.
    check_name: String,
}

impl OctocrabClient {
    /// Creates a new client scoped to the given repository.
    pub fn new(client: Octocrab, repo: RepoId, check_name: impl Into<String>) -> Self {
        Self {
            client,
            repo,
            check_name: check_name.into(),
        }
    }

    /// Returns the repository owner.
    pub fn owner(&self) -> &str {
        &self.repo.owner
    }

    /// Returns the repository name.
    pub fn repo_name(&self) -> &str {
        &self.repo.repo
    }

    fn repo_route(&self, suffix: &str) -> String {
        format!("/repos/{}/{}/{}", self.owner(), self.repo_name(), suffix)
    }
}

impl std::fmt::Debug for OctocrabClient {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("OctocrabClient")
            .field("repo", &self.repo)
            .field("check_name", &self.check_name)
            .finish_non_exhaustive()
    }
}

// ─── Wire types ───────────────────────────────────────────────────────────────

#[derive(Debug, Serialize)]
struct ContentParams<'a> {
    #[serde(rename = "ref", skip_serializing_if = "Option::is_none")]
    git_ref: Option<&'a str>,
}

#[derive(Debug, Deserialize)]
struct ContentResponse {
    content: Option<String>,
    encoding: Option<String>,
}

#[derive(Debug, Serialize)]
struct PageParams {
    per_page: usize,
    page: u32,
}

#[derive(Debug, Deserialize)]
struct RawDiffEntry {
    filename: String,
}

#[derive(Debug, Serialize)]
struct CreateCheckRunRequest<'a> {
    name: &'a str,
    head_sha: &'a str,
    status: &'static str,
}

#[derive(Debug, Deserialize)]
struct RawCheckRun {
    id: u64,
    url: String,
    html_url: Option<String>,
}

#[derive(Debug, Serialize)]
struct UpdateCheckRunRequest<'a> {
    name: &'a str,
    status: &'static str,
    #[serde(skip_serializing_if = "Option::is_none")]
    started_at: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    completed_at: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    conclusion: Option<&'static str>,
    #[serde(skip_serializing_if = "Option::is_none")]
    output: Option<CheckRunOutput<'a>>,
}

#[derive(Debug, Serialize)]
struct CheckRunOutput<'a> {
    title: &'a str,
    summary: &'a str,
}

fn now_rfc3339() -> String {
    Utc::now().to_rfc3339_opts(SecondsFormat::Secs, true)
}

// ─── SourceControl implementation ─────────────────────────────────────────────

impl SourceControl for OctocrabClient {
    async fn get_file_at_revision(
        &self,
        path: &str,
        revision: Option<&Sha>,
    ) -> Result<Option<String>, SourceControlError> {
        let route = self.repo_route(&format!("contents/{}", path));
        let params = ContentParams {
            git_ref: revision.map(Sha::as_str),
        };

        let result: Result<ContentResponse, _> = self.client.get(&route, Some(&params)).await;

        match result {
            Ok(response) => match (response.encoding.as_deref(), response.content) {
                (Some("base64"), Some(content)) => Ok(Some(content)),
                (encoding, _) => Err(SourceControlError::other(format!(
                    "unsupported content encoding for {}: {}",
                    path,
                    encoding.unwrap_or("missing")
                ))),
            },
            Err(e) => {
                let err = SourceControlError::from_octocrab(e);
                if err.is_not_found() {
                    debug!(repo = %self.repo, path, revision = ?revision, "File not found");
                    Ok(None)
                } else {
                    Err(err)
                }
            }
        }
    }

    async fn get_pull_request_changed_files(
        &self,
        pr: PrNumber,
    ) -> Result<Vec<String>, SourceControlError> {
        let route = self.repo_route(&format!("pulls/{}/files", pr.0));
        let mut files = Vec::new();

        for page in 1..=MAX_FILE_PAGES {
            let params = PageParams {
                per_page: FILES_PER_PAGE,
                page,
            };
            let entries: Vec<RawDiffEntry> = self
                .client
                .get(&route, Some(&params))
                .await
                .map_err(SourceControlError::from_octocrab)?;

            let count = entries.len();
            files.extend(entries.into_iter().map(|e| e.filename));

            if count < FILES_PER_PAGE {
                break;
            }
        }

        Ok(files)
    }

    async fn create_check_run(&self, head_sha: &Sha) -> Result<CheckRunHandle, SourceControlError> {
        let route = self.repo_route("check-runs");
        let request = CreateCheckRunRequest {
            name: &self.check_name,
            head_sha: head_sha.as_str(),
            status: "queued",
        };

        let run: RawCheckRun = self
            .client
            .post(&route, Some(&request))
            .await
            .map_err(SourceControlError::from_octocrab)?;

        Ok(CheckRunHandle {
            id: CheckRunId(run.id),
            url: run.url,
            html_url: run.html_url,
        })
    }

    async fn update_check_run(
        &self,
        handle: &CheckRunHandle,
        update: CheckRunUpdate,
    ) -> Result<(), SourceControlError> {
        let route = self.repo_route(&format!("check-runs/{}", handle.id));

        let summary;
        let request = match &update {
            CheckRunUpdate::InProgress => UpdateCheckRunRequest {
                name: &self.check_name,
                status: "in_progress",
                started_at: Some(now_rfc3339()),
                completed_at: None,
                conclusion: None,
                output: None,
            },
            CheckRunUpdate::Completed {
                conclusion,
                summary: text,
            } => {
                summary = truncate_summary(text);
                UpdateCheckRunRequest {
                    name: &self.check_name,
                    status: "completed",
                    started_at: None,
                    completed_at: Some(now_rfc3339()),
                    conclusion: Some(conclusion.as_api_str()),
                    output: Some(CheckRunOutput {
                        title: CHECK_RUN_TITLE,
                        summary: &summary,
                    }),
                }
            }
        };

        let _: serde_json::Value = self
            .client
            .patch(&route, Some(&request))
            .await
            .map_err(SourceControlError::from_octocrab)?;

        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::sync::{Arc, Mutex};

    use axum::Json;
    use axum::extract::{Path, Query, State};
    use axum::http::StatusCode;
    use axum::routing::{get, patch, post};
    use serde_json::{Value, json};

    use crate::test_utils::{sha, stub_github};
    use crate::types::Conclusion;

    /// Request counts and bodies seen by a stub route.
    #[derive(Clone, Default)]
    struct Seen {
        hits: Arc<AtomicUsize>,
        queries: Arc<Mutex<Vec<HashMap<String, String>>>>,
        bodies: Arc<Mutex<Vec<Value>>>,
    }

    impl Seen {
        fn hits(&self) -> usize {
            self.hits.load(Ordering::SeqCst)
        }

        fn queries(&self) -> Vec<HashMap<String, String>> {
            self.queries.lock().unwrap().clone()
        }

        fn bodies(&self) -> Vec<Value> {
            self.bodies.lock().unwrap().clone()
        }
    }

    /// Serves a fixed response on the contents route for `about.yaml`.
    async fn contents_client(status: StatusCode, body: Value) -> (OctocrabClient, Seen) {
        let seen = Seen::default();
        let handler = move |State(seen): State<Seen>, Query(query): Query<HashMap<String, String>>| {
            let body = body.clone();
            async move {
                seen.hits.fetch_add(1, Ordering::SeqCst);
                seen.queries.lock().unwrap().push(query);
                (status, Json(body))
            }
        };
        let router = axum::Router::new()
            .route("/repos/acme/widgets/contents/about.yaml", get(handler))
            .with_state(seen.clone());
        (stub_github(router).await, seen)
    }

    #[tokio::test]
    async fn fetches_base64_content_at_a_revision() {
        let (client, seen) = contents_client(
            StatusCode::OK,
            json!({ "encoding": "base64", "content": "dGVhbTogcGF5bWVudHMK", "sha": "abc" }),
        )
        .await;

        let content = client
            .get_file_at_revision("about.yaml", Some(&sha(3)))
            .await
            .unwrap();

        assert_eq!(content.as_deref(), Some("dGVhbTogcGF5bWVudHMK"));
        assert_eq!(seen.queries()[0].get("ref").map(String::as_str), Some(sha(3).as_str()));
    }

    #[tokio::test]
    async fn default_branch_fetch_sends_no_ref() {
        let (client, seen) =
            contents_client(StatusCode::OK, json!({ "encoding": "base64", "content": "" })).await;

        client.get_file_at_revision("about.yaml", None).await.unwrap();

        assert!(!seen.queries()[0].contains_key("ref"));
    }

    #[tokio::test]
    async fn missing_file_is_none() {
        let (client, _) = contents_client(
            StatusCode::NOT_FOUND,
            json!({ "message": "Not Found", "documentation_url": "https://docs.github.com/rest" }),
        )
        .await;

        let content = client.get_file_at_revision("about.yaml", None).await.unwrap();

        assert_eq!(content, None);
    }

    #[tokio::test]
    async fn server_error_fails_after_one_request() {
        let (client, seen) =
            contents_client(StatusCode::BAD_GATEWAY, json!({ "message": "Bad Gateway" })).await;

        let err = client
            .get_file_at_revision("about.yaml", Some(&sha(1)))
            .await
            .unwrap_err();

        assert_eq!(err.status_code, Some(502));
        assert!(!err.is_not_found());
        assert_eq!(seen.hits(), 1);
    }

    #[tokio::test]
    async fn rate_limit_is_not_retried() {
        let (client, seen) = contents_client(
            StatusCode::TOO_MANY_REQUESTS,
            json!({ "message": "API rate limit exceeded" }),
        )
        .await;

        assert!(client.get_file_at_revision("about.yaml", None).await.is_err());
        assert_eq!(seen.hits(), 1);
    }

    #[tokio::test]
    async fn missing_encoding_is_an_error() {
        let (client, _) = contents_client(StatusCode::OK, json!({ "content": "dGVhbQ==" })).await;

        let err = client.get_file_at_revision("about.yaml", None).await.unwrap_err();

        assert!(err.to_string().contains("unsupported content encoding"));
        assert!(err.to_string().contains("missing"));
    }

    #[tokio::test]
    async fn non_base64_encoding_is_an_error() {
        let (client, _) =
            contents_client(StatusCode::OK, json!({ "encoding": "none", "content": "" })).await;

        let err = client.get_file_at_revision("about.yaml", None).await.unwrap_err();

        assert!(err.to_string().contains("none"));
        assert!(!err.is_not_found());
    }

    #[tokio::test]
    async fn changed_files_stop_at_a_short_page() {
        let seen = Seen::default();
        let handler = |State(seen): State<Seen>,
                       Path(pr): Path<u64>,
                       Query(query): Query<HashMap<String, String>>| async move {
            seen.hits.fetch_add(1, Ordering::SeqCst);
            assert_eq!(pr, 42);
            let count = match query.get("page").map(String::as_str) {
                Some("1") => 100,
                Some("2") => 3,
                _ => 0,
            };
            seen.queries.lock().unwrap().push(query);
            let page: Vec<Value> = (0..count)
                .map(|i| json!({ "filename": format!("src/file{i}.rs"), "status": "modified" }))
                .collect();
            Json(page)
        };
        let router = axum::Router::new()
            .route("/repos/acme/widgets/pulls/{pr}/files", get(handler))
            .with_state(seen.clone());
        let client = stub_github(router).await;

        let files = client.get_pull_request_changed_files(PrNumber(42)).await.unwrap();

        assert_eq!(files.len(), 103);
        assert_eq!(files[0], "src/file0.rs");
        assert_eq!(seen.hits(), 2);
        assert_eq!(seen.queries()[0].get("per_page").map(String::as_str), Some("100"));
    }

    #[tokio::test]
    async fn changed_files_failure_is_an_error() {
        let router = axum::Router::new().route(
            "/repos/acme/widgets/pulls/{pr}/files",
            get(|| async { (StatusCode::INTERNAL_SERVER_ERROR, Json(json!({ "message": "boom" }))) }),
        );
        let client = stub_github(router).await;

        let err = client.get_pull_request_changed_files(PrNumber(42)).await.unwrap_err();

        assert_eq!(err.status_code, Some(500));
    }

    async fn check_runs_client() -> (OctocrabClient, Seen) {
        let seen = Seen::default();
        let create = |State(seen): State<Seen>, Json(body): Json<Value>| async move {
            seen.bodies.lock().unwrap().push(body);
            (
                StatusCode::CREATED,
                Json(json!({
                    "id": 9,
                    "url": "https://api.github.com/repos/acme/widgets/check-runs/9",
                    "html_url": "https://github.com/acme/widgets/runs/9",
                    "status": "queued"
                })),
            )
        };
        let update = |State(seen): State<Seen>,
                      Path(id): Path<u64>,
                      Json(body): Json<Value>| async move {
            assert_eq!(id, 9);
            seen.bodies.lock().unwrap().push(body);
            Json(json!({ "id": 9 }))
        };
        let router = axum::Router::new()
            .route("/repos/acme/widgets/check-runs", post(create))
            .route("/repos/acme/widgets/check-runs/{id}", patch(update))
            .with_state(seen.clone());
        (stub_github(router).await, seen)
    }

    #[tokio::test]
    async fn create_posts_a_queued_run() {
        let (client, seen) = check_runs_client().await;

        let handle = client.create_check_run(&sha(7)).await.unwrap();

        assert_eq!(handle.id, CheckRunId(9));
        assert_eq!(handle.html_url.as_deref(), Some("https://github.com/acme/widgets/runs/9"));
        assert_eq!(
            seen.bodies(),
            vec![json!({ "name": "about-gate", "head_sha": sha(7).as_str(), "status": "queued" })]
        );
    }

    #[tokio::test]
    async fn updates_send_status_and_output() {
        let (client, seen) = check_runs_client().await;
        let handle = client.create_check_run(&sha(7)).await.unwrap();

        client
            .update_check_run(&handle, CheckRunUpdate::InProgress)
            .await
            .unwrap();
        client
            .update_check_run(
                &handle,
                CheckRunUpdate::Completed {
                    conclusion: Conclusion::Failure,
                    summary: "<h2>Check results</h2>".to_string(),
                },
            )
            .await
            .unwrap();

        let bodies = seen.bodies();
        assert_eq!(bodies.len(), 3);

        let in_progress = &bodies[1];
        assert_eq!(in_progress["status"], "in_progress");
        assert!(in_progress["started_at"].is_string());
        assert!(in_progress.get("conclusion").is_none());

        let completed = &bodies[2];
        assert_eq!(completed["name"], "about-gate");
        assert_eq!(completed["status"], "completed");
        assert_eq!(completed["conclusion"], "failure");
        assert!(completed["completed_at"].is_string());
        assert_eq!(completed["output"]["title"], CHECK_RUN_TITLE);
        assert_eq!(completed["output"]["summary"], "<h2>Check results</h2>");
    }

    #[test]
    fn content_params_omit_ref_for_default_branch() {
        let params = ContentParams { git_ref: None };
        assert_eq!(serde_json::to_value(&params).unwrap(), serde_json::json!({}));
    }

    #[test]
    fn content_params_use_ref_key() {
        let params = ContentParams {
            git_ref: Some("abc"),
        };
        assert_eq!(
            serde_json::to_value(&params).unwrap(),
            serde_json::json!({ "ref": "abc" })
        );
    }

    #[test]
    fn completed_update_serializes_output() {
        let request = UpdateCheckRunRequest {
            name: "about-gate",
            status: "completed",
            started_at: None,
            completed_at: Some("2024-01-01T00:00:00Z".into()),
            conclusion: Some("failure"),
            output: Some(CheckRunOutput {
                title: CHECK_RUN_TITLE,
                summary: "bad",
            }),
        };
        let value = serde_json::to_value(&request).unwrap();
        assert_eq!(value["conclusion"], "failure");
        assert_eq!(value["output"]["title"], CHECK_RUN_TITLE);
        assert_eq!(value["output"]["summary"], "bad");
        assert!(value.get("started_at").is_none());
    }

    #[test]
    fn check_run_response_tolerates_extra_fields() {
        let raw: RawCheckRun = serde_json::from_value(serde_json::json!({
            "id": 4,
            "url": "https://api.github.com/repos/o/r/check-runs/4",
            "html_url": "https://github.com/o/r/runs/4",
            "status": "queued",
            "name": "about-gate"
        }))
        .unwrap();
        assert_eq!(raw.id, 4);
    }
}
