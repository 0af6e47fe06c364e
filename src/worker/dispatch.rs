//! Hands accepted webhooks to background evaluation tasks.
//!
//! The HTTP handler acknowledges a webhook as soon as it has been classified;
//! the evaluation runs on its own tokio task. Tasks are tracked so shutdown can
//! wait for in-flight check runs to publish instead of leaving them queued.
//! A panicking evaluation still completes its check run (see [`run_check`]).
//!
//! ```text
//! ┌─────────────┐     ┌────────────┐      ┌────────────────────────────────┐
//! │   axum      │ ──► │  dispatch  │ ───► │ task: token → check run →      │
//! │  (accepts)  │     │  (spawn)   │      │       evaluate → publish       │
//! └─────────────┘     └────────────┘      └────────────────────────────────┘
//!       │
//!       │ returns 200
//!       ▼
//! ```

use std::future::Future;
use std::sync::Arc;

use tokio_util::task::TaskTracker;
use tracing::{Instrument, error, info, info_span};

use crate::engine::EvaluationTarget;
use crate::github::{GitHubApp, OctocrabClient, SourceControl, SourceControlError};
use crate::metadata::SchemaSet;
use crate::policy::Profile;
use crate::references::{ReferenceValidator, ValidatorSet};
use crate::webhooks::WebhookEvent;

use super::check::{CheckContext, run_check};

/// An event the classifier decided to evaluate.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct EvaluationJob {
    pub event: WebhookEvent,
    pub profile: Profile,
}

impl EvaluationJob {
    pub fn target(&self) -> EvaluationTarget {
        EvaluationTarget {
            profile: self.profile,
            head_sha: self.event.head_sha.clone(),
            pr_number: self.event.pr_number,
        }
    }
}

/// Accepts jobs without blocking the caller.
pub trait Dispatch: Send + Sync {
    fn dispatch(&self, job: EvaluationJob);
}

/// Produces a repository-scoped source-control client for an event.
pub trait SourceProvider: Send + Sync {
    type Source: SourceControl + 'static;

    fn source_for(
        &self,
        event: &WebhookEvent,
    ) -> impl Future<Output = Result<Self::Source, SourceControlError>> + Send;
}

impl SourceProvider for GitHubApp {
    type Source = OctocrabClient;

    async fn source_for(&self, event: &WebhookEvent) -> Result<OctocrabClient, SourceControlError> {
        self.client_for(event.installation_id, event.repository.id.clone())
            .await
    }
}

struct DispatcherInner<P, I, O> {
    provider: P,
    context: Arc<CheckContext<I, O>>,
}

/// Spawns one tracked task per job.
pub struct TaskDispatcher<P, I, O> {
    inner: Arc<DispatcherInner<P, I, O>>,
    tracker: TaskTracker,
}

impl<P, I, O> TaskDispatcher<P, I, O>
where
    P: SourceProvider + 'static,
    I: ReferenceValidator + 'static,
    O: ReferenceValidator + 'static,
{
    pub fn new(provider: P, validators: ValidatorSet<I, O>, schemas: SchemaSet) -> Self {
        TaskDispatcher {
            inner: Arc::new(DispatcherInner {
                provider,
                context: Arc::new(CheckContext { validators, schemas }),
            }),
            tracker: TaskTracker::new(),
        }
    }

    /// Number of evaluations still running.
    pub fn in_flight(&self) -> usize {
        self.tracker.len()
    }

    /// Stops accepting new work and waits for running evaluations.
    pub async fn shutdown(&self) {
        self.tracker.close();
        info!(in_flight = self.tracker.len(), "Waiting for evaluations to finish");
        self.tracker.wait().await;
    }
}

impl<P, I, O> Dispatch for TaskDispatcher<P, I, O>
where
    P: SourceProvider + 'static,
    I: ReferenceValidator + 'static,
    O: ReferenceValidator + 'static,
{
    fn dispatch(&self, job: EvaluationJob) {
        let span = info_span!(
            "evaluation",
            repo = %job.event.repository.id,
            sha = %job.event.head_sha,
            pr = %job.event.pr_number,
            profile = job.profile.as_str(),
            check_url = %job.event.check_url,
        );
        let inner = Arc::clone(&self.inner);

        self.tracker.spawn(
            async move {
                let source = match inner.provider.source_for(&job.event).await {
                    Ok(source) => source,
                    Err(e) => {
                        error!(error = %e, "Failed to authenticate installation, abandoning evaluation");
                        return;
                    }
                };
                run_check(Arc::new(source), Arc::clone(&inner.context), job.target()).await;
            }
            .instrument(span),
        );
    }
}
