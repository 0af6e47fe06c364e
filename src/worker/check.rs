//! One check run, from creation to its final conclusion.

use std::sync::Arc;

use tracing::{Instrument, error, info, warn};

use crate::engine::{EvaluationTarget, evaluate};
use crate::github::{CheckRunUpdate, SourceControl};
use crate::metadata::SchemaSet;
use crate::references::{ReferenceValidator, ValidatorSet};
use crate::types::ComplianceVerdict;

/// Collaborators every evaluation shares.
#[derive(Debug)]
pub struct CheckContext<I, O> {
    pub validators: ValidatorSet<I, O>,
    pub schemas: SchemaSet,
}

/// Creates the check run, evaluates, and publishes the verdict.
///
/// Returns the published verdict, or `None` if no check run could be created.
/// The evaluation runs on its own task; if it panics the run is completed as
/// `cancelled` rather than left in progress. Nothing is retried: a failed
/// final update is logged and dropped.
pub async fn run_check<S, I, O>(
    source: Arc<S>,
    context: Arc<CheckContext<I, O>>,
    target: EvaluationTarget,
) -> Option<ComplianceVerdict>
where
    S: SourceControl + 'static,
    I: ReferenceValidator + 'static,
    O: ReferenceValidator + 'static,
{
    let handle = match source.create_check_run(&target.head_sha).await {
        Ok(handle) => handle,
        Err(e) => {
            error!(error = %e, "Failed to create check run, abandoning evaluation");
            return None;
        }
    };
    info!(check_run = %handle.id, html_url = ?handle.html_url, "Created check run");

    if let Err(e) = source
        .update_check_run(&handle, CheckRunUpdate::InProgress)
        .await
    {
        warn!(check_run = %handle.id, error = %e, "Failed to mark check run in progress");
    }

    let evaluation = tokio::spawn(
        {
            let source = Arc::clone(&source);
            async move {
                evaluate(source.as_ref(), &context.validators, &context.schemas, &target).await
            }
        }
        .in_current_span(),
    );
    let verdict = match evaluation.await {
        Ok(verdict) => verdict,
        Err(e) => {
            error!(
                check_run = %handle.id,
                panicked = e.is_panic(),
                error = %e,
                "Evaluation aborted, publishing cancelled"
            );
            ComplianceVerdict::cancelled()
        }
    };

    let update = CheckRunUpdate::Completed {
        conclusion: verdict.conclusion,
        summary: verdict.report.clone(),
    };
    match source.update_check_run(&handle, update).await {
        Ok(()) => info!(check_run = %handle.id, conclusion = %verdict.conclusion, "Published verdict"),
        Err(e) => error!(
            check_run = %handle.id,
            conclusion = %verdict.conclusion,
            error = %e,
            "Failed to publish verdict"
        ),
    }

    Some(verdict)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::policy::Profile;
    use crate::references::ReferenceCheckResult;
    use crate::test_utils::{StubFile, StubSource, StubValidator, sha};
    use crate::types::{Conclusion, PrNumber};

    const VALID: &str = "organization: platform\nteam: payments\njira_id: PAY\npagerduty_id: P123ABC\n";

    fn target() -> EvaluationTarget {
        EvaluationTarget {
            profile: Profile::Default,
            head_sha: sha(5),
            pr_number: PrNumber(3),
        }
    }

    fn context() -> Arc<CheckContext<StubValidator, StubValidator>> {
        Arc::new(CheckContext {
            validators: ValidatorSet {
                issue_tracker: StubValidator::always(ReferenceCheckResult::Valid),
                on_call: StubValidator::always(ReferenceCheckResult::Valid),
            },
            schemas: SchemaSet::bundled().unwrap(),
        })
    }

    struct CrashingValidator;

    impl ReferenceValidator for CrashingValidator {
        async fn check(&self, _id: &str) -> ReferenceCheckResult {
            panic!("validator crashed")
        }
    }

    #[tokio::test]
    async fn publishes_in_progress_then_exactly_one_conclusion() {
        let source = Arc::new(StubSource::new().with_head(StubFile::yaml(VALID)));

        let verdict = run_check(Arc::clone(&source), context(), target()).await.unwrap();

        assert_eq!(verdict.conclusion, Conclusion::Success);
        assert_eq!(source.created_check_runs(), vec![sha(5)]);
        assert_eq!(
            source.updates(),
            vec![
                CheckRunUpdate::InProgress,
                CheckRunUpdate::Completed {
                    conclusion: Conclusion::Success,
                    summary: "All checks Passed".to_string(),
                },
            ]
        );
    }

    #[tokio::test]
    async fn create_failure_abandons_evaluation() {
        let source = Arc::new(
            StubSource::new()
                .with_head(StubFile::yaml(VALID))
                .failing_create(),
        );
        let context = context();

        assert!(run_check(Arc::clone(&source), Arc::clone(&context), target()).await.is_none());
        assert!(source.updates().is_empty());
        assert!(source.fetched_revisions().is_empty());
        assert_eq!(context.validators.issue_tracker.calls(), 0);
    }

    #[tokio::test]
    async fn update_failures_are_not_retried() {
        let source = Arc::new(StubSource::new().failing_updates());

        let verdict = run_check(Arc::clone(&source), context(), target()).await.unwrap();

        assert_eq!(verdict.conclusion, Conclusion::Failure);
        // One in-progress attempt and one completion attempt, nothing more.
        assert_eq!(source.updates().len(), 2);
    }

    #[tokio::test]
    async fn cancelled_verdict_is_published() {
        let source = Arc::new(StubSource::new().with_base(StubFile::Fail(500)));

        let verdict = run_check(Arc::clone(&source), context(), target()).await.unwrap();

        assert_eq!(verdict, ComplianceVerdict::cancelled());
        assert!(matches!(
            source.updates().last(),
            Some(CheckRunUpdate::Completed {
                conclusion: Conclusion::Cancelled,
                ..
            })
        ));
    }

    #[tokio::test]
    async fn evaluation_panic_completes_the_run_as_cancelled() {
        let source = Arc::new(
            StubSource::new()
                .with_base(StubFile::yaml(VALID))
                .with_head(StubFile::yaml(VALID)),
        );
        let context = Arc::new(CheckContext {
            validators: ValidatorSet {
                issue_tracker: CrashingValidator,
                on_call: StubValidator::always(ReferenceCheckResult::Valid),
            },
            schemas: SchemaSet::bundled().unwrap(),
        });

        let verdict = run_check(Arc::clone(&source), context, target()).await.unwrap();

        assert_eq!(verdict, ComplianceVerdict::cancelled());
        assert_eq!(
            source.updates(),
            vec![
                CheckRunUpdate::InProgress,
                CheckRunUpdate::Completed {
                    conclusion: Conclusion::Cancelled,
                    summary: ComplianceVerdict::cancelled().report,
                },
            ]
        );
    }
}
