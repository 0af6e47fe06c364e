//! Async orchestration around the pure decision tree.

use tracing::{error, info};

use crate::github::{SourceControl, SourceControlError};
use crate::metadata::{ABOUT_YAML_PATH, RevisionRef, SchemaSet, load_document};
use crate::policy::Profile;
use crate::references::{ReferenceCheckResult, ReferenceKind, ReferenceValidator, ValidatorSet};
use crate::types::{ComplianceVerdict, PrNumber, Sha};

use super::decision::{Assessment, RevisionAssessment, decide, plan};

/// The commit and PR one evaluation is about.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct EvaluationTarget {
    pub profile: Profile,
    pub head_sha: Sha,
    pub pr_number: PrNumber,
}

/// Loads both revisions, runs the lookups the plan asks for, and decides.
///
/// Never fails: load and lookup errors are logged and produce the cancelled
/// verdict.
pub async fn evaluate<S, I, O>(
    source: &S,
    validators: &ValidatorSet<I, O>,
    schemas: &SchemaSet,
    target: &EvaluationTarget,
) -> ComplianceVerdict
where
    S: SourceControl,
    I: ReferenceValidator,
    O: ReferenceValidator,
{
    let profile = target.profile;
    let (base, head) = tokio::join!(
        load_document(source, schemas, profile, RevisionRef::Base, &target.head_sha),
        load_document(source, schemas, profile, RevisionRef::Head, &target.head_sha),
    );

    let (base, head) = match (base, head) {
        (Ok(base), Ok(head)) => (base, head),
        (Err(e), _) | (_, Err(e)) => {
            error!(error = %e, "Failed to load about.yaml");
            return ComplianceVerdict::cancelled();
        }
    };

    let mut assessment = Assessment {
        profile,
        head_sha: target.head_sha.clone(),
        base: RevisionAssessment::from_document(&base),
        head: RevisionAssessment::from_document(&head),
        about_yaml_changed: None,
    };
    let plan = plan(&assessment.base, &assessment.head);

    let (base_results, head_results, changed) = tokio::join!(
        check_references(validators, &assessment.base, plan.base_references),
        check_references(validators, &assessment.head, plan.head_references),
        about_yaml_changed(source, target.pr_number, plan.changed_files),
    );

    if let Some((issue_tracker, on_call)) = base_results {
        assessment.base.set_result(ReferenceKind::IssueTracker, issue_tracker);
        assessment.base.set_result(ReferenceKind::OnCall, on_call);
    }
    if let Some((issue_tracker, on_call)) = head_results {
        assessment.head.set_result(ReferenceKind::IssueTracker, issue_tracker);
        assessment.head.set_result(ReferenceKind::OnCall, on_call);
    }
    match changed {
        Ok(changed) => assessment.about_yaml_changed = changed,
        Err(e) => {
            error!(error = %e, pr = %target.pr_number, "Failed to list PR files");
            return ComplianceVerdict::cancelled();
        }
    }

    let verdict = decide(&assessment);
    info!(
        base_present = assessment.base.present,
        head_present = assessment.head.present,
        base_schema_valid = assessment.base.schema_valid,
        head_schema_valid = assessment.head.schema_valid,
        conclusion = %verdict.conclusion,
        "Evaluation decided"
    );
    verdict
}

async fn check_references<I, O>(
    validators: &ValidatorSet<I, O>,
    revision: &RevisionAssessment,
    wanted: bool,
) -> Option<(ReferenceCheckResult, ReferenceCheckResult)>
where
    I: ReferenceValidator,
    O: ReferenceValidator,
{
    if !wanted {
        return None;
    }
    let (issue_tracker, on_call) = tokio::join!(
        validators.check(
            ReferenceKind::IssueTracker,
            revision.id(ReferenceKind::IssueTracker)
        ),
        validators.check(ReferenceKind::OnCall, revision.id(ReferenceKind::OnCall)),
    );
    Some((issue_tracker, on_call))
}

/// Only a root-level `about.yaml` entry counts.
async fn about_yaml_changed<S: SourceControl>(
    source: &S,
    pr: PrNumber,
    wanted: bool,
) -> Result<Option<bool>, SourceControlError> {
    if !wanted {
        return Ok(None);
    }
    let files = source.get_pull_request_changed_files(pr).await?;
    Ok(Some(files.iter().any(|f| f == ABOUT_YAML_PATH)))
}
