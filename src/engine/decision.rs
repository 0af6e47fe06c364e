//! The compliance decision tree.
//!
//! Everything here is pure: [`plan`] says which upstream lookups a presence and
//! schema combination needs, and [`decide`] turns the finished [`Assessment`]
//! into a verdict. The async evaluator only moves data between the two.

use crate::metadata::{MetadataDocument, RevisionRef};
use crate::policy::Profile;
use crate::references::{ReferenceCheckResult, ReferenceKind};
use crate::report::{Finding, Report};
use crate::types::{ComplianceVerdict, Sha};

pub const NOT_FOUND_MESSAGE: &str =
    "about.yaml file not found in main or ref branch. Please add an about.yaml file to the repo.";

pub const DELETED_MESSAGE: &str = "Looks like you're deleting the about.yaml file in the ref branch. \
     Please add an about.yaml file to the repo.";

/// What one revision contributed to the decision.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct RevisionAssessment {
    pub present: bool,
    pub schema_valid: bool,
    pub issue_tracker_id: Option<String>,
    pub on_call_id: Option<String>,

    /// `None` when the check was not run.
    pub issue_tracker: Option<ReferenceCheckResult>,
    pub on_call: Option<ReferenceCheckResult>,
}

impl RevisionAssessment {
    pub fn from_document(document: &MetadataDocument) -> Self {
        RevisionAssessment {
            present: document.present,
            schema_valid: document.present && document.schema_valid,
            issue_tracker_id: document.issue_tracker_id.clone(),
            on_call_id: document.on_call_id.clone(),
            issue_tracker: None,
            on_call: None,
        }
    }

    pub fn id(&self, kind: ReferenceKind) -> Option<&str> {
        match kind {
            ReferenceKind::IssueTracker => self.issue_tracker_id.as_deref(),
            ReferenceKind::OnCall => self.on_call_id.as_deref(),
        }
    }

    pub fn result(&self, kind: ReferenceKind) -> Option<&ReferenceCheckResult> {
        match kind {
            ReferenceKind::IssueTracker => self.issue_tracker.as_ref(),
            ReferenceKind::OnCall => self.on_call.as_ref(),
        }
    }

    pub fn set_result(&mut self, kind: ReferenceKind, result: ReferenceCheckResult) {
        match kind {
            ReferenceKind::IssueTracker => self.issue_tracker = Some(result),
            ReferenceKind::OnCall => self.on_call = Some(result),
        }
    }

    /// Schema-valid and both references `Valid`.
    ///
    /// `None` if a reference result is missing or errored, which the caller
    /// turns into a cancelled verdict.
    fn fully_valid(&self) -> Option<bool> {
        if !self.schema_valid {
            return Some(false);
        }
        let mut valid = true;
        for kind in [ReferenceKind::IssueTracker, ReferenceKind::OnCall] {
            match self.result(kind)? {
                ReferenceCheckResult::Valid => {}
                ReferenceCheckResult::Invalid => valid = false,
                ReferenceCheckResult::Error(_) => return None,
            }
        }
        Some(valid)
    }
}

/// The upstream lookups a branch of the tree needs.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct Plan {
    pub base_references: bool,
    pub head_references: bool,
    /// Look up whether the PR touches about.yaml.
    pub changed_files: bool,
}

/// Decides which lookups to run from presence and schema validity alone.
pub fn plan(base: &RevisionAssessment, head: &RevisionAssessment) -> Plan {
    match (base.present, head.present) {
        (false, false) => Plan::default(),
        (true, true) => Plan {
            base_references: base.schema_valid && head.schema_valid,
            head_references: head.schema_valid,
            changed_files: false,
        },
        (true, false) => Plan {
            changed_files: true,
            ..Plan::default()
        },
        (false, true) => Plan {
            head_references: head.schema_valid,
            ..Plan::default()
        },
    }
}

/// Everything the decision needs.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Assessment {
    pub profile: Profile,
    pub head_sha: Sha,
    pub base: RevisionAssessment,
    pub head: RevisionAssessment,

    /// Whether the PR's changed files include about.yaml. Only looked up when
    /// Base has the document and Head does not.
    pub about_yaml_changed: Option<bool>,
}

impl Assessment {
    fn revision(&self, revision: RevisionRef) -> &RevisionAssessment {
        match revision {
            RevisionRef::Base => &self.base,
            RevisionRef::Head => &self.head,
        }
    }
}

/// Turns an assessment into exactly one verdict.
pub fn decide(assessment: &Assessment) -> ComplianceVerdict {
    decide_inner(assessment).unwrap_or_else(ComplianceVerdict::cancelled)
}

fn build_report(assessment: &Assessment) -> Report {
    let mut report = Report::new(assessment.head_sha.clone());
    for revision in [RevisionRef::Base, RevisionRef::Head] {
        let r = assessment.revision(revision);
        if !r.present {
            continue;
        }
        if !r.schema_valid {
            report.record(
                revision,
                Finding::SchemaInvalid {
                    profile: assessment.profile,
                },
            );
            continue;
        }
        for kind in [ReferenceKind::IssueTracker, ReferenceKind::OnCall] {
            if let Some(ReferenceCheckResult::Invalid) = r.result(kind) {
                report.record(
                    revision,
                    Finding::ReferenceInvalid {
                        kind,
                        id: r.id(kind).map(str::to_string),
                    },
                );
            }
        }
    }
    report
}

fn decide_inner(assessment: &Assessment) -> Option<ComplianceVerdict> {
    let base = &assessment.base;
    let head = &assessment.head;
    let sha = &assessment.head_sha;
    let report = build_report(assessment);

    let verdict = match (base.present, head.present) {
        (false, false) => ComplianceVerdict::failure(NOT_FOUND_MESSAGE),

        (true, true) => match (base.schema_valid, head.schema_valid) {
            (true, true) => {
                let base_ok = base.fully_valid()?;
                let head_ok = head.fully_valid()?;
                if base_ok && !head_ok {
                    ComplianceVerdict::failure(format!(
                        "PR has failed about.yaml validation checks. Latest commit {} invalidates \
                         the about.yaml in main branch. {}",
                        sha,
                        report.head_text()
                    ))
                } else if head_ok {
                    ComplianceVerdict::success("All checks Passed")
                } else {
                    ComplianceVerdict::failure(format!(
                        "<b>Failed checks</b> in main and ref branches. \n{}\n{}",
                        report.base_text(),
                        report.head_text()
                    ))
                }
            }
            (true, false) => ComplianceVerdict::failure(format!(
                "Failed due to schema issues in ref {}. Please correct the file format before \
                 merging: \n{}",
                sha,
                report.head_text()
            )),
            (false, true) => {
                if head.fully_valid()? {
                    ComplianceVerdict::success(format!(
                        "Main branch about.yaml file has inconsistencies, but the ref branch {} \
                         addresses them\n {}\n\n{}",
                        sha,
                        report.head_text(),
                        report.base_text()
                    ))
                } else {
                    ComplianceVerdict::failure(format!(
                        "PR has failed about.yaml validation checks. Latest commit {} does not \
                         have a valid about.yaml file. Please address them before you merge: \n{}",
                        sha,
                        report.head_text()
                    ))
                }
            }
            (false, false) => ComplianceVerdict::failure(format!(
                "Failed schema checks on main and ref: \n{} \n\n{}",
                report.base_text(),
                report.head_text()
            )),
        },

        (true, false) => {
            if assessment.about_yaml_changed? {
                ComplianceVerdict::failure(DELETED_MESSAGE)
            } else {
                ComplianceVerdict::success("All checks passed")
            }
        }

        (false, true) => {
            if !head.schema_valid {
                ComplianceVerdict::failure(format!(
                    "PR has failed about.yaml validation checks. Latest commit {} has an invalid \
                     about.yaml Please correct them before merging to main.</br></br>{}\n\n{}",
                    sha,
                    report.head_text(),
                    report.base_text()
                ))
            } else if head.fully_valid()? {
                ComplianceVerdict::success("All checks Passed")
            } else {
                ComplianceVerdict::failure(format!(
                    "PR has failed about.yaml validation checks. Latest commit {} invalidates the \
                     about.yaml in main branch. Please correct them before merging to \
                     main:<br/><br/>{}\n\n{}",
                    sha,
                    report.head_text(),
                    report.base_text()
                ))
            }
        }
    };

    Some(verdict)
}
