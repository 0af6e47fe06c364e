//! Check-run report rendering.
//!
//! A report has one segment per revision. Each failed check appends a finding
//! to its revision's segment, in check order: schema, then Jira, then
//! PagerDuty. Passing checks add nothing.

use crate::metadata::{RevisionRef, SchemaSet};
use crate::policy::Profile;
use crate::references::ReferenceKind;
use crate::types::Sha;

/// Title of the check-run output.
pub const CHECK_RUN_TITLE: &str = "about.yaml validation";

/// GitHub rejects check-run summaries longer than this.
pub const GITHUB_SUMMARY_LIMIT: usize = 65535;

const TRUNCATION_SUFFIX: &str = "... [truncated]";

/// A failed check.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Finding {
    SchemaInvalid { profile: Profile },
    ReferenceInvalid { kind: ReferenceKind, id: Option<String> },
}

impl Finding {
    fn render(&self) -> String {
        match self {
            Finding::SchemaInvalid { profile } => format!(
                "<b>Schema check:</b> FAILED. <b>Description:</b> The format of the file is invalid. \
                 Expected schema format:\n{}",
                SchemaSet::example(*profile)
            ),
            Finding::ReferenceInvalid {
                kind: ReferenceKind::IssueTracker,
                id,
            } => format!(
                "<b>Jira Check:</b> <i>FAILED</i>. <b>Description:</b> {} is an invalid value. \
                 Please ensure that this value exists",
                display_id(id)
            ),
            Finding::ReferenceInvalid {
                kind: ReferenceKind::OnCall,
                id,
            } => format!(
                "<b>Pagerduty Check:</b> <i>FAILED</i>. <b>Description:</b> {} is not a valid \
                 Pagerduty schedule id. Please provide an active and valid Pagerduty schedule ID",
                display_id(id)
            ),
        }
    }
}

fn display_id(id: &Option<String>) -> &str {
    id.as_deref().unwrap_or("(missing)")
}

/// The findings for one revision.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Segment {
    findings: Vec<Finding>,
}

impl Segment {
    pub fn push(&mut self, finding: Finding) {
        self.findings.push(finding);
    }

    pub fn findings(&self) -> &[Finding] {
        &self.findings
    }

    pub fn is_empty(&self) -> bool {
        self.findings.is_empty()
    }
}

/// Base and head segments for one evaluation.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Report {
    head_sha: Sha,
    base: Segment,
    head: Segment,
}

impl Report {
    pub fn new(head_sha: Sha) -> Self {
        Report {
            head_sha,
            base: Segment::default(),
            head: Segment::default(),
        }
    }

    pub fn record(&mut self, revision: RevisionRef, finding: Finding) {
        self.segment_mut(revision).push(finding);
    }

    pub fn segment(&self, revision: RevisionRef) -> &Segment {
        match revision {
            RevisionRef::Base => &self.base,
            RevisionRef::Head => &self.head,
        }
    }

    fn segment_mut(&mut self, revision: RevisionRef) -> &mut Segment {
        match revision {
            RevisionRef::Base => &mut self.base,
            RevisionRef::Head => &mut self.head,
        }
    }

    /// Renders one segment: its header followed by each finding on a new line.
    pub fn render(&self, revision: RevisionRef) -> String {
        let mut out = match revision {
            RevisionRef::Base => "<h2>Check results on main branch:</h2>\n".to_string(),
            RevisionRef::Head => {
                format!("<h2>Check results on commit branch {}</h2>\n", self.head_sha)
            }
        };
        for finding in self.segment(revision).findings() {
            out.push('\n');
            out.push_str(&finding.render());
        }
        out
    }

    pub fn base_text(&self) -> String {
        self.render(RevisionRef::Base)
    }

    pub fn head_text(&self) -> String {
        self.render(RevisionRef::Head)
    }
}

/// Truncates a summary to GitHub's limit, cutting on a char boundary.
pub fn truncate_summary(summary: &str) -> String {
    truncate_with_suffix(summary, GITHUB_SUMMARY_LIMIT)
}

fn truncate_with_suffix(s: &str, max_len: usize) -> String {
    if s.len() <= max_len {
        return s.to_string();
    }

    let mut end = max_len.saturating_sub(TRUNCATION_SUFFIX.len());
    while end > 0 && !s.is_char_boundary(end) {
        end -= 1;
    }

    format!("{}{}", &s[..end], TRUNCATION_SUFFIX)
}
