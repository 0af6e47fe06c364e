//! The single output of one evaluation.

use serde::{Deserialize, Serialize};
use std::fmt;

/// Fixed operator-facing message published whenever an evaluation is cancelled.
///
/// Upstream outages and internal faults all end here; the underlying error is
/// logged, never published.
pub const CANCELLED_MESSAGE: &str =
    "Check cancelled due to processing errors. Reach out to #help-security for questions";

/// Check-run conclusion.
///
/// `Cancelled` means "we could not decide", as opposed to
/// `Failure` ("the document is not compliant").
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Conclusion {
    Success,
    Failure,
    Cancelled,
}

impl Conclusion {
    /// Returns the value the GitHub Checks API expects.
    pub fn as_api_str(&self) -> &'static str {
        match self {
            Conclusion::Success => "success",
            Conclusion::Failure => "failure",
            Conclusion::Cancelled => "cancelled",
        }
    }
}

impl fmt::Display for Conclusion {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_api_str())
    }
}

/// A conclusion plus the rendered report text.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ComplianceVerdict {
    pub conclusion: Conclusion,
    pub report: String,
}

impl ComplianceVerdict {
    pub fn success(report: impl Into<String>) -> Self {
        ComplianceVerdict {
            conclusion: Conclusion::Success,
            report: report.into(),
        }
    }

    pub fn failure(report: impl Into<String>) -> Self {
        ComplianceVerdict {
            conclusion: Conclusion::Failure,
            report: report.into(),
        }
    }

    /// The one cancelled verdict; its text never varies.
    pub fn cancelled() -> Self {
        ComplianceVerdict {
            conclusion: Conclusion::Cancelled,
            report: CANCELLED_MESSAGE.to_string(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn conclusion_api_strings() {
        assert_eq!(Conclusion::Success.as_api_str(), "success");
        assert_eq!(Conclusion::Failure.as_api_str(), "failure");
        assert_eq!(Conclusion::Cancelled.as_api_str(), "cancelled");
    }

    #[test]
    fn conclusion_serializes_snake_case() {
        let json = serde_json::to_string(&Conclusion::Cancelled).unwrap();
        assert_eq!(json, "\"cancelled\"");
    }

    #[test]
    fn cancelled_uses_fixed_message() {
        let verdict = ComplianceVerdict::cancelled();
        assert_eq!(verdict.conclusion, Conclusion::Cancelled);
        assert_eq!(verdict.report, CANCELLED_MESSAGE);
    }
}
