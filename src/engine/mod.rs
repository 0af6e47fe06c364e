//! The compliance decision engine.

pub mod decision;
mod evaluate;

pub use decision::{Assessment, Plan, RevisionAssessment, decide, plan};
pub use evaluate::{EvaluationTarget, evaluate};
