//! Background evaluation: dispatching jobs and running check runs.

mod check;
mod dispatch;

pub use check::{CheckContext, run_check};
pub use dispatch::{Dispatch, EvaluationJob, SourceProvider, TaskDispatcher};
