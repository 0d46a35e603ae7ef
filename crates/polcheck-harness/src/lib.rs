pub mod error;
pub mod report;
pub mod run;

pub use error::HarnessError;
pub use report::{CaseOutcome, CaseReport, SuiteReport};
pub use run::{poll_policy, Harness};
