use chrono::{DateTime, Utc};
use polcheck_domain::{Effect, TestCase};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "status", rename_all = "lowercase")]
pub enum CaseOutcome {
    Passed,
    /// `message` is surfaced verbatim, including any wrapped error text.
    Failed { message: String },
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CaseReport {
    pub label:          String,
    pub name:           String,
    pub effect:         Effect,
    pub outcome:        CaseOutcome,
    pub duration_secs:  u64,
    /// Destroying the case module failed; the case counts as failed.
    pub teardown_error: Option<String>,
}

impl CaseReport {
    pub fn new(case: &TestCase, outcome: CaseOutcome) -> Self {
        Self {
            label: case.label(),
            name: case.name.clone(),
            effect: case.effect,
            outcome,
            duration_secs: 0,
            teardown_error: None,
        }
    }

    pub fn passed(&self) -> bool {
        self.outcome == CaseOutcome::Passed && self.teardown_error.is_none()
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SuiteReport {
    pub run_id:                  Uuid,
    pub started_at:              DateTime<Utc>,
    pub finished_at:             Option<DateTime<Utc>>,
    pub cases:                   Vec<CaseReport>,
    pub baseline_teardown_error: Option<String>,
}

impl SuiteReport {
    pub fn new(run_id: Uuid) -> Self {
        Self {
            run_id,
            started_at: Utc::now(),
            finished_at: None,
            cases: Vec::new(),
            baseline_teardown_error: None,
        }
    }

    pub fn passed(&self) -> usize {
        self.cases.iter().filter(|c| c.passed()).count()
    }

    pub fn failed(&self) -> usize {
        self.cases.len() - self.passed()
    }

    pub fn is_success(&self) -> bool {
        self.failed() == 0 && self.baseline_teardown_error.is_none()
    }
}
