use std::path::Path;
use std::sync::Arc;
use std::time::Instant;

use chrono::Utc;
use polcheck_azure::{PolicyEvaluator, PollPolicy};
use polcheck_config::{PollSettings, SuiteConfig};
use polcheck_domain::{Effect, ResourceId, TestCase};
use polcheck_provision::Provisioner;
use tokio::sync::Semaphore;
use tokio::task::JoinSet;
use tracing::{info, warn};
use uuid::Uuid;

use crate::error::HarnessError;
use crate::report::{CaseOutcome, CaseReport, SuiteReport};

pub fn poll_policy(settings: &PollSettings) -> PollPolicy {
    PollPolicy {
        max_attempts: settings.max_attempts,
        interval:     settings.interval,
    }
}

/// Runs a policy suite: provisions the baseline assignments, runs every case
/// concurrently against its own module, then tears the baseline down.
pub struct Harness {
    suite:       Arc<SuiteConfig>,
    provisioner: Arc<dyn Provisioner>,
    evaluator:   Arc<dyn PolicyEvaluator>,
}

impl Harness {
    pub fn new(
        suite: SuiteConfig,
        provisioner: Arc<dyn Provisioner>,
        evaluator: Arc<dyn PolicyEvaluator>,
    ) -> Self {
        Self { suite: Arc::new(suite), provisioner, evaluator }
    }

    /// Run the whole suite.
    ///
    /// Only a baseline failure is an `Err`; case failures are recorded in the
    /// returned report. The baseline is destroyed even if it failed to apply.
    pub async fn run(&self) -> Result<SuiteReport, HarnessError> {
        if self.suite.cases.is_empty() {
            return Err(HarnessError::NoCases);
        }

        let mut report = SuiteReport::new(Uuid::new_v4());
        let baseline = self.suite.terraform_dir.as_path();
        info!(
            run_id = %report.run_id,
            cases = self.suite.cases.len(),
            provisioner = self.provisioner.name(),
            baseline = %baseline.display(),
            "starting policy suite"
        );

        if let Err(e) = self.provisioner.init_and_apply(baseline).await {
            warn!(error = %e, "baseline provisioning failed");
            if let Err(te) = self.provisioner.destroy(baseline).await {
                warn!(error = %te, "baseline teardown failed");
            }
            return Err(HarnessError::Baseline(e));
        }
        info!("baseline policy assignments applied");

        let limiter = self.suite.max_parallel.map(|n| Arc::new(Semaphore::new(n)));
        let mut tasks = JoinSet::new();
        for (index, case) in self.suite.cases.iter().enumerate() {
            let ctx = CaseContext {
                suite:       self.suite.clone(),
                provisioner: self.provisioner.clone(),
                evaluator:   self.evaluator.clone(),
            };
            let case = case.clone();
            let limiter = limiter.clone();
            tasks.spawn(async move {
                let _permit = match &limiter {
                    Some(sem) => sem.clone().acquire_owned().await.ok(),
                    None => None,
                };
                (index, ctx.run_case(&case).await)
            });
        }

        // Completion order varies; reports keep suite order.
        let mut finished: Vec<Option<CaseReport>> = vec![None; self.suite.cases.len()];
        let mut aborted = Vec::new();
        while let Some(joined) = tasks.join_next().await {
            match joined {
                Ok((index, case_report)) => finished[index] = Some(case_report),
                Err(e) => aborted.push(e.to_string()),
            }
        }
        let reason = aborted.join("; ");
        for (case, slot) in self.suite.cases.iter().zip(finished) {
            let case_report = slot.unwrap_or_else(|| {
                CaseReport::new(
                    case,
                    CaseOutcome::Failed { message: format!("case task aborted: {}", reason) },
                )
            });
            report.cases.push(case_report);
        }

        if self.suite.keep_baseline {
            info!("keeping baseline policy assignments");
        } else if let Err(e) = self.provisioner.destroy(baseline).await {
            warn!(error = %e, "baseline teardown failed");
            report.baseline_teardown_error = Some(e.to_string());
        }

        report.finished_at = Some(Utc::now());
        info!(
            run_id = %report.run_id,
            passed = report.passed(),
            failed = report.failed(),
            "policy suite complete"
        );
        Ok(report)
    }
}

// ── Per-case execution ────────────────────────────────────────────────────────

struct CaseContext {
    suite:       Arc<SuiteConfig>,
    provisioner: Arc<dyn Provisioner>,
    evaluator:   Arc<dyn PolicyEvaluator>,
}

impl CaseContext {
    /// Deploy the case module, judge the outcome, and always destroy it.
    async fn run_case(&self, case: &TestCase) -> CaseReport {
        let dir = self.suite.case_dir(case);
        let started = Instant::now();
        info!(case = %case.label(), dir = %dir.display(), "running case");

        let outcome = match self.evaluate(case, &dir).await {
            Ok(()) => CaseOutcome::Passed,
            Err(message) => CaseOutcome::Failed { message },
        };

        let mut report = CaseReport::new(case, outcome);
        if let Err(e) = self.provisioner.destroy(&dir).await {
            warn!(case = %case.label(), error = %e, "case teardown failed");
            report.teardown_error = Some(e.to_string());
        }
        report.duration_secs = started.elapsed().as_secs();

        match &report.outcome {
            CaseOutcome::Passed => info!(case = %report.label, secs = report.duration_secs, "case passed"),
            CaseOutcome::Failed { message } => {
                warn!(case = %report.label, secs = report.duration_secs, "case failed: {}", message)
            }
        }
        report
    }

    async fn evaluate(&self, case: &TestCase, dir: &Path) -> Result<(), String> {
        self.provisioner
            .init(dir)
            .await
            .map_err(|e| format!("Initialisation failed with error: {}", e))?;

        let applied = self.provisioner.apply(dir).await;
        match (case.effect, applied) {
            (Effect::Allow, Ok(())) => Ok(()),
            (Effect::Allow, Err(e)) => {
                Err(format!("Compliant resources failed to deploy with error: {}", e))
            }
            (Effect::Deny, Ok(())) => Err("Policy breach was not prevented".to_string()),
            (Effect::Deny, Err(e)) if !e.is_tool_failure() => {
                Err(format!("Deployment could not be attempted: {}", e))
            }
            (Effect::Deny, Err(_)) => Ok(()),
            (Effect::Audit, Err(e)) => {
                Err(format!("Auditable resources failed to deploy with error: {}", e))
            }
            (Effect::Audit, Ok(())) => self.assert_compliance_state(case, dir).await,
        }
    }

    /// Trigger evaluation on the resource's group and compare the polled
    /// compliance state against the suite's expected audit state.
    async fn assert_compliance_state(&self, case: &TestCase, dir: &Path) -> Result<(), String> {
        let output = &self.suite.resource_output;
        let resource_id = self
            .provisioner
            .output(dir, output)
            .await
            .map(ResourceId::new)
            .map_err(|e| format!("Reading output {} failed with error: {}", output, e))?;
        let group_id = resource_id.resource_group_id().map_err(|e| e.to_string())?;
        let assignment = case.assignment_name(&self.suite.assignment_prefix);

        self.evaluator
            .trigger_evaluation(&group_id)
            .await
            .map_err(|e| format!("Trigger policy evaluation failed with error: {}", e))?;

        let actual = self
            .evaluator
            .compliance_state(&resource_id, &assignment)
            .await
            .map_err(|e| format!("Get compliance state failed with error: {}", e))?;

        let expected = &self.suite.expected_audit_state;
        if &actual != expected {
            return Err(format!("Expected compliance state {} but got {}", expected, actual));
        }
        Ok(())
    }
}
