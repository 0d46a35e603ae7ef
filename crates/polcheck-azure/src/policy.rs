use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use polcheck_domain::{ComplianceQueryResults, ResourceId};
use tracing::{debug, info};

use crate::error::AzureError;
use crate::rest::{RequestSpec, RestExecutor};
use crate::token::TokenProvider;
use crate::Endpoints;

pub const POLICY_INSIGHTS_API_VERSION: &str = "2019-10-01";

const TRIGGER_TIMEOUT_SECS: u64 = 10;
const QUERY_TIMEOUT_SECS: u64 = 20;

// ── Poll policy ───────────────────────────────────────────────────────────────

/// Fixed-interval polling: `max_attempts` queries, `interval` apart.
///
/// The default (30 × 30s) gives server-side evaluation up to 15 minutes.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PollPolicy {
    pub max_attempts: u32,
    pub interval:     Duration,
}

impl Default for PollPolicy {
    fn default() -> Self {
        Self {
            max_attempts: 30,
            interval:     Duration::from_secs(30),
        }
    }
}

// ── Evaluator seam ────────────────────────────────────────────────────────────

/// Policy evaluation operations used by the harness.
#[async_trait]
pub trait PolicyEvaluator: Send + Sync {
    /// Start an asynchronous evaluation of every resource in the group.
    /// Returns as soon as the server has accepted the request.
    async fn trigger_evaluation(&self, resource_group_id: &ResourceId) -> Result<(), AzureError>;

    /// Poll until the server reports a compliance state for `resource_id`
    /// under `assignment_name`, or the poll policy is exhausted.
    async fn compliance_state(
        &self,
        resource_id: &ResourceId,
        assignment_name: &str,
    ) -> Result<String, AzureError>;
}

// ── PolicyInsightsClient ──────────────────────────────────────────────────────

/// Client for the `Microsoft.PolicyInsights` policy-states API.
pub struct PolicyInsightsClient {
    executor:   RestExecutor,
    management: String,
    poll:       PollPolicy,
}

impl PolicyInsightsClient {
    pub fn new(token: Arc<dyn TokenProvider>, endpoints: &Endpoints) -> Self {
        Self {
            executor:   RestExecutor::new(token),
            management: endpoints.management.trim_end_matches('/').to_string(),
            poll:       PollPolicy::default(),
        }
    }

    pub fn with_poll_policy(mut self, poll: PollPolicy) -> Self {
        self.poll = poll;
        self
    }

    pub fn poll_policy(&self) -> PollPolicy {
        self.poll
    }

    /// `{management}/{scope}/providers/Microsoft.PolicyInsights/policyStates/latest/{action}`.
    /// Scopes are Azure ids with a leading `/`; it is not doubled.
    fn policy_states_url(&self, scope: &ResourceId, action: &str) -> String {
        format!(
            "{}/{}/providers/Microsoft.PolicyInsights/policyStates/latest/{}?api-version={}",
            self.management,
            scope.as_str().trim_start_matches('/'),
            action,
            POLICY_INSIGHTS_API_VERSION,
        )
    }

    pub async fn trigger_evaluation(&self, resource_group_id: &ResourceId) -> Result<(), AzureError> {
        let spec = RequestSpec::post(
            self.policy_states_url(resource_group_id, "triggerEvaluation"),
            TRIGGER_TIMEOUT_SECS,
            &[200, 202],
        );
        self.executor.execute(&spec).await?;
        info!(scope = %resource_group_id, "policy evaluation triggered");
        Ok(())
    }

    /// One query of the latest policy states for `resource_id`.
    ///
    /// Returns the compliance state of the first entry for `assignment_name`,
    /// or an empty string if the server has no entry for it yet.
    pub async fn query_compliance_state(
        &self,
        resource_id: &ResourceId,
        assignment_name: &str,
    ) -> Result<String, AzureError> {
        let spec = RequestSpec::post(
            self.policy_states_url(resource_id, "queryResults"),
            QUERY_TIMEOUT_SECS,
            &[200],
        );
        let body = self.executor.execute(&spec).await?;
        let results: ComplianceQueryResults =
            serde_json::from_slice(&body).map_err(|e| AzureError::decode(e, &body))?;
        Ok(results.compliance_state_for(assignment_name).to_string())
    }

    /// Poll [`query_compliance_state`](Self::query_compliance_state) until it
    /// yields a non-empty state or an error, at most `max_attempts` times.
    pub async fn get_compliance_state(
        &self,
        resource_id: &ResourceId,
        assignment_name: &str,
    ) -> Result<String, AzureError> {
        let max_attempts = self.poll.max_attempts;

        for attempt in 1..=max_attempts {
            let state = self.query_compliance_state(resource_id, assignment_name).await?;
            if !state.is_empty() {
                info!(resource = %resource_id, assignment = assignment_name, state = %state, attempt, "compliance state resolved");
                return Ok(state);
            }

            if attempt % 10 == 0 {
                info!(attempt, max_attempts, resource = %resource_id, "still waiting for policy evaluation");
            } else {
                debug!(attempt, max_attempts, resource = %resource_id, "compliance state pending, waiting");
            }
            if attempt < max_attempts {
                tokio::time::sleep(self.poll.interval).await;
            }
        }

        Err(AzureError::Timeout { attempts: max_attempts })
    }
}

#[async_trait]
impl PolicyEvaluator for PolicyInsightsClient {
    async fn trigger_evaluation(&self, resource_group_id: &ResourceId) -> Result<(), AzureError> {
        PolicyInsightsClient::trigger_evaluation(self, resource_group_id).await
    }

    async fn compliance_state(
        &self,
        resource_id: &ResourceId,
        assignment_name: &str,
    ) -> Result<String, AzureError> {
        self.get_compliance_state(resource_id, assignment_name).await
    }
}
