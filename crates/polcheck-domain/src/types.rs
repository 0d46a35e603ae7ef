use serde::{Deserialize, Serialize};

use crate::error::DomainError;

/// Compliance state reported for a resource that violates an audited policy.
pub const NON_COMPLIANT: &str = "NonCompliant";

// ── Identifiers ──────────────────────────────────────────────────────────────

/// Fully-qualified Azure resource identifier, e.g.
/// `/subscriptions/{s}/resourceGroups/{g}/providers/Microsoft.KeyVault/vaults/{v}`.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct ResourceId(pub String);

impl ResourceId {
    pub fn new(s: impl Into<String>) -> Self {
        ResourceId(s.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }

    /// The resource-group scope this resource lives in: the first five
    /// `/`-separated segments of the identifier (the leading empty segment,
    /// `subscriptions`, the subscription id, `resourceGroups`, the group name).
    pub fn resource_group_id(&self) -> Result<ResourceId, DomainError> {
        let segments: Vec<&str> = self.0.split('/').collect();
        if segments.len() < 5
            || !segments[0].is_empty()
            || !segments[1].eq_ignore_ascii_case("subscriptions")
            || !segments[3].eq_ignore_ascii_case("resourceGroups")
            || segments[2].is_empty()
            || segments[4].is_empty()
        {
            return Err(DomainError::InvalidResourceId(self.0.clone()));
        }
        Ok(ResourceId(segments[..5].join("/")))
    }
}

impl std::fmt::Display for ResourceId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

// ── Policy Insights wire types ───────────────────────────────────────────────

/// One row of a `policyStates/latest/queryResults` response.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PolicyState {
    #[serde(default)]
    pub policy_assignment_name: String,
    #[serde(default)]
    pub compliance_state: String,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ComplianceQueryResults {
    #[serde(rename = "value", default)]
    pub values: Vec<PolicyState>,
}

impl ComplianceQueryResults {
    /// Compliance state of the first entry bound to `assignment_name`.
    ///
    /// Returns an empty string when no entry matches; the server has simply
    /// not produced a result for that assignment yet.
    pub fn compliance_state_for(&self, assignment_name: &str) -> &str {
        self.values
            .iter()
            .find(|s| s.policy_assignment_name == assignment_name)
            .map(|s| s.compliance_state.as_str())
            .unwrap_or("")
    }
}

// ── Test cases ───────────────────────────────────────────────────────────────

/// Policy effect a test case expects the platform to apply.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Effect {
    /// Deployment succeeds; the resource is compliant.
    Allow,
    /// Deployment succeeds but the resource is flagged non-compliant.
    Audit,
    /// Deployment is blocked.
    Deny,
}

impl Effect {
    pub fn as_str(&self) -> &'static str {
        match self {
            Effect::Allow => "allow",
            Effect::Audit => "audit",
            Effect::Deny => "deny",
        }
    }

    /// Whether a deployment under this effect is expected to succeed.
    pub fn expects_deployment(&self) -> bool {
        !matches!(self, Effect::Deny)
    }
}

impl std::fmt::Display for Effect {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.pad(self.as_str())
    }
}

impl std::str::FromStr for Effect {
    type Err = DomainError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "allow" => Ok(Effect::Allow),
            "audit" => Ok(Effect::Audit),
            "deny" => Ok(Effect::Deny),
            other => Err(DomainError::UnknownEffect(other.to_string())),
        }
    }
}

/// A single policy scenario: a named policy plus the effect expected for
/// the candidate resource deployed under `<root>/<name>-<effect>`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TestCase {
    pub name: String,
    pub effect: Effect,
}

impl TestCase {
    pub fn new(name: impl Into<String>, effect: Effect) -> Result<Self, DomainError> {
        let name = name.into();
        validate_case_name(&name)?;
        Ok(Self { name, effect })
    }

    /// Directory (relative to the suite root) holding this case's module.
    pub fn dir_name(&self) -> String {
        format!("{}-{}", self.name, self.effect)
    }

    /// Label used in logs and reports; identical to the directory name.
    pub fn label(&self) -> String {
        self.dir_name()
    }

    /// Name of the policy assignment the baseline creates for this policy.
    pub fn assignment_name(&self, prefix: &str) -> String {
        format!("{}{}", prefix, self.name)
    }
}

/// Case names become directory names: lowercase alphanumerics, hyphens and
/// underscores, not starting or ending with a hyphen.
pub fn validate_case_name(name: &str) -> Result<(), DomainError> {
    let ok = !name.is_empty()
        && !name.starts_with('-')
        && !name.ends_with('-')
        && name
            .chars()
            .all(|c| c.is_ascii_lowercase() || c.is_ascii_digit() || c == '-' || c == '_');
    if ok {
        Ok(())
    } else {
        Err(DomainError::InvalidCaseName(name.to_string()))
    }
}
