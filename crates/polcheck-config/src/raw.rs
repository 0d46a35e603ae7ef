use serde::Deserialize;

/// Raw YAML representation of a suite file (polcheck.yml).
#[derive(Debug, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct RawSuite {
    /// Root module holding the baseline policy assignments. Case modules
    /// live in `<terraform_dir>/<name>-<effect>/`.
    #[serde(default = "default_terraform_dir")]
    pub terraform_dir: String,
    /// "terraform" (default) or "tofu", or a path to either.
    #[serde(default = "default_binary")]
    pub binary: String,
    #[serde(default = "default_resource_output")]
    pub resource_output: String,
    #[serde(default = "default_assignment_prefix")]
    pub assignment_prefix: String,
    #[serde(default = "default_audit_state")]
    pub expected_audit_state: String,
    pub max_parallel: Option<usize>,
    #[serde(default)]
    pub keep_baseline: bool,
    #[serde(default = "default_command_timeout_minutes")]
    pub command_timeout_minutes: u64,
    #[serde(default)]
    pub poll: RawPoll,
    #[serde(default)]
    pub cases: Vec<RawCase>,
}

#[derive(Debug, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct RawPoll {
    #[serde(default = "default_max_attempts")]
    pub max_attempts: u32,
    #[serde(default = "default_interval_secs")]
    pub interval_secs: u64,
}

impl Default for RawPoll {
    fn default() -> Self {
        Self {
            max_attempts:  default_max_attempts(),
            interval_secs: default_interval_secs(),
        }
    }
}

/// A case names its expectation either as an effect (`allow`/`audit`/`deny`)
/// or as a boolean `allowed`.
#[derive(Debug, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct RawCase {
    pub name: String,
    pub effect: Option<String>,
    pub allowed: Option<bool>,
}

fn default_terraform_dir() -> String {
    "terraform".into()
}

fn default_binary() -> String {
    "terraform".into()
}

fn default_resource_output() -> String {
    "test_resource_id".into()
}

fn default_assignment_prefix() -> String {
    "test-".into()
}

fn default_audit_state() -> String {
    polcheck_domain::NON_COMPLIANT.into()
}

fn default_command_timeout_minutes() -> u64 {
    30
}

fn default_max_attempts() -> u32 {
    30
}

fn default_interval_secs() -> u64 {
    30
}
