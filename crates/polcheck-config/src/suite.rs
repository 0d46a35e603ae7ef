use std::path::PathBuf;
use std::time::Duration;

use polcheck_domain::TestCase;

/// Polling settings for compliance-state queries.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PollSettings {
    pub max_attempts: u32,
    pub interval:     Duration,
}

impl Default for PollSettings {
    fn default() -> Self {
        Self {
            max_attempts: 30,
            interval:     Duration::from_secs(30),
        }
    }
}

/// Validated suite configuration.
#[derive(Debug, Clone)]
pub struct SuiteConfig {
    /// Baseline module directory, resolved against the suite file.
    pub terraform_dir:        PathBuf,
    pub binary:               String,
    /// Output each audited case module exposes with its resource id.
    pub resource_output:      String,
    pub assignment_prefix:    String,
    pub expected_audit_state: String,
    /// Upper bound on concurrently running cases; `None` runs all at once.
    pub max_parallel:         Option<usize>,
    pub keep_baseline:        bool,
    pub command_timeout:      Duration,
    pub poll:                 PollSettings,
    pub cases:                Vec<TestCase>,
}

impl SuiteConfig {
    /// Module directory of a single case: `<terraform_dir>/<name>-<effect>`.
    pub fn case_dir(&self, case: &TestCase) -> PathBuf {
        self.terraform_dir.join(case.dir_name())
    }

    /// Keep only the cases whose label contains `filter`.
    pub fn retain_matching(&mut self, filter: &str) {
        self.cases.retain(|c| c.label().contains(filter));
    }
}
