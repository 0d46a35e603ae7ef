use std::collections::HashSet;
use std::path::Path;
use std::time::Duration;

use polcheck_domain::{Effect, TestCase};
use tracing::debug;

use crate::error::ConfigError;
use crate::raw::{RawCase, RawSuite};
use crate::suite::{PollSettings, SuiteConfig};

/// Read and validate a suite file.
///
/// A relative `terraform_dir` is resolved against the directory containing
/// the suite file, so a suite can be run from anywhere.
pub fn load_suite(path: &Path) -> Result<SuiteConfig, ConfigError> {
    let content = std::fs::read_to_string(path).map_err(|e| ConfigError::Io {
        path: path.display().to_string(),
        source: e,
    })?;
    debug!("Loading suite from {}", path.display());

    let base = path.parent().unwrap_or_else(|| Path::new("."));
    parse_suite(&content, base, &path.display().to_string())
}

/// Parse suite YAML. `base` anchors a relative `terraform_dir`; `origin` is
/// only used in error messages.
pub fn parse_suite(content: &str, base: &Path, origin: &str) -> Result<SuiteConfig, ConfigError> {
    let raw: RawSuite = serde_yaml::from_str(content).map_err(|e| ConfigError::YamlParse {
        path: origin.to_string(),
        source: e,
    })?;
    convert_suite(raw, base, origin)
}

fn convert_suite(raw: RawSuite, base: &Path, origin: &str) -> Result<SuiteConfig, ConfigError> {
    let invalid = |message: String| ConfigError::Invalid { path: origin.to_string(), message };

    if raw.cases.is_empty() {
        return Err(invalid("no test cases defined".into()));
    }
    if raw.max_parallel == Some(0) {
        return Err(invalid("max_parallel must be at least 1".into()));
    }
    if raw.poll.max_attempts == 0 {
        return Err(invalid("poll.max_attempts must be at least 1".into()));
    }
    if raw.binary.trim().is_empty() {
        return Err(invalid("binary must not be empty".into()));
    }

    let mut seen = HashSet::new();
    let mut cases = Vec::with_capacity(raw.cases.len());
    for rc in raw.cases {
        let case = convert_case(rc, origin)?;
        if !seen.insert(case.dir_name()) {
            return Err(invalid(format!("duplicate test case '{}'", case.label())));
        }
        cases.push(case);
    }

    let terraform_dir = {
        let dir = Path::new(&raw.terraform_dir);
        if dir.is_absolute() {
            dir.to_path_buf()
        } else {
            base.join(dir)
        }
    };

    let command_timeout = raw
        .command_timeout_minutes
        .checked_mul(60)
        .map(Duration::from_secs)
        .ok_or_else(|| ConfigError::Invalid {
            path: origin.to_string(),
            message: format!(
                "command_timeout_minutes {} is out of range",
                raw.command_timeout_minutes
            ),
        })?;

    Ok(SuiteConfig {
        terraform_dir,
        binary: raw.binary,
        resource_output: raw.resource_output,
        assignment_prefix: raw.assignment_prefix,
        expected_audit_state: raw.expected_audit_state,
        max_parallel: raw.max_parallel,
        keep_baseline: raw.keep_baseline,
        command_timeout,
        poll: PollSettings {
            max_attempts: raw.poll.max_attempts,
            interval: Duration::from_secs(raw.poll.interval_secs),
        },
        cases,
    })
}

fn convert_case(raw: RawCase, origin: &str) -> Result<TestCase, ConfigError> {
    let effect = match (raw.effect, raw.allowed) {
        (Some(e), None) => e.parse::<Effect>()?,
        (None, Some(true)) => Effect::Allow,
        (None, Some(false)) => Effect::Deny,
        (Some(_), Some(_)) => {
            return Err(ConfigError::Invalid {
                path: origin.to_string(),
                message: format!("case '{}' sets both effect and allowed", raw.name),
            })
        }
        (None, None) => {
            return Err(ConfigError::Invalid {
                path: origin.to_string(),
                message: format!("case '{}' needs an effect or allowed", raw.name),
            })
        }
    };
    Ok(TestCase::new(raw.name, effect)?)
}
