use std::collections::HashMap;
use std::path::Path;
use std::process::Stdio;
use std::time::Duration;

use async_trait::async_trait;
use tokio::io::{AsyncBufReadExt, BufReader};
use tokio::process::Command;
use tracing::{debug, info, warn};

use crate::error::ProvisionError;
use crate::provisioner::Provisioner;

/// Init/apply/destroy should never need more than this.
const DEFAULT_TIMEOUT: Duration = Duration::from_secs(1800);

/// Lines of combined output kept in a [`ProvisionError::CommandFailed`].
const LOG_TAIL_LINES: usize = 40;

// ── RunOutput ─────────────────────────────────────────────────────────────────

/// Captured result of one tool invocation.
#[derive(Debug, Clone, Default)]
pub struct RunOutput {
    pub code:   i32,
    /// Standard output only.
    pub stdout: String,
    /// Standard output and standard error interleaved in arrival order.
    pub log:    String,
}

impl RunOutput {
    fn tail(&self) -> String {
        let lines: Vec<&str> = self.log.lines().collect();
        let start = lines.len().saturating_sub(LOG_TAIL_LINES);
        lines[start..].join("\n")
    }
}

enum Stream {
    Stdout,
    Stderr,
}

// ── TerraformRunner ───────────────────────────────────────────────────────────

/// Runs the `terraform` (or `tofu`) binary in a module directory.
///
/// Every invocation runs non-interactively (`TF_IN_AUTOMATION`, `TF_INPUT=0`)
/// with the configured extra environment, which carries the `ARM_*`
/// credentials the azurerm provider reads.
#[derive(Debug, Clone)]
pub struct TerraformRunner {
    binary:  String,
    env:     HashMap<String, String>,
    timeout: Duration,
}

impl TerraformRunner {
    pub fn new(binary: impl Into<String>) -> Self {
        Self {
            binary:  binary.into(),
            env:     HashMap::new(),
            timeout: DEFAULT_TIMEOUT,
        }
    }

    pub fn with_env(mut self, env: HashMap<String, String>) -> Self {
        self.env = env;
        self
    }

    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }

    fn command_label(&self, args: &[&str]) -> String {
        format!("{} {}", self.binary, args.first().copied().unwrap_or(""))
    }

    /// Run a sub-command, capturing stdout separately and stdout+stderr
    /// combined. Each line is mirrored to tracing under `polcheck::iac`.
    pub async fn run(&self, dir: &Path, args: &[&str]) -> Result<RunOutput, ProvisionError> {
        info!(binary = %self.binary, ?args, dir = %dir.display(), "running IaC command");

        let mut child = Command::new(&self.binary)
            .args(args)
            .current_dir(dir)
            .stdin(Stdio::null())
            .stdout(Stdio::piped())
            .stderr(Stdio::piped())
            .env("TF_IN_AUTOMATION", "1")
            .env("TF_INPUT", "0")
            .envs(&self.env)
            .kill_on_drop(true)
            .spawn()
            .map_err(|e| ProvisionError::Spawn { binary: self.binary.clone(), source: e })?;

        let stdout = child
            .stdout
            .take()
            .ok_or_else(|| ProvisionError::Internal("stdout not captured".into()))?;
        let stderr = child
            .stderr
            .take()
            .ok_or_else(|| ProvisionError::Internal("stderr not captured".into()))?;

        let (tx, mut rx) = tokio::sync::mpsc::unbounded_channel::<(Stream, String)>();

        let tx1 = tx.clone();
        let stdout_task = tokio::spawn(async move {
            let mut lines = BufReader::new(stdout).lines();
            while let Ok(Some(line)) = lines.next_line().await {
                let _ = tx1.send((Stream::Stdout, line));
            }
        });

        let tx2 = tx.clone();
        let stderr_task = tokio::spawn(async move {
            let mut lines = BufReader::new(stderr).lines();
            while let Ok(Some(line)) = lines.next_line().await {
                let _ = tx2.send((Stream::Stderr, line));
            }
        });

        drop(tx); // rx finishes once both readers are done

        let mut out = RunOutput::default();
        let collect = async {
            while let Some((stream, line)) = rx.recv().await {
                debug!(target: "polcheck::iac", "{}", line);
                if let Stream::Stdout = stream {
                    out.stdout.push_str(&line);
                    out.stdout.push('\n');
                }
                out.log.push_str(&line);
                out.log.push('\n');
            }
        };
        let timed_out = tokio::time::timeout(self.timeout, collect).await.is_err();

        if timed_out {
            let _ = child.kill().await;
            stdout_task.abort();
            stderr_task.abort();
            return Err(ProvisionError::TimedOut {
                command: self.command_label(args),
                minutes: self.timeout.as_secs() / 60,
            });
        }

        stdout_task.await.ok();
        stderr_task.await.ok();

        let status = child
            .wait()
            .await
            .map_err(|e| ProvisionError::Internal(format!("wait {}: {}", self.binary, e)))?;
        out.code = status.code().unwrap_or(-1);
        if out.code != 0 {
            warn!(binary = %self.binary, code = out.code, "IaC command exited non-zero");
        }
        Ok(out)
    }

    /// Run and turn a non-zero exit into [`ProvisionError::CommandFailed`].
    async fn run_checked(&self, dir: &Path, args: &[&str]) -> Result<RunOutput, ProvisionError> {
        let out = self.run(dir, args).await?;
        if out.code != 0 {
            return Err(ProvisionError::CommandFailed {
                command:  self.command_label(args),
                code:     out.code,
                log_tail: out.tail(),
            });
        }
        Ok(out)
    }
}

#[async_trait]
impl Provisioner for TerraformRunner {
    fn name(&self) -> &str {
        &self.binary
    }

    async fn init(&self, dir: &Path) -> Result<(), ProvisionError> {
        self.run_checked(dir, &["init", "-input=false", "-no-color"]).await?;
        Ok(())
    }

    async fn apply(&self, dir: &Path) -> Result<(), ProvisionError> {
        self.run_checked(dir, &["apply", "-auto-approve", "-input=false", "-no-color"])
            .await?;
        Ok(())
    }

    async fn destroy(&self, dir: &Path) -> Result<(), ProvisionError> {
        self.run_checked(dir, &["destroy", "-auto-approve", "-input=false", "-no-color"])
            .await?;
        Ok(())
    }

    async fn output(&self, dir: &Path, name: &str) -> Result<String, ProvisionError> {
        let out = self.run_checked(dir, &["output", "-json", "-no-color"]).await?;
        parse_output(&out.stdout, name)
    }
}

// ── Helpers ───────────────────────────────────────────────────────────────────

/// Extract `name` from `terraform output -json`, whose shape is
/// `{"<name>": {"sensitive": bool, "type": ..., "value": ...}}`.
fn parse_output(json: &str, name: &str) -> Result<String, ProvisionError> {
    let map: serde_json::Value = serde_json::from_str(json.trim())
        .map_err(|e| ProvisionError::OutputParse(e.to_string()))?;

    match map.get(name).and_then(|v| v.get("value")) {
        Some(serde_json::Value::String(s)) => Ok(s.clone()),
        Some(other) => Err(ProvisionError::OutputParse(format!(
            "output '{}' is not a string: {}",
            name, other
        ))),
        None => Err(ProvisionError::MissingOutput(name.to_string())),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parse_output_string_value() {
        let json = r#"{"test_resource_id":{"sensitive":false,"type":"string","value":"/subscriptions/s/resourceGroups/g/providers/p/t/n"}}"#;
        assert_eq!(
            parse_output(json, "test_resource_id").unwrap(),
            "/subscriptions/s/resourceGroups/g/providers/p/t/n"
        );
    }

    #[test]
    fn parse_output_missing_key() {
        let err = parse_output(r#"{"other":{"value":"x"}}"#, "test_resource_id").unwrap_err();
        assert!(matches!(err, ProvisionError::MissingOutput(ref n) if n == "test_resource_id"));
    }

    #[test]
    fn parse_output_non_string_value() {
        let err = parse_output(r#"{"ids":{"value":["a","b"]}}"#, "ids").unwrap_err();
        assert!(err.to_string().contains("not a string"), "got: {}", err);
    }

    #[test]
    fn parse_output_garbage() {
        assert!(matches!(
            parse_output("Warning: no outputs", "x"),
            Err(ProvisionError::OutputParse(_))
        ));
    }

    #[test]
    fn tail_keeps_last_lines() {
        let log: String = (0..100).map(|i| format!("line {}\n", i)).collect();
        let out = RunOutput { code: 1, stdout: String::new(), log };
        let tail = out.tail();
        assert!(tail.starts_with("line 60"), "got: {}", tail);
        assert!(tail.ends_with("line 99"));
    }

    #[tokio::test]
    async fn missing_binary_is_spawn_error() {
        let dir = tempfile::tempdir().unwrap();
        let runner = TerraformRunner::new("definitely-not-terraform-xyz");
        let err = runner.init(dir.path()).await.unwrap_err();
        assert!(matches!(err, ProvisionError::Spawn { .. }), "got: {:?}", err);
        assert!(!err.is_tool_failure());
    }

    #[cfg(unix)]
    mod fake_binary {
        use super::*;
        use std::os::unix::fs::PermissionsExt;

        /// A stand-in for terraform: `init` succeeds, `apply` is refused the
        /// way a deny policy refuses it, `output` echoes the credentials env.
        const SCRIPT: &str = r#"#!/bin/sh
case "$1" in
  init)
    echo "Terraform has been successfully initialized!"
    ;;
  apply)
    echo "azurerm_key_vault.test: Creating..."
    echo "Error: RequestDisallowedByPolicy" >&2
    exit 1
    ;;
  output)
    echo "{\"test_resource_id\":{\"value\":\"/subscriptions/s/resourceGroups/g/x\"},\"client\":{\"value\":\"$ARM_CLIENT_ID\"},\"automation\":{\"value\":\"$TF_IN_AUTOMATION\"}}"
    echo "stderr noise" >&2
    ;;
  destroy)
    echo "Destroy complete! Resources: 0 destroyed."
    ;;
  sleep)
    sleep 5
    ;;
esac
"#;

        fn fake(dir: &Path) -> TerraformRunner {
            let bin = dir.join("fake-terraform");
            std::fs::write(&bin, SCRIPT).unwrap();
            std::fs::set_permissions(&bin, std::fs::Permissions::from_mode(0o755)).unwrap();
            let env = HashMap::from([("ARM_CLIENT_ID".to_string(), "client-123".to_string())]);
            TerraformRunner::new(bin.display().to_string()).with_env(env)
        }

        #[tokio::test]
        async fn init_and_destroy_succeed() {
            let dir = tempfile::tempdir().unwrap();
            let tf = fake(dir.path());
            tf.init(dir.path()).await.unwrap();
            tf.destroy(dir.path()).await.unwrap();
        }

        #[tokio::test]
        async fn refused_apply_is_tool_failure_with_log() {
            let dir = tempfile::tempdir().unwrap();
            let err = fake(dir.path()).init_and_apply(dir.path()).await.unwrap_err();
            assert!(err.is_tool_failure(), "got: {:?}", err);
            let msg = err.to_string();
            assert!(msg.contains("code 1"), "got: {}", msg);
            assert!(msg.contains("RequestDisallowedByPolicy"), "got: {}", msg);
        }

        #[tokio::test]
        async fn output_reads_stdout_only_and_sees_env() {
            let dir = tempfile::tempdir().unwrap();
            let tf = fake(dir.path());
            assert_eq!(
                tf.output(dir.path(), "test_resource_id").await.unwrap(),
                "/subscriptions/s/resourceGroups/g/x"
            );
            assert_eq!(tf.output(dir.path(), "client").await.unwrap(), "client-123");
            assert_eq!(tf.output(dir.path(), "automation").await.unwrap(), "1");
        }

        #[tokio::test]
        async fn hung_command_is_killed() {
            let dir = tempfile::tempdir().unwrap();
            let tf = fake(dir.path()).with_timeout(Duration::from_millis(200));
            let err = tf.run(dir.path(), &["sleep"]).await.unwrap_err();
            assert!(matches!(err, ProvisionError::TimedOut { .. }), "got: {:?}", err);
        }
    }
}
