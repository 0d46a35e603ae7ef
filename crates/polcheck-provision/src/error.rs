use thiserror::Error;

#[derive(Debug, Error)]
pub enum ProvisionError {
    #[error("spawn {binary}: {source}")]
    Spawn {
        binary: String,
        #[source]
        source: std::io::Error,
    },

    /// The tool ran and exited non-zero. `log_tail` holds the last lines of
    /// its combined output.
    #[error("{command} exited with code {code}:\n{log_tail}")]
    CommandFailed {
        command:  String,
        code:     i32,
        log_tail: String,
    },

    #[error("{command} timed out after {minutes} minutes")]
    TimedOut { command: String, minutes: u64 },

    #[error("output '{0}' missing from terraform output")]
    MissingOutput(String),

    #[error("parse terraform output: {0}")]
    OutputParse(String),

    #[error("internal provisioning error: {0}")]
    Internal(String),
}

impl ProvisionError {
    /// True when the tool itself reported failure, as opposed to the harness
    /// failing to run it.
    pub fn is_tool_failure(&self) -> bool {
        matches!(self, ProvisionError::CommandFailed { .. })
    }
}
