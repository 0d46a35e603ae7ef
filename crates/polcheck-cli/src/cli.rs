use clap::{Parser, Subcommand, ValueEnum};
use std::path::PathBuf;

#[derive(Debug, Parser)]
#[command(
    name = "polcheck",
    about = "Integration tests for Azure Policy: deploy candidate resources and check they are allowed, audited or denied",
    version
)]
pub struct Cli {
    /// Azure AD tenant of the service principal.
    #[arg(long, env = "ARM_TENANT_ID", global = true)]
    pub tenant_id: Option<String>,

    /// Service principal application (client) ID.
    #[arg(long, env = "ARM_CLIENT_ID", global = true)]
    pub client_id: Option<String>,

    /// Service principal secret.
    #[arg(long, env = "ARM_CLIENT_SECRET", global = true, hide_env_values = true)]
    pub client_secret: Option<String>,

    /// Subscription passed through to the azurerm provider.
    #[arg(long, env = "ARM_SUBSCRIPTION_ID", global = true)]
    pub subscription_id: Option<String>,

    /// Management API base URL.
    #[arg(long, global = true, hide = true, default_value = polcheck_azure::MANAGEMENT_URL)]
    pub management_url: String,

    /// Identity endpoint base URL.
    #[arg(long, global = true, hide = true, default_value = polcheck_azure::LOGIN_URL)]
    pub login_url: String,

    /// Emit logs as JSON lines.
    #[arg(long, global = true)]
    pub log_json: bool,

    #[command(subcommand)]
    pub command: Command,
}

#[derive(Debug, Subcommand)]
pub enum Command {
    /// Provision the baseline, run every case, tear everything down.
    Run {
        /// Suite file.
        #[arg(long, env = "POLCHECK_CONFIG", default_value = "polcheck.yml")]
        config: PathBuf,

        /// Only run cases whose label (`<name>-<effect>`) contains this string.
        #[arg(long)]
        only: Option<String>,

        /// Override the suite's concurrency limit.
        #[arg(long)]
        max_parallel: Option<usize>,

        /// Leave the baseline policy assignments in place afterwards.
        #[arg(long)]
        keep_baseline: bool,

        /// Report format.
        #[arg(long, default_value = "text")]
        output: OutputFormat,
    },

    /// Trigger evaluation for a resource's group and wait for its compliance state.
    Compliance {
        /// Fully-qualified resource ID.
        resource_id: String,

        /// Policy assignment name to look for.
        assignment: String,

        /// Skip triggering evaluation; only poll.
        #[arg(long)]
        no_trigger: bool,

        #[arg(long, default_value_t = 30)]
        max_attempts: u32,

        #[arg(long, default_value_t = 30)]
        interval_secs: u64,
    },

    /// List the cases a suite defines.
    Cases {
        /// Suite file.
        #[arg(long, env = "POLCHECK_CONFIG", default_value = "polcheck.yml")]
        config: PathBuf,

        /// Output format.
        #[arg(long, default_value = "text")]
        output: OutputFormat,
    },
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
pub enum OutputFormat {
    Text,
    Json,
}
