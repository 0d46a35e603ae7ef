use std::path::PathBuf;
use std::process::ExitCode;
use std::sync::Arc;
use std::time::Duration;

use anyhow::{Context, Result};
use polcheck_azure::{
    ClientCredentials, ClientCredentialsTokenProvider, Endpoints, PolicyInsightsClient, PollPolicy,
    TokenProvider,
};
use polcheck_config::{
    credentials::{ENV_CLIENT_ID, ENV_CLIENT_SECRET, ENV_SUBSCRIPTION_ID, ENV_TENANT_ID},
    load_suite, ArmCredentials,
};
use polcheck_domain::ResourceId;
use polcheck_harness::{poll_policy, Harness};
use polcheck_provision::TerraformRunner;
use tracing::info;

use crate::cli::{Cli, OutputFormat};
use crate::output;

/// Credentials and endpoints gathered from global flags.
pub struct Access {
    tenant_id:       Option<String>,
    client_id:       Option<String>,
    client_secret:   Option<String>,
    subscription_id: Option<String>,
    endpoints:       Endpoints,
}

impl Access {
    pub fn from_cli(cli: &Cli) -> Self {
        Self {
            tenant_id:       cli.tenant_id.clone(),
            client_id:       cli.client_id.clone(),
            client_secret:   cli.client_secret.clone(),
            subscription_id: cli.subscription_id.clone(),
            endpoints:       Endpoints {
                management: cli.management_url.clone(),
                login:      cli.login_url.clone(),
            },
        }
    }

    fn credentials(&self) -> Result<ArmCredentials> {
        let creds = ArmCredentials::from_lookup(|key| match key {
            ENV_TENANT_ID => self.tenant_id.clone(),
            ENV_CLIENT_ID => self.client_id.clone(),
            ENV_CLIENT_SECRET => self.client_secret.clone(),
            ENV_SUBSCRIPTION_ID => self.subscription_id.clone(),
            _ => None,
        })?;
        Ok(creds)
    }

    fn policy_client(&self, creds: &ArmCredentials, poll: PollPolicy) -> PolicyInsightsClient {
        let token: Arc<dyn TokenProvider> = Arc::new(ClientCredentialsTokenProvider::with_endpoints(
            ClientCredentials {
                tenant_id:     creds.tenant_id.clone(),
                client_id:     creds.client_id.clone(),
                client_secret: creds.client_secret.clone(),
            },
            &self.endpoints,
        ));
        PolicyInsightsClient::new(token, &self.endpoints).with_poll_policy(poll)
    }
}

// ── Run ───────────────────────────────────────────────────────────────────────

pub async fn run(
    access: Access,
    config: PathBuf,
    only: Option<String>,
    max_parallel: Option<usize>,
    keep_baseline: bool,
    format: OutputFormat,
) -> Result<ExitCode> {
    let mut suite = load_suite(&config)
        .with_context(|| format!("Failed to load suite {}", config.display()))?;

    if let Some(filter) = only.as_deref() {
        suite.retain_matching(filter);
        info!(filter, selected = suite.cases.len(), "filtered cases");
    }
    if let Some(n) = max_parallel {
        if n == 0 {
            anyhow::bail!("--max-parallel must be at least 1");
        }
        suite.max_parallel = Some(n);
    }
    suite.keep_baseline |= keep_baseline;

    let creds = access.credentials()?;
    let evaluator = Arc::new(access.policy_client(&creds, poll_policy(&suite.poll)));
    let provisioner = Arc::new(
        TerraformRunner::new(&suite.binary)
            .with_env(creds.env_vars())
            .with_timeout(suite.command_timeout),
    );

    let report = Harness::new(suite, provisioner, evaluator)
        .run()
        .await
        .context("Policy suite aborted")?;

    match format {
        OutputFormat::Text => print!("{}", output::render_report(&report)),
        OutputFormat::Json => println!("{}", serde_json::to_string_pretty(&report)?),
    }

    Ok(if report.is_success() { ExitCode::SUCCESS } else { ExitCode::FAILURE })
}

// ── Compliance ────────────────────────────────────────────────────────────────

pub async fn compliance(
    access: Access,
    resource_id: String,
    assignment: String,
    no_trigger: bool,
    max_attempts: u32,
    interval_secs: u64,
) -> Result<ExitCode> {
    if max_attempts == 0 {
        anyhow::bail!("--max-attempts must be at least 1");
    }
    let resource_id = ResourceId::new(resource_id);
    let group_id = resource_id.resource_group_id()?;

    let creds = access.credentials()?;
    let client = access.policy_client(
        &creds,
        PollPolicy { max_attempts, interval: Duration::from_secs(interval_secs) },
    );
    let poll = client.poll_policy();
    info!(
        resource = %resource_id,
        assignment = %assignment,
        max_attempts = poll.max_attempts,
        interval_secs = poll.interval.as_secs(),
        "querying compliance state"
    );

    if !no_trigger {
        client
            .trigger_evaluation(&group_id)
            .await
            .context("Trigger policy evaluation failed")?;
    }
    let state = client
        .get_compliance_state(&resource_id, &assignment)
        .await
        .context("Get compliance state failed")?;

    println!("{}", state);
    Ok(ExitCode::SUCCESS)
}

// ── Cases ─────────────────────────────────────────────────────────────────────

pub fn cases(config: PathBuf, format: OutputFormat) -> Result<ExitCode> {
    let suite = load_suite(&config)
        .with_context(|| format!("Failed to load suite {}", config.display()))?;

    match format {
        OutputFormat::Text => print!("{}", output::render_cases(&suite)),
        OutputFormat::Json => println!("{}", serde_json::to_string_pretty(&output::cases_json(&suite))?),
    }
    Ok(ExitCode::SUCCESS)
}
