// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

use std::path::PathBuf;
use std::time::Duration;

use clap::{Args, Parser, Subcommand};

use crate::agent::relay::PushFailurePolicy;
use crate::transport::{AGENTS_PATH, HEALTH_PATH, REGISTER_PATH};

/// Distributed configuration propagation: controller, relay agent, worker.
#[derive(Debug, Parser)]
#[command(name = "cfgsync", version, about)]
pub struct Cli {
    /// Log format (json or text).
    #[arg(long, env = "CFGSYNC_LOG_FORMAT", default_value = "json", global = true)]
    pub log_format: String,

    /// Log level (trace, debug, info, warn, error).
    #[arg(long, env = "CFGSYNC_LOG_LEVEL", default_value = "info", global = true)]
    pub log_level: String,

    #[command(subcommand)]
    pub role: Role,
}

#[derive(Debug, Subcommand)]
pub enum Role {
    /// Serve the authoritative configuration and register agents.
    Controller(ControllerConfig),
    /// Poll the controller and relay changes to the paired worker.
    Agent(AgentConfig),
    /// Hold the active configuration and serve the hit action.
    Worker(WorkerConfig),
}

impl Cli {
    /// Validate the configuration after parsing.
    pub fn validate(&self) -> anyhow::Result<()> {
        match self.log_format.as_str() {
            "json" | "text" => {}
            other => anyhow::bail!("invalid log format: {other}"),
        }
        match &self.role {
            Role::Controller(c) => c.validate(),
            Role::Agent(c) => c.validate(),
            Role::Worker(c) => c.validate(),
        }
    }
}

/// Configuration for the controller process.
#[derive(Debug, Clone, Args)]
pub struct ControllerConfig {
    /// Host address to bind to.
    #[arg(long, env = "CFGSYNC_HOST", default_value = "0.0.0.0")]
    pub host: String,

    /// HTTP port to listen on.
    #[arg(long, env = "CFGSYNC_CONTROLLER_PORT", default_value_t = 8080)]
    pub port: u16,

    /// Shared bearer token agents present to register and poll.
    #[arg(long, env = "CFGSYNC_AGENT_TOKEN")]
    pub agent_token: String,

    /// Bearer token for administrative endpoints. If unset, they are open.
    #[arg(long, env = "CFGSYNC_ADMIN_TOKEN")]
    pub admin_token: Option<String>,

    /// Path agents poll for the latest configuration.
    #[arg(long, env = "CFGSYNC_POLL_PATH", default_value = "/v1/config")]
    pub poll_path: String,

    /// Poll interval handed to agents at registration, in seconds.
    #[arg(long, env = "CFGSYNC_POLL_INTERVAL", default_value_t = 30)]
    pub poll_interval_secs: u64,

    /// JSON state file. When unset, state lives in memory only.
    #[arg(long, env = "CFGSYNC_STATE_FILE")]
    pub state_file: Option<PathBuf>,
}

impl ControllerConfig {
    pub fn validate(&self) -> anyhow::Result<()> {
        if self.agent_token.is_empty() {
            anyhow::bail!("--agent-token must not be empty");
        }
        if self.admin_token.as_deref() == Some("") {
            anyhow::bail!("--admin-token must not be empty when set");
        }
        if self.poll_interval_secs == 0 {
            anyhow::bail!("--poll-interval-secs must be at least 1");
        }
        if !self.poll_path.starts_with('/') {
            anyhow::bail!("--poll-path must start with '/': {}", self.poll_path);
        }
        if self.poll_path.contains(['{', '}', '*', '?', '#']) {
            anyhow::bail!("--poll-path must be a literal path: {}", self.poll_path);
        }
        if [HEALTH_PATH, REGISTER_PATH, AGENTS_PATH].contains(&self.poll_path.as_str()) {
            anyhow::bail!("--poll-path collides with a built-in route: {}", self.poll_path);
        }
        Ok(())
    }
}

/// Configuration for the relay agent process.
#[derive(Debug, Clone, Args)]
pub struct AgentConfig {
    /// Base URL of the controller.
    #[arg(long, env = "CFGSYNC_CONTROLLER_URL", default_value = "http://localhost:8080")]
    pub controller_url: String,

    /// Base URL of the paired worker.
    #[arg(long, env = "CFGSYNC_WORKER_URL", default_value = "http://localhost:8082")]
    pub worker_url: String,

    /// Shared bearer token presented to the controller.
    #[arg(long, env = "CFGSYNC_AGENT_TOKEN")]
    pub agent_token: String,

    /// Display name sent at registration.
    #[arg(long, env = "CFGSYNC_AGENT_NAME", default_value = "agent-1")]
    pub name: String,

    /// What to do when a push to the worker fails: advance, retry.
    #[arg(long, env = "CFGSYNC_PUSH_FAILURE", default_value = "advance")]
    pub push_failure: String,

    /// Timeout for each controller and worker request, in milliseconds.
    #[arg(long, env = "CFGSYNC_AGENT_TIMEOUT_MS", default_value_t = 5000)]
    pub timeout_ms: u64,

    /// Delay between registration attempts, in seconds.
    #[arg(long, env = "CFGSYNC_REGISTER_RETRY", default_value_t = 5)]
    pub register_retry_secs: u64,

    /// Upper bound on the transport-failure backoff, in seconds.
    #[arg(long, env = "CFGSYNC_MAX_BACKOFF", default_value_t = 60)]
    pub max_backoff_secs: u64,
}

impl AgentConfig {
    pub fn validate(&self) -> anyhow::Result<()> {
        validate_base_url("--controller-url", &self.controller_url)?;
        validate_base_url("--worker-url", &self.worker_url)?;
        if self.agent_token.is_empty() {
            anyhow::bail!("--agent-token must not be empty");
        }
        if self.timeout_ms == 0 {
            anyhow::bail!("--timeout-ms must be positive");
        }
        if self.register_retry_secs == 0 {
            anyhow::bail!("--register-retry-secs must be positive");
        }
        if self.max_backoff_secs == 0 {
            anyhow::bail!("--max-backoff-secs must be positive");
        }
        self.push_failure_policy()?;
        Ok(())
    }

    pub fn push_failure_policy(&self) -> anyhow::Result<PushFailurePolicy> {
        self.push_failure.parse()
    }

    pub fn timeout(&self) -> Duration {
        Duration::from_millis(self.timeout_ms)
    }

    pub fn register_retry(&self) -> Duration {
        Duration::from_secs(self.register_retry_secs)
    }

    pub fn max_backoff(&self) -> Duration {
        Duration::from_secs(self.max_backoff_secs)
    }
}

/// Configuration for the worker process.
#[derive(Debug, Clone, Args)]
pub struct WorkerConfig {
    /// Host address to bind to.
    #[arg(long, env = "CFGSYNC_HOST", default_value = "0.0.0.0")]
    pub host: String,

    /// HTTP port to listen on.
    #[arg(long, env = "CFGSYNC_WORKER_PORT", default_value_t = 8082)]
    pub port: u16,

    /// Timeout for the outbound hit request, in milliseconds.
    #[arg(long, env = "CFGSYNC_WORKER_TIMEOUT_MS", default_value_t = 10000)]
    pub timeout_ms: u64,
}

impl WorkerConfig {
    pub fn validate(&self) -> anyhow::Result<()> {
        if self.timeout_ms == 0 {
            anyhow::bail!("--timeout-ms must be positive");
        }
        Ok(())
    }

    pub fn timeout(&self) -> Duration {
        Duration::from_millis(self.timeout_ms)
    }
}

fn validate_base_url(flag: &str, value: &str) -> anyhow::Result<()> {
    let url = reqwest::Url::parse(value)
        .map_err(|e| anyhow::anyhow!("{flag} is not a valid URL ({value}): {e}"))?;
    match url.scheme() {
        "http" | "https" => Ok(()),
        other => anyhow::bail!("{flag} must use http or https, got {other}"),
    }
}

#[cfg(test)]
#[path = "config_tests.rs"]
mod tests;
