// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

use std::time::Duration;

use clap::Parser;

use super::{Cli, Role};
use crate::agent::relay::PushFailurePolicy;

fn parse(args: &[&str]) -> Cli {
    Cli::parse_from(args)
}

#[test]
fn controller_defaults() -> anyhow::Result<()> {
    let cli = parse(&["cfgsync", "controller", "--agent-token", "secret"]);
    cli.validate()?;
    let Role::Controller(config) = cli.role else {
        anyhow::bail!("expected controller role");
    };
    assert_eq!(config.port, 8080);
    assert_eq!(config.poll_path, "/v1/config");
    assert_eq!(config.poll_interval_secs, 30);
    assert!(config.admin_token.is_none());
    assert!(config.state_file.is_none());
    Ok(())
}

#[test]
fn agent_defaults() -> anyhow::Result<()> {
    let cli = parse(&["cfgsync", "agent", "--agent-token", "secret"]);
    cli.validate()?;
    let Role::Agent(config) = cli.role else {
        anyhow::bail!("expected agent role");
    };
    assert_eq!(config.controller_url, "http://localhost:8080");
    assert_eq!(config.worker_url, "http://localhost:8082");
    assert_eq!(config.name, "agent-1");
    assert_eq!(config.push_failure_policy()?, PushFailurePolicy::Advance);
    assert_eq!(config.timeout(), Duration::from_secs(5));
    assert_eq!(config.register_retry(), Duration::from_secs(5));
    assert_eq!(config.max_backoff(), Duration::from_secs(60));
    Ok(())
}

#[test]
fn worker_defaults() -> anyhow::Result<()> {
    let cli = parse(&["cfgsync", "worker"]);
    cli.validate()?;
    let Role::Worker(config) = cli.role else {
        anyhow::bail!("expected worker role");
    };
    assert_eq!(config.port, 8082);
    assert_eq!(config.timeout(), Duration::from_secs(10));
    Ok(())
}

#[test]
fn global_log_flags_after_subcommand() -> anyhow::Result<()> {
    let cli = parse(&["cfgsync", "worker", "--log-format", "text", "--log-level", "debug"]);
    cli.validate()?;
    assert_eq!(cli.log_format, "text");
    assert_eq!(cli.log_level, "debug");
    Ok(())
}

#[yare::parameterized(
    empty_agent_token = { &["cfgsync", "controller", "--agent-token", ""], "agent-token" },
    empty_admin_token = { &["cfgsync", "controller", "--agent-token", "t", "--admin-token", ""],
                          "admin-token" },
    zero_interval = { &["cfgsync", "controller", "--agent-token", "t", "--poll-interval-secs", "0"],
                      "at least 1" },
    relative_poll_path = { &["cfgsync", "controller", "--agent-token", "t", "--poll-path", "v1/config"],
                           "start with '/'" },
    pattern_poll_path = { &["cfgsync", "controller", "--agent-token", "t", "--poll-path", "/v1/{id}"],
                          "literal path" },
    colliding_poll_path = { &["cfgsync", "controller", "--agent-token", "t", "--poll-path", "/v1/register"],
                            "collides" },
    bad_controller_url = { &["cfgsync", "agent", "--agent-token", "t", "--controller-url", "not a url"],
                           "--controller-url" },
    non_http_worker_url = { &["cfgsync", "agent", "--agent-token", "t", "--worker-url", "ftp://w"],
                            "http or https" },
    bad_push_policy = { &["cfgsync", "agent", "--agent-token", "t", "--push-failure", "drop"],
                        "push failure policy" },
    zero_register_retry = { &["cfgsync", "agent", "--agent-token", "t", "--register-retry-secs", "0"],
                            "register-retry-secs" },
    zero_backoff = { &["cfgsync", "agent", "--agent-token", "t", "--max-backoff-secs", "0"],
                     "max-backoff-secs" },
    zero_worker_timeout = { &["cfgsync", "worker", "--timeout-ms", "0"], "timeout-ms" },
    bad_log_format = { &["cfgsync", "worker", "--log-format", "xml"], "log format" },
)]
fn invalid_config(args: &[&str], expected_substr: &str) {
    let cli = parse(args);
    crate::assert_err_contains!(cli.validate(), expected_substr);
}

#[test]
fn retry_policy_parses() -> anyhow::Result<()> {
    let cli = parse(&["cfgsync", "agent", "--agent-token", "t", "--push-failure", "RETRY"]);
    let Role::Agent(config) = cli.role else {
        anyhow::bail!("expected agent role");
    };
    assert_eq!(config.push_failure_policy()?, PushFailurePolicy::Retry);
    Ok(())
}
