// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Relay agent role: registers with the controller, polls it for changes,
//! and pushes each new configuration to the paired worker.

pub mod backoff;
pub mod client;
pub mod relay;

use std::fmt;
use std::future::Future;
use std::pin::Pin;
use std::time::Duration;

use tokio_util::sync::CancellationToken;

use crate::config::AgentConfig;
use crate::document::{AgentIdentity, ConfigDocument, PollContract, VersionedDocument};

use self::backoff::Backoff;
use self::client::{HttpDownstream, HttpUpstream};
use self::relay::{RelayAgent, RelaySettings};

pub type BoxFuture<'a, T> = Pin<Box<dyn Future<Output = T> + Send + 'a>>;

/// Outcome of a successful registration.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Registration {
    pub identity: AgentIdentity,
    pub contract: PollContract,
}

/// Why a poll of the controller did not yield a document.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum PollError {
    /// The controller could not be reached (connect failure, timeout).
    Transport(String),
    /// The controller answered with a non-success status.
    Status(u16),
    /// The controller answered 2xx but the body did not decode.
    Decode(String),
}

impl fmt::Display for PollError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Transport(e) => write!(f, "controller unreachable: {e}"),
            Self::Status(code) => write!(f, "unexpected status {code} from controller"),
            Self::Decode(e) => write!(f, "malformed config response: {e}"),
        }
    }
}

impl std::error::Error for PollError {}

/// The authority an agent registers with and polls.
pub trait Upstream: Send + Sync {
    fn register<'a>(&'a self, name: &'a str) -> BoxFuture<'a, anyhow::Result<Registration>>;

    fn fetch<'a>(
        &'a self,
        poll_url: &'a str,
    ) -> BoxFuture<'a, Result<VersionedDocument, PollError>>;
}

/// The worker an agent relays configurations to.
pub trait Downstream: Send + Sync {
    fn push<'a>(&'a self, config: &'a ConfigDocument) -> BoxFuture<'a, anyhow::Result<()>>;
}

/// Time source for every wait in the agent loop.
pub trait Sleeper: Send + Sync {
    fn sleep(&self, duration: Duration) -> BoxFuture<'_, ()>;
}

/// [`Sleeper`] backed by `tokio::time::sleep`.
#[derive(Debug, Clone, Copy, Default)]
pub struct TokioSleeper;

impl Sleeper for TokioSleeper {
    fn sleep(&self, duration: Duration) -> BoxFuture<'_, ()> {
        Box::pin(tokio::time::sleep(duration))
    }
}

/// Run the agent until `shutdown` fires. Never returns early on its own:
/// every steady-state failure is retried.
pub async fn run(config: AgentConfig, shutdown: CancellationToken) -> anyhow::Result<()> {
    let upstream =
        HttpUpstream::new(config.controller_url.clone(), config.agent_token.clone(), config.timeout())?;
    let downstream = HttpDownstream::new(config.worker_url.clone(), config.timeout())?;
    let settings = RelaySettings {
        name: config.name.clone(),
        register_retry: Backoff::Fixed(config.register_retry()),
        transport_backoff: Backoff::Exponential {
            base: Duration::from_secs(1),
            cap: config.max_backoff(),
        },
        push_failure: config.push_failure_policy()?,
    };

    tracing::info!(
        controller = %config.controller_url,
        worker = %config.worker_url,
        push_failure = %settings.push_failure,
        "starting relay agent"
    );
    RelayAgent::new(upstream, downstream, TokioSleeper, settings).run(shutdown).await;
    Ok(())
}
