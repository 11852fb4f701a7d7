// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! The relay agent state machine: register, then poll and relay forever.

use std::fmt;
use std::time::Duration;

use tokio_util::sync::CancellationToken;

use crate::agent::backoff::Backoff;
use crate::agent::{Downstream, PollError, Registration, Sleeper, Upstream};
use crate::document::{PollContract, VersionToken, VersionedDocument};

/// What to do with the version cache when a push to the worker fails.
#[derive(Debug, Default, Clone, Copy, PartialEq, Eq)]
pub enum PushFailurePolicy {
    /// Keep the new version cached; it is not pushed again. The next change
    /// or an agent restart is what delivers a newer document.
    #[default]
    Advance,
    /// Restore the previous cached version so the next poll relays it again.
    Retry,
}

impl fmt::Display for PushFailurePolicy {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Advance => f.write_str("advance"),
            Self::Retry => f.write_str("retry"),
        }
    }
}

impl std::str::FromStr for PushFailurePolicy {
    type Err = anyhow::Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "advance" => Ok(Self::Advance),
            "retry" => Ok(Self::Retry),
            other => anyhow::bail!("invalid push failure policy: {other}"),
        }
    }
}

/// Last version the agent observed from the controller.
#[derive(Debug, Default, Clone, PartialEq, Eq)]
pub enum VersionCache {
    /// Nothing observed yet. Differs from every token, including the
    /// empty-store sentinel, so the first successful poll always relays.
    #[default]
    Unset,
    Seen(VersionToken),
}

impl VersionCache {
    pub fn is_change(&self, version: &VersionToken) -> bool {
        match self {
            Self::Unset => true,
            Self::Seen(seen) => seen != version,
        }
    }
}

/// Result of one poll (and possible relay).
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum TickOutcome {
    /// The controller's version matches the cache.
    Unchanged,
    /// A new version was pushed to the worker.
    Relayed(VersionToken),
    /// A new version was detected but the push failed.
    PushFailed(VersionToken),
    /// The controller was unreachable; wait `backoff` before the next tick.
    TransportFailure { backoff: Duration },
    /// The controller answered with a non-success status.
    AuthorityError(u16),
    /// The controller's response did not decode.
    DecodeFailure,
}

/// Tunables for a [`RelayAgent`].
#[derive(Debug, Clone)]
pub struct RelaySettings {
    pub name: String,
    pub register_retry: Backoff,
    pub transport_backoff: Backoff,
    pub push_failure: PushFailurePolicy,
}

impl Default for RelaySettings {
    fn default() -> Self {
        Self {
            name: "agent-1".to_owned(),
            register_retry: Backoff::Fixed(Duration::from_secs(5)),
            transport_backoff: Backoff::Exponential {
                base: Duration::from_secs(1),
                cap: Duration::from_secs(60),
            },
            push_failure: PushFailurePolicy::Advance,
        }
    }
}

/// Polls an [`Upstream`] and relays changes to a [`Downstream`].
///
/// Strictly sequential: one poll and its relay complete before the next
/// wait begins.
pub struct RelayAgent<U, D, S> {
    upstream: U,
    downstream: D,
    sleeper: S,
    settings: RelaySettings,
    version_cache: VersionCache,
    transport_failures: u32,
}

impl<U: Upstream, D: Downstream, S: Sleeper> RelayAgent<U, D, S> {
    pub fn new(upstream: U, downstream: D, sleeper: S, settings: RelaySettings) -> Self {
        Self {
            upstream,
            downstream,
            sleeper,
            settings,
            version_cache: VersionCache::Unset,
            transport_failures: 0,
        }
    }

    pub fn version_cache(&self) -> &VersionCache {
        &self.version_cache
    }

    /// Consecutive transport failures since the last reachable poll.
    pub fn transport_failures(&self) -> u32 {
        self.transport_failures
    }

    /// Register with the upstream, retrying until it succeeds.
    pub async fn register(&mut self) -> Registration {
        let mut attempt = 0u32;
        loop {
            match self.upstream.register(&self.settings.name).await {
                Ok(registration) => {
                    tracing::info!(
                        agent_id = %registration.identity.agent_id,
                        poll_url = %registration.contract.poll_url,
                        poll_interval_secs = registration.contract.poll_interval_seconds,
                        "registered with controller"
                    );
                    self.version_cache = VersionCache::Unset;
                    self.transport_failures = 0;
                    return registration;
                }
                Err(e) => {
                    attempt = attempt.saturating_add(1);
                    let delay = self.settings.register_retry.delay(attempt);
                    tracing::warn!(
                        err = %e,
                        attempt,
                        retry_secs = delay.as_secs_f64(),
                        "failed to register agent"
                    );
                    self.sleeper.sleep(delay).await;
                }
            }
        }
    }

    /// Fetch once and relay if the version changed.
    pub async fn poll_once(&mut self, contract: &PollContract) -> TickOutcome {
        let latest = match self.upstream.fetch(&contract.poll_url).await {
            Ok(latest) => latest,
            Err(PollError::Transport(e)) => {
                self.transport_failures = self.transport_failures.saturating_add(1);
                let backoff = self.settings.transport_backoff.delay(self.transport_failures);
                tracing::warn!(
                    err = %e,
                    failures = self.transport_failures,
                    backoff_secs = backoff.as_secs_f64(),
                    "failed to poll controller"
                );
                return TickOutcome::TransportFailure { backoff };
            }
            Err(PollError::Status(status)) => {
                tracing::warn!(status, "unexpected status code from controller");
                return TickOutcome::AuthorityError(status);
            }
            Err(PollError::Decode(e)) => {
                tracing::warn!(err = %e, "failed to parse config from controller");
                return TickOutcome::DecodeFailure;
            }
        };

        self.transport_failures = 0;
        if !self.version_cache.is_change(&latest.version) {
            tracing::debug!(version = %latest.version, "configuration unchanged");
            return TickOutcome::Unchanged;
        }
        self.relay(latest).await
    }

    async fn relay(&mut self, latest: VersionedDocument) -> TickOutcome {
        let version = latest.version;
        tracing::info!(version = %version, "configuration change detected");
        let previous =
            std::mem::replace(&mut self.version_cache, VersionCache::Seen(version.clone()));

        match self.downstream.push(&latest.config).await {
            Ok(()) => {
                tracing::info!(version = %version, "pushed config to worker");
                TickOutcome::Relayed(version)
            }
            Err(e) => {
                tracing::warn!(
                    err = %e,
                    version = %version,
                    policy = %self.settings.push_failure,
                    "failed to push config to worker"
                );
                if self.settings.push_failure == PushFailurePolicy::Retry {
                    self.version_cache = previous;
                }
                TickOutcome::PushFailed(version)
            }
        }
    }

    /// One full cycle: wait the poll interval, poll, and back off if the
    /// controller was unreachable.
    pub async fn cycle(&mut self, contract: &PollContract) -> TickOutcome {
        self.sleeper.sleep(contract.poll_interval()).await;
        let outcome = self.poll_once(contract).await;
        if let TickOutcome::TransportFailure { backoff } = outcome {
            self.sleeper.sleep(backoff).await;
        }
        outcome
    }

    /// Register, then cycle until `shutdown` fires. Shutdown is checked
    /// before every resume, so in-flight requests and sleeps are dropped
    /// rather than awaited.
    pub async fn run(mut self, shutdown: CancellationToken) {
        let registration = tokio::select! {
            biased;
            _ = shutdown.cancelled() => return,
            registration = self.register() => registration,
        };

        loop {
            tokio::select! {
                biased;
                _ = shutdown.cancelled() => break,
                _ = self.cycle(&registration.contract) => {}
            }
        }
        tracing::info!(agent_id = %registration.identity.agent_id, "relay agent stopped");
    }
}

#[cfg(test)]
#[path = "relay_tests.rs"]
mod tests;
