// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Shared test infrastructure: scripted collaborators, servers, and
//! assertion helpers.

use std::collections::VecDeque;
use std::net::SocketAddr;
use std::sync::atomic::{AtomicU32, AtomicUsize, Ordering};
use std::sync::Arc;
use std::time::Duration;

use parking_lot::Mutex;
use tokio::task::JoinHandle;
use tokio_util::sync::CancellationToken;

use crate::agent::{BoxFuture, Downstream, PollError, Registration, Sleeper, Upstream};
use crate::document::{AgentIdentity, ConfigDocument, PollContract, VersionedDocument};

/// Serve `router` on an ephemeral localhost port.
pub async fn spawn_router(router: axum::Router) -> anyhow::Result<(SocketAddr, JoinHandle<()>)> {
    let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await?;
    let addr = listener.local_addr()?;
    let handle = tokio::spawn(async move {
        let _ = axum::serve(listener, router).await;
    });
    Ok((addr, handle))
}

/// A successful registration carrying `contract`.
pub fn registration(name: &str, contract: PollContract) -> Registration {
    Registration { identity: AgentIdentity::new(name), contract }
}

/// [`Upstream`] that replays scripted results.
///
/// Registration errors are consumed in order before the scripted
/// registration is returned. Fetches pop from the queue; once it is empty
/// every fetch is a transport failure.
#[derive(Clone)]
pub struct ScriptedUpstream {
    registration: Registration,
    register_failures: Arc<AtomicU32>,
    register_calls: Arc<AtomicUsize>,
    fetches: Arc<Mutex<VecDeque<Result<VersionedDocument, PollError>>>>,
    fetched_urls: Arc<Mutex<Vec<String>>>,
}

impl ScriptedUpstream {
    pub fn new(registration: Registration) -> Self {
        Self {
            registration,
            register_failures: Arc::new(AtomicU32::new(0)),
            register_calls: Arc::new(AtomicUsize::new(0)),
            fetches: Arc::new(Mutex::new(VecDeque::new())),
            fetched_urls: Arc::new(Mutex::new(Vec::new())),
        }
    }

    /// Fail the first `n` registration attempts.
    pub fn failing_registrations(self, n: u32) -> Self {
        self.register_failures.store(n, Ordering::SeqCst);
        self
    }

    pub fn push_fetch(&self, result: Result<VersionedDocument, PollError>) {
        self.fetches.lock().push_back(result);
    }

    pub fn register_calls(&self) -> usize {
        self.register_calls.load(Ordering::SeqCst)
    }

    pub fn fetched_urls(&self) -> Vec<String> {
        self.fetched_urls.lock().clone()
    }
}

impl Upstream for ScriptedUpstream {
    fn register<'a>(&'a self, _name: &'a str) -> BoxFuture<'a, anyhow::Result<Registration>> {
        Box::pin(async move {
            self.register_calls.fetch_add(1, Ordering::SeqCst);
            let remaining = self.register_failures.load(Ordering::SeqCst);
            if remaining > 0 {
                self.register_failures.store(remaining - 1, Ordering::SeqCst);
                anyhow::bail!("controller unavailable");
            }
            Ok(self.registration.clone())
        })
    }

    fn fetch<'a>(
        &'a self,
        poll_url: &'a str,
    ) -> BoxFuture<'a, Result<VersionedDocument, PollError>> {
        Box::pin(async move {
            self.fetched_urls.lock().push(poll_url.to_owned());
            self.fetches
                .lock()
                .pop_front()
                .unwrap_or_else(|| Err(PollError::Transport("script exhausted".to_owned())))
        })
    }
}

/// [`Downstream`] that records every pushed document.
#[derive(Clone, Default)]
pub struct RecordingDownstream {
    pushes: Arc<Mutex<Vec<ConfigDocument>>>,
    failures: Arc<AtomicU32>,
}

impl RecordingDownstream {
    pub fn new() -> Self {
        Self::default()
    }

    /// Fail the next `n` pushes. Failed pushes are still recorded.
    pub fn fail_next(&self, n: u32) {
        self.failures.store(n, Ordering::SeqCst);
    }

    pub fn pushes(&self) -> Vec<ConfigDocument> {
        self.pushes.lock().clone()
    }
}

impl Downstream for RecordingDownstream {
    fn push<'a>(&'a self, config: &'a ConfigDocument) -> BoxFuture<'a, anyhow::Result<()>> {
        Box::pin(async move {
            self.pushes.lock().push(config.clone());
            let remaining = self.failures.load(Ordering::SeqCst);
            if remaining > 0 {
                self.failures.store(remaining - 1, Ordering::SeqCst);
                anyhow::bail!("worker unavailable");
            }
            Ok(())
        })
    }
}

/// [`Sleeper`] that records requested durations and returns after a yield.
///
/// With [`RecordingSleeper::cancel_after`] it fires a shutdown token once
/// the given number of sleeps have been requested.
#[derive(Clone, Default)]
pub struct RecordingSleeper {
    sleeps: Arc<Mutex<Vec<Duration>>>,
    cancel: Option<(usize, CancellationToken)>,
}

impl RecordingSleeper {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn cancel_after(sleeps: usize, token: CancellationToken) -> Self {
        Self { sleeps: Arc::default(), cancel: Some((sleeps, token)) }
    }

    pub fn sleeps(&self) -> Vec<Duration> {
        self.sleeps.lock().clone()
    }
}

impl Sleeper for RecordingSleeper {
    fn sleep(&self, duration: Duration) -> BoxFuture<'_, ()> {
        Box::pin(async move {
            let count = {
                let mut sleeps = self.sleeps.lock();
                sleeps.push(duration);
                sleeps.len()
            };
            if let Some((limit, token)) = &self.cancel {
                if count >= *limit {
                    token.cancel();
                }
            }
            tokio::task::yield_now().await;
        })
    }
}

/// Extension trait to convert any `Display` error into `anyhow::Error`.
/// Replaces `.map_err(|e| anyhow::anyhow!("{e}"))` with `.anyhow()`.
pub trait AnyhowExt<T> {
    fn anyhow(self) -> anyhow::Result<T>;
}

impl<T, E: std::fmt::Display> AnyhowExt<T> for Result<T, E> {
    fn anyhow(self) -> anyhow::Result<T> {
        self.map_err(|e| anyhow::anyhow!("{e}"))
    }
}

/// Assert that an expression evaluates to `Err` whose Display output
/// contains the given substring.
#[macro_export]
macro_rules! assert_err_contains {
    ($expr:expr, $substr:expr) => {{
        let result = $expr;
        let err = result.expect_err(concat!("expected Err for: ", stringify!($expr)));
        let msg = err.to_string();
        assert!(msg.contains($substr), "expected error containing {:?}, got: {msg:?}", $substr);
    }};
}
