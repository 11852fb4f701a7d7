// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Outbound HTTP client construction shared by the agent and worker.

use std::sync::Once;
use std::time::Duration;

static CRYPTO_INIT: Once = Once::new();

/// Install the ring crypto provider for reqwest/rustls.
/// Safe to call multiple times; only the first call has effect.
pub fn ensure_crypto() {
    CRYPTO_INIT.call_once(|| {
        let _ = rustls::crypto::ring::default_provider().install_default();
    });
}

/// Build a client whose every request is bounded by `timeout`.
pub fn http_client(timeout: Duration) -> anyhow::Result<reqwest::Client> {
    ensure_crypto();
    let client = reqwest::Client::builder().timeout(timeout).build()?;
    Ok(client)
}

/// Join a base URL and an absolute path without doubling the slash.
pub fn join_url(base: &str, path: &str) -> String {
    format!("{}/{}", base.trim_end_matches('/'), path.trim_start_matches('/'))
}

#[cfg(test)]
mod tests {
    use super::join_url;

    #[yare::parameterized(
        plain = { "http://h:1", "/v1/config", "http://h:1/v1/config" },
        trailing_slash = { "http://h:1/", "/v1/config", "http://h:1/v1/config" },
        relative_path = { "http://h:1", "v1/config", "http://h:1/v1/config" },
    )]
    fn joins(base: &str, path: &str, expected: &str) {
        assert_eq!(join_url(base, path), expected);
    }
}
