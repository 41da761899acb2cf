//! Poll request and result records.

use std::time::Duration;

use serde::Serialize;

use crate::error::PortWaitError;

/// Cooldown between failed attempts when a request leaves `cooldown_ms` unset.
pub const DEFAULT_COOLDOWN_MS: u64 = 500;

/// Join a host and port into a dialable address, bracketing IPv6 literals.
/// E.g. ("db", 5432) -> "db:5432", ("::1", 22) -> "[::1]:22"
pub fn join_host_port(host: &str, port: u16) -> String {
    if host.contains(':') {
        format!("[{}]:{}", host, port)
    } else {
        format!("{}:{}", host, port)
    }
}

/// Input to a single poll. Immutable while the poll runs.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PollRequest {
    /// Hostname, domain name, or IP address.
    pub host: String,
    /// TCP port.
    pub port: u16,
    /// Seconds to wait before timing out. 0 means wait forever.
    pub timeout_sec: u64,
    /// Milliseconds between failed attempts. `None` falls back to
    /// [`DEFAULT_COOLDOWN_MS`]; `Some(0)` disables pacing.
    pub cooldown_ms: Option<u64>,
    /// Report a timeout as an error instead of `available = false`.
    pub error_on_timeout: bool,
}

impl PollRequest {
    /// Request with no deadline, default cooldown and no error on timeout.
    pub fn new(host: impl Into<String>, port: u16) -> Self {
        Self {
            host: host.into(),
            port,
            timeout_sec: 0,
            cooldown_ms: None,
            error_on_timeout: false,
        }
    }

    pub fn with_timeout_sec(mut self, timeout_sec: u64) -> Self {
        self.timeout_sec = timeout_sec;
        self
    }

    pub fn with_cooldown_ms(mut self, cooldown_ms: u64) -> Self {
        self.cooldown_ms = Some(cooldown_ms);
        self
    }

    pub fn with_error_on_timeout(mut self, error_on_timeout: bool) -> Self {
        self.error_on_timeout = error_on_timeout;
        self
    }

    /// The `host:port` string used both as dial target and result identifier.
    pub fn address(&self) -> String {
        join_host_port(&self.host, self.port)
    }

    /// Overall timeout, or `None` when the poll has no deadline.
    pub fn timeout(&self) -> Option<Duration> {
        (self.timeout_sec > 0).then(|| Duration::from_secs(self.timeout_sec))
    }

    /// Effective pause after a failed attempt.
    pub fn cooldown(&self) -> Duration {
        Duration::from_millis(self.cooldown_ms.unwrap_or(DEFAULT_COOLDOWN_MS))
    }

    /// Check the host/port constraints, naming `target` in the error.
    ///
    /// `PortWaiter::poll` does not call this: an undialable address there is
    /// just a failed attempt.
    pub fn validate(&self, target: &str) -> crate::Result<()> {
        if self.host.trim().is_empty() {
            return Err(PortWaitError::InvalidRequest(
                target.to_string(),
                "host must be non-empty".to_string(),
            ));
        }
        if self.port == 0 {
            return Err(PortWaitError::InvalidRequest(
                target.to_string(),
                "port must be in 1-65535".to_string(),
            ));
        }
        Ok(())
    }
}

/// Output of a completed poll.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct PollResult {
    /// Canonical `host:port` address, set on every outcome.
    #[serde(rename = "id")]
    pub identifier: String,
    /// Whether a connection succeeded before the poll ended.
    pub available: bool,
}
