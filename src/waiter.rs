//! The retry loop: dial a `host:port` until it accepts a connection or the
//! request's deadline runs out.
//!
//! Each iteration is one attempt. A failed attempt is followed by the
//! request's cooldown unless that cooldown would carry past the deadline, in
//! which case the poll ends early ("premature timeout"). Whether a timeout is
//! an error or just `available = false` is the request's `error_on_timeout`.

use std::time::Duration;

use tokio::time::Instant;

use crate::dial::{Dialer, TcpDialer};
use crate::error::PortWaitError;
use crate::request::{PollRequest, PollResult};

/// How the attempt loop ended.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum LoopExit {
    /// An attempt connected.
    Succeeded,
    /// The deadline passed before the next attempt could start.
    DeadlineExpired,
    /// Sleeping for the cooldown would have passed the deadline.
    CooldownOvershoot,
}

/// Polls a single TCP address until it is reachable.
///
/// Holds no per-poll state, so one waiter can serve any number of
/// independent `poll` calls.
#[derive(Debug, Clone, Default)]
pub struct PortWaiter<D = TcpDialer> {
    dialer: D,
}

impl PortWaiter<TcpDialer> {
    /// Waiter over plain TCP.
    pub fn new() -> Self {
        Self { dialer: TcpDialer }
    }
}

impl<D: Dialer> PortWaiter<D> {
    /// Waiter over a custom dial primitive.
    pub fn with_dialer(dialer: D) -> Self {
        Self { dialer }
    }

    /// Poll `request` until success or timeout.
    ///
    /// Returns `Ok` with `available = true` once a connection succeeds, or
    /// `available = false` when the deadline runs out and
    /// `error_on_timeout` is unset. With `error_on_timeout` set, running out
    /// of time is `PortWaitError::ConnectionTimeout` or
    /// `PortWaitError::PrematureTimeout`. A `timeout_sec` of 0 never times
    /// out: only a successful connection ends the poll.
    pub async fn poll(&self, request: &PollRequest) -> crate::Result<PollResult> {
        let address = request.address();
        let start = Instant::now();
        let deadline = request.timeout().and_then(|timeout| start.checked_add(timeout));
        let cooldown = request.cooldown();

        tracing::debug!(
            address = %address,
            timeout_sec = request.timeout_sec,
            cooldown_ms = cooldown.as_millis() as u64,
            error_on_timeout = request.error_on_timeout,
            "polling for TCP reachability"
        );

        let exit = self.run_attempts(&address, deadline, cooldown).await;
        let elapsed_ms = start.elapsed().as_millis() as u64;

        match exit {
            LoopExit::Succeeded => {
                tracing::info!(address = %address, elapsed_ms, "port is available");
                Ok(PollResult {
                    identifier: address,
                    available: true,
                })
            }
            LoopExit::DeadlineExpired | LoopExit::CooldownOvershoot => {
                let cooldown_skipped = exit == LoopExit::CooldownOvershoot;
                tracing::warn!(
                    address = %address,
                    elapsed_ms,
                    cooldown_skipped,
                    "timed out waiting for port"
                );
                if !request.error_on_timeout {
                    return Ok(PollResult {
                        identifier: address,
                        available: false,
                    });
                }
                if cooldown_skipped {
                    Err(PortWaitError::PrematureTimeout(address))
                } else {
                    Err(PortWaitError::ConnectionTimeout(address))
                }
            }
        }
    }

    /// Blocking variant of [`poll`](Self::poll) for callers without a runtime.
    ///
    /// Runs the poll on a private current-thread runtime. Returns
    /// `PortWaitError::Runtime` when called from inside a tokio runtime, where
    /// blocking the worker thread is not allowed.
    pub fn poll_blocking(&self, request: &PollRequest) -> crate::Result<PollResult> {
        if tokio::runtime::Handle::try_current().is_ok() {
            return Err(PortWaitError::Runtime(
                "poll_blocking called from within an async runtime; use poll instead".to_string(),
            ));
        }
        let runtime = tokio::runtime::Builder::new_current_thread()
            .enable_all()
            .build()
            .map_err(|e| PortWaitError::Runtime(e.to_string()))?;
        runtime.block_on(self.poll(request))
    }

    async fn run_attempts(
        &self,
        address: &str,
        deadline: Option<Instant>,
        cooldown: Duration,
    ) -> LoopExit {
        let mut attempt: u32 = 0;

        loop {
            let attempt_timeout = match deadline {
                None => None,
                Some(deadline) => {
                    let remaining = deadline.saturating_duration_since(Instant::now());
                    if remaining.is_zero() {
                        return LoopExit::DeadlineExpired;
                    }
                    Some(remaining)
                }
            };

            attempt += 1;
            match self.dialer.dial(address, attempt_timeout).await {
                Ok(conn) => {
                    drop(conn);
                    tracing::debug!(address = %address, attempt, "connection established");
                    return LoopExit::Succeeded;
                }
                Err(e) => {
                    tracing::debug!(
                        address = %address,
                        attempt,
                        remaining_ms = attempt_timeout.map(|t| t.as_millis() as u64),
                        error = %e,
                        "connection attempt failed"
                    );
                }
            }

            if cooldown.is_zero() {
                continue;
            }

            if let Some(deadline) = deadline {
                let overshoots = Instant::now()
                    .checked_add(cooldown)
                    .is_none_or(|resume| resume > deadline);
                if overshoots {
                    return LoopExit::CooldownOvershoot;
                }
            }

            tokio::time::sleep(cooldown).await;
        }
    }
}
