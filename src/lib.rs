//! portwait: bounded-retry TCP reachability poller.
//! Repeatedly dials a `host:port` until it accepts a connection, a deadline
//! elapses, or the deadline is treated as a hard failure.

pub mod config;
pub mod dial;
pub mod error;
pub mod request;
pub mod waiter;

pub use config::{PortWaitConfig, TargetConfig};
pub use dial::{Dialer, TcpDialer};
pub use error::{PortWaitError, Result};
pub use request::{join_host_port, PollRequest, PollResult, DEFAULT_COOLDOWN_MS};
pub use waiter::PortWaiter;
