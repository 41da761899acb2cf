//! Error types for portwait operations.

use thiserror::Error;

/// Diagnostic summary shared by both timeout-as-failure variants.
const CONNECTION_TIMEOUT_SUMMARY: &str = "connection timeout";

/// Main error type for portwait operations
#[derive(Error, Debug)]
pub enum PortWaitError {
    /// Deadline elapsed with no successful connection
    #[error("connection timeout: timed out trying to connect to {0}")]
    ConnectionTimeout(String),

    /// The next cooldown would have run past the deadline
    #[error("connection timeout: prematurely timed out trying to connect to {0} (cooldown skipped)")]
    PrematureTimeout(String),

    /// Invalid request for a named target
    #[error("invalid request for target '{0}': {1}")]
    InvalidRequest(String, String),

    /// Config file could not be read or parsed
    #[error("invalid config '{0}': {1}")]
    InvalidConfig(String, String),

    /// Blocking wrapper could not start its runtime
    #[error("runtime error: {0}")]
    Runtime(String),
}

impl PortWaitError {
    /// Short diagnostic summary, e.g. `"connection timeout"`.
    pub fn summary(&self) -> &'static str {
        match self {
            PortWaitError::ConnectionTimeout(_) | PortWaitError::PrematureTimeout(_) => {
                CONNECTION_TIMEOUT_SUMMARY
            }
            PortWaitError::InvalidRequest(..) => "invalid request",
            PortWaitError::InvalidConfig(..) => "invalid config",
            PortWaitError::Runtime(_) => "runtime error",
        }
    }

    /// Diagnostic detail without the summary prefix.
    pub fn detail(&self) -> String {
        match self {
            PortWaitError::ConnectionTimeout(address) => {
                format!("timed out trying to connect to {}", address)
            }
            PortWaitError::PrematureTimeout(address) => format!(
                "prematurely timed out trying to connect to {} (cooldown skipped)",
                address
            ),
            PortWaitError::InvalidRequest(target, reason) => format!("{}: {}", target, reason),
            PortWaitError::InvalidConfig(path, reason) => format!("{}: {}", path, reason),
            PortWaitError::Runtime(reason) => reason.clone(),
        }
    }

    /// True for the two timeout-as-failure outcomes of a poll.
    pub fn is_timeout(&self) -> bool {
        matches!(
            self,
            PortWaitError::ConnectionTimeout(_) | PortWaitError::PrematureTimeout(_)
        )
    }
}

/// Result type alias for portwait operations
pub type Result<T> = std::result::Result<T, PortWaitError>;
