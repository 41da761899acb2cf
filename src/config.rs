//! Wait-target configuration: deserialization and validation.

use crate::error::PortWaitError;
use crate::request::PollRequest;
use serde::Deserialize;
use std::collections::BTreeMap;
use std::path::Path;

/// Top-level portwait configuration, parsed from TOML.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct PortWaitConfig {
    #[serde(default)]
    pub targets: BTreeMap<String, TargetConfig>,
}

/// A single named wait target.
#[derive(Debug, Clone, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct TargetConfig {
    /// Hostname, domain name, IP address
    pub host: String,
    /// TCP port
    pub port: u16,
    #[serde(default = "default_enabled")]
    pub enabled: bool,
    /// How many seconds to wait before timing out. 0 means infinite (default).
    #[serde(default)]
    pub timeout_sec: u64,
    /// Milliseconds between connection attempts, or zero to not wait.
    /// Unset uses the 500ms default.
    pub cooldown_ms: Option<u64>,
    /// Treat a timeout as an error instead of `available = false`.
    #[serde(default)]
    pub error_on_timeout: bool,
}

fn default_enabled() -> bool {
    true
}

impl TargetConfig {
    /// The poll request this target describes.
    pub fn to_request(&self) -> PollRequest {
        PollRequest {
            host: self.host.clone(),
            port: self.port,
            timeout_sec: self.timeout_sec,
            cooldown_ms: self.cooldown_ms,
            error_on_timeout: self.error_on_timeout,
        }
    }
}

impl PortWaitConfig {
    /// Read, parse and validate a TOML config file.
    pub async fn load(path: &Path) -> crate::Result<Self> {
        let display = path.display().to_string();
        let content = tokio::fs::read_to_string(path)
            .await
            .map_err(|e| PortWaitError::InvalidConfig(display.clone(), e.to_string()))?;
        let config: PortWaitConfig = toml::from_str(&content)
            .map_err(|e| PortWaitError::InvalidConfig(display, e.to_string()))?;
        config.validate()?;
        Ok(config)
    }

    /// Validate the config, failing fast before any target is polled.
    pub fn validate(&self) -> crate::Result<()> {
        for (name, target) in &self.targets {
            if !target.enabled {
                continue;
            }
            target.to_request().validate(name)?;
        }
        Ok(())
    }

    /// Poll requests for every enabled target, in name order.
    pub fn requests(&self) -> Vec<(String, PollRequest)> {
        self.targets
            .iter()
            .filter(|(name, target)| {
                if !target.enabled {
                    tracing::debug!(target_name = %name, "skipping disabled target");
                }
                target.enabled
            })
            .map(|(name, target)| (name.clone(), target.to_request()))
            .collect()
    }
}
