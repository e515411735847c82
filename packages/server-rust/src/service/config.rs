use std::path::Path;
use std::sync::LazyLock;
use std::time::Duration;

use oddeven_core::channel_names;
use regex::Regex;
use serde::{Deserialize, Serialize};

static CHANNEL_NAME: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"^[A-Za-z_][A-Za-z0-9_.\-]*$").expect("channel name pattern is valid")
});

/// Errors from loading or validating a `FlowConfig`.
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("invalid channel name for {field}: {name:?}")]
    InvalidChannelName { field: &'static str, name: String },
    #[error("{a} and {b} must name different channels")]
    AliasedChannels { a: &'static str, b: &'static str },
    #[error("{field} must be greater than zero")]
    ZeroPeriod { field: &'static str },
    #[error("gateway_bound must be positive, got {0}")]
    InvalidGatewayBound(i64),
    #[error("failed to read config file: {0}")]
    Io(#[from] std::io::Error),
    #[error("failed to parse config file: {0}")]
    Parse(#[from] serde_json::Error),
}

/// Topology configuration: channel names, producer targets and periods.
///
/// The two producer targets are separate values. Both default to the
/// ingress channel the router consumes; pointing one elsewhere is allowed and
/// shows up at runtime as dropped publishes.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct FlowConfig {
    /// Channel the parity router subscribes to.
    pub ingress_channel: String,
    /// Channel receiving even numbers.
    pub even_channel: String,
    /// Channel receiving odd numbers.
    pub odd_channel: String,
    /// Channel the sequential producer publishes to.
    pub sequential_target: String,
    /// Channel the gateway publishes to.
    pub gateway_target: String,
    /// Sequential producer period in milliseconds.
    pub sequential_period_ms: u64,
    /// Gateway producer period in milliseconds.
    pub gateway_period_ms: u64,
    /// Gateway values are `-random(0..gateway_bound)`.
    pub gateway_bound: i64,
    /// Install an odd-only filter in front of the odd pipeline.
    pub odd_filter: bool,
    /// Maximum time to wait for in-flight ticks on shutdown, in milliseconds.
    pub shutdown_drain_ms: u64,
}

impl Default for FlowConfig {
    fn default() -> Self {
        Self {
            ingress_channel: channel_names::INGRESS.to_string(),
            even_channel: channel_names::EVEN.to_string(),
            odd_channel: channel_names::ODD.to_string(),
            sequential_target: channel_names::INGRESS.to_string(),
            gateway_target: channel_names::INGRESS.to_string(),
            sequential_period_ms: 100,
            gateway_period_ms: 1_000,
            gateway_bound: 100,
            odd_filter: false,
            shutdown_drain_ms: 5_000,
        }
    }
}

impl FlowConfig {
    /// Loads a JSON config file. Missing fields take their defaults.
    ///
    /// # Errors
    ///
    /// Returns `ConfigError::Io` if the file cannot be read and
    /// `ConfigError::Parse` if it is not valid JSON for this type.
    pub fn from_file(path: &Path) -> Result<Self, ConfigError> {
        let raw = std::fs::read_to_string(path)?;
        Ok(serde_json::from_str(&raw)?)
    }

    /// Checks channel names, periods and the gateway bound.
    ///
    /// The ingress, even and odd channels must be pairwise distinct: routing
    /// into the router's own input would recurse without end, and a shared
    /// even/odd channel would run both pipelines on every value. Producer
    /// targets are not checked for subscribers.
    ///
    /// # Errors
    ///
    /// Returns the first violation found.
    pub fn validate(&self) -> Result<(), ConfigError> {
        for (field, name) in [
            ("ingress_channel", &self.ingress_channel),
            ("even_channel", &self.even_channel),
            ("odd_channel", &self.odd_channel),
            ("sequential_target", &self.sequential_target),
            ("gateway_target", &self.gateway_target),
        ] {
            if !CHANNEL_NAME.is_match(name) {
                return Err(ConfigError::InvalidChannelName {
                    field,
                    name: name.clone(),
                });
            }
        }
        let routing = [
            ("ingress_channel", &self.ingress_channel),
            ("even_channel", &self.even_channel),
            ("odd_channel", &self.odd_channel),
        ];
        for (i, (a, left)) in routing.iter().enumerate() {
            if let Some((b, _)) = routing[i + 1..].iter().find(|(_, right)| right == left) {
                return Err(ConfigError::AliasedChannels { a: *a, b: *b });
            }
        }
        if self.sequential_period_ms == 0 {
            return Err(ConfigError::ZeroPeriod {
                field: "sequential_period_ms",
            });
        }
        if self.gateway_period_ms == 0 {
            return Err(ConfigError::ZeroPeriod {
                field: "gateway_period_ms",
            });
        }
        if self.gateway_bound <= 0 {
            return Err(ConfigError::InvalidGatewayBound(self.gateway_bound));
        }
        Ok(())
    }

    #[must_use]
    pub fn sequential_period(&self) -> Duration {
        Duration::from_millis(self.sequential_period_ms)
    }

    #[must_use]
    pub fn gateway_period(&self) -> Duration {
        Duration::from_millis(self.gateway_period_ms)
    }

    #[must_use]
    pub fn shutdown_drain(&self) -> Duration {
        Duration::from_millis(self.shutdown_drain_ms)
    }

    /// Producer targets that are not the router's input.
    #[must_use]
    pub fn targets_bypassing_router(&self) -> Vec<(&'static str, &str)> {
        [
            ("sequential_target", self.sequential_target.as_str()),
            ("gateway_target", self.gateway_target.as_str()),
        ]
        .into_iter()
        .filter(|(_, target)| *target != self.ingress_channel)
        .collect()
    }
}
