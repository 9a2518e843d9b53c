//! Client and relay configuration.
//!
//! Both configs have defaults matching the relay contract and can be
//! overlaid from `MDSHARE_*` environment variables.

use std::time::Duration;

use serde::Deserialize;

/// Reconnection backoff policy.
///
/// Attempts are unlimited: a dropped connection is retried forever.
#[derive(Debug, Clone, PartialEq)]
pub struct ReconnectPolicy {
    /// Delay before the first retry
    pub initial_delay: Duration,
    /// Ceiling the delay grows to and then holds
    pub max_delay: Duration,
    /// Growth factor applied per failed attempt
    pub factor: u32,
}

impl Default for ReconnectPolicy {
    fn default() -> Self {
        Self {
            initial_delay: Duration::from_millis(1000),
            max_delay: Duration::from_millis(5000),
            factor: 2,
        }
    }
}

/// Client configuration.
#[derive(Debug, Clone)]
pub struct SyncConfig {
    /// WebSocket URL of the relay
    pub relay_url: String,
    /// Transport reconnection policy
    pub reconnect: ReconnectPolicy,
    /// Settle time before saved scroll positions are reapplied after a reconnect
    pub restore_delay: Duration,
    /// How long scroll events are ignored after a programmatic scroll write
    pub suppress_cooldown: Duration,
    /// Delay before the editor takes focus after joining
    pub focus_delay: Duration,
    /// Outgoing message buffer (messages)
    pub outgoing_capacity: usize,
}

impl Default for SyncConfig {
    fn default() -> Self {
        Self {
            relay_url: "ws://127.0.0.1:3001".to_string(),
            reconnect: ReconnectPolicy::default(),
            restore_delay: Duration::from_millis(500),
            suppress_cooldown: Duration::from_millis(10),
            focus_delay: Duration::from_millis(50),
            outgoing_capacity: 256,
        }
    }
}

#[derive(Debug, Default, Deserialize)]
struct ClientEnv {
    relay_url: Option<String>,
    reconnect_initial_ms: Option<u64>,
    reconnect_max_ms: Option<u64>,
    restore_delay_ms: Option<u64>,
    suppress_cooldown_ms: Option<u64>,
}

impl SyncConfig {
    /// Defaults overlaid with `MDSHARE_*` environment variables.
    pub fn from_env() -> Result<Self, ConfigError> {
        let env: ClientEnv = envy::prefixed("MDSHARE_").from_env()?;
        Ok(Self::default().with_overrides(env))
    }

    fn with_overrides(mut self, env: ClientEnv) -> Self {
        if let Some(url) = env.relay_url {
            self.relay_url = url;
        }
        if let Some(ms) = env.reconnect_initial_ms {
            self.reconnect.initial_delay = Duration::from_millis(ms);
        }
        if let Some(ms) = env.reconnect_max_ms {
            self.reconnect.max_delay = Duration::from_millis(ms);
        }
        if let Some(ms) = env.restore_delay_ms {
            self.restore_delay = Duration::from_millis(ms);
        }
        if let Some(ms) = env.suppress_cooldown_ms {
            self.suppress_cooldown = Duration::from_millis(ms);
        }
        self
    }
}

/// Reference relay configuration.
#[derive(Debug, Clone)]
pub struct RelayConfig {
    /// Address to bind to
    pub bind_addr: String,
    /// Broadcast channel capacity for the room
    pub broadcast_capacity: usize,
}

impl Default for RelayConfig {
    fn default() -> Self {
        Self {
            bind_addr: "127.0.0.1:3001".to_string(),
            broadcast_capacity: 256,
        }
    }
}

#[derive(Debug, Default, Deserialize)]
struct RelayEnv {
    bind_addr: Option<String>,
    broadcast_capacity: Option<usize>,
}

impl RelayConfig {
    pub fn from_env() -> Result<Self, ConfigError> {
        let env: RelayEnv = envy::prefixed("MDSHARE_").from_env()?;
        let defaults = Self::default();
        Ok(Self {
            bind_addr: env.bind_addr.unwrap_or(defaults.bind_addr),
            broadcast_capacity: env
                .broadcast_capacity
                .unwrap_or(defaults.broadcast_capacity),
        })
    }
}

#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("Invalid environment configuration: {0}")]
    Env(#[from] envy::Error),
}
