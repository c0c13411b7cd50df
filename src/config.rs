//! Configuration management for the pose broadcast server
//!
//! Values come from an optional `config.toml`, overridden by
//! `POSE_BROADCAST__<FIELD>` environment variables. Every field has a default.

use config::{Config, ConfigBuilder, Environment, File, FileFormat, builder::DefaultState};
use serde::Deserialize;
use std::collections::HashSet;
use std::net::SocketAddr;
use std::time::Duration;

use crate::pose::{JointSpec, default_joints};

/// Complete server configuration
#[derive(Debug, Deserialize, Clone)]
#[serde(default)]
pub struct ServerConfig {
    // ═══ NETWORK ═══
    /// IP address to bind the WebSocket listener
    pub bind_address: String,

    /// Listener port (0 picks an ephemeral port)
    pub port: u16,

    /// Maximum concurrent viewers
    pub max_clients: usize,

    /// Time allowed for a viewer to complete the WebSocket handshake
    pub handshake_timeout_secs: u64,

    /// Time allowed for a closing connection to flush its close frame
    pub close_timeout_ms: u64,

    // ═══ BROADCAST ═══
    /// Broadcast period in milliseconds (50 ms = 20 Hz)
    pub tick_interval_ms: u64,

    /// Frames buffered per viewer before sends start failing
    pub outbound_queue_capacity: usize,

    /// Consecutive failed sends after which a viewer is dropped
    pub max_consecutive_send_failures: u32,

    // ═══ POSE SOURCE ═══
    /// Fixed seed for reproducible samples
    pub seed: Option<u64>,

    /// Published joints and their sampling ranges
    pub joints: Vec<JointSpec>,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            bind_address: "127.0.0.1".to_string(),
            port: 9090,
            max_clients: 32,
            handshake_timeout_secs: 5,
            close_timeout_ms: 1000,
            tick_interval_ms: 50,
            outbound_queue_capacity: 16,
            max_consecutive_send_failures: 20,
            seed: None,
            joints: default_joints(),
        }
    }
}

impl ServerConfig {
    /// Load configuration from config.toml with environment overrides
    pub fn load() -> Result<Self, config::ConfigError> {
        // Packaged layout first, then the working directory
        let builder = Config::builder()
            .add_source(File::with_name("pose-broadcast/config").required(false))
            .add_source(File::with_name("config").required(false));
        Self::from_builder(builder)
    }

    /// Load configuration from TOML text with environment overrides
    pub fn from_toml_str(toml: &str) -> Result<Self, config::ConfigError> {
        Self::from_builder(Config::builder().add_source(File::from_str(toml, FileFormat::Toml)))
    }

    fn from_builder(builder: ConfigBuilder<DefaultState>) -> Result<Self, config::ConfigError> {
        let settings = builder
            .add_source(
                Environment::with_prefix("POSE_BROADCAST")
                    .separator("__")
                    .try_parsing(true),
            )
            .build()?;
        let config: ServerConfig = settings.try_deserialize()?;
        config.validate()?;
        Ok(config)
    }

    /// Validation for all configuration values
    pub fn validate(&self) -> Result<(), config::ConfigError> {
        self.socket_addr()?;

        if self.tick_interval_ms == 0 {
            return Err(config::ConfigError::Message(
                "tick_interval_ms must be greater than 0".into(),
            ));
        }

        if self.handshake_timeout_secs == 0 {
            return Err(config::ConfigError::Message(
                "handshake_timeout_secs must be greater than 0".into(),
            ));
        }

        if self.close_timeout_ms == 0 {
            return Err(config::ConfigError::Message(
                "close_timeout_ms must be greater than 0".into(),
            ));
        }

        if self.max_clients == 0 {
            return Err(config::ConfigError::Message(
                "max_clients must be greater than 0".into(),
            ));
        }

        if self.outbound_queue_capacity == 0 {
            return Err(config::ConfigError::Message(
                "outbound_queue_capacity must be greater than 0".into(),
            ));
        }

        if self.max_consecutive_send_failures == 0 {
            return Err(config::ConfigError::Message(
                "max_consecutive_send_failures must be greater than 0".into(),
            ));
        }

        if self.joints.is_empty() {
            return Err(config::ConfigError::Message(
                "at least one joint must be configured".into(),
            ));
        }

        let mut seen = HashSet::new();
        for joint in &self.joints {
            if joint.name.trim().is_empty() {
                return Err(config::ConfigError::Message(
                    "joint names cannot be empty".into(),
                ));
            }
            if !seen.insert(joint.name.as_str()) {
                return Err(config::ConfigError::Message(format!(
                    "joint {} is configured twice",
                    joint.name
                )));
            }
            if !joint.min.is_finite() || !joint.max.is_finite() || joint.min > joint.max {
                return Err(config::ConfigError::Message(format!(
                    "joint {} has invalid range [{}, {}]",
                    joint.name, joint.min, joint.max
                )));
            }
        }

        Ok(())
    }

    /// Get bind address and port as socket address
    pub fn socket_addr(&self) -> Result<SocketAddr, config::ConfigError> {
        format!("{}:{}", self.bind_address, self.port)
            .parse()
            .map_err(|e| {
                config::ConfigError::Message(format!(
                    "invalid bind address {}: {}",
                    self.bind_address, e
                ))
            })
    }

    /// Get broadcast period as Duration
    pub fn tick_interval(&self) -> Duration {
        Duration::from_millis(self.tick_interval_ms)
    }

    /// Get handshake timeout as Duration
    pub fn handshake_timeout(&self) -> Duration {
        Duration::from_secs(self.handshake_timeout_secs)
    }

    /// Get close-frame grace period as Duration
    pub fn close_timeout(&self) -> Duration {
        Duration::from_millis(self.close_timeout_ms)
    }
}
