//! # Configuration Management Module
//!
//! Bridge configuration lives in a TOML file, organized into sections:
//!
//! - [`BridgeSection`] - inbound identity and listen endpoint
//! - [`UpstreamSection`] - the default destination service (the BBS)
//! - [`LimitsSection`] - concurrency ceiling and connect timeout
//! - [`LoggingSection`] - log level and optional log file
//!
//! ## Usage
//!
//! ```rust,no_run
//! use axbridge::config::Config;
//!
//! #[tokio::main]
//! async fn main() -> anyhow::Result<()> {
//!     let config = Config::load("config.toml").await?;
//!     println!("Callsign: {}", config.bridge.callsign);
//!     println!("Upstream: {}:{}", config.upstream.host, config.upstream.port);
//!     Ok(())
//! }
//! ```
//!
//! ## Configuration File Format
//!
//! ```toml
//! [bridge]
//! callsign = "N0CALL"
//! listen = "0.0.0.0:8010"
//!
//! [upstream]
//! host = "bbs.local.mesh"
//! port = 23
//!
//! [limits]
//! max_sessions = 10
//! connect_timeout_secs = 30
//!
//! [logging]
//! level = "info"
//! ```
//!
//! CLI arguments override the file: `axbridge start --listen ADDR` wins over
//! `[bridge].listen`.

use anyhow::{anyhow, Result};
use serde::{Deserialize, Serialize};
use tokio::fs;

/// Main configuration structure.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Config {
    pub bridge: BridgeSection,
    pub upstream: UpstreamSection,
    #[serde(default)]
    pub limits: LimitsSection,
    pub logging: LoggingSection,
}

/// Inbound identity: the operator's callsign and the listen endpoint the
/// packet transport hands us connections on.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct BridgeSection {
    /// Station callsign, stored uppercase. Purely presentational to the
    /// core; the transport binding owns the actual over-the-air addressing.
    pub callsign: String,
    /// Listen endpoint for the transport binding (host:port).
    pub listen: String,
}

/// The default destination service offered as option 1 / `BBS`.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct UpstreamSection {
    pub host: String,
    #[serde(default = "default_upstream_port")]
    pub port: u16,
}

fn default_upstream_port() -> u16 {
    23
}

/// Concurrency and timeout limits.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LimitsSection {
    /// Maximum simultaneous sessions; callers past this are refused before
    /// the menu.
    #[serde(default = "default_max_sessions")]
    pub max_sessions: u32,
    /// Outbound connect timeout in seconds (resolution + dial).
    #[serde(default = "default_connect_timeout")]
    pub connect_timeout_secs: u64,
}

fn default_max_sessions() -> u32 {
    10
}

fn default_connect_timeout() -> u64 {
    30
}

impl Default for LimitsSection {
    fn default() -> Self {
        Self {
            max_sessions: default_max_sessions(),
            connect_timeout_secs: default_connect_timeout(),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LoggingSection {
    pub level: String,
    pub file: Option<String>,
}

impl Config {
    /// Load configuration from a file
    pub async fn load(path: &str) -> Result<Self> {
        let content = fs::read_to_string(path)
            .await
            .map_err(|e| anyhow!("Failed to read config file {}: {}", path, e))?;

        let config: Config = toml::from_str(&content)
            .map_err(|e| anyhow!("Failed to parse config file {}: {}", path, e))?;

        config.validate()?;
        Ok(config)
    }

    /// Create a default configuration file
    pub async fn create_default(path: &str) -> Result<()> {
        let config = Config::default();
        let content = toml::to_string_pretty(&config)
            .map_err(|e| anyhow!("Failed to serialize default config: {}", e))?;

        fs::write(path, content)
            .await
            .map_err(|e| anyhow!("Failed to write config file {}: {}", path, e))?;

        Ok(())
    }

    /// Sanity-check values that serde's types alone cannot enforce.
    pub fn validate(&self) -> Result<()> {
        if self.bridge.callsign.trim().is_empty() {
            return Err(anyhow!("bridge.callsign must not be empty"));
        }
        if self.upstream.host.trim().is_empty() {
            return Err(anyhow!("upstream.host must not be empty"));
        }
        if self.upstream.port == 0 {
            return Err(anyhow!("upstream.port must be 1-65535"));
        }
        if self.limits.max_sessions == 0 {
            return Err(anyhow!("limits.max_sessions must be at least 1"));
        }
        Ok(())
    }
}

impl Default for Config {
    fn default() -> Self {
        Config {
            bridge: BridgeSection {
                callsign: "N0CALL".to_string(),
                listen: "0.0.0.0:8010".to_string(),
            },
            upstream: UpstreamSection {
                host: "bbs.local.mesh".to_string(),
                port: 23,
            },
            limits: LimitsSection::default(),
            logging: LoggingSection {
                level: "info".to_string(),
                file: None,
            },
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults_match_reference_bridge() {
        let cfg = Config::default();
        assert_eq!(cfg.upstream.host, "bbs.local.mesh");
        assert_eq!(cfg.upstream.port, 23);
        assert_eq!(cfg.limits.max_sessions, 10);
        assert_eq!(cfg.limits.connect_timeout_secs, 30);
        assert!(cfg.validate().is_ok());
    }

    #[test]
    fn minimal_file_gets_section_defaults() {
        let cfg: Config = toml::from_str(
            r#"
            [bridge]
            callsign = "K7ABC"
            listen = "127.0.0.1:8010"

            [upstream]
            host = "bbs.example.net"

            [logging]
            level = "debug"
            "#,
        )
        .unwrap();
        assert_eq!(cfg.upstream.port, 23);
        assert_eq!(cfg.limits.max_sessions, 10);
        assert_eq!(cfg.limits.connect_timeout_secs, 30);
    }

    #[test]
    fn validation_rejects_zero_limits() {
        let mut cfg = Config::default();
        cfg.limits.max_sessions = 0;
        assert!(cfg.validate().is_err());

        let mut cfg = Config::default();
        cfg.upstream.port = 0;
        assert!(cfg.validate().is_err());

        let mut cfg = Config::default();
        cfg.bridge.callsign = "  ".to_string();
        assert!(cfg.validate().is_err());
    }

    #[tokio::test]
    async fn round_trips_through_file() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("config.toml");
        let path = path.to_str().unwrap();

        Config::create_default(path).await.unwrap();
        let loaded = Config::load(path).await.unwrap();
        assert_eq!(loaded.bridge.callsign, "N0CALL");
        assert_eq!(loaded.upstream.port, 23);
    }
}
