//! Configuration system for Fano.
//!
//! Resolution order: environment variables → config file → defaults.
//!
//! Config file location:
//!   1. $FANO_CONFIG (explicit override)
//!   2. $XDG_CONFIG_HOME/fano/config.toml
//!   3. ~/.config/fano/config.toml

use serde::{Deserialize, Serialize};
use std::path::PathBuf;

/// Top-level configuration.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct FanoConfig {
    pub network: NetworkConfig,
    pub canon: CanonConfig,
    pub hub: HubConfig,
    pub packet: PacketConfig,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct NetworkConfig {
    /// Address the HTTP control surface binds to.
    pub bind_addr: String,
    /// Port for the HTTP API, WebSocket and SSE endpoints.
    pub api_port: u16,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct CanonConfig {
    /// NDJSON manifest loaded at startup.
    pub manifest_path: PathBuf,
    /// NDJSON asset list served verbatim at `/api/assets`.
    pub assets_path: PathBuf,
    /// How often the timing loop wakes up. Ticks still fire at most once per 100 ms.
    pub poll_ms: u64,
    /// Playback speed at startup.
    pub default_speed: f32,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct HubConfig {
    /// Subscribers allowed per transport. 0 = unlimited.
    pub max_subscribers: usize,
    /// Frames buffered per subscriber before new frames are dropped.
    pub queue_depth: usize,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct PacketConfig {
    /// Source id stamped on packets this daemon encodes.
    pub source_id: u16,
}

// ── Defaults ──────────────────────────────────────────────────────────────────

impl Default for NetworkConfig {
    fn default() -> Self {
        Self {
            bind_addr: "127.0.0.1".to_string(),
            api_port: 8080,
        }
    }
}

impl Default for CanonConfig {
    fn default() -> Self {
        Self {
            manifest_path: PathBuf::from("canon-manifest.ndjson"),
            assets_path: PathBuf::from("canon-assets.ndjson"),
            poll_ms: 10,
            default_speed: 1.0,
        }
    }
}

impl Default for HubConfig {
    fn default() -> Self {
        Self {
            max_subscribers: 1000,
            queue_depth: 32,
        }
    }
}

impl Default for PacketConfig {
    fn default() -> Self {
        Self { source_id: 1 }
    }
}

impl HubConfig {
    /// Capacity as the hub wants it: `None` means unbounded.
    pub fn capacity(&self) -> Option<usize> {
        (self.max_subscribers > 0).then_some(self.max_subscribers)
    }
}

// ── Path helpers ──────────────────────────────────────────────────────────────

fn config_dir() -> PathBuf {
    std::env::var("XDG_CONFIG_HOME")
        .map(PathBuf::from)
        .unwrap_or_else(|_| dirs_or_home().join(".config"))
        .join("fano")
}

fn dirs_or_home() -> PathBuf {
    std::env::var("HOME")
        .map(PathBuf::from)
        .unwrap_or_else(|_| PathBuf::from("/tmp"))
}

// ── Errors ────────────────────────────────────────────────────────────────────

#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("failed to read {0}: {1}")]
    ReadFailed(PathBuf, std::io::Error),
    #[error("failed to parse {0}: {1}")]
    ParseFailed(PathBuf, toml::de::Error),
    #[error("failed to write {0}: {1}")]
    WriteFailed(PathBuf, std::io::Error),
    #[error("failed to serialize: {0}")]
    SerializeFailed(toml::ser::Error),
}

// ── Loading ───────────────────────────────────────────────────────────────────

impl FanoConfig {
    /// Load config: env vars → file → defaults.
    pub fn load() -> Result<Self, ConfigError> {
        let path = Self::file_path();
        let mut config = if path.exists() {
            let text = std::fs::read_to_string(&path)
                .map_err(|e| ConfigError::ReadFailed(path.clone(), e))?;
            toml::from_str(&text).map_err(|e| ConfigError::ParseFailed(path.clone(), e))?
        } else {
            FanoConfig::default()
        };
        config.apply_env_overrides(|key| std::env::var(key).ok());
        Ok(config)
    }

    /// Config file path.
    pub fn file_path() -> PathBuf {
        std::env::var("FANO_CONFIG")
            .map(PathBuf::from)
            .unwrap_or_else(|_| config_dir().join("config.toml"))
    }

    /// Write default config if none exists. Returns the path.
    pub fn write_default_if_missing() -> Result<PathBuf, ConfigError> {
        let path = Self::file_path();
        if !path.exists() {
            if let Some(parent) = path.parent() {
                std::fs::create_dir_all(parent)
                    .map_err(|e| ConfigError::WriteFailed(path.clone(), e))?;
            }
            let text = toml::to_string_pretty(&FanoConfig::default())
                .map_err(ConfigError::SerializeFailed)?;
            std::fs::write(&path, text).map_err(|e| ConfigError::WriteFailed(path.clone(), e))?;
        }
        Ok(path)
    }

    /// Apply FANO_* overrides. Unparseable values are ignored.
    fn apply_env_overrides(&mut self, var: impl Fn(&str) -> Option<String>) {
        if let Some(v) = var("FANO_NETWORK__BIND_ADDR") {
            self.network.bind_addr = v;
        }
        if let Some(p) = var("FANO_NETWORK__API_PORT").and_then(|v| v.parse().ok()) {
            self.network.api_port = p;
        }
        if let Some(v) = var("FANO_CANON__MANIFEST_PATH") {
            self.canon.manifest_path = PathBuf::from(v);
        }
        if let Some(v) = var("FANO_CANON__ASSETS_PATH") {
            self.canon.assets_path = PathBuf::from(v);
        }
        if let Some(ms) = var("FANO_CANON__POLL_MS").and_then(|v| v.parse().ok()) {
            self.canon.poll_ms = ms;
        }
        if let Some(n) = var("FANO_HUB__MAX_SUBSCRIBERS").and_then(|v| v.parse().ok()) {
            self.hub.max_subscribers = n;
        }
        if let Some(id) = var("FANO_PACKET__SOURCE_ID").and_then(|v| v.parse().ok()) {
            self.packet.source_id = id;
        }
    }
}
