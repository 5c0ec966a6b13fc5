use serde::{Deserialize, Serialize};
use std::path::PathBuf;

use crate::error::{FilemeshError, FilemeshResult};

/// Top-level configuration for both the tracker and the peer binaries.
///
/// Loaded from a JSON file (per `spec.md` §6) with environment variable overrides for the
/// tracker address, matching `original_source/utils/config.py`'s `tracker_ip`/`tracker_port`
/// handling.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Config {
    pub tracker: TrackerConfig,
    pub peer: PeerConfig,
    pub persistence: PersistenceConfig,
    pub logging: LoggingConfig,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TrackerConfig {
    pub host: String,
    pub port: u16,
    /// Listen backlog; `spec.md` §6 specifies 15.
    pub max_connections: u32,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PeerConfig {
    pub shared_dir: PathBuf,
    pub downloads_dir: PathBuf,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PersistenceConfig {
    pub snapshot_path: PathBuf,
    pub seed_path: Option<PathBuf>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LoggingConfig {
    pub level: String,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            tracker: TrackerConfig {
                host: "127.0.0.1".to_string(),
                port: 9000,
                max_connections: 15,
            },
            peer: PeerConfig {
                shared_dir: PathBuf::from("shared"),
                downloads_dir: PathBuf::from("downloads"),
            },
            persistence: PersistenceConfig {
                snapshot_path: default_snapshot_path(),
                seed_path: None,
            },
            logging: LoggingConfig {
                level: "info".to_string(),
            },
        }
    }
}

fn default_snapshot_path() -> PathBuf {
    let config_dir = dirs::config_dir()
        .or_else(|| dirs::home_dir().map(|h| h.join(".config")))
        .unwrap_or_else(|| PathBuf::from("."));
    config_dir.join("filemesh").join("tracker_snapshot.json")
}

impl Config {
    /// Load configuration from `config_path` if present, falling back to defaults; then apply
    /// environment variable overrides for the tracker address.
    pub fn load_or_default(config_path: Option<PathBuf>) -> FilemeshResult<Self> {
        let mut config = if let Some(path) = config_path.filter(|p| p.exists()) {
            let raw = std::fs::read_to_string(&path)?;
            let config: Config = serde_json::from_str(&raw)
                .map_err(|e| FilemeshError::Config(format!("config parse error: {}", e)))?;
            tracing::info!("Loaded configuration from {:?}", path);
            config
        } else {
            tracing::info!("Using default configuration");
            Config::default()
        };

        if let Ok(host) = std::env::var("FILEMESH_TRACKER_HOST") {
            config.tracker.host = host;
        }
        if let Ok(port) = std::env::var("FILEMESH_TRACKER_PORT") {
            config.tracker.port = port
                .parse()
                .map_err(|_| FilemeshError::Config("FILEMESH_TRACKER_PORT is not a valid port".into()))?;
        }

        Ok(config)
    }

    /// Save configuration to `config_path` as pretty-printed JSON.
    pub fn save(&self, config_path: &PathBuf) -> FilemeshResult<()> {
        let rendered = serde_json::to_string_pretty(self)
            .map_err(|e| FilemeshError::Config(format!("config serialize error: {}", e)))?;

        if let Some(parent) = config_path.parent() {
            std::fs::create_dir_all(parent)?;
        }

        std::fs::write(config_path, rendered)?;
        tracing::info!("Configuration saved to {:?}", config_path);
        Ok(())
    }

    pub fn tracker_addr(&self) -> String {
        format!("{}:{}", self.tracker.host, self.tracker.port)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn default_tracker_address_matches_spec() {
        let config = Config::default();
        assert_eq!(config.tracker_addr(), "127.0.0.1:9000");
        assert_eq!(config.tracker.max_connections, 15);
    }

    #[test]
    fn round_trips_through_json() {
        let config = Config::default();
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("config.json");
        config.save(&path).unwrap();
        let loaded = Config::load_or_default(Some(path)).unwrap();
        assert_eq!(loaded.tracker.port, config.tracker.port);
    }
}
