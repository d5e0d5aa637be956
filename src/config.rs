//! Connection configuration persistence.
//!
//! The configuration is stored as a single JSON blob on disk. It is read
//! once at startup and written back on explicit save; an absent or corrupt
//! file falls back to the documented defaults without failing startup.

use std::fs;
use std::path::Path;

use anyhow::Result;
use serde::{Deserialize, Serialize};
use tracing::{info, warn};

/// Default broker endpoint (public EMQX websocket listener).
pub const DEFAULT_BROKER_URL: &str = "ws://broker.emqx.io:8083/mqtt";

/// Fallback broker attempted once after an authorization failure on the
/// default broker (public HiveMQ websocket listener).
pub const FALLBACK_BROKER_URL: &str = "ws://broker.hivemq.com:8000/mqtt";

/// Settings for one logical broker connection.
///
/// Field names serialize in camelCase to stay compatible with the blob
/// format used by earlier versions of the dashboard.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct ConnectionConfig {
    /// Broker URL (`ws://host:port/path` or `tcp://host:port`).
    pub broker_url: String,
    /// Client identifier; a random one is derived when left empty.
    pub client_id: String,
    pub username: String,
    pub password: String,
    /// Topic subscribed to right after connecting (empty = none).
    pub subscribe_topic: String,
    /// Topic control messages are published to.
    pub publish_topic: String,
    /// Heartbeat publish interval in seconds.
    pub heartbeat_interval: u64,
    /// Topic the heartbeat message is published to.
    pub heartbeat_topic: String,
}

impl Default for ConnectionConfig {
    fn default() -> Self {
        Self {
            broker_url: DEFAULT_BROKER_URL.to_string(),
            client_id: String::new(),
            username: String::new(),
            password: String::new(),
            subscribe_topic: "device/data".to_string(),
            publish_topic: "device/control".to_string(),
            heartbeat_interval: 30,
            heartbeat_topic: "device/heartbeat".to_string(),
        }
    }
}

impl ConnectionConfig {
    /// Load the configuration from `path`.
    ///
    /// Missing or unparseable files yield the defaults; this never fails.
    pub fn load<P: AsRef<Path>>(path: P) -> Self {
        let path = path.as_ref();
        match fs::read_to_string(path) {
            Ok(content) => match serde_json::from_str(&content) {
                Ok(config) => {
                    info!("loaded config from {}", path.display());
                    config
                }
                Err(e) => {
                    warn!("config at {} is corrupt ({}), using defaults", path.display(), e);
                    Self::default()
                }
            },
            Err(_) => Self::default(),
        }
    }

    /// Write the configuration to `path` as pretty-printed JSON.
    pub fn save<P: AsRef<Path>>(&self, path: P) -> Result<()> {
        let json = serde_json::to_string_pretty(self)?;
        fs::write(path.as_ref(), json)?;
        info!("saved config to {}", path.as_ref().display());
        Ok(())
    }

    /// Remove the persisted blob so the next load yields defaults.
    pub fn reset<P: AsRef<Path>>(path: P) -> Self {
        let _ = fs::remove_file(path.as_ref());
        Self::default()
    }

    /// Generate a random client id in the `mqttwatch-xxxxxxxx` form.
    pub fn random_client_id() -> String {
        let id = uuid::Uuid::new_v4().simple().to_string();
        format!("mqttwatch-{}", &id[..8])
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;
    use tempfile::NamedTempFile;

    #[test]
    fn test_defaults() {
        let config = ConnectionConfig::default();
        assert_eq!(config.broker_url, DEFAULT_BROKER_URL);
        assert_eq!(config.subscribe_topic, "device/data");
        assert_eq!(config.publish_topic, "device/control");
        assert_eq!(config.heartbeat_topic, "device/heartbeat");
        assert_eq!(config.heartbeat_interval, 30);
        assert!(config.client_id.is_empty());
    }

    #[test]
    fn test_save_load_round_trip() {
        let file = NamedTempFile::new().unwrap();
        let mut config = ConnectionConfig::default();
        config.broker_url = "tcp://localhost:1883".to_string();
        config.client_id = "round-trip".to_string();
        config.heartbeat_interval = 10;

        config.save(file.path()).unwrap();
        let loaded = ConnectionConfig::load(file.path());
        assert_eq!(loaded, config);

        // Saving what was just loaded must be a no-op.
        loaded.save(file.path()).unwrap();
        assert_eq!(ConnectionConfig::load(file.path()), loaded);
    }

    #[test]
    fn test_load_missing_file_yields_defaults() {
        let config = ConnectionConfig::load("/nonexistent/path/mqttwatch.json");
        assert_eq!(config, ConnectionConfig::default());
    }

    #[test]
    fn test_load_corrupt_file_yields_defaults() {
        let mut file = NamedTempFile::new().unwrap();
        writeln!(file, "not valid json").unwrap();
        let config = ConnectionConfig::load(file.path());
        assert_eq!(config, ConnectionConfig::default());
    }

    #[test]
    fn test_camel_case_blob_format() {
        let json = r#"{
            "brokerUrl": "ws://example:8083/mqtt",
            "subscribeTopic": "sensors/+",
            "heartbeatInterval": 15
        }"#;
        let config: ConnectionConfig = serde_json::from_str(json).unwrap();
        assert_eq!(config.broker_url, "ws://example:8083/mqtt");
        assert_eq!(config.subscribe_topic, "sensors/+");
        assert_eq!(config.heartbeat_interval, 15);
        // Unspecified fields take defaults.
        assert_eq!(config.publish_topic, "device/control");
    }

    #[test]
    fn test_reset_removes_blob() {
        let file = NamedTempFile::new().unwrap();
        let mut config = ConnectionConfig::default();
        config.client_id = "to-be-reset".to_string();
        config.save(file.path()).unwrap();

        let reset = ConnectionConfig::reset(file.path());
        assert_eq!(reset, ConnectionConfig::default());
        assert_eq!(ConnectionConfig::load(file.path()), ConnectionConfig::default());
    }

    #[test]
    fn test_random_client_id_shape() {
        let id = ConnectionConfig::random_client_id();
        assert!(id.starts_with("mqttwatch-"));
        assert_eq!(id.len(), "mqttwatch-".len() + 8);
        assert_ne!(id, ConnectionConfig::random_client_id());
    }
}
