use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};
use thiserror::Error;

pub const PROJECT: &str = "mqtt";

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("configuration file {path} is missing")]
    Missing {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
    #[error("configuration file {path} is invalid")]
    Parse {
        path: PathBuf,
        #[source]
        source: serde_yaml::Error,
    },
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MqttSection {
    pub uid: String,
    pub host: String,
    pub port: u16,
    /// Seconds between telemetry cycles; zero runs a single cycle.
    pub duration: u64,
    pub verbose: bool,
    #[serde(default = "default_client_id")]
    pub client_id: String,
    #[serde(default = "default_retry_interval_ms")]
    pub retry_interval_ms: u64,
    #[serde(default)]
    pub max_connect_attempts: Option<u32>,
    #[serde(default = "default_keep_alive_secs")]
    pub keep_alive_secs: u64,
    #[serde(default)]
    pub single_shot_dispatch: bool,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RedisSection {
    pub host: String,
    pub port: u16,
    pub vaultdb: i64,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct BridgeConfig {
    pub mqtt: MqttSection,
    pub redis: RedisSection,
}

fn default_client_id() -> String {
    PROJECT.to_string()
}

fn default_retry_interval_ms() -> u64 {
    1_000
}

fn default_keep_alive_secs() -> u64 {
    60
}

/// Any command-line argument selects the `.local` variant.
pub fn config_file_name(project: &str, arg_count: usize) -> String {
    if arg_count > 1 {
        format!("{project}.conf.local")
    } else {
        format!("{project}.conf")
    }
}

impl BridgeConfig {
    pub fn load(path: impl AsRef<Path>) -> Result<Self, ConfigError> {
        let path = path.as_ref();
        let raw = std::fs::read_to_string(path).map_err(|source| ConfigError::Missing {
            path: path.to_path_buf(),
            source,
        })?;

        let mut config =
            serde_yaml::from_str::<Self>(&raw).map_err(|source| ConfigError::Parse {
                path: path.to_path_buf(),
                source,
            })?;
        config.mqtt.sanitize();
        Ok(config)
    }
}

impl MqttSection {
    pub fn sanitize(&mut self) {
        if self.client_id.trim().is_empty() {
            self.client_id = default_client_id();
        }
        if self.retry_interval_ms == 0 {
            self.retry_interval_ms = default_retry_interval_ms();
        }
        self.keep_alive_secs = self.keep_alive_secs.clamp(5, 3_600);
    }
}

#[cfg(test)]
mod tests {
    use std::io::Write;

    use pretty_assertions::assert_eq;

    use super::*;

    const SAMPLE: &str = "\
mqtt:
  uid: m5stick01ae
  host: 192.168.1.20
  port: 1883
  duration: 30
  verbose: true
redis:
  host: 127.0.0.1
  port: 6379
  vaultdb: 3
";

    fn write_config(contents: &str) -> tempfile::NamedTempFile {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        file.write_all(contents.as_bytes()).unwrap();
        file
    }

    #[test]
    fn picks_local_variant_when_arguments_present() {
        assert_eq!(config_file_name(PROJECT, 1), "mqtt.conf");
        assert_eq!(config_file_name(PROJECT, 2), "mqtt.conf.local");
        assert_eq!(config_file_name(PROJECT, 5), "mqtt.conf.local");
    }

    #[test]
    fn loads_sections_verbatim() {
        let file = write_config(SAMPLE);
        let config = BridgeConfig::load(file.path()).unwrap();

        assert_eq!(
            config.mqtt,
            MqttSection {
                uid: "m5stick01ae".to_string(),
                host: "192.168.1.20".to_string(),
                port: 1883,
                duration: 30,
                verbose: true,
                client_id: "mqtt".to_string(),
                retry_interval_ms: 1_000,
                max_connect_attempts: None,
                keep_alive_secs: 60,
                single_shot_dispatch: false,
            }
        );
        assert_eq!(
            config.redis,
            RedisSection {
                host: "127.0.0.1".to_string(),
                port: 6379,
                vaultdb: 3,
            }
        );
    }

    #[test]
    fn honours_optional_overrides() {
        let contents = SAMPLE.replace(
            "  verbose: true\n",
            "  verbose: false\n  client_id: gateway\n  retry_interval_ms: 250\n  max_connect_attempts: 4\n  single_shot_dispatch: true\n",
        );
        let file = write_config(&contents);
        let config = BridgeConfig::load(file.path()).unwrap();

        assert!(!config.mqtt.verbose);
        assert_eq!(config.mqtt.client_id, "gateway");
        assert_eq!(config.mqtt.retry_interval_ms, 250);
        assert_eq!(config.mqtt.max_connect_attempts, Some(4));
        assert!(config.mqtt.single_shot_dispatch);
    }

    #[test]
    fn missing_file_is_reported() {
        let dir = tempfile::tempdir().unwrap();
        let err = BridgeConfig::load(dir.path().join("mqtt.conf")).unwrap_err();
        assert!(matches!(err, ConfigError::Missing { .. }));
    }

    #[test]
    fn missing_section_is_a_parse_error() {
        let file = write_config("mqtt:\n  uid: x\n");
        let err = BridgeConfig::load(file.path()).unwrap_err();
        assert!(matches!(err, ConfigError::Parse { .. }));
    }

    #[test]
    fn sanitize_restores_defaults() {
        let mut section = MqttSection {
            uid: "x".to_string(),
            host: "h".to_string(),
            port: 1883,
            duration: 0,
            verbose: false,
            client_id: " ".to_string(),
            retry_interval_ms: 0,
            max_connect_attempts: None,
            keep_alive_secs: 1,
            single_shot_dispatch: false,
        };
        section.sanitize();

        assert_eq!(section.client_id, "mqtt");
        assert_eq!(section.retry_interval_ms, 1_000);
        assert_eq!(section.keep_alive_secs, 5);
    }
}
