//! Service configuration.
//!
//! One struct with explicit defaults, layered precedence (defaults <
//! TOML file < environment), and eager validation before any I/O. All
//! environment overrides live under the `VIGIL_` prefix.

use std::path::PathBuf;

use serde::Deserialize;
use thiserror::Error;
use vigil_core::VigilError;
use vigil_crypto::EncryptionConfig;
use vigil_db::DbConfig;

/// Default config file path; override with `VIGIL_CONFIG`.
const DEFAULT_CONFIG_PATH: &str = "vigil.toml";

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("failed to read config file {path}: {source}")]
    Read {
        path: String,
        source: std::io::Error,
    },

    #[error("failed to parse config file {path}: {source}")]
    Parse {
        path: String,
        source: toml::de::Error,
    },

    #[error("invalid environment override {key}: {message}")]
    Env { key: &'static str, message: String },

    #[error("invalid configuration: {message}")]
    Invalid { message: String },
}

impl From<ConfigError> for VigilError {
    fn from(err: ConfigError) -> Self {
        VigilError::Config {
            message: err.to_string(),
        }
    }
}

#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct ServerConfig {
    /// Grace period for in-flight handlers on shutdown.
    pub shutdown_timeout_secs: u64,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            shutdown_timeout_secs: 30,
        }
    }
}

#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct DatabaseConfig {
    pub url: String,
    pub namespace: String,
    pub database: String,
    pub username: String,
    pub password: String,
}

impl Default for DatabaseConfig {
    fn default() -> Self {
        let base = DbConfig::default();
        Self {
            url: base.url,
            namespace: base.namespace,
            database: base.database,
            username: base.username,
            password: base.password,
        }
    }
}

impl DatabaseConfig {
    pub fn to_db_config(&self) -> DbConfig {
        DbConfig {
            url: self.url.clone(),
            namespace: self.namespace.clone(),
            database: self.database.clone(),
            username: self.username.clone(),
            password: self.password.clone(),
        }
    }
}

#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct ArchiveConfig {
    /// Root directory of the archive object store.
    pub root: PathBuf,
}

impl Default for ArchiveConfig {
    fn default() -> Self {
        Self {
            root: PathBuf::from("./archive"),
        }
    }
}

#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct BusConfig {
    pub consumer_group: String,
    pub audit_topic: String,
    pub transaction_topic: String,
    pub user_topic: String,
    pub alert_topic: String,
    pub partitions_per_topic: u32,
}

impl Default for BusConfig {
    fn default() -> Self {
        Self {
            consumer_group: "audit-compliance-service".into(),
            audit_topic: "banking.audit.events".into(),
            transaction_topic: "banking.transactions".into(),
            user_topic: "banking.users".into(),
            alert_topic: "banking.compliance.alerts".into(),
            partitions_per_topic: 1,
        }
    }
}

impl BusConfig {
    pub fn topics(&self) -> Vec<String> {
        vec![
            self.audit_topic.clone(),
            self.transaction_topic.clone(),
            self.user_topic.clone(),
            self.alert_topic.clone(),
        ]
    }
}

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default)]
pub struct Config {
    pub server: ServerConfig,
    pub database: DatabaseConfig,
    pub archive: ArchiveConfig,
    pub bus: BusConfig,
    pub encryption: EncryptionConfig,
}

impl Config {
    /// Load configuration with layered precedence: built-in defaults,
    /// then the TOML file (if present), then `VIGIL_*` environment
    /// overrides. Validates eagerly so startup fails before any I/O.
    pub fn load() -> Result<Self, ConfigError> {
        let path =
            std::env::var("VIGIL_CONFIG").unwrap_or_else(|_| DEFAULT_CONFIG_PATH.to_owned());

        let mut config = match std::fs::read_to_string(&path) {
            Ok(raw) => toml::from_str(&raw).map_err(|source| ConfigError::Parse {
                path: path.clone(),
                source,
            })?,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => Self::default(),
            Err(source) => return Err(ConfigError::Read { path, source }),
        };

        config.apply_env_from(|key| std::env::var(key).ok())?;
        config.validate()?;
        Ok(config)
    }

    /// Apply `VIGIL_*` overrides from an environment lookup. Split out
    /// from [`Config::load`] so tests can inject an environment.
    pub fn apply_env_from(
        &mut self,
        env: impl Fn(&str) -> Option<String>,
    ) -> Result<(), ConfigError> {
        if let Some(v) = env("VIGIL_SERVER_SHUTDOWN_TIMEOUT_SECS") {
            self.server.shutdown_timeout_secs =
                v.parse().map_err(|_| ConfigError::Env {
                    key: "VIGIL_SERVER_SHUTDOWN_TIMEOUT_SECS",
                    message: format!("not an integer: {v}"),
                })?;
        }

        if let Some(v) = env("VIGIL_DB_URL") {
            self.database.url = v;
        }
        if let Some(v) = env("VIGIL_DB_NAMESPACE") {
            self.database.namespace = v;
        }
        if let Some(v) = env("VIGIL_DB_DATABASE") {
            self.database.database = v;
        }
        if let Some(v) = env("VIGIL_DB_USERNAME") {
            self.database.username = v;
        }
        if let Some(v) = env("VIGIL_DB_PASSWORD") {
            self.database.password = v;
        }

        if let Some(v) = env("VIGIL_ARCHIVE_ROOT") {
            self.archive.root = PathBuf::from(v);
        }

        if let Some(v) = env("VIGIL_BUS_CONSUMER_GROUP") {
            self.bus.consumer_group = v;
        }
        if let Some(v) = env("VIGIL_BUS_AUDIT_TOPIC") {
            self.bus.audit_topic = v;
        }
        if let Some(v) = env("VIGIL_BUS_TRANSACTION_TOPIC") {
            self.bus.transaction_topic = v;
        }
        if let Some(v) = env("VIGIL_BUS_USER_TOPIC") {
            self.bus.user_topic = v;
        }
        if let Some(v) = env("VIGIL_BUS_ALERT_TOPIC") {
            self.bus.alert_topic = v;
        }
        if let Some(v) = env("VIGIL_BUS_PARTITIONS_PER_TOPIC") {
            self.bus.partitions_per_topic = v.parse().map_err(|_| ConfigError::Env {
                key: "VIGIL_BUS_PARTITIONS_PER_TOPIC",
                message: format!("not an integer: {v}"),
            })?;
        }

        // Keys are comma-separated base64 values, oldest first.
        if let Some(v) = env("VIGIL_ENCRYPTION_KEYS") {
            self.encryption.keys_base64 = v
                .split(',')
                .map(|s| s.trim().to_owned())
                .filter(|s| !s.is_empty())
                .collect();
        }
        if let Some(v) = env("VIGIL_ENCRYPTION_CURRENT_KEY_VERSION") {
            self.encryption.current_key_version =
                v.parse().map_err(|_| ConfigError::Env {
                    key: "VIGIL_ENCRYPTION_CURRENT_KEY_VERSION",
                    message: format!("not an integer: {v}"),
                })?;
        }
        if let Some(v) = env("VIGIL_ENCRYPTION_HMAC_SECRET") {
            self.encryption.hmac_secret_base64 = v;
        }

        Ok(())
    }

    /// Structural validation. Key material is validated for real when
    /// the cipher is constructed; this catches obviously-broken setups
    /// before any connection attempt.
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.database.url.is_empty() {
            return Err(ConfigError::Invalid {
                message: "database.url must not be empty".into(),
            });
        }
        if self.bus.consumer_group.is_empty() {
            return Err(ConfigError::Invalid {
                message: "bus.consumer_group must not be empty".into(),
            });
        }
        if self.bus.partitions_per_topic == 0 {
            return Err(ConfigError::Invalid {
                message: "bus.partitions_per_topic must be at least 1".into(),
            });
        }
        for topic in self.bus.topics() {
            if topic.is_empty() {
                return Err(ConfigError::Invalid {
                    message: "bus topics must not be empty".into(),
                });
            }
        }
        if self.encryption.keys_base64.is_empty() {
            return Err(ConfigError::Invalid {
                message: "encryption.keys_base64 must list at least one key".into(),
            });
        }
        if self.encryption.hmac_secret_base64.is_empty() {
            return Err(ConfigError::Invalid {
                message: "encryption.hmac_secret_base64 must not be empty".into(),
            });
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use base64::Engine;
    use base64::engine::general_purpose::STANDARD;
    use std::collections::HashMap;

    fn valid_config() -> Config {
        let mut config = Config::default();
        config.encryption.keys_base64 = vec![STANDARD.encode([1u8; 32])];
        config.encryption.hmac_secret_base64 = STANDARD.encode(b"secret");
        config
    }

    #[test]
    fn defaults_match_the_expected_topology() {
        let config = Config::default();
        assert_eq!(config.bus.consumer_group, "audit-compliance-service");
        assert_eq!(config.bus.audit_topic, "banking.audit.events");
        assert_eq!(config.database.namespace, "vigil");
        assert_eq!(config.server.shutdown_timeout_secs, 30);
    }

    #[test]
    fn file_layer_overrides_defaults() {
        let raw = r#"
            [database]
            url = "db.internal:8000"

            [bus]
            audit_topic = "bank.audit"
        "#;
        let config: Config = toml::from_str(raw).unwrap();
        assert_eq!(config.database.url, "db.internal:8000");
        assert_eq!(config.bus.audit_topic, "bank.audit");
        // Untouched sections keep their defaults.
        assert_eq!(config.bus.transaction_topic, "banking.transactions");
        assert_eq!(config.database.username, "root");
    }

    #[test]
    fn environment_overrides_the_file_layer() {
        let mut config = valid_config();
        let env: HashMap<&str, String> = HashMap::from([
            ("VIGIL_DB_URL", "surreal.prod:8000".to_owned()),
            ("VIGIL_ENCRYPTION_CURRENT_KEY_VERSION", "1".to_owned()),
            (
                "VIGIL_ENCRYPTION_KEYS",
                format!("{}, {}", STANDARD.encode([1u8; 32]), STANDARD.encode([2u8; 32])),
            ),
        ]);

        config
            .apply_env_from(|key| env.get(key).cloned())
            .unwrap();

        assert_eq!(config.database.url, "surreal.prod:8000");
        assert_eq!(config.encryption.keys_base64.len(), 2);
        config.validate().unwrap();
    }

    #[test]
    fn malformed_numeric_override_is_rejected() {
        let mut config = valid_config();
        let err = config
            .apply_env_from(|key| {
                (key == "VIGIL_BUS_PARTITIONS_PER_TOPIC").then(|| "three".to_owned())
            })
            .unwrap_err();
        assert!(matches!(err, ConfigError::Env { .. }));
    }

    #[test]
    fn validation_requires_key_material() {
        let mut config = Config::default();
        assert!(config.validate().is_err());

        config.encryption.keys_base64 = vec![STANDARD.encode([1u8; 32])];
        assert!(config.validate().is_err());

        config.encryption.hmac_secret_base64 = STANDARD.encode(b"secret");
        config.validate().unwrap();
    }

    #[test]
    fn validation_rejects_zero_partitions() {
        let mut config = valid_config();
        config.bus.partitions_per_topic = 0;
        assert!(config.validate().is_err());
    }
}
