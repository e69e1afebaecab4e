// Copyright (c) 2026 100monkeys.ai
// SPDX-License-Identifier: AGPL-3.0

// Chassis Configuration
//
// Defines the configuration consumed by the adapters and the reference binary:
// - Listener ports for the gRPC and HTTP adapters
// - The protobuf service exposed over gRPC
// - Logging and metrics settings
// - An optional stable instance id stamped on every log record

use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

use crate::domain::errors::ConfigError;

pub const CONFIG_PATH_ENV: &str = "MICROCHASSIS_CONFIG_PATH";

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ChassisConfig {
    /// gRPC listener port (binds 0.0.0.0)
    #[serde(default = "default_grpc_port")]
    pub grpc_port: u16,

    /// HTTP listener port (binds 0.0.0.0)
    #[serde(default = "default_http_port")]
    pub http_port: u16,

    /// Stable instance identifier; a random UUID is used when absent
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub instance_id: Option<String>,

    /// Protobuf service exposed by the gRPC adapter
    #[serde(default)]
    pub proto: ProtoConfig,

    #[serde(default)]
    pub logging: LoggingConfig,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub metrics: Option<MetricsConfig>,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ProtoConfig {
    /// Compiled `FileDescriptorSet` to load
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub descriptor_set: Option<PathBuf>,

    /// Protobuf package of the service (e.g. "acme.users.v1")
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub package: Option<String>,

    /// Service name inside the package (e.g. "UserService")
    #[serde(default)]
    pub service: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct LoggingConfig {
    /// Log level (e.g., "info", "debug", "trace")
    #[serde(default = "default_log_level")]
    pub level: String,

    /// Output format
    #[serde(default)]
    pub format: LogFormat,
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum LogFormat {
    #[default]
    Text,
    Json,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct MetricsConfig {
    /// Enable Prometheus exposition
    #[serde(default = "default_true")]
    pub enabled: bool,

    /// Metrics endpoint port
    #[serde(default = "default_metrics_port")]
    pub port: u16,
}

fn default_true() -> bool {
    true
}

fn default_grpc_port() -> u16 {
    50051
}

fn default_http_port() -> u16 {
    8000
}

fn default_metrics_port() -> u16 {
    9090
}

fn default_log_level() -> String {
    "info".to_string()
}

impl Default for ChassisConfig {
    fn default() -> Self {
        Self {
            grpc_port: default_grpc_port(),
            http_port: default_http_port(),
            instance_id: None,
            proto: ProtoConfig::default(),
            logging: LoggingConfig::default(),
            metrics: None,
        }
    }
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: default_log_level(),
            format: LogFormat::default(),
        }
    }
}

impl ChassisConfig {
    /// Load configuration from YAML file
    pub fn from_yaml_file(path: impl AsRef<Path>) -> Result<Self, ConfigError> {
        let path = path.as_ref();
        let content = std::fs::read_to_string(path)
            .map_err(|e| ConfigError::Load(format!("{}: {}", path.display(), e)))?;
        Self::from_yaml_str(&content)
    }

    /// Parse configuration from YAML string
    pub fn from_yaml_str(yaml: &str) -> Result<Self, ConfigError> {
        serde_yaml::from_str(yaml).map_err(|e| ConfigError::Load(e.to_string()))
    }

    /// Discover configuration file using precedence order
    /// 1. MICROCHASSIS_CONFIG_PATH environment variable
    /// 2. ./microchassis.yaml (working directory)
    pub fn discover_config() -> Option<PathBuf> {
        if let Ok(path) = std::env::var(CONFIG_PATH_ENV) {
            let path = PathBuf::from(path);
            if path.exists() {
                return Some(path);
            }
        }

        let cwd = PathBuf::from("./microchassis.yaml");
        if cwd.exists() {
            return Some(cwd);
        }

        None
    }

    /// Load configuration with discovery, fallback to default
    pub fn load_or_default(cli_path: Option<PathBuf>) -> Result<Self, ConfigError> {
        // Explicit path must exist and parse
        if let Some(path) = cli_path {
            tracing::info!("Loading configuration from explicit path: {:?}", path);
            let mut config = Self::from_yaml_file(&path)?;
            config.apply_env_overrides();
            return Ok(config);
        }

        let mut config = match Self::discover_config() {
            Some(path) => {
                tracing::info!("Loading configuration from discovered path: {:?}", path);
                Self::from_yaml_file(path)?
            }
            None => {
                tracing::warn!("No configuration file found. Using defaults.");
                Self::default()
            }
        };
        config.apply_env_overrides();
        Ok(config)
    }

    /// Apply environment variable overrides to configuration
    pub fn apply_env_overrides(&mut self) {
        if let Some(port) = port_from_env("MICROCHASSIS_GRPC_PORT") {
            self.grpc_port = port;
        }
        if let Some(port) = port_from_env("MICROCHASSIS_HTTP_PORT") {
            self.http_port = port;
        }
        if let Ok(id) = std::env::var("MICROCHASSIS_INSTANCE_ID") {
            if !id.is_empty() {
                tracing::info!("Environment override: MICROCHASSIS_INSTANCE_ID={}", id);
                self.instance_id = Some(id);
            }
        }
    }

    /// Key/value view used by components that only need opaque settings.
    pub fn get(&self, key: &str) -> Option<String> {
        match key {
            "grpcPort" => Some(self.grpc_port.to_string()),
            "httpPort" => Some(self.http_port.to_string()),
            "instanceId" => self.instance_id.clone(),
            "package" => self.proto.package.clone(),
            "service" => Some(self.proto.service.clone()).filter(|s| !s.is_empty()),
            _ => None,
        }
    }

    /// Validate configuration
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.proto.service.is_empty() {
            return Err(ConfigError::Load("proto.service cannot be empty".to_string()));
        }

        if self.grpc_port != 0 && self.grpc_port == self.http_port {
            return Err(ConfigError::Load(format!(
                "grpc_port and http_port must differ (both {})",
                self.grpc_port
            )));
        }

        if let Some(metrics) = &self.metrics {
            if metrics.enabled
                && metrics.port != 0
                && (metrics.port == self.grpc_port || metrics.port == self.http_port)
            {
                return Err(ConfigError::Load(format!(
                    "metrics.port {} collides with a service port",
                    metrics.port
                )));
            }
        }

        Ok(())
    }
}

fn port_from_env(var: &str) -> Option<u16> {
    let val = std::env::var(var).ok()?;
    match val.parse::<u16>() {
        Ok(port) => {
            tracing::info!("Environment override: {}={}", var, port);
            Some(port)
        }
        Err(_) => {
            tracing::warn!(
                "Invalid value for {}: '{}'. Expected a port number. Ignoring.",
                var,
                val
            );
            None
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults() {
        let config = ChassisConfig::default();
        assert_eq!(config.grpc_port, 50051);
        assert_eq!(config.http_port, 8000);
        assert_eq!(config.logging.level, "info");
        assert_eq!(config.logging.format, LogFormat::Text);
        assert!(config.metrics.is_none());
    }

    #[test]
    fn test_from_yaml() {
        let config = ChassisConfig::from_yaml_str(
            r#"
grpc_port: 6000
http_port: 6001
instance_id: users-1
proto:
  descriptor_set: /etc/users.pb
  package: acme.users.v1
  service: UserService
logging:
  level: debug
  format: json
"#,
        )
        .unwrap();

        assert_eq!(config.grpc_port, 6000);
        assert_eq!(config.proto.package.as_deref(), Some("acme.users.v1"));
        assert_eq!(config.logging.format, LogFormat::Json);
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_get_keys() {
        let mut config = ChassisConfig::default();
        config.proto.service = "UserService".to_string();

        assert_eq!(config.get("grpcPort").as_deref(), Some("50051"));
        assert_eq!(config.get("httpPort").as_deref(), Some("8000"));
        assert_eq!(config.get("service").as_deref(), Some("UserService"));
        assert_eq!(config.get("package"), None);
        assert_eq!(config.get("nope"), None);
    }

    #[test]
    fn test_validation() {
        let mut config = ChassisConfig::default();

        // Service name is required
        assert!(config.validate().is_err());
        config.proto.service = "UserService".to_string();
        assert!(config.validate().is_ok());

        // Ports must differ
        config.http_port = config.grpc_port;
        assert!(config.validate().is_err());
        config.http_port = 8000;

        config.metrics = Some(MetricsConfig {
            enabled: true,
            port: 8000,
        });
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_from_yaml_file() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("microchassis.yaml");
        std::fs::write(&path, "http_port: 9001\nproto:\n  service: Echo\n").unwrap();

        let config = ChassisConfig::from_yaml_file(&path).unwrap();
        assert_eq!(config.http_port, 9001);
        assert_eq!(config.proto.service, "Echo");

        let missing = ChassisConfig::from_yaml_file(dir.path().join("missing.yaml"));
        assert!(matches!(missing, Err(ConfigError::Load(_))));
    }
}
