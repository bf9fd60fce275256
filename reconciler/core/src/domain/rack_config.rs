// Copyright (c) 2026 100monkeys.ai
// SPDX-License-Identifier: AGPL-3.0

// Rack Configuration Types
//
// Defines the configuration of a single-node rack:
// - Rack identity (name and platform version stamped on every instance)
// - Host paths for durable volumes, manifests, release logs and routes
// - Container engine connection settings
// - Reconcile loop scheduling

use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RackConfig {
    /// Rack name, stamped as `convox.rack` on every instance
    #[serde(default = "default_rack_name")]
    pub rack: String,

    /// Platform version, stamped as `convox.version`
    #[serde(default = "default_version")]
    pub version: String,

    /// Root directory for resource and service volumes
    #[serde(default = "default_volume_root")]
    pub volume_root: String,

    /// Directory holding `<app>/app.yaml` and `<app>/releases/*.yaml`
    #[serde(default = "default_manifest_dir")]
    pub manifest_dir: PathBuf,

    /// Directory release logs are appended under
    #[serde(default = "default_log_dir")]
    pub log_dir: PathBuf,

    /// JSON file the routing table is written to
    #[serde(default = "default_route_table_path")]
    pub route_table_path: PathBuf,

    #[serde(default)]
    pub engine: EngineConfig,

    #[serde(default)]
    pub reconcile: ReconcileConfig,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct EngineConfig {
    /// Path to Docker socket
    /// Default: auto-detected
    #[serde(skip_serializing_if = "Option::is_none")]
    pub docker_socket_path: Option<String>,

    /// Docker network instances join (None = default bridge)
    #[serde(skip_serializing_if = "Option::is_none")]
    pub network: Option<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ReconcileConfig {
    /// Run the periodic converge + prune loop
    #[serde(default = "default_true")]
    pub enabled: bool,

    /// Seconds between passes
    #[serde(default = "default_interval_seconds")]
    pub interval_seconds: u64,
}

impl Default for ReconcileConfig {
    fn default() -> Self {
        Self {
            enabled: true,
            interval_seconds: default_interval_seconds(),
        }
    }
}

impl Default for RackConfig {
    fn default() -> Self {
        Self {
            rack: default_rack_name(),
            version: default_version(),
            volume_root: default_volume_root(),
            manifest_dir: default_manifest_dir(),
            log_dir: default_log_dir(),
            route_table_path: default_route_table_path(),
            engine: EngineConfig::default(),
            reconcile: ReconcileConfig::default(),
        }
    }
}

fn default_true() -> bool {
    true
}

fn default_rack_name() -> String {
    "convox".to_string()
}

fn default_version() -> String {
    env!("CARGO_PKG_VERSION").to_string()
}

fn default_volume_root() -> String {
    "/var/convox".to_string()
}

fn default_manifest_dir() -> PathBuf {
    PathBuf::from("/var/convox/apps")
}

fn default_log_dir() -> PathBuf {
    PathBuf::from("/var/convox/logs")
}

fn default_route_table_path() -> PathBuf {
    PathBuf::from("/var/convox/routes.json")
}

fn default_interval_seconds() -> u64 {
    30
}

impl RackConfig {
    /// Load configuration from YAML file
    pub fn from_yaml_file(path: impl AsRef<Path>) -> anyhow::Result<Self> {
        let content = std::fs::read_to_string(path)?;
        let config = serde_yaml::from_str(&content)?;
        Ok(config)
    }

    /// Parse configuration from YAML string
    pub fn from_yaml_str(yaml: &str) -> anyhow::Result<Self> {
        let config = serde_yaml::from_str(yaml)?;
        Ok(config)
    }

    pub fn to_yaml_string(&self) -> anyhow::Result<String> {
        Ok(serde_yaml::to_string(self)?)
    }

    /// Discover configuration file using precedence order
    /// 1. RACK_CONFIG_PATH environment variable
    /// 2. ./rack-config.yaml (working directory)
    /// 3. ~/.convox/rack-config.yaml (user home)
    /// 4. /etc/convox/rack-config.yaml (system)
    pub fn discover_config() -> Option<PathBuf> {
        if let Ok(path) = std::env::var("RACK_CONFIG_PATH") {
            let path = PathBuf::from(path);
            if path.exists() {
                return Some(path);
            }
        }

        let cwd = PathBuf::from("./rack-config.yaml");
        if cwd.exists() {
            return Some(cwd);
        }

        if let Some(home) = dirs::home_dir() {
            let user_config = home.join(".convox").join("rack-config.yaml");
            if user_config.exists() {
                return Some(user_config);
            }
        }

        let system_config = PathBuf::from("/etc/convox/rack-config.yaml");
        if system_config.exists() {
            return Some(system_config);
        }

        None
    }

    /// Load configuration with discovery, fallback to default
    pub fn load_or_default(cli_path: Option<PathBuf>) -> anyhow::Result<Self> {
        // Explicit path must exist and parse
        if let Some(path) = cli_path {
            tracing::info!("Loading configuration from explicit path: {:?}", path);
            let mut config = Self::from_yaml_file(&path).map_err(|e| {
                anyhow::anyhow!("Failed to load config at {:?}: {}", path, e)
            })?;
            config.apply_env_overrides();
            return Ok(config);
        }

        if let Some(config_path) = Self::discover_config() {
            tracing::info!("Loading configuration from discovered path: {:?}", config_path);
            let mut config = Self::from_yaml_file(config_path)?;
            config.apply_env_overrides();
            Ok(config)
        } else {
            tracing::warn!("No configuration file found in standard locations. Using defaults.");
            let mut config = Self::default();
            config.apply_env_overrides();
            Ok(config)
        }
    }

    /// Apply environment variable overrides to configuration
    pub fn apply_env_overrides(&mut self) {
        if let Ok(val) = std::env::var("RACK_NAME") {
            tracing::info!("Environment override: RACK_NAME={}", val);
            self.rack = val;
        }

        if let Ok(val) = std::env::var("RACK_VOLUME_ROOT") {
            tracing::info!("Environment override: RACK_VOLUME_ROOT={}", val);
            self.volume_root = val;
        }

        if let Ok(val) = std::env::var("RACK_RECONCILE_ENABLED") {
            match parse_bool(&val) {
                Some(enabled) => {
                    tracing::info!("Environment override: RACK_RECONCILE_ENABLED={}", enabled);
                    self.reconcile.enabled = enabled;
                }
                None => {
                    tracing::warn!(
                        "Invalid value for RACK_RECONCILE_ENABLED: '{}'. Expected true/false. Ignoring.",
                        val
                    );
                }
            }
        }
    }

    /// Validate configuration
    pub fn validate(&self) -> anyhow::Result<()> {
        if self.rack.trim().is_empty() {
            anyhow::bail!("rack cannot be empty");
        }

        if self.version.trim().is_empty() {
            anyhow::bail!("version cannot be empty");
        }

        if self.volume_root.trim().is_empty() {
            anyhow::bail!("volume_root cannot be empty");
        }

        if self.reconcile.interval_seconds == 0 {
            anyhow::bail!("reconcile.interval_seconds must be greater than zero");
        }

        Ok(())
    }
}

fn parse_bool(val: &str) -> Option<bool> {
    match val.to_lowercase().as_str() {
        "true" | "1" | "yes" | "on" => Some(true),
        "false" | "0" | "no" | "off" => Some(false),
        _ => None,
    }
}
