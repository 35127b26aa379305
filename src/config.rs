//! Configuration management for the gate.

use chrono::Duration;
use serde::{Deserialize, Serialize};
use std::net::SocketAddr;
use std::path::Path;
use tracing::info;

use crate::error::{GateError, Result};
use crate::gate::Limits;

/// Environment variable prefix for configuration overrides.
pub const ENV_PREFIX: &str = "HYDRANT_GATE";

/// Main configuration for the gate service.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct GateConfig {
    /// Server configuration
    #[serde(default)]
    pub server: ServerConfig,

    /// Actor configuration
    #[serde(default)]
    pub actors: ActorsConfig,

    /// Admission limits
    #[serde(default)]
    pub limits: LimitsConfig,
}

/// Server configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ServerConfig {
    /// Listen address for the store endpoint
    #[serde(default = "default_addr")]
    pub addr: SocketAddr,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            addr: default_addr(),
        }
    }
}

fn default_addr() -> SocketAddr {
    SocketAddr::from(([127, 0, 0, 1], 9292))
}

/// Which actors each policy version gates.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ActorsConfig {
    /// The sole actor of the single-actor policy; must appear in `v2`
    #[serde(default = "default_v1_actor")]
    pub v1: String,

    /// Actors of the multi-actor policy, in order
    #[serde(default = "default_v2_actors")]
    pub v2: Vec<String>,
}

impl Default for ActorsConfig {
    fn default() -> Self {
        Self {
            v1: default_v1_actor(),
            v2: default_v2_actors(),
        }
    }
}

fn default_v1_actor() -> String {
    "piddles".to_string()
}

fn default_v2_actors() -> Vec<String> {
    vec![
        "piddles".to_string(),
        "puddles".to_string(),
        "pyddles".to_string(),
    ]
}

/// Admission limits in whole seconds.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LimitsConfig {
    /// Quiet period required since an actor's last event
    #[serde(default = "default_cooldown")]
    pub cooldown_secs: i64,

    /// Length of the capped window
    #[serde(default = "default_window")]
    pub window_secs: i64,

    /// Events allowed per window
    #[serde(default = "default_max_per_window")]
    pub max_per_window: usize,

    /// Age at which events are pruned
    #[serde(default = "default_retention")]
    pub retention_secs: i64,
}

impl Default for LimitsConfig {
    fn default() -> Self {
        Self {
            cooldown_secs: default_cooldown(),
            window_secs: default_window(),
            max_per_window: default_max_per_window(),
            retention_secs: default_retention(),
        }
    }
}

fn default_cooldown() -> i64 {
    300
}

fn default_window() -> i64 {
    3600
}

fn default_max_per_window() -> usize {
    5
}

fn default_retention() -> i64 {
    3600
}

impl LimitsConfig {
    /// Convert to validated limits.
    pub fn to_limits(&self) -> Result<Limits> {
        Limits::new(
            Duration::seconds(self.cooldown_secs),
            Duration::seconds(self.window_secs),
            self.max_per_window,
            Duration::seconds(self.retention_secs),
        )
    }
}

impl GateConfig {
    /// Load configuration from a YAML file.
    pub fn from_file<P: AsRef<Path>>(path: P) -> Result<Self> {
        let path = path.as_ref();
        info!(path = %path.display(), "Loading gate configuration");

        let contents = std::fs::read_to_string(path)?;
        Self::from_yaml(&contents)
    }

    /// Load configuration from a YAML string.
    pub fn from_yaml(yaml: &str) -> Result<Self> {
        serde_yaml::from_str(yaml)
            .map_err(|e| GateError::Config(format!("Failed to parse gate config: {}", e)))
    }

    /// Load configuration from an optional file layered under environment overrides.
    ///
    /// Variables look like `HYDRANT_GATE_SERVER__ADDR=0.0.0.0:9292`.
    pub fn load(path: Option<&Path>) -> Result<Self> {
        let mut builder = ::config::Config::builder();
        if let Some(path) = path {
            info!(path = %path.display(), "Loading gate configuration");
            builder = builder
                .add_source(::config::File::from(path).format(::config::FileFormat::Yaml));
        }
        builder
            .add_source(
                ::config::Environment::with_prefix(ENV_PREFIX)
                    .prefix_separator("_")
                    .separator("__")
                    .list_separator(",")
                    .with_list_parse_key("actors.v2")
                    .try_parsing(true),
            )
            .build()
            .and_then(|c| c.try_deserialize())
            .map_err(|e| GateError::Config(e.to_string()))
    }

    /// Check cross-field constraints not expressible in serde.
    pub fn validate(&self) -> Result<()> {
        if !self.actors.v2.iter().any(|a| *a == self.actors.v1) {
            return Err(GateError::Config(format!(
                "v1 actor {} must be listed among the v2 actors",
                self.actors.v1
            )));
        }
        self.limits.to_limits()?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_config() {
        let config = GateConfig::default();
        assert_eq!(config.server.addr, "127.0.0.1:9292".parse::<SocketAddr>().unwrap());
        assert_eq!(config.actors.v1, "piddles");
        assert_eq!(config.actors.v2, vec!["piddles", "puddles", "pyddles"]);
        assert_eq!(config.limits.to_limits().unwrap(), Limits::default());
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_parse_partial_yaml() {
        let yaml = r#"
actors:
  v1: alpha
  v2: [alpha, beta]
limits:
  max_per_window: 10
"#;
        let config = GateConfig::from_yaml(yaml).unwrap();
        assert_eq!(config.actors.v1, "alpha");
        assert_eq!(config.actors.v2, vec!["alpha", "beta"]);
        assert_eq!(config.limits.max_per_window, 10);
        assert_eq!(config.limits.cooldown_secs, 300);
        assert_eq!(config.server.addr, default_addr());
    }

    #[test]
    fn test_invalid_yaml() {
        let result = GateConfig::from_yaml("limits: [not, a, map]");
        assert!(matches!(result, Err(GateError::Config(_))));
    }

    #[test]
    fn test_validate_rejects_orphan_v1_actor() {
        let mut config = GateConfig::default();
        config.actors.v1 = "paddles".to_string();
        assert!(matches!(config.validate(), Err(GateError::Config(_))));
    }

    #[test]
    fn test_validate_rejects_bad_limits() {
        let mut config = GateConfig::default();
        config.limits.window_secs = 0;
        assert!(matches!(config.validate(), Err(GateError::InvalidArgument(_))));
    }

    #[test]
    fn test_load_without_file_uses_defaults() {
        let config = GateConfig::load(None).unwrap();
        assert_eq!(config.actors.v1, "piddles");
        assert_eq!(config.limits.window_secs, 3600);
    }
}
