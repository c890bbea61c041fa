//! Configuration loading and validation for the check server

use crate::types::ServerConfig;
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use std::time::Duration;
use thiserror::Error;
use validator::{Validate, ValidationError};

/// Configuration error types
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("Failed to read configuration file: {0}")]
    IoError(#[from] std::io::Error),

    #[error("Failed to parse YAML: {0}")]
    ParseError(#[from] serde_yaml::Error),

    #[error("Invalid configuration: {0}")]
    ValidationError(#[from] validator::ValidationErrors),
}

/// Main configuration structure
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct Config {
    #[serde(default)]
    pub data: DataSettings,

    #[serde(default)]
    pub scheduler: SchedulerSettings,

    #[serde(default)]
    pub journal: JournalSettings,

    #[serde(default)]
    pub api: ApiSettings,

    #[serde(default)]
    pub shell: ShellSettings,

    #[serde(default)]
    pub metrics: MetricsSettings,

    #[serde(default)]
    pub logging: LoggingSettings,
}

impl Validate for Config {
    fn validate(&self) -> Result<(), validator::ValidationErrors> {
        self.data.validate()?;
        self.scheduler.validate()?;
        self.journal.validate()?;
        self.api.validate()?;
        self.logging.validate()?;
        Ok(())
    }
}

/// Check table persistence settings
#[derive(Debug, Clone, Serialize, Deserialize, Validate)]
#[serde(default)]
pub struct DataSettings {
    #[validate(length(min = 1))]
    pub snapshot_path: String,

    /// May lower the table limit, never raise it above `checks::MAX_CHECKS`.
    #[validate(range(min = 1, max = 100))]
    pub max_checks: usize,
}

/// Tick loop settings
#[derive(Debug, Clone, Serialize, Deserialize, Validate)]
#[serde(default)]
pub struct SchedulerSettings {
    #[serde(with = "humantime_serde")]
    #[validate(custom = "validate_tick_interval")]
    pub interval: Duration,

    #[serde(with = "humantime_serde")]
    #[validate(custom = "validate_probe_timeout")]
    pub probe_timeout: Duration,
}

/// Outcome journal settings
#[derive(Debug, Clone, Serialize, Deserialize, Validate)]
#[serde(default)]
pub struct JournalSettings {
    pub enabled: bool,

    #[validate(length(min = 1))]
    pub dir: String,

    #[serde(with = "humantime_serde")]
    #[validate(custom = "validate_rotate_interval")]
    pub rotate_interval: Duration,
}

/// JSON API settings
#[derive(Debug, Clone, Serialize, Deserialize, Validate)]
#[serde(default)]
pub struct ApiSettings {
    #[validate(custom = "validate_listen_addr")]
    pub listen_addr: String,

    /// Resolve the target host while validating a check
    pub resolve_hosts: bool,
}

/// Inspection shell settings
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ShellSettings {
    pub enabled: bool,
}

/// Metrics endpoint settings
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct MetricsSettings {
    pub enabled: bool,
}

/// Logging settings
#[derive(Debug, Clone, Default, Serialize, Deserialize, Validate)]
pub struct LoggingSettings {
    pub level: Option<String>,

    #[validate(custom = "validate_log_format")]
    pub format: Option<String>,
}

// Default implementations

impl Default for DataSettings {
    fn default() -> Self {
        Self {
            snapshot_path: ".data/checks.json".to_string(),
            max_checks: checks::MAX_CHECKS,
        }
    }
}

impl Default for SchedulerSettings {
    fn default() -> Self {
        Self {
            interval: Duration::from_millis(5000),
            probe_timeout: checks::DEFAULT_PROBE_TIMEOUT,
        }
    }
}

impl Default for JournalSettings {
    fn default() -> Self {
        Self {
            enabled: true,
            dir: ".logs".to_string(),
            rotate_interval: Duration::from_secs(24 * 60 * 60),
        }
    }
}

impl Default for ApiSettings {
    fn default() -> Self {
        Self {
            listen_addr: "127.0.0.1:8000".to_string(),
            resolve_hosts: true,
        }
    }
}

impl Default for ShellSettings {
    fn default() -> Self {
        Self { enabled: true }
    }
}

impl Default for MetricsSettings {
    fn default() -> Self {
        Self { enabled: true }
    }
}

// Custom validators

fn validate_tick_interval(interval: &Duration) -> Result<(), ValidationError> {
    let millis = interval.as_millis();
    if !(100..=3_600_000).contains(&millis) {
        return Err(ValidationError::new("tick_interval_out_of_range"));
    }
    Ok(())
}

fn validate_probe_timeout(timeout: &Duration) -> Result<(), ValidationError> {
    let millis = timeout.as_millis();
    if !(100..=60_000).contains(&millis) {
        return Err(ValidationError::new("probe_timeout_out_of_range"));
    }
    Ok(())
}

fn validate_rotate_interval(interval: &Duration) -> Result<(), ValidationError> {
    if interval.as_secs() < 60 {
        return Err(ValidationError::new("rotate_interval_too_small"));
    }
    Ok(())
}

fn validate_listen_addr(addr: &str) -> Result<(), ValidationError> {
    addr.parse::<std::net::SocketAddr>()
        .map(|_| ())
        .map_err(|_| ValidationError::new("listen_addr_invalid"))
}

fn validate_log_format(format: &str) -> Result<(), ValidationError> {
    match format {
        "text" | "json" => Ok(()),
        _ => Err(ValidationError::new("log_format_unknown")),
    }
}

// Configuration loading implementation

impl Config {
    /// Load configuration from default search paths
    pub fn load() -> Result<Self, ConfigError> {
        match Self::find_config_file() {
            Some(path) => Self::load_from_file(&path),
            None => Ok(Self::default()),
        }
    }

    /// Load configuration from a specific file
    pub fn load_from_file(path: impl AsRef<Path>) -> Result<Self, ConfigError> {
        let contents = std::fs::read_to_string(path.as_ref())?;
        let config: Config = serde_yaml::from_str(&contents)?;
        config.validate()?;
        Ok(config)
    }

    /// Find configuration file in standard locations
    pub fn find_config_file() -> Option<PathBuf> {
        let mut paths = vec![PathBuf::from("/etc/checks/checks-server.yaml")];

        if let Some(home_path) = Self::home_config_path() {
            paths.push(home_path);
        }

        paths.push(PathBuf::from("./checks-server.yaml"));

        paths.into_iter().find(|p: &PathBuf| p.exists() && p.is_file())
    }

    /// Get home directory config path
    fn home_config_path() -> Option<PathBuf> {
        dirs::home_dir().map(|home| home.join(".config/checks/checks-server.yaml"))
    }

    /// Effective log level
    pub fn log_level(&self) -> &str {
        self.logging.level.as_deref().unwrap_or("info")
    }

    /// Whether logs are emitted as JSON
    pub fn json_logs(&self) -> bool {
        self.logging.format.as_deref() == Some("json")
    }

    /// Convert to ServerConfig
    pub fn to_server_config(&self) -> ServerConfig {
        ServerConfig {
            snapshot_path: PathBuf::from(&self.data.snapshot_path),
            max_checks: self.data.max_checks,
            tick_interval: self.scheduler.interval,
            probe_timeout: self.scheduler.probe_timeout,
            journal_dir: self
                .journal
                .enabled
                .then(|| PathBuf::from(&self.journal.dir)),
            journal_rotate_interval: self.journal.rotate_interval,
            listen_addr: self.api.listen_addr.clone(),
            resolve_hosts: self.api.resolve_hosts,
            shell_enabled: self.shell.enabled,
            metrics_enabled: self.metrics.enabled,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_config_is_valid() {
        let config = Config::default();
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_valid_yaml_parsing() {
        let yaml = r#"
data:
  snapshot_path: "/var/lib/checks/checks.json"
  max_checks: 50

scheduler:
  interval: 10s
  probe_timeout: 2s

journal:
  enabled: false
  dir: "/var/log/checks"
  rotate_interval: 12h

api:
  listen_addr: "0.0.0.0:9000"
  resolve_hosts: false

logging:
  level: debug
  format: json
"#;

        let config: Config = serde_yaml::from_str(yaml).unwrap();
        assert!(config.validate().is_ok());
        assert_eq!(config.data.max_checks, 50);
        assert_eq!(config.scheduler.interval, Duration::from_secs(10));
        assert_eq!(config.scheduler.probe_timeout, Duration::from_secs(2));
        assert_eq!(config.journal.rotate_interval, Duration::from_secs(12 * 3600));
        assert!(!config.api.resolve_hosts);
        assert_eq!(config.log_level(), "debug");
        assert!(config.json_logs());
    }

    #[test]
    fn test_minimal_yaml_uses_defaults() {
        let yaml = r#"
scheduler:
  interval: 1s
"#;

        let config: Config = serde_yaml::from_str(yaml).unwrap();
        assert!(config.validate().is_ok());
        assert_eq!(config.scheduler.interval, Duration::from_secs(1));
        assert_eq!(config.scheduler.probe_timeout, Duration::from_millis(5000));
        assert_eq!(config.data.snapshot_path, ".data/checks.json");
        assert_eq!(config.data.max_checks, 100);
        assert_eq!(config.api.listen_addr, "127.0.0.1:8000");
        assert_eq!(config.log_level(), "info");
        assert!(!config.json_logs());
    }

    #[test]
    fn test_invalid_tick_interval() {
        let yaml = r#"
scheduler:
  interval: 10ms  # Invalid: < 100ms
"#;
        let config: Config = serde_yaml::from_str(yaml).unwrap();
        assert!(config.validate().is_err());

        let yaml = r#"
scheduler:
  interval: 2h  # Invalid: > 1h
"#;
        let config: Config = serde_yaml::from_str(yaml).unwrap();
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_invalid_probe_timeout() {
        let yaml = r#"
scheduler:
  probe_timeout: 5m  # Invalid: > 1m
"#;
        let config: Config = serde_yaml::from_str(yaml).unwrap();
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_invalid_max_checks() {
        let yaml = r#"
data:
  max_checks: 0
"#;
        let config: Config = serde_yaml::from_str(yaml).unwrap();
        assert!(config.validate().is_err());

        let yaml = r#"
data:
  max_checks: 101  # Invalid: above the fixed table limit
"#;
        let config: Config = serde_yaml::from_str(yaml).unwrap();
        assert!(config.validate().is_err());

        let yaml = r#"
data:
  max_checks: 100
"#;
        let config: Config = serde_yaml::from_str(yaml).unwrap();
        assert!(config.validate().is_ok());
        assert_eq!(config.to_server_config().max_checks, checks::MAX_CHECKS);
    }

    #[test]
    fn test_invalid_listen_addr() {
        assert!(validate_listen_addr("127.0.0.1:8000").is_ok());
        assert!(validate_listen_addr("[::1]:8000").is_ok());
        assert!(validate_listen_addr("localhost").is_err());
        assert!(validate_listen_addr("").is_err());
    }

    #[test]
    fn test_invalid_log_format() {
        let yaml = r#"
logging:
  format: xml
"#;
        let config: Config = serde_yaml::from_str(yaml).unwrap();
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_config_to_server_config_conversion() {
        let config = Config::default();
        let server_config = config.to_server_config();

        assert_eq!(server_config.snapshot_path, PathBuf::from(".data/checks.json"));
        assert_eq!(server_config.max_checks, 100);
        assert_eq!(server_config.tick_interval, Duration::from_millis(5000));
        assert_eq!(server_config.probe_timeout, Duration::from_millis(5000));
        assert_eq!(server_config.journal_dir, Some(PathBuf::from(".logs")));
        assert!(server_config.shell_enabled);
        assert!(server_config.metrics_enabled);

        let mut config = Config::default();
        config.journal.enabled = false;
        assert_eq!(config.to_server_config().journal_dir, None);
    }
}
