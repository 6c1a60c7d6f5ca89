//! Configuration types and loading for the resolver.

use serde::Deserialize;
use std::fs;
use std::path::PathBuf;

use crate::dns::resolver::{timeout_from_seconds, QueryOptions, DNS_PORT};
use crate::error::ConfigError;

/// Default config.yaml embedded at compile time
pub const DEFAULT_CONFIG_YAML: &str = include_str!("../../config.yaml");

/// File name searched when no config path is given
const CONFIG_FILE_NAME: &str = "dnsprobe.yaml";

/// Main configuration struct
#[derive(Debug, Deserialize, Clone, Default)]
pub struct Config {
    #[serde(default)]
    pub resolver: ResolverConfig,
    #[serde(default)]
    pub logging: LoggingConfig,
}

// ============== Resolver Config ==============

#[derive(Debug, Deserialize, Clone, PartialEq)]
pub struct ResolverConfig {
    /// Server used when the command line names none
    #[serde(default)]
    pub server: Option<String>,
    #[serde(default = "default_port")]
    pub port: u16,
    /// Negative waits forever, 0 polls once
    #[serde(default = "default_timeout_seconds")]
    pub timeout_seconds: i64,
    #[serde(default = "default_verify_source")]
    pub verify_source: bool,
}

fn default_port() -> u16 {
    DNS_PORT
}

fn default_timeout_seconds() -> i64 {
    5
}

fn default_verify_source() -> bool {
    true
}

impl ResolverConfig {
    pub fn query_options(&self) -> QueryOptions {
        QueryOptions {
            port: self.port,
            timeout: timeout_from_seconds(self.timeout_seconds),
            verify_source: self.verify_source,
        }
    }
}

impl Default for ResolverConfig {
    fn default() -> Self {
        ResolverConfig {
            server: None,
            port: default_port(),
            timeout_seconds: default_timeout_seconds(),
            verify_source: default_verify_source(),
        }
    }
}

// ============== Logging Config ==============

#[derive(Debug, Deserialize, Clone, PartialEq)]
#[serde(rename_all = "lowercase")]
#[derive(Default)]
pub enum LogFormat {
    #[default]
    Text,
    Json,
}

#[derive(Debug, Deserialize, Clone, PartialEq)]
#[serde(rename_all = "lowercase")]
#[derive(Default)]
pub enum LogRotation {
    #[default]
    Daily,
    Hourly,
    Never,
}

#[derive(Debug, Deserialize, Clone)]
pub struct LoggingConfig {
    #[serde(default = "default_log_enabled")]
    pub enabled: bool,
    /// Filter used when RUST_LOG is unset
    #[serde(default = "default_log_level")]
    pub level: String,
    #[serde(default)]
    pub format: LogFormat,
    /// File logging configuration
    #[serde(default)]
    pub file: Option<FileLoggingConfig>,
}

#[derive(Debug, Deserialize, Clone)]
pub struct FileLoggingConfig {
    #[serde(default = "default_log_dir")]
    pub log_dir: String,
    #[serde(default = "default_log_file_prefix")]
    pub file_prefix: String,
    #[serde(default)]
    pub rotation: LogRotation,
    /// Days to keep old log files (0 = keep forever)
    #[serde(default = "default_max_age_days")]
    pub max_age_days: u64,
    /// Compress rotated log files with gzip
    #[serde(default = "default_compress")]
    pub compress: bool,
}

fn default_log_enabled() -> bool {
    true
}

fn default_log_level() -> String {
    "warn".to_string()
}

fn default_log_dir() -> String {
    "logs".to_string()
}

fn default_log_file_prefix() -> String {
    "dnsprobe.log".to_string()
}

fn default_max_age_days() -> u64 {
    7
}

fn default_compress() -> bool {
    true
}

impl Default for FileLoggingConfig {
    fn default() -> Self {
        FileLoggingConfig {
            log_dir: default_log_dir(),
            file_prefix: default_log_file_prefix(),
            rotation: LogRotation::Daily,
            max_age_days: default_max_age_days(),
            compress: default_compress(),
        }
    }
}

impl Default for LoggingConfig {
    fn default() -> Self {
        LoggingConfig {
            enabled: default_log_enabled(),
            level: default_log_level(),
            format: LogFormat::Text,
            file: None,
        }
    }
}

// ============== Config Loading ==============

/// Get the directory containing the executable
fn exe_dir() -> Option<PathBuf> {
    std::env::current_exe()
        .ok()
        .and_then(|p| p.parent().map(|d| d.to_path_buf()))
}

/// Parse configuration from YAML text
pub fn parse_config(yaml: &str) -> Result<Config, ConfigError> {
    // An empty document deserializes to unit, not to a map
    if yaml.trim().is_empty() {
        return Ok(Config::default());
    }
    Ok(serde_yaml_ng::from_str(yaml)?)
}

/// Load configuration from file; a missing file yields the defaults
pub fn load_config(path: Option<&str>) -> Result<Config, ConfigError> {
    let config_paths = if let Some(p) = path {
        vec![PathBuf::from(p)]
    } else {
        let mut paths = vec![PathBuf::from(CONFIG_FILE_NAME)];
        if let Some(dir) = exe_dir() {
            paths.push(dir.join(CONFIG_FILE_NAME));
        }
        paths
    };

    for config_path in config_paths {
        if config_path.exists() {
            let content = fs::read_to_string(&config_path)?;
            return parse_config(&content);
        }
    }

    Ok(Config::default())
}

// ============== Unit Tests ==============
