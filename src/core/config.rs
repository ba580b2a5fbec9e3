//! Configuration management for the MCP server.
//!
//! This module provides a centralized configuration structure that can be
//! populated from environment variables, configuration files, or defaults.

use super::transport::TransportConfig;
use serde::{Deserialize, Serialize};
use std::path::PathBuf;
use std::str::FromStr;
use std::time::Duration;
use tracing::{info, warn};

/// Main configuration structure for the MCP server.
///
/// This struct contains all configurable aspects of the server, organized
/// by domain for clarity and maintainability.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Config {
    /// Server identification and metadata.
    pub server: ServerConfig,

    /// Plugin bundle storage and loading configuration.
    pub plugins: PluginsConfig,

    /// Expression tool configuration.
    pub expressions: ExpressionsConfig,

    /// Logging configuration.
    pub logging: LoggingConfig,

    /// Transport configuration.
    pub transport: TransportConfig,

    /// Security and path validation configuration.
    pub security: SecurityConfig,
}

/// Server identification configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ServerConfig {
    /// The name of the server as reported to clients.
    pub name: String,

    /// The version of the server.
    pub version: String,
}

/// Configuration for the plugins domain.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PluginsConfig {
    /// Directory uploaded bundles are written to.
    pub storage_dir: PathBuf,

    /// Load every bundle already present in `storage_dir` at startup.
    pub autoload: bool,

    /// Largest bundle accepted, in bytes.
    pub max_bundle_bytes: u64,

    /// Fuel granted to each call into a loading unit.
    pub fuel_per_call: u64,

    /// Upper bound for bundle transfer, deletion and unit disposal.
    pub io_timeout_secs: u64,
}

impl PluginsConfig {
    /// The I/O timeout as a [`Duration`].
    pub fn io_timeout(&self) -> Duration {
        Duration::from_secs(self.io_timeout_secs.max(1))
    }
}

/// Configuration for the expression tools domain.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ExpressionsConfig {
    /// Longest expression text the executor will parse.
    pub max_expression_len: usize,
}

/// Logging configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LoggingConfig {
    /// Log level filter (e.g., "info", "debug", "trace").
    pub level: String,
}

/// Configuration for security and path validation.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SecurityConfig {
    /// Only load bundles that resolve inside the plugin storage directory.
    pub restrict_bundles_to_storage: bool,

    /// Whether a bundle path may be a symlink.
    /// The symlink target must still resolve inside the storage directory.
    pub allow_symlinks: bool,
}

impl Default for PluginsConfig {
    fn default() -> Self {
        Self {
            storage_dir: PathBuf::from("./data/plugins"),
            autoload: false,
            max_bundle_bytes: 16 * 1024 * 1024,
            fuel_per_call: 10_000_000,
            io_timeout_secs: 30,
        }
    }
}

impl Default for ExpressionsConfig {
    fn default() -> Self {
        Self {
            max_expression_len: 4096,
        }
    }
}

impl Default for SecurityConfig {
    fn default() -> Self {
        Self {
            restrict_bundles_to_storage: true,
            allow_symlinks: false,
        }
    }
}

impl Default for Config {
    fn default() -> Self {
        Self {
            server: ServerConfig {
                name: "dynamic-mcp-server".to_string(),
                version: env!("CARGO_PKG_VERSION").to_string(),
            },
            plugins: PluginsConfig::default(),
            expressions: ExpressionsConfig::default(),
            logging: LoggingConfig {
                level: "info".to_string(),
            },
            transport: TransportConfig::default(),
            security: SecurityConfig::default(),
        }
    }
}

impl Config {
    /// Create a new configuration with default values.
    pub fn new() -> Self {
        Self::default()
    }

    /// Load configuration from environment variables.
    ///
    /// Environment variables are expected to be prefixed with `MCP_`.
    /// For example: `MCP_SERVER_NAME`, `MCP_PLUGINS_DIR`.
    pub fn from_env() -> Self {
        dotenvy::dotenv().ok();

        let mut config = Self::default();

        if let Ok(name) = std::env::var("MCP_SERVER_NAME") {
            config.server.name = name;
        }

        if let Ok(level) = std::env::var("MCP_LOG_LEVEL") {
            config.logging.level = level;
        }

        config.transport = TransportConfig::from_env();

        // Plugins
        if let Ok(dir) = std::env::var("MCP_PLUGINS_DIR") {
            config.plugins.storage_dir = PathBuf::from(dir);
        }
        info!("Plugin storage directory: {:?}", config.plugins.storage_dir);

        config.plugins.autoload = env_or("MCP_PLUGINS_AUTOLOAD", config.plugins.autoload);
        config.plugins.max_bundle_bytes =
            env_or("MCP_PLUGINS_MAX_BYTES", config.plugins.max_bundle_bytes);
        config.plugins.fuel_per_call = env_or("MCP_PLUGINS_FUEL", config.plugins.fuel_per_call);
        config.plugins.io_timeout_secs =
            env_or("MCP_PLUGINS_IO_TIMEOUT_SECS", config.plugins.io_timeout_secs);

        // Expressions
        config.expressions.max_expression_len = env_or(
            "MCP_EXPRESSION_MAX_LEN",
            config.expressions.max_expression_len,
        );

        // Security
        config.security.restrict_bundles_to_storage = env_or(
            "MCP_RESTRICT_BUNDLES",
            config.security.restrict_bundles_to_storage,
        );
        if !config.security.restrict_bundles_to_storage {
            warn!(
                "MCP_RESTRICT_BUNDLES=false - bundles may be loaded from anywhere on the filesystem"
            );
        }
        config.security.allow_symlinks =
            env_or("MCP_ALLOW_SYMLINKS", config.security.allow_symlinks);

        config
    }
}

/// Read and parse an environment variable, keeping `default` when it is
/// unset or unparseable.
pub(crate) fn env_or<T>(key: &str, default: T) -> T
where
    T: FromStr + std::fmt::Debug,
{
    match std::env::var(key) {
        Ok(raw) => match raw.trim().parse() {
            Ok(value) => value,
            Err(_) => {
                warn!("Ignoring {}={:?}: not a valid value, using {:?}", key, raw, default);
                default
            }
        },
        Err(_) => default,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Mutex;

    // Mutex to ensure env var tests run serially
    static ENV_TEST_LOCK: Mutex<()> = Mutex::new(());

    #[test]
    fn test_plugins_from_env() {
        let _lock = ENV_TEST_LOCK.lock().unwrap();
        unsafe {
            std::env::set_var("MCP_PLUGINS_DIR", "/tmp/bundles");
            std::env::set_var("MCP_PLUGINS_AUTOLOAD", "true");
            std::env::set_var("MCP_PLUGINS_FUEL", "5000");
        }
        let config = Config::from_env();
        assert_eq!(config.plugins.storage_dir, PathBuf::from("/tmp/bundles"));
        assert!(config.plugins.autoload);
        assert_eq!(config.plugins.fuel_per_call, 5000);
        unsafe {
            std::env::remove_var("MCP_PLUGINS_DIR");
            std::env::remove_var("MCP_PLUGINS_AUTOLOAD");
            std::env::remove_var("MCP_PLUGINS_FUEL");
        }
    }

    #[test]
    fn test_unparseable_value_falls_back_to_default() {
        let _lock = ENV_TEST_LOCK.lock().unwrap();
        unsafe {
            std::env::set_var("MCP_PLUGINS_MAX_BYTES", "lots");
        }
        let config = Config::from_env();
        assert_eq!(
            config.plugins.max_bundle_bytes,
            PluginsConfig::default().max_bundle_bytes
        );
        unsafe {
            std::env::remove_var("MCP_PLUGINS_MAX_BYTES");
        }
    }

    #[test]
    fn test_security_defaults_are_restrictive() {
        let config = Config::default();
        assert!(config.security.restrict_bundles_to_storage);
        assert!(!config.security.allow_symlinks);
    }

    #[test]
    fn test_io_timeout_never_zero() {
        let plugins = PluginsConfig {
            io_timeout_secs: 0,
            ..Default::default()
        };
        assert_eq!(plugins.io_timeout(), Duration::from_secs(1));
    }
}
