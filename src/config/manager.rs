//! Configuration Manager

use super::Config;
use crate::Result;
use anyhow::{bail, Context};
use std::net::SocketAddr;
use std::path::Path;

/// Environment variable overriding the listen address
pub const ENV_BIND_ADDR: &str = "METRICS_INGEST_BIND_ADDR";
/// Environment variable overriding the chunk size
pub const ENV_BUFFER_SIZE: &str = "METRICS_INGEST_BUFFER_SIZE";
/// Environment variable overriding the log level
pub const ENV_LOG_LEVEL: &str = "METRICS_INGEST_LOG_LEVEL";

const MAX_BUFFER_SIZE: usize = 1_048_576;
const VALID_LOG_LEVELS: [&str; 5] = ["trace", "debug", "info", "warn", "error"];

/// Manages configuration loading and validation
pub struct ConfigManager;

impl ConfigManager {
    /// Load the process configuration: `path` layered over the environment,
    /// layered over the defaults.
    pub fn load(path: &Path) -> Result<Config> {
        Self::load_layered(path, |key| std::env::var(key).ok())
    }

    /// Load configuration from file, falling back to defaults for anything
    /// the file does not set
    pub fn load_from_file(path: &Path) -> Result<Config> {
        Self::load_layered(path, |_| None)
    }

    /// Load configuration from environment variables
    pub fn load_from_env() -> Result<Config> {
        Self::load_from_lookup(|key| std::env::var(key).ok())
    }

    /// Build a configuration from defaults plus whatever `lookup` returns
    /// for the known environment keys.
    pub fn load_from_lookup<F>(lookup: F) -> Result<Config>
    where
        F: Fn(&str) -> Option<String>,
    {
        let mut config = Config::default();
        Self::apply_env(&mut config, &lookup)?;

        config.validate()?;
        Ok(config)
    }

    /// Defaults, then the keys `lookup` returns, then every key present in
    /// the file at `path` (if it exists).
    pub fn load_layered<F>(path: &Path, lookup: F) -> Result<Config>
    where
        F: Fn(&str) -> Option<String>,
    {
        let mut config = Config::default();
        Self::apply_env(&mut config, &lookup)?;

        if path.exists() {
            config = Self::apply_file(config, path)?;
        } else {
            tracing::warn!(
                "Configuration file not found at {}, using environment and defaults",
                path.display()
            );
        }

        config
            .validate()
            .with_context(|| "Configuration validation failed")?;
        Ok(config)
    }

    fn apply_env<F>(config: &mut Config, lookup: &F) -> Result<()>
    where
        F: Fn(&str) -> Option<String>,
    {
        if let Some(bind_addr) = lookup(ENV_BIND_ADDR) {
            config.server.bind_addr = bind_addr
                .parse::<SocketAddr>()
                .with_context(|| format!("Invalid {}: {}", ENV_BIND_ADDR, bind_addr))?;
        }

        if let Some(buffer_size) = lookup(ENV_BUFFER_SIZE) {
            config.server.buffer_size = buffer_size
                .parse::<usize>()
                .with_context(|| format!("Invalid {}: {}", ENV_BUFFER_SIZE, buffer_size))?;
        }

        if let Some(log_level) = lookup(ENV_LOG_LEVEL) {
            config.logging.level = log_level;
        }

        Ok(())
    }

    fn apply_file(config: Config, path: &Path) -> Result<Config> {
        tracing::info!("Loading configuration from: {}", path.display());
        let content = std::fs::read_to_string(path)
            .with_context(|| format!("Failed to read config file: {}", path.display()))?;

        let overlay: toml::Table = toml::from_str(&content)
            .with_context(|| format!("Failed to parse config file: {}", path.display()))?;

        let mut merged = toml::Value::try_from(&config)
            .context("Failed to serialize base configuration")?;
        merge_toml(&mut merged, toml::Value::Table(overlay));

        merged
            .try_into()
            .with_context(|| format!("Failed to parse config file: {}", path.display()))
    }
}

/// Recursively overwrite `base` with every key present in `overlay`
fn merge_toml(base: &mut toml::Value, overlay: toml::Value) {
    match (base, overlay) {
        (toml::Value::Table(base), toml::Value::Table(overlay)) => {
            for (key, value) in overlay {
                match base.get_mut(&key) {
                    Some(existing) => merge_toml(existing, value),
                    None => {
                        base.insert(key, value);
                    }
                }
            }
        }
        (base, overlay) => *base = overlay,
    }
}

impl Config {
    /// Validate the configuration
    pub fn validate(&self) -> Result<()> {
        if self.server.buffer_size == 0 {
            bail!("server.buffer_size must be greater than 0");
        }

        if self.server.buffer_size > MAX_BUFFER_SIZE {
            bail!("server.buffer_size cannot exceed 1MB");
        }

        if !VALID_LOG_LEVELS.contains(&self.logging.level.as_str()) {
            bail!(
                "logging.level must be one of: {}",
                VALID_LOG_LEVELS.join(", ")
            );
        }

        Ok(())
    }

    /// Merge with CLI arguments
    pub fn merge_with_cli_args(
        &mut self,
        bind: Option<&str>,
        port: Option<u16>,
        buffer_size: Option<usize>,
        log_level: Option<&str>,
    ) -> Result<()> {
        if let Some(bind_str) = bind {
            let addr = bind_str
                .parse::<SocketAddr>()
                .with_context(|| format!("Invalid bind address: {}", bind_str))?;
            self.server.bind_addr = addr;
            tracing::info!("CLI override: bind address set to {}", addr);
        }

        if let Some(port) = port {
            self.server.bind_addr.set_port(port);
            tracing::info!("CLI override: port set to {}", port);
        }

        if let Some(buffer_size) = buffer_size {
            self.server.buffer_size = buffer_size;
            tracing::info!("CLI override: buffer size set to {} bytes", buffer_size);
        }

        if let Some(level) = log_level {
            self.logging.level = level.to_string();
        }

        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::{DEFAULT_BUFFER_SIZE, DEFAULT_PORT};
    use std::collections::HashMap;
    use std::io::Write;

    #[test]
    fn test_defaults_are_valid() {
        let config = Config::default();
        assert!(config.validate().is_ok());
        assert_eq!(config.server.bind_addr.port(), DEFAULT_PORT);
        assert_eq!(config.server.buffer_size, DEFAULT_BUFFER_SIZE);
        assert_eq!(config.logging.level, "info");
    }

    #[test]
    fn test_load_from_file() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        writeln!(
            file,
            "[server]\nbind_addr = \"127.0.0.1:9100\"\nbuffer_size = 2048\n\n[logging]\nlevel = \"debug\""
        )
        .unwrap();

        let config = ConfigManager::load_from_file(file.path()).unwrap();
        assert_eq!(config.server.bind_addr, "127.0.0.1:9100".parse().unwrap());
        assert_eq!(config.server.buffer_size, 2048);
        assert_eq!(config.logging.level, "debug");
    }

    #[test]
    fn test_partial_file_keeps_defaults() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        writeln!(file, "[server]\nbind_addr = \"127.0.0.1:9101\"").unwrap();

        let config = ConfigManager::load_from_file(file.path()).unwrap();
        assert_eq!(config.server.buffer_size, DEFAULT_BUFFER_SIZE);
        assert_eq!(config.logging.level, "info");
    }

    #[test]
    fn test_missing_file_uses_defaults() {
        let dir = tempfile::tempdir().unwrap();
        let config = ConfigManager::load_from_file(&dir.path().join("absent.toml")).unwrap();
        assert_eq!(config.server.bind_addr.port(), DEFAULT_PORT);
    }

    #[test]
    fn test_invalid_file_is_rejected() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        writeln!(file, "[server]\nbuffer_size = 0").unwrap();

        assert!(ConfigManager::load_from_file(file.path()).is_err());
    }

    #[test]
    fn test_file_layers_over_environment() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        writeln!(file, "[server]\nbind_addr = \"127.0.0.1:9102\"").unwrap();

        let vars: HashMap<&str, &str> = HashMap::from([
            (ENV_BIND_ADDR, "127.0.0.1:7001"),
            (ENV_LOG_LEVEL, "warn"),
        ]);
        let config =
            ConfigManager::load_layered(file.path(), |key| vars.get(key).map(|v| v.to_string()))
                .unwrap();

        // The file wins where it has a key, the environment fills the rest
        assert_eq!(config.server.bind_addr, "127.0.0.1:9102".parse().unwrap());
        assert_eq!(config.logging.level, "warn");
        assert_eq!(config.server.buffer_size, DEFAULT_BUFFER_SIZE);
    }

    #[test]
    fn test_file_can_fix_bad_environment_value() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        writeln!(file, "[server]\nbuffer_size = 2048").unwrap();

        let config = ConfigManager::load_layered(file.path(), |key| {
            (key == ENV_BUFFER_SIZE).then(|| "0".to_string())
        })
        .unwrap();
        assert_eq!(config.server.buffer_size, 2048);
    }

    #[test]
    fn test_missing_file_keeps_environment() {
        let dir = tempfile::tempdir().unwrap();
        let config = ConfigManager::load_layered(&dir.path().join("absent.toml"), |key| {
            (key == ENV_LOG_LEVEL).then(|| "error".to_string())
        })
        .unwrap();
        assert_eq!(config.logging.level, "error");
    }

    #[test]
    fn test_file_with_wrong_types_is_rejected() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        writeln!(file, "[server]\nbuffer_size = \"large\"").unwrap();

        assert!(ConfigManager::load_from_file(file.path()).is_err());
    }

    #[test]
    fn test_load_from_lookup() {
        let vars: HashMap<&str, &str> = HashMap::from([
            (ENV_BIND_ADDR, "127.0.0.1:7000"),
            (ENV_BUFFER_SIZE, "512"),
            (ENV_LOG_LEVEL, "warn"),
        ]);

        let config =
            ConfigManager::load_from_lookup(|key| vars.get(key).map(|v| v.to_string())).unwrap();
        assert_eq!(config.server.bind_addr, "127.0.0.1:7000".parse().unwrap());
        assert_eq!(config.server.buffer_size, 512);
        assert_eq!(config.logging.level, "warn");
    }

    #[test]
    fn test_load_from_lookup_rejects_bad_values() {
        let result = ConfigManager::load_from_lookup(|key| {
            (key == ENV_BUFFER_SIZE).then(|| "lots".to_string())
        });
        assert!(result.is_err());

        let result = ConfigManager::load_from_lookup(|key| {
            (key == ENV_LOG_LEVEL).then(|| "loud".to_string())
        });
        assert!(result.is_err());
    }

    #[test]
    fn test_cli_overrides() {
        let mut config = Config::default();
        config
            .merge_with_cli_args(Some("127.0.0.1:1234"), Some(4321), Some(4096), Some("trace"))
            .unwrap();

        assert_eq!(config.server.bind_addr, "127.0.0.1:4321".parse().unwrap());
        assert_eq!(config.server.buffer_size, 4096);
        assert_eq!(config.logging.level, "trace");
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_cli_rejects_bad_bind_address() {
        let mut config = Config::default();
        assert!(config
            .merge_with_cli_args(Some("not-an-address"), None, None, None)
            .is_err());
    }
}
