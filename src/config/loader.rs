//! Preferences loader with file resolution and environment override support.

use super::error::{ConfigError, ConfigResult};
use super::schema::Config;
use std::path::{Path, PathBuf};

/// Environment variable prefix for overrides
const ENV_PREFIX: &str = "SERIAL_BRIDGE";

/// Preferences file name
const CONFIG_FILE_NAME: &str = "preferences.toml";

/// Preferences file kept next to where the bridge is run
const LOCAL_CONFIG_FILE: &str = ".preferences.toml";

/// Environment variable for explicit config path
const CONFIG_PATH_ENV: &str = "SERIAL_BRIDGE_CONFIG";

/// Configuration loader with resolution and override logic.
#[derive(Debug, Clone)]
pub struct ConfigLoader {
    /// Where the configuration lives or will be saved
    pub config_path: PathBuf,
    /// Whether `config_path` existed when loading
    pub from_file: bool,
    /// The loaded configuration
    pub config: Config,
}

impl ConfigLoader {
    /// Load configuration using standard resolution order.
    ///
    /// Resolution priority (highest to lowest):
    /// 1. `explicit` path (the `--config` flag)
    /// 2. `SERIAL_BRIDGE_CONFIG` environment variable
    /// 3. `./.preferences.toml`
    /// 4. `<platform config dir>/serial-ws-bridge/preferences.toml`
    /// 5. Built-in defaults (saved to `./.preferences.toml`)
    ///
    /// Environment variables override file values.
    pub fn load(explicit: Option<&Path>) -> ConfigResult<Self> {
        let (config_path, from_file) = match explicit {
            Some(path) => (path.to_path_buf(), path.exists()),
            None => match resolve_config_path() {
                Some(path) => (path, true),
                None => (PathBuf::from(LOCAL_CONFIG_FILE), false),
            },
        };

        let mut config = if from_file {
            load_from_file(&config_path)?
        } else {
            Config::default()
        };

        apply_env_overrides(&mut config)?;

        Ok(Self {
            config_path,
            from_file,
            config,
        })
    }

    /// Load configuration from a specific file path, which must exist.
    pub fn load_from(path: impl AsRef<Path>) -> ConfigResult<Self> {
        let path = path.as_ref().to_path_buf();
        let mut config = load_from_file(&path)?;
        apply_env_overrides(&mut config)?;

        Ok(Self {
            config_path: path,
            from_file: true,
            config,
        })
    }

    /// Create a loader with default configuration (no file read).
    pub fn with_defaults() -> Self {
        let mut config = Config::default();
        // Still apply env overrides even with defaults
        let _ = apply_env_overrides(&mut config);

        Self {
            config_path: PathBuf::from(LOCAL_CONFIG_FILE),
            from_file: false,
            config,
        }
    }

    /// Get the loaded configuration.
    pub fn config(&self) -> &Config {
        &self.config
    }

    /// Get a mutable reference to the configuration.
    pub fn config_mut(&mut self) -> &mut Config {
        &mut self.config
    }

    /// Consume the loader and return the configuration.
    pub fn into_config(self) -> Config {
        self.config
    }

    /// Save the current configuration to its file, creating it if needed.
    pub fn save(&self) -> ConfigResult<()> {
        save_to_file(&self.config, &self.config_path)
    }

    /// Write the file only if it did not exist when loading.
    pub fn save_if_missing(&self) -> ConfigResult<()> {
        if self.from_file {
            return Ok(());
        }
        self.save()
    }
}

/// Resolve the preferences file path using standard locations.
pub fn resolve_config_path() -> Option<PathBuf> {
    // 1. Explicit environment variable
    if let Ok(path) = std::env::var(CONFIG_PATH_ENV) {
        let path = PathBuf::from(path);
        if path.exists() {
            return Some(path);
        }
    }

    // 2. Current directory
    let local = PathBuf::from(LOCAL_CONFIG_FILE);
    if local.exists() {
        return Some(local);
    }

    // 3. Platform config directory
    if let Some(app_config) = get_default_config_path() {
        if app_config.exists() {
            return Some(app_config);
        }
    }

    None
}

/// Get the platform-specific config file path.
pub fn get_default_config_path() -> Option<PathBuf> {
    directories::ProjectDirs::from("", "", "serial-ws-bridge")
        .map(|dirs| dirs.config_dir().join(CONFIG_FILE_NAME))
}

/// Load configuration from a file.
fn load_from_file(path: &Path) -> ConfigResult<Config> {
    let content = std::fs::read_to_string(path).map_err(|e| ConfigError::ReadError {
        path: path.to_path_buf(),
        source: e,
    })?;

    toml::from_str(&content).map_err(ConfigError::ParseError)
}

/// Save configuration to a file.
fn save_to_file(config: &Config, path: &Path) -> ConfigResult<()> {
    if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
        std::fs::create_dir_all(parent).map_err(|e| ConfigError::WriteError {
            path: path.to_path_buf(),
            source: e,
        })?;
    }

    let content = toml::to_string_pretty(config)?;
    std::fs::write(path, content).map_err(|e| ConfigError::WriteError {
        path: path.to_path_buf(),
        source: e,
    })
}

fn env_var(key: &str) -> Option<(String, String)> {
    let name = format!("{}_{}", ENV_PREFIX, key);
    std::env::var(&name).ok().map(|val| (name, val))
}

/// Apply environment variable overrides to the configuration.
///
/// Environment variables follow the pattern: `SERIAL_BRIDGE_<SECTION>_<KEY>`
/// For example:
/// - `SERIAL_BRIDGE_DEVICE_INDEX=3`
/// - `SERIAL_BRIDGE_SERVER_PORT=6310`
/// - `SERIAL_BRIDGE_BRIDGE_VERBOSE=1`
/// - `SERIAL_BRIDGE_LOGGING_LEVEL=debug`
fn apply_env_overrides(config: &mut Config) -> ConfigResult<()> {
    if let Some((name, val)) = env_var("DEVICE_INDEX") {
        config.device.index = val
            .parse()
            .map_err(|_| ConfigError::env_parse(name, "Invalid device index"))?;
    }
    if let Some((name, val)) = env_var("SERVER_PORT") {
        config.server.port = val
            .parse()
            .map_err(|_| ConfigError::env_parse(name, "Invalid port number"))?;
    }
    if let Some((name, val)) = env_var("BRIDGE_VERBOSE") {
        config.bridge.verbose = match val.to_lowercase().as_str() {
            "1" | "true" => true,
            "0" | "false" => false,
            _ => return Err(ConfigError::env_parse(name, "Expected 0, 1, true or false")),
        };
    }
    if let Some((_, val)) = env_var("LOGGING_LEVEL") {
        config.logging.level = val;
    }

    Ok(())
}
