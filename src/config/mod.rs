//! Preferences for the bridge.
//!
//! TOML-based configuration with environment variable overrides and an
//! interactive wizard.
//!
//! # Configuration Resolution
//!
//! Preferences are loaded from the following locations (in order of priority):
//!
//! 1. The `--config` command-line flag
//! 2. `SERIAL_BRIDGE_CONFIG` environment variable (explicit path)
//! 3. `./.preferences.toml` (current directory)
//! 4. `~/.config/serial-ws-bridge/preferences.toml` (XDG on Linux/macOS)
//! 5. `%APPDATA%\serial-ws-bridge\preferences.toml` (Windows)
//! 6. Built-in defaults, written to `./.preferences.toml` on first run
//!
//! # Environment Overrides
//!
//! The pattern is: `SERIAL_BRIDGE_<SECTION>_<KEY>`
//!
//! Examples:
//! - `SERIAL_BRIDGE_DEVICE_INDEX=3`
//! - `SERIAL_BRIDGE_SERVER_PORT=6310`
//! - `SERIAL_BRIDGE_BRIDGE_VERBOSE=1`
//!
//! # Example
//!
//! ```rust,no_run
//! use serial_ws_bridge::config::ConfigLoader;
//!
//! let loader = ConfigLoader::load(None)?;
//! let config = loader.config();
//! config.validate()?;
//!
//! println!("WebSocket port: {}", config.server.port);
//! # Ok::<(), serial_ws_bridge::config::ConfigError>(())
//! ```

mod error;
mod loader;
mod schema;
mod wizard;

pub use error::{ConfigError, ConfigResult};
pub use loader::{get_default_config_path, resolve_config_path, ConfigLoader};
pub use schema::{
    BridgeConfig, Config, DeviceConfig, LogFormat, LoggingConfig, ServerConfig, DEFAULT_PORT,
    PORT_RANGE,
};
pub use wizard::Wizard;
