//! Preferences persistence and precedence.

use pretty_assertions::assert_eq;
use serial_test::serial;
use serial_ws_bridge::config::{Config, ConfigError, ConfigLoader, Wizard};
use std::env;
use std::io::Cursor;

#[test]
#[serial]
fn test_first_run_writes_default_preferences() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join(".preferences.toml");

    let loader = ConfigLoader::load(Some(&path)).unwrap();
    loader.save_if_missing().unwrap();

    let written = std::fs::read_to_string(&path).unwrap();
    let parsed: Config = toml::from_str(&written).unwrap();
    assert_eq!(parsed, Config::default());
}

#[test]
#[serial]
fn test_existing_preferences_are_not_rewritten() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("prefs.toml");
    std::fs::write(&path, "# hand edited\n[server]\nport = 6310\n").unwrap();

    let loader = ConfigLoader::load(Some(&path)).unwrap();
    loader.save_if_missing().unwrap();

    assert_eq!(loader.config().server.port, 6310);
    assert!(std::fs::read_to_string(&path).unwrap().starts_with("# hand edited"));
}

#[test]
#[serial]
fn test_config_env_var_locates_file() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("elsewhere.toml");
    std::fs::write(&path, "[device]\nindex = 4\n").unwrap();
    env::set_var("SERIAL_BRIDGE_CONFIG", &path);

    let loader = ConfigLoader::load(None).unwrap();

    env::remove_var("SERIAL_BRIDGE_CONFIG");
    assert!(loader.from_file);
    assert_eq!(loader.config_path, path);
    assert_eq!(loader.config().mcu().unwrap().nickname_determiner, "a Pico");
}

#[test]
#[serial]
fn test_environment_beats_file() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("prefs.toml");
    std::fs::write(&path, "[device]\nindex = 0\n[server]\nport = 6310\n").unwrap();
    env::set_var("SERIAL_BRIDGE_DEVICE_INDEX", "2");

    let loader = ConfigLoader::load(Some(&path)).unwrap();

    env::remove_var("SERIAL_BRIDGE_DEVICE_INDEX");
    assert_eq!(loader.config().device.index, 2);
    assert_eq!(loader.config().server.port, 6310);
}

#[test]
#[serial]
fn test_out_of_range_file_value_fails_validation() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("prefs.toml");
    std::fs::write(&path, "[server]\nport = 8080\n").unwrap();

    let loader = ConfigLoader::load(Some(&path)).unwrap();
    assert!(matches!(
        loader.config().validate(),
        Err(ConfigError::ValidationError { ref key, .. }) if key == "server.port"
    ));
}

#[test]
#[serial]
fn test_wizard_answers_persist() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("prefs.toml");

    let mut loader = ConfigLoader::load(Some(&path)).unwrap();
    let mut prompts = Vec::new();
    let answers = Wizard::new(Cursor::new(&b"4\n6399\n1\n"[..]), &mut prompts)
        .run(loader.config())
        .unwrap();
    *loader.config_mut() = answers;
    loader.save().unwrap();

    let reloaded = ConfigLoader::load_from(&path).unwrap().into_config();
    assert_eq!(reloaded.device.index, 4);
    assert_eq!(reloaded.server.port, 6399);
    assert!(reloaded.bridge.verbose);
}
