use prudence::core::config::{Config, SensorConfig, GLOBAL_KEY};
use std::fs;
use tempfile::TempDir;

fn write_config(dir: &TempDir, text: &str) -> std::path::PathBuf {
    let path = dir.path().join("custom.yml");
    fs::write(&path, text).unwrap();
    path
}

fn sensor(config: &Config, name: &str) -> SensorConfig {
    serde_yaml::from_value(serde_yaml::Value::Mapping(config.entries[name].clone())).unwrap()
}

#[test]
fn test_custom_file_overrides_single_field() {
    let dir = TempDir::new().unwrap();
    let path = write_config(&dir, "cpu:\n  min_warn: 42\n");

    let config = Config::load(Some(&path)).unwrap();
    let cpu = sensor(&config, "cpu");

    assert_eq!(cpu.min_warn, 42.0);
    assert_eq!(cpu.probe, "rs: cpu");
    assert_eq!(config.sources.last(), Some(&path));
}

#[test]
fn test_custom_file_appends_new_signal_last() {
    let dir = TempDir::new().unwrap();
    let path = write_config(&dir, "disk:\n  min_warn: 95\n  probe: df --output=pcent / | tail -1 | tr -d ' %'\n");

    let config = Config::load(Some(&path)).unwrap();
    assert_eq!(config.entries.keys().last().map(String::as_str), Some("disk"));
    assert_eq!(sensor(&config, "disk").min_warn, 95.0);
}

#[test]
fn test_custom_global_overrides_interval_only() {
    let dir = TempDir::new().unwrap();
    let path = write_config(&dir, "global:\n  interval: 2.5\n  search_path: [/opt/prudence]\n");

    let config = Config::load(Some(&path)).unwrap();
    let global = config.global().unwrap();

    assert!(config.entries.contains_key(GLOBAL_KEY));
    assert_eq!(global.interval, 2.5);
    assert_eq!(global.persist, 5.0);
    assert_eq!(global.search_path, vec![std::path::PathBuf::from("/opt/prudence")]);
}

#[test]
fn test_missing_custom_file_is_an_error() {
    let dir = TempDir::new().unwrap();
    let missing = dir.path().join("nope.yml");
    assert!(Config::load(Some(&missing)).is_err());
}

#[test]
fn test_invalid_yaml_is_an_error() {
    let dir = TempDir::new().unwrap();
    let path = write_config(&dir, "cpu: [unterminated\n");
    assert!(Config::load(Some(&path)).is_err());
}
