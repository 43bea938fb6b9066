use prudence::core::{AlertRegistry, Config, Resolver, SearchPath};
use prudence::PrudenceError;
use tempfile::TempDir;

fn registry(yaml: &str, dirs: Vec<std::path::PathBuf>) -> prudence::Result<AlertRegistry> {
    let config = Config::from_yaml_str(yaml).unwrap();
    AlertRegistry::build(&config.entries, Resolver::new(SearchPath::new(dirs)).shared())
}

#[test]
fn test_shipped_alerts_build() {
    let config = Config::load(None).unwrap();
    let registry = AlertRegistry::build(&config.entries, Resolver::default().shared()).unwrap();

    assert!(registry.get("global").is_none());
    assert!(registry.get("cpu").is_some());
    let battery = registry.get("battery").unwrap();
    assert!(battery.reverse());
    assert_eq!(battery.units, "%");
}

#[test]
fn test_order_follows_configuration() {
    let registry = registry(
        "zeta:\n  min_warn: 1\n  probe: 'rs: cpu'\n\
         alpha:\n  min_warn: 1\n  probe: 'rs: memory'\n\
         mid:\n  min_warn: 1\n  probe: 'rs: load:15'\n",
        vec![],
    )
    .unwrap();
    assert_eq!(registry.names(), vec!["zeta", "alpha", "mid"]);
}

#[test]
fn test_missing_script_disables_sensor_only() {
    let dir = TempDir::new().unwrap();
    let registry = registry(
        "ghost:\n  min_warn: 1\n  probe: 'sh: nowhere:probe'\n\
         cpu:\n  min_warn: 1\n  probe: 'rs: cpu'\n",
        vec![dir.path().to_path_buf()],
    )
    .unwrap();

    assert!(!registry.get("ghost").unwrap().enabled);
    assert!(registry.get("cpu").unwrap().enabled);
}

#[test]
fn test_unknown_builtin_disables_sensor() {
    let registry = registry("fan:\n  min_warn: 1\n  probe: 'rs: fan_speed'\n", vec![]).unwrap();
    assert!(!registry.get("fan").unwrap().enabled);
}

#[test]
fn test_malformed_descriptor_aborts_build() {
    let err = registry("odd:\n  min_warn: 1\n  probe: 'py: '\n", vec![]).unwrap_err();
    assert!(matches!(err, PrudenceError::Config(_)));
}

#[test]
fn test_bad_field_type_aborts_build() {
    let err = registry("cpu:\n  min_warn: high\n  probe: 'rs: cpu'\n", vec![]).unwrap_err();
    assert!(matches!(err, PrudenceError::Config(_)));
}
