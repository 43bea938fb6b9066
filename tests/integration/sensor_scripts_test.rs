#![cfg(unix)]

use prudence::core::{Reading, Resolver, SearchPath, Sensor, SensorConfig, SharedResolver};
use std::fs;
use std::path::Path;
use tempfile::TempDir;

fn resolver(dir: &Path) -> SharedResolver {
    Resolver::new(SearchPath::new(vec![dir.to_path_buf()])).shared()
}

fn sensor(yaml: &str, resolver: SharedResolver) -> Sensor {
    let config: SensorConfig = serde_yaml::from_str(yaml).unwrap();
    Sensor::from_config("test", &config, resolver).unwrap()
}

#[test]
fn test_inline_probe_alerts_with_units() {
    let dir = TempDir::new().unwrap();
    let mut sensor = sensor(
        "alert: Disk\nunits: '%'\nmin_warn: 80\nwarn_res: 5\nprobe: echo 91\n",
        resolver(dir.path()),
    );

    let msg = sensor.evaluate(None).unwrap().unwrap();
    assert_eq!(msg.to_string(), "Disk: 91.00%");
    assert_eq!(sensor.next_warn(), 96.0);

    // Same value again stays below the raised threshold
    assert_eq!(sensor.evaluate(None).unwrap(), None);
}

#[test]
fn test_silent_probe_disables_sensor() {
    let dir = TempDir::new().unwrap();
    let mut sensor = sensor("min_warn: 1\nprobe: 'true'\n", resolver(dir.path()));

    assert!(sensor.enabled);
    assert_eq!(sensor.evaluate(None).unwrap(), None);
    assert!(!sensor.enabled);
}

#[test]
fn test_boolean_probe_output() {
    let dir = TempDir::new().unwrap();
    let shared = resolver(dir.path());

    let mut firing = sensor("alert: Fan\nmin_warn: 1\nprobe: echo true\n", shared.clone());
    assert_eq!(firing.evaluate(None).unwrap().unwrap().to_string(), "Fan: alert");

    let mut quiet = sensor("alert: Fan\nmin_warn: 1\nprobe: echo false\n", shared);
    assert_eq!(quiet.evaluate(None).unwrap(), None);
    assert!(quiet.enabled);
}

#[test]
fn test_shell_function_probe_with_arguments() {
    let dir = TempDir::new().unwrap();
    fs::write(
        dir.path().join("signals.sh"),
        "scaled() {\n  echo $(( $1 * $2 ))\n}\n",
    )
    .unwrap();

    let mut sensor = sensor(
        "alert: Scaled\nmin_warn: 10\nprobe: 'sh: signals:scaled:6:7'\n",
        resolver(dir.path()),
    );
    let msg = sensor.evaluate(None).unwrap().unwrap();
    assert_eq!(msg.to_string(), "Scaled: 42.00");
}

#[test]
fn test_missing_shell_function_disables_at_construction() {
    let dir = TempDir::new().unwrap();
    fs::write(dir.path().join("signals.sh"), "other() { echo 1; }\n").unwrap();

    let sensor = sensor("min_warn: 1\nprobe: 'sh: signals:absent'\n", resolver(dir.path()));
    assert!(!sensor.enabled);
}

#[test]
fn test_panic_runs_only_when_alert_fires() {
    let dir = TempDir::new().unwrap();
    let marker = dir.path().join("panicked");
    let yaml = format!(
        "min_warn: 50\nprobe: echo 10\npanic: echo fired >> {}\n",
        marker.display()
    );
    let mut sensor = sensor(&yaml, resolver(dir.path()));

    assert_eq!(sensor.evaluate(None).unwrap(), None);
    assert!(!marker.exists());

    assert!(sensor.evaluate(Some(Reading::Number(60.0))).unwrap().is_some());
    assert_eq!(fs::read_to_string(&marker).unwrap().trim(), "fired");
}

#[test]
fn test_failing_panic_still_reports_alert() {
    let dir = TempDir::new().unwrap();
    let mut sensor = sensor(
        "alert: Temp\nmin_warn: 50\nprobe: echo 70\npanic: 'sh: missing:suspend'\n",
        resolver(dir.path()),
    );

    let msg = sensor.evaluate(None).unwrap().unwrap();
    assert_eq!(msg.to_string(), "Temp: 70.00");
}

#[test]
fn test_script_alert_check_and_reset() {
    let dir = TempDir::new().unwrap();
    fs::write(
        dir.path().join("rules.sh"),
        "# args: value next_warn min_warn warn_res reverse\n\
         check() {\n  if [ \"$1\" -gt \"$2\" ]; then echo \"true $(( $1 + 10 ))\"; else echo false; fi\n}\n\
         reset() {\n  if [ \"$1\" -lt \"$3\" ]; then echo \"$3\"; fi\n}\n",
    )
    .unwrap();

    let mut sensor = sensor(
        "min_warn: 50\nprobe: 'false'\nalert_check: 'sh: rules:check'\nattempt_reset: 'sh: rules:reset'\n",
        resolver(dir.path()),
    );

    assert!(sensor.evaluate(Some(Reading::Number(60.0))).unwrap().is_some());
    assert_eq!(sensor.next_warn(), 70.0);

    assert!(sensor.evaluate(Some(Reading::Number(65.0))).unwrap().is_none());
    assert_eq!(sensor.next_warn(), 70.0);

    assert!(sensor.evaluate(Some(Reading::Number(40.0))).unwrap().is_none());
    assert_eq!(sensor.next_warn(), 50.0);
}

#[test]
fn test_same_descriptor_shares_one_script() {
    let dir = TempDir::new().unwrap();
    let shared = resolver(dir.path());

    let _a = sensor("min_warn: 1\nprobe: echo 5\n", shared.clone());
    let _b = sensor("min_warn: 2\nprobe: echo 5\n", shared.clone());
    let _c = sensor("min_warn: 2\nprobe: echo 6\n", shared.clone());

    assert_eq!(shared.lock().cached(), 2);
}

#[test]
fn test_probe_timeout_is_reported() {
    let dir = TempDir::new().unwrap();
    let mut sensor = sensor(
        "min_warn: 1\nprobe: sleep 5\ntimeout: 0.2\n",
        resolver(dir.path()),
    );

    let err = sensor.evaluate(None).unwrap_err();
    assert!(matches!(err, prudence::PrudenceError::Timeout { .. }));
    assert!(!sensor.enabled);
}

#[test]
fn test_python_entrypoint_probe() {
    if which::which("python3").is_err() {
        return;
    }
    let dir = TempDir::new().unwrap();
    fs::write(
        dir.path().join("metrics.py"),
        "def doubled(x):\n    return float(x) * 2\n",
    )
    .unwrap();

    let mut sensor = sensor(
        "alert: Py\nmin_warn: 5\nprobe: 'py: metrics:doubled:4'\n",
        resolver(dir.path()),
    );
    let msg = sensor.evaluate(None).unwrap().unwrap();
    assert_eq!(msg.to_string(), "Py: 8.00");
}
