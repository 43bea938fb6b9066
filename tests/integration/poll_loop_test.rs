use parking_lot::Mutex;
use prudence::core::{AlertRegistry, Config, Notifier, PollLoop, Resolver, SearchPath};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use tempfile::TempDir;

#[derive(Default)]
struct Recorder {
    messages: Mutex<Vec<String>>,
    stop: Option<Arc<AtomicBool>>,
}

impl Notifier for Recorder {
    fn notify(&self, message: &str, _timeout_secs: f64) -> prudence::Result<()> {
        self.messages.lock().push(message.to_string());
        if let Some(stop) = &self.stop {
            stop.store(true, Ordering::Relaxed);
        }
        Ok(())
    }
}

fn poll(yaml: &str, dir: &TempDir) -> PollLoop {
    let config = Config::from_yaml_str(yaml).unwrap();
    let global = config.global().unwrap();
    let resolver = Resolver::new(SearchPath::new(vec![dir.path().to_path_buf()])).shared();
    let registry = AlertRegistry::build(&config.entries, resolver).unwrap();
    PollLoop::new(registry, global.interval, global.persist).unwrap()
}

#[cfg(unix)]
#[test]
fn test_tick_collects_script_alerts() {
    let dir = TempDir::new().unwrap();
    let mut poll = poll(
        "global:\n  interval: 0\n\
         hot:\n  alert: Hot\n  units: 'C'\n  min_warn: 50\n  probe: echo 80\n\
         cool:\n  alert: Cool\n  min_warn: 50\n  probe: echo 20\n\
         gone:\n  alert: Gone\n  min_warn: 1\n  probe: exit 3\n\
         full:\n  alert: Full\n  min_warn: 90\n  probe: echo 99\n",
        &dir,
    );

    assert_eq!(poll.tick().as_deref(), Some("Hot: 80.00C\nFull: 99.00"));
    assert!(!poll.registry().get("gone").unwrap().enabled);

    // Hysteresis keeps repeated values quiet
    assert_eq!(poll.tick(), None);
}

#[cfg(unix)]
#[test]
fn test_failing_command_disables_sensor_after_one_tick() {
    let dir = TempDir::new().unwrap();
    let counter = dir.path().join("runs");
    let yaml = format!(
        "bad:\n  min_warn: 1\n  probe: echo run >> {}; exit 3\n  fail_handle: fail\n",
        counter.display()
    );
    let mut poll = poll(&yaml, &dir);

    for _ in 0..3 {
        assert_eq!(poll.tick(), None);
    }
    assert!(!poll.registry().get("bad").unwrap().enabled);
    assert_eq!(std::fs::read_to_string(&counter).unwrap().lines().count(), 1);
}

#[test]
fn test_infinite_interval_is_rejected() {
    let config = Config::from_yaml_str("global:\n  interval: .inf\n").unwrap();
    let global = config.global().unwrap();
    let registry = AlertRegistry::build(&config.entries, Resolver::default().shared()).unwrap();
    assert!(PollLoop::new(registry, global.interval, global.persist).is_err());
}

#[cfg(unix)]
#[test]
fn test_run_notifies_until_interrupted() {
    let dir = TempDir::new().unwrap();
    let mut poll = poll(
        "global:\n  interval: 0.05\n  persist: 0\n\
         hot:\n  alert: Hot\n  min_warn: 50\n  probe: echo 80\n",
        &dir,
    );
    let recorder = Recorder {
        stop: Some(poll.cancel_flag()),
        ..Default::default()
    };

    poll.run(&recorder).unwrap();
    assert_eq!(*recorder.messages.lock(), vec!["Hot: 80.00".to_string()]);
}

#[test]
fn test_run_returns_immediately_when_already_cancelled() {
    let dir = TempDir::new().unwrap();
    let mut poll = poll("global:\n  interval: 60\n", &dir);
    poll.cancel_flag().store(true, Ordering::Relaxed);

    let recorder = Recorder::default();
    poll.run(&recorder).unwrap();
    assert!(recorder.messages.lock().is_empty());
}
