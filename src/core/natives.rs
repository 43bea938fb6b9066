//! Built-in behaviors addressed by `rs: name:args` descriptors.
//!
//! Only the functions registered here can be called in-process.

use std::sync::atomic::{AtomicBool, Ordering};

use battery::units::ratio::percent;
use battery::units::time::minute;
use once_cell::sync::Lazy;
use parking_lot::Mutex;
use sysinfo::{Components, System};

use crate::core::hysteresis::{default_alert_check, default_attempt_reset, Threshold};
use crate::core::notify::{DesktopNotifier, Notifier};
use crate::core::sensor::{ProbeResult, Reading};
use crate::core::shell::{process_comm, FailHandle, RunOptions, Wait};
use crate::error::{PrudenceError, Result};

pub type NativeProbe = fn(&[String]) -> Result<ProbeResult>;
pub type NativePanic = fn(&[String]) -> Result<()>;
pub type NativeCheck = fn(Threshold, &Reading) -> Result<(bool, Threshold)>;
pub type NativeReset = fn(Threshold, &Reading) -> Result<Threshold>;

/// Shared sysinfo handle; CPU usage needs two refreshes over time
static SYSTEM: Lazy<Mutex<System>> = Lazy::new(|| Mutex::new(System::new()));
static CPU_PRIMED: AtomicBool = AtomicBool::new(false);

pub fn probe(name: &str) -> Option<NativeProbe> {
    match name {
        "cpu" => Some(cpu),
        "memory" => Some(memory),
        "load" => Some(load),
        "temperature" => Some(temperature),
        "battery_charge" => Some(battery_charge),
        "battery_discharge" => Some(battery_discharge),
        _ => None,
    }
}

pub fn panic(name: &str) -> Option<NativePanic> {
    match name {
        "noop" => Some(noop),
        "battery_suspend" => Some(battery_suspend),
        _ => None,
    }
}

pub fn alert_check(name: &str) -> Option<NativeCheck> {
    match name {
        "hysteresis" => Some(default_alert_check),
        _ => None,
    }
}

pub fn attempt_reset(name: &str) -> Option<NativeReset> {
    match name {
        "hysteresis" => Some(default_attempt_reset),
        _ => None,
    }
}

/// Names of every built-in, for `prudence list --builtins`
pub fn names() -> Vec<(&'static str, &'static str)> {
    vec![
        ("cpu", "probe"),
        ("memory", "probe"),
        ("load", "probe"),
        ("temperature", "probe"),
        ("battery_charge", "probe"),
        ("battery_discharge", "probe"),
        ("noop", "panic"),
        ("battery_suspend", "panic"),
        ("hysteresis", "alert_check, attempt_reset"),
    ]
}

/// CPU usage (%)
fn cpu(_args: &[String]) -> Result<ProbeResult> {
    let mut sys = SYSTEM.lock();
    sys.refresh_cpu_usage();
    if !CPU_PRIMED.swap(true, Ordering::Relaxed) {
        std::thread::sleep(sysinfo::MINIMUM_CPU_UPDATE_INTERVAL);
        sys.refresh_cpu_usage();
    }
    Ok(ProbeResult::Value(sys.global_cpu_usage() as f64))
}

/// RAM usage (%)
fn memory(_args: &[String]) -> Result<ProbeResult> {
    let mut sys = SYSTEM.lock();
    sys.refresh_memory();
    let total = sys.total_memory();
    if total == 0 {
        return Ok(ProbeResult::Disabled);
    }
    Ok(ProbeResult::Value(sys.used_memory() as f64 * 100.0 / total as f64))
}

/// Load average per core (%), over 1, 5 or 15 minutes
fn load(args: &[String]) -> Result<ProbeResult> {
    let average = System::load_average();
    let value = match args.first().map(String::as_str) {
        Some("5") => average.five,
        Some("15") => average.fifteen,
        _ => average.one,
    };

    let mut sys = SYSTEM.lock();
    sys.refresh_cpu_usage();
    let cores = sys.cpus().len().max(1);
    Ok(ProbeResult::Value(value * 100.0 / cores as f64))
}

/// Temperature (°C) of the first component whose label contains the
/// argument (default `coretemp`)
fn temperature(args: &[String]) -> Result<ProbeResult> {
    let wanted = args.first().map(String::as_str).unwrap_or("coretemp");
    let components = Components::new_with_refreshed_list();

    let reading = components
        .iter()
        .filter(|comp| comp.label().contains(wanted))
        .find_map(|comp| comp.temperature());

    Ok(match reading {
        Some(celsius) => ProbeResult::Value(celsius as f64),
        None => ProbeResult::Disabled,
    })
}

struct BatteryStatus {
    plugged: bool,
    percent: f64,
    minutes_left: Option<f64>,
}

fn battery_status() -> Result<Option<BatteryStatus>> {
    let manager = battery::Manager::new().map_err(battery_error)?;
    let mut batteries = manager.batteries().map_err(battery_error)?;

    let Some(battery) = batteries.next() else {
        return Ok(None);
    };
    let battery = battery.map_err(battery_error)?;

    let plugged = !matches!(
        battery.state(),
        battery::State::Discharging | battery::State::Empty
    );
    Ok(Some(BatteryStatus {
        plugged,
        percent: battery.state_of_charge().get::<percent>() as f64,
        minutes_left: battery.time_to_empty().map(|t| t.get::<minute>() as f64),
    }))
}

fn battery_error(e: battery::Error) -> PrudenceError {
    PrudenceError::Io(std::io::Error::other(e.to_string()))
}

/// Charge (%) while plugged in, suppressed on battery
fn battery_charge(_args: &[String]) -> Result<ProbeResult> {
    Ok(match battery_status()? {
        None => ProbeResult::Disabled,
        Some(status) if !status.plugged => ProbeResult::Suppressed,
        Some(status) => ProbeResult::Value(status.percent),
    })
}

/// Charge (%) while on battery, suppressed when plugged in
fn battery_discharge(_args: &[String]) -> Result<ProbeResult> {
    Ok(match battery_status()? {
        None => ProbeResult::Disabled,
        Some(status) if status.plugged => ProbeResult::Suppressed,
        Some(status) => ProbeResult::Value(status.percent),
    })
}

fn noop(_args: &[String]) -> Result<()> {
    Ok(())
}

/// Suspend when fewer than `minutes` (default 10) of battery remain;
/// warn when fewer than twice that remain.
fn battery_suspend(args: &[String]) -> Result<()> {
    let suspend_at = match args.first() {
        Some(arg) => arg
            .parse::<f64>()
            .map_err(|_| PrudenceError::value_coercion("battery_suspend", arg.clone()))?,
        None => 10.0,
    };

    let Some(status) = battery_status()? else {
        return Ok(());
    };
    if status.plugged {
        return Ok(());
    }
    let Some(minutes_left) = status.minutes_left else {
        return Ok(());
    };
    log::debug!("time_left={minutes_left} suspend={suspend_at}");

    if minutes_left < suspend_at {
        process_comm(
            &["systemctl".to_string(), "suspend".to_string()],
            RunOptions {
                wait: Wait::Detach,
                fail_handle: FailHandle::Nag,
            },
        )?;
    } else if minutes_left < suspend_at * 2.0 {
        DesktopNotifier::default().notify("Battery Too Low Suspending Session...", suspend_at)?;
    }
    Ok(())
}
