//! Prudence sensor: one configured signal and its hysteresis state machine.

use std::fmt;
use std::sync::Arc;

use serde::Serialize;

use crate::core::config::SensorConfig;
use crate::core::descriptor::Descriptor;
use crate::core::hysteresis::{default_alert_check, default_attempt_reset, Threshold};
use crate::core::resolver::{Resolver, SharedResolver};
use crate::core::shell::{RunOptions, Wait, SUCCESS_SENTINEL};
use crate::error::Result;

/// Samples the signal
pub type ProbeFn = Arc<dyn Fn() -> Result<ProbeResult> + Send + Sync>;
/// Corrective or notifying action
pub type PanicFn = Arc<dyn Fn() -> Result<()> + Send + Sync>;
/// Decides whether to fire, returning the updated hysteresis state
pub type AlertCheckFn = Arc<dyn Fn(Threshold, &Reading) -> Result<(bool, Threshold)> + Send + Sync>;
/// Rearms the hysteresis state once the value is safe again
pub type AttemptResetFn = Arc<dyn Fn(Threshold, &Reading) -> Result<Threshold> + Send + Sync>;

/// What a probe reported
#[derive(Debug, Clone, PartialEq)]
pub enum ProbeResult {
    /// Probe failure: the sensor gets disabled
    Disabled,
    /// Alert without a value
    AlertNow,
    /// Skip this tick
    Suppressed,
    Value(f64),
    /// Anything else, handed to the alert check as text
    Raw(String),
}

impl ProbeResult {
    /// Interpret captured command output
    pub fn from_output(out: Option<String>) -> Self {
        let Some(out) = out else {
            return ProbeResult::Disabled;
        };
        let text = out.trim();
        match text.to_ascii_lowercase().as_str() {
            "true" => ProbeResult::AlertNow,
            "false" => ProbeResult::Suppressed,
            _ => match text.parse::<f64>() {
                Ok(value) => ProbeResult::Value(value),
                Err(_) => ProbeResult::Raw(text.to_string()),
            },
        }
    }
}

/// A value handed to the alert check and attempt-reset hooks
#[derive(Debug, Clone, PartialEq)]
pub enum Reading {
    Number(f64),
    Raw(String),
}

impl Reading {
    /// Parse user input, keeping non-numeric text as raw
    pub fn parse(text: &str) -> Self {
        match text.trim().parse::<f64>() {
            Ok(value) => Reading::Number(value),
            Err(_) => Reading::Raw(text.trim().to_string()),
        }
    }

    /// Float coercion; raw text that parses becomes a number
    pub fn coerce(self) -> Self {
        match self {
            Reading::Raw(raw) => Reading::parse(&raw),
            number => number,
        }
    }
}

impl fmt::Display for Reading {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Reading::Number(value) => write!(f, "{}", value),
            Reading::Raw(raw) => f.write_str(raw),
        }
    }
}

/// Text produced when a sensor fires
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct AlertMessage {
    pub alert: String,
    pub detail: AlertDetail,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "kind", rename_all = "lowercase")]
pub enum AlertDetail {
    /// Probe said "alert" without a value
    Flag,
    Value { value: f64, units: String },
    Raw { raw: String, units: String },
}

impl AlertMessage {
    fn new(alert: &str, reading: &Reading, units: &str) -> Self {
        let detail = match reading {
            Reading::Number(value) => AlertDetail::Value {
                value: *value,
                units: units.to_string(),
            },
            Reading::Raw(raw) => AlertDetail::Raw {
                raw: raw.clone(),
                units: units.to_string(),
            },
        };
        Self {
            alert: alert.to_string(),
            detail,
        }
    }

    fn flag(alert: &str) -> Self {
        Self {
            alert: alert.to_string(),
            detail: AlertDetail::Flag,
        }
    }
}

impl fmt::Display for AlertMessage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match &self.detail {
            AlertDetail::Flag => write!(f, "{}: alert", self.alert),
            AlertDetail::Value { value, units } => write!(f, "{}: {:.2}{}", self.alert, value, units),
            AlertDetail::Raw { raw, units } => write!(f, "{}: {}{}", self.alert, raw, units),
        }
    }
}

/// A behavior that is resolved on first use and then cached.
///
/// Failed resolution is remembered and never retried.
pub enum Hook<F> {
    Pending(Descriptor),
    Ready(F),
    Unavailable,
}

impl<F: Clone> Hook<F> {
    fn get_or_resolve(
        &mut self,
        label: &str,
        resolve: impl FnOnce(&Descriptor) -> Result<F>,
    ) -> Option<F> {
        if let Hook::Pending(desc) = self {
            match resolve(desc) {
                Ok(hook) => *self = Hook::Ready(hook),
                Err(e) => {
                    log::error!("{}: {}; skipping it from now on", label, e);
                    *self = Hook::Unavailable;
                }
            }
        }
        match self {
            Hook::Ready(hook) => Some(hook.clone()),
            _ => None,
        }
    }

    pub fn is_resolved(&self) -> bool {
        matches!(self, Hook::Ready(_))
    }
}

/// One monitored signal
pub struct Sensor {
    /// Alert type string sent to notify
    pub alert: String,
    /// Units displayed after the value
    pub units: String,
    pub enabled: bool,
    threshold: Threshold,
    probe: Hook<ProbeFn>,
    panic: Hook<PanicFn>,
    alert_check: Hook<AlertCheckFn>,
    attempt_reset: Hook<AttemptResetFn>,
    run_options: RunOptions,
    panic_options: RunOptions,
    resolver: SharedResolver,
}

impl Sensor {
    /// Sensor with an in-process probe and the default hooks
    pub fn new<S: Into<String>>(alert: S, min_warn: f64, probe: ProbeFn) -> Self {
        Self {
            alert: alert.into(),
            units: String::new(),
            enabled: true,
            threshold: Threshold::new(min_warn, 1.0, false),
            probe: Hook::Ready(probe),
            panic: Hook::Ready(noop_panic()),
            alert_check: Hook::Ready(hysteresis_check()),
            attempt_reset: Hook::Ready(hysteresis_reset()),
            run_options: RunOptions::default(),
            panic_options: RunOptions::default(),
            resolver: Resolver::default().shared(),
        }
    }

    /// Build from configuration.
    ///
    /// The probe is resolved right away; if that fails the sensor is
    /// disabled instead of failing the caller. Other hooks resolve on
    /// first use.
    pub fn from_config(name: &str, config: &SensorConfig, resolver: SharedResolver) -> Result<Self> {
        let alert = config.alert.clone().unwrap_or_else(|| name.to_string());
        let run_options = RunOptions {
            wait: Wait::from_secs(config.timeout)?,
            fail_handle: config.fail_handle,
        };
        let panic_options = RunOptions {
            wait: Wait::from_secs(config.panic_timeout)?,
            fail_handle: config.fail_handle,
        };

        let probe_desc: Descriptor = config.probe.parse()?;
        let mut sensor = Self {
            alert,
            units: config.units.clone(),
            enabled: true,
            threshold: Threshold::new(config.min_warn, config.warn_res, config.reverse),
            probe: Hook::Pending(probe_desc),
            panic: pending_or(config.panic.as_deref(), noop_panic())?,
            alert_check: pending_or(config.alert_check.as_deref(), hysteresis_check())?,
            attempt_reset: pending_or(config.attempt_reset.as_deref(), hysteresis_reset())?,
            run_options,
            panic_options,
            resolver,
        };

        if sensor.resolve_probe().is_none() {
            sensor.disable("probe could not be resolved");
        }
        Ok(sensor)
    }

    pub fn with_units<S: Into<String>>(mut self, units: S) -> Self {
        self.units = units.into();
        self
    }

    pub fn with_warn_res(mut self, warn_res: f64) -> Self {
        self.threshold = Threshold::new(self.threshold.min_warn, warn_res, self.threshold.reverse);
        self
    }

    /// Alert on decreasing values
    pub fn reversed(mut self) -> Self {
        self.threshold = Threshold::new(self.threshold.min_warn, self.threshold.warn_res, true);
        self
    }

    pub fn with_panic(mut self, panic: PanicFn) -> Self {
        self.panic = Hook::Ready(panic);
        self
    }

    pub fn with_alert_check(mut self, check: AlertCheckFn) -> Self {
        self.alert_check = Hook::Ready(check);
        self
    }

    pub fn next_warn(&self) -> f64 {
        self.threshold.next_warn
    }

    pub fn min_warn(&self) -> f64 {
        self.threshold.min_warn
    }

    pub fn reverse(&self) -> bool {
        self.threshold.reverse
    }

    fn disable(&mut self, reason: &str) {
        log::warn!("{}: {}. Disabling.", self.alert, reason);
        self.enabled = false;
    }

    fn resolve_probe(&mut self) -> Option<ProbeFn> {
        let label = format!("{} probe", self.alert);
        let resolver = self.resolver.clone();
        let opts = self.run_options;
        self.probe
            .get_or_resolve(&label, |desc| resolver.lock().probe(desc, &label, opts))
    }

    fn fire_panic(&mut self) {
        let label = format!("{} panic", self.alert);
        let resolver = self.resolver.clone();
        let opts = self.panic_options;
        let Some(panic) = self
            .panic
            .get_or_resolve(&label, |desc| resolver.lock().panic(desc, &label, opts))
        else {
            return;
        };
        if let Err(e) = panic() {
            log::error!("{}: {}", label, e);
        }
    }

    fn check(&mut self, reading: &Reading) -> Result<bool> {
        let label = format!("{} alert_check", self.alert);
        let resolver = self.resolver.clone();
        let opts = self.run_options;
        let Some(check) = self
            .alert_check
            .get_or_resolve(&label, |desc| resolver.lock().alert_check(desc, &label, opts))
        else {
            return Ok(false);
        };
        let (fired, next) = check(self.threshold, reading)?;
        self.threshold = next;
        Ok(fired)
    }

    fn reset(&mut self, reading: &Reading) -> Result<()> {
        let label = format!("{} attempt_reset", self.alert);
        let resolver = self.resolver.clone();
        let opts = self.run_options;
        if let Some(reset) = self
            .attempt_reset
            .get_or_resolve(&label, |desc| resolver.lock().attempt_reset(desc, &label, opts))
        {
            self.threshold = reset(self.threshold, reading)?;
        }
        Ok(())
    }

    /// Recurrent call.
    ///
    /// Probes the signal (unless `value` overrides it), runs the hysteresis
    /// check and the panic action. Returns the alert text if the sensor
    /// fired. A disabled sensor does nothing unless a value is supplied.
    pub fn evaluate(&mut self, value: Option<Reading>) -> Result<Option<AlertMessage>> {
        if !self.enabled && value.is_none() {
            return Ok(None);
        }

        let reading = match value {
            Some(reading) => reading,
            None => {
                let Some(probe) = self.resolve_probe() else {
                    self.disable("probe unavailable");
                    return Ok(None);
                };
                let result = match probe() {
                    Ok(result) => result,
                    Err(e) => {
                        self.disable("probe failed to run");
                        return Err(e);
                    }
                };
                match result {
                    ProbeResult::Disabled => {
                        self.disable("probe failed");
                        return Ok(None);
                    }
                    ProbeResult::Suppressed => return Ok(None),
                    ProbeResult::AlertNow => {
                        self.fire_panic();
                        return Ok(Some(AlertMessage::flag(&self.alert)));
                    }
                    ProbeResult::Value(value) => Reading::Number(value),
                    ProbeResult::Raw(raw) => Reading::Raw(raw),
                }
            }
        };

        let reading = match reading.coerce() {
            Reading::Raw(raw) if raw == SUCCESS_SENTINEL => {
                self.disable("probe shell/os command did not print anything");
                return Ok(None);
            }
            reading => reading,
        };

        if self.check(&reading)? {
            self.fire_panic();
            return Ok(Some(AlertMessage::new(&self.alert, &reading, &self.units)));
        }

        self.reset(&reading)?;
        Ok(None)
    }
}

fn pending_or<F>(descriptor: Option<&str>, default: F) -> Result<Hook<F>> {
    match descriptor {
        Some(text) => Ok(Hook::Pending(text.parse()?)),
        None => Ok(Hook::Ready(default)),
    }
}

fn noop_panic() -> PanicFn {
    Arc::new(|| Ok(()))
}

fn hysteresis_check() -> AlertCheckFn {
    Arc::new(default_alert_check)
}

fn hysteresis_reset() -> AttemptResetFn {
    Arc::new(default_attempt_reset)
}

impl fmt::Display for Sensor {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let direction = if self.threshold.reverse {
            "decreasing"
        } else {
            "increasing"
        };
        write!(
            f,
            "Warn {} {} beyond {}{}",
            self.alert, direction, self.threshold.min_warn, self.units
        )
    }
}

impl fmt::Debug for Sensor {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Sensor")
            .field("alert", &self.alert)
            .field("units", &self.units)
            .field("enabled", &self.enabled)
            .field("threshold", &self.threshold)
            .field("probe_resolved", &self.probe.is_resolved())
            .field("panic_resolved", &self.panic.is_resolved())
            .finish()
    }
}
