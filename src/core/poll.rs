//! Poll loop: evaluates every sensor on a fixed interval and notifies.

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::{Duration, Instant};

use crate::core::notify::Notifier;
use crate::core::registry::AlertRegistry;
use crate::core::shell::duration_from_secs;

/// Granularity at which sleeping checks for cancellation
const SLEEP_SLICE: Duration = Duration::from_millis(100);

pub struct PollLoop {
    registry: AlertRegistry,
    interval: Duration,
    /// Notification timeout in seconds
    persist: f64,
    cancel: Arc<AtomicBool>,
}

impl PollLoop {
    /// Fails on an interval that is not a finite number of seconds
    pub fn new(registry: AlertRegistry, interval_secs: f64, persist: f64) -> crate::Result<Self> {
        Ok(Self {
            registry,
            interval: duration_from_secs(if interval_secs < 0.0 { 0.0 } else { interval_secs })?,
            persist,
            cancel: Arc::new(AtomicBool::new(false)),
        })
    }

    /// Flag that stops `run` when set, e.g. from a Ctrl+C handler
    pub fn cancel_flag(&self) -> Arc<AtomicBool> {
        self.cancel.clone()
    }

    pub fn registry(&self) -> &AlertRegistry {
        &self.registry
    }

    fn is_cancelled(&self) -> bool {
        self.cancel.load(Ordering::Relaxed)
    }

    /// Evaluate every sensor once, in registry order.
    ///
    /// Errors stay local to the sensor that raised them.
    pub fn tick(&mut self) -> Option<String> {
        let mut messages = Vec::new();
        for (name, sensor) in self.registry.iter_mut() {
            match sensor.evaluate(None) {
                Ok(Some(message)) => messages.push(message.to_string()),
                Ok(None) => {}
                Err(e) => log::error!("{}: {}", name, e),
            }
        }

        if messages.is_empty() {
            None
        } else {
            Some(messages.join("\n"))
        }
    }

    /// Tick until cancelled
    pub fn run(&mut self, notifier: &dyn Notifier) -> crate::Result<()> {
        log::info!(
            "Monitoring {} alert(s) every {:?}",
            self.registry.len(),
            self.interval
        );

        while !self.is_cancelled() {
            if let Some(message) = self.tick() {
                if let Err(e) = notifier.notify(&message, self.persist) {
                    log::error!("Failed to send notification: {}", e);
                }
            }
            self.sleep();
        }

        log::info!("Caught interrupt, quitting safely.");
        Ok(())
    }

    fn sleep(&self) {
        let deadline = Instant::now() + self.interval;
        while !self.is_cancelled() {
            let now = Instant::now();
            if now >= deadline {
                break;
            }
            std::thread::sleep(SLEEP_SLICE.min(deadline - now));
        }
    }
}
