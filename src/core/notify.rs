//! Notification delivery.

use notify_rust::{Notification, Timeout};

use crate::error::{PrudenceError, Result};

/// Something that can show an alert to the user
pub trait Notifier {
    /// Show `message`; a `timeout_secs` of 0 keeps it until dismissed
    fn notify(&self, message: &str, timeout_secs: f64) -> Result<()>;
}

/// Desktop notification through the platform notification server
#[derive(Debug, Clone)]
pub struct DesktopNotifier {
    app_name: String,
    icon: String,
}

impl Default for DesktopNotifier {
    fn default() -> Self {
        Self {
            app_name: "Prudence".to_string(),
            icon: "dialog-warning".to_string(),
        }
    }
}

fn timeout(timeout_secs: f64) -> Timeout {
    if timeout_secs > 0.0 {
        Timeout::Milliseconds((timeout_secs * 1000.0) as u32)
    } else {
        Timeout::Never
    }
}

impl Notifier for DesktopNotifier {
    fn notify(&self, message: &str, timeout_secs: f64) -> Result<()> {
        Notification::new()
            .appname(&self.app_name)
            .summary("Alert")
            .body(message)
            .icon(&self.icon)
            .timeout(timeout(timeout_secs))
            .show()
            .map(|_| ())
            .map_err(|e| PrudenceError::notification(e.to_string()))
    }
}

/// Writes alerts to the log instead of the desktop
#[derive(Debug, Clone, Copy, Default)]
pub struct LogNotifier;

impl Notifier for LogNotifier {
    fn notify(&self, message: &str, _timeout_secs: f64) -> Result<()> {
        for line in message.lines() {
            log::warn!("{}", line);
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_zero_timeout_persists() {
        assert_eq!(timeout(0.0), Timeout::Never);
        assert_eq!(timeout(5.0), Timeout::Milliseconds(5000));
    }

    #[test]
    fn test_log_notifier_never_fails() {
        assert!(LogNotifier.notify("CPU: 99.00%\nBattery: alert", 5.0).is_ok());
    }
}
