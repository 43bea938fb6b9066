//! Directional hysteresis with rearm.
//!
//! A [`Threshold`] carries the base threshold (`min_warn`), the step
//! (`warn_res`), the direction and the moving baseline (`next_warn`).
//! Hooks never mutate a sensor directly: they take the current state by
//! value and hand back the updated one.

use serde::{Deserialize, Serialize};

use crate::core::sensor::Reading;
use crate::error::{PrudenceError, Result};

/// Hysteresis state of one sensor
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Threshold {
    pub min_warn: f64,
    pub warn_res: f64,
    pub reverse: bool,
    pub next_warn: f64,
}

impl Threshold {
    /// Fresh state, armed at the base threshold
    pub fn new(min_warn: f64, warn_res: f64, reverse: bool) -> Self {
        Self {
            min_warn,
            warn_res,
            reverse,
            next_warn: min_warn,
        }
    }

    /// `-1` when alerts fire on decreasing values, `+1` otherwise
    pub fn direction(&self) -> f64 {
        if self.reverse {
            -1.0
        } else {
            1.0
        }
    }

    /// Baseline back at `min_warn`
    pub fn rearmed(self) -> Self {
        Self {
            next_warn: self.min_warn,
            ..self
        }
    }

    pub fn is_armed(&self) -> bool {
        self.next_warn == self.min_warn
    }
}

fn numeric(reading: &Reading) -> Result<f64> {
    match reading {
        Reading::Number(value) => Ok(*value),
        Reading::Raw(raw) => raw
            .trim()
            .parse::<f64>()
            .map_err(|_| PrudenceError::value_coercion("hysteresis", raw.clone())),
    }
}

/// Default alert check.
///
/// Forward: fires when `value > next_warn`, then
/// `next_warn = warn_res + max(value, next_warn)`.
/// Reverse: fires when `value < next_warn`, then
/// `next_warn = warn_res - min(value, next_warn)`.
pub fn default_alert_check(state: Threshold, reading: &Reading) -> Result<(bool, Threshold)> {
    let value = numeric(reading)?;

    if state.reverse {
        if value < state.next_warn {
            let next_warn = state.warn_res - value.min(state.next_warn);
            return Ok((true, Threshold { next_warn, ..state }));
        }
    } else if value > state.next_warn {
        let next_warn = state.warn_res + value.max(state.next_warn);
        return Ok((true, Threshold { next_warn, ..state }));
    }

    Ok((false, state))
}

/// Default attempt-reset: rearm once the value is back on the safe side
/// of `min_warn`.
pub fn default_attempt_reset(state: Threshold, reading: &Reading) -> Result<Threshold> {
    let value = numeric(reading)?;
    let direction = state.direction();

    if direction * value < direction * state.min_warn {
        Ok(state.rearmed())
    } else {
        Ok(state)
    }
}
