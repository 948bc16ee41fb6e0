//! Requeue policies applied when a reconcile fails.
//!
//! The rule engine never retries by itself. A failed pass is handed back to the
//! controller, which asks the injected [`RequeuePolicy`] when to try again.

use std::collections::HashMap;
use std::sync::Mutex;
use std::time::{Duration, Instant};

use crate::Error;

/// Decides how long to wait before reconciling a failed resource again.
pub trait RequeuePolicy: Send + Sync {
    /// Called after a failed reconcile of the resource identified by `key`.
    fn on_error(&self, key: &str, error: &Error) -> Duration;

    /// Called after a successful reconcile of `key`.
    fn reset(&self, key: &str);
}

/// Always wait the same amount of time.
#[derive(Clone, Debug)]
pub struct FixedDelay(pub Duration);

impl RequeuePolicy for FixedDelay {
    fn on_error(&self, _key: &str, _error: &Error) -> Duration {
        self.0
    }

    fn reset(&self, _key: &str) {}
}

/// The exponent stops growing after this many consecutive failures.
const MAX_BACKOFF_EXPONENT: u32 = 32;

/// Exponential backoff per resource, reset by the next successful reconcile.
///
/// A resource deleted while failing is never reconciled again, so entries that
/// have not failed for `forget_after` are dropped on the next failure of any key.
#[derive(Debug)]
pub struct ExponentialBackoff {
    initial: Duration,
    max: Duration,
    multiplier: f64,
    forget_after: Duration,
    failures: Mutex<HashMap<String, (u32, Instant)>>,
}

impl ExponentialBackoff {
    pub fn new(initial: Duration, max: Duration, multiplier: f64) -> Self {
        Self {
            initial,
            max,
            multiplier,
            forget_after: max.saturating_mul(4),
            failures: Mutex::new(HashMap::new()),
        }
    }

    pub fn with_forget_after(mut self, forget_after: Duration) -> Self {
        self.forget_after = forget_after;
        self
    }

    /// Number of resources currently being backed off.
    pub fn tracked(&self) -> usize {
        self.failures
            .lock()
            .unwrap_or_else(|e| e.into_inner())
            .len()
    }

    fn delay_for(&self, attempt: u32) -> Duration {
        let exponent = attempt.saturating_sub(1).min(MAX_BACKOFF_EXPONENT);
        let factor = self.multiplier.powi(exponent as i32);
        let delay = self.initial.as_secs_f64() * factor;
        if !delay.is_finite() || delay >= self.max.as_secs_f64() {
            return self.max;
        }
        Duration::from_secs_f64(delay)
    }
}

impl RequeuePolicy for ExponentialBackoff {
    fn on_error(&self, key: &str, _error: &Error) -> Duration {
        let mut failures = self.failures.lock().unwrap_or_else(|e| e.into_inner());
        let now = Instant::now();
        failures.retain(|k, (_, last)| k == key || now.duration_since(*last) < self.forget_after);

        let (attempt, last) = failures.entry(key.to_string()).or_insert((0, now));
        *attempt = attempt.saturating_add(1);
        *last = now;
        self.delay_for(*attempt)
    }

    fn reset(&self, key: &str) {
        self.failures
            .lock()
            .unwrap_or_else(|e| e.into_inner())
            .remove(key);
    }
}
