//! Temporary rendering overrides requested by command handlers.
//!
//! Two kinds exist: a global identify pulse and per-port white flashes.
//! Flashes expire by wall-clock comparison on read; nothing runs on a
//! timer. An expired flash is dropped from the store the next time the
//! store is read.

use parking_lot::Mutex;
use std::collections::BTreeMap;
use tracing::debug;

use crate::pulse::flash_intensity;

/// Default length of one flash pulse in seconds.
pub const DEFAULT_FLASH_PERIOD: f64 = 0.6;

/// Shortest blink a handler may request, in seconds.
pub const MIN_BLINK_SECS: f64 = 0.2;

/// Seconds since the Unix epoch as a float, the time base of all
/// envelopes and overrides.
pub fn wall_clock_secs() -> f64 {
    chrono::Utc::now().timestamp_micros() as f64 / 1_000_000.0
}

/// A per-port flash: `pulse_count` half-cosine pulses of `period` seconds.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct FlashSpec {
    pub start: f64,
    pub period: f64,
    pub pulse_count: u32,
}

impl FlashSpec {
    pub fn new(start: f64, period: f64, pulse_count: u32) -> Self {
        Self {
            start,
            period,
            pulse_count,
        }
    }

    /// Total flash length in seconds.
    pub fn duration(&self) -> f64 {
        self.period * f64::from(self.pulse_count)
    }

    pub fn is_expired(&self, now: f64) -> bool {
        now - self.start >= self.duration()
    }

    /// Flash intensity at `now`, `None` once expired.
    pub fn intensity(&self, now: f64) -> Option<f64> {
        if self.is_expired(now) {
            return None;
        }
        Some(flash_intensity((now - self.start).max(0.0), self.period))
    }
}

#[derive(Debug, Default)]
struct OverrideState {
    identify_active: bool,
    port_flash: BTreeMap<u32, FlashSpec>,
}

/// Identify and per-port flash requests, behind one lock.
#[derive(Debug, Default)]
pub struct OverrideStore {
    inner: Mutex<OverrideState>,
}

impl OverrideStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Whether the global identify pulse is on.
    pub fn identify(&self) -> bool {
        self.inner.lock().identify_active
    }

    pub fn set_identify(&self, on: bool) {
        self.inner.lock().identify_active = on;
        debug!(on, "identify set");
    }

    /// Flips identify and returns the new value.
    pub fn toggle_identify(&self) -> bool {
        let mut state = self.inner.lock();
        state.identify_active = !state.identify_active;
        debug!(on = state.identify_active, "identify toggled");
        state.identify_active
    }

    /// Registers a flash for `port`, replacing any pending one.
    pub fn flash_port(&self, port: u32, spec: FlashSpec) {
        debug!(port, period = spec.period, pulses = spec.pulse_count, "port flash");
        self.inner.lock().port_flash.insert(port, spec);
    }

    /// Flashes `port` for about `seconds` using the default pulse period.
    pub fn blink_port(&self, port: u32, seconds: f64, now: f64) -> FlashSpec {
        let seconds = if seconds.is_finite() {
            seconds.max(MIN_BLINK_SECS)
        } else {
            MIN_BLINK_SECS
        };
        let pulse_count = (seconds / DEFAULT_FLASH_PERIOD).ceil().max(1.0) as u32;
        let spec = FlashSpec::new(now, DEFAULT_FLASH_PERIOD, pulse_count);
        self.flash_port(port, spec);
        spec
    }

    /// Live flashes at `now`. Expired entries are purged as part of the read.
    pub fn port_flash_snapshot(&self, now: f64) -> BTreeMap<u32, FlashSpec> {
        let mut state = self.inner.lock();
        state.port_flash.retain(|port, spec| {
            let live = !spec.is_expired(now);
            if !live {
                debug!(port = *port, "port flash expired");
            }
            live
        });
        state.port_flash.clone()
    }

    /// Number of flashes currently stored, expired or not.
    pub fn pending_flashes(&self) -> usize {
        self.inner.lock().port_flash.len()
    }
}
