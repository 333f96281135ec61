//! Time-varying brightness envelopes.
//!
//! All envelopes are functions of wall-clock seconds so that every LED
//! sharing an envelope breathes in phase, and so that a frame can be
//! recomputed for any instant in tests.

use std::f64::consts::{FRAC_PI_2, TAU};

use crate::config::PulseConfig;

/// Shortest pulse period accepted from configuration.
pub const MIN_PERIOD_SECS: f64 = 0.5;

/// Waveform of the shared pulse.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum PulseShape {
    /// Raised sine, minimum at phase 0, peak at phase 0.5
    #[default]
    Sine,
    /// Linear 0 → 1 → 0
    Triangle,
}

impl PulseShape {
    /// Case-insensitive; unknown names fall back to sine.
    pub fn from_name(name: &str) -> Self {
        if name.trim().eq_ignore_ascii_case("triangle") {
            PulseShape::Triangle
        } else {
            PulseShape::Sine
        }
    }

    /// Unit waveform value for `phase ∈ [0, 1)`.
    pub fn wave(&self, phase: f64) -> f64 {
        match self {
            PulseShape::Sine => 0.5 * (1.0 + (TAU * phase - FRAC_PI_2).sin()),
            PulseShape::Triangle => 1.0 - (2.0 * phase - 1.0).abs(),
        }
    }
}

/// Resolved parameters of the shared pulse envelope.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct PulseEnvelope {
    pub period_secs: f64,
    pub min: f64,
    pub max: f64,
    pub shape: PulseShape,
}

impl Default for PulseEnvelope {
    fn default() -> Self {
        Self::from_config(&PulseConfig::default())
    }
}

impl PulseEnvelope {
    pub fn from_config(config: &PulseConfig) -> Self {
        let period_secs = (config.period_ms as f64 / 1000.0).max(MIN_PERIOD_SECS);
        let finite_or = |v: f64, fallback: f64| if v.is_finite() { v } else { fallback };
        Self {
            period_secs,
            min: finite_or(config.min, 0.15),
            max: finite_or(config.max, 1.0),
            shape: PulseShape::from_name(&config.shape),
        }
    }

    /// Phase of `now` within the period, in `[0, 1)`.
    pub fn phase(&self, now: f64) -> f64 {
        now.rem_euclid(self.period_secs) / self.period_secs
    }

    /// Intensity at `now`: `min + (max - min) * wave(phase)`, clamped to `[0, 1]`.
    pub fn intensity(&self, now: f64) -> f64 {
        self.intensity_at_phase(self.phase(now))
    }

    pub fn intensity_at_phase(&self, phase: f64) -> f64 {
        let f = self.shape.wave(phase).clamp(0.0, 1.0);
        (self.min + (self.max - self.min) * f).clamp(0.0, 1.0)
    }
}

/// Half-cosine flash intensity: 0 at the start of each period, 1 halfway.
pub fn flash_intensity(elapsed: f64, period: f64) -> f64 {
    if period <= 0.0 {
        return 0.0;
    }
    let phase = elapsed.rem_euclid(period) / period;
    0.5 * (1.0 - (TAU * phase).cos())
}
