//! Render Compositor
//!
//! Builds one [`LedFrame`] per tick from three independently locked
//! sources and commits it to the [`LedSink`]:
//!
//! 1. identify override: every LED white, scaled by the pulse envelope
//! 2. per-port flash: both LEDs of the port white, half-cosine envelope
//! 3. normal rendering: solid VLAN color on slot 0, pulsed link color on
//!    slot 1
//!
//! The three reads are not mutually consistent at a single instant.

use etherlight_types::{scale_color, PortTable, WHITE};
use std::sync::Arc;
use std::time::Duration;
use tokio::time::{Instant, Interval, MissedTickBehavior};
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, warn};

use crate::acquirer::AcquiredState;
use crate::config::ConfigStore;
use crate::frame::LedFrame;
use crate::led::LedSink;
use crate::overrides::{wall_clock_secs, OverrideStore};
use crate::policy::ColorPolicy;
use crate::snapshot::Snapshot;

/// Composes frames and owns the LED sink while running.
pub struct Compositor<S: LedSink> {
    config: ConfigStore,
    state: Snapshot<AcquiredState>,
    overrides: Arc<OverrideStore>,
    sink: S,
    failed_commits: u64,
}

impl<S: LedSink> Compositor<S> {
    pub fn new(
        config: ConfigStore,
        state: Snapshot<AcquiredState>,
        overrides: Arc<OverrideStore>,
        sink: S,
    ) -> Self {
        Self {
            config,
            state,
            overrides,
            sink,
            failed_commits: 0,
        }
    }

    pub fn sink(&self) -> &S {
        &self.sink
    }

    pub fn into_sink(self) -> S {
        self.sink
    }

    /// Frame for instant `now` (wall-clock seconds). Reads, and thereby
    /// purges, the override store.
    pub fn render_frame(&self, now: f64) -> LedFrame {
        let policy = self.config.read_with(ColorPolicy::from_config);
        let mut frame = LedFrame::new(policy.port_count, policy.leds_per_port);

        if self.overrides.identify() {
            frame.fill(scale_color(WHITE, policy.pulse.intensity(now)));
            return frame;
        }

        let flashes = self.overrides.port_flash_snapshot(now);
        let ports: PortTable = self.state.read_with(|s| s.ports.clone());

        for port in 1..=policy.port_count {
            let Ok(key) = u32::try_from(port) else {
                break;
            };

            if let Some(intensity) = flashes.get(&key).and_then(|f| f.intensity(now)) {
                frame.set_port(port, scale_color(WHITE, intensity));
                continue;
            }

            let state = ports.get(&key);
            frame.set(port, 0, policy.vlan_color(state.and_then(|s| s.vlan_id)));
            if policy.leds_per_port >= 2 {
                let link = match state {
                    Some(s) => policy.link_color(s, now),
                    None => policy.down_color(),
                };
                frame.set(port, 1, link);
            }
        }

        frame
    }

    /// Renders and commits one frame. Commit failures are logged and
    /// dropped; the next tick renders afresh.
    pub fn tick(&mut self, now: f64) -> LedFrame {
        let frame = self.render_frame(now);
        match frame.push_to(&mut self.sink) {
            Ok(()) => {
                if self.failed_commits > 0 {
                    info!(failed = self.failed_commits, "LED commits recovered");
                    self.failed_commits = 0;
                }
            }
            Err(e) => {
                self.failed_commits += 1;
                if self.failed_commits == 1 {
                    warn!(error = %e, "LED commit failed");
                } else {
                    debug!(error = %e, failed = self.failed_commits, "LED commit failed");
                }
            }
        }
        frame
    }

    /// Commits an all-black frame.
    pub fn blank(&mut self) {
        let frame = LedFrame::new(self.sink.port_count(), self.sink.leds_per_port());
        if let Err(e) = frame.push_to(&mut self.sink) {
            debug!(error = %e, "blanking strip failed");
        }
    }

    /// The configured tick period, when it differs from `current`.
    pub fn retimed(&self, current: Duration) -> Option<Duration> {
        let period = self.config.read_with(|c| c.tick_interval());
        (period != current).then_some(period)
    }

    /// Ticks at the configured interval until `cancel` fires, then blanks
    /// the strip and hands the sink back. A changed `render.tick_ms` takes
    /// effect from the next tick.
    pub async fn run(mut self, cancel: CancellationToken) -> S {
        let mut period = self.config.read_with(|c| c.tick_interval());
        let mut ticker = tick_timer(Instant::now(), period);
        info!(tick_ms = period.as_millis() as u64, "compositor started");

        loop {
            tokio::select! {
                _ = cancel.cancelled() => break,
                _ = ticker.tick() => {
                    self.tick(wall_clock_secs());
                    if let Some(next) = self.retimed(period) {
                        debug!(tick_ms = next.as_millis() as u64, "tick period changed");
                        period = next;
                        ticker = tick_timer(Instant::now() + period, period);
                    }
                }
            }
        }

        self.blank();
        info!("compositor stopped");
        self.sink
    }
}

fn tick_timer(start: Instant, period: Duration) -> Interval {
    let mut ticker = tokio::time::interval_at(start, period);
    ticker.set_missed_tick_behavior(MissedTickBehavior::Skip);
    ticker
}
