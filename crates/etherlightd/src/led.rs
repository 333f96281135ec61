//! LED strip output.
//!
//! Abstracts the physical pixel buffer behind [`LedSink`] so the
//! compositor can run against real hardware or an in-memory strip.
//!
//! # Implementations
//! - **Headless / tests:** [`MemoryStrip`]
//! - **Hardware:** any driver implementing [`LedSink`]
//!
//! The `etherlightd` binary ships without a hardware driver and drives a
//! [`MemoryStrip`]. A SPI or PWM strip driver plugs in by implementing
//! [`LedSink`] and handing it to `AppContext::spawn`.

use rgb::RGB8;
use std::time::Duration;
use thiserror::Error;
use tokio_util::sync::CancellationToken;
use tracing::{debug, trace};

/// LED output errors
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum LedError {
    /// The frame could not be pushed to the strip
    #[error("commit failed: {0}")]
    CommitFailed(String),
}

/// Per-port addressable pixel buffer.
///
/// Ports are 1-based. Slot 0 is the VLAN LED, slot 1 the link LED.
pub trait LedSink: Send {
    fn port_count(&self) -> usize;

    fn leds_per_port(&self) -> usize;

    /// Stages one LED. Ports outside `1..=port_count` are ignored and the
    /// slot is clamped to the last LED of the port.
    fn set_port_led(&mut self, port: usize, slot: usize, color: RGB8);

    /// Commits every staged LED to the output at once.
    fn show(&mut self) -> Result<(), LedError>;

    /// Total pixel count.
    fn len(&self) -> usize {
        self.port_count() * self.leds_per_port()
    }

    fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Stages a pixel by absolute strip index.
    fn set_pixel(&mut self, index: usize, color: RGB8) {
        let per_port = self.leds_per_port().max(1);
        self.set_port_led(index / per_port + 1, index % per_port, color);
    }
}

/// Byte order a strip expects on the wire.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum ColorOrder {
    Rgb,
    Rbg,
    #[default]
    Grb,
    Gbr,
    Brg,
    Bgr,
}

impl ColorOrder {
    /// Case-insensitive; unknown orders fall back to GRB (WS2812).
    pub fn from_name(name: &str) -> Self {
        match name.trim().to_uppercase().as_str() {
            "RGB" => ColorOrder::Rgb,
            "RBG" => ColorOrder::Rbg,
            "GBR" => ColorOrder::Gbr,
            "BRG" => ColorOrder::Brg,
            "BGR" => ColorOrder::Bgr,
            _ => ColorOrder::Grb,
        }
    }

    pub fn encode(&self, c: RGB8) -> [u8; 3] {
        match self {
            ColorOrder::Rgb => [c.r, c.g, c.b],
            ColorOrder::Rbg => [c.r, c.b, c.g],
            ColorOrder::Grb => [c.g, c.r, c.b],
            ColorOrder::Gbr => [c.g, c.b, c.r],
            ColorOrder::Brg => [c.b, c.r, c.g],
            ColorOrder::Bgr => [c.b, c.g, c.r],
        }
    }
}

/// In-memory strip holding the last committed frame.
///
/// `show()` applies global brightness and color order into a wire-format
/// byte buffer, the same bytes a WS281x driver would clock out.
#[derive(Debug, Clone)]
pub struct MemoryStrip {
    port_count: usize,
    leds_per_port: usize,
    brightness: u8,
    order: ColorOrder,
    staged: Vec<RGB8>,
    committed: Vec<RGB8>,
    wire: Vec<u8>,
    commits: usize,
}

impl MemoryStrip {
    pub fn new(port_count: usize, leds_per_port: usize) -> Self {
        let leds_per_port = leds_per_port.max(1);
        let total = port_count * leds_per_port;
        Self {
            port_count,
            leds_per_port,
            brightness: u8::MAX,
            order: ColorOrder::Rgb,
            staged: vec![RGB8::default(); total],
            committed: vec![RGB8::default(); total],
            wire: vec![0; total * 3],
            commits: 0,
        }
    }

    pub fn with_output(mut self, brightness: u8, order: ColorOrder) -> Self {
        self.brightness = brightness;
        self.order = order;
        self
    }

    /// Colors as of the last `show()`.
    pub fn committed(&self) -> &[RGB8] {
        &self.committed
    }

    /// Committed color of one port LED.
    pub fn port_led(&self, port: usize, slot: usize) -> Option<RGB8> {
        if port == 0 || port > self.port_count || slot >= self.leds_per_port {
            return None;
        }
        self.committed
            .get((port - 1) * self.leds_per_port + slot)
            .copied()
    }

    /// Brightness-scaled, order-encoded bytes of the last commit.
    pub fn wire_bytes(&self) -> &[u8] {
        &self.wire
    }

    pub fn commit_count(&self) -> usize {
        self.commits
    }
}

impl LedSink for MemoryStrip {
    fn port_count(&self) -> usize {
        self.port_count
    }

    fn leds_per_port(&self) -> usize {
        self.leds_per_port
    }

    fn set_port_led(&mut self, port: usize, slot: usize, color: RGB8) {
        if port == 0 || port > self.port_count {
            return;
        }
        let index = (port - 1) * self.leds_per_port + slot.min(self.leds_per_port - 1);
        if let Some(pixel) = self.staged.get_mut(index) {
            *pixel = color;
        }
    }

    fn show(&mut self) -> Result<(), LedError> {
        self.committed.copy_from_slice(&self.staged);
        let level = u16::from(self.brightness);
        for (chunk, color) in self.wire.chunks_exact_mut(3).zip(&self.committed) {
            let dim = |c: u8| ((u16::from(c) * level) / 255) as u8;
            let scaled = RGB8::new(dim(color.r), dim(color.g), dim(color.b));
            chunk.copy_from_slice(&self.order.encode(scaled));
        }
        self.commits += 1;
        trace!(commits = self.commits, "frame committed");
        Ok(())
    }
}

/// Classic 0-255 color wheel: red → green → blue → red.
pub fn color_wheel(pos: u8) -> RGB8 {
    match pos {
        0..=84 => RGB8::new(pos * 3, 255 - pos * 3, 0),
        85..=169 => {
            let p = pos - 85;
            RGB8::new(255 - p * 3, 0, p * 3)
        }
        _ => {
            let p = pos - 170;
            RGB8::new(0, p * 3, 255 - p * 3)
        }
    }
}

/// Time per boot animation step.
pub const BOOT_STEP: Duration = Duration::from_millis(20);

/// Sweeps a rainbow across the whole strip for `duration`.
///
/// Returns early when `cancel` fires. Commit failures are skipped; the
/// animation is cosmetic.
pub async fn rainbow_cycle(sink: &mut dyn LedSink, duration: Duration, cancel: &CancellationToken) {
    let total = sink.len();
    if total == 0 || duration.is_zero() {
        return;
    }

    let steps = (duration.as_millis() / BOOT_STEP.as_millis()).max(1) as usize;
    debug!(steps, pixels = total, "boot animation");

    for step in 0..steps {
        for i in 0..total {
            let pos = ((i * 256 / total) + step * 6) & 0xFF;
            sink.set_pixel(i, color_wheel(pos as u8));
        }
        if let Err(e) = sink.show() {
            trace!(error = %e, "boot animation frame dropped");
        }

        tokio::select! {
            _ = cancel.cancelled() => return,
            _ = tokio::time::sleep(BOOT_STEP) => {}
        }
    }
}
