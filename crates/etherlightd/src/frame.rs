//! One rendered frame of LED colors.

use rgb::RGB8;

use crate::led::{LedError, LedSink};

/// Flat pixel buffer indexed `(port - 1) * leds_per_port + slot`.
///
/// Slot 0 is the VLAN indicator, slot 1 the link indicator.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LedFrame {
    port_count: usize,
    leds_per_port: usize,
    pixels: Vec<RGB8>,
}

impl LedFrame {
    /// All-black frame of the given geometry.
    pub fn new(port_count: usize, leds_per_port: usize) -> Self {
        let leds_per_port = leds_per_port.max(1);
        Self {
            port_count,
            leds_per_port,
            pixels: vec![RGB8::default(); port_count * leds_per_port],
        }
    }

    pub fn port_count(&self) -> usize {
        self.port_count
    }

    pub fn leds_per_port(&self) -> usize {
        self.leds_per_port
    }

    fn index(&self, port: usize, slot: usize) -> Option<usize> {
        if port == 0 || port > self.port_count || slot >= self.leds_per_port {
            return None;
        }
        Some((port - 1) * self.leds_per_port + slot)
    }

    /// Sets one LED. Out-of-range positions are ignored.
    pub fn set(&mut self, port: usize, slot: usize, color: RGB8) {
        if let Some(i) = self.index(port, slot) {
            self.pixels[i] = color;
        }
    }

    pub fn get(&self, port: usize, slot: usize) -> Option<RGB8> {
        self.index(port, slot).map(|i| self.pixels[i])
    }

    /// Sets every LED of `port`.
    pub fn set_port(&mut self, port: usize, color: RGB8) {
        for slot in 0..self.leds_per_port {
            self.set(port, slot, color);
        }
    }

    pub fn fill(&mut self, color: RGB8) {
        self.pixels.fill(color);
    }

    pub fn pixels(&self) -> &[RGB8] {
        &self.pixels
    }

    /// Stages every pixel on `sink` and commits.
    ///
    /// Ports beyond either geometry are left untouched on the sink.
    pub fn push_to(&self, sink: &mut dyn LedSink) -> Result<(), LedError> {
        for port in 1..=self.port_count {
            for slot in 0..self.leds_per_port {
                sink.set_port_led(port, slot, self.pixels[(port - 1) * self.leds_per_port + slot]);
            }
        }
        sink.show()
    }
}
