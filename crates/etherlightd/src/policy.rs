//! Color policy derived from the configuration snapshot.
//!
//! Built once per tick from whatever the configuration holds. Missing or
//! malformed entries resolve to fixed defaults and never fail the tick.

use etherlight_types::{parse_hex_color, scale_color, PortState, SpeedBucket, VlanId, RGB8};
use std::collections::BTreeMap;
use tracing::trace;

use crate::config::EtherlightConfig;
use crate::pulse::PulseEnvelope;

/// VLAN LED color when the port has no VLAN or the VLAN has no color.
pub const DEFAULT_VLAN_COLOR: RGB8 = RGB8 {
    r: 0x10,
    g: 0x10,
    b: 0x10,
};

/// Link LED color for a bucket without a configured color.
pub const DEFAULT_LINK_COLOR: RGB8 = RGB8 {
    r: 0x00,
    g: 0xC8,
    b: 0x53,
};

/// Link LED color for a down port unless `link_colors.down` is set.
pub const DEFAULT_DOWN_COLOR: RGB8 = RGB8 { r: 0, g: 0, b: 0 };

/// Key of the down color in `link_colors`.
pub const DOWN_KEY: &str = "down";

/// Read-only color lookup for one rendered frame.
#[derive(Debug, Clone, PartialEq)]
pub struct ColorPolicy {
    vlan_colors: BTreeMap<String, RGB8>,
    link_colors: BTreeMap<String, RGB8>,
    down_color: RGB8,
    pub pulse: PulseEnvelope,
    pub port_count: usize,
    pub leds_per_port: usize,
}

fn parse_color_map(raw: &BTreeMap<String, String>) -> BTreeMap<String, RGB8> {
    raw.iter()
        .filter_map(|(key, value)| match parse_hex_color(value) {
            Ok(color) => Some((key.trim().to_string(), color)),
            Err(e) => {
                trace!(key = %key, error = %e, "ignoring color entry");
                None
            }
        })
        .collect()
}

impl ColorPolicy {
    pub fn from_config(config: &EtherlightConfig) -> Self {
        let link_colors = parse_color_map(&config.link_colors);
        let down_color = link_colors
            .get(DOWN_KEY)
            .copied()
            .unwrap_or(DEFAULT_DOWN_COLOR);

        Self {
            vlan_colors: parse_color_map(&config.vlan_colors),
            link_colors,
            down_color,
            pulse: PulseEnvelope::from_config(&config.pulse),
            port_count: config.port_count(),
            leds_per_port: config.leds_per_port(),
        }
    }

    /// Solid VLAN indicator color.
    pub fn vlan_color(&self, vlan: Option<VlanId>) -> RGB8 {
        vlan.and_then(|id| self.vlan_colors.get(&id.to_string()).copied())
            .unwrap_or(DEFAULT_VLAN_COLOR)
    }

    /// Unpulsed color of an up link at `speed_mbps`.
    pub fn link_base_color(&self, speed_mbps: u64) -> RGB8 {
        let bucket = SpeedBucket::for_speed(speed_mbps);
        self.link_colors
            .get(bucket.key())
            .copied()
            .unwrap_or(DEFAULT_LINK_COLOR)
    }

    pub fn down_color(&self) -> RGB8 {
        self.down_color
    }

    /// Link indicator color at `now`: solid down color when dark,
    /// otherwise the bucket color scaled by the shared pulse.
    pub fn link_color(&self, state: &PortState, now: f64) -> RGB8 {
        match state.speed_mbps {
            Some(speed) if !state.is_link_dark() => {
                scale_color(self.link_base_color(speed), self.pulse.intensity(now))
            }
            _ => self.down_color,
        }
    }
}
