//! Polled switch port state.

use crate::VlanId;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fmt;

/// Snapshot of a single physical switch port.
///
/// `port` is the logical, 1-based position on the LED strip. It is
/// assigned by classification and is not stable across switch reboots.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PortState {
    pub port: u32,
    pub vlan_id: Option<VlanId>,
    pub speed_mbps: Option<u64>,
    pub link_up: bool,
    pub raw_if_index: u32,
    pub if_name: String,
}

impl PortState {
    /// True when the link LED should render as down: oper-down, or a
    /// speed that is missing or zero.
    pub fn is_link_dark(&self) -> bool {
        !self.link_up || matches!(self.speed_mbps, None | Some(0))
    }
}

/// Logical port number → state. Keys are always the prefix `1..=k`.
pub type PortTable = BTreeMap<u32, PortState>;

/// Link-speed classes with a configurable color.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum SpeedBucket {
    Mbps10,
    Mbps100,
    Gbps1,
    Mbps2500,
    Gbps10,
}

impl SpeedBucket {
    /// All buckets, slowest first.
    pub const ALL: [SpeedBucket; 5] = [
        SpeedBucket::Mbps10,
        SpeedBucket::Mbps100,
        SpeedBucket::Gbps1,
        SpeedBucket::Mbps2500,
        SpeedBucket::Gbps10,
    ];

    /// Bucket used when a speed matches none of the others exactly.
    pub const FALLBACK: SpeedBucket = SpeedBucket::Gbps1;

    /// Key of this bucket in `link_colors`.
    pub const fn key(&self) -> &'static str {
        match self {
            SpeedBucket::Mbps10 => "10",
            SpeedBucket::Mbps100 => "100",
            SpeedBucket::Gbps1 => "1000",
            SpeedBucket::Mbps2500 => "2500",
            SpeedBucket::Gbps10 => "10000",
        }
    }

    /// Exact-match bucket lookup, falling back to the 1000 bucket.
    ///
    /// ```
    /// use etherlight_types::SpeedBucket;
    ///
    /// assert_eq!(SpeedBucket::for_speed(100), SpeedBucket::Mbps100);
    /// assert_eq!(SpeedBucket::for_speed(1234), SpeedBucket::Gbps1);
    /// ```
    pub fn for_speed(speed_mbps: u64) -> Self {
        let key = speed_mbps.to_string();
        Self::ALL
            .into_iter()
            .find(|bucket| bucket.key() == key)
            .unwrap_or(Self::FALLBACK)
    }
}

impl fmt::Display for SpeedBucket {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.key())
    }
}
