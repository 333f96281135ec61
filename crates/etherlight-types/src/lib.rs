//! Common Etherlight types shared by the poller and the LED renderer.
//!
//! - [`VlanId`]: IEEE 802.1Q VLAN identifiers
//! - [`PortState`]: one polled switch port, keyed by logical port number
//! - [`SpeedBucket`]: discrete link-speed classes used for color lookup
//! - [`parse_hex_color`]: `#RRGGBB` strings into [`rgb::RGB8`]

mod color;
mod port;
mod vlan;

pub use color::{parse_hex_color, scale_color, WHITE};
pub use port::{PortState, PortTable, SpeedBucket};
pub use rgb::RGB8;
pub use vlan::VlanId;

/// Common error type for parsing failures.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum ParseError {
    #[error("invalid VLAN ID: {0} (must be 1-4094)")]
    InvalidVlanId(u16),

    #[error("invalid color format: {0} (expected #RRGGBB)")]
    InvalidColor(String),
}
