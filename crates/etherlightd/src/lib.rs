//! Etherlight Daemon
//!
//! Mirrors the live link and VLAN state of a managed switch onto an
//! addressable LED strip, one LED pair per switch port. The switch is
//! polled over SNMP; a fixed-tick compositor turns the polled state, the
//! color configuration and temporary overrides into LED frames.

pub mod acquirer;
pub mod classifier;
pub mod compositor;
pub mod config;
pub mod context;
pub mod error;
pub mod frame;
pub mod led;
pub mod overrides;
pub mod policy;
pub mod pulse;
pub mod snapshot;
pub mod snmp;
pub mod sync;
pub mod temperature;
pub mod vlan_map;

pub use acquirer::{AcquiredState, DetectedSwitch, StateAcquirer};
pub use classifier::{classify_ports, Classification, ClassificationPath};
pub use compositor::Compositor;
pub use config::{ConfigStore, EtherlightConfig, SyncMode};
pub use context::{AppContext, Workers};
pub use error::*;
pub use frame::LedFrame;
pub use led::{rainbow_cycle, ColorOrder, LedError, LedSink, MemoryStrip};
pub use overrides::{wall_clock_secs, FlashSpec, OverrideStore};
pub use policy::ColorPolicy;
pub use pulse::{PulseEnvelope, PulseShape};
pub use snapshot::Snapshot;
pub use snmp::{SnmpError, SnmpResult, SnmpTransport, SnmpValue, UdpSnmpClient, WalkTable};
pub use vlan_map::{resolve_vlans, PortVlanMap, VlanSource};
