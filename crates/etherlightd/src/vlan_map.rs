//! Bridge-port → VLAN resolution.
//!
//! The per-port PVID table is authoritative. Only when it is entirely
//! empty is the per-VLAN untagged-member bitmap table consulted.

use etherlight_types::VlanId;
use std::collections::{BTreeMap, BTreeSet};

use crate::snmp::WalkTable;

/// Bridge port number → default VLAN.
pub type PortVlanMap = BTreeMap<u32, VlanId>;

/// Which table produced the VLAN assignment for a cycle.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum VlanSource {
    Pvid,
    UntaggedBitmap,
    None,
}

impl VlanSource {
    pub fn as_str(&self) -> &'static str {
        match self {
            VlanSource::Pvid => "pvid",
            VlanSource::UntaggedBitmap => "untagged-bitmap",
            VlanSource::None => "none",
        }
    }
}

/// Parses the dot1qPvid walk. Rows with a non-numeric or out-of-range
/// VLAN are dropped.
pub fn pvid_map(pvid: &WalkTable) -> PortVlanMap {
    pvid.iter()
        .filter_map(|(&port, value)| Some((port, VlanId::from_raw(value.as_u64()?)?)))
        .collect()
}

/// Bridge ports set in a PortList bitmap. Bit `i` of byte `n`, counted
/// from the MSB, is port `n * 8 + i + 1`.
pub fn bitmap_ports_msb(mask: &[u8]) -> BTreeSet<u32> {
    let mut ports = BTreeSet::new();
    for (byte_index, byte) in mask.iter().enumerate() {
        for bit in 0..8u32 {
            if byte & (0x80 >> bit) != 0 {
                ports.insert(byte_index as u32 * 8 + bit + 1);
            }
        }
    }
    ports
}

/// Builds the port → VLAN map from per-VLAN untagged bitmaps.
///
/// A port claimed by several VLANs keeps the lowest VLAN id. Walk order
/// carries no meaning here, so ties are settled by id instead.
pub fn untagged_bitmap_map(untagged: &WalkTable) -> PortVlanMap {
    let mut map = PortVlanMap::new();
    // BTreeMap iteration is ascending by VLAN id
    for (&vlan, value) in untagged {
        let Some(vlan_id) = VlanId::from_raw(u64::from(vlan)) else {
            continue;
        };
        for port in bitmap_ports_msb(value.as_octets()) {
            map.entry(port).or_insert(vlan_id);
        }
    }
    map
}

/// Applies the precedence rule: PVID if it yields anything, otherwise
/// the bitmap table, fetched lazily through `untagged`. An error from the
/// fetch is handed back to the caller untouched.
pub async fn resolve_vlans<F, Fut, E>(
    pvid: &WalkTable,
    untagged: F,
) -> Result<(PortVlanMap, VlanSource), E>
where
    F: FnOnce() -> Fut,
    Fut: std::future::Future<Output = Result<WalkTable, E>>,
{
    let primary = pvid_map(pvid);
    if !primary.is_empty() {
        return Ok((primary, VlanSource::Pvid));
    }

    let fallback = untagged_bitmap_map(&untagged().await?);
    if fallback.is_empty() {
        Ok((fallback, VlanSource::None))
    } else {
        Ok((fallback, VlanSource::UntaggedBitmap))
    }
}
