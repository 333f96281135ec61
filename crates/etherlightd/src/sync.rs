//! VLAN color sharing between light bars over UDP multicast.
//!
//! A master announces its `vlan_colors` once a second. Slaves adopt the
//! last announcement they hear into their in-memory configuration.

use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::net::{Ipv4Addr, SocketAddrV4};
use std::time::Duration;
use tokio::net::UdpSocket;
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, trace, warn};

use crate::config::{ConfigStore, SyncMode};
use crate::error::{EtherlightError, Result};
use crate::overrides::wall_clock_secs;

/// Message type tag of a VLAN color announcement.
pub const VLAN_COLORS_TYPE: &str = "vlan_colors";

/// Interval between master announcements.
pub const ANNOUNCE_INTERVAL: Duration = Duration::from_secs(1);

const MULTICAST_TTL: u32 = 2;
const MAX_DATAGRAM: usize = 8192;

/// Wire format of one announcement.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SyncMessage {
    #[serde(rename = "type")]
    pub kind: String,
    #[serde(default)]
    pub vlan_colors: BTreeMap<String, String>,
    #[serde(default)]
    pub ts: f64,
}

impl SyncMessage {
    pub fn vlan_colors(vlan_colors: BTreeMap<String, String>, ts: f64) -> Self {
        Self {
            kind: VLAN_COLORS_TYPE.to_string(),
            vlan_colors,
            ts,
        }
    }
}

fn group_addr(config: &ConfigStore) -> Result<SocketAddrV4> {
    let (group, port) = config.read_with(|c| (c.sync.multicast.clone(), c.sync.port));
    let ip: Ipv4Addr = group.parse().map_err(|_| {
        EtherlightError::Configuration(format!("sync.multicast '{}' is not an IPv4 address", group))
    })?;
    Ok(SocketAddrV4::new(ip, port))
}

/// Applies one received datagram. Returns true when `vlan_colors` was
/// replaced; malformed or foreign messages are ignored, as is anything
/// received while not in slave mode.
pub fn handle_datagram(config: &ConfigStore, data: &[u8]) -> bool {
    let message: SyncMessage = match serde_json::from_slice(data) {
        Ok(message) => message,
        Err(e) => {
            trace!(error = %e, "ignoring malformed sync datagram");
            return false;
        }
    };
    if message.kind != VLAN_COLORS_TYPE {
        trace!(kind = %message.kind, "ignoring sync message");
        return false;
    }

    config.update(|c| {
        if c.sync.mode != SyncMode::Slave {
            return false;
        }
        if c.vlan_colors != message.vlan_colors {
            debug!(entries = message.vlan_colors.len(), "vlan colors updated from master");
        }
        c.vlan_colors = message.vlan_colors;
        true
    })
}

async fn announce(config: ConfigStore, cancel: CancellationToken) -> Result<()> {
    let group = group_addr(&config)?;
    let socket = UdpSocket::bind(SocketAddrV4::new(Ipv4Addr::UNSPECIFIED, 0)).await?;
    socket.set_multicast_ttl_v4(MULTICAST_TTL)?;
    info!(%group, "sync master announcing");

    let mut ticker = tokio::time::interval(ANNOUNCE_INTERVAL);
    loop {
        tokio::select! {
            _ = cancel.cancelled() => return Ok(()),
            _ = ticker.tick() => {}
        }

        let message = SyncMessage::vlan_colors(
            config.read_with(|c| c.vlan_colors.clone()),
            wall_clock_secs(),
        );
        let payload = match serde_json::to_vec(&message) {
            Ok(payload) => payload,
            Err(e) => {
                warn!(error = %e, "sync message encoding failed");
                continue;
            }
        };
        if let Err(e) = socket.send_to(&payload, group).await {
            debug!(error = %e, "sync announcement failed");
        }
    }
}

async fn listen(config: ConfigStore, cancel: CancellationToken) -> Result<()> {
    let group = group_addr(&config)?;
    let socket = UdpSocket::bind(SocketAddrV4::new(Ipv4Addr::UNSPECIFIED, group.port())).await?;
    socket.join_multicast_v4(*group.ip(), Ipv4Addr::UNSPECIFIED)?;
    info!(%group, "sync slave listening");

    let mut buf = vec![0u8; MAX_DATAGRAM];
    loop {
        tokio::select! {
            _ = cancel.cancelled() => return Ok(()),
            received = socket.recv_from(&mut buf) => match received {
                Ok((len, from)) => {
                    trace!(%from, len, "sync datagram");
                    handle_datagram(&config, &buf[..len]);
                }
                Err(e) => debug!(error = %e, "sync receive failed"),
            }
        }
    }
}

/// Runs the sync role configured at start-up until `cancel` fires.
/// Socket errors end the worker with a warning; nothing else depends on it.
pub async fn run_sync(config: ConfigStore, cancel: CancellationToken) {
    let mode = config.read_with(|c| c.sync.mode);
    let result = match mode {
        SyncMode::Off => return,
        SyncMode::Master => announce(config, cancel).await,
        SyncMode::Slave => listen(config, cancel).await,
    };
    if let Err(e) = result {
        warn!(?mode, error = %e, "vlan color sync stopped");
    }
}
