//! SNMP v2c transport used by the state acquirer.
//!
//! The acquirer only needs two primitives, a subtree walk keyed by the
//! last OID arc and a single GET, so they are expressed as the
//! [`SnmpTransport`] trait. [`UdpSnmpClient`] implements it on top of the
//! blocking `snmp` session, one session per call inside
//! `spawn_blocking`; tests substitute a scripted switch.

use async_trait::async_trait;
use std::collections::BTreeMap;
use std::time::Duration;
use thiserror::Error;
use tracing::trace;

/// Well-known OIDs polled from the switch.
pub mod oids {
    /// SNMPv2-MIB::sysDescr.0
    pub const SYS_DESCR: &[u32] = &[1, 3, 6, 1, 2, 1, 1, 1, 0];
    /// SNMPv2-MIB::sysName.0
    pub const SYS_NAME: &[u32] = &[1, 3, 6, 1, 2, 1, 1, 5, 0];
    /// IF-MIB::ifName
    pub const IF_NAME: &[u32] = &[1, 3, 6, 1, 2, 1, 31, 1, 1, 1, 1];
    /// IF-MIB::ifHighSpeed (Mbps)
    pub const IF_HIGH_SPEED: &[u32] = &[1, 3, 6, 1, 2, 1, 31, 1, 1, 1, 15];
    /// IF-MIB::ifOperStatus (1 = up)
    pub const IF_OPER_STATUS: &[u32] = &[1, 3, 6, 1, 2, 1, 2, 2, 1, 8];
    /// Q-BRIDGE-MIB::dot1qPvid, indexed by bridge port number
    pub const DOT1Q_PVID: &[u32] = &[1, 3, 6, 1, 2, 1, 17, 7, 1, 4, 5, 1, 1];
    /// Q-BRIDGE-MIB::dot1qVlanCurrentEgressPorts, tagged and untagged members
    pub const DOT1Q_VLAN_EGRESS: &[u32] = &[1, 3, 6, 1, 2, 1, 17, 7, 1, 4, 2, 1, 4];
    /// Q-BRIDGE-MIB::dot1qVlanCurrentUntaggedPorts, indexed by VLAN id
    pub const DOT1Q_VLAN_UNTAGGED: &[u32] = &[1, 3, 6, 1, 2, 1, 17, 7, 1, 4, 2, 1, 5];
    /// UniFi switch temperature candidates (INTEGER Celsius)
    pub const UBNT_TEMPERATURE: [&[u32]; 2] = [
        &[1, 3, 6, 1, 4, 1, 41112, 1, 1, 43, 1, 8, 1, 5, 1, 1],
        &[1, 3, 6, 1, 4, 1, 41112, 1, 1, 43, 1, 15, 1, 3, 1],
    ];
    /// ENTITY-SENSOR-MIB::entPhySensorType
    pub const ENT_SENSOR_TYPE: &[u32] = &[1, 3, 6, 1, 2, 1, 99, 1, 1, 1, 1];
    /// ENTITY-SENSOR-MIB::entPhySensorValue
    pub const ENT_SENSOR_VALUE: &[u32] = &[1, 3, 6, 1, 2, 1, 99, 1, 1, 1, 4];
}

/// Renders an OID in dotted form for logs.
pub fn format_oid(oid: &[u32]) -> String {
    oid.iter()
        .map(u32::to_string)
        .collect::<Vec<_>>()
        .join(".")
}

/// SNMP errors.
///
/// Only [`SnmpError::Transport`] aborts an acquisition cycle; the other
/// variants degrade the single sub-query that raised them.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum SnmpError {
    /// Agent unresolvable, socket unusable, or no response before the timeout
    #[error("transport error: {0}")]
    Transport(String),

    /// Error-status, mismatched response or other per-request failure
    #[error("protocol error: {0}")]
    Protocol(String),

    /// Response could not be decoded
    #[error("decode error: {0}")]
    Decode(String),
}

impl SnmpError {
    /// True when the whole acquisition cycle should be abandoned.
    pub fn is_cycle_fatal(&self) -> bool {
        matches!(self, SnmpError::Transport(_))
    }
}

/// Result type for SNMP operations
pub type SnmpResult<T> = std::result::Result<T, SnmpError>;

/// Classifies a failed request. Send failures and timeouts mean the agent
/// is unreachable; malformed responses only spoil the request at hand.
fn request_error(target: &str, err: snmp::SnmpError) -> SnmpError {
    use snmp::SnmpError as E;

    match err {
        E::SendError | E::ReceiveError => {
            SnmpError::Transport(format!("{}: no response ({:?})", target, err))
        }
        E::AsnParseError
        | E::AsnInvalidLen
        | E::AsnWrongType
        | E::AsnUnsupportedType
        | E::AsnEof
        | E::AsnIntOverflow => SnmpError::Decode(format!("{}: {:?}", target, err)),
        other => SnmpError::Protocol(format!("{}: {:?}", target, other)),
    }
}

/// Owned SNMP value, decoupled from the session buffer it was read from.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SnmpValue {
    Integer(i64),
    Unsigned(u64),
    OctetString(Vec<u8>),
    Unsupported,
}

impl SnmpValue {
    /// Non-negative numeric value, accepting digit-only strings as well.
    pub fn as_u64(&self) -> Option<u64> {
        match self {
            SnmpValue::Integer(v) => u64::try_from(*v).ok(),
            SnmpValue::Unsigned(v) => Some(*v),
            SnmpValue::OctetString(bytes) => {
                let text = String::from_utf8_lossy(bytes);
                let text = text.trim();
                if !text.is_empty() && text.bytes().all(|b| b.is_ascii_digit()) {
                    text.parse().ok()
                } else {
                    None
                }
            }
            SnmpValue::Unsupported => None,
        }
    }

    pub fn as_f64(&self) -> Option<f64> {
        match self {
            SnmpValue::Integer(v) => Some(*v as f64),
            SnmpValue::Unsigned(v) => Some(*v as f64),
            SnmpValue::OctetString(bytes) => String::from_utf8_lossy(bytes).trim().parse().ok(),
            SnmpValue::Unsupported => None,
        }
    }

    pub fn as_text(&self) -> String {
        match self {
            SnmpValue::Integer(v) => v.to_string(),
            SnmpValue::Unsigned(v) => v.to_string(),
            SnmpValue::OctetString(bytes) => String::from_utf8_lossy(bytes).into_owned(),
            SnmpValue::Unsupported => String::new(),
        }
    }

    pub fn as_octets(&self) -> &[u8] {
        match self {
            SnmpValue::OctetString(bytes) => bytes,
            _ => &[],
        }
    }
}

impl From<&snmp::Value<'_>> for SnmpValue {
    fn from(value: &snmp::Value<'_>) -> Self {
        use snmp::Value;

        match value {
            Value::Integer(v) => SnmpValue::Integer(*v),
            Value::Counter32(v) | Value::Unsigned32(v) | Value::Timeticks(v) => {
                SnmpValue::Unsigned(u64::from(*v))
            }
            Value::Counter64(v) => SnmpValue::Unsigned(*v),
            Value::OctetString(bytes) => SnmpValue::OctetString(bytes.to_vec()),
            _ => SnmpValue::Unsupported,
        }
    }
}

/// Walk result: last OID arc (ifIndex, bridge port, VLAN id) → value.
pub type WalkTable = BTreeMap<u32, SnmpValue>;

/// Management-protocol access to the switch.
#[async_trait]
pub trait SnmpTransport: Send + Sync {
    /// Walks the subtree under `base`, keyed by the last arc of each OID.
    async fn walk(&self, base: &[u32]) -> SnmpResult<WalkTable>;

    /// Fetches a single scalar. `Ok(None)` when the agent has no such object.
    async fn get(&self, oid: &[u32]) -> SnmpResult<Option<SnmpValue>>;
}

/// SNMP v2c community client over UDP.
#[derive(Debug, Clone)]
pub struct UdpSnmpClient {
    target: String,
    community: Vec<u8>,
    timeout: Duration,
}

/// Hard cap on GETNEXT round trips per walk, guards against agents that
/// never leave the subtree.
const MAX_WALK_STEPS: usize = 4096;

impl UdpSnmpClient {
    pub fn new(host: &str, port: u16, community: &str, timeout: Duration) -> Self {
        Self {
            target: format!("{}:{}", host, port),
            community: community.as_bytes().to_vec(),
            timeout,
        }
    }

    pub fn target(&self) -> &str {
        &self.target
    }

    fn open(&self) -> SnmpResult<snmp::SyncSession> {
        snmp::SyncSession::new(
            self.target.as_str(),
            &self.community,
            Some(self.timeout),
            0,
        )
        .map_err(|e| SnmpError::Transport(format!("{}: {}", self.target, e)))
    }

    fn walk_blocking(&self, base: &[u32]) -> SnmpResult<WalkTable> {
        let mut session = self.open()?;
        let mut table = WalkTable::new();
        let mut cursor = base.to_vec();
        let mut buf = [0u32; 128];

        for _ in 0..MAX_WALK_STEPS {
            let mut pdu = session
                .getnext(&cursor)
                .map_err(|e| request_error(&self.target, e))?;

            if pdu.error_status != 0 {
                return Err(SnmpError::Protocol(format!(
                    "error-status {} walking {}",
                    pdu.error_status,
                    format_oid(base)
                )));
            }

            let Some((name, value)) = pdu.varbinds.next() else {
                break;
            };
            let oid = name
                .read_name(&mut buf)
                .map_err(|e| SnmpError::Decode(format!("{:?}", e)))?;

            // endOfMibView echoes the request OID, so this also ends the walk
            if oid.len() <= base.len() || !oid.starts_with(base) || oid <= cursor.as_slice() {
                break;
            }

            if let Some(&index) = oid.last() {
                table.insert(index, SnmpValue::from(&value));
            }
            cursor = oid.to_vec();
        }

        trace!(oid = %format_oid(base), rows = table.len(), "walk complete");
        Ok(table)
    }

    fn get_blocking(&self, oid: &[u32]) -> SnmpResult<Option<SnmpValue>> {
        let mut session = self.open()?;
        let mut pdu = session
            .get(oid)
            .map_err(|e| request_error(&self.target, e))?;

        if pdu.error_status != 0 {
            return Err(SnmpError::Protocol(format!(
                "error-status {} reading {}",
                pdu.error_status,
                format_oid(oid)
            )));
        }

        Ok(pdu.varbinds.next().and_then(|(_, value)| match value {
            snmp::Value::Null => None,
            other => Some(SnmpValue::from(&other)),
        }))
    }
}

#[async_trait]
impl SnmpTransport for UdpSnmpClient {
    async fn walk(&self, base: &[u32]) -> SnmpResult<WalkTable> {
        let client = self.clone();
        let base = base.to_vec();
        tokio::task::spawn_blocking(move || client.walk_blocking(&base))
            .await
            .map_err(|e| SnmpError::Protocol(format!("walk task failed: {}", e)))?
    }

    async fn get(&self, oid: &[u32]) -> SnmpResult<Option<SnmpValue>> {
        let client = self.clone();
        let oid = oid.to_vec();
        tokio::task::spawn_blocking(move || client.get_blocking(&oid))
            .await
            .map_err(|e| SnmpError::Protocol(format!("get task failed: {}", e)))?
    }
}
