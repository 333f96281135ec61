//! State Acquirer
//!
//! Periodically walks the switch's interface and bridge tables over SNMP
//! and publishes a [`PortTable`] snapshot. Each cycle rebuilds the table
//! wholesale; readers always get a deep copy.
//!
//! # Failure model
//! - A sub-query failing at the protocol level yields an empty table for
//!   that query only. The cycle still commits.
//! - A transport failure aborts the cycle. The previous snapshot stays
//!   visible until the next cycle commits.

use etherlight_types::{PortState, PortTable};
use serde::Serialize;
use std::collections::BTreeMap;
use std::sync::Arc;
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, instrument, warn};

use crate::classifier::{classify_ports, port_number_from_if_name};
use crate::config::ConfigStore;
use crate::snapshot::Snapshot;
use crate::snmp::{format_oid, oids, SnmpResult, SnmpTransport, WalkTable};
use crate::temperature::read_switch_temperature;
use crate::vlan_map::resolve_vlans;

/// ifOperStatus value for "up".
const OPER_STATUS_UP: u64 = 1;

/// Everything one acquisition cycle commits.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct AcquiredState {
    pub ports: PortTable,
    pub switch_temp_c: Option<f64>,
}

/// Result of one-shot switch detection.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct DetectedSwitch {
    /// sysDescr
    pub model: String,
    pub guessed_port_count: usize,
    /// sysName
    pub system_name: String,
}

/// Owns the SNMP transport and the published port snapshot.
pub struct StateAcquirer {
    transport: Arc<dyn SnmpTransport>,
    config: ConfigStore,
    state: Snapshot<AcquiredState>,
}

impl StateAcquirer {
    /// Port count and poll interval are read from `config` at every cycle.
    pub fn new(transport: Arc<dyn SnmpTransport>, config: ConfigStore) -> Self {
        Self {
            transport,
            config,
            state: Snapshot::new(AcquiredState::default()),
        }
    }

    /// Deep copy of the current port table.
    pub fn get_state(&self) -> PortTable {
        self.state.read_with(|s| s.ports.clone())
    }

    /// Last switch temperature in °C, if the switch reports one.
    pub fn switch_temperature(&self) -> Option<f64> {
        self.state.read_with(|s| s.switch_temp_c)
    }

    /// Shared handle to the published snapshot.
    pub fn snapshot(&self) -> Snapshot<AcquiredState> {
        self.state.clone()
    }

    /// Runs one acquisition cycle. Never fails; see the module docs.
    pub async fn poll(&self) {
        match self.acquire().await {
            Ok(state) => self.state.replace(state),
            Err(e) => warn!(error = %e, "acquisition cycle aborted, keeping previous snapshot"),
        }
    }

    /// Walks `base`, turning protocol and decode errors into an empty
    /// table. Transport errors are returned.
    async fn walk_or_empty(&self, base: &[u32], what: &'static str) -> SnmpResult<WalkTable> {
        match self.transport.walk(base).await {
            Ok(table) => Ok(table),
            Err(e) if e.is_cycle_fatal() => Err(e),
            Err(e) => {
                warn!(table = what, oid = %format_oid(base), error = %e, "sub-query failed");
                Ok(WalkTable::new())
            }
        }
    }

    /// One full cycle without committing it.
    #[instrument(skip(self), level = "debug")]
    pub async fn acquire(&self) -> SnmpResult<AcquiredState> {
        let port_count = self.config.read_with(|c| c.port_count());

        let if_names: BTreeMap<u32, String> = self
            .walk_or_empty(oids::IF_NAME, "ifName")
            .await?
            .into_iter()
            .map(|(index, value)| (index, value.as_text()))
            .collect();
        let speeds = self.walk_or_empty(oids::IF_HIGH_SPEED, "ifHighSpeed").await?;
        let opers = self.walk_or_empty(oids::IF_OPER_STATUS, "ifOperStatus").await?;

        let pvid = self.walk_or_empty(oids::DOT1Q_PVID, "dot1qPvid").await?;
        let (vlans, vlan_source) = resolve_vlans(&pvid, || {
            self.walk_or_empty(oids::DOT1Q_VLAN_UNTAGGED, "dot1qVlanCurrentUntaggedPorts")
        })
        .await?;

        let classification = classify_ports(&if_names, port_count);

        let ports: PortTable = classification
            .if_indexes
            .iter()
            .zip(1u32..)
            .map(|(&if_index, port)| {
                let if_name = if_names
                    .get(&if_index)
                    .cloned()
                    .unwrap_or_else(|| if_index.to_string());
                let vlan_id =
                    port_number_from_if_name(&if_name).and_then(|base| vlans.get(&base).copied());
                let state = PortState {
                    port,
                    vlan_id,
                    speed_mbps: speeds.get(&if_index).and_then(|v| v.as_u64()),
                    link_up: opers.get(&if_index).and_then(|v| v.as_u64()) == Some(OPER_STATUS_UP),
                    raw_if_index: if_index,
                    if_name,
                };
                (port, state)
            })
            .collect();

        let switch_temp_c = read_switch_temperature(self.transport.as_ref()).await;

        debug!(
            interfaces = if_names.len(),
            ports = ports.len(),
            path = classification.path.as_str(),
            vlan_source = vlan_source.as_str(),
            temp_c = ?switch_temp_c,
            "acquisition cycle complete"
        );

        Ok(AcquiredState {
            ports,
            switch_temp_c,
        })
    }

    /// Queries model, system name and a port-count guess. Independent of
    /// the periodic snapshot.
    pub async fn detect_switch(&self) -> SnmpResult<DetectedSwitch> {
        let model = self.get_text(oids::SYS_DESCR).await?;
        let system_name = self.get_text(oids::SYS_NAME).await?;

        let if_names = self.transport.walk(oids::IF_NAME).await?;
        let guessed_port_count = if_names
            .values()
            .filter_map(|v| port_number_from_if_name(&v.as_text()))
            .max()
            .map(|n| n as usize)
            .unwrap_or(if_names.len());

        info!(%model, %system_name, guessed_port_count, "switch detected");
        Ok(DetectedSwitch {
            model,
            guessed_port_count,
            system_name,
        })
    }

    async fn get_text(&self, oid: &[u32]) -> SnmpResult<String> {
        match self.transport.get(oid).await {
            Ok(value) => Ok(value.map(|v| v.as_text()).unwrap_or_default()),
            Err(e) if e.is_cycle_fatal() => Err(e),
            Err(e) => {
                warn!(oid = %format_oid(oid), error = %e, "get failed");
                Ok(String::new())
            }
        }
    }

    /// Polls until `cancel` fires. Both the cycle and the wait between
    /// cycles are interrupted by cancellation.
    pub async fn run(&self, cancel: CancellationToken) {
        info!("state acquirer started");
        while !cancel.is_cancelled() {
            tokio::select! {
                _ = cancel.cancelled() => break,
                _ = self.poll() => {}
            }

            let interval = self.config.read_with(|c| c.poll_interval());
            tokio::select! {
                _ = cancel.cancelled() => break,
                _ = tokio::time::sleep(interval) => {}
            }
        }
        info!("state acquirer stopped");
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::EtherlightConfig;
    use crate::snmp::{SnmpError, SnmpValue};
    use async_trait::async_trait;
    use etherlight_types::VlanId;

    struct Tables(BTreeMap<Vec<u32>, WalkTable>);

    #[async_trait]
    impl SnmpTransport for Tables {
        async fn walk(&self, base: &[u32]) -> SnmpResult<WalkTable> {
            self.0
                .get(base)
                .cloned()
                .ok_or_else(|| SnmpError::Protocol("noSuchName".to_string()))
        }

        async fn get(&self, _oid: &[u32]) -> SnmpResult<Option<SnmpValue>> {
            Ok(None)
        }
    }

    fn text(s: &str) -> SnmpValue {
        SnmpValue::OctetString(s.as_bytes().to_vec())
    }

    fn acquirer(tables: Tables, port_count: usize) -> StateAcquirer {
        let mut config = EtherlightConfig::default();
        config.device.ports.count = port_count;
        StateAcquirer::new(Arc::new(tables), ConfigStore::new(config))
    }

    #[tokio::test]
    async fn test_cycle_builds_ports() {
        let tables = Tables(BTreeMap::from([
            (
                oids::IF_NAME.to_vec(),
                WalkTable::from([(1, text("lo")), (3, text("Port 1")), (4, text("Port 2"))]),
            ),
            (
                oids::IF_HIGH_SPEED.to_vec(),
                WalkTable::from([(3, SnmpValue::Unsigned(1000)), (4, SnmpValue::Unsigned(0))]),
            ),
            (
                oids::IF_OPER_STATUS.to_vec(),
                WalkTable::from([(3, SnmpValue::Integer(1)), (4, SnmpValue::Integer(2))]),
            ),
            (
                oids::DOT1Q_PVID.to_vec(),
                WalkTable::from([(1, SnmpValue::Unsigned(10)), (2, SnmpValue::Unsigned(20))]),
            ),
        ]));
        let acq = acquirer(tables, 2);
        acq.poll().await;

        let state = acq.get_state();
        assert_eq!(state.len(), 2);
        let p1 = &state[&1];
        assert_eq!(p1.raw_if_index, 3);
        assert_eq!(p1.vlan_id, VlanId::new(10).ok());
        assert_eq!(p1.speed_mbps, Some(1000));
        assert!(p1.link_up);
        let p2 = &state[&2];
        assert_eq!(p2.if_name, "Port 2");
        assert_eq!(p2.vlan_id, VlanId::new(20).ok());
        assert!(!p2.link_up);
        assert!(p2.is_link_dark());
    }

    #[tokio::test]
    async fn test_missing_tables_degrade() {
        let tables = Tables(BTreeMap::from([(
            oids::IF_NAME.to_vec(),
            WalkTable::from([(1, text("eth0"))]),
        )]));
        let acq = acquirer(tables, 1);
        acq.poll().await;

        let p1 = &acq.get_state()[&1];
        assert_eq!(p1.vlan_id, None);
        assert_eq!(p1.speed_mbps, None);
        assert!(!p1.link_up);
        assert_eq!(acq.switch_temperature(), None);
    }

    #[tokio::test]
    async fn test_detect_guesses_from_trailing_numbers() {
        let tables = Tables(BTreeMap::from([(
            oids::IF_NAME.to_vec(),
            WalkTable::from([(1, text("Port 1")), (2, text("Port 26")), (3, text("lo"))]),
        )]));
        let detected = acquirer(tables, 16).detect_switch().await.unwrap();
        assert_eq!(detected.guessed_port_count, 26);
        assert_eq!(detected.model, "");
    }

    #[tokio::test]
    async fn test_detect_falls_back_to_interface_count() {
        let tables = Tables(BTreeMap::from([(
            oids::IF_NAME.to_vec(),
            WalkTable::from([(1, text("lo")), (2, text("cpu"))]),
        )]));
        let detected = acquirer(tables, 16).detect_switch().await.unwrap();
        assert_eq!(detected.guessed_port_count, 2);
    }
}
