//! Integration tests for the State Acquirer
//!
//! Drives full acquisition cycles against a scripted switch:
//! - port selection and logical numbering
//! - VLAN resolution precedence
//! - per-query degradation and cycle aborts
//! - cancellation of the polling loop

mod common;

use common::{text, FakeSwitch};
use etherlight_types::VlanId;
use etherlightd::snmp::oids;
use etherlight_types::{PortState, PortTable};
use etherlightd::{
    AcquiredState, ConfigStore, EtherlightConfig, SnmpValue, StateAcquirer, UdpSnmpClient,
    WalkTable,
};
use pretty_assertions::assert_eq;
use std::sync::Arc;
use std::time::Duration;
use tokio_util::sync::CancellationToken;

fn acquirer(switch: &Arc<FakeSwitch>, port_count: usize) -> StateAcquirer {
    let mut config = EtherlightConfig::default();
    config.device.ports.count = port_count;
    StateAcquirer::new(switch.clone(), ConfigStore::new(config))
}

fn vlan(id: u16) -> Option<VlanId> {
    VlanId::new(id).ok()
}

#[tokio::test]
async fn test_keys_are_ascending_prefix() {
    for (switch_ports, configured) in [(16, 16), (24, 16), (5, 8), (0, 4), (3, 1)] {
        let switch = Arc::new(FakeSwitch::with_ports(switch_ports));
        let acq = acquirer(&switch, configured);
        acq.poll().await;

        let state = acq.get_state();
        assert!(state.len() <= configured);
        let keys: Vec<u32> = state.keys().copied().collect();
        let expected: Vec<u32> = (1..=state.len() as u32).collect();
        assert_eq!(keys, expected, "switch {} ports, configured {}", switch_ports, configured);
        for (port, entry) in &state {
            assert_eq!(entry.port, *port);
        }
    }
}

#[tokio::test]
async fn test_name_match_skips_non_port_interfaces() {
    let switch = Arc::new(FakeSwitch::with_ports(8));
    let acq = acquirer(&switch, 8);
    acq.poll().await;

    let state = acq.get_state();
    assert_eq!(state.len(), 8);
    assert_eq!(state[&1].if_name, "Port 1");
    assert_eq!(state[&1].raw_if_index, 101);
    assert_eq!(state[&8].raw_if_index, 108);
}

#[tokio::test]
async fn test_index_fallback_when_too_few_names_match() {
    // Only 5 names match but 8 are configured: the first 8 interfaces by
    // index are taken, loopback and CPU included.
    let switch = Arc::new(FakeSwitch::with_ports(5));
    let acq = acquirer(&switch, 8);
    acq.poll().await;

    let state = acq.get_state();
    assert_eq!(state.len(), 7);
    assert_eq!(state[&1].if_name, "lo");
    assert_eq!(state[&2].if_name, "cpu");
    assert_eq!(state[&3].if_name, "Port 1");
    assert_eq!(state[&1].vlan_id, None);
}

#[tokio::test]
async fn test_polling_is_idempotent() {
    let switch = Arc::new(FakeSwitch::with_ports(4));
    switch.set_table(
        oids::DOT1Q_PVID,
        WalkTable::from([(1, SnmpValue::Unsigned(10)), (3, SnmpValue::Unsigned(30))]),
    );
    let acq = acquirer(&switch, 4);

    acq.poll().await;
    let first = acq.get_state();
    acq.poll().await;
    let second = acq.get_state();

    assert_eq!(first, second);
}

#[tokio::test]
async fn test_pvid_precedence_ignores_bitmap() {
    let switch = Arc::new(FakeSwitch::with_ports(4));
    switch.set_table(
        oids::DOT1Q_PVID,
        WalkTable::from([(2, SnmpValue::Unsigned(20))]),
    );
    switch.set_table(
        oids::DOT1Q_VLAN_UNTAGGED,
        WalkTable::from([(99, SnmpValue::OctetString(vec![0xF0]))]),
    );
    let acq = acquirer(&switch, 4);
    acq.poll().await;

    let state = acq.get_state();
    assert_eq!(state[&1].vlan_id, None);
    assert_eq!(state[&2].vlan_id, vlan(20));
    assert_eq!(state[&3].vlan_id, None);
    assert_eq!(switch.walk_count(oids::DOT1Q_VLAN_UNTAGGED), 0);
}

#[tokio::test]
async fn test_bitmap_fallback_when_pvid_empty() {
    let switch = Arc::new(FakeSwitch::with_ports(4));
    switch.set_table(
        oids::DOT1Q_VLAN_UNTAGGED,
        WalkTable::from([
            (30, SnmpValue::OctetString(vec![0x30])),
            (10, SnmpValue::OctetString(vec![0xE0])),
        ]),
    );
    let acq = acquirer(&switch, 4);
    acq.poll().await;

    let state = acq.get_state();
    assert_eq!(state[&1].vlan_id, vlan(10));
    assert_eq!(state[&2].vlan_id, vlan(10));
    // Claimed by both VLANs: lowest id wins
    assert_eq!(state[&3].vlan_id, vlan(10));
    assert_eq!(state[&4].vlan_id, vlan(30));
    assert_eq!(switch.walk_count(oids::DOT1Q_VLAN_UNTAGGED), 1);
}

#[tokio::test]
async fn test_bitmap_fallback_ignores_tagged_membership() {
    let switch = Arc::new(FakeSwitch::with_ports(2));
    // Port 1 is a tagged member of VLAN 10 and untagged in VLAN 20
    switch.set_table(
        oids::DOT1Q_VLAN_EGRESS,
        WalkTable::from([
            (10, SnmpValue::OctetString(vec![0x80])),
            (20, SnmpValue::OctetString(vec![0xC0])),
        ]),
    );
    switch.set_table(
        oids::DOT1Q_VLAN_UNTAGGED,
        WalkTable::from([(20, SnmpValue::OctetString(vec![0xC0]))]),
    );
    let acq = acquirer(&switch, 2);
    acq.poll().await;

    let state = acq.get_state();
    assert_eq!(state[&1].vlan_id, vlan(20));
    assert_eq!(state[&2].vlan_id, vlan(20));
    assert_eq!(switch.walk_count(oids::DOT1Q_VLAN_EGRESS), 0);
}

#[tokio::test]
async fn test_out_of_range_pvid_ignored() {
    let switch = Arc::new(FakeSwitch::with_ports(2));
    switch.set_table(
        oids::DOT1Q_PVID,
        WalkTable::from([(1, SnmpValue::Unsigned(4095)), (2, SnmpValue::Unsigned(7))]),
    );
    let acq = acquirer(&switch, 2);
    acq.poll().await;

    let state = acq.get_state();
    assert_eq!(state[&1].vlan_id, None);
    assert_eq!(state[&2].vlan_id, vlan(7));
}

#[tokio::test]
async fn test_interface_without_trailing_digits_has_no_vlan() {
    let switch = Arc::new(FakeSwitch::new());
    switch.set_table(
        oids::IF_NAME,
        WalkTable::from([(1, text("eth-uplink")), (2, text("eth2"))]),
    );
    switch.set_table(
        oids::DOT1Q_PVID,
        WalkTable::from([(1, SnmpValue::Unsigned(5)), (2, SnmpValue::Unsigned(6))]),
    );
    let acq = acquirer(&switch, 2);
    acq.poll().await;

    let state = acq.get_state();
    assert_eq!(state[&1].vlan_id, None);
    assert_eq!(state[&2].vlan_id, vlan(6));
}

#[tokio::test]
async fn test_failed_sub_query_degrades_only_its_field() {
    let switch = Arc::new(FakeSwitch::with_ports(2));
    switch.set_table(oids::DOT1Q_PVID, WalkTable::from([(1, SnmpValue::Unsigned(10))]));
    switch.fail_table(oids::IF_HIGH_SPEED);
    let acq = acquirer(&switch, 2);
    acq.poll().await;

    let state = acq.get_state();
    assert_eq!(state.len(), 2);
    assert_eq!(state[&1].speed_mbps, None);
    assert!(state[&1].link_up);
    assert!(state[&1].is_link_dark());
    assert_eq!(state[&1].vlan_id, vlan(10));
}

#[tokio::test]
async fn test_failed_name_walk_commits_empty_snapshot() {
    let switch = Arc::new(FakeSwitch::with_ports(2));
    let acq = acquirer(&switch, 2);
    acq.poll().await;
    assert_eq!(acq.get_state().len(), 2);

    switch.fail_table(oids::IF_NAME);
    acq.poll().await;
    assert!(acq.get_state().is_empty());
}

#[tokio::test]
async fn test_transport_failure_keeps_previous_snapshot() {
    let switch = Arc::new(FakeSwitch::with_ports(3));
    let acq = acquirer(&switch, 3);
    acq.poll().await;
    let before = acq.get_state();
    assert_eq!(before.len(), 3);

    switch.set_unreachable(true);
    switch.set_row(oids::IF_OPER_STATUS, 101, SnmpValue::Integer(2));
    acq.poll().await;
    assert_eq!(acq.get_state(), before);

    switch.set_unreachable(false);
    acq.poll().await;
    assert!(!acq.get_state()[&1].link_up);
}

#[tokio::test]
async fn test_silent_switch_keeps_previous_snapshot() {
    let previous = AcquiredState {
        ports: PortTable::from([(
            1,
            PortState {
                port: 1,
                vlan_id: vlan(10),
                speed_mbps: Some(1000),
                link_up: true,
                raw_if_index: 101,
                if_name: "Port 1".to_string(),
            },
        )]),
        switch_temp_c: Some(48.0),
    };

    // Nothing listens on the discard port
    let client = UdpSnmpClient::new("127.0.0.1", 9, "public", Duration::from_millis(100));
    let mut config = EtherlightConfig::default();
    config.device.ports.count = 1;
    let acq = StateAcquirer::new(Arc::new(client), ConfigStore::new(config));
    acq.snapshot().replace(previous.clone());

    acq.poll().await;

    assert_eq!(acq.get_state(), previous.ports);
    assert_eq!(acq.switch_temperature(), Some(48.0));
}

#[tokio::test]
async fn test_switch_temperature_committed_with_ports() {
    let switch = Arc::new(FakeSwitch::with_ports(1));
    switch.set_scalar(oids::UBNT_TEMPERATURE[0], SnmpValue::Integer(52));
    let acq = acquirer(&switch, 1);
    assert_eq!(acq.switch_temperature(), None);
    acq.poll().await;
    assert_eq!(acq.switch_temperature(), Some(52.0));
}

#[tokio::test]
async fn test_detect_switch() {
    let switch = Arc::new(FakeSwitch::with_ports(24));
    switch.set_scalar(oids::SYS_DESCR, text("USW-24-PoE"));
    switch.set_scalar(oids::SYS_NAME, text("core-sw"));
    let acq = acquirer(&switch, 16);

    let detected = acq.detect_switch().await.unwrap();
    assert_eq!(detected.model, "USW-24-PoE");
    assert_eq!(detected.system_name, "core-sw");
    assert_eq!(detected.guessed_port_count, 24);
    // Detection does not touch the snapshot
    assert!(acq.get_state().is_empty());
}

#[tokio::test]
async fn test_run_stops_promptly_on_cancel() {
    let switch = Arc::new(FakeSwitch::with_ports(4));
    let acq = Arc::new(acquirer(&switch, 4));
    let cancel = CancellationToken::new();

    let handle = {
        let acq = acq.clone();
        let cancel = cancel.clone();
        tokio::spawn(async move { acq.run(cancel).await })
    };

    // First cycle runs immediately, then the loop waits out the 5 s interval
    tokio::time::sleep(Duration::from_millis(100)).await;
    assert_eq!(acq.get_state().len(), 4);

    cancel.cancel();
    tokio::time::timeout(Duration::from_secs(1), handle)
        .await
        .expect("acquirer did not stop within one second")
        .unwrap();
}
