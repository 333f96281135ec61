//! Scripted in-memory SNMP agent shared by the integration tests.

#![allow(dead_code)]

use async_trait::async_trait;
use etherlightd::snmp::oids;
use etherlightd::{SnmpError, SnmpResult, SnmpTransport, SnmpValue, WalkTable};
use parking_lot::Mutex;
use std::collections::{BTreeMap, BTreeSet};

#[derive(Default)]
struct Script {
    tables: BTreeMap<Vec<u32>, WalkTable>,
    scalars: BTreeMap<Vec<u32>, SnmpValue>,
    failing: BTreeSet<Vec<u32>>,
    unreachable: bool,
    walks: Vec<Vec<u32>>,
}

/// Switch whose tables are set up by the test and can be changed or
/// broken between polls.
#[derive(Default)]
pub struct FakeSwitch {
    script: Mutex<Script>,
}

pub fn text(s: &str) -> SnmpValue {
    SnmpValue::OctetString(s.as_bytes().to_vec())
}

impl FakeSwitch {
    pub fn new() -> Self {
        Self::default()
    }

    /// A switch with `ports` front-panel interfaces named "Port N" behind
    /// a loopback and a CPU interface. Every port is up at 1000 Mb/s.
    pub fn with_ports(ports: u32) -> Self {
        let switch = Self::new();
        let mut names = WalkTable::from([(1, text("lo")), (2, text("cpu"))]);
        let mut speeds = WalkTable::new();
        let mut opers = WalkTable::new();
        for n in 1..=ports {
            names.insert(100 + n, text(&format!("Port {}", n)));
            speeds.insert(100 + n, SnmpValue::Unsigned(1000));
            opers.insert(100 + n, SnmpValue::Integer(1));
        }
        switch.set_table(oids::IF_NAME, names);
        switch.set_table(oids::IF_HIGH_SPEED, speeds);
        switch.set_table(oids::IF_OPER_STATUS, opers);
        switch
    }

    pub fn set_table(&self, base: &[u32], table: WalkTable) {
        self.script.lock().tables.insert(base.to_vec(), table);
    }

    pub fn set_row(&self, base: &[u32], index: u32, value: SnmpValue) {
        self.script
            .lock()
            .tables
            .entry(base.to_vec())
            .or_default()
            .insert(index, value);
    }

    pub fn set_scalar(&self, oid: &[u32], value: SnmpValue) {
        self.script.lock().scalars.insert(oid.to_vec(), value);
    }

    /// Makes walks of `base` fail with a protocol error.
    pub fn fail_table(&self, base: &[u32]) {
        self.script.lock().failing.insert(base.to_vec());
    }

    /// Makes every request fail with a transport error.
    pub fn set_unreachable(&self, unreachable: bool) {
        self.script.lock().unreachable = unreachable;
    }

    /// How many times `base` has been walked.
    pub fn walk_count(&self, base: &[u32]) -> usize {
        self.script.lock().walks.iter().filter(|w| w.as_slice() == base).count()
    }
}

#[async_trait]
impl SnmpTransport for FakeSwitch {
    async fn walk(&self, base: &[u32]) -> SnmpResult<WalkTable> {
        let mut script = self.script.lock();
        if script.unreachable {
            return Err(SnmpError::Transport("no route to host".to_string()));
        }
        script.walks.push(base.to_vec());
        if script.failing.contains(base) {
            return Err(SnmpError::Protocol("genErr".to_string()));
        }
        Ok(script.tables.get(base).cloned().unwrap_or_default())
    }

    async fn get(&self, oid: &[u32]) -> SnmpResult<Option<SnmpValue>> {
        let script = self.script.lock();
        if script.unreachable {
            return Err(SnmpError::Transport("no route to host".to_string()));
        }
        Ok(script.scalars.get(oid).cloned())
    }
}
