//! Switch chassis temperature over SNMP.
//!
//! UniFi switches expose the value under a private OID; everything else
//! is tried through ENTITY-SENSOR-MIB.

use tracing::trace;

use crate::snmp::{format_oid, oids, SnmpTransport, SnmpValue};

/// entPhySensorType value for degrees Celsius.
const SENSOR_TYPE_CELSIUS: u64 = 8;

/// Readings outside this open interval are treated as bogus.
const PLAUSIBLE_RANGE: (f64, f64) = (-40.0, 150.0);

fn plausible(value: &SnmpValue) -> Option<f64> {
    value
        .as_f64()
        .filter(|v| *v > PLAUSIBLE_RANGE.0 && *v < PLAUSIBLE_RANGE.1)
}

fn is_celsius_sensor(sensor_type: &SnmpValue) -> bool {
    sensor_type.as_text().to_lowercase().contains("celsius")
        || sensor_type.as_u64() == Some(SENSOR_TYPE_CELSIUS)
}

/// Reads the switch temperature in °C, `None` when no source answers
/// with a plausible value. Errors never escape.
pub async fn read_switch_temperature(transport: &dyn SnmpTransport) -> Option<f64> {
    for oid in oids::UBNT_TEMPERATURE {
        match transport.get(oid).await {
            Ok(Some(value)) => {
                if let Some(celsius) = plausible(&value) {
                    return Some(celsius);
                }
            }
            Ok(None) => {}
            Err(e) => trace!(oid = %format_oid(oid), error = %e, "temperature get failed"),
        }
    }

    let types = match transport.walk(oids::ENT_SENSOR_TYPE).await {
        Ok(types) => types,
        Err(e) => {
            trace!(error = %e, "entity sensor walk failed");
            return None;
        }
    };
    if !types.values().any(is_celsius_sensor) {
        return None;
    }
    let values = match transport.walk(oids::ENT_SENSOR_VALUE).await {
        Ok(values) => values,
        Err(e) => {
            trace!(error = %e, "entity sensor value walk failed");
            return None;
        }
    };

    types
        .iter()
        .filter(|(_, sensor_type)| is_celsius_sensor(sensor_type))
        .find_map(|(index, _)| values.get(index).and_then(plausible))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::snmp::{SnmpError, SnmpResult, WalkTable};
    use async_trait::async_trait;
    use std::collections::BTreeMap;

    #[derive(Default)]
    struct Agent {
        scalars: BTreeMap<Vec<u32>, SnmpValue>,
        tables: BTreeMap<Vec<u32>, WalkTable>,
        broken: bool,
    }

    #[async_trait]
    impl SnmpTransport for Agent {
        async fn walk(&self, base: &[u32]) -> SnmpResult<WalkTable> {
            if self.broken {
                return Err(SnmpError::Protocol("genErr".to_string()));
            }
            Ok(self.tables.get(base).cloned().unwrap_or_default())
        }

        async fn get(&self, oid: &[u32]) -> SnmpResult<Option<SnmpValue>> {
            if self.broken {
                return Err(SnmpError::Protocol("genErr".to_string()));
            }
            Ok(self.scalars.get(oid).cloned())
        }
    }

    #[tokio::test]
    async fn test_ubnt_oid_first() {
        let mut agent = Agent::default();
        agent
            .scalars
            .insert(oids::UBNT_TEMPERATURE[1].to_vec(), SnmpValue::Integer(47));
        agent.tables.insert(
            oids::ENT_SENSOR_TYPE.to_vec(),
            WalkTable::from([(1, SnmpValue::Integer(8))]),
        );
        agent.tables.insert(
            oids::ENT_SENSOR_VALUE.to_vec(),
            WalkTable::from([(1, SnmpValue::Integer(30))]),
        );
        assert_eq!(read_switch_temperature(&agent).await, Some(47.0));
    }

    #[tokio::test]
    async fn test_implausible_ubnt_value_skipped() {
        let mut agent = Agent::default();
        agent
            .scalars
            .insert(oids::UBNT_TEMPERATURE[0].to_vec(), SnmpValue::Integer(200));
        agent.tables.insert(
            oids::ENT_SENSOR_TYPE.to_vec(),
            WalkTable::from([
                (1, SnmpValue::Integer(10)),
                (2, SnmpValue::OctetString(b"degreesCelsius".to_vec())),
            ]),
        );
        agent.tables.insert(
            oids::ENT_SENSOR_VALUE.to_vec(),
            WalkTable::from([(1, SnmpValue::Integer(12)), (2, SnmpValue::Integer(39))]),
        );
        assert_eq!(read_switch_temperature(&agent).await, Some(39.0));
    }

    #[tokio::test]
    async fn test_no_source_is_none() {
        assert_eq!(read_switch_temperature(&Agent::default()).await, None);
        let broken = Agent {
            broken: true,
            ..Agent::default()
        };
        assert_eq!(read_switch_temperature(&broken).await, None);
    }
}
