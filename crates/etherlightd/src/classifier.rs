//! Physical port selection from the raw interface table.
//!
//! Switches expose far more interfaces than front-panel ports (CPU,
//! loopback, VLAN SVIs, LAGs). Selection is a name heuristic over the
//! interfaces in ifIndex order with a positional fallback.

use std::collections::BTreeMap;

/// Name fragments that mark an interface as a front-panel port.
const PORT_NAME_HINTS: [&str; 3] = ["eth", "port", "/"];

/// How the selected interfaces were chosen.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ClassificationPath {
    /// Enough interfaces matched the name heuristic.
    NameMatch,
    /// Too few names matched; the first `port_count` ifIndexes were taken
    /// regardless of name. This can select a different physical set.
    IndexFallback,
}

impl ClassificationPath {
    pub fn as_str(&self) -> &'static str {
        match self {
            ClassificationPath::NameMatch => "name-match",
            ClassificationPath::IndexFallback => "index-fallback",
        }
    }
}

/// Result of classifying an interface table.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Classification {
    /// Selected ifIndexes, ascending. Position `i` becomes logical port `i + 1`.
    pub if_indexes: Vec<u32>,
    pub path: ClassificationPath,
}

/// True when an interface name looks like a physical switch port.
pub fn looks_like_port(name: &str) -> bool {
    let lower = name.to_lowercase();
    PORT_NAME_HINTS.iter().any(|hint| lower.contains(hint))
        || (!lower.is_empty() && lower.chars().all(|c| c.is_ascii_digit()))
}

/// Selects up to `port_count` physical ports from `ifIndex → ifName`.
///
/// The name-matched selection is discarded entirely when it yields fewer
/// than `port_count` interfaces.
pub fn classify_ports(if_names: &BTreeMap<u32, String>, port_count: usize) -> Classification {
    let matched: Vec<u32> = if_names
        .iter()
        .filter(|(_, name)| looks_like_port(name))
        .map(|(&index, _)| index)
        .take(port_count)
        .collect();

    if matched.len() >= port_count {
        return Classification {
            if_indexes: matched,
            path: ClassificationPath::NameMatch,
        };
    }

    Classification {
        if_indexes: if_names.keys().copied().take(port_count).collect(),
        path: ClassificationPath::IndexFallback,
    }
}

/// Trailing decimal digits of an interface name, e.g. `"Port 12"` → 12.
///
/// Used to line ports up with the bridge-port numbering of the VLAN
/// tables, which need not match the logical numbering.
pub fn port_number_from_if_name(name: &str) -> Option<u32> {
    let trimmed = name.trim();
    let digits_start = trimmed
        .char_indices()
        .rev()
        .take_while(|(_, c)| c.is_ascii_digit())
        .last()
        .map(|(i, _)| i)?;
    trimmed[digits_start..].parse().ok()
}

#[cfg(test)]
mod tests {
    use super::*;

    fn table(entries: &[(u32, &str)]) -> BTreeMap<u32, String> {
        entries
            .iter()
            .map(|(i, n)| (*i, n.to_string()))
            .collect()
    }

    #[test]
    fn test_looks_like_port() {
        assert!(looks_like_port("eth0"));
        assert!(looks_like_port("Port 7"));
        assert!(looks_like_port("0/12"));
        assert!(looks_like_port("12"));
        assert!(!looks_like_port("lo"));
        assert!(!looks_like_port("switch0"));
        assert!(!looks_like_port(""));
    }

    #[test]
    fn test_name_match_skips_non_ports_in_index_order() {
        let names = table(&[
            (1, "lo"),
            (3, "Port 2"),
            (2, "Port 1"),
            (4, "vlan1"),
            (5, "Port 3"),
        ]);
        let c = classify_ports(&names, 3);
        assert_eq!(c.path, ClassificationPath::NameMatch);
        assert_eq!(c.if_indexes, vec![2, 3, 5]);
    }

    #[test]
    fn test_name_match_stops_at_port_count() {
        let names = table(&[(1, "eth0"), (2, "eth1"), (3, "eth2")]);
        let c = classify_ports(&names, 2);
        assert_eq!(c.if_indexes, vec![1, 2]);
    }

    #[test]
    fn test_too_few_matches_discards_name_selection() {
        let names = table(&[(1, "lo"), (2, "Port 1"), (3, "cpu"), (4, "mgmt")]);
        let c = classify_ports(&names, 3);
        assert_eq!(c.path, ClassificationPath::IndexFallback);
        // Positional, so "lo" is included and "Port 1" lands on logical port 2
        assert_eq!(c.if_indexes, vec![1, 2, 3]);
    }

    #[test]
    fn test_fallback_with_fewer_interfaces_than_ports() {
        let names = table(&[(10, "a"), (11, "b")]);
        let c = classify_ports(&names, 8);
        assert_eq!(c.if_indexes, vec![10, 11]);
    }

    #[test]
    fn test_empty_table() {
        let c = classify_ports(&BTreeMap::new(), 4);
        assert!(c.if_indexes.is_empty());
    }

    #[test]
    fn test_port_number_from_if_name() {
        assert_eq!(port_number_from_if_name("Port 12"), Some(12));
        assert_eq!(port_number_from_if_name("0/3 "), Some(3));
        assert_eq!(port_number_from_if_name("eth0"), Some(0));
        assert_eq!(port_number_from_if_name("uplink"), None);
        assert_eq!(port_number_from_if_name(""), None);
    }
}
