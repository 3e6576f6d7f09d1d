//! Pairwise overlap detection between network prefixes.

use ipnet::IpNet;
use serde::{Deserialize, Serialize};

use crate::errors::AuditError;

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PrefixRecord {
    pub id: String,
    pub network: String,
}

impl PrefixRecord {
    pub fn new(id: impl Into<String>, network: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            network: network.into(),
        }
    }
}

/// Unordered pair of overlapping records; `id_a` is the earlier input record.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct OverlapPair {
    pub id_a: String,
    pub id_b: String,
}

impl OverlapPair {
    /// Order-independent identity of the pair.
    pub fn key(&self) -> (&str, &str) {
        if self.id_a <= self.id_b {
            (&self.id_a, &self.id_b)
        } else {
            (&self.id_b, &self.id_a)
        }
    }
}

/// Parse a prefix and zero its host bits, e.g. `10.0.0.7/16` -> `10.0.0.0/16`.
pub fn parse_prefix(record: &PrefixRecord) -> Result<IpNet, AuditError> {
    record
        .network
        .trim()
        .parse::<IpNet>()
        .map(|net| net.trunc())
        .map_err(|e| AuditError::MalformedPrefix {
            id: record.id.clone(),
            network: record.network.clone(),
            reason: e.to_string(),
        })
}

/// Two canonical prefixes overlap iff one contains the other's base address.
pub fn prefixes_overlap(a: &IpNet, b: &IpNet) -> bool {
    a.contains(&b.network()) || b.contains(&a.network())
}

/// Every overlapping unordered pair among `records`, each reported once.
///
/// All records are parsed before any comparison; the first malformed one
/// aborts the detection.
pub fn find_overlaps(records: &[PrefixRecord]) -> Result<Vec<OverlapPair>, AuditError> {
    let prefixes = records
        .iter()
        .map(parse_prefix)
        .collect::<Result<Vec<_>, _>>()?;

    let mut pairs = Vec::new();
    for i in 0..prefixes.len() {
        for j in (i + 1)..prefixes.len() {
            if prefixes_overlap(&prefixes[i], &prefixes[j]) {
                pairs.push(OverlapPair {
                    id_a: records[i].id.clone(),
                    id_b: records[j].id.clone(),
                });
            }
        }
    }
    Ok(pairs)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn rec(id: &str, net: &str) -> PrefixRecord {
        PrefixRecord::new(id, net)
    }

    #[test]
    fn test_contained_prefix_overlaps() {
        let pairs = find_overlaps(&[
            rec("a", "10.0.0.0/16"),
            rec("b", "10.0.128.0/17"),
            rec("c", "192.168.1.0/24"),
        ])
        .unwrap();
        assert_eq!(
            pairs,
            vec![OverlapPair {
                id_a: "a".into(),
                id_b: "b".into()
            }]
        );
    }

    #[test]
    fn test_adjacent_prefixes_do_not_overlap() {
        let pairs = find_overlaps(&[rec("a", "10.0.0.0/25"), rec("b", "10.0.0.128/25")]).unwrap();
        assert!(pairs.is_empty());
    }

    #[test]
    fn test_identical_prefixes_overlap() {
        let pairs = find_overlaps(&[rec("a", "172.16.0.0/24"), rec("b", "172.16.0.0/24")]).unwrap();
        assert_eq!(pairs.len(), 1);
    }

    #[test]
    fn test_host_bits_are_canonicalized() {
        let pairs = find_overlaps(&[rec("a", "10.1.2.3/16"), rec("b", "10.1.200.0/24")]).unwrap();
        assert_eq!(pairs.len(), 1);
    }

    #[test]
    fn test_mixed_families_never_overlap() {
        let pairs = find_overlaps(&[rec("v4", "0.0.0.0/0"), rec("v6", "::/0")]).unwrap();
        assert!(pairs.is_empty());
    }

    #[test]
    fn test_ipv6_overlap() {
        let pairs =
            find_overlaps(&[rec("a", "2001:db8::/32"), rec("b", "2001:db8:1::/48")]).unwrap();
        assert_eq!(pairs.len(), 1);
    }

    #[test]
    fn test_malformed_prefix_names_record() {
        let err = find_overlaps(&[rec("ok", "10.0.0.0/8"), rec("subnet-bad", "10.0.0.0/33")])
            .unwrap_err();
        match err {
            AuditError::MalformedPrefix { id, network, .. } => {
                assert_eq!(id, "subnet-bad");
                assert_eq!(network, "10.0.0.0/33");
            }
            other => panic!("unexpected error: {other}"),
        }
    }

    #[test]
    fn test_empty_and_single_inputs() {
        assert!(find_overlaps(&[]).unwrap().is_empty());
        assert!(find_overlaps(&[rec("a", "10.0.0.0/8")]).unwrap().is_empty());
    }

    #[test]
    fn test_pair_key_is_order_independent() {
        let ab = OverlapPair { id_a: "a".into(), id_b: "b".into() };
        let ba = OverlapPair { id_a: "b".into(), id_b: "a".into() };
        assert_eq!(ab.key(), ba.key());
    }
}
