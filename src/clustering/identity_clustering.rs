// src/clustering/identity_clustering.rs - Registry-identifier clustering of filing records
use log::debug;
use once_cell::sync::Lazy;
use regex::Regex;
use std::collections::hash_map::Entry;
use std::collections::HashMap;

use crate::models::records::FilingRecord;

const DEFAULT_MIN_IDENTIFIER_DIGITS: usize = 5;
const IDENTIFIER_WIDTH: usize = 9;

static IDENTIFIER_SEPARATORS: Lazy<Regex> = Lazy::new(|| Regex::new(r"[\s\-./]").unwrap());

/// Shape a registry identifier must have to take part in clustering.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct IdentifierRules {
    pub min_digits: usize,
    /// Valid identifiers are left-padded with zeros to this width, undoing
    /// spreadsheet exports that drop leading zeros.
    pub width: usize,
}

impl Default for IdentifierRules {
    fn default() -> Self {
        Self {
            min_digits: DEFAULT_MIN_IDENTIFIER_DIGITS,
            width: IDENTIFIER_WIDTH,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum IdentifierCheck {
    Valid(String),
    Missing,
    Malformed,
}

/// Validates and normalizes a raw identifier. Blank values are missing,
/// never a shared empty key.
pub fn check_identifier(raw: Option<&str>, rules: &IdentifierRules) -> IdentifierCheck {
    let Some(raw) = raw else {
        return IdentifierCheck::Missing;
    };
    let compact = IDENTIFIER_SEPARATORS.replace_all(raw, "");
    if compact.is_empty() {
        return IdentifierCheck::Missing;
    }
    let well_formed = compact.chars().all(|c| c.is_ascii_digit())
        && (rules.min_digits..=rules.width).contains(&compact.len())
        && compact.chars().any(|c| c != '0');
    if !well_formed {
        return IdentifierCheck::Malformed;
    }
    IdentifierCheck::Valid(format!("{:0>width$}", compact, width = rules.width))
}

/// Disjoint-set forest over record positions with path compression and
/// union by rank.
#[derive(Debug, Clone)]
pub struct UnionFind {
    parent: Vec<usize>,
    rank: Vec<u8>,
}

impl UnionFind {
    pub fn new(size: usize) -> Self {
        Self {
            parent: (0..size).collect(),
            rank: vec![0; size],
        }
    }

    fn len(&self) -> usize {
        self.parent.len()
    }

    pub fn find(&mut self, x: usize) -> usize {
        let mut root = x;
        while self.parent[root] != root {
            root = self.parent[root];
        }
        let mut node = x;
        while self.parent[node] != root {
            let next = self.parent[node];
            self.parent[node] = root;
            node = next;
        }
        root
    }

    /// Merges the sets holding `a` and `b`; returns false if already merged.
    pub fn union(&mut self, a: usize, b: usize) -> bool {
        let (root_a, root_b) = (self.find(a), self.find(b));
        if root_a == root_b {
            return false;
        }
        match self.rank[root_a].cmp(&self.rank[root_b]) {
            std::cmp::Ordering::Less => self.parent[root_a] = root_b,
            std::cmp::Ordering::Greater => self.parent[root_b] = root_a,
            std::cmp::Ordering::Equal => {
                self.parent[root_b] = root_a;
                self.rank[root_a] += 1;
            }
        }
        true
    }

    pub fn connected(&mut self, a: usize, b: usize) -> bool {
        self.find(a) == self.find(b)
    }

    /// Members of every set, keyed by root, each list in ascending order.
    pub fn groups(&mut self) -> HashMap<usize, Vec<usize>> {
        let mut groups: HashMap<usize, Vec<usize>> = HashMap::new();
        for x in 0..self.len() {
            let root = self.find(x);
            groups.entry(root).or_default().push(x);
        }
        groups
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ClusterSummary {
    /// Clusters holding two or more filings.
    pub multi_record_clusters: usize,
    pub clustered_records: usize,
    pub largest_cluster: usize,
}

/// Unions every filing with the first filing seen carrying each of its
/// identifiers. Identifier-less filings stay singletons.
pub fn build_partition(filings: &[FilingRecord]) -> UnionFind {
    let mut forest = UnionFind::new(filings.len());
    let mut first_holder: HashMap<&str, usize> = HashMap::new();
    for (idx, filing) in filings.iter().enumerate() {
        for identifier in filing.identifiers() {
            match first_holder.entry(identifier) {
                Entry::Occupied(holder) => {
                    forest.union(*holder.get(), idx);
                }
                Entry::Vacant(slot) => {
                    slot.insert(idx);
                }
            }
        }
    }
    forest
}

/// Most frequent non-empty normalized name of the members; ties go to the
/// lexicographically smallest, so the choice never depends on input order.
fn pick_canonical_name(filings: &[FilingRecord], members: &[usize]) -> String {
    let mut counts: HashMap<&str, usize> = HashMap::new();
    for &idx in members {
        let name = filings[idx].org.normalized_name.as_str();
        if !name.is_empty() {
            *counts.entry(name).or_insert(0) += 1;
        }
    }
    counts
        .into_iter()
        .max_by(|a, b| a.1.cmp(&b.1).then_with(|| b.0.cmp(a.0)))
        .map(|(name, _)| name.to_string())
        .unwrap_or_default()
}

/// Writes each cluster's canonical name onto its filings.
pub fn assign_canonical_names(filings: &mut [FilingRecord]) -> ClusterSummary {
    let mut forest = build_partition(filings);
    let mut summary = ClusterSummary::default();

    for members in forest.groups().into_values() {
        if members.len() < 2 {
            continue;
        }
        let canonical = pick_canonical_name(filings, &members);
        debug!(
            "Identity cluster of {} filings resolved to canonical name '{}'",
            members.len(),
            canonical
        );
        summary.multi_record_clusters += 1;
        summary.clustered_records += members.len();
        summary.largest_cluster = summary.largest_cluster.max(members.len());
        for idx in members {
            filings[idx].canonical_name = canonical.clone();
        }
    }
    summary
}

/// Canonical name for every filing id.
pub fn cluster(filings: &[FilingRecord]) -> HashMap<String, String> {
    let mut forest = build_partition(filings);
    let mut canonical_by_id = HashMap::with_capacity(filings.len());
    for members in forest.groups().into_values() {
        let canonical = pick_canonical_name(filings, &members);
        for idx in members {
            canonical_by_id.insert(filings[idx].id().to_string(), canonical.clone());
        }
    }
    canonical_by_id
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::records::FilingInput;

    fn filing(id: &str, name: &str, ein: Option<&str>, priors: &[&str]) -> FilingRecord {
        let input = FilingInput {
            id: id.to_string(),
            name: name.to_string(),
            city: Some("Columbia".to_string()),
            state: Some("SC".to_string()),
            postal_code: None,
            registry_identifier: ein.map(str::to_string),
            prior_identifiers: priors.iter().map(|s| s.to_string()).collect(),
        };
        FilingRecord::from_input(&input, &IdentifierRules::default())
    }

    #[test]
    fn test_check_identifier() {
        let rules = IdentifierRules::default();
        assert_eq!(check_identifier(Some("57-1234567"), &rules), IdentifierCheck::Valid("571234567".into()));
        assert_eq!(check_identifier(Some("12-345"), &rules), check_identifier(Some("12345"), &rules));
        assert_eq!(check_identifier(Some("12345"), &rules), IdentifierCheck::Valid("000012345".into()));
        assert_eq!(check_identifier(None, &rules), IdentifierCheck::Missing);
        assert_eq!(check_identifier(Some(""), &rules), IdentifierCheck::Missing);
        assert_eq!(check_identifier(Some(" - "), &rules), IdentifierCheck::Missing);
        assert_eq!(check_identifier(Some("UNKNOWN"), &rules), IdentifierCheck::Malformed);
        assert_eq!(check_identifier(Some("1234"), &rules), IdentifierCheck::Malformed);
        assert_eq!(check_identifier(Some("1234567890"), &rules), IdentifierCheck::Malformed);
        assert_eq!(check_identifier(Some("00-0000000"), &rules), IdentifierCheck::Malformed);
    }

    #[test]
    fn test_union_find_basics() {
        let mut forest = UnionFind::new(5);
        assert!(forest.union(0, 1));
        assert!(forest.union(3, 4));
        assert!(!forest.union(1, 0));
        assert!(forest.connected(0, 1));
        assert!(!forest.connected(1, 3));
        assert!(forest.union(1, 4));
        assert!(forest.connected(0, 3));
        assert!(!forest.connected(2, 0));
        assert_eq!(forest.groups().len(), 2);
    }

    #[test]
    fn test_equal_identifiers_share_canonical_name() {
        let filings = vec![
            filing("1", "Acme Plastics Inc", Some("12-345"), &[]),
            filing("2", "ACME PLASTICS CORPORATION", Some("12345"), &[]),
            filing("3", "Acme Plastic", None, &[]),
            filing("4", "Beta Tools", Some("  "), &[]),
            filing("5", "Gamma Foods", Some(""), &[]),
        ];
        let canonical = cluster(&filings);
        assert_eq!(canonical["1"], canonical["2"]);
        assert_eq!(canonical["1"], "ACME PLASTICS");
        assert_eq!(canonical["3"], "ACME PLASTIC");
        // Blank identifiers never form a shared key.
        assert_eq!(canonical["4"], "BETA TOOLS");
        assert_eq!(canonical["5"], "GAMMA FOODS");

        let mut forest = build_partition(&filings);
        assert!(forest.connected(0, 1));
        assert!(!forest.connected(3, 4));
    }

    #[test]
    fn test_transitive_identifiers_merge() {
        let mut filings = vec![
            filing("x", "Harbor Logistics", Some("11-1111111"), &[]),
            filing("y", "Harbor Logistics Holdings", Some("22-2222222"), &["11-1111111"]),
            filing("z", "Harbour Logistic", Some("22-2222222"), &[]),
            filing("w", "Unrelated Bakery", Some("33-3333333"), &[]),
        ];
        let mut forest = build_partition(&filings);
        assert!(forest.connected(0, 2));
        assert!(!forest.connected(0, 3));

        let summary = assign_canonical_names(&mut filings);
        assert_eq!(summary.multi_record_clusters, 1);
        assert_eq!(summary.clustered_records, 3);
        assert_eq!(summary.largest_cluster, 3);
        assert_eq!(filings[0].canonical_name, "HARBOR LOGISTICS");
        assert_eq!(filings[2].canonical_name, "HARBOR LOGISTICS");
        assert_eq!(filings[3].canonical_name, "UNRELATED BAKERY");
    }

    #[test]
    fn test_canonical_name_is_order_independent() {
        let forward = vec![
            filing("1", "Riverside Medical Grp", Some("57-1234567"), &[]),
            filing("2", "Riverside Medical Group Inc", Some("571234567"), &[]),
            filing("3", "Riverside Medcal", Some("571234567"), &[]),
        ];
        let mut reversed = forward.clone();
        reversed.reverse();
        assert_eq!(cluster(&forward)["3"], "RIVERSIDE MEDICAL");
        assert_eq!(cluster(&forward), cluster(&reversed));
    }
}
