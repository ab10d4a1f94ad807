// src/matching/blocking.rs - Blocking keys and the filing-side candidate index
use std::collections::{HashMap, HashSet};

use crate::matching::name::first_word;
use crate::matching::phonetic::soundex;
use crate::models::matching::{BlockReason, CandidatePair};
use crate::models::records::{FilingRecord, OrgRecord};
use crate::utils::constants::{FIRST_WORD_MIN_LEN, MIN_BLOCKING_SOURCE_LEN};

/// A cheap key two records must share before they are compared.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct BlockKey {
    pub kind: BlockReason,
    pub value: String,
}

impl BlockKey {
    fn new(kind: BlockReason, value: String) -> Self {
        Self { kind, value }
    }
}

/// Derives the blocking keys of a record from its normalized name and geography.
///
/// State is a qualifier rather than a key source, so the length guard
/// applies to the name and city only.
pub fn generate_keys(normalized_name: &str, city: Option<&str>, state: Option<&str>) -> HashSet<BlockKey> {
    let mut keys = HashSet::new();
    if normalized_name.chars().count() < MIN_BLOCKING_SOURCE_LEN {
        return keys;
    }

    if let Some(state) = state {
        if let Some(city) = city.filter(|c| c.chars().count() >= MIN_BLOCKING_SOURCE_LEN) {
            keys.insert(BlockKey::new(BlockReason::CityState, format!("{}|{}", city, state)));
            if let Some(code) = soundex(city) {
                keys.insert(BlockKey::new(BlockReason::CityPhoneticState, format!("{}|{}", code, state)));
            }
        }
        if let Some(initial) = normalized_name.chars().next() {
            keys.insert(BlockKey::new(BlockReason::FirstLetterState, format!("{}|{}", initial, state)));
        }
    }

    if let Some(word) = first_word(normalized_name).filter(|w| w.chars().count() > FIRST_WORD_MIN_LEN) {
        keys.insert(BlockKey::new(BlockReason::FirstWord, word.to_string()));
    }

    keys
}

/// Blocking keys of a prepared record.
pub fn keys(record: &OrgRecord) -> HashSet<BlockKey> {
    generate_keys(&record.normalized_name, record.city.as_deref(), record.state.as_deref())
}

enum Probe<'a> {
    Miss,
    Hit(&'a [usize]),
    Oversized,
}

/// Inverted index from blocking key to filing positions, built once per run
/// and shared read-only by every matching worker.
#[derive(Debug, Default)]
pub struct BlockingIndex {
    postings: HashMap<BlockKey, Vec<usize>>,
    max_block_size: Option<usize>,
}

impl BlockingIndex {
    pub fn build(filings: &[FilingRecord], max_block_size: Option<usize>) -> Self {
        let mut postings: HashMap<BlockKey, Vec<usize>> = HashMap::new();
        for (idx, filing) in filings.iter().enumerate() {
            for key in &filing.org.blocking_keys {
                postings.entry(key.clone()).or_default().push(idx);
            }
        }
        Self { postings, max_block_size }
    }

    pub fn len(&self) -> usize {
        self.postings.len()
    }

    pub fn is_empty(&self) -> bool {
        self.postings.is_empty()
    }

    /// Number of keys whose posting list is too large to probe.
    pub fn oversized_key_count(&self) -> usize {
        match self.max_block_size {
            Some(max) => self.postings.values().filter(|p| p.len() > max).count(),
            None => 0,
        }
    }

    fn probe(&self, key: &BlockKey) -> Probe<'_> {
        match self.postings.get(key) {
            None => Probe::Miss,
            Some(p) if self.max_block_size.is_some_and(|max| p.len() > max) => Probe::Oversized,
            Some(p) => Probe::Hit(p.as_slice()),
        }
    }

    /// Keys of `company` that hit a block too large to use.
    pub fn oversized_probes(&self, company: &OrgRecord) -> usize {
        company
            .blocking_keys
            .iter()
            .filter(|k| matches!(self.probe(k), Probe::Oversized))
            .count()
    }

    /// Raw candidate stream for one company: one pair per shared key, so a
    /// filing sharing several keys appears several times.
    pub fn candidates_for<'a>(
        &'a self,
        company: &'a OrgRecord,
        filings: &'a [FilingRecord],
    ) -> impl Iterator<Item = CandidatePair<'a>> + 'a {
        company
            .blocking_keys
            .iter()
            .filter_map(move |key| match self.probe(key) {
                Probe::Hit(positions) => Some((key.kind, positions)),
                Probe::Miss | Probe::Oversized => None,
            })
            .flat_map(move |(kind, positions)| {
                positions.iter().map(move |&idx| CandidatePair {
                    company_id: &company.id,
                    filing_id: filings[idx].id(),
                    filing_index: idx,
                    block_reason: kind,
                })
            })
    }
}

/// Candidate pairs for every comparable company, probing the index once per key.
pub fn block<'a>(
    companies: &'a [OrgRecord],
    filings: &'a [FilingRecord],
    index: &'a BlockingIndex,
) -> impl Iterator<Item = CandidatePair<'a>> + 'a {
    companies
        .iter()
        .filter(|c| !c.is_degenerate())
        .flat_map(move |company| index.candidates_for(company, filings))
}

/// Collapses duplicate (company, filing) pairs, keeping the highest-precedence
/// reason. Output is sorted by company id then filing position.
pub fn dedupe_candidates<'a, I>(pairs: I) -> Vec<CandidatePair<'a>>
where
    I: IntoIterator<Item = CandidatePair<'a>>,
{
    let mut best: HashMap<(&'a str, usize), CandidatePair<'a>> = HashMap::new();
    for pair in pairs {
        best.entry((pair.company_id, pair.filing_index))
            .and_modify(|existing| {
                if pair.block_reason < existing.block_reason {
                    existing.block_reason = pair.block_reason;
                }
            })
            .or_insert(pair);
    }
    let mut unique: Vec<CandidatePair<'a>> = best.into_values().collect();
    unique.sort_by(|a, b| a.company_id.cmp(b.company_id).then(a.filing_index.cmp(&b.filing_index)));
    unique
}
