// src/models/matching.rs
use serde::{Deserialize, Serialize};
use std::fmt;

/// Kind of blocking key two records shared. Variants are declared in
/// precedence order: geography first, name fallback last.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum BlockReason {
    CityState,
    CityPhoneticState,
    FirstLetterState,
    FirstWord,
}

impl BlockReason {
    pub fn as_str(&self) -> &'static str {
        match self {
            BlockReason::CityState => "city_state",
            BlockReason::CityPhoneticState => "city_phonetic_state",
            BlockReason::FirstLetterState => "first_letter_state",
            BlockReason::FirstWord => "first_word",
        }
    }
}

impl fmt::Display for BlockReason {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A (company, filing) pair produced by the blocker. Borrowed from the
/// record tables and dropped as soon as it has been scored.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct CandidatePair<'a> {
    pub company_id: &'a str,
    pub filing_id: &'a str,
    pub filing_index: usize,
    pub block_reason: BlockReason,
}

#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
pub struct SignalScores {
    pub exact_match: f64,
    pub trigram_similarity: f64,
    pub token_overlap: f64,
    pub phonetic_edit_similarity: f64,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MatchScore {
    pub company_id: String,
    pub filing_id: String,
    pub signal_scores: SignalScores,
    pub composite_score: f64,
}

/// Confidence bracket of an accepted match, strictest first.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum MatchTier {
    Exact,
    High,
    Medium,
    Low,
}

impl MatchTier {
    pub fn level(&self) -> u8 {
        match self {
            MatchTier::Exact => 1,
            MatchTier::High => 2,
            MatchTier::Medium => 3,
            MatchTier::Low => 4,
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            MatchTier::Exact => "exact",
            MatchTier::High => "high",
            MatchTier::Medium => "medium",
            MatchTier::Low => "low",
        }
    }
}

impl fmt::Display for MatchTier {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "tier {} ({})", self.level(), self.as_str())
    }
}

/// One accepted link for a company. At most one exists per company.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MatchResult {
    pub company_id: String,
    pub filing_id: String,
    pub registry_identifier: Option<String>,
    pub canonical_name: String,
    pub composite_score: f64,
    pub tier: MatchTier,
}
