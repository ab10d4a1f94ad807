// src/models/stats_models.rs
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

use crate::models::matching::{MatchResult, MatchTier};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum LinkageStage {
    Ingest,
    Cluster,
    Index,
    Match,
}

/// Counters for every skip or degrade decision taken during a run.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct RunStats {
    pub companies_read: usize,
    pub filings_read: usize,
    pub input_records_skipped: usize,
    pub missing_identifiers: usize,
    pub malformed_identifiers: usize,
    pub excluded_filings: usize,
    pub degenerate_company_names: usize,
    pub degenerate_filing_names: usize,
    pub identity_clusters: usize,
    pub candidate_pairs_generated: usize,
    pub candidate_pairs_scored: usize,
    pub oversized_blocks_skipped: usize,
    pub companies_without_candidates: usize,
    pub companies_matched: usize,
    pub matches_by_tier: BTreeMap<MatchTier, usize>,
    pub elapsed_secs: f64,
}

impl RunStats {
    pub fn avg_composite_score(results: &[MatchResult]) -> f64 {
        if results.is_empty() {
            return 0.0;
        }
        results.iter().map(|r| r.composite_score).sum::<f64>() / results.len() as f64
    }
}

/// Everything a caller needs to persist from one run.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LinkageOutput {
    pub run_id: String,
    pub started_at: DateTime<Utc>,
    /// Digest of the prepared filing side; unchanged filings give the same value.
    pub filing_signature: String,
    pub results: Vec<MatchResult>,
    pub stats: RunStats,
}
