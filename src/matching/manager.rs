// src/matching/manager.rs - Filing preparation and parallel company matching
use anyhow::{Context, Result};
use chrono::Utc;
use indicatif::{MultiProgress, ProgressBar, ProgressStyle};
use log::debug;
use rayon::prelude::*;
use std::collections::HashSet;
use std::fmt::Display;
use std::sync::Arc;
use std::time::Instant;
use uuid::Uuid;

use crate::clustering::identity_clustering::{assign_canonical_names, check_identifier, IdentifierCheck};
use crate::matching::blocking::{dedupe_candidates, BlockingIndex};
use crate::matching::selector::{select_best, ScoredCandidate};
use crate::matching::similarity::score_pair;
use crate::models::matching::MatchResult;
use crate::models::records::{CompanyInput, FilingInput, FilingRecord, IdentifierStatus, OrgRecord};
use crate::models::stats_models::{LinkageOutput, LinkageStage, RunStats};
use crate::utils::config::LinkageConfig;
use crate::utils::constants::MALFORMED_IDENTIFIER_LOG_LIMIT;
use crate::utils::progress_bars::logging::{log_pipeline_completion, log_pipeline_start, StageLogger};
use crate::utils::progress_bars::progress_config::counting_bar;
use crate::utils::signature::filing_signature;

/// Filing side of a run: normalized, filtered, clustered and indexed once,
/// then shared read-only by every matching worker.
#[derive(Debug)]
pub struct PreparedFilings {
    pub filings: Vec<FilingRecord>,
    pub index: BlockingIndex,
    pub signature: String,
    /// Filing-side counters, carried into every run's statistics.
    pub stats: RunStats,
}

fn stage_spinner(multi_progress: Option<&MultiProgress>, message: &str) -> Option<ProgressBar> {
    multi_progress.map(|mp| {
        let pb = mp.add(ProgressBar::new_spinner());
        pb.set_style(
            ProgressStyle::default_spinner()
                .template("    {spinner:.cyan} {msg}")
                .unwrap_or_else(|_| ProgressStyle::default_spinner()),
        );
        pb.set_message(message.to_string());
        pb
    })
}

/// Reads, filters, clusters and indexes the filing registry.
///
/// Undecodable records are skipped and counted. Filings carrying any
/// excluded identifier are dropped before clustering so they can neither
/// match nor lend their name to a cluster.
pub fn prepare_filings<I, E>(
    records: I,
    excluded_identifiers: &[String],
    config: &LinkageConfig,
    multi_progress: Option<&MultiProgress>,
) -> PreparedFilings
where
    I: IntoIterator<Item = Result<FilingInput, E>>,
    E: Display,
{
    let mut stats = RunStats::default();

    let ingest = StageLogger::new(LinkageStage::Ingest);
    ingest.log_start("filing registry");
    let spinner = stage_spinner(multi_progress, "Reading filings...");

    if !excluded_identifiers.is_empty() {
        let details = format!("{} entries", excluded_identifiers.len());
        ingest.log_phase("Normalizing exclusion list", Some(&details));
    }
    let mut excluded: HashSet<String> = HashSet::new();
    for raw in excluded_identifiers {
        match check_identifier(Some(raw), &config.identifier_rules) {
            IdentifierCheck::Valid(id) => {
                excluded.insert(id);
            }
            IdentifierCheck::Missing | IdentifierCheck::Malformed => {
                ingest.log_warning(&format!("Ignoring unusable exclusion entry '{}'", raw));
            }
        }
    }
    if !excluded.is_empty() {
        ingest.log_debug(&format!("{} distinct identifiers excluded", excluded.len()));
    }

    ingest.log_phase("Reading filing records", None);
    let mut filings = Vec::new();
    let mut malformed_logged = 0;
    for (position, record) in records.into_iter().enumerate() {
        let input = match record {
            Ok(input) => input,
            Err(e) => {
                stats.input_records_skipped += 1;
                ingest.log_warning(&format!("Skipping unreadable filing record #{}: {}", position + 1, e));
                continue;
            }
        };
        stats.filings_read += 1;
        if let Some(pb) = &spinner {
            if stats.filings_read % 1000 == 0 {
                pb.set_message(format!("Read {} filings", stats.filings_read));
            }
        }

        let filing = FilingRecord::from_input(&input, &config.identifier_rules);
        match filing.identifier_status {
            IdentifierStatus::Valid => {}
            IdentifierStatus::Missing => stats.missing_identifiers += 1,
            IdentifierStatus::Malformed => {
                stats.malformed_identifiers += 1;
                if malformed_logged < MALFORMED_IDENTIFIER_LOG_LIMIT {
                    malformed_logged += 1;
                    ingest.log_warning(&format!(
                        "Malformed registry identifier '{}' on filing {}; matching by name only",
                        filing.raw_identifier.as_deref().unwrap_or_default(),
                        filing.id()
                    ));
                }
            }
        }
        stats.malformed_identifiers += filing.malformed_prior_identifiers;

        if filing.identifiers().any(|id| excluded.contains(id)) {
            stats.excluded_filings += 1;
            ingest.log_debug(&format!("Excluding filing {} by identifier", filing.id()));
            continue;
        }
        if filing.org.is_degenerate() {
            stats.degenerate_filing_names += 1;
        }
        filings.push(filing);
    }

    ingest.log_records_loaded(stats.filings_read, "filing");
    ingest.log_skipped(stats.input_records_skipped, "unreadable and skipped");
    ingest.log_skipped(stats.malformed_identifiers, "with malformed identifiers (kept for name matching)");
    ingest.log_skipped(stats.excluded_filings, "excluded by identifier");
    ingest.log_skipped(stats.degenerate_filing_names, "with names too short to compare");
    ingest.log_completion(&format!("{} filings retained", filings.len()));

    let clustering = StageLogger::new(LinkageStage::Cluster);
    if let Some(pb) = &spinner {
        pb.set_message("Clustering filings by registry identifier...");
    }
    let summary = assign_canonical_names(&mut filings);
    stats.identity_clusters = summary.multi_record_clusters;
    clustering.log_completion(&format!(
        "{} multi-filing clusters covering {} filings (largest: {})",
        summary.multi_record_clusters, summary.clustered_records, summary.largest_cluster
    ));

    let indexing = StageLogger::new(LinkageStage::Index);
    if let Some(pb) = &spinner {
        pb.set_message("Building blocking index...");
    }
    let index = BlockingIndex::build(&filings, config.max_block_size);
    let oversized = index.oversized_key_count();
    if oversized > 0 {
        indexing.log_warning(&format!(
            "{} blocking keys exceed {} filings and will not be probed",
            oversized,
            config.max_block_size.unwrap_or_default()
        ));
    }
    if index.is_empty() && !filings.is_empty() {
        indexing.log_warning("No filing produced a blocking key; every company will go unmatched");
    }
    indexing.log_completion(&format!("{} distinct blocking keys", index.len()));

    let signature = filing_signature(&filings);
    if let Some(pb) = spinner {
        pb.finish_with_message(format!("{} filings prepared", filings.len()));
    }

    PreparedFilings {
        filings,
        index,
        signature,
        stats,
    }
}

/// What matching one company produced.
#[derive(Debug, Clone, Default)]
pub struct CompanyOutcome {
    pub result: Option<MatchResult>,
    pub candidate_pairs_generated: usize,
    pub candidate_pairs_scored: usize,
    pub oversized_blocks_skipped: usize,
}

#[derive(Debug, Default)]
struct MatchTally {
    results: Vec<MatchResult>,
    candidate_pairs_generated: usize,
    candidate_pairs_scored: usize,
    oversized_blocks_skipped: usize,
    companies_without_candidates: usize,
}

impl MatchTally {
    fn absorb(mut self, outcome: CompanyOutcome) -> Self {
        if outcome.candidate_pairs_scored == 0 {
            self.companies_without_candidates += 1;
        }
        self.candidate_pairs_generated += outcome.candidate_pairs_generated;
        self.candidate_pairs_scored += outcome.candidate_pairs_scored;
        self.oversized_blocks_skipped += outcome.oversized_blocks_skipped;
        self.results.extend(outcome.result);
        self
    }

    fn merge(mut self, other: Self) -> Self {
        self.results.extend(other.results);
        self.candidate_pairs_generated += other.candidate_pairs_generated;
        self.candidate_pairs_scored += other.candidate_pairs_scored;
        self.oversized_blocks_skipped += other.oversized_blocks_skipped;
        self.companies_without_candidates += other.companies_without_candidates;
        self
    }
}

pub struct LinkageEngine {
    config: LinkageConfig,
    prepared: Arc<PreparedFilings>,
    pool: rayon::ThreadPool,
}

impl LinkageEngine {
    pub fn new(config: LinkageConfig, prepared: PreparedFilings) -> Result<Self> {
        config.validate().context("Invalid linkage configuration")?;
        let pool = rayon::ThreadPoolBuilder::new()
            .num_threads(config.worker_threads)
            .thread_name(|i| format!("linkage-worker-{}", i))
            .build()
            .context("Failed to build matching worker pool")?;
        Ok(Self {
            config,
            prepared: Arc::new(prepared),
            pool,
        })
    }

    /// Keys, probe, dedupe, score and select for one company.
    pub fn match_company(&self, company: &OrgRecord) -> CompanyOutcome {
        if company.is_degenerate() {
            return CompanyOutcome::default();
        }
        let filings = &self.prepared.filings;
        let index = &self.prepared.index;

        let raw: Vec<_> = index.candidates_for(company, filings).collect();
        let candidate_pairs_generated = raw.len();
        let pairs = dedupe_candidates(raw);

        let scored: Vec<ScoredCandidate<'_>> = pairs
            .iter()
            .map(|pair| {
                let filing = &filings[pair.filing_index];
                ScoredCandidate {
                    filing,
                    score: score_pair(company, filing, &self.config.weights),
                }
            })
            .collect();

        let result = select_best(company, &scored, &self.config.tiers);
        if let Some(result) = &result {
            let reason = pairs
                .iter()
                .find(|p| p.filing_id == result.filing_id)
                .map(|p| p.block_reason.as_str())
                .unwrap_or("unknown");
            debug!(
                "Company {} linked to filing {} at {} (composite {:.3}, blocked by {})",
                result.company_id, result.filing_id, result.tier, result.composite_score, reason
            );
        }

        CompanyOutcome {
            result,
            candidate_pairs_generated,
            candidate_pairs_scored: scored.len(),
            oversized_blocks_skipped: index.oversized_probes(company),
        }
    }

    /// Matches every company against the prepared filings on the worker pool.
    ///
    /// Results are sorted by composite score descending, then company id.
    pub fn run<I, E>(&self, companies: I, multi_progress: Option<&MultiProgress>) -> LinkageOutput
    where
        I: IntoIterator<Item = Result<CompanyInput, E>>,
        E: Display,
    {
        let started_at = Utc::now();
        let start = Instant::now();
        let run_id = Uuid::new_v4().to_string();
        let mut stats = self.prepared.stats.clone();

        log_pipeline_start(
            &run_id,
            self.prepared.filings.len(),
            self.config.worker_threads,
            &self.prepared.signature,
        );

        let ingest = StageLogger::new(LinkageStage::Ingest);
        let mut records = Vec::new();
        for (position, record) in companies.into_iter().enumerate() {
            match record {
                Ok(input) => records.push(OrgRecord::from(&input)),
                Err(e) => {
                    stats.input_records_skipped += 1;
                    ingest.log_warning(&format!("Skipping unreadable company record #{}: {}", position + 1, e));
                }
            }
        }
        stats.companies_read = records.len();
        stats.degenerate_company_names = records.iter().filter(|c| c.is_degenerate()).count();
        ingest.log_records_loaded(records.len(), "company");
        ingest.log_skipped(stats.degenerate_company_names, "with names too short to compare");

        let logger = StageLogger::new(LinkageStage::Match);
        logger.log_start(&format!("{} companies on {} workers", records.len(), self.config.worker_threads));
        let pb = counting_bar(multi_progress, records.len() as u64, "match");

        let tally = self.pool.install(|| {
            records
                .par_iter()
                .filter(|company| !company.is_degenerate())
                .map(|company| {
                    let outcome = self.match_company(company);
                    if let Some(pb) = &pb {
                        pb.inc(1);
                    }
                    outcome
                })
                .fold(MatchTally::default, MatchTally::absorb)
                .reduce(MatchTally::default, MatchTally::merge)
        });

        let mut results = tally.results;
        results.sort_by(|a, b| {
            b.composite_score
                .total_cmp(&a.composite_score)
                .then_with(|| a.company_id.cmp(&b.company_id))
        });

        stats.candidate_pairs_generated = tally.candidate_pairs_generated;
        stats.candidate_pairs_scored = tally.candidate_pairs_scored;
        stats.oversized_blocks_skipped = tally.oversized_blocks_skipped;
        stats.companies_without_candidates = tally.companies_without_candidates;
        stats.companies_matched = results.len();
        for result in &results {
            *stats.matches_by_tier.entry(result.tier).or_insert(0) += 1;
        }
        stats.elapsed_secs = start.elapsed().as_secs_f64();

        if let Some(pb) = pb {
            pb.finish_with_message(format!("{} companies matched", results.len()));
        }
        logger.log_completion(&format!(
            "{} of {} companies matched from {} scored pairs",
            stats.companies_matched, stats.companies_read, stats.candidate_pairs_scored
        ));
        log_pipeline_completion(
            &run_id,
            start.elapsed(),
            &stats,
            RunStats::avg_composite_score(&results),
        );

        LinkageOutput {
            run_id,
            started_at,
            filing_signature: self.prepared.signature.clone(),
            results,
            stats,
        }
    }
}

/// Prepares the filings and matches the companies in one call, without progress bars.
pub fn run_linkage<C, F, E1, E2>(
    companies: C,
    filings: F,
    excluded_identifiers: &[String],
    config: LinkageConfig,
) -> Result<LinkageOutput>
where
    C: IntoIterator<Item = Result<CompanyInput, E1>>,
    F: IntoIterator<Item = Result<FilingInput, E2>>,
    E1: Display,
    E2: Display,
{
    let prepared = prepare_filings(filings, excluded_identifiers, &config, None);
    let engine = LinkageEngine::new(config, prepared)?;
    Ok(engine.run(companies, None))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::matching::{BlockReason, MatchTier};

    fn company(id: &str, name: &str, city: Option<&str>, state: &str) -> Result<CompanyInput, String> {
        Ok(CompanyInput {
            id: id.to_string(),
            name: name.to_string(),
            city: city.map(str::to_string),
            state: Some(state.to_string()),
            postal_code: None,
        })
    }

    fn filing(id: &str, name: &str, ein: Option<&str>, city: &str, state: &str) -> Result<FilingInput, String> {
        Ok(FilingInput {
            id: id.to_string(),
            name: name.to_string(),
            city: Some(city.to_string()),
            state: Some(state.to_string()),
            postal_code: None,
            registry_identifier: ein.map(str::to_string),
            prior_identifiers: Vec::new(),
        })
    }

    fn riverside_filings() -> Vec<Result<FilingInput, String>> {
        vec![
            filing("f1", "RIVERSIDE MEDICAL GRP", Some("57-1234567"), "Columbia", "SC"),
            filing("f2", "Riverside Medical Group Inc", Some("57-1234567"), "Columbia", "SC"),
            filing("f3", "Harbor Freight Tools", Some("11-2223333"), "Boston", "MA"),
        ]
    }

    fn test_config() -> LinkageConfig {
        LinkageConfig {
            worker_threads: 2,
            ..LinkageConfig::default()
        }
    }

    #[test]
    fn test_riverside_end_to_end() {
        let companies = vec![company("c1", "Riverside Medical Group", None, "SC")];
        let output = run_linkage(companies, riverside_filings(), &[], test_config()).unwrap();

        assert_eq!(output.results.len(), 1);
        let result = &output.results[0];
        assert_eq!(result.company_id, "c1");
        assert_eq!(result.registry_identifier.as_deref(), Some("571234567"));
        assert_eq!(result.canonical_name, "RIVERSIDE MEDICAL");
        assert!(result.composite_score >= 0.7);
        assert!(matches!(result.tier, MatchTier::Exact | MatchTier::High));

        assert_eq!(output.stats.identity_clusters, 1);
        assert_eq!(output.stats.companies_matched, 1);
        assert_eq!(output.stats.matches_by_tier.get(&result.tier), Some(&1));
        assert_eq!(output.filing_signature.len(), 64);
    }

    #[test]
    fn test_riverside_filings_reached_by_first_word() {
        let prepared = prepare_filings(riverside_filings(), &[], &test_config(), None);
        let input = CompanyInput {
            id: "c1".to_string(),
            name: "Riverside Medical Group".to_string(),
            city: None,
            state: Some("SC".to_string()),
            postal_code: None,
        };
        let company = OrgRecord::from(&input);

        let first_word_hits: HashSet<&str> = prepared
            .index
            .candidates_for(&company, &prepared.filings)
            .filter(|pair| pair.block_reason == BlockReason::FirstWord)
            .map(|pair| pair.filing_id)
            .collect();
        assert_eq!(first_word_hits, HashSet::from(["f1", "f2"]));
    }

    #[test]
    fn test_exact_match_inside_large_city_block() {
        let mut filings: Vec<Result<FilingInput, String>> = (0..25_001)
            .map(|i| filing(&format!("x{}", i), &format!("Alpha Filler {}", i), None, "Columbia", "SC"))
            .collect();
        filings.push(filing("f1", "ABC Co", Some("57-1234567"), "Columbia", "SC"));
        let companies = vec![company("c1", "ABC Co", Some("Columbia"), "SC")];

        let output = run_linkage(companies, filings, &[], test_config()).unwrap();
        assert_eq!(output.stats.oversized_blocks_skipped, 0);
        assert_eq!(output.results.len(), 1);
        assert_eq!(output.results[0].filing_id, "f1");
        assert_eq!(output.results[0].tier, MatchTier::Exact);
    }

    #[test]
    fn test_company_without_overlap_is_unmatched() {
        let companies = vec![company("c9", "Zephyr Aerospace", Some("Seattle"), "WA")];
        let output = run_linkage(companies, riverside_filings(), &[], test_config()).unwrap();

        assert!(output.results.is_empty());
        assert_eq!(output.stats.companies_without_candidates, 1);
        assert_eq!(output.stats.candidate_pairs_scored, 0);
    }

    #[test]
    fn test_excluded_identifier_removes_cluster() {
        let companies = vec![company("c1", "Riverside Medical Group", None, "SC")];
        let excluded = vec!["571234567".to_string(), "not-an-ein".to_string()];
        let output = run_linkage(companies, riverside_filings(), &excluded, test_config()).unwrap();

        assert!(output.results.is_empty());
        assert_eq!(output.stats.excluded_filings, 2);
        assert_eq!(output.stats.identity_clusters, 0);
    }

    #[test]
    fn test_stream_errors_and_bad_identifiers_are_counted() {
        let filings = vec![
            filing("f1", "Riverside Medical Group", Some("UNKNOWN"), "Columbia", "SC"),
            Err("truncated line".to_string()),
            filing("f2", "Palmetto Roofing", None, "Columbia", "SC"),
            filing("f3", "LLC", Some("12-3456789"), "Columbia", "SC"),
        ];
        let companies = vec![
            company("c1", "Riverside Medical Group", Some("Columbia"), "SC"),
            Err("bad json".to_string()),
            company("c2", "Inc", Some("Columbia"), "SC"),
        ];
        let output = run_linkage(companies, filings, &[], test_config()).unwrap();
        let stats = &output.stats;

        assert_eq!(stats.input_records_skipped, 2);
        assert_eq!(stats.filings_read, 3);
        assert_eq!(stats.companies_read, 2);
        assert_eq!(stats.malformed_identifiers, 1);
        assert_eq!(stats.missing_identifiers, 1);
        assert_eq!(stats.degenerate_filing_names, 1);
        assert_eq!(stats.degenerate_company_names, 1);

        // A malformed identifier still leaves the filing matchable by name.
        assert_eq!(output.results.len(), 1);
        assert_eq!(output.results[0].filing_id, "f1");
        assert_eq!(output.results[0].registry_identifier, None);
    }

    #[test]
    fn test_results_sorted_and_one_per_company() {
        let filings = vec![
            filing("f1", "Riverside Medical Group", Some("57-1234567"), "Columbia", "SC"),
            filing("f2", "Riverside Medical Center", Some("57-7654321"), "Columbia", "SC"),
            filing("f3", "Palmetto Roofing", Some("57-1111111"), "Columbia", "SC"),
        ];
        let companies = vec![
            company("c2", "Riverside Medical", Some("Columbia"), "SC"),
            company("c1", "Palmetto Roofing Co", Some("Columbia"), "SC"),
            company("c3", "Riverside Medical Centre", Some("Columbia"), "SC"),
        ];
        let output = run_linkage(companies, filings, &[], test_config()).unwrap();

        let ids: Vec<&str> = output.results.iter().map(|r| r.company_id.as_str()).collect();
        assert_eq!(ids.len(), 3);
        assert!(output
            .results
            .windows(2)
            .all(|w| w[0].composite_score >= w[1].composite_score));
        // Exact-name ties are ordered by company id.
        assert_eq!(&ids[..2], ["c1", "c2"]);
        assert_eq!(output.results[0].filing_id, "f3");
        assert_eq!(output.results[1].filing_id, "f1");
        assert_eq!(output.results[2].filing_id, "f2");
    }

    #[test]
    fn test_prepared_filings_are_reusable() {
        let prepared = prepare_filings(riverside_filings(), &[], &test_config(), None);
        assert_eq!(prepared.filings.len(), 3);
        assert_eq!(prepared.filings[0].canonical_name, prepared.filings[1].canonical_name);

        let engine = LinkageEngine::new(test_config(), prepared).unwrap();
        let first = engine.run(vec![company("c1", "Riverside Medical Group", None, "SC")], None);
        let second = engine.run(vec![company("c1", "Riverside Medical Group", None, "SC")], None);
        assert_eq!(first.results, second.results);
        assert_eq!(first.filing_signature, second.filing_signature);
        assert_ne!(first.run_id, second.run_id);
    }

    #[test]
    fn test_invalid_config_is_rejected() {
        let prepared = prepare_filings(riverside_filings(), &[], &test_config(), None);
        let mut config = test_config();
        config.tiers.clear();
        assert!(LinkageEngine::new(config, prepared).is_err());
    }
}
