// src/utils/progress_bars/logging.rs - Stage-tagged logging helpers for linkage runs
use log::{debug, info, warn};
use std::time::{Duration, Instant};

use crate::models::stats_models::{LinkageStage, RunStats};

#[derive(Clone)]
pub struct StageLogger {
    stage_name: &'static str,
    stage_emoji: &'static str,
    start_time: Instant,
}

impl StageLogger {
    pub fn new(stage: LinkageStage) -> Self {
        let (stage_name, stage_emoji) = match stage {
            LinkageStage::Ingest => ("INGEST", "📥"),
            LinkageStage::Cluster => ("CLUSTER", "🔗"),
            LinkageStage::Index => ("INDEX", "🗂️"),
            LinkageStage::Match => ("MATCH", "🎯"),
        };

        Self {
            stage_name,
            stage_emoji,
            start_time: Instant::now(),
        }
    }

    pub fn log_start(&self, details: &str) {
        info!(
            "[{}] {} 🚀 Starting {} stage ({})",
            self.stage_name,
            self.stage_emoji,
            self.stage_name.to_lowercase(),
            details
        );
    }

    pub fn log_phase(&self, phase: &str, details: Option<&str>) {
        let elapsed = self.start_time.elapsed();
        let msg = if let Some(details) = details {
            format!(
                "[{}] {} 🔄 Phase: {} - {} [+{:.1}s]",
                self.stage_name, self.stage_emoji, phase, details, elapsed.as_secs_f32()
            )
        } else {
            format!(
                "[{}] {} 🔄 Phase: {} [+{:.1}s]",
                self.stage_name, self.stage_emoji, phase, elapsed.as_secs_f32()
            )
        };
        info!("{}", msg);
    }

    pub fn log_records_loaded(&self, count: usize, record_type: &str) {
        info!(
            "[{}] {} 📊 Loaded {} {} records",
            self.stage_name, self.stage_emoji, count, record_type
        );
    }

    /// Warns about records dropped or degraded for a data-quality reason.
    pub fn log_skipped(&self, count: usize, reason: &str) {
        if count > 0 {
            warn!(
                "[{}] {} ⚠️  Data quality: {} records {}",
                self.stage_name, self.stage_emoji, count, reason
            );
        }
    }

    pub fn log_warning(&self, message: &str) {
        warn!("[{}] {} ⚠️  {}", self.stage_name, self.stage_emoji, message);
    }

    pub fn log_debug(&self, message: &str) {
        debug!("[{}] {} {}", self.stage_name, self.stage_emoji, message);
    }

    pub fn log_completion(&self, summary: &str) {
        info!(
            "[{}] {} ✅ COMPLETED in {:.2?}: {}",
            self.stage_name,
            self.stage_emoji,
            self.start_time.elapsed(),
            summary
        );
    }
}

// Pipeline-level logging functions
pub fn log_pipeline_start(run_id: &str, filing_count: usize, worker_threads: usize, filing_signature: &str) {
    info!("🚀 ===== REGISTRY LINKAGE RUN STARTING =====");
    info!("📅 Run ID: {}", run_id);
    info!("   • Prepared filings: {}", filing_count);
    info!("   • Worker threads: {}", worker_threads);
    info!("   • Filing signature: {}", filing_signature);
    info!("=============================================");
}

pub fn log_pipeline_completion(run_id: &str, duration: Duration, stats: &RunStats, avg_composite: f64) {
    info!("🎉 ===== REGISTRY LINKAGE RUN COMPLETED =====");
    info!("📅 Run ID: {}", run_id);
    info!("⏱️  Total Duration: {:.2?}", duration);
    info!(
        "🎯 Companies matched: {}/{} (avg composite: {:.3})",
        stats.companies_matched, stats.companies_read, avg_composite
    );
    for (tier, count) in &stats.matches_by_tier {
        info!("   • {}: {}", tier, count);
    }
    info!(
        "📈 Candidate pairs: {} generated, {} scored",
        stats.candidate_pairs_generated, stats.candidate_pairs_scored
    );
    info!(
        "🔗 Filings: {} read, {} excluded, {} identity clusters",
        stats.filings_read, stats.excluded_filings, stats.identity_clusters
    );
    if stats.input_records_skipped > 0 || stats.oversized_blocks_skipped > 0 {
        warn!(
            "⚠️  Skipped: {} unreadable input records, {} oversized block probes",
            stats.input_records_skipped, stats.oversized_blocks_skipped
        );
    }
    info!(
        "🚫 Not comparable: {} company names, {} filing names; {} companies without candidates",
        stats.degenerate_company_names, stats.degenerate_filing_names, stats.companies_without_candidates
    );
    info!("=============================================");
}
