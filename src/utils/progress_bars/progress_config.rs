// src/utils/progress_bars/progress_config.rs

use indicatif::{MultiProgress, ProgressBar, ProgressStyle};
use log::info;
use std::env;

use crate::utils::get_memory_usage;

/// Which progress output a linkage run shows.
#[derive(Debug, Clone)]
pub struct ProgressConfig {
    /// Master switch; off means no bars at all.
    pub enabled: bool,
    /// Spinner over filing ingest, clustering and indexing.
    pub preparation: bool,
    /// Log used memory after preparation and after matching.
    pub report_memory: bool,
}

impl Default for ProgressConfig {
    fn default() -> Self {
        Self {
            enabled: true,
            preparation: true,
            report_memory: false,
        }
    }
}

fn env_flag(key: &str, default: bool) -> bool {
    env::var(key)
        .ok()
        .and_then(|v| v.trim().parse().ok())
        .unwrap_or(default)
}

impl ProgressConfig {
    /// `PROGRESS_ENABLED`, `PROGRESS_PREPARATION` and `PROGRESS_SHOW_MEMORY`;
    /// unparsable flags keep their defaults.
    pub fn from_env() -> Self {
        let defaults = Self::default();
        Self {
            enabled: env_flag("PROGRESS_ENABLED", defaults.enabled),
            preparation: env_flag("PROGRESS_PREPARATION", defaults.preparation),
            report_memory: env_flag("PROGRESS_SHOW_MEMORY", defaults.report_memory),
        }
    }

    pub fn create_multi_progress(&self) -> Option<MultiProgress> {
        self.enabled.then(MultiProgress::new)
    }

    /// The progress target for filing preparation, if its spinner is wanted.
    pub fn preparation_target<'a>(&self, multi_progress: Option<&'a MultiProgress>) -> Option<&'a MultiProgress> {
        multi_progress.filter(|_| self.preparation)
    }

    pub fn log_memory(&self, checkpoint: &str) {
        if self.report_memory {
            info!("💾 Memory after {}: {} MB", checkpoint, get_memory_usage());
        }
    }
}

/// Adds a counting bar to `multi_progress`, or returns `None` when progress is off.
pub fn counting_bar(multi_progress: Option<&MultiProgress>, total: u64, prefix: &str) -> Option<ProgressBar> {
    multi_progress.map(|mp| {
        let pb = mp.add(ProgressBar::new(total));
        pb.set_style(
            ProgressStyle::default_bar()
                .template("  {spinner:.blue} {prefix} [{elapsed_precise}] {bar:30.green/blue} {pos}/{len} {msg}")
                .unwrap_or_else(|_| ProgressStyle::default_bar())
                .progress_chars("█▉▊▋▌▍▎▏  "),
        );
        pb.set_prefix(prefix.to_string());
        pb
    })
}
