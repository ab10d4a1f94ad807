//! Registry-identifier exclusion for the filing side of a linkage run.
//! Filings carrying any excluded identifier are dropped before clustering.

use anyhow::{Context, Result};
use log::{debug, info, warn};
use std::collections::HashSet;
use std::env;
use std::fs;
use std::path::Path;

#[derive(Debug, Clone, Default)]
pub struct ExclusionConfig {
    pub enabled: bool,
    pub excluded_identifiers: Vec<String>,
}

impl ExclusionConfig {
    /// Create configuration from environment variables
    pub fn from_env() -> Self {
        let enabled = env::var("EXCLUSION_FILTER_ENABLED")
            .unwrap_or_else(|_| "false".to_string())
            .parse::<bool>()
            .unwrap_or(false);

        let excluded_identifiers = if enabled {
            env::var("EXCLUDED_IDENTIFIERS")
                .unwrap_or_default()
                .split(',')
                .map(|s| s.trim().to_string())
                .filter(|s| !s.is_empty())
                .collect()
        } else {
            Vec::new()
        };

        debug!(
            "Exclusion filter config: enabled={}, identifiers={:?}",
            enabled, excluded_identifiers
        );

        Self { enabled, excluded_identifiers }
    }

    /// Adds identifiers from a file with one value per line. Blank lines and
    /// `#` comments are ignored. Supplying a file enables the filter.
    pub fn with_file(mut self, path: &Path) -> Result<Self> {
        let contents = fs::read_to_string(path)
            .with_context(|| format!("Failed to read exclusion file {}", path.display()))?;

        let before = self.excluded_identifiers.len();
        self.excluded_identifiers.extend(
            contents
                .lines()
                .map(str::trim)
                .filter(|line| !line.is_empty() && !line.starts_with('#'))
                .map(str::to_string),
        );
        debug!(
            "Loaded {} excluded identifiers from {}",
            self.excluded_identifiers.len() - before,
            path.display()
        );
        self.enabled = true;
        Ok(self)
    }

    /// Log the current configuration
    pub fn log_config(&self) {
        if self.is_active() {
            info!("🚫 Identifier exclusion ENABLED");
            info!(
                "   Excluded identifiers: {} ({} distinct)",
                self.excluded_identifiers.len(),
                self.distinct_count()
            );
        } else if self.enabled {
            warn!("⚠️ Identifier exclusion enabled but no identifiers were supplied");
        } else {
            info!("🚫 Identifier exclusion DISABLED - all filings eligible");
        }
    }

    /// Check if filtering is effectively enabled (both flag and identifiers present)
    pub fn is_active(&self) -> bool {
        self.enabled && !self.excluded_identifiers.is_empty()
    }

    /// Raw identifiers to exclude; empty when the filter is inactive.
    pub fn identifiers(&self) -> &[String] {
        if self.is_active() {
            &self.excluded_identifiers
        } else {
            &[]
        }
    }

    /// Distinct raw identifiers, for reporting.
    pub fn distinct_count(&self) -> usize {
        self.identifiers().iter().collect::<HashSet<_>>().len()
    }
}
