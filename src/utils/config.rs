// src/utils/config.rs - Scoring weights, tier rules and engine settings
use anyhow::{bail, Context, Result};
use log::info;
use serde::{Deserialize, Serialize};
use std::env;
use std::str::FromStr;

use crate::clustering::identity_clustering::IdentifierRules;
use crate::matching::selector::{default_tier_rules, TierRule};
use crate::models::matching::{MatchTier, SignalScores};
use crate::utils::constants::{
    DEFAULT_WEIGHT_EXACT, DEFAULT_WEIGHT_PHONETIC, DEFAULT_WEIGHT_TOKEN, DEFAULT_WEIGHT_TRIGRAM,
    WEIGHT_SUM_TOLERANCE,
};

/// Per-signal weights of the composite score. They must sum to 1.0.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct SignalWeights {
    pub exact_match: f64,
    pub trigram_similarity: f64,
    pub token_overlap: f64,
    pub phonetic_edit_similarity: f64,
}

impl Default for SignalWeights {
    fn default() -> Self {
        Self {
            exact_match: DEFAULT_WEIGHT_EXACT,
            trigram_similarity: DEFAULT_WEIGHT_TRIGRAM,
            token_overlap: DEFAULT_WEIGHT_TOKEN,
            phonetic_edit_similarity: DEFAULT_WEIGHT_PHONETIC,
        }
    }
}

impl SignalWeights {
    fn as_array(&self) -> [(&'static str, f64); 4] {
        [
            ("exact_match", self.exact_match),
            ("trigram_similarity", self.trigram_similarity),
            ("token_overlap", self.token_overlap),
            ("phonetic_edit_similarity", self.phonetic_edit_similarity),
        ]
    }

    pub fn validate(&self) -> Result<()> {
        for (name, weight) in self.as_array() {
            if !(0.0..=1.0).contains(&weight) {
                bail!("Signal weight {} must be within [0, 1], got {}", name, weight);
            }
        }
        let sum: f64 = self.as_array().iter().map(|(_, w)| w).sum();
        if (sum - 1.0).abs() > WEIGHT_SUM_TOLERANCE {
            bail!("Signal weights must sum to 1.0, got {:.6}", sum);
        }
        Ok(())
    }

    /// Weighted sum of the signals, clamped to [0, 1].
    pub fn composite(&self, signals: &SignalScores) -> f64 {
        let raw = self.exact_match * signals.exact_match
            + self.trigram_similarity * signals.trigram_similarity
            + self.token_overlap * signals.token_overlap
            + self.phonetic_edit_similarity * signals.phonetic_edit_similarity;
        raw.clamp(0.0, 1.0)
    }
}

#[derive(Debug, Clone)]
pub struct LinkageConfig {
    pub weights: SignalWeights,
    /// Ordered strictest first; the first tier with a qualifier wins.
    pub tiers: Vec<TierRule>,
    pub identifier_rules: IdentifierRules,
    /// Opt-in cap on probed posting lists; `None` probes every block.
    pub max_block_size: Option<usize>,
    pub worker_threads: usize,
}

impl Default for LinkageConfig {
    fn default() -> Self {
        Self {
            weights: SignalWeights::default(),
            tiers: default_tier_rules(),
            identifier_rules: IdentifierRules::default(),
            max_block_size: None,
            worker_threads: num_cpus::get(),
        }
    }
}

/// Reads `key` and parses it, keeping `default` when the variable is unset.
fn env_parse<T>(key: &str, default: T) -> Result<T>
where
    T: FromStr,
    T::Err: std::error::Error + Send + Sync + 'static,
{
    match env::var(key) {
        Ok(raw) => raw
            .trim()
            .parse::<T>()
            .with_context(|| format!("Invalid value '{}' for {}", raw, key)),
        Err(env::VarError::NotPresent) => Ok(default),
        Err(e) => Err(e).with_context(|| format!("Failed to read {}", key)),
    }
}

impl LinkageConfig {
    /// Defaults overridden by `LINKAGE_*` environment variables. Unparsable
    /// values are errors rather than silent fallbacks.
    pub fn from_env() -> Result<Self> {
        let defaults = Self::default();

        let weights = SignalWeights {
            exact_match: env_parse("LINKAGE_WEIGHT_EXACT", defaults.weights.exact_match)?,
            trigram_similarity: env_parse("LINKAGE_WEIGHT_TRIGRAM", defaults.weights.trigram_similarity)?,
            token_overlap: env_parse("LINKAGE_WEIGHT_TOKEN", defaults.weights.token_overlap)?,
            phonetic_edit_similarity: env_parse(
                "LINKAGE_WEIGHT_PHONETIC",
                defaults.weights.phonetic_edit_similarity,
            )?,
        };

        let mut tiers = defaults.tiers;
        for rule in tiers.iter_mut() {
            let key = match rule.tier {
                MatchTier::Exact => continue,
                MatchTier::High => "LINKAGE_TIER_HIGH_MIN",
                MatchTier::Medium => "LINKAGE_TIER_MEDIUM_MIN",
                MatchTier::Low => "LINKAGE_TIER_LOW_MIN",
            };
            if let Some(min) = rule.min_composite {
                rule.min_composite = Some(env_parse(key, min)?);
            }
        }

        let identifier_rules = IdentifierRules {
            min_digits: env_parse("LINKAGE_MIN_IDENTIFIER_DIGITS", defaults.identifier_rules.min_digits)?,
            ..defaults.identifier_rules
        };

        let max_block_size = match env_parse("LINKAGE_MAX_BLOCK_SIZE", defaults.max_block_size.unwrap_or(0))? {
            0 => None,
            n => Some(n),
        };

        let config = Self {
            weights,
            tiers,
            identifier_rules,
            max_block_size,
            worker_threads: env_parse("LINKAGE_WORKER_THREADS", defaults.worker_threads)?,
        };
        config.validate()?;
        Ok(config)
    }

    pub fn validate(&self) -> Result<()> {
        self.weights.validate()?;
        if self.tiers.is_empty() {
            bail!("At least one match tier must be configured");
        }
        if !self.tiers.windows(2).all(|w| w[0].tier < w[1].tier) {
            bail!("Match tiers must be ordered strictest first without repeats");
        }
        for rule in &self.tiers {
            if let Some(min) = rule.min_composite {
                if !(0.0..=1.0).contains(&min) {
                    bail!("Minimum composite for {} must be within [0, 1], got {}", rule.tier, min);
                }
            }
        }
        let rules = &self.identifier_rules;
        if rules.min_digits == 0 || rules.min_digits > rules.width {
            bail!(
                "Identifier minimum digits must be between 1 and {}, got {}",
                rules.width,
                rules.min_digits
            );
        }
        if self.worker_threads == 0 {
            bail!("Worker thread count must be at least 1");
        }
        Ok(())
    }

    pub fn log_config(&self) {
        info!("⚙️  Linkage configuration:");
        info!(
            "   Weights: exact={:.2}, trigram={:.2}, token={:.2}, phonetic={:.2}",
            self.weights.exact_match,
            self.weights.trigram_similarity,
            self.weights.token_overlap,
            self.weights.phonetic_edit_similarity
        );
        for rule in &self.tiers {
            match rule.min_composite {
                Some(min) => info!("   {}: composite >= {:.2}", rule.tier, min),
                None => info!("   {}: identical normalized names", rule.tier),
            }
        }
        info!(
            "   Identifiers: {}-{} digits, padded to {}",
            self.identifier_rules.min_digits, self.identifier_rules.width, self.identifier_rules.width
        );
        match self.max_block_size {
            Some(max) => info!("   Max block size: {}", max),
            None => info!("   Max block size: unlimited"),
        }
        info!("   Worker threads: {}", self.worker_threads);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::env;

    #[test]
    fn test_default_config_is_valid() {
        let config = LinkageConfig::default();
        assert!(config.validate().is_ok());
        assert_eq!(config.tiers.len(), 4);
        assert_eq!(config.max_block_size, None);
        assert!(config.worker_threads >= 1);
    }

    #[test]
    fn test_weights_validation() {
        assert!(SignalWeights::default().validate().is_ok());

        let unbalanced = SignalWeights { exact_match: 0.5, ..SignalWeights::default() };
        assert!(unbalanced.validate().is_err());

        let negative = SignalWeights {
            exact_match: -0.1,
            trigram_similarity: 0.75,
            token_overlap: 0.15,
            phonetic_edit_similarity: 0.20,
        };
        assert!(negative.validate().is_err());
    }

    #[test]
    fn test_composite_is_clamped() {
        let weights = SignalWeights::default();
        let all_ones = SignalScores {
            exact_match: 1.0,
            trigram_similarity: 1.0,
            token_overlap: 1.0,
            phonetic_edit_similarity: 1.0,
        };
        assert!((weights.composite(&all_ones) - 1.0).abs() < 1e-9);
        assert_eq!(weights.composite(&SignalScores::default()), 0.0);
    }

    #[test]
    fn test_tier_validation() {
        let mut config = LinkageConfig::default();
        config.tiers.clear();
        assert!(config.validate().is_err());

        let mut config = LinkageConfig::default();
        config.tiers.swap(1, 2);
        assert!(config.validate().is_err());

        let mut config = LinkageConfig::default();
        config.tiers[3].min_composite = Some(1.5);
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_env_config() {
        env::set_var("LINKAGE_WEIGHT_EXACT", "0.25");
        env::set_var("LINKAGE_WEIGHT_TRIGRAM", "0.40");
        env::set_var("LINKAGE_TIER_LOW_MIN", "0.35");
        env::set_var("LINKAGE_MAX_BLOCK_SIZE", "50000");
        env::set_var("LINKAGE_WORKER_THREADS", "2");

        let config = LinkageConfig::from_env().unwrap();
        assert_eq!(config.weights.exact_match, 0.25);
        assert_eq!(config.weights.trigram_similarity, 0.40);
        assert_eq!(config.tiers[3].min_composite, Some(0.35));
        assert_eq!(config.tiers[0].min_composite, None);
        assert_eq!(config.max_block_size, Some(50_000));
        assert_eq!(config.worker_threads, 2);

        env::set_var("LINKAGE_MAX_BLOCK_SIZE", "0");
        assert_eq!(LinkageConfig::from_env().unwrap().max_block_size, None);

        // Unparsable values are hard errors.
        env::set_var("LINKAGE_WORKER_THREADS", "many");
        assert!(LinkageConfig::from_env().is_err());

        // Weights that no longer sum to one are rejected.
        env::set_var("LINKAGE_WORKER_THREADS", "2");
        env::set_var("LINKAGE_WEIGHT_EXACT", "0.9");
        assert!(LinkageConfig::from_env().is_err());

        env::remove_var("LINKAGE_WEIGHT_EXACT");
        env::remove_var("LINKAGE_WEIGHT_TRIGRAM");
        env::remove_var("LINKAGE_TIER_LOW_MIN");
        env::remove_var("LINKAGE_MAX_BLOCK_SIZE");
        env::remove_var("LINKAGE_WORKER_THREADS");
    }
}
