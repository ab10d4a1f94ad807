// src/utils/constants.rs

/// Normalized names shorter than this never block or score.
pub const MIN_COMPARABLE_NAME_LEN: usize = 3;

/// Names and cities shorter than this are not used as blocking-key sources.
pub const MIN_BLOCKING_SOURCE_LEN: usize = 3;

/// The first-word key is only emitted for words longer than this.
pub const FIRST_WORD_MIN_LEN: usize = 3;

pub const DEFAULT_WEIGHT_EXACT: f64 = 0.30;
pub const DEFAULT_WEIGHT_TRIGRAM: f64 = 0.35;
pub const DEFAULT_WEIGHT_TOKEN: f64 = 0.15;
pub const DEFAULT_WEIGHT_PHONETIC: f64 = 0.20;

/// Allowed drift of the weight sum from 1.0.
pub const WEIGHT_SUM_TOLERANCE: f64 = 1e-6;

pub const DEFAULT_TIER_HIGH_MIN: f64 = 0.5;
pub const DEFAULT_TIER_MEDIUM_MIN: f64 = 0.4;
pub const DEFAULT_TIER_LOW_MIN: f64 = 0.3;

/// Malformed identifiers logged one by one before switching to a summary.
pub const MALFORMED_IDENTIFIER_LOG_LIMIT: usize = 10;
