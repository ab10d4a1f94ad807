// src/lib.rs
pub mod clustering;
pub mod matching;
pub mod models;
pub mod utils;

// Re-export common types for easier access
pub use models::matching::{BlockReason, CandidatePair, MatchResult, MatchScore, MatchTier, SignalScores};
pub use models::records::{CompanyInput, FilingInput, FilingRecord, OrgRecord};
pub use models::stats_models::{LinkageOutput, RunStats};

// Re-export important functionality
pub use matching::manager::{prepare_filings, run_linkage, LinkageEngine, PreparedFilings};
pub use utils::config::LinkageConfig;
