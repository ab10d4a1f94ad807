// src/matching/selector.rs - Tiered best-match selection per company
use serde::{Deserialize, Serialize};

use crate::models::matching::{MatchResult, MatchScore, MatchTier};
use crate::models::records::{FilingRecord, OrgRecord};
use crate::utils::constants::{DEFAULT_TIER_HIGH_MIN, DEFAULT_TIER_LOW_MIN, DEFAULT_TIER_MEDIUM_MIN};

/// Conditions a candidate must meet to be accepted at `tier`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TierRule {
    pub tier: MatchTier,
    pub min_composite: Option<f64>,
    pub require_exact_name: bool,
    pub require_same_state: bool,
    pub require_same_postal_code: bool,
    pub require_same_city: bool,
}

impl TierRule {
    pub fn admits(&self, company: &OrgRecord, filing: &FilingRecord, score: &MatchScore) -> bool {
        if self.require_exact_name
            && (company.is_degenerate() || company.normalized_name != filing.org.normalized_name)
        {
            return false;
        }
        if self.min_composite.is_some_and(|min| score.composite_score < min) {
            return false;
        }
        (!self.require_same_state || company.same_state(&filing.org))
            && (!self.require_same_postal_code || company.same_postal_code(&filing.org))
            && (!self.require_same_city || company.same_city(&filing.org))
    }
}

/// Exact, high, medium and low, strictest first.
pub fn default_tier_rules() -> Vec<TierRule> {
    vec![
        TierRule {
            tier: MatchTier::Exact,
            min_composite: None,
            require_exact_name: true,
            require_same_state: true,
            require_same_postal_code: false,
            require_same_city: false,
        },
        TierRule {
            tier: MatchTier::High,
            min_composite: Some(DEFAULT_TIER_HIGH_MIN),
            require_exact_name: false,
            require_same_state: true,
            require_same_postal_code: true,
            require_same_city: false,
        },
        TierRule {
            tier: MatchTier::Medium,
            min_composite: Some(DEFAULT_TIER_MEDIUM_MIN),
            require_exact_name: false,
            require_same_state: true,
            require_same_postal_code: false,
            require_same_city: true,
        },
        TierRule {
            tier: MatchTier::Low,
            min_composite: Some(DEFAULT_TIER_LOW_MIN),
            require_exact_name: false,
            require_same_state: true,
            require_same_postal_code: false,
            require_same_city: true,
        },
    ]
}

#[derive(Debug, Clone)]
pub struct ScoredCandidate<'a> {
    pub filing: &'a FilingRecord,
    pub score: MatchScore,
}

/// Picks the single accepted filing for `company`, or `None`.
///
/// The first tier with a qualifying candidate wins. Inside a tier the highest
/// composite wins and ties go to the lowest filing id, so the outcome does
/// not depend on candidate order.
pub fn select_best(
    company: &OrgRecord,
    candidates: &[ScoredCandidate<'_>],
    tiers: &[TierRule],
) -> Option<MatchResult> {
    tiers.iter().find_map(|rule| {
        candidates
            .iter()
            .filter(|c| rule.admits(company, c.filing, &c.score))
            .max_by(|a, b| {
                a.score
                    .composite_score
                    .total_cmp(&b.score.composite_score)
                    .then_with(|| b.filing.id().cmp(a.filing.id()))
            })
            .map(|winner| MatchResult {
                company_id: company.id.clone(),
                filing_id: winner.filing.id().to_string(),
                registry_identifier: winner.filing.identifiers().next().map(str::to_string),
                canonical_name: winner.filing.canonical_name.clone(),
                composite_score: winner.score.composite_score,
                tier: rule.tier,
            })
    })
}
