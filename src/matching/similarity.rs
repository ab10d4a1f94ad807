// src/matching/similarity.rs - Name similarity signals and composite scoring
use std::collections::HashSet;
use strsim::jaro_winkler;

use crate::matching::name::significant_tokens;
use crate::models::matching::{MatchScore, SignalScores};
use crate::models::records::{FilingRecord, OrgRecord};
use crate::utils::config::SignalWeights;
use crate::utils::constants::MIN_COMPARABLE_NAME_LEN;

const TRIGRAM_BOUNDARY: char = '|';

/// 1.0 when both names are identical and long enough to be meaningful.
pub fn exact_match(a: &str, b: &str) -> f64 {
    if a == b && a.chars().count() >= MIN_COMPARABLE_NAME_LEN {
        1.0
    } else {
        0.0
    }
}

/// Shared significant tokens over the size of the smaller token set.
pub fn token_overlap(a: &str, b: &str) -> f64 {
    let tokens_a = significant_tokens(a);
    let tokens_b = significant_tokens(b);
    let smaller = tokens_a.len().min(tokens_b.len());
    if smaller == 0 {
        return 0.0;
    }
    tokens_a.intersection(&tokens_b).count() as f64 / smaller as f64
}

fn trigrams(s: &str) -> HashSet<[char; 3]> {
    let padded: Vec<char> = std::iter::once(TRIGRAM_BOUNDARY)
        .chain(s.chars())
        .chain(std::iter::once(TRIGRAM_BOUNDARY))
        .collect();
    padded.windows(3).map(|w| [w[0], w[1], w[2]]).collect()
}

/// Jaccard similarity over boundary-padded character trigrams. Strings
/// shorter than three characters only match by equality.
pub fn trigram_similarity(a: &str, b: &str) -> f64 {
    if a.chars().count() < 3 || b.chars().count() < 3 {
        return if a == b { 1.0 } else { 0.0 };
    }
    let grams_a = trigrams(a);
    let grams_b = trigrams(b);
    let union = grams_a.union(&grams_b).count();
    if union == 0 {
        return 0.0;
    }
    grams_a.intersection(&grams_b).count() as f64 / union as f64
}

/// Jaro-Winkler similarity. Arguments are put in a fixed order so the
/// greedy character alignment cannot make the score direction dependent.
pub fn phonetic_edit_similarity(a: &str, b: &str) -> f64 {
    let (first, second) = if a <= b { (a, b) } else { (b, a) };
    jaro_winkler(first, second)
}

pub fn score(company_norm_name: &str, filing_norm_name: &str) -> SignalScores {
    SignalScores {
        exact_match: exact_match(company_norm_name, filing_norm_name),
        trigram_similarity: trigram_similarity(company_norm_name, filing_norm_name),
        token_overlap: token_overlap(company_norm_name, filing_norm_name),
        phonetic_edit_similarity: phonetic_edit_similarity(company_norm_name, filing_norm_name),
    }
}

pub fn score_pair(company: &OrgRecord, filing: &FilingRecord, weights: &SignalWeights) -> MatchScore {
    let signal_scores = score(&company.normalized_name, &filing.org.normalized_name);
    MatchScore {
        company_id: company.id.clone(),
        filing_id: filing.id().to_string(),
        composite_score: weights.composite(&signal_scores),
        signal_scores,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const PAIRS: [(&str, &str); 6] = [
        ("RIVERSIDE MEDICAL", "RIVERSDIE MEDICAL"),
        ("MARTHA", "MARHTA"),
        ("DWAYNE", "DUANE"),
        ("ACME PLASTICS", "ACME PLASTIC"),
        ("FIRST BAPTIST CHURCH", "BAPTIST CHURCH FIRST"),
        ("AB", "ABC"),
    ];

    #[test]
    fn test_trigram_boundaries() {
        assert_eq!(trigram_similarity("RIVERSIDE", "RIVERSIDE"), 1.0);
        assert_eq!(trigram_similarity("ABC", "XYZ"), 0.0);
        assert_eq!(trigram_similarity("AB", "AB"), 1.0);
        assert_eq!(trigram_similarity("AB", "ABC"), 0.0);
        let partial = trigram_similarity("ACME PLASTICS", "ACME PLASTIC");
        assert!(partial > 0.7 && partial < 1.0);
    }

    #[test]
    fn test_similarity_is_symmetric() {
        for (a, b) in PAIRS {
            assert_eq!(trigram_similarity(a, b), trigram_similarity(b, a));
            assert_eq!(phonetic_edit_similarity(a, b), phonetic_edit_similarity(b, a));
            assert_eq!(token_overlap(a, b), token_overlap(b, a));
        }
    }

    #[test]
    fn test_jaro_winkler_is_alignment_based() {
        // Transpositions score high, unlike a length-ratio proxy.
        assert!(phonetic_edit_similarity("MARTHA", "MARHTA") > 0.96);
        assert!(phonetic_edit_similarity("RIVERSIDE MEDICAL", "RIVERSDIE MEDICAL") > 0.95);
        // Same length, nothing in common.
        assert_eq!(phonetic_edit_similarity("ABCDEF", "UVWXYZ"), 0.0);
        assert_eq!(phonetic_edit_similarity("ACME", "ACME"), 1.0);
    }

    #[test]
    fn test_token_overlap_uses_smaller_set() {
        assert_eq!(token_overlap("FIRST BAPTIST CHURCH", "BAPTIST CHURCH FIRST"), 1.0);
        assert_eq!(token_overlap("RIVERSIDE MEDICAL", "RIVERSIDE MEDICAL CENTER"), 1.0);
        assert_eq!(token_overlap("ACME GROUP WIDGETS", "ACME TOOLS"), 0.5);
        assert_eq!(token_overlap("GROUP", "ACME"), 0.0);
        assert_eq!(token_overlap("", "ACME"), 0.0);
    }

    #[test]
    fn test_exact_match_requires_length() {
        assert_eq!(exact_match("ACME", "ACME"), 1.0);
        assert_eq!(exact_match("AB", "AB"), 0.0);
        assert_eq!(exact_match("ACME", "ACNE"), 0.0);
    }

    #[test]
    fn test_composite_weights() {
        let weights = SignalWeights::default();
        let identical = score("RIVERSIDE MEDICAL", "RIVERSIDE MEDICAL");
        assert!((weights.composite(&identical) - 1.0).abs() < 1e-9);

        let near = score("RIVERSIDE MEDICAL", "RIVERSIDE MEDICAL CENTER");
        assert_eq!(near.exact_match, 0.0);
        let composite = weights.composite(&near);
        assert!(composite > 0.5 && composite < 0.7, "composite was {}", composite);

        let unrelated = score("HARBOR FREIGHT", "RIVERSIDE MEDICAL");
        assert!(weights.composite(&unrelated) < 0.3);
    }
}
