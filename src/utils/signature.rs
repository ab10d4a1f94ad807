// src/utils/signature.rs
use serde_json::json;
use sha2::{Digest, Sha256};
use std::collections::BTreeMap;

use crate::models::records::FilingRecord;

/// SHA-256 over the matching-relevant fields of every prepared filing.
///
/// Components are keyed by filing id in a `BTreeMap`, so the digest does not
/// depend on input order. Two runs over the same filings produce the same
/// signature, which lets callers tell whether a stored result is stale.
pub fn filing_signature(filings: &[FilingRecord]) -> String {
    let components: BTreeMap<&str, serde_json::Value> = filings
        .iter()
        .map(|f| {
            let identifiers: Vec<&str> = f.identifiers().collect();
            (
                f.id(),
                json!({
                    "normalized_name": f.org.normalized_name,
                    "canonical_name": f.canonical_name,
                    "city": f.org.city,
                    "state": f.org.state,
                    "postal_code": f.org.postal_code,
                    "identifiers": identifiers,
                }),
            )
        })
        .collect();

    let mut hasher = Sha256::new();
    hasher.update(json!(components).to_string().as_bytes());
    hex::encode(hasher.finalize())
}
