// src/models/records.rs
use serde::{Deserialize, Serialize};
use std::collections::HashSet;

use crate::clustering::identity_clustering::{check_identifier, IdentifierCheck, IdentifierRules};
use crate::matching::blocking::{generate_keys, BlockKey};
use crate::matching::name::{normalize, normalize_place, normalize_postal_code};
use crate::utils::constants::MIN_COMPARABLE_NAME_LEN;

/// Company-registry row as supplied by the caller.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CompanyInput {
    pub id: String,
    pub name: String,
    #[serde(default)]
    pub city: Option<String>,
    #[serde(default)]
    pub state: Option<String>,
    #[serde(default)]
    pub postal_code: Option<String>,
}

/// Filing-registry row as supplied by the caller.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct FilingInput {
    pub id: String,
    pub name: String,
    #[serde(default)]
    pub city: Option<String>,
    #[serde(default)]
    pub state: Option<String>,
    #[serde(default)]
    pub postal_code: Option<String>,
    #[serde(default)]
    pub registry_identifier: Option<String>,
    /// Identifiers the filer reported previously (e.g. last reported sponsor EIN).
    #[serde(default)]
    pub prior_identifiers: Vec<String>,
}

#[derive(Debug, Clone, PartialEq)]
pub struct OrgRecord {
    pub id: String,
    pub raw_name: String,
    pub normalized_name: String,
    pub city: Option<String>,
    pub state: Option<String>,
    pub postal_code: Option<String>,
    pub blocking_keys: HashSet<BlockKey>,
}

impl OrgRecord {
    pub fn new(
        id: &str,
        raw_name: &str,
        city: Option<&str>,
        state: Option<&str>,
        postal_code: Option<&str>,
    ) -> Self {
        let normalized_name = normalize(raw_name);
        let city = city.and_then(normalize_place);
        let state = state.and_then(normalize_place);
        let postal_code = postal_code.and_then(normalize_postal_code);
        let blocking_keys = generate_keys(&normalized_name, city.as_deref(), state.as_deref());
        Self {
            id: id.to_string(),
            raw_name: raw_name.to_string(),
            normalized_name,
            city,
            state,
            postal_code,
            blocking_keys,
        }
    }

    /// Names too short to compare never block and never score.
    pub fn is_degenerate(&self) -> bool {
        self.normalized_name.chars().count() < MIN_COMPARABLE_NAME_LEN
    }

    pub fn same_state(&self, other: &OrgRecord) -> bool {
        both_present_and_equal(&self.state, &other.state)
    }

    pub fn same_city(&self, other: &OrgRecord) -> bool {
        both_present_and_equal(&self.city, &other.city)
    }

    pub fn same_postal_code(&self, other: &OrgRecord) -> bool {
        both_present_and_equal(&self.postal_code, &other.postal_code)
    }
}

fn both_present_and_equal(a: &Option<String>, b: &Option<String>) -> bool {
    matches!((a, b), (Some(x), Some(y)) if x == y)
}

impl From<&CompanyInput> for OrgRecord {
    fn from(input: &CompanyInput) -> Self {
        OrgRecord::new(
            &input.id,
            &input.name,
            input.city.as_deref(),
            input.state.as_deref(),
            input.postal_code.as_deref(),
        )
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum IdentifierStatus {
    Valid,
    Missing,
    Malformed,
}

#[derive(Debug, Clone, PartialEq)]
pub struct FilingRecord {
    pub org: OrgRecord,
    pub raw_identifier: Option<String>,
    /// Normalized 9-digit identifier, `None` when missing or malformed.
    pub registry_identifier: Option<String>,
    pub identifier_status: IdentifierStatus,
    /// Valid prior identifiers only; malformed ones are counted and dropped.
    pub prior_identifiers: Vec<String>,
    pub malformed_prior_identifiers: usize,
    /// Assigned by the identity clusterer; defaults to the record's own name.
    pub canonical_name: String,
}

impl FilingRecord {
    pub fn from_input(input: &FilingInput, rules: &IdentifierRules) -> Self {
        let org = OrgRecord::new(
            &input.id,
            &input.name,
            input.city.as_deref(),
            input.state.as_deref(),
            input.postal_code.as_deref(),
        );

        let (registry_identifier, identifier_status) =
            match check_identifier(input.registry_identifier.as_deref(), rules) {
                IdentifierCheck::Valid(id) => (Some(id), IdentifierStatus::Valid),
                IdentifierCheck::Missing => (None, IdentifierStatus::Missing),
                IdentifierCheck::Malformed => (None, IdentifierStatus::Malformed),
            };

        let mut prior_identifiers = Vec::new();
        let mut malformed_prior_identifiers = 0;
        for raw in &input.prior_identifiers {
            match check_identifier(Some(raw), rules) {
                IdentifierCheck::Valid(id) => {
                    if registry_identifier.as_ref() != Some(&id) && !prior_identifiers.contains(&id) {
                        prior_identifiers.push(id);
                    }
                }
                IdentifierCheck::Missing => {}
                IdentifierCheck::Malformed => malformed_prior_identifiers += 1,
            }
        }

        let canonical_name = org.normalized_name.clone();
        Self {
            org,
            raw_identifier: input.registry_identifier.clone(),
            registry_identifier,
            identifier_status,
            prior_identifiers,
            malformed_prior_identifiers,
            canonical_name,
        }
    }

    pub fn id(&self) -> &str {
        &self.org.id
    }

    /// Primary identifier followed by any prior identifiers.
    pub fn identifiers(&self) -> impl Iterator<Item = &str> {
        self.registry_identifier
            .iter()
            .chain(self.prior_identifiers.iter())
            .map(String::as_str)
    }
}
