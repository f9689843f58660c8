//! Document identity assignment.
//!
//! Ids are ranks: records are sorted by ministry (lexicographic) and then by
//! act number (numeric), and numbered from 1 in that order. Records without
//! key fields are removed first, then exact duplicates, so ids are dense and
//! unique over what remains.

use ahash::AHashSet;
use log::{info, warn};

use crate::config::{CorpusConfig, InvalidIdPolicy};
use crate::corpus::document::{Document, RawDocument};
use crate::error::{AktstkError, Result};

/// Result of identity assignment.
#[derive(Debug, Clone, Default)]
pub struct IdentityOutcome {
    /// Keyed documents in id order.
    pub documents: Vec<Document>,

    /// Records dropped for lacking a ministry or act number.
    pub missing_keys: usize,

    /// Exact duplicate records dropped.
    pub duplicates: usize,

    /// Records whose act number did not parse (only under
    /// [`InvalidIdPolicy::Quarantine`]).
    pub quarantined: Vec<RawDocument>,
}

/// Strip `prefix` from an act number and parse the remainder.
///
/// Returns `None` when the prefix is missing or the remainder is not made
/// of ASCII digits only.
///
/// ```
/// use aktstk::corpus::identity::parse_act_number;
///
/// assert_eq!(parse_act_number("Aktstk. 5", "Aktstk."), Some(5));
/// assert_eq!(parse_act_number("Aktstk. 5a", "Aktstk."), None);
/// assert_eq!(parse_act_number("Aktstk. +5", "Aktstk."), None);
/// ```
pub fn parse_act_number(raw: &str, prefix: &str) -> Option<u32> {
    let digits = raw.trim().strip_prefix(prefix)?.trim();
    if digits.is_empty() || !digits.bytes().all(|b| b.is_ascii_digit()) {
        return None;
    }
    digits.parse().ok()
}

/// Deduplicate records, parse act numbers, sort and assign ids.
pub fn assign_ids(raw: Vec<RawDocument>, config: &CorpusConfig) -> Result<IdentityOutcome> {
    let total = raw.len();
    let mut outcome = IdentityOutcome::default();

    let keyed: Vec<RawDocument> = raw.into_iter().filter(RawDocument::has_key_fields).collect();
    outcome.missing_keys = total - keyed.len();
    if outcome.missing_keys > 0 {
        info!(
            "Dropped {} records without ministry or act number",
            outcome.missing_keys
        );
    }

    let mut seen = AHashSet::with_capacity(keyed.len());
    let mut unique = Vec::with_capacity(keyed.len());
    for record in keyed {
        if seen.insert(record.clone()) {
            unique.push(record);
        } else {
            outcome.duplicates += 1;
        }
    }
    if outcome.duplicates > 0 {
        info!("Dropped {} duplicate records", outcome.duplicates);
    }

    let mut parsed = Vec::with_capacity(unique.len());
    for record in unique {
        // has_key_fields() guarantees both keys are present.
        let (Some(ministry), Some(act_number)) = (record.ministry.clone(), record.act_number.as_deref())
        else {
            continue;
        };

        match parse_act_number(act_number, &config.act_prefix) {
            Some(number) => parsed.push((ministry, number, record)),
            None => match config.on_invalid_id {
                InvalidIdPolicy::Reject => {
                    return Err(AktstkError::unparseable_identifier(ministry, act_number));
                }
                InvalidIdPolicy::Quarantine => {
                    warn!("Quarantined {ministry} {act_number:?}: act number does not parse");
                    outcome.quarantined.push(record);
                }
            },
        }
    }

    parsed.sort_by(|a, b| a.0.cmp(&b.0).then(a.1.cmp(&b.1)));

    outcome.documents = parsed
        .into_iter()
        .zip(1u32..)
        .map(|((ministry, act_number, record), id)| Document {
            id,
            ministry,
            act_number,
            status: record.status,
            date: record.date,
            text: record.text,
            length: None,
        })
        .collect();

    info!("Assigned ids 1..={}", outcome.documents.len());
    Ok(outcome)
}
