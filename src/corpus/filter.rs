//! Document filtering.
//!
//! Three predicates run in sequence, each on the survivors of the previous
//! one:
//!
//! 1. drop documents without text
//! 2. drop documents shorter than `min_length` characters
//! 3. drop documents longer than `max_length` characters
//!
//! Length is counted in characters on the raw text, once, before step 2.
//! It is not recomputed after whitespace normalization.

use log::info;
use serde::{Deserialize, Serialize};

use crate::config::FilterConfig;
use crate::corpus::document::Document;

/// How many documents each predicate removed.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct FilterReport {
    pub input: usize,
    pub missing_text: usize,
    pub too_short: usize,
    pub too_long: usize,
    pub retained: usize,
}

/// Apply the three filters and record each document's raw length.
pub fn filter_documents(
    mut documents: Vec<Document>,
    config: &FilterConfig,
) -> (Vec<Document>, FilterReport) {
    let mut report = FilterReport {
        input: documents.len(),
        ..Default::default()
    };

    let before = documents.len();
    documents.retain(|doc| doc.text.is_some());
    report.missing_text = before - documents.len();
    info!(
        "Removed {} documents without text, {} remain",
        report.missing_text,
        documents.len()
    );

    for doc in documents.iter_mut() {
        doc.length = doc.text.as_ref().map(|text| text.chars().count());
    }

    let before = documents.len();
    documents.retain(|doc| doc.length.is_some_and(|len| len >= config.min_length));
    report.too_short = before - documents.len();
    info!(
        "Removed {} documents shorter than {} characters, {} remain",
        report.too_short,
        config.min_length,
        documents.len()
    );

    let before = documents.len();
    documents.retain(|doc| doc.length.is_some_and(|len| len <= config.max_length));
    report.too_long = before - documents.len();
    info!(
        "Removed {} documents longer than {} characters, {} remain",
        report.too_long,
        config.max_length,
        documents.len()
    );

    report.retained = documents.len();
    (documents, report)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn doc(id: u32, text: Option<&str>) -> Document {
        Document {
            id,
            ministry: "Finansministeriet".to_string(),
            act_number: id,
            status: None,
            date: None,
            text: text.map(String::from),
            length: None,
        }
    }

    #[test]
    fn test_three_stage_filter() {
        let config = FilterConfig {
            min_length: 5,
            max_length: 10,
        };
        let docs = vec![
            doc(1, None),
            doc(2, Some("abc")),
            doc(3, Some("abcde")),
            doc(4, Some("abcdefghij")),
            doc(5, Some("abcdefghijk")),
        ];

        let (kept, report) = filter_documents(docs, &config);
        let ids: Vec<u32> = kept.iter().map(|d| d.id).collect();

        assert_eq!(ids, vec![3, 4]);
        assert_eq!(
            report,
            FilterReport {
                input: 5,
                missing_text: 1,
                too_short: 1,
                too_long: 1,
                retained: 2,
            }
        );
        assert_eq!(kept[0].length, Some(5));
        assert_eq!(kept[1].length, Some(10));
    }

    #[test]
    fn test_length_counts_characters_not_bytes() {
        let config = FilterConfig {
            min_length: 4,
            max_length: 4,
        };
        // Four characters, eight bytes.
        let (kept, _) = filter_documents(vec![doc(1, Some("æøåé"))], &config);
        assert_eq!(kept.len(), 1);
        assert_eq!(kept[0].length, Some(4));
    }

    #[test]
    fn test_length_is_measured_before_normalization() {
        let config = FilterConfig {
            min_length: 6,
            max_length: 100,
        };
        // Collapses to "a b" (3 chars) but counts as 6 raw characters.
        let (kept, _) = filter_documents(vec![doc(1, Some("a    b"))], &config);
        assert_eq!(kept.len(), 1);
    }
}
