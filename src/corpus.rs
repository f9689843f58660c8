//! Corpus loading and cleaning.
//!
//! This module turns a persisted table of funding requests into the set of
//! documents that is handed to the tagger:
//!
//! - [`loader`] - Reads raw records from CSV or JSON Lines
//! - [`identity`] - Parses act numbers, deduplicates and assigns document ids
//! - [`filter`] - Drops documents without text or with out-of-range length
//! - [`normalize`] - Collapses irregular whitespace; documents left empty
//!   are dropped
//!
//! # Examples
//!
//! ```
//! use aktstk::config::PipelineConfig;
//! use aktstk::corpus::document::RawDocument;
//! use aktstk::corpus::clean_corpus;
//!
//! let config = PipelineConfig::default();
//! let raw = vec![RawDocument::new("Finansministeriet", "Aktstk. 5").with_text("x ".repeat(600))];
//!
//! let cleaned = clean_corpus(raw, &config).unwrap();
//! assert_eq!(cleaned.documents.len(), 1);
//! assert_eq!(cleaned.documents[0].id, 1);
//! ```

pub mod document;
pub mod filter;
pub mod identity;
pub mod loader;
pub mod normalize;

use log::info;
use serde::{Deserialize, Serialize};

use crate::config::PipelineConfig;
use crate::corpus::document::{Document, RawDocument};
use crate::corpus::filter::FilterReport;
use crate::error::Result;

/// Documents ready for tagging, along with what the cleaning steps removed.
#[derive(Debug, Clone)]
pub struct CleanedCorpus {
    /// Surviving documents, ordered by id, with normalized text.
    pub documents: Vec<Document>,

    /// Records set aside because their act number did not parse.
    pub quarantined: Vec<RawDocument>,

    /// Counts collected along the way.
    pub report: CleaningReport,
}

/// Counts reported by the cleaning stages.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct CleaningReport {
    pub loaded: usize,
    pub missing_keys: usize,
    pub duplicates: usize,
    pub quarantined: usize,
    pub filter: FilterReport,
    /// Documents that passed the length filter but normalized to nothing.
    pub blank: usize,
}

/// Run identity assignment, filtering and normalization over raw records.
pub fn clean_corpus(raw: Vec<RawDocument>, config: &PipelineConfig) -> Result<CleanedCorpus> {
    let loaded = raw.len();
    let identified = identity::assign_ids(raw, &config.corpus)?;
    let (mut documents, filter_report) =
        filter::filter_documents(identified.documents, &config.filter);
    normalize::normalize_documents(&mut documents);

    let before = documents.len();
    documents.retain(|doc| doc.text().is_some_and(|text| !text.is_empty()));
    let blank = before - documents.len();
    if blank > 0 {
        info!("Removed {blank} documents that were only whitespace");
    }

    info!(
        "Cleaned corpus: {} loaded, {} ready for tagging",
        loaded,
        documents.len()
    );

    Ok(CleanedCorpus {
        documents,
        report: CleaningReport {
            loaded,
            missing_keys: identified.missing_keys,
            duplicates: identified.duplicates,
            quarantined: identified.quarantined.len(),
            filter: filter_report,
            blank,
        },
        quarantined: identified.quarantined,
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_whitespace_only_document_is_dropped() {
        let raw = vec![
            RawDocument::new("Finansministeriet", "Aktstk. 1").with_text(" \n".repeat(600)),
            RawDocument::new("Finansministeriet", "Aktstk. 2").with_text("ord ".repeat(300)),
        ];

        let cleaned = clean_corpus(raw, &PipelineConfig::default()).unwrap();

        assert_eq!(cleaned.report.filter.retained, 2);
        assert_eq!(cleaned.report.blank, 1);
        assert_eq!(cleaned.documents.len(), 1);
        assert_eq!(cleaned.documents[0].id, 2);
        assert!(cleaned.documents.iter().all(|d| d.text().is_some_and(|t| !t.is_empty())));
    }

    #[test]
    fn test_report_counts_every_stage() {
        let raw = vec![
            RawDocument::new("Finansministeriet", "Aktstk. 1").with_text("x".repeat(1200)),
            RawDocument::new("Finansministeriet", "Aktstk. 1").with_text("x".repeat(1200)),
            RawDocument {
                ministry: Some("Finansministeriet".to_string()),
                ..Default::default()
            },
        ];

        let report = clean_corpus(raw, &PipelineConfig::default()).unwrap().report;
        assert_eq!(report.loaded, 3);
        assert_eq!(report.missing_keys, 1);
        assert_eq!(report.duplicates, 1);
        assert_eq!(report.filter.retained, 1);
        assert_eq!(report.blank, 0);
    }
}
