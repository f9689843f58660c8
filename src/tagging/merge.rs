//! Joining tokens with document metadata.
//!
//! The join is a full outer join on document id: tokens whose document has
//! no metadata keep empty metadata columns, and documents without surviving
//! tokens appear once with empty token columns. Rows are ordered by document
//! id and then by token position.

use std::collections::BTreeSet;

use ahash::AHashMap;
use chrono::NaiveDate;
use log::{info, warn};
use serde::{Deserialize, Serialize};

use crate::corpus::document::MetadataProjection;
use crate::error::{AktstkError, Result};
use crate::tagging::projector::TokenRecord;

/// One row of the final table. Column order is the output column order.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TaggedRow {
    pub doc_id: u32,
    pub ministry: Option<String>,
    pub act_number: Option<u32>,
    pub status: Option<String>,
    pub date: Option<NaiveDate>,
    pub paragraph_id: Option<u32>,
    pub sentence_id: Option<u32>,
    pub token_id: Option<u32>,
    pub token: Option<String>,
    pub lemma: Option<String>,
    pub upos: Option<String>,
    pub lemma_upos: Option<String>,
}

impl TaggedRow {
    fn new(doc_id: u32, metadata: Option<&MetadataProjection>, token: Option<TokenRecord>) -> Self {
        let mut row = TaggedRow {
            doc_id,
            ministry: metadata.map(|m| m.ministry.clone()),
            act_number: metadata.map(|m| m.act_number),
            status: metadata.and_then(|m| m.status.clone()),
            date: metadata.and_then(|m| m.date),
            paragraph_id: None,
            sentence_id: None,
            token_id: None,
            token: None,
            lemma: None,
            upos: None,
            lemma_upos: None,
        };

        if let Some(token) = token {
            row.paragraph_id = Some(token.paragraph_id);
            row.sentence_id = Some(token.sentence_id);
            row.token_id = Some(token.token_id);
            row.token = Some(token.token);
            row.lemma = Some(token.lemma);
            row.upos = Some(token.upos);
            row.lemma_upos = Some(token.lemma_upos);
        }

        row
    }

    /// Whether this row carries a token.
    pub fn has_token(&self) -> bool {
        self.token_id.is_some()
    }

    /// Whether this row carries metadata.
    pub fn has_metadata(&self) -> bool {
        self.ministry.is_some()
    }

    fn metadata_block(&self) -> (Option<&str>, Option<u32>, Option<&str>, Option<NaiveDate>) {
        (
            self.ministry.as_deref(),
            self.act_number,
            self.status.as_deref(),
            self.date,
        )
    }
}

/// The merged table.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct TaggedCorpus {
    rows: Vec<TaggedRow>,
}

impl TaggedCorpus {
    pub fn rows(&self) -> &[TaggedRow] {
        &self.rows
    }

    pub fn into_rows(self) -> Vec<TaggedRow> {
        self.rows
    }

    pub fn len(&self) -> usize {
        self.rows.len()
    }

    pub fn is_empty(&self) -> bool {
        self.rows.is_empty()
    }

    /// Distinct document ids, ascending.
    pub fn doc_ids(&self) -> Vec<u32> {
        let mut ids: Vec<u32> = self.rows.iter().map(|row| row.doc_id).collect();
        ids.dedup();
        ids
    }

    /// Rows that carry a token.
    pub fn token_count(&self) -> usize {
        self.rows.iter().filter(|row| row.has_token()).count()
    }

    /// Verify that no document id is joined to two different metadata blocks.
    pub fn check_unique_metadata(&self) -> Result<()> {
        let mut seen = AHashMap::new();
        for row in &self.rows {
            let block = row.metadata_block();
            match seen.insert(row.doc_id, block) {
                Some(previous) if previous != block => {
                    return Err(AktstkError::merge(format!(
                        "Document {} has conflicting metadata",
                        row.doc_id
                    )));
                }
                _ => {}
            }
        }
        Ok(())
    }
}

/// Full outer join of tokens and metadata on document id.
///
/// Fails if two metadata rows share a document id.
pub fn merge_metadata(
    mut tokens: Vec<TokenRecord>,
    metadata: Vec<MetadataProjection>,
) -> Result<TaggedCorpus> {
    let mut by_id: AHashMap<u32, MetadataProjection> = AHashMap::with_capacity(metadata.len());
    for meta in metadata {
        let doc_id = meta.doc_id;
        if by_id.insert(doc_id, meta).is_some() {
            return Err(AktstkError::merge(format!(
                "Duplicate metadata for document {doc_id}"
            )));
        }
    }

    tokens.sort_by_key(TokenRecord::position);

    let doc_ids: BTreeSet<u32> = by_id
        .keys()
        .copied()
        .chain(tokens.iter().map(|t| t.doc_id))
        .collect();

    let mut rows = Vec::with_capacity(tokens.len() + by_id.len());
    let mut tokens = tokens.into_iter().peekable();
    let mut unmatched_tokens = 0usize;
    let mut empty_documents = 0usize;

    for doc_id in doc_ids {
        let meta = by_id.get(&doc_id);
        let start = rows.len();

        while let Some(token) = tokens.next_if(|t| t.doc_id == doc_id) {
            rows.push(TaggedRow::new(doc_id, meta, Some(token)));
        }

        if rows.len() == start {
            empty_documents += 1;
            rows.push(TaggedRow::new(doc_id, meta, None));
        } else if meta.is_none() {
            unmatched_tokens += rows.len() - start;
        }
    }

    if unmatched_tokens > 0 {
        warn!("{unmatched_tokens} tokens have no matching metadata");
    }
    if empty_documents > 0 {
        info!("{empty_documents} documents have no tokens after filtering");
    }
    info!("Merged table has {} rows", rows.len());

    Ok(TaggedCorpus { rows })
}

#[cfg(test)]
mod tests {
    use super::*;

    fn token(doc_id: u32, sentence_id: u32, token_id: u32, lemma: &str) -> TokenRecord {
        TokenRecord {
            doc_id,
            paragraph_id: 1,
            sentence_id,
            token_id,
            token: lemma.to_string(),
            lemma: lemma.to_string(),
            upos: "noun".to_string(),
            lemma_upos: format!("{lemma}_noun"),
        }
    }

    fn meta(doc_id: u32) -> MetadataProjection {
        MetadataProjection {
            doc_id,
            ministry: format!("Ministerium {doc_id}"),
            act_number: doc_id * 10,
            status: Some("Tiltrådt".to_string()),
            date: NaiveDate::from_ymd_opt(2022, 1, doc_id),
        }
    }

    #[test]
    fn test_inner_matches_carry_both_sides() {
        let corpus = merge_metadata(vec![token(1, 1, 1, "hus")], vec![meta(1)]).unwrap();

        assert_eq!(corpus.len(), 1);
        let row = &corpus.rows()[0];
        assert_eq!(row.ministry.as_deref(), Some("Ministerium 1"));
        assert_eq!(row.act_number, Some(10));
        assert_eq!(row.lemma_upos.as_deref(), Some("hus_noun"));
    }

    #[test]
    fn test_outer_join_keeps_unmatched_rows() {
        let corpus = merge_metadata(
            vec![token(3, 1, 1, "skib"), token(1, 1, 1, "hus")],
            vec![meta(1), meta(2)],
        )
        .unwrap();

        assert_eq!(corpus.doc_ids(), vec![1, 2, 3]);

        let rows = corpus.rows();
        assert!(rows[0].has_token() && rows[0].has_metadata());
        // Metadata without tokens.
        assert!(!rows[1].has_token() && rows[1].has_metadata());
        // Tokens without metadata.
        assert!(rows[2].has_token() && !rows[2].has_metadata());
        assert_eq!(corpus.token_count(), 2);
    }

    #[test]
    fn test_rows_follow_token_order() {
        let corpus = merge_metadata(
            vec![
                token(1, 2, 1, "c"),
                token(1, 1, 2, "b"),
                token(1, 1, 1, "a"),
            ],
            vec![meta(1)],
        )
        .unwrap();

        let lemmas: Vec<_> = corpus
            .rows()
            .iter()
            .map(|r| r.lemma.clone().unwrap())
            .collect();
        assert_eq!(lemmas, vec!["a", "b", "c"]);
    }

    #[test]
    fn test_duplicate_metadata_is_rejected() {
        let result = merge_metadata(vec![], vec![meta(1), meta(1)]);
        assert!(matches!(result, Err(AktstkError::Merge(_))));
    }

    #[test]
    fn test_unique_metadata_check() {
        let corpus = merge_metadata(
            vec![token(1, 1, 1, "a"), token(1, 1, 2, "b")],
            vec![meta(1)],
        )
        .unwrap();
        assert!(corpus.check_unique_metadata().is_ok());

        let mut rows = corpus.into_rows();
        rows[1].ministry = Some("Andet ministerium".to_string());
        let tampered = TaggedCorpus { rows };
        assert!(tampered.check_unique_metadata().is_err());
    }

    #[test]
    fn test_empty_inputs() {
        let corpus = merge_metadata(vec![], vec![]).unwrap();
        assert!(corpus.is_empty());
    }
}
