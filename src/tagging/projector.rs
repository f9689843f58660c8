//! Token projection.
//!
//! Turns raw annotation rows into [`TokenRecord`]s:
//!
//! 1. keep the seven columns used downstream
//! 2. keep only rows whose part-of-speech tag is in the allowed set
//! 3. lowercase token, lemma and tag
//! 4. derive `lemma_upos` as `lemma + "_" + tag`
//!
//! The composite key separates identical lemmas used as different parts of
//! speech, e.g. `gå_verb` and `gå_noun`.

use ahash::AHashSet;
use log::info;
use serde::{Deserialize, Serialize};

use crate::annotation::annotator::AnnotationRow;
use crate::config::TokenFilterConfig;

/// A projected, lowercased token.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TokenRecord {
    pub doc_id: u32,
    pub paragraph_id: u32,
    pub sentence_id: u32,
    pub token_id: u32,
    pub token: String,
    pub lemma: String,
    pub upos: String,
    pub lemma_upos: String,
}

impl TokenRecord {
    /// The ordering key (document, paragraph, sentence, token).
    pub fn position(&self) -> (u32, u32, u32, u32) {
        (self.doc_id, self.paragraph_id, self.sentence_id, self.token_id)
    }
}

/// Filters and projects annotation rows.
#[derive(Debug, Clone)]
pub struct TokenProjector {
    /// Allowed tags, uppercased.
    allowed_tags: AHashSet<String>,
}

impl TokenProjector {
    pub fn new(config: &TokenFilterConfig) -> Self {
        TokenProjector {
            allowed_tags: config
                .allowed_tags
                .iter()
                .map(|tag| tag.to_uppercase())
                .collect(),
        }
    }

    /// Whether a tag is in the allowed set (case-insensitive).
    pub fn is_allowed(&self, upos: &str) -> bool {
        self.allowed_tags.contains(&upos.to_uppercase())
    }

    /// Project a single row, or `None` if its tag is not allowed.
    pub fn project_row(&self, row: AnnotationRow) -> Option<TokenRecord> {
        if !self.is_allowed(&row.upos) {
            return None;
        }

        let lemma = row.lemma.to_lowercase();
        let upos = row.upos.to_lowercase();
        let lemma_upos = format!("{lemma}_{upos}");

        Some(TokenRecord {
            doc_id: row.doc_id,
            paragraph_id: row.paragraph_id,
            sentence_id: row.sentence_id,
            token_id: row.token_id,
            token: row.token.to_lowercase(),
            lemma,
            upos,
            lemma_upos,
        })
    }

    /// Project every row, preserving order.
    pub fn project(&self, rows: Vec<AnnotationRow>) -> Vec<TokenRecord> {
        let total = rows.len();
        let tokens: Vec<TokenRecord> = rows
            .into_iter()
            .filter_map(|row| self.project_row(row))
            .collect();

        info!(
            "Kept {} of {} tokens with tags {:?}",
            tokens.len(),
            total,
            self.allowed_tags
        );
        tokens
    }
}

impl Default for TokenProjector {
    fn default() -> Self {
        Self::new(&TokenFilterConfig::default())
    }
}
