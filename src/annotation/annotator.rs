//! The annotation seam.

use rayon::ThreadPoolBuilder;
use rayon::prelude::*;
use serde::{Deserialize, Serialize};

use crate::corpus::document::Document;
use crate::error::{AktstkError, Result};

/// One document handed to the tagger.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AnnotationInput {
    pub doc_id: u32,
    pub text: String,
}

impl AnnotationInput {
    pub fn new<S: Into<String>>(doc_id: u32, text: S) -> Self {
        AnnotationInput {
            doc_id,
            text: text.into(),
        }
    }

    /// Build a batch from cleaned documents. Documents without text are skipped.
    pub fn from_documents(documents: &[Document]) -> Vec<AnnotationInput> {
        documents
            .iter()
            .filter_map(|doc| doc.text().map(|text| AnnotationInput::new(doc.id, text)))
            .collect()
    }
}

/// One token as produced by the tagger.
///
/// Only the first seven fields are used downstream; the remaining CoNLL-U
/// columns are kept so cached results are complete.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AnnotationRow {
    pub doc_id: u32,
    pub paragraph_id: u32,
    pub sentence_id: u32,
    pub token_id: u32,
    pub token: String,
    pub lemma: String,
    pub upos: String,
    pub xpos: Option<String>,
    pub feats: Option<String>,
    pub head_token_id: Option<u32>,
    pub dep_rel: Option<String>,
    pub deps: Option<String>,
    pub misc: Option<String>,
}

impl AnnotationRow {
    /// The ordering key (document, paragraph, sentence, token).
    pub fn position(&self) -> (u32, u32, u32, u32) {
        (self.doc_id, self.paragraph_id, self.sentence_id, self.token_id)
    }
}

/// Sort rows into (document, paragraph, sentence, token) order.
pub fn sort_rows(rows: &mut [AnnotationRow]) {
    rows.sort_by_key(AnnotationRow::position);
}

/// A morpho-syntactic tagger.
///
/// Implementations may use `parallelism` worker threads internally, but must
/// return rows sorted by [`AnnotationRow::position`].
pub trait Annotator: Send + Sync {
    /// Annotate every document in `batch`.
    fn annotate_batch(
        &self,
        batch: &[AnnotationInput],
        parallelism: usize,
    ) -> Result<Vec<AnnotationRow>>;

    /// Get the name of this annotator (for logging and cache entries).
    fn name(&self) -> &str;
}

/// Run a per-document tagging function over a batch on a bounded pool.
///
/// The first failing document fails the batch. The result is sorted, so the
/// order does not depend on how work was scheduled.
pub fn annotate_in_pool<F>(
    batch: &[AnnotationInput],
    parallelism: usize,
    annotate_document: F,
) -> Result<Vec<AnnotationRow>>
where
    F: Fn(&AnnotationInput) -> Result<Vec<AnnotationRow>> + Sync,
{
    let pool = ThreadPoolBuilder::new()
        .num_threads(parallelism.max(1))
        .thread_name(|index| format!("aktstk-annotate-{index}"))
        .build()
        .map_err(|e| AktstkError::annotation(format!("Failed to start worker pool: {e}")))?;

    let per_document: Vec<Vec<AnnotationRow>> =
        pool.install(|| batch.par_iter().map(&annotate_document).collect::<Result<_>>())?;

    let mut rows: Vec<AnnotationRow> = per_document.into_iter().flatten().collect();
    sort_rows(&mut rows);
    Ok(rows)
}
