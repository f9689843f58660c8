//! End-to-end pipeline.
//!
//! [`Pipeline`] threads one run through every stage:
//!
//! ```text
//! raw records -> ids -> filter -> normalize -> annotate -> project -> merge
//! ```
//!
//! All state is explicit: the configuration, the annotator and the optional
//! cache are given to the pipeline, and each stage's output is returned to
//! the caller rather than kept around.
//!
//! # Examples
//!
//! ```
//! use std::sync::Arc;
//!
//! use aktstk::annotation::{AnnotationInput, AnnotationRow, Annotator};
//! use aktstk::config::PipelineConfig;
//! use aktstk::corpus::document::RawDocument;
//! use aktstk::error::Result;
//! use aktstk::pipeline::Pipeline;
//!
//! /// Tags every document as a single noun.
//! struct OneNoun;
//!
//! impl Annotator for OneNoun {
//!     fn annotate_batch(&self, batch: &[AnnotationInput], _: usize) -> Result<Vec<AnnotationRow>> {
//!         Ok(batch
//!             .iter()
//!             .map(|input| AnnotationRow {
//!                 doc_id: input.doc_id,
//!                 paragraph_id: 1,
//!                 sentence_id: 1,
//!                 token_id: 1,
//!                 token: "Bevilling".into(),
//!                 lemma: "bevilling".into(),
//!                 upos: "NOUN".into(),
//!                 xpos: None,
//!                 feats: None,
//!                 head_token_id: None,
//!                 dep_rel: None,
//!                 deps: None,
//!                 misc: None,
//!             })
//!             .collect())
//!     }
//!
//!     fn name(&self) -> &str {
//!         "one-noun"
//!     }
//! }
//!
//! let pipeline = Pipeline::new(PipelineConfig::default(), Arc::new(OneNoun)).unwrap();
//! let raw = vec![RawDocument::new("Finansministeriet", "Aktstk. 5").with_text("a ".repeat(600))];
//!
//! let output = pipeline.run(raw).unwrap();
//! assert_eq!(output.corpus.rows()[0].lemma_upos.as_deref(), Some("bevilling_noun"));
//! ```

use std::sync::Arc;
use std::time::Instant;

use log::{info, warn};
use serde::{Deserialize, Serialize};

use crate::annotation::annotator::{AnnotationInput, AnnotationRow, Annotator};
use crate::annotation::cache::{AnnotationCache, CacheStatus};
use crate::config::PipelineConfig;
use crate::corpus::document::{Document, MetadataProjection, RawDocument};
use crate::corpus::{CleanedCorpus, CleaningReport, clean_corpus};
use crate::error::Result;
use crate::tagging::merge::{TaggedCorpus, merge_metadata};
use crate::tagging::projector::TokenProjector;

/// Counts and timings for one run.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct PipelineReport {
    pub cleaning: CleaningReport,
    pub annotated_documents: usize,
    pub annotation_rows: usize,
    pub tokens_kept: usize,
    pub output_rows: usize,
    /// `None` when no cache was configured or nothing needed annotating.
    pub cache: Option<CacheStatus>,
    pub duration_ms: u64,
}

/// Everything a run produces.
#[derive(Debug, Clone)]
pub struct PipelineOutput {
    pub corpus: TaggedCorpus,
    pub quarantined: Vec<RawDocument>,
    pub report: PipelineReport,
}

/// A configured pipeline.
pub struct Pipeline {
    config: PipelineConfig,
    annotator: Arc<dyn Annotator>,
    cache: Option<AnnotationCache>,
    projector: TokenProjector,
}

impl Pipeline {
    /// Create a pipeline. Fails if the configuration does not validate.
    pub fn new(config: PipelineConfig, annotator: Arc<dyn Annotator>) -> Result<Self> {
        config.validate()?;
        let projector = TokenProjector::new(&config.tokens);

        Ok(Pipeline {
            config,
            annotator,
            cache: None,
            projector,
        })
    }

    /// Memoize annotation results in `cache`.
    pub fn with_cache(mut self, cache: AnnotationCache) -> Self {
        self.cache = Some(cache);
        self
    }

    pub fn config(&self) -> &PipelineConfig {
        &self.config
    }

    /// Identity assignment, filtering and normalization.
    pub fn clean(&self, raw: Vec<RawDocument>) -> Result<CleanedCorpus> {
        clean_corpus(raw, &self.config)
    }

    /// Annotate cleaned documents, going through the cache when one is set.
    pub fn annotate(
        &self,
        documents: &[Document],
    ) -> Result<(Vec<AnnotationRow>, Option<CacheStatus>)> {
        let batch = AnnotationInput::from_documents(documents);
        if batch.is_empty() {
            warn!("No documents survived cleaning; skipping annotation");
            return Ok((Vec::new(), None));
        }

        let parallelism = self.config.annotation.parallelism;
        match &self.cache {
            Some(cache) => {
                let (rows, status) = cache.annotate(
                    self.annotator.as_ref(),
                    &batch,
                    parallelism,
                    self.config.annotation.overwrite,
                )?;
                Ok((rows, Some(status)))
            }
            None => Ok((self.annotator.annotate_batch(&batch, parallelism)?, None)),
        }
    }

    /// Run every stage over `raw`.
    pub fn run(&self, raw: Vec<RawDocument>) -> Result<PipelineOutput> {
        let start = Instant::now();

        let cleaned = self.clean(raw)?;
        let (rows, cache) = self.annotate(&cleaned.documents)?;
        let annotation_rows = rows.len();

        let tokens = self.projector.project(rows);
        let tokens_kept = tokens.len();

        let metadata: Vec<MetadataProjection> =
            cleaned.documents.iter().map(Document::metadata).collect();
        let corpus = merge_metadata(tokens, metadata)?;

        let report = PipelineReport {
            cleaning: cleaned.report,
            annotated_documents: cleaned.documents.len(),
            annotation_rows,
            tokens_kept,
            output_rows: corpus.len(),
            cache,
            duration_ms: start.elapsed().as_millis() as u64,
        };

        info!(
            "Pipeline finished: {} documents, {} tokens, {} rows in {} ms",
            report.annotated_documents, report.tokens_kept, report.output_rows, report.duration_ms
        );

        Ok(PipelineOutput {
            corpus,
            quarantined: cleaned.quarantined,
            report,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::AktstkError;

    struct FailingAnnotator;

    impl Annotator for FailingAnnotator {
        fn annotate_batch(&self, _: &[AnnotationInput], _: usize) -> Result<Vec<AnnotationRow>> {
            Err(AktstkError::annotation("model download failed"))
        }

        fn name(&self) -> &str {
            "failing"
        }
    }

    #[test]
    fn test_invalid_config_is_rejected() {
        let mut config = PipelineConfig::default();
        config.annotation.parallelism = 0;
        assert!(Pipeline::new(config, Arc::new(FailingAnnotator)).is_err());
    }

    #[test]
    fn test_annotation_failure_is_fatal() {
        let pipeline = Pipeline::new(PipelineConfig::default(), Arc::new(FailingAnnotator)).unwrap();
        let raw = vec![RawDocument::new("Finansministeriet", "Aktstk. 1").with_text("x".repeat(1500))];

        assert!(matches!(
            pipeline.run(raw),
            Err(AktstkError::Annotation(_))
        ));
    }

    #[test]
    fn test_empty_batch_skips_annotator() {
        let pipeline = Pipeline::new(PipelineConfig::default(), Arc::new(FailingAnnotator)).unwrap();
        let raw = vec![RawDocument::new("Finansministeriet", "Aktstk. 1").with_text("kort")];

        let output = pipeline.run(raw).unwrap();
        assert!(output.corpus.is_empty());
        assert_eq!(output.report.cleaning.filter.too_short, 1);
        assert_eq!(output.report.cache, None);
    }

    #[test]
    fn test_whitespace_only_text_never_reaches_annotator() {
        let pipeline = Pipeline::new(PipelineConfig::default(), Arc::new(FailingAnnotator)).unwrap();
        let raw = vec![RawDocument::new("Finansministeriet", "Aktstk. 1").with_text(" \n".repeat(600))];

        let output = pipeline.run(raw).unwrap();
        assert!(output.corpus.is_empty());
        assert_eq!(output.report.cleaning.blank, 1);
        assert_eq!(output.report.annotated_documents, 0);
    }
}
