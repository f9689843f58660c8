//! # aktstk
//!
//! Prepare a corpus of parliamentary funding requests (aktstykker) for
//! linguistic analysis.
//!
//! ## Features
//!
//! - CSV and JSON Lines corpus loading
//! - Rank-based document ids with explicit handling of malformed act numbers
//! - Length filtering and whitespace normalization
//! - Part-of-speech tagging and lemmatization through UDPipe, behind a trait
//! - Content-addressed caching of annotation results
//! - Outer join of tokens with document metadata, written as CSV or JSON Lines

pub mod annotation;
pub mod cli;
pub mod config;
pub mod corpus;
pub mod error;
pub mod pipeline;
pub mod storage;
pub mod tagging;

pub mod prelude {
    pub use crate::annotation::{AnnotationCache, AnnotationInput, AnnotationRow, Annotator};
    pub use crate::config::PipelineConfig;
    pub use crate::corpus::document::{Document, RawDocument};
    pub use crate::error::{AktstkError, Result};
    pub use crate::pipeline::{Pipeline, PipelineOutput, PipelineReport};
    pub use crate::tagging::{TaggedCorpus, TaggedRow};
}

// Version information
pub const VERSION: &str = env!("CARGO_PKG_VERSION");
