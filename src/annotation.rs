//! Morpho-syntactic annotation.
//!
//! The tagging model itself is an external collaborator. This module defines
//! the seam the pipeline talks to and the pieces around it:
//!
//! - [`annotator`] - The [`annotator::Annotator`] trait, row types and the bounded worker pool
//! - [`conllu`] - Parser for the CoNLL-U format taggers emit
//! - [`udpipe`] - An annotator backed by the UDPipe command line tool
//! - [`cache`] - Content-addressed memoization of annotation results

pub mod annotator;
pub mod cache;
pub mod conllu;
pub mod udpipe;

pub use annotator::{AnnotationInput, AnnotationRow, Annotator};
pub use cache::{AnnotationCache, CacheStatus, CachedAnnotator};
pub use udpipe::UdpipeAnnotator;
