//! Token projection and metadata joining.
//!
//! - [`projector`] - Reduces annotation rows to the columns and categories of interest
//! - [`merge`] - Joins token records with per-document metadata

pub mod merge;
pub mod projector;

pub use merge::{TaggedCorpus, TaggedRow, merge_metadata};
pub use projector::{TokenProjector, TokenRecord};
