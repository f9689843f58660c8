//! Configuration for a pipeline run.
//!
//! Every threshold and switch the pipeline consults lives in
//! [`PipelineConfig`]. It can be built in code, deserialized from a JSON file
//! and then overridden from the command line.

use std::collections::BTreeSet;
use std::fs;
use std::path::Path;

use serde::{Deserialize, Serialize};

use crate::error::{AktstkError, Result};

/// Top-level configuration for a pipeline run.
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct PipelineConfig {
    /// How raw records are keyed.
    pub corpus: CorpusConfig,

    /// Document length thresholds.
    pub filter: FilterConfig,

    /// Tagger invocation settings.
    pub annotation: AnnotationConfig,

    /// Which part-of-speech tags survive projection.
    pub tokens: TokenFilterConfig,
}

impl PipelineConfig {
    /// Load a configuration from a JSON file. Missing keys take their defaults.
    pub fn from_file<P: AsRef<Path>>(path: P) -> Result<Self> {
        let content = fs::read_to_string(path.as_ref())?;
        let config: PipelineConfig = serde_json::from_str(&content)?;
        config.validate()?;
        Ok(config)
    }

    /// Check the configuration for values the pipeline cannot work with.
    pub fn validate(&self) -> Result<()> {
        if self.filter.min_length > self.filter.max_length {
            return Err(AktstkError::invalid_config(format!(
                "min_length ({}) exceeds max_length ({})",
                self.filter.min_length, self.filter.max_length
            )));
        }
        if self.annotation.parallelism == 0 {
            return Err(AktstkError::invalid_config(
                "parallelism must be at least 1",
            ));
        }
        if self.tokens.allowed_tags.is_empty() {
            return Err(AktstkError::invalid_config(
                "allowed_tags must not be empty",
            ));
        }
        Ok(())
    }
}

/// What to do with a record whose act number does not parse.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum InvalidIdPolicy {
    /// Fail the run on the first unparseable act number.
    #[default]
    Reject,
    /// Set the record aside and continue without it.
    Quarantine,
}

/// Settings for loading and keying raw records.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct CorpusConfig {
    /// Literal prefix in front of every act number, e.g. `"Aktstk. 5"`.
    pub act_prefix: String,

    /// Policy for act numbers that are not numeric after the prefix.
    pub on_invalid_id: InvalidIdPolicy,
}

impl Default for CorpusConfig {
    fn default() -> Self {
        Self {
            act_prefix: "Aktstk.".to_string(),
            on_invalid_id: InvalidIdPolicy::Reject,
        }
    }
}

/// Inclusive bounds on the raw character length of a document.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct FilterConfig {
    pub min_length: usize,
    pub max_length: usize,
}

impl Default for FilterConfig {
    fn default() -> Self {
        Self {
            min_length: 1000,
            max_length: 5000,
        }
    }
}

/// Settings for the annotation call.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct AnnotationConfig {
    /// Number of worker threads handed to the annotator.
    pub parallelism: usize,

    /// Recompute annotations even when a cache entry exists.
    pub overwrite: bool,
}

impl Default for AnnotationConfig {
    fn default() -> Self {
        Self {
            parallelism: num_cpus::get(),
            overwrite: false,
        }
    }
}

/// The part-of-speech categories kept after annotation.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct TokenFilterConfig {
    /// Universal POS tags, compared case-insensitively.
    pub allowed_tags: BTreeSet<String>,
}

impl Default for TokenFilterConfig {
    fn default() -> Self {
        Self {
            allowed_tags: ["VERB", "NOUN", "PROPN", "ADJ", "ADV"]
                .into_iter()
                .map(String::from)
                .collect(),
        }
    }
}
