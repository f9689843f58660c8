//! Document types flowing through the cleaning stages.

use chrono::NaiveDate;
use serde::{Deserialize, Serialize};

/// A record as it appears in the corpus store, before any cleaning.
///
/// Every field is optional: the store may contain rows with empty cells, and
/// deciding what to do with them is the job of the later stages.
#[derive(Debug, Clone, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct RawDocument {
    /// Full text of the funding request.
    pub text: Option<String>,

    /// Ministry that submitted the request.
    pub ministry: Option<String>,

    /// Prefixed act number, e.g. `"Aktstk. 5"`.
    pub act_number: Option<String>,

    /// Processing status.
    pub status: Option<String>,

    /// Submission date.
    pub date: Option<NaiveDate>,
}

impl RawDocument {
    /// Create a raw record with its key fields set.
    pub fn new<M: Into<String>, A: Into<String>>(ministry: M, act_number: A) -> Self {
        RawDocument {
            ministry: Some(ministry.into()),
            act_number: Some(act_number.into()),
            ..Default::default()
        }
    }

    pub fn with_text<S: Into<String>>(mut self, text: S) -> Self {
        self.text = Some(text.into());
        self
    }

    pub fn with_status<S: Into<String>>(mut self, status: S) -> Self {
        self.status = Some(status.into());
        self
    }

    pub fn with_date(mut self, date: NaiveDate) -> Self {
        self.date = Some(date);
        self
    }

    /// Whether both key fields needed for identity assignment are present.
    pub fn has_key_fields(&self) -> bool {
        self.ministry.is_some() && self.act_number.is_some()
    }
}

/// A keyed document.
///
/// `id` is assigned once by [`crate::corpus::identity::assign_ids`] and
/// `length` once by [`crate::corpus::filter::filter_documents`]; neither
/// changes afterwards.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Document {
    /// Rank within the (ministry, act number) ordering, starting at 1.
    pub id: u32,

    pub ministry: String,

    /// Act number with its prefix removed.
    pub act_number: u32,

    pub status: Option<String>,

    pub date: Option<NaiveDate>,

    pub text: Option<String>,

    /// Character count of the raw (not yet normalized) text.
    pub length: Option<usize>,
}

impl Document {
    /// The text, if the document has any.
    pub fn text(&self) -> Option<&str> {
        self.text.as_deref()
    }

    /// The reduced view used as the right-hand side of the final join.
    pub fn metadata(&self) -> MetadataProjection {
        MetadataProjection {
            doc_id: self.id,
            ministry: self.ministry.clone(),
            act_number: self.act_number,
            status: self.status.clone(),
            date: self.date,
        }
    }
}

/// Per-document metadata joined onto the token table.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct MetadataProjection {
    pub doc_id: u32,
    pub ministry: String,
    pub act_number: u32,
    pub status: Option<String>,
    pub date: Option<NaiveDate>,
}
