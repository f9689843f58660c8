//! Whitespace normalization.
//!
//! Every run of Unicode whitespace (spaces, tabs, newlines, no-break spaces)
//! becomes a single ASCII space and the ends are trimmed. The function is
//! total and idempotent.

use rayon::prelude::*;

use crate::corpus::document::Document;

/// Collapse internal whitespace runs and trim the ends.
///
/// ```
/// use aktstk::corpus::normalize::normalize_whitespace;
///
/// assert_eq!(normalize_whitespace("  Aktstk.\t5 \n\n om  tilskud "), "Aktstk. 5 om tilskud");
/// ```
pub fn normalize_whitespace(text: &str) -> String {
    let mut normalized = String::with_capacity(text.len());
    for word in text.split_whitespace() {
        if !normalized.is_empty() {
            normalized.push(' ');
        }
        normalized.push_str(word);
    }
    normalized
}

/// Normalize the text of every document in place.
///
/// Documents are independent, so the work is spread over the rayon pool.
pub fn normalize_documents(documents: &mut [Document]) {
    documents.par_iter_mut().for_each(|doc| {
        if let Some(text) = doc.text.as_mut() {
            *text = normalize_whitespace(text);
        }
    });
}
