//! CoNLL-U parsing.
//!
//! CoNLL-U is the line-based format UDPipe and most Universal Dependencies
//! taggers write. A sentence is a block of tab-separated token lines
//! terminated by a blank line, optionally preceded by `#` comments:
//!
//! ```text
//! # newpar
//! # sent_id = 1
//! # text = Ministeriet anmoder om tilslutning.
//! 1	Ministeriet	ministerium	NOUN	_	Definite=Def	2	nsubj	_	_
//! 2	anmoder	anmode	VERB	_	Mood=Ind	0	root	_	_
//! ...
//! ```
//!
//! A `# newpar` comment opens a new paragraph. Multi-word token ranges
//! (`1-2`) and empty nodes (`1.1`) carry no tag of their own and are skipped.
//! `_` in an optional column means the value is absent.

use crate::annotation::annotator::AnnotationRow;
use crate::error::{AktstkError, Result};

const COLUMNS: usize = 10;

fn optional(value: &str) -> Option<String> {
    if value == "_" || value.is_empty() {
        None
    } else {
        Some(value.to_string())
    }
}

/// Parse the CoNLL-U output for one document.
///
/// Paragraph and sentence indices are 1-based and count within the document.
pub fn parse_conllu(doc_id: u32, input: &str) -> Result<Vec<AnnotationRow>> {
    let mut rows = Vec::new();
    let mut paragraph_id = 0u32;
    let mut sentence_id = 0u32;
    let mut in_sentence = false;

    for (index, line) in input.lines().enumerate() {
        let line = line.trim_end_matches('\r');
        let line_number = index + 1;

        if line.trim().is_empty() {
            in_sentence = false;
            continue;
        }

        if let Some(comment) = line.strip_prefix('#') {
            if comment.trim_start().starts_with("newpar") {
                paragraph_id += 1;
            }
            continue;
        }

        if !in_sentence {
            in_sentence = true;
            sentence_id += 1;
            // Output without paragraph markers is a single paragraph.
            paragraph_id = paragraph_id.max(1);
        }

        let columns: Vec<&str> = line.split('\t').collect();
        if columns.len() != COLUMNS {
            return Err(AktstkError::annotation(format!(
                "Document {doc_id}, line {line_number}: expected {COLUMNS} columns, found {}",
                columns.len()
            )));
        }

        if columns[0].contains('-') || columns[0].contains('.') {
            continue;
        }

        let token_id = columns[0].parse::<u32>().map_err(|_| {
            AktstkError::annotation(format!(
                "Document {doc_id}, line {line_number}: invalid token id {:?}",
                columns[0]
            ))
        })?;

        let head_token_id = match columns[6] {
            "_" => None,
            head => Some(head.parse::<u32>().map_err(|_| {
                AktstkError::annotation(format!(
                    "Document {doc_id}, line {line_number}: invalid head {head:?}"
                ))
            })?),
        };

        rows.push(AnnotationRow {
            doc_id,
            paragraph_id,
            sentence_id,
            token_id,
            token: columns[1].to_string(),
            lemma: columns[2].to_string(),
            upos: columns[3].to_string(),
            xpos: optional(columns[4]),
            feats: optional(columns[5]),
            head_token_id,
            dep_rel: optional(columns[7]),
            deps: optional(columns[8]),
            misc: optional(columns[9]),
        });
    }

    Ok(rows)
}
