//! Table persistence.
//!
//! Output tables (the tagged corpus, the cleaned corpus, quarantined records)
//! are flat records written either as CSV with a header row or as JSON Lines.
//! Absent values become empty CSV cells or JSON nulls. A CSV table always
//! carries its header row, even when it has no records.
//!
//! Files are written to a temporary sibling and renamed into place, so an
//! interrupted run never leaves a truncated table behind.

use std::fs;
use std::io::{BufWriter, Write};
use std::path::Path;

use log::info;
use serde::Serialize;
use tempfile::NamedTempFile;

use crate::corpus::document::{Document, RawDocument};
use crate::error::{AktstkError, Result};
use crate::tagging::merge::TaggedRow;

/// A record type that can be written as a table row.
pub trait TableRow: Serialize {
    /// Column names, in serialization order.
    const COLUMNS: &'static [&'static str];
}

impl TableRow for TaggedRow {
    const COLUMNS: &'static [&'static str] = &[
        "doc_id",
        "ministry",
        "act_number",
        "status",
        "date",
        "paragraph_id",
        "sentence_id",
        "token_id",
        "token",
        "lemma",
        "upos",
        "lemma_upos",
    ];
}

impl TableRow for Document {
    const COLUMNS: &'static [&'static str] = &[
        "id",
        "ministry",
        "act_number",
        "status",
        "date",
        "text",
        "length",
    ];
}

impl TableRow for RawDocument {
    const COLUMNS: &'static [&'static str] = &["text", "ministry", "act_number", "status", "date"];
}

/// On-disk format of an output table.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TableFormat {
    Csv,
    Jsonl,
}

impl TableFormat {
    /// Guess the format from a file extension.
    pub fn from_path<P: AsRef<Path>>(path: P) -> Result<Self> {
        let extension = path
            .as_ref()
            .extension()
            .and_then(|e| e.to_str())
            .map(|e| e.to_ascii_lowercase());

        match extension.as_deref() {
            Some("csv") => Ok(TableFormat::Csv),
            Some("jsonl") | Some("ndjson") => Ok(TableFormat::Jsonl),
            _ => Err(AktstkError::storage(format!(
                "Cannot infer table format from {}",
                path.as_ref().display()
            ))),
        }
    }
}

/// Write `rows` to `path`. When `format` is `None` it is inferred from the
/// extension. Returns the number of rows written.
pub fn write_table<T, P>(path: P, rows: &[T], format: Option<TableFormat>) -> Result<usize>
where
    T: TableRow,
    P: AsRef<Path>,
{
    let path = path.as_ref();
    let format = match format {
        Some(format) => format,
        None => TableFormat::from_path(path)?,
    };

    let directory = match path.parent() {
        Some(parent) if !parent.as_os_str().is_empty() => parent,
        _ => Path::new("."),
    };
    fs::create_dir_all(directory)
        .map_err(|e| AktstkError::storage(format!("Failed to create directory: {e}")))?;

    let mut temp = NamedTempFile::new_in(directory)?;
    match format {
        TableFormat::Csv => write_csv(temp.as_file_mut(), rows)?,
        TableFormat::Jsonl => write_jsonl(temp.as_file_mut(), rows)?,
    }
    temp.persist(path).map_err(|e| AktstkError::from(e.error))?;

    info!("Wrote {} rows to {}", rows.len(), path.display());
    Ok(rows.len())
}

fn write_csv<T: TableRow, W: Write>(writer: W, rows: &[T]) -> Result<()> {
    let mut writer = csv::Writer::from_writer(writer);
    // Headers are otherwise derived from the first record.
    if rows.is_empty() {
        writer.write_record(T::COLUMNS)?;
    }
    for row in rows {
        writer.serialize(row)?;
    }
    writer.flush()?;
    Ok(())
}

fn write_jsonl<T: Serialize, W: Write>(writer: W, rows: &[T]) -> Result<()> {
    let mut writer = BufWriter::new(writer);
    for row in rows {
        serde_json::to_writer(&mut writer, row)?;
        writer.write_all(b"\n")?;
    }
    writer.flush()?;
    Ok(())
}
