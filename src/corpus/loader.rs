//! Corpus loaders.
//!
//! Raw funding requests are stored as a table with the columns `text`,
//! `ministry`, `act_number`, `status` and `date`. Two storage formats are
//! supported:
//!
//! ```csv
//! text,ministry,act_number,status,date
//! "Finansministeriet anmoder om ...",Finansministeriet,Aktstk. 5,Tiltrådt,2021-03-04
//! ```
//!
//! ```jsonl
//! {"text": "Finansministeriet anmoder om ...", "ministry": "Finansministeriet", "act_number": "Aktstk. 5", "status": "Tiltrådt", "date": "2021-03-04"}
//! ```
//!
//! Empty cells and JSON nulls become `None`. In CSV a missing column is an
//! error; in JSON Lines an absent key is read as null.

use std::fs::File;
use std::io::{BufRead, BufReader};
use std::path::Path;

use chrono::NaiveDate;
use csv::{ReaderBuilder, StringRecord, StringRecordsIntoIter};
use log::{debug, info};
use serde::Deserialize;

use crate::corpus::document::RawDocument;
use crate::error::{AktstkError, Result};

/// Column names every corpus store must provide.
pub const REQUIRED_COLUMNS: [&str; 5] = ["text", "ministry", "act_number", "status", "date"];

const DATE_FORMATS: [&str; 3] = ["%Y-%m-%d", "%d-%m-%Y", "%d.%m.%Y"];

/// A trait for reading a corpus store into raw records.
pub trait CorpusReader {
    /// The iterator type that yields records.
    type Iter: Iterator<Item = Result<RawDocument>>;

    /// Open a store and iterate over its records.
    fn read<P: AsRef<Path>>(&self, path: P) -> Result<Self::Iter>;
}

/// Storage format of a corpus file.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CorpusFormat {
    Csv,
    Tsv,
    Jsonl,
}

impl CorpusFormat {
    /// Guess the format from a file extension.
    pub fn from_path<P: AsRef<Path>>(path: P) -> Result<Self> {
        let extension = path
            .as_ref()
            .extension()
            .and_then(|e| e.to_str())
            .map(|e| e.to_ascii_lowercase());

        match extension.as_deref() {
            Some("csv") => Ok(CorpusFormat::Csv),
            Some("tsv") => Ok(CorpusFormat::Tsv),
            Some("jsonl") | Some("ndjson") => Ok(CorpusFormat::Jsonl),
            _ => Err(AktstkError::parse(format!(
                "Cannot infer corpus format from {}",
                path.as_ref().display()
            ))),
        }
    }
}

/// Load a whole corpus into memory.
///
/// When `format` is `None` it is inferred from the file extension.
pub fn load_corpus<P: AsRef<Path>>(path: P, format: Option<CorpusFormat>) -> Result<Vec<RawDocument>> {
    let path = path.as_ref();
    let format = match format {
        Some(format) => format,
        None => CorpusFormat::from_path(path)?,
    };

    let documents = match format {
        CorpusFormat::Csv => CsvCorpusReader::new().read(path)?.collect::<Result<Vec<_>>>()?,
        CorpusFormat::Tsv => CsvCorpusReader::new()
            .with_delimiter(b'\t')
            .read(path)?
            .collect::<Result<Vec<_>>>()?,
        CorpusFormat::Jsonl => JsonlCorpusReader::new().read(path)?.collect::<Result<Vec<_>>>()?,
    };

    info!("Loaded {} records from {}", documents.len(), path.display());
    Ok(documents)
}

/// Parse a submission date. Empty input means no date.
pub fn parse_date(value: &str) -> Result<Option<NaiveDate>> {
    let value = value.trim();
    if value.is_empty() {
        return Ok(None);
    }

    DATE_FORMATS
        .iter()
        .find_map(|format| NaiveDate::parse_from_str(value, format).ok())
        .map(Some)
        .ok_or_else(|| AktstkError::parse(format!("Unrecognised date: {value:?}")))
}

fn non_empty(value: &str) -> Option<String> {
    if value.is_empty() {
        None
    } else {
        Some(value.to_string())
    }
}

fn non_blank(value: &str) -> Option<String> {
    non_empty(value.trim())
}

/// A corpus reader for CSV and other delimited formats.
#[derive(Debug, Clone)]
pub struct CsvCorpusReader {
    /// Delimiter character (default: ',')
    delimiter: u8,
}

impl Default for CsvCorpusReader {
    fn default() -> Self {
        Self::new()
    }
}

impl CsvCorpusReader {
    /// Create a new reader with comma delimiter.
    pub fn new() -> Self {
        CsvCorpusReader { delimiter: b',' }
    }

    /// Set a custom delimiter byte, e.g. `b'\t'` or `b';'`.
    pub fn with_delimiter(mut self, delimiter: u8) -> Self {
        self.delimiter = delimiter;
        self
    }
}

/// Positions of the required columns within a header row.
#[derive(Debug, Clone, Copy)]
struct ColumnLayout {
    text: usize,
    ministry: usize,
    act_number: usize,
    status: usize,
    date: usize,
}

impl ColumnLayout {
    fn from_headers(headers: &StringRecord) -> Result<Self> {
        let position = |name: &str| {
            headers
                .iter()
                .position(|h| h.trim() == name)
                .ok_or_else(|| AktstkError::MissingColumn(name.to_string()))
        };

        Ok(ColumnLayout {
            text: position("text")?,
            ministry: position("ministry")?,
            act_number: position("act_number")?,
            status: position("status")?,
            date: position("date")?,
        })
    }

    fn to_document(self, record: &StringRecord) -> Result<RawDocument> {
        let cell = |index: usize| record.get(index).unwrap_or("");
        let line = record.position().map(|p| p.line()).unwrap_or(0);

        let date = parse_date(cell(self.date))
            .map_err(|e| AktstkError::parse(format!("Line {line}: {e}")))?;

        Ok(RawDocument {
            text: non_empty(cell(self.text)),
            ministry: non_blank(cell(self.ministry)),
            act_number: non_blank(cell(self.act_number)),
            status: non_blank(cell(self.status)),
            date,
        })
    }
}

/// Iterator over CSV records.
pub struct CsvRecordIterator {
    records: StringRecordsIntoIter<File>,
    layout: ColumnLayout,
}

impl Iterator for CsvRecordIterator {
    type Item = Result<RawDocument>;

    fn next(&mut self) -> Option<Self::Item> {
        let record = self.records.next()?;
        Some(
            record
                .map_err(AktstkError::from)
                .and_then(|record| self.layout.to_document(&record)),
        )
    }
}

impl CorpusReader for CsvCorpusReader {
    type Iter = CsvRecordIterator;

    fn read<P: AsRef<Path>>(&self, path: P) -> Result<Self::Iter> {
        let mut reader = ReaderBuilder::new()
            .delimiter(self.delimiter)
            .flexible(true)
            .from_path(path.as_ref())?;

        let headers = reader.headers()?.clone();
        let layout = ColumnLayout::from_headers(&headers)?;
        debug!("CSV column layout: {layout:?}");

        Ok(CsvRecordIterator {
            records: reader.into_records(),
            layout,
        })
    }
}

/// The shape of one JSON Lines record.
#[derive(Debug, Default, Deserialize)]
#[serde(default)]
struct JsonRecord {
    text: Option<String>,
    ministry: Option<String>,
    act_number: Option<String>,
    status: Option<String>,
    date: Option<String>,
}

/// A corpus reader for JSON Lines.
#[derive(Debug, Clone, Default)]
pub struct JsonlCorpusReader;

impl JsonlCorpusReader {
    pub fn new() -> Self {
        JsonlCorpusReader
    }

    fn parse_json_line(line: &str, line_number: usize) -> Result<RawDocument> {
        let record: JsonRecord = serde_json::from_str(line).map_err(|e| {
            AktstkError::parse(format!("Line {line_number}: failed to parse JSON: {e}"))
        })?;

        let date = match record.date.as_deref() {
            Some(value) => parse_date(value)
                .map_err(|e| AktstkError::parse(format!("Line {line_number}: {e}")))?,
            None => None,
        };

        Ok(RawDocument {
            text: record.text.as_deref().and_then(non_empty),
            ministry: record.ministry.as_deref().and_then(non_blank),
            act_number: record.act_number.as_deref().and_then(non_blank),
            status: record.status.as_deref().and_then(non_blank),
            date,
        })
    }
}

/// Iterator over JSON Lines records.
pub struct JsonlRecordIterator {
    reader: BufReader<File>,
    line_number: usize,
}

impl Iterator for JsonlRecordIterator {
    type Item = Result<RawDocument>;

    fn next(&mut self) -> Option<Self::Item> {
        let mut line = String::new();
        loop {
            line.clear();
            self.line_number += 1;
            match self.reader.read_line(&mut line) {
                Ok(0) => return None,
                Ok(_) => {
                    let line = line.trim();
                    if line.is_empty() {
                        continue;
                    }
                    return Some(JsonlCorpusReader::parse_json_line(line, self.line_number));
                }
                Err(e) => return Some(Err(AktstkError::from(e))),
            }
        }
    }
}

impl CorpusReader for JsonlCorpusReader {
    type Iter = JsonlRecordIterator;

    fn read<P: AsRef<Path>>(&self, path: P) -> Result<Self::Iter> {
        let file = File::open(path.as_ref())?;
        Ok(JsonlRecordIterator {
            reader: BufReader::new(file),
            line_number: 0,
        })
    }
}
