//! Preset keyframe records: comma-delimited rows of
//! `label,parameter,value,min_offset,max_offset[,...]`.
//!
//! Rows are parsed best-effort. Anything malformed or already seen in the same
//! pass is skipped and reported in a [`ParseReport`]; nothing here fails.

use hashbrown::HashSet;
use log::{debug, trace};
use serde::{Deserialize, Serialize};
use thiserror::Error;

const MIN_COLUMNS: usize = 5;
const COL_PARAMETER: usize = 1;
const COL_VALUE: usize = 2;
const COL_MIN: usize = 3;
const COL_MAX: usize = 4;

/// One parameter assignment from a preset file.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct KeyframeRecord {
    pub parameter: String,
    /// Trimmed value column exactly as authored; part of the record identity.
    pub raw_value: String,
    pub base_value: f64,
    /// Randomization bounds added to `base_value` at emission time.
    /// `min_offset <= max_offset` is not checked; an inverted pair inverts the range.
    pub min_offset: f64,
    pub max_offset: f64,
}

#[derive(Clone, Debug, PartialEq, Eq, Hash)]
struct RecordKey {
    parameter: String,
    raw_value: String,
    min_bits: u64,
    max_bits: u64,
}

impl KeyframeRecord {
    fn key(&self) -> RecordKey {
        RecordKey {
            parameter: self.parameter.clone(),
            raw_value: self.raw_value.clone(),
            min_bits: self.min_offset.to_bits(),
            max_bits: self.max_offset.to_bits(),
        }
    }

    /// Bounds of the randomized emission value, in authored order.
    pub fn value_range(&self) -> (f64, f64) {
        (
            self.base_value + self.min_offset,
            self.base_value + self.max_offset,
        )
    }
}

/// Why a row was skipped.
#[derive(Clone, Debug, PartialEq, Eq, Error, Serialize, Deserialize)]
pub enum RowIssueKind {
    #[error("expected at least {expected} fields, found {found}")]
    TooFewColumns { expected: usize, found: usize },
    #[error("empty parameter name")]
    EmptyParameter,
    #[error("field '{field}' is not a number")]
    InvalidNumber { field: String },
    #[error("field '{field}' is not finite")]
    NonFiniteNumber { field: String },
    #[error("duplicate row")]
    Duplicate,
}

impl RowIssueKind {
    #[inline]
    pub fn is_duplicate(&self) -> bool {
        matches!(self, RowIssueKind::Duplicate)
    }
}

/// A rejected row, with its 1-based line number and original text.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct RowIssue {
    pub line: usize,
    pub kind: RowIssueKind,
    pub text: String,
}

/// Summary of one parse pass.
#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
pub struct ParseReport {
    pub accepted: usize,
    #[serde(default)]
    pub issues: Vec<RowIssue>,
}

impl ParseReport {
    pub fn duplicates(&self) -> usize {
        self.issues.iter().filter(|i| i.kind.is_duplicate()).count()
    }

    pub fn malformed(&self) -> usize {
        self.issues.len() - self.duplicates()
    }

    #[inline]
    pub fn is_clean(&self) -> bool {
        self.issues.is_empty()
    }

    pub(crate) fn reject(&mut self, line: usize, kind: RowIssueKind, text: &str) {
        debug!("skipping line {line} ({kind}): {text}");
        self.issues.push(RowIssue {
            line,
            kind,
            text: text.to_string(),
        });
    }
}

/// Items produced by a parse pass together with its report.
#[derive(Clone, Debug, PartialEq)]
pub struct Parsed<T> {
    pub items: Vec<T>,
    pub report: ParseReport,
}

impl<T> Default for Parsed<T> {
    fn default() -> Self {
        Self {
            items: Vec::new(),
            report: ParseReport::default(),
        }
    }
}

impl<T> Parsed<T> {
    pub(crate) fn accept(&mut self, item: T) {
        self.items.push(item);
        self.report.accepted += 1;
    }
}

/// Locale-invariant float parse of a single trimmed field.
pub(crate) fn parse_number(field: &str) -> Result<f64, RowIssueKind> {
    let field = field.trim();
    let value: f64 = field.parse().map_err(|_| RowIssueKind::InvalidNumber {
        field: field.to_string(),
    })?;
    if !value.is_finite() {
        return Err(RowIssueKind::NonFiniteNumber {
            field: field.to_string(),
        });
    }
    Ok(value)
}

fn parse_row(row: &str) -> Result<KeyframeRecord, RowIssueKind> {
    let columns: Vec<&str> = row.split(',').collect();
    if columns.len() < MIN_COLUMNS {
        return Err(RowIssueKind::TooFewColumns {
            expected: MIN_COLUMNS,
            found: columns.len(),
        });
    }
    let parameter = columns[COL_PARAMETER].trim();
    if parameter.is_empty() {
        return Err(RowIssueKind::EmptyParameter);
    }
    let raw_value = columns[COL_VALUE].trim();
    let min_offset = parse_number(columns[COL_MIN])?;
    let max_offset = parse_number(columns[COL_MAX])?;
    let base_value = parse_number(raw_value)?;

    Ok(KeyframeRecord {
        parameter: parameter.to_string(),
        raw_value: raw_value.to_string(),
        base_value,
        min_offset,
        max_offset,
    })
}

/// Parse a preset source into de-duplicated records in first-seen order.
pub fn parse_records(text: &str) -> Parsed<KeyframeRecord> {
    let mut parsed = Parsed::default();
    let mut seen: HashSet<RecordKey> = HashSet::new();

    for (idx, row) in text.lines().enumerate() {
        let line = idx + 1;
        if row.trim().is_empty() {
            continue;
        }
        match parse_row(row) {
            Ok(record) => {
                if seen.insert(record.key()) {
                    trace!("record {} = {}", record.parameter, record.raw_value);
                    parsed.accept(record);
                } else {
                    parsed.report.reject(line, RowIssueKind::Duplicate, row);
                }
            }
            Err(kind) => parsed.report.reject(line, kind, row),
        }
    }
    parsed
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn reads_columns_one_through_four() {
        let parsed = parse_records("0,Cutoff,0.5,-0.1,0.1\n");
        assert_eq!(parsed.items.len(), 1);
        let r = &parsed.items[0];
        assert_eq!(r.parameter, "Cutoff");
        assert_eq!(r.raw_value, "0.5");
        assert_eq!(r.base_value, 0.5);
        assert_eq!(r.min_offset, -0.1);
        assert_eq!(r.max_offset, 0.1);
        assert!(parsed.report.is_clean());
    }

    #[test]
    fn short_rows_and_bad_numbers_are_skipped() {
        let text = "0,Cutoff,0.5,0\n1,Volume,loud,0,0\n2,Pitch,1,x,0\n3, ,1,0,0\n4,Pan,0.25,0,0\n";
        let parsed = parse_records(text);
        assert_eq!(parsed.items.len(), 1);
        assert_eq!(parsed.items[0].parameter, "Pan");
        assert_eq!(parsed.report.malformed(), 4);
        assert_eq!(parsed.report.duplicates(), 0);
        assert_eq!(
            parsed.report.issues[0].kind,
            RowIssueKind::TooFewColumns {
                expected: 5,
                found: 4
            }
        );
        assert_eq!(parsed.report.issues[3].kind, RowIssueKind::EmptyParameter);
        assert_eq!(parsed.report.issues[3].line, 4);
    }

    #[test]
    fn value_text_is_part_of_identity() {
        let text = "a,Gain,1.0,0,0\nb,Gain,1,0,0\nc,Gain,1.0,0,0\n";
        let parsed = parse_records(text);
        assert_eq!(parsed.items.len(), 2);
        assert_eq!(parsed.items[0].raw_value, "1.0");
        assert_eq!(parsed.items[1].raw_value, "1");
        assert_eq!(parsed.report.duplicates(), 1);
    }

    #[test]
    fn label_column_does_not_affect_identity() {
        let parsed = parse_records("row1,Gain,1,0,0\nrow2,Gain,1,0,0\n");
        assert_eq!(parsed.items.len(), 1);
    }

    #[test]
    fn inverted_offsets_are_kept() {
        let parsed = parse_records("0,Gain,1,0.5,-0.5\n");
        assert_eq!(parsed.items[0].value_range(), (1.5, 0.5));
    }

    #[test]
    fn crlf_and_extra_columns_are_tolerated() {
        let parsed = parse_records("0,Gain,1,0,0,comment\r\n1,Pan,0,0,0\r\n");
        assert_eq!(parsed.items.len(), 2);
        assert_eq!(parsed.items[1].parameter, "Pan");
    }
}
