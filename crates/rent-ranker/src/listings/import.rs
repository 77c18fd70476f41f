//! Bulk manual entry from a headered CSV export.

use std::io::Read;

use serde::Serialize;
use serde_json::Value;

use super::reconcile::{FieldIssue, ListingDraft};

/// One CSV data row turned into a creation payload. `row` is 1-based and
/// counts data rows only.
#[derive(Debug, Clone, PartialEq)]
pub struct ImportRow {
    pub row: usize,
    pub draft: ListingDraft,
}

impl ImportRow {
    pub(crate) fn issue(&self, issue: FieldIssue) -> ImportIssue {
        ImportIssue {
            row: self.row,
            field: Some(issue.field),
            message: issue.message,
        }
    }

    pub(crate) fn rejection(&self, error: &dyn std::error::Error) -> ImportIssue {
        ImportIssue {
            row: self.row,
            field: None,
            message: error.to_string(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ImportIssue {
    pub row: usize,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub field: Option<String>,
    pub message: String,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct ImportSummary {
    pub created: usize,
    pub duplicates: usize,
    pub rejected_rows: usize,
    pub issues: Vec<ImportIssue>,
}

/// Reads listing rows; empty cells are treated as absent.
#[derive(Debug, Clone, Default)]
pub struct ListingCsvImporter {
    rows: Vec<ImportRow>,
}

impl ListingCsvImporter {
    pub fn from_reader<R: Read>(reader: R) -> Result<Self, csv::Error> {
        let mut csv_reader = csv::ReaderBuilder::new()
            .trim(csv::Trim::All)
            .flexible(true)
            .from_reader(reader);

        let headers: Vec<String> = csv_reader
            .headers()?
            .iter()
            .map(normalize_header)
            .collect();

        let mut rows = Vec::new();
        for (index, record) in csv_reader.records().enumerate() {
            let record = record?;
            let mut draft = ListingDraft::default();
            for (header, cell) in headers.iter().zip(record.iter()) {
                if header.is_empty() || cell.is_empty() {
                    continue;
                }
                draft.set(header, Value::String(cell.to_string()));
            }

            if draft.fields().is_empty() {
                continue;
            }
            rows.push(ImportRow {
                row: index + 1,
                draft,
            });
        }

        Ok(Self { rows })
    }

    pub fn rows(&self) -> &[ImportRow] {
        &self.rows
    }

    pub fn into_rows(self) -> Vec<ImportRow> {
        self.rows
    }
}

pub(crate) fn normalize_header(value: &str) -> String {
    let cleaned = value.replace(['\u{feff}', '\u{200b}'], "");
    cleaned
        .split_whitespace()
        .collect::<Vec<_>>()
        .join("_")
        .to_ascii_lowercase()
}
