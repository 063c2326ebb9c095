//! Read income statement CSV bytes into header-aligned rows.
//!
//! Expected layout:
//!   Account,Jan 2025,Feb 2025,...,Dec 2025,Total
//!   "Operating Income & Expense",,,...
//!   "    Management Fee Income","$1,200.00","$1,150.00",...

use csv::{ReaderBuilder, StringRecord, Trim};
use log::info;

use crate::error::{IngestError, Result};

/// One data row. The account cell keeps its leading whitespace.
#[derive(Debug, Clone, PartialEq)]
pub struct RawRow {
    /// Untrimmed account-name cell; `None` when the cell is empty or absent
    pub account: Option<String>,
    cells: Vec<String>,
}

impl RawRow {
    pub fn new(account: Option<String>, cells: Vec<String>) -> Self {
        Self { account, cells }
    }

    /// Cell under the header at `column`, `None` when empty or absent.
    pub fn cell(&self, column: usize) -> Option<&str> {
        self.cells
            .get(column)
            .map(String::as_str)
            .filter(|s| !s.is_empty())
    }

    /// Trimmed account label, `None` for blank rows.
    pub fn account_name(&self) -> Option<&str> {
        self.account
            .as_deref()
            .map(str::trim)
            .filter(|s| !s.is_empty())
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct StatementTable {
    /// Trimmed column headers; index 0 is the account column
    pub headers: Vec<String>,
    pub rows: Vec<RawRow>,
}

impl StatementTable {
    pub fn from_csv_bytes(bytes: &[u8]) -> Result<Self> {
        let mut rdr = ReaderBuilder::new()
            .has_headers(true)
            .flexible(true)
            .trim(Trim::None)
            .from_reader(bytes);

        let headers: Vec<String> = rdr
            .headers()?
            .iter()
            .enumerate()
            .map(|(i, h)| {
                let h = if i == 0 { h.trim_start_matches('\u{feff}') } else { h };
                h.trim().to_string()
            })
            .collect();

        if headers.is_empty() || headers.iter().all(|h| h.is_empty()) {
            return Err(IngestError::EmptyInput);
        }

        let mut rows = Vec::new();
        for result in rdr.records() {
            let record = result?;
            rows.push(row_from_record(&record));
        }

        info!("CSV loaded: {} rows, {} columns", rows.len(), headers.len());
        Ok(Self { headers, rows })
    }

    pub fn account_header(&self) -> Result<&str> {
        self.headers
            .first()
            .map(String::as_str)
            .ok_or(IngestError::MissingAccountColumn)
    }

    pub fn len(&self) -> usize {
        self.rows.len()
    }

    pub fn is_empty(&self) -> bool {
        self.rows.is_empty()
    }
}

fn row_from_record(record: &StringRecord) -> RawRow {
    let cells: Vec<String> = record.iter().map(str::to_string).collect();
    let account = cells.first().filter(|s| !s.is_empty()).cloned();
    RawRow::new(account, cells)
}
