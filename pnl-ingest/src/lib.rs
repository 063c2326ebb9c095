//! pnl-ingest: heuristic income statement CSV parsing.
//!
//! Reconstructs account hierarchy, category types and headline totals from a
//! spreadsheet export with an account column, up to twelve month columns and
//! an optional total column.

pub mod classify;
pub mod error;
pub mod hierarchy;
pub mod period;
pub mod statement;
pub mod table;
pub mod totals;

pub use classify::{RowClass, classify_row, detect_level, detect_type, is_total_row};
pub use error::{IngestError, Result};
pub use hierarchy::{HierarchyBuilder, ParentLink};
pub use period::{MonthColumn, ReportPeriod};
pub use statement::{assemble, parse_income_statement, parse_income_statement_at};
pub use table::{RawRow, StatementTable};
