//! pnl-core: income statement records and cell value normalization

pub mod amount;
pub mod model;

pub use amount::{CellValue, normalize_amount, round_cents};
pub use model::{
    Category, CategoryType, IncomeStatement, MonthlyFact, RelayPayload, ReportMetadata, Totals,
};
