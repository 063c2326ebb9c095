//! Income statement records produced by a single parse pass.

use chrono::{DateTime, NaiveDate, Utc};
use serde::{Deserialize, Serialize};

/// Financial category of a statement row
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash)]
pub enum CategoryType {
    #[serde(rename = "income")]
    Income,
    #[serde(rename = "cogs")]
    Cogs,
    #[serde(rename = "expense")]
    Expense,
    #[serde(rename = "other")]
    Other,
}

impl CategoryType {
    pub fn as_str(&self) -> &'static str {
        match self {
            CategoryType::Income => "income",
            CategoryType::Cogs => "cogs",
            CategoryType::Expense => "expense",
            CategoryType::Other => "other",
        }
    }
}

/// One account line of the report, linked to its parent by position.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct Category {
    /// `cat_<row index>`
    pub category_id: String,
    /// Trimmed account label
    pub account_name: String,
    /// Hierarchy depth, 0 (section/total) through 3 (line item)
    #[serde(rename = "category_level")]
    pub level: u8,
    pub category_type: CategoryType,
    /// Account name of the nearest earlier category one level up
    pub parent_category: Option<String>,
    pub parent_category_id: Option<String>,
    pub is_total: bool,
    /// Original data-row index
    pub display_order: usize,
}

/// One (category, month column) amount
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct MonthlyFact {
    pub category_id: String,
    pub account_name: String,
    /// Column header as it appeared in the file, e.g. "Jan 2025"
    pub month_year: String,
    pub amount: f64,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct ReportMetadata {
    /// 4-digit year
    pub report_period: String,
    pub period_start: Option<NaiveDate>,
    pub period_end: Option<NaiveDate>,
    pub upload_date: DateTime<Utc>,
    pub total_categories: usize,
    pub total_data_points: usize,
    pub month_columns: Vec<String>,
}

/// Headline figures located by label search. Each value is rounded to cents.
///
/// These are read straight off the report's own summary rows, so they are
/// not guaranteed to agree with sums over the category tree.
#[derive(Debug, Clone, Copy, Default, Serialize, Deserialize, PartialEq)]
pub struct Totals {
    pub total_operating_income: f64,
    pub total_cogs: f64,
    /// total_operating_income - total_cogs
    pub real_revenue: f64,
    pub total_operating_expense: f64,
    pub noi: f64,
    pub total_income: f64,
    pub total_expense: f64,
    pub net_income: f64,
}

/// Full result of parsing one uploaded income statement.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct IncomeStatement {
    pub metadata: ReportMetadata,
    pub categories: Vec<Category>,
    pub monthly_data: Vec<MonthlyFact>,
    pub totals: Totals,
}

impl IncomeStatement {
    /// Flatten into the webhook body, metadata fields lifted to the root.
    pub fn into_payload(self, batch_id: impl Into<String>) -> RelayPayload {
        RelayPayload {
            batch_id: batch_id.into(),
            report_period: self.metadata.report_period,
            period_start: self.metadata.period_start,
            period_end: self.metadata.period_end,
            total_categories: self.metadata.total_categories,
            total_data_points: self.metadata.total_data_points,
            categories: self.categories,
            monthly_data: self.monthly_data,
            totals: self.totals,
        }
    }

    pub fn category(&self, category_id: &str) -> Option<&Category> {
        self.categories.iter().find(|c| c.category_id == category_id)
    }
}

/// JSON body delivered to the downstream webhook
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct RelayPayload {
    pub batch_id: String,
    pub report_period: String,
    pub period_start: Option<NaiveDate>,
    pub period_end: Option<NaiveDate>,
    pub total_categories: usize,
    pub total_data_points: usize,
    pub categories: Vec<Category>,
    pub monthly_data: Vec<MonthlyFact>,
    pub totals: Totals,
}
