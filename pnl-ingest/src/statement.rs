//! Assemble an [`IncomeStatement`] from CSV bytes.
//!
//! Pure and synchronous: every call builds its own category and fact lists,
//! so concurrent parses of different uploads share nothing.

use chrono::{DateTime, Datelike, Utc};
use log::{debug, info};
use pnl_core::{Category, IncomeStatement, MonthlyFact, ReportMetadata, normalize_amount};

use crate::classify::classify_row;
use crate::error::Result;
use crate::hierarchy::HierarchyBuilder;
use crate::period;
use crate::table::StatementTable;
use crate::totals;

/// Parse an uploaded income statement, stamping it with the current time.
pub fn parse_income_statement(bytes: &[u8]) -> Result<IncomeStatement> {
    parse_income_statement_at(bytes, Utc::now())
}

/// Parse with an explicit upload instant. Output depends on the clock only
/// through `upload_date` and the year fallback.
pub fn parse_income_statement_at(
    bytes: &[u8],
    uploaded_at: DateTime<Utc>,
) -> Result<IncomeStatement> {
    info!("Parsing income statement CSV ({} bytes)", bytes.len());
    let table = StatementTable::from_csv_bytes(bytes)?;
    assemble(&table, uploaded_at)
}

pub fn assemble(table: &StatementTable, uploaded_at: DateTime<Utc>) -> Result<IncomeStatement> {
    table.account_header()?;

    let period = period::resolve(&table.headers, uploaded_at.year());
    let total_rows = table.len();

    let mut categories = Vec::new();
    let mut monthly_data = Vec::new();
    let mut hierarchy = HierarchyBuilder::new();

    for (idx, row) in table.rows.iter().enumerate() {
        let (Some(original), Some(account_name)) = (row.account.as_deref(), row.account_name())
        else {
            continue;
        };

        let class = classify_row(original, idx, total_rows);
        let category_id = format!("cat_{idx}");
        let parent = hierarchy.link(class.level, &category_id, account_name);
        debug!(
            "{category_id} {account_name:?}: level {}, {}{}",
            class.level,
            class.category_type.as_str(),
            if class.is_total { ", total" } else { "" }
        );

        for month in &period.month_columns {
            monthly_data.push(MonthlyFact {
                category_id: category_id.clone(),
                account_name: account_name.to_string(),
                month_year: month.label.clone(),
                amount: normalize_amount(row.cell(month.index)),
            });
        }

        let (parent_category_id, parent_category) = match parent {
            Some(p) => (Some(p.category_id), Some(p.account_name)),
            None => (None, None),
        };

        categories.push(Category {
            category_id,
            account_name: account_name.to_string(),
            level: class.level,
            category_type: class.category_type,
            parent_category,
            parent_category_id,
            is_total: class.is_total,
            display_order: idx,
        });
    }

    let totals = totals::aggregate(&table.rows, &period.month_columns);

    info!(
        "Parsed {} categories, {} monthly data points",
        categories.len(),
        monthly_data.len()
    );

    let metadata = ReportMetadata {
        month_columns: period.month_labels(),
        report_period: period.report_period,
        period_start: period.period_start,
        period_end: period.period_end,
        upload_date: uploaded_at,
        total_categories: categories.len(),
        total_data_points: monthly_data.len(),
    };

    Ok(IncomeStatement {
        metadata,
        categories,
        monthly_data,
        totals,
    })
}
