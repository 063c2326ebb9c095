//! Headline totals located by label search over the raw account column.

use std::sync::OnceLock;

use log::info;
use pnl_core::{Totals, normalize_amount, round_cents};
use regex::{Regex, RegexBuilder};

use crate::period::MonthColumn;
use crate::table::RawRow;

/// Which headline figure a pattern feeds.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Figure {
    OperatingIncome,
    Cogs,
    OperatingExpense,
    Noi,
    Income,
    Expense,
    NetIncome,
}

const PATTERNS: &[(Figure, &str)] = &[
    (Figure::OperatingIncome, r"Total Operating Income"),
    (Figure::Cogs, r"Total.*COGS|Total.*Cost of Goods"),
    (Figure::OperatingExpense, r"Total Operating Expense"),
    (Figure::Noi, r"NOI|Net Operating Income"),
    (Figure::Income, r"^Total Income$"),
    (Figure::Expense, r"^Total Expense$"),
    (Figure::NetIncome, r"Net Income"),
];

fn patterns() -> &'static [(Figure, Regex)] {
    static RES: OnceLock<Vec<(Figure, Regex)>> = OnceLock::new();
    RES.get_or_init(|| {
        PATTERNS
            .iter()
            .map(|(figure, pattern)| {
                let re = RegexBuilder::new(pattern)
                    .case_insensitive(true)
                    .build()
                    .expect("invalid totals regex");
                (*figure, re)
            })
            .collect()
    })
}

/// Sum the month cells of the first row whose account text matches `re`.
///
/// Matching runs on the untrimmed cell, so anchored patterns only hit
/// unindented labels.
fn first_match_total(re: &Regex, rows: &[RawRow], months: &[MonthColumn]) -> f64 {
    rows.iter()
        .find(|row| row.account.as_deref().is_some_and(|a| re.is_match(a)))
        .map(|row| {
            months
                .iter()
                .map(|m| normalize_amount(row.cell(m.index)))
                .sum::<f64>()
        })
        .unwrap_or(0.0)
}

pub fn aggregate(rows: &[RawRow], months: &[MonthColumn]) -> Totals {
    let mut totals = Totals::default();
    for (figure, re) in patterns() {
        let value = first_match_total(re, rows, months);
        match figure {
            Figure::OperatingIncome => totals.total_operating_income = value,
            Figure::Cogs => totals.total_cogs = value,
            Figure::OperatingExpense => totals.total_operating_expense = value,
            Figure::Noi => totals.noi = value,
            Figure::Income => totals.total_income = value,
            Figure::Expense => totals.total_expense = value,
            Figure::NetIncome => totals.net_income = value,
        }
    }
    totals.real_revenue = totals.total_operating_income - totals.total_cogs;

    info!(
        "Totals calculated: real revenue {:.2}, net income {:.2}",
        totals.real_revenue, totals.net_income
    );

    Totals {
        total_operating_income: round_cents(totals.total_operating_income),
        total_cogs: round_cents(totals.total_cogs),
        real_revenue: round_cents(totals.real_revenue),
        total_operating_expense: round_cents(totals.total_operating_expense),
        noi: round_cents(totals.noi),
        total_income: round_cents(totals.total_income),
        total_expense: round_cents(totals.total_expense),
        net_income: round_cents(totals.net_income),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn row(account: &str, values: &[&str]) -> RawRow {
        let mut cells = vec![account.to_string()];
        cells.extend(values.iter().map(|v| v.to_string()));
        let account = Some(account.to_string()).filter(|a| !a.is_empty());
        RawRow::new(account, cells)
    }

    fn months(n: usize) -> Vec<MonthColumn> {
        (1..=n)
            .map(|index| MonthColumn {
                index,
                label: format!("M{index}"),
            })
            .collect()
    }

    #[test]
    fn test_first_matching_row_wins() {
        let rows = vec![
            row("Total Income", &["100", "50"]),
            row("Total Income", &["999", "999"]),
        ];
        let totals = aggregate(&rows, &months(2));
        assert_eq!(totals.total_income, 150.0);
    }

    #[test]
    fn test_anchored_patterns_need_exact_label() {
        let rows = vec![
            row("Total Income Adjustments", &["5"]),
            row("    Total Income", &["7"]),
            row("total income", &["11"]),
        ];
        let totals = aggregate(&rows, &months(1));
        // case-insensitive, but ^...$ rules out prefixes, suffixes and indentation
        assert_eq!(totals.total_income, 11.0);
    }

    #[test]
    fn test_all_figures_and_real_revenue() {
        let rows = vec![
            row("Total Operating Income", &["$1,000.00", "1000"]),
            row("Total Cost of Goods Sold", &["(100)", "-150"]),
            row("Total Operating Expense", &["300", "300"]),
            row("Net Operating Income", &["400", "400"]),
            row("Total Expense", &["20", "20"]),
            row("Net Income", &["380.25", "380"]),
        ];
        let totals = aggregate(&rows, &months(2));
        assert_eq!(totals.total_operating_income, 2000.0);
        assert_eq!(totals.total_cogs, -250.0);
        assert_eq!(totals.real_revenue, 2250.0);
        assert_eq!(totals.total_operating_expense, 600.0);
        assert_eq!(totals.noi, 800.0);
        assert_eq!(totals.total_income, 0.0);
        assert_eq!(totals.total_expense, 40.0);
        assert_eq!(totals.net_income, 760.25);
    }

    #[test]
    fn test_noi_matches_inside_words() {
        // substring search, no word boundaries
        let rows = vec![row("ILLINOIS PROPERTY", &["12"]), row("NOI", &["99"])];
        let totals = aggregate(&rows, &months(1));
        assert_eq!(totals.noi, 12.0);
    }

    #[test]
    fn test_exact_half_cent_rounds_to_even() {
        let rows = vec![row("Net Income", &["0.125"]), row("NOI", &["0.375"])];
        let totals = aggregate(&rows, &months(1));
        assert_eq!(totals.net_income, 0.12);
        assert_eq!(totals.noi, 0.38);
    }

    #[test]
    fn test_no_match_is_zero() {
        let rows = vec![row("Rent", &["1"]), row("", &["2"])];
        assert_eq!(aggregate(&rows, &months(1)), Totals::default());
    }
}
