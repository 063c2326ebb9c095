//! Month column detection and report period resolution.

use std::sync::OnceLock;

use chrono::{Datelike, Duration, NaiveDate};
use log::{info, warn};
use regex::Regex;

/// Expected monthly columns for a full-year report
pub const MONTHS_PER_REPORT: usize = 12;

/// A header recognized as monthly data.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MonthColumn {
    /// Position in the header row (0 is the account column)
    pub index: usize,
    pub label: String,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ReportPeriod {
    pub month_columns: Vec<MonthColumn>,
    /// 4-digit year
    pub report_period: String,
    pub period_start: Option<NaiveDate>,
    pub period_end: Option<NaiveDate>,
}

impl ReportPeriod {
    pub fn month_labels(&self) -> Vec<String> {
        self.month_columns.iter().map(|c| c.label.clone()).collect()
    }
}

fn year_re() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| Regex::new(r"20\d{2}").expect("invalid year regex"))
}

/// Every header after the first that is not a total and not a "nan" placeholder.
///
/// Blank headers still carry data and are labelled `Unnamed: {index}`.
pub fn month_columns(headers: &[String]) -> Vec<MonthColumn> {
    headers
        .iter()
        .enumerate()
        .skip(1)
        .filter(|(_, h)| is_month_header(h))
        .map(|(index, h)| MonthColumn {
            index,
            label: column_label(index, h),
        })
        .collect()
}

fn is_month_header(header: &str) -> bool {
    let lower = header.trim().to_lowercase();
    !lower.contains("total") && lower != "nan"
}

fn column_label(index: usize, header: &str) -> String {
    if header.trim().is_empty() {
        format!("Unnamed: {index}")
    } else {
        header.to_string()
    }
}

/// Resolve month columns and the calendar span they cover.
///
/// `fallback_year` is used when the first month header carries no year; the
/// period then spans that whole calendar year.
pub fn resolve(headers: &[String], fallback_year: i32) -> ReportPeriod {
    let month_columns = month_columns(headers);
    let labels: Vec<&str> = month_columns.iter().map(|c| c.label.as_str()).collect();
    info!("Month columns detected: {labels:?}");

    if month_columns.len() != MONTHS_PER_REPORT {
        warn!(
            "Expected {MONTHS_PER_REPORT} month columns, found {}",
            month_columns.len()
        );
    }

    let year = month_columns
        .first()
        .and_then(|c| year_re().find(&c.label))
        .map(|m| m.as_str().to_string());

    let Some(report_period) = year else {
        return ReportPeriod {
            month_columns,
            report_period: fallback_year.to_string(),
            period_start: NaiveDate::from_ymd_opt(fallback_year, 1, 1),
            period_end: NaiveDate::from_ymd_opt(fallback_year, 12, 31),
        };
    };

    let mut period_start = None;
    let mut period_end = None;
    if let (Some(first), Some(last)) = (month_columns.first(), month_columns.last()) {
        match parse_month_year(&first.label) {
            Some(start) => {
                period_start = Some(start);
                period_end = parse_month_year(&last.label).and_then(last_day_of_month);
                if period_end.is_none() {
                    warn!("Could not parse period end from {:?}", last.label);
                }
            }
            None => warn!("Could not parse period start from {:?}", first.label),
        }
    }

    ReportPeriod {
        month_columns,
        report_period,
        period_start,
        period_end,
    }
}

/// Parse a "Mon YYYY" header into the first day of that month.
pub fn parse_month_year(label: &str) -> Option<NaiveDate> {
    NaiveDate::parse_from_str(&format!("01 {}", label.trim()), "%d %b %Y").ok()
}

/// Last calendar day of the month containing `date`.
pub fn last_day_of_month(date: NaiveDate) -> Option<NaiveDate> {
    if date.month() == 12 {
        return NaiveDate::from_ymd_opt(date.year(), 12, 31);
    }
    let next = NaiveDate::from_ymd_opt(date.year(), date.month() + 1, 1)?;
    Some(next - Duration::days(1))
}
