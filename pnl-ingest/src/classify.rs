//! Row classification: hierarchy level, category type and total-row flag.
//!
//! Exported statements carry no explicit structure. Depth comes from the
//! indentation of the account cell when the exporter kept it, otherwise from
//! label conventions. Category type comes from keywords, then from where the
//! row sits in the report.

use pnl_core::CategoryType;

/// Deepest level a row can be assigned
pub const MAX_LEVEL: u8 = 3;

/// (minimum leading whitespace, level), deepest first
const INDENT_LEVELS: &[(usize, u8)] = &[(12, 3), (8, 2), (4, 1)];

const SECTION_MARKERS: &[&str] = &[
    "Total Income",
    "Total Expense",
    "Net Income",
    "NOI",
    "Net Operating Income",
    "Operating Income & Expense",
];

const INCOME_KEYWORDS: &[&str] = &[
    "income",
    "revenue",
    "fee income",
    "management fee",
    "leasing fee",
    "operating income",
    "rental income",
];

const COGS_KEYWORDS: &[&str] = &[
    "cogs",
    "cost of goods",
    "commission",
    "direct cost",
    "cost of sales",
];

const EXPENSE_KEYWORDS: &[&str] = &[
    "expense",
    "cost",
    "payroll",
    "marketing",
    "administrative",
    "travel",
    "insurance",
    "office",
    "bank",
    "legal",
    "professional",
];

/// Checked top to bottom; first hit wins.
const TYPE_KEYWORDS: &[(CategoryType, &[&str])] = &[
    (CategoryType::Income, INCOME_KEYWORDS),
    (CategoryType::Cogs, COGS_KEYWORDS),
    (CategoryType::Expense, EXPENSE_KEYWORDS),
];

/// (upper bound as a fraction of total rows, type). Rows past the last bound are `Other`.
const POSITION_BANDS: &[(f64, CategoryType)] = &[
    (0.2, CategoryType::Income),
    (0.4, CategoryType::Cogs),
    (0.9, CategoryType::Expense),
];

/// Everything inferred about a single row.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RowClass {
    pub level: u8,
    pub category_type: CategoryType,
    pub is_total: bool,
}

/// Classify a row from its untrimmed account cell.
pub fn classify_row(original_text: &str, row_index: usize, total_rows: usize) -> RowClass {
    let account_name = original_text.trim();
    RowClass {
        level: detect_level(account_name, original_text),
        category_type: detect_type(account_name, row_index, total_rows),
        is_total: is_total_row(account_name),
    }
}

/// Hierarchy depth, 0 through [`MAX_LEVEL`].
///
/// Indentation in `original_text` wins when present; otherwise the trimmed
/// label decides.
pub fn detect_level(account_name: &str, original_text: &str) -> u8 {
    let label = account_name.trim();
    if label.is_empty() {
        return 0;
    }

    let leading = original_text
        .chars()
        .take_while(|c| c.is_whitespace())
        .count();
    if let Some(&(_, level)) = INDENT_LEVELS.iter().find(|(min, _)| leading >= *min) {
        return level;
    }

    if SECTION_MARKERS.iter().any(|m| label.contains(m)) {
        return 0;
    }

    if is_all_caps(label) && label.split_whitespace().count() <= 4 {
        return 1;
    }

    if label.starts_with("Total ") {
        return 1;
    }

    if label.contains(" - ") || label.contains(": ") {
        return 2;
    }

    2
}

/// Keyword match first, then relative position in the report.
pub fn detect_type(account_name: &str, row_index: usize, total_rows: usize) -> CategoryType {
    let label = account_name.trim().to_lowercase();
    if label.is_empty() {
        return CategoryType::Other;
    }

    for (category_type, keywords) in TYPE_KEYWORDS {
        if keywords.iter().any(|k| label.contains(k)) {
            return *category_type;
        }
    }

    let position = row_index as f64;
    let total = total_rows as f64;
    POSITION_BANDS
        .iter()
        .find(|(bound, _)| position < total * bound)
        .map(|(_, category_type)| *category_type)
        .unwrap_or(CategoryType::Other)
}

/// Subtotal and summary rows: "Total ..." or anything mentioning net income / NOI.
pub fn is_total_row(account_name: &str) -> bool {
    let label = account_name.trim().to_lowercase();
    label.starts_with("total ") || label.contains("net income") || label.contains("noi")
}

/// At least one cased letter and no lowercase ones.
fn is_all_caps(label: &str) -> bool {
    label.chars().any(char::is_uppercase) && !label.chars().any(char::is_lowercase)
}
