//! Cell value normalization.
//!
//! Spreadsheet exports mix currency formatting ("$1,234.56"), accounting
//! negatives ("(500)"), dashes and blanks in the same column. Everything
//! collapses to a signed `f64`; anything unreadable becomes 0.0.

use log::warn;

/// A raw spreadsheet cell before normalization.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum CellValue<'a> {
    Missing,
    Number(f64),
    Text(&'a str),
}

impl<'a> From<Option<&'a str>> for CellValue<'a> {
    fn from(value: Option<&'a str>) -> Self {
        match value {
            Some(s) => CellValue::Text(s),
            None => CellValue::Missing,
        }
    }
}

impl<'a> From<&'a str> for CellValue<'a> {
    fn from(value: &'a str) -> Self {
        CellValue::Text(value)
    }
}

impl From<f64> for CellValue<'_> {
    fn from(value: f64) -> Self {
        CellValue::Number(value)
    }
}

/// Convert a cell into an amount. Never fails.
pub fn normalize_amount<'a>(raw: impl Into<CellValue<'a>>) -> f64 {
    let text = match raw.into() {
        CellValue::Missing => return 0.0,
        CellValue::Number(n) if n.is_nan() => return 0.0,
        CellValue::Number(n) => return n,
        CellValue::Text(s) => s,
    };

    let cleaned = text.replace(['$', ','], "");
    let cleaned = cleaned.trim();

    if cleaned.is_empty() || cleaned == "-" || cleaned.eq_ignore_ascii_case("nan") {
        return 0.0;
    }

    let signed = match cleaned
        .strip_prefix('(')
        .and_then(|rest| rest.strip_suffix(')'))
    {
        Some(inner) => format!("-{inner}"),
        None => cleaned.to_string(),
    };

    match signed.parse::<f64>() {
        Ok(v) => v,
        Err(_) => {
            warn!("Could not convert value to float: {text:?}");
            0.0
        }
    }
}

/// Round to 2 decimal places, ties to even (`0.125` becomes `0.12`).
pub fn round_cents(value: f64) -> f64 {
    (value * 100.0).round_ties_even() / 100.0
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_currency_formatting() {
        assert_eq!(normalize_amount("$1,234.56"), 1234.56);
        assert_eq!(normalize_amount("  $ 12,000 "), 12000.0);
    }

    #[test]
    fn test_parenthesized_negative() {
        assert_eq!(normalize_amount("(500)"), -500.0);
        assert_eq!(normalize_amount("($1,250.50)"), -1250.5);
    }

    #[test]
    fn test_blank_and_dash_are_zero() {
        assert_eq!(normalize_amount(""), 0.0);
        assert_eq!(normalize_amount("   "), 0.0);
        assert_eq!(normalize_amount("-"), 0.0);
        assert_eq!(normalize_amount(None), 0.0);
        assert_eq!(normalize_amount("NaN"), 0.0);
    }

    #[test]
    fn test_numbers_pass_through() {
        assert_eq!(normalize_amount(42.5), 42.5);
        assert_eq!(normalize_amount(-3.0), -3.0);
        assert_eq!(normalize_amount(f64::NAN), 0.0);
        assert_eq!(normalize_amount("-30"), -30.0);
    }

    #[test]
    fn test_garbage_degrades_to_zero() {
        assert_eq!(normalize_amount("n/a"), 0.0);
        assert_eq!(normalize_amount("12abc"), 0.0);
        assert_eq!(normalize_amount("(oops)"), 0.0);
    }

    #[test]
    fn test_round_cents() {
        assert_eq!(round_cents(1234.5678), 1234.57);
        assert_eq!(round_cents(-0.004), 0.0);
        assert_eq!(round_cents(300.0), 300.0);
    }

    #[test]
    fn test_round_cents_ties_to_even() {
        assert_eq!(round_cents(0.125), 0.12);
        assert_eq!(round_cents(0.375), 0.38);
        assert_eq!(round_cents(-0.125), -0.12);
        assert_eq!(round_cents(1.5), 1.5);
    }
}
