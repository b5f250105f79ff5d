// src/process/normalize.rs

use chrono::{Datelike, NaiveDate};

use crate::error::MalformedValueError;

/// Trim whitespace + strip outer quotes if present.
pub fn clean_str(raw: &str) -> &str {
    let trimmed = raw.trim();
    if trimmed.len() >= 2 && trimmed.starts_with('"') && trimmed.ends_with('"') {
        trimmed[1..trimmed.len() - 1].trim()
    } else {
        trimmed
    }
}

/// Parse a number that may carry thousands separators, e.g. `"1,234,567"`.
pub fn normalize_numeric(text: &str) -> Result<f64, MalformedValueError> {
    let digits: String = clean_str(text).chars().filter(|c| *c != ',').collect();
    if digits.is_empty() {
        return Err(MalformedValueError::new(text, "empty numeric field"));
    }
    let value: f64 = digits
        .parse()
        .map_err(|_| MalformedValueError::new(text, "not a number"))?;
    // "nan"/"inf" parse as f64 but are not quantities
    if !value.is_finite() {
        return Err(MalformedValueError::new(text, "not a finite number"));
    }
    Ok(value)
}

/// Parse a date against exactly one `strftime` pattern. No fallbacks.
///
/// chrono's `%Y` takes any digit count, so a pattern with `%Y` only accepts
/// input carrying the full four-digit year; `"01/01/15"` is not year 15.
pub fn normalize_date(text: &str, pattern: &str) -> Result<NaiveDate, MalformedValueError> {
    let cleaned = clean_str(text);
    let date = NaiveDate::parse_from_str(cleaned, pattern).map_err(|e| {
        MalformedValueError::new(text, format!("does not match `{}`: {}", pattern, e))
    })?;
    if pattern.contains("%Y") {
        let year = date.year();
        if !(1000..=9999).contains(&year) || !cleaned.contains(&year.to_string()) {
            return Err(MalformedValueError::new(
                text,
                format!("does not match `{}`: year is not four digits", pattern),
            ));
        }
    }
    Ok(date)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn numeric_strips_grouping_separators() {
        assert_eq!(normalize_numeric("1,234,567").unwrap(), 1234567.0);
        assert_eq!(normalize_numeric(" 2,000 ").unwrap(), 2000.0);
        assert_eq!(normalize_numeric("\"10\"").unwrap(), 10.0);
        assert_eq!(normalize_numeric("-1,250.5").unwrap(), -1250.5);
    }

    #[test]
    fn numeric_rejects_garbage() {
        let err = normalize_numeric("abc").unwrap_err();
        assert_eq!(err.value, "abc");
        assert!(normalize_numeric("").is_err());
        assert!(normalize_numeric(" , ").is_err());
        assert!(normalize_numeric("12a").is_err());
        assert!(normalize_numeric("NaN").is_err());
    }

    #[test]
    fn date_uses_the_given_pattern_only() {
        assert_eq!(
            normalize_date("03/15/1998", "%m/%d/%Y").unwrap(),
            NaiveDate::from_ymd_opt(1998, 3, 15).unwrap()
        );
        assert!(normalize_date("1998-03-15", "%m/%d/%Y").is_err());
        assert!(normalize_date("02/30/1998", "%m/%d/%Y").is_err());
        assert!(normalize_date("", "%m/%d/%Y").is_err());
    }

    #[test]
    fn date_year_must_have_four_digits() {
        let err = normalize_date("01/01/15", "%m/%d/%Y").unwrap_err();
        assert_eq!(err.value, "01/01/15");
        assert!(normalize_date("01/01/015", "%m/%d/%Y").is_err());
        assert!(normalize_date("01/01/0999", "%m/%d/%Y").is_err());
        assert_eq!(
            normalize_date("1/5/2015", "%m/%d/%Y").unwrap(),
            NaiveDate::from_ymd_opt(2015, 1, 5).unwrap()
        );
    }
}
