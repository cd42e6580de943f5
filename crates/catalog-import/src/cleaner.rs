//! Numeric cleaning for numerical variables.
//!
//! Source files carry numbers formatted for people: `$1,200`, `45%`,
//! ` 3.5 `. Cleaning strips currency signs, thousands separators and percent
//! signs, then surrounding whitespace, before parsing. Whitespace inside the
//! number is kept, so `1 000` is rejected. A trailing `%` does not rescale
//! the value: `45%` cleans to `45`.

use catalog_ingest::RawValue;

/// Characters removed before parsing.
const STRIPPED: [char; 3] = ['$', ',', '%'];

/// Cleans and parses a raw numeric string.
///
/// Returns the raw input back when it is not a finite number after
/// cleaning. `NaN` and infinities are failures.
pub fn clean_numerical(raw: &str) -> Result<f64, &str> {
    let stripped: String = raw.chars().filter(|c| !STRIPPED.contains(c)).collect();
    let cleaned = stripped.trim();

    if cleaned.is_empty() {
        return Err(raw);
    }

    match cleaned.parse::<f64>() {
        Ok(value) if value.is_finite() => Ok(value),
        _ => Err(raw),
    }
}

/// Converts a cell of a numerical column.
///
/// Null and blank cells are missing values. Typed numbers pass through
/// when finite.
pub fn numerical_value(value: &RawValue) -> Result<Option<f64>, String> {
    match value {
        RawValue::Null => Ok(None),
        RawValue::Number(number) if number.is_finite() => Ok(Some(*number)),
        RawValue::Number(number) => Err(number.to_string()),
        RawValue::Text(text) if text.trim().is_empty() => Ok(None),
        RawValue::Text(text) => clean_numerical(text)
            .map(Some)
            .map_err(str::to_string),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;

    #[test]
    fn strips_formatting() {
        assert_eq!(clean_numerical("45%"), Ok(45.0));
        assert_eq!(clean_numerical("$1,234.50"), Ok(1234.5));
        assert_eq!(clean_numerical("  -7 "), Ok(-7.0));
        assert_eq!(clean_numerical(" $ 1,200 "), Ok(1200.0));
        assert_eq!(clean_numerical("1e3"), Ok(1000.0));
    }

    #[test]
    fn rejects_non_numbers() {
        assert_eq!(clean_numerical("Non-number"), Err("Non-number"));
        assert_eq!(clean_numerical("$"), Err("$"));
        assert_eq!(clean_numerical("NaN"), Err("NaN"));
        assert_eq!(clean_numerical("inf"), Err("inf"));
        assert_eq!(clean_numerical("1 000"), Err("1 000"));
        assert_eq!(clean_numerical("- 7"), Err("- 7"));
    }

    #[test]
    fn cell_conversion() {
        assert_eq!(numerical_value(&RawValue::Null), Ok(None));
        assert_eq!(numerical_value(&RawValue::from("  ")), Ok(None));
        assert_eq!(numerical_value(&RawValue::from(2.5)), Ok(Some(2.5)));
        assert_eq!(numerical_value(&RawValue::from("12%")), Ok(Some(12.0)));
        assert_eq!(
            numerical_value(&RawValue::from(f64::NAN)),
            Err("NaN".to_string())
        );
        assert_eq!(
            numerical_value(&RawValue::from("abc")),
            Err("abc".to_string())
        );
    }

    proptest! {
        #[test]
        fn formatted_finite_numbers_clean_to_themselves(value in -1.0e12f64..1.0e12) {
            let formatted = format!("${value}%");
            prop_assert_eq!(clean_numerical(&formatted), Ok(value));
        }

        #[test]
        fn cleaned_values_are_always_finite(raw in ".{0,16}") {
            if let Ok(value) = clean_numerical(&raw) {
                prop_assert!(value.is_finite());
            }
        }
    }
}
