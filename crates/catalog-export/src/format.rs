//! Display formatting for numerical values.

use catalog_model::{FormatKind, FormatOptions, Variable};

/// Fraction digits kept by pretty number formatting.
const PRETTY_FRACTION_DIGITS: u32 = 3;

/// Precision applied after scaling to percent, to drop float noise such as
/// `54.50000000000001`.
const PERCENT_PRECISION: u32 = 6;

const THOUSANDS_SEPARATOR: char = ',';

/// Formats values according to their variable's display format.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct DataFormatter;

impl DataFormatter {
    pub fn new() -> Self {
        Self::default()
    }

    /// Formats `value` with the variable's format.
    ///
    /// Missing and NaN values format as the empty string; variables without
    /// a format get the plain number.
    pub fn format(&self, variable: &Variable, value: Option<f64>) -> String {
        let Some(value) = value.filter(|v| !v.is_nan()) else {
            return String::new();
        };
        match &variable.format {
            None => value.to_string(),
            Some(format) => match format.kind {
                FormatKind::Number => self.number(value, &format.options),
                FormatKind::Percent => self.percent(value, &format.options),
            },
        }
    }

    /// `round` limits decimal places; `pretty` groups thousands and keeps at
    /// most three decimals.
    pub fn number(&self, value: f64, options: &FormatOptions) -> String {
        if value.is_nan() {
            return String::new();
        }
        let mut value = value;
        if let Some(places) = options.round {
            value = round_to(value, places);
        }
        if options.pretty {
            return group_thousands(round_to(value, PRETTY_FRACTION_DIGITS), THOUSANDS_SEPARATOR);
        }
        value.to_string()
    }

    /// Scales by 100 and appends `%`; `round` limits decimal places.
    pub fn percent(&self, value: f64, options: &FormatOptions) -> String {
        if value.is_nan() {
            return String::new();
        }
        let mut scaled = round_to(value * 100.0, PERCENT_PRECISION);
        if let Some(places) = options.round {
            scaled = round_to(scaled, places);
        }
        format!("{scaled}%")
    }
}

/// Rounds to `places` decimals via decimal formatting.
fn round_to(value: f64, places: u32) -> f64 {
    if !value.is_finite() {
        return value;
    }
    format!("{value:.prec$}", prec = places as usize)
        .parse()
        .unwrap_or(value)
}

fn group_thousands(value: f64, separator: char) -> String {
    let text = value.to_string();
    let (sign, unsigned) = match text.strip_prefix('-') {
        Some(rest) => ("-", rest),
        None => ("", text.as_str()),
    };
    let (integer, fraction) = match unsigned.split_once('.') {
        Some((integer, fraction)) => (integer, Some(fraction)),
        None => (unsigned, None),
    };

    let mut grouped = String::with_capacity(text.len() + integer.len() / 3);
    grouped.push_str(sign);
    for (i, digit) in integer.chars().enumerate() {
        if i > 0 && (integer.len() - i) % 3 == 0 {
            grouped.push(separator);
        }
        grouped.push(digit);
    }
    if let Some(fraction) = fraction {
        grouped.push('.');
        grouped.push_str(fraction);
    }
    grouped
}
