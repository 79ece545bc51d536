//! Display formatting helpers for phone numbers, money, areas and dates

use chrono::{DateTime, NaiveDate, NaiveDateTime};

/// Keep only ASCII digits
pub fn digits_only(raw: &str) -> String {
    raw.chars().filter(|c| c.is_ascii_digit()).collect()
}

/// Format a North American phone number
///
/// 10 digits become `(XXX) XXX-XXXX`, 11 digits with a leading `1` become
/// `+1 (XXX) XXX-XXXX`. Any other input is returned exactly as given; empty
/// input and the portal's `"0"` placeholder yield `None`.
///
/// # Examples
/// ```
/// use intake_common::format::format_phone;
///
/// assert_eq!(format_phone("555.123.4567").as_deref(), Some("(555) 123-4567"));
/// assert_eq!(format_phone("15551234567").as_deref(), Some("+1 (555) 123-4567"));
/// assert_eq!(format_phone("ext 12").as_deref(), Some("ext 12"));
/// assert_eq!(format_phone(""), None);
/// assert_eq!(format_phone("0"), None);
/// ```
pub fn format_phone(raw: &str) -> Option<String> {
    if raw.is_empty() || raw == "0" {
        return None;
    }

    let d = digits_only(raw);
    match d.len() {
        10 => Some(format!("({}) {}-{}", &d[0..3], &d[3..6], &d[6..])),
        11 if d.starts_with('1') => Some(format!("+1 ({}) {}-{}", &d[1..4], &d[4..7], &d[7..])),
        _ => Some(raw.to_string()),
    }
}

/// Format a number with `,` thousands separators and a fixed number of decimals
///
/// Rounds half away from zero. A value that rounds to zero never carries a
/// minus sign.
pub fn number_format(value: f64, decimals: u32) -> String {
    if !value.is_finite() {
        return number_format(0.0, decimals);
    }

    let factor = 10u128.pow(decimals);
    let scaled = (value.abs() * factor as f64).round() as u128;
    let whole = scaled / factor;
    let frac = scaled % factor;
    let negative = value < 0.0 && scaled != 0;

    let digits = whole.to_string();
    let mut grouped = String::with_capacity(digits.len() + digits.len() / 3 + 4);
    for (i, c) in digits.chars().enumerate() {
        if i > 0 && (digits.len() - i) % 3 == 0 {
            grouped.push(',');
        }
        grouped.push(c);
    }

    let mut out = String::new();
    if negative {
        out.push('-');
    }
    out.push_str(&grouped);
    if decimals > 0 {
        out.push('.');
        out.push_str(&format!("{:0width$}", frac, width = decimals as usize));
    }
    out
}

/// `$` followed by a two-decimal amount, e.g. `$1,234.50`
pub fn format_currency(value: f64) -> String {
    format!("${}", number_format(value, 2))
}

/// Parse a display currency string back to a number (`"$1,234.50"` → 1234.5)
pub fn parse_currency(display: &str) -> Option<f64> {
    let cleaned: String = display
        .chars()
        .filter(|c| *c != '$' && *c != ',' && !c.is_whitespace())
        .collect();
    cleaned.parse::<f64>().ok().filter(|f| f.is_finite())
}

// %y must come before %Y: %Y would read "24" as the year 0024
const DATE_FORMATS: &[&str] = &["%Y-%m-%d", "%m/%d/%y", "%m/%d/%Y", "%Y/%m/%d"];

const DATETIME_FORMATS: &[&str] = &[
    "%Y-%m-%d %H:%M:%S",
    "%Y-%m-%d %H:%M:%S%.f",
    "%Y-%m-%dT%H:%M:%S",
    "%Y-%m-%dT%H:%M:%S%.f",
    "%Y-%m-%d %H:%M",
    "%m/%d/%Y %H:%M:%S",
    "%m/%d/%Y %H:%M",
];

/// Parse the date portion of a legacy date or date-time string
///
/// Offsets in RFC 3339 input are kept as written; the calendar date is the
/// one printed in the string.
pub fn parse_legacy_date(raw: &str) -> Option<NaiveDate> {
    let s = raw.trim();
    if s.is_empty() {
        return None;
    }

    for fmt in DATE_FORMATS {
        if let Ok(date) = NaiveDate::parse_from_str(s, fmt) {
            return Some(date);
        }
    }
    for fmt in DATETIME_FORMATS {
        if let Ok(dt) = NaiveDateTime::parse_from_str(s, fmt) {
            return Some(dt.date());
        }
    }
    if let Ok(dt) = DateTime::parse_from_rfc3339(s) {
        return Some(dt.date_naive());
    }

    // "2024-03-05T10:00:00.000000Z" and similar: trust a leading ISO date
    s.get(..10)
        .filter(|_| s.len() > 10 && !s.as_bytes()[10].is_ascii_digit())
        .and_then(|prefix| NaiveDate::parse_from_str(prefix, "%Y-%m-%d").ok())
}

/// `MM/DD/YY`
pub fn display_date(date: NaiveDate) -> String {
    date.format("%m/%d/%y").to_string()
}

/// `YYYY-MM-DD`
pub fn iso_date(date: NaiveDate) -> String {
    date.format("%Y-%m-%d").to_string()
}
