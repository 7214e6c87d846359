//! Total conversions from raw JSON values into the indicator's semantic types.
//!
//! Every coercer accepts `Option<&Value>` (`None` meaning "field absent") and
//! never fails: a value that cannot be converted yields the sentinel for its
//! target type (`""` or `None`), and extraction carries on with the other
//! fields.

use chrono::{DateTime, NaiveDate, NaiveDateTime, SecondsFormat, Utc};
use serde_json::{Number, Value};

/// Largest absolute epoch offset, in milliseconds, a timestamp may carry
/// (±100 000 000 days around 1970-01-01).
const MAX_EPOCH_MILLIS: f64 = 8.64e15;

/// Numeric strings shorter than this are never read as epoch timestamps.
const MIN_EPOCH_STRING_LEN: usize = 10;

const AFFIRMATIVE: [&str; 7] = ["true", "yes", "on", "1", "ok", "sent", "success"];
const NEGATIVE: [&str; 6] = ["false", "no", "off", "0", "error", "failed"];

const NAIVE_DATE_TIME_FORMATS: [&str; 6] = [
    "%Y-%m-%dT%H:%M:%S%.f",
    "%Y-%m-%dT%H:%M",
    "%Y-%m-%d %H:%M:%S%.f",
    "%Y-%m-%d %H:%M",
    "%Y/%m/%d %H:%M:%S%.f",
    "%Y/%m/%d %H:%M",
];

const NAIVE_DATE_FORMATS: [&str; 2] = ["%Y-%m-%d", "%Y/%m/%d"];

/// Coerces a value into a trimmed string.
///
/// Strings are trimmed, finite numbers are rendered in their shortest
/// decimal form, booleans become `"true"`/`"false"`. Everything else
/// (absent, `null`, arrays, objects) yields `""`.
#[must_use]
pub fn coerce_string(value: Option<&Value>) -> String {
    match value {
        Some(Value::String(s)) => s.trim().to_string(),
        Some(Value::Number(n)) => format_number(n).unwrap_or_default(),
        Some(Value::Bool(b)) => b.to_string(),
        _ => String::new(),
    }
}

/// Coerces a value into a finite `f64`.
///
/// Numbers pass through. Strings are reduced to digits, `.`, `,` and `-`,
/// then commas are resolved:
///
/// - with a `.` present, commas are thousands separators and are dropped
///   (`"1,234.56"` → `1234.56`);
/// - with several commas and no `.`, commas are thousands separators
///   (`"1,234,567"` → `1234567`);
/// - with a single comma and no `.`, the comma is the decimal point
///   (`"0,52"` → `0.52`, `"1 234,56"` → `1234.56`).
///
/// The longest leading float literal is then parsed, so trailing garbage is
/// ignored (`"12.5.1"` → `12.5`).
#[must_use]
pub fn coerce_number(value: Option<&Value>) -> Option<f64> {
    match value? {
        Value::Number(n) => n.as_f64().filter(|f| f.is_finite()),
        Value::String(s) => {
            let kept: String = s
                .chars()
                .filter(|c| c.is_ascii_digit() || matches!(c, '.' | ',' | '-'))
                .collect();
            let commas = kept.matches(',').count();
            let resolved = if kept.contains('.') || commas > 1 {
                kept.replace(',', "")
            } else {
                kept.replacen(',', ".", 1)
            };
            parse_float_prefix(&resolved)
        }
        _ => None,
    }
}

/// Coerces a value into a boolean.
///
/// Booleans pass through, numbers are `true` iff non-zero, strings are
/// matched case-insensitively against the affirmative and negative word
/// sets. Anything else yields `None`.
#[must_use]
pub fn coerce_boolean(value: Option<&Value>) -> Option<bool> {
    match value? {
        Value::Bool(b) => Some(*b),
        Value::Number(n) => n.as_f64().map(|f| f != 0.0),
        Value::String(s) => boolean_from_str(s),
        _ => None,
    }
}

/// Interprets a free-form flag such as `"Sent"` or `"off"`.
#[must_use]
pub fn boolean_from_str(raw: &str) -> Option<bool> {
    let lowered = raw.trim().to_ascii_lowercase();
    if AFFIRMATIVE.contains(&lowered.as_str()) {
        Some(true)
    } else if NEGATIVE.contains(&lowered.as_str()) {
        Some(false)
    } else {
        None
    }
}

/// Reads the leading integer of `raw` and keeps it only if it is positive.
///
/// `"25"`, `" 25 "` and `"25abc"` all yield 25; `"0"`, `"-4"` and `"abc"`
/// yield `None`.
#[must_use]
pub fn parse_positive_int(raw: &str) -> Option<usize> {
    let trimmed = raw.trim_start();
    let unsigned = trimmed.strip_prefix('+').unwrap_or(trimmed);
    let digits_end = unsigned
        .find(|c: char| !c.is_ascii_digit())
        .unwrap_or(unsigned.len());
    let digits = unsigned.get(..digits_end)?;
    if digits.is_empty() {
        return None;
    }
    // Overlong digit runs saturate rather than fail.
    let parsed = digits.parse::<usize>().unwrap_or(usize::MAX);
    (parsed > 0).then_some(parsed)
}

/// Coerces a value into an ISO-8601 UTC timestamp with millisecond precision.
///
/// Numbers are epoch milliseconds. Strings are read as epoch milliseconds
/// when they are purely numeric and at least ten characters long, otherwise
/// as a calendar date. A non-empty string that parses as neither is returned
/// trimmed but otherwise unchanged. Absent, `null`, `false`, `0` and blank
/// strings yield `None`.
#[must_use]
pub fn coerce_date_string(value: Option<&Value>) -> Option<String> {
    match value? {
        Value::Number(n) => {
            let millis = n.as_f64()?;
            if millis == 0.0 {
                return None;
            }
            timestamp_from_millis(millis)
        }
        Value::String(s) => {
            let trimmed = s.trim();
            if trimmed.is_empty() {
                return None;
            }
            if let Some(iso) = numeric_epoch(trimmed) {
                return Some(iso);
            }
            if let Some(parsed) = parse_date_text(trimmed) {
                return Some(format_timestamp(&parsed));
            }
            Some(trimmed.to_string())
        }
        _ => None,
    }
}

/// Renders a timestamp as `YYYY-MM-DDTHH:MM:SS.mmmZ`.
#[must_use]
pub fn format_timestamp(timestamp: &DateTime<Utc>) -> String {
    timestamp.to_rfc3339_opts(SecondsFormat::Millis, true)
}

fn format_number(number: &Number) -> Option<String> {
    if let Some(i) = number.as_i64() {
        return Some(i.to_string());
    }
    if let Some(u) = number.as_u64() {
        return Some(u.to_string());
    }
    number.as_f64().and_then(format_float)
}

fn format_float(f: f64) -> Option<String> {
    if !f.is_finite() {
        return None;
    }
    if f == 0.0 {
        return Some("0".to_string());
    }
    if f.fract() == 0.0 && f.abs() < 1e21 {
        return Some(format!("{f:.0}"));
    }
    Some(f.to_string())
}

fn parse_float_prefix(text: &str) -> Option<f64> {
    let bytes = text.as_bytes();
    let negative = bytes.first() == Some(&b'-');
    let mut cursor = usize::from(negative);

    let int_start = cursor;
    while bytes.get(cursor).is_some_and(u8::is_ascii_digit) {
        cursor += 1;
    }
    let int_digits = text.get(int_start..cursor)?;

    let mut frac_digits = "";
    if bytes.get(cursor) == Some(&b'.') {
        let frac_start = cursor + 1;
        let mut frac_end = frac_start;
        while bytes.get(frac_end).is_some_and(u8::is_ascii_digit) {
            frac_end += 1;
        }
        frac_digits = text.get(frac_start..frac_end)?;
    }

    if int_digits.is_empty() && frac_digits.is_empty() {
        return None;
    }

    let mut literal = String::with_capacity(int_digits.len() + frac_digits.len() + 3);
    if negative {
        literal.push('-');
    }
    literal.push_str(if int_digits.is_empty() { "0" } else { int_digits });
    if !frac_digits.is_empty() {
        literal.push('.');
        literal.push_str(frac_digits);
    }

    literal.parse::<f64>().ok().filter(|f| f.is_finite())
}

fn timestamp_from_millis(millis: f64) -> Option<String> {
    if !millis.is_finite() || millis.abs() > MAX_EPOCH_MILLIS {
        return None;
    }
    #[allow(clippy::cast_possible_truncation)]
    let whole = millis.trunc() as i64;
    DateTime::from_timestamp_millis(whole).map(|dt| format_timestamp(&dt))
}

fn numeric_epoch(trimmed: &str) -> Option<String> {
    let numeric = trimmed.parse::<f64>().ok().filter(|f| f.is_finite())?;
    let rendered = format_float(numeric)?;
    if rendered.len() < MIN_EPOCH_STRING_LEN {
        return None;
    }
    timestamp_from_millis(numeric)
}

fn parse_date_text(text: &str) -> Option<DateTime<Utc>> {
    if let Ok(parsed) = DateTime::parse_from_rfc3339(text) {
        return Some(parsed.with_timezone(&Utc));
    }
    if let Ok(parsed) = DateTime::parse_from_rfc2822(text) {
        return Some(parsed.with_timezone(&Utc));
    }
    if let Ok(parsed) = DateTime::parse_from_str(text, "%Y-%m-%d %H:%M:%S%.f %z") {
        return Some(parsed.with_timezone(&Utc));
    }
    for format in NAIVE_DATE_TIME_FORMATS {
        if let Ok(parsed) = NaiveDateTime::parse_from_str(text, format) {
            return Some(parsed.and_utc());
        }
    }
    for format in NAIVE_DATE_FORMATS {
        if let Ok(parsed) = NaiveDate::parse_from_str(text, format) {
            return parsed.and_hms_opt(0, 0, 0).map(|dt| dt.and_utc());
        }
    }
    None
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn string_of(value: Value) -> String {
        coerce_string(Some(&value))
    }

    fn number_of(value: Value) -> Option<f64> {
        coerce_number(Some(&value))
    }

    fn date_of(value: Value) -> Option<String> {
        coerce_date_string(Some(&value))
    }

    #[test]
    fn strings_are_trimmed_and_scalars_rendered() {
        assert_eq!(string_of(json!("  BTCUSD ")), "BTCUSD");
        assert_eq!(string_of(json!(68500)), "68500");
        assert_eq!(string_of(json!(68500.0)), "68500");
        assert_eq!(string_of(json!(0.41)), "0.41");
        assert_eq!(string_of(json!(-3)), "-3");
        assert_eq!(string_of(json!(true)), "true");
        assert_eq!(string_of(json!(false)), "false");
    }

    #[test]
    fn non_scalars_become_empty_strings() {
        assert_eq!(coerce_string(None), "");
        assert_eq!(string_of(Value::Null), "");
        assert_eq!(string_of(json!(["BTC"])), "");
        assert_eq!(string_of(json!({"ticker": "BTC"})), "");
    }

    #[test]
    fn numbers_pass_through() {
        assert_eq!(number_of(json!(68500)), Some(68500.0));
        assert_eq!(number_of(json!(-0.25)), Some(-0.25));
    }

    #[test]
    fn numeric_strings_are_cleaned_before_parsing() {
        assert_eq!(number_of(json!("68500")), Some(68500.0));
        assert_eq!(number_of(json!("0,52")), Some(0.52));
        assert_eq!(number_of(json!("1 234,56")), Some(1234.56));
        assert_eq!(number_of(json!("$2,520.45")), Some(2520.45));
        assert_eq!(number_of(json!("MVRVZ: -0.8")), Some(-0.8));
        assert_eq!(number_of(json!(".5")), Some(0.5));
        assert_eq!(number_of(json!("7.")), Some(7.0));
    }

    #[test]
    fn comma_and_dot_together_treat_comma_as_thousands_separator() {
        assert_eq!(number_of(json!("1,234.56")), Some(1234.56));
        assert_eq!(number_of(json!("1,234,567")), Some(1_234_567.0));
    }

    #[test]
    fn parsing_stops_at_the_first_invalid_character() {
        assert_eq!(number_of(json!("12.5.1")), Some(12.5));
        assert_eq!(number_of(json!("2024-01-05")), Some(2024.0));
    }

    #[test]
    fn unparsable_numbers_yield_none() {
        assert_eq!(coerce_number(None), None);
        assert_eq!(number_of(Value::Null), None);
        assert_eq!(number_of(json!("")), None);
        assert_eq!(number_of(json!("n/a")), None);
        assert_eq!(number_of(json!("-")), None);
        assert_eq!(number_of(json!("--5")), None);
        assert_eq!(number_of(json!(".")), None);
        assert_eq!(number_of(json!(true)), None);
        assert_eq!(number_of(json!([1])), None);
    }

    #[test]
    fn booleans_follow_word_sets() {
        assert_eq!(coerce_boolean(Some(&json!("Sent"))), Some(true));
        assert_eq!(coerce_boolean(Some(&json!("SUCCESS"))), Some(true));
        assert_eq!(coerce_boolean(Some(&json!(" on "))), Some(true));
        assert_eq!(coerce_boolean(Some(&json!("Failed"))), Some(false));
        assert_eq!(coerce_boolean(Some(&json!("0"))), Some(false));
        assert_eq!(coerce_boolean(Some(&json!(""))), None);
        assert_eq!(coerce_boolean(Some(&json!("maybe"))), None);
    }

    #[test]
    fn booleans_from_numbers_and_bools() {
        assert_eq!(coerce_boolean(Some(&json!(true))), Some(true));
        assert_eq!(coerce_boolean(Some(&json!(2))), Some(true));
        assert_eq!(coerce_boolean(Some(&json!(0))), Some(false));
        assert_eq!(coerce_boolean(Some(&json!(0.0))), Some(false));
        assert_eq!(coerce_boolean(Some(&Value::Null)), None);
        assert_eq!(coerce_boolean(None), None);
    }

    #[test]
    fn positive_ints_take_the_leading_digits() {
        assert_eq!(parse_positive_int("25"), Some(25));
        assert_eq!(parse_positive_int(" 25 "), Some(25));
        assert_eq!(parse_positive_int("25abc"), Some(25));
        assert_eq!(parse_positive_int("+7"), Some(7));
        assert_eq!(parse_positive_int("0"), None);
        assert_eq!(parse_positive_int("-4"), None);
        assert_eq!(parse_positive_int("abc"), None);
        assert_eq!(parse_positive_int(""), None);
    }

    #[test]
    fn epoch_millis_become_iso_strings() {
        assert_eq!(
            date_of(json!(1_700_000_000_000_i64)),
            Some("2023-11-14T22:13:20.000Z".to_string())
        );
        assert_eq!(
            date_of(json!("1700000000000")),
            Some("2023-11-14T22:13:20.000Z".to_string())
        );
    }

    #[test]
    fn short_numeric_strings_are_not_epochs() {
        // Too short for the epoch branch, and not a date either.
        assert_eq!(date_of(json!("12345")), Some("12345".to_string()));
    }

    #[test]
    fn calendar_strings_are_normalized() {
        assert_eq!(
            date_of(json!("2024-01-05T10:00:00+02:00")),
            Some("2024-01-05T08:00:00.000Z".to_string())
        );
        assert_eq!(
            date_of(json!("2024-01-05 10:00:00")),
            Some("2024-01-05T10:00:00.000Z".to_string())
        );
        assert_eq!(
            date_of(json!("2024-01-05")),
            Some("2024-01-05T00:00:00.000Z".to_string())
        );
        assert_eq!(
            date_of(json!("Fri, 05 Jan 2024 10:00:00 +0000")),
            Some("2024-01-05T10:00:00.000Z".to_string())
        );
    }

    #[test]
    fn unparsable_dates_are_kept_verbatim() {
        assert_eq!(date_of(json!("  last tuesday ")), Some("last tuesday".to_string()));
    }

    #[test]
    fn falsy_dates_yield_none() {
        assert_eq!(coerce_date_string(None), None);
        assert_eq!(date_of(Value::Null), None);
        assert_eq!(date_of(json!("   ")), None);
        assert_eq!(date_of(json!(0)), None);
        assert_eq!(date_of(json!(false)), None);
        assert_eq!(date_of(json!({"at": 1})), None);
    }

    #[test]
    fn out_of_range_epochs_yield_none() {
        assert_eq!(date_of(json!(1e17)), None);
    }
}
