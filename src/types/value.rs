//! Typed coercions for loosely typed telemetry cells
//!
//! Provider archives store telemetry as YAML/JSON scalars. The same column can arrive as a
//! bool in one file and as an integer code in another, so every attribute is read through
//! one of these functions, each with a documented default for unrecognized input.

use serde_yaml_ng::Value;

/// Numeric view of a cell. Numbers only; strings and bools are not numbers.
pub fn as_number(value: &Value) -> Option<f64> {
    match value {
        Value::Number(n) => n.as_f64(),
        Value::Tagged(tagged) => as_number(&tagged.value),
        _ => None,
    }
}

/// Float attribute (speed, distance, position). Defaults to `0.0`.
pub fn coerce_f64(value: Option<&Value>) -> f64 {
    value.and_then(as_number).filter(|v| v.is_finite()).unwrap_or(0.0)
}

/// Integer attribute (throttle, gear, rpm). Defaults to `0`.
///
/// Numbers are truncated toward zero, bools map to 0/1 and numeric strings are parsed.
pub fn coerce_i64(value: Option<&Value>) -> i64 {
    let Some(value) = value else { return 0 };
    match value {
        Value::Bool(b) => i64::from(*b),
        Value::String(s) => s.trim().parse::<f64>().ok().map(truncate).unwrap_or(0),
        other => as_number(other).map(truncate).unwrap_or(0),
    }
}

/// Brake flag as a 0/1 integer.
///
/// Bools map directly; numbers map to 1 when non-zero. Anything else is 0.
pub fn coerce_brake(value: Option<&Value>) -> u8 {
    match value {
        Some(Value::Bool(b)) => u8::from(*b),
        Some(other) => match as_number(other) {
            Some(n) if n != 0.0 && !n.is_nan() => 1,
            _ => 0,
        },
        None => 0,
    }
}

/// Drag reduction system flag.
///
/// Numeric codes are active only when positive (the archive uses codes such as 0, 1, 8,
/// 10, 12, 14). Non-numeric values fall back to their truthiness.
pub fn coerce_drs(value: Option<&Value>) -> bool {
    let Some(value) = value else { return false };
    if let Some(n) = as_number(value) {
        return n > 0.0;
    }
    match value {
        Value::Null => false,
        Value::Bool(b) => *b,
        Value::String(s) => !s.is_empty(),
        Value::Sequence(seq) => !seq.is_empty(),
        Value::Mapping(map) => !map.is_empty(),
        Value::Number(_) | Value::Tagged(_) => false,
    }
}

/// Lap-relative timestamp in seconds.
///
/// Accepts plain numbers and duration strings (`0 days 00:01:23.456`, `01:23.456`,
/// `83.456`). Returns `None` for anything else.
pub fn parse_seconds(value: &Value) -> Option<f64> {
    let seconds = match value {
        Value::String(s) => parse_duration_str(s),
        other => as_number(other),
    }?;
    seconds.is_finite().then_some(seconds)
}

fn parse_duration_str(raw: &str) -> Option<f64> {
    let mut rest = raw.trim();
    let mut days = 0.0;
    if let Some((d, tail)) = rest.split_once("days").or_else(|| rest.split_once("day")) {
        days = d.trim().parse::<f64>().ok()?;
        rest = tail.trim();
    }

    let (negative, rest) = match rest.strip_prefix('-') {
        Some(tail) => (true, tail),
        None => (false, rest),
    };

    let mut total = 0.0;
    for part in rest.split(':') {
        let component = part.trim().parse::<f64>().ok()?;
        total = total * 60.0 + component;
    }
    if rest.split(':').count() > 3 {
        return None;
    }

    let total = days * 86_400.0 + total;
    Some(if negative { -total } else { total })
}

fn truncate(v: f64) -> i64 {
    if v.is_finite() { v.trunc() as i64 } else { 0 }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn yaml(src: &str) -> Value {
        serde_yaml_ng::from_str(src).unwrap()
    }

    #[test]
    fn drs_codes() {
        assert!(!coerce_drs(Some(&yaml("0"))));
        assert!(!coerce_drs(Some(&yaml("-1"))));
        assert!(coerce_drs(Some(&yaml("8"))));
        assert!(coerce_drs(Some(&yaml("12.0"))));
        assert!(coerce_drs(Some(&yaml("true"))));
        assert!(!coerce_drs(Some(&yaml("false"))));
        assert!(coerce_drs(Some(&yaml("'open'"))));
        assert!(!coerce_drs(Some(&yaml("''"))));
        assert!(!coerce_drs(Some(&Value::Null)));
        assert!(!coerce_drs(None));
    }

    #[test]
    fn brake_coercion() {
        assert_eq!(coerce_brake(Some(&yaml("true"))), 1);
        assert_eq!(coerce_brake(Some(&yaml("false"))), 0);
        assert_eq!(coerce_brake(Some(&yaml("1"))), 1);
        assert_eq!(coerce_brake(Some(&yaml("0.0"))), 0);
        assert_eq!(coerce_brake(Some(&yaml("'pressed'"))), 0);
        assert_eq!(coerce_brake(None), 0);
    }

    #[test]
    fn integer_coercion() {
        assert_eq!(coerce_i64(Some(&yaml("99.7"))), 99);
        assert_eq!(coerce_i64(Some(&yaml("'7'"))), 7);
        assert_eq!(coerce_i64(Some(&yaml("true"))), 1);
        assert_eq!(coerce_i64(Some(&yaml("'n/a'"))), 0);
        assert_eq!(coerce_i64(Some(&yaml("[1, 2]"))), 0);
        assert_eq!(coerce_i64(None), 0);
    }

    #[test]
    fn float_coercion() {
        assert_eq!(coerce_f64(Some(&yaml("312.5"))), 312.5);
        assert_eq!(coerce_f64(Some(&yaml("12"))), 12.0);
        assert_eq!(coerce_f64(Some(&yaml("'fast'"))), 0.0);
        assert_eq!(coerce_f64(Some(&yaml(".nan"))), 0.0);
        assert_eq!(coerce_f64(None), 0.0);
    }

    #[test]
    fn duration_strings() {
        assert_eq!(parse_seconds(&yaml("1.5")), Some(1.5));
        assert_eq!(parse_seconds(&yaml("'83.25'")), Some(83.25));
        assert_eq!(parse_seconds(&yaml("'01:23.250'")), Some(83.25));
        assert_eq!(parse_seconds(&yaml("'00:01:23.250'")), Some(83.25));
        assert_eq!(parse_seconds(&yaml("'0 days 00:01:23.250000'")), Some(83.25));
        assert_eq!(parse_seconds(&yaml("'1 day 00:00:01'")), Some(86_401.0));
        assert_eq!(parse_seconds(&yaml("'soon'")), None);
        assert_eq!(parse_seconds(&Value::Null), None);
    }
}
