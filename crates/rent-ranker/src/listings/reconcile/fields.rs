use serde_json::Value;

use super::IssueKind;

/// Interpretation of a loosely typed numeric field value.
#[derive(Debug, Clone, Copy, PartialEq)]
pub(crate) enum NumericInput {
    /// Null, an empty string, or whitespace.
    Unchanged,
    Value(f64),
    Unparseable,
}

pub(crate) fn parse_numeric(value: &Value) -> NumericInput {
    match value {
        Value::Null => NumericInput::Unchanged,
        Value::Number(number) => match number.as_f64() {
            Some(parsed) if parsed.is_finite() => NumericInput::Value(parsed),
            _ => NumericInput::Unparseable,
        },
        Value::String(raw) => parse_numeric_str(raw),
        _ => NumericInput::Unparseable,
    }
}

/// Accepts plain numbers as well as currency text such as `"$1,200.50"`.
pub(crate) fn parse_numeric_str(raw: &str) -> NumericInput {
    let cleaned: String = raw
        .chars()
        .filter(|c| !matches!(c, '$' | ',') && !c.is_whitespace())
        .collect();
    if cleaned.is_empty() {
        return NumericInput::Unchanged;
    }

    match cleaned.parse::<f64>() {
        Ok(parsed) if parsed.is_finite() => NumericInput::Value(parsed),
        _ => NumericInput::Unparseable,
    }
}

/// Resolve a numeric input to a non-negative value, or the issue that
/// prevents the field from being written. `Ok(None)` leaves the field as is.
pub(crate) fn non_negative(value: &Value) -> Result<Option<f64>, IssueKind> {
    match parse_numeric(value) {
        NumericInput::Unchanged => Ok(None),
        NumericInput::Unparseable => Err(IssueKind::Unparseable),
        NumericInput::Value(parsed) if parsed < 0.0 => Err(IssueKind::Negative),
        NumericInput::Value(parsed) => Ok(Some(parsed)),
    }
}

/// Like [`non_negative`] but truncates toward zero for integer fields.
pub(crate) fn non_negative_integer(value: &Value) -> Result<Option<u32>, IssueKind> {
    match non_negative(value)? {
        None => Ok(None),
        Some(parsed) => {
            let truncated = parsed.trunc();
            if truncated > f64::from(u32::MAX) {
                Err(IssueKind::Unparseable)
            } else {
                Ok(Some(truncated as u32))
            }
        }
    }
}

pub(crate) fn boolean(value: &Value) -> Result<bool, IssueKind> {
    match value {
        Value::Bool(flag) => Ok(*flag),
        Value::String(raw) if raw.trim().eq_ignore_ascii_case("true") => Ok(true),
        Value::String(raw) if raw.trim().eq_ignore_ascii_case("false") => Ok(false),
        _ => Err(IssueKind::WrongType),
    }
}

/// Optional text: a string replaces, `null` or blank clears.
pub(crate) fn optional_text(value: &Value) -> Result<Option<String>, IssueKind> {
    match value {
        Value::Null => Ok(None),
        Value::String(raw) => {
            let trimmed = raw.trim();
            Ok((!trimmed.is_empty()).then(|| trimmed.to_string()))
        }
        _ => Err(IssueKind::WrongType),
    }
}
