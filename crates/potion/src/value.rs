//! Value coercion helpers shared by the engine and the default filters.

use serde_json::Value;

/// Formats a value for splicing into rendered output.
///
/// Strings are used verbatim, null is empty, sequences are comma-joined
/// element-wise, mappings fall back to their JSON form.
pub(crate) fn format_value(value: &Value) -> String {
    match value {
        Value::String(s) => s.clone(),
        Value::Number(n) => match n.as_f64() {
            Some(f)
                if n.is_f64()
                    && f.is_finite()
                    && f.fract() == 0.0
                    && (i64::MIN as f64..=i64::MAX as f64).contains(&f) =>
            {
                (f as i64).to_string()
            }
            _ => n.to_string(),
        },
        Value::Bool(b) => b.to_string(),
        Value::Null => String::new(),
        Value::Array(items) => items
            .iter()
            .map(format_value)
            .collect::<Vec<_>>()
            .join(","),
        Value::Object(_) => value.to_string(),
    }
}

/// Numeric coercion: numbers directly, numeric strings via parsing.
pub(crate) fn to_number(value: &Value) -> Option<f64> {
    match value {
        Value::Number(n) => n.as_f64(),
        Value::String(s) => s.trim().parse().ok(),
        _ => None,
    }
}

/// Builds a number value, as an integer when the result is integral so that
/// arithmetic output renders without a trailing `.0`.
pub(crate) fn number_value(n: f64) -> Value {
    if n.is_finite() && n.fract() == 0.0 && (i64::MIN as f64..=i64::MAX as f64).contains(&n) {
        Value::Number((n as i64).into())
    } else {
        serde_json::Number::from_f64(n)
            .map(Value::Number)
            .unwrap_or(Value::Null)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_format_scalars() {
        assert_eq!(format_value(&json!("hi")), "hi");
        assert_eq!(format_value(&json!(42)), "42");
        assert_eq!(format_value(&json!(1.5)), "1.5");
        assert_eq!(format_value(&json!(50.0)), "50");
        assert_eq!(format_value(&json!(null)), "");
    }

    #[test]
    fn test_format_sequence_is_comma_joined() {
        assert_eq!(format_value(&json!(["a", "b", 3])), "a,b,3");
        assert_eq!(format_value(&json!([["a", "b"], "c"])), "a,b,c");
    }

    #[test]
    fn test_number_value_normalizes_integral() {
        assert_eq!(number_value(50.0), json!(50));
        assert_eq!(number_value(1.5), json!(1.5));
        assert_eq!(number_value(-3.0), json!(-3));
    }

    #[test]
    fn test_to_number_coerces_strings() {
        assert_eq!(to_number(&json!("2")), Some(2.0));
        assert_eq!(to_number(&json!(" 2.5 ")), Some(2.5));
        assert_eq!(to_number(&json!("x")), None);
        assert_eq!(to_number(&json!(true)), None);
    }
}
