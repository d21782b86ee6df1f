//! Default filter catalog.
//!
//! Every filter here is type-guarded: input of a non-matching kind passes
//! through unchanged ([`Filtered::Pass`]) rather than erroring, so pipelines
//! degrade gracefully over unexpected data. Numeric filters coerce string
//! arguments through numeric parsing, and integral results render without a
//! trailing `.0`.

use once_cell::sync::Lazy;
use regex::Regex;
use serde_json::Value;

use crate::error::RenderError;
use crate::value::{format_value, number_value, to_number};

use super::{FilterArgs, FilterRegistry, Filtered};

static HTML_TAG: Lazy<Regex> = Lazy::new(|| {
    Regex::new("<[^>]*>").expect("html tag pattern")
});

/// Registers the `token` path-lookup filter and the default catalog.
pub(crate) fn register_builtin_filters(registry: &FilterRegistry) -> Result<(), RenderError> {
    register_token_filter(registry)?;
    register_string_filters(registry)?;
    register_number_filters(registry)?;
    register_sequence_filters(registry)?;
    Ok(())
}

/// Default path-lookup behavior: the payload is a dot-separated key resolved
/// against the render data. Numeric segments index into sequences. A missing
/// segment is a [`RenderError::NotFound`], which the substitution engine
/// recovers from with an empty string.
fn register_token_filter(registry: &FilterRegistry) -> Result<(), RenderError> {
    registry.register("token", 0, |payload, args| {
        let key = match payload {
            Some(Value::String(key)) => key.clone(),
            Some(other) => return Ok(Filtered::Value(other.clone())),
            None => return Ok(Filtered::Pass),
        };
        let mut current = args.data;
        for part in key.split('.') {
            current = match current {
                Value::Object(map) => map.get(part),
                Value::Array(items) => part.parse::<usize>().ok().and_then(|i| items.get(i)),
                _ => None,
            }
            .ok_or_else(|| RenderError::NotFound {
                path: part.to_string(),
                token: key.clone(),
            })?;
        }
        Ok(Filtered::Value(current.clone()))
    })
}

fn arg_str(args: &FilterArgs, index: usize) -> Option<String> {
    args.args.get(index).map(|value| match value {
        Value::String(s) => s.clone(),
        other => format_value(other),
    })
}

fn arg_f64(args: &FilterArgs, index: usize) -> Option<f64> {
    args.args.get(index).and_then(to_number)
}

/// Registers a filter that rewrites string payloads and passes everything
/// else through.
fn register_string<F>(registry: &FilterRegistry, name: &str, op: F) -> Result<(), RenderError>
where
    F: Fn(&str, &FilterArgs) -> Value + Send + Sync + 'static,
{
    registry.register(name, 0, move |payload, args| {
        Ok(match payload {
            Some(Value::String(s)) => Filtered::Value(op(s, args)),
            _ => Filtered::Pass,
        })
    })
}

/// Registers a filter over number payloads. The op returning `None` makes
/// the stage a no-op (used by `divided_by` with a zero divisor and by the
/// argument-requiring filters when no argument was given).
fn register_number<F>(registry: &FilterRegistry, name: &str, op: F) -> Result<(), RenderError>
where
    F: Fn(f64, &FilterArgs) -> Option<f64> + Send + Sync + 'static,
{
    registry.register(name, 0, move |payload, args| {
        Ok(match payload {
            Some(Value::Number(n)) => match n.as_f64().and_then(|n| op(n, args)) {
                Some(result) => Filtered::Value(number_value(result)),
                None => Filtered::Pass,
            },
            _ => Filtered::Pass,
        })
    })
}

fn register_string_filters(registry: &FilterRegistry) -> Result<(), RenderError> {
    register_string(registry, "uppercase", |s, _| Value::String(s.to_uppercase()))?;
    register_string(registry, "lowercase", |s, _| Value::String(s.to_lowercase()))?;

    register_string(registry, "capitalize", |s, _| {
        let mut chars = s.chars();
        Value::String(match chars.next() {
            Some(first) => first.to_uppercase().chain(chars).collect(),
            None => String::new(),
        })
    })?;

    register_string(registry, "truncate", |s, args| {
        let length = arg_f64(args, 0).unwrap_or(50.0).max(0.0) as usize;
        let ellipsis = arg_str(args, 1).unwrap_or_default();
        if s.chars().count() > length {
            let truncated: String = s.chars().take(length).collect();
            Value::String(format!("{}{}", truncated, ellipsis))
        } else {
            Value::String(s.to_string())
        }
    })?;

    register_string(registry, "trim", |s, _| Value::String(s.trim().to_string()))?;
    register_string(registry, "lstrip", |s, _| {
        Value::String(s.trim_start().to_string())
    })?;
    register_string(registry, "rstrip", |s, _| {
        Value::String(s.trim_end().to_string())
    })?;

    register_string(registry, "append", |s, args| {
        Value::String(format!("{}{}", s, arg_str(args, 0).unwrap_or_default()))
    })?;
    register_string(registry, "prepend", |s, args| {
        Value::String(format!("{}{}", arg_str(args, 0).unwrap_or_default(), s))
    })?;

    // `default` applies to any payload kind: empty values are replaced by the
    // first argument, everything else passes through.
    registry.register("default", 0, |payload, args| {
        let fallback = args
            .args
            .first()
            .cloned()
            .unwrap_or_else(|| Value::String(String::new()));
        Ok(match payload {
            None | Some(Value::Null) => Filtered::Value(fallback),
            Some(Value::String(s)) if s.is_empty() => Filtered::Value(fallback),
            _ => Filtered::Pass,
        })
    })?;

    register_string(registry, "remove", |s, args| {
        let needle = arg_str(args, 0).unwrap_or_default();
        if needle.is_empty() {
            Value::String(s.to_string())
        } else {
            Value::String(s.replace(&needle, ""))
        }
    })?;
    register_string(registry, "remove_first", |s, args| {
        let needle = arg_str(args, 0).unwrap_or_default();
        if needle.is_empty() {
            Value::String(s.to_string())
        } else {
            Value::String(s.replacen(&needle, "", 1))
        }
    })?;
    register_string(registry, "replace", |s, args| {
        let from = arg_str(args, 0).unwrap_or_default();
        let to = arg_str(args, 1).unwrap_or_default();
        if from.is_empty() {
            Value::String(s.to_string())
        } else {
            Value::String(s.replace(&from, &to))
        }
    })?;
    register_string(registry, "replace_first", |s, args| {
        let from = arg_str(args, 0).unwrap_or_default();
        let to = arg_str(args, 1).unwrap_or_default();
        if from.is_empty() {
            Value::String(s.to_string())
        } else {
            Value::String(s.replacen(&from, &to, 1))
        }
    })?;

    register_string(registry, "split", |s, args| {
        let delimiter = arg_str(args, 0).unwrap_or_default();
        let parts: Vec<Value> = if delimiter.is_empty() {
            s.chars().map(|c| Value::String(c.to_string())).collect()
        } else {
            s.split(&delimiter)
                .map(|part| Value::String(part.to_string()))
                .collect()
        };
        Value::Array(parts)
    })?;

    register_string(registry, "strip_html", |s, _| {
        Value::String(HTML_TAG.replace_all(s, "").into_owned())
    })?;

    register_string(registry, "url_encode", |s, _| {
        Value::String(percent_encode(s))
    })?;
    register_string(registry, "url_decode", |s, _| {
        Value::String(percent_decode(s))
    })?;

    register_string(registry, "escape", |s, _| {
        Value::String(
            s.replace('&', "&amp;")
                .replace('<', "&lt;")
                .replace('>', "&gt;")
                .replace('"', "&quot;")
                .replace('\'', "&#39;"),
        )
    })?;

    Ok(())
}

fn register_number_filters(registry: &FilterRegistry) -> Result<(), RenderError> {
    register_number(registry, "abs", |n, _| Some(n.abs()))?;
    register_number(registry, "ceil", |n, _| Some(n.ceil()))?;
    register_number(registry, "floor", |n, _| Some(n.floor()))?;

    register_number(registry, "at_least", |n, args| {
        arg_f64(args, 0).map(|min| n.max(min))
    })?;
    register_number(registry, "at_most", |n, args| {
        arg_f64(args, 0).map(|max| n.min(max))
    })?;

    // No-op on a zero divisor: the value is spliced unchanged instead of
    // propagating infinity into the output.
    register_number(registry, "divided_by", |n, args| {
        match arg_f64(args, 0) {
            Some(divisor) if divisor != 0.0 => Some(n / divisor),
            _ => None,
        }
    })?;

    register_number(registry, "minus", |n, args| arg_f64(args, 0).map(|m| n - m))?;
    register_number(registry, "plus", |n, args| arg_f64(args, 0).map(|m| n + m))?;
    register_number(registry, "times", |n, args| arg_f64(args, 0).map(|m| n * m))?;
    register_number(registry, "modulo", |n, args| {
        match arg_f64(args, 0) {
            Some(divisor) if divisor != 0.0 => Some(n % divisor),
            _ => None,
        }
    })?;

    register_number(registry, "round", |n, args| {
        let precision = arg_f64(args, 0).unwrap_or(0.0).max(0.0) as i32;
        let factor = 10f64.powi(precision);
        Some((n * factor).round() / factor)
    })?;

    Ok(())
}

fn register_sequence_filters(registry: &FilterRegistry) -> Result<(), RenderError> {
    registry.register("compact", 0, |payload, _| {
        Ok(match payload {
            Some(Value::Array(items)) => Filtered::Value(Value::Array(
                items.iter().filter(|v| !v.is_null()).cloned().collect(),
            )),
            _ => Filtered::Pass,
        })
    })?;

    registry.register("first", 0, |payload, _| {
        Ok(match payload {
            Some(Value::Array(items)) => {
                Filtered::Value(items.first().cloned().unwrap_or(Value::Null))
            }
            Some(Value::String(s)) => Filtered::Value(Value::String(
                s.chars().next().map(String::from).unwrap_or_default(),
            )),
            _ => Filtered::Pass,
        })
    })?;

    registry.register("last", 0, |payload, _| {
        Ok(match payload {
            Some(Value::Array(items)) => {
                Filtered::Value(items.last().cloned().unwrap_or(Value::Null))
            }
            Some(Value::String(s)) => Filtered::Value(Value::String(
                s.chars().next_back().map(String::from).unwrap_or_default(),
            )),
            _ => Filtered::Pass,
        })
    })?;

    registry.register("join", 0, |payload, args| {
        Ok(match payload {
            Some(Value::Array(items)) => {
                let delimiter = arg_str(args, 0).unwrap_or_default();
                Filtered::Value(Value::String(
                    items
                        .iter()
                        .map(format_value)
                        .collect::<Vec<_>>()
                        .join(&delimiter),
                ))
            }
            _ => Filtered::Pass,
        })
    })?;

    registry.register("map", 0, |payload, args| {
        Ok(match payload {
            Some(Value::Array(items)) => {
                let property = arg_str(args, 0).unwrap_or_default();
                Filtered::Value(Value::Array(
                    items.iter().map(|item| pluck(item, &property)).collect(),
                ))
            }
            _ => Filtered::Pass,
        })
    })?;

    registry.register("reverse", 0, |payload, _| {
        Ok(match payload {
            Some(Value::Array(items)) => {
                Filtered::Value(Value::Array(items.iter().rev().cloned().collect()))
            }
            Some(Value::String(s)) => {
                Filtered::Value(Value::String(s.chars().rev().collect()))
            }
            _ => Filtered::Pass,
        })
    })?;

    registry.register("size", 0, |payload, _| {
        Ok(match payload {
            Some(Value::Array(items)) => Filtered::Value(number_value(items.len() as f64)),
            Some(Value::String(s)) => Filtered::Value(number_value(s.chars().count() as f64)),
            Some(Value::Object(map)) => Filtered::Value(number_value(map.len() as f64)),
            _ => Filtered::Pass,
        })
    })?;

    registry.register("slice", 0, |payload, args| {
        let start = arg_f64(args, 0).unwrap_or(0.0);
        let end = arg_f64(args, 1);
        Ok(match payload {
            Some(Value::Array(items)) => {
                let (from, to) = slice_bounds(items.len(), start, end);
                Filtered::Value(Value::Array(items[from..to].to_vec()))
            }
            Some(Value::String(s)) => {
                let chars: Vec<char> = s.chars().collect();
                let (from, to) = slice_bounds(chars.len(), start, end);
                Filtered::Value(Value::String(chars[from..to].iter().collect()))
            }
            _ => Filtered::Pass,
        })
    })?;

    registry.register("sort", 0, |payload, _| {
        Ok(match payload {
            Some(Value::Array(items)) => {
                let mut sorted = items.clone();
                if sorted.iter().all(|v| v.is_number()) {
                    sorted.sort_by(|a, b| {
                        let a = to_number(a).unwrap_or(0.0);
                        let b = to_number(b).unwrap_or(0.0);
                        a.partial_cmp(&b).unwrap_or(std::cmp::Ordering::Equal)
                    });
                } else {
                    sorted.sort_by_key(|v| format_value(v));
                }
                Filtered::Value(Value::Array(sorted))
            }
            _ => Filtered::Pass,
        })
    })?;

    registry.register("unique", 0, |payload, _| {
        Ok(match payload {
            Some(Value::Array(items)) => {
                let mut seen: Vec<Value> = Vec::with_capacity(items.len());
                for item in items {
                    if !seen.contains(item) {
                        seen.push(item.clone());
                    }
                }
                Filtered::Value(Value::Array(seen))
            }
            _ => Filtered::Pass,
        })
    })?;

    Ok(())
}

/// Property extraction for `map`. Mapping items yield the named property;
/// `length` yields the length of strings and sequences.
fn pluck(item: &Value, property: &str) -> Value {
    match item {
        Value::Object(map) => map.get(property).cloned().unwrap_or(Value::Null),
        Value::String(s) if property == "length" => number_value(s.chars().count() as f64),
        Value::Array(items) if property == "length" => number_value(items.len() as f64),
        _ => Value::Null,
    }
}

/// Slice bounds with negative-index support, clamped to `len`.
fn slice_bounds(len: usize, start: f64, end: Option<f64>) -> (usize, usize) {
    let clamp = |i: f64| -> usize {
        if i < 0.0 {
            (len as f64 + i).max(0.0) as usize
        } else {
            (i as usize).min(len)
        }
    };
    let from = clamp(start);
    let to = end.map(clamp).unwrap_or(len).max(from);
    (from, to)
}

/// Component percent-encoding over UTF-8 bytes (unreserved characters kept).
fn percent_encode(s: &str) -> String {
    let mut out = String::with_capacity(s.len());
    for byte in s.bytes() {
        match byte {
            b'A'..=b'Z'
            | b'a'..=b'z'
            | b'0'..=b'9'
            | b'-'
            | b'_'
            | b'.'
            | b'!'
            | b'~'
            | b'*'
            | b'\''
            | b'('
            | b')' => out.push(byte as char),
            _ => out.push_str(&format!("%{:02X}", byte)),
        }
    }
    out
}

/// Inverse of [`percent_encode`]; malformed escapes are kept verbatim.
fn percent_decode(s: &str) -> String {
    let bytes = s.as_bytes();
    let mut out = Vec::with_capacity(bytes.len());
    let mut i = 0;
    while i < bytes.len() {
        if bytes[i] == b'%' {
            let hex = bytes.get(i + 1..i + 3).and_then(|pair| {
                std::str::from_utf8(pair)
                    .ok()
                    .and_then(|pair| u8::from_str_radix(pair, 16).ok())
            });
            if let Some(byte) = hex {
                out.push(byte);
                i += 3;
                continue;
            }
        }
        out.push(bytes[i]);
        i += 1;
    }
    String::from_utf8_lossy(&out).into_owned()
}
