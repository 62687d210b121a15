//! Repair of non-finite numbers in ML service responses.
//!
//! The prediction service serializes NumPy floats with Python's `json`
//! module, which emits bare `NaN`, `Infinity` and `-Infinity` tokens. Those
//! are not JSON. [`preclean`] rewrites them to `null` textually so the body
//! parses, and [`sanitize_value`] nulls out anything non-finite that
//! survived parsing (including the stringified forms).

use crate::error::Result;
use regex::{Captures, Regex};
use serde_json::Value;
use std::sync::LazyLock;

/// Either a complete JSON string literal, or a bare non-finite token in value
/// position: after `:`, `[` or `,` and before `,`, `}` or `]`. String
/// literals are matched first so tokens inside them are never rewritten.
static NON_FINITE_TOKEN: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r#""(?:[^"\\]|\\.)*"|(?P<pre>[:\[,]\s*)(?:-?Infinity|NaN)(?P<post>\s*[,}\]])"#)
        .expect("non-finite token pattern is valid")
});

const NON_FINITE_STRINGS: [&str; 3] = ["NaN", "Infinity", "-Infinity"];

/// Textual pre-clean of a raw response body.
///
/// Strips a leading byte order mark, trims surrounding whitespace, and
/// replaces bare `NaN` / `Infinity` / `-Infinity` values with `null`.
/// Text inside string literals is left as is.
pub fn preclean(raw: &str) -> String {
    let mut text = raw.trim_start_matches('\u{feff}').trim().to_string();
    // Adjacent tokens share a delimiter (`[NaN,NaN]`), so one pass can miss
    // every other one.
    loop {
        let mut replaced = false;
        let next = NON_FINITE_TOKEN.replace_all(&text, |caps: &Captures<'_>| {
            match (caps.name("pre"), caps.name("post")) {
                (Some(pre), Some(post)) => {
                    replaced = true;
                    format!("{}null{}", pre.as_str(), post.as_str())
                }
                _ => caps[0].to_string(),
            }
        });
        if !replaced {
            break;
        }
        text = next.into_owned();
    }
    text
}

/// Structurally sanitize a parsed value in place.
pub fn sanitize_value(value: &mut Value) {
    match value {
        Value::Number(n) => {
            if n.as_f64().is_some_and(|f| !f.is_finite()) {
                *value = Value::Null;
            }
        }
        Value::String(s) => {
            if NON_FINITE_STRINGS.contains(&s.as_str()) {
                *value = Value::Null;
            }
        }
        Value::Array(items) => items.iter_mut().for_each(sanitize_value),
        Value::Object(map) => map.values_mut().for_each(sanitize_value),
        Value::Null | Value::Bool(_) => {}
    }
}

/// Pre-clean, parse and structurally sanitize a raw response body.
///
/// Parse failures are terminal.
pub fn sanitize(raw: &str) -> Result<Value> {
    let cleaned = preclean(raw);
    let mut value: Value = serde_json::from_str(&cleaned)?;
    sanitize_value(&mut value);
    Ok(value)
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_preclean_object_values() {
        let cleaned = preclean(r#"{"snr": NaN, "ber": Infinity, "q": -Infinity}"#);
        assert_eq!(cleaned, r#"{"snr": null, "ber": null, "q": null}"#);
    }

    #[test]
    fn test_preclean_adjacent_array_elements() {
        assert_eq!(preclean("[NaN,NaN,Infinity]"), "[null,null,null]");
        assert_eq!(preclean("[1, NaN , 2]"), "[1, null , 2]");
    }

    #[test]
    fn test_preclean_leaves_strings_and_keys_alone() {
        let raw = r#"{"message": "NaN rows skipped", "NaN": 1}"#;
        assert_eq!(preclean(raw), raw);
    }

    #[test]
    fn test_preclean_ignores_tokens_inside_string_values() {
        let raw = r#"{"message": "rasio:NaN,cek", "note": "[Infinity]", "snr": NaN}"#;
        assert_eq!(
            preclean(raw),
            r#"{"message": "rasio:NaN,cek", "note": "[Infinity]", "snr": null}"#
        );

        let value = sanitize(r#"{"message": "rasio:NaN,cek"}"#).unwrap();
        assert_eq!(value, json!({"message": "rasio:NaN,cek"}));
    }

    #[test]
    fn test_preclean_handles_escaped_quotes_in_strings() {
        let raw = r#"{"msg": "say \"x\":NaN,", "v": [NaN,NaN]}"#;
        assert_eq!(
            preclean(raw),
            r#"{"msg": "say \"x\":NaN,", "v": [null,null]}"#
        );
    }

    #[test]
    fn test_preclean_strips_bom_and_whitespace() {
        assert_eq!(preclean("\u{feff}  {\"a\": NaN}\n"), "{\"a\": null}");
    }

    #[test]
    fn test_sanitize_parses_python_style_body() {
        let raw = r#"{
            "success": true,
            "results": [{"row": 1, "snr_raw": NaN, "confidence": 0.93}]
        }"#;
        let value = sanitize(raw).unwrap();
        assert_eq!(
            value,
            json!({
                "success": true,
                "results": [{"row": 1, "snr_raw": null, "confidence": 0.93}]
            })
        );
    }

    #[test]
    fn test_sanitize_nulls_stringified_non_finite() {
        let value = sanitize(r#"{"a": "NaN", "b": ["Infinity", "-Infinity", "ok"]}"#).unwrap();
        assert_eq!(value, json!({"a": null, "b": [null, null, "ok"]}));
    }

    #[test]
    fn test_sanitize_keeps_shape() {
        let value = sanitize(r#"{"x": {"y": [1, NaN, {"z": "NaN"}]}, "w": false}"#).unwrap();
        assert_eq!(value["x"]["y"].as_array().unwrap().len(), 3);
        assert_eq!(value["x"]["y"][2], json!({"z": null}));
        assert_eq!(value["w"], json!(false));
    }

    #[test]
    fn test_sanitize_is_idempotent() {
        let once = sanitize(r#"{"a": [NaN, 1.5, "Infinity"], "b": {"c": -Infinity}}"#).unwrap();
        let twice = sanitize(&serde_json::to_string(&once).unwrap()).unwrap();
        assert_eq!(once, twice);
    }

    #[test]
    fn test_sanitize_malformed_body_fails() {
        let err = sanitize("<html>Bad Gateway</html>").unwrap_err();
        assert!(matches!(err, crate::Error::MalformedJson(_)));
    }
}
