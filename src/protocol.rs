// MIT License - Copyright (c) 2026 Peter Wright
// Response parsing: embedded JS variables, JSON and XML bodies

use std::collections::HashMap;
use std::sync::LazyLock;

use percent_encoding::percent_decode_str;
use regex::Regex;
use serde_json::Value;

use crate::constants::PLACEHOLDER_NAMES;
use crate::error::{PanelError, Result};

static SESSION_TOKEN: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r#"function\s+getSession\s*\(\)[^"]+"(?P<session>[^"]+)""#)
        .expect("valid session pattern")
});

static JS_ARRAY_VAR: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(
        r"(?s)var\s+(?P<name>[A-Za-z_$][\w$]*)\s*=\s*(?P<value>\[.*?\]|new\s+Array\s*\(.*?\))\s*;",
    )
    .expect("valid js variable pattern")
});

// Leaf elements only: panel responses are flat `<tag>text</tag>` lists.
static XML_LEAF: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"<(?P<open>[A-Za-z_][\w.-]*)>(?P<value>[^<]*)</(?P<close>[A-Za-z_][\w.-]*)>")
        .expect("valid xml leaf pattern")
});

/// Extract the session token from a login response.
///
/// The panel embeds it as `function getSession(){return "<token>";}`.
pub fn session_token(body: &str) -> Option<String> {
    SESSION_TOKEN.captures(body).map(|caps| caps["session"].to_string())
}

/// Parse `var <name> = ...;` from a page into a JSON value.
///
/// Accepts bracket literals and (nested) `new Array(...)` constructor calls.
pub fn js_variable(body: &str, name: &str) -> Result<Value> {
    let literal = JS_ARRAY_VAR
        .captures_iter(body)
        .find(|caps| &caps["name"] == name)
        .map(|caps| caps["value"].to_string())
        .ok_or_else(|| PanelError::decode(format!("variable '{name}' not found")))?;

    let json = normalize_array_literal(&literal);
    serde_json::from_str(&json)
        .map_err(|e| PanelError::decode(format!("variable '{name}' is not a valid array: {e}")))
}

/// Array-valued JS variable.
pub fn js_array(body: &str, name: &str) -> Result<Vec<Value>> {
    match js_variable(body, name)? {
        Value::Array(items) => Ok(items),
        other => Err(PanelError::decode(format!("variable '{name}' is not an array: {other}"))),
    }
}

/// JS array of integers (numbers or numeric strings).
pub fn js_integers(body: &str, name: &str) -> Result<Vec<u32>> {
    js_array(body, name)?
        .iter()
        .map(|v| value_as_u32(v).ok_or_else(|| PanelError::decode(format!("'{name}' holds non-integer {v}"))))
        .collect()
}

/// JS array of percent-encoded names; `None` marks an unused slot.
pub fn js_names(body: &str, name: &str) -> Result<Vec<Option<String>>> {
    js_array(body, name)?
        .iter()
        .map(|v| match v {
            Value::String(raw) => Ok(decode_name(raw)),
            other => Err(PanelError::decode(format!("'{name}' holds non-string {other}"))),
        })
        .collect()
}

/// Rewrite `new Array(a, new Array(b))` as `[a, [b]]`, leaving string
/// contents alone. Single-quoted strings become double-quoted.
pub fn normalize_array_literal(src: &str) -> String {
    let mut out = String::with_capacity(src.len());
    // true for a paren opened by `new Array(`
    let mut parens: Vec<bool> = Vec::new();
    let mut chars = src.char_indices().peekable();

    while let Some((i, c)) = chars.next() {
        match c {
            '"' | '\'' => {
                out.push('"');
                while let Some((_, s)) = chars.next() {
                    match s {
                        '\\' => {
                            out.push('\\');
                            if let Some((_, escaped)) = chars.next() {
                                out.push(escaped);
                            }
                        }
                        _ if s == c => break,
                        '"' => out.push_str("\\\""),
                        _ => out.push(s),
                    }
                }
                out.push('"');
            }
            'n' if src[i..].starts_with("new") => {
                let rest = &src[i + 3..];
                let trimmed = rest.trim_start();
                if let Some(after) = trimmed.strip_prefix("Array") {
                    let after = after.trim_start();
                    if after.starts_with('(') {
                        // skip "new", whitespace, "Array", whitespace and "("
                        let consumed = src.len() - i - after.len() + 1;
                        let end = i + consumed;
                        while chars.peek().is_some_and(|(j, _)| *j < end) {
                            chars.next();
                        }
                        out.push('[');
                        parens.push(true);
                        continue;
                    }
                }
                out.push(c);
            }
            '(' => {
                parens.push(false);
                out.push(c);
            }
            ')' => {
                if parens.pop() == Some(true) {
                    out.push(']');
                } else {
                    out.push(c);
                }
            }
            _ => out.push(c),
        }
    }
    out
}

/// Percent-decode and trim a panel name. Placeholders decode to `None`.
pub fn decode_name(raw: &str) -> Option<String> {
    let decoded = percent_decode_str(raw).decode_utf8_lossy();
    let name = decoded.trim();
    if PLACEHOLDER_NAMES.contains(&name) {
        None
    } else {
        Some(name.to_string())
    }
}

/// Right-pad with zeros (or truncate) to exactly `len` entries.
pub fn pad_sequence(mut seq: Vec<u32>, len: usize) -> Vec<u32> {
    seq.resize(len, 0);
    seq
}

pub fn value_as_u32(value: &Value) -> Option<u32> {
    match value {
        Value::Number(n) => n.as_u64().and_then(|n| u32::try_from(n).ok()),
        Value::String(s) => s.trim().parse().ok(),
        _ => None,
    }
}

/// Decode a hex string into one value per byte.
pub fn hex_bytes(hex: &str) -> Result<Vec<u16>> {
    let hex = hex.trim();
    if hex.len() % 2 != 0 {
        return Err(PanelError::decode(format!("odd-length hex string '{hex}'")));
    }
    (0..hex.len())
        .step_by(2)
        .map(|i| {
            hex.get(i..i + 2)
                .and_then(|pair| u8::from_str_radix(pair, 16).ok())
                .map(u16::from)
                .ok_or_else(|| PanelError::decode(format!("invalid hex string '{hex}'")))
        })
        .collect()
}

/// Status words from either a hex string (one byte each) or an integer array.
pub fn status_words(value: &Value) -> Result<Vec<u16>> {
    match value {
        Value::String(hex) => hex_bytes(hex),
        Value::Array(items) => items
            .iter()
            .map(|v| {
                value_as_u32(v)
                    .and_then(|n| u16::try_from(n).ok())
                    .ok_or_else(|| PanelError::decode(format!("invalid status word {v}")))
            })
            .collect(),
        other => Err(PanelError::decode(format!("unexpected status value {other}"))),
    }
}

/// Parse a JSON body.
pub fn json_body(body: &str) -> Result<Value> {
    serde_json::from_str(body).map_err(|e| PanelError::decode(format!("malformed JSON: {e}")))
}

/// Required field of a JSON object.
pub fn json_field<'a>(value: &'a Value, key: &str) -> Result<&'a Value> {
    value
        .get(key)
        .ok_or_else(|| PanelError::decode(format!("missing JSON field '{key}'")))
}

pub fn json_u32(value: &Value, key: &str) -> Result<u32> {
    let field = json_field(value, key)?;
    value_as_u32(field).ok_or_else(|| PanelError::decode(format!("field '{key}' is not an integer")))
}

pub fn json_integers(value: &Value, key: &str) -> Result<Vec<u32>> {
    match json_field(value, key)? {
        Value::Array(items) => items
            .iter()
            .map(|v| value_as_u32(v).ok_or_else(|| PanelError::decode(format!("'{key}' holds {v}"))))
            .collect(),
        other => Err(PanelError::decode(format!("field '{key}' is not an array: {other}"))),
    }
}

/// `(tag, raw text)` for every leaf element, in document order.
fn xml_leaves(body: &str) -> impl Iterator<Item = (&str, &str)> + '_ {
    XML_LEAF.captures_iter(body).filter_map(|caps| {
        let (open, close, value) = (caps.name("open")?, caps.name("close")?, caps.name("value")?);
        (open.as_str() == close.as_str()).then_some((open.as_str(), value.as_str()))
    })
}

/// Text of the first `<tag>` leaf element.
pub fn xml_value(body: &str, tag: &str) -> Result<String> {
    xml_leaves(body)
        .find(|(name, _)| *name == tag)
        .map(|(_, text)| unescape_xml(text.trim()))
        .ok_or_else(|| PanelError::decode(format!("missing XML element <{tag}>")))
}

/// Like [`xml_value`] but absent elements are not an error.
pub fn xml_optional(body: &str, tag: &str) -> Option<String> {
    xml_value(body, tag).ok()
}

pub fn xml_u32(body: &str, tag: &str) -> Result<u32> {
    parse_xml_u32(tag, &xml_value(body, tag)?)
}

fn parse_xml_u32(tag: &str, text: &str) -> Result<u32> {
    text.trim()
        .parse()
        .map_err(|_| PanelError::decode(format!("<{tag}> is not an integer: '{text}'")))
}

/// Comma-delimited integers inside `<tag>`. Empty text yields no values.
pub fn xml_csv(body: &str, tag: &str) -> Result<Vec<u32>> {
    let text = xml_value(body, tag)?;
    text.split(',')
        .map(str::trim)
        .filter(|s| !s.is_empty())
        .map(|s| {
            s.parse()
                .map_err(|_| PanelError::decode(format!("<{tag}> holds non-integer '{s}'")))
        })
        .collect()
}

/// Values of `<prefix0>`..`<prefix{count-1}>`.
///
/// The body is scanned once; the first occurrence of a tag wins.
pub fn xml_indexed(body: &str, prefix: &str, count: usize) -> Result<Vec<u32>> {
    let mut leaves = HashMap::new();
    for (tag, text) in xml_leaves(body) {
        leaves.entry(tag).or_insert(text);
    }
    (0..count)
        .map(|i| {
            let tag = format!("{prefix}{i}");
            let text = leaves
                .get(tag.as_str())
                .ok_or_else(|| PanelError::decode(format!("missing XML element <{tag}>")))?;
            parse_xml_u32(&tag, text)
        })
        .collect()
}

fn unescape_xml(text: &str) -> String {
    text.replace("&lt;", "<")
        .replace("&gt;", ">")
        .replace("&quot;", "\"")
        .replace("&apos;", "'")
        .replace("&amp;", "&")
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_session_token() {
        let body = r#"<script>function getSession(){return "A2D6C62695D705D8";}</script>"#;
        assert_eq!(session_token(body).as_deref(), Some("A2D6C62695D705D8"));
        assert_eq!(session_token("<html>Invalid login</html>"), None);
    }

    #[test]
    fn test_js_bracket_literal() {
        let body = r#"var areaSequence = [149,0,0,0];
var areaNames = ["Area%201","%21"];"#;
        assert_eq!(js_integers(body, "areaSequence").unwrap(), vec![149, 0, 0, 0]);
        assert_eq!(
            js_names(body, "areaNames").unwrap(),
            vec![Some("Area 1".to_string()), None]
        );
    }

    #[test]
    fn test_js_constructor_literal() {
        let body = "var zoneStatus = new Array(new Array(2,0), new Array (0, 1));\nvar x = 1;";
        let value = js_variable(body, "zoneStatus").unwrap();
        assert_eq!(value, json!([[2, 0], [0, 1]]));
    }

    #[test]
    fn test_js_nested_brackets() {
        let body = r#"var zoneStatus = [[1,2],[3,4]];"#;
        assert_eq!(js_variable(body, "zoneStatus").unwrap(), json!([[1, 2], [3, 4]]));
    }

    #[test]
    fn test_js_variable_missing() {
        let err = js_variable("var other = [];", "zoneNames").unwrap_err();
        assert!(matches!(err, PanelError::Decode { .. }));
    }

    #[test]
    fn test_normalize_leaves_strings_alone() {
        let src = r#"new Array('new Array(', "a)b")"#;
        assert_eq!(normalize_array_literal(src), r#"["new Array(", "a)b"]"#);
    }

    #[test]
    fn test_decode_name_placeholders() {
        assert_eq!(decode_name("%21"), None);
        assert_eq!(decode_name("!"), None);
        assert_eq!(decode_name("-"), None);
        assert_eq!(decode_name(""), None);
        assert_eq!(decode_name("%20%20"), None);
        assert_eq!(decode_name("Garage%20Door%20"), Some("Garage Door".to_string()));
    }

    #[test]
    fn test_pad_sequence() {
        assert_eq!(pad_sequence(vec![1, 2], 4), vec![1, 2, 0, 0]);
        assert_eq!(pad_sequence(vec![1, 2, 3], 2), vec![1, 2]);
    }

    #[test]
    fn test_hex_bytes() {
        assert_eq!(hex_bytes("00ff10").unwrap(), vec![0, 255, 16]);
        assert!(hex_bytes("abc").is_err());
        assert!(hex_bytes("zz").is_err());
    }

    #[test]
    fn test_status_words() {
        assert_eq!(status_words(&json!("0102")).unwrap(), vec![1, 2]);
        assert_eq!(status_words(&json!([4096, "3"])).unwrap(), vec![4096, 3]);
        assert!(status_words(&json!([70000])).is_err());
        assert!(status_words(&json!(null)).is_err());
    }

    #[test]
    fn test_json_helpers() {
        let value = json_body(r#"{"area":[1,2],"abank":"0"}"#).unwrap();
        assert_eq!(json_integers(&value, "area").unwrap(), vec![1, 2]);
        assert_eq!(json_u32(&value, "abank").unwrap(), 0);
        assert!(json_field(&value, "zone").is_err());
        assert!(json_body("{not json").is_err());
    }

    #[test]
    fn test_xml_helpers() {
        let body = "<?xml version=\"1.0\"?><response><areas>1,0,2</areas><zones></zones>\
                    <stat0>4</stat0><stat1>0</stat1><sysflt>AC Fail &amp; Low Battery</sysflt></response>";
        assert_eq!(xml_csv(body, "areas").unwrap(), vec![1, 0, 2]);
        assert_eq!(xml_csv(body, "zones").unwrap(), Vec::<u32>::new());
        assert_eq!(xml_indexed(body, "stat", 2).unwrap(), vec![4, 0]);
        assert_eq!(xml_value(body, "sysflt").unwrap(), "AC Fail & Low Battery");
        assert!(xml_value(body, "aseq").is_err());
        assert_eq!(xml_optional(body, "aseq"), None);
    }

    #[test]
    fn test_js_variable_matches_whole_name() {
        let body = "var count = 3;\nvar areaStatusOld = [9];\nvar areaStatus = [1,2];";
        assert_eq!(js_integers(body, "areaStatus").unwrap(), vec![1, 2]);
        assert_eq!(js_integers(body, "areaStatusOld").unwrap(), vec![9]);
    }

    #[test]
    fn test_xml_indexed_single_pass() {
        let stats: String = (0..17).map(|i| format!("<stat{i}>{i}</stat{i}>")).collect();
        let body = format!("<response><abank>0</abank>{stats}<stat1>99</stat1></response>");
        let values = xml_indexed(&body, "stat", 17).unwrap();
        assert_eq!(values.len(), 17);
        assert_eq!(values[1], 1);
        assert_eq!(values[16], 16);
        assert!(xml_indexed(&body, "stat", 18).is_err());
    }
}
