//! Canonical text form of a decoded payload.
//!
//! Object keys are written in sorted order and no whitespace is emitted, so
//! two bodies that decode to the same structure always produce the same
//! fingerprint no matter how the sender ordered its keys. Numbers keep
//! serde_json's own textual form: `1` and `1.0` are different signals.

use serde_json::Value;
use std::fmt;

#[derive(Clone, Debug, PartialEq, Eq, Hash)]
pub struct Fingerprint(String);

impl Fingerprint {
    pub fn of(payload: &Value) -> Self {
        let mut out = String::new();
        write_canonical(payload, &mut out);
        Self(out)
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for Fingerprint {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        // Payloads can be large; the head is enough to recognise one in logs.
        const PREVIEW: usize = 64;
        match self.0.char_indices().nth(PREVIEW) {
            Some((idx, _)) => write!(f, "{}…", &self.0[..idx]),
            None => f.write_str(&self.0),
        }
    }
}

fn write_canonical(value: &Value, out: &mut String) {
    match value {
        Value::Object(map) => {
            let mut entries: Vec<(&String, &Value)> = map.iter().collect();
            entries.sort_by(|a, b| a.0.cmp(b.0));

            out.push('{');
            for (i, (key, item)) in entries.into_iter().enumerate() {
                if i > 0 {
                    out.push(',');
                }
                write_string(key, out);
                out.push(':');
                write_canonical(item, out);
            }
            out.push('}');
        }
        Value::Array(items) => {
            out.push('[');
            for (i, item) in items.iter().enumerate() {
                if i > 0 {
                    out.push(',');
                }
                write_canonical(item, out);
            }
            out.push(']');
        }
        Value::String(s) => write_string(s, out),
        scalar => out.push_str(&scalar.to_string()),
    }
}

fn write_string(s: &str, out: &mut String) {
    // Display on a JSON string value yields the quoted, escaped literal.
    out.push_str(&Value::from(s).to_string());
}
