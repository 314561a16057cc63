//! Turns a decoded webhook payload into the user prompt sent to the model.
//!
//! Two payload shapes are recognised: the flat alert list
//! (`{symbol, time, alerts: [{timeframe, type, pattern, price}, ..]}`) which
//! is rendered per configured timeframe, and anything else shaped like an
//! object, which is flattened section by section.

use serde_json::{Map, Value};
use std::collections::HashMap;
use std::fmt::Write;

use crate::config::PromptConfig;
use crate::error::PromptError;

const NO_DATA: &str = "no data";
const NOT_AVAILABLE: &str = "N/A";

const CHECKLIST: &str = "Give a clear analysis:
- Direction: BUY or SELL
- Entry, SL, TP1, TP2
- Reasons for the entry (confluence)
- Risk
- Approximate holding time
❌ If the structure is not clear yet, or the timeframes contradict each other, answer WAIT and explain the reasons in detail.";

#[derive(Clone, Debug, Default)]
pub struct PromptBuilder {
    config: PromptConfig,
}

impl PromptBuilder {
    pub fn new(config: PromptConfig) -> Self {
        Self { config }
    }

    pub fn system_instructions(&self) -> &str {
        &self.config.system_instructions
    }

    pub fn build(&self, payload: &Value) -> Result<String, PromptError> {
        let map = payload.as_object().ok_or(PromptError::NotAnObject {
            kind: kind_of(payload),
        })?;

        match map.get("alerts").and_then(Value::as_array) {
            Some(alerts) => Ok(self.build_alert_list(map, alerts)),
            None => Ok(self.build_structured(map)),
        }
    }

    fn build_alert_list(&self, map: &Map<String, Value>, alerts: &[Value]) -> String {
        // Later alerts for the same timeframe win.
        let by_timeframe: HashMap<String, &Value> = alerts
            .iter()
            .filter_map(|alert| {
                let tf = alert.get("timeframe").map(|v| scalar_text(v, NOT_AVAILABLE))?;
                Some((tf, alert))
            })
            .collect();

        let mut out = String::new();
        let _ = writeln!(out, "Analyze {} using the multi-timeframe alerts below:", self.config.instrument);
        let _ = writeln!(out);
        let _ = writeln!(out, "📍 Time: {}", field_text(map.get("time"), NO_DATA));
        let _ = writeln!(out, "📌 Symbol: {}", field_text(map.get("symbol"), NO_DATA));

        for section in &self.config.timeframes {
            let _ = writeln!(out);
            let _ = writeln!(out, "🔹 {}:", section.label);
            match by_timeframe.get(&section.timeframe) {
                Some(alert) => {
                    let _ = writeln!(out, "- Type: {}", field_text(alert.get("type"), NOT_AVAILABLE));
                    let _ = writeln!(out, "- Pattern: {}", field_text(alert.get("pattern"), NOT_AVAILABLE));
                    let _ = writeln!(out, "- Price: {}", field_text(alert.get("price"), NOT_AVAILABLE));
                }
                None => {
                    let _ = writeln!(out, "{}", NO_DATA);
                }
            }
        }

        let _ = writeln!(out);
        out.push_str(CHECKLIST);
        out
    }

    fn build_structured(&self, map: &Map<String, Value>) -> String {
        let mut entries: Vec<(&String, &Value)> = map.iter().collect();
        entries.sort_by(|a, b| a.0.cmp(b.0));

        let mut out = String::new();
        let _ = writeln!(out, "Analyze the following {} trading signal:", self.config.instrument);

        let (scalars, nested): (Vec<_>, Vec<_>) = entries
            .into_iter()
            .partition(|(_, v)| !(v.is_object() || v.is_array()));

        if !scalars.is_empty() {
            let _ = writeln!(out);
            for (key, value) in scalars {
                let _ = writeln!(out, "📌 {}: {}", key, scalar_text(value, NOT_AVAILABLE));
            }
        }

        for (key, value) in nested {
            let _ = writeln!(out);
            let _ = writeln!(out, "🔹 {}:", key);
            let mut lines = Vec::new();
            flatten("", value, &mut lines);
            for line in lines {
                let _ = writeln!(out, "{}", line);
            }
        }

        let _ = writeln!(out);
        out.push_str(CHECKLIST);
        out
    }
}

fn flatten(prefix: &str, value: &Value, lines: &mut Vec<String>) {
    let join = |key: &str| {
        if prefix.is_empty() {
            key.to_string()
        } else {
            format!("{}.{}", prefix, key)
        }
    };

    match value {
        Value::Object(map) if !map.is_empty() => {
            let mut entries: Vec<(&String, &Value)> = map.iter().collect();
            entries.sort_by(|a, b| a.0.cmp(b.0));
            for (key, item) in entries {
                flatten(&join(key), item, lines);
            }
        }
        Value::Array(items) if !items.is_empty() => {
            for (i, item) in items.iter().enumerate() {
                flatten(&format!("{}[{}]", prefix, i), item, lines);
            }
        }
        Value::Object(_) | Value::Array(_) => {
            lines.push(format!("- {}: (empty)", display_path(prefix)));
        }
        scalar => {
            lines.push(format!("- {}: {}", display_path(prefix), scalar_text(scalar, NOT_AVAILABLE)));
        }
    }
}

fn display_path(prefix: &str) -> &str {
    if prefix.is_empty() {
        "value"
    } else {
        prefix
    }
}

fn field_text(value: Option<&Value>, fallback: &str) -> String {
    value.map(|v| scalar_text(v, fallback)).unwrap_or_else(|| fallback.to_string())
}

/// Strings unquoted; null falls back.
fn scalar_text(value: &Value, fallback: &str) -> String {
    match value {
        Value::Null => fallback.to_string(),
        Value::String(s) => s.clone(),
        other => other.to_string(),
    }
}

fn kind_of(value: &Value) -> &'static str {
    match value {
        Value::Null => "null",
        Value::Bool(_) => "boolean",
        Value::Number(_) => "number",
        Value::String(_) => "string",
        Value::Array(_) => "array",
        Value::Object(_) => "object",
    }
}
