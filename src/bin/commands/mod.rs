pub mod exec;
pub mod tables;

use anyhow::anyhow;
use sqlite_dialect::Value;

/// Parse `--bind` arguments: integers and reals as numbers, `null` as NULL,
/// anything else as text.
pub(crate) fn parse_bindings(raw: &[String]) -> Vec<Value> {
    raw.iter()
        .map(|s| {
            if s.eq_ignore_ascii_case("null") {
                Value::Null
            } else if let Ok(i) = s.parse::<i64>() {
                Value::Integer(i)
            } else if let Ok(f) = s.parse::<f64>() {
                Value::Real(f)
            } else {
                Value::Text(s.clone())
            }
        })
        .collect()
}

pub(crate) fn to_json<T: serde::Serialize>(value: &T, pretty: bool) -> anyhow::Result<String> {
    let out = if pretty {
        serde_json::to_string_pretty(value)
    } else {
        serde_json::to_string(value)
    };
    out.map_err(|e| anyhow!("failed to serialize output: {}", e))
}
