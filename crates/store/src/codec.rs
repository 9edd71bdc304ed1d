//! Text encodings used at the storage boundary. Nothing above the store sees
//! these strings.

use chrono::NaiveDate;
use tracing::warn;

use common::{Error, Result};

const DATE_FORMAT: &str = "%Y-%m-%d";

/// Encode a GMP history as a JSON array.
pub fn encode_history(history: &[f64]) -> Result<String> {
    Ok(serde_json::to_string(history)?)
}

/// Decode a stored GMP history. Accepts a JSON array or the older
/// comma-joined text (`"8,9,14"`). Entries that are not finite numbers are
/// dropped so they can never reach an average.
pub fn decode_history(name: &str, raw: &str) -> Vec<f64> {
    let raw = raw.trim();
    if raw.is_empty() {
        return Vec::new();
    }

    let items: Vec<String> = if raw.starts_with('[') {
        match serde_json::from_str::<Vec<serde_json::Value>>(raw) {
            Ok(values) => values
                .into_iter()
                .map(|v| match v {
                    serde_json::Value::String(s) => s,
                    other => other.to_string(),
                })
                .collect(),
            Err(e) => {
                warn!(name = %name, error = %e, "Unreadable GMP history; starting empty");
                return Vec::new();
            }
        }
    } else {
        raw.split(',').map(|s| s.to_string()).collect()
    };

    items
        .iter()
        .filter_map(|item| match item.trim().parse::<f64>() {
            Ok(v) if v.is_finite() => Some(v),
            _ => {
                warn!(name = %name, entry = %item, "Dropping non-numeric GMP history entry");
                None
            }
        })
        .collect()
}

pub fn encode_date(date: NaiveDate) -> String {
    date.format(DATE_FORMAT).to_string()
}

pub fn decode_date(field: &str, raw: &str) -> Result<NaiveDate> {
    NaiveDate::parse_from_str(raw.trim(), DATE_FORMAT)
        .map_err(|e| Error::Store(format!("bad {field} '{raw}': {e}")))
}
