//! Index-friendly projections of decoded action data.
//!
//! SQLite computes these as generated columns; the in-memory backend calls
//! [`DerivedFields::from_data`] on every write. Both render booleans as
//! `1`/`0` and any other non-string JSON value as its compact JSON text.

use serde::Serialize;
use serde_json::Value;

/// `eosto`, `eosfrom`, `receiver`, `payer` and `newaccount` columns.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct DerivedFields {
    /// `data.to`
    pub eosto: Option<String>,
    /// `data.from`
    pub eosfrom: Option<String>,
    /// `data.receiver`
    pub receiver: Option<String>,
    /// `data.payer`
    pub payer: Option<String>,
    /// `data.name`
    pub newaccount: Option<String>,
}

/// `(column, JSON key)` pairs, in table order.
pub const DERIVED_COLUMNS: [(&str, &str); 5] = [
    ("eosto", "to"),
    ("eosfrom", "from"),
    ("receiver", "receiver"),
    ("payer", "payer"),
    ("newaccount", "name"),
];

fn project(data: &Value, key: &str) -> Option<String> {
    match data.get(key)? {
        Value::Null => None,
        Value::String(s) => Some(s.clone()),
        Value::Bool(b) => Some(if *b { "1" } else { "0" }.to_string()),
        other => Some(other.to_string()),
    }
}

impl DerivedFields {
    pub fn from_data(data: &Value) -> Self {
        Self {
            eosto: project(data, "to"),
            eosfrom: project(data, "from"),
            receiver: project(data, "receiver"),
            payer: project(data, "payer"),
            newaccount: project(data, "name"),
        }
    }
}
