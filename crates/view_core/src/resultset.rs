//! Tabular projection of a normalized list: ordered column keys plus row
//! objects carrying exactly those keys.

use serde::Serialize;
use serde_json::{Map, Value};

/// `keys` holds the union of columns across all rows in first-seen order;
/// every entry of `data_source` carries exactly that key set, with nulls for
/// fields a row was missing. Schema probes read only `keys`, distinct-value
/// queries only `data_source`.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Resultset {
    pub keys: Vec<String>,
    pub data_source: Vec<Map<String, Value>>,
}

impl Resultset {
    pub fn from_rows(list: &Value) -> Self {
        let rows = match list.as_array() {
            Some(rows) => rows,
            None => return Self::default(),
        };

        let mut keys: Vec<String> = Vec::new();
        for row in rows.iter().filter_map(Value::as_object) {
            for key in row.keys() {
                if !keys.iter().any(|known| known == key) {
                    keys.push(key.clone());
                }
            }
        }

        let empty = Map::new();
        let data_source = rows
            .iter()
            .map(|row| {
                let row = row.as_object().unwrap_or(&empty);
                keys.iter()
                    .map(|key| (key.clone(), row.get(key).cloned().unwrap_or(Value::Null)))
                    .collect()
            })
            .collect();

        Self { keys, data_source }
    }
}

#[cfg(test)]
#[path = "tests/resultset_tests.rs"]
mod tests;
