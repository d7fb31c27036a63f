//! `.glitch-assets` manifest handling.
//!
//! The manifest is an append-only event log: one JSON object per line, keyed by
//! `uuid`. Reducing it yields the set of assets that are still live.

use std::collections::HashMap;

use serde_json::Value;

use crate::error::ExportError;

#[derive(Debug, Clone, PartialEq)]
pub struct AssetRecord {
    pub uuid: String,
    pub name: Option<String>,
    pub url: Option<String>,
    pub deleted: bool,
}

impl AssetRecord {
    /// Parses one manifest line. `deleted` counts as set for any value other than `false`.
    pub fn from_line(line: &str, line_no: usize) -> Result<Self, ExportError> {
        let value: Value =
            serde_json::from_str(line).map_err(|err| ExportError::ManifestParse {
                line: line_no,
                message: err.to_string(),
            })?;
        let object = value.as_object().ok_or_else(|| ExportError::ManifestParse {
            line: line_no,
            message: "expected a JSON object".to_string(),
        })?;

        // Scalars key by their text, so `null` and `"null"` share an entry.
        let uuid = match object.get("uuid") {
            None => return Err(ExportError::ManifestMissingUuid { line: line_no }),
            Some(Value::String(uuid)) => uuid.clone(),
            Some(scalar @ (Value::Null | Value::Bool(_) | Value::Number(_))) => scalar.to_string(),
            Some(_) => {
                return Err(ExportError::ManifestParse {
                    line: line_no,
                    message: "uuid must be a string or scalar".to_string(),
                });
            }
        };
        let deleted = object
            .get("deleted")
            .map(|flag| *flag != Value::Bool(false))
            .unwrap_or(false);

        Ok(Self {
            uuid,
            name: string_field(object.get("name")),
            url: string_field(object.get("url")),
            deleted,
        })
    }
}

fn string_field(value: Option<&Value>) -> Option<String> {
    value.and_then(|value| value.as_str()).map(|value| value.to_string())
}

/// Parses every non-blank line; the first bad line fails the whole manifest.
pub fn parse_manifest(text: &str) -> Result<Vec<AssetRecord>, ExportError> {
    text.lines()
        .enumerate()
        .filter(|(_, line)| !line.trim().is_empty())
        .map(|(idx, line)| AssetRecord::from_line(line, idx + 1))
        .collect()
}

#[derive(Debug, Clone, PartialEq)]
enum Slot {
    Live(AssetRecord),
    Tombstone,
}

/// Reduced view of a manifest, in order of first appearance.
#[derive(Debug, Default)]
pub struct LiveAssets {
    order: Vec<String>,
    slots: HashMap<String, Slot>,
}

impl LiveAssets {
    pub fn apply(&mut self, record: AssetRecord) {
        match self.slots.get_mut(&record.uuid) {
            None => {
                self.order.push(record.uuid.clone());
                self.slots.insert(record.uuid.clone(), Slot::Live(record));
            }
            // once deleted, a uuid never comes back
            Some(Slot::Tombstone) => {}
            Some(slot) => {
                *slot = if record.deleted {
                    Slot::Tombstone
                } else {
                    Slot::Live(record)
                };
            }
        }
    }

    pub fn iter(&self) -> impl Iterator<Item = &AssetRecord> {
        self.order.iter().filter_map(|uuid| match self.slots.get(uuid) {
            Some(Slot::Live(record)) => Some(record),
            _ => None,
        })
    }

    pub fn get(&self, uuid: &str) -> Option<&AssetRecord> {
        match self.slots.get(uuid) {
            Some(Slot::Live(record)) => Some(record),
            _ => None,
        }
    }

    pub fn is_excluded(&self, uuid: &str) -> bool {
        matches!(self.slots.get(uuid), Some(Slot::Tombstone))
    }

    pub fn len(&self) -> usize {
        self.iter().count()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

pub fn reduce(records: impl IntoIterator<Item = AssetRecord>) -> LiveAssets {
    let mut live = LiveAssets::default();
    for record in records {
        live.apply(record);
    }
    live
}

/// Repairs the escaping mistakes commonly found in manifest URLs. Nothing else is touched.
pub fn repair_url(url: &str) -> String {
    url.replace("%3A", ":")
        .replace("%2F", "/")
        .replace(' ', "%20")
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn repairs_only_known_sequences() {
        assert_eq!(
            repair_url("https%3A%2F%2Fcdn.glitch.com%2Fabc%2Fmy cat.png"),
            "https://cdn.glitch.com/abc/my%20cat.png"
        );
        assert_eq!(repair_url("https://x/a%3a%20b"), "https://x/a%3a%20b");
    }

    #[test]
    fn deleted_false_is_not_deleted() {
        let record = AssetRecord::from_line(r#"{"uuid":"u1","deleted":false}"#, 1).unwrap();
        assert!(!record.deleted);
        let record = AssetRecord::from_line(r#"{"uuid":"u1","deleted":null}"#, 1).unwrap();
        assert!(record.deleted);
    }

    #[test]
    fn first_record_deleted_stays_live() {
        let live = reduce(
            parse_manifest(r#"{"uuid":"u1","name":"a.png","url":"u","deleted":true}"#).unwrap(),
        );
        assert_eq!(live.len(), 1);
    }
}
