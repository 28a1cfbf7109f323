//! Record-store abstraction.
//!
//! The survey data lives in an external table store (Airtable or a
//! compatible API). [`RecordStore`] is the only surface the engine needs:
//! list a table, and create, patch, or delete single records. Records are
//! loosely typed; the application's ingestion step turns them into the
//! models in [`crate::models`].
//!
//! Implementations must be `Send + Sync` to work with async runtimes.

pub mod memory;

use anyhow::Result;
use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

/// A store record: an id plus a bag of named fields.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Record {
    pub id: String,
    #[serde(default)]
    pub fields: Map<String, Value>,
}

impl Record {
    pub fn new(id: impl Into<String>, fields: Map<String, Value>) -> Self {
        Self {
            id: id.into(),
            fields,
        }
    }

    pub fn field(&self, name: &str) -> Option<&Value> {
        self.fields.get(name)
    }

    /// First of `names` holding a non-blank string.
    pub fn first_str(&self, names: &[&str]) -> Option<&str> {
        names.iter().find_map(|n| {
            self.fields
                .get(*n)
                .and_then(Value::as_str)
                .map(str::trim)
                .filter(|s| !s.is_empty())
        })
    }
}

/// Generate a store-style record id: `rec` followed by 14 hex characters.
pub fn new_record_id() -> String {
    let hex = uuid::Uuid::new_v4().simple().to_string();
    format!("rec{}", &hex[..14])
}

/// Abstract table store.
///
/// | Method | Purpose |
/// |--------|---------|
/// | [`list_records`](RecordStore::list_records) | Every record of a table |
/// | [`create_record`](RecordStore::create_record) | Insert a record, returning it with its new id |
/// | [`update_record`](RecordStore::update_record) | Patch the named fields of one record |
/// | [`delete_record`](RecordStore::delete_record) | Remove one record |
#[async_trait]
pub trait RecordStore: Send + Sync {
    async fn list_records(&self, table: &str) -> Result<Vec<Record>>;

    async fn create_record(&self, table: &str, fields: Map<String, Value>) -> Result<Record>;

    /// Fields not named in `fields` are left unchanged.
    async fn update_record(
        &self,
        table: &str,
        id: &str,
        fields: Map<String, Value>,
    ) -> Result<Record>;

    async fn delete_record(&self, table: &str, id: &str) -> Result<()>;
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn record_ids_look_like_store_ids() {
        let id = new_record_id();
        assert_eq!(id.len(), 17);
        assert!(id.starts_with("rec"));
        assert!(id[3..].chars().all(|c| c.is_ascii_hexdigit()));
        assert_ne!(id, new_record_id());
    }

    #[test]
    fn first_str_skips_blank_fields() {
        let record: Record = serde_json::from_value(serde_json::json!({
            "id": "rec1",
            "fields": {"Name": "  ", "Department": "History"}
        }))
        .unwrap();
        assert_eq!(record.first_str(&["Name", "Department"]), Some("History"));
        assert_eq!(record.first_str(&["Missing"]), None);
    }
}
