//! In-memory [`RecordStore`] implementation for tests.
//!
//! Tables are `Vec<Record>` behind `std::sync::RwLock`, so listing keeps
//! insertion order.

use std::collections::HashMap;
use std::sync::RwLock;

use anyhow::{anyhow, Result};
use async_trait::async_trait;
use serde_json::{Map, Value};

use super::{new_record_id, Record, RecordStore};

#[derive(Default)]
pub struct InMemoryStore {
    tables: RwLock<HashMap<String, Vec<Record>>>,
}

impl InMemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Seed a table, replacing whatever it held.
    pub fn with_table(self, table: &str, records: Vec<Record>) -> Self {
        self.tables
            .write()
            .unwrap()
            .insert(table.to_string(), records);
        self
    }

    /// Current contents of one record, for assertions.
    pub fn get(&self, table: &str, id: &str) -> Option<Record> {
        self.tables
            .read()
            .unwrap()
            .get(table)
            .and_then(|rows| rows.iter().find(|r| r.id == id).cloned())
    }
}

#[async_trait]
impl RecordStore for InMemoryStore {
    async fn list_records(&self, table: &str) -> Result<Vec<Record>> {
        Ok(self
            .tables
            .read()
            .unwrap()
            .get(table)
            .cloned()
            .unwrap_or_default())
    }

    async fn create_record(&self, table: &str, fields: Map<String, Value>) -> Result<Record> {
        let record = Record::new(new_record_id(), fields);
        self.tables
            .write()
            .unwrap()
            .entry(table.to_string())
            .or_default()
            .push(record.clone());
        Ok(record)
    }

    async fn update_record(
        &self,
        table: &str,
        id: &str,
        fields: Map<String, Value>,
    ) -> Result<Record> {
        let mut tables = self.tables.write().unwrap();
        let record = tables
            .get_mut(table)
            .and_then(|rows| rows.iter_mut().find(|r| r.id == id))
            .ok_or_else(|| anyhow!("record {} not found in {}", id, table))?;
        record.fields.extend(fields);
        Ok(record.clone())
    }

    async fn delete_record(&self, table: &str, id: &str) -> Result<()> {
        let mut tables = self.tables.write().unwrap();
        let rows = tables
            .get_mut(table)
            .ok_or_else(|| anyhow!("table {} not found", table))?;
        let before = rows.len();
        rows.retain(|r| r.id != id);
        if rows.len() == before {
            return Err(anyhow!("record {} not found in {}", id, table));
        }
        Ok(())
    }
}
