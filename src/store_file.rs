//! Local JSON-file record store.
//!
//! Each table is `<dir>/<table>.json`, a JSON array of `{"id", "fields"}`
//! objects. A missing file is an empty table. Writes rewrite the whole file
//! through a temp file and rename, serialized by a single lock.

use anyhow::{anyhow, bail, Context, Result};
use async_trait::async_trait;
use serde_json::{Map, Value};
use std::path::{Path, PathBuf};
use tokio::sync::Mutex;
use tracing::debug;

use sensemaker_core::store::{new_record_id, Record, RecordStore};

pub struct FileStore {
    dir: PathBuf,
    write_lock: Mutex<()>,
}

impl FileStore {
    pub fn new(dir: impl Into<PathBuf>) -> Self {
        Self {
            dir: dir.into(),
            write_lock: Mutex::new(()),
        }
    }

    fn table_path(&self, table: &str) -> Result<PathBuf> {
        if table.is_empty() || table.contains(['/', '\\']) || table.starts_with('.') {
            bail!("invalid table name: '{}'", table);
        }
        Ok(self.dir.join(format!("{}.json", table)))
    }

    async fn read_table(&self, path: &Path) -> Result<Vec<Record>> {
        match tokio::fs::read_to_string(path).await {
            Ok(content) if content.trim().is_empty() => Ok(Vec::new()),
            Ok(content) => serde_json::from_str(&content)
                .with_context(|| format!("Failed to parse table file: {}", path.display())),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(Vec::new()),
            Err(e) => {
                Err(e).with_context(|| format!("Failed to read table file: {}", path.display()))
            }
        }
    }

    async fn write_table(&self, path: &Path, records: &[Record]) -> Result<()> {
        tokio::fs::create_dir_all(&self.dir)
            .await
            .with_context(|| format!("Failed to create store dir: {}", self.dir.display()))?;
        let tmp = path.with_extension("json.tmp");
        let content = serde_json::to_string_pretty(records)?;
        tokio::fs::write(&tmp, content)
            .await
            .with_context(|| format!("Failed to write table file: {}", tmp.display()))?;
        tokio::fs::rename(&tmp, path)
            .await
            .with_context(|| format!("Failed to replace table file: {}", path.display()))?;
        debug!(path = %path.display(), records = records.len(), "wrote table");
        Ok(())
    }
}

#[async_trait]
impl RecordStore for FileStore {
    async fn list_records(&self, table: &str) -> Result<Vec<Record>> {
        let path = self.table_path(table)?;
        self.read_table(&path).await
    }

    async fn create_record(&self, table: &str, fields: Map<String, Value>) -> Result<Record> {
        let path = self.table_path(table)?;
        let _guard = self.write_lock.lock().await;
        let mut records = self.read_table(&path).await?;
        let record = Record::new(new_record_id(), fields);
        records.push(record.clone());
        self.write_table(&path, &records).await?;
        Ok(record)
    }

    async fn update_record(
        &self,
        table: &str,
        id: &str,
        fields: Map<String, Value>,
    ) -> Result<Record> {
        let path = self.table_path(table)?;
        let _guard = self.write_lock.lock().await;
        let mut records = self.read_table(&path).await?;
        let record = records
            .iter_mut()
            .find(|r| r.id == id)
            .ok_or_else(|| anyhow!("record {} not found in {}", id, table))?;
        record.fields.extend(fields);
        let updated = record.clone();
        self.write_table(&path, &records).await?;
        Ok(updated)
    }

    async fn delete_record(&self, table: &str, id: &str) -> Result<()> {
        let path = self.table_path(table)?;
        let _guard = self.write_lock.lock().await;
        let mut records = self.read_table(&path).await?;
        let before = records.len();
        records.retain(|r| r.id != id);
        if records.len() == before {
            bail!("record {} not found in {}", id, table);
        }
        self.write_table(&path, &records).await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn fields(v: Value) -> Map<String, Value> {
        v.as_object().cloned().unwrap_or_default()
    }

    #[tokio::test]
    async fn missing_table_is_empty() {
        let dir = tempfile::tempdir().unwrap();
        let store = FileStore::new(dir.path());
        assert!(store.list_records("Comments").await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn writes_persist_across_instances() {
        let dir = tempfile::tempdir().unwrap();
        let store = FileStore::new(dir.path());
        let rec = store
            .create_record("Insight", fields(json!({"Title": "Pay"})))
            .await
            .unwrap();
        store
            .update_record("Insight", &rec.id, fields(json!({"Notes": "n"})))
            .await
            .unwrap();

        let reopened = FileStore::new(dir.path());
        let records = reopened.list_records("Insight").await.unwrap();
        assert_eq!(records.len(), 1);
        assert_eq!(records[0].field("Title"), Some(&json!("Pay")));
        assert_eq!(records[0].field("Notes"), Some(&json!("n")));

        reopened.delete_record("Insight", &rec.id).await.unwrap();
        assert!(store.list_records("Insight").await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn table_names_with_spaces_and_bad_names() {
        let dir = tempfile::tempdir().unwrap();
        std::fs::write(
            dir.path().join("Survey Responses.json"),
            r#"[{"id": "rec1", "fields": {"Department": "History"}}]"#,
        )
        .unwrap();
        let store = FileStore::new(dir.path());
        assert_eq!(store.list_records("Survey Responses").await.unwrap().len(), 1);
        assert!(store.list_records("../etc").await.is_err());
    }

    #[tokio::test]
    async fn update_unknown_record_fails() {
        let dir = tempfile::tempdir().unwrap();
        let store = FileStore::new(dir.path());
        assert!(store
            .update_record("Comments", "recNope", Map::new())
            .await
            .is_err());
    }
}
