//! Tests for edits against a store that rejects writes.
//!
//! A [`RecordStore`] implementation lives here, outside the crate, to check
//! that the session and edit paths only depend on the trait.

use anyhow::{bail, Result};
use async_trait::async_trait;
use serde_json::{json, Map, Value};
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;

use sensemaker::annotate::TagChange;
use sensemaker::commands::{self, Session};
use sensemaker::config::Config;
use sensemaker::insight;
use sensemaker::progress::NoProgress;
use sensemaker_core::store::memory::InMemoryStore;
use sensemaker_core::store::{Record, RecordStore};

// ─── Test Store ─────────────────────────────────────────────────────

/// Reads from an in-memory base; every write fails.
struct ReadOnlyStore {
    inner: InMemoryStore,
    rejected: AtomicUsize,
}

#[async_trait]
impl RecordStore for ReadOnlyStore {
    async fn list_records(&self, table: &str) -> Result<Vec<Record>> {
        self.inner.list_records(table).await
    }

    async fn create_record(&self, table: &str, _fields: Map<String, Value>) -> Result<Record> {
        self.rejected.fetch_add(1, Ordering::SeqCst);
        bail!("422 Unprocessable Entity: cannot create in {}", table)
    }

    async fn update_record(
        &self,
        table: &str,
        id: &str,
        _fields: Map<String, Value>,
    ) -> Result<Record> {
        self.rejected.fetch_add(1, Ordering::SeqCst);
        bail!("422 Unprocessable Entity: cannot update {} in {}", id, table)
    }

    async fn delete_record(&self, table: &str, id: &str) -> Result<()> {
        self.rejected.fetch_add(1, Ordering::SeqCst);
        bail!("cannot delete {} from {}", id, table)
    }
}

// ─── Helpers ────────────────────────────────────────────────────────

fn rec(id: &str, fields: Value) -> Record {
    match fields {
        Value::Object(map) => Record::new(id, map),
        _ => unreachable!(),
    }
}

fn base() -> InMemoryStore {
    InMemoryStore::new()
        .with_table(
            "Departments",
            vec![rec("recD1", json!({"Name": "History"}))],
        )
        .with_table(
            "Tags",
            vec![
                rec("recT1", json!({"Name": "Plus"})),
                rec("recT2", json!({"Name": "Delta"})),
                rec("recT3", json!({"Name": "Star"})),
            ],
        )
        .with_table(
            "Questions",
            vec![rec(
                "recQ1",
                json!({"ID": "open1", "Type": "Qualitative", "Nickname": "Housing"}),
            )],
        )
        .with_table(
            "Comments",
            vec![rec(
                "recC1",
                json!({"ID": "R-1", "Response Text": "Rent is too high", "Question": ["open1"], "Department": ["recD1"], "Tags": ["recT1"]}),
            )],
        )
        .with_table(
            "Insight",
            vec![rec(
                "recI1",
                json!({"Name": 1, "Title": "Housing", "Notes": "Draft", "Comments": []}),
            )],
        )
}

fn config() -> Config {
    toml::from_str("[store]\nkind = \"file\"\ndir = \"/unused\"\n").unwrap()
}

async fn session() -> (Session, Arc<ReadOnlyStore>) {
    let store = Arc::new(ReadOnlyStore {
        inner: base(),
        rejected: AtomicUsize::new(0),
    });
    let session = Session::with_store(config(), store.clone(), &NoProgress)
        .await
        .unwrap();
    (session, store)
}

// ─── Tests ──────────────────────────────────────────────────────────

#[tokio::test]
async fn test_session_loads_through_trait() {
    let (session, store) = session().await;
    assert!(session.report.is_clean(), "{:?}", session.report);
    assert_eq!(session.snapshot.responses.len(), 1);
    assert_eq!(session.snapshot.responses[0].tag_keys, vec!["plus"]);
    assert_eq!(session.resolve_response_id("R-1").unwrap(), "recC1");
    assert_eq!(store.rejected.load(Ordering::SeqCst), 0);
}

#[tokio::test]
async fn test_rejected_tag_edit_rolls_back() {
    let (mut session, store) = session().await;

    let err = commands::run_tag(&mut session, "R-1", &"delta".parse::<TagChange>().unwrap())
        .await
        .unwrap_err();
    assert!(format!("{:#}", err).contains("422"));
    assert_eq!(store.rejected.load(Ordering::SeqCst), 1);
    assert_eq!(session.snapshot.responses[0].tag_keys, vec!["plus"]);

    commands::run_tag(&mut session, "recC1", &TagChange::ToggleStar)
        .await
        .unwrap_err();
    assert_eq!(session.snapshot.responses[0].tag_keys, vec!["plus"]);
}

#[tokio::test]
async fn test_unknown_comment_never_reaches_store() {
    let (mut session, store) = session().await;
    assert!(commands::run_tag(&mut session, "R-9", &TagChange::ToggleStar)
        .await
        .is_err());
    assert_eq!(store.rejected.load(Ordering::SeqCst), 0);
}

#[tokio::test]
async fn test_rejected_citation_keeps_insight() {
    let (mut session, store) = session().await;
    let table = session.config.tables.insights.clone();

    let err = insight::cite_response(
        store.as_ref(),
        &table,
        &mut session.snapshot,
        "recI1",
        "recC1",
        None,
        session.config.citations.max_len,
    )
    .await
    .unwrap_err();
    assert!(format!("{:#}", err).contains("Failed to save insight recI1"));

    let kept = session.snapshot.insight("recI1").unwrap();
    assert_eq!(kept.body, "Draft");
    assert!(kept.cited_response_ids.is_empty());
}
