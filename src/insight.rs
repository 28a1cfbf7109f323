//! Insight persistence: saving, citing responses, and attaching view
//! pointers.

use anyhow::{anyhow, Result};
use serde_json::{Map, Value};
use tracing::{debug, warn};

use sensemaker_core::citation;
use sensemaker_core::models::Insight;
use sensemaker_core::pointer::Pointer;
use sensemaker_core::snapshot::Snapshot;
use sensemaker_core::store::{Record, RecordStore};

/// Store fields of the insight table.
pub const FIELD_TITLE: &str = "Title";
pub const FIELD_NOTES: &str = "Notes";
pub const FIELD_DEPARTMENTS: &str = "Departments";
pub const FIELD_COMMENTS: &str = "Comments";
pub const FIELD_SENSEMAKERS: &str = "Sensemakers";
pub const FIELD_SNAPSHOTS: &str = "Snapshots";

fn id_array(ids: &[String]) -> Value {
    Value::Array(ids.iter().cloned().map(Value::String).collect())
}

/// The writable fields of `insight`. `Name` is assigned by the store.
pub fn insight_fields(insight: &Insight) -> Map<String, Value> {
    let mut fields = Map::new();
    fields.insert(FIELD_TITLE.to_string(), Value::String(insight.title.clone()));
    fields.insert(FIELD_NOTES.to_string(), Value::String(insight.body.clone()));
    fields.insert(FIELD_DEPARTMENTS.to_string(), id_array(&insight.department_ids));
    fields.insert(FIELD_COMMENTS.to_string(), id_array(&insight.cited_response_ids));
    fields.insert(FIELD_SENSEMAKERS.to_string(), id_array(&insight.sensemaker_ids));
    fields.insert(
        FIELD_SNAPSHOTS.to_string(),
        Value::String(Pointer::to_list_json(&insight.pointers)),
    );
    fields
}

fn merge_saved(mut insight: Insight, saved: &Record) -> Insight {
    insight.id = Some(saved.id.clone());
    if let Some(name) = saved.field("Name") {
        insight.name = match name {
            Value::String(s) => Some(s.clone()),
            Value::Number(n) => Some(n.to_string()),
            _ => insight.name,
        };
    }
    insight
}

/// Create or update `insight` in `table` and mirror the result into the
/// snapshot. The snapshot is only touched once the store accepts the write.
pub async fn save_insight(
    store: &dyn RecordStore,
    table: &str,
    snapshot: &mut Snapshot,
    insight: Insight,
) -> Result<Insight> {
    let fields = insight_fields(&insight);
    let saved = match insight.id.as_deref() {
        Some(id) => store.update_record(table, id, fields).await?,
        None => store.create_record(table, fields).await?,
    };
    let insight = merge_saved(insight, &saved);
    debug!(insight_id = ?insight.id, "insight saved");
    snapshot.upsert_insight(insight.clone());
    Ok(insight)
}

/// Add `response_id` to the cited set unless it is already there.
pub fn link_response(insight: &mut Insight, response_id: &str) {
    if !insight.cites(response_id) {
        insight.cited_response_ids.push(response_id.to_string());
    }
}

/// The insight after citing `response_id` at character offset `at` (end of
/// the body when `None`), and the cursor position after the citation.
pub fn with_citation(
    snapshot: &Snapshot,
    insight: &Insight,
    response_id: &str,
    at: Option<usize>,
    max_len: usize,
) -> Result<(Insight, usize)> {
    let response = snapshot
        .response(response_id)
        .ok_or_else(|| anyhow!("unknown response: {}", response_id))?;
    let text = citation::cite(response, &snapshot.sentiment_keys, max_len);
    let at = at.unwrap_or_else(|| insight.body.chars().count());
    let (body, cursor) = citation::insert_at(&insight.body, at, &text);

    let mut next = insight.clone();
    next.body = body;
    link_response(&mut next, response_id);
    Ok((next, cursor))
}

/// Cite a response inside a saved insight and persist it. On a store
/// failure the snapshot keeps the insight as it was.
pub async fn cite_response(
    store: &dyn RecordStore,
    table: &str,
    snapshot: &mut Snapshot,
    insight_id: &str,
    response_id: &str,
    at: Option<usize>,
    max_len: usize,
) -> Result<Insight> {
    let insight = snapshot
        .insight(insight_id)
        .cloned()
        .ok_or_else(|| anyhow!("unknown insight: {}", insight_id))?;
    let (next, cursor) = with_citation(snapshot, &insight, response_id, at, max_len)?;
    debug!(insight_id, response_id, cursor, "citation inserted");

    save_insight(store, table, snapshot, next).await.map_err(|e| {
        warn!(insight_id, error = %e, "insight save rejected");
        e.context(format!("Failed to save insight {}", insight_id))
    })
}

/// Attach `pointer` to a saved insight and persist it.
pub async fn attach_pointer(
    store: &dyn RecordStore,
    table: &str,
    snapshot: &mut Snapshot,
    insight_id: &str,
    pointer: Pointer,
) -> Result<Insight> {
    let mut insight = snapshot
        .insight(insight_id)
        .cloned()
        .ok_or_else(|| anyhow!("unknown insight: {}", insight_id))?;
    insight.pointers.push(pointer);
    save_insight(store, table, snapshot, insight).await
}
