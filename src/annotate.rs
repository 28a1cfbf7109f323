//! Tag edits on free-text responses.
//!
//! An edit is applied to the in-memory snapshot first, then written to the
//! store as the response's full list of linked tag-record ids. If the write
//! fails the snapshot is put back exactly as it was and the error is
//! returned.

use anyhow::{anyhow, bail, Result};
use serde_json::{Map, Value};
use std::fmt;
use std::str::FromStr;
use tracing::{debug, warn};

use sensemaker_core::snapshot::Snapshot;
use sensemaker_core::store::RecordStore;
use sensemaker_core::tags::{self, Sentiment};

/// Store field holding a comment's linked tag records.
pub const TAGS_FIELD: &str = "Tags";

/// A requested change to one response's tags.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum TagChange {
    /// Replace plus/delta with the given sentiment, or clear it. Other tags
    /// (the star included) are kept.
    Sentiment(Option<Sentiment>),
    ToggleStar,
    Toggle(String),
}

impl FromStr for TagChange {
    type Err = anyhow::Error;

    /// `plus`, `delta`, `none`, or `star`.
    fn from_str(s: &str) -> Result<Self> {
        match s {
            "plus" => Ok(TagChange::Sentiment(Some(Sentiment::Plus))),
            "delta" => Ok(TagChange::Sentiment(Some(Sentiment::Delta))),
            "none" => Ok(TagChange::Sentiment(None)),
            "star" => Ok(TagChange::ToggleStar),
            other => bail!("unknown tag change '{}': expected plus, delta, none, or star", other),
        }
    }
}

impl fmt::Display for TagChange {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            TagChange::Sentiment(Some(Sentiment::Plus)) => f.write_str("plus"),
            TagChange::Sentiment(Some(Sentiment::Delta)) => f.write_str("delta"),
            TagChange::Sentiment(None) => f.write_str("none"),
            TagChange::ToggleStar => f.write_str("star"),
            TagChange::Toggle(key) => write!(f, "toggle {}", key),
        }
    }
}

/// The tag keys `current` would carry after `change`.
pub fn next_keys(snapshot: &Snapshot, current: &[String], change: &TagChange) -> Vec<String> {
    let keys = &snapshot.sentiment_keys;
    match change {
        TagChange::Sentiment(s) => tags::set_sentiment(current, *s, keys),
        TagChange::ToggleStar => tags::toggle(current, &keys.star),
        TagChange::Toggle(key) => tags::toggle(current, key),
    }
}

/// Apply `change` to response `response_id` and persist it to `table`.
///
/// Returns the response's new tag keys. On a store failure the snapshot is
/// rolled back and the store error is returned.
pub async fn apply_tag_change(
    store: &dyn RecordStore,
    table: &str,
    snapshot: &mut Snapshot,
    response_id: &str,
    change: &TagChange,
) -> Result<Vec<String>> {
    let current = snapshot
        .response(response_id)
        .map(|r| r.tag_keys.clone())
        .ok_or_else(|| anyhow!("unknown response: {}", response_id))?;
    let next = next_keys(snapshot, &current, change);

    if let Some(key) = next.iter().find(|k| snapshot.catalog.get(k).is_none()) {
        bail!("tag '{}' is not in the tag table", key);
    }
    let ids: Vec<Value> = snapshot
        .catalog
        .encode(&next)
        .into_iter()
        .map(Value::String)
        .collect();

    let previous = snapshot.replace_response_tags(response_id, next.clone());
    debug!(response_id, %change, "optimistic tag update");

    let mut fields = Map::new();
    fields.insert(TAGS_FIELD.to_string(), Value::Array(ids));
    if let Err(e) = store.update_record(table, response_id, fields).await {
        if let Some(previous) = previous {
            snapshot.replace_response_tags(response_id, previous);
        }
        warn!(response_id, %change, error = %e, "tag update rejected, rolled back");
        return Err(e.context(format!("Failed to save tags for {}", response_id)));
    }
    Ok(next)
}
