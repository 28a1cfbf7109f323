//! Tag resolution: stable keys for tag records, and conversion between a
//! response's linked tag-record ids and its ordered set of tag keys.
//!
//! Keys are derived from tag titles with [`derive_key`]. Two titles that
//! derive to the same key are rejected by [`TagCatalog::insert`] rather than
//! silently overwriting one another.
//!
//! # Example
//!
//! ```rust
//! use sensemaker_core::tags::{derive_key, TagCatalog, TagRecord};
//!
//! assert_eq!(derive_key("Needs  Follow Up"), "needs_follow_up");
//!
//! let mut catalog = TagCatalog::default();
//! catalog.insert(TagRecord::new("recPlus", "Plus", Some("➕"))).unwrap();
//! assert_eq!(catalog.decode(&["recPlus".to_string(), "recGone".to_string()]), vec!["plus"]);
//! ```

use serde::Serialize;
use std::collections::HashMap;
use thiserror::Error;

/// Errors raised while building a [`TagCatalog`].
#[derive(Debug, Error, PartialEq, Eq)]
pub enum TagError {
    /// Two tag titles derive to the same key.
    #[error("tag key collision: '{key}' derived from both '{first}' and '{second}'")]
    KeyCollision {
        key: String,
        first: String,
        second: String,
    },
    /// The same record id was inserted twice.
    #[error("duplicate tag record id: {0}")]
    DuplicateRecord(String),
}

/// Lower-case `title` and replace every run of whitespace with a single
/// underscore. Total: the empty string maps to `""`.
pub fn derive_key(title: &str) -> String {
    let mut key = String::with_capacity(title.len());
    let mut in_space = false;
    for c in title.chars() {
        if c.is_whitespace() {
            if !in_space {
                key.push('_');
                in_space = true;
            }
        } else {
            key.extend(c.to_lowercase());
            in_space = false;
        }
    }
    key
}

/// Map each tag-record id to its key. Unknown ids are dropped and the
/// result never contains the same key twice.
pub fn decode(tag_record_ids: &[String], id_to_key: &HashMap<String, String>) -> Vec<String> {
    let mut keys: Vec<String> = Vec::with_capacity(tag_record_ids.len());
    for id in tag_record_ids {
        if let Some(key) = id_to_key.get(id) {
            if !keys.contains(key) {
                keys.push(key.clone());
            }
        }
    }
    keys
}

/// Inverse of [`decode`]: map each key to its record id, dropping unknown
/// keys.
pub fn encode(keys: &[String], key_to_id: &HashMap<String, String>) -> Vec<String> {
    keys.iter()
        .filter_map(|key| key_to_id.get(key).cloned())
        .collect()
}

/// Swap keys and values of a one-to-one mapping.
pub fn inverse(map: &HashMap<String, String>) -> HashMap<String, String> {
    map.iter().map(|(k, v)| (v.clone(), k.clone())).collect()
}

/// A tag record as read from the store.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TagRecord {
    pub record_id: String,
    pub title: String,
    pub emoji: Option<String>,
}

impl TagRecord {
    pub fn new(record_id: &str, title: &str, emoji: Option<&str>) -> Self {
        Self {
            record_id: record_id.to_string(),
            title: title.to_string(),
            emoji: emoji.map(str::to_string),
        }
    }
}

/// A labeled annotation category with its derived key.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Tag {
    pub key: String,
    pub title: String,
    pub emoji: Option<String>,
    pub record_id: String,
}

/// The set of known tags, indexed both by key and by record id.
#[derive(Debug, Clone, Default)]
pub struct TagCatalog {
    tags: Vec<Tag>,
    id_to_key: HashMap<String, String>,
    key_to_id: HashMap<String, String>,
}

impl TagCatalog {
    /// Build a catalog, failing on the first key collision.
    pub fn build(records: impl IntoIterator<Item = TagRecord>) -> Result<Self, TagError> {
        let mut catalog = Self::default();
        for record in records {
            catalog.insert(record)?;
        }
        Ok(catalog)
    }

    /// Add a tag. Rejects a title whose key is already taken and a record
    /// id that was already inserted; the catalog is unchanged on error.
    pub fn insert(&mut self, record: TagRecord) -> Result<&Tag, TagError> {
        if self.id_to_key.contains_key(&record.record_id) {
            return Err(TagError::DuplicateRecord(record.record_id));
        }
        let key = derive_key(&record.title);
        if let Some(existing) = self.get(&key) {
            return Err(TagError::KeyCollision {
                key,
                first: existing.title.clone(),
                second: record.title,
            });
        }
        self.id_to_key.insert(record.record_id.clone(), key.clone());
        self.key_to_id.insert(key.clone(), record.record_id.clone());
        self.tags.push(Tag {
            key,
            title: record.title,
            emoji: record.emoji,
            record_id: record.record_id,
        });
        Ok(&self.tags[self.tags.len() - 1])
    }

    pub fn get(&self, key: &str) -> Option<&Tag> {
        self.tags.iter().find(|t| t.key == key)
    }

    pub fn tags(&self) -> &[Tag] {
        &self.tags
    }

    pub fn len(&self) -> usize {
        self.tags.len()
    }

    pub fn is_empty(&self) -> bool {
        self.tags.is_empty()
    }

    pub fn id_to_key(&self) -> &HashMap<String, String> {
        &self.id_to_key
    }

    pub fn key_to_id(&self) -> &HashMap<String, String> {
        &self.key_to_id
    }

    pub fn decode(&self, tag_record_ids: &[String]) -> Vec<String> {
        decode(tag_record_ids, &self.id_to_key)
    }

    pub fn encode(&self, keys: &[String]) -> Vec<String> {
        encode(keys, &self.key_to_id)
    }
}

/// The keys that carry sentiment and the star flag.
///
/// Deployments name these tags differently; the keys are derived from the
/// configured titles.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct SentimentKeys {
    pub plus: String,
    pub delta: String,
    pub star: String,
}

impl Default for SentimentKeys {
    fn default() -> Self {
        Self {
            plus: "plus".to_string(),
            delta: "delta".to_string(),
            star: "star".to_string(),
        }
    }
}

impl SentimentKeys {
    pub fn from_titles(plus: &str, delta: &str, star: &str) -> Self {
        Self {
            plus: derive_key(plus),
            delta: derive_key(delta),
            star: derive_key(star),
        }
    }

    /// The first plus/delta key in selection order.
    pub fn sentiment_of(&self, keys: &[String]) -> Option<Sentiment> {
        keys.iter().find_map(|k| self.classify(k))
    }

    pub fn classify(&self, key: &str) -> Option<Sentiment> {
        if key == self.plus {
            Some(Sentiment::Plus)
        } else if key == self.delta {
            Some(Sentiment::Delta)
        } else {
            None
        }
    }

    pub fn key_for(&self, sentiment: Sentiment) -> &str {
        match sentiment {
            Sentiment::Plus => &self.plus,
            Sentiment::Delta => &self.delta,
        }
    }

    /// Glyph shown in front of a cited response: the sentiment glyph, or a
    /// speech bubble for anything else.
    pub fn glyph_for(&self, keys: &[String]) -> &'static str {
        match self.sentiment_of(keys) {
            Some(s) => s.glyph(),
            None => NEUTRAL_GLYPH,
        }
    }
}

/// Glyph for a response with no plus/delta tag.
pub const NEUTRAL_GLYPH: &str = "💬";

/// The mutually exclusive (by UI convention) sentiment tags.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Sentiment {
    Plus,
    Delta,
}

impl Sentiment {
    pub fn glyph(&self) -> &'static str {
        match self {
            Sentiment::Plus => "➕",
            Sentiment::Delta => "🔺",
        }
    }
}

/// Replace whatever plus/delta tag `keys` carries with `sentiment`
/// (or remove it for `None`). Other tags keep their order.
pub fn set_sentiment(
    keys: &[String],
    sentiment: Option<Sentiment>,
    sentiment_keys: &SentimentKeys,
) -> Vec<String> {
    let mut next: Vec<String> = keys
        .iter()
        .filter(|k| sentiment_keys.classify(k).is_none())
        .cloned()
        .collect();
    if let Some(s) = sentiment {
        next.push(sentiment_keys.key_for(s).to_string());
    }
    next
}

/// Remove `key` if present, otherwise append it.
pub fn toggle(keys: &[String], key: &str) -> Vec<String> {
    if keys.iter().any(|k| k == key) {
        keys.iter().filter(|k| *k != key).cloned().collect()
    } else {
        let mut next = keys.to_vec();
        next.push(key.to_string());
        next
    }
}
