//! View pointers: serializable snapshots of which view an analyst was
//! looking at and with which filters, attached to insights so a reader can
//! jump back to the same view.
//!
//! # Persisted form
//!
//! A JSON object with `type` (or, for older pointers, only `tab`) naming
//! the view, and optional keys:
//!
//! | Key | Meaning |
//! |-----|---------|
//! | `department`, `searchTerm`, `insightFilter` | always written by [`capture`] |
//! | `selectedEconomic`, `selectedIssue`, `selectedTag`, `selectedInsight` | comment filters |
//! | `sortColumn`, `sortDirection` | heatmap ordering |
//! | `pageNumber` | contract page |
//!
//! Any other key is kept verbatim on round-trip.
//!
//! A pointer is a partial patch: [`restore`] applies only the keys the
//! pointer carries and leaves the rest of the filter state untouched.

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use std::fmt;
use std::str::FromStr;
use thiserror::Error;

use crate::filter::FilterState;

pub const KEY_TYPE: &str = "type";
pub const KEY_TAB: &str = "tab";
pub const KEY_DEPARTMENT: &str = "department";
pub const KEY_SEARCH_TERM: &str = "searchTerm";
pub const KEY_INSIGHT_FILTER: &str = "insightFilter";
pub const KEY_SORT_COLUMN: &str = "sortColumn";
pub const KEY_SORT_DIRECTION: &str = "sortDirection";
pub const KEY_SELECTED_ECONOMIC: &str = "selectedEconomic";
pub const KEY_SELECTED_ISSUE: &str = "selectedIssue";
pub const KEY_SELECTED_TAG: &str = "selectedTag";
pub const KEY_SELECTED_INSIGHT: &str = "selectedInsight";
pub const KEY_PAGE_NUMBER: &str = "pageNumber";

/// Keys a view-specific bag may not use.
pub const RESERVED_KEYS: [&str; 5] = [
    KEY_TYPE,
    KEY_TAB,
    KEY_DEPARTMENT,
    KEY_SEARCH_TERM,
    KEY_INSIGHT_FILTER,
];

#[derive(Debug, Error, PartialEq, Eq)]
pub enum PointerError {
    #[error("view-specific key '{0}' collides with a reserved pointer key")]
    ReservedKey(String),
    #[error("invalid pointer: {0}")]
    Invalid(String),
}

/// The dashboard view a pointer refers to.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ViewKind {
    #[default]
    Heatmap,
    Comments,
    Priorities,
    Stipend,
    Contract,
}

impl ViewKind {
    pub const ALL: [ViewKind; 5] = [
        ViewKind::Heatmap,
        ViewKind::Comments,
        ViewKind::Priorities,
        ViewKind::Stipend,
        ViewKind::Contract,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            ViewKind::Heatmap => "heatmap",
            ViewKind::Comments => "comments",
            ViewKind::Priorities => "priorities",
            ViewKind::Stipend => "stipend",
            ViewKind::Contract => "contract",
        }
    }
}

impl fmt::Display for ViewKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for ViewKind {
    type Err = PointerError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        ViewKind::ALL
            .into_iter()
            .find(|v| v.as_str() == s)
            .ok_or_else(|| PointerError::Invalid(format!("unknown view '{}'", s)))
    }
}

/// A view kind plus every other key of the persisted object.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(try_from = "Map<String, Value>", into = "Map<String, Value>")]
pub struct Pointer {
    pub view: ViewKind,
    pub fields: Map<String, Value>,
}

impl Pointer {
    pub fn get(&self, key: &str) -> Option<&Value> {
        self.fields.get(key)
    }

    /// Parse the JSON array stored in an insight's pointer field.
    pub fn parse_list(json: &str) -> Result<Vec<Pointer>, PointerError> {
        if json.trim().is_empty() {
            return Ok(Vec::new());
        }
        serde_json::from_str(json).map_err(|e| PointerError::Invalid(e.to_string()))
    }

    /// Serialize a pointer list for an insight's pointer field.
    pub fn to_list_json(pointers: &[Pointer]) -> String {
        Value::Array(
            pointers
                .iter()
                .cloned()
                .map(|p| Value::Object(p.into()))
                .collect(),
        )
        .to_string()
    }
}

impl TryFrom<Map<String, Value>> for Pointer {
    type Error = PointerError;

    fn try_from(mut fields: Map<String, Value>) -> Result<Self, Self::Error> {
        let view = match fields.remove(KEY_TYPE) {
            Some(Value::String(s)) => s.parse()?,
            Some(other) => {
                return Err(PointerError::Invalid(format!(
                    "'{}' must be a string, got {}",
                    KEY_TYPE, other
                )))
            }
            None => match fields.get(KEY_TAB) {
                Some(Value::String(s)) => s.parse()?,
                _ => {
                    return Err(PointerError::Invalid(format!(
                        "missing '{}' or '{}'",
                        KEY_TYPE, KEY_TAB
                    )))
                }
            },
        };
        Ok(Pointer { view, fields })
    }
}

impl From<Pointer> for Map<String, Value> {
    fn from(pointer: Pointer) -> Self {
        let mut map = Map::new();
        map.insert(KEY_TYPE.to_string(), Value::String(pointer.view.to_string()));
        map.extend(pointer.fields);
        map
    }
}

/// Flatten the current filters and a view-specific bag into one pointer.
///
/// `active_filters` always contributes `department`, `searchTerm`, and
/// `insightFilter` (defaulting to `"All"`, `""`, `"All"` when absent).
/// A view-specific key that collides with a reserved key is an error.
pub fn capture(
    view: ViewKind,
    active_filters: &Map<String, Value>,
    view_specific: &Map<String, Value>,
) -> Result<Pointer, PointerError> {
    if let Some(key) = view_specific
        .keys()
        .find(|k| RESERVED_KEYS.contains(&k.as_str()))
    {
        return Err(PointerError::ReservedKey(key.clone()));
    }

    let mut fields = Map::new();
    for (key, default) in [
        (KEY_DEPARTMENT, "All"),
        (KEY_SEARCH_TERM, ""),
        (KEY_INSIGHT_FILTER, "All"),
    ] {
        let value = active_filters
            .get(key)
            .cloned()
            .unwrap_or_else(|| Value::String(default.to_string()));
        fields.insert(key.to_string(), value);
    }
    for (key, value) in active_filters {
        if key != KEY_TYPE {
            fields.entry(key.clone()).or_insert_with(|| value.clone());
        }
    }
    for (key, value) in view_specific {
        fields.insert(key.clone(), value.clone());
    }
    Ok(Pointer { view, fields })
}

/// Capture straight from a [`FilterState`].
pub fn capture_state(
    view: ViewKind,
    state: &FilterState,
    view_specific: &Map<String, Value>,
) -> Result<Pointer, PointerError> {
    capture(view, &state.active_filters(), view_specific)
}

fn as_text(value: &Value) -> Option<String> {
    match value {
        Value::String(s) => Some(s.clone()),
        Value::Number(n) => Some(n.to_string()),
        Value::Bool(b) => Some(b.to_string()),
        _ => None,
    }
}

fn as_page(value: &Value) -> Option<u32> {
    match value {
        Value::Number(n) => n.as_u64().and_then(|n| u32::try_from(n).ok()),
        Value::String(s) => s.trim().parse().ok(),
        _ => None,
    }
}

/// Apply `pointer` to `current`. Keys the pointer carries overwrite the
/// corresponding state; everything else is left as it was. Unknown keys
/// land in [`FilterState::extras`], as do known keys whose value does not
/// fit the typed field (e.g. `"pageNumber": "cover"`), so nothing the
/// pointer carries is lost.
pub fn restore(pointer: &Pointer, current: &FilterState) -> FilterState {
    let mut next = current.clone();
    next.active_tab = pointer
        .get(KEY_TAB)
        .and_then(Value::as_str)
        .and_then(|s| s.parse().ok())
        .unwrap_or(pointer.view);

    for (key, value) in &pointer.fields {
        let applied = match key.as_str() {
            KEY_TAB => true,
            KEY_DEPARTMENT => set_text(&mut next.department, value),
            KEY_SEARCH_TERM => set_text(&mut next.search_term, value),
            KEY_INSIGHT_FILTER => set_text(&mut next.insight_filter, value),
            KEY_SELECTED_ECONOMIC => set_text(&mut next.selected_economic, value),
            KEY_SELECTED_ISSUE => set_text(&mut next.selected_issue, value),
            KEY_SELECTED_TAG => set_text(&mut next.selected_tag, value),
            KEY_SELECTED_INSIGHT => set_text(&mut next.selected_insight, value),
            KEY_SORT_COLUMN => set_optional(&mut next.sort_column, as_text(value)),
            KEY_SORT_DIRECTION => set_optional(&mut next.sort_direction, as_text(value)),
            KEY_PAGE_NUMBER => set_optional(&mut next.page_number, as_page(value)),
            _ => false,
        };
        if applied {
            next.extras.remove(key);
        } else {
            next.extras.insert(key.clone(), value.clone());
        }
    }
    next
}

fn set_text(slot: &mut String, value: &Value) -> bool {
    match as_text(value) {
        Some(text) => {
            *slot = text;
            true
        }
        None => false,
    }
}

/// An unusable value clears the slot; the raw value is kept in extras.
fn set_optional<T>(slot: &mut Option<T>, value: Option<T>) -> bool {
    let applied = value.is_some();
    *slot = value;
    applied
}
