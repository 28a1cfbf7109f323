//! CLI command implementations.
//!
//! Every command that reads survey data opens a [`Session`]: the configured
//! store plus one freshly loaded snapshot. Filters from the global flags
//! arrive as a [`FilterState`].

use anyhow::{anyhow, bail, Result};
use serde::Serialize;
use serde_json::{Map, Value};
use std::sync::Arc;

use sensemaker_core::aggregate::{self, RatingRow, RatingSort, SortDirection, SortKey};
use sensemaker_core::citation;
use sensemaker_core::filter::{FilterAction, FilterState};
use sensemaker_core::models::Question;
use sensemaker_core::pointer::{self, Pointer, ViewKind};
use sensemaker_core::snapshot::Snapshot;
use sensemaker_core::store::RecordStore;
use sensemaker_core::tally;

use crate::annotate::{self, TagChange};
use crate::config::Config;
use crate::ingest::IngestReport;
use crate::insight;
use crate::progress::FetchProgressReporter;
use crate::report;
use crate::snapshot::load_snapshot;
use crate::store::open_store;

pub struct Session {
    pub config: Config,
    pub store: Arc<dyn RecordStore>,
    pub snapshot: Snapshot,
    pub report: IngestReport,
}

impl Session {
    /// Open the configured store and load a snapshot from it.
    pub async fn open(config: Config, progress: &dyn FetchProgressReporter) -> Result<Self> {
        let store = open_store(&config)?;
        Self::with_store(config, store, progress).await
    }

    pub async fn with_store(
        config: Config,
        store: Arc<dyn RecordStore>,
        progress: &dyn FetchProgressReporter,
    ) -> Result<Self> {
        let (snapshot, report) = load_snapshot(store.as_ref(), &config, progress).await?;
        Ok(Self {
            config,
            store,
            snapshot,
            report,
        })
    }

    /// Accept either a comment's record id or its survey handle.
    pub fn resolve_response_id(&self, id_or_handle: &str) -> Result<String> {
        self.snapshot
            .responses
            .iter()
            .find(|r| r.id == id_or_handle)
            .or_else(|| self.snapshot.responses.iter().find(|r| r.handle == id_or_handle))
            .map(|r| r.id.clone())
            .ok_or_else(|| anyhow!("unknown comment: {}", id_or_handle))
    }
}

fn print_json<T: Serialize + ?Sized>(value: &T) -> Result<()> {
    println!("{}", serde_json::to_string_pretty(value)?);
    Ok(())
}

pub fn run_check(session: &Session, json: bool) -> Result<()> {
    if json {
        return print_json(&serde_json::json!({
            "departments": session.snapshot.departments.len(),
            "sensemakers": session.snapshot.sensemakers.len(),
            "tags": session.snapshot.catalog.len(),
            "questions": session.snapshot.questions.len(),
            "comments": session.snapshot.responses.len(),
            "survey_rows": session.snapshot.rows.len(),
            "insights": session.snapshot.insights.len(),
            "issues": session.report.issues,
        }));
    }
    print!("{}", report::format_check(&session.snapshot, &session.report));
    Ok(())
}

/// Heatmap ordering from `--sort`/`--desc`, falling back to the sort the
/// filter state carries (e.g. from a restored pointer).
pub fn rating_sort(
    state: &FilterState,
    sort: Option<&str>,
    desc: bool,
) -> Result<Option<RatingSort>> {
    let column = sort.or(state.sort_column.as_deref());
    let Some(column) = column else {
        return Ok(None);
    };
    let key: SortKey = column.parse().map_err(|e: String| anyhow!(e))?;
    let direction = if desc {
        SortDirection::Desc
    } else if sort.is_some() {
        SortDirection::Asc
    } else {
        state
            .sort_direction
            .as_deref()
            .map(str::parse::<SortDirection>)
            .transpose()
            .map_err(|e: String| anyhow!(e))?
            .unwrap_or_default()
    };
    Ok(Some(RatingSort { key, direction }))
}

/// Rating rows for the heatmap, with configured questions left out.
pub fn heatmap_rows(session: &Session, state: &FilterState, sort: Option<RatingSort>) -> Vec<RatingRow> {
    let excluded = &session.config.heatmap.excluded_questions;
    let questions: Vec<Question> = session
        .snapshot
        .questions
        .iter()
        .filter(|q| !excluded.contains(&q.id))
        .cloned()
        .collect();
    let rows = session.snapshot.filtered_rows(state);
    aggregate::rating_histogram(rows.iter().copied(), &questions, sort)
}

pub fn run_heatmap(
    session: &Session,
    state: &FilterState,
    sort: Option<&str>,
    desc: bool,
    json: bool,
) -> Result<()> {
    let sort = rating_sort(state, sort, desc)?;
    let rows = heatmap_rows(session, state, sort);
    if json {
        return print_json(&rows);
    }
    print!("{}", report::format_heatmap(&rows));
    Ok(())
}

pub fn run_themes(session: &Session, state: &FilterState, json: bool) -> Result<()> {
    let responses = session.snapshot.filtered_responses(state);
    let rows = aggregate::theme_histogram(
        responses.iter().copied(),
        &session.snapshot.questions,
        &session.snapshot.sentiment_keys,
    );
    if json {
        return print_json(&rows);
    }
    print!("{}", report::format_themes(&rows));
    Ok(())
}

pub fn run_priorities(session: &Session, state: &FilterState, json: bool) -> Result<()> {
    let rows = tally::priorities_histogram(session.snapshot.filtered_rows(state));
    if json {
        return print_json(&rows);
    }
    print!("{}", report::format_tally("PRIORITY", &rows));
    Ok(())
}

pub fn run_stipend(session: &Session, state: &FilterState, json: bool) -> Result<()> {
    let rows = tally::stipend_histogram(session.snapshot.filtered_rows(state));
    if json {
        return print_json(&rows);
    }
    print!("{}", report::format_tally("SALARY RANGE", &rows));
    Ok(())
}

pub fn run_comments(
    session: &Session,
    state: &FilterState,
    limit: Option<usize>,
    json: bool,
) -> Result<()> {
    let mut responses = session.snapshot.filtered_responses(state);
    if let Some(limit) = limit {
        responses.truncate(limit);
    }
    if json {
        return print_json(&responses);
    }
    print!("{}", report::format_comments(&responses, &session.snapshot));
    Ok(())
}

pub async fn run_tag(session: &mut Session, comment: &str, change: &TagChange) -> Result<()> {
    let id = session.resolve_response_id(comment)?;
    let keys = annotate::apply_tag_change(
        session.store.as_ref(),
        &session.config.tables.comments,
        &mut session.snapshot,
        &id,
        change,
    )
    .await?;
    println!("{} tags: [{}]", id, keys.join(", "));
    Ok(())
}

pub fn run_insight_list(session: &Session, json: bool) -> Result<()> {
    if json {
        return print_json(&session.snapshot.insights);
    }
    print!("{}", report::format_insight_list(&session.snapshot.insights));
    Ok(())
}

pub fn run_insight_show(session: &Session, id: &str, expanded: bool, json: bool) -> Result<()> {
    let snapshot = &session.snapshot;
    let insight = snapshot
        .insight(id)
        .ok_or_else(|| anyhow!("unknown insight: {}", id))?;
    let tokens = citation::parse(&insight.body);
    let rendered = citation::render(
        &tokens,
        |rid| snapshot.response(rid),
        &snapshot.sentiment_keys,
        session.config.citations.max_len,
        expanded,
    );
    if json {
        return print_json(&serde_json::json!({
            "insight": insight,
            "tokens": tokens,
            "rendered": rendered,
        }));
    }
    print!("{}", report::format_insight(insight, &rendered, snapshot));
    Ok(())
}

pub async fn run_insight_cite(
    session: &mut Session,
    insight_id: &str,
    comment: &str,
    at: Option<usize>,
) -> Result<()> {
    let response_id = session.resolve_response_id(comment)?;
    let saved = insight::cite_response(
        session.store.as_ref(),
        &session.config.tables.insights,
        &mut session.snapshot,
        insight_id,
        &response_id,
        at,
        session.config.citations.max_len,
    )
    .await?;
    println!("{}", saved.body);
    Ok(())
}

/// Parse `--set` values: JSON when it parses, a plain string otherwise.
pub fn view_specific(pairs: &[(String, String)]) -> Map<String, Value> {
    pairs
        .iter()
        .map(|(k, v)| {
            let value = serde_json::from_str(v).unwrap_or_else(|_| Value::String(v.clone()));
            (k.clone(), value)
        })
        .collect()
}

/// Capture the view `view` under `state`, stamped with the local time.
pub fn capture_pointer(
    state: &FilterState,
    view: ViewKind,
    pairs: &[(String, String)],
) -> Result<Pointer> {
    let mut extra = view_specific(pairs);
    extra
        .entry("timestamp".to_string())
        .or_insert_with(|| Value::String(chrono::Local::now().to_rfc3339()));
    Ok(pointer::capture_state(view, state, &extra)?)
}

pub fn run_pointer_restore(state: &FilterState, json: &str) -> Result<()> {
    let pointer: Pointer =
        serde_json::from_str(json).map_err(|e| anyhow!("invalid pointer: {}", e))?;
    let restored = state.apply(FilterAction::Restore(pointer));
    print_json(&restored)
}

/// Build the filter state from the global flags: an optional pointer
/// first, then explicit department and search overrides.
pub fn initial_state(
    pointer: Option<&str>,
    department: Option<String>,
    search: Option<String>,
) -> Result<FilterState> {
    let mut state = FilterState::default();
    if let Some(json) = pointer {
        let pointer: Pointer =
            serde_json::from_str(json).map_err(|e| anyhow!("invalid --pointer: {}", e))?;
        state = state.apply(FilterAction::Restore(pointer));
    }
    if let Some(d) = department {
        state = state.apply(FilterAction::SetDepartment(d));
    }
    if let Some(s) = search {
        state = state.apply(FilterAction::SetSearch(s));
    }
    Ok(state)
}

/// Comment-list filters from `sense comments` flags.
pub fn comment_filters(
    state: FilterState,
    tag: Option<String>,
    insight: Option<String>,
    issue: Option<String>,
    economic: Option<String>,
) -> Result<FilterState> {
    let mut state = state;
    if let Some(t) = tag {
        state = state.apply(FilterAction::SetTag(t));
    }
    if let Some(i) = insight {
        state = state.apply(FilterAction::SetInsight(i));
    }
    if let Some(i) = issue {
        state = state.apply(FilterAction::SetIssue(i));
    }
    if let Some(e) = economic {
        match e.as_str() {
            "All" | "Economic" | "Non-Economic" | "Unknown" => {}
            other => bail!(
                "unknown economic filter '{}'. Use All, Economic, Non-Economic, or Unknown.",
                other
            ),
        }
        state = state.apply(FilterAction::SetEconomic(e));
    }
    Ok(state.apply(FilterAction::SetTab(ViewKind::Comments)))
}
