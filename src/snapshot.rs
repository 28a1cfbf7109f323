//! Snapshot loading: list every table concurrently, then normalize.

use anyhow::{Context, Result};
use tracing::info;

use sensemaker_core::snapshot::Snapshot;
use sensemaker_core::store::{Record, RecordStore};

use crate::config::Config;
use crate::ingest::{self, IngestReport, RawTables};
use crate::progress::{FetchProgressEvent, FetchProgressReporter};

async fn fetch(
    store: &dyn RecordStore,
    table: &str,
    progress: &dyn FetchProgressReporter,
) -> Result<Vec<Record>> {
    progress.report(FetchProgressEvent::Fetching {
        table: table.to_string(),
    });
    let records = store
        .list_records(table)
        .await
        .with_context(|| format!("Failed to list table '{}'", table))?;
    progress.report(FetchProgressEvent::Fetched {
        table: table.to_string(),
        records: records.len() as u64,
    });
    Ok(records)
}

/// Fetch every configured table and build a snapshot. Any table failing to
/// list fails the load; per-record problems land in the report instead.
pub async fn load_snapshot(
    store: &dyn RecordStore,
    config: &Config,
    progress: &dyn FetchProgressReporter,
) -> Result<(Snapshot, IngestReport)> {
    let tables = &config.tables;
    let sensemakers = async {
        match &tables.sensemakers {
            Some(table) => fetch(store, table, progress).await,
            None => Ok(Vec::new()),
        }
    };
    let (departments, sensemakers, tags, questions, comments, survey, insights) = tokio::try_join!(
        fetch(store, &tables.departments, progress),
        sensemakers,
        fetch(store, &tables.tags, progress),
        fetch(store, &tables.questions, progress),
        fetch(store, &tables.comments, progress),
        fetch(store, &tables.survey, progress),
        fetch(store, &tables.insights, progress),
    )?;

    let raw = RawTables {
        departments,
        sensemakers,
        tags,
        questions,
        comments,
        survey,
        insights,
    };
    let (snapshot, report) = ingest::ingest(&raw, config);
    info!(
        responses = snapshot.responses.len(),
        rows = snapshot.rows.len(),
        insights = snapshot.insights.len(),
        issues = report.issues.len(),
        "snapshot loaded"
    );
    Ok((snapshot, report))
}
