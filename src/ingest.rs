//! Record normalization.
//!
//! Turns the loosely-typed records of each store table into the typed
//! models of `sensemaker_core` exactly once per fetch. Records that cannot
//! be used are skipped and reported as [`IngestIssue`]s; nothing here
//! fails the load as a whole.
//!
//! Field names follow the survey base's column names (`Response Text`,
//! `Column Header`, `Top Three Priorities`, ...). Where a base has used
//! more than one name for a column over time, the first non-blank value
//! wins.

use serde::Serialize;
use serde_json::Value;
use std::collections::HashMap;
use thiserror::Error;
use tracing::warn;

use sensemaker_core::models::{
    Classification, Department, Insight, Question, QuestionKind, RatingValue, RespondentHandle,
    Response, Sensemaker, SurveyRow,
};
use sensemaker_core::pointer::Pointer;
use sensemaker_core::snapshot::Snapshot;
use sensemaker_core::store::Record;
use sensemaker_core::tags::{TagCatalog, TagRecord};

use crate::config::Config;

/// A per-record problem found during normalization.
#[derive(Debug, Clone, PartialEq, Eq, Error, Serialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum IngestIssue {
    #[error("{table}/{record_id}: missing required field '{field}'")]
    MissingField {
        table: String,
        record_id: String,
        field: String,
    },
    #[error("{table}/{record_id}: skipped tag: {reason}")]
    RejectedTag {
        table: String,
        record_id: String,
        reason: String,
    },
    #[error("{table}/{record_id}: unreadable view pointers: {reason}")]
    InvalidPointers {
        table: String,
        record_id: String,
        reason: String,
    },
    #[error("{table}/{record_id}: duplicate handle '{handle}'")]
    DuplicateHandle {
        table: String,
        record_id: String,
        handle: String,
    },
}

/// Every issue found during one ingestion pass.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct IngestReport {
    pub issues: Vec<IngestIssue>,
}

impl IngestReport {
    fn push(&mut self, issue: IngestIssue) {
        warn!(%issue, "ingest issue");
        self.issues.push(issue);
    }

    pub fn is_clean(&self) -> bool {
        self.issues.is_empty()
    }
}

/// Raw records of every table, as listed from the store.
#[derive(Debug, Clone, Default)]
pub struct RawTables {
    pub departments: Vec<Record>,
    pub sensemakers: Vec<Record>,
    pub tags: Vec<Record>,
    pub questions: Vec<Record>,
    pub comments: Vec<Record>,
    pub survey: Vec<Record>,
    pub insights: Vec<Record>,
}

/// A string, or the text form of a number.
fn scalar_text(value: &Value) -> Option<String> {
    match value {
        Value::String(s) if !s.trim().is_empty() => Some(s.trim().to_string()),
        Value::Number(n) => Some(n.to_string()),
        _ => None,
    }
}

/// A string, or an object's `name`.
fn named_text(value: &Value) -> Option<String> {
    match value {
        Value::Object(map) => map.get("name").and_then(scalar_text),
        other => scalar_text(other),
    }
}

/// First of `names` that holds usable text.
fn text_field(record: &Record, names: &[&str]) -> Option<String> {
    names
        .iter()
        .find_map(|n| record.field(n).and_then(named_text))
}

/// A link field: a single value or an array of values.
fn list_field(record: &Record, names: &[&str]) -> Vec<String> {
    for name in names {
        let values: Vec<String> = match record.field(name) {
            Some(Value::Array(items)) => items.iter().filter_map(named_text).collect(),
            Some(other) => named_text(other).into_iter().collect(),
            None => Vec::new(),
        };
        if !values.is_empty() {
            return values;
        }
    }
    Vec::new()
}

fn respondent(record: &Record) -> Option<RespondentHandle> {
    let handle = RespondentHandle {
        name: text_field(record, &["Name"]),
        email: text_field(record, &["Email"]),
    };
    (!handle.is_empty()).then_some(handle)
}

fn missing(table: &str, record: &Record, field: &str) -> IngestIssue {
    IngestIssue::MissingField {
        table: table.to_string(),
        record_id: record.id.clone(),
        field: field.to_string(),
    }
}

pub fn departments(records: &[Record]) -> Vec<Department> {
    records
        .iter()
        .map(|r| Department {
            id: r.id.clone(),
            name: text_field(r, &["Name", "Department"]).unwrap_or_else(|| "Unknown".to_string()),
        })
        .collect()
}

pub fn sensemakers(records: &[Record]) -> Vec<Sensemaker> {
    records
        .iter()
        .map(|r| Sensemaker {
            id: r.id.clone(),
            name: text_field(r, &["Full Name"]).unwrap_or_else(|| "Unknown".to_string()),
        })
        .collect()
}

pub fn tag_catalog(table: &str, records: &[Record], report: &mut IngestReport) -> TagCatalog {
    let mut catalog = TagCatalog::default();
    for record in records {
        let Some(title) = text_field(record, &["Name", "name", "Tag"]) else {
            report.push(missing(table, record, "Name"));
            continue;
        };
        let emoji = text_field(record, &["Emoji"]);
        if let Err(e) = catalog.insert(TagRecord::new(&record.id, &title, emoji.as_deref())) {
            report.push(IngestIssue::RejectedTag {
                table: table.to_string(),
                record_id: record.id.clone(),
                reason: e.to_string(),
            });
        }
    }
    catalog
}

pub fn questions(
    table: &str,
    records: &[Record],
    labels: &HashMap<String, String>,
    report: &mut IngestReport,
) -> Vec<Question> {
    let mut out = Vec::new();
    for record in records {
        let Some(id) = text_field(record, &["ID"]) else {
            report.push(missing(table, record, "ID"));
            continue;
        };
        let nickname = text_field(record, &["Nickname"]);
        let display_label = nickname
            .as_ref()
            .and_then(|n| labels.get(n))
            .or_else(|| labels.get(&id))
            .cloned()
            .or(nickname)
            .unwrap_or_else(|| id.clone());
        out.push(Question {
            display_label,
            column_header: text_field(record, &["Column Header"]),
            kind: text_field(record, &["Type"])
                .map(|t| QuestionKind::parse(&t))
                .unwrap_or(QuestionKind::Other),
            classification: text_field(record, &["Economic"])
                .map(|c| Classification::parse(&c))
                .unwrap_or(Classification::Unknown),
            id,
        });
    }
    out
}

pub fn responses(
    table: &str,
    records: &[Record],
    catalog: &TagCatalog,
    labels: &HashMap<String, String>,
    report: &mut IngestReport,
) -> Vec<Response> {
    let mut seen: HashMap<String, String> = HashMap::new();
    let mut out = Vec::new();
    for record in records {
        let Some(handle) = text_field(record, &["ID"]) else {
            report.push(missing(table, record, "ID"));
            continue;
        };
        let Some(text) = text_field(record, &["Response Text"]) else {
            report.push(missing(table, record, "Response Text"));
            continue;
        };
        if seen.insert(handle.clone(), record.id.clone()).is_some() {
            report.push(IngestIssue::DuplicateHandle {
                table: table.to_string(),
                record_id: record.id.clone(),
                handle: handle.clone(),
            });
        }
        let question_name = list_field(record, &["Question Name"])
            .into_iter()
            .next()
            .map(|n| labels.get(&n).cloned().unwrap_or(n));
        out.push(Response {
            id: record.id.clone(),
            handle,
            text,
            question_id: list_field(record, &["Question", "Question Name"])
                .into_iter()
                .next()
                .unwrap_or_default(),
            question_name,
            department_ids: list_field(record, &["Department"]),
            tag_keys: catalog.decode(&list_field(record, &["Tags"])),
            respondent: respondent(record),
        });
    }
    out
}

fn search_fields(record: &Record) -> Vec<String> {
    let mut out = Vec::new();
    for value in record.fields.values() {
        match value {
            Value::Array(items) => out.extend(items.iter().filter_map(named_text)),
            other => out.extend(named_text(other)),
        }
    }
    out
}

pub fn survey_rows(records: &[Record], questions: &[Question]) -> Vec<SurveyRow> {
    records
        .iter()
        .map(|record| {
            let ratings = questions
                .iter()
                .filter(|q| q.kind == QuestionKind::Quantitative)
                .filter_map(|q| {
                    let column = q.rating_column();
                    record
                        .field(column)
                        .map(|v| (column.to_string(), RatingValue::from(v)))
                })
                .collect();
            SurveyRow {
                id: record.id.clone(),
                departments: list_field(record, &["Department (from Notes)", "Department"]),
                respondent: respondent(record),
                ratings,
                priorities: list_field(record, &["Top Three Priorities", "Priorities"]),
                salary_range: text_field(record, &["Salary increase range"]),
                search_fields: search_fields(record),
            }
        })
        .collect()
}

/// Normalize one insight record. Unreadable pointers are reported and
/// dropped; the insight itself is kept.
pub fn insight(table: &str, record: &Record, report: &mut IngestReport) -> Insight {
    let pointers = match record.field("Snapshots").and_then(Value::as_str) {
        Some(json) => Pointer::parse_list(json).unwrap_or_else(|e| {
            report.push(IngestIssue::InvalidPointers {
                table: table.to_string(),
                record_id: record.id.clone(),
                reason: e.to_string(),
            });
            Vec::new()
        }),
        None => Vec::new(),
    };
    Insight {
        id: Some(record.id.clone()),
        name: text_field(record, &["Name"]),
        title: text_field(record, &["Title"]).unwrap_or_default(),
        body: record
            .field("Notes")
            .and_then(Value::as_str)
            .unwrap_or_default()
            .to_string(),
        cited_response_ids: list_field(record, &["Comments"]),
        department_ids: list_field(record, &["Departments"]),
        sensemaker_ids: list_field(record, &["Sensemakers"]),
        pointers,
    }
}

/// Build a snapshot from every table.
pub fn ingest(raw: &RawTables, config: &Config) -> (Snapshot, IngestReport) {
    let mut report = IngestReport::default();
    let tables = &config.tables;

    let catalog = tag_catalog(&tables.tags, &raw.tags, &mut report);
    let questions = questions(&tables.questions, &raw.questions, &config.labels, &mut report);
    let responses = responses(
        &tables.comments,
        &raw.comments,
        &catalog,
        &config.labels,
        &mut report,
    );
    let rows = survey_rows(&raw.survey, &questions);
    let insights = raw
        .insights
        .iter()
        .map(|r| insight(&tables.insights, r, &mut report))
        .collect();

    let snapshot = Snapshot {
        departments: departments(&raw.departments),
        sensemakers: sensemakers(&raw.sensemakers),
        questions,
        catalog,
        sentiment_keys: config.tags.sentiment_keys(),
        responses,
        rows,
        insights,
    };
    (snapshot, report)
}
