//! One consistent, typed copy of every table the dashboard reads.
//!
//! A [`Snapshot`] is produced by a single fetch-and-ingest pass and is
//! read-only afterwards; tag edits and insight saves produce patched
//! copies through [`Snapshot::replace_response_tags`] and
//! [`Snapshot::upsert_insight`].

use serde::Serialize;
use std::collections::HashMap;

use crate::filter::{self, FilterState, ResponseFilterContext};
use crate::models::{Department, Insight, Question, Response, Sensemaker, SurveyRow};
use crate::tags::{SentimentKeys, TagCatalog};

#[derive(Debug, Clone, Default, Serialize)]
pub struct Snapshot {
    pub departments: Vec<Department>,
    pub sensemakers: Vec<Sensemaker>,
    pub questions: Vec<Question>,
    #[serde(skip)]
    pub catalog: TagCatalog,
    pub sentiment_keys: SentimentKeys,
    pub responses: Vec<Response>,
    pub rows: Vec<SurveyRow>,
    pub insights: Vec<Insight>,
}

impl Snapshot {
    /// Department id → name.
    pub fn department_names(&self) -> HashMap<String, String> {
        self.departments
            .iter()
            .map(|d| (d.id.clone(), d.name.clone()))
            .collect()
    }

    pub fn response(&self, id: &str) -> Option<&Response> {
        self.responses.iter().find(|r| r.id == id)
    }

    pub fn question(&self, id: &str) -> Option<&Question> {
        self.questions.iter().find(|q| q.id == id)
    }

    pub fn insight(&self, id: &str) -> Option<&Insight> {
        self.insights.iter().find(|i| i.id.as_deref() == Some(id))
    }

    pub fn filtered_rows(&self, state: &FilterState) -> Vec<&SurveyRow> {
        filter::filter_rows(&self.rows, state, &self.department_names())
    }

    pub fn filtered_responses(&self, state: &FilterState) -> Vec<&Response> {
        let names = self.department_names();
        let ctx = ResponseFilterContext {
            department_names: &names,
            questions: &self.questions,
            insights: &self.insights,
        };
        filter::filter_responses(&self.responses, state, &ctx)
    }

    /// Set one response's tags. Returns the previous keys, or `None` when
    /// the response is unknown.
    pub fn replace_response_tags(&mut self, id: &str, keys: Vec<String>) -> Option<Vec<String>> {
        self.responses
            .iter_mut()
            .find(|r| r.id == id)
            .map(|r| std::mem::replace(&mut r.tag_keys, keys))
    }

    /// Replace the insight with the same id, or append it.
    pub fn upsert_insight(&mut self, insight: Insight) {
        match insight
            .id
            .as_deref()
            .and_then(|id| self.insights.iter().position(|i| i.id.as_deref() == Some(id)))
        {
            Some(pos) => self.insights[pos] = insight,
            None => self.insights.push(insight),
        }
    }
}
