//! Core data models shared by the aggregation, citation, and pointer
//! modules.
//!
//! These are the strongly-typed forms of the records held by the external
//! record store. The application's ingestion step produces them exactly
//! once per fetch; nothing in this crate reads loosely-typed fields.

use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

use crate::pointer::Pointer;

/// A department that survey rows and comments link to.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Department {
    pub id: String,
    pub name: String,
}

/// An analyst who authors insights.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Sensemaker {
    pub id: String,
    pub name: String,
}

/// How a question is answered.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum QuestionKind {
    /// Answered with a 1–3 rating.
    Quantitative,
    /// Answered with free text.
    Qualitative,
    Other,
}

impl QuestionKind {
    /// Parse a store value case-insensitively. Anything unrecognized is
    /// [`QuestionKind::Other`].
    pub fn parse(raw: &str) -> Self {
        match raw.trim().to_lowercase().as_str() {
            "quantitative" => QuestionKind::Quantitative,
            "qualitative" => QuestionKind::Qualitative,
            _ => QuestionKind::Other,
        }
    }
}

/// Economic classification of a question's issue.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Classification {
    Economic,
    #[serde(rename = "Non-Economic")]
    NonEconomic,
    Unknown,
}

impl Classification {
    pub fn parse(raw: &str) -> Self {
        match raw.trim() {
            "Economic" => Classification::Economic,
            "Non-Economic" | "NonEconomic" => Classification::NonEconomic,
            _ => Classification::Unknown,
        }
    }

    /// Label used by the economic filter.
    pub fn label(&self) -> &'static str {
        match self {
            Classification::Economic => "Economic",
            Classification::NonEconomic => "Non-Economic",
            Classification::Unknown => "Unknown",
        }
    }
}

/// A survey question definition. Immutable within a session.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Question {
    pub id: String,
    pub display_label: String,
    /// Column under which survey rows carry this question's rating.
    /// Falls back to `id` when the store has no column header.
    pub column_header: Option<String>,
    pub kind: QuestionKind,
    pub classification: Classification,
}

impl Question {
    pub fn rating_column(&self) -> &str {
        self.column_header.as_deref().unwrap_or(&self.id)
    }
}

/// Name/email pair identifying a respondent, when the store has one.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct RespondentHandle {
    pub name: Option<String>,
    pub email: Option<String>,
}

impl RespondentHandle {
    pub fn is_empty(&self) -> bool {
        self.name.is_none() && self.email.is_none()
    }
}

/// One respondent's free-text answer to one question.
///
/// `id` is the store record id and is what citations refer to. `handle` is
/// the human-readable unique label the survey import assigned.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Response {
    pub id: String,
    pub handle: String,
    pub text: String,
    pub question_id: String,
    /// The comment's own `Question Name`, used as its label when
    /// `question_id` is not in the question catalog.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub question_name: Option<String>,
    pub department_ids: Vec<String>,
    /// Ordered by selection; never contains duplicates.
    pub tag_keys: Vec<String>,
    pub respondent: Option<RespondentHandle>,
}

impl Response {
    pub fn has_tag(&self, key: &str) -> bool {
        self.tag_keys.iter().any(|k| k == key)
    }

    /// Display label of the question this answers: the catalog label when
    /// `question` is known, else the comment's question name, else the
    /// raw question id.
    pub fn question_label<'a>(&'a self, question: Option<&'a Question>) -> &'a str {
        question
            .map(|q| q.display_label.as_str())
            .or(self.question_name.as_deref())
            .unwrap_or(self.question_id.as_str())
    }
}

/// A raw rating cell as it arrived from the store.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum RatingValue {
    Missing,
    Number(f64),
    Text(String),
}

impl From<&serde_json::Value> for RatingValue {
    fn from(value: &serde_json::Value) -> Self {
        match value {
            serde_json::Value::Null => RatingValue::Missing,
            serde_json::Value::Number(n) => n
                .as_f64()
                .map(RatingValue::Number)
                .unwrap_or(RatingValue::Missing),
            serde_json::Value::String(s) => RatingValue::Text(s.clone()),
            other => RatingValue::Text(other.to_string()),
        }
    }
}

impl From<&str> for RatingValue {
    fn from(value: &str) -> Self {
        RatingValue::Text(value.to_string())
    }
}

impl From<f64> for RatingValue {
    fn from(value: f64) -> Self {
        RatingValue::Number(value)
    }
}

/// One row of the quantitative survey table: a single respondent's
/// ratings, priorities, and stipend answer.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct SurveyRow {
    pub id: String,
    /// Linked department ids, or plain department names for rows imported
    /// without links.
    pub departments: Vec<String>,
    pub respondent: Option<RespondentHandle>,
    /// Raw ratings keyed by question column header.
    pub ratings: BTreeMap<String, RatingValue>,
    pub priorities: Vec<String>,
    pub salary_range: Option<String>,
    /// Every string or number field of the source record, for free-text
    /// search.
    pub search_fields: Vec<String>,
}

impl SurveyRow {
    pub fn rating(&self, column: &str) -> Option<&RatingValue> {
        self.ratings.get(column)
    }
}

/// An analyst-authored note. `id` is `None` until the store assigns one.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Insight {
    pub id: Option<String>,
    pub name: Option<String>,
    pub title: String,
    /// Free text with embedded `[[display|responseId]]` citations.
    pub body: String,
    pub cited_response_ids: Vec<String>,
    pub department_ids: Vec<String>,
    pub sensemaker_ids: Vec<String>,
    pub pointers: Vec<Pointer>,
}

impl Insight {
    pub fn cites(&self, response_id: &str) -> bool {
        self.cited_response_ids.iter().any(|id| id == response_id)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn question_kind_is_case_insensitive() {
        assert_eq!(QuestionKind::parse("Quantitative"), QuestionKind::Quantitative);
        assert_eq!(QuestionKind::parse(" QUALITATIVE "), QuestionKind::Qualitative);
        assert_eq!(QuestionKind::parse("open"), QuestionKind::Other);
    }

    #[test]
    fn classification_labels() {
        assert_eq!(Classification::parse("Economic"), Classification::Economic);
        assert_eq!(Classification::parse("Non-Economic"), Classification::NonEconomic);
        assert_eq!(Classification::parse(""), Classification::Unknown);
        assert_eq!(Classification::NonEconomic.label(), "Non-Economic");
    }

    #[test]
    fn rating_column_falls_back_to_id() {
        let q = Question {
            id: "quant1".into(),
            display_label: "Pay".into(),
            column_header: None,
            kind: QuestionKind::Quantitative,
            classification: Classification::Economic,
        };
        assert_eq!(q.rating_column(), "quant1");
    }

    #[test]
    fn rating_value_from_json() {
        assert_eq!(RatingValue::from(&serde_json::json!(null)), RatingValue::Missing);
        assert_eq!(RatingValue::from(&serde_json::json!(2)), RatingValue::Number(2.0));
        assert_eq!(
            RatingValue::from(&serde_json::json!("2.0")),
            RatingValue::Text("2.0".into())
        );
    }
}
