//! Explorer filter state and the filters it drives.
//!
//! [`FilterState`] is an immutable value; every change goes through
//! [`FilterState::apply`] with a [`FilterAction`], which returns the next
//! state. The row and response filters are pure functions of the state and
//! the current snapshot.

use serde::Serialize;
use serde_json::{Map, Value};
use std::collections::{BTreeMap, HashMap, HashSet};

use crate::models::{Insight, Question, Response, SurveyRow};
use crate::pointer::{self, Pointer, ViewKind};

/// Value of every selection filter that matches everything.
pub const ALL: &str = "All";

/// Tag filter values understood by [`filter_responses`].
pub const TAG_UNTAGGED: &str = "untagged";
/// Insight filter values understood by [`filter_responses`]; any other
/// value is taken as an insight id.
pub const INSIGHT_CITED: &str = "cited";
pub const INSIGHT_UNCITED: &str = "uncited";

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct FilterState {
    pub active_tab: ViewKind,
    pub department: String,
    pub search_term: String,
    /// Insight selection of the insights panel.
    pub insight_filter: String,
    /// Question display label, or [`ALL`].
    pub selected_issue: String,
    /// Tag key, [`TAG_UNTAGGED`], or [`ALL`].
    pub selected_tag: String,
    /// Classification label, or [`ALL`].
    pub selected_economic: String,
    /// [`INSIGHT_CITED`], [`INSIGHT_UNCITED`], an insight id, or [`ALL`].
    pub selected_insight: String,
    pub selected_respondent: Option<String>,
    pub sort_column: Option<String>,
    pub sort_direction: Option<String>,
    pub page_number: Option<u32>,
    /// View-specific pointer keys this state does not model.
    pub extras: BTreeMap<String, Value>,
}

impl Default for FilterState {
    fn default() -> Self {
        Self {
            active_tab: ViewKind::Heatmap,
            department: ALL.to_string(),
            search_term: String::new(),
            insight_filter: ALL.to_string(),
            selected_issue: ALL.to_string(),
            selected_tag: ALL.to_string(),
            selected_economic: ALL.to_string(),
            selected_insight: ALL.to_string(),
            selected_respondent: None,
            sort_column: None,
            sort_direction: None,
            page_number: None,
            extras: BTreeMap::new(),
        }
    }
}

/// A state transition.
#[derive(Debug, Clone, PartialEq)]
pub enum FilterAction {
    SetTab(ViewKind),
    SetDepartment(String),
    SetSearch(String),
    SetInsightFilter(String),
    SetIssue(String),
    SetTag(String),
    SetEconomic(String),
    SetInsight(String),
    SetRespondent(Option<String>),
    SortBy {
        column: String,
        direction: String,
    },
    SetPage(u32),
    /// Apply a saved pointer as a partial patch.
    Restore(Pointer),
    Reset,
}

impl FilterState {
    /// Return the state after `action`.
    pub fn apply(&self, action: FilterAction) -> FilterState {
        let mut next = self.clone();
        match action {
            FilterAction::SetTab(tab) => next.active_tab = tab,
            FilterAction::SetDepartment(d) => next.department = d,
            FilterAction::SetSearch(s) => next.search_term = s,
            FilterAction::SetInsightFilter(f) => next.insight_filter = f,
            FilterAction::SetIssue(i) => next.selected_issue = i,
            FilterAction::SetTag(t) => next.selected_tag = t,
            FilterAction::SetEconomic(e) => next.selected_economic = e,
            FilterAction::SetInsight(i) => next.selected_insight = i,
            FilterAction::SetRespondent(r) => next.selected_respondent = r,
            FilterAction::SortBy { column, direction } => {
                next.sort_column = Some(column);
                next.sort_direction = Some(direction);
            }
            FilterAction::SetPage(p) => next.page_number = Some(p),
            FilterAction::Restore(p) => next = pointer::restore(&p, self),
            FilterAction::Reset => next = FilterState::default(),
        }
        next
    }

    /// The filter selections, keyed as pointers persist them.
    pub fn active_filters(&self) -> Map<String, Value> {
        let mut map = Map::new();
        for (key, value) in [
            (pointer::KEY_DEPARTMENT, &self.department),
            (pointer::KEY_SEARCH_TERM, &self.search_term),
            (pointer::KEY_INSIGHT_FILTER, &self.insight_filter),
            (pointer::KEY_SELECTED_ECONOMIC, &self.selected_economic),
            (pointer::KEY_SELECTED_ISSUE, &self.selected_issue),
            (pointer::KEY_SELECTED_TAG, &self.selected_tag),
            (pointer::KEY_SELECTED_INSIGHT, &self.selected_insight),
        ] {
            map.insert(key.to_string(), Value::String(value.clone()));
        }
        if let Some(column) = &self.sort_column {
            map.insert(pointer::KEY_SORT_COLUMN.to_string(), Value::String(column.clone()));
        }
        if let Some(direction) = &self.sort_direction {
            map.insert(
                pointer::KEY_SORT_DIRECTION.to_string(),
                Value::String(direction.clone()),
            );
        }
        if let Some(page) = self.page_number {
            map.insert(pointer::KEY_PAGE_NUMBER.to_string(), Value::from(page));
        }
        map
    }

    /// [`active_filters`](Self::active_filters) plus [`extras`](Self::extras).
    pub fn active_filters_with_extras(&self) -> Map<String, Value> {
        let mut map = self.active_filters();
        for (key, value) in &self.extras {
            map.insert(key.clone(), value.clone());
        }
        map
    }
}

fn matches_department(values: &[String], selected: &str, names: &HashMap<String, String>) -> bool {
    if selected == ALL {
        return true;
    }
    values.iter().any(|v| match names.get(v) {
        Some(name) => name == selected,
        None => v == selected,
    })
}

/// Survey rows matching the department and search filters. The search is a
/// case-insensitive substring match over every string or number field.
pub fn filter_rows<'a>(
    rows: &'a [SurveyRow],
    state: &FilterState,
    department_names: &HashMap<String, String>,
) -> Vec<&'a SurveyRow> {
    let needle = state.search_term.trim().to_lowercase();
    rows.iter()
        .filter(|row| matches_department(&row.departments, &state.department, department_names))
        .filter(|row| {
            needle.is_empty()
                || row
                    .search_fields
                    .iter()
                    .any(|f| f.to_lowercase().contains(&needle))
        })
        .collect()
}

/// Lookups [`filter_responses`] needs from the snapshot.
pub struct ResponseFilterContext<'a> {
    pub department_names: &'a HashMap<String, String>,
    pub questions: &'a [Question],
    pub insights: &'a [Insight],
}

/// Free-text responses matching every active filter: department, search
/// (response text only), issue label, tag, economic classification, and
/// insight citation.
pub fn filter_responses<'a>(
    responses: &'a [Response],
    state: &FilterState,
    ctx: &ResponseFilterContext<'_>,
) -> Vec<&'a Response> {
    let questions: HashMap<&str, &Question> =
        ctx.questions.iter().map(|q| (q.id.as_str(), q)).collect();
    let cited: HashSet<&str> = ctx
        .insights
        .iter()
        .flat_map(|i| i.cited_response_ids.iter().map(|s| s.as_str()))
        .collect();
    let needle = state.search_term.trim().to_lowercase();

    responses
        .iter()
        .filter(|r| matches_department(&r.department_ids, &state.department, ctx.department_names))
        .filter(|r| needle.is_empty() || r.text.to_lowercase().contains(&needle))
        .filter(|r| {
            if state.selected_issue == ALL {
                return true;
            }
            r.question_label(questions.get(r.question_id.as_str()).copied()) == state.selected_issue
        })
        .filter(|r| match state.selected_tag.as_str() {
            ALL => true,
            TAG_UNTAGGED => r.tag_keys.is_empty(),
            key => r.has_tag(key),
        })
        .filter(|r| {
            if state.selected_economic == ALL {
                return true;
            }
            questions
                .get(r.question_id.as_str())
                .map(|q| q.classification.label() == state.selected_economic)
                .unwrap_or(false)
        })
        .filter(|r| match state.selected_insight.as_str() {
            ALL => true,
            INSIGHT_CITED => cited.contains(r.id.as_str()),
            INSIGHT_UNCITED => !cited.contains(r.id.as_str()),
            insight_id => ctx
                .insights
                .iter()
                .any(|i| i.id.as_deref() == Some(insight_id) && i.cites(&r.id)),
        })
        .filter(|r| match &state.selected_respondent {
            None => true,
            Some(who) => r
                .respondent
                .as_ref()
                .map(|h| h.name.as_deref() == Some(who) || h.email.as_deref() == Some(who))
                .unwrap_or(false),
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::{Classification, QuestionKind, RespondentHandle};

    fn departments() -> HashMap<String, String> {
        let mut m = HashMap::new();
        m.insert("recEng".to_string(), "Engineering".to_string());
        m.insert("recHis".to_string(), "History".to_string());
        m
    }

    fn response(id: &str, q: &str, dept: &str, text: &str, tags: &[&str]) -> Response {
        Response {
            id: id.to_string(),
            handle: id.to_string(),
            text: text.to_string(),
            question_id: q.to_string(),
            question_name: None,
            department_ids: vec![dept.to_string()],
            tag_keys: tags.iter().map(|t| t.to_string()).collect(),
            respondent: None,
        }
    }

    fn questions() -> Vec<Question> {
        vec![
            Question {
                id: "open1".into(),
                display_label: "Equity".into(),
                column_header: None,
                kind: QuestionKind::Qualitative,
                classification: Classification::NonEconomic,
            },
            Question {
                id: "qual2".into(),
                display_label: "Pay".into(),
                column_header: None,
                kind: QuestionKind::Qualitative,
                classification: Classification::Economic,
            },
        ]
    }

    fn fixture() -> (Vec<Response>, Vec<Insight>) {
        let responses = vec![
            response("r1", "open1", "recEng", "Need better RENT support", &["plus"]),
            response("r2", "qual2", "recHis", "Wages are low", &["delta", "star"]),
            response("r3", "qual2", "recEng", "Raise pay", &[]),
        ];
        let insights = vec![Insight {
            id: Some("ins1".into()),
            cited_response_ids: vec!["r2".into()],
            ..Insight::default()
        }];
        (responses, insights)
    }

    fn ids(v: &[&Response]) -> Vec<String> {
        v.iter().map(|r| r.id.clone()).collect()
    }

    #[test]
    fn reducer_transitions() {
        let s = FilterState::default()
            .apply(FilterAction::SetDepartment("History".into()))
            .apply(FilterAction::SortBy {
                column: "average".into(),
                direction: "desc".into(),
            });
        assert_eq!(s.department, "History");
        assert_eq!(s.sort_column.as_deref(), Some("average"));
        assert_eq!(s.apply(FilterAction::Reset), FilterState::default());
    }

    #[test]
    fn reducer_restore_is_partial() {
        let p: Pointer = serde_json::from_value(serde_json::json!({
            "type": "comments", "selectedTag": "plus"
        }))
        .unwrap();
        let s = FilterState::default()
            .apply(FilterAction::SetSearch("rent".into()))
            .apply(FilterAction::Restore(p));
        assert_eq!(s.search_term, "rent");
        assert_eq!(s.selected_tag, "plus");
        assert_eq!(s.active_tab, ViewKind::Comments);
    }

    #[test]
    fn rows_by_department_and_search() {
        let rows = vec![
            SurveyRow {
                id: "a".into(),
                departments: vec!["recEng".into()],
                search_fields: vec!["Alice".into(), "42".into()],
                ..Default::default()
            },
            SurveyRow {
                id: "b".into(),
                departments: vec!["History".into()],
                search_fields: vec!["Bob".into()],
                ..Default::default()
            },
            SurveyRow {
                id: "c".into(),
                ..Default::default()
            },
        ];
        let depts = departments();
        let all = filter_rows(&rows, &FilterState::default(), &depts);
        assert_eq!(all.len(), 3);

        let hist = FilterState::default().apply(FilterAction::SetDepartment("History".into()));
        let got: Vec<&str> = filter_rows(&rows, &hist, &depts).iter().map(|r| r.id.as_str()).collect();
        assert_eq!(got, vec!["b"]);

        let search = FilterState::default().apply(FilterAction::SetSearch("ALI".into()));
        let got: Vec<&str> = filter_rows(&rows, &search, &depts).iter().map(|r| r.id.as_str()).collect();
        assert_eq!(got, vec!["a"]);
    }

    #[test]
    fn search_is_trimmed_for_rows_and_responses() {
        let rows = vec![SurveyRow {
            id: "a".into(),
            search_fields: vec!["Rent is high".into()],
            ..Default::default()
        }];
        let (responses, insights) = fixture();
        let depts = departments();
        let qs = questions();
        let ctx = ResponseFilterContext {
            department_names: &depts,
            questions: &qs,
            insights: &insights,
        };
        let padded = FilterState::default().apply(FilterAction::SetSearch("  rent ".into()));
        assert_eq!(filter_rows(&rows, &padded, &depts).len(), 1);
        assert_eq!(ids(&filter_responses(&responses, &padded, &ctx)), vec!["r1"]);
    }

    #[test]
    fn issue_filter_falls_back_to_question_name() {
        let (mut responses, insights) = fixture();
        responses[2].question_id = "recQ9".into();
        responses[2].question_name = Some("Housing costs".into());
        let depts = departments();
        let qs = questions();
        let ctx = ResponseFilterContext {
            department_names: &depts,
            questions: &qs,
            insights: &insights,
        };
        let housing = FilterState::default().apply(FilterAction::SetIssue("Housing costs".into()));
        assert_eq!(ids(&filter_responses(&responses, &housing, &ctx)), vec!["r3"]);
        let pay = FilterState::default().apply(FilterAction::SetIssue("Pay".into()));
        assert_eq!(ids(&filter_responses(&responses, &pay, &ctx)), vec!["r2"]);
    }

    #[test]
    fn responses_by_every_filter() {
        let (responses, insights) = fixture();
        let depts = departments();
        let qs = questions();
        let ctx = ResponseFilterContext {
            department_names: &depts,
            questions: &qs,
            insights: &insights,
        };
        let base = FilterState::default();

        let eng = base.apply(FilterAction::SetDepartment("Engineering".into()));
        assert_eq!(ids(&filter_responses(&responses, &eng, &ctx)), vec!["r1", "r3"]);

        let rent = base.apply(FilterAction::SetSearch("rent".into()));
        assert_eq!(ids(&filter_responses(&responses, &rent, &ctx)), vec!["r1"]);

        let pay = base.apply(FilterAction::SetIssue("Pay".into()));
        assert_eq!(ids(&filter_responses(&responses, &pay, &ctx)), vec!["r2", "r3"]);

        let untagged = base.apply(FilterAction::SetTag(TAG_UNTAGGED.into()));
        assert_eq!(ids(&filter_responses(&responses, &untagged, &ctx)), vec!["r3"]);

        let star = base.apply(FilterAction::SetTag("star".into()));
        assert_eq!(ids(&filter_responses(&responses, &star, &ctx)), vec!["r2"]);

        let econ = base.apply(FilterAction::SetEconomic("Economic".into()));
        assert_eq!(ids(&filter_responses(&responses, &econ, &ctx)), vec!["r2", "r3"]);

        let cited = base.apply(FilterAction::SetInsight(INSIGHT_CITED.into()));
        assert_eq!(ids(&filter_responses(&responses, &cited, &ctx)), vec!["r2"]);

        let uncited = base.apply(FilterAction::SetInsight(INSIGHT_UNCITED.into()));
        assert_eq!(ids(&filter_responses(&responses, &uncited, &ctx)), vec!["r1", "r3"]);

        let by_id = base.apply(FilterAction::SetInsight("ins1".into()));
        assert_eq!(ids(&filter_responses(&responses, &by_id, &ctx)), vec!["r2"]);
    }

    #[test]
    fn responses_by_respondent() {
        let (mut responses, insights) = fixture();
        responses[0].respondent = Some(RespondentHandle {
            name: Some("Dana".into()),
            email: Some("dana@example.edu".into()),
        });
        let depts = departments();
        let qs = questions();
        let ctx = ResponseFilterContext {
            department_names: &depts,
            questions: &qs,
            insights: &insights,
        };
        let s = FilterState::default()
            .apply(FilterAction::SetRespondent(Some("dana@example.edu".into())));
        assert_eq!(ids(&filter_responses(&responses, &s, &ctx)), vec!["r1"]);
    }
}
