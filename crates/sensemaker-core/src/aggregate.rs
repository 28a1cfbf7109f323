//! Response aggregation: rating histograms for quantitative questions and
//! theme histograms for free-text answers.
//!
//! Both aggregations are recomputed from scratch on every call. They are
//! pure functions of the filtered rows, the question catalog, and the tag
//! assignments they are given.
//!
//! # Rating buckets
//!
//! | Raw value | Bucket |
//! |-----------|--------|
//! | `1`, `"1"`, `"1.0"` | 1 |
//! | `2`, `"2"`, `"2.0"` | 2 |
//! | `3`, `"3"`, `"3.0"` | 3 |
//! | null, `""`, `"4"`, `"abc"`, … | 0 (non-answer) |

use serde::Serialize;
use std::cmp::Ordering;
use std::collections::HashMap;
use std::str::FromStr;

use crate::models::{Classification, Question, QuestionKind, RatingValue, Response, SurveyRow};
use crate::tags::SentimentKeys;

/// The accepted textual forms of a rating, in bucket order.
const ACCEPTED_RATINGS: [(&str, &str); 3] = [("1", "1.0"), ("2", "2.0"), ("3", "3.0")];

/// Bucket index (0–3) for a raw rating value.
///
/// Only whole ratings 1–3 count, written either as integers or with a
/// single `.0` decimal. Everything else is a non-answer.
pub fn classify_rating(value: &RatingValue) -> usize {
    match value {
        RatingValue::Missing => 0,
        RatingValue::Number(n) => {
            if n.fract() == 0.0 && (1.0..=3.0).contains(n) {
                *n as usize
            } else {
                0
            }
        }
        RatingValue::Text(s) => ACCEPTED_RATINGS
            .iter()
            .position(|(int_form, dec_form)| s == int_form || s == dec_form)
            .map(|i| i + 1)
            .unwrap_or(0),
    }
}

/// One row of the rating histogram.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct RatingRow {
    pub question_id: String,
    pub label: String,
    pub classification: Classification,
    /// Counts for bucket 0 (non-answer) and ratings 1, 2, 3.
    pub buckets: [usize; 4],
    pub answered: usize,
    pub total: usize,
    pub average: f64,
    pub standard_deviation: f64,
}

impl RatingRow {
    fn from_buckets(question: &Question, buckets: [usize; 4]) -> Self {
        let answered = buckets[1] + buckets[2] + buckets[3];
        let total = answered + buckets[0];
        let (average, standard_deviation) = if answered > 0 {
            let n = answered as f64;
            let mean = (1..=3).map(|v| (v * buckets[v]) as f64).sum::<f64>() / n;
            let variance = (1..=3)
                .map(|v| buckets[v] as f64 * (v as f64 - mean).powi(2))
                .sum::<f64>()
                / n;
            (mean, variance.sqrt())
        } else {
            (0.0, 0.0)
        };
        Self {
            question_id: question.id.clone(),
            label: question.display_label.clone(),
            classification: question.classification,
            buckets,
            answered,
            total,
            average,
            standard_deviation,
        }
    }
}

/// Column a rating histogram can be ordered by.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SortKey {
    Label,
    Bucket(usize),
    Average,
    Total,
    Answered,
}

impl FromStr for SortKey {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "label" | "question" | "questionLabel" => Ok(SortKey::Label),
            "bucket0" => Ok(SortKey::Bucket(0)),
            "bucket1" => Ok(SortKey::Bucket(1)),
            "bucket2" => Ok(SortKey::Bucket(2)),
            "bucket3" => Ok(SortKey::Bucket(3)),
            "average" => Ok(SortKey::Average),
            "total" => Ok(SortKey::Total),
            "answered" => Ok(SortKey::Answered),
            other => Err(format!(
                "unknown sort key '{}'. Use label, bucket0..bucket3, average, total, or answered.",
                other
            )),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum SortDirection {
    #[default]
    Asc,
    Desc,
}

impl SortDirection {
    pub fn as_str(&self) -> &'static str {
        match self {
            SortDirection::Asc => "asc",
            SortDirection::Desc => "desc",
        }
    }
}

impl FromStr for SortDirection {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "asc" => Ok(SortDirection::Asc),
            "desc" => Ok(SortDirection::Desc),
            other => Err(format!("unknown sort direction '{}'", other)),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RatingSort {
    pub key: SortKey,
    pub direction: SortDirection,
}

fn compare_rows(a: &RatingRow, b: &RatingRow, key: SortKey) -> Ordering {
    match key {
        SortKey::Label => a.label.cmp(&b.label),
        SortKey::Bucket(i) => a.buckets[i].cmp(&b.buckets[i]),
        SortKey::Average => a.average.partial_cmp(&b.average).unwrap_or(Ordering::Equal),
        SortKey::Total => a.total.cmp(&b.total),
        SortKey::Answered => a.answered.cmp(&b.answered),
    }
}

/// Order rows in place. The sort is stable, so ties keep catalog order in
/// either direction.
pub fn sort_rating_rows(rows: &mut [RatingRow], sort: RatingSort) {
    rows.sort_by(|a, b| {
        let ord = compare_rows(a, b, sort.key);
        match sort.direction {
            SortDirection::Asc => ord,
            SortDirection::Desc => ord.reverse(),
        }
    });
}

/// Per-question rating distribution over `rows`.
///
/// Non-quantitative questions are skipped, as are questions nobody
/// answered under the current filters (`total == 0`). Without a `sort`,
/// rows come back in catalog order.
pub fn rating_histogram<'a, I>(
    rows: I,
    questions: &[Question],
    sort: Option<RatingSort>,
) -> Vec<RatingRow>
where
    I: IntoIterator<Item = &'a SurveyRow>,
    I::IntoIter: Clone,
{
    let rows = rows.into_iter();
    let mut result: Vec<RatingRow> = questions
        .iter()
        .filter(|q| q.kind == QuestionKind::Quantitative)
        .map(|q| {
            let mut buckets = [0usize; 4];
            for row in rows.clone() {
                let bucket = row
                    .rating(q.rating_column())
                    .map(classify_rating)
                    .unwrap_or(0);
                buckets[bucket] += 1;
            }
            RatingRow::from_buckets(q, buckets)
        })
        .filter(|r| r.total > 0)
        .collect();

    if let Some(sort) = sort {
        sort_rating_rows(&mut result, sort);
    }
    result
}

/// One row of the theme histogram: sentiment counts for one question label.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ThemeRow {
    pub label: String,
    pub total: usize,
    pub plus: usize,
    pub delta: usize,
    /// `total - plus - delta`. A response tagged only with something other
    /// than plus/delta still lands here.
    pub untagged: usize,
}

/// Group free-text responses by their question's display label and count
/// sentiment tags. Groups are ordered by `total` descending; ties keep the
/// order in which labels were first seen.
pub fn theme_histogram<'a, I>(
    responses: I,
    questions: &[Question],
    sentiment_keys: &SentimentKeys,
) -> Vec<ThemeRow>
where
    I: IntoIterator<Item = &'a Response>,
{
    let by_id: HashMap<&str, &Question> = questions.iter().map(|q| (q.id.as_str(), q)).collect();

    let mut index: HashMap<String, usize> = HashMap::new();
    let mut groups: Vec<ThemeRow> = Vec::new();

    for response in responses {
        let label = response.question_label(by_id.get(response.question_id.as_str()).copied());
        let slot = *index.entry(label.to_string()).or_insert_with(|| {
            groups.push(ThemeRow {
                label: label.to_string(),
                total: 0,
                plus: 0,
                delta: 0,
                untagged: 0,
            });
            groups.len() - 1
        });
        let group = &mut groups[slot];
        group.total += 1;
        if response.has_tag(&sentiment_keys.plus) {
            group.plus += 1;
        }
        if response.has_tag(&sentiment_keys.delta) {
            group.delta += 1;
        }
    }

    for group in &mut groups {
        group.untagged = group.total.saturating_sub(group.plus + group.delta);
    }
    groups.sort_by(|a, b| b.total.cmp(&a.total));
    groups
}

#[cfg(test)]
mod tests {
    use super::*;

    fn question(id: &str, label: &str, kind: QuestionKind) -> Question {
        Question {
            id: id.to_string(),
            display_label: label.to_string(),
            column_header: Some(format!("col_{}", id)),
            kind,
            classification: Classification::Unknown,
        }
    }

    fn row(id: &str, column: &str, value: RatingValue) -> SurveyRow {
        let mut r = SurveyRow {
            id: id.to_string(),
            ..Default::default()
        };
        r.ratings.insert(column.to_string(), value);
        r
    }

    fn response(id: &str, question_id: &str, tags: &[&str]) -> Response {
        Response {
            id: id.to_string(),
            handle: id.to_string(),
            text: format!("text {}", id),
            question_id: question_id.to_string(),
            question_name: None,
            department_ids: Vec::new(),
            tag_keys: tags.iter().map(|t| t.to_string()).collect(),
            respondent: None,
        }
    }

    #[test]
    fn classify_accepted_forms() {
        for (value, bucket) in [
            (RatingValue::Number(1.0), 1),
            (RatingValue::Number(2.0), 2),
            (RatingValue::Number(3.0), 3),
            (RatingValue::from("1.0"), 1),
            (RatingValue::from("2.0"), 2),
            (RatingValue::from("3.0"), 3),
            (RatingValue::from("2"), 2),
        ] {
            assert_eq!(classify_rating(&value), bucket, "{:?}", value);
        }
    }

    #[test]
    fn classify_non_answers() {
        for value in [
            RatingValue::Missing,
            RatingValue::from(""),
            RatingValue::from("4"),
            RatingValue::from("abc"),
            RatingValue::Number(0.0),
            RatingValue::Number(2.5),
        ] {
            assert_eq!(classify_rating(&value), 0, "{:?}", value);
        }
    }

    #[test]
    fn one_of_each_rating() {
        let q = question("q1", "Pay", QuestionKind::Quantitative);
        let rows: Vec<SurveyRow> = (1..=3)
            .map(|v| row(&format!("r{}", v), "col_q1", RatingValue::Number(v as f64)))
            .collect();
        let result = rating_histogram(&rows, &[q], None);
        assert_eq!(result.len(), 1);
        assert!((result[0].average - 2.0).abs() < 1e-12);
        assert!((result[0].standard_deviation - (2.0f64 / 3.0).sqrt()).abs() < 1e-12);
        assert!((result[0].standard_deviation - 0.8165).abs() < 1e-4);
    }

    #[test]
    fn mixed_ratings_scenario() {
        let q = question("Q1", "Q1", QuestionKind::Quantitative);
        let values = vec![
            RatingValue::Number(1.0),
            RatingValue::Number(1.0),
            RatingValue::Number(2.0),
            RatingValue::Number(3.0),
            RatingValue::Number(3.0),
            RatingValue::Number(3.0),
            RatingValue::Missing,
            RatingValue::from("2.0"),
            RatingValue::from("x"),
            RatingValue::from(""),
        ];
        let rows: Vec<SurveyRow> = values
            .into_iter()
            .enumerate()
            .map(|(i, v)| row(&format!("r{}", i), "col_Q1", v))
            .collect();
        let result = rating_histogram(&rows, &[q], None);
        let r = &result[0];
        assert_eq!(r.buckets, [3, 2, 2, 3]);
        assert_eq!(r.answered, 7);
        assert_eq!(r.total, 10);
        assert!((r.average - 15.0 / 7.0).abs() < 1e-12);
    }

    #[test]
    fn rows_without_the_column_count_as_non_answers() {
        let q = question("q1", "Pay", QuestionKind::Quantitative);
        let rows = vec![
            row("a", "col_q1", RatingValue::Number(2.0)),
            SurveyRow::default(),
        ];
        let result = rating_histogram(&rows, &[q], None);
        assert_eq!(result[0].buckets, [1, 0, 1, 0]);
    }

    #[test]
    fn empty_total_is_excluded() {
        let q1 = question("q1", "Pay", QuestionKind::Quantitative);
        let q2 = question("q2", "Leave", QuestionKind::Quantitative);
        let rows = vec![row("a", "col_q1", RatingValue::Number(2.0))];
        // q2 still has a total from the row lacking its column, so only an
        // empty row set drops every question.
        assert_eq!(rating_histogram(&rows, &[q1.clone(), q2.clone()], None).len(), 2);
        assert!(rating_histogram(&Vec::<SurveyRow>::new(), &[q1, q2], None).is_empty());
    }

    #[test]
    fn zero_answered_has_zero_stats() {
        let q = question("q1", "Pay", QuestionKind::Quantitative);
        let rows = vec![row("a", "col_q1", RatingValue::from("n/a"))];
        let result = rating_histogram(&rows, &[q], None);
        assert_eq!(result[0].answered, 0);
        assert_eq!(result[0].average, 0.0);
        assert_eq!(result[0].standard_deviation, 0.0);
    }

    #[test]
    fn qualitative_questions_are_skipped() {
        let q = question("q1", "Why", QuestionKind::Qualitative);
        let rows = vec![row("a", "col_q1", RatingValue::Number(2.0))];
        assert!(rating_histogram(&rows, &[q], None).is_empty());
    }

    #[test]
    fn sort_is_stable_in_both_directions() {
        let qs = vec![
            question("a", "Alpha", QuestionKind::Quantitative),
            question("b", "Beta", QuestionKind::Quantitative),
            question("c", "Gamma", QuestionKind::Quantitative),
        ];
        let mut rows = Vec::new();
        for (col, v) in [("col_a", 2.0), ("col_b", 3.0), ("col_c", 2.0)] {
            rows.push(row(col, col, RatingValue::Number(v)));
        }
        let asc = rating_histogram(
            &rows,
            &qs,
            Some(RatingSort {
                key: SortKey::Bucket(2),
                direction: SortDirection::Asc,
            }),
        );
        let labels: Vec<&str> = asc.iter().map(|r| r.label.as_str()).collect();
        assert_eq!(labels, vec!["Beta", "Alpha", "Gamma"]);

        let desc = rating_histogram(
            &rows,
            &qs,
            Some(RatingSort {
                key: SortKey::Average,
                direction: SortDirection::Desc,
            }),
        );
        let labels: Vec<&str> = desc.iter().map(|r| r.label.as_str()).collect();
        assert_eq!(labels, vec!["Beta", "Alpha", "Gamma"]);
    }

    #[test]
    fn sort_key_parsing() {
        assert_eq!("bucket3".parse::<SortKey>(), Ok(SortKey::Bucket(3)));
        assert_eq!("questionLabel".parse::<SortKey>(), Ok(SortKey::Label));
        assert!("median".parse::<SortKey>().is_err());
        assert_eq!("DESC".parse::<SortDirection>(), Ok(SortDirection::Desc));
    }

    #[test]
    fn theme_histogram_counts_and_orders() {
        let qs = vec![
            question("open1", "Equity", QuestionKind::Qualitative),
            question("open2", "Other", QuestionKind::Qualitative),
        ];
        let responses = vec![
            response("1", "open1", &["plus"]),
            response("2", "open2", &["delta", "star"]),
            response("3", "open2", &["star"]),
            response("4", "open2", &[]),
            response("5", "open1", &[]),
        ];
        let rows = theme_histogram(&responses, &qs, &SentimentKeys::default());
        assert_eq!(
            rows,
            vec![
                ThemeRow {
                    label: "Other".into(),
                    total: 3,
                    plus: 0,
                    delta: 1,
                    untagged: 2,
                },
                ThemeRow {
                    label: "Equity".into(),
                    total: 2,
                    plus: 1,
                    delta: 0,
                    untagged: 1,
                },
            ]
        );
    }

    #[test]
    fn theme_ties_keep_discovery_order() {
        let responses = vec![
            response("1", "zeta", &[]),
            response("2", "alpha", &[]),
        ];
        let rows = theme_histogram(&responses, &[], &SentimentKeys::default());
        let labels: Vec<&str> = rows.iter().map(|r| r.label.as_str()).collect();
        assert_eq!(labels, vec!["zeta", "alpha"]);
    }

    #[test]
    fn theme_label_prefers_catalog_then_question_name() {
        let qs = vec![question("open1", "Equity", QuestionKind::Qualitative)];
        let mut named_known = response("1", "open1", &[]);
        named_known.question_name = Some("Ignored".into());
        let mut named_unknown = response("2", "recQ9", &["plus"]);
        named_unknown.question_name = Some("Housing costs".into());
        let bare = response("3", "recQ8", &[]);

        let rows = theme_histogram(
            &[named_known, named_unknown, bare],
            &qs,
            &SentimentKeys::default(),
        );
        let labels: Vec<&str> = rows.iter().map(|r| r.label.as_str()).collect();
        assert_eq!(labels, vec!["Equity", "Housing costs", "recQ8"]);
        assert_eq!(rows[1].plus, 1);
    }
}
