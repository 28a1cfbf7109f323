//! Frequency tallies over survey rows: the priorities histogram and the
//! stipend (salary-range) histogram.

use serde::Serialize;
use std::collections::HashMap;

use crate::models::SurveyRow;

/// A distinct answer and how many rows gave it.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct TallyRow {
    pub label: String,
    pub count: usize,
    /// Sort value for numeric tallies; `None` for categorical ones.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub numeric: Option<f64>,
}

fn count_in_order<'a>(labels: impl Iterator<Item = &'a str>) -> Vec<TallyRow> {
    let mut index: HashMap<&str, usize> = HashMap::new();
    let mut rows: Vec<TallyRow> = Vec::new();
    for label in labels {
        match index.get(label) {
            Some(&i) => rows[i].count += 1,
            None => {
                index.insert(label, rows.len());
                rows.push(TallyRow {
                    label: label.to_string(),
                    count: 1,
                    numeric: None,
                });
            }
        }
    }
    rows
}

/// Count every non-blank priority across `rows`, most frequent first.
/// Ties keep first-seen order.
pub fn priorities_histogram<'a, I>(rows: I) -> Vec<TallyRow>
where
    I: IntoIterator<Item = &'a SurveyRow>,
{
    let labels = rows
        .into_iter()
        .flat_map(|r| r.priorities.iter())
        .map(|p| p.as_str())
        .filter(|p| !p.trim().is_empty());
    let mut tally = count_in_order(labels);
    tally.sort_by(|a, b| b.count.cmp(&a.count));
    tally
}

/// Count each distinct (trimmed) salary range, ordered by the number it
/// names, lowest first. Ranges with no number sort as zero.
pub fn stipend_histogram<'a, I>(rows: I) -> Vec<TallyRow>
where
    I: IntoIterator<Item = &'a SurveyRow>,
{
    let labels = rows
        .into_iter()
        .filter_map(|r| r.salary_range.as_deref())
        .map(str::trim)
        .filter(|s| !s.is_empty());
    let mut tally = count_in_order(labels);
    for row in &mut tally {
        row.numeric = Some(leading_number(&row.label));
    }
    tally.sort_by(|a, b| {
        let (x, y) = (a.numeric.unwrap_or(0.0), b.numeric.unwrap_or(0.0));
        x.partial_cmp(&y).unwrap_or(std::cmp::Ordering::Equal)
    });
    tally
}

/// Strip everything but digits, `.` and `-`, then read the longest prefix
/// that parses as a number. `"$1,500 - $2,000"` reads as `1500`.
pub fn leading_number(label: &str) -> f64 {
    let kept: String = label
        .chars()
        .filter(|c| c.is_ascii_digit() || *c == '.' || *c == '-')
        .collect();
    (1..=kept.len())
        .rev()
        .find_map(|end| kept[..end].parse::<f64>().ok())
        .unwrap_or(0.0)
}
