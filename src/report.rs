//! Plain-text rendering of aggregations, comments, and insights for the
//! terminal. Every function returns the text; callers print it.

use std::fmt::Write;

use sensemaker_core::aggregate::{RatingRow, ThemeRow};
use sensemaker_core::citation::RenderedToken;
use sensemaker_core::models::{Insight, Response};
use sensemaker_core::snapshot::Snapshot;
use sensemaker_core::tally::TallyRow;

use crate::ingest::IngestReport;

const NO_RESULTS: &str = "No results.\n";

fn truncate(s: &str, max: usize) -> String {
    if s.chars().count() <= max {
        s.to_string()
    } else {
        let mut out: String = s.chars().take(max.saturating_sub(1)).collect();
        out.push('…');
        out
    }
}

pub fn format_heatmap(rows: &[RatingRow]) -> String {
    if rows.is_empty() {
        return NO_RESULTS.to_string();
    }
    let mut out = String::new();
    let _ = writeln!(
        out,
        "{:<32} {:<13} {:>5} {:>5} {:>5} {:>5} {:>6} {:>5} {:>5}",
        "QUESTION", "CLASS", "N/A", "1", "2", "3", "TOTAL", "AVG", "SD"
    );
    let _ = writeln!(out, "{}", "-".repeat(87));
    for r in rows {
        let _ = writeln!(
            out,
            "{:<32} {:<13} {:>5} {:>5} {:>5} {:>5} {:>6} {:>5.2} {:>5.2}",
            truncate(&r.label, 32),
            r.classification.label(),
            r.buckets[0],
            r.buckets[1],
            r.buckets[2],
            r.buckets[3],
            r.total,
            r.average,
            r.standard_deviation
        );
    }
    out
}

pub fn format_themes(rows: &[ThemeRow]) -> String {
    if rows.is_empty() {
        return NO_RESULTS.to_string();
    }
    let mut out = String::new();
    let _ = writeln!(
        out,
        "{:<40} {:>6} {:>6} {:>6} {:>9}",
        "THEME", "TOTAL", "PLUS", "DELTA", "UNTAGGED"
    );
    let _ = writeln!(out, "{}", "-".repeat(71));
    for r in rows {
        let _ = writeln!(
            out,
            "{:<40} {:>6} {:>6} {:>6} {:>9}",
            truncate(&r.label, 40),
            r.total,
            r.plus,
            r.delta,
            r.untagged
        );
    }
    out
}

pub fn format_tally(heading: &str, rows: &[TallyRow]) -> String {
    if rows.is_empty() {
        return NO_RESULTS.to_string();
    }
    let mut out = String::new();
    let _ = writeln!(out, "{:<48} {:>6}", heading, "COUNT");
    let _ = writeln!(out, "{}", "-".repeat(55));
    for r in rows {
        let _ = writeln!(out, "{:<48} {:>6}", truncate(&r.label, 48), r.count);
    }
    out
}

pub fn format_comments(responses: &[&Response], snapshot: &Snapshot) -> String {
    if responses.is_empty() {
        return NO_RESULTS.to_string();
    }
    let names = snapshot.department_names();
    let mut out = String::new();
    for r in responses {
        let label = r.question_label(snapshot.question(&r.question_id));
        let departments: Vec<&str> = r
            .department_ids
            .iter()
            .map(|d| names.get(d).map(String::as_str).unwrap_or(d.as_str()))
            .collect();
        let star = if r.has_tag(&snapshot.sentiment_keys.star) {
            " ★"
        } else {
            ""
        };
        let _ = writeln!(
            out,
            "{} {} ({})  {}  [{}]{}",
            snapshot.sentiment_keys.glyph_for(&r.tag_keys),
            r.handle,
            r.id,
            label,
            departments.join(", "),
            star
        );
        let _ = writeln!(out, "    {}", r.text);
    }
    out
}

/// The body of an insight with citations resolved.
pub fn format_rendered(tokens: &[RenderedToken]) -> String {
    let mut out = String::new();
    for token in tokens {
        match token {
            RenderedToken::Text(s) => out.push_str(s),
            RenderedToken::Citation {
                response_id,
                glyph,
                text,
                truncated,
                ..
            } => {
                let ellipsis = if *truncated { "…" } else { "" };
                let _ = write!(out, "{{{} {}{} ^{}}}", glyph, text, ellipsis, response_id);
            }
            RenderedToken::Missing {
                response_id,
                display_text,
            } => match display_text {
                Some(d) => {
                    let _ = write!(out, "{{missing: {} ^{}}}", d, response_id);
                }
                None => {
                    let _ = write!(out, "{{missing ^{}}}", response_id);
                }
            },
        }
    }
    out
}

pub fn format_insight_list(insights: &[Insight]) -> String {
    if insights.is_empty() {
        return NO_RESULTS.to_string();
    }
    let mut out = String::new();
    let _ = writeln!(
        out,
        "{:<18} {:<6} {:<40} {:>5} {:>8}",
        "ID", "NAME", "TITLE", "CITES", "POINTERS"
    );
    let _ = writeln!(out, "{}", "-".repeat(81));
    for i in insights {
        let _ = writeln!(
            out,
            "{:<18} {:<6} {:<40} {:>5} {:>8}",
            i.id.as_deref().unwrap_or("-"),
            i.name.as_deref().unwrap_or("-"),
            truncate(&i.title, 40),
            i.cited_response_ids.len(),
            i.pointers.len()
        );
    }
    out
}

pub fn format_insight(insight: &Insight, rendered: &[RenderedToken], snapshot: &Snapshot) -> String {
    let names = snapshot.department_names();
    let mut out = String::new();
    let _ = writeln!(out, "{}", if insight.title.is_empty() { "(untitled)" } else { insight.title.as_str() });
    let _ = writeln!(out, "{}", "=".repeat(insight.title.chars().count().max(10)));
    if let Some(id) = &insight.id {
        let _ = writeln!(out, "  id:          {}", id);
    }
    if !insight.department_ids.is_empty() {
        let depts: Vec<&str> = insight
            .department_ids
            .iter()
            .map(|d| names.get(d).map(String::as_str).unwrap_or(d.as_str()))
            .collect();
        let _ = writeln!(out, "  departments: {}", depts.join(", "));
    }
    if !insight.sensemaker_ids.is_empty() {
        let people: Vec<&str> = insight
            .sensemaker_ids
            .iter()
            .map(|id| {
                snapshot
                    .sensemakers
                    .iter()
                    .find(|s| &s.id == id)
                    .map(|s| s.name.as_str())
                    .unwrap_or(id.as_str())
            })
            .collect();
        let _ = writeln!(out, "  sensemakers: {}", people.join(", "));
    }
    let _ = writeln!(out, "  cites:       {}", insight.cited_response_ids.len());
    let _ = writeln!(out);
    let _ = writeln!(out, "{}", format_rendered(rendered));
    for (n, p) in insight.pointers.iter().enumerate() {
        let _ = writeln!(
            out,
            "  pointer {}: {} {}",
            n + 1,
            p.view,
            serde_json::Value::Object(p.fields.clone())
        );
    }
    out
}

pub fn format_check(snapshot: &Snapshot, report: &IngestReport) -> String {
    let mut out = String::new();
    let _ = writeln!(out, "Sensemaker — Snapshot");
    let _ = writeln!(out, "=====================");
    let _ = writeln!(out);
    let _ = writeln!(out, "  Departments: {}", snapshot.departments.len());
    let _ = writeln!(out, "  Sensemakers: {}", snapshot.sensemakers.len());
    let _ = writeln!(out, "  Tags:        {}", snapshot.catalog.len());
    let _ = writeln!(out, "  Questions:   {}", snapshot.questions.len());
    let _ = writeln!(out, "  Comments:    {}", snapshot.responses.len());
    let _ = writeln!(out, "  Survey rows: {}", snapshot.rows.len());
    let _ = writeln!(out, "  Insights:    {}", snapshot.insights.len());
    let _ = writeln!(out);
    if report.is_clean() {
        let _ = writeln!(out, "  No ingest issues.");
    } else {
        let _ = writeln!(out, "  Ingest issues ({}):", report.issues.len());
        for issue in &report.issues {
            let _ = writeln!(out, "    - {}", issue);
        }
    }
    out
}
