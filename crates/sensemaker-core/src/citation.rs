//! Inline citations in insight text.
//!
//! A citation is written `[[displayText|responseId]]`, or `[[responseId]]`
//! in the legacy form. Everything outside the brackets is literal text.
//! This textual form is persisted in insight bodies and must stay
//! readable, so [`serialize`] and [`parse`] are exact inverses for any
//! display text without `[[`/`]]` and any id without `|`/`]]`.
//!
//! Parsing never fails. An unterminated `[[` or an empty `[[]]` is left as
//! literal text.
//!
//! Stored tokens carry only identity (`display_text`, `response_id`).
//! Presentation (the live sentiment glyph, truncation with an expand
//! control, the "missing" placeholder) is computed by [`render`] from the
//! current responses and is never written back.
//!
//! # Example
//!
//! ```rust
//! use sensemaker_core::citation::{parse, serialize, CitationToken};
//!
//! let body = format!("See {}.", serialize("Good point", "rec123"));
//! assert_eq!(
//!     parse(&body),
//!     vec![
//!         CitationToken::Text("See ".into()),
//!         CitationToken::Citation { display_text: Some("Good point".into()), response_id: "rec123".into() },
//!         CitationToken::Text(".".into()),
//!     ]
//! );
//! ```

use serde::Serialize;

use crate::models::Response;
use crate::tags::SentimentKeys;

const OPEN: &str = "[[";
const CLOSE: &str = "]]";

/// Default number of characters of response text kept in a new
/// citation's display text.
pub const DEFAULT_MAX_LEN: usize = 50;

/// One piece of a parsed insight body.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "type", content = "data", rename_all = "snake_case")]
pub enum CitationToken {
    Text(String),
    Citation {
        /// Absent for the legacy `[[responseId]]` form.
        display_text: Option<String>,
        response_id: String,
    },
}

fn citation_from_inner(inner: &str) -> CitationToken {
    match inner.rsplit_once('|') {
        Some((display, id)) => CitationToken::Citation {
            display_text: Some(display.to_string()),
            response_id: id.to_string(),
        },
        None => CitationToken::Citation {
            display_text: None,
            response_id: inner.to_string(),
        },
    }
}

/// Split `body` into text spans and citations, left to right.
///
/// A citation ends at the first `]]` after an opening `[[`. When another
/// `[[` appears in between, the citation starts at the last one.
/// Empty gaps between adjacent citations produce no text token, so a body
/// that is a single citation parses to exactly one token. An empty body
/// parses to no tokens.
pub fn parse(body: &str) -> Vec<CitationToken> {
    let mut tokens = Vec::new();
    let mut cursor = 0;
    let mut search_from = 0;

    while let Some(rel) = body[search_from..].find(OPEN) {
        let first_open = search_from + rel;
        let Some(close_rel) = body[first_open + OPEN.len()..].find(CLOSE) else {
            break;
        };
        let close = first_open + OPEN.len() + close_rel;
        let inner_first = first_open + OPEN.len();
        let open = body[inner_first..close]
            .rfind(OPEN)
            .map(|r| inner_first + r)
            .unwrap_or(first_open);
        let inner_start = open + OPEN.len();
        if inner_start >= close {
            search_from = close + CLOSE.len();
            continue;
        }

        if open > cursor {
            tokens.push(CitationToken::Text(body[cursor..open].to_string()));
        }
        tokens.push(citation_from_inner(&body[inner_start..close]));
        cursor = close + CLOSE.len();
        search_from = cursor;
    }

    if cursor < body.len() {
        tokens.push(CitationToken::Text(body[cursor..].to_string()));
    }
    tokens
}

/// The persisted form of a citation.
pub fn serialize(display_text: &str, response_id: &str) -> String {
    format!("{}{}|{}{}", OPEN, display_text, response_id, CLOSE)
}

/// Ids of every response cited in `body`, distinct, in order of first
/// appearance.
pub fn cited_response_ids(body: &str) -> Vec<String> {
    let mut ids: Vec<String> = Vec::new();
    for token in parse(body) {
        if let CitationToken::Citation { response_id, .. } = token {
            if !ids.contains(&response_id) {
                ids.push(response_id);
            }
        }
    }
    ids
}

/// Display text for a new citation of `response`: the sentiment glyph and
/// a space when the response is tagged plus or delta, then at most
/// `max_len` characters of its text. No ellipsis is stored.
///
/// Bracket pairs in the response text are split apart (`]]` becomes
/// `] ]`) before truncating, so the stored citation cannot end early and
/// the text part never exceeds `max_len`.
pub fn display_text_for(response: &Response, keys: &SentimentKeys, max_len: usize) -> String {
    let safe: String = split_bracket_pairs(response.text.chars())
        .chars()
        .take(max_len)
        .collect();
    match keys.sentiment_of(&response.tag_keys) {
        Some(sentiment) => format!("{} {}", sentiment.glyph(), safe),
        None => safe,
    }
}

fn split_bracket_pairs(chars: impl Iterator<Item = char>) -> String {
    let mut out = String::new();
    let mut prev = None;
    for c in chars {
        if (c == '[' || c == ']') && prev == Some(c) {
            out.push(' ');
        }
        out.push(c);
        prev = Some(c);
    }
    out
}

/// Build the full citation text for `response`.
pub fn cite(response: &Response, keys: &SentimentKeys, max_len: usize) -> String {
    serialize(&display_text_for(response, keys, max_len), &response.id)
}

/// Insert `citation` into `body` at character offset `at` (clamped to the
/// end of the body). Returns the new body and the character offset just
/// past the inserted citation.
pub fn insert_at(body: &str, at: usize, citation: &str) -> (String, usize) {
    let byte = body
        .char_indices()
        .nth(at)
        .map(|(i, _)| i)
        .unwrap_or(body.len());
    let mut out = String::with_capacity(body.len() + citation.len());
    out.push_str(&body[..byte]);
    out.push_str(citation);
    out.push_str(&body[byte..]);
    let cursor = body[..byte].chars().count() + citation.chars().count();
    (out, cursor)
}

/// A token ready for display.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "type", content = "data", rename_all = "snake_case")]
pub enum RenderedToken {
    Text(String),
    Citation {
        response_id: String,
        question_id: String,
        /// Live glyph from the response's current tags.
        glyph: &'static str,
        text: String,
        /// True when `text` was cut short; the caller shows an expand control.
        truncated: bool,
    },
    /// The cited response is not in the current snapshot.
    Missing {
        response_id: String,
        display_text: Option<String>,
    },
}

/// Resolve parsed tokens against the current responses.
///
/// Citations of known responses show the response's live text, cut to
/// `max_len` characters unless `expanded`. Unknown ids become
/// [`RenderedToken::Missing`].
pub fn render<'a, F>(
    tokens: &[CitationToken],
    lookup: F,
    keys: &SentimentKeys,
    max_len: usize,
    expanded: bool,
) -> Vec<RenderedToken>
where
    F: Fn(&str) -> Option<&'a Response>,
{
    tokens
        .iter()
        .map(|token| match token {
            CitationToken::Text(s) => RenderedToken::Text(s.clone()),
            CitationToken::Citation {
                display_text,
                response_id,
            } => match lookup(response_id) {
                Some(response) => {
                    let truncated = !expanded && response.text.chars().count() > max_len;
                    let text = if truncated {
                        response.text.chars().take(max_len).collect()
                    } else {
                        response.text.clone()
                    };
                    RenderedToken::Citation {
                        response_id: response_id.clone(),
                        question_id: response.question_id.clone(),
                        glyph: keys.glyph_for(&response.tag_keys),
                        text,
                        truncated,
                    }
                }
                None => RenderedToken::Missing {
                    response_id: response_id.clone(),
                    display_text: display_text.clone(),
                },
            },
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    fn text(s: &str) -> CitationToken {
        CitationToken::Text(s.to_string())
    }

    fn cit(display: Option<&str>, id: &str) -> CitationToken {
        CitationToken::Citation {
            display_text: display.map(str::to_string),
            response_id: id.to_string(),
        }
    }

    fn response(id: &str, body: &str, tags: &[&str]) -> Response {
        Response {
            id: id.to_string(),
            handle: format!("handle {}", id),
            text: body.to_string(),
            question_id: "open1".to_string(),
            question_name: None,
            department_ids: Vec::new(),
            tag_keys: tags.iter().map(|t| t.to_string()).collect(),
            respondent: None,
        }
    }

    #[test]
    fn parse_mixed_body() {
        let body = "See [[➕ Good point...|rec123]] and also [[rec456]].";
        assert_eq!(
            parse(body),
            vec![
                text("See "),
                cit(Some("➕ Good point..."), "rec123"),
                text(" and also "),
                cit(None, "rec456"),
                text("."),
            ]
        );
    }

    #[test]
    fn parse_without_citations() {
        assert_eq!(parse("no citations here"), vec![text("no citations here")]);
        assert!(parse("").is_empty());
    }

    #[test]
    fn parse_bare_citations() {
        assert_eq!(parse("[[a|b]][[c]]"), vec![cit(Some("a"), "b"), cit(None, "c")]);
    }

    #[test]
    fn unterminated_and_empty_are_literal() {
        assert_eq!(parse("open [[rec1 forever"), vec![text("open [[rec1 forever")]);
        assert_eq!(parse("x [[]] y"), vec![text("x [[]] y")]);
    }

    #[test]
    fn last_pipe_splits_id() {
        assert_eq!(parse("[[a | b|rec9]]"), vec![cit(Some("a | b"), "rec9")]);
    }

    #[test]
    fn stray_opener_stays_text() {
        assert_eq!(
            parse("[[a] [[rec2]] end"),
            vec![text("[[a] "), cit(None, "rec2"), text(" end")]
        );
    }

    #[test]
    fn single_bracket_in_display_text_round_trips() {
        let s = serialize("see [note]", "recX");
        assert_eq!(parse(&s), vec![cit(Some("see [note]"), "recX")]);
    }

    #[test]
    fn serialize_round_trips() {
        for (display, id) in [
            ("", "rec1"),
            ("plain", "rec2"),
            ("with | pipe", "rec3"),
            ("🔺 emoji first", "rec4"),
            ("ends with ]", "rec5"),
            ("[starts with bracket", "rec6"),
        ] {
            assert_eq!(parse(&serialize(display, id)), vec![cit(Some(display), id)]);
        }
    }

    #[test]
    fn cited_ids_distinct_in_order() {
        assert!(cited_response_ids("no citations here").is_empty());
        assert_eq!(
            cited_response_ids("[[b]] [[x|a]] [[y|b]]"),
            vec!["b".to_string(), "a".to_string()]
        );
    }

    #[test]
    fn display_text_has_glyph_and_truncation() {
        let keys = SentimentKeys::default();
        let long = "x".repeat(80);
        let r = response("rec1", &long, &["star", "plus"]);
        let display = display_text_for(&r, &keys, 50);
        assert_eq!(display, format!("➕ {}", "x".repeat(50)));

        let plain = response("rec2", "short", &["star"]);
        assert_eq!(display_text_for(&plain, &keys, 50), "short");
    }

    #[test]
    fn display_text_cannot_close_citation() {
        let keys = SentimentKeys::default();
        let r = response("rec1", "tricky ]]] text [[", &[]);
        let c = cite(&r, &keys, 50);
        assert_eq!(
            parse(&c),
            vec![cit(Some("tricky ] ] ] text [ ["), "rec1")]
        );
    }

    #[test]
    fn split_brackets_count_toward_max_len() {
        let keys = SentimentKeys::default();
        let text = format!("{}]]]] tail", "a".repeat(47));
        let r = response("rec1", &text, &["delta"]);
        let display = display_text_for(&r, &keys, 50);
        assert_eq!(display, format!("🔺 {}] ]", "a".repeat(47)));
        assert_eq!(display.chars().count(), 2 + 50);
        assert_eq!(parse(&cite(&r, &keys, 50)), vec![cit(Some(display.as_str()), "rec1")]);
    }

    #[test]
    fn insert_at_char_offset() {
        let (body, cursor) = insert_at("héllo world", 5, "[[rec1]]");
        assert_eq!(body, "héllo[[rec1]] world");
        assert_eq!(cursor, 13);
        let (end, _) = insert_at("abc", 99, "[[r]]");
        assert_eq!(end, "abc[[r]]");
    }

    #[test]
    fn render_resolves_and_marks_missing() {
        let keys = SentimentKeys::default();
        let known = response("rec1", "abcdefghij", &["delta"]);
        let tokens = parse("A [[stale|rec1]] B [[old|gone]]");
        let lookup = |id: &str| if id == "rec1" { Some(&known) } else { None };

        let rendered = render(&tokens, lookup, &keys, 4, false);
        assert_eq!(
            rendered,
            vec![
                RenderedToken::Text("A ".into()),
                RenderedToken::Citation {
                    response_id: "rec1".into(),
                    question_id: "open1".into(),
                    glyph: "🔺",
                    text: "abcd".into(),
                    truncated: true,
                },
                RenderedToken::Text(" B ".into()),
                RenderedToken::Missing {
                    response_id: "gone".into(),
                    display_text: Some("old".into()),
                },
            ]
        );

        let expanded = render(&tokens, lookup, &keys, 4, true);
        match &expanded[1] {
            RenderedToken::Citation { text, truncated, .. } => {
                assert_eq!(text, "abcdefghij");
                assert!(!truncated);
            }
            other => panic!("unexpected token {:?}", other),
        }
    }
}
