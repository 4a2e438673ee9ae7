//! Parsing of verified model output into typed records.
//!
//! Two regimes, matching the two output contracts in `prompts.rs`:
//!
//! * **Lenient** — MCQ text is pattern-matched item by item. A block missing
//!   any required piece (stem, five options, correct-answer line) is skipped,
//!   not fatal; the skip count is surfaced in
//!   [`crate::report::ParseStats`] so lossiness is visible to callers.
//!
//! * **Strict** — section output is JSON. The top level must be an array of
//!   objects with the required keys, otherwise the whole pass fails with
//!   [`StudyError::MalformedJson`]. A section whose *content* does not match
//!   its declared type degrades to [`SectionBody::Malformed`] so the rendered
//!   document shows a visible placeholder instead of silently dropping the
//!   section.
//!
//! Both regimes strip Markdown code fences first; models wrap JSON in
//! ```` ```json ```` blocks often enough that this is table stakes.

use crate::error::StudyError;
use crate::report::ParseStats;
use once_cell::sync::Lazy;
use regex::Regex;
use serde::{Deserialize, Serialize};
use serde_json::Value;

/// One parsed multiple-choice question.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct McqRecord {
    /// Sequential 1-based number, as written to the CSV and the table.
    pub id: String,
    /// Question stem with bold markers removed.
    pub stem: String,
    /// The five options, `a)` through `e)`, label included.
    pub choices: [String; 5],
    /// Correct option letter, `a`–`e`.
    pub correct: char,
}

impl McqRecord {
    /// Stem and options joined with newlines, the shape persisted to CSV.
    pub fn full_text(&self) -> String {
        let mut out = self.stem.clone();
        for choice in &self.choices {
            out.push('\n');
            out.push_str(choice);
        }
        out
    }
}

/// One row of a two-column section table.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TableRow {
    pub key_point: String,
    pub details: String,
}

/// The content of one section.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SectionBody {
    Paragraph(String),
    List(Vec<String>),
    Table(Vec<TableRow>),
    /// Content did not match its declared type; `type_tag` is the declared
    /// type (or a marker like `missing`) so the renderer can say what went
    /// wrong in place.
    Malformed { type_tag: String },
}

/// One titled section of a summary or remake document.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Section {
    pub title: String,
    pub body: SectionBody,
}

// Start of one item. Items are split on this marker before matching, so a
// malformed block can never backtrack into its neighbour.
static QUESTION_MARKER: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"(?m)^\*\*Question:\*\*")
        .unwrap_or_else(|e| panic!("invalid question marker pattern: {e}"))
});

// One item: bold Question marker, stem, options a)-e), bold correct-answer
// letter. DOTALL so stems may span lines; MULTILINE anchors per line.
static MCQ_PATTERN: Lazy<Regex> = Lazy::new(|| {
    Regex::new(
        r"(?sm)^\*\*Question:\*\*\s*(.*?)\n+(^a\).*?\n+(?:b\).*?\n+)?(?:c\).*?\n+)?(?:d\).*?\n+)?(?:e\).*?\n*)?)^\*\*Correct Answer:\s*([a-e])\*\*",
    )
    .unwrap_or_else(|e| panic!("invalid MCQ pattern: {e}"))
});

/// Strip a leading ```` ```json ```` / ```` ``` ```` fence and the trailing
/// fence, if present.
pub fn strip_fences(raw: &str) -> &str {
    let trimmed = raw.trim();
    let body = if let Some(rest) = trimmed.strip_prefix("```json") {
        rest
    } else if let Some(rest) = trimmed.strip_prefix("```") {
        rest
    } else {
        return trimmed;
    };
    body.strip_suffix("```").unwrap_or(body).trim()
}

/// Parse verified MCQ text into records, leniently.
///
/// The text is split at `**Question:**` markers and each block is matched on
/// its own, so one malformed item can never consume its neighbour. A block
/// that does not match the full pattern, or that carries fewer than five
/// options, is skipped: the downstream table and CSV promise exactly
/// `a)`–`e)`.
pub fn parse_mcqs(text: &str) -> (Vec<McqRecord>, ParseStats) {
    let text = strip_fences(text);
    let mut records = Vec::new();
    let mut stats = ParseStats::default();

    let starts: Vec<usize> = QUESTION_MARKER.find_iter(text).map(|m| m.start()).collect();
    for (i, &start) in starts.iter().enumerate() {
        let end = starts.get(i + 1).copied().unwrap_or(text.len());
        let block = &text[start..end];

        let Some(caps) = MCQ_PATTERN.captures(block) else {
            stats.skipped += 1;
            continue;
        };

        let stem = caps[1].replace("**", "").trim().to_string();
        let options: Vec<String> = caps[2]
            .lines()
            .map(str::trim)
            .filter(|l| !l.is_empty())
            .map(String::from)
            .collect();
        let correct = caps[3].chars().next().unwrap_or('a');

        if stem.is_empty() || options.len() != 5 {
            stats.skipped += 1;
            continue;
        }
        let choices: [String; 5] = match <[String; 5]>::try_from(options) {
            Ok(c) => c,
            Err(_) => {
                stats.skipped += 1;
                continue;
            }
        };

        stats.matched += 1;
        records.push(McqRecord {
            id: stats.matched.to_string(),
            stem,
            choices,
            correct,
        });
    }

    (records, stats)
}

/// Parse summary-shape section JSON: `[{title, type, content}, ...]`.
///
/// Non-array top level or a section missing `title`/`type` fails the whole
/// pass; a content shape that contradicts its declared type degrades to
/// [`SectionBody::Malformed`].
pub fn parse_sections(raw: &str) -> Result<Vec<Section>, StudyError> {
    let value: Value =
        serde_json::from_str(strip_fences(raw)).map_err(|e| StudyError::MalformedJson {
            detail: format!("invalid JSON: {e}"),
        })?;
    let items = value.as_array().ok_or_else(|| StudyError::MalformedJson {
        detail: "top level is not a JSON array".into(),
    })?;

    let mut sections = Vec::with_capacity(items.len());
    for (i, item) in items.iter().enumerate() {
        let obj = item.as_object().ok_or_else(|| StudyError::MalformedJson {
            detail: format!("section {i} is not an object"),
        })?;
        let title = obj
            .get("title")
            .and_then(Value::as_str)
            .ok_or_else(|| StudyError::MalformedJson {
                detail: format!("section {i} has no string 'title'"),
            })?
            .to_string();
        let type_tag = obj
            .get("type")
            .and_then(Value::as_str)
            .ok_or_else(|| StudyError::MalformedJson {
                detail: format!("section {i} ('{title}') has no string 'type'"),
            })?
            .to_string();

        let body = match (type_tag.as_str(), obj.get("content")) {
            ("paragraph", Some(Value::String(s))) => SectionBody::Paragraph(s.clone()),
            ("list", Some(Value::Array(items))) => {
                let lines: Option<Vec<String>> = items
                    .iter()
                    .map(|v| v.as_str().map(String::from))
                    .collect();
                match lines {
                    Some(lines) => SectionBody::List(lines),
                    None => SectionBody::Malformed { type_tag },
                }
            }
            ("table", Some(Value::Array(rows))) => match parse_table_rows(rows) {
                Some(rows) => SectionBody::Table(rows),
                None => SectionBody::Malformed { type_tag },
            },
            _ => SectionBody::Malformed { type_tag },
        };
        sections.push(Section { title, body });
    }
    Ok(sections)
}

/// Parse remake-shape section JSON: `[{title, content: [{key_point,
/// details}]}, ...]`. Every section is a two-column table.
pub fn parse_remake_sections(raw: &str) -> Result<Vec<Section>, StudyError> {
    let value: Value =
        serde_json::from_str(strip_fences(raw)).map_err(|e| StudyError::MalformedJson {
            detail: format!("invalid JSON: {e}"),
        })?;
    let items = value.as_array().ok_or_else(|| StudyError::MalformedJson {
        detail: "top level is not a JSON array".into(),
    })?;

    let mut sections = Vec::with_capacity(items.len());
    for (i, item) in items.iter().enumerate() {
        let obj = item.as_object().ok_or_else(|| StudyError::MalformedJson {
            detail: format!("section {i} is not an object"),
        })?;
        let title = obj
            .get("title")
            .and_then(Value::as_str)
            .ok_or_else(|| StudyError::MalformedJson {
                detail: format!("section {i} has no string 'title'"),
            })?
            .to_string();

        let body = match obj.get("content") {
            Some(Value::Array(rows)) if !rows.is_empty() => match parse_table_rows(rows) {
                Some(rows) => SectionBody::Table(rows),
                None => SectionBody::Malformed {
                    type_tag: "table".into(),
                },
            },
            Some(Value::Array(_)) => SectionBody::Malformed {
                type_tag: "empty".into(),
            },
            _ => SectionBody::Malformed {
                type_tag: "missing".into(),
            },
        };
        sections.push(Section { title, body });
    }
    Ok(sections)
}

fn parse_table_rows(rows: &[Value]) -> Option<Vec<TableRow>> {
    rows.iter()
        .map(|row| {
            let obj = row.as_object()?;
            Some(TableRow {
                key_point: obj.get("key_point")?.as_str()?.to_string(),
                details: obj.get("details")?.as_str()?.to_string(),
            })
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    fn well_formed(stem: &str, correct: char) -> String {
        format!(
            "**Question:**\n**{stem}**\na) Aortic stenosis\nb) Mitral stenosis\nc) Pulmonary embolism\nd) COPD\ne) VSD\n**Correct Answer: {correct}**\n"
        )
    }

    #[test]
    fn parses_all_well_formed_items() {
        let text = format!(
            "{}\n{}\n{}",
            well_formed("Stem one?", 'a'),
            well_formed("Stem two?", 'c'),
            well_formed("Stem three?", 'e')
        );
        let (records, stats) = parse_mcqs(&text);
        assert_eq!(records.len(), 3);
        assert_eq!(stats, ParseStats { matched: 3, skipped: 0 });
        assert_eq!(records[0].stem, "Stem one?");
        assert_eq!(records[1].correct, 'c');
        assert_eq!(records[2].id, "3");
        assert_eq!(records[0].choices[4], "e) VSD");
    }

    #[test]
    fn item_missing_correct_answer_is_dropped() {
        let bad = "**Question:**\n**No answer here?**\na) One\nb) Two\nc) Three\nd) Four\ne) Five\n";
        let text = format!("{}\n{bad}\n{}", well_formed("Good one?", 'b'), well_formed("Good two?", 'd'));
        let (records, stats) = parse_mcqs(&text);
        assert_eq!(records.len(), 2);
        assert_eq!(stats.skipped, 1);
        assert!(records.iter().all(|r| !r.stem.contains("No answer")));
    }

    #[test]
    fn malformed_block_does_not_swallow_following_item() {
        // The missing-answer block sits between well-formed items; only that
        // block may be lost, never the item after it.
        let bad = "**Question:**\n**No answer here?**\na) One\nb) Two\nc) Three\nd) Four\ne) Five\n";
        let text = format!(
            "{}\n{bad}\n{}\n{}",
            well_formed("Good one?", 'a'),
            well_formed("Good two?", 'b'),
            well_formed("Good three?", 'c')
        );
        let (records, stats) = parse_mcqs(&text);
        assert_eq!(stats, ParseStats { matched: 3, skipped: 1 });
        let stems: Vec<&str> = records.iter().map(|r| r.stem.as_str()).collect();
        assert_eq!(stems, vec!["Good one?", "Good two?", "Good three?"]);
        assert_eq!(records[1].correct, 'b');
    }

    #[test]
    fn item_with_too_few_options_is_counted_as_skipped() {
        let short = "**Question:**\n**Only two options?**\na) One\nb) Two\n**Correct Answer: a**\n";
        let text = format!("{}\n{short}", well_formed("Full one?", 'a'));
        let (records, stats) = parse_mcqs(&text);
        assert_eq!(records.len(), 1);
        assert_eq!(stats.skipped, 1);
    }

    #[test]
    fn stem_bold_markers_are_stripped() {
        let (records, _) = parse_mcqs(&well_formed("A **bolded** stem?", 'a'));
        assert_eq!(records[0].stem, "A bolded stem?");
    }

    #[test]
    fn full_text_joins_stem_and_choices() {
        let (records, _) = parse_mcqs(&well_formed("Stem?", 'b'));
        let full = records[0].full_text();
        assert!(full.starts_with("Stem?\na) "));
        assert_eq!(full.lines().count(), 6);
    }

    #[test]
    fn strips_json_fences() {
        assert_eq!(strip_fences("```json\n[1]\n```"), "[1]");
        assert_eq!(strip_fences("```\n[1]\n```"), "[1]");
        assert_eq!(strip_fences("  [1] "), "[1]");
    }

    #[test]
    fn parses_all_three_section_types() {
        let raw = r#"[
            {"title": "Overview", "type": "paragraph", "content": "Short text."},
            {"title": "Drugs", "type": "list", "content": ["ACEi", "ARB"]},
            {"title": "Types", "type": "table", "content": [
                {"key_point": "Primary", "details": "No cause found."},
                {"key_point": "Secondary", "details": "Underlying condition."}
            ]}
        ]"#;
        let sections = parse_sections(raw).unwrap();
        assert_eq!(sections.len(), 3);
        assert!(matches!(sections[0].body, SectionBody::Paragraph(_)));
        assert!(matches!(sections[1].body, SectionBody::List(ref l) if l.len() == 2));
        assert!(matches!(sections[2].body, SectionBody::Table(ref t) if t.len() == 2));
    }

    #[test]
    fn non_array_top_level_is_fatal() {
        let r = parse_sections(r#"{"title": "x"}"#);
        assert!(matches!(r, Err(StudyError::MalformedJson { .. })));
    }

    #[test]
    fn missing_type_key_is_fatal() {
        let r = parse_sections(r#"[{"title": "x", "content": "y"}]"#);
        assert!(matches!(r, Err(StudyError::MalformedJson { .. })));
    }

    #[test]
    fn unknown_type_degrades_to_malformed() {
        let sections =
            parse_sections(r#"[{"title": "x", "type": "diagram", "content": "y"}]"#).unwrap();
        assert_eq!(
            sections[0].body,
            SectionBody::Malformed {
                type_tag: "diagram".into()
            }
        );
    }

    #[test]
    fn table_with_wrong_row_shape_degrades_to_malformed() {
        let raw = r#"[{"title": "Types", "type": "table", "content": [{"left": "a", "right": "b"}]}]"#;
        let sections = parse_sections(raw).unwrap();
        assert!(matches!(sections[0].body, SectionBody::Malformed { .. }));
    }

    #[test]
    fn remake_sections_are_always_tables() {
        let raw = r#"[{"title": "Absorption", "content": [
            {"key_point": "Definition", "details": "Entry into circulation."}
        ]}]"#;
        let sections = parse_remake_sections(raw).unwrap();
        assert!(matches!(sections[0].body, SectionBody::Table(ref t) if t.len() == 1));
    }

    #[test]
    fn remake_missing_content_degrades_to_malformed() {
        let sections = parse_remake_sections(r#"[{"title": "Empty"}]"#).unwrap();
        assert_eq!(
            sections[0].body,
            SectionBody::Malformed {
                type_tag: "missing".into()
            }
        );
    }
}
