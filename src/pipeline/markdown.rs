//! Rendering parsed records and sections into Markdown.
//!
//! All output here is pandoc-bound, so the rules are pandoc's rules:
//! newlines inside table cells become `<br>`, literal pipes are escaped as
//! `\|`, and tables use the GFM pipe format. Malformed sections render as a
//! bracketed placeholder naming the section, so the gap is visible in the
//! final document instead of silently missing.

use crate::pipeline::parse::{McqRecord, Section, SectionBody};

/// Escape a string for use inside a pipe-table cell.
fn cell(s: &str) -> String {
    s.replace('|', "\\|").replace('\n', "<br>")
}

/// Render MCQ records as a numbered two-column `| Question | Answer |` table.
pub fn mcq_table(records: &[McqRecord]) -> String {
    if records.is_empty() {
        return String::new();
    }
    let mut md = String::from("| Question | Answer |\n|---|---|\n");
    for record in records {
        let question = cell(&format!("{}. {}", record.id, record.full_text()));
        md.push_str(&format!("| {} | {} |\n", question, record.correct));
    }
    md
}

/// Render sections as `## title` headings with typed bodies.
///
/// Used by both the summary and the remake pipelines; the remake parser only
/// ever produces table and malformed bodies.
pub fn sections_to_markdown(sections: &[Section]) -> String {
    let mut md = String::new();
    for section in sections {
        md.push_str(&format!("## {}\n", section.title));
        match &section.body {
            SectionBody::Paragraph(text) => {
                md.push_str(text);
                md.push('\n');
            }
            SectionBody::List(items) => {
                for item in items {
                    md.push_str(&format!("- {item}\n"));
                }
                md.push('\n');
            }
            SectionBody::Table(rows) => {
                md.push_str("| Key Point | Details |\n|---|---|\n");
                for row in rows {
                    md.push_str(&format!(
                        "| {} | {} |\n",
                        cell(&row.key_point),
                        cell(&row.details)
                    ));
                }
                md.push('\n');
            }
            SectionBody::Malformed { type_tag } => {
                md.push_str(&malformed_placeholder(&section.title, type_tag));
            }
        }
        md.push('\n');
    }
    md
}

fn malformed_placeholder(title: &str, type_tag: &str) -> String {
    match type_tag {
        "table" => format!(
            "[Content for section '{title}' intended as table, but format was invalid]\n"
        ),
        "missing" => format!("[Section '{title}' is missing content]\n"),
        "empty" => format!("[Section '{title}' has empty or invalid content]\n"),
        other => format!(
            "[Content for section '{title}' has unknown type '{other}' or invalid content]\n"
        ),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::pipeline::parse::TableRow;

    fn record(id: &str, stem: &str) -> McqRecord {
        McqRecord {
            id: id.into(),
            stem: stem.into(),
            choices: [
                "a) One".into(),
                "b) Two".into(),
                "c) Three".into(),
                "d) Four".into(),
                "e) Five".into(),
            ],
            correct: 'b',
        }
    }

    #[test]
    fn mcq_table_numbers_rows_and_uses_br() {
        let md = mcq_table(&[record("1", "First stem?"), record("2", "Second stem?")]);
        let lines: Vec<&str> = md.lines().collect();
        assert_eq!(lines[0], "| Question | Answer |");
        assert_eq!(lines[1], "|---|---|");
        assert!(lines[2].starts_with("| 1. First stem?<br>a) One<br>"));
        assert!(lines[2].ends_with("| b |"));
        assert!(lines[3].starts_with("| 2. "));
        assert_eq!(lines.len(), 4);
    }

    #[test]
    fn mcq_table_escapes_pipes() {
        let md = mcq_table(&[record("1", "Ratio a|b means?")]);
        assert!(md.contains("Ratio a\\|b means?"));
    }

    #[test]
    fn empty_records_render_nothing() {
        assert_eq!(mcq_table(&[]), "");
    }

    #[test]
    fn paragraph_and_list_sections_render_plainly() {
        let sections = vec![
            Section {
                title: "Overview".into(),
                body: SectionBody::Paragraph("Core text.".into()),
            },
            Section {
                title: "Drugs".into(),
                body: SectionBody::List(vec!["ACEi".into(), "ARB".into()]),
            },
        ];
        let md = sections_to_markdown(&sections);
        assert!(md.contains("## Overview\nCore text.\n"));
        assert!(md.contains("## Drugs\n- ACEi\n- ARB\n"));
    }

    #[test]
    fn table_section_uses_fixed_header_and_escaping() {
        let sections = vec![Section {
            title: "Types".into(),
            body: SectionBody::Table(vec![TableRow {
                key_point: "Pri|mary".into(),
                details: "Line one\nLine two".into(),
            }]),
        }];
        let md = sections_to_markdown(&sections);
        assert!(md.contains("| Key Point | Details |\n|---|---|\n"));
        assert!(md.contains("| Pri\\|mary | Line one<br>Line two |"));
    }

    #[test]
    fn malformed_section_renders_visible_placeholder() {
        let sections = vec![Section {
            title: "Broken".into(),
            body: SectionBody::Malformed {
                type_tag: "diagram".into(),
            },
        }];
        let md = sections_to_markdown(&sections);
        assert!(md.contains("## Broken"));
        assert!(md.contains("[Content for section 'Broken' has unknown type 'diagram'"));
    }

    #[test]
    fn section_titles_and_leaves_round_trip() {
        let sections = vec![Section {
            title: "Round Trip".into(),
            body: SectionBody::Table(vec![TableRow {
                key_point: "kp".into(),
                details: "dt".into(),
            }]),
        }];
        let md = sections_to_markdown(&sections);
        assert!(md.contains("Round Trip"));
        assert!(md.contains("kp"));
        assert!(md.contains("dt"));
    }
}
