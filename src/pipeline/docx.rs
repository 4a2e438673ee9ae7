//! Markdown → DOCX conversion via pandoc, plus the cover-page merge.
//!
//! All DOCX internals are delegated to pandoc; this module only shells out
//! and shepherds files. The cover template is plain Markdown with a
//! `{{lecture_name}}` placeholder, joined to the body with a raw-openxml
//! page break so the combined document converts in a single pandoc run.
//!
//! The final write is atomic: pandoc targets a dot-prefixed temp name in the
//! output directory and the rename into place is retried a bounded number of
//! times, since the usual cause of a rename failure here is the user holding
//! the old file open in Word.

use crate::config::StudyConfig;
use crate::error::StudyError;
use std::path::{Path, PathBuf};
use tokio::process::Command;
use tracing::{debug, info, warn};

/// Raw OpenXML page break, understood by pandoc's markdown reader.
const PAGE_BREAK_BLOCK: &str =
    "```{=openxml}\n<w:p><w:r><w:br w:type=\"page\"/></w:r></w:p>\n```\n";

const SAVE_ATTEMPTS: u32 = 3;
const SAVE_RETRY_DELAY: std::time::Duration = std::time::Duration::from_secs(2);

/// Human-readable lecture title from a file base name:
/// separators to spaces, then uppercased.
pub fn lecture_name(base_name: &str) -> String {
    base_name
        .replace(['_', '-'], " ")
        .split_whitespace()
        .collect::<Vec<_>>()
        .join(" ")
        .to_uppercase()
}

/// Render a cover template, substituting `{{lecture_name}}`.
pub fn render_cover(template_path: &Path, lecture: &str) -> Result<String, StudyError> {
    let template =
        std::fs::read_to_string(template_path).map_err(|_| StudyError::FileNotFound {
            path: template_path.to_path_buf(),
        })?;
    Ok(template.replace("{{lecture_name}}", lecture))
}

/// Prepend a rendered cover to the body, separated by a hard page break.
pub fn merge_cover(cover: &str, body: &str) -> String {
    format!("{}\n\n{}\n\n{}", cover.trim_end(), PAGE_BREAK_BLOCK, body)
}

fn pandoc_path(config: &StudyConfig) -> PathBuf {
    config
        .pandoc_path
        .clone()
        .unwrap_or_else(|| PathBuf::from("pandoc"))
}

/// Convert a Markdown string to DOCX at `output_path`.
///
/// When `cover_template` is set, the rendered cover page is prepended first.
pub async fn write_docx(
    config: &StudyConfig,
    markdown: &str,
    cover_template: Option<&Path>,
    lecture: &str,
    output_path: &Path,
) -> Result<(), StudyError> {
    let combined = match cover_template {
        Some(template) => merge_cover(&render_cover(template, lecture)?, markdown),
        None => markdown.to_string(),
    };

    let temp_dir = tempfile::tempdir().map_err(|e| StudyError::Internal(e.to_string()))?;
    let md_path = temp_dir.path().join("content.md");
    std::fs::write(&md_path, &combined).map_err(|e| StudyError::Internal(e.to_string()))?;

    // Pandoc writes next to the final destination so the rename below stays
    // on one filesystem.
    let parent = output_path.parent().unwrap_or_else(|| Path::new("."));
    let file_name = output_path
        .file_name()
        .map(|n| n.to_string_lossy().into_owned())
        .unwrap_or_else(|| "output.docx".to_string());
    let staging = parent.join(format!(".{file_name}.tmp"));

    let pandoc = pandoc_path(config);
    debug!(pandoc = %pandoc.display(), out = %output_path.display(), "running pandoc");
    let output = Command::new(&pandoc)
        .arg("-f")
        .arg("markdown")
        .arg("-t")
        .arg("docx")
        .arg("--wrap=none")
        .arg("-o")
        .arg(&staging)
        .arg(&md_path)
        .kill_on_drop(true)
        .output()
        .await
        .map_err(|e| match e.kind() {
            std::io::ErrorKind::NotFound => StudyError::MissingDependency {
                tool: "pandoc",
                hint: "Install pandoc (https://pandoc.org/installing.html) or set the pandoc path override.".into(),
            },
            _ => StudyError::ToolFailed {
                tool: "pandoc",
                detail: e.to_string(),
            },
        })?;

    if !output.status.success() {
        let _ = std::fs::remove_file(&staging);
        return Err(StudyError::ToolFailed {
            tool: "pandoc",
            detail: String::from_utf8_lossy(&output.stderr).trim().to_string(),
        });
    }

    persist(&staging, output_path).await?;
    info!(out = %output_path.display(), "DOCX written");
    Ok(())
}

/// Rename the staged file into place, retrying transient permission errors.
async fn persist(staging: &Path, output_path: &Path) -> Result<(), StudyError> {
    let mut last_err: Option<std::io::Error> = None;
    for attempt in 1..=SAVE_ATTEMPTS {
        match std::fs::rename(staging, output_path) {
            Ok(()) => return Ok(()),
            Err(e) if e.kind() == std::io::ErrorKind::PermissionDenied => {
                warn!(
                    attempt,
                    max_attempts = SAVE_ATTEMPTS,
                    out = %output_path.display(),
                    "save failed (permission denied), is the file open elsewhere?"
                );
                last_err = Some(e);
                if attempt < SAVE_ATTEMPTS {
                    tokio::time::sleep(SAVE_RETRY_DELAY).await;
                }
            }
            Err(e) => {
                let _ = std::fs::remove_file(staging);
                return Err(StudyError::OutputWriteFailed {
                    path: output_path.to_path_buf(),
                    source: e,
                });
            }
        }
    }
    let _ = std::fs::remove_file(staging);
    Err(StudyError::OutputWriteFailed {
        path: output_path.to_path_buf(),
        source: last_err.unwrap_or_else(|| std::io::Error::other("save retries exhausted")),
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    #[test]
    fn lecture_name_normalises_separators_and_case() {
        assert_eq!(lecture_name("cardio_lecture-03"), "CARDIO LECTURE 03");
        assert_eq!(lecture_name("renal"), "RENAL");
    }

    #[test]
    fn cover_placeholder_is_substituted() {
        let dir = tempfile::tempdir().unwrap();
        let template = dir.path().join("cover.md");
        std::fs::File::create(&template)
            .unwrap()
            .write_all(b"# {{lecture_name}}\n\nStudy set")
            .unwrap();
        let rendered = render_cover(&template, "CARDIO 01").unwrap();
        assert_eq!(rendered, "# CARDIO 01\n\nStudy set");
    }

    #[test]
    fn missing_template_is_file_not_found() {
        let r = render_cover(Path::new("/nonexistent/cover.md"), "X");
        assert!(matches!(r, Err(StudyError::FileNotFound { .. })));
    }

    #[test]
    fn merge_inserts_openxml_page_break_between_cover_and_body() {
        let merged = merge_cover("# Cover\n", "## Body");
        let cover_pos = merged.find("# Cover").unwrap();
        let break_pos = merged.find("w:br w:type=\"page\"").unwrap();
        let body_pos = merged.find("## Body").unwrap();
        assert!(cover_pos < break_pos && break_pos < body_pos);
        assert!(merged.contains("```{=openxml}"));
    }
}
