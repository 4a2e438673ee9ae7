//! Batch orchestration: extraction pass, then per-document generation.
//!
//! Scheduling is deliberately sequential — documents one after another,
//! modes one after another within a document — because the binding
//! constraint is the model API's rate limit, not local CPU. What the runner
//! adds is containment: an extraction failure loses one PDF, a mode failure
//! loses one artifact, and everything else keeps going. The full ledger of
//! what happened comes back as a [`RunReport`].

use crate::config::StudyConfig;
use crate::error::StudyError;
use crate::pipeline::docx::{lecture_name, write_docx};
use crate::pipeline::extract::extract_pdf;
use crate::pipeline::gemini::{GeminiClient, GenerativeModel};
use crate::pipeline::markdown::{mcq_table, sections_to_markdown};
use crate::pipeline::mindmap::{parse_topic_tree, write_xmind};
use crate::pipeline::parse::{parse_mcqs, parse_remake_sections, parse_sections, McqRecord};
use crate::pipeline::generate;
use crate::report::{DocumentReport, ModeOutcome, ParseStats, RunReport};
use std::path::{Path, PathBuf};
use std::sync::Arc;
use tracing::{error, info, warn};

/// Suffix appended to a PDF's base name for its extracted-text file.
pub const EXTRACTED_SUFFIX: &str = "_extracted";

/// Run the configured batch end to end.
pub async fn run(config: &StudyConfig) -> Result<RunReport, StudyError> {
    std::fs::create_dir_all(&config.output_dir).map_err(|e| StudyError::OutputWriteFailed {
        path: config.output_dir.clone(),
        source: e,
    })?;
    std::fs::create_dir_all(config.extracted_dir()).map_err(|e| {
        StudyError::OutputWriteFailed {
            path: config.extracted_dir().clone(),
            source: e,
        }
    })?;

    let mut report = RunReport::default();

    if config.modes.extraction {
        extraction_pass(config, &mut report).await;
    }

    if config.modes.is_empty() {
        info!("no generation modes enabled, stopping after extraction");
        return Ok(report);
    }

    let model: Arc<dyn GenerativeModel> = match &config.model_override {
        Some(m) => m.clone(),
        None => Arc::new(GeminiClient::from_config(config)?),
    };

    let documents = list_files(config.extracted_dir(), "md")?;
    info!(documents = documents.len(), "starting generation pass");

    for path in documents {
        let doc_report = process_document(model.as_ref(), config, &path).await;
        if doc_report.failure_count() > 0 {
            warn!(
                document = %path.display(),
                failures = doc_report.failure_count(),
                "document finished with failures"
            );
        }
        report.documents.push(doc_report);
    }

    Ok(report)
}

/// OCR every `*.pdf` in the input directory, skipping ones whose extracted
/// text already exists. Failures are recorded, never propagated.
async fn extraction_pass(config: &StudyConfig, report: &mut RunReport) {
    let pdfs = match list_files(&config.input_dir, "pdf") {
        Ok(pdfs) => pdfs,
        Err(e) => {
            error!(dir = %config.input_dir.display(), error = %e, "cannot scan input directory");
            return;
        }
    };
    info!(pdfs = pdfs.len(), "starting extraction pass");

    for pdf in pdfs {
        let stem = pdf
            .file_stem()
            .map(|s| s.to_string_lossy().into_owned())
            .unwrap_or_else(|| "document".to_string());
        let out = config
            .extracted_dir()
            .join(format!("{stem}{EXTRACTED_SUFFIX}.md"));

        if config.skip_existing_extraction && out.exists() {
            info!(pdf = %pdf.display(), "extracted text exists, skipping OCR");
            report.extraction_skipped.push(pdf);
            continue;
        }

        match extract_pdf(&pdf, config).await {
            Ok(doc) => {
                if !doc.failed_pages.is_empty() {
                    warn!(
                        pdf = %pdf.display(),
                        failed_pages = doc.failed_pages.len(),
                        "extraction finished with page errors"
                    );
                }
                if let Err(e) = std::fs::write(&out, &doc.text) {
                    error!(out = %out.display(), error = %e, "failed writing extracted text");
                    report.extraction_failed.push((pdf, e.to_string()));
                } else {
                    info!(out = %out.display(), pages = doc.pages, "extraction written");
                    report.extracted.push(pdf);
                }
            }
            Err(e) => {
                error!(pdf = %pdf.display(), error = %e, "extraction failed");
                report.extraction_failed.push((pdf, e.to_string()));
            }
        }
    }
}

/// Run every enabled mode for one extracted document. Each mode is contained:
/// its failure is recorded and the next mode proceeds.
async fn process_document(
    model: &dyn GenerativeModel,
    config: &StudyConfig,
    md_path: &Path,
) -> DocumentReport {
    let base_name = base_name_of(md_path);
    info!(document = %base_name, "processing");

    let text = match std::fs::read_to_string(md_path) {
        Ok(text) => text,
        Err(e) => {
            error!(document = %md_path.display(), error = %e, "cannot read extracted text");
            let failed = ModeOutcome::Failed {
                stage: "read".to_string(),
                error: e.to_string(),
            };
            return DocumentReport {
                base_name,
                source: md_path.to_path_buf(),
                mcqs: failed.clone(),
                summary: failed.clone(),
                remake: failed.clone(),
                mindmap: failed,
            };
        }
    };
    if text.trim().is_empty() {
        let err = StudyError::EmptyInput {
            path: md_path.to_path_buf(),
        };
        warn!(document = %md_path.display(), "extracted text is empty, skipping");
        let skipped = ModeOutcome::Skipped {
            reason: err.to_string(),
        };
        return DocumentReport {
            base_name,
            source: md_path.to_path_buf(),
            mcqs: skipped.clone(),
            summary: skipped.clone(),
            remake: skipped.clone(),
            mindmap: skipped,
        };
    }

    let mcqs = if config.modes.mcqs {
        contain("mcqs", &base_name, mcq_mode(model, config, &text, &base_name).await)
    } else {
        disabled()
    };
    let summary = if config.modes.summary {
        contain(
            "summary",
            &base_name,
            summary_mode(model, config, &text, &base_name).await,
        )
    } else {
        disabled()
    };
    let remake = if config.modes.remake {
        contain(
            "remake",
            &base_name,
            remake_mode(model, config, &text, &base_name).await,
        )
    } else {
        disabled()
    };
    let mindmap = if config.modes.mindmap {
        contain(
            "mindmap",
            &base_name,
            mindmap_mode(model, config, &text, &base_name).await,
        )
    } else {
        disabled()
    };

    DocumentReport {
        base_name,
        source: md_path.to_path_buf(),
        mcqs,
        summary,
        remake,
        mindmap,
    }
}

fn disabled() -> ModeOutcome {
    ModeOutcome::Skipped {
        reason: "mode disabled".into(),
    }
}

fn contain(
    stage: &str,
    base_name: &str,
    result: Result<(PathBuf, Option<ParseStats>), StudyError>,
) -> ModeOutcome {
    match result {
        Ok((output, parse_stats)) => {
            info!(document = base_name, stage, output = %output.display(), "mode completed");
            ModeOutcome::Completed {
                output,
                parse_stats,
            }
        }
        Err(e) => {
            error!(document = base_name, stage, error = %e, "mode failed");
            ModeOutcome::Failed {
                stage: stage.to_string(),
                error: e.to_string(),
            }
        }
    }
}

/// MCQ mode: generate + verify, parse, persist CSV, then render the DOCX.
///
/// The CSV is written before pandoc runs so the structured records survive a
/// conversion failure.
async fn mcq_mode(
    model: &dyn GenerativeModel,
    config: &StudyConfig,
    text: &str,
    base_name: &str,
) -> Result<(PathBuf, Option<ParseStats>), StudyError> {
    let verified = generate::mcqs(model, config, text).await?;
    let (records, stats) = parse_mcqs(&verified);
    if records.is_empty() {
        return Err(StudyError::MalformedJson {
            detail: format!(
                "no MCQs matched the required format ({} blocks skipped)",
                stats.skipped
            ),
        });
    }
    if stats.skipped > 0 {
        warn!(
            document = base_name,
            matched = stats.matched,
            skipped = stats.skipped,
            "some MCQ blocks did not match the required format"
        );
    }

    let csv_path = config.output_dir.join(format!("{base_name}_mcqs.csv"));
    write_mcq_csv(&records, &csv_path)?;

    let docx_path = config.output_dir.join(format!("{base_name}_mcqs.docx"));
    write_docx(
        config,
        &mcq_table(&records),
        config.mcq_cover_template.as_deref(),
        &lecture_name(base_name),
        &docx_path,
    )
    .await?;
    Ok((docx_path, Some(stats)))
}

async fn summary_mode(
    model: &dyn GenerativeModel,
    config: &StudyConfig,
    text: &str,
    base_name: &str,
) -> Result<(PathBuf, Option<ParseStats>), StudyError> {
    let Some(verified) = generate::summary(model, config, text).await? else {
        return Err(StudyError::RetriesExhausted {
            stage: "summary",
            attempts: config.retry.max_attempts,
            detail: "no usable JSON from generation or verification".into(),
        });
    };
    let sections = parse_sections(&verified)?;
    let docx_path = config.output_dir.join(format!("{base_name}_summary.docx"));
    write_docx(
        config,
        &sections_to_markdown(&sections),
        config.summary_cover_template.as_deref(),
        &lecture_name(base_name),
        &docx_path,
    )
    .await?;
    Ok((docx_path, None))
}

async fn remake_mode(
    model: &dyn GenerativeModel,
    config: &StudyConfig,
    text: &str,
    base_name: &str,
) -> Result<(PathBuf, Option<ParseStats>), StudyError> {
    let Some(verified) = generate::remake(model, config, text).await? else {
        return Err(StudyError::RetriesExhausted {
            stage: "remake",
            attempts: config.retry.max_attempts,
            detail: "no usable JSON from generation or verification".into(),
        });
    };
    let sections = parse_remake_sections(&verified)?;
    let docx_path = config.output_dir.join(format!("{base_name}_remake.docx"));
    write_docx(
        config,
        &sections_to_markdown(&sections),
        config.remake_cover_template.as_deref(),
        &lecture_name(base_name),
        &docx_path,
    )
    .await?;
    Ok((docx_path, None))
}

async fn mindmap_mode(
    model: &dyn GenerativeModel,
    config: &StudyConfig,
    text: &str,
    base_name: &str,
) -> Result<(PathBuf, Option<ParseStats>), StudyError> {
    let Some(raw) = generate::mindmap(model, config, text).await? else {
        return Err(StudyError::RetriesExhausted {
            stage: "mindmap",
            attempts: config.retry.max_attempts,
            detail: "no usable JSON from generation".into(),
        });
    };
    let tree = parse_topic_tree(&raw)?;
    let xmind_path = config.output_dir.join(format!("{base_name}_mindmap.xmind"));
    write_xmind(&tree, base_name, &xmind_path)?;
    Ok((xmind_path, None))
}

/// Persist parsed MCQs as CSV, one row per question.
pub fn write_mcq_csv(records: &[McqRecord], path: &Path) -> Result<(), StudyError> {
    let mut writer = csv::Writer::from_path(path).map_err(|e| StudyError::OutputWriteFailed {
        path: path.to_path_buf(),
        source: std::io::Error::other(e),
    })?;
    writer
        .write_record(["Count", "MCQ", "CorrectAnswer"])
        .and_then(|_| {
            for record in records {
                writer.write_record([
                    record.id.as_str(),
                    &record.full_text(),
                    &record.correct.to_string(),
                ])?;
            }
            writer.flush().map_err(csv::Error::from)
        })
        .map_err(|e| StudyError::OutputWriteFailed {
            path: path.to_path_buf(),
            source: std::io::Error::other(e),
        })
}

/// Strip the `_extracted` suffix (if present) from a file stem.
fn base_name_of(path: &Path) -> String {
    let stem = path
        .file_stem()
        .map(|s| s.to_string_lossy().into_owned())
        .unwrap_or_else(|| "document".to_string());
    stem.strip_suffix(EXTRACTED_SUFFIX)
        .map(String::from)
        .unwrap_or(stem)
}

/// Files in `dir` with the given extension, sorted for deterministic order.
fn list_files(dir: &Path, extension: &str) -> Result<Vec<PathBuf>, StudyError> {
    let mut files: Vec<PathBuf> = std::fs::read_dir(dir)
        .map_err(|_| StudyError::FileNotFound {
            path: dir.to_path_buf(),
        })?
        .filter_map(|entry| entry.ok().map(|e| e.path()))
        .filter(|p| {
            p.is_file()
                && p.extension()
                    .map(|e| e.eq_ignore_ascii_case(extension))
                    .unwrap_or(false)
        })
        .collect();
    files.sort();
    Ok(files)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::Modes;
    use crate::pipeline::gemini::ResponseKind;
    use async_trait::async_trait;

    /// A model that must never be reached.
    struct UnusedModel;

    #[async_trait]
    impl GenerativeModel for UnusedModel {
        async fn generate(
            &self,
            _system: &str,
            _prompt: &str,
            _kind: ResponseKind,
        ) -> Result<String, StudyError> {
            Err(StudyError::Internal("model should not be called".into()))
        }

        fn name(&self) -> &str {
            "unused"
        }
    }

    #[test]
    fn base_name_strips_extracted_suffix() {
        assert_eq!(
            base_name_of(Path::new("/x/cardio_01_extracted.md")),
            "cardio_01"
        );
        assert_eq!(base_name_of(Path::new("/x/plain_notes.md")), "plain_notes");
    }

    #[test]
    fn list_files_filters_and_sorts() {
        let dir = tempfile::tempdir().unwrap();
        for name in ["b.md", "a.md", "notes.txt", "c.MD"] {
            std::fs::write(dir.path().join(name), "x").unwrap();
        }
        let files = list_files(dir.path(), "md").unwrap();
        let names: Vec<_> = files
            .iter()
            .map(|p| p.file_name().unwrap().to_string_lossy().into_owned())
            .collect();
        assert_eq!(names, vec!["a.md", "b.md", "c.MD"]);
    }

    #[tokio::test]
    async fn unreadable_extracted_text_fails_instead_of_skipping() {
        let input = tempfile::tempdir().unwrap();
        let output = tempfile::tempdir().unwrap();
        // Invalid UTF-8 makes the read fail without touching permissions.
        std::fs::write(input.path().join("lec1_extracted.md"), [0xff, 0xfe, 0xfd]).unwrap();

        let config = StudyConfig::builder()
            .input_dir(input.path())
            .output_dir(output.path())
            .model_override(Arc::new(UnusedModel))
            .modes(Modes {
                extraction: false,
                mcqs: true,
                summary: false,
                remake: false,
                mindmap: false,
            })
            .build()
            .unwrap();

        let report = run(&config).await.unwrap();
        assert_eq!(report.documents.len(), 1);
        match &report.documents[0].mcqs {
            ModeOutcome::Failed { stage, .. } => assert_eq!(stage, "read"),
            other => panic!("expected a read failure, got {other:?}"),
        }
        assert!(!report.all_succeeded());
    }

    #[test]
    fn csv_has_header_and_one_row_per_record() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("out.csv");
        let records = vec![McqRecord {
            id: "1".into(),
            stem: "Stem?".into(),
            choices: [
                "a) A".into(),
                "b) B".into(),
                "c) C".into(),
                "d) D".into(),
                "e) E".into(),
            ],
            correct: 'c',
        }];
        write_mcq_csv(&records, &path).unwrap();
        let content = std::fs::read_to_string(&path).unwrap();
        assert!(content.starts_with("Count,MCQ,CorrectAnswer"));
        assert!(content.contains("Stem?"));
        assert!(content.contains(",c"));
    }
}
