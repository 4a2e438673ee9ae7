//! OCR text extraction: pdftoppm rasterisation + per-page tesseract.
//!
//! ## Why subprocesses?
//!
//! Poppler's `pdftoppm` and `tesseract` are the workhorses for scanned
//! documents, and both are filesystem-path tools. Page images land in a
//! `TempDir` whose lifetime is bound to one document's extraction, so
//! intermediates are removed on every exit path, including panics.
//!
//! ## Failure containment
//!
//! A single stuck or crashing page must not cost the whole document:
//! each page gets its own tesseract invocation under a timeout, and a failed
//! page is replaced by an inline `[ERROR: ...]` marker recorded alongside the
//! text. Only whole-document problems (missing file, corrupt PDF, missing
//! binaries) are fatal.

use crate::config::StudyConfig;
use crate::error::{PageError, StudyError};
use crate::report::ExtractedDocument;
use std::path::{Path, PathBuf};
use tempfile::TempDir;
use tokio::process::Command;
use tracing::{debug, info, warn};

/// Separator between page texts in the assembled document.
pub const PAGE_BREAK: &str = "\n\n--- Page Break ---\n\n";

/// Resolve a tool path override or fall back to the bare name on PATH.
fn tool_path(override_path: &Option<PathBuf>, name: &'static str) -> PathBuf {
    override_path.clone().unwrap_or_else(|| PathBuf::from(name))
}

/// Probe that a binary can be spawned at all.
async fn probe_tool(
    path: &Path,
    tool: &'static str,
    probe_arg: &str,
    hint: &str,
) -> Result<(), StudyError> {
    match Command::new(path).arg(probe_arg).output().await {
        Ok(_) => Ok(()),
        Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
            Err(StudyError::MissingDependency {
                tool,
                hint: hint.to_string(),
            })
        }
        Err(e) => Err(StudyError::ToolFailed {
            tool,
            detail: e.to_string(),
        }),
    }
}

/// Validate the input: existence, `.pdf` extension, `%PDF` magic bytes.
fn validate_pdf(path: &Path) -> Result<(), StudyError> {
    if !path.exists() {
        return Err(StudyError::FileNotFound {
            path: path.to_path_buf(),
        });
    }

    let is_pdf_ext = path
        .extension()
        .map(|e| e.eq_ignore_ascii_case("pdf"))
        .unwrap_or(false);

    let mut magic = [0u8; 4];
    match std::fs::File::open(path) {
        Ok(mut f) => {
            use std::io::Read;
            let read_ok = f.read_exact(&mut magic).is_ok();
            if !is_pdf_ext || !read_ok || &magic != b"%PDF" {
                return Err(StudyError::NotAPdf {
                    path: path.to_path_buf(),
                    magic,
                });
            }
        }
        Err(e) if e.kind() == std::io::ErrorKind::PermissionDenied => {
            return Err(StudyError::PermissionDenied {
                path: path.to_path_buf(),
            });
        }
        Err(_) => {
            return Err(StudyError::FileNotFound {
                path: path.to_path_buf(),
            });
        }
    }
    Ok(())
}

/// Rasterise every page to a grayscale PNG inside `dir`.
///
/// Returns the page image paths, sorted. Zero pages is not an error here;
/// the caller gets an empty document.
async fn rasterize(
    pdftoppm: &Path,
    pdf_path: &Path,
    dir: &Path,
    dpi: u32,
) -> Result<Vec<PathBuf>, StudyError> {
    let prefix = dir.join("page");
    let output = Command::new(pdftoppm)
        .arg("-png")
        .arg("-gray")
        .arg("-r")
        .arg(dpi.to_string())
        .arg(pdf_path)
        .arg(&prefix)
        .kill_on_drop(true)
        .output()
        .await
        .map_err(|e| StudyError::ToolFailed {
            tool: "pdftoppm",
            detail: e.to_string(),
        })?;

    if !output.status.success() {
        return Err(StudyError::CorruptPdf {
            path: pdf_path.to_path_buf(),
            detail: String::from_utf8_lossy(&output.stderr).trim().to_string(),
        });
    }

    let mut pages: Vec<PathBuf> = std::fs::read_dir(dir)
        .map_err(|e| StudyError::Internal(format!("reading raster dir: {e}")))?
        .filter_map(|entry| entry.ok().map(|e| e.path()))
        .filter(|p| p.extension().map(|e| e == "png").unwrap_or(false))
        .collect();
    // pdftoppm zero-pads page numbers to a fixed width, so lexicographic
    // order is page order.
    pages.sort();
    Ok(pages)
}

/// OCR one page image, bounded by the per-page timeout.
async fn ocr_page(
    tesseract: &Path,
    image: &Path,
    page: usize,
    lang: &str,
    timeout_secs: u64,
) -> Result<String, PageError> {
    let fut = Command::new(tesseract)
        .arg(image)
        .arg("stdout")
        .arg("-l")
        .arg(lang)
        .kill_on_drop(true)
        .output();

    let output = match tokio::time::timeout(std::time::Duration::from_secs(timeout_secs), fut).await
    {
        Err(_elapsed) => {
            return Err(PageError::OcrTimeout {
                page,
                secs: timeout_secs,
            })
        }
        Ok(Err(e)) => {
            return Err(PageError::Unexpected {
                page,
                detail: e.to_string(),
            })
        }
        Ok(Ok(output)) => output,
    };

    if !output.status.success() {
        return Err(PageError::OcrFailed {
            page,
            detail: String::from_utf8_lossy(&output.stderr).trim().to_string(),
        });
    }
    Ok(String::from_utf8_lossy(&output.stdout).trim().to_string())
}

/// Extract the full text of one PDF.
///
/// Pages that fail OCR become inline markers; their errors are returned in
/// [`ExtractedDocument::failed_pages`]. Zero rasterised pages yields an
/// empty document, not an error.
pub async fn extract_pdf(
    pdf_path: &Path,
    config: &StudyConfig,
) -> Result<ExtractedDocument, StudyError> {
    validate_pdf(pdf_path)?;

    let pdftoppm = tool_path(&config.pdftoppm_path, "pdftoppm");
    let tesseract = tool_path(&config.tesseract_path, "tesseract");
    probe_tool(
        &pdftoppm,
        "pdftoppm",
        "-v",
        "Install poppler-utils (e.g. apt install poppler-utils).",
    )
    .await?;
    probe_tool(
        &tesseract,
        "tesseract",
        "--version",
        "Install tesseract-ocr (e.g. apt install tesseract-ocr).",
    )
    .await?;

    let temp_dir = TempDir::new().map_err(|e| StudyError::Internal(e.to_string()))?;
    info!(pdf = %pdf_path.display(), dpi = config.dpi, "rasterising");
    let pages = rasterize(&pdftoppm, pdf_path, temp_dir.path(), config.dpi).await?;
    info!(pages = pages.len(), "rasterised");

    let mut page_texts = Vec::with_capacity(pages.len());
    let mut failed_pages = Vec::new();
    for (i, image) in pages.iter().enumerate() {
        let page = i + 1;
        debug!(page, image = %image.display(), "running OCR");
        match ocr_page(
            &tesseract,
            image,
            page,
            &config.ocr_lang,
            config.ocr_page_timeout_secs,
        )
        .await
        {
            Ok(text) => page_texts.push(text),
            Err(err) => {
                warn!(page, error = %err, "page OCR failed, substituting marker");
                page_texts.push(err.marker());
                failed_pages.push(err);
            }
        }
    }

    let base_name = pdf_path
        .file_stem()
        .map(|s| s.to_string_lossy().into_owned())
        .unwrap_or_else(|| "document".to_string());

    Ok(ExtractedDocument {
        source: pdf_path.to_path_buf(),
        base_name,
        text: page_texts.join(PAGE_BREAK),
        pages: pages.len(),
        failed_pages,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    #[test]
    fn missing_file_is_file_not_found() {
        let r = validate_pdf(Path::new("/nonexistent/lecture.pdf"));
        assert!(matches!(r, Err(StudyError::FileNotFound { .. })));
    }

    #[test]
    fn wrong_magic_bytes_is_not_a_pdf() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("fake.pdf");
        std::fs::File::create(&path)
            .unwrap()
            .write_all(b"PK\x03\x04 not a pdf")
            .unwrap();
        match validate_pdf(&path) {
            Err(StudyError::NotAPdf { magic, .. }) => assert_eq!(&magic, b"PK\x03\x04"),
            other => panic!("expected NotAPdf, got {other:?}"),
        }
    }

    #[test]
    fn wrong_extension_is_not_a_pdf() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("lecture.txt");
        std::fs::File::create(&path)
            .unwrap()
            .write_all(b"%PDF-1.7")
            .unwrap();
        assert!(matches!(
            validate_pdf(&path),
            Err(StudyError::NotAPdf { .. })
        ));
    }

    #[test]
    fn valid_header_and_extension_pass() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("lecture.pdf");
        std::fs::File::create(&path)
            .unwrap()
            .write_all(b"%PDF-1.7\n")
            .unwrap();
        assert!(validate_pdf(&path).is_ok());
    }

    #[test]
    fn page_break_separator_shape() {
        let joined = ["one", "two"].join(PAGE_BREAK);
        assert_eq!(joined, "one\n\n--- Page Break ---\n\ntwo");
    }

    #[tokio::test]
    async fn missing_binary_is_missing_dependency() {
        let r = probe_tool(
            Path::new("definitely-not-a-real-binary-xyz"),
            "pdftoppm",
            "-v",
            "install it",
        )
        .await;
        assert!(matches!(r, Err(StudyError::MissingDependency { .. })));
    }
}
