//! Error types for the pdf2study library.
//!
//! Two distinct error types reflect two distinct failure modes:
//!
//! * [`StudyError`] — **Fatal for a document or mode**: the pipeline stage
//!   cannot proceed (bad input file, missing external tool, model call that
//!   exhausted its retries, structured output that failed strict parsing).
//!   Returned as `Err(StudyError)` from the top-level pipeline functions.
//!
//! * [`PageError`] — **Non-fatal**: a single page failed OCR (timeout,
//!   tesseract crash) but the remaining pages are fine. The extractor
//!   substitutes an inline marker for the bad page and records the error in
//!   [`crate::report::ExtractedDocument`] so callers see partial success
//!   rather than losing the whole document to one page.
//!
//! The batch runner contains `StudyError`s at per-document, per-mode
//! granularity: one mode failing never stops the other modes, and one
//! document failing never stops the batch.

use std::path::PathBuf;
use thiserror::Error;

/// All fatal errors returned by the pdf2study library.
///
/// Page-level OCR failures use [`PageError`] and become inline markers in the
/// extracted text rather than propagating here.
#[derive(Debug, Error)]
pub enum StudyError {
    // ── Input errors ──────────────────────────────────────────────────────
    /// Input file was not found at the given path.
    #[error("File not found: '{path}'\nCheck the path exists and is readable.")]
    FileNotFound { path: PathBuf },

    /// Process does not have read permission on the file.
    #[error("Permission denied reading '{path}'")]
    PermissionDenied { path: PathBuf },

    /// The file exists and was read, but is not a PDF.
    #[error("File is not a valid PDF: '{path}'\nFirst bytes: {magic:?}")]
    NotAPdf { path: PathBuf, magic: [u8; 4] },

    /// The PDF could not be rasterised at all (corrupt or unreadable).
    #[error("PDF '{path}' could not be processed: {detail}")]
    CorruptPdf { path: PathBuf, detail: String },

    /// Extracted text file exists but contains nothing usable.
    #[error("Input '{path}' is empty; nothing to generate from.")]
    EmptyInput { path: PathBuf },

    // ── External tool errors ──────────────────────────────────────────────
    /// A required external binary (pdftoppm, tesseract, pandoc) is missing.
    #[error("Required tool '{tool}' was not found on PATH.\n{hint}")]
    MissingDependency { tool: &'static str, hint: String },

    /// An external tool ran but exited with an error.
    #[error("'{tool}' failed: {detail}")]
    ToolFailed { tool: &'static str, detail: String },

    // ── Model errors ──────────────────────────────────────────────────────
    /// The model API returned HTTP 429. Retried by the policy layer.
    #[error("Rate limit exceeded for model '{model}'")]
    RateLimited { model: String },

    /// The model returned an empty or safety-blocked response.
    #[error("Model response was empty or blocked{}", match .reason { Some(r) => format!(" ({r})"), None => String::new() })]
    ResponseBlocked { reason: Option<String> },

    /// Authentication failure (bad or missing API key). Never retried.
    #[error("Authentication failed against the model API: {detail}\nCheck GEMINI_API_KEY / --api-key.")]
    AuthFailed { detail: String },

    /// Transport-level or unclassified API failure.
    #[error("Model API error: {detail}")]
    ApiError { detail: String },

    /// All retry attempts for a model call failed.
    #[error("'{stage}' failed after {attempts} attempts: {detail}")]
    RetriesExhausted {
        stage: &'static str,
        attempts: u32,
        detail: String,
    },

    // ── Parse errors ──────────────────────────────────────────────────────
    /// Structured model output did not match the required top-level JSON
    /// shape. Lenient MCQ parsing never raises this; it skips per item.
    #[error("Model output is not the expected JSON shape: {detail}")]
    MalformedJson { detail: String },

    // ── Output errors ─────────────────────────────────────────────────────
    /// Could not create or write an output artifact.
    #[error("Failed to write output '{path}': {source}")]
    OutputWriteFailed {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    // ── Config errors ─────────────────────────────────────────────────────
    /// Builder validation failed.
    #[error("Invalid configuration: {0}")]
    InvalidConfig(String),

    // ── Catch-all ─────────────────────────────────────────────────────────
    /// Unexpected internal error (task panic, poisoned state).
    #[error("Internal error: {0}")]
    Internal(String),
}

/// A non-fatal OCR failure scoped to a single page.
///
/// The extractor replaces the page's text with [`PageError::marker`] output
/// and keeps going; only whole-document problems become [`StudyError`].
#[derive(Debug, Clone, Error, serde::Serialize, serde::Deserialize)]
pub enum PageError {
    /// Tesseract exceeded the per-page timeout.
    #[error("Page {page}: OCR timed out after {secs}s")]
    OcrTimeout { page: usize, secs: u64 },

    /// Tesseract exited non-zero on this page.
    #[error("Page {page}: OCR failed: {detail}")]
    OcrFailed { page: usize, detail: String },

    /// The page image could not be read or the OCR task fell over.
    #[error("Page {page}: unexpected failure: {detail}")]
    Unexpected { page: usize, detail: String },
}

impl PageError {
    /// The inline marker substituted for this page's text in the extracted
    /// document, so a reviewer can see exactly which page was lost and why.
    pub fn marker(&self) -> String {
        match self {
            PageError::OcrTimeout { page, .. } => {
                format!("[ERROR: Tesseract OCR Timed Out on page {page}]")
            }
            PageError::OcrFailed { page, .. } => {
                format!("[ERROR: Tesseract OCR Failed on page {page}]")
            }
            PageError::Unexpected { page, .. } => {
                format!("[ERROR: Unexpected failure on page {page}]")
            }
        }
    }

    /// 1-indexed page number this error belongs to.
    pub fn page(&self) -> usize {
        match self {
            PageError::OcrTimeout { page, .. }
            | PageError::OcrFailed { page, .. }
            | PageError::Unexpected { page, .. } => *page,
        }
    }
}
