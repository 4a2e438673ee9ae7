//! Result types surfaced to callers after a run.
//!
//! The pipeline is lossy by design in two places — per-page OCR failures and
//! per-item MCQ parse skips — so the caller gets enough structure here to
//! audit what was lost without re-reading logs.

use crate::error::PageError;
use serde::{Deserialize, Serialize};
use std::path::PathBuf;

/// Text extracted from one PDF, immutable after extraction.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ExtractedDocument {
    /// The source PDF path.
    pub source: PathBuf,
    /// File stem without the `_extracted` suffix; used for all output names.
    pub base_name: String,
    /// Full OCR text, pages joined with the page-break separator, failed
    /// pages replaced by inline error markers.
    pub text: String,
    /// Number of pages rasterised.
    pub pages: usize,
    /// Pages whose OCR failed. Each has a matching marker in `text`.
    pub failed_pages: Vec<PageError>,
}

impl ExtractedDocument {
    /// True when no page produced usable text.
    pub fn is_empty(&self) -> bool {
        self.text.trim().is_empty()
    }
}

/// Counters from a lenient pattern parse.
///
/// `skipped` counts blocks the model emitted that did not match the required
/// item format; a non-zero value is normal but worth logging.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ParseStats {
    /// Items that matched the full pattern and became records.
    pub matched: usize,
    /// Candidate blocks discarded for missing a required piece.
    pub skipped: usize,
}

/// One artifact mode's outcome for one document.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub enum ModeOutcome {
    /// The artifact was written.
    Completed {
        output: PathBuf,
        /// Present for modes that go through the lenient parser.
        parse_stats: Option<ParseStats>,
    },
    /// The mode failed; the error display string and the stage it died in.
    Failed { stage: String, error: String },
    /// The mode was not enabled or had nothing to do.
    Skipped { reason: String },
}

impl ModeOutcome {
    pub fn is_failure(&self) -> bool {
        matches!(self, ModeOutcome::Failed { .. })
    }
}

/// Per-document results across all enabled modes.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DocumentReport {
    pub base_name: String,
    pub source: PathBuf,
    pub mcqs: ModeOutcome,
    pub summary: ModeOutcome,
    pub remake: ModeOutcome,
    pub mindmap: ModeOutcome,
}

impl DocumentReport {
    /// Outcomes in a fixed order for iteration.
    pub fn outcomes(&self) -> [(&'static str, &ModeOutcome); 4] {
        [
            ("mcqs", &self.mcqs),
            ("summary", &self.summary),
            ("remake", &self.remake),
            ("mindmap", &self.mindmap),
        ]
    }

    pub fn failure_count(&self) -> usize {
        self.outcomes()
            .iter()
            .filter(|(_, o)| o.is_failure())
            .count()
    }
}

/// The whole batch: one entry per processed document plus extraction stats.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct RunReport {
    /// PDFs that went through OCR this run.
    pub extracted: Vec<PathBuf>,
    /// PDFs skipped because their extracted text already existed.
    pub extraction_skipped: Vec<PathBuf>,
    /// PDFs whose extraction failed outright, with the error display string.
    pub extraction_failed: Vec<(PathBuf, String)>,
    /// Per-document generation results.
    pub documents: Vec<DocumentReport>,
}

impl RunReport {
    /// True when every document completed every enabled mode.
    pub fn all_succeeded(&self) -> bool {
        self.extraction_failed.is_empty()
            && self.documents.iter().all(|d| d.failure_count() == 0)
    }

    /// Total mode failures across all documents.
    pub fn total_failures(&self) -> usize {
        self.extraction_failed.len()
            + self
                .documents
                .iter()
                .map(|d| d.failure_count())
                .sum::<usize>()
    }
}
