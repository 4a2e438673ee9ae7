//! # pdf2study
//!
//! Turn scanned lecture PDFs into study artifacts: MCQ banks, structured
//! summaries, restructured "remake" notes, and XMind mind maps.
//!
//! ## Why this crate?
//!
//! Scanned lecture slides carry no text layer, so ordinary PDF text
//! extractors return nothing. This crate rasterises each page with poppler's
//! `pdftoppm`, OCRs it with `tesseract`, and then drives a generative model
//! (Gemini by default) through a generate-then-verify loop per artifact. The
//! verified output is parsed, rendered to Markdown, and converted to DOCX
//! with pandoc — or packaged as an `.xmind` archive for the mind-map mode.
//!
//! ## Pipeline Overview
//!
//! ```text
//! PDF
//!  │
//!  ├─ 1. Extract  pdftoppm → per-page tesseract OCR (timeout per page)
//!  ├─ 2. Chunk    sentence-boundary split under a word budget (MCQs only)
//!  ├─ 3. Generate first-pass model call per chunk / per document
//!  ├─ 4. Verify   second model call; only its output is ever parsed
//!  ├─ 5. Parse    lenient MCQ pattern match, strict section JSON
//!  └─ 6. Render   Markdown tables → pandoc DOCX with cover page,
//!                 or topic tree → .xmind archive; MCQs also land in CSV
//! ```
//!
//! ## Quick Start
//!
//! ```rust,no_run
//! use pdf2study::{runner, StudyConfig};
//!
//! #[tokio::main]
//! async fn main() -> Result<(), Box<dyn std::error::Error>> {
//!     let config = StudyConfig::builder()
//!         .api_key(std::env::var("GEMINI_API_KEY")?)
//!         .input_dir("lectures/")
//!         .output_dir("study/")
//!         .build()?;
//!     let report = runner::run(&config).await?;
//!     eprintln!(
//!         "{} documents, {} failures",
//!         report.documents.len(),
//!         report.total_failures()
//!     );
//!     Ok(())
//! }
//! ```
//!
//! ## Feature Flags
//!
//! | Feature | Default | Description |
//! |---------|---------|-------------|
//! | `cli`   | on      | Enables the `pdf2study` binary (clap + anyhow + tracing-subscriber) |
//!
//! Disable `cli` when using only the library to avoid pulling in CLI-only deps:
//! ```toml
//! pdf2study = { version = "0.3", default-features = false }
//! ```
//!
//! ## External tools
//!
//! | Tool | Used for | Fatal if missing? |
//! |------|----------|-------------------|
//! | `pdftoppm` | page rasterisation | yes (extraction) |
//! | `tesseract` | per-page OCR | yes (extraction) |
//! | `pandoc` | Markdown → DOCX | yes (DOCX modes only) |
//!
//! Each tool path can be overridden on [`StudyConfig`] for non-PATH installs.

// ── Modules ──────────────────────────────────────────────────────────────

pub mod config;
pub mod error;
pub mod pipeline;
pub mod prompts;
pub mod report;
pub mod retry;
pub mod runner;

// ── Re-exports ───────────────────────────────────────────────────────────

pub use config::{Modes, SafetyThreshold, StudyConfig, StudyConfigBuilder};
pub use error::{PageError, StudyError};
pub use pipeline::gemini::{GeminiClient, GenerativeModel, ResponseKind};
pub use report::{
    DocumentReport, ExtractedDocument, ModeOutcome, ParseStats, RunReport,
};
pub use retry::{Disposition, RetryPolicy};
pub use runner::run;
