//! Configuration types for the study-artifact pipeline.
//!
//! All behaviour is controlled through [`StudyConfig`], built via its
//! [`StudyConfigBuilder`]. Keeping every knob in one struct makes it trivial
//! to share configs across tasks, log them, and diff two runs to understand
//! why their outputs differ. There is no global mutable state: the config is
//! constructed once and passed by reference through the pipeline.
//!
//! # Design choice: builder over constructor
//! A thirty-field constructor is unreadable and breaks on every new field.
//! The builder lets callers set only what they care about and rely on
//! well-documented defaults for the rest.

use crate::error::StudyError;
use crate::pipeline::gemini::GenerativeModel;
use crate::retry::RetryPolicy;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::path::PathBuf;
use std::sync::Arc;

/// Gemini safety setting applied to all four harm categories.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub enum SafetyThreshold {
    /// Block nothing.
    BlockNone,
    /// Block only high-probability harmful content.
    BlockOnlyHigh,
    /// Block medium-and-above. (default)
    #[default]
    BlockMediumAndAbove,
    /// Block low-and-above.
    BlockLowAndAbove,
}

impl SafetyThreshold {
    /// Wire value expected by the Gemini API.
    pub fn as_api_str(&self) -> &'static str {
        match self {
            SafetyThreshold::BlockNone => "BLOCK_NONE",
            SafetyThreshold::BlockOnlyHigh => "BLOCK_ONLY_HIGH",
            SafetyThreshold::BlockMediumAndAbove => "BLOCK_MEDIUM_AND_ABOVE",
            SafetyThreshold::BlockLowAndAbove => "BLOCK_LOW_AND_ABOVE",
        }
    }
}

/// Which study artifacts to produce for each document.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct Modes {
    /// Run the OCR extraction pass over `*.pdf` inputs first.
    pub extraction: bool,
    /// Generate the MCQ table.
    pub mcqs: bool,
    /// Generate the summary document.
    pub summary: bool,
    /// Generate the restructured ("remake") notes document.
    pub remake: bool,
    /// Generate the `.xmind` mind map.
    pub mindmap: bool,
}

impl Default for Modes {
    fn default() -> Self {
        Self {
            extraction: true,
            mcqs: true,
            summary: true,
            remake: true,
            mindmap: true,
        }
    }
}

impl Modes {
    /// True when no generation mode is enabled at all.
    pub fn is_empty(&self) -> bool {
        !(self.mcqs || self.summary || self.remake || self.mindmap)
    }
}

/// Configuration for a study-artifact run.
///
/// Built via [`StudyConfig::builder()`] or [`StudyConfig::default()`].
///
/// # Example
/// ```rust
/// use pdf2study::StudyConfig;
///
/// let config = StudyConfig::builder()
///     .api_key("AIza...")
///     .input_dir("lectures")
///     .output_dir("out")
///     .chunk_word_budget(2000)
///     .build()
///     .unwrap();
/// ```
#[derive(Clone)]
pub struct StudyConfig {
    // ── Model ─────────────────────────────────────────────────────────────
    /// Gemini API key. Read from `GEMINI_API_KEY` by the CLI; required unless
    /// a pre-built `model_override` is supplied.
    pub api_key: Option<String>,

    /// Model identifier, e.g. "gemini-2.0-flash". Default: "gemini-2.0-flash".
    pub model: String,

    /// Pre-constructed model client. Takes precedence over `api_key`/`model`.
    /// Primarily a test seam.
    pub model_override: Option<Arc<dyn GenerativeModel>>,

    // ── External tools ────────────────────────────────────────────────────
    /// Override path to the `tesseract` binary. If None, resolved from PATH.
    pub tesseract_path: Option<PathBuf>,

    /// Override path to the `pdftoppm` binary. If None, resolved from PATH.
    pub pdftoppm_path: Option<PathBuf>,

    /// Override path to the `pandoc` binary. If None, resolved from PATH.
    pub pandoc_path: Option<PathBuf>,

    // ── Directories ───────────────────────────────────────────────────────
    /// Directory scanned for `*.pdf` inputs. Default: ".".
    pub input_dir: PathBuf,

    /// Directory where `{base}_extracted.md` files are written and read.
    /// Default: same as `input_dir`.
    pub extracted_dir: Option<PathBuf>,

    /// Directory for final artifacts (DOCX, CSV, XMind). Default: ".".
    pub output_dir: PathBuf,

    /// Optional path to a rules/instructions document injected into every
    /// generation and verification prompt. Re-read from disk per call so
    /// edits apply mid-run.
    pub rules_path: Option<PathBuf>,

    /// Per-mode Markdown cover templates with a `{{lecture_name}}`
    /// placeholder, keyed in order: mcqs, summary, remake.
    pub mcq_cover_template: Option<PathBuf>,
    pub summary_cover_template: Option<PathBuf>,
    pub remake_cover_template: Option<PathBuf>,

    // ── Modes ─────────────────────────────────────────────────────────────
    /// Which artifacts to produce.
    pub modes: Modes,

    /// Skip OCR for a PDF whose `{base}_extracted.md` already exists.
    /// Default: true. Re-running a batch never redoes finished OCR work.
    pub skip_existing_extraction: bool,

    // ── Chunking & question volume ────────────────────────────────────────
    /// Maximum words per chunk sent to the model. Default: 3000.
    ///
    /// Large enough that most lectures fit in one or two chunks, small enough
    /// that generation quality does not degrade from prompt length.
    pub chunk_word_budget: usize,

    /// One question is requested per this many words of chunk text.
    /// Default: 100.
    pub words_per_question: usize,

    /// Scales the derived question count, e.g. 2.0 doubles it. Default: 1.0.
    pub question_multiplier: f64,

    // ── OCR ───────────────────────────────────────────────────────────────
    /// Rasterisation DPI for `pdftoppm`. Default: 300.
    ///
    /// Scanned lecture slides carry small fonts; 300 DPI is the tesseract
    /// sweet spot. Lower values noticeably hurt OCR accuracy.
    pub dpi: u32,

    /// Tesseract language code. Default: "eng".
    pub ocr_lang: String,

    /// Per-page OCR timeout in seconds. Default: 120.
    ///
    /// A noisy page can send tesseract into minutes of useless work.
    /// On timeout the page becomes an inline error marker and the document
    /// continues.
    pub ocr_page_timeout_secs: u64,

    // ── Model call shape ──────────────────────────────────────────────────
    /// Retry schedule applied to every model call.
    pub retry: RetryPolicy,

    /// Sampling temperature. Default: 0.8.
    pub temperature: f32,

    /// Nucleus sampling cutoff. Default: 0.95.
    pub top_p: f32,

    /// Top-k sampling cutoff. Default: 64.
    pub top_k: u32,

    /// Maximum tokens the model may generate per call. Default: 8192.
    pub max_output_tokens: u32,

    /// Safety threshold applied to all harm categories. Default:
    /// block-medium-and-above.
    pub safety_threshold: SafetyThreshold,
}

impl Default for StudyConfig {
    fn default() -> Self {
        Self {
            api_key: None,
            model: "gemini-2.0-flash".to_string(),
            model_override: None,
            tesseract_path: None,
            pdftoppm_path: None,
            pandoc_path: None,
            input_dir: PathBuf::from("."),
            extracted_dir: None,
            output_dir: PathBuf::from("."),
            rules_path: None,
            mcq_cover_template: None,
            summary_cover_template: None,
            remake_cover_template: None,
            modes: Modes::default(),
            skip_existing_extraction: true,
            chunk_word_budget: 3000,
            words_per_question: 100,
            question_multiplier: 1.0,
            dpi: 300,
            ocr_lang: "eng".to_string(),
            ocr_page_timeout_secs: 120,
            retry: RetryPolicy::default(),
            temperature: 0.8,
            top_p: 0.95,
            top_k: 64,
            max_output_tokens: 8192,
            safety_threshold: SafetyThreshold::default(),
        }
    }
}

impl fmt::Debug for StudyConfig {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("StudyConfig")
            .field("api_key", &self.api_key.as_ref().map(|_| "<redacted>"))
            .field("model", &self.model)
            .field(
                "model_override",
                &self.model_override.as_ref().map(|_| "<dyn GenerativeModel>"),
            )
            .field("input_dir", &self.input_dir)
            .field("extracted_dir", &self.extracted_dir)
            .field("output_dir", &self.output_dir)
            .field("rules_path", &self.rules_path)
            .field("modes", &self.modes)
            .field("skip_existing_extraction", &self.skip_existing_extraction)
            .field("chunk_word_budget", &self.chunk_word_budget)
            .field("words_per_question", &self.words_per_question)
            .field("question_multiplier", &self.question_multiplier)
            .field("dpi", &self.dpi)
            .field("ocr_lang", &self.ocr_lang)
            .field("ocr_page_timeout_secs", &self.ocr_page_timeout_secs)
            .field("retry", &self.retry)
            .field("temperature", &self.temperature)
            .field("top_p", &self.top_p)
            .field("top_k", &self.top_k)
            .field("max_output_tokens", &self.max_output_tokens)
            .field("safety_threshold", &self.safety_threshold)
            .finish()
    }
}

impl StudyConfig {
    /// Create a new builder for `StudyConfig`.
    pub fn builder() -> StudyConfigBuilder {
        StudyConfigBuilder {
            config: Self::default(),
        }
    }

    /// The directory extracted-text files live in.
    pub fn extracted_dir(&self) -> &PathBuf {
        self.extracted_dir.as_ref().unwrap_or(&self.input_dir)
    }
}

/// Builder for [`StudyConfig`].
#[derive(Debug)]
pub struct StudyConfigBuilder {
    config: StudyConfig,
}

impl StudyConfigBuilder {
    pub fn api_key(mut self, key: impl Into<String>) -> Self {
        self.config.api_key = Some(key.into());
        self
    }

    pub fn model(mut self, model: impl Into<String>) -> Self {
        self.config.model = model.into();
        self
    }

    pub fn model_override(mut self, model: Arc<dyn GenerativeModel>) -> Self {
        self.config.model_override = Some(model);
        self
    }

    pub fn tesseract_path(mut self, p: impl Into<PathBuf>) -> Self {
        self.config.tesseract_path = Some(p.into());
        self
    }

    pub fn pdftoppm_path(mut self, p: impl Into<PathBuf>) -> Self {
        self.config.pdftoppm_path = Some(p.into());
        self
    }

    pub fn pandoc_path(mut self, p: impl Into<PathBuf>) -> Self {
        self.config.pandoc_path = Some(p.into());
        self
    }

    pub fn input_dir(mut self, p: impl Into<PathBuf>) -> Self {
        self.config.input_dir = p.into();
        self
    }

    pub fn extracted_dir(mut self, p: impl Into<PathBuf>) -> Self {
        self.config.extracted_dir = Some(p.into());
        self
    }

    pub fn output_dir(mut self, p: impl Into<PathBuf>) -> Self {
        self.config.output_dir = p.into();
        self
    }

    pub fn rules_path(mut self, p: impl Into<PathBuf>) -> Self {
        self.config.rules_path = Some(p.into());
        self
    }

    pub fn mcq_cover_template(mut self, p: impl Into<PathBuf>) -> Self {
        self.config.mcq_cover_template = Some(p.into());
        self
    }

    pub fn summary_cover_template(mut self, p: impl Into<PathBuf>) -> Self {
        self.config.summary_cover_template = Some(p.into());
        self
    }

    pub fn remake_cover_template(mut self, p: impl Into<PathBuf>) -> Self {
        self.config.remake_cover_template = Some(p.into());
        self
    }

    pub fn modes(mut self, modes: Modes) -> Self {
        self.config.modes = modes;
        self
    }

    pub fn skip_existing_extraction(mut self, v: bool) -> Self {
        self.config.skip_existing_extraction = v;
        self
    }

    pub fn chunk_word_budget(mut self, words: usize) -> Self {
        self.config.chunk_word_budget = words;
        self
    }

    pub fn words_per_question(mut self, words: usize) -> Self {
        self.config.words_per_question = words;
        self
    }

    pub fn question_multiplier(mut self, m: f64) -> Self {
        self.config.question_multiplier = m;
        self
    }

    pub fn dpi(mut self, dpi: u32) -> Self {
        self.config.dpi = dpi.clamp(72, 600);
        self
    }

    pub fn ocr_lang(mut self, lang: impl Into<String>) -> Self {
        self.config.ocr_lang = lang.into();
        self
    }

    pub fn ocr_page_timeout_secs(mut self, secs: u64) -> Self {
        self.config.ocr_page_timeout_secs = secs.max(1);
        self
    }

    pub fn retry(mut self, policy: RetryPolicy) -> Self {
        self.config.retry = policy;
        self
    }

    pub fn temperature(mut self, t: f32) -> Self {
        self.config.temperature = t.clamp(0.0, 2.0);
        self
    }

    pub fn top_p(mut self, p: f32) -> Self {
        self.config.top_p = p.clamp(0.0, 1.0);
        self
    }

    pub fn top_k(mut self, k: u32) -> Self {
        self.config.top_k = k.max(1);
        self
    }

    pub fn max_output_tokens(mut self, n: u32) -> Self {
        self.config.max_output_tokens = n;
        self
    }

    pub fn safety_threshold(mut self, t: SafetyThreshold) -> Self {
        self.config.safety_threshold = t;
        self
    }

    /// Build the configuration, validating constraints.
    pub fn build(self) -> Result<StudyConfig, StudyError> {
        let c = &self.config;
        if c.chunk_word_budget == 0 {
            return Err(StudyError::InvalidConfig(
                "chunk_word_budget must be ≥ 1".into(),
            ));
        }
        if c.words_per_question == 0 {
            return Err(StudyError::InvalidConfig(
                "words_per_question must be ≥ 1".into(),
            ));
        }
        if !(c.question_multiplier > 0.0) {
            return Err(StudyError::InvalidConfig(
                "question_multiplier must be > 0".into(),
            ));
        }
        if c.retry.max_attempts == 0 {
            return Err(StudyError::InvalidConfig(
                "retry.max_attempts must be ≥ 1".into(),
            ));
        }
        Ok(self.config)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults_match_documented_values() {
        let c = StudyConfig::default();
        assert_eq!(c.chunk_word_budget, 3000);
        assert_eq!(c.words_per_question, 100);
        assert_eq!(c.question_multiplier, 1.0);
        assert_eq!(c.dpi, 300);
        assert_eq!(c.ocr_lang, "eng");
        assert_eq!(c.ocr_page_timeout_secs, 120);
        assert_eq!(c.retry.max_attempts, 5);
        assert_eq!(c.temperature, 0.8);
        assert_eq!(c.max_output_tokens, 8192);
        assert!(c.skip_existing_extraction);
    }

    #[test]
    fn builder_rejects_zero_budget() {
        let r = StudyConfig::builder().chunk_word_budget(0).build();
        assert!(matches!(r, Err(StudyError::InvalidConfig(_))));
    }

    #[test]
    fn builder_rejects_zero_multiplier() {
        let r = StudyConfig::builder().question_multiplier(0.0).build();
        assert!(matches!(r, Err(StudyError::InvalidConfig(_))));
    }

    #[test]
    fn extracted_dir_falls_back_to_input_dir() {
        let c = StudyConfig::builder()
            .input_dir("lectures")
            .build()
            .unwrap();
        assert_eq!(c.extracted_dir(), &PathBuf::from("lectures"));
    }

    #[test]
    fn debug_redacts_api_key() {
        let c = StudyConfig::builder().api_key("secret").build().unwrap();
        let dbg = format!("{c:?}");
        assert!(!dbg.contains("secret"));
        assert!(dbg.contains("redacted"));
    }

    #[test]
    fn safety_threshold_wire_values() {
        assert_eq!(
            SafetyThreshold::BlockMediumAndAbove.as_api_str(),
            "BLOCK_MEDIUM_AND_ABOVE"
        );
        assert_eq!(SafetyThreshold::BlockNone.as_api_str(), "BLOCK_NONE");
    }
}
