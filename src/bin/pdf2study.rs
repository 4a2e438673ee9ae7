//! CLI binary for pdf2study.
//!
//! A thin shim over the library crate that maps CLI flags to `StudyConfig`,
//! runs the batch, and prints a per-document result table.

use anyhow::{Context, Result};
use clap::Parser;
use indicatif::{ProgressBar, ProgressStyle};
use pdf2study::{runner, ModeOutcome, Modes, RunReport, SafetyThreshold, StudyConfig};
use std::io;
use std::path::PathBuf;
use std::time::Duration;
use tracing_subscriber::EnvFilter;

// ── ANSI colour helpers (no extra deps) ──────────────────────────────────────

fn green(s: &str) -> String {
    format!("\x1b[32m{s}\x1b[0m")
}
fn red(s: &str) -> String {
    format!("\x1b[31m{s}\x1b[0m")
}
fn dim(s: &str) -> String {
    format!("\x1b[2m{s}\x1b[0m")
}
fn bold(s: &str) -> String {
    format!("\x1b[1m{s}\x1b[0m")
}
fn cyan(s: &str) -> String {
    format!("\x1b[36m{s}\x1b[0m")
}

const AFTER_HELP: &str = r#"EXAMPLES:
  # Process every PDF in a folder, all artifact modes
  pdf2study --input lectures/ --output study/

  # MCQs only, with a custom question density
  pdf2study --input lectures/ --output study/ --modes mcqs --words-per-question 80

  # Reuse existing OCR text, regenerate summaries and mind maps
  pdf2study --input lectures/ --output study/ --modes summary,mindmap

  # Force re-extraction even when extracted text exists
  pdf2study --input lectures/ --output study/ --force-extract

  # Custom MCQ style rules and cover pages
  pdf2study --input lectures/ --output study/ \
      --rules rules.md --mcq-cover covers/mcq.md --summary-cover covers/summary.md

MODES:
  extraction   pdftoppm + tesseract OCR of every *.pdf in the input folder
  mcqs         multiple-choice question bank (DOCX + CSV)
  summary      structured summary document (DOCX)
  remake       restructured key-point/details notes (DOCX)
  mindmap      XMind mind map (.xmind)

  --modes takes a comma-separated subset, or "all" (the default).

EXTERNAL TOOLS:
  pdftoppm   poppler-utils        (extraction)
  tesseract  tesseract-ocr       (extraction)
  pandoc     pandoc.org          (DOCX output)

ENVIRONMENT VARIABLES:
  GEMINI_API_KEY          Google Gemini API key (required for generation)
  PDF2STUDY_MODEL         Override the model ID
  PDF2STUDY_INPUT         Input folder
  PDF2STUDY_OUTPUT        Output folder

SETUP:
  1. Install tools:   apt install poppler-utils tesseract-ocr pandoc
  2. Set API key:     export GEMINI_API_KEY=...
  3. Run:             pdf2study --input lectures/ --output study/
"#;

/// Turn scanned lecture PDFs into MCQs, summaries, notes, and mind maps.
#[derive(Parser, Debug)]
#[command(
    name = "pdf2study",
    version,
    about = "Turn scanned lecture PDFs into MCQs, summaries, notes, and mind maps",
    long_about = "Batch-process a folder of scanned lecture PDFs: OCR each document \
(pdftoppm + tesseract), then generate verified study artifacts with Gemini — \
multiple-choice question banks, structured summaries, restructured notes \
(DOCX via pandoc), and XMind mind maps.",
    arg_required_else_help = true,
    color = clap::ColorChoice::Auto,
    after_long_help = AFTER_HELP
)]
struct Cli {
    /// Folder containing the source PDFs.
    #[arg(short, long, env = "PDF2STUDY_INPUT")]
    input: PathBuf,

    /// Folder for generated artifacts.
    #[arg(short, long, env = "PDF2STUDY_OUTPUT")]
    output: PathBuf,

    /// Folder for extracted OCR text (defaults to the input folder).
    #[arg(long, env = "PDF2STUDY_EXTRACTED")]
    extracted: Option<PathBuf>,

    /// Comma-separated modes: all, or a subset of
    /// extraction,mcqs,summary,remake,mindmap.
    #[arg(long, env = "PDF2STUDY_MODES", default_value = "all")]
    modes: String,

    /// Gemini model ID.
    #[arg(long, env = "PDF2STUDY_MODEL", default_value = "gemini-2.0-flash")]
    model: String,

    /// Gemini API key (prefer the environment variable).
    #[arg(long, env = "GEMINI_API_KEY", hide_env_values = true)]
    api_key: Option<String>,

    /// Path to a Markdown file of extra MCQ style rules.
    #[arg(long, env = "PDF2STUDY_RULES")]
    rules: Option<PathBuf>,

    /// Cover page template for MCQ documents ({{lecture_name}} placeholder).
    #[arg(long)]
    mcq_cover: Option<PathBuf>,

    /// Cover page template for summary documents.
    #[arg(long)]
    summary_cover: Option<PathBuf>,

    /// Cover page template for remake documents.
    #[arg(long)]
    remake_cover: Option<PathBuf>,

    /// Rasterisation DPI (72–600).
    #[arg(long, env = "PDF2STUDY_DPI", default_value_t = 300,
          value_parser = clap::value_parser!(u32).range(72..=600))]
    dpi: u32,

    /// Tesseract language code.
    #[arg(long, env = "PDF2STUDY_OCR_LANG", default_value = "eng")]
    ocr_lang: String,

    /// Per-page OCR timeout in seconds.
    #[arg(long, env = "PDF2STUDY_OCR_TIMEOUT", default_value_t = 120)]
    ocr_timeout: u64,

    /// Word budget per MCQ generation chunk.
    #[arg(long, env = "PDF2STUDY_CHUNK_WORDS", default_value_t = 3000)]
    chunk_words: usize,

    /// Source words per generated question.
    #[arg(long, env = "PDF2STUDY_WORDS_PER_QUESTION", default_value_t = 100)]
    words_per_question: usize,

    /// Multiplier on the derived question count.
    #[arg(long, env = "PDF2STUDY_QUESTION_MULTIPLIER", default_value_t = 1.0)]
    question_multiplier: f64,

    /// Sampling temperature (0.0–2.0).
    #[arg(long, env = "PDF2STUDY_TEMPERATURE", default_value_t = 0.8)]
    temperature: f32,

    /// Safety threshold: none, few, some, most.
    #[arg(long, env = "PDF2STUDY_SAFETY", default_value = "some")]
    safety: String,

    /// Re-run OCR even when extracted text already exists.
    #[arg(long, env = "PDF2STUDY_FORCE_EXTRACT")]
    force_extract: bool,

    /// Path override for the tesseract binary.
    #[arg(long, env = "PDF2STUDY_TESSERACT")]
    tesseract_path: Option<PathBuf>,

    /// Path override for the pdftoppm binary.
    #[arg(long, env = "PDF2STUDY_PDFTOPPM")]
    pdftoppm_path: Option<PathBuf>,

    /// Path override for the pandoc binary.
    #[arg(long, env = "PDF2STUDY_PANDOC")]
    pandoc_path: Option<PathBuf>,

    /// Disable the spinner.
    #[arg(long, env = "PDF2STUDY_NO_PROGRESS")]
    no_progress: bool,

    /// Enable DEBUG-level tracing logs.
    #[arg(short, long, env = "PDF2STUDY_VERBOSE")]
    verbose: bool,

    /// Suppress all output except errors.
    #[arg(short, long, env = "PDF2STUDY_QUIET")]
    quiet: bool,
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    // ── Logging setup ────────────────────────────────────────────────────
    // Library INFO logs are the main run narration, so they stay on unless
    // quiet mode is requested.
    let filter = if cli.quiet {
        "error"
    } else if cli.verbose {
        "debug"
    } else {
        "info"
    };
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(filter)),
        )
        .with_writer(io::stderr)
        .init();

    let config = build_config(&cli)?;

    let spinner = if !cli.quiet && !cli.no_progress {
        let bar = ProgressBar::new_spinner();
        bar.set_style(
            ProgressStyle::with_template("{spinner:.cyan} {prefix:.bold}  {msg}")
                .unwrap_or_else(|_| ProgressStyle::default_spinner())
                .tick_strings(&["⠋", "⠙", "⠹", "⠸", "⠼", "⠴", "⠦", "⠧", "⠇", "⠏", "⠿"]),
        );
        bar.set_prefix("Processing");
        bar.set_message(format!("{}", cli.input.display()));
        bar.enable_steady_tick(Duration::from_millis(80));
        Some(bar)
    } else {
        None
    };

    let report = runner::run(&config).await.context("Batch run failed")?;

    if let Some(bar) = spinner {
        bar.finish_and_clear();
    }
    if !cli.quiet {
        print_report(&report);
    }

    if report.all_succeeded() {
        Ok(())
    } else {
        anyhow::bail!("{} failure(s), see log above", report.total_failures())
    }
}

/// Map CLI args to `StudyConfig`.
fn build_config(cli: &Cli) -> Result<StudyConfig> {
    let modes = parse_modes(&cli.modes)?;
    let safety = parse_safety(&cli.safety)?;

    let mut builder = StudyConfig::builder()
        .input_dir(&cli.input)
        .output_dir(&cli.output)
        .modes(modes)
        .model(&cli.model)
        .dpi(cli.dpi)
        .ocr_lang(&cli.ocr_lang)
        .ocr_page_timeout_secs(cli.ocr_timeout)
        .chunk_word_budget(cli.chunk_words)
        .words_per_question(cli.words_per_question)
        .question_multiplier(cli.question_multiplier)
        .temperature(cli.temperature)
        .safety_threshold(safety)
        .skip_existing_extraction(!cli.force_extract);

    if let Some(ref key) = cli.api_key {
        builder = builder.api_key(key);
    }
    if let Some(ref dir) = cli.extracted {
        builder = builder.extracted_dir(dir);
    }
    if let Some(ref path) = cli.rules {
        builder = builder.rules_path(path);
    }
    if let Some(ref path) = cli.mcq_cover {
        builder = builder.mcq_cover_template(path);
    }
    if let Some(ref path) = cli.summary_cover {
        builder = builder.summary_cover_template(path);
    }
    if let Some(ref path) = cli.remake_cover {
        builder = builder.remake_cover_template(path);
    }
    if let Some(ref path) = cli.tesseract_path {
        builder = builder.tesseract_path(path);
    }
    if let Some(ref path) = cli.pdftoppm_path {
        builder = builder.pdftoppm_path(path);
    }
    if let Some(ref path) = cli.pandoc_path {
        builder = builder.pandoc_path(path);
    }

    builder.build().context("Invalid configuration")
}

/// Parse `--modes` into a `Modes` set.
fn parse_modes(s: &str) -> Result<Modes> {
    if s.trim().eq_ignore_ascii_case("all") {
        return Ok(Modes::default());
    }
    let mut modes = Modes {
        extraction: false,
        mcqs: false,
        summary: false,
        remake: false,
        mindmap: false,
    };
    for part in s.split(',') {
        match part.trim().to_lowercase().as_str() {
            "extraction" | "extract" | "ocr" => modes.extraction = true,
            "mcqs" | "mcq" => modes.mcqs = true,
            "summary" => modes.summary = true,
            "remake" => modes.remake = true,
            "mindmap" => modes.mindmap = true,
            other => anyhow::bail!(
                "Unknown mode '{}' (expected extraction, mcqs, summary, remake, mindmap)",
                other
            ),
        }
    }
    Ok(modes)
}

/// Parse `--safety` into a `SafetyThreshold`.
fn parse_safety(s: &str) -> Result<SafetyThreshold> {
    match s.to_lowercase().as_str() {
        "none" | "off" => Ok(SafetyThreshold::BlockNone),
        "few" | "high-only" => Ok(SafetyThreshold::BlockOnlyHigh),
        "some" | "medium" => Ok(SafetyThreshold::BlockMediumAndAbove),
        "most" | "low" => Ok(SafetyThreshold::BlockLowAndAbove),
        other => anyhow::bail!(
            "Unknown safety threshold '{}' (expected none, few, some, most)",
            other
        ),
    }
}

/// Per-document result table on stderr.
fn print_report(report: &RunReport) {
    if !report.extracted.is_empty() || !report.extraction_failed.is_empty() {
        eprintln!(
            "{} extraction: {} done, {} skipped, {} failed",
            cyan("◆"),
            report.extracted.len(),
            report.extraction_skipped.len(),
            report.extraction_failed.len(),
        );
        for (pdf, err) in &report.extraction_failed {
            eprintln!("  {} {}  {}", red("✗"), pdf.display(), dim(err));
        }
    }

    for doc in &report.documents {
        eprintln!("{} {}", cyan("◆"), bold(&doc.base_name));
        for (mode, outcome) in doc.outcomes() {
            match outcome {
                ModeOutcome::Completed { output, parse_stats } => {
                    let stats = parse_stats
                        .as_ref()
                        .map(|s| format!("  {}", dim(&format!("{} matched, {} skipped", s.matched, s.skipped))))
                        .unwrap_or_default();
                    eprintln!(
                        "  {} {:<8} {}{}",
                        green("✓"),
                        mode,
                        output.display(),
                        stats
                    );
                }
                ModeOutcome::Failed { stage, error } => {
                    eprintln!("  {} {:<8} {} {}", red("✗"), mode, stage, red(error));
                }
                ModeOutcome::Skipped { reason } => {
                    eprintln!("  {} {:<8} {}", dim("-"), mode, dim(reason));
                }
            }
        }
    }

    let failures = report.total_failures();
    if failures == 0 {
        eprintln!(
            "{} {} document(s) processed successfully",
            green("✔"),
            bold(&report.documents.len().to_string())
        );
    } else {
        eprintln!(
            "{} {} document(s), {} failure(s)",
            red("✘"),
            report.documents.len(),
            red(&failures.to_string())
        );
    }
}
