//! Pipeline stages for turning lecture PDFs into study artifacts.
//!
//! Each submodule implements exactly one transformation step. Keeping stages
//! separate makes each independently testable and lets us swap
//! implementations (e.g. a mock model, a different OCR backend) without
//! touching other stages.
//!
//! ## Data Flow
//!
//! ```text
//! extract ──▶ chunk ──▶ generate ──▶ parse ──▶ markdown ──▶ docx
//! (OCR)      (budget)  (Gemini      (records/ (tables,     (pandoc)
//!                       + verify)    sections) sections)
//!                                        │
//!                                        └──▶ mindmap (.xmind)
//! ```
//!
//! 1. [`extract`]  — rasterise pages via pdftoppm and OCR them with tesseract;
//!    the only stage allowed to lose individual pages
//! 2. [`chunk`]    — split extracted text on sentence boundaries under a word
//!    budget
//! 3. [`gemini`]   — the model client; the only stage with network I/O
//! 4. [`generate`] — generation + mandatory verification calls per mode
//! 5. [`parse`]    — lenient MCQ pattern parse / strict section JSON parse
//! 6. [`markdown`] — records and sections to Markdown
//! 7. [`docx`]     — cover merge and pandoc Markdown→DOCX conversion
//! 8. [`mindmap`]  — topic tree to styled `.xmind` archive

pub mod chunk;
pub mod docx;
pub mod extract;
pub mod gemini;
pub mod generate;
pub mod markdown;
pub mod mindmap;
pub mod parse;
