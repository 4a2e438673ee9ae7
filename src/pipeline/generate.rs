//! Generation and verification calls, one pair per artifact mode.
//!
//! Every mode follows the same two-step shape: a first-pass generation call,
//! then a mandatory verification call whose output is the only thing the
//! parser ever sees. The first pass is allowed to be sloppy; the verifier is
//! the format gate.
//!
//! Failure semantics differ by response kind:
//! * Text modes (MCQ) surface [`StudyError::RetriesExhausted`] to the caller.
//! * JSON modes (summary, remake, mind map) return `Ok(None)` on exhaustion
//!   so the runner records a per-document mode failure and moves on.
//!
//! The rules document is re-read from disk for every call, so editing it
//! mid-batch affects the remaining documents.

use crate::config::StudyConfig;
use crate::error::StudyError;
use crate::pipeline::chunk::chunk_text;
use crate::pipeline::gemini::{GenerativeModel, ResponseKind};
use crate::pipeline::parse::strip_fences;
use crate::prompts;
use crate::retry::{classify_model_error, run_with_retry};
use tracing::{info, warn};

/// Questions to request for one chunk:
/// `max(1, floor(words / words_per_question * multiplier))`.
pub fn target_question_count(chunk: &str, words_per_question: usize, multiplier: f64) -> usize {
    let words = chunk.split_whitespace().count();
    let wpq = words_per_question.max(1);
    let raw = (words as f64 / wpq as f64) * multiplier;
    (raw.floor() as usize).max(1)
}

/// Read the rules document, fresh from disk.
///
/// No configured path means no extra rules; a configured path that cannot be
/// read is an error, since silently generating without the caller's rules
/// would be worse than stopping.
fn read_rules(config: &StudyConfig) -> Result<String, StudyError> {
    match &config.rules_path {
        None => Ok(String::new()),
        Some(path) => std::fs::read_to_string(path).map_err(|_| StudyError::FileNotFound {
            path: path.clone(),
        }),
    }
}

async fn call_text(
    model: &dyn GenerativeModel,
    config: &StudyConfig,
    stage: &'static str,
    system: &str,
    prompt: String,
) -> Result<String, StudyError> {
    run_with_retry(config.retry, stage, classify_model_error, || {
        let prompt = prompt.clone();
        async move { model.generate(system, &prompt, ResponseKind::Text).await }
    })
    .await
}

/// JSON-mode call: retry exhaustion degrades to `Ok(None)`.
async fn call_json(
    model: &dyn GenerativeModel,
    config: &StudyConfig,
    stage: &'static str,
    system: &str,
    prompt: String,
) -> Result<Option<String>, StudyError> {
    let result = run_with_retry(config.retry, stage, classify_model_error, || {
        let prompt = prompt.clone();
        async move { model.generate(system, &prompt, ResponseKind::Json).await }
    })
    .await;
    match result {
        Ok(text) => Ok(Some(text)),
        Err(StudyError::RetriesExhausted { stage, attempts, detail }) => {
            warn!(stage, attempts, %detail, "JSON generation exhausted retries");
            Ok(None)
        }
        Err(e) => Err(e),
    }
}

/// Pretty-print a first-pass JSON payload for embedding in a verification
/// prompt. `None` when the payload is not valid JSON at all.
fn reserialize_json(raw: &str) -> Option<String> {
    let value: serde_json::Value = serde_json::from_str(strip_fences(raw)).ok()?;
    serde_json::to_string_pretty(&value).ok()
}

/// Run MCQ generation over every chunk, then one verification pass over the
/// combined output. Returns the verified MCQ text.
pub async fn mcqs(
    model: &dyn GenerativeModel,
    config: &StudyConfig,
    text: &str,
) -> Result<String, StudyError> {
    let rules = read_rules(config)?;
    let chunks = chunk_text(text, config.chunk_word_budget);
    info!(chunks = chunks.len(), "generating MCQs");

    let mut raw_parts = Vec::with_capacity(chunks.len());
    for (i, chunk) in chunks.iter().enumerate() {
        let count =
            target_question_count(chunk, config.words_per_question, config.question_multiplier);
        info!(chunk = i + 1, questions = count, "requesting questions for chunk");
        let prompt = prompts::mcq_generation(&rules, count, chunk);
        let raw = call_text(
            model,
            config,
            "mcq-generation",
            prompts::MCQ_GENERATOR_SYSTEM,
            prompt,
        )
        .await?;
        raw_parts.push(raw);
    }

    let combined = raw_parts.join("\n\n");
    // Rules are re-read so a mid-run edit reaches the verifier too.
    let rules = read_rules(config)?;
    call_text(
        model,
        config,
        "mcq-verification",
        prompts::MCQ_VERIFIER_SYSTEM,
        prompts::mcq_verification(&rules, &combined),
    )
    .await
}

/// Summary generation + verification. Returns the verified section JSON, or
/// `None` when either call exhausted its retries or the first pass was not
/// valid JSON.
pub async fn summary(
    model: &dyn GenerativeModel,
    config: &StudyConfig,
    text: &str,
) -> Result<Option<String>, StudyError> {
    let Some(first_pass) = call_json(
        model,
        config,
        "summary-generation",
        "",
        prompts::summary_generation(text),
    )
    .await?
    else {
        return Ok(None);
    };

    let Some(pretty) = reserialize_json(&first_pass) else {
        warn!("summary first pass was not valid JSON");
        return Ok(None);
    };

    call_json(
        model,
        config,
        "summary-verification",
        "",
        prompts::summary_verification(text, &pretty),
    )
    .await
}

/// Remake generation + verification, same contract as [`summary`].
pub async fn remake(
    model: &dyn GenerativeModel,
    config: &StudyConfig,
    text: &str,
) -> Result<Option<String>, StudyError> {
    let Some(first_pass) = call_json(
        model,
        config,
        "remake-generation",
        "",
        prompts::remake_generation(text),
    )
    .await?
    else {
        return Ok(None);
    };

    let Some(pretty) = reserialize_json(&first_pass) else {
        warn!("remake first pass was not valid JSON");
        return Ok(None);
    };

    call_json(
        model,
        config,
        "remake-verification",
        "",
        prompts::remake_verification(text, &pretty),
    )
    .await
}

/// Mind-map topic tree generation. A single JSON call; there is no
/// verification pass for this mode.
pub async fn mindmap(
    model: &dyn GenerativeModel,
    config: &StudyConfig,
    text: &str,
) -> Result<Option<String>, StudyError> {
    call_json(
        model,
        config,
        "mindmap-generation",
        prompts::MINDMAP_SYSTEM,
        prompts::mindmap_generation(text),
    )
    .await
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::pipeline::gemini::ResponseKind;
    use crate::retry::RetryPolicy;
    use async_trait::async_trait;
    use std::sync::atomic::{AtomicU32, Ordering};
    use std::sync::Mutex;
    use std::time::Duration;

    struct AlwaysRateLimited {
        calls: AtomicU32,
    }

    #[async_trait]
    impl GenerativeModel for AlwaysRateLimited {
        async fn generate(
            &self,
            _system: &str,
            _prompt: &str,
            _kind: ResponseKind,
        ) -> Result<String, StudyError> {
            self.calls.fetch_add(1, Ordering::SeqCst);
            Err(StudyError::RateLimited {
                model: "test".into(),
            })
        }

        fn name(&self) -> &str {
            "always-429"
        }
    }

    struct Scripted {
        outputs: Mutex<Vec<String>>,
    }

    #[async_trait]
    impl GenerativeModel for Scripted {
        async fn generate(
            &self,
            _system: &str,
            _prompt: &str,
            _kind: ResponseKind,
        ) -> Result<String, StudyError> {
            Ok(self.outputs.lock().unwrap().remove(0))
        }

        fn name(&self) -> &str {
            "scripted"
        }
    }

    fn fast_config() -> StudyConfig {
        StudyConfig::builder()
            .retry(RetryPolicy {
                max_attempts: 3,
                base_delay: Duration::from_millis(1),
                multiplier: 2.0,
            })
            .build()
            .unwrap()
    }

    #[test]
    fn question_count_derivation() {
        let chunk_300 = vec!["word"; 300].join(" ");
        assert_eq!(target_question_count(&chunk_300, 100, 1.0), 3);
        assert_eq!(target_question_count(&chunk_300, 100, 2.0), 6);
        // Short chunks still get one question.
        assert_eq!(target_question_count("tiny chunk", 100, 1.0), 1);
        // Multiplier below one floors but never reaches zero.
        assert_eq!(target_question_count(&chunk_300, 100, 0.1), 1);
    }

    #[tokio::test(start_paused = true)]
    async fn text_path_surfaces_error_after_exhaustion() {
        let model = AlwaysRateLimited {
            calls: AtomicU32::new(0),
        };
        let config = fast_config();
        let result = mcqs(&model, &config, "Some lecture text.").await;
        assert!(matches!(result, Err(StudyError::RetriesExhausted { .. })));
        assert_eq!(model.calls.load(Ordering::SeqCst), 3);
    }

    #[tokio::test(start_paused = true)]
    async fn json_path_returns_none_after_exhaustion() {
        let model = AlwaysRateLimited {
            calls: AtomicU32::new(0),
        };
        let config = fast_config();
        let result = summary(&model, &config, "Some lecture text.").await;
        assert!(matches!(result, Ok(None)));
        assert_eq!(model.calls.load(Ordering::SeqCst), 3);
    }

    #[tokio::test]
    async fn summary_runs_generation_then_verification() {
        let model = Scripted {
            outputs: Mutex::new(vec![
                r#"[{"title": "A", "type": "paragraph", "content": "x"}]"#.into(),
                r#"[{"title": "A verified", "type": "paragraph", "content": "x"}]"#.into(),
            ]),
        };
        let config = fast_config();
        let verified = summary(&model, &config, "text").await.unwrap().unwrap();
        assert!(verified.contains("A verified"));
    }

    #[tokio::test]
    async fn summary_with_non_json_first_pass_returns_none() {
        let model = Scripted {
            outputs: Mutex::new(vec!["this is not json".into()]),
        };
        let config = fast_config();
        assert!(matches!(summary(&model, &config, "text").await, Ok(None)));
    }

    #[tokio::test]
    async fn mcqs_combines_chunks_before_verification() {
        // Budget of 5 words forces two chunks, so two generation calls plus
        // one verification call consume exactly three scripted outputs.
        let model = Scripted {
            outputs: Mutex::new(vec![
                "raw one".into(),
                "raw two".into(),
                "verified".into(),
            ]),
        };
        let config = StudyConfig::builder()
            .chunk_word_budget(5)
            .retry(RetryPolicy {
                max_attempts: 1,
                base_delay: Duration::from_millis(1),
                multiplier: 2.0,
            })
            .build()
            .unwrap();
        let text = "One two three four five. Six seven eight nine ten.";
        let out = mcqs(&model, &config, text).await.unwrap();
        assert_eq!(out, "verified");
    }
}
