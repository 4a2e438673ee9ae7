//! Gemini REST client and the model seam.
//!
//! The pipeline talks to [`GenerativeModel`], an object-safe trait, so tests
//! substitute a scripted model and the batch runner never needs a network.
//! [`GeminiClient`] is the production implementation over the
//! `generateContent` REST endpoint.
//!
//! Error mapping is the retry layer's contract: HTTP 429 becomes
//! [`StudyError::RateLimited`], 401/403 become [`StudyError::AuthFailed`],
//! an empty or safety-blocked candidate becomes
//! [`StudyError::ResponseBlocked`], and anything else transport-shaped is
//! [`StudyError::ApiError`].

use crate::config::{SafetyThreshold, StudyConfig};
use crate::error::StudyError;
use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use tracing::debug;

/// Whether the model should answer in prose or JSON.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ResponseKind {
    Text,
    Json,
}

impl ResponseKind {
    fn mime_type(&self) -> &'static str {
        match self {
            ResponseKind::Text => "text/plain",
            ResponseKind::Json => "application/json",
        }
    }
}

/// A single-turn text generation backend.
///
/// `system` is the system instruction (empty string for none); `kind`
/// selects the response MIME type.
#[async_trait]
pub trait GenerativeModel: Send + Sync {
    async fn generate(
        &self,
        system: &str,
        prompt: &str,
        kind: ResponseKind,
    ) -> Result<String, StudyError>;

    /// Model identifier for logs and error messages.
    fn name(&self) -> &str;
}

/// Production client for the Gemini `generateContent` endpoint.
pub struct GeminiClient {
    http: reqwest::Client,
    api_key: String,
    model: String,
    temperature: f32,
    top_p: f32,
    top_k: u32,
    max_output_tokens: u32,
    safety_threshold: SafetyThreshold,
}

impl GeminiClient {
    /// Build a client from the run configuration.
    ///
    /// Fails with [`StudyError::AuthFailed`] when no API key is configured.
    pub fn from_config(config: &StudyConfig) -> Result<Self, StudyError> {
        let api_key = config
            .api_key
            .clone()
            .ok_or_else(|| StudyError::AuthFailed {
                detail: "no API key configured".into(),
            })?;
        let http = reqwest::Client::builder()
            .timeout(std::time::Duration::from_secs(300))
            .build()
            .map_err(|e| StudyError::Internal(format!("HTTP client build failed: {e}")))?;
        Ok(Self {
            http,
            api_key,
            model: config.model.clone(),
            temperature: config.temperature,
            top_p: config.top_p,
            top_k: config.top_k,
            max_output_tokens: config.max_output_tokens,
            safety_threshold: config.safety_threshold,
        })
    }

    fn endpoint(&self) -> String {
        format!(
            "https://generativelanguage.googleapis.com/v1beta/models/{}:generateContent",
            self.model
        )
    }

    fn safety_settings(&self) -> Vec<SafetySetting> {
        const CATEGORIES: [&str; 4] = [
            "HARM_CATEGORY_HARASSMENT",
            "HARM_CATEGORY_HATE_SPEECH",
            "HARM_CATEGORY_SEXUALLY_EXPLICIT",
            "HARM_CATEGORY_DANGEROUS_CONTENT",
        ];
        CATEGORIES
            .iter()
            .map(|c| SafetySetting {
                category: c.to_string(),
                threshold: self.safety_threshold.as_api_str().to_string(),
            })
            .collect()
    }
}

#[derive(Serialize)]
struct GenerateRequest {
    contents: Vec<Content>,
    #[serde(rename = "systemInstruction", skip_serializing_if = "Option::is_none")]
    system_instruction: Option<Content>,
    #[serde(rename = "generationConfig")]
    generation_config: GenerationConfig,
    #[serde(rename = "safetySettings")]
    safety_settings: Vec<SafetySetting>,
}

#[derive(Serialize)]
struct Content {
    #[serde(skip_serializing_if = "Option::is_none")]
    role: Option<String>,
    parts: Vec<Part>,
}

#[derive(Serialize)]
struct Part {
    text: String,
}

#[derive(Serialize)]
struct GenerationConfig {
    temperature: f32,
    #[serde(rename = "topP")]
    top_p: f32,
    #[serde(rename = "topK")]
    top_k: u32,
    #[serde(rename = "maxOutputTokens")]
    max_output_tokens: u32,
    #[serde(rename = "responseMimeType")]
    response_mime_type: String,
}

#[derive(Serialize)]
struct SafetySetting {
    category: String,
    threshold: String,
}

#[derive(Deserialize)]
struct GenerateResponse {
    #[serde(default)]
    candidates: Vec<Candidate>,
    #[serde(rename = "promptFeedback")]
    prompt_feedback: Option<PromptFeedback>,
}

#[derive(Deserialize)]
struct Candidate {
    content: Option<ResponseContent>,
}

#[derive(Deserialize)]
struct ResponseContent {
    #[serde(default)]
    parts: Vec<ResponsePart>,
}

#[derive(Deserialize)]
struct ResponsePart {
    text: Option<String>,
}

#[derive(Deserialize)]
struct PromptFeedback {
    #[serde(rename = "blockReason")]
    block_reason: Option<String>,
}

/// Text of the first candidate. Long outputs arrive split across several
/// parts within one candidate, so all parts are concatenated.
fn candidate_text(parsed: GenerateResponse) -> String {
    parsed
        .candidates
        .into_iter()
        .next()
        .and_then(|c| c.content)
        .map(|c| {
            c.parts
                .into_iter()
                .filter_map(|p| p.text)
                .collect::<String>()
        })
        .unwrap_or_default()
}

#[async_trait]
impl GenerativeModel for GeminiClient {
    async fn generate(
        &self,
        system: &str,
        prompt: &str,
        kind: ResponseKind,
    ) -> Result<String, StudyError> {
        let request = GenerateRequest {
            contents: vec![Content {
                role: Some("user".to_string()),
                parts: vec![Part {
                    text: prompt.to_string(),
                }],
            }],
            system_instruction: (!system.is_empty()).then(|| Content {
                role: None,
                parts: vec![Part {
                    text: system.to_string(),
                }],
            }),
            generation_config: GenerationConfig {
                temperature: self.temperature,
                top_p: self.top_p,
                top_k: self.top_k,
                max_output_tokens: self.max_output_tokens,
                response_mime_type: kind.mime_type().to_string(),
            },
            safety_settings: self.safety_settings(),
        };

        debug!(model = %self.model, kind = ?kind, prompt_chars = prompt.len(), "gemini request");

        let response = self
            .http
            .post(self.endpoint())
            .header("x-goog-api-key", &self.api_key)
            .json(&request)
            .send()
            .await
            .map_err(|e| StudyError::ApiError {
                detail: format!("request failed: {e}"),
            })?;

        let status = response.status();
        if status.as_u16() == 429 {
            return Err(StudyError::RateLimited {
                model: self.model.clone(),
            });
        }
        if status.as_u16() == 401 || status.as_u16() == 403 {
            let body = response.text().await.unwrap_or_default();
            return Err(StudyError::AuthFailed {
                detail: format!("HTTP {status}: {body}"),
            });
        }
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            return Err(StudyError::ApiError {
                detail: format!("HTTP {status}: {body}"),
            });
        }

        let parsed: GenerateResponse =
            response.json().await.map_err(|e| StudyError::ApiError {
                detail: format!("unparseable response body: {e}"),
            })?;

        if let Some(reason) = parsed
            .prompt_feedback
            .as_ref()
            .and_then(|f| f.block_reason.clone())
        {
            return Err(StudyError::ResponseBlocked {
                reason: Some(reason),
            });
        }

        let text = candidate_text(parsed);
        if text.trim().is_empty() {
            return Err(StudyError::ResponseBlocked { reason: None });
        }
        Ok(text)
    }

    fn name(&self) -> &str {
        &self.model
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Mutex;

    /// Scripted model returning canned outputs in order.
    pub struct ScriptedModel {
        outputs: Mutex<Vec<Result<String, StudyError>>>,
    }

    impl ScriptedModel {
        pub fn new(outputs: Vec<Result<String, StudyError>>) -> Self {
            Self {
                outputs: Mutex::new(outputs),
            }
        }
    }

    #[async_trait]
    impl GenerativeModel for ScriptedModel {
        async fn generate(
            &self,
            _system: &str,
            _prompt: &str,
            _kind: ResponseKind,
        ) -> Result<String, StudyError> {
            self.outputs
                .lock()
                .unwrap()
                .remove(0)
        }

        fn name(&self) -> &str {
            "scripted"
        }
    }

    #[test]
    fn from_config_requires_api_key() {
        let config = StudyConfig::default();
        assert!(matches!(
            GeminiClient::from_config(&config),
            Err(StudyError::AuthFailed { .. })
        ));
    }

    #[test]
    fn request_serialises_with_camel_case_wire_names() {
        let req = GenerateRequest {
            contents: vec![Content {
                role: Some("user".into()),
                parts: vec![Part { text: "hi".into() }],
            }],
            system_instruction: None,
            generation_config: GenerationConfig {
                temperature: 0.8,
                top_p: 0.95,
                top_k: 64,
                max_output_tokens: 8192,
                response_mime_type: "application/json".into(),
            },
            safety_settings: vec![],
        };
        let json = serde_json::to_string(&req).unwrap();
        assert!(json.contains("generationConfig"));
        assert!(json.contains("maxOutputTokens"));
        assert!(json.contains("responseMimeType"));
        assert!(json.contains("topK"));
        assert!(!json.contains("systemInstruction"));
    }

    #[test]
    fn multi_part_candidate_text_is_concatenated() {
        let body = r#"{"candidates": [{"content": {"parts": [
            {"text": "first half "},
            {"text": "second half"}
        ]}}]}"#;
        let parsed: GenerateResponse = serde_json::from_str(body).unwrap();
        assert_eq!(candidate_text(parsed), "first half second half");
    }

    #[test]
    fn response_parses_block_reason() {
        let body = r#"{"promptFeedback": {"blockReason": "SAFETY"}, "candidates": []}"#;
        let parsed: GenerateResponse = serde_json::from_str(body).unwrap();
        assert_eq!(
            parsed.prompt_feedback.unwrap().block_reason.as_deref(),
            Some("SAFETY")
        );
    }

    #[tokio::test]
    async fn scripted_model_returns_outputs_in_order() {
        let model = ScriptedModel::new(vec![Ok("one".into()), Ok("two".into())]);
        assert_eq!(
            model.generate("", "p", ResponseKind::Text).await.unwrap(),
            "one"
        );
        assert_eq!(
            model.generate("", "p", ResponseKind::Text).await.unwrap(),
            "two"
        );
    }
}
