//! Evaluation boundary: maps (phrase, transcript) to a verdict.

use std::env;

use async_trait::async_trait;
use reqwest::Client;
use serde::{Deserialize, Serialize};

use tutor_core::model::PhraseId;

use crate::error::EvaluationError;

//
// ─── WIRE TYPES ────────────────────────────────────────────────────────────────
//

/// What the evaluator suggests the client do next.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum NextAction {
    Advance,
    Retry,
}

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct EvaluationRequest {
    pub phrase_id: PhraseId,
    pub user_transcript: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub audio_reference: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub expected_phrase: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct EvaluationResponse {
    pub score: f32,
    pub feedback: String,
    #[serde(default)]
    pub hint: Option<String>,
    pub passed: bool,
    pub next_action: NextAction,
    #[serde(default)]
    pub difficulty: Option<String>,
    #[serde(default)]
    pub error_type: Option<String>,
    #[serde(default)]
    pub recommendation: Option<String>,
    #[serde(default)]
    pub focus_word: Option<String>,
}

//
// ─── CLIENT ────────────────────────────────────────────────────────────────────
//

/// Async evaluation boundary. The engine only consumes the result; transport
/// belongs to the implementation.
#[async_trait]
pub trait EvaluationClient: Send + Sync {
    /// Evaluate one submission.
    ///
    /// # Errors
    ///
    /// Returns `EvaluationError` for transport or protocol failures. The
    /// session machine converts failures into error-tone feedback.
    async fn evaluate(
        &self,
        request: &EvaluationRequest,
    ) -> Result<EvaluationResponse, EvaluationError>;
}

#[derive(Clone, Debug)]
pub struct EvaluationConfig {
    pub base_url: String,
    pub api_key: Option<String>,
}

impl EvaluationConfig {
    #[must_use]
    pub fn from_env() -> Option<Self> {
        let base_url = env::var("TUTOR_EVAL_BASE_URL").ok()?;
        if base_url.trim().is_empty() {
            return None;
        }
        let api_key = env::var("TUTOR_EVAL_API_KEY")
            .ok()
            .filter(|key| !key.trim().is_empty());
        Some(Self { base_url, api_key })
    }
}

/// HTTP evaluation client posting JSON to `{base_url}/evaluate`.
#[derive(Clone)]
pub struct HttpEvaluationClient {
    client: Client,
    config: EvaluationConfig,
}

impl HttpEvaluationClient {
    #[must_use]
    pub fn new(config: EvaluationConfig) -> Self {
        Self {
            client: Client::new(),
            config,
        }
    }
}

#[async_trait]
impl EvaluationClient for HttpEvaluationClient {
    async fn evaluate(
        &self,
        request: &EvaluationRequest,
    ) -> Result<EvaluationResponse, EvaluationError> {
        let url = format!("{}/evaluate", self.config.base_url.trim_end_matches('/'));

        let mut builder = self.client.post(url).json(request);
        if let Some(key) = self.config.api_key.as_deref() {
            builder = builder.bearer_auth(key);
        }

        let response = builder.send().await?;
        if !response.status().is_success() {
            return Err(EvaluationError::HttpStatus(response.status()));
        }

        let verdict: EvaluationResponse = response.json().await?;
        if verdict.feedback.trim().is_empty() {
            return Err(EvaluationError::EmptyResponse);
        }
        Ok(verdict)
    }
}

//
// ─── TESTS ─────────────────────────────────────────────────────────────────────
//
