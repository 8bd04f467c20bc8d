//! Refinement over an OpenAI-compatible chat-completions endpoint
//!
//! Requests use JSON mode; the model is asked for a small JSON object and
//! anything that does not parse into the expected shape is a
//! [`ServiceError::MalformedResponse`].

use std::time::Duration;

use async_trait::async_trait;
use reqwest::{Client, StatusCode};
use serde::{Deserialize, Serialize};
use shared_types::ClauseCategory;
use tracing::debug;

use crate::refinement::{RefinedLabel, RefinementService, ServiceError};

pub const DEFAULT_BASE_URL: &str = "https://api.openai.com/v1";
pub const DEFAULT_MODEL: &str = "gpt-4o-mini";

/// Confidence assumed when the model omits one
const DEFAULT_REFINED_CONFIDENCE: f32 = 0.75;
const MAX_KEY_TERMS: usize = 10;
const MAX_COMPLETION_TOKENS: u32 = 500;

const SYSTEM_PROMPT: &str = "You review commercial contracts. Answer only with the JSON object requested.";

const CLASSIFY_PROMPT: &str = "Classify the contract clause below into exactly one category from: \
confidentiality, liability, termination, indemnification, payment, governing-law, \
dispute-resolution, other.\n\
Reply with JSON: {\"category\": string, \"confidence\": number between 0 and 1, \
\"key_terms\": array of short strings}.\n\nClause:\n";

const SUMMARIZE_PROMPT: &str = "Rewrite the contract clause below in plain English for a \
non-lawyer, in at most three sentences.\n\
Reply with JSON: {\"summary\": string}.\n\nClause:\n";

pub struct OpenAiRefinementService {
    client: Client,
    base_url: String,
    model: String,
    api_key: String,
    timeout: Duration,
}

#[derive(Serialize)]
struct ChatMessage<'a> {
    role: &'a str,
    content: String,
}

#[derive(Serialize)]
struct ResponseFormat {
    #[serde(rename = "type")]
    kind: &'static str,
}

#[derive(Serialize)]
struct ChatRequest<'a> {
    model: &'a str,
    messages: Vec<ChatMessage<'a>>,
    response_format: ResponseFormat,
    max_tokens: u32,
    temperature: f32,
}

#[derive(Deserialize)]
struct ChatResponse {
    choices: Vec<ChatChoice>,
}

#[derive(Deserialize)]
struct ChatChoice {
    message: ChatResponseMessage,
}

#[derive(Deserialize)]
struct ChatResponseMessage {
    content: Option<String>,
}

#[derive(Deserialize)]
struct ClassificationPayload {
    category: String,
    confidence: Option<f32>,
    #[serde(default)]
    key_terms: Vec<String>,
}

#[derive(Deserialize)]
struct SummaryPayload {
    summary: String,
}

impl OpenAiRefinementService {
    pub fn new(
        base_url: impl Into<String>,
        model: impl Into<String>,
        api_key: impl Into<String>,
        timeout: Duration,
    ) -> Result<Self, ServiceError> {
        let client = Client::builder()
            .timeout(timeout)
            .build()
            .map_err(|e| ServiceError::Unavailable(e.to_string()))?;

        Ok(Self {
            client,
            base_url: base_url.into(),
            model: model.into(),
            api_key: api_key.into(),
            timeout,
        })
    }

    fn endpoint(&self) -> String {
        format!("{}/chat/completions", self.base_url.trim_end_matches('/'))
    }

    /// One JSON-mode chat completion; returns the message content
    async fn complete(&self, prompt: &str, clause_text: &str) -> Result<String, ServiceError> {
        let request = ChatRequest {
            model: &self.model,
            messages: vec![
                ChatMessage {
                    role: "system",
                    content: SYSTEM_PROMPT.to_string(),
                },
                ChatMessage {
                    role: "user",
                    content: format!("{}{}", prompt, clause_text),
                },
            ],
            response_format: ResponseFormat {
                kind: "json_object",
            },
            max_tokens: MAX_COMPLETION_TOKENS,
            temperature: 0.0,
        };

        debug!(model = %self.model, chars = clause_text.len(), "Calling chat completions");

        let response = self
            .client
            .post(self.endpoint())
            .bearer_auth(&self.api_key)
            .json(&request)
            .send()
            .await
            .map_err(|e| {
                if e.is_timeout() {
                    ServiceError::Timeout(self.timeout.as_millis() as u64)
                } else {
                    ServiceError::Unavailable(e.to_string())
                }
            })?;

        let status = response.status();
        if status == StatusCode::TOO_MANY_REQUESTS {
            return Err(ServiceError::RateLimited);
        }
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            return Err(ServiceError::Unavailable(format!("HTTP {}: {}", status, body)));
        }

        let body = response.text().await.map_err(|e| {
            if e.is_timeout() {
                ServiceError::Timeout(self.timeout.as_millis() as u64)
            } else {
                ServiceError::Unavailable(e.to_string())
            }
        })?;
        message_content(&body)
    }
}

#[async_trait]
impl RefinementService for OpenAiRefinementService {
    fn name(&self) -> &str {
        &self.model
    }

    async fn classify(&self, clause_text: &str) -> Result<RefinedLabel, ServiceError> {
        let content = self.complete(CLASSIFY_PROMPT, clause_text).await?;
        parse_classification(&content)
    }

    async fn summarize(&self, clause_text: &str) -> Result<String, ServiceError> {
        let content = self.complete(SUMMARIZE_PROMPT, clause_text).await?;
        parse_summary(&content)
    }
}

/// Extract the first choice's message content from a chat-completions body
pub(crate) fn message_content(body: &str) -> Result<String, ServiceError> {
    let response: ChatResponse = serde_json::from_str(body)
        .map_err(|e| ServiceError::MalformedResponse(format!("completion body: {}", e)))?;

    response
        .choices
        .into_iter()
        .next()
        .and_then(|choice| choice.message.content)
        .filter(|content| !content.trim().is_empty())
        .ok_or_else(|| ServiceError::MalformedResponse("empty completion".to_string()))
}

pub(crate) fn parse_classification(content: &str) -> Result<RefinedLabel, ServiceError> {
    let payload: ClassificationPayload = serde_json::from_str(content)
        .map_err(|e| ServiceError::MalformedResponse(format!("classification: {}", e)))?;

    let category = ClauseCategory::from_label(&payload.category).ok_or_else(|| {
        ServiceError::MalformedResponse(format!("unknown category '{}'", payload.category))
    })?;

    let key_terms = payload
        .key_terms
        .into_iter()
        .map(|t| t.trim().to_string())
        .filter(|t| !t.is_empty())
        .take(MAX_KEY_TERMS)
        .collect();

    RefinedLabel {
        category,
        confidence: payload.confidence.unwrap_or(DEFAULT_REFINED_CONFIDENCE),
        key_terms,
    }
    .validate()
}

pub(crate) fn parse_summary(content: &str) -> Result<String, ServiceError> {
    let payload: SummaryPayload = serde_json::from_str(content)
        .map_err(|e| ServiceError::MalformedResponse(format!("summary: {}", e)))?;

    let summary = payload.summary.trim();
    if summary.is_empty() {
        return Err(ServiceError::MalformedResponse("empty summary".to_string()));
    }
    Ok(summary.to_string())
}
