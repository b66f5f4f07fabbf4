//! HTTP implementation of `CvOptimizer` against an OpenAI-compatible
//! chat-completions endpoint.
//!
//! Retries on 429 and 5xx with exponential backoff; auth rejections and
//! exhausted retries classify as service-unavailable so polling clients can
//! show a specific message.

use async_trait::async_trait;
use reqwest::Client;
use serde::{Deserialize, Serialize};
use tracing::{debug, warn};

use crate::optimizer::prompts::{build_optimize_prompt, OPTIMIZE_SYSTEM};
use crate::optimizer::{CvOptimizer, OptimizeOutcome, OptimizerError};

const MAX_TOKENS: u32 = 4096;
const MAX_RETRIES: u32 = 3;
const TEMPERATURE: f32 = 0.4;

#[derive(Debug, Serialize)]
struct ChatRequest<'a> {
    model: &'a str,
    temperature: f32,
    max_tokens: u32,
    messages: Vec<ChatMessage<'a>>,
}

#[derive(Debug, Serialize)]
struct ChatMessage<'a> {
    role: &'a str,
    content: &'a str,
}

#[derive(Debug, Deserialize)]
struct ChatResponse {
    choices: Vec<ChatChoice>,
}

#[derive(Debug, Deserialize)]
struct ChatChoice {
    message: AssistantMessage,
}

#[derive(Debug, Deserialize)]
struct AssistantMessage {
    content: Option<String>,
}

/// The optimizer's JSON payload, as instructed by `OPTIMIZE_SYSTEM`.
#[derive(Debug, Deserialize)]
struct OptimizerPayload {
    optimized_text: String,
    original_score: u16,
    improved_score: u16,
    recommendations: Vec<String>,
}

pub struct HttpOptimizer {
    client: Client,
    api_url: String,
    api_key: Option<String>,
    model: String,
}

impl HttpOptimizer {
    pub fn new(api_url: String, api_key: Option<String>, model: String) -> Self {
        Self {
            client: Client::builder()
                .timeout(std::time::Duration::from_secs(120))
                .build()
                .expect("Failed to build HTTP client"),
            api_url,
            api_key,
            model,
        }
    }

    async fn call(&self, prompt: &str) -> Result<String, OptimizerError> {
        let api_key = self.api_key.as_ref().ok_or(OptimizerError::NotConfigured)?;

        let request_body = ChatRequest {
            model: &self.model,
            temperature: TEMPERATURE,
            max_tokens: MAX_TOKENS,
            messages: vec![
                ChatMessage {
                    role: "system",
                    content: OPTIMIZE_SYSTEM,
                },
                ChatMessage {
                    role: "user",
                    content: prompt,
                },
            ],
        };

        let mut last_error: Option<OptimizerError> = None;

        for attempt in 0..MAX_RETRIES {
            if attempt > 0 {
                // Exponential backoff: 1s, 2s
                let delay = std::time::Duration::from_millis(1000 * (1 << (attempt - 1)));
                warn!(
                    "Optimizer call attempt {} failed, retrying after {}ms...",
                    attempt,
                    delay.as_millis()
                );
                tokio::time::sleep(delay).await;
            }

            let response = self
                .client
                .post(&self.api_url)
                .bearer_auth(api_key)
                .json(&request_body)
                .send()
                .await;

            let response = match response {
                Ok(r) => r,
                Err(e) => {
                    last_error = Some(OptimizerError::Unavailable(e.to_string()));
                    continue;
                }
            };

            let status = response.status();

            if status.as_u16() == 401 || status.as_u16() == 403 {
                let body = response.text().await.unwrap_or_default();
                warn!("Optimizer rejected credentials ({status}): {body}");
                return Err(OptimizerError::Unavailable(format!(
                    "authentication rejected (status {status})"
                )));
            }

            if status.as_u16() == 429 || status.is_server_error() {
                let body = response.text().await.unwrap_or_default();
                warn!("Optimizer API returned {status}: {body}");
                last_error = Some(OptimizerError::Unavailable(format!(
                    "status {status}: {body}"
                )));
                continue;
            }

            if !status.is_success() {
                let body = response.text().await.unwrap_or_default();
                return Err(OptimizerError::Rejected(format!("status {status}: {body}")));
            }

            let chat: ChatResponse = response
                .json()
                .await
                .map_err(|e| OptimizerError::Malformed(e.to_string()))?;

            let content = chat
                .choices
                .into_iter()
                .next()
                .and_then(|c| c.message.content)
                .filter(|c| !c.trim().is_empty())
                .ok_or_else(|| {
                    OptimizerError::Malformed("response contained no content".to_string())
                })?;

            debug!("Optimizer call succeeded ({} chars)", content.len());
            return Ok(content);
        }

        Err(last_error
            .unwrap_or_else(|| OptimizerError::Unavailable("retries exhausted".to_string())))
    }
}

#[async_trait]
impl CvOptimizer for HttpOptimizer {
    async fn optimize(
        &self,
        raw_text: &str,
        job_description: Option<&str>,
    ) -> Result<OptimizeOutcome, OptimizerError> {
        let prompt = build_optimize_prompt(raw_text, job_description);
        let content = self.call(&prompt).await?;

        let payload: OptimizerPayload = serde_json::from_str(strip_json_fences(&content))
            .map_err(|e| OptimizerError::Malformed(e.to_string()))?;

        if payload.optimized_text.trim().is_empty() {
            return Err(OptimizerError::Malformed(
                "optimized_text was empty".to_string(),
            ));
        }

        Ok(OptimizeOutcome {
            optimized_text: payload.optimized_text,
            original_score: payload.original_score.min(100) as u8,
            improved_score: payload.improved_score.min(100) as u8,
            recommendations: payload.recommendations,
        })
    }
}

/// Strips ```json ... ``` or ``` ... ``` code fences from model output.
fn strip_json_fences(text: &str) -> &str {
    let text = text.trim();
    if let Some(stripped) = text.strip_prefix("```json") {
        stripped
            .trim_start()
            .strip_suffix("```")
            .map(|s| s.trim())
            .unwrap_or(stripped.trim_start())
    } else if let Some(stripped) = text.strip_prefix("```") {
        stripped
            .trim_start()
            .strip_suffix("```")
            .map(|s| s.trim())
            .unwrap_or(stripped.trim_start())
    } else {
        text
    }
}
