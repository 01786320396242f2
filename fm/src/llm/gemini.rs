//! Google Gemini API client implementation
//!
//! Text-only: the operation catalog reaches Gemini through the prompt, and the
//! plan comes back as a JSON object in the reply text.

use async_trait::async_trait;
use reqwest::Client;
use serde::{Deserialize, Serialize};
use std::time::Duration;
use tracing::debug;

use super::{CompletionRequest, CompletionResponse, LlmClient, LlmError, StopReason, TokenUsage};
use super::{parse_retry_after, read_error_body};
use crate::config::LlmConfig;

/// Gemini generateContent client
pub struct GeminiClient {
    model: String,
    api_key: String,
    base_url: String,
    http: Client,
    max_tokens: u32,
}

impl GeminiClient {
    /// Create a new client from configuration
    pub fn from_config(config: &LlmConfig) -> Result<Self, LlmError> {
        debug!(model = %config.model, "GeminiClient::from_config: called");
        let api_key = config.get_api_key().map_err(|e| LlmError::Config(e.to_string()))?;

        let timeout = Duration::from_millis(config.timeout_ms);
        let http = Client::builder().timeout(timeout).build().map_err(LlmError::Network)?;

        Ok(Self {
            model: config.model.clone(),
            api_key,
            base_url: config.resolved_base_url(),
            http,
            max_tokens: config.max_tokens,
        })
    }

    fn build_url(&self) -> String {
        format!("{}/models/{}:generateContent", self.base_url, self.model)
    }

    fn build_request_body(&self, request: &CompletionRequest) -> GeminiRequest {
        debug!(%self.model, message_count = request.messages.len(), "build_request_body: called");
        GeminiRequest {
            contents: request
                .messages
                .iter()
                .map(|m| GeminiContent {
                    role: m.role.as_gemini().to_string(),
                    parts: vec![GeminiPart { text: m.content.clone() }],
                })
                .collect(),
            system_instruction: if request.system_prompt.is_empty() {
                None
            } else {
                Some(GeminiSystemInstruction {
                    parts: vec![GeminiPart {
                        text: request.system_prompt.clone(),
                    }],
                })
            },
            generation_config: GeminiGenerationConfig {
                temperature: request.temperature,
                max_output_tokens: request.max_tokens.min(self.max_tokens),
            },
        }
    }

    fn parse_response(&self, parsed: GeminiResponse) -> Result<CompletionResponse, LlmError> {
        if let Some(error) = parsed.error {
            return Err(LlmError::InvalidResponse(format!("Gemini API error: {}", error.message)));
        }

        let candidate = parsed
            .candidates
            .and_then(|c| c.into_iter().next())
            .ok_or_else(|| LlmError::InvalidResponse("No candidates in response".to_string()))?;

        let text: String = candidate
            .content
            .map(|c| c.parts.into_iter().filter_map(|p| p.text).collect())
            .unwrap_or_default();

        Ok(CompletionResponse {
            content: if text.is_empty() { None } else { Some(text) },
            tool_calls: vec![],
            stop_reason: StopReason::from_gemini(candidate.finish_reason.as_deref()),
            usage: parsed
                .usage_metadata
                .map(|u| TokenUsage {
                    input_tokens: u.prompt_token_count,
                    output_tokens: u.candidates_token_count,
                })
                .unwrap_or_default(),
        })
    }
}

#[async_trait]
impl LlmClient for GeminiClient {
    async fn complete(&self, request: CompletionRequest) -> Result<CompletionResponse, LlmError> {
        debug!(%self.model, "complete: called");
        let body = self.build_request_body(&request);

        let response = self
            .http
            .post(self.build_url())
            .header("x-goog-api-key", self.api_key.clone())
            .header("content-type", "application/json")
            .json(&body)
            .send()
            .await?;

        let status = response.status().as_u16();
        if status == 429 {
            debug!("complete: rate limited (429)");
            return Err(LlmError::RateLimited {
                retry_after: parse_retry_after(response.headers()),
            });
        }

        if !response.status().is_success() {
            debug!(%status, "complete: API error");
            return Err(LlmError::ApiError {
                status,
                message: read_error_body(response).await,
            });
        }

        let parsed: GeminiResponse = response
            .json()
            .await
            .map_err(|e| LlmError::InvalidResponse(e.to_string()))?;
        self.parse_response(parsed)
    }
}

#[derive(Debug, Serialize)]
struct GeminiRequest {
    contents: Vec<GeminiContent>,
    #[serde(rename = "systemInstruction", skip_serializing_if = "Option::is_none")]
    system_instruction: Option<GeminiSystemInstruction>,
    #[serde(rename = "generationConfig")]
    generation_config: GeminiGenerationConfig,
}

#[derive(Debug, Serialize)]
struct GeminiContent {
    role: String,
    parts: Vec<GeminiPart>,
}

#[derive(Debug, Serialize)]
struct GeminiSystemInstruction {
    parts: Vec<GeminiPart>,
}

#[derive(Debug, Serialize)]
struct GeminiPart {
    text: String,
}

#[derive(Debug, Serialize)]
struct GeminiGenerationConfig {
    #[serde(skip_serializing_if = "Option::is_none")]
    temperature: Option<f32>,
    #[serde(rename = "maxOutputTokens")]
    max_output_tokens: u32,
}

#[derive(Debug, Deserialize)]
struct GeminiResponse {
    candidates: Option<Vec<GeminiCandidate>>,
    error: Option<GeminiErrorDetail>,
    #[serde(rename = "usageMetadata")]
    usage_metadata: Option<GeminiUsage>,
}

#[derive(Debug, Deserialize)]
struct GeminiCandidate {
    content: Option<GeminiContentResponse>,
    #[serde(rename = "finishReason")]
    finish_reason: Option<String>,
}

#[derive(Debug, Deserialize)]
struct GeminiContentResponse {
    #[serde(default)]
    parts: Vec<GeminiPartResponse>,
}

#[derive(Debug, Deserialize)]
struct GeminiPartResponse {
    text: Option<String>,
}

#[derive(Debug, Deserialize)]
struct GeminiErrorDetail {
    message: String,
}

#[derive(Debug, Deserialize)]
struct GeminiUsage {
    #[serde(rename = "promptTokenCount", default)]
    prompt_token_count: u64,
    #[serde(rename = "candidatesTokenCount", default)]
    candidates_token_count: u64,
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::llm::Message;

    fn client() -> GeminiClient {
        GeminiClient {
            model: "gemini-2.0-flash".to_string(),
            api_key: "test-key".to_string(),
            base_url: "https://generativelanguage.googleapis.com/v1beta".to_string(),
            http: Client::new(),
            max_tokens: 2048,
        }
    }

    #[test]
    fn test_build_url_keeps_key_out_of_query() {
        let url = client().build_url();
        assert!(url.ends_with("models/gemini-2.0-flash:generateContent"));
        assert!(!url.contains("test-key"));
    }

    #[test]
    fn test_request_body_shape() {
        let request = CompletionRequest {
            system_prompt: "You plan file operations.".to_string(),
            messages: vec![Message::user("next step?")],
            tools: vec![],
            max_tokens: 100_000,
            temperature: Some(0.2),
        };

        let body = serde_json::to_value(client().build_request_body(&request)).unwrap();
        assert_eq!(body["contents"][0]["role"], "user");
        assert_eq!(body["contents"][0]["parts"][0]["text"], "next step?");
        assert_eq!(body["systemInstruction"]["parts"][0]["text"], "You plan file operations.");
        assert_eq!(body["generationConfig"]["maxOutputTokens"], 2048);
    }

    #[test]
    fn test_parse_response_joins_parts() {
        let parsed: GeminiResponse = serde_json::from_value(serde_json::json!({
            "candidates": [{
                "content": {"parts": [{"text": "{\"status\":"}, {"text": " \"done\"}"}]},
                "finishReason": "STOP"
            }],
            "usageMetadata": {"promptTokenCount": 12, "candidatesTokenCount": 4}
        }))
        .unwrap();

        let response = client().parse_response(parsed).unwrap();
        assert_eq!(response.content.as_deref(), Some("{\"status\": \"done\"}"));
        assert_eq!(response.usage.input_tokens, 12);
    }

    #[test]
    fn test_parse_response_api_error() {
        let parsed: GeminiResponse =
            serde_json::from_value(serde_json::json!({"error": {"message": "quota", "code": 400}})).unwrap();
        assert!(client().parse_response(parsed).is_err());
    }
}
