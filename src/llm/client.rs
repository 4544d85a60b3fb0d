use crate::config::GeminiConfig;
use crate::error::{ClaimError, Result};
use crate::llm::invoker::{InferenceBackend, InferenceRequest};
use crate::llm::types::*;
use async_trait::async_trait;
use base64::engine::general_purpose::STANDARD;
use base64::Engine;
use log::debug;
use reqwest::Client;

const GEMINI_BASE_URL: &str = "https://generativelanguage.googleapis.com/v1beta";

/// Gemini `generateContent` backend. Media is sent inline as base64 parts.
#[derive(Clone)]
pub struct GeminiClient {
    client: Client,
    api_key: String,
    base_url: String,
}

impl GeminiClient {
    pub fn new(api_key: String) -> Self {
        Self {
            client: Client::new(),
            api_key,
            base_url: GEMINI_BASE_URL.to_string(),
        }
    }

    pub fn from_config(config: &GeminiConfig) -> Self {
        Self::new(config.api_key.clone())
    }

    /// Points the client at another endpoint, e.g. a local proxy.
    pub fn with_base_url(mut self, base_url: impl Into<String>) -> Self {
        self.base_url = base_url.into();
        self
    }

    fn build_payload(request: &InferenceRequest) -> GenerateContentRequest {
        let mut parts = vec![Part::Text {
            text: request.prompt.clone(),
        }];
        parts.extend(request.parts.iter().map(|media| Part::InlineData {
            inline_data: InlineData {
                mime_type: media.mime_type.clone(),
                data: STANDARD.encode(&media.bytes),
            },
        }));

        GenerateContentRequest {
            contents: vec![Content::user(parts)],
            generation_config: GenerationConfig {
                response_mime_type: request.response_mime_type.clone(),
                temperature: request.temperature,
                response_schema: request.response_schema.clone(),
            },
        }
    }

    async fn generate_content(&self, request: &InferenceRequest) -> Result<String> {
        let url = format!(
            "{}/models/{}:generateContent?key={}",
            self.base_url, request.model, self.api_key
        );
        let payload = Self::build_payload(request);

        let res = self.client.post(&url).json(&payload).send().await?;
        let status = res.status();

        if !status.is_success() {
            let err_text = res.text().await?;
            return Err(ClaimError::Inference(format!(
                "Gemini API Error (status {}): {}",
                status, err_text
            )));
        }

        let body: GenerateContentResponse = res.json().await?;
        extract_text(body)
    }
}

fn extract_text(body: GenerateContentResponse) -> Result<String> {
    if let Some(reason) = body.prompt_feedback.and_then(|f| f.block_reason) {
        return Err(ClaimError::Inference(format!(
            "Request blocked by the model: {}",
            reason
        )));
    }

    let candidate = body
        .candidates
        .ok_or_else(|| ClaimError::Inference("No candidates returned".to_string()))?
        .into_iter()
        .next()
        .ok_or_else(|| ClaimError::Inference("Empty candidates list".to_string()))?;

    debug!("Gemini finish reason: {:?}", candidate.finish_reason);

    let text: String = candidate
        .content
        .map(|c| c.parts)
        .unwrap_or_default()
        .into_iter()
        .filter_map(|p| p.text)
        .collect();

    if text.trim().is_empty() {
        return Err(ClaimError::Inference(
            "Model returned non-text content".to_string(),
        ));
    }
    Ok(text)
}

#[async_trait]
impl InferenceBackend for GeminiClient {
    async fn generate(&self, request: &InferenceRequest) -> Result<String> {
        self.generate_content(request).await
    }
}
