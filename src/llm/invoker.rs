use crate::config::PipelineConfig;
use crate::error::{ClaimError, Result};
use crate::media::{ClaimMedia, MediaPart};
use async_trait::async_trait;
use log::{debug, error};
use tokio::time::timeout;

/// One multimodal generation request: the compiled prompt followed by the
/// land document, the crop photo and the voice recording, in that order.
#[derive(Debug, Clone)]
pub struct InferenceRequest {
    pub model: String,
    pub prompt: String,
    pub parts: Vec<MediaPart>,
    pub response_mime_type: String,
    pub temperature: f32,
    pub response_schema: Option<serde_json::Value>,
}

impl InferenceRequest {
    pub fn new(prompt: String, media: &ClaimMedia, config: &PipelineConfig) -> Self {
        Self {
            model: config.model.clone(),
            prompt,
            parts: media.parts().into_iter().cloned().collect(),
            response_mime_type: "application/json".to_string(),
            temperature: config.temperature,
            response_schema: None,
        }
    }

    #[must_use]
    pub fn with_response_schema(mut self, schema: serde_json::Value) -> Self {
        self.response_schema = Some(schema);
        self
    }
}

/// A backend that turns a multimodal request into the model's raw text reply.
#[async_trait]
pub trait InferenceBackend: Send + Sync {
    async fn generate(&self, request: &InferenceRequest) -> Result<String>;
}

/// Submits the request once. Backend failures and timeouts both become
/// [`ClaimError::Inference`]; nothing is retried.
pub async fn invoke(
    backend: &dyn InferenceBackend,
    request: &InferenceRequest,
    config: &PipelineConfig,
) -> Result<String> {
    debug!(
        "Invoking model {} with {} media parts, prompt of {} chars",
        request.model,
        request.parts.len(),
        request.prompt.len()
    );

    match timeout(config.inference_timeout, backend.generate(request)).await {
        Ok(Ok(text)) => Ok(text),
        Ok(Err(ClaimError::Inference(details))) => {
            error!("Inference backend failed: {}", details);
            Err(ClaimError::Inference(details))
        }
        Ok(Err(other)) => {
            error!("Inference backend failed: {}", other);
            Err(ClaimError::Inference(other.to_string()))
        }
        Err(_) => {
            error!(
                "Inference timed out after {:?}",
                config.inference_timeout
            );
            Err(ClaimError::Inference(format!(
                "request timed out after {}s",
                config.inference_timeout.as_secs()
            )))
        }
    }
}
