use crate::media::MediaSlot;
use thiserror::Error;

#[derive(Error, Debug)]
pub enum ClaimError {
    #[error("Missing media for {0}: the upload is empty")]
    MissingMedia(MediaSlot),

    #[error("Invalid input: {0}")]
    InvalidInput(String),

    #[error("Inference failed: {0}")]
    Inference(String),

    #[error("Malformed model response: {0}")]
    MalformedResponse(String),

    #[error("Persistence unavailable: {0}")]
    PersistenceUnavailable(String),

    #[error("Serialization error: {0}")]
    SerializationError(#[from] serde_json::Error),

    #[error("IO error: {0}")]
    IoError(#[from] std::io::Error),

    #[cfg(feature = "gemini")]
    #[error("HTTP error: {0}")]
    HttpError(#[from] reqwest::Error),
}

impl ClaimError {
    /// Short human-readable reason shown to the farmer when a claim attempt fails.
    pub fn user_reason(&self) -> String {
        match self {
            ClaimError::MissingMedia(slot) => format!("Please upload the {} first.", slot.label()),
            ClaimError::InvalidInput(details) => format!("Invalid claim input: {}", details),
            ClaimError::Inference(details) => format!("AI Error: {}", details),
            ClaimError::MalformedResponse(details) => format!("AI Error: {}", details),
            #[cfg(feature = "gemini")]
            ClaimError::HttpError(e) => format!("AI Error: {}", e),
            other => other.to_string(),
        }
    }
}

pub type Result<T> = std::result::Result<T, ClaimError>;
