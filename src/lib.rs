//! # Crop Claim Builder
//!
//! A library for filing crop-loss insurance claims from three uploads: a
//! voice recording of the farmer, a photo of the 7/12 land-record extract and
//! a photo of the damaged crop.
//!
//! ## Core Concepts
//!
//! - **Single multimodal call**: the prompt and all three media parts go to the model in one request
//! - **Host-side validation**: the model's verdicts and figures are re-checked against the scheme rules
//!   (recency of the crop history, cancelled owners, rate table, premium classes)
//! - **Claim Record**: a flat field set used both for display and for the form overlay
//! - **Upsert-only persistence**: the application id is assigned with the first write;
//!   an unreachable store degrades to an `OFFLINE-` id instead of failing the claim
//!
//! ## Example
//!
//! ```rust,ignore
//! use crop_claim_builder::*;
//! use std::path::Path;
//! use std::sync::Arc;
//!
//! let backend = Arc::new(GeminiClient::new(api_key));
//! let store = Arc::new(InMemoryStore::new());
//! let pipeline = ClaimPipeline::new(backend, store, PipelineConfig::default());
//!
//! let outcome = pipeline
//!     .process_claim(
//!         UploadedFile::from_path(Path::new("voice.ogg")).await?,
//!         UploadedFile::from_path(Path::new("satbara.pdf")).await?,
//!         UploadedFile::from_path(Path::new("field.jpg")).await?,
//!         "9922001122",
//!     )
//!     .await;
//!
//! if let ClaimOutcome::Success { data, .. } = &outcome {
//!     println!("{} -> {}", data.application_id, data.estimated_payout);
//! }
//! ```

pub mod config;
pub mod engine;
pub mod error;
pub mod llm;
pub mod media;
pub mod persistence;
pub mod pipeline;
pub mod record;
pub mod schema;
pub mod store;
pub mod utils;

pub use config::{GeminiConfig, PipelineConfig, PolicyConfig};
pub use engine::{
    assess, revalidate, Assessment, Crop, PremiumClass, RateGroup, Recency, ValidationGap,
    ValidationReport,
};
pub use error::{ClaimError, Result};
pub use llm::{InferenceBackend, InferenceRequest};
pub use media::{ClaimInput, ClaimMedia, MediaPart, MediaSlot, UploadedFile};
pub use persistence::ClaimRepository;
pub use pipeline::{ClaimEvent, ClaimPipeline};
pub use record::{
    prefill_from_profile, Address, BankDetails, ClaimOutcome, ClaimRecord, FarmerProfile,
    FormOverlayInput, LandRecord, NarrativeReportInput,
};
pub use schema::*;
pub use store::{ClaimStatus, ClaimStore, InMemoryStore, JsonFileStore, StoredClaim};
pub use utils::{format_rupees, normalize_mobile, report_safe_text};

#[cfg(feature = "gemini")]
pub use llm::GeminiClient;

use std::sync::Arc;

/// One-shot convenience over [`ClaimPipeline`].
pub async fn process_claim(
    backend: Arc<dyn InferenceBackend>,
    store: Arc<dyn ClaimStore>,
    input: ClaimInput,
) -> ClaimOutcome {
    ClaimPipeline::new(backend, store, PipelineConfig::default())
        .process_claim_with_progress(input, None)
        .await
}
