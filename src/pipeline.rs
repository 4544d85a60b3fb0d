//! End-to-end claim flow: media in, persisted claim and report out.
//!
//! ```rust,ignore
//! let pipeline = ClaimPipeline::new(backend, store, PipelineConfig::default());
//! match pipeline.process_claim(audio, land_document, crop_photo, "9922001122").await {
//!     ClaimOutcome::Success { data, .. } => println!("Filed {}", data.application_id),
//!     ClaimOutcome::Error { reason } => eprintln!("{}", reason),
//! }
//! ```

use crate::config::PipelineConfig;
use crate::engine::revalidate;
use crate::error::Result;
use crate::llm::{compile_claim_prompt, invoke, parse_extraction, InferenceBackend, InferenceRequest};
use crate::media::{ClaimInput, UploadedFile};
use crate::persistence::ClaimRepository;
use crate::record::{prefill_from_profile, ClaimOutcome, ClaimRecord};
use crate::schema::ExtractionResult;
use crate::store::ClaimStore;
use log::{debug, error, info};
use std::sync::Arc;
use tokio::sync::mpsc::Sender;

/// Key under which the host-side validation report is attached to the full
/// report data.
pub const HOST_VALIDATION_KEY: &str = "host_validation";

#[derive(Debug, Clone, PartialEq)]
pub enum ClaimEvent {
    Starting,
    NormalizingMedia,
    Invoking,
    Parsing,
    Validating,
    Persisting,
    Success { application_id: String },
    Failed { reason: String },
}

pub struct ClaimPipeline {
    backend: Arc<dyn InferenceBackend>,
    repository: ClaimRepository,
    config: PipelineConfig,
}

impl ClaimPipeline {
    pub fn new(
        backend: Arc<dyn InferenceBackend>,
        store: Arc<dyn ClaimStore>,
        config: PipelineConfig,
    ) -> Self {
        Self {
            backend,
            repository: ClaimRepository::new(store, config.clone()),
            config,
        }
    }

    pub fn config(&self) -> &PipelineConfig {
        &self.config
    }

    pub fn repository(&self) -> &ClaimRepository {
        &self.repository
    }

    /// Runs one claim. Every failure is reported as [`ClaimOutcome::Error`].
    pub async fn process_claim(
        &self,
        audio: UploadedFile,
        land_document: UploadedFile,
        crop_photo: UploadedFile,
        mobile_number: &str,
    ) -> ClaimOutcome {
        let input = ClaimInput {
            audio,
            land_document,
            crop_photo,
            mobile_number: mobile_number.to_string(),
        };
        self.process_claim_with_progress(input, None).await
    }

    pub async fn process_claim_with_progress(
        &self,
        input: ClaimInput,
        progress: Option<Sender<ClaimEvent>>,
    ) -> ClaimOutcome {
        self.send_event(&progress, ClaimEvent::Starting).await;

        match self.run(&input, &progress).await {
            Ok(outcome) => {
                if let Some(id) = outcome.application_id() {
                    self.send_event(
                        &progress,
                        ClaimEvent::Success {
                            application_id: id.to_string(),
                        },
                    )
                    .await;
                }
                outcome
            }
            Err(e) => {
                let reason = e.user_reason();
                error!("Claim for {} failed: {}", input.mobile_number, e);
                self.send_event(
                    &progress,
                    ClaimEvent::Failed {
                        reason: reason.clone(),
                    },
                )
                .await;
                ClaimOutcome::Error { reason }
            }
        }
    }

    async fn run(
        &self,
        input: &ClaimInput,
        progress: &Option<Sender<ClaimEvent>>,
    ) -> Result<ClaimOutcome> {
        info!("Processing claim for mobile {}", input.mobile_number);

        self.send_event(progress, ClaimEvent::NormalizingMedia).await;
        let media = input.normalize()?;
        for part in media.parts() {
            debug!("{}: {} bytes as {}", part.slot, part.bytes.len(), part.mime_type);
        }

        let profile = self.repository.farmer_profile(&input.mobile_number).await;

        let prompt = compile_claim_prompt(self.config.today(), &self.config.policy);
        let mut request = InferenceRequest::new(prompt, &media, &self.config);
        if self.config.send_response_schema {
            request = request.with_response_schema(ExtractionResult::response_schema()?);
        }

        self.send_event(progress, ClaimEvent::Invoking).await;
        let raw = invoke(self.backend.as_ref(), &request, &self.config).await?;

        self.send_event(progress, ClaimEvent::Parsing).await;
        let mut result = parse_extraction(&raw)?;

        self.send_event(progress, ClaimEvent::Validating).await;
        let report = revalidate(&mut result, &self.config.policy);
        if !report.gaps.is_empty() {
            info!("Host validation corrected {} item(s)", report.gaps.len());
        }
        result
            .extra
            .insert(HOST_VALIDATION_KEY.to_string(), serde_json::to_value(&report)?);

        if let Some(profile) = &profile {
            prefill_from_profile(&mut result.form_fields, profile);
        }
        let mut record = ClaimRecord::assemble(&result, &input.mobile_number);

        self.send_event(progress, ClaimEvent::Persisting).await;
        let application_id = self
            .repository
            .save(&mut record, self.config.ai_confidence)
            .await;
        info!(
            "Claim {} assembled with payout {}",
            application_id, record.estimated_payout
        );

        Ok(ClaimOutcome::Success {
            voice_response: result.voice_response.clone(),
            data: record,
            full_report_data: result,
        })
    }

    async fn send_event(&self, sender: &Option<Sender<ClaimEvent>>, event: ClaimEvent) {
        if let Some(tx) = sender {
            let _ = tx.send(event).await;
        }
    }
}
