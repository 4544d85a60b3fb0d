use async_trait::async_trait;
use chrono::NaiveDate;
use crop_claim_builder::*;
use serde_json::{json, Value};
use std::sync::Arc;

/// Replies with the same text to every request.
struct ScriptedBackend {
    reply: String,
}

impl ScriptedBackend {
    fn json(reply: Value) -> Arc<Self> {
        Arc::new(Self {
            reply: reply.to_string(),
        })
    }

    fn raw(reply: &str) -> Arc<Self> {
        Arc::new(Self {
            reply: reply.to_string(),
        })
    }
}

#[async_trait]
impl InferenceBackend for ScriptedBackend {
    async fn generate(&self, _request: &InferenceRequest) -> Result<String> {
        Ok(self.reply.clone())
    }
}

/// A store whose every call fails, as when the database is unreachable.
struct UnreachableStore;

fn unreachable<T>() -> Result<T> {
    Err(ClaimError::PersistenceUnavailable(
        "connection refused".to_string(),
    ))
}

#[async_trait]
impl ClaimStore for UnreachableStore {
    async fn upsert_claim(&self, _claim: StoredClaim) -> Result<()> {
        unreachable()
    }
    async fn get_claim(&self, _application_id: &str) -> Result<Option<StoredClaim>> {
        unreachable()
    }
    async fn claims_for_mobile(&self, _mobile: &str) -> Result<Vec<StoredClaim>> {
        unreachable()
    }
    async fn upsert_farmer(&self, _profile: FarmerProfile) -> Result<()> {
        unreachable()
    }
    async fn find_farmer_by_mobile(&self, _mobile: &str) -> Result<Option<FarmerProfile>> {
        unreachable()
    }
    async fn find_farmer_by_email(&self, _email: &str) -> Result<Option<FarmerProfile>> {
        unreachable()
    }
}

const MOBILE: &str = "9922001122";

fn config() -> PipelineConfig {
    PipelineConfig::default().with_assessment_date(NaiveDate::from_ymd_opt(2025, 9, 18).unwrap())
}

fn uploads() -> (UploadedFile, UploadedFile, UploadedFile) {
    (
        UploadedFile::new(b"OggS voice".to_vec()).with_content_type("audio/ogg"),
        UploadedFile::new(b"%PDF-1.7 satbara".to_vec()).with_file_name("satbara.pdf"),
        UploadedFile::new(b"\xff\xd8\xff field".to_vec()),
    )
}

fn input(mobile: &str) -> ClaimInput {
    let (audio, land_document, crop_photo) = uploads();
    ClaimInput {
        audio,
        land_document,
        crop_photo,
        mobile_number: mobile.to_string(),
    }
}

/// Soybean 0.40 Ha and Potato 0.20 Ha on a current 2025-26 crop history.
fn multi_crop_reply(payout: &str) -> Value {
    json!({
        "status": "success",
        "voice_response": "रामदासजी, काळजी करू नका. तुमचा अर्ज तयार आहे.",
        "verification": {
            "status": "Verified",
            "reason": "Soybean is listed for 2025-26",
            "visual_finding": "Waterlogged soybean rows"
        },
        "claim_estimation": {
            "estimated_payout": payout,
            "rate_applied": "₹45,000 / Ha",
            "deductible_rule": "2%",
            "logic": "0.40 * 45000 + 0.20 * 60000",
            "disclaimer": "Final amount subject to the crop cutting experiment."
        },
        "form_fields": {
            "farmer_full_name": "रामदास पाटील",
            "farmer_full_name_english": "Ramdas Patil",
            "khate_number": "330",
            "survey_number": "42/B",
            "crop_name": "सोयाबीन",
            "crop_name_english": "Soybean",
            "sown_area_hectare": "0.60",
            "premium_amount": "₹960",
            "cause_of_loss": "Excess rain",
            "season": "Kharif",
            "financial_year": "2025-26"
        },
        "evidence": {
            "spoken_name": "Ramdas Patil",
            "spoken_crop": "Soybean",
            "document_crop": "सोयाबीन",
            "latest_crop_year": "२०२५-२६",
            "ownership_entries": [
                { "name": "रामदास पाटील", "area_hectare": "0.60.00", "khate_number": "330" }
            ],
            "crops": [
                { "name": "सोयाबीन", "name_english": "Soybean", "area_hectare": "0.40" },
                { "name": "बटाटा", "name_english": "Potato", "area_hectare": "0.20" }
            ]
        }
    })
}

async fn run(
    backend: Arc<dyn InferenceBackend>,
    store: Arc<dyn ClaimStore>,
) -> ClaimOutcome {
    let (audio, land_document, crop_photo) = uploads();
    ClaimPipeline::new(backend, store, config())
        .process_claim(audio, land_document, crop_photo, MOBILE)
        .await
}

fn expect_success(outcome: ClaimOutcome) -> (ClaimRecord, ExtractionResult, String) {
    match outcome {
        ClaimOutcome::Success {
            data,
            full_report_data,
            voice_response,
        } => (data, full_report_data, voice_response),
        ClaimOutcome::Error { reason } => panic!("claim failed: {}", reason),
    }
}

#[tokio::test]
async fn test_multi_crop_claim_sums_every_crop() {
    let store = Arc::new(InMemoryStore::new());
    let outcome = run(ScriptedBackend::json(multi_crop_reply("₹30,000")), store.clone()).await;
    let (data, report, voice) = expect_success(outcome);

    assert_eq!(data.estimated_payout, "₹30,000");
    assert_eq!(data.mobile, MOBILE);
    assert!(data.application_id.starts_with("PMFBY-2025-"));
    assert_eq!(data.form_fields.premium_amount, "₹960");
    assert_eq!(report.verification.status, VerificationStatus::Verified);
    assert!(voice.contains("रामदासजी"));

    let stored = store.get_claim(&data.application_id).await.unwrap().unwrap();
    assert_eq!(stored.claim_data, data);
    assert_eq!(stored.farmer_mobile, MOBILE);
    assert_eq!(stored.status, ClaimStatus::Submitted);
    assert!((stored.ai_confidence - 0.95).abs() < f64::EPSILON);
}

#[tokio::test]
async fn test_drifted_payout_is_recomputed_on_the_host() {
    let store = Arc::new(InMemoryStore::new());
    let outcome = run(ScriptedBackend::json(multi_crop_reply("₹36,000")), store).await;
    let (data, report, _) = expect_success(outcome);

    assert_eq!(data.estimated_payout, "₹30,000");
    assert_eq!(report.claim_estimation.estimated_payout, "₹30,000");
    assert!(report
        .claim_estimation
        .logic
        .contains("(0.40 Ha * ₹45,000) + (0.20 Ha * ₹60,000)"));

    let validation = &report.extra["host_validation"];
    let kinds: Vec<&str> = validation["gaps"]
        .as_array()
        .unwrap()
        .iter()
        .filter_map(|g| g["kind"].as_str())
        .collect();
    assert!(kinds.contains(&"payout_drift"));
}

#[tokio::test]
async fn test_outdated_crop_history_uses_voice_claim() {
    let reply = json!({
        "status": "success",
        "voice_response": "काळजी करू नका.",
        "verification": { "status": "Mismatch: document shows Soybean", "reason": "Crop differs" },
        "claim_estimation": { "estimated_payout": "₹22,500" },
        "form_fields": {
            "farmer_full_name": "Ramdas Patil",
            "crop_name": "Soybean",
            "sown_area_hectare": "0.50",
            "financial_year": "2023-24"
        },
        "evidence": {
            "spoken_name": "Ramdas Patil",
            "spoken_crop": "Cotton",
            "document_crop": "Soybean",
            "latest_crop_year": "2023-24",
            "ownership_entries": [{ "name": "Ramdas Patil", "area_hectare": "0.50" }],
            "crops": [{ "name": "Soybean", "area_hectare": "0.50" }]
        }
    });

    let outcome = run(ScriptedBackend::json(reply), Arc::new(InMemoryStore::new())).await;
    let (data, report, _) = expect_success(outcome);

    assert_eq!(report.verification.status, VerificationStatus::VoiceOverride);
    assert_eq!(report.verification.status.as_str(), "Verified (Voice Override)");
    assert_eq!(data.form_fields.crop_name, "Cotton");
    // Cotton on 0.50 Ha at ₹60,000 / Ha.
    assert_eq!(data.estimated_payout, "₹30,000");
    assert_eq!(data.form_fields.premium_amount, "₹1,500");
}

#[tokio::test]
async fn test_bracketed_owner_is_never_the_claimant() {
    let reply = json!({
        "status": "success",
        "verification": { "status": "Verified" },
        "claim_estimation": { "estimated_payout": "₹90,000" },
        "form_fields": {
            "farmer_full_name": "शंकर पाटील",
            "khate_number": "101",
            "crop_name": "Jowar",
            "sown_area_hectare": ""
        },
        "evidence": {
            "spoken_name": "Ramdas Patil",
            "spoken_crop": "Jowar",
            "latest_crop_year": "2024-25",
            "ownership_entries": [
                { "name": "[शंकर पाटील]", "area_hectare": "2.00", "khate_number": "101" },
                { "name": "Ramdas Patil", "area_hectare": "1.00", "khate_number": "330" }
            ],
            "crops": [{ "name": "ज्वारी", "name_english": "Jowar", "area_hectare": "" }]
        }
    });

    let outcome = run(ScriptedBackend::json(reply), Arc::new(InMemoryStore::new())).await;
    let (data, _, _) = expect_success(outcome);

    assert_eq!(data.form_fields.farmer_full_name, "Ramdas Patil");
    assert_eq!(data.form_fields.khate_number, "330");
    assert_eq!(data.form_fields.sown_area_hectare, "1.00");
    // Jowar on the active owner's 1.00 Ha at ₹35,000 / Ha, Rabi premium 1.5%.
    assert_eq!(data.estimated_payout, "₹35,000");
    assert_eq!(data.form_fields.premium_amount, "₹525");
}

fn gap_kinds(report: &ExtractionResult) -> Vec<String> {
    report.extra["host_validation"]["gaps"]
        .as_array()
        .map(|gaps| {
            gaps.iter()
                .filter_map(|g| g["kind"].as_str().map(str::to_string))
                .collect()
        })
        .unwrap_or_default()
}

#[tokio::test]
async fn test_outdated_history_values_recorded_crop_area() {
    let reply = json!({
        "status": "success",
        "verification": { "status": "Verified (Voice Override)" },
        "claim_estimation": { "estimated_payout": "₹60,000" },
        "form_fields": {
            "farmer_full_name": "Ramdas Patil",
            "crop_name": "Cotton",
            "sown_area_hectare": "1.00",
            "premium_amount": "₹3,000",
            "financial_year": "2019-20"
        },
        "evidence": {
            "spoken_name": "Ramdas Patil",
            "spoken_crop": "Cotton",
            "document_crop": "Soybean",
            "latest_crop_year": "2019-20",
            "ownership_entries": [{ "name": "Ramdas Patil", "area_hectare": "1.00" }],
            "crops": [{ "name": "Soybean", "area_hectare": "0.20" }]
        }
    });

    let outcome = run(ScriptedBackend::json(reply), Arc::new(InMemoryStore::new())).await;
    let (data, report, _) = expect_success(outcome);

    assert_eq!(report.verification.status, VerificationStatus::VoiceOverride);
    // Cotton on the recorded 0.20 Ha plot, not the 1.00 Ha holding.
    assert_eq!(data.estimated_payout, "₹12,000");
    assert_eq!(data.form_fields.premium_amount, "₹600");
    assert_eq!(data.form_fields.sown_area_hectare, "0.20");
    assert!(gap_kinds(&report).contains(&"area_corrected".to_string()));
}

#[tokio::test]
async fn test_co_owners_in_devanagari_match_latin_spoken_name() {
    let reply = json!({
        "status": "success",
        "verification": { "status": "Verified" },
        "claim_estimation": { "estimated_payout": "₹30,000" },
        "form_fields": {
            "farmer_full_name": "रामदास पाटील",
            "khate_number": "102",
            "crop_name": "कापूस",
            "sown_area_hectare": "",
            "premium_amount": "₹1,500"
        },
        "evidence": {
            "spoken_name": "Ramdas Patil",
            "spoken_crop": "Cotton",
            "latest_crop_year": "2025-26",
            "ownership_entries": [
                { "name": "शंकर पाटील", "area_hectare": "2.00", "khate_number": "101" },
                { "name": "रामदास पाटील", "area_hectare": "0.50", "khate_number": "102" }
            ],
            "crops": [{ "name": "कापूस", "area_hectare": "" }]
        }
    });

    let outcome = run(ScriptedBackend::json(reply), Arc::new(InMemoryStore::new())).await;
    let (data, report, _) = expect_success(outcome);

    assert_eq!(data.form_fields.farmer_full_name, "रामदास पाटील");
    // The claimant's own 0.50 Ha, never the first co-owner's 2.00 Ha.
    assert_eq!(data.form_fields.sown_area_hectare, "0.50");
    assert_eq!(data.estimated_payout, "₹30,000");
    assert!(!gap_kinds(&report).contains(&"insufficient_evidence".to_string()));
}

#[tokio::test]
async fn test_sown_area_follows_valued_area() {
    let reply = json!({
        "status": "success",
        "verification": { "status": "Verified" },
        "claim_estimation": { "estimated_payout": "₹27,000" },
        "form_fields": {
            "farmer_full_name": "Ramdas Patil",
            "crop_name": "Soybean",
            "sown_area_hectare": "0.60",
            "premium_amount": "₹540"
        },
        "evidence": {
            "spoken_name": "Ramdas Patil",
            "spoken_crop": "Soybean",
            "latest_crop_year": "2025-26",
            "ownership_entries": [{ "name": "Ramdas Patil", "area_hectare": "0.60" }],
            "crops": [{ "name": "Soybean", "area_hectare": "0.40" }]
        }
    });

    let outcome = run(ScriptedBackend::json(reply), Arc::new(InMemoryStore::new())).await;
    let (data, report, _) = expect_success(outcome);

    assert_eq!(data.form_fields.sown_area_hectare, "0.40");
    assert_eq!(data.estimated_payout, "₹18,000");
    assert_eq!(data.form_fields.premium_amount, "₹360");
    let kinds = gap_kinds(&report);
    assert!(kinds.contains(&"area_corrected".to_string()));
    assert!(kinds.contains(&"payout_drift".to_string()));
}

#[tokio::test]
async fn test_corrective_upsert_keeps_one_record() {
    let store = Arc::new(InMemoryStore::new());
    let pipeline = ClaimPipeline::new(
        ScriptedBackend::json(multi_crop_reply("₹30,000")),
        store.clone(),
        config(),
    );

    let (mut data, _, _) = expect_success(pipeline.process_claim_with_progress(input(MOBILE), None).await);
    data.estimated_payout = "₹31,000".to_string();
    pipeline.repository().correct(&data).await.unwrap();
    pipeline.repository().correct(&data).await.unwrap();

    assert_eq!(store.claim_count(), 1);
    let stored = store.get_claim(&data.application_id).await.unwrap().unwrap();
    assert_eq!(stored.claim_data.estimated_payout, "₹31,000");
    assert_eq!(pipeline.repository().history(MOBILE).await.unwrap().len(), 1);
}

#[tokio::test]
async fn test_unreachable_store_yields_offline_id() {
    let outcome = run(
        ScriptedBackend::json(multi_crop_reply("₹30,000")),
        Arc::new(UnreachableStore),
    )
    .await;
    let (data, _, _) = expect_success(outcome);

    let suffix = data
        .application_id
        .strip_prefix("OFFLINE-")
        .expect("offline id");
    assert_eq!(suffix.len(), 6);
    assert!(suffix.chars().all(|c| c.is_ascii_hexdigit() && !c.is_ascii_lowercase()));
    assert_eq!(data.estimated_payout, "₹30,000");
}

#[tokio::test]
async fn test_form_overlay_matches_display_data() {
    let outcome = run(
        ScriptedBackend::json(multi_crop_reply("₹30,000")),
        Arc::new(InMemoryStore::new()),
    )
    .await;
    let (data, _, _) = expect_success(outcome);

    let display = serde_json::to_value(&data).unwrap();
    let overlay = serde_json::to_value(data.form_overlay()).unwrap();
    assert_eq!(display, overlay["form_fields"]);
    assert_eq!(overlay["form_fields"]["mobile_number"], MOBILE);
    assert_eq!(overlay["form_fields"]["application_id"], data.application_id.as_str());
}

#[tokio::test]
async fn test_fenced_reply_is_accepted() {
    let fenced = format!("```json\n{}\n```", multi_crop_reply("₹30,000"));
    let outcome = run(ScriptedBackend::raw(&fenced), Arc::new(InMemoryStore::new())).await;
    assert!(outcome.is_success());
}

#[tokio::test]
async fn test_malformed_reply_is_an_ai_error() {
    let store = Arc::new(InMemoryStore::new());
    let outcome = run(ScriptedBackend::raw("Sorry, I cannot read this."), store.clone()).await;

    let reason = outcome.reason().expect("error outcome");
    assert!(reason.starts_with("AI Error"), "reason: {}", reason);
    assert_eq!(store.claim_count(), 0);

    let wire = serde_json::to_value(&outcome).unwrap();
    assert_eq!(wire["status"], "error");
}

#[tokio::test]
async fn test_missing_media_is_rejected_before_inference() {
    let pipeline = ClaimPipeline::new(
        ScriptedBackend::json(multi_crop_reply("₹30,000")),
        Arc::new(InMemoryStore::new()),
        config(),
    );
    let (audio, _, crop_photo) = uploads();

    let outcome = pipeline
        .process_claim(audio, UploadedFile::new(Vec::new()), crop_photo, MOBILE)
        .await;
    assert_eq!(outcome.reason(), Some("Please upload the 7/12 extract first."));
}

#[tokio::test]
async fn test_file_store_and_profile_prefill() {
    let dir = tempfile::tempdir().unwrap();
    let store = Arc::new(JsonFileStore::open(dir.path()).await.unwrap());
    store
        .upsert_farmer(FarmerProfile {
            mobile_number: "+91 99220 01122".to_string(),
            full_name: "Ramdas Patil".to_string(),
            address: Address {
                village: "Pimpri".to_string(),
                ..Default::default()
            },
            bank_details: BankDetails {
                bank_name: "Bank of Maharashtra".to_string(),
                account_no: "60012345678".to_string(),
                ..Default::default()
            },
            ..Default::default()
        })
        .await
        .unwrap();

    let outcome = run(ScriptedBackend::json(multi_crop_reply("₹30,000")), store.clone()).await;
    let (data, _, _) = expect_success(outcome);

    assert_eq!(data.form_fields.farmer_full_name, "रामदास पाटील");
    assert_eq!(data.form_fields.address_village, "Pimpri");
    assert_eq!(data.form_fields.bank_account_no, "60012345678");

    let path = dir
        .path()
        .join("claims")
        .join(format!("{}.json", data.application_id));
    let on_disk: Value = serde_json::from_str(&std::fs::read_to_string(path).unwrap()).unwrap();
    assert_eq!(on_disk["claim_data"]["estimated_payout"], "₹30,000");
    assert_eq!(on_disk["status"], "Submitted");
}

#[tokio::test]
async fn test_concurrent_claims_get_distinct_ids() {
    let store = Arc::new(InMemoryStore::new());
    let backend = ScriptedBackend::json(multi_crop_reply("₹30,000"));

    let (first, second) = tokio::join!(
        process_claim(backend.clone(), store.clone(), input(MOBILE)),
        process_claim(backend.clone(), store.clone(), input("9000000000")),
    );

    let first_id = first.application_id().unwrap().to_string();
    let second_id = second.application_id().unwrap().to_string();
    assert_ne!(first_id, second_id);
    assert_eq!(store.claim_count(), 2);
    assert_eq!(store.claims_for_mobile("9000000000").await.unwrap().len(), 1);
}
