use schemars::JsonSchema;
use serde::{Deserialize, Deserializer, Serialize};
use serde_json::Value;
use std::collections::BTreeMap;
use std::fmt;

/// Accepts strings, numbers, booleans and null for fields the model is asked
/// to fill with text. Anything else keeps its JSON rendering.
fn lenient_string<'de, D>(deserializer: D) -> std::result::Result<String, D::Error>
where
    D: Deserializer<'de>,
{
    let value = Value::deserialize(deserializer)?;
    Ok(match value {
        Value::Null => String::new(),
        Value::String(s) => s,
        Value::Number(n) => n.to_string(),
        Value::Bool(b) => b.to_string(),
        other => other.to_string(),
    })
}

fn lenient_status<'de, D>(deserializer: D) -> std::result::Result<VerificationStatus, D::Error>
where
    D: Deserializer<'de>,
{
    lenient_string(deserializer).map(VerificationStatus::from)
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize, JsonSchema)]
#[serde(rename_all = "lowercase")]
pub enum ResponseStatus {
    #[default]
    Success,
    Error,
}

/// Outcome of the crop cross-check between the voice claim and the 7/12 extract.
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(from = "String", into = "String")]
pub enum VerificationStatus {
    Verified,
    Mismatch,
    /// The crop history is outdated, so the spoken crop was trusted.
    VoiceOverride,
    #[default]
    Pending,
    Unrecognized(String),
}

impl VerificationStatus {
    pub fn as_str(&self) -> &str {
        match self {
            VerificationStatus::Verified => "Verified",
            VerificationStatus::Mismatch => "Mismatch",
            VerificationStatus::VoiceOverride => "Verified (Voice Override)",
            VerificationStatus::Pending => "Pending",
            VerificationStatus::Unrecognized(raw) => raw,
        }
    }
}

impl From<String> for VerificationStatus {
    fn from(raw: String) -> Self {
        let folded = raw.trim().to_lowercase();
        if folded.contains("override") {
            VerificationStatus::VoiceOverride
        } else if folded.starts_with("mismatch") {
            VerificationStatus::Mismatch
        } else if folded == "verified" {
            VerificationStatus::Verified
        } else if folded.is_empty() || folded == "pending" {
            VerificationStatus::Pending
        } else {
            VerificationStatus::Unrecognized(raw)
        }
    }
}

impl From<VerificationStatus> for String {
    fn from(status: VerificationStatus) -> Self {
        status.as_str().to_string()
    }
}

impl fmt::Display for VerificationStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize, JsonSchema)]
pub struct Verification {
    #[schemars(
        with = "String",
        description = "One of: \"Verified\", \"Mismatch\", \"Verified (Voice Override)\""
    )]
    #[serde(default, deserialize_with = "lenient_status")]
    pub status: VerificationStatus,

    #[schemars(description = "Full explanation of the verification logic")]
    #[serde(default, deserialize_with = "lenient_string")]
    pub reason: String,

    #[schemars(
        description = "Short description of what the crop photo shows, e.g. 'Standing water visible'"
    )]
    #[serde(default, deserialize_with = "lenient_string")]
    pub visual_finding: String,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize, JsonSchema)]
pub struct ClaimEstimation {
    #[schemars(description = "Estimated payout, e.g. '₹30,000'")]
    #[serde(default, deserialize_with = "lenient_string")]
    pub estimated_payout: String,

    #[schemars(description = "Scale of finance used, e.g. '₹60,000 / Ha (Cotton)'")]
    #[serde(default, deserialize_with = "lenient_string")]
    pub rate_applied: String,

    #[schemars(description = "Premium rule, e.g. '2% (Kharif)'")]
    #[serde(default, deserialize_with = "lenient_string")]
    pub deductible_rule: String,

    #[schemars(description = "The arithmetic, e.g. '0.5 Ha * ₹60,000'")]
    #[serde(default, deserialize_with = "lenient_string")]
    pub logic: String,

    #[serde(default, deserialize_with = "lenient_string")]
    pub disclaimer: String,
}

/// The flat field set of the claim form. Values are kept as the model wrote
/// them; area and premium may contain Devanagari numerals.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize, JsonSchema)]
pub struct FormFields {
    #[schemars(description = "Active occupant name from Namuna 7, as written")]
    #[serde(default, deserialize_with = "lenient_string")]
    pub farmer_full_name: String,
    #[serde(default, deserialize_with = "lenient_string")]
    pub farmer_full_name_english: String,

    #[serde(default, deserialize_with = "lenient_string")]
    pub address_village: String,
    #[serde(default, deserialize_with = "lenient_string")]
    pub address_village_english: String,
    #[serde(default, deserialize_with = "lenient_string")]
    pub address_taluka: String,
    #[serde(default, deserialize_with = "lenient_string")]
    pub address_taluka_english: String,
    #[serde(default, deserialize_with = "lenient_string")]
    pub address_district: String,
    #[serde(default, deserialize_with = "lenient_string")]
    pub address_district_english: String,

    #[schemars(description = "Survey / Gat number")]
    #[serde(default, deserialize_with = "lenient_string")]
    pub survey_number: String,
    #[schemars(description = "Khate (account) number next to the active name, e.g. '330'")]
    #[serde(default, deserialize_with = "lenient_string")]
    pub khate_number: String,

    #[schemars(
        description = "Final crop decision: document crop when verified, spoken crop when outdated"
    )]
    #[serde(default, deserialize_with = "lenient_string")]
    pub crop_name: String,
    #[serde(default, deserialize_with = "lenient_string")]
    pub crop_name_english: String,
    #[schemars(description = "Sown area in hectares from Namuna 12")]
    #[serde(default, deserialize_with = "lenient_string")]
    pub sown_area_hectare: String,

    #[serde(default, deserialize_with = "lenient_string")]
    pub scheme_name: String,
    #[schemars(description = "Premium, e.g. '₹1,500'")]
    #[serde(default, deserialize_with = "lenient_string")]
    pub premium_amount: String,
    #[serde(default, deserialize_with = "lenient_string")]
    pub cause_of_loss: String,
    #[serde(default, deserialize_with = "lenient_string")]
    pub date_of_loss: String,
    #[schemars(description = "Kharif or Rabi, from Namuna 12")]
    #[serde(default, deserialize_with = "lenient_string")]
    pub season: String,
    #[schemars(description = "Crop year, e.g. '2025-26'")]
    #[serde(default, deserialize_with = "lenient_string")]
    pub financial_year: String,

    #[serde(default, deserialize_with = "lenient_string")]
    pub mobile_number: String,
    #[serde(default, deserialize_with = "lenient_string")]
    pub bank_name: String,
    #[serde(default, deserialize_with = "lenient_string")]
    pub bank_account_no: String,

    /// Keys the model added beyond the named fields.
    #[schemars(skip)]
    #[serde(flatten)]
    pub extra: BTreeMap<String, Value>,
}

/// One row of the Namuna 7 ownership table.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize, JsonSchema)]
pub struct OwnershipEntry {
    #[schemars(description = "Name exactly as printed, including any [ ] or ( ) around it")]
    #[serde(default, deserialize_with = "lenient_string")]
    pub name: String,
    #[serde(default, deserialize_with = "lenient_string")]
    pub area_hectare: String,
    #[serde(default, deserialize_with = "lenient_string")]
    pub khate_number: String,
    #[schemars(description = "True when the entry is struck through")]
    #[serde(default)]
    pub struck_through: bool,
}

/// One crop of the latest season in the Namuna 12 crop history.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize, JsonSchema)]
pub struct CropEntry {
    #[serde(default, deserialize_with = "lenient_string")]
    pub name: String,
    #[serde(default, deserialize_with = "lenient_string")]
    pub name_english: String,
    #[schemars(description = "Crop area in hectares; empty when blank in the document")]
    #[serde(default, deserialize_with = "lenient_string")]
    pub area_hectare: String,
    #[serde(default, deserialize_with = "lenient_string")]
    pub season: String,
}

/// Raw facts read from the inputs, before any decision is made. The host
/// re-runs the decision and finance rules on these.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize, JsonSchema)]
pub struct ClaimEvidence {
    #[schemars(description = "Farmer name as heard in the voice claim")]
    #[serde(default, deserialize_with = "lenient_string")]
    pub spoken_name: String,
    #[schemars(description = "Crop as heard in the voice claim")]
    #[serde(default, deserialize_with = "lenient_string")]
    pub spoken_crop: String,
    #[schemars(description = "Crop recorded in the latest Namuna 12 year")]
    #[serde(default, deserialize_with = "lenient_string")]
    pub document_crop: String,
    #[schemars(description = "Latest year in Namuna 12, e.g. '2025-26'")]
    #[serde(default, deserialize_with = "lenient_string")]
    pub latest_crop_year: String,
    #[serde(default)]
    pub ownership_entries: Vec<OwnershipEntry>,
    #[serde(default)]
    pub crops: Vec<CropEntry>,
}

/// The structured reply of the inference backend.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize, JsonSchema)]
pub struct ExtractionResult {
    #[serde(default)]
    pub status: ResponseStatus,

    #[schemars(description = "Short empathetic reply in the language of the voice claim")]
    #[serde(default, deserialize_with = "lenient_string")]
    pub voice_response: String,

    #[serde(default)]
    pub verification: Verification,

    #[serde(default)]
    pub claim_estimation: ClaimEstimation,

    #[serde(default)]
    pub form_fields: FormFields,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub evidence: Option<ClaimEvidence>,

    #[schemars(skip)]
    #[serde(flatten)]
    pub extra: BTreeMap<String, Value>,
}

impl ExtractionResult {
    /// Gemini-compatible response schema: subschemas inlined and keywords the
    /// API rejects removed.
    pub fn response_schema() -> serde_json::Result<Value> {
        let settings = schemars::gen::SchemaSettings::openapi3().with(|s| {
            s.inline_subschemas = true;
        });
        let root = settings
            .into_generator()
            .into_root_schema_for::<ExtractionResult>();
        let mut value = serde_json::to_value(root)?;
        strip_unsupported_keywords(&mut value);
        Ok(value)
    }
}

const UNSUPPORTED_SCHEMA_KEYWORDS: &[&str] = &[
    "$schema",
    "definitions",
    "title",
    "default",
    "format",
    "additionalProperties",
];

fn strip_unsupported_keywords(value: &mut Value) {
    match value {
        Value::Object(map) => {
            for key in UNSUPPORTED_SCHEMA_KEYWORDS {
                map.remove(*key);
            }
            for child in map.values_mut() {
                strip_unsupported_keywords(child);
            }
        }
        Value::Array(items) => items.iter_mut().for_each(strip_unsupported_keywords),
        _ => {}
    }
}
