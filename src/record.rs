use crate::schema::{ExtractionResult, FormFields};
use crate::utils::{normalize_mobile, report_safe_text};
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Address {
    #[serde(default)]
    pub village: String,
    #[serde(default)]
    pub taluka: String,
    #[serde(default)]
    pub district: String,
    #[serde(default)]
    pub state: String,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct BankDetails {
    #[serde(default)]
    pub bank_name: String,
    #[serde(default)]
    pub account_no: String,
    #[serde(default)]
    pub ifsc_code: String,
    #[serde(default)]
    pub branch: String,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct LandRecord {
    #[serde(default)]
    pub survey_number: String,
    #[serde(default)]
    pub area_hectares: f64,
    #[serde(default)]
    pub crop_sown: String,
}

/// A registered farmer. Owned by the registration flow; claims only read it.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct FarmerProfile {
    pub mobile_number: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub email: Option<String>,
    #[serde(default)]
    pub full_name: String,
    #[serde(default)]
    pub address: Address,
    #[serde(default)]
    pub bank_details: BankDetails,
    #[serde(default)]
    pub land_records: Vec<LandRecord>,
}

impl FarmerProfile {
    /// Store key: the last 10 digits of the mobile number.
    pub fn key(&self) -> String {
        normalize_mobile(&self.mobile_number)
    }
}

fn fill(target: &mut String, value: &str) {
    if target.trim().is_empty() && !value.trim().is_empty() {
        *target = value.trim().to_string();
    }
}

/// Fills empty claim fields from the farmer's profile. Values read from the
/// document always win.
pub fn prefill_from_profile(fields: &mut FormFields, profile: &FarmerProfile) {
    fill(&mut fields.farmer_full_name, &profile.full_name);
    fill(&mut fields.farmer_full_name_english, &profile.full_name);
    fill(&mut fields.address_village, &profile.address.village);
    fill(&mut fields.address_village_english, &profile.address.village);
    fill(&mut fields.address_taluka, &profile.address.taluka);
    fill(&mut fields.address_taluka_english, &profile.address.taluka);
    fill(&mut fields.address_district, &profile.address.district);
    fill(&mut fields.address_district_english, &profile.address.district);
    fill(&mut fields.mobile_number, &profile.key());
    fill(&mut fields.bank_name, &profile.bank_details.bank_name);
    fill(&mut fields.bank_account_no, &profile.bank_details.account_no);

    if let [only] = profile.land_records.as_slice() {
        fill(&mut fields.survey_number, &only.survey_number);
    }
}

/// The flat claim as displayed and as fed to the form overlay.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ClaimRecord {
    #[serde(flatten)]
    pub form_fields: FormFields,
    #[serde(default)]
    pub mobile: String,
    /// Assigned by the repository on the first write; empty until then.
    #[serde(default)]
    pub application_id: String,
    #[serde(default)]
    pub estimated_payout: String,
}

const RECORD_KEYS: [&str; 3] = ["mobile", "application_id", "estimated_payout"];

impl ClaimRecord {
    /// Flattens the extraction, overlays the payout and stamps the caller's mobile.
    pub fn assemble(result: &ExtractionResult, mobile: &str) -> Self {
        let mut form_fields = result.form_fields.clone();
        for key in RECORD_KEYS {
            form_fields.extra.remove(key);
        }
        fill(&mut form_fields.mobile_number, &normalize_mobile(mobile));

        Self {
            form_fields,
            mobile: mobile.to_string(),
            application_id: String::new(),
            estimated_payout: result.claim_estimation.estimated_payout.clone(),
        }
    }

    pub fn form_overlay(&self) -> FormOverlayInput<'_> {
        FormOverlayInput { form_fields: self }
    }
}

/// Input of the coordinate-based form renderer.
#[derive(Debug, Clone, Serialize)]
pub struct FormOverlayInput<'a> {
    pub form_fields: &'a ClaimRecord,
}

/// Input of the narrative report renderer: the full extraction plus the name
/// printed as the filer.
#[derive(Debug, Clone, Serialize)]
pub struct NarrativeReportInput<'a> {
    #[serde(flatten)]
    pub report: &'a ExtractionResult,
    pub filer_name: String,
}

impl NarrativeReportInput<'_> {
    /// Payout line for the Latin-only report font, e.g. "Rs.30,000".
    pub fn payout_line(&self) -> String {
        report_safe_text(&self.report.claim_estimation.estimated_payout)
    }

    /// Filer name as printable text; falls back to the English form field
    /// when the name is written only in Devanagari.
    pub fn printable_filer_name(&self) -> String {
        let printable = report_safe_text(&self.filer_name);
        if printable.is_empty() {
            report_safe_text(&self.report.form_fields.farmer_full_name_english)
        } else {
            printable
        }
    }
}

/// Result of one `process_claim` call, serialized with a `status` tag.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "status", rename_all = "lowercase")]
pub enum ClaimOutcome {
    Success {
        data: ClaimRecord,
        full_report_data: ExtractionResult,
        voice_response: String,
    },
    Error {
        reason: String,
    },
}

impl ClaimOutcome {
    pub fn is_success(&self) -> bool {
        matches!(self, ClaimOutcome::Success { .. })
    }

    pub fn application_id(&self) -> Option<&str> {
        match self {
            ClaimOutcome::Success { data, .. } => Some(&data.application_id),
            ClaimOutcome::Error { .. } => None,
        }
    }

    pub fn reason(&self) -> Option<&str> {
        match self {
            ClaimOutcome::Error { reason } => Some(reason),
            ClaimOutcome::Success { .. } => None,
        }
    }

    /// Report input with `filer_name` taken from the override, else the
    /// English name, else the name as written.
    pub fn narrative_report(&self, filer_name: Option<&str>) -> Option<NarrativeReportInput<'_>> {
        match self {
            ClaimOutcome::Success {
                data,
                full_report_data,
                ..
            } => {
                let fields = &data.form_fields;
                let filer_name = filer_name
                    .map(str::to_string)
                    .filter(|n| !n.trim().is_empty())
                    .or_else(|| {
                        Some(fields.farmer_full_name_english.clone())
                            .filter(|n| !n.trim().is_empty())
                    })
                    .unwrap_or_else(|| fields.farmer_full_name.clone());
                Some(NarrativeReportInput {
                    report: full_report_data,
                    filer_name,
                })
            }
            ClaimOutcome::Error { .. } => None,
        }
    }
}
