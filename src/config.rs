use chrono::{Local, NaiveDate};
use serde::{Deserialize, Serialize};
use std::time::Duration;

pub const DEFAULT_MODEL: &str = "gemini-2.5-flash";
pub const DEFAULT_SCHEME_NAME: &str = "प्रधानमंत्री पीक विमा योजना (PMFBY)";

/// Policy knobs shared by the prompt and the host-side engine so the two
/// never disagree.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PolicyConfig {
    /// A 7/12 crop history is current when its latest year is this year or
    /// the one before.
    pub assessment_year: i32,
    pub scheme_name: String,
}

impl Default for PolicyConfig {
    fn default() -> Self {
        Self {
            assessment_year: 2025,
            scheme_name: DEFAULT_SCHEME_NAME.to_string(),
        }
    }
}

impl PolicyConfig {
    pub fn current_years(&self) -> [i32; 2] {
        [self.assessment_year - 1, self.assessment_year]
    }
}

#[derive(Debug, Clone)]
pub struct PipelineConfig {
    pub model: String,
    pub temperature: f32,
    pub inference_timeout: Duration,
    pub application_id_prefix: String,
    pub offline_id_prefix: String,
    pub ai_confidence: f64,
    /// Fixed date for the prompt and the claim id; `None` means today.
    pub assessment_date: Option<NaiveDate>,
    /// Attach the JSON schema of the expected reply to the inference request.
    pub send_response_schema: bool,
    pub policy: PolicyConfig,
}

impl Default for PipelineConfig {
    fn default() -> Self {
        Self {
            model: DEFAULT_MODEL.to_string(),
            temperature: 0.2,
            inference_timeout: Duration::from_secs(120),
            application_id_prefix: "PMFBY".to_string(),
            offline_id_prefix: "OFFLINE".to_string(),
            ai_confidence: 0.95,
            assessment_date: None,
            send_response_schema: false,
            policy: PolicyConfig::default(),
        }
    }
}

impl PipelineConfig {
    pub fn with_model(mut self, model: impl Into<String>) -> Self {
        self.model = model.into();
        self
    }

    pub fn with_temperature(mut self, temperature: f32) -> Self {
        self.temperature = temperature;
        self
    }

    pub fn with_inference_timeout(mut self, timeout: Duration) -> Self {
        self.inference_timeout = timeout;
        self
    }

    pub fn with_assessment_date(mut self, date: NaiveDate) -> Self {
        self.assessment_date = Some(date);
        self
    }

    pub fn with_policy(mut self, policy: PolicyConfig) -> Self {
        self.policy = policy;
        self
    }

    pub fn with_response_schema(mut self, enabled: bool) -> Self {
        self.send_response_schema = enabled;
        self
    }

    pub fn today(&self) -> NaiveDate {
        self.assessment_date
            .unwrap_or_else(|| Local::now().date_naive())
    }
}

/// Credentials and model for the Gemini backend, read from the environment.
#[derive(Debug, Clone)]
pub struct GeminiConfig {
    pub api_key: String,
    pub model: String,
}

impl GeminiConfig {
    /// Reads `GOOGLE_API_KEY` (falling back to `GEMINI_API_KEY`) and the
    /// optional `GEMINI_MODEL`. Returns `None` when no key is set.
    pub fn from_env() -> Option<Self> {
        let api_key = std::env::var("GOOGLE_API_KEY")
            .or_else(|_| std::env::var("GEMINI_API_KEY"))
            .ok()
            .filter(|k| !k.trim().is_empty())?;
        let model = std::env::var("GEMINI_MODEL").unwrap_or_else(|_| DEFAULT_MODEL.to_string());
        Some(Self { api_key, model })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults() {
        let config = PipelineConfig::default();
        assert_eq!(config.model, "gemini-2.5-flash");
        assert!((config.temperature - 0.2).abs() < f32::EPSILON);
        assert_eq!(config.policy.current_years(), [2024, 2025]);
    }

    #[test]
    fn test_fixed_assessment_date() {
        let date = NaiveDate::from_ymd_opt(2025, 12, 23).unwrap();
        let config = PipelineConfig::default().with_assessment_date(date);
        assert_eq!(config.today(), date);
    }
}
