use crate::config::PipelineConfig;
use crate::error::{ClaimError, Result};
use crate::record::{ClaimRecord, FarmerProfile};
use crate::store::{ClaimStore, StoredClaim};
use chrono::Datelike;
use log::{info, warn};
use rand::{thread_rng, Rng};
use std::sync::Arc;

fn random_suffix() -> String {
    let value: u32 = thread_rng().gen_range(0..0x100_0000);
    format!("{:06X}", value)
}

/// Persists claims and hands out application ids.
#[derive(Clone)]
pub struct ClaimRepository {
    store: Arc<dyn ClaimStore>,
    config: PipelineConfig,
}

impl ClaimRepository {
    pub fn new(store: Arc<dyn ClaimStore>, config: PipelineConfig) -> Self {
        Self { store, config }
    }

    pub fn store(&self) -> &Arc<dyn ClaimStore> {
        &self.store
    }

    fn online_id(&self) -> String {
        format!(
            "{}-{}-{}",
            self.config.application_id_prefix,
            self.config.today().year(),
            random_suffix()
        )
    }

    fn offline_id(&self) -> String {
        format!("{}-{}", self.config.offline_id_prefix, random_suffix())
    }

    /// Assigns an application id and writes the claim in the same step.
    ///
    /// Never fails: when the store is unreachable the record gets an
    /// `OFFLINE-` id and nothing is persisted.
    pub async fn save(&self, record: &mut ClaimRecord, ai_confidence: f64) -> String {
        let application_id = self.online_id();
        record.application_id = application_id.clone();

        let stored = StoredClaim::new(record.clone(), ai_confidence);
        match self.store.upsert_claim(stored).await {
            Ok(()) => {
                info!("Claim {} saved", application_id);
                application_id
            }
            Err(e) => {
                let offline = self.offline_id();
                warn!(
                    "Claim store unavailable ({}); continuing with offline id {}",
                    e, offline
                );
                record.application_id = offline.clone();
                offline
            }
        }
    }

    /// Rewrites an already saved claim, keeping its timestamp and status.
    pub async fn correct(&self, record: &ClaimRecord) -> Result<()> {
        if record.application_id.trim().is_empty() {
            return Err(ClaimError::InvalidInput(
                "cannot correct a claim without an application id".to_string(),
            ));
        }

        let existing = self
            .store
            .get_claim(&record.application_id)
            .await
            .map_err(|e| ClaimError::PersistenceUnavailable(e.to_string()))?;

        let stored = match existing {
            Some(mut claim) => {
                claim.claim_data = record.clone();
                claim
            }
            None => StoredClaim::new(record.clone(), self.config.ai_confidence),
        };

        self.store
            .upsert_claim(stored)
            .await
            .map_err(|e| ClaimError::PersistenceUnavailable(e.to_string()))?;
        info!("Claim {} corrected", record.application_id);
        Ok(())
    }

    /// Profile lookup that treats a store failure as "not registered".
    pub async fn farmer_profile(&self, mobile: &str) -> Option<FarmerProfile> {
        match self.store.find_farmer_by_mobile(mobile).await {
            Ok(profile) => profile,
            Err(e) => {
                warn!("Farmer lookup failed, continuing without profile: {}", e);
                None
            }
        }
    }

    pub async fn history(&self, mobile: &str) -> Result<Vec<StoredClaim>> {
        self.store.claims_for_mobile(mobile).await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::store::InMemoryStore;
    use async_trait::async_trait;
    use chrono::NaiveDate;

    struct DownStore;

    #[async_trait]
    impl ClaimStore for DownStore {
        async fn upsert_claim(&self, _claim: StoredClaim) -> Result<()> {
            Err(ClaimError::PersistenceUnavailable("connection refused".to_string()))
        }
        async fn get_claim(&self, _id: &str) -> Result<Option<StoredClaim>> {
            Err(ClaimError::PersistenceUnavailable("connection refused".to_string()))
        }
        async fn claims_for_mobile(&self, _mobile: &str) -> Result<Vec<StoredClaim>> {
            Err(ClaimError::PersistenceUnavailable("connection refused".to_string()))
        }
        async fn upsert_farmer(&self, _profile: FarmerProfile) -> Result<()> {
            Err(ClaimError::PersistenceUnavailable("connection refused".to_string()))
        }
        async fn find_farmer_by_mobile(&self, _mobile: &str) -> Result<Option<FarmerProfile>> {
            Err(ClaimError::PersistenceUnavailable("connection refused".to_string()))
        }
        async fn find_farmer_by_email(&self, _email: &str) -> Result<Option<FarmerProfile>> {
            Err(ClaimError::PersistenceUnavailable("connection refused".to_string()))
        }
    }

    fn config() -> PipelineConfig {
        PipelineConfig::default().with_assessment_date(NaiveDate::from_ymd_opt(2025, 7, 14).unwrap())
    }

    fn is_upper_hex(s: &str) -> bool {
        s.len() == 6 && s.chars().all(|c| c.is_ascii_digit() || ('A'..='F').contains(&c))
    }

    #[tokio::test]
    async fn test_save_assigns_id_with_first_write() {
        let store = Arc::new(InMemoryStore::new());
        let repo = ClaimRepository::new(store.clone(), config());
        let mut record = ClaimRecord {
            mobile: "9922001122".to_string(),
            ..Default::default()
        };

        let id = repo.save(&mut record, 0.95).await;
        assert!(id.starts_with("PMFBY-2025-"));
        assert!(is_upper_hex(&id["PMFBY-2025-".len()..]));
        assert_eq!(record.application_id, id);

        let stored = store.get_claim(&id).await.unwrap().unwrap();
        assert_eq!(stored.claim_data.application_id, id);
        assert_eq!(stored.farmer_mobile, "9922001122");
    }

    #[tokio::test]
    async fn test_save_falls_back_to_offline_id() {
        let repo = ClaimRepository::new(Arc::new(DownStore), config());
        let mut record = ClaimRecord::default();

        let id = repo.save(&mut record, 0.95).await;
        assert!(id.starts_with("OFFLINE-"));
        assert!(is_upper_hex(&id["OFFLINE-".len()..]));
        assert_eq!(record.application_id, id);
    }

    #[tokio::test]
    async fn test_correct_keeps_single_record() {
        let store = Arc::new(InMemoryStore::new());
        let repo = ClaimRepository::new(store.clone(), config());
        let mut record = ClaimRecord {
            estimated_payout: "₹12,000".to_string(),
            ..Default::default()
        };
        let id = repo.save(&mut record, 0.95).await;
        let first = store.get_claim(&id).await.unwrap().unwrap();

        record.estimated_payout = "₹30,000".to_string();
        repo.correct(&record).await.unwrap();

        assert_eq!(store.claim_count(), 1);
        let stored = store.get_claim(&id).await.unwrap().unwrap();
        assert_eq!(stored.claim_data.estimated_payout, "₹30,000");
        assert_eq!(stored.timestamp, first.timestamp);
    }

    #[tokio::test]
    async fn test_correct_requires_id_and_store() {
        let repo = ClaimRepository::new(Arc::new(DownStore), config());
        let err = repo.correct(&ClaimRecord::default()).await.unwrap_err();
        assert!(matches!(err, ClaimError::InvalidInput(_)));

        let record = ClaimRecord {
            application_id: "PMFBY-2025-ABC123".to_string(),
            ..Default::default()
        };
        let err = repo.correct(&record).await.unwrap_err();
        assert!(matches!(err, ClaimError::PersistenceUnavailable(_)));
    }

    #[tokio::test]
    async fn test_farmer_profile_tolerates_outage() {
        let repo = ClaimRepository::new(Arc::new(DownStore), config());
        assert!(repo.farmer_profile("9922001122").await.is_none());
    }
}
