use crate::error::{ClaimError, Result};
use crate::record::{ClaimRecord, FarmerProfile};
use crate::utils::normalize_mobile;
use async_trait::async_trait;
use chrono::{DateTime, Utc};
use dashmap::DashMap;
use log::debug;
use rand::Rng;
use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use std::sync::Arc;

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub enum ClaimStatus {
    #[default]
    Submitted,
    UnderReview,
    Approved,
    Rejected,
}

/// The document kept in the `claims` collection.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct StoredClaim {
    pub application_id: String,
    pub farmer_mobile: String,
    pub timestamp: DateTime<Utc>,
    #[serde(default)]
    pub status: ClaimStatus,
    pub ai_confidence: f64,
    pub claim_data: ClaimRecord,
}

impl StoredClaim {
    pub fn new(record: ClaimRecord, ai_confidence: f64) -> Self {
        Self {
            application_id: record.application_id.clone(),
            farmer_mobile: normalize_mobile(&record.mobile),
            timestamp: Utc::now(),
            status: ClaimStatus::Submitted,
            ai_confidence,
            claim_data: record,
        }
    }
}

/// Claims are keyed by application id, farmers by normalized mobile. Every
/// write is an upsert.
#[async_trait]
pub trait ClaimStore: Send + Sync {
    async fn upsert_claim(&self, claim: StoredClaim) -> Result<()>;
    async fn get_claim(&self, application_id: &str) -> Result<Option<StoredClaim>>;
    /// Claim history of one farmer, newest first.
    async fn claims_for_mobile(&self, mobile: &str) -> Result<Vec<StoredClaim>>;
    async fn upsert_farmer(&self, profile: FarmerProfile) -> Result<()>;
    async fn find_farmer_by_mobile(&self, mobile: &str) -> Result<Option<FarmerProfile>>;
    async fn find_farmer_by_email(&self, email: &str) -> Result<Option<FarmerProfile>>;
}

fn newest_first(claims: &mut [StoredClaim]) {
    claims.sort_by(|a, b| b.timestamp.cmp(&a.timestamp));
}

fn same_email(profile: &FarmerProfile, email: &str) -> bool {
    profile
        .email
        .as_deref()
        .is_some_and(|e| e.trim().eq_ignore_ascii_case(email.trim()))
}

/// In-memory implementation of ClaimStore
#[derive(Clone, Default)]
pub struct InMemoryStore {
    claims: Arc<DashMap<String, StoredClaim>>,
    farmers: Arc<DashMap<String, FarmerProfile>>,
}

impl InMemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn claim_count(&self) -> usize {
        self.claims.len()
    }
}

#[async_trait]
impl ClaimStore for InMemoryStore {
    async fn upsert_claim(&self, claim: StoredClaim) -> Result<()> {
        self.claims.insert(claim.application_id.clone(), claim);
        Ok(())
    }

    async fn get_claim(&self, application_id: &str) -> Result<Option<StoredClaim>> {
        Ok(self.claims.get(application_id).map(|entry| entry.clone()))
    }

    async fn claims_for_mobile(&self, mobile: &str) -> Result<Vec<StoredClaim>> {
        let key = normalize_mobile(mobile);
        let mut claims: Vec<StoredClaim> = self
            .claims
            .iter()
            .filter(|entry| entry.farmer_mobile == key)
            .map(|entry| entry.clone())
            .collect();
        newest_first(&mut claims);
        Ok(claims)
    }

    async fn upsert_farmer(&self, profile: FarmerProfile) -> Result<()> {
        self.farmers.insert(profile.key(), profile);
        Ok(())
    }

    async fn find_farmer_by_mobile(&self, mobile: &str) -> Result<Option<FarmerProfile>> {
        Ok(self
            .farmers
            .get(&normalize_mobile(mobile))
            .map(|entry| entry.clone()))
    }

    async fn find_farmer_by_email(&self, email: &str) -> Result<Option<FarmerProfile>> {
        Ok(self
            .farmers
            .iter()
            .find(|entry| same_email(entry.value(), email))
            .map(|entry| entry.clone()))
    }
}

/// One JSON document per key under `claims/` and `farmers/`.
#[derive(Debug, Clone)]
pub struct JsonFileStore {
    root: PathBuf,
}

impl JsonFileStore {
    pub async fn open(root: impl Into<PathBuf>) -> Result<Self> {
        let root = root.into();
        tokio::fs::create_dir_all(root.join("claims")).await?;
        tokio::fs::create_dir_all(root.join("farmers")).await?;
        debug!("Opened claim store at {}", root.display());
        Ok(Self { root })
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    fn document_path(&self, collection: &str, key: &str) -> Result<PathBuf> {
        let valid = !key.is_empty()
            && key
                .chars()
                .all(|c| c.is_ascii_alphanumeric() || c == '-' || c == '_');
        if !valid {
            return Err(ClaimError::InvalidInput(format!(
                "'{}' is not a valid {} key",
                key, collection
            )));
        }
        Ok(self.root.join(collection).join(format!("{}.json", key)))
    }

    /// Writes next to the target and renames over it, so readers never see a
    /// partial document.
    async fn write_document<T: Serialize>(&self, path: &Path, value: &T) -> Result<()> {
        let json = serde_json::to_vec_pretty(value)?;
        let suffix: u32 = rand::thread_rng().gen();
        let tmp = path.with_extension(format!("json.{:08x}.tmp", suffix));

        tokio::fs::write(&tmp, &json).await?;
        if let Err(e) = tokio::fs::rename(&tmp, path).await {
            let _ = tokio::fs::remove_file(&tmp).await;
            return Err(e.into());
        }
        Ok(())
    }

    async fn read_document<T: DeserializeOwned>(&self, path: &Path) -> Result<Option<T>> {
        match tokio::fs::read(path).await {
            Ok(bytes) => Ok(Some(serde_json::from_slice(&bytes)?)),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(None),
            Err(e) => Err(e.into()),
        }
    }

    async fn read_collection<T: DeserializeOwned>(&self, collection: &str) -> Result<Vec<T>> {
        let mut documents = Vec::new();
        let mut entries = tokio::fs::read_dir(self.root.join(collection)).await?;
        while let Some(entry) = entries.next_entry().await? {
            let path = entry.path();
            if path.extension().and_then(|e| e.to_str()) != Some("json") {
                continue;
            }
            if let Some(document) = self.read_document(&path).await? {
                documents.push(document);
            }
        }
        Ok(documents)
    }
}

#[async_trait]
impl ClaimStore for JsonFileStore {
    async fn upsert_claim(&self, claim: StoredClaim) -> Result<()> {
        let path = self.document_path("claims", &claim.application_id)?;
        self.write_document(&path, &claim).await
    }

    async fn get_claim(&self, application_id: &str) -> Result<Option<StoredClaim>> {
        let path = self.document_path("claims", application_id)?;
        self.read_document(&path).await
    }

    async fn claims_for_mobile(&self, mobile: &str) -> Result<Vec<StoredClaim>> {
        let key = normalize_mobile(mobile);
        let mut claims: Vec<StoredClaim> = self
            .read_collection::<StoredClaim>("claims")
            .await?
            .into_iter()
            .filter(|claim| claim.farmer_mobile == key)
            .collect();
        newest_first(&mut claims);
        Ok(claims)
    }

    async fn upsert_farmer(&self, profile: FarmerProfile) -> Result<()> {
        let path = self.document_path("farmers", &profile.key())?;
        self.write_document(&path, &profile).await
    }

    async fn find_farmer_by_mobile(&self, mobile: &str) -> Result<Option<FarmerProfile>> {
        let path = self.document_path("farmers", &normalize_mobile(mobile))?;
        self.read_document(&path).await
    }

    async fn find_farmer_by_email(&self, email: &str) -> Result<Option<FarmerProfile>> {
        Ok(self
            .read_collection::<FarmerProfile>("farmers")
            .await?
            .into_iter()
            .find(|profile| same_email(profile, email)))
    }
}
