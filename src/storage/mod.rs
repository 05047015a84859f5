pub mod cloud;
pub mod local;

use crate::config::ConfigStore;
use crate::db::Database;
use crate::errors::{AppError, AppResult};
use crate::models::{BackendConfig, DashboardData, SavedReport};
use async_trait::async_trait;
use chrono::{Local, NaiveDate, SecondsFormat, Utc};
use cloud::CloudReportStore;
use local::LocalReportStore;
use rand::{Rng, TryRngCore};
use serde::{Deserialize, Serialize};
use std::collections::HashSet;
use std::sync::{Arc, Mutex};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum StorageBackend {
    Local,
    Cloud,
}

/// One place reports live. Exactly one implementation answers each gateway
/// call; implementations never consult each other.
#[async_trait]
pub trait ReportRepository: Send + Sync {
    fn backend(&self) -> StorageBackend;
    /// Newest first.
    async fn list(&self) -> AppResult<Vec<SavedReport>>;
    async fn insert(&self, report: &SavedReport) -> AppResult<()>;
    /// Deleting an unknown id is not an error.
    async fn delete(&self, id: &str) -> AppResult<()>;
}

pub fn default_report_title(date: NaiveDate) -> String {
    format!("광고 성과 분석 - {}", date.format("%Y-%m-%d"))
}

/// Random v4 UUID from the OS generator. When the OS source is unavailable
/// the bytes come from the current time plus thread-local randomness, still
/// shaped as a UUID so the cloud table's `uuid` key accepts it.
pub fn generate_report_id() -> String {
    let mut bytes = [0u8; 16];
    match rand::rngs::OsRng.try_fill_bytes(&mut bytes) {
        Ok(()) => uuid::Builder::from_random_bytes(bytes).into_uuid().to_string(),
        Err(error) => {
            tracing::warn!(error = %error, "secure random unavailable, using fallback report id");
            let millis = u64::try_from(Utc::now().timestamp_millis()).unwrap_or_default();
            fallback_report_id(millis, rand::rng().random())
        }
    }
}

fn fallback_report_id(millis: u64, entropy: u64) -> String {
    let mut bytes = [0u8; 16];
    bytes[..8].copy_from_slice(&millis.to_be_bytes());
    bytes[8..].copy_from_slice(&entropy.to_be_bytes());
    uuid::Builder::from_random_bytes(bytes).into_uuid().to_string()
}

struct CachedCloud {
    generation: u64,
    config: BackendConfig,
    store: Arc<CloudReportStore>,
}

/// Clears an in-flight marker when the guarded operation ends, however it ends.
struct InFlightGuard<'a> {
    set: &'a Mutex<HashSet<String>>,
    key: String,
}

impl<'a> InFlightGuard<'a> {
    fn acquire(set: &'a Mutex<HashSet<String>>, key: &str, busy_message: &str) -> AppResult<Self> {
        let mut in_flight = set
            .lock()
            .map_err(|_| AppError::Internal("in-flight tracking mutex poisoned".to_string()))?;
        if !in_flight.insert(key.to_string()) {
            return Err(AppError::Validation(busy_message.to_string()));
        }
        Ok(Self {
            set,
            key: key.to_string(),
        })
    }
}

impl Drop for InFlightGuard<'_> {
    fn drop(&mut self) {
        if let Ok(mut set) = self.set.lock() {
            set.remove(&self.key);
        }
    }
}

/// Report persistence with backend selection per call: cloud when the
/// config store resolves credentials, local otherwise. A cloud failure is
/// surfaced, never papered over with local data.
pub struct StorageGateway {
    config: Arc<ConfigStore>,
    local: Arc<LocalReportStore>,
    cloud: Mutex<Option<CachedCloud>>,
    saving: Mutex<HashSet<String>>,
    deleting: Mutex<HashSet<String>>,
}

impl StorageGateway {
    pub fn new(config: Arc<ConfigStore>, db: Arc<Database>) -> Self {
        Self {
            config,
            local: Arc::new(LocalReportStore::new(db)),
            cloud: Mutex::new(None),
            saving: Mutex::new(HashSet::new()),
            deleting: Mutex::new(HashSet::new()),
        }
    }

    pub fn config(&self) -> &Arc<ConfigStore> {
        &self.config
    }

    pub fn backend(&self) -> AppResult<StorageBackend> {
        Ok(if self.config.is_cloud_enabled()? {
            StorageBackend::Cloud
        } else {
            StorageBackend::Local
        })
    }

    /// Drops the cached cloud connection; the next cloud call reconnects.
    pub fn invalidate(&self) {
        if let Ok(mut cached) = self.cloud.lock() {
            *cached = None;
        }
    }

    /// `connect_error` categorizes a failure to build the cloud client for
    /// the calling operation. Config read failures pass through unchanged.
    fn repository(&self, connect_error: fn(String) -> AppError) -> AppResult<Arc<dyn ReportRepository>> {
        let Some(config) = self.config.resolve_config()? else {
            return Ok(self.local.clone());
        };

        let generation = self.config.generation();
        let mut cached = self
            .cloud
            .lock()
            .map_err(|_| AppError::Internal("cloud connection mutex poisoned".to_string()))?;
        if let Some(entry) = cached.as_ref() {
            if entry.generation == generation && entry.config == config {
                return Ok(entry.store.clone());
            }
        }

        let store = Arc::new(CloudReportStore::new(&config).map_err(|error| connect_error(error.to_string()))?);
        tracing::info!(source = ?config.source, "connected cloud report store");
        *cached = Some(CachedCloud {
            generation,
            config,
            store: store.clone(),
        });
        Ok(store)
    }

    pub async fn list_reports(&self) -> AppResult<Vec<SavedReport>> {
        let repository = self.repository(AppError::CloudUnavailable)?;
        repository.list().await
    }

    pub async fn save_report(&self, title: &str, data: &DashboardData) -> AppResult<SavedReport> {
        if data.is_empty() {
            return Err(AppError::Validation("저장할 데이터가 없습니다.".to_string()));
        }
        let _guard = InFlightGuard::acquire(&self.saving, "save", "이미 저장 중인 리포트가 있습니다.")?;

        let title = title.trim();
        let report = SavedReport {
            id: generate_report_id(),
            title: if title.is_empty() {
                default_report_title(Local::now().date_naive())
            } else {
                title.to_string()
            },
            date: Utc::now().to_rfc3339_opts(SecondsFormat::Millis, true),
            data: data.clone(),
        };

        let repository = self.repository(AppError::CloudWrite)?;
        repository.insert(&report).await?;
        Ok(report)
    }

    /// A second delete of an id whose delete is still running is refused
    /// rather than reported as done before the first one settles.
    pub async fn delete_report(&self, id: &str) -> AppResult<()> {
        let _guard = InFlightGuard::acquire(&self.deleting, id, "이미 삭제 중인 리포트입니다.")?;
        let repository = self.repository(AppError::CloudDelete)?;
        repository.delete(id).await
    }
}
