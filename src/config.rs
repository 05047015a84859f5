use crate::db::{Database, BACKEND_CONFIG_KEY, SETTINGS_KEY};
use crate::errors::{AppError, AppResult};
use crate::models::{AppSettings, BackendConfig, ConfigSource, StoredBackendConfig};
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;

const URL_VARS: [&str; 2] = ["ADINSIGHT_SUPABASE_URL", "SUPABASE_URL"];
const KEY_VARS: [&str; 2] = ["ADINSIGHT_SUPABASE_KEY", "SUPABASE_KEY"];

/// Backend credentials supplied by the process environment. Captured once at
/// startup; nothing in the running application can change or clear them.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct EnvironmentConfig {
    pub url: Option<String>,
    pub key: Option<String>,
}

impl EnvironmentConfig {
    pub fn new(url: impl Into<String>, key: impl Into<String>) -> Self {
        Self {
            url: Some(url.into()),
            key: Some(key.into()),
        }
    }

    pub fn from_process_env() -> Self {
        Self {
            url: first_env(&URL_VARS),
            key: first_env(&KEY_VARS),
        }
    }

    fn resolve(&self) -> Option<BackendConfig> {
        match (self.url.as_deref(), self.key.as_deref()) {
            (Some(url), Some(key)) if !url.trim().is_empty() && !key.trim().is_empty() => Some(BackendConfig {
                url: url.trim().to_string(),
                key: key.trim().to_string(),
                source: ConfigSource::Environment,
            }),
            _ => None,
        }
    }
}

fn first_env(names: &[&str]) -> Option<String> {
    names
        .iter()
        .filter_map(|name| std::env::var(name).ok())
        .find(|value| !value.trim().is_empty())
}

/// Resolves backend credentials and owns the application settings document.
///
/// Every mutation of the local override bumps `generation`, which the
/// storage gateway uses to drop its cached cloud connection.
#[derive(Debug)]
pub struct ConfigStore {
    db: Arc<Database>,
    environment: EnvironmentConfig,
    generation: AtomicU64,
}

impl ConfigStore {
    pub fn new(db: Arc<Database>, environment: EnvironmentConfig) -> Self {
        Self {
            db,
            environment,
            generation: AtomicU64::new(0),
        }
    }

    /// Environment first, then the saved override. An unreadable override is
    /// an error, not a silent switch to local mode.
    pub fn resolve_config(&self) -> AppResult<Option<BackendConfig>> {
        if let Some(config) = self.environment.resolve() {
            return Ok(Some(config));
        }

        let stored = self
            .db
            .get_document::<StoredBackendConfig>(BACKEND_CONFIG_KEY)
            .map_err(|error| {
                tracing::error!(error = %error, "failed to read saved backend config");
                AppError::Internal(format!("saved backend config is unreadable: {}", error))
            })?;
        Ok(stored
            .filter(|stored| !stored.url.is_empty() && !stored.key.is_empty())
            .map(|stored| BackendConfig {
                url: stored.url,
                key: stored.key,
                source: ConfigSource::LocallySaved,
            }))
    }

    pub fn is_cloud_enabled(&self) -> AppResult<bool> {
        Ok(self.resolve_config()?.is_some())
    }

    pub fn is_environment_managed(&self) -> bool {
        self.environment.resolve().is_some()
    }

    pub fn save_local_config(&self, url: &str, key: &str) -> AppResult<()> {
        let url = url.trim();
        let key = key.trim();
        if url.is_empty() || key.is_empty() {
            return Err(AppError::Validation("URL과 API Key를 모두 입력해주세요.".to_string()));
        }

        self.db.put_document(
            BACKEND_CONFIG_KEY,
            &StoredBackendConfig {
                url: url.to_string(),
                key: key.to_string(),
            },
        )?;
        self.generation.fetch_add(1, Ordering::SeqCst);

        if self.is_environment_managed() {
            tracing::warn!("saved backend config is shadowed by environment configuration");
        } else {
            tracing::info!(url = %url, "saved local backend config");
        }
        Ok(())
    }

    /// Removes the local override. Environment-sourced config is untouched.
    pub fn clear_local_config(&self) -> AppResult<()> {
        self.db.remove_document(BACKEND_CONFIG_KEY)?;
        self.generation.fetch_add(1, Ordering::SeqCst);
        tracing::info!("cleared local backend config");
        Ok(())
    }

    pub fn generation(&self) -> u64 {
        self.generation.load(Ordering::SeqCst)
    }

    pub fn get_settings(&self) -> AppResult<AppSettings> {
        Ok(self.db.get_document::<AppSettings>(SETTINGS_KEY)?.unwrap_or_default())
    }

    pub fn update_settings(&self, update: serde_json::Value) -> AppResult<AppSettings> {
        let current = self.get_settings()?;
        let mut merged = serde_json::to_value(current)?;
        merge_json(&mut merged, update);
        let settings: AppSettings =
            serde_json::from_value(merged).map_err(|err| AppError::Validation(err.to_string()))?;
        if !(0.0..=2.0).contains(&settings.temperature) {
            return Err(AppError::Validation("temperature must be between 0 and 2".to_string()));
        }

        self.db.put_document(SETTINGS_KEY, &settings)?;
        self.db.set_quota(settings.local_quota_bytes);
        Ok(settings)
    }
}

fn merge_json(target: &mut serde_json::Value, update: serde_json::Value) {
    match (target, update) {
        (serde_json::Value::Object(target_map), serde_json::Value::Object(update_map)) => {
            for (key, value) in update_map {
                merge_json(target_map.entry(key).or_insert(serde_json::Value::Null), value);
            }
        }
        (target, update) => {
            *target = update;
        }
    }
}
