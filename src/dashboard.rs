use crate::analysis::gemini::{GeminiModel, DEFAULT_GEMINI_BASE_URL};
use crate::analysis::{AnalysisClient, GenerativeModel};
use crate::auth::{CredentialVerifier, SharedSecretVerifier};
use crate::config::{ConfigStore, EnvironmentConfig};
use crate::credentials::{ApiKeySource, KeyringApiKeySource};
use crate::db::Database;
use crate::demo::{sample_dashboard_for_today, SAMPLE_INPUT};
use crate::errors::{AppError, AppResult};
use crate::models::{
    AppSettings, BackendStatus, BooleanResponse, DashboardData, ListReportsFilters, SaveBackendConfigPayload,
    SaveReportPayload, SavedReport, SessionSnapshot,
};
use crate::redaction::mask_secret;
use crate::session::SessionController;
use crate::storage::cloud::{dashboard_link, SETUP_SQL};
use crate::storage::StorageGateway;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use tokio::sync::Mutex;
use tokio::time::Duration;

/// Collaborators the core is built from. Swapped out in tests.
pub struct CoreOptions {
    pub environment: EnvironmentConfig,
    pub model: Arc<dyn GenerativeModel>,
    pub credentials: Arc<dyn ApiKeySource>,
    pub verifier: Arc<dyn CredentialVerifier>,
}

impl CoreOptions {
    pub fn from_process_env() -> AppResult<Self> {
        let base_url =
            std::env::var("ADINSIGHT_GEMINI_BASE_URL").unwrap_or_else(|_| DEFAULT_GEMINI_BASE_URL.to_string());
        Ok(Self {
            environment: EnvironmentConfig::from_process_env(),
            model: Arc::new(GeminiModel::new(base_url)?),
            credentials: Arc::new(KeyringApiKeySource::from_process_env()),
            verifier: Arc::new(SharedSecretVerifier::default()),
        })
    }
}

#[derive(Clone)]
pub struct DashboardCore {
    config: Arc<ConfigStore>,
    storage: Arc<StorageGateway>,
    analysis: AnalysisClient,
    session: Arc<Mutex<SessionController>>,
    app_data_dir: PathBuf,
}

impl DashboardCore {
    pub fn new(app_data_dir: PathBuf, options: CoreOptions) -> AppResult<Arc<Self>> {
        let db_path = app_data_dir.join("state.sqlite");
        let db = Arc::new(Database::new(&db_path, AppSettings::default().local_quota_bytes)?);
        let config = Arc::new(ConfigStore::new(db.clone(), options.environment));

        match config.get_settings() {
            Ok(settings) => db.set_quota(settings.local_quota_bytes),
            Err(error) => tracing::warn!(error = %error, "failed to read settings, using defaults"),
        }

        let storage = Arc::new(StorageGateway::new(config.clone(), db));
        match storage.backend() {
            Ok(backend) => tracing::info!(data_dir = %app_data_dir.display(), backend = ?backend, "dashboard core initialized"),
            Err(error) => tracing::warn!(error = %error, "dashboard core initialized with unreadable backend config"),
        }

        Ok(Arc::new(Self {
            config,
            storage,
            analysis: AnalysisClient::new(options.model, options.credentials),
            session: Arc::new(Mutex::new(SessionController::new(options.verifier))),
            app_data_dir,
        }))
    }

    pub fn app_data_dir(&self) -> &Path {
        &self.app_data_dir
    }

    pub async fn session(&self) -> SessionSnapshot {
        self.session.lock().await.snapshot()
    }

    /// Runs one analysis to completion. Once the run has started every
    /// failure ends in the `Error` state and is reported through the
    /// snapshot; only a refused start is returned as `Err`.
    pub async fn analyze(&self, raw_text: &str) -> AppResult<SessionSnapshot> {
        let ticket = self.session.lock().await.submit(raw_text)?;

        let result = match self.config.get_settings() {
            Ok(settings) => self.analysis.analyze(raw_text, &settings).await,
            Err(error) => Err(error),
        };

        let mut session = self.session.lock().await;
        match result {
            Ok(data) => {
                session.complete(ticket, data);
            }
            Err(error) => {
                tracing::warn!(error = %error, "analysis failed");
                session.fail(ticket, &error);
            }
        }
        Ok(session.snapshot())
    }

    /// Offline demo: `Analyzing` right away, sample data after the
    /// configured delay.
    pub async fn run_demo(&self) -> AppResult<SessionSnapshot> {
        let ticket = self.session.lock().await.begin_demo()?;
        let delay = self.config.get_settings().map(|s| s.demo_delay_ms).unwrap_or(1500);

        tokio::time::sleep(Duration::from_millis(delay)).await;

        let mut session = self.session.lock().await;
        session.complete(ticket, sample_dashboard_for_today());
        Ok(session.snapshot())
    }

    pub async fn retry(&self) -> AppResult<SessionSnapshot> {
        let mut session = self.session.lock().await;
        session.retry()?;
        Ok(session.snapshot())
    }

    pub async fn reset(&self) -> AppResult<SessionSnapshot> {
        let mut session = self.session.lock().await;
        session.reset()?;
        Ok(session.snapshot())
    }

    pub async fn show_analysis(&self) -> SessionSnapshot {
        let mut session = self.session.lock().await;
        session.show_analysis();
        session.snapshot()
    }

    pub async fn open_admin(&self) -> SessionSnapshot {
        let mut session = self.session.lock().await;
        session.open_admin();
        session.snapshot()
    }

    pub async fn login(&self, password: &str) -> SessionSnapshot {
        let mut session = self.session.lock().await;
        session.login(password);
        session.snapshot()
    }

    pub async fn cancel_login(&self) -> SessionSnapshot {
        let mut session = self.session.lock().await;
        session.cancel_login();
        session.snapshot()
    }

    pub async fn logout(&self) -> SessionSnapshot {
        let mut session = self.session.lock().await;
        session.logout();
        session.snapshot()
    }

    pub async fn load_report(&self, data: DashboardData) -> AppResult<SessionSnapshot> {
        let mut session = self.session.lock().await;
        session.load_report(data)?;
        Ok(session.snapshot())
    }

    async fn require_admin(&self) -> AppResult<()> {
        self.session.lock().await.require_admin()
    }

    pub async fn list_reports(&self, filters: ListReportsFilters) -> AppResult<Vec<SavedReport>> {
        self.require_admin().await?;
        let reports = self.storage.list_reports().await?;
        Ok(filter_reports(reports, filters.search.as_deref()))
    }

    pub async fn save_report(&self, payload: SaveReportPayload) -> AppResult<SavedReport> {
        let data = {
            let session = self.session.lock().await;
            session.require_admin()?;
            payload.data.or_else(|| session.data().cloned())
        };
        let data = data.ok_or_else(|| AppError::Validation("저장할 데이터가 없습니다.".to_string()))?;
        let title = payload.title.unwrap_or_default();
        self.storage.save_report(&title, &data).await
    }

    pub async fn delete_report(&self, report_id: &str) -> AppResult<BooleanResponse> {
        self.require_admin().await?;
        self.storage.delete_report(report_id).await?;
        Ok(BooleanResponse { success: true })
    }

    pub fn backend_status(&self) -> AppResult<BackendStatus> {
        let resolved = self.config.resolve_config()?;
        Ok(BackendStatus {
            cloud_enabled: resolved.is_some(),
            source: resolved.as_ref().map(|config| config.source),
            url: resolved.as_ref().map(|config| config.url.clone()),
            masked_key: resolved.as_ref().map(|config| mask_secret(&config.key)),
            dashboard_link: resolved.as_ref().and_then(|config| dashboard_link(&config.url)),
            setup_sql: SETUP_SQL.to_string(),
        })
    }

    pub async fn save_backend_config(&self, payload: SaveBackendConfigPayload) -> AppResult<BackendStatus> {
        self.require_admin().await?;
        self.config.save_local_config(&payload.url, &payload.key)?;
        self.storage.invalidate();
        self.backend_status()
    }

    pub async fn clear_backend_config(&self) -> AppResult<BackendStatus> {
        self.require_admin().await?;
        self.config.clear_local_config()?;
        self.storage.invalidate();
        if self.config.is_environment_managed() {
            tracing::warn!("environment backend config remains active after clearing local override");
        }
        self.backend_status()
    }

    pub fn get_settings(&self) -> AppResult<AppSettings> {
        self.config.get_settings()
    }

    pub fn update_settings(&self, update: serde_json::Value) -> AppResult<AppSettings> {
        self.config.update_settings(update)
    }

    pub async fn save_provider_token(&self, token: String) -> AppResult<BooleanResponse> {
        self.analysis.credentials().save_api_key(token).await?;
        Ok(BooleanResponse { success: true })
    }

    pub async fn clear_provider_token(&self) -> AppResult<BooleanResponse> {
        self.analysis.credentials().clear_api_key().await?;
        Ok(BooleanResponse { success: true })
    }

    pub async fn has_provider_token(&self) -> AppResult<BooleanResponse> {
        let present = self.analysis.credentials().api_key().await?.is_some();
        Ok(BooleanResponse { success: present })
    }

    pub fn sample_input(&self) -> &'static str {
        SAMPLE_INPUT
    }
}

/// Case-insensitive title match; no term keeps everything.
pub fn filter_reports(reports: Vec<SavedReport>, search: Option<&str>) -> Vec<SavedReport> {
    let Some(term) = search.map(str::trim).filter(|term| !term.is_empty()) else {
        return reports;
    };
    let term = term.to_lowercase();
    reports
        .into_iter()
        .filter(|report| report.title.to_lowercase().contains(&term))
        .collect()
}
