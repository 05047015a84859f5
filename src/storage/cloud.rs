use super::{ReportRepository, StorageBackend};
use crate::errors::{AppError, AppResult};
use crate::models::{BackendConfig, SavedReport};
use crate::redaction::Redactor;
use async_trait::async_trait;
use once_cell::sync::Lazy;
use regex::Regex;
use reqwest::header::{HeaderMap, HeaderValue, AUTHORIZATION};
use serde::Deserialize;
use serde_json::json;
use std::time::Duration;

const CLOUD_TIMEOUT_SECS: u64 = 30;
const REPORTS_TABLE: &str = "reports";

static PROJECT_REF_RE: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"^https://([^./]+)\.supabase\.co").expect("valid project ref regex"));

/// Table the cloud backend expects. Shown to users setting up a project.
pub const SETUP_SQL: &str = "create table reports (
  id uuid primary key default gen_random_uuid(),
  title text not null,
  date text not null,
  data jsonb not null,
  created_at timestamp with time zone default timezone('utc'::text, now())
);";

/// Table editor link for hosted Supabase project URLs.
pub fn dashboard_link(url: &str) -> Option<String> {
    PROJECT_REF_RE
        .captures(url.trim())
        .and_then(|caps| caps.get(1))
        .map(|project| format!("https://supabase.com/dashboard/project/{}/editor", project.as_str()))
}

#[derive(Debug, Deserialize)]
struct PostgrestError {
    message: String,
}

/// `reports` table behind a PostgREST endpoint (Supabase).
#[derive(Debug)]
pub struct CloudReportStore {
    client: reqwest::Client,
    table_url: String,
    redactor: Redactor,
}

impl CloudReportStore {
    pub fn new(config: &BackendConfig) -> AppResult<Self> {
        let mut headers = HeaderMap::new();
        headers.insert(
            "apikey",
            HeaderValue::from_str(&config.key)
                .map_err(|error| AppError::Configuration(format!("invalid backend key: {}", error)))?,
        );
        headers.insert(
            AUTHORIZATION,
            HeaderValue::from_str(&format!("Bearer {}", config.key))
                .map_err(|error| AppError::Configuration(format!("invalid backend key: {}", error)))?,
        );

        let client = reqwest::Client::builder()
            .timeout(Duration::from_secs(CLOUD_TIMEOUT_SECS))
            .default_headers(headers)
            .build()
            .map_err(|error| AppError::Configuration(format!("failed to build HTTP client: {}", error)))?;

        tracing::debug!(url = %config.url, "cloud report store initialized");
        Ok(Self {
            client,
            table_url: format!("{}/rest/v1/{}", config.url.trim_end_matches('/'), REPORTS_TABLE),
            redactor: Redactor::new().with_secret(&config.key),
        })
    }

    async fn failure_message(&self, response: reqwest::Response) -> String {
        let status = response.status();
        let text = response.text().await.unwrap_or_default();
        let message = serde_json::from_str::<PostgrestError>(&text)
            .map(|body| body.message)
            .unwrap_or_else(|_| format!("{} {}", status.as_u16(), text.trim()));
        self.redactor.redact(&message)
    }

    fn transport_message(&self, error: reqwest::Error) -> String {
        self.redactor.redact(&error.to_string())
    }
}

#[async_trait]
impl ReportRepository for CloudReportStore {
    fn backend(&self) -> StorageBackend {
        StorageBackend::Cloud
    }

    async fn list(&self) -> AppResult<Vec<SavedReport>> {
        let response = self
            .client
            .get(&self.table_url)
            .query(&[("select", "*"), ("order", "created_at.desc")])
            .send()
            .await
            .map_err(|error| AppError::CloudUnavailable(self.transport_message(error)))?;

        if !response.status().is_success() {
            let message = self.failure_message(response).await;
            tracing::error!(error = %message, backend = "cloud", "report fetch failed");
            return Err(AppError::CloudUnavailable(message));
        }

        response
            .json::<Vec<SavedReport>>()
            .await
            .map_err(|error| AppError::CloudUnavailable(self.transport_message(error)))
    }

    async fn insert(&self, report: &SavedReport) -> AppResult<()> {
        let row = json!([{
            "id": report.id,
            "title": report.title,
            "date": report.date,
            "data": report.data,
        }]);
        let response = self
            .client
            .post(&self.table_url)
            .header("Prefer", "return=minimal")
            .json(&row)
            .send()
            .await
            .map_err(|error| AppError::CloudWrite(self.transport_message(error)))?;

        if !response.status().is_success() {
            let message = self.failure_message(response).await;
            tracing::error!(error = %message, report_id = %report.id, backend = "cloud", "report save failed");
            return Err(AppError::CloudWrite(message));
        }
        tracing::info!(report_id = %report.id, backend = "cloud", "saved report");
        Ok(())
    }

    async fn delete(&self, id: &str) -> AppResult<()> {
        let filter = format!("eq.{}", id);
        let response = self
            .client
            .delete(&self.table_url)
            .query(&[("id", filter.as_str())])
            .send()
            .await
            .map_err(|error| AppError::CloudDelete(self.transport_message(error)))?;

        if !response.status().is_success() {
            let message = self.failure_message(response).await;
            tracing::error!(error = %message, report_id = %id, backend = "cloud", "report delete failed");
            return Err(AppError::CloudDelete(message));
        }
        tracing::info!(report_id = %id, backend = "cloud", "deleted report");
        Ok(())
    }
}
