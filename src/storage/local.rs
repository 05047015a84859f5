use super::{ReportRepository, StorageBackend};
use crate::db::{Database, REPORTS_KEY};
use crate::errors::{AppError, AppResult};
use crate::models::SavedReport;
use async_trait::async_trait;
use std::sync::Arc;

/// Report list kept as one document in local state, newest first.
#[derive(Debug, Clone)]
pub struct LocalReportStore {
    db: Arc<Database>,
}

impl LocalReportStore {
    pub fn new(db: Arc<Database>) -> Self {
        Self { db }
    }

    fn read_all(&self) -> AppResult<Vec<SavedReport>> {
        Ok(self.db.get_document::<Vec<SavedReport>>(REPORTS_KEY)?.unwrap_or_default())
    }

    /// Current list for a rewrite. An unreadable list is left in place
    /// instead of being replaced by a shorter one.
    fn read_for_update(&self, into_error: fn(String) -> AppError) -> AppResult<Vec<SavedReport>> {
        self.read_all().map_err(|error| {
            tracing::error!(error = %error, "refusing to overwrite unreadable local reports");
            into_error(format!("saved report list is unreadable: {}", error))
        })
    }
}

#[async_trait]
impl ReportRepository for LocalReportStore {
    fn backend(&self) -> StorageBackend {
        StorageBackend::Local
    }

    async fn list(&self) -> AppResult<Vec<SavedReport>> {
        match self.read_all() {
            Ok(reports) => Ok(reports),
            Err(error) => {
                tracing::error!(error = %error, "failed to parse locally saved reports");
                Ok(Vec::new())
            }
        }
    }

    async fn insert(&self, report: &SavedReport) -> AppResult<()> {
        let mut reports = self.read_for_update(AppError::LocalWrite)?;
        reports.insert(0, report.clone());
        self.db.put_document(REPORTS_KEY, &reports)?;
        tracing::info!(report_id = %report.id, backend = "local", "saved report");
        Ok(())
    }

    async fn delete(&self, id: &str) -> AppResult<()> {
        let reports = self.read_for_update(AppError::LocalDelete)?;
        let before = reports.len();
        let remaining: Vec<SavedReport> = reports.into_iter().filter(|report| report.id != id).collect();
        if remaining.len() == before {
            return Ok(());
        }

        self.db.put_document(REPORTS_KEY, &remaining).map_err(|error| match error {
            AppError::LocalWrite(message) => AppError::LocalDelete(message),
            other => other,
        })?;
        tracing::info!(report_id = %id, backend = "local", "deleted report");
        Ok(())
    }
}
