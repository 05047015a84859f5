use crate::auth::CredentialVerifier;
use crate::errors::{AppError, AppResult};
use crate::models::{AnalysisStatus, AppView, DashboardData, SessionSnapshot};
use std::sync::Arc;

const LOGIN_FAILED_MESSAGE: &str = "비밀번호가 올바르지 않습니다.";

/// Identifies one analysis run. Results carrying a stale ticket are dropped,
/// e.g. when the user logged out while the request was still pending.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct AnalysisTicket(u64);

/// Top-level screen state: analysis lifecycle, admin flag and current view.
pub struct SessionController {
    verifier: Arc<dyn CredentialVerifier>,
    status: AnalysisStatus,
    view: AppView,
    is_admin: bool,
    data: Option<DashboardData>,
    error_message: Option<String>,
    login_error: Option<String>,
    epoch: u64,
}

impl SessionController {
    pub fn new(verifier: Arc<dyn CredentialVerifier>) -> Self {
        Self {
            verifier,
            status: AnalysisStatus::Idle,
            view: AppView::Analysis,
            is_admin: false,
            data: None,
            error_message: None,
            login_error: None,
            epoch: 0,
        }
    }

    pub fn status(&self) -> AnalysisStatus {
        self.status
    }

    pub fn is_admin(&self) -> bool {
        self.is_admin
    }

    pub fn data(&self) -> Option<&DashboardData> {
        self.data.as_ref()
    }

    pub fn snapshot(&self) -> SessionSnapshot {
        SessionSnapshot {
            status: self.status,
            view: self.visible_view(),
            is_admin: self.is_admin,
            data: self.data.clone(),
            error_message: self.error_message.clone(),
            login_error: self.login_error.clone(),
        }
    }

    /// Admin content is never shown without the admin flag, whatever view
    /// was last requested.
    pub fn visible_view(&self) -> AppView {
        match self.view {
            AppView::Admin if !self.is_admin => AppView::Login,
            view => view,
        }
    }

    pub fn submit(&mut self, raw_text: &str) -> AppResult<AnalysisTicket> {
        if raw_text.trim().is_empty() {
            return Err(AppError::Validation("분석할 데이터를 입력해주세요.".to_string()));
        }
        self.begin_analysis()
    }

    /// Starts the offline demo. The caller completes it with sample data
    /// after the simulated delay.
    pub fn begin_demo(&mut self) -> AppResult<AnalysisTicket> {
        self.begin_analysis()
    }

    fn begin_analysis(&mut self) -> AppResult<AnalysisTicket> {
        if self.status != AnalysisStatus::Idle {
            return Err(AppError::Validation(
                "새 분석은 초기 화면에서만 시작할 수 있습니다.".to_string(),
            ));
        }
        self.epoch += 1;
        self.status = AnalysisStatus::Analyzing;
        self.data = None;
        self.error_message = None;
        self.view = AppView::Analysis;
        Ok(AnalysisTicket(self.epoch))
    }

    fn accepts(&self, ticket: AnalysisTicket) -> bool {
        ticket.0 == self.epoch && self.status == AnalysisStatus::Analyzing
    }

    /// Returns false when the result arrived for a run nobody waits on.
    pub fn complete(&mut self, ticket: AnalysisTicket, data: DashboardData) -> bool {
        if !self.accepts(ticket) {
            tracing::debug!("discarding stale analysis result");
            return false;
        }
        self.status = AnalysisStatus::Complete;
        self.data = Some(data);
        self.error_message = None;
        true
    }

    pub fn fail(&mut self, ticket: AnalysisTicket, error: &AppError) -> bool {
        if !self.accepts(ticket) {
            tracing::debug!(error = %error, "discarding stale analysis failure");
            return false;
        }
        self.status = AnalysisStatus::Error;
        self.data = None;
        self.error_message = Some(error.user_message());
        true
    }

    pub fn retry(&mut self) -> AppResult<()> {
        if self.status != AnalysisStatus::Error {
            return Err(AppError::Validation("재시도할 오류가 없습니다.".to_string()));
        }
        self.clear_analysis();
        Ok(())
    }

    pub fn reset(&mut self) -> AppResult<()> {
        if self.status == AnalysisStatus::Analyzing {
            return Err(AppError::Validation("분석이 진행 중입니다.".to_string()));
        }
        self.clear_analysis();
        Ok(())
    }

    fn clear_analysis(&mut self) {
        self.status = AnalysisStatus::Idle;
        self.data = None;
        self.error_message = None;
    }

    pub fn open_admin(&mut self) {
        self.view = if self.is_admin { AppView::Admin } else { AppView::Login };
    }

    pub fn login(&mut self, password: &str) -> bool {
        if self.verifier.verify(password) {
            self.is_admin = true;
            self.view = AppView::Admin;
            self.login_error = None;
            tracing::info!("admin session started");
            true
        } else {
            self.view = AppView::Login;
            self.login_error = Some(LOGIN_FAILED_MESSAGE.to_string());
            tracing::warn!("admin login rejected");
            false
        }
    }

    pub fn cancel_login(&mut self) {
        self.login_error = None;
        if self.view == AppView::Login {
            self.view = AppView::Analysis;
        }
    }

    pub fn logout(&mut self) {
        self.is_admin = false;
        self.view = AppView::Analysis;
        self.login_error = None;
        self.epoch += 1;
        self.clear_analysis();
        tracing::info!("admin session ended");
    }

    /// Logo click: back to analysis, keeping whatever is on screen.
    pub fn show_analysis(&mut self) {
        self.view = AppView::Analysis;
    }

    pub fn load_report(&mut self, data: DashboardData) -> AppResult<()> {
        self.require_admin()?;
        self.epoch += 1;
        self.status = AnalysisStatus::Complete;
        self.data = Some(data);
        self.error_message = None;
        self.view = AppView::Analysis;
        Ok(())
    }

    pub fn require_admin(&self) -> AppResult<()> {
        if self.is_admin {
            Ok(())
        } else {
            Err(AppError::Unauthorized("관리자 로그인이 필요합니다.".to_string()))
        }
    }
}
