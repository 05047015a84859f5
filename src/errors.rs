use thiserror::Error;

#[derive(Debug, Error)]
pub enum AppError {
    #[error("CONFIGURATION_ERROR: {0}")]
    Configuration(String),
    #[error("PROVIDER_ERROR: {0}")]
    Provider(String),
    #[error("MALFORMED_RESPONSE: {0}")]
    MalformedResponse(String),
    #[error("CLOUD_UNAVAILABLE: {0}")]
    CloudUnavailable(String),
    #[error("CLOUD_WRITE_ERROR: {0}")]
    CloudWrite(String),
    #[error("CLOUD_DELETE_ERROR: {0}")]
    CloudDelete(String),
    #[error("LOCAL_WRITE_ERROR: {0}")]
    LocalWrite(String),
    #[error("LOCAL_DELETE_ERROR: {0}")]
    LocalDelete(String),
    #[error("VALIDATION_ERROR: {0}")]
    Validation(String),
    #[error("UNAUTHORIZED: {0}")]
    Unauthorized(String),
    #[error("IO_FAILURE: {0}")]
    Io(String),
    #[error("INTERNAL: {0}")]
    Internal(String),
}

impl AppError {
    /// Text shown to the user for this failure. Storage and validation
    /// errors carry their detail; analysis errors collapse to a fixed hint.
    pub fn user_message(&self) -> String {
        match self {
            Self::Configuration(_) => "API Key 오류: 키가 올바르게 설정되지 않았습니다.".to_string(),
            Self::Provider(_) | Self::MalformedResponse(_) => {
                "데이터를 분석하는 중 오류가 발생했습니다. 데이터 형식을 확인해주세요.".to_string()
            }
            Self::CloudUnavailable(_) => "클라우드 데이터를 불러오는 중 오류가 발생했습니다.".to_string(),
            Self::CloudWrite(detail) => format!("클라우드 저장 실패: {}", detail),
            Self::CloudDelete(detail) => format!("삭제 실패: {}", detail),
            Self::LocalWrite(_) => {
                "로컬 저장소에 데이터를 쓸 수 없습니다. 저장 공간이 부족하거나 권한이 없을 수 있습니다.".to_string()
            }
            Self::LocalDelete(_) => "로컬 리포트 삭제 실패".to_string(),
            Self::Validation(detail) | Self::Unauthorized(detail) => detail.clone(),
            Self::Io(_) | Self::Internal(_) => "알 수 없는 오류가 발생했습니다.".to_string(),
        }
    }

    pub fn is_analysis_failure(&self) -> bool {
        matches!(
            self,
            Self::Configuration(_) | Self::Provider(_) | Self::MalformedResponse(_)
        )
    }
}

impl From<std::io::Error> for AppError {
    fn from(value: std::io::Error) -> Self {
        Self::Io(value.to_string())
    }
}

impl From<rusqlite::Error> for AppError {
    fn from(value: rusqlite::Error) -> Self {
        Self::Internal(value.to_string())
    }
}

impl From<serde_json::Error> for AppError {
    fn from(value: serde_json::Error) -> Self {
        Self::Internal(value.to_string())
    }
}

pub type AppResult<T> = Result<T, AppError>;
