use crate::errors::{AppError, AppResult};
use async_trait::async_trait;
use tokio::sync::Mutex;

const KEYRING_SERVICE: &str = "adinsight";
const KEYRING_ACCOUNT: &str = "gemini";
const API_KEY_VARS: [&str; 2] = ["GEMINI_API_KEY", "API_KEY"];

/// Where the analysis client gets its provider credential from.
#[async_trait]
pub trait ApiKeySource: Send + Sync {
    async fn api_key(&self) -> AppResult<Option<String>>;
    async fn save_api_key(&self, token: String) -> AppResult<()>;
    async fn clear_api_key(&self) -> AppResult<()>;
}

/// Process environment first, then the OS keyring.
#[derive(Debug, Default)]
pub struct KeyringApiKeySource {
    environment: Option<String>,
    keyring_lock: Mutex<()>,
}

impl KeyringApiKeySource {
    pub fn from_process_env() -> Self {
        let environment = API_KEY_VARS
            .iter()
            .filter_map(|name| std::env::var(name).ok())
            .find(|value| !value.trim().is_empty());
        Self {
            environment,
            keyring_lock: Mutex::new(()),
        }
    }

    fn entry() -> AppResult<keyring::Entry> {
        keyring::Entry::new(KEYRING_SERVICE, KEYRING_ACCOUNT).map_err(|error| AppError::Io(error.to_string()))
    }
}

#[async_trait]
impl ApiKeySource for KeyringApiKeySource {
    async fn api_key(&self) -> AppResult<Option<String>> {
        if let Some(value) = &self.environment {
            return Ok(Some(value.clone()));
        }

        let _guard = self.keyring_lock.lock().await;
        match Self::entry()?.get_password() {
            Ok(value) if !value.trim().is_empty() => Ok(Some(value)),
            Ok(_) | Err(keyring::Error::NoEntry) => Ok(None),
            Err(error) => Err(AppError::Io(error.to_string())),
        }
    }

    async fn save_api_key(&self, token: String) -> AppResult<()> {
        if token.trim().is_empty() {
            return Err(AppError::Validation("API Key를 입력해주세요.".to_string()));
        }
        let _guard = self.keyring_lock.lock().await;
        Self::entry()?
            .set_password(token.trim())
            .map_err(|error| AppError::Io(error.to_string()))
    }

    async fn clear_api_key(&self) -> AppResult<()> {
        let _guard = self.keyring_lock.lock().await;
        match Self::entry()?.delete_credential() {
            Ok(_) | Err(keyring::Error::NoEntry) => Ok(()),
            Err(error) => Err(AppError::Io(error.to_string())),
        }
    }
}

/// In-memory credential, used when the key is injected directly.
#[derive(Debug, Default)]
pub struct StaticApiKey {
    value: Mutex<Option<String>>,
}

impl StaticApiKey {
    pub fn new(value: Option<&str>) -> Self {
        Self {
            value: Mutex::new(value.map(ToString::to_string)),
        }
    }
}

#[async_trait]
impl ApiKeySource for StaticApiKey {
    async fn api_key(&self) -> AppResult<Option<String>> {
        Ok(self.value.lock().await.clone().filter(|value| !value.trim().is_empty()))
    }

    async fn save_api_key(&self, token: String) -> AppResult<()> {
        if token.trim().is_empty() {
            return Err(AppError::Validation("API Key를 입력해주세요.".to_string()));
        }
        *self.value.lock().await = Some(token);
        Ok(())
    }

    async fn clear_api_key(&self) -> AppResult<()> {
        *self.value.lock().await = None;
        Ok(())
    }
}
