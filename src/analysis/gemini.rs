use super::{GenerationRequest, GenerativeModel};
use crate::errors::{AppError, AppResult};
use crate::redaction::Redactor;
use async_trait::async_trait;
use serde::Deserialize;
use serde_json::json;
use std::time::Duration;

pub const DEFAULT_GEMINI_BASE_URL: &str = "https://generativelanguage.googleapis.com";

#[derive(Debug, Deserialize)]
struct GenerateContentResponse {
    #[serde(default)]
    candidates: Vec<Candidate>,
}

#[derive(Debug, Deserialize)]
struct Candidate {
    content: Option<Content>,
}

#[derive(Debug, Deserialize)]
struct Content {
    #[serde(default)]
    parts: Vec<Part>,
}

#[derive(Debug, Deserialize)]
struct Part {
    text: Option<String>,
}

#[derive(Debug, Deserialize)]
struct ErrorEnvelope {
    error: ErrorBody,
}

#[derive(Debug, Deserialize)]
struct ErrorBody {
    message: String,
    #[serde(default)]
    status: Option<String>,
}

/// `generateContent` over the Gemini REST API.
#[derive(Debug, Clone)]
pub struct GeminiModel {
    client: reqwest::Client,
    base_url: String,
}

impl GeminiModel {
    pub fn new(base_url: impl Into<String>) -> AppResult<Self> {
        let client = reqwest::Client::builder()
            .build()
            .map_err(|error| AppError::Configuration(format!("failed to build HTTP client: {}", error)))?;
        Ok(Self {
            client,
            base_url: base_url.into().trim_end_matches('/').to_string(),
        })
    }

    fn endpoint(&self, model: &str) -> String {
        format!("{}/v1beta/models/{}:generateContent", self.base_url, model)
    }
}

#[async_trait]
impl GenerativeModel for GeminiModel {
    async fn generate(&self, api_key: &str, request: &GenerationRequest) -> AppResult<Option<String>> {
        let redactor = Redactor::new().with_secret(api_key);
        let body = json!({
            "contents": [{
                "role": "user",
                "parts": [{ "text": request.prompt }]
            }],
            "generationConfig": {
                "responseMimeType": "application/json",
                "responseSchema": request.response_schema,
                "temperature": request.temperature
            }
        });

        tracing::debug!(model = %request.model, prompt_bytes = request.prompt.len(), "sending generateContent request");
        let response = self
            .client
            .post(self.endpoint(&request.model))
            .header("x-goog-api-key", api_key)
            .timeout(Duration::from_secs(request.timeout_secs.max(1)))
            .json(&body)
            .send()
            .await
            .map_err(|error| AppError::Provider(redactor.redact(&error.to_string())))?;

        let status = response.status();
        if !status.is_success() {
            let text = response.text().await.unwrap_or_default();
            let message = match serde_json::from_str::<ErrorEnvelope>(&text) {
                Ok(envelope) => match envelope.error.status {
                    Some(code) => format!("{} {}: {}", status.as_u16(), code, envelope.error.message),
                    None => format!("{}: {}", status.as_u16(), envelope.error.message),
                },
                Err(_) => format!("{}: {}", status.as_u16(), text.trim()),
            };
            return Err(AppError::Provider(redactor.redact(&message)));
        }

        let parsed: GenerateContentResponse = response
            .json()
            .await
            .map_err(|error| AppError::MalformedResponse(redactor.redact(&error.to_string())))?;

        let text: String = parsed
            .candidates
            .into_iter()
            .next()
            .and_then(|candidate| candidate.content)
            .map(|content| content.parts.into_iter().filter_map(|part| part.text).collect())
            .unwrap_or_default();

        Ok(if text.trim().is_empty() { None } else { Some(text) })
    }
}
