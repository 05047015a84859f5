pub mod gemini;
pub mod structured_output;

use crate::credentials::ApiKeySource;
use crate::errors::{AppError, AppResult};
use crate::models::{AppSettings, DashboardData};
use async_trait::async_trait;
use once_cell::sync::Lazy;
use serde_json::{json, Value};
use std::sync::Arc;
use structured_output::{parse_structured_output, validate_structured_output};

pub const REQUIRED_FIELDS: [&str; 5] = ["kpis", "dailyTrend", "channelPerformance", "aiSummary", "recommendations"];
const KPI_NAMES: [&str; 6] = ["spend", "roas", "cpa", "ctr", "conversions", "clicks"];

static RESPONSE_SCHEMA: Lazy<Value> = Lazy::new(build_response_schema);
static VALIDATION_SCHEMA: Lazy<Value> = Lazy::new(|| to_json_schema(&RESPONSE_SCHEMA));

#[derive(Debug, Clone)]
pub struct GenerationRequest {
    pub model: String,
    pub prompt: String,
    pub response_schema: Value,
    pub temperature: f32,
    pub timeout_secs: u64,
}

/// A text-generation backend that can be asked for schema-constrained JSON.
#[async_trait]
pub trait GenerativeModel: Send + Sync {
    /// Returns the generated text, or `None` when the service produced none.
    async fn generate(&self, api_key: &str, request: &GenerationRequest) -> AppResult<Option<String>>;
}

pub fn build_prompt(raw_text: &str) -> String {
    format!(
        "You are an expert Data Analyst and Marketing Specialist.
I will provide you with raw advertising data pasted from a spreadsheet (CSV or TSV format).

Your task is to:
1. Parse the data intelligently. Identify columns for Date, Cost/Spend, Impressions, Clicks, Conversions, and Revenue/Value.
2. If numeric columns are missing, treat their values as zero.
3. Aggregate the data to calculate overall KPIs: Total Spend, ROAS (Revenue/Spend), CPA (Spend/Conversions), CTR (Clicks/Impressions), Total Conversions, Total Clicks. Format KPI values as display strings (currency with symbol and thousands separators, rates as percentages).
4. Create a daily trend dataset aggregated by date, one entry per date, in chronological order.
5. If there is a 'Campaign', 'Source', 'Channel' or 'Platform' column, categorize performance by channel. If not, treat everything as a single channel named \"General\".
6. Provide a concise summary of the performance in KOREAN.
7. Provide 3 actionable recommendations in KOREAN.

RAW DATA:
{}
",
        raw_text.trim()
    )
}

/// Provider-side schema (OpenAPI subset, upper-case type names).
pub fn response_schema() -> &'static Value {
    &RESPONSE_SCHEMA
}

fn build_response_schema() -> Value {
    let kpi = json!({
        "type": "OBJECT",
        "properties": {
            "label": { "type": "STRING" },
            "value": { "type": "STRING" },
            "change": { "type": "STRING" },
            "trend": { "type": "STRING", "enum": ["up", "down", "neutral"] }
        },
        "required": ["label", "value"]
    });
    let kpi_properties: serde_json::Map<String, Value> =
        KPI_NAMES.iter().map(|name| (name.to_string(), kpi.clone())).collect();

    json!({
        "type": "OBJECT",
        "properties": {
            "kpis": {
                "type": "OBJECT",
                "properties": kpi_properties,
                "required": KPI_NAMES
            },
            "dailyTrend": {
                "type": "ARRAY",
                "items": {
                    "type": "OBJECT",
                    "properties": {
                        "date": { "type": "STRING" },
                        "cost": { "type": "NUMBER" },
                        "conversions": { "type": "NUMBER" },
                        "clicks": { "type": "NUMBER" },
                        "impressions": { "type": "NUMBER" }
                    },
                    "required": ["date", "cost", "conversions", "clicks", "impressions"]
                }
            },
            "channelPerformance": {
                "type": "ARRAY",
                "items": {
                    "type": "OBJECT",
                    "properties": {
                        "name": { "type": "STRING" },
                        "spend": { "type": "NUMBER" },
                        "roas": { "type": "NUMBER" },
                        "conversions": { "type": "NUMBER" }
                    },
                    "required": ["name", "spend", "roas", "conversions"]
                }
            },
            "aiSummary": { "type": "STRING" },
            "recommendations": {
                "type": "ARRAY",
                "items": { "type": "STRING" }
            }
        },
        "required": REQUIRED_FIELDS
    })
}

/// Rewrites the provider schema as standard JSON Schema for local checks.
fn to_json_schema(value: &Value) -> Value {
    match value {
        Value::Object(map) => Value::Object(
            map.iter()
                .map(|(key, value)| match (key.as_str(), value) {
                    ("type", Value::String(kind)) => (key.clone(), Value::String(kind.to_ascii_lowercase())),
                    _ => (key.clone(), to_json_schema(value)),
                })
                .collect(),
        ),
        Value::Array(items) => Value::Array(items.iter().map(to_json_schema).collect()),
        other => other.clone(),
    }
}

/// Turns pasted spreadsheet text into a [`DashboardData`] via the AI service.
///
/// The result is validated for shape only. Numbers, formatting and channel
/// grouping are whatever the service returned.
#[derive(Clone)]
pub struct AnalysisClient {
    model: Arc<dyn GenerativeModel>,
    credentials: Arc<dyn ApiKeySource>,
}

impl AnalysisClient {
    pub fn new(model: Arc<dyn GenerativeModel>, credentials: Arc<dyn ApiKeySource>) -> Self {
        Self { model, credentials }
    }

    pub fn credentials(&self) -> &Arc<dyn ApiKeySource> {
        &self.credentials
    }

    pub async fn analyze(&self, raw_text: &str, settings: &AppSettings) -> AppResult<DashboardData> {
        if raw_text.trim().is_empty() {
            return Err(AppError::Validation("분석할 데이터를 입력해주세요.".to_string()));
        }

        let api_key = self
            .credentials
            .api_key()
            .await
            .map_err(|error| AppError::Configuration(error.to_string()))?
            .ok_or_else(|| AppError::Configuration("API Key가 설정되지 않았습니다. 환경 변수를 확인해주세요.".to_string()))?;

        let request = GenerationRequest {
            model: settings.model.clone(),
            prompt: build_prompt(raw_text),
            response_schema: response_schema().clone(),
            temperature: settings.temperature,
            timeout_secs: settings.request_timeout_secs,
        };

        let text = match self.model.generate(&api_key, &request).await {
            Ok(text) => text,
            Err(error) => {
                tracing::error!(error = %error, model = %request.model, "analysis request failed");
                return Err(error);
            }
        };
        let text = text.ok_or_else(|| AppError::MalformedResponse("No response text generated".to_string()))?;

        let data = decode_dashboard(&text)?;
        tracing::info!(
            trend_points = data.daily_trend.len(),
            channels = data.channel_performance.len(),
            "analysis completed"
        );
        Ok(data)
    }
}

pub fn decode_dashboard(text: &str) -> AppResult<DashboardData> {
    let validation = validate_structured_output(parse_structured_output(Some(text)), &VALIDATION_SCHEMA);
    if !validation.is_valid() {
        tracing::warn!(detail = %validation.describe(), "analysis response rejected");
        return Err(AppError::MalformedResponse(validation.describe()));
    }

    let value = validation
        .value
        .ok_or_else(|| AppError::MalformedResponse("Structured output is missing.".to_string()))?;
    serde_json::from_value(value).map_err(|error| AppError::MalformedResponse(error.to_string()))
}
