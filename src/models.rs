use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Trend {
    Up,
    Down,
    Neutral,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct KpiMetric {
    pub label: String,
    /// Pre-formatted display value ("₩300,000", "412%").
    pub value: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub change: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub trend: Option<Trend>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
}

impl KpiMetric {
    pub fn new(label: impl Into<String>, value: impl Into<String>) -> Self {
        Self {
            label: label.into(),
            value: value.into(),
            change: None,
            trend: None,
            description: None,
        }
    }

    pub fn with_change(mut self, change: impl Into<String>, trend: Trend) -> Self {
        self.change = Some(change.into());
        self.trend = Some(trend);
        self
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Kpis {
    pub spend: KpiMetric,
    pub roas: KpiMetric,
    pub cpa: KpiMetric,
    pub ctr: KpiMetric,
    pub conversions: KpiMetric,
    pub clicks: KpiMetric,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ChartDataPoint {
    pub date: String,
    pub cost: f64,
    pub conversions: f64,
    pub clicks: f64,
    pub impressions: f64,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ChannelPerformance {
    pub name: String,
    pub spend: f64,
    pub roas: f64,
    pub conversions: f64,
}

/// Result of one analysis. Treated as opaque once received: nothing here is
/// recomputed or cross-checked against other fields.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DashboardData {
    pub kpis: Kpis,
    pub daily_trend: Vec<ChartDataPoint>,
    pub channel_performance: Vec<ChannelPerformance>,
    pub ai_summary: String,
    pub recommendations: Vec<String>,
}

impl DashboardData {
    pub fn is_empty(&self) -> bool {
        self.daily_trend.is_empty()
            && self.channel_performance.is_empty()
            && self.ai_summary.trim().is_empty()
            && self.recommendations.is_empty()
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SavedReport {
    pub id: String,
    pub title: String,
    /// ISO-8601 save timestamp.
    pub date: String,
    pub data: DashboardData,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum ConfigSource {
    #[serde(rename = "env")]
    Environment,
    #[serde(rename = "local")]
    LocallySaved,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct BackendConfig {
    pub url: String,
    pub key: String,
    pub source: ConfigSource,
}

/// Shape of the locally saved override bucket. Provenance is implied.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct StoredBackendConfig {
    pub url: String,
    pub key: String,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct AppSettings {
    pub model: String,
    pub temperature: f32,
    pub demo_delay_ms: u64,
    pub request_timeout_secs: u64,
    pub local_quota_bytes: usize,
}

impl Default for AppSettings {
    fn default() -> Self {
        Self {
            model: "gemini-2.5-flash".to_string(),
            temperature: 0.2,
            demo_delay_ms: 1500,
            request_timeout_secs: 120,
            local_quota_bytes: 5 * 1024 * 1024,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum AnalysisStatus {
    Idle,
    Analyzing,
    Complete,
    Error,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum AppView {
    Analysis,
    Login,
    Admin,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SessionSnapshot {
    pub status: AnalysisStatus,
    /// The view to render. Never `Admin` unless `is_admin` is set.
    pub view: AppView,
    pub is_admin: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub data: Option<DashboardData>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error_message: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub login_error: Option<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AnalyzePayload {
    pub raw_text: String,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SaveReportPayload {
    #[serde(default)]
    pub title: Option<String>,
    /// Falls back to the dashboard currently on screen.
    #[serde(default)]
    pub data: Option<DashboardData>,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ListReportsFilters {
    #[serde(default)]
    pub search: Option<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SaveBackendConfigPayload {
    pub url: String,
    pub key: String,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct BackendStatus {
    pub cloud_enabled: bool,
    pub source: Option<ConfigSource>,
    pub url: Option<String>,
    pub masked_key: Option<String>,
    pub dashboard_link: Option<String>,
    pub setup_sql: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct BooleanResponse {
    pub success: bool,
}
