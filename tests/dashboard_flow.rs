use adinsight_lib::analysis::gemini::GeminiModel;
use adinsight_lib::auth::SharedSecretVerifier;
use adinsight_lib::config::EnvironmentConfig;
use adinsight_lib::credentials::{ApiKeySource, StaticApiKey};
use adinsight_lib::models::{
    AnalysisStatus, AppView, ConfigSource, ListReportsFilters, SaveBackendConfigPayload, SaveReportPayload,
};
use adinsight_lib::{AppError, AppResult, CoreOptions, DashboardCore};
use async_trait::async_trait;
use serde_json::{json, Value};
use std::sync::Arc;
use std::time::Duration;
use tempfile::TempDir;
use wiremock::matchers::{header, method, path, query_param};
use wiremock::{Mock, MockServer, ResponseTemplate};

const GENERATE_PATH: &str = "/v1beta/models/gemini-2.5-flash:generateContent";

fn dashboard_json() -> Value {
    let kpi = |label: &str, value: &str| json!({"label": label, "value": value, "change": "+12%", "trend": "up"});
    json!({
        "kpis": {
            "spend": kpi("총 비용", "₩300,000"),
            "roas": kpi("ROAS", "420%"),
            "cpa": kpi("CPA", "₩6,000"),
            "ctr": kpi("CTR", "1.80%"),
            "conversions": kpi("총 전환", "50"),
            "clicks": kpi("클릭 수", "900")
        },
        "dailyTrend": [
            {"date": "2024-05-01", "cost": 100000, "conversions": 20, "clicks": 300, "impressions": 16000},
            {"date": "2024-05-02", "cost": 200000, "conversions": 30, "clicks": 600, "impressions": 34000}
        ],
        "channelPerformance": [
            {"name": "General", "spend": 300000, "roas": 4.2, "conversions": 50}
        ],
        "aiSummary": "전환 효율이 안정적입니다.",
        "recommendations": ["예산을 유지하세요.", "소재를 점검하세요.", "입찰가를 조정하세요."]
    })
}

fn gemini_reply(text: &str) -> Value {
    json!({"candidates": [{"content": {"role": "model", "parts": [{"text": text}]}}]})
}

fn build_core(dir: &TempDir, gemini_url: &str, api_key: Option<&str>, environment: EnvironmentConfig) -> Arc<DashboardCore> {
    let options = CoreOptions {
        environment,
        model: Arc::new(GeminiModel::new(gemini_url).expect("gemini model")),
        credentials: Arc::new(StaticApiKey::new(api_key)),
        verifier: Arc::new(SharedSecretVerifier::default()),
    };
    DashboardCore::new(dir.path().to_path_buf(), options).expect("core")
}

#[tokio::test]
async fn analysis_completes_with_validated_dashboard() {
    let dir = TempDir::new().expect("tempdir");
    let gemini = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path(GENERATE_PATH))
        .and(header("x-goog-api-key", "test-key"))
        .respond_with(ResponseTemplate::new(200).set_body_json(gemini_reply(&dashboard_json().to_string())))
        .expect(1)
        .mount(&gemini)
        .await;

    let core = build_core(&dir, &gemini.uri(), Some("test-key"), EnvironmentConfig::default());
    let snapshot = core
        .analyze("Date,Cost,Clicks,Conversions\n2024-05-01,100000,300,20\n2024-05-02,200000,600,30")
        .await
        .expect("analyze");

    assert_eq!(snapshot.status, AnalysisStatus::Complete);
    let data = snapshot.data.expect("dashboard data");
    assert_eq!(data.kpis.spend.value, "₩300,000");
    assert_eq!(data.daily_trend.len(), 2);
    assert!(snapshot.error_message.is_none());

    let requests = gemini.received_requests().await.expect("recorded requests");
    let body: Value = serde_json::from_slice(&requests[0].body).expect("request body");
    let prompt = body["contents"][0]["parts"][0]["text"].as_str().expect("prompt");
    assert!(prompt.contains("RAW DATA:\nDate,Cost,Clicks,Conversions"));
    assert_eq!(body["generationConfig"]["responseMimeType"], "application/json");
}

#[tokio::test]
async fn missing_api_key_ends_in_error_without_calling_provider() {
    let dir = TempDir::new().expect("tempdir");
    let gemini = MockServer::start().await;
    Mock::given(method("POST"))
        .respond_with(ResponseTemplate::new(200))
        .expect(0)
        .mount(&gemini)
        .await;

    let core = build_core(&dir, &gemini.uri(), None, EnvironmentConfig::default());
    let snapshot = core.analyze("Date,Cost\n2024-05-01,100").await.expect("analyze");

    assert_eq!(snapshot.status, AnalysisStatus::Error);
    assert!(snapshot.data.is_none());
    assert_eq!(
        snapshot.error_message.as_deref(),
        Some("API Key 오류: 키가 올바르게 설정되지 않았습니다.")
    );
}

#[tokio::test]
async fn provider_failure_and_malformed_output_show_generic_message() {
    let dir = TempDir::new().expect("tempdir");
    let gemini = MockServer::start().await;
    Mock::given(method("POST"))
        .respond_with(ResponseTemplate::new(500).set_body_json(json!({
            "error": {"code": 500, "message": "internal", "status": "INTERNAL"}
        })))
        .up_to_n_times(1)
        .mount(&gemini)
        .await;
    Mock::given(method("POST"))
        .respond_with(ResponseTemplate::new(200).set_body_json(gemini_reply("{\"kpis\": {}}")))
        .mount(&gemini)
        .await;

    let core = build_core(&dir, &gemini.uri(), Some("test-key"), EnvironmentConfig::default());
    let expected = "데이터를 분석하는 중 오류가 발생했습니다. 데이터 형식을 확인해주세요.";

    let snapshot = core.analyze("raw").await.expect("provider failure");
    assert_eq!(snapshot.status, AnalysisStatus::Error);
    assert_eq!(snapshot.error_message.as_deref(), Some(expected));

    core.retry().await.expect("retry");
    let snapshot = core.analyze("raw").await.expect("malformed output");
    assert_eq!(snapshot.status, AnalysisStatus::Error);
    assert_eq!(snapshot.error_message.as_deref(), Some(expected));
    assert!(snapshot.data.is_none());
}

struct LockedKeychain;

#[async_trait]
impl ApiKeySource for LockedKeychain {
    async fn api_key(&self) -> AppResult<Option<String>> {
        Err(AppError::Io("keychain is locked".to_string()))
    }

    async fn save_api_key(&self, _token: String) -> AppResult<()> {
        Err(AppError::Io("keychain is locked".to_string()))
    }

    async fn clear_api_key(&self) -> AppResult<()> {
        Err(AppError::Io("keychain is locked".to_string()))
    }
}

#[tokio::test]
async fn unreadable_settings_end_in_error_and_allow_a_fresh_start() {
    let dir = TempDir::new().expect("tempdir");
    let gemini = MockServer::start().await;
    Mock::given(method("POST"))
        .respond_with(ResponseTemplate::new(200))
        .expect(0)
        .mount(&gemini)
        .await;
    let core = build_core(&dir, &gemini.uri(), Some("test-key"), EnvironmentConfig::default());

    let conn = rusqlite::Connection::open(dir.path().join("state.sqlite")).expect("open state");
    conn.execute(
        "INSERT INTO documents (key, value_json, updated_at) VALUES ('app_settings', '{not json', '')
         ON CONFLICT(key) DO UPDATE SET value_json = excluded.value_json",
        [],
    )
    .expect("corrupt settings");

    let snapshot = core.analyze("Date,Cost\n2024-05-01,100").await.expect("analyze");
    assert_eq!(snapshot.status, AnalysisStatus::Error);
    assert!(snapshot.error_message.is_some());
    assert!(snapshot.data.is_none());

    let snapshot = core.retry().await.expect("retry");
    assert_eq!(snapshot.status, AnalysisStatus::Idle);
    let snapshot = core.analyze("Date,Cost\n2024-05-01,100").await.expect("second analyze");
    assert_eq!(snapshot.status, AnalysisStatus::Error);
    let snapshot = core.reset().await.expect("reset");
    assert_eq!(snapshot.status, AnalysisStatus::Idle);
}

#[tokio::test]
async fn credential_store_failure_ends_in_error_state() {
    let dir = TempDir::new().expect("tempdir");
    let gemini = MockServer::start().await;
    Mock::given(method("POST"))
        .respond_with(ResponseTemplate::new(200))
        .expect(0)
        .mount(&gemini)
        .await;
    let options = CoreOptions {
        environment: EnvironmentConfig::default(),
        model: Arc::new(GeminiModel::new(gemini.uri()).expect("gemini model")),
        credentials: Arc::new(LockedKeychain),
        verifier: Arc::new(SharedSecretVerifier::default()),
    };
    let core = DashboardCore::new(dir.path().to_path_buf(), options).expect("core");

    let snapshot = core.analyze("Date,Cost\n2024-05-01,100").await.expect("analyze");
    assert_eq!(snapshot.status, AnalysisStatus::Error);
    assert_eq!(
        snapshot.error_message.as_deref(),
        Some("API Key 오류: 키가 올바르게 설정되지 않았습니다.")
    );

    core.retry().await.expect("retry");
    assert_eq!(core.session().await.status, AnalysisStatus::Idle);
}

#[tokio::test]
async fn blank_input_is_rejected_before_analysis() {
    let dir = TempDir::new().expect("tempdir");
    let core = build_core(&dir, "http://127.0.0.1:9", Some("test-key"), EnvironmentConfig::default());

    let error = core.analyze("   ").await.expect_err("blank input");
    assert!(matches!(error, AppError::Validation(_)));
    assert_eq!(core.session().await.status, AnalysisStatus::Idle);
}

#[tokio::test(start_paused = true)]
async fn demo_shows_analyzing_then_seven_days_of_sample_data() {
    let dir = TempDir::new().expect("tempdir");
    let core = build_core(&dir, "http://127.0.0.1:9", None, EnvironmentConfig::default());

    let demo = tokio::spawn({
        let core = core.clone();
        async move { core.run_demo().await }
    });

    let mut status = AnalysisStatus::Idle;
    for _ in 0..20 {
        tokio::task::yield_now().await;
        status = core.session().await.status;
        if status == AnalysisStatus::Analyzing {
            break;
        }
    }
    assert_eq!(status, AnalysisStatus::Analyzing);

    tokio::time::advance(Duration::from_millis(1500)).await;
    let snapshot = demo.await.expect("join").expect("demo");

    assert_eq!(snapshot.status, AnalysisStatus::Complete);
    let data = snapshot.data.expect("sample data");
    assert_eq!(data.daily_trend.len(), 7);
    assert_eq!(data.recommendations.len(), 3);
}

#[tokio::test]
async fn report_management_requires_admin_session() {
    let dir = TempDir::new().expect("tempdir");
    let core = build_core(&dir, "http://127.0.0.1:9", None, EnvironmentConfig::default());

    let error = core.list_reports(ListReportsFilters::default()).await.expect_err("anonymous list");
    assert!(matches!(error, AppError::Unauthorized(_)));
    let error = core
        .save_report(SaveReportPayload::default())
        .await
        .expect_err("anonymous save");
    assert!(matches!(error, AppError::Unauthorized(_)));

    let snapshot = core.open_admin().await;
    assert_eq!(snapshot.view, AppView::Login);

    let snapshot = core.login("wrong").await;
    assert!(!snapshot.is_admin);
    assert_eq!(snapshot.view, AppView::Login);
    assert!(snapshot.login_error.is_some());

    let snapshot = core.login("admin1234").await;
    assert!(snapshot.is_admin);
    assert_eq!(snapshot.view, AppView::Admin);

    let error = core
        .save_report(SaveReportPayload::default())
        .await
        .expect_err("nothing to save");
    assert!(matches!(error, AppError::Validation(_)));

    let snapshot = core.logout().await;
    assert!(!snapshot.is_admin);
    assert_eq!(snapshot.view, AppView::Analysis);
    assert_eq!(snapshot.status, AnalysisStatus::Idle);
    assert!(core.list_reports(ListReportsFilters::default()).await.is_err());
}

#[tokio::test]
async fn local_reports_save_list_search_load_and_delete() {
    let dir = TempDir::new().expect("tempdir");
    let gemini = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path(GENERATE_PATH))
        .respond_with(ResponseTemplate::new(200).set_body_json(gemini_reply(&dashboard_json().to_string())))
        .mount(&gemini)
        .await;

    let core = build_core(&dir, &gemini.uri(), Some("test-key"), EnvironmentConfig::default());
    assert!(!core.backend_status().expect("status").cloud_enabled);

    core.login("admin1234").await;
    core.show_analysis().await;
    core.analyze("Date,Cost\n2024-05-01,100000").await.expect("analyze");

    let saved = core
        .save_report(SaveReportPayload {
            title: Some("May Campaign".to_string()),
            data: None,
        })
        .await
        .expect("save from session data");
    assert_eq!(saved.title, "May Campaign");
    assert_eq!(saved.data.kpis.spend.value, "₩300,000");

    let untitled = core
        .save_report(SaveReportPayload {
            title: Some("  ".to_string()),
            data: Some(saved.data.clone()),
        })
        .await
        .expect("save untitled");
    assert!(untitled.title.starts_with("광고 성과 분석 - "));

    let reports = core.list_reports(ListReportsFilters::default()).await.expect("list");
    assert_eq!(reports.len(), 2);
    assert_eq!(reports[0].id, untitled.id);
    assert_eq!(reports[1].id, saved.id);

    let matched = core
        .list_reports(ListReportsFilters {
            search: Some("may".to_string()),
        })
        .await
        .expect("search");
    assert_eq!(matched.len(), 1);

    core.reset().await.expect("reset");
    let snapshot = core.load_report(matched[0].data.clone()).await.expect("load");
    assert_eq!(snapshot.status, AnalysisStatus::Complete);
    assert_eq!(snapshot.view, AppView::Analysis);

    let deleted = core.delete_report(&saved.id).await.expect("delete");
    assert!(deleted.success);
    core.delete_report(&saved.id).await.expect("delete again");
    let reports = core.list_reports(ListReportsFilters::default()).await.expect("list");
    assert_eq!(reports.len(), 1);
    assert_eq!(reports[0].id, untitled.id);
}

#[tokio::test]
async fn saved_backend_config_switches_reports_to_cloud_and_back() {
    let dir = TempDir::new().expect("tempdir");
    let supabase = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/rest/v1/reports"))
        .and(header("apikey", "service-role-key-123456"))
        .respond_with(ResponseTemplate::new(201))
        .expect(1)
        .mount(&supabase)
        .await;
    Mock::given(method("GET"))
        .and(path("/rest/v1/reports"))
        .and(query_param("order", "created_at.desc"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!([{
            "id": "cloud-1",
            "title": "Cloud report",
            "date": "2024-05-10T09:00:00.000Z",
            "data": dashboard_json(),
            "created_at": "2024-05-10T09:00:00+00:00"
        }])))
        .mount(&supabase)
        .await;

    let core = build_core(&dir, "http://127.0.0.1:9", None, EnvironmentConfig::default());
    core.login("admin1234").await;

    let status = core
        .save_backend_config(SaveBackendConfigPayload {
            url: supabase.uri(),
            key: "service-role-key-123456".to_string(),
        })
        .await
        .expect("save backend config");
    assert!(status.cloud_enabled);
    assert_eq!(status.source, Some(ConfigSource::LocallySaved));
    assert_eq!(status.masked_key.as_deref(), Some("serv…3456"));
    assert!(status.dashboard_link.is_none());

    let data = serde_json::from_value(dashboard_json()).expect("dashboard");
    core.save_report(SaveReportPayload {
        title: Some("Cloud report".to_string()),
        data: Some(data),
    })
    .await
    .expect("cloud save");

    let reports = core.list_reports(ListReportsFilters::default()).await.expect("cloud list");
    assert_eq!(reports.len(), 1);
    assert_eq!(reports[0].id, "cloud-1");

    let status = core.clear_backend_config().await.expect("clear");
    assert!(!status.cloud_enabled);
    let reports = core.list_reports(ListReportsFilters::default()).await.expect("local list");
    assert!(reports.is_empty());
}

#[tokio::test]
async fn environment_backend_config_wins_over_saved_override() {
    let dir = TempDir::new().expect("tempdir");
    let core = build_core(
        &dir,
        "http://127.0.0.1:9",
        None,
        EnvironmentConfig::new("https://abcxyz.supabase.co", "env-anon-key-0000"),
    );
    core.login("admin1234").await;

    let status = core
        .save_backend_config(SaveBackendConfigPayload {
            url: "https://other.example.co".to_string(),
            key: "local-key-99999999".to_string(),
        })
        .await
        .expect("save override");
    assert_eq!(status.source, Some(ConfigSource::Environment));
    assert_eq!(status.url.as_deref(), Some("https://abcxyz.supabase.co"));
    assert_eq!(
        status.dashboard_link.as_deref(),
        Some("https://supabase.com/dashboard/project/abcxyz/editor")
    );

    let status = core.clear_backend_config().await.expect("clear");
    assert!(status.cloud_enabled);
    assert_eq!(status.source, Some(ConfigSource::Environment));
}
