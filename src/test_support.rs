use crate::models::DashboardData;

pub fn dashboard_json() -> serde_json::Value {
    let kpi = |label: &str, value: &str| {
        serde_json::json!({"label": label, "value": value, "change": "+5%", "trend": "up"})
    };
    serde_json::json!({
        "kpis": {
            "spend": kpi("총 비용", "₩1,845,000"),
            "roas": kpi("ROAS", "469%"),
            "cpa": kpi("CPA", "₩7,994"),
            "ctr": kpi("CTR", "1.51%"),
            "conversions": kpi("총 전환", "238"),
            "clicks": kpi("클릭 수", "4,510")
        },
        "dailyTrend": [
            {"date": "2024-05-01", "cost": 270000, "conversions": 47, "clicks": 730, "impressions": 29000},
            {"date": "2024-05-02", "cost": 270000, "conversions": 48, "clicks": 740, "impressions": 30800}
        ],
        "channelPerformance": [
            {"name": "Instagram", "spend": 1015000, "roas": 4.3, "conversions": 116}
        ],
        "aiSummary": "Google 검색 캠페인의 효율이 가장 높습니다.",
        "recommendations": ["예산을 재분배하세요.", "소재를 교체하세요.", "키워드를 확장하세요."]
    })
}

pub fn dashboard() -> DashboardData {
    serde_json::from_value(dashboard_json()).expect("fixture dashboard")
}

pub fn dashboard_with_spend(value: &str) -> DashboardData {
    let mut data = dashboard();
    data.kpis.spend.value = value.to_string();
    data
}
