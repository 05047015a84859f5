use crate::models::{ChannelPerformance, ChartDataPoint, DashboardData, KpiMetric, Kpis, Trend};
use chrono::{Duration, Local, NaiveDate};
use rand::Rng;

pub const DEMO_DAYS: i64 = 7;

/// Spreadsheet paste offered as a starting point in the input box.
pub const SAMPLE_INPUT: &str = "Date,Platform,Campaign,Spend,Impressions,Clicks,Conversions,Revenue
2024-05-01,Instagram,Spring_Sale_A,150000,25000,450,15,650000
2024-05-01,Google,Brand_Search,120000,4000,280,32,1200000
2024-05-02,Instagram,Spring_Sale_A,160000,27000,480,18,720000
2024-05-02,Google,Brand_Search,110000,3800,260,30,1100000
2024-05-03,Instagram,Reels_Video_B,200000,45000,600,25,850000
2024-05-03,YouTube,Awareness_Video,300000,80000,300,5,100000
2024-05-04,Instagram,Spring_Sale_A,140000,24000,420,14,600000
2024-05-04,Google,Brand_Search,130000,4200,310,35,1350000
2024-05-05,Facebook,Retargeting_D,80000,12000,150,12,480000
2024-05-05,Instagram,Spring_Sale_A,155000,26000,460,16,680000
2024-05-06,Google,Competitor_Kw,90000,3500,180,8,250000
2024-05-06,Instagram,Reels_Video_B,210000,46000,620,28,920000";

pub fn sample_dashboard_for_today() -> DashboardData {
    sample_dashboard(Local::now().date_naive())
}

/// Synthetic dashboard covering the seven days ending at `today`.
pub fn sample_dashboard(today: NaiveDate) -> DashboardData {
    let mut rng = rand::rng();

    let daily_trend = (0..DEMO_DAYS)
        .map(|offset| {
            let date = today - Duration::days(DEMO_DAYS - 1 - offset);
            let cost: u64 = rng.random_range(300_000..=600_000u64);
            ChartDataPoint {
                date: date.format("%Y-%m-%d").to_string(),
                cost: cost as f64,
                conversions: (cost / rng.random_range(15_000..=25_000u64)) as f64,
                clicks: (cost / rng.random_range(1_000..=3_000u64)) as f64,
                impressions: (cost / rng.random_range(50..=150u64)) as f64,
            }
        })
        .collect();

    let kpis = Kpis {
        spend: KpiMetric::new("총 비용", format!("₩{},000", group_thousands(rng.random_range(250..=450u64))))
            .with_change(format!("+{}%", rng.random_range(5..=20u64)), Trend::Up),
        roas: KpiMetric::new("ROAS", format!("{}%", rng.random_range(280..=420u64)))
            .with_change(format!("+{}%", rng.random_range(2..=10u64)), Trend::Up),
        cpa: KpiMetric::new("CPA", format!("₩{},000", rng.random_range(14..=18u64)))
            .with_change(format!("-{}%", rng.random_range(1..=8u64)), Trend::Down),
        ctr: KpiMetric::new("CTR", format!("{:.1}%", rng.random_range(20..=35u64) as f64 / 10.0))
            .with_change(format!("+0.{}%", rng.random_range(1..=5u64)), Trend::Up),
        conversions: KpiMetric::new("총 전환", rng.random_range(250..=400u64).to_string())
            .with_change(format!("+{}%", rng.random_range(10..=25u64)), Trend::Up),
        clicks: KpiMetric::new("클릭 수", group_thousands(rng.random_range(3_500..=5_000u64)))
            .with_change(format!("+{}%", rng.random_range(5..=15u64)), Trend::Up),
    };

    let mut channel = |name: &str, spend: (u64, u64), roas: (u64, u64), conversions: (u64, u64)| ChannelPerformance {
        name: name.to_string(),
        spend: rng.random_range(spend.0..=spend.1) as f64,
        roas: rng.random_range(roas.0..=roas.1) as f64,
        conversions: rng.random_range(conversions.0..=conversions.1) as f64,
    };
    let channel_performance = vec![
        channel("Instagram", (1_500_000, 2_000_000), (350, 450), (120, 180)),
        channel("Google Search", (1_200_000, 1_800_000), (300, 380), (100, 150)),
        channel("YouTube", (800_000, 1_200_000), (150, 220), (40, 80)),
        channel("Meta (FB)", (600_000, 900_000), (320, 480), (50, 90)),
    ];

    DashboardData {
        kpis,
        daily_trend,
        channel_performance,
        ai_summary: "Instagram 채널의 ROAS가 타 채널 대비 30% 높으며, 주말 기간 CTR 상승이 전체 성과를 견인하고 있습니다. \
                     예산 효율화를 위해 저성과 채널의 비중 조정이 필요합니다."
            .to_string(),
        recommendations: vec![
            "성과가 우수한 Instagram 및 Meta 채널의 일일 예산을 20% 증액하여 매출 규모를 확대하세요.".to_string(),
            "YouTube 광고 소재를 숏폼(Shorts) 위주로 변경하여 클릭률(CTR)을 1.5% 이상으로 개선해보세요.".to_string(),
            "Google Search 광고의 '전환당 비용(CPA)'이 안정적이므로, 롱테일 키워드를 추가 발굴하여 확장을 시도하세요."
                .to_string(),
        ],
    }
}

fn group_thousands(value: u64) -> String {
    let digits = value.to_string();
    let mut grouped = String::with_capacity(digits.len() + digits.len() / 3);
    for (index, ch) in digits.chars().enumerate() {
        if index > 0 && (digits.len() - index) % 3 == 0 {
            grouped.push(',');
        }
        grouped.push(ch);
    }
    grouped
}
