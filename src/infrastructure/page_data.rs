// Server-rendered page snapshot (initial stats, chart series, OTP state)
use crate::domain::chart::{ChartSeries, GrowthPoint};
use crate::domain::stats::DashboardStats;
use anyhow::Context;
use serde::Deserialize;
use serde_json::Value;
use std::collections::HashMap;
use std::path::Path;

/// Read once at page load and never written back.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PageData {
    #[serde(default)]
    pub stats: serde_json::Map<String, Value>,
    #[serde(default)]
    pub charts: HashMap<String, ChartSeries>,
    #[serde(default)]
    pub growth_data: Vec<GrowthPoint>,
    #[serde(default)]
    pub growth_period: Option<String>,
    #[serde(default)]
    pub otp: Option<OtpPageData>,
}

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct OtpPageData {
    /// Minutes left on the code, as the server renders it.
    #[serde(default)]
    pub remaining_time: Option<f64>,
    #[serde(default)]
    pub initial_otp_code: Option<String>,
}

impl PageData {
    pub fn initial_stats(&self) -> DashboardStats {
        DashboardStats::from_json(&Value::Object(self.stats.clone())).unwrap_or_default()
    }
}

pub fn load_page_data(path: &Path) -> anyhow::Result<PageData> {
    let raw = std::fs::read_to_string(path)
        .with_context(|| format!("Failed to read page data {}", path.display()))?;
    serde_json::from_str(&raw).context("Failed to parse page data")
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::stats::StatValue;

    #[test]
    fn test_parse_page_data() {
        let page: PageData = serde_json::from_str(
            r#"{
                "stats": {"todayOrders": 10, "completedOrders": 4},
                "charts": {"orderStatus": {"labels": ["Pending", "Ready"], "data": [2, 3]}},
                "growthData": [{"period": "2024-01", "count": 5}],
                "otp": {"remainingTime": 5, "initialOtpCode": "12"}
            }"#,
        )
        .unwrap();

        assert_eq!(
            page.initial_stats().get("todayOrders"),
            Some(&StatValue::Number(10.0))
        );
        assert_eq!(page.charts["orderStatus"].data, vec![2.0, 3.0]);
        assert_eq!(page.growth_data.len(), 1);
        let otp = page.otp.unwrap();
        assert_eq!(otp.remaining_time, Some(5.0));
        assert_eq!(otp.initial_otp_code.as_deref(), Some("12"));
    }

    #[test]
    fn test_empty_page_data() {
        let page: PageData = serde_json::from_str("{}").unwrap();
        assert!(page.initial_stats().is_empty());
        assert!(page.otp.is_none());
    }
}
