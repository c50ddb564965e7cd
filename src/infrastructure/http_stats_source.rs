// HTTP stats source - form-encoded POSTs to the dashboard endpoint
use crate::application::stats_source::{FetchError, StatsSource};
use crate::domain::chart::GrowthPoint;
use crate::domain::stats::{DashboardStats, PayloadProblem};
use async_trait::async_trait;
use serde_json::Value;
use std::time::Duration;

#[derive(Debug, Clone)]
pub struct HttpStatsSource {
    client: reqwest::Client,
    endpoint: String,
    timeout: Duration,
}

impl HttpStatsSource {
    pub fn new(endpoint: &str, timeout: Duration) -> Self {
        Self {
            client: reqwest::Client::new(),
            endpoint: endpoint.trim_end_matches('/').to_string(),
            timeout,
        }
    }

    pub fn endpoint(&self) -> &str {
        &self.endpoint
    }

    fn build_form(params: &[(&str, &str)]) -> String {
        params
            .iter()
            .map(|(k, v)| format!("{}={}", urlencoding::encode(k), urlencoding::encode(v)))
            .collect::<Vec<_>>()
            .join("&")
    }

    async fn post(&self, params: &[(&str, &str)]) -> Result<Value, FetchError> {
        let response = self
            .client
            .post(&self.endpoint)
            .header("Content-Type", "application/x-www-form-urlencoded")
            .header("X-Requested-With", "XMLHttpRequest")
            .header("Accept", "application/json")
            .timeout(self.timeout)
            .body(Self::build_form(params))
            .send()
            .await
            .map_err(transport_error)?;

        let status = response.status();
        if !status.is_success() {
            tracing::warn!("Dashboard endpoint {} answered {}", self.endpoint, status);
            return Err(FetchError::from_status(status.as_u16()));
        }

        let body = response.text().await.map_err(transport_error)?;
        serde_json::from_str(&body).map_err(|e| FetchError::Malformed(e.to_string()))
    }
}

fn transport_error(e: reqwest::Error) -> FetchError {
    if e.is_timeout() {
        FetchError::TimedOut
    } else {
        FetchError::Transport(e.to_string())
    }
}

fn payload_error(problem: PayloadProblem) -> FetchError {
    match problem {
        PayloadProblem::NotAnObject => FetchError::Malformed("expected a JSON object".to_string()),
        PayloadProblem::Rejected(message) => FetchError::Rejected(message),
    }
}

/// `getUserGrowth` body. Some servers double-encode `growthData` as a JSON
/// string; one that does not parse yields an empty series.
pub fn parse_growth(body: &Value) -> Result<Vec<GrowthPoint>, FetchError> {
    let object = body
        .as_object()
        .ok_or_else(|| FetchError::Malformed("expected a JSON object".to_string()))?;

    if let Some(Value::Bool(false)) = object.get("success") {
        let message = object
            .get("error")
            .and_then(Value::as_str)
            .unwrap_or("Unknown error");
        return Err(FetchError::Rejected(message.to_string()));
    }

    match object.get("growthData") {
        None | Some(Value::Null) => Ok(Vec::new()),
        Some(Value::String(raw)) => Ok(serde_json::from_str(raw).unwrap_or_else(|e| {
            tracing::warn!("Unparseable growth data, showing empty chart: {}", e);
            Vec::new()
        })),
        Some(data) => {
            serde_json::from_value(data.clone()).map_err(|e| FetchError::Malformed(e.to_string()))
        }
    }
}

#[async_trait]
impl StatsSource for HttpStatsSource {
    async fn refresh_stats(&self) -> Result<DashboardStats, FetchError> {
        let body = self.post(&[("action", "refreshStats")]).await?;
        DashboardStats::from_json(&body).map_err(payload_error)
    }

    async fn user_growth(&self, period: &str) -> Result<Vec<GrowthPoint>, FetchError> {
        tracing::debug!("Requesting user growth for {}", period);
        let body = self
            .post(&[("action", "getUserGrowth"), ("period", period)])
            .await?;
        parse_growth(&body)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_form_encoding() {
        assert_eq!(
            HttpStatsSource::build_form(&[("action", "getUserGrowth"), ("period", "6 months&more")]),
            "action=getUserGrowth&period=6%20months%26more"
        );
    }

    #[test]
    fn test_endpoint_trailing_slash_trimmed() {
        let source = HttpStatsSource::new("http://cafe.local/admin/dashboard/", Duration::from_secs(1));
        assert_eq!(source.endpoint(), "http://cafe.local/admin/dashboard");
    }

    #[test]
    fn test_growth_as_array() {
        let points = parse_growth(&json!({
            "success": true,
            "growthData": [{"period": "2024-01", "count": 4}, {"period": "2024-02", "count": 9}]
        }))
        .unwrap();
        assert_eq!(points.len(), 2);
        assert_eq!(points[1].count, 9.0);
    }

    #[test]
    fn test_growth_as_encoded_string() {
        let points = parse_growth(&json!({
            "success": true,
            "growthData": "[{\"period\": \"2024-03\", \"count\": 2}]"
        }))
        .unwrap();
        assert_eq!(points[0].period, "2024-03");
    }

    #[test]
    fn test_unparseable_growth_string_is_empty() {
        let points = parse_growth(&json!({"success": true, "growthData": "not json"})).unwrap();
        assert!(points.is_empty());
    }

    #[test]
    fn test_growth_rejected() {
        assert_eq!(
            parse_growth(&json!({"success": false, "error": "forbidden"})),
            Err(FetchError::Rejected("forbidden".into()))
        );
        assert!(matches!(
            parse_growth(&json!({"growthData": 3})),
            Err(FetchError::Malformed(_))
        ));
    }
}
