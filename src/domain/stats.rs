// Dashboard statistics domain models
use serde_json::Value;
use std::collections::HashMap;

/// A single statistic as delivered by the server.
#[derive(Debug, Clone, PartialEq)]
pub enum StatValue {
    Number(f64),
    Text(String),
}

impl StatValue {
    /// Integer view of the value, floor-rounded. Text values are parsed the
    /// same way a displayed value is.
    pub fn as_integer(&self) -> Option<i64> {
        match self {
            StatValue::Number(n) if n.is_finite() => Some(n.floor() as i64),
            StatValue::Number(_) => None,
            StatValue::Text(s) => crate::domain::format::parse_displayed_integer(s),
        }
    }

    pub fn as_f64(&self) -> Option<f64> {
        match self {
            StatValue::Number(n) => Some(*n),
            StatValue::Text(s) => s.trim().parse().ok(),
        }
    }
}

/// Flat mapping from stat key (`todayOrders`, `todayRevenue`, ...) to value.
/// Lives only for the duration of one refresh cycle.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct DashboardStats {
    values: HashMap<String, StatValue>,
}

/// Why a stats payload could not be turned into [`DashboardStats`].
#[derive(Debug, Clone, PartialEq)]
pub enum PayloadProblem {
    NotAnObject,
    Rejected(String),
}

impl DashboardStats {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with(mut self, key: &str, value: StatValue) -> Self {
        self.values.insert(key.to_string(), value);
        self
    }

    pub fn insert(&mut self, key: impl Into<String>, value: StatValue) {
        self.values.insert(key.into(), value);
    }

    pub fn get(&self, key: &str) -> Option<&StatValue> {
        self.values.get(key)
    }

    pub fn len(&self) -> usize {
        self.values.len()
    }

    pub fn is_empty(&self) -> bool {
        self.values.is_empty()
    }

    pub fn keys(&self) -> impl Iterator<Item = &str> {
        self.values.keys().map(String::as_str)
    }

    /// Parse a `refreshStats` response body.
    ///
    /// `success: false` is a rejection carrying the server's `error` text.
    /// A missing `success` key counts as success since some dashboards never
    /// send it. Nested arrays and objects are not stats and are ignored.
    pub fn from_json(value: &Value) -> Result<Self, PayloadProblem> {
        let object = value.as_object().ok_or(PayloadProblem::NotAnObject)?;

        if let Some(Value::Bool(false)) = object.get("success") {
            let message = object
                .get("error")
                .and_then(Value::as_str)
                .unwrap_or("Unknown error")
                .to_string();
            return Err(PayloadProblem::Rejected(message));
        }

        let mut stats = DashboardStats::new();
        for (key, raw) in object {
            if key == "success" || key == "error" {
                continue;
            }
            match raw {
                Value::Number(n) => {
                    if let Some(n) = n.as_f64() {
                        stats.insert(key.clone(), StatValue::Number(n));
                    }
                }
                Value::String(s) => stats.insert(key.clone(), StatValue::Text(s.clone())),
                _ => {}
            }
        }
        Ok(stats)
    }
}
