// Chart data domain models
use chrono::NaiveDate;
use serde::Deserialize;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ChartKind {
    Pie,
    Doughnut,
    Line,
    Bar,
}

/// Ordered `(label, value)` pairs for one chart. Replaced wholesale on update.
#[derive(Debug, Clone, PartialEq, Default, Deserialize)]
pub struct ChartSeries {
    #[serde(default)]
    pub labels: Vec<String>,
    #[serde(default)]
    pub data: Vec<f64>,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SeriesProblem {
    Empty,
    LengthMismatch { labels: usize, data: usize },
    NonFinite { index: usize },
}

impl ChartSeries {
    pub fn new(labels: Vec<String>, data: Vec<f64>) -> Self {
        Self { labels, data }
    }

    pub fn from_pairs<L: Into<String>>(pairs: impl IntoIterator<Item = (L, f64)>) -> Self {
        let (labels, data) = pairs.into_iter().map(|(l, v)| (l.into(), v)).unzip();
        Self { labels, data }
    }

    pub fn len(&self) -> usize {
        self.data.len()
    }

    pub fn is_empty(&self) -> bool {
        self.data.is_empty()
    }

    pub fn pairs(&self) -> impl Iterator<Item = (&str, f64)> {
        self.labels.iter().map(String::as_str).zip(self.data.iter().copied())
    }

    pub fn total(&self) -> f64 {
        self.data.iter().sum()
    }

    /// A series is renderable when labels and data line up and every value is finite.
    pub fn validate(&self) -> Result<(), SeriesProblem> {
        if self.labels.is_empty() && self.data.is_empty() {
            return Err(SeriesProblem::Empty);
        }
        if self.labels.len() != self.data.len() {
            return Err(SeriesProblem::LengthMismatch {
                labels: self.labels.len(),
                data: self.data.len(),
            });
        }
        if let Some(index) = self.data.iter().position(|v| !v.is_finite()) {
            return Err(SeriesProblem::NonFinite { index });
        }
        Ok(())
    }
}

/// One bucket of the user growth chart, e.g. `{period: "2024-03", count: 17}`.
#[derive(Debug, Clone, PartialEq, Deserialize)]
pub struct GrowthPoint {
    pub period: String,
    pub count: f64,
}

/// `2024-03` → `Mar 2024`. Periods that are not `YYYY-MM` are shown verbatim.
pub fn growth_label(period: &str) -> String {
    match NaiveDate::parse_from_str(&format!("{}-01", period), "%Y-%m-%d") {
        Ok(date) => date.format("%b %Y").to_string(),
        Err(_) => period.to_string(),
    }
}

pub fn growth_series(points: &[GrowthPoint]) -> ChartSeries {
    ChartSeries::from_pairs(points.iter().map(|p| (growth_label(&p.period), p.count)))
}
