use chrono::NaiveDate;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

/// One accepted observation from the upload.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Row {
    /// 1-based line number in the source CSV (header is line 1).
    pub line: usize,
    pub date: NaiveDate,
    pub category: Option<String>,
    pub amount: f64,
    /// Day-of-week label taken from a named column, if the upload has one.
    pub weekday: Option<String>,
    /// Hour of day from a named column, or from the time part of the date field.
    pub hour: Option<u32>,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct SkippedRow {
    pub line: usize,
    pub reason: String,
}

/// Header positions resolved by the ingestor.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct ColumnMapping {
    pub date: usize,
    pub amount: usize,
    pub category: Option<usize>,
    pub weekday: Option<usize>,
    pub hour: Option<usize>,
}

#[derive(Debug, Clone, Serialize)]
pub struct CsvTable {
    pub columns: Vec<String>,
    pub mapping: ColumnMapping,
    pub rows: Vec<Row>,
    pub skipped: Vec<SkippedRow>,
    pub rows_read: usize,
}

impl CsvTable {
    pub fn len(&self) -> usize {
        self.rows.len()
    }

    pub fn is_empty(&self) -> bool {
        self.rows.is_empty()
    }

    pub fn skipped_count(&self) -> usize {
        self.skipped.len()
    }

    pub fn category_column(&self) -> Option<&str> {
        self.mapping
            .category
            .and_then(|idx| self.columns.get(idx))
            .map(String::as_str)
    }

    pub fn weekday_column(&self) -> Option<&str> {
        self.mapping
            .weekday
            .and_then(|idx| self.columns.get(idx))
            .map(String::as_str)
    }

    pub fn hour_column(&self) -> Option<&str> {
        self.mapping
            .hour
            .and_then(|idx| self.columns.get(idx))
            .map(String::as_str)
    }
}

/// A point of the combined series, in the `{date, sales, predicted}` shape
/// consumed by charting front-ends.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ForecastPoint {
    pub date: NaiveDate,
    #[serde(rename = "sales")]
    pub amount: f64,
    #[serde(rename = "predicted")]
    pub is_predicted: bool,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct TrendStats {
    pub count: usize,
    pub total: f64,
    pub average: f64,
    pub last: f64,
    pub growth_rate: f64,
    /// Set when the average was zero and the growth rate fell back to 0.
    pub note: Option<String>,
}

impl TrendStats {
    pub fn growth_percent(&self) -> i64 {
        (self.growth_rate * 100.0).round() as i64
    }

    pub fn rounded_average(&self) -> i64 {
        self.average.round() as i64
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Forecast {
    pub reference_date: NaiveDate,
    pub horizon: usize,
    pub points: Vec<ForecastPoint>,
    pub stats: TrendStats,
}

impl Forecast {
    pub fn historical(&self) -> impl Iterator<Item = &ForecastPoint> {
        self.points.iter().filter(|p| !p.is_predicted)
    }

    pub fn predicted(&self) -> impl Iterator<Item = &ForecastPoint> {
        self.points.iter().filter(|p| p.is_predicted)
    }
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct SummaryInsight {
    pub dimension: String,
    pub best_label: Option<String>,
    pub best_metric: Option<f64>,
    pub worst_label: Option<String>,
    pub worst_metric: Option<f64>,
    pub info: Option<String>,
}

impl SummaryInsight {
    pub fn unavailable(dimension: &str, info: impl Into<String>) -> Self {
        Self {
            dimension: dimension.to_string(),
            info: Some(info.into()),
            ..Default::default()
        }
    }

    pub fn is_available(&self) -> bool {
        self.best_label.is_some() && self.worst_label.is_some()
    }
}

/// Per-dimension insights keyed by dimension name.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Summaries(pub BTreeMap<String, SummaryInsight>);

impl Summaries {
    pub fn insert(&mut self, insight: SummaryInsight) {
        self.0.insert(insight.dimension.clone(), insight);
    }

    pub fn get(&self, dimension: &str) -> Option<&SummaryInsight> {
        self.0.get(dimension)
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = &SummaryInsight> {
        self.0.values()
    }

    /// One "insights unavailable" entry per dimension, used when the whole
    /// summarization stage failed.
    pub fn placeholder<I, D>(dimensions: I, reason: &str) -> Self
    where
        I: IntoIterator<Item = D>,
        D: AsRef<str>,
    {
        let mut summaries = Self::default();
        for dimension in dimensions {
            summaries.insert(SummaryInsight::unavailable(
                dimension.as_ref(),
                format!("Insights unavailable: {}", reason),
            ));
        }
        summaries
    }
}

/// Result of one pipeline stage.
#[derive(Debug, Clone, PartialEq)]
pub enum StageOutcome<T> {
    Complete(T),
    /// Usable value with recovered problems attached.
    Partial { value: T, notes: Vec<String> },
    Failed(String),
}

impl<T> StageOutcome<T> {
    pub fn is_failed(&self) -> bool {
        matches!(self, Self::Failed(_))
    }

    pub fn notes(&self) -> Vec<String> {
        match self {
            Self::Complete(_) => Vec::new(),
            Self::Partial { notes, .. } => notes.clone(),
            Self::Failed(reason) => vec![reason.clone()],
        }
    }

    pub fn value(self) -> Option<T> {
        match self {
            Self::Complete(value) | Self::Partial { value, .. } => Some(value),
            Self::Failed(_) => None,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub enum RunState {
    Idle,
    Ingesting,
    Forecasting,
    Summarizing,
    Done,
    Failed,
}

impl RunState {
    pub fn can_transition_to(self, next: RunState) -> bool {
        use RunState::*;
        matches!(
            (self, next),
            (Idle, Ingesting)
                | (Ingesting, Forecasting)
                | (Ingesting, Failed)
                | (Forecasting, Summarizing)
                | (Forecasting, Failed)
                | (Summarizing, Done)
        )
    }
}

/// Chart-ready point: ISO date string and sales rounded to whole units.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ChartPoint {
    pub date: String,
    pub sales: i64,
    pub predicted: bool,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct PipelineResult {
    pub forecast: Forecast,
    pub summaries: Summaries,
    pub rows_read: usize,
    pub skipped_rows: usize,
    /// Recovered problems (degenerate average, summary failures) in plain text.
    pub notes: Vec<String>,
    pub states: Vec<RunState>,
}

impl PipelineResult {
    pub fn chart_series(&self) -> Vec<ChartPoint> {
        self.forecast
            .points
            .iter()
            .map(|p| ChartPoint {
                date: p.date.format("%Y-%m-%d").to_string(),
                sales: p.amount.round() as i64,
                predicted: p.is_predicted,
            })
            .collect()
    }

    pub fn final_state(&self) -> RunState {
        self.states.last().copied().unwrap_or(RunState::Idle)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_state_machine_edges() {
        assert!(RunState::Idle.can_transition_to(RunState::Ingesting));
        assert!(RunState::Ingesting.can_transition_to(RunState::Failed));
        assert!(RunState::Forecasting.can_transition_to(RunState::Failed));
        assert!(RunState::Summarizing.can_transition_to(RunState::Done));
        assert!(!RunState::Summarizing.can_transition_to(RunState::Failed));
        assert!(!RunState::Idle.can_transition_to(RunState::Done));

        // Done and Failed have no way out
        use RunState::*;
        for end in [Done, Failed] {
            for next in [Idle, Ingesting, Forecasting, Summarizing, Done, Failed] {
                assert!(!end.can_transition_to(next));
            }
        }
    }

    #[test]
    fn test_forecast_point_serializes_in_chart_shape() {
        let point = ForecastPoint {
            date: NaiveDate::from_ymd_opt(2024, 1, 15).unwrap(),
            amount: 15000.0,
            is_predicted: false,
        };
        let json = serde_json::to_value(&point).unwrap();
        assert_eq!(
            json,
            serde_json::json!({"date": "2024-01-15", "sales": 15000.0, "predicted": false})
        );
    }

    #[test]
    fn test_placeholder_summaries_cover_every_dimension() {
        let summaries = Summaries::placeholder(&["menu", "hour_of_day"], "service down");
        assert_eq!(summaries.len(), 2);
        let menu = summaries.get("menu").unwrap();
        assert!(!menu.is_available());
        assert!(menu.info.as_deref().unwrap().contains("service down"));
    }
}
