//! Best/worst insights per categorical dimension.
//!
//! Dimensions live in a registry of [`DimensionSpec`] entries (name, label
//! extractor, metric, availability check). Each one is computed on its own: a
//! dimension that cannot be computed turns into an `info` note and the others
//! are unaffected.

use crate::domain::model::{CsvTable, Row, Summaries, SummaryInsight};
use crate::domain::ports::Summarizer;
use crate::utils::error::{PipelineError, Result};
use chrono::{Datelike, NaiveDate};
use std::collections::HashMap;

pub const MENU: &str = "menu";
pub const DAY_OF_WEEK: &str = "day_of_week";
pub const HOUR_OF_DAY: &str = "hour_of_day";

const WEEKDAY_LABELS: [&str; 7] = ["Mon", "Tue", "Wed", "Thu", "Fri", "Sat", "Sun"];

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Metric {
    /// Cumulative revenue per label.
    Sum,
    /// Typical amount per label, for buckets that recur across the dataset.
    Mean,
}

pub type LabelExtractor = fn(&CsvTable, &Row) -> Option<String>;

/// `Ok(Some(note))` adds an informational note to a computed insight;
/// `Err` makes the dimension unavailable.
pub type AvailabilityCheck = fn(&CsvTable) -> Result<Option<String>>;

#[derive(Clone)]
pub struct DimensionSpec {
    pub name: &'static str,
    pub metric: Metric,
    pub label: LabelExtractor,
    pub availability: AvailabilityCheck,
}

impl std::fmt::Debug for DimensionSpec {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("DimensionSpec")
            .field("name", &self.name)
            .field("metric", &self.metric)
            .finish()
    }
}

#[derive(Debug, Clone)]
pub struct InsightSummarizer {
    dimensions: Vec<DimensionSpec>,
}

impl Default for InsightSummarizer {
    fn default() -> Self {
        Self {
            dimensions: vec![menu_dimension(), day_of_week_dimension(), hour_of_day_dimension()],
        }
    }
}

impl InsightSummarizer {
    pub fn empty() -> Self {
        Self {
            dimensions: Vec::new(),
        }
    }

    /// Registers a dimension, replacing any existing one with the same name.
    pub fn with_dimension(mut self, spec: DimensionSpec) -> Self {
        self.dimensions.retain(|d| d.name != spec.name);
        self.dimensions.push(spec);
        self
    }

    pub fn summarize_table(&self, table: &CsvTable) -> Summaries {
        let mut summaries = Summaries::default();

        for spec in &self.dimensions {
            let insight = summarize_dimension(table, spec).unwrap_or_else(|err| {
                tracing::debug!(dimension = spec.name, "dimension unavailable: {}", err);
                let info = match err {
                    PipelineError::DimensionUnavailable { reason, .. } => reason,
                    other => other.to_string(),
                };
                SummaryInsight::unavailable(spec.name, info)
            });
            summaries.insert(insight);
        }

        summaries
    }
}

impl Summarizer for InsightSummarizer {
    fn summarize(&self, table: &CsvTable) -> Result<Summaries> {
        Ok(self.summarize_table(table))
    }

    fn dimension_names(&self) -> Vec<String> {
        self.dimensions.iter().map(|d| d.name.to_string()).collect()
    }
}

struct Group {
    label: String,
    total: f64,
    count: usize,
}

fn summarize_dimension(table: &CsvTable, spec: &DimensionSpec) -> Result<SummaryInsight> {
    let note = (spec.availability)(table)?;

    // first-seen order keeps tie-breaking deterministic
    let mut groups: Vec<Group> = Vec::new();
    let mut index: HashMap<String, usize> = HashMap::new();
    for row in &table.rows {
        let Some(label) = (spec.label)(table, row) else {
            continue;
        };
        let slot = *index.entry(label.clone()).or_insert_with(|| {
            groups.push(Group {
                label,
                total: 0.0,
                count: 0,
            });
            groups.len() - 1
        });
        groups[slot].total += row.amount;
        groups[slot].count += 1;
    }

    if groups.is_empty() {
        return Err(PipelineError::dimension_unavailable(
            spec.name,
            format!("no usable {} values in the uploaded rows", spec.name),
        ));
    }

    if groups.len() < 2 {
        return Ok(SummaryInsight {
            dimension: spec.name.to_string(),
            info: Some(format!(
                "only one distinct {} value ('{}'); at least two are needed for a best/worst comparison",
                spec.name, groups[0].label
            )),
            ..Default::default()
        });
    }

    let metric = |g: &Group| match spec.metric {
        Metric::Sum => g.total,
        Metric::Mean => g.total / g.count as f64,
    };

    let mut best = &groups[0];
    let mut worst = &groups[0];
    for group in &groups[1..] {
        if metric(group) > metric(best) {
            best = group;
        }
        if metric(group) < metric(worst) {
            worst = group;
        }
    }

    Ok(SummaryInsight {
        dimension: spec.name.to_string(),
        best_label: Some(best.label.clone()),
        best_metric: Some(metric(best)),
        worst_label: Some(worst.label.clone()),
        worst_metric: Some(metric(worst)),
        info: note,
    })
}

pub fn weekday_label(date: NaiveDate) -> &'static str {
    WEEKDAY_LABELS[date.weekday().num_days_from_monday() as usize]
}

pub fn menu_dimension() -> DimensionSpec {
    DimensionSpec {
        name: MENU,
        metric: Metric::Sum,
        label: |_, row| row.category.clone(),
        availability: |table| match table.category_column() {
            Some(_) => Ok(None),
            None => Err(PipelineError::dimension_unavailable(
                MENU,
                "CSV contains no menu/category column.",
            )),
        },
    }
}

pub fn day_of_week_dimension() -> DimensionSpec {
    DimensionSpec {
        name: DAY_OF_WEEK,
        metric: Metric::Mean,
        label: |table, row| {
            if table.mapping.weekday.is_some() {
                row.weekday.clone()
            } else {
                Some(weekday_label(row.date).to_string())
            }
        },
        availability: |table| {
            Ok(table
                .weekday_column()
                .map(|column| format!("Day of week taken from '{}' column.", column)))
        },
    }
}

pub fn hour_of_day_dimension() -> DimensionSpec {
    DimensionSpec {
        name: HOUR_OF_DAY,
        metric: Metric::Mean,
        label: |_, row| row.hour.map(|h| format!("{:02}:00", h)),
        availability: |table| {
            if let Some(column) = table.hour_column() {
                Ok(Some(format!("Hourly sales generated from '{}' column.", column)))
            } else if table.rows.iter().any(|row| row.hour.is_some()) {
                Ok(Some("Hourly sales derived from timestamps in the date column.".to_string()))
            } else {
                Err(PipelineError::dimension_unavailable(
                    HOUR_OF_DAY,
                    "CSV contains no hour_of_day column.",
                ))
            }
        },
    }
}
