//! Trend-extrapolation forecast.
//!
//! The growth rate compares the last observed amount to the mean of all
//! observations; every future month gets the same value,
//! `last * (1 + growth_rate)`. Growth is not compounded across steps.

use crate::domain::model::{CsvTable, Forecast, ForecastPoint, TrendStats};
use crate::utils::error::{PipelineError, Result};
use chrono::{Months, NaiveDate};

pub const DEFAULT_HORIZON: usize = 5;

#[derive(Debug, Clone, Copy)]
pub struct ForecastEngine {
    horizon: usize,
}

impl Default for ForecastEngine {
    fn default() -> Self {
        Self::new(DEFAULT_HORIZON)
    }
}

impl ForecastEngine {
    pub fn new(horizon: usize) -> Self {
        Self { horizon }
    }

    pub fn horizon(&self) -> usize {
        self.horizon
    }

    /// Historical rows in table order followed by `horizon` monthly predictions
    /// starting one month after `reference_date`.
    pub fn forecast(&self, table: &CsvTable, reference_date: NaiveDate) -> Result<Forecast> {
        let stats = trend_stats(table)?;
        let predicted_amount = stats.last * (1.0 + stats.growth_rate);

        let mut points: Vec<ForecastPoint> = table
            .rows
            .iter()
            .map(|row| ForecastPoint {
                date: row.date,
                amount: row.amount,
                is_predicted: false,
            })
            .collect();

        for step in 1..=self.horizon {
            points.push(ForecastPoint {
                date: month_offset(reference_date, step)?,
                amount: predicted_amount,
                is_predicted: true,
            });
        }

        tracing::debug!(
            average = stats.average,
            last = stats.last,
            growth_rate = stats.growth_rate,
            "forecast {} months ahead at {:.2}",
            self.horizon,
            predicted_amount
        );

        Ok(Forecast {
            reference_date,
            horizon: self.horizon,
            points,
            stats,
        })
    }
}

/// Aggregate statistics behind the forecast. "Last" is the last row in upload
/// order, not the latest date.
pub fn trend_stats(table: &CsvTable) -> Result<TrendStats> {
    let last = table.rows.last().map(|row| row.amount).ok_or_else(|| {
        PipelineError::insufficient("no valid rows to forecast from")
    })?;

    let count = table.len();
    let total: f64 = table.rows.iter().map(|row| row.amount).sum();
    let average = total / count as f64;

    let (growth_rate, note) = match growth_rate(last, average) {
        Ok(rate) => (rate, None),
        Err(err) => {
            tracing::warn!("⚠️ {}", err);
            (0.0, Some(err.to_string()))
        }
    };

    Ok(TrendStats {
        count,
        total,
        average,
        last,
        growth_rate,
        note,
    })
}

fn growth_rate(last: f64, average: f64) -> Result<f64> {
    if average == 0.0 {
        return Err(PipelineError::DegenerateAverage);
    }
    Ok((last - average) / average)
}

/// Adds whole calendar months, clamping to the end of shorter months
/// (Jan 31 + 1 month = Feb 28/29).
fn month_offset(base: NaiveDate, months: usize) -> Result<NaiveDate> {
    u32::try_from(months)
        .ok()
        .and_then(|m| base.checked_add_months(Months::new(m)))
        .ok_or_else(|| {
            PipelineError::insufficient(format!(
                "cannot place a forecast {} months after {}",
                months, base
            ))
        })
}
