//! Download formats for a finished run.

use crate::domain::model::{Forecast, PipelineResult};
use crate::utils::error::Result;

pub const EXPORT_HEADER: &str = "Date,Sales,Type";

/// `Date,Sales,Type` CSV, one line per point, sales rounded to whole units.
pub fn format(forecast: &Forecast) -> String {
    let mut csv_lines = vec![EXPORT_HEADER.to_string()];

    for point in &forecast.points {
        csv_lines.push(format!(
            "{},{},{}",
            point.date.format("%Y-%m-%d"),
            point.amount.round() as i64,
            if point.is_predicted { "Predicted" } else { "Actual" }
        ));
    }

    let mut output = csv_lines.join("\n");
    output.push('\n');
    output
}

/// Pretty JSON with the chart series, stats, summaries and run notes.
pub fn format_json(result: &PipelineResult) -> Result<String> {
    let document = serde_json::json!({
        "forecast": result.chart_series(),
        "stats": {
            "total": result.forecast.stats.total,
            "average": result.forecast.stats.rounded_average(),
            "growth_percent": result.forecast.stats.growth_percent(),
        },
        "summaries": &result.summaries,
        "rows_read": result.rows_read,
        "skipped_rows": result.skipped_rows,
        "notes": &result.notes,
    });
    Ok(serde_json::to_string_pretty(&document)?)
}
