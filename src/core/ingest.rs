//! CSV ingest: raw upload text → [`CsvTable`].
//!
//! Structural problems (no usable header, no data rows) fail the whole ingest.
//! Row problems (bad date, bad amount) only skip that row; every skip is kept
//! on the table with its line number so callers can report it.

use crate::domain::model::{ColumnMapping, CsvTable, Row, SkippedRow};
use crate::utils::error::{PipelineError, Result};
use chrono::{DateTime, NaiveDate, NaiveDateTime, Timelike};
use csv::StringRecord;

const DATE_ALIASES: &[&str] = &["date", "timestamp", "order date", "datetime"];
const AMOUNT_ALIASES: &[&str] = &["sales", "money", "price", "total", "revenue", "amount"];
const CATEGORY_ALIASES: &[&str] = &[
    "coffee_name",
    "menu_name",
    "item",
    "menu",
    "product",
    "category",
    "type",
];
const HOUR_ALIASES: &[&str] = &["hour_of_day", "hour", "time_hour"];
const WEEKDAY_ALIASES: &[&str] = &["day_of_week", "weekday", "day"];

const DATETIME_FORMATS: &[&str] = &[
    "%Y-%m-%d %H:%M:%S",
    "%Y-%m-%dT%H:%M:%S",
    "%Y-%m-%d %H:%M",
    "%Y-%m-%dT%H:%M",
];

pub fn ingest(raw_text: &str) -> Result<CsvTable> {
    let mut reader = csv::ReaderBuilder::new()
        .has_headers(true)
        .flexible(true)
        .trim(csv::Trim::All)
        .from_reader(raw_text.as_bytes());

    let headers = reader
        .headers()
        .map_err(|e| PipelineError::malformed(format!("failed to read CSV header: {}", e)))?
        .clone();

    if headers.iter().all(|h| h.trim().is_empty()) {
        return Err(PipelineError::malformed("CSV is empty"));
    }

    let columns: Vec<String> = headers
        .iter()
        .map(|h| h.trim().trim_start_matches('\u{feff}').trim().to_string())
        .collect();
    let mapping = resolve_columns(&columns)?;

    tracing::debug!(?columns, ?mapping, "resolved CSV columns");

    let mut rows = Vec::new();
    let mut skipped = Vec::new();
    let mut rows_read = 0usize;

    for (idx, result) in reader.records().enumerate() {
        // parser position; blank lines and quoted newlines shift the index
        let fallback_line = idx + 2;
        rows_read += 1;

        let record = match result {
            Ok(record) => record,
            Err(e) => {
                skipped.push(SkippedRow {
                    line: e.position().map_or(fallback_line, |p| p.line() as usize),
                    reason: format!("CSV parse error: {}", e),
                });
                continue;
            }
        };
        let line = record
            .position()
            .map_or(fallback_line, |p| p.line() as usize);

        match parse_row(line, &record, &mapping) {
            Ok(row) => rows.push(row),
            Err(reason) => {
                tracing::debug!(line, %reason, "skipping row");
                skipped.push(SkippedRow { line, reason });
            }
        }
    }

    if rows_read == 0 {
        return Err(PipelineError::malformed("CSV has a header but no data rows"));
    }

    if !skipped.is_empty() {
        tracing::warn!(
            "⚠️ Skipped {} of {} rows with unparsable date or amount",
            skipped.len(),
            rows_read
        );
    }
    tracing::info!("Ingested {} rows ({} skipped)", rows.len(), skipped.len());

    Ok(CsvTable {
        columns,
        mapping,
        rows,
        skipped,
        rows_read,
    })
}

fn normalize_header_name(name: &str) -> String {
    name.trim()
        .trim_start_matches('\u{feff}')
        .trim()
        .to_ascii_lowercase()
        .replace(['_', '-'], " ")
}

/// First alias (in priority order) that names one of the columns.
fn find_column(columns: &[String], aliases: &[&str], taken: &[usize]) -> Option<usize> {
    let normalized: Vec<String> = columns.iter().map(|c| normalize_header_name(c)).collect();
    aliases.iter().find_map(|alias| {
        let alias = normalize_header_name(alias);
        normalized
            .iter()
            .enumerate()
            .find(|(idx, name)| **name == alias && !taken.contains(idx))
            .map(|(idx, _)| idx)
    })
}

fn resolve_columns(columns: &[String]) -> Result<ColumnMapping> {
    let date = find_column(columns, DATE_ALIASES, &[]);
    let amount = find_column(columns, AMOUNT_ALIASES, &date.into_iter().collect::<Vec<_>>());

    let (date, amount) = match (date, amount) {
        (Some(date), Some(amount)) => (date, amount),
        (date, amount) => {
            let mut missing = Vec::new();
            if date.is_none() {
                missing.push("Date");
            }
            if amount.is_none() {
                missing.push("Sales");
            }
            return Err(PipelineError::malformed(format!(
                "missing required columns: {} (found: {})",
                missing.join(", "),
                columns.join(", ")
            )));
        }
    };

    let mut taken = vec![date, amount];
    let hour = find_column(columns, HOUR_ALIASES, &taken);
    taken.extend(hour);
    let weekday = find_column(columns, WEEKDAY_ALIASES, &taken);
    taken.extend(weekday);

    // `Date,<Label>,Sales`: the unnamed middle column is the category
    let category = find_column(columns, CATEGORY_ALIASES, &taken)
        .or_else(|| (columns.len() == 3 && !taken.contains(&1)).then_some(1));

    Ok(ColumnMapping {
        date,
        amount,
        category,
        weekday,
        hour,
    })
}

fn field<'r>(record: &'r StringRecord, idx: usize) -> Option<&'r str> {
    record.get(idx).map(str::trim).filter(|v| !v.is_empty())
}

fn parse_row(
    line: usize,
    record: &StringRecord,
    mapping: &ColumnMapping,
) -> std::result::Result<Row, String> {
    let raw_date = field(record, mapping.date).ok_or("missing date")?;
    let (date, time_hour) =
        parse_date(raw_date).ok_or_else(|| format!("unparsable date '{}'", raw_date))?;

    let raw_amount = field(record, mapping.amount).ok_or("missing amount")?;
    let amount = parse_amount(raw_amount)?;

    let category = mapping
        .category
        .and_then(|idx| field(record, idx))
        .map(str::to_string);
    let weekday = mapping
        .weekday
        .and_then(|idx| field(record, idx))
        .map(str::to_string);
    let hour = match mapping.hour {
        Some(idx) => field(record, idx).and_then(parse_hour),
        None => time_hour,
    };

    Ok(Row {
        line,
        date,
        category,
        amount,
        weekday,
        hour,
    })
}

/// Calendar date, plus the hour when the field carries a time part.
fn parse_date(value: &str) -> Option<(NaiveDate, Option<u32>)> {
    if let Ok(date) = NaiveDate::parse_from_str(value, "%Y-%m-%d") {
        return Some((date, None));
    }

    for format in DATETIME_FORMATS {
        if let Ok(dt) = NaiveDateTime::parse_from_str(value, format) {
            return Some((dt.date(), Some(dt.hour())));
        }
    }

    DateTime::parse_from_rfc3339(value)
        .ok()
        .map(|dt| (dt.date_naive(), Some(dt.hour())))
}

fn parse_amount(value: &str) -> std::result::Result<f64, String> {
    let cleaned = value.replace([',', '"'], "");
    let amount: f64 = cleaned
        .trim()
        .parse()
        .map_err(|_| format!("unparsable amount '{}'", value))?;

    if !amount.is_finite() {
        return Err(format!("amount '{}' is not a finite number", value));
    }
    if amount < 0.0 {
        return Err(format!("amount '{}' is negative", value));
    }
    Ok(amount)
}

/// `14`, `14.0` or `14:30` → 14. Anything outside 0..=23 is dropped.
fn parse_hour(value: &str) -> Option<u32> {
    let head = value.split(':').next()?.trim();
    let hour: f64 = head.parse().ok()?;
    if hour.fract() != 0.0 || !(0.0..=23.0).contains(&hour) {
        return None;
    }
    Some(hour as u32)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_minimal_three_column_upload() {
        let csv = "Date,Product,Sales\n2024-01-15,A,15000\n2024-02-15,B,18000\n";
        let table = ingest(csv).unwrap();

        assert_eq!(table.len(), 2);
        assert_eq!(table.skipped_count(), 0);
        assert_eq!(table.category_column(), Some("Product"));
        assert_eq!(table.rows[1].category.as_deref(), Some("B"));
        assert_eq!(table.rows[0].amount, 15000.0);
    }

    #[test]
    fn test_unnamed_middle_column_is_category() {
        let csv = "Date,Flavour,Sales\n2024-01-15,Mocha,10\n";
        let table = ingest(csv).unwrap();
        assert_eq!(table.mapping.category, Some(1));
        assert_eq!(table.rows[0].category.as_deref(), Some("Mocha"));
    }

    #[test]
    fn test_bad_rows_are_skipped_and_reported() {
        let csv = "Date,Product,Sales\n\
                   2024-01-15,A,100\n\
                   not-a-date,A,200\n\
                   2024-01-17,A,abc\n\
                   2024-01-18,A,-5\n\
                   2024-01-19,A,300\n";
        let table = ingest(csv).unwrap();

        assert_eq!(table.rows_read, 5);
        assert_eq!(table.len(), 2);
        assert_eq!(table.skipped_count(), 3);
        assert_eq!(table.len(), table.rows_read - table.skipped_count());
        assert_eq!(table.skipped[0].line, 3);
        assert!(table.skipped[0].reason.contains("date"));
        assert!(table.skipped[1].reason.contains("amount"));
    }

    #[test]
    fn test_skipped_line_survives_blank_line() {
        let csv = "Date,Product,Sales\n2024-01-01,A,1\n\n2024-01-03,A,bad\n";
        let table = ingest(csv).unwrap();

        assert_eq!(table.len(), 1);
        assert_eq!(table.skipped_count(), 1);
        assert_eq!(table.skipped[0].line, 4);
    }

    #[test]
    fn test_skipped_line_survives_multiline_field() {
        let csv = "Date,Product,Sales\n2024-01-01,\"A\nB\",1\n2024-01-03,A,bad\n";
        let table = ingest(csv).unwrap();

        assert_eq!(table.rows[0].category.as_deref(), Some("A\nB"));
        assert_eq!(table.rows[0].line, 2);
        assert_eq!(table.skipped[0].line, 4);
    }

    #[test]
    fn test_header_only_is_malformed() {
        let err = ingest("Date,Product,Sales\n").unwrap_err();
        assert!(matches!(err, PipelineError::MalformedInput { .. }));
    }

    #[test]
    fn test_empty_input_is_malformed() {
        let err = ingest("").unwrap_err();
        assert!(matches!(err, PipelineError::MalformedInput { .. }));
    }

    #[test]
    fn test_missing_amount_column_is_malformed() {
        let err = ingest("Date,Product,Notes\n2024-01-01,A,x\n").unwrap_err();
        match err {
            PipelineError::MalformedInput { message } => assert!(message.contains("Sales")),
            other => panic!("unexpected error: {other:?}"),
        }
    }

    #[test]
    fn test_aliases_bom_and_whitespace() {
        let csv = "\u{feff} Order Date ,coffee_name, money ,hour_of_day\n\
                   2024-03-01 , Latte ,\"1,250.50\", 9\n";
        let table = ingest(csv).unwrap();

        let row = &table.rows[0];
        assert_eq!(row.date, NaiveDate::from_ymd_opt(2024, 3, 1).unwrap());
        assert_eq!(row.category.as_deref(), Some("Latte"));
        assert_eq!(row.amount, 1250.5);
        assert_eq!(row.hour, Some(9));
        assert_eq!(table.hour_column(), Some("hour_of_day"));
    }

    #[test]
    fn test_named_dimension_columns_win_over_derivation() {
        let csv = "datetime,item,total,weekday,hour\n\
                   2024-03-04 18:45:00,Espresso,3.5,Funday,7\n";
        let table = ingest(csv).unwrap();
        let row = &table.rows[0];
        assert_eq!(row.weekday.as_deref(), Some("Funday"));
        assert_eq!(row.hour, Some(7));
    }

    #[test]
    fn test_timestamp_supplies_hour_without_hour_column() {
        let csv = "timestamp,item,total\n2024-03-04T18:45:00,Espresso,3.5\n";
        let table = ingest(csv).unwrap();
        assert_eq!(table.rows[0].hour, Some(18));
        assert!(table.hour_column().is_none());
    }

    #[test]
    fn test_parse_hour_variants() {
        assert_eq!(parse_hour("14"), Some(14));
        assert_eq!(parse_hour("14.0"), Some(14));
        assert_eq!(parse_hour("08:30"), Some(8));
        assert_eq!(parse_hour("24"), None);
        assert_eq!(parse_hour("noon"), None);
    }
}
