//! Ingest → forecast → summarize, composed into one [`PipelineResult`].
//!
//! Ingest and forecast failures are fatal and returned as errors. The
//! summarize stage never fails a run: whatever goes wrong there becomes
//! placeholder summaries and a note on the result.

use crate::core::forecast::ForecastEngine;
use crate::core::ingest::ingest;
use crate::core::insight::InsightSummarizer;
use crate::domain::model::{
    CsvTable, Forecast, PipelineResult, RunState, StageOutcome, Summaries,
};
use crate::domain::ports::Summarizer;
use crate::utils::error::Result;
use chrono::NaiveDate;
use std::panic::{self, AssertUnwindSafe};

/// Records the state sequence of one run.
#[derive(Debug, Clone)]
struct StateTrail(Vec<RunState>);

impl StateTrail {
    fn new() -> Self {
        Self(vec![RunState::Idle])
    }

    fn current(&self) -> RunState {
        self.0.last().copied().unwrap_or(RunState::Idle)
    }

    fn advance(&mut self, next: RunState) {
        debug_assert!(
            self.current().can_transition_to(next),
            "invalid transition {:?} -> {:?}",
            self.current(),
            next
        );
        tracing::debug!("pipeline state {:?} -> {:?}", self.current(), next);
        self.0.push(next);
    }

    fn fail<T>(&mut self, result: Result<T>) -> Result<T> {
        if let Err(err) = &result {
            self.advance(RunState::Failed);
            tracing::error!("❌ pipeline failed: {}", err);
        }
        result
    }
}

/// Output of the fatal stages, waiting for its summaries.
#[derive(Debug, Clone)]
pub struct PreparedRun {
    pub table: CsvTable,
    pub forecast: Forecast,
    trail: StateTrail,
}

pub struct PipelineOrchestrator {
    engine: ForecastEngine,
    summarizer: Box<dyn Summarizer>,
}

impl Default for PipelineOrchestrator {
    fn default() -> Self {
        Self::new(ForecastEngine::default())
    }
}

impl PipelineOrchestrator {
    pub fn new(engine: ForecastEngine) -> Self {
        Self {
            engine,
            summarizer: Box::new(InsightSummarizer::default()),
        }
    }

    pub fn with_summarizer(mut self, summarizer: impl Summarizer + 'static) -> Self {
        self.summarizer = Box::new(summarizer);
        self
    }

    pub fn horizon(&self) -> usize {
        self.engine.horizon()
    }

    pub fn run(&self, raw_text: &str, reference_date: NaiveDate) -> Result<PipelineResult> {
        let mut prepared = self.prepare(raw_text, reference_date)?;
        prepared.trail.advance(RunState::Summarizing);
        let summaries = self.summarize_stage(&prepared.table);
        Ok(self.finish(prepared, summaries))
    }

    /// Runs the fatal stages (ingest, forecast).
    pub fn prepare(&self, raw_text: &str, reference_date: NaiveDate) -> Result<PreparedRun> {
        let mut trail = StateTrail::new();

        trail.advance(RunState::Ingesting);
        let table = trail.fail(ingest(raw_text))?;

        trail.advance(RunState::Forecasting);
        let forecast = trail.fail(self.engine.forecast(&table, reference_date))?;

        tracing::info!(
            "📈 Forecast ready: {} historical + {} predicted points",
            table.len(),
            self.engine.horizon()
        );

        Ok(PreparedRun {
            table,
            forecast,
            trail,
        })
    }

    /// Local summarization, isolated from panics inside the summarizer.
    pub fn summarize_stage(&self, table: &CsvTable) -> StageOutcome<Summaries> {
        let outcome = panic::catch_unwind(AssertUnwindSafe(|| self.summarizer.summarize(table)));

        match outcome {
            Ok(Ok(summaries)) => {
                let notes: Vec<String> = summaries
                    .iter()
                    .filter(|insight| !insight.is_available())
                    .filter_map(|insight| {
                        insight
                            .info
                            .as_ref()
                            .map(|info| format!("{}: {}", insight.dimension, info))
                    })
                    .collect();
                if notes.is_empty() {
                    StageOutcome::Complete(summaries)
                } else {
                    StageOutcome::Partial {
                        value: summaries,
                        notes,
                    }
                }
            }
            Ok(Err(err)) => StageOutcome::Failed(err.to_string()),
            Err(_) => StageOutcome::Failed("summarizer panicked".to_string()),
        }
    }

    /// Attaches the summary outcome; always ends in `Done`.
    pub fn finish(
        &self,
        mut prepared: PreparedRun,
        summaries: StageOutcome<Summaries>,
    ) -> PipelineResult {
        if prepared.trail.current() != RunState::Summarizing {
            prepared.trail.advance(RunState::Summarizing);
        }

        let mut notes = Vec::new();
        if let Some(note) = &prepared.forecast.stats.note {
            notes.push(note.clone());
        }

        let summaries = match summaries {
            StageOutcome::Complete(summaries) => summaries,
            StageOutcome::Partial { value, notes: partial } => {
                for note in &partial {
                    tracing::debug!("summary note: {}", note);
                }
                value
            }
            StageOutcome::Failed(reason) => {
                tracing::warn!("⚠️ Summaries unavailable, returning forecast only: {}", reason);
                notes.push(format!("Summary unavailable: {}", reason));
                Summaries::placeholder(self.summarizer.dimension_names(), &reason)
            }
        };

        prepared.trail.advance(RunState::Done);

        PipelineResult {
            rows_read: prepared.table.rows_read,
            skipped_rows: prepared.table.skipped_count(),
            forecast: prepared.forecast,
            summaries,
            notes,
            states: prepared.trail.0,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::insight::{DAY_OF_WEEK, HOUR_OF_DAY, MENU};
    use crate::utils::error::PipelineError;

    const SALES: &str = "Date,Product,Sales\n\
                         2024-01-15,A,15000\n\
                         2024-02-15,B,18000\n\
                         2024-03-15,A,22000\n";

    fn reference() -> NaiveDate {
        NaiveDate::from_ymd_opt(2024, 4, 1).unwrap()
    }

    struct Unreachable;

    impl Summarizer for Unreachable {
        fn summarize(&self, _table: &CsvTable) -> Result<Summaries> {
            Err(PipelineError::SummaryServiceError { status: 503 })
        }

        fn dimension_names(&self) -> Vec<String> {
            [MENU, DAY_OF_WEEK, HOUR_OF_DAY].map(String::from).to_vec()
        }
    }

    struct Exploding;

    impl Summarizer for Exploding {
        fn summarize(&self, _table: &CsvTable) -> Result<Summaries> {
            panic!("boom")
        }

        fn dimension_names(&self) -> Vec<String> {
            vec![MENU.to_string()]
        }
    }

    /// Registry with a single custom dimension whose computation always fails.
    struct MonthlyOnly;

    impl Summarizer for MonthlyOnly {
        fn summarize(&self, _table: &CsvTable) -> Result<Summaries> {
            Err(PipelineError::dimension_unavailable("month", "calendar missing"))
        }

        fn dimension_names(&self) -> Vec<String> {
            vec!["month".to_string()]
        }
    }

    #[test]
    fn test_full_run_walks_every_state() {
        let result = PipelineOrchestrator::default().run(SALES, reference()).unwrap();

        assert_eq!(
            result.states,
            vec![
                RunState::Idle,
                RunState::Ingesting,
                RunState::Forecasting,
                RunState::Summarizing,
                RunState::Done
            ]
        );
        assert_eq!(result.forecast.points.len(), 3 + 5);
        assert_eq!(result.summaries.len(), 3);
        assert!(result.notes.is_empty());
    }

    #[test]
    fn test_summarizer_error_is_not_fatal() {
        let orchestrator =
            PipelineOrchestrator::new(ForecastEngine::new(2)).with_summarizer(Unreachable);
        let result = orchestrator.run(SALES, reference()).unwrap();

        assert_eq!(result.final_state(), RunState::Done);
        assert_eq!(result.forecast.points.len(), 5);
        assert_eq!(result.summaries.len(), 3);
        assert!(result.summaries.iter().all(|s| !s.is_available()));
        assert!(result.notes[0].contains("503"));
    }

    #[test]
    fn test_summarizer_panic_is_not_fatal() {
        let orchestrator = PipelineOrchestrator::default().with_summarizer(Exploding);
        let result = orchestrator.run(SALES, reference()).unwrap();

        assert_eq!(result.final_state(), RunState::Done);
        assert!(result.notes[0].contains("panicked"));
    }

    #[test]
    fn test_failure_placeholders_follow_registered_dimensions() {
        let orchestrator = PipelineOrchestrator::default().with_summarizer(MonthlyOnly);
        let result = orchestrator.run(SALES, reference()).unwrap();

        assert_eq!(result.summaries.len(), 1);
        let month = result.summaries.get("month").unwrap();
        assert!(!month.is_available());
        assert!(month.info.as_deref().unwrap().contains("calendar missing"));
        assert!(result.summaries.get(MENU).is_none());
    }

    #[test]
    fn test_malformed_input_is_fatal() {
        let err = PipelineOrchestrator::default()
            .run("Date,Product,Sales\n", reference())
            .unwrap_err();
        assert!(matches!(err, PipelineError::MalformedInput { .. }));
    }

    #[test]
    fn test_no_valid_rows_is_fatal() {
        let err = PipelineOrchestrator::default()
            .run("Date,Product,Sales\nyesterday,A,1\n", reference())
            .unwrap_err();
        assert!(matches!(err, PipelineError::InsufficientData { .. }));
    }

    #[test]
    fn test_single_category_still_forecasts() {
        let csv = "Date,Product,Sales\n2024-01-01,A,10\n2024-02-01,A,20\n";
        let result = PipelineOrchestrator::default().run(csv, reference()).unwrap();

        assert_eq!(result.forecast.predicted().count(), 5);
        assert!(result.summaries.get(MENU).unwrap().info.is_some());
    }

    #[test]
    fn test_prepare_then_finish_with_external_outcome() {
        let orchestrator = PipelineOrchestrator::default();
        let prepared = orchestrator.prepare(SALES, reference()).unwrap();
        let result = orchestrator.finish(prepared, StageOutcome::Failed("timeout".into()));

        assert_eq!(result.final_state(), RunState::Done);
        assert_eq!(result.notes, vec!["Summary unavailable: timeout".to_string()]);
    }

    #[test]
    fn test_degenerate_average_is_noted() {
        let csv = "Date,Product,Sales\n2024-01-01,A,0\n2024-01-02,B,0\n";
        let result = PipelineOrchestrator::default().run(csv, reference()).unwrap();
        assert_eq!(result.forecast.stats.growth_rate, 0.0);
        assert_eq!(result.notes.len(), 1);
    }
}
