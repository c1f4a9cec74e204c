pub mod export;
pub mod forecast;
pub mod ingest;
pub mod insight;
pub mod orchestrator;
pub mod runner;

pub use crate::domain::model::{
    CsvTable, Forecast, ForecastPoint, PipelineResult, RunState, StageOutcome, Summaries,
    SummaryInsight,
};
pub use crate::domain::ports::{ConfigProvider, Pipeline, Storage, Summarizer};
pub use crate::utils::error::Result;
