pub mod app;
pub mod config;
pub mod core;
pub mod domain;
pub mod utils;

pub use config::cli::LocalStorage;
#[cfg(feature = "cli")]
pub use config::CliConfig;

pub use app::{RemoteSummaryClient, UploadPipeline, UploadSession};
pub use core::{forecast::ForecastEngine, orchestrator::PipelineOrchestrator, runner::JobRunner};
pub use utils::error::{PipelineError, Result};
