use crate::domain::model::{CsvTable, PipelineResult, Summaries};
use crate::utils::error::Result;
use async_trait::async_trait;
use chrono::NaiveDate;

pub trait Storage: Send + Sync {
    fn read_file(&self, path: &str) -> impl std::future::Future<Output = Result<Vec<u8>>> + Send;
    fn write_file(
        &self,
        path: &str,
        data: &[u8],
    ) -> impl std::future::Future<Output = Result<()>> + Send;
}

pub trait ConfigProvider: Send + Sync {
    fn input_path(&self) -> &str;
    fn output_path(&self) -> &str;
    fn horizon(&self) -> usize;
    /// `None` means "today", resolved at the outermost boundary.
    fn reference_date(&self) -> Option<NaiveDate>;
    fn summary_endpoint(&self) -> Option<&str>;
    /// Where the CSV is posted before the summary is fetched; required
    /// whenever `summary_endpoint` is set.
    fn summary_upload_endpoint(&self) -> Option<&str>;
    fn summary_timeout_seconds(&self) -> u64;
    fn output_formats(&self) -> &[String];
    /// Zip bundle file name; `None` writes loose files.
    fn bundle_name(&self) -> Option<&str>;
}

/// Produces per-dimension insights for an ingested table.
pub trait Summarizer: Send + Sync {
    fn summarize(&self, table: &CsvTable) -> Result<Summaries>;
    /// Every dimension `summarize` reports on, in registration order.
    fn dimension_names(&self) -> Vec<String>;
}

#[async_trait]
pub trait Pipeline: Send + Sync {
    /// Raw CSV text of the upload.
    async fn extract(&self) -> Result<String>;
    async fn transform(&self, raw: String) -> Result<PipelineResult>;
    /// Persists the outputs and returns where they went.
    async fn load(&self, result: PipelineResult) -> Result<String>;
}
