use crate::app::remote::RemoteSummaryClient;
use crate::config;
use crate::core::export;
use crate::core::forecast::ForecastEngine;
use crate::core::orchestrator::PipelineOrchestrator;
use crate::core::{ConfigProvider, Pipeline, PipelineResult, Storage};
use crate::utils::error::{PipelineError, Result};
use std::io::Write;
use zip::write::{FileOptions, ZipWriter};

pub const FORECAST_CSV: &str = "forecast.csv";
pub const RESULT_JSON: &str = "result.json";

/// Reads an uploaded sales CSV, runs the forecast/insight orchestrator and
/// writes the requested outputs.
pub struct UploadPipeline<S: Storage, C: ConfigProvider> {
    pub(crate) storage: S,
    pub(crate) config: C,
    orchestrator: PipelineOrchestrator,
    remote: Option<RemoteSummaryClient>,
}

impl<S: Storage, C: ConfigProvider> UploadPipeline<S, C> {
    pub fn new(storage: S, config: C) -> Result<Self> {
        let orchestrator = PipelineOrchestrator::new(ForecastEngine::new(config.horizon()));
        let remote = match config.summary_endpoint() {
            Some(endpoint) => {
                let upload_endpoint = config.summary_upload_endpoint().ok_or_else(|| {
                    PipelineError::MissingConfigError {
                        field: "summary_upload_endpoint".to_string(),
                    }
                })?;
                Some(RemoteSummaryClient::new(
                    upload_endpoint,
                    endpoint,
                    config.summary_timeout_seconds(),
                )?)
            }
            None => None,
        };

        Ok(Self {
            storage,
            config,
            orchestrator,
            remote,
        })
    }

    /// Swaps the orchestrator, e.g. to plug in a different local summarizer.
    pub fn with_orchestrator(mut self, orchestrator: PipelineOrchestrator) -> Self {
        self.orchestrator = orchestrator;
        self
    }

    fn output_file(&self, name: &str) -> String {
        format!("{}/{}", self.config.output_path().trim_end_matches('/'), name)
    }

    fn wants(&self, format: &str) -> bool {
        self.config
            .output_formats()
            .iter()
            .any(|f| f.eq_ignore_ascii_case(format))
    }

    /// (file name, contents) for every requested format.
    fn render_outputs(&self, result: &PipelineResult) -> Result<Vec<(&'static str, String)>> {
        let mut files = Vec::new();
        if self.wants("csv") {
            files.push((FORECAST_CSV, export::format(&result.forecast)));
        }
        if self.wants("json") {
            files.push((RESULT_JSON, export::format_json(result)?));
        }
        Ok(files)
    }
}

fn zip_bundle(files: &[(&str, String)]) -> Result<Vec<u8>> {
    let mut zip = ZipWriter::new(std::io::Cursor::new(Vec::new()));

    for (name, contents) in files {
        zip.start_file::<_, ()>(*name, FileOptions::default())?;
        zip.write_all(contents.as_bytes())?;
    }

    let cursor = zip.finish()?;
    Ok(cursor.into_inner())
}

#[async_trait::async_trait]
impl<S: Storage, C: ConfigProvider> Pipeline for UploadPipeline<S, C> {
    async fn extract(&self) -> Result<String> {
        let path = self.config.input_path();
        tracing::debug!("Reading upload from: {}", path);

        let bytes = self.storage.read_file(path).await?;
        String::from_utf8(bytes)
            .map_err(|_| PipelineError::malformed(format!("{} is not valid UTF-8 text", path)))
    }

    async fn transform(&self, raw: String) -> Result<PipelineResult> {
        let reference_date = self.config.reference_date().unwrap_or_else(config::today);
        tracing::debug!("Forecasting from reference date {}", reference_date);

        match &self.remote {
            Some(client) => {
                let prepared = self.orchestrator.prepare(&raw, reference_date)?;
                tracing::info!("🌐 Fetching summaries from {}", client.endpoint());
                let summaries = client.fetch_outcome(&raw).await;
                Ok(self.orchestrator.finish(prepared, summaries))
            }
            None => self.orchestrator.run(&raw, reference_date),
        }
    }

    async fn load(&self, result: PipelineResult) -> Result<String> {
        let files = self.render_outputs(&result)?;

        if let Some(bundle) = self.config.bundle_name() {
            let bundle_path = self.output_file(bundle);
            tracing::debug!("Creating ZIP file with {} files", files.len());

            let zip_data = zip_bundle(&files)?;
            tracing::debug!("Writing ZIP file ({} bytes) to storage", zip_data.len());
            self.storage.write_file(&bundle_path, &zip_data).await?;
            return Ok(bundle_path);
        }

        for (name, contents) in &files {
            self.storage
                .write_file(&self.output_file(name), contents.as_bytes())
                .await?;
        }

        tracing::debug!("Wrote {} output files", files.len());
        Ok(self.config.output_path().to_string())
    }
}
