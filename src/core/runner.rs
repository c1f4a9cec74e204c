use crate::core::Pipeline;
use crate::utils::error::Result;
use crate::utils::monitor::SystemMonitor;

/// Drives a [`Pipeline`] through extract → transform → load.
pub struct JobRunner<P: Pipeline> {
    pipeline: P,
    monitor: SystemMonitor,
}

impl<P: Pipeline> JobRunner<P> {
    pub fn new(pipeline: P) -> Self {
        Self::new_with_monitoring(pipeline, false)
    }

    pub fn new_with_monitoring(pipeline: P, monitor_enabled: bool) -> Self {
        Self {
            pipeline,
            monitor: SystemMonitor::new(monitor_enabled),
        }
    }

    pub fn pipeline(&self) -> &P {
        &self.pipeline
    }

    pub async fn run(&self) -> Result<String> {
        tracing::info!("🚀 Starting forecast job");

        tracing::info!("Reading upload...");
        let raw = self.pipeline.extract().await?;
        tracing::info!("Read {} bytes of CSV", raw.len());
        self.monitor.log_phase("extract");

        tracing::info!("Running forecast pipeline...");
        let result = self.pipeline.transform(raw).await?;
        tracing::info!(
            "Forecast has {} points, {} rows skipped",
            result.forecast.points.len(),
            result.skipped_rows
        );
        for note in &result.notes {
            tracing::warn!("⚠️ {}", note);
        }
        self.monitor.log_phase("transform");

        tracing::info!("Writing outputs...");
        let output_path = self.pipeline.load(result).await?;
        tracing::info!("📁 Output saved to: {}", output_path);
        self.monitor.log_phase("load");

        self.monitor.log_final_stats();
        Ok(output_path)
    }
}
