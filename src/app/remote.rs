//! Client for a remote summary service.
//!
//! The service answers with one flat object describing the best/worst menu,
//! day of week and hour. It is converted into the same [`Summaries`] shape the
//! local summarizer produces, so callers cannot tell the two apart.

use crate::core::insight::{DAY_OF_WEEK, HOUR_OF_DAY, MENU};
use crate::domain::model::{StageOutcome, Summaries, SummaryInsight};
use crate::utils::error::{PipelineError, Result};
use reqwest::multipart::{Form, Part};
use reqwest::Client;
use serde::{Deserialize, Serialize};
use std::time::Duration;

/// Wire format of the summary endpoint.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct RemoteSummary {
    pub best_menu: Option<String>,
    pub best_menu_total_revenue: Option<f64>,
    pub worst_menu: Option<String>,
    pub best_day_of_week: Option<String>,
    pub worst_day_of_week: Option<String>,
    pub best_hour: Option<String>,
    pub worst_hour: Option<String>,
    pub info: Option<String>,
}

/// The service fills unavailable fields with "Not Available (...)" text.
fn available(label: Option<String>) -> Option<String> {
    label.filter(|l| !l.trim().is_empty() && !l.starts_with("Not Available"))
}

fn remote_insight(
    dimension: &str,
    best: Option<String>,
    best_metric: Option<f64>,
    worst: Option<String>,
    info: Option<String>,
) -> SummaryInsight {
    let raw_best = best.clone();
    let best_label = available(best);
    let worst_label = available(worst);

    let info = info.or_else(|| {
        if best_label.is_some() && worst_label.is_some() {
            None
        } else {
            Some(raw_best.unwrap_or_else(|| format!("Insights unavailable for {}", dimension)))
        }
    });

    SummaryInsight {
        dimension: dimension.to_string(),
        best_metric: best_label.as_ref().and(best_metric),
        best_label,
        worst_label,
        worst_metric: None,
        info,
    }
}

impl From<RemoteSummary> for Summaries {
    fn from(remote: RemoteSummary) -> Self {
        let mut summaries = Summaries::default();
        summaries.insert(remote_insight(
            MENU,
            remote.best_menu,
            remote.best_menu_total_revenue,
            remote.worst_menu,
            None,
        ));
        summaries.insert(remote_insight(
            DAY_OF_WEEK,
            remote.best_day_of_week,
            None,
            remote.worst_day_of_week,
            None,
        ));
        // the service's single `info` field describes the hourly breakdown
        summaries.insert(remote_insight(
            HOUR_OF_DAY,
            remote.best_hour,
            None,
            remote.worst_hour,
            remote.info,
        ));
        summaries
    }
}

/// Multipart field and file name the service expects for the upload.
const UPLOAD_FIELD: &str = "csv_file";
const UPLOAD_FILE_NAME: &str = "sales.csv";

/// Two-step client: the CSV is posted to `upload_endpoint`, then the insights
/// computed from it are read from `summary_endpoint`.
#[derive(Debug, Clone)]
pub struct RemoteSummaryClient {
    client: Client,
    upload_endpoint: String,
    summary_endpoint: String,
}

impl RemoteSummaryClient {
    pub fn new(
        upload_endpoint: impl Into<String>,
        summary_endpoint: impl Into<String>,
        timeout_seconds: u64,
    ) -> Result<Self> {
        let client = Client::builder()
            .timeout(Duration::from_secs(timeout_seconds))
            .build()?;
        Ok(Self {
            client,
            upload_endpoint: upload_endpoint.into(),
            summary_endpoint: summary_endpoint.into(),
        })
    }

    pub fn endpoint(&self) -> &str {
        &self.summary_endpoint
    }

    async fn upload(&self, csv: &str) -> Result<()> {
        tracing::debug!("Uploading {} bytes of CSV to: {}", csv.len(), self.upload_endpoint);
        let part = Part::text(csv.to_string())
            .file_name(UPLOAD_FILE_NAME)
            .mime_str("text/csv")?;
        let form = Form::new().part(UPLOAD_FIELD, part);

        let response = self
            .client
            .post(&self.upload_endpoint)
            .multipart(form)
            .send()
            .await?;
        tracing::debug!("Upload response status: {}", response.status());

        if !response.status().is_success() {
            return Err(PipelineError::SummaryServiceError {
                status: response.status().as_u16(),
            });
        }
        Ok(())
    }

    /// Uploads `csv` and returns the summary the service computed for it.
    /// The summary is never requested when the upload fails.
    pub async fn fetch(&self, csv: &str) -> Result<Summaries> {
        self.upload(csv).await?;

        tracing::debug!("Requesting summary from: {}", self.summary_endpoint);
        let response = self.client.get(&self.summary_endpoint).send().await?;
        tracing::debug!("Summary response status: {}", response.status());

        if !response.status().is_success() {
            return Err(PipelineError::SummaryServiceError {
                status: response.status().as_u16(),
            });
        }

        let remote: RemoteSummary = response.json().await?;
        Ok(remote.into())
    }

    /// Like [`fetch`](Self::fetch), folded into a stage outcome so a failing
    /// service never aborts the run.
    pub async fn fetch_outcome(&self, csv: &str) -> StageOutcome<Summaries> {
        match self.fetch(csv).await {
            Ok(summaries) => StageOutcome::Complete(summaries),
            Err(err) => {
                tracing::warn!("⚠️ Summary service failed: {}", err);
                StageOutcome::Failed(err.to_string())
            }
        }
    }
}
