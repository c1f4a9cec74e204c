pub mod cli;
pub mod toml_config;

use chrono::NaiveDate;

pub const MAX_HORIZON: usize = 60;
pub const DEFAULT_SUMMARY_TIMEOUT_SECONDS: u64 = 10;

/// Wall-clock date. Only configuration reads the clock; the core takes the
/// reference date as a parameter.
pub fn today() -> NaiveDate {
    chrono::Local::now().date_naive()
}

#[cfg(feature = "cli")]
pub use cli_config::CliConfig;

#[cfg(feature = "cli")]
mod cli_config {
    use super::{DEFAULT_SUMMARY_TIMEOUT_SECONDS, MAX_HORIZON};
    use crate::core::forecast::DEFAULT_HORIZON;
    use crate::core::ConfigProvider;
    use crate::utils::error::Result;
    use crate::utils::validation::{self, Validate};
    use chrono::NaiveDate;
    use clap::Parser;
    use serde::{Deserialize, Serialize};

    fn parse_reference_date(value: &str) -> std::result::Result<NaiveDate, String> {
        validation::validate_iso_date("reference_date", value).map_err(|e| e.to_string())
    }

    #[derive(Debug, Clone, Serialize, Deserialize, Parser)]
    #[command(name = "sales-forecast")]
    #[command(about = "Forecast sales and find best/worst performers from a sales CSV")]
    pub struct CliConfig {
        /// Sales CSV to forecast from
        #[arg(short, long)]
        pub input: String,

        #[arg(long, default_value = "./output")]
        pub output_path: String,

        /// Number of monthly points to predict
        #[arg(long, default_value_t = DEFAULT_HORIZON)]
        pub horizon: usize,

        /// Date the forecast months count from (YYYY-MM-DD), defaults to today
        #[arg(long, value_parser = parse_reference_date)]
        pub reference_date: Option<NaiveDate>,

        /// Fetch insights from a remote summary service instead of computing them locally
        #[arg(long)]
        pub summary_endpoint: Option<String>,

        /// Endpoint that receives the CSV (multipart) before the summary is fetched
        #[arg(long)]
        pub summary_upload_endpoint: Option<String>,

        #[arg(long, default_value_t = DEFAULT_SUMMARY_TIMEOUT_SECONDS)]
        pub summary_timeout: u64,

        #[arg(long, value_delimiter = ',', default_values = ["csv", "json"])]
        pub formats: Vec<String>,

        /// Write all outputs into a single zip with this name
        #[arg(long)]
        pub bundle: Option<String>,

        #[arg(long, help = "Enable verbose output")]
        pub verbose: bool,

        #[arg(long, help = "Log CPU/memory usage per phase")]
        pub monitor: bool,

        /// Emit logs as JSON lines
        #[arg(long)]
        pub json_logs: bool,
    }

    impl ConfigProvider for CliConfig {
        fn input_path(&self) -> &str {
            &self.input
        }

        fn output_path(&self) -> &str {
            &self.output_path
        }

        fn horizon(&self) -> usize {
            self.horizon
        }

        fn reference_date(&self) -> Option<NaiveDate> {
            self.reference_date
        }

        fn summary_endpoint(&self) -> Option<&str> {
            self.summary_endpoint.as_deref()
        }

        fn summary_upload_endpoint(&self) -> Option<&str> {
            self.summary_upload_endpoint.as_deref()
        }

        fn summary_timeout_seconds(&self) -> u64 {
            self.summary_timeout
        }

        fn output_formats(&self) -> &[String] {
            &self.formats
        }

        fn bundle_name(&self) -> Option<&str> {
            self.bundle.as_deref()
        }
    }

    impl Validate for CliConfig {
        fn validate(&self) -> Result<()> {
            validation::validate_csv_extension("input", &self.input)?;
            validation::validate_path("output_path", &self.output_path)?;
            validation::validate_range("horizon", self.horizon, 1, MAX_HORIZON)?;
            validation::validate_output_formats("formats", &self.formats)?;
            if let Some(endpoint) = &self.summary_endpoint {
                validation::validate_url("summary_endpoint", endpoint)?;
                let upload = validation::validate_required_field(
                    "summary_upload_endpoint",
                    &self.summary_upload_endpoint,
                )?;
                validation::validate_url("summary_upload_endpoint", upload)?;
                validation::validate_range("summary_timeout", self.summary_timeout, 1, 300)?;
            }
            if let Some(bundle) = &self.bundle {
                validation::validate_path("bundle", bundle)?;
            }
            Ok(())
        }
    }

}
