use super::{DEFAULT_SUMMARY_TIMEOUT_SECONDS, MAX_HORIZON};
use crate::core::forecast::DEFAULT_HORIZON;
use crate::core::ConfigProvider;
use crate::utils::error::{PipelineError, Result};
use crate::utils::validation::{self, Validate};
use chrono::NaiveDate;
use regex::Regex;
use serde::{Deserialize, Serialize};
use std::path::Path;
use std::sync::OnceLock;

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TomlConfig {
    pub pipeline: PipelineConfig,
    pub source: SourceConfig,
    #[serde(default)]
    pub forecast: ForecastConfig,
    pub summary: Option<SummaryConfig>,
    pub export: ExportConfig,
    pub monitoring: Option<MonitoringConfig>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PipelineConfig {
    pub name: String,
    pub description: Option<String>,
    pub version: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SourceConfig {
    /// Sales CSV, relative to the working directory.
    pub path: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ForecastConfig {
    #[serde(default = "default_horizon")]
    pub horizon: usize,
    /// Quoted `"YYYY-MM-DD"`; today when absent.
    pub reference_date: Option<NaiveDate>,
}

impl Default for ForecastConfig {
    fn default() -> Self {
        Self {
            horizon: DEFAULT_HORIZON,
            reference_date: None,
        }
    }
}

fn default_horizon() -> usize {
    DEFAULT_HORIZON
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SummaryConfig {
    pub endpoint: Option<String>,
    /// Receives the CSV as multipart before `endpoint` is queried.
    pub upload_endpoint: Option<String>,
    pub timeout_seconds: Option<u64>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ExportConfig {
    pub output_path: String,
    pub output_formats: Vec<String>,
    pub compression: Option<CompressionConfig>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CompressionConfig {
    pub enabled: bool,
    pub filename: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MonitoringConfig {
    pub enabled: bool,
    pub log_level: Option<String>,
}

impl TomlConfig {
    /// 從 TOML 檔案載入配置
    pub fn from_file<P: AsRef<Path>>(path: P) -> Result<Self> {
        let content = std::fs::read_to_string(&path)?;
        Self::from_toml_str(&content)
    }

    /// 從 TOML 字串解析配置
    pub fn from_toml_str(content: &str) -> Result<Self> {
        let processed_content = Self::substitute_env_vars(content);

        toml::from_str(&processed_content).map_err(|e| PipelineError::ConfigValidationError {
            field: "toml_parsing".to_string(),
            message: format!("TOML parsing error: {}", e),
        })
    }

    /// 替換環境變數 (例如 ${SALES_CSV})，未設定的變數保持原樣
    fn substitute_env_vars(content: &str) -> String {
        static ENV_VAR: OnceLock<Regex> = OnceLock::new();
        let re = ENV_VAR.get_or_init(|| {
            Regex::new(r"\$\{([^}]+)\}").expect("env var pattern is a valid regex")
        });

        re.replace_all(content, |caps: &regex::Captures| {
            let var_name = &caps[1];
            std::env::var(var_name).unwrap_or_else(|_| format!("${{{}}}", var_name))
        })
        .to_string()
    }

    pub fn validate_config(&self) -> Result<()> {
        validation::validate_csv_extension("source.path", &self.source.path)?;
        validation::validate_range("forecast.horizon", self.forecast.horizon, 1, MAX_HORIZON)?;

        if let Some(summary) = &self.summary {
            let endpoint =
                validation::validate_required_field("summary.endpoint", &summary.endpoint)?;
            validation::validate_url("summary.endpoint", endpoint)?;

            let upload = validation::validate_required_field(
                "summary.upload_endpoint",
                &summary.upload_endpoint,
            )?;
            validation::validate_url("summary.upload_endpoint", upload)?;

            if let Some(timeout) = summary.timeout_seconds {
                validation::validate_range("summary.timeout_seconds", timeout, 1, 300)?;
            }
        }

        validation::validate_path("export.output_path", &self.export.output_path)?;
        validation::validate_output_formats("export.output_formats", &self.export.output_formats)?;

        if let Some(compression) = &self.export.compression {
            if compression.enabled {
                validation::validate_path("export.compression.filename", &compression.filename)?;
            }
        }

        Ok(())
    }

    pub fn monitoring_enabled(&self) -> bool {
        self.monitoring.as_ref().map(|m| m.enabled).unwrap_or(false)
    }
}

impl ConfigProvider for TomlConfig {
    fn input_path(&self) -> &str {
        &self.source.path
    }

    fn output_path(&self) -> &str {
        &self.export.output_path
    }

    fn horizon(&self) -> usize {
        self.forecast.horizon
    }

    fn reference_date(&self) -> Option<NaiveDate> {
        self.forecast.reference_date
    }

    fn summary_endpoint(&self) -> Option<&str> {
        self.summary.as_ref().and_then(|s| s.endpoint.as_deref())
    }

    fn summary_upload_endpoint(&self) -> Option<&str> {
        self.summary
            .as_ref()
            .and_then(|s| s.upload_endpoint.as_deref())
    }

    fn summary_timeout_seconds(&self) -> u64 {
        self.summary
            .as_ref()
            .and_then(|s| s.timeout_seconds)
            .unwrap_or(DEFAULT_SUMMARY_TIMEOUT_SECONDS)
    }

    fn output_formats(&self) -> &[String] {
        &self.export.output_formats
    }

    fn bundle_name(&self) -> Option<&str> {
        self.export
            .compression
            .as_ref()
            .filter(|c| c.enabled)
            .map(|c| c.filename.as_str())
    }
}

impl Validate for TomlConfig {
    fn validate(&self) -> Result<()> {
        self.validate_config()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;
    use tempfile::NamedTempFile;

    const BASIC: &str = r#"
[pipeline]
name = "cafe-forecast"
version = "1.0.0"

[source]
path = "data/sales.csv"

[forecast]
horizon = 3
reference_date = "2024-04-01"

[export]
output_path = "./out"
output_formats = ["csv", "json"]

[export.compression]
enabled = true
filename = "forecast_bundle.zip"
"#;

    #[test]
    fn test_parse_basic_toml_config() {
        let config = TomlConfig::from_toml_str(BASIC).unwrap();

        assert_eq!(config.pipeline.name, "cafe-forecast");
        assert_eq!(config.input_path(), "data/sales.csv");
        assert_eq!(config.horizon(), 3);
        assert_eq!(config.reference_date(), NaiveDate::from_ymd_opt(2024, 4, 1));
        assert_eq!(config.bundle_name(), Some("forecast_bundle.zip"));
        assert!(config.summary_endpoint().is_none());
        assert!(!config.monitoring_enabled());
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_forecast_section_is_optional() {
        let content = r#"
[pipeline]
name = "minimal"
version = "1"

[source]
path = "sales.csv"

[export]
output_path = "./out"
output_formats = ["csv"]
"#;
        let config = TomlConfig::from_toml_str(content).unwrap();
        assert_eq!(config.horizon(), DEFAULT_HORIZON);
        assert!(config.reference_date().is_none());
        assert!(config.bundle_name().is_none());
    }

    #[test]
    fn test_env_var_substitution() {
        std::env::set_var("TEST_SUMMARY_ENDPOINT", "https://insights.example.com/summary");

        let content = r#"
[pipeline]
name = "env"
version = "1"

[source]
path = "sales.csv"

[summary]
endpoint = "${TEST_SUMMARY_ENDPOINT}"
upload_endpoint = "https://insights.example.com/autoML"
timeout_seconds = 3

[export]
output_path = "./out"
output_formats = ["json"]
"#;
        let config = TomlConfig::from_toml_str(content).unwrap();
        assert_eq!(
            config.summary_endpoint(),
            Some("https://insights.example.com/summary")
        );
        assert_eq!(config.summary_timeout_seconds(), 3);
        assert_eq!(
            config.summary_upload_endpoint(),
            Some("https://insights.example.com/autoML")
        );
        assert!(config.validate().is_ok());

        std::env::remove_var("TEST_SUMMARY_ENDPOINT");
    }

    #[test]
    fn test_config_validation() {
        let content = BASIC.replace("data/sales.csv", "data/sales.xlsx");
        let config = TomlConfig::from_toml_str(&content).unwrap();
        assert!(config.validate().is_err());

        let content = BASIC.replace("horizon = 3", "horizon = 0");
        let config = TomlConfig::from_toml_str(&content).unwrap();
        assert!(config.validate().is_err());

        let content = format!("{}\n[summary]\ntimeout_seconds = 5\n", BASIC);
        let config = TomlConfig::from_toml_str(&content).unwrap();
        assert!(matches!(
            config.validate(),
            Err(PipelineError::MissingConfigError { .. })
        ));
    }

    #[test]
    fn test_summary_timeout_range() {
        let summary = |timeout: u64| {
            format!(
                "{}\n[summary]\nendpoint = \"http://127.0.0.1:8000/summary\"\n\
                 upload_endpoint = \"http://127.0.0.1:8000/autoML\"\n\
                 timeout_seconds = {}\n",
                BASIC, timeout
            )
        };

        let config = TomlConfig::from_toml_str(&summary(0)).unwrap();
        assert!(matches!(
            config.validate(),
            Err(PipelineError::InvalidConfigValueError { .. })
        ));

        let config = TomlConfig::from_toml_str(&summary(30)).unwrap();
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_config_from_file() {
        let mut temp_file = NamedTempFile::new().unwrap();
        temp_file.write_all(BASIC.as_bytes()).unwrap();

        let config = TomlConfig::from_file(temp_file.path()).unwrap();
        assert_eq!(config.pipeline.name, "cafe-forecast");
    }
}
