use thiserror::Error;

#[derive(Error, Debug)]
pub enum PipelineError {
    #[error("Malformed input: {message}")]
    MalformedInput { message: String },

    #[error("Insufficient data: {message}")]
    InsufficientData { message: String },

    #[error("Average of historical amounts is zero, growth rate set to 0")]
    DegenerateAverage,

    #[error("Dimension '{dimension}' unavailable: {reason}")]
    DimensionUnavailable { dimension: String, reason: String },

    #[error("Summary service returned status {status}")]
    SummaryServiceError { status: u16 },

    #[error("Zip operation failed: {0}")]
    ZipError(#[from] zip::result::ZipError),

    #[error("API request failed: {0}")]
    ApiError(#[from] reqwest::Error),

    #[error("CSV processing error: {0}")]
    CsvError(#[from] csv::Error),

    #[error("IO error: {0}")]
    IoError(#[from] std::io::Error),

    #[error("Serialization error: {0}")]
    SerializationError(#[from] serde_json::Error),

    #[error("Configuration validation failed for '{field}': {message}")]
    ConfigValidationError { field: String, message: String },

    #[error("Invalid value '{value}' for '{field}': {reason}")]
    InvalidConfigValueError {
        field: String,
        value: String,
        reason: String,
    },

    #[error("Missing required configuration '{field}'")]
    MissingConfigError { field: String },
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorCategory {
    Input,
    Data,
    Network,
    Configuration,
    System,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
pub enum ErrorSeverity {
    Low,
    Medium,
    High,
    Critical,
}

impl PipelineError {
    pub fn malformed(message: impl Into<String>) -> Self {
        Self::MalformedInput {
            message: message.into(),
        }
    }

    pub fn insufficient(message: impl Into<String>) -> Self {
        Self::InsufficientData {
            message: message.into(),
        }
    }

    pub fn dimension_unavailable(dimension: &str, reason: impl Into<String>) -> Self {
        Self::DimensionUnavailable {
            dimension: dimension.to_string(),
            reason: reason.into(),
        }
    }

    pub fn category(&self) -> ErrorCategory {
        match self {
            Self::MalformedInput { .. } | Self::CsvError(_) => ErrorCategory::Input,
            Self::InsufficientData { .. }
            | Self::DegenerateAverage
            | Self::DimensionUnavailable { .. } => ErrorCategory::Data,
            Self::SummaryServiceError { .. } | Self::ApiError(_) => ErrorCategory::Network,
            Self::ConfigValidationError { .. }
            | Self::InvalidConfigValueError { .. }
            | Self::MissingConfigError { .. } => ErrorCategory::Configuration,
            Self::ZipError(_) | Self::IoError(_) | Self::SerializationError(_) => {
                ErrorCategory::System
            }
        }
    }

    pub fn severity(&self) -> ErrorSeverity {
        match self {
            // absorbed into the result as annotations
            Self::DegenerateAverage | Self::DimensionUnavailable { .. } => ErrorSeverity::Low,
            Self::SummaryServiceError { .. } | Self::ApiError(_) => ErrorSeverity::Medium,
            Self::MalformedInput { .. }
            | Self::InsufficientData { .. }
            | Self::CsvError(_)
            | Self::ConfigValidationError { .. }
            | Self::InvalidConfigValueError { .. }
            | Self::MissingConfigError { .. } => ErrorSeverity::High,
            Self::ZipError(_) | Self::IoError(_) | Self::SerializationError(_) => {
                ErrorSeverity::Critical
            }
        }
    }

    /// Fatal errors abort a pipeline run; the rest are recorded on the result.
    pub fn is_fatal(&self) -> bool {
        !matches!(
            self,
            Self::DegenerateAverage
                | Self::DimensionUnavailable { .. }
                | Self::SummaryServiceError { .. }
                | Self::ApiError(_)
        )
    }

    pub fn user_friendly_message(&self) -> String {
        match self {
            Self::MalformedInput { message } => {
                format!("The uploaded CSV could not be used: {}", message)
            }
            Self::InsufficientData { .. } => {
                "The uploaded CSV has no valid sales rows to forecast from.".to_string()
            }
            Self::DimensionUnavailable { dimension, .. } => {
                format!("Insights unavailable for {}.", dimension)
            }
            Self::SummaryServiceError { .. } | Self::ApiError(_) => {
                "The insight service could not be reached; forecast is still available."
                    .to_string()
            }
            Self::ConfigValidationError { .. }
            | Self::InvalidConfigValueError { .. }
            | Self::MissingConfigError { .. } => format!("Invalid configuration: {}", self),
            _ => self.to_string(),
        }
    }

    pub fn recovery_suggestion(&self) -> &'static str {
        match self.category() {
            ErrorCategory::Input => {
                "Check that the CSV has a header with a Date column and a Sales/amount column"
            }
            ErrorCategory::Data => "Make sure the CSV contains rows with valid dates and amounts",
            ErrorCategory::Network => "Check the summary endpoint URL or retry later",
            ErrorCategory::Configuration => "Review the command-line flags or the TOML config file",
            ErrorCategory::System => "Check file permissions and available disk space",
        }
    }
}

pub type Result<T> = std::result::Result<T, PipelineError>;
