use serde::Serialize;
use std::fmt;
use thiserror::Error;

/// 單一欄位的驗證失敗紀錄
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct FieldViolation {
    pub field: String,
    pub value: String,
    pub reason: String,
}

impl FieldViolation {
    pub fn new(field: impl Into<String>, value: impl ToString, reason: impl Into<String>) -> Self {
        Self {
            field: field.into(),
            value: value.to_string(),
            reason: reason.into(),
        }
    }
}

impl fmt::Display for FieldViolation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} = {}: {}", self.field, self.value, self.reason)
    }
}

fn join_violations(violations: &[FieldViolation]) -> String {
    violations
        .iter()
        .map(ToString::to_string)
        .collect::<Vec<_>>()
        .join("; ")
}

#[derive(Error, Debug)]
pub enum LosError {
    #[error("Invalid input: {}", join_violations(.violations))]
    InvalidInput { violations: Vec<FieldViolation> },

    #[error("Domain error: {parameter} = {value} ({reason})")]
    Domain {
        parameter: &'static str,
        value: f64,
        reason: &'static str,
    },

    #[error("Scenario change set rejected: {}", .errors.join("; "))]
    Scenario { errors: Vec<String> },

    #[error("Narrative generation error: {message}")]
    Narrative { message: String },

    #[error("Zip operation failed: {0}")]
    ZipError(#[from] zip::result::ZipError),

    #[error("CSV processing error: {0}")]
    CsvError(#[from] csv::Error),

    #[error("IO error: {0}")]
    IoError(#[from] std::io::Error),

    #[error("Serialization error: {0}")]
    SerializationError(#[from] serde_json::Error),

    #[error("TOML parse error: {0}")]
    TomlError(#[from] toml::de::Error),

    #[error("Configuration error in {field}: {message}")]
    ConfigValidationError { field: String, message: String },

    #[error("Invalid configuration value for {field} ({value}): {reason}")]
    InvalidConfigValueError {
        field: String,
        value: String,
        reason: String,
    },

    #[error("Internal error: {message}")]
    Internal { message: String },
}

pub type Result<T> = std::result::Result<T, LosError>;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorCategory {
    Validation,
    Domain,
    Configuration,
    Io,
    Internal,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
pub enum ErrorSeverity {
    Low,
    Medium,
    High,
    Critical,
}

impl LosError {
    pub fn domain(parameter: &'static str, value: f64, reason: &'static str) -> Self {
        LosError::Domain {
            parameter,
            value,
            reason,
        }
    }

    pub fn internal(message: impl Into<String>) -> Self {
        LosError::Internal {
            message: message.into(),
        }
    }

    pub fn category(&self) -> ErrorCategory {
        match self {
            LosError::InvalidInput { .. } | LosError::Scenario { .. } | LosError::Narrative { .. } => {
                ErrorCategory::Validation
            }
            LosError::Domain { .. } => ErrorCategory::Domain,
            LosError::ConfigValidationError { .. }
            | LosError::InvalidConfigValueError { .. }
            | LosError::TomlError(_) => ErrorCategory::Configuration,
            LosError::ZipError(_)
            | LosError::CsvError(_)
            | LosError::IoError(_)
            | LosError::SerializationError(_) => ErrorCategory::Io,
            LosError::Internal { .. } => ErrorCategory::Internal,
        }
    }

    pub fn severity(&self) -> ErrorSeverity {
        match self.category() {
            ErrorCategory::Validation | ErrorCategory::Configuration => ErrorSeverity::High,
            ErrorCategory::Io => ErrorSeverity::Medium,
            ErrorCategory::Domain | ErrorCategory::Internal => ErrorSeverity::Critical,
        }
    }

    /// 對外 HTTP 層的狀態碼分類：驗證類 422，其餘 500
    pub fn status_code(&self) -> u16 {
        match self.category() {
            ErrorCategory::Validation | ErrorCategory::Domain => 422,
            _ => 500,
        }
    }

    pub fn recovery_suggestion(&self) -> String {
        match self {
            LosError::InvalidInput { violations } => {
                let fields: Vec<&str> = violations.iter().map(|v| v.field.as_str()).collect();
                format!("Correct the following input fields and retry: {}", fields.join(", "))
            }
            LosError::Domain { parameter, .. } => format!(
                "Check the inputs feeding '{}'; this should have been rejected during input validation",
                parameter
            ),
            LosError::Scenario { .. } => {
                "Review the change paths and values against the base lane group document".to_string()
            }
            LosError::Narrative { .. } => {
                "Provide a comparison, a scenario, or an intersection result".to_string()
            }
            LosError::ConfigValidationError { field, .. }
            | LosError::InvalidConfigValueError { field, .. } => {
                format!("Fix the '{}' setting in the configuration", field)
            }
            LosError::IoError(_) => "Check that the input file exists and the output path is writable".to_string(),
            LosError::SerializationError(_) => "Check that the study file is valid JSON".to_string(),
            LosError::TomlError(_) => "Check the TOML syntax of the study configuration".to_string(),
            LosError::CsvError(_) | LosError::ZipError(_) => {
                "Check available disk space and output permissions".to_string()
            }
            LosError::Internal { .. } => "Re-run with --verbose and report the log output".to_string(),
        }
    }

    pub fn user_friendly_message(&self) -> String {
        match self {
            LosError::InvalidInput { violations } => format!(
                "The input has {} invalid value(s): {}",
                violations.len(),
                join_violations(violations)
            ),
            LosError::Domain { parameter, value, reason } => {
                format!("Calculation rejected {} = {}: {}", parameter, value, reason)
            }
            LosError::IoError(e) => format!("File access failed: {}", e),
            other => other.to_string(),
        }
    }
}
