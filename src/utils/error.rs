use std::time::Duration;
use thiserror::Error;

#[derive(Error, Debug)]
pub enum ClassifierError {
    #[error("Model service unavailable: {message}")]
    ModelUnavailable { message: String },

    #[error("Model did not respond within {timeout:?}")]
    ModelTimeout { timeout: Duration },

    #[error("Model response could not be parsed: {message}")]
    ModelParseError { message: String },

    #[error("IO error: {0}")]
    IoError(#[from] std::io::Error),

    #[error("Serialization error: {0}")]
    SerializationError(#[from] serde_json::Error),

    #[error("Configuration error: {message}")]
    ConfigError { message: String },

    #[error("Missing configuration: {field}")]
    MissingConfigError { field: String },

    #[error("Invalid value '{value}' for {field}: {reason}")]
    InvalidConfigValueError {
        field: String,
        value: String,
        reason: String,
    },

    #[error("Configuration validation failed for {field}: {message}")]
    ConfigValidationError { field: String, message: String },
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorCategory {
    Model,
    Configuration,
    Io,
    Serialization,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
pub enum ErrorSeverity {
    Low,
    Medium,
    High,
    Critical,
}

impl ClassifierError {
    pub fn category(&self) -> ErrorCategory {
        match self {
            ClassifierError::ModelUnavailable { .. }
            | ClassifierError::ModelTimeout { .. }
            | ClassifierError::ModelParseError { .. } => ErrorCategory::Model,
            ClassifierError::IoError(_) => ErrorCategory::Io,
            ClassifierError::SerializationError(_) => ErrorCategory::Serialization,
            ClassifierError::ConfigError { .. }
            | ClassifierError::MissingConfigError { .. }
            | ClassifierError::InvalidConfigValueError { .. }
            | ClassifierError::ConfigValidationError { .. } => ErrorCategory::Configuration,
        }
    }

    pub fn severity(&self) -> ErrorSeverity {
        match self.category() {
            // 模型錯誤一律由 fallback 接手
            ErrorCategory::Model => ErrorSeverity::Low,
            ErrorCategory::Io | ErrorCategory::Serialization => ErrorSeverity::High,
            ErrorCategory::Configuration => ErrorSeverity::Critical,
        }
    }

    /// 模型相關錯誤（可由關鍵字分類器取代）
    pub fn is_model_error(&self) -> bool {
        self.category() == ErrorCategory::Model
    }

    pub fn recovery_suggestion(&self) -> String {
        match self {
            ClassifierError::ModelUnavailable { .. } => {
                "Start the local model server (e.g. `ollama serve`) and pull the configured model"
                    .to_string()
            }
            ClassifierError::ModelTimeout { .. } => {
                "Increase model.timeout_ms or use a smaller model".to_string()
            }
            ClassifierError::ModelParseError { .. } => {
                "Lower the model temperature or try a different model".to_string()
            }
            ClassifierError::IoError(_) => {
                "Check that the input file exists and is readable".to_string()
            }
            ClassifierError::SerializationError(_) => {
                "Check that the OCR export is a JSON array of {text, confidence} objects"
                    .to_string()
            }
            ClassifierError::MissingConfigError { field } => {
                format!("Provide a value for '{}'", field)
            }
            ClassifierError::InvalidConfigValueError { field, .. }
            | ClassifierError::ConfigValidationError { field, .. } => {
                format!("Fix the value of '{}' in the config file or CLI flags", field)
            }
            ClassifierError::ConfigError { .. } => {
                "Review the configuration file against the documented format".to_string()
            }
        }
    }

    pub fn user_friendly_message(&self) -> String {
        match self.category() {
            ErrorCategory::Model => format!("Language model problem: {}", self),
            ErrorCategory::Configuration => format!("Invalid configuration: {}", self),
            ErrorCategory::Io => format!("Could not read input: {}", self),
            ErrorCategory::Serialization => format!("Malformed input: {}", self),
        }
    }
}

pub type Result<T> = std::result::Result<T, ClassifierError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_model_errors_are_low_severity() {
        let errors = [
            ClassifierError::ModelUnavailable {
                message: "connection refused".to_string(),
            },
            ClassifierError::ModelTimeout {
                timeout: Duration::from_millis(500),
            },
            ClassifierError::ModelParseError {
                message: "no category".to_string(),
            },
        ];

        for e in &errors {
            assert!(e.is_model_error());
            assert_eq!(e.severity(), ErrorSeverity::Low);
        }
    }

    #[test]
    fn test_config_errors_are_critical() {
        let e = ClassifierError::MissingConfigError {
            field: "model.endpoint".to_string(),
        };
        assert_eq!(e.category(), ErrorCategory::Configuration);
        assert_eq!(e.severity(), ErrorSeverity::Critical);
        assert!(e.recovery_suggestion().contains("model.endpoint"));
        assert!(!e.is_model_error());
    }
}
