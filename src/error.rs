// SPDX-License-Identifier: MIT

//! Typed error handling for skiplogic-rs
//!
//! Condition errors live in `condition`; this module holds the survey
//! errors and the top-level error the binary and loaders return.

use thiserror::Error;

use crate::condition::ConditionError;

/// Top-level error type for skiplogic-rs
#[derive(Debug, Error)]
pub enum SkiplogicError {
    /// Condition lexing, parsing or evaluation failed
    #[error("Condition error: {0}")]
    Condition(#[from] ConditionError),

    /// Survey definition or response errors
    #[error("Survey error: {0}")]
    Survey(#[from] SurveyError),

    /// Configuration errors (invalid config file or env vars)
    #[error("Configuration error: {0}")]
    Config(String),

    /// I/O errors
    #[error(transparent)]
    Io(#[from] std::io::Error),

    /// JSON serialization/deserialization errors
    #[error(transparent)]
    Json(#[from] serde_json::Error),

    /// YAML parsing errors
    #[error(transparent)]
    Yaml(#[from] serde_yaml::Error),
}

/// Survey definition and response errors
#[derive(Debug, Error)]
pub enum SurveyError {
    /// A response was uploaded for a different survey
    #[error("Response belongs to survey '{found}', expected '{expected}'")]
    SurveyMismatch { expected: String, found: String },

    /// A raw response value does not match the prompt's type
    #[error("Invalid response for prompt '{prompt_id}': {reason}")]
    InvalidResponse { prompt_id: String, reason: String },

    #[error("'{0}' is not a repeatable set")]
    NotARepeatableSet(String),

    #[error("Repeatable set '{set_id}' has no iteration {index}")]
    IterationOutOfRange { set_id: String, index: usize },

    /// Repeatable set responses must be an array of objects
    #[error("Malformed iterations for repeatable set '{0}'")]
    MalformedIterations(String),

    /// Static validation found problems
    #[error("Survey '{survey_id}' failed validation with {count} issue(s)")]
    Invalid { survey_id: String, count: usize },
}

impl SkiplogicError {
    /// Create a config error
    pub fn config(message: impl Into<String>) -> Self {
        Self::Config(message.into())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::condition::LexError;

    #[test]
    fn test_from_conversions() {
        let err: SkiplogicError = ConditionError::from(LexError::UnterminatedToken { position: 3 }).into();
        assert!(matches!(err, SkiplogicError::Condition(_)));
        assert!(err.to_string().starts_with("Condition error:"));

        let err: SkiplogicError = SurveyError::NotARepeatableSet("age".to_string()).into();
        assert_eq!(err.to_string(), "Survey error: 'age' is not a repeatable set");
    }

    #[test]
    fn test_config_helper() {
        let err = SkiplogicError::config("bad value");
        assert_eq!(err.to_string(), "Configuration error: bad value");
    }
}
