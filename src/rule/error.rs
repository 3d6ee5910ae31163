//! Error types for the rule module

use crate::error::Error as CrateError;
use thiserror::Error;

/// Error type for rule evaluation
#[derive(Debug, Error)]
pub enum RuleError {
    /// CSS selector could not be parsed
    #[error("Invalid selector '{selector}': {message}")]
    Selector { selector: String, message: String },

    /// Regex part of a rule could not be compiled
    #[error("Invalid regex '{pattern}': {source}")]
    Regex {
        pattern: String,
        #[source]
        source: regex::Error,
    },

    /// Rule string is malformed
    #[error("Invalid rule '{0}'")]
    Syntax(String),

    /// Evaluator-specific failure
    #[error("{0}")]
    Other(String),
}

impl From<RuleError> for CrateError {
    fn from(err: RuleError) -> Self {
        CrateError::Rule(err.to_string())
    }
}
