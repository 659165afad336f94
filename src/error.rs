//! Error handling for nodeflow
//!
//! This module defines the crate-wide error type and a Result alias. Errors
//! raised *inside* transforms never reach this type: the executor contains
//! them and turns them into a failure status (see [`crate::pipeline::executor`]).

use crate::pipeline::PipelineError;
use thiserror::Error;

/// Main error type for nodeflow operations
#[derive(Error, Debug)]
pub enum FlowError {
    /// Errors raised while building, validating or replaying a pipeline
    #[error("Pipeline error: {0}")]
    Pipeline(#[from] PipelineError),

    /// Errors related to payload construction or persistence
    #[error("Payload error: {0}")]
    Payload(String),

    /// Errors related to Rhai script compilation or evaluation
    #[error("Script error: {0}")]
    Script(String),

    /// Errors related to configuration loading/saving
    #[error("Configuration error: {0}")]
    Config(String),

    /// IO errors
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    /// Serialization errors
    #[error("Serialization error: {0}")]
    Serialization(String),

    /// Generic errors with context
    #[error("{context}: {source}")]
    WithContext {
        context: String,
        #[source]
        source: Box<FlowError>,
    },
}

impl FlowError {
    /// Add context to an error
    pub fn with_context(self, context: impl Into<String>) -> Self {
        FlowError::WithContext {
            context: context.into(),
            source: Box::new(self),
        }
    }

    /// Create a script error from a Rhai error
    pub fn from_rhai_error(err: Box<rhai::EvalAltResult>) -> Self {
        FlowError::Script(err.to_string())
    }
}

impl From<serde_json::Error> for FlowError {
    fn from(err: serde_json::Error) -> Self {
        FlowError::Serialization(err.to_string())
    }
}

impl From<toml::de::Error> for FlowError {
    fn from(err: toml::de::Error) -> Self {
        FlowError::Config(err.to_string())
    }
}

impl From<toml::ser::Error> for FlowError {
    fn from(err: toml::ser::Error) -> Self {
        FlowError::Config(err.to_string())
    }
}

/// Result type alias for nodeflow operations
pub type Result<T> = std::result::Result<T, FlowError>;

/// Extension trait for adding context to Results
pub trait ResultExt<T> {
    /// Add context to an error result
    fn context(self, context: impl Into<String>) -> Result<T>;

    /// Add context lazily to an error result
    fn with_context<F>(self, f: F) -> Result<T>
    where
        F: FnOnce() -> String;
}

impl<T> ResultExt<T> for Result<T> {
    fn context(self, context: impl Into<String>) -> Result<T> {
        self.map_err(|e| e.with_context(context))
    }

    fn with_context<F>(self, f: F) -> Result<T>
    where
        F: FnOnce() -> String,
    {
        self.map_err(|e| e.with_context(f()))
    }
}

impl<T> ResultExt<T> for std::result::Result<T, Box<rhai::EvalAltResult>> {
    fn context(self, context: impl Into<String>) -> Result<T> {
        self.map_err(|e| FlowError::from_rhai_error(e).with_context(context))
    }

    fn with_context<F>(self, f: F) -> Result<T>
    where
        F: FnOnce() -> String,
    {
        self.map_err(|e| FlowError::from_rhai_error(e).with_context(f()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_display() {
        let err = FlowError::Payload("shape mismatch".to_string());
        assert_eq!(err.to_string(), "Payload error: shape mismatch");
    }

    #[test]
    fn test_error_with_context() {
        let err = FlowError::Config("bad key".to_string());
        let with_ctx = err.with_context("Failed to load settings");
        assert!(with_ctx.to_string().contains("Failed to load settings"));
        assert!(with_ctx.to_string().contains("bad key"));
    }

    #[test]
    fn test_pipeline_error_converts() {
        let err: FlowError = PipelineError::UnknownTransform("lda".to_string()).into();
        assert!(err.to_string().contains("lda"));
    }

    #[test]
    fn test_result_ext_context() {
        let res: Result<()> = Err(FlowError::Serialization("eof".into()));
        let err = res.context("reading log").unwrap_err();
        assert!(err.to_string().starts_with("reading log"));
    }
}
