// src/error.rs
//! Error types shared across the pipeline.
//!
//! Collaborator failures (`StepError`) are captured by the node manager and
//! never escape a run. Engine failures (`EngineError`) are caught by the
//! workflow manager and turned into a failed `ProcessingResult`.

use thiserror::Error;

#[derive(Error, Debug)]
pub enum ConfigError {
    #[error("Invalid value for {key}: {value}")]
    Invalid { key: String, value: String },
    #[error("Duration bounds are inverted: min {min} > max {max}")]
    DurationBounds { min: u32, max: u32 },
}

#[derive(Error, Debug, Clone, PartialEq)]
pub enum ValidationError {
    #[error("Query text cannot be empty")]
    EmptyQuery,
    #[error("Duration must be between {min} and {max} minutes, got {got}")]
    DurationOutOfRange { got: u32, min: u32, max: u32 },
}

/// Failure raised by a step collaborator.
#[derive(Error, Debug, Clone)]
pub enum StepError {
    #[error("{0}")]
    Failed(String),
    #[error("query is not related to gaming or YouTube content creation: {0}")]
    Irrelevant(String),
    #[error("missing input: {0}")]
    MissingInput(String),
    #[error("timed out after {0:?}")]
    Timeout(std::time::Duration),
    #[error("step panicked: {0}")]
    Panicked(String),
    #[error("step may not write field(s) {0}")]
    OwnershipViolation(String),
}

impl StepError {
    pub fn failed(message: impl Into<String>) -> Self {
        StepError::Failed(message.into())
    }
}

impl From<LlmError> for StepError {
    fn from(err: LlmError) -> Self {
        StepError::Failed(err.to_string())
    }
}

impl From<LookupError> for StepError {
    fn from(err: LookupError) -> Self {
        StepError::Failed(err.to_string())
    }
}

/// Defect in graph construction or execution.
#[derive(Error, Debug)]
pub enum EngineError {
    #[error("No route out of non-terminal node '{0}'")]
    Unroutable(String),
    #[error("Workflow driver panicked: {0}")]
    Panicked(String),
    #[error("Failed to bind collaborators: {0}")]
    Binding(String),
}

#[derive(Error, Debug)]
pub enum CacheError {
    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),
    #[error("Backend error: {0}")]
    Backend(String),
}

#[derive(Error, Debug)]
pub enum LlmError {
    #[error("Unknown model: {model}. Available models: {available}")]
    UnknownModel { model: String, available: String },
    #[error("No API key configured for provider {0}")]
    MissingApiKey(String),
    #[error("LLM request failed: {0}")]
    Request(String),
    #[error("LLM returned an empty response")]
    EmptyResponse,
}

#[derive(Error, Debug)]
pub enum LookupError {
    #[error("{service} credentials are not configured")]
    NotConfigured { service: &'static str },
    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),
    #[error("{service} returned {status}: {body}")]
    Status {
        service: &'static str,
        status: u16,
        body: String,
    },
}
