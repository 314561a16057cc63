//! Custom error types for the relay
//!
//! One enum per pipeline stage so every failure mode stays distinguishable.

use thiserror::Error;

/// Configuration loading errors
#[derive(Error, Debug)]
pub enum ConfigError {
    #[error("Failed to read {path}: {source}")]
    Read {
        path: String,
        #[source]
        source: std::io::Error,
    },

    #[error("Failed to parse {path}: {source}")]
    Parse {
        path: String,
        #[source]
        source: serde_yaml::Error,
    },

    #[error("Invalid value for {key}: {value}")]
    InvalidEnv { key: String, value: String },
}

/// Inbound body could not be turned into a usable signal
#[derive(Error, Debug)]
pub enum DecodeError {
    #[error("Request body is not valid JSON: {0}")]
    Json(#[from] serde_json::Error),

    #[error("No alerts data found in payload")]
    EmptyAlerts,
}

/// Prompt formatting errors
#[derive(Error, Debug, PartialEq, Eq)]
pub enum PromptError {
    #[error("Payload must be a JSON object, got {kind}")]
    NotAnObject { kind: &'static str },
}

/// Completion service errors
#[derive(Error, Debug)]
pub enum CompletionError {
    #[error("OpenAI API error: {0}")]
    Api(#[from] async_openai::error::OpenAIError),

    #[error("Completion timed out after {secs}s")]
    Timeout { secs: u64 },

    #[error("Completion returned no content")]
    EmptyResponse,

    #[error("Completion failed: {0}")]
    Other(String),
}

/// Messaging relay errors
#[derive(Error, Debug)]
pub enum RelayError {
    #[error("HTTP {status}: {body}")]
    Http { status: u16, body: String },

    #[error("Network error: {0}")]
    Network(#[from] reqwest::Error),

    #[error("Relay failed: {0}")]
    Other(String),
}

/// Keep-alive scheduler errors
#[derive(Error, Debug)]
pub enum KeepAliveError {
    #[error("Scheduler error: {0}")]
    Scheduler(#[from] tokio_cron_scheduler::JobSchedulerError),

    #[error("HTTP client error: {0}")]
    Client(#[from] reqwest::Error),

    #[error("All endpoints failed: {0}")]
    Unreachable(String),
}

/// Failure after a signal was admitted
#[derive(Error, Debug)]
pub enum ProcessingError {
    #[error("Prompt error: {0}")]
    Prompt(#[from] PromptError),

    #[error("{0}")]
    Completion(#[from] CompletionError),
}
