//! Signal Relay - webhook relay from alerting sources to an LLM and Telegram
//!
//! Inbound trading alerts are deduplicated, turned into a prompt, sent to a
//! chat-completion API, and the reply is forwarded to a messaging channel.

pub mod api;
pub mod config;
pub mod constants;
pub mod dedup;
pub mod error;
pub mod llm;
pub mod messaging;
pub mod pipeline;
pub mod prompt;
pub mod services;

// Re-export commonly used types
pub use config::AppConfig;
pub use dedup::{DedupDecision, SignalDeduplicator};
pub use pipeline::{RelayOutcome, RelayPipeline};
