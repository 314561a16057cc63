//! Request pipeline: decode → dedup → prompt → completion → relay.
//!
//! Every stage reports through its own result type and `handle` folds them
//! into a single [`RelayOutcome`]; nothing escapes as a panic or bare error.

use chrono::{DateTime, Utc};
use serde_json::Value;
use std::sync::Arc;
use tracing::{error, info, warn};

use crate::dedup::{DedupDecision, SignalDeduplicator};
use crate::error::{DecodeError, ProcessingError};
use crate::llm::CompletionService;
use crate::messaging::MessageRelay;
use crate::prompt::PromptBuilder;

#[derive(Debug)]
pub enum RelayOutcome {
    /// Body unusable; nothing was recorded or called.
    Rejected(DecodeError),
    /// Repeat of a recently admitted signal.
    Ignored,
    /// Completion succeeded. `delivered` is false when the relay failed.
    Relayed { reply: String, delivered: bool },
    /// Admitted, but prompt building or the completion call failed.
    Failed(ProcessingError),
}

#[derive(Clone)]
pub struct RelayPipeline {
    dedup: Arc<SignalDeduplicator>,
    prompt: PromptBuilder,
    completion: Arc<dyn CompletionService>,
    relay: Arc<dyn MessageRelay>,
}

impl RelayPipeline {
    pub fn new(
        dedup: Arc<SignalDeduplicator>,
        prompt: PromptBuilder,
        completion: Arc<dyn CompletionService>,
        relay: Arc<dyn MessageRelay>,
    ) -> Self {
        Self {
            dedup,
            prompt,
            completion,
            relay,
        }
    }

    pub fn deduplicator(&self) -> &SignalDeduplicator {
        &self.dedup
    }

    pub async fn handle(&self, raw_body: &[u8]) -> RelayOutcome {
        self.handle_at(raw_body, Utc::now()).await
    }

    pub async fn handle_at(&self, raw_body: &[u8], now: DateTime<Utc>) -> RelayOutcome {
        let payload = match decode(raw_body) {
            Ok(payload) => payload,
            Err(e) => {
                warn!("⚠️ [WEBHOOK] Rejected payload: {}", e);
                return RelayOutcome::Rejected(e);
            }
        };

        if self.dedup.evaluate(&payload, now) == DedupDecision::Suppress {
            info!(
                "🛡️ [DEDUP] Duplicate signal within {}s window - ignored",
                self.dedup.window().as_secs()
            );
            return RelayOutcome::Ignored;
        }
        info!("📨 [WEBHOOK] New signal admitted");

        let reply = match self.process(&payload).await {
            Ok(reply) => reply,
            Err(e) => {
                error!("❌ [WEBHOOK] Processing failed: {}", e);
                return RelayOutcome::Failed(e);
            }
        };

        let delivered = match self.relay.deliver(&reply).await {
            Ok(()) => true,
            Err(e) => {
                error!("❌ [RELAY] {} delivery failed: {}", self.relay.name(), e);
                false
            }
        };

        RelayOutcome::Relayed { reply, delivered }
    }

    async fn process(&self, payload: &Value) -> Result<String, ProcessingError> {
        let prompt = self.prompt.build(payload)?;
        let reply = self
            .completion
            .complete(self.prompt.system_instructions(), &prompt)
            .await?;
        Ok(reply)
    }
}

/// Parse the body and reject alert-list payloads that carry no alerts.
pub fn decode(raw_body: &[u8]) -> Result<Value, DecodeError> {
    let payload: Value = serde_json::from_slice(raw_body)?;

    if let Some(alerts) = payload.get("alerts") {
        match alerts.as_array() {
            Some(list) if !list.is_empty() => {}
            _ => return Err(DecodeError::EmptyAlerts),
        }
    }

    Ok(payload)
}
