//! Outbound delivery of completion text.

pub mod telegram;

use async_trait::async_trait;
use std::sync::Arc;
use tracing::{info, warn};

use crate::config::TelegramConfig;
use crate::error::RelayError;

pub use telegram::TelegramRelay;

#[async_trait]
pub trait MessageRelay: Send + Sync {
    fn name(&self) -> &'static str;

    async fn deliver(&self, text: &str) -> Result<(), RelayError>;
}

/// Used when no messaging credentials are configured: the reply only shows up
/// in the log and the webhook response.
pub struct LogRelay;

#[async_trait]
impl MessageRelay for LogRelay {
    fn name(&self) -> &'static str {
        "log"
    }

    async fn deliver(&self, text: &str) -> Result<(), RelayError> {
        info!("📝 [RELAY] {}", text);
        Ok(())
    }
}

/// Telegram when credentials are present, otherwise the log relay.
pub fn build_relay(config: &TelegramConfig) -> Result<Arc<dyn MessageRelay>, RelayError> {
    match config.credentials() {
        Some((token, chat_id)) => {
            let relay = TelegramRelay::new(&config.api_base, token, chat_id)?;
            Ok(Arc::new(relay))
        }
        None => {
            warn!("⚠️ [RELAY] TELEGRAM_BOT_TOKEN / TELEGRAM_CHAT_ID not set - replies are logged only");
            Ok(Arc::new(LogRelay))
        }
    }
}
