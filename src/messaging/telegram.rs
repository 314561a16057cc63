//! Telegram Bot API relay.
//!
//! Messages go out with Markdown parse mode. Telegram rejects the whole
//! message with HTTP 400 when the model's reply contains unbalanced markup,
//! so such a chunk is retried once as plain text.

use async_trait::async_trait;
use reqwest::Client;
use serde_json::json;
use tracing::{info, warn};

use super::MessageRelay;
use crate::constants::telegram::{MESSAGE_MAX_CHARS, PARSE_MODE, REQUEST_TIMEOUT};
use crate::error::RelayError;

#[derive(Clone)]
pub struct TelegramRelay {
    client: Client,
    send_url: String,
    chat_id: String,
}

impl TelegramRelay {
    pub fn new(api_base: &str, bot_token: &str, chat_id: &str) -> Result<Self, RelayError> {
        let client = Client::builder().timeout(REQUEST_TIMEOUT).build()?;
        Ok(Self {
            client,
            send_url: format!("{}/bot{}/sendMessage", api_base.trim_end_matches('/'), bot_token),
            chat_id: chat_id.to_string(),
        })
    }

    async fn send(&self, text: &str, parse_mode: Option<&str>) -> Result<(), RelayError> {
        let mut payload = json!({
            "chat_id": self.chat_id,
            "text": text,
        });
        if let Some(mode) = parse_mode {
            payload["parse_mode"] = json!(mode);
        }

        let response = self.client.post(&self.send_url).json(&payload).send().await?;
        let status = response.status();
        if status.is_success() {
            return Ok(());
        }

        let body = response.text().await.unwrap_or_default();
        Err(RelayError::Http {
            status: status.as_u16(),
            body,
        })
    }
}

#[async_trait]
impl MessageRelay for TelegramRelay {
    fn name(&self) -> &'static str {
        "telegram"
    }

    async fn deliver(&self, text: &str) -> Result<(), RelayError> {
        let chunks = split_chunks(text, MESSAGE_MAX_CHARS);

        for (i, chunk) in chunks.iter().enumerate() {
            match self.send(chunk, Some(PARSE_MODE)).await {
                Ok(()) => {}
                Err(RelayError::Http { status: 400, body }) => {
                    warn!(
                        "⚠️ [TELEGRAM] Markdown rejected for chunk {}/{} ({}), resending as plain text",
                        i + 1,
                        chunks.len(),
                        body
                    );
                    self.send(chunk, None).await?;
                }
                Err(e) => return Err(e),
            }
        }

        info!("📤 [TELEGRAM] Delivered {} message(s)", chunks.len());
        Ok(())
    }
}

/// Split on line boundaries so every chunk fits in `max_chars` characters.
/// Lines longer than the limit are cut hard.
pub fn split_chunks(text: &str, max_chars: usize) -> Vec<String> {
    if text.chars().count() <= max_chars {
        return vec![text.to_string()];
    }

    let mut chunks = Vec::new();
    let mut current = String::new();
    let mut current_len = 0;

    for line in text.split('\n') {
        let line_len = line.chars().count();

        if line_len > max_chars {
            if !current.is_empty() {
                chunks.push(std::mem::take(&mut current));
                current_len = 0;
            }
            let chars: Vec<char> = line.chars().collect();
            for piece in chars.chunks(max_chars) {
                chunks.push(piece.iter().collect());
            }
            continue;
        }

        let cost = if current.is_empty() { line_len } else { line_len + 1 };
        if !current.is_empty() && current_len + cost > max_chars {
            chunks.push(std::mem::take(&mut current));
            current_len = 0;
        }

        if !current.is_empty() {
            current.push('\n');
            current_len += 1;
        }
        current.push_str(line);
        current_len += line_len;
    }

    if !current.is_empty() {
        chunks.push(current);
    }

    chunks
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_short_text_is_single_chunk() {
        assert_eq!(split_chunks("BUY @ 2350", 4096), vec!["BUY @ 2350".to_string()]);
    }

    #[test]
    fn test_splits_on_line_boundaries() {
        let text = "aaaa\nbbbb\ncccc";
        let chunks = split_chunks(text, 9);
        assert_eq!(chunks, vec!["aaaa\nbbbb".to_string(), "cccc".to_string()]);
    }

    #[test]
    fn test_long_line_is_hard_split() {
        let text = "x".repeat(25);
        let chunks = split_chunks(&text, 10);
        assert_eq!(chunks.len(), 3);
        assert!(chunks.iter().all(|c| c.chars().count() <= 10));
        assert_eq!(chunks.concat(), text);
    }

    #[test]
    fn test_counts_characters_not_bytes() {
        // Thai text is three bytes per character in UTF-8.
        let text = "ทองคำ".repeat(10);
        assert_eq!(split_chunks(&text, 50).len(), 1);
    }

    #[test]
    fn test_every_chunk_respects_limit() {
        let text = (0..2000).map(|i| format!("line {}", i)).collect::<Vec<_>>().join("\n");
        let chunks = split_chunks(&text, MESSAGE_MAX_CHARS);
        assert!(chunks.len() > 1);
        assert!(chunks.iter().all(|c| c.chars().count() <= MESSAGE_MAX_CHARS));
        assert_eq!(chunks.join("\n"), text);
    }

    #[test]
    fn test_send_url_trims_trailing_slash() {
        let relay = TelegramRelay::new("https://api.telegram.org/", "123:abc", "42").unwrap();
        assert_eq!(relay.send_url, "https://api.telegram.org/bot123:abc/sendMessage");
    }
}
