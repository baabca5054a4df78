//! Telegram channel — long-polls the Bot API for updates.
//!
//! Accepts text messages and inline-button callbacks from private chats,
//! filtered by the user allowlist.

use async_trait::async_trait;
use secrecy::{ExposeSecret, SecretString};
use serde_json::Value;

use crate::channels::{
    Channel, IncomingMessage, Keyboard, MessageStream, OutgoingMessage, ParseMode, Sender,
};
use crate::error::ChannelError;

/// sendMessage text limit, in characters.
const TELEGRAM_MAX_MESSAGE_LENGTH: usize = 4096;

/// Long-poll timeout passed to getUpdates, in seconds.
const POLL_TIMEOUT_SECS: u64 = 30;

/// Bot API transport for a single bot token.
pub struct TelegramChannel {
    bot_token: SecretString,
    allowed_users: Vec<String>,
    client: reqwest::Client,
}

impl TelegramChannel {
    pub fn new(bot_token: SecretString, allowed_users: Vec<String>) -> Self {
        Self {
            bot_token,
            allowed_users,
            client: reqwest::Client::new(),
        }
    }

    fn api_url(&self, method: &str) -> String {
        api_url(&self.bot_token, method)
    }

    /// Send a single chunk (≤4096 chars), with a plain-text retry when the
    /// formatted attempt is rejected.
    async fn send_chunk(
        &self,
        chat_id: i64,
        text: &str,
        parse_mode: Option<ParseMode>,
        keyboard: Option<&Keyboard>,
    ) -> Result<(), ChannelError> {
        let body = message_body(chat_id, text, parse_mode, keyboard);
        let resp = self
            .client
            .post(self.api_url("sendMessage"))
            .json(&body)
            .send()
            .await
            .map_err(|e| ChannelError::SendFailed {
                name: "telegram".into(),
                reason: e.to_string(),
            })?;

        if resp.status().is_success() {
            return Ok(());
        }

        let status = resp.status();
        let first_err = resp.text().await.unwrap_or_default();
        if parse_mode.is_none() {
            return Err(ChannelError::SendFailed {
                name: "telegram".into(),
                reason: format!("sendMessage returned {status}: {first_err}"),
            });
        }

        tracing::warn!(
            status = ?status,
            chat_id,
            "Telegram sendMessage with HTML failed; retrying without parse_mode"
        );

        let plain_body = message_body(chat_id, text, None, keyboard);
        let plain_resp = self
            .client
            .post(self.api_url("sendMessage"))
            .json(&plain_body)
            .send()
            .await
            .map_err(|e| ChannelError::SendFailed {
                name: "telegram".into(),
                reason: e.to_string(),
            })?;

        if !plain_resp.status().is_success() {
            let plain_err = plain_resp.text().await.unwrap_or_default();
            return Err(ChannelError::SendFailed {
                name: "telegram".into(),
                reason: format!("sendMessage failed (html: {status}, plain: {plain_err})"),
            });
        }

        Ok(())
    }
}

#[async_trait]
impl Channel for TelegramChannel {
    fn name(&self) -> &str {
        "telegram"
    }

    async fn start(&self) -> Result<MessageStream, ChannelError> {
        let (tx, rx) = tokio::sync::mpsc::unbounded_channel();
        let url = self.api_url("getUpdates");
        let allowed_users = self.allowed_users.clone();
        let client = self.client.clone();

        tokio::spawn(async move {
            let mut offset: i64 = 0;

            tracing::info!(timeout_secs = POLL_TIMEOUT_SECS, "Polling Telegram for updates");

            loop {
                let body = serde_json::json!({
                    "offset": offset,
                    "timeout": POLL_TIMEOUT_SECS,
                    "allowed_updates": ["message", "callback_query"]
                });

                let resp = match client.post(&url).json(&body).send().await {
                    Ok(r) => r,
                    Err(e) => {
                        tracing::warn!(error = %e, "getUpdates request failed");
                        tokio::time::sleep(std::time::Duration::from_secs(5)).await;
                        continue;
                    }
                };

                let data: Value = match resp.json().await {
                    Ok(d) => d,
                    Err(e) => {
                        tracing::warn!(error = %e, "getUpdates returned malformed JSON");
                        tokio::time::sleep(std::time::Duration::from_secs(5)).await;
                        continue;
                    }
                };

                if let Some(reason) = rejection(&data) {
                    tracing::warn!(reason = %reason, "getUpdates rejected by Telegram");
                    tokio::time::sleep(std::time::Duration::from_secs(5)).await;
                    continue;
                }

                let Some(results) = data.get("result").and_then(Value::as_array) else {
                    continue;
                };

                for update in results {
                    // Acknowledge even updates we drop below.
                    if let Some(uid) = update.get("update_id").and_then(Value::as_i64) {
                        offset = uid + 1;
                    }

                    let Some(incoming) = parse_update(update) else {
                        continue;
                    };

                    if !is_sender_allowed(&allowed_users, &incoming.sender) {
                        tracing::warn!(
                            user_id = incoming.sender.id,
                            username = incoming.sender.username.as_deref().unwrap_or("-"),
                            "Dropping update from a user outside the allowlist"
                        );
                        continue;
                    }

                    if tx.send(incoming).is_err() {
                        tracing::info!("Update receiver dropped; stopping poller");
                        return;
                    }
                }
            }
        });

        let stream = futures::stream::unfold(rx, |mut rx| async move {
            rx.recv().await.map(|msg| (msg, rx))
        });

        Ok(Box::pin(stream))
    }

    async fn send(&self, msg: OutgoingMessage) -> Result<(), ChannelError> {
        let chunks = split_message(&msg.text, TELEGRAM_MAX_MESSAGE_LENGTH);
        let last = chunks.len().saturating_sub(1);

        // The keyboard rides on the final chunk only.
        for (i, chunk) in chunks.iter().enumerate() {
            let keyboard = if i == last { msg.keyboard.as_ref() } else { None };
            self.send_chunk(msg.chat_id, chunk, msg.parse_mode, keyboard)
                .await?;
        }
        Ok(())
    }

    async fn answer_callback(&self, query_id: &str, text: Option<&str>) -> Result<(), ChannelError> {
        let mut body = serde_json::json!({ "callback_query_id": query_id });
        if let Some(text) = text {
            body["text"] = Value::String(text.to_string());
        }

        let resp = self
            .client
            .post(self.api_url("answerCallbackQuery"))
            .json(&body)
            .send()
            .await
            .map_err(|e| ChannelError::Http(e.to_string()))?;

        if !resp.status().is_success() {
            let err = resp.text().await.unwrap_or_default();
            return Err(ChannelError::SendFailed {
                name: "telegram".into(),
                reason: format!("answerCallbackQuery failed: {err}"),
            });
        }
        Ok(())
    }

    async fn health_check(&self) -> Result<(), ChannelError> {
        let resp = self
            .client
            .get(self.api_url("getMe"))
            .send()
            .await
            .map_err(|e| ChannelError::StartupFailed {
                name: "telegram".into(),
                reason: e.to_string(),
            })?;

        if resp.status().is_success() {
            Ok(())
        } else {
            Err(ChannelError::StartupFailed {
                name: "telegram".into(),
                reason: format!("getMe returned {}", resp.status()),
            })
        }
    }

    async fn shutdown(&self) -> Result<(), ChannelError> {
        tracing::info!("Telegram channel stopped");
        Ok(())
    }
}

// ── Helpers ─────────────────────────────────────────────────────────

fn api_url(token: &SecretString, method: &str) -> String {
    format!("https://api.telegram.org/bot{}/{method}", token.expose_secret())
}

/// `*` admits everyone; otherwise an entry must equal the sender's
/// username (case-sensitive) or numeric id.
fn is_sender_allowed(allowed_users: &[String], sender: &Sender) -> bool {
    let id = sender.id.to_string();
    allowed_users.iter().any(|entry| {
        entry == "*" || *entry == id || sender.username.as_deref() == Some(entry.as_str())
    })
}

/// Why the Bot API refused a call (`"ok": false`), if it did.
fn rejection(data: &Value) -> Option<String> {
    if data.get("ok").and_then(Value::as_bool) == Some(true) {
        return None;
    }
    let code = data.get("error_code").and_then(Value::as_i64).unwrap_or_default();
    let description = data
        .get("description")
        .and_then(Value::as_str)
        .unwrap_or("no description");
    Some(format!("{code} {description}"))
}

/// Build a sendMessage request body.
fn message_body(
    chat_id: i64,
    text: &str,
    parse_mode: Option<ParseMode>,
    keyboard: Option<&Keyboard>,
) -> Value {
    let mut body = serde_json::json!({
        "chat_id": chat_id,
        "text": text,
    });
    if let Some(mode) = parse_mode {
        body["parse_mode"] = Value::String(mode.as_str().to_string());
    }
    if let Some(kb) = keyboard {
        body["reply_markup"] = kb.to_reply_markup();
    }
    body
}

fn parse_sender(from: &Value) -> Option<Sender> {
    let id = from.get("id").and_then(Value::as_i64)?;
    let field = |key: &str| from.get(key).and_then(Value::as_str).map(String::from);
    Some(Sender {
        id,
        username: field("username"),
        first_name: field("first_name"),
        last_name: field("last_name"),
    })
}

/// Private chat id of a message, if it came from one.
fn private_chat_id(message: &Value) -> Option<i64> {
    let chat = message.get("chat")?;
    if chat.get("type").and_then(Value::as_str) != Some("private") {
        return None;
    }
    chat.get("id").and_then(Value::as_i64)
}

/// Turn one getUpdates entry into an inbound event.
///
/// Returns `None` for anything other than a private-chat text message or a
/// callback query on a private-chat message.
fn parse_update(update: &Value) -> Option<IncomingMessage> {
    if let Some(message) = update.get("message") {
        let text = message.get("text").and_then(Value::as_str)?;
        let chat_id = private_chat_id(message)?;
        let sender = parse_sender(message.get("from")?)?;
        return Some(IncomingMessage::text("telegram", chat_id, sender, text));
    }

    if let Some(query) = update.get("callback_query") {
        let query_id = query.get("id").and_then(Value::as_str)?;
        let data = query.get("data").and_then(Value::as_str).unwrap_or_default();
        let chat_id = private_chat_id(query.get("message")?)?;
        let sender = parse_sender(query.get("from")?)?;
        return Some(IncomingMessage::callback(
            "telegram", chat_id, sender, query_id, data,
        ));
    }

    None
}

/// Byte index of the `max_chars`-th character, or the full length.
fn char_boundary(text: &str, max_chars: usize) -> usize {
    text.char_indices()
        .nth(max_chars)
        .map(|(idx, _)| idx)
        .unwrap_or(text.len())
}

/// Cut `text` into pieces of at most `max_len` characters, preferring a
/// newline, then a space, as the cut point.
fn split_message(text: &str, max_len: usize) -> Vec<String> {
    if text.chars().count() <= max_len {
        return vec![text.to_string()];
    }

    let mut chunks = Vec::new();
    let mut remaining = text;

    while !remaining.is_empty() {
        let limit = char_boundary(remaining, max_len);
        if limit == remaining.len() {
            chunks.push(remaining.to_string());
            break;
        }

        let chunk = &remaining[..limit];
        let split_at = chunk
            .rfind('\n')
            .or_else(|| chunk.rfind(' '))
            .unwrap_or(limit);

        // A cut at 0 would never make progress.
        let split_at = if split_at == 0 { limit } else { split_at };

        chunks.push(remaining[..split_at].to_string());
        remaining = remaining[split_at..].trim_start();
    }

    chunks
}

// ── Tests ───────────────────────────────────────────────────────────
