//! Channel trait and the message types flowing through it.

use std::pin::Pin;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use futures::Stream;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::error::ChannelError;

/// Stream of inbound events produced by [`Channel::start`].
pub type MessageStream = Pin<Box<dyn Stream<Item = IncomingMessage> + Send>>;

/// Who sent an inbound event.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Sender {
    /// Platform user id.
    pub id: i64,
    pub username: Option<String>,
    pub first_name: Option<String>,
    pub last_name: Option<String>,
}

impl Sender {
    pub fn new(id: i64) -> Self {
        Self {
            id,
            ..Default::default()
        }
    }

    pub fn with_username(mut self, username: impl Into<String>) -> Self {
        self.username = Some(username.into());
        self
    }

    pub fn with_first_name(mut self, name: impl Into<String>) -> Self {
        self.first_name = Some(name.into());
        self
    }
}

/// What an inbound event carries.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Payload {
    /// Free text or a slash command.
    Text(String),
    /// Inline-button press; `query_id` must be answered.
    Callback { query_id: String, data: String },
}

/// An inbound event from a channel.
#[derive(Debug, Clone)]
pub struct IncomingMessage {
    pub id: Uuid,
    /// Channel name (e.g. "telegram").
    pub channel: String,
    /// Chat to reply into.
    pub chat_id: i64,
    pub sender: Sender,
    pub payload: Payload,
    pub received_at: DateTime<Utc>,
}

impl IncomingMessage {
    pub fn text(
        channel: impl Into<String>,
        chat_id: i64,
        sender: Sender,
        text: impl Into<String>,
    ) -> Self {
        Self::with_payload(channel, chat_id, sender, Payload::Text(text.into()))
    }

    pub fn callback(
        channel: impl Into<String>,
        chat_id: i64,
        sender: Sender,
        query_id: impl Into<String>,
        data: impl Into<String>,
    ) -> Self {
        Self::with_payload(
            channel,
            chat_id,
            sender,
            Payload::Callback {
                query_id: query_id.into(),
                data: data.into(),
            },
        )
    }

    fn with_payload(channel: impl Into<String>, chat_id: i64, sender: Sender, payload: Payload) -> Self {
        Self {
            id: Uuid::new_v4(),
            channel: channel.into(),
            chat_id,
            sender,
            payload,
            received_at: Utc::now(),
        }
    }
}

/// Markup dialect of an outgoing text.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum ParseMode {
    #[serde(rename = "HTML")]
    Html,
}

impl ParseMode {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Html => "HTML",
        }
    }
}

/// A button attached to a message.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct InlineButton {
    pub text: String,
    pub callback_data: String,
}

impl InlineButton {
    pub fn new(text: impl Into<String>, callback_data: impl Into<String>) -> Self {
        Self {
            text: text.into(),
            callback_data: callback_data.into(),
        }
    }
}

/// Keyboard shown with an outgoing message.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Keyboard {
    /// Persistent reply keyboard; rows of button labels.
    Reply(Vec<Vec<String>>),
    /// Hide any reply keyboard.
    Remove,
    /// Buttons attached to the message itself.
    Inline(Vec<Vec<InlineButton>>),
}

impl Keyboard {
    /// Reply keyboard from string rows.
    pub fn reply<R, S>(rows: R) -> Self
    where
        R: IntoIterator,
        R::Item: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self::Reply(
            rows.into_iter()
                .map(|row| row.into_iter().map(Into::into).collect())
                .collect(),
        )
    }

    /// Bot API `reply_markup` object.
    pub fn to_reply_markup(&self) -> serde_json::Value {
        match self {
            Self::Reply(rows) => {
                let keyboard: Vec<Vec<serde_json::Value>> = rows
                    .iter()
                    .map(|row| {
                        row.iter()
                            .map(|label| serde_json::json!({ "text": label }))
                            .collect()
                    })
                    .collect();
                serde_json::json!({
                    "keyboard": keyboard,
                    "resize_keyboard": true,
                })
            }
            Self::Remove => serde_json::json!({ "remove_keyboard": true }),
            Self::Inline(rows) => serde_json::json!({ "inline_keyboard": rows }),
        }
    }
}

/// A message to deliver.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct OutgoingMessage {
    pub chat_id: i64,
    pub text: String,
    pub parse_mode: Option<ParseMode>,
    pub keyboard: Option<Keyboard>,
}

impl OutgoingMessage {
    /// Plain-text message.
    pub fn plain(chat_id: i64, text: impl Into<String>) -> Self {
        Self {
            chat_id,
            text: text.into(),
            parse_mode: None,
            keyboard: None,
        }
    }

    /// HTML-formatted message.
    pub fn html(chat_id: i64, text: impl Into<String>) -> Self {
        Self {
            parse_mode: Some(ParseMode::Html),
            ..Self::plain(chat_id, text)
        }
    }

    pub fn with_keyboard(mut self, keyboard: Keyboard) -> Self {
        self.keyboard = Some(keyboard);
        self
    }
}

/// A chat transport.
#[async_trait]
pub trait Channel: Send + Sync {
    /// Channel name.
    fn name(&self) -> &str;

    /// Start receiving events.
    async fn start(&self) -> Result<MessageStream, ChannelError>;

    /// Deliver a message.
    async fn send(&self, msg: OutgoingMessage) -> Result<(), ChannelError>;

    /// Acknowledge an inline-button press, optionally with a toast.
    async fn answer_callback(&self, query_id: &str, text: Option<&str>) -> Result<(), ChannelError>;

    /// Check that the transport is reachable.
    async fn health_check(&self) -> Result<(), ChannelError>;

    async fn shutdown(&self) -> Result<(), ChannelError>;
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn reply_keyboard_markup() {
        let kb = Keyboard::reply([vec!["New task", "Tasks"], vec!["Help"]]);
        let markup = kb.to_reply_markup();
        assert_eq!(markup["keyboard"][0][1]["text"], "Tasks");
        assert_eq!(markup["keyboard"][1][0]["text"], "Help");
        assert_eq!(markup["resize_keyboard"], true);
    }

    #[test]
    fn inline_keyboard_markup() {
        let kb = Keyboard::Inline(vec![vec![InlineButton::new("✅ Done", "complete:7")]]);
        let markup = kb.to_reply_markup();
        assert_eq!(markup["inline_keyboard"][0][0]["text"], "✅ Done");
        assert_eq!(markup["inline_keyboard"][0][0]["callback_data"], "complete:7");
    }

    #[test]
    fn remove_keyboard_markup() {
        assert_eq!(
            Keyboard::Remove.to_reply_markup(),
            serde_json::json!({ "remove_keyboard": true })
        );
    }

    #[test]
    fn outgoing_builders() {
        let msg = OutgoingMessage::html(5, "<b>hi</b>").with_keyboard(Keyboard::Remove);
        assert_eq!(msg.parse_mode, Some(ParseMode::Html));
        assert_eq!(msg.keyboard, Some(Keyboard::Remove));
        assert_eq!(OutgoingMessage::plain(5, "hi").parse_mode, None);
    }

    #[test]
    fn incoming_constructors() {
        let sender = Sender::new(42).with_username("ann");
        let msg = IncomingMessage::callback("telegram", 9, sender.clone(), "q1", "complete:3");
        assert_eq!(msg.chat_id, 9);
        assert_eq!(msg.sender, sender);
        assert_eq!(
            msg.payload,
            Payload::Callback {
                query_id: "q1".into(),
                data: "complete:3".into()
            }
        );
        let text = IncomingMessage::text("telegram", 9, Sender::new(1), "hi");
        assert_ne!(msg.id, text.id);
    }
}
