//! Messages passed between chat channels and the dispatcher.

use std::collections::HashMap;

use chrono::{DateTime, Utc};

/// A message received from a chat channel.
#[derive(Debug, Clone)]
pub struct InboundMessage {
    pub channel: String,
    pub chat_id: String,
    pub sender: String,
    pub content: String,
    pub received_at: DateTime<Utc>,
    pub metadata: HashMap<String, serde_json::Value>,
}

impl InboundMessage {
    pub fn new(channel: &str, chat_id: &str, sender: &str, content: &str) -> Self {
        Self {
            channel: channel.to_string(),
            chat_id: chat_id.to_string(),
            sender: sender.to_string(),
            content: content.to_string(),
            received_at: Utc::now(),
            metadata: HashMap::new(),
        }
    }
}

/// A reply to deliver through a chat channel.
#[derive(Debug, Clone)]
pub struct OutboundMessage {
    pub channel: String,
    pub chat_id: String,
    /// HTML-formatted body.
    pub content: String,
    /// Attach the main menu keyboard.
    pub show_menu: bool,
}

impl OutboundMessage {
    pub fn new(channel: &str, chat_id: &str, content: &str) -> Self {
        Self {
            channel: channel.to_string(),
            chat_id: chat_id.to_string(),
            content: content.to_string(),
            show_menu: false,
        }
    }

    pub fn with_menu(mut self) -> Self {
        self.show_menu = true;
        self
    }
}
