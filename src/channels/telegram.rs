//! Telegram channel over the Bot API using long polling.

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::Duration;

use anyhow::{anyhow, Result};
use async_trait::async_trait;
use reqwest::Client;
use serde::Deserialize;
use serde_json::{json, Value};
use tokio::sync::mpsc::UnboundedSender;
use tracing::{debug, info, warn};

use super::base::{is_allowed, Channel};
use crate::bot::commands::Command;
use crate::bus::events::{InboundMessage, OutboundMessage};
use crate::config::schema::TelegramConfig;

const RETRY_DELAY: Duration = Duration::from_secs(5);

#[derive(Debug, Deserialize)]
struct ApiResponse<T> {
    ok: bool,
    result: Option<T>,
    description: Option<String>,
}

#[derive(Debug, Deserialize)]
struct Update {
    update_id: i64,
    message: Option<TgMessage>,
}

#[derive(Debug, Deserialize)]
struct TgMessage {
    message_id: i64,
    chat: TgChat,
    from: Option<TgUser>,
    text: Option<String>,
}

#[derive(Debug, Deserialize)]
struct TgChat {
    id: i64,
    #[serde(rename = "type")]
    kind: Option<String>,
}

#[derive(Debug, Deserialize)]
struct TgUser {
    id: i64,
    username: Option<String>,
}

/// Telegram bot channel.
pub struct TelegramChannel {
    config: TelegramConfig,
    token: String,
    bus_tx: UnboundedSender<InboundMessage>,
    running: Arc<AtomicBool>,
    client: Client,
}

impl TelegramChannel {
    pub fn new(config: TelegramConfig, token: String, bus_tx: UnboundedSender<InboundMessage>) -> Self {
        // Leave headroom over the long-poll timeout so the server answers first.
        let client = Client::builder()
            .timeout(Duration::from_secs(config.poll_timeout_secs + 10))
            .build()
            .unwrap_or_default();
        Self {
            config,
            token,
            bus_tx,
            running: Arc::new(AtomicBool::new(false)),
            client,
        }
    }

    fn method_url(api_base: &str, token: &str, method: &str) -> String {
        format!("{}/bot{}/{}", api_base.trim_end_matches('/'), token, method)
    }

    /// Convert a Bot API update into a bus message, applying the allow list.
    fn to_inbound(update: Update, allow_from: &[String]) -> Option<InboundMessage> {
        let message = update.message?;
        let text = message.text?;
        let chat_id = message.chat.id.to_string();

        if !is_allowed(allow_from, &chat_id) {
            debug!("Telegram: ignoring message from non-allowed chat {}", chat_id);
            return None;
        }

        let sender = message
            .from
            .as_ref()
            .map(|u| u.id.to_string())
            .unwrap_or_else(|| chat_id.clone());
        let mut msg = InboundMessage::new("telegram", &chat_id, &sender, &text);
        msg.metadata
            .insert("message_id".to_string(), json!(message.message_id));
        msg.metadata
            .insert("update_id".to_string(), json!(update.update_id));
        if let Some(username) = message.from.and_then(|u| u.username) {
            msg.metadata.insert("username".to_string(), json!(username));
        }
        if let Some(kind) = message.chat.kind {
            msg.metadata.insert("chat_type".to_string(), json!(kind));
        }
        Some(msg)
    }

    /// Request body for `sendMessage`.
    fn send_payload(msg: &OutboundMessage) -> Value {
        let mut payload = json!({
            "chat_id": msg.chat_id,
            "text": msg.content,
            "parse_mode": "HTML",
            "disable_web_page_preview": true,
        });
        if msg.show_menu {
            let keyboard: Vec<Vec<Value>> = Command::menu()
                .into_iter()
                .map(|row| row.into_iter().map(|label| json!({ "text": label })).collect())
                .collect();
            payload["reply_markup"] = json!({
                "keyboard": keyboard,
                "resize_keyboard": true,
            });
        }
        payload
    }

    async fn poll_once(
        client: &Client,
        url: &str,
        offset: i64,
        timeout_secs: u64,
    ) -> Result<Vec<Update>> {
        let response = client
            .get(url)
            .query(&[
                ("offset", offset.to_string()),
                ("timeout", timeout_secs.to_string()),
                ("allowed_updates", "[\"message\"]".to_string()),
            ])
            .send()
            .await
            .map_err(|e| anyhow!("getUpdates request failed: {}", e.without_url()))?;

        let body: ApiResponse<Vec<Update>> = response
            .json()
            .await
            .map_err(|e| anyhow!("getUpdates returned invalid JSON: {}", e.without_url()))?;
        if !body.ok {
            return Err(anyhow!(
                "getUpdates failed: {}",
                body.description.unwrap_or_else(|| "unknown error".to_string())
            ));
        }
        Ok(body.result.unwrap_or_default())
    }
}

#[async_trait]
impl Channel for TelegramChannel {
    fn name(&self) -> &str {
        "telegram"
    }

    async fn start(&mut self) -> Result<()> {
        self.running.store(true, Ordering::SeqCst);

        let url = Self::method_url(&self.config.api_base, &self.token, "getUpdates");
        let client = self.client.clone();
        let bus_tx = self.bus_tx.clone();
        let running = self.running.clone();
        let allow_from = self.config.allow_from.clone();
        let timeout_secs = self.config.poll_timeout_secs;

        info!("Starting Telegram long polling...");

        tokio::spawn(async move {
            let mut offset = 0i64;
            while running.load(Ordering::SeqCst) {
                match TelegramChannel::poll_once(&client, &url, offset, timeout_secs).await {
                    Ok(updates) => {
                        for update in updates {
                            offset = offset.max(update.update_id + 1);
                            if let Some(msg) = TelegramChannel::to_inbound(update, &allow_from) {
                                if bus_tx.send(msg).is_err() {
                                    info!("Inbound bus closed, stopping Telegram polling");
                                    return;
                                }
                            }
                        }
                    }
                    Err(e) => {
                        warn!("Telegram polling error: {}", e);
                        if running.load(Ordering::SeqCst) {
                            info!("Retrying Telegram polling in {}s...", RETRY_DELAY.as_secs());
                            tokio::time::sleep(RETRY_DELAY).await;
                        }
                    }
                }
            }
        });

        Ok(())
    }

    async fn stop(&mut self) -> Result<()> {
        self.running.store(false, Ordering::SeqCst);
        info!("Telegram channel stopped");
        Ok(())
    }

    async fn send(&self, msg: &OutboundMessage) -> Result<()> {
        if msg.channel != self.name() {
            return Err(anyhow!(
                "reply for channel '{}' cannot go through {}",
                msg.channel,
                self.name()
            ));
        }
        let url = Self::method_url(&self.config.api_base, &self.token, "sendMessage");
        let response = self
            .client
            .post(&url)
            .json(&Self::send_payload(msg))
            .send()
            .await
            .map_err(|e| anyhow!("sendMessage request failed: {}", e.without_url()))?;

        let status = response.status();
        if !status.is_success() {
            let text = response.text().await.unwrap_or_default();
            return Err(anyhow!("sendMessage returned HTTP {}: {}", status, text));
        }
        Ok(())
    }

    fn is_running(&self) -> bool {
        self.running.load(Ordering::SeqCst)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn updates(body: &str) -> Vec<Update> {
        let parsed: ApiResponse<Vec<Update>> = serde_json::from_str(body).unwrap();
        assert!(parsed.ok);
        parsed.result.unwrap()
    }

    const BODY: &str = r#"{
        "ok": true,
        "result": [
            {
                "update_id": 100,
                "message": {
                    "message_id": 7,
                    "date": 1771000000,
                    "chat": {"id": 42, "type": "private"},
                    "from": {"id": 42, "is_bot": false, "username": "alice"},
                    "text": "⏱️ Timer"
                }
            },
            {
                "update_id": 101,
                "message": {
                    "message_id": 8,
                    "chat": {"id": 42, "type": "private"},
                    "sticker": {"file_id": "x"}
                }
            },
            {"update_id": 102, "edited_message": {}}
        ]
    }"#;

    #[test]
    fn test_parse_updates() {
        let updates = updates(BODY);
        assert_eq!(updates.len(), 3);
        assert_eq!(updates[0].update_id, 100);
        assert!(updates[2].message.is_none());
    }

    #[test]
    fn test_only_text_messages_become_inbound() {
        let inbound: Vec<InboundMessage> = updates(BODY)
            .into_iter()
            .filter_map(|u| TelegramChannel::to_inbound(u, &[]))
            .collect();
        assert_eq!(inbound.len(), 1);
        assert_eq!(inbound[0].chat_id, "42");
        assert_eq!(inbound[0].content, "⏱️ Timer");
        assert_eq!(inbound[0].metadata["username"], "alice");
    }

    #[test]
    fn test_allow_list_is_applied() {
        let allow = vec!["7".to_string()];
        let inbound: Vec<InboundMessage> = updates(BODY)
            .into_iter()
            .filter_map(|u| TelegramChannel::to_inbound(u, &allow))
            .collect();
        assert!(inbound.is_empty());
    }

    #[test]
    fn test_error_response() {
        let parsed: ApiResponse<Vec<Update>> =
            serde_json::from_str(r#"{"ok": false, "description": "Unauthorized"}"#).unwrap();
        assert!(!parsed.ok);
        assert_eq!(parsed.description.as_deref(), Some("Unauthorized"));
    }

    #[test]
    fn test_send_payload_with_menu() {
        let msg = OutboundMessage::new("telegram", "42", "<b>hi</b>").with_menu();
        let payload = TelegramChannel::send_payload(&msg);
        assert_eq!(payload["parse_mode"], "HTML");
        assert_eq!(payload["chat_id"], "42");
        assert_eq!(payload["reply_markup"]["keyboard"][0][1]["text"], "⏱️ Timer");
        assert_eq!(payload["reply_markup"]["resize_keyboard"], true);
    }

    #[test]
    fn test_send_payload_without_menu() {
        let payload = TelegramChannel::send_payload(&OutboundMessage::new("telegram", "42", "x"));
        assert!(payload.get("reply_markup").is_none());
    }

    #[tokio::test]
    async fn test_send_rejects_other_channel() {
        let (tx, _rx) = tokio::sync::mpsc::unbounded_channel();
        let channel = TelegramChannel::new(TelegramConfig::default(), "1:abc".to_string(), tx);
        let err = channel
            .send(&OutboundMessage::new("cli", "42", "x"))
            .await
            .unwrap_err();
        assert!(err.to_string().contains("'cli'"));
    }

    #[test]
    fn test_method_url() {
        assert_eq!(
            TelegramChannel::method_url("https://api.telegram.org/", "1:abc", "getUpdates"),
            "https://api.telegram.org/bot1:abc/getUpdates"
        );
    }
}
