//! Chat channel interface.

use anyhow::Result;
use async_trait::async_trait;

use crate::bus::events::OutboundMessage;

/// A chat transport the bot can receive from and reply through.
///
/// `start` spawns the receive loop and returns; inbound messages are pushed
/// onto the bus handed to the channel at construction.
#[async_trait]
pub trait Channel: Send + Sync {
    fn name(&self) -> &str;

    async fn start(&mut self) -> Result<()>;

    async fn stop(&mut self) -> Result<()>;

    async fn send(&self, msg: &OutboundMessage) -> Result<()>;

    fn is_running(&self) -> bool;
}

/// Whether `chat_id` may use the bot. An empty allow list admits everyone.
pub fn is_allowed(allow_from: &[String], chat_id: &str) -> bool {
    allow_from.is_empty() || allow_from.iter().any(|id| id == chat_id)
}
