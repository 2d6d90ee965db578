//! Chat transports. They decode platform updates into intake events and deliver
//! rendered messages back.

pub mod cli;
pub mod telegram;

use std::pin::Pin;

use async_trait::async_trait;
use futures::Stream;

use crate::error::ChannelError;
use crate::intake::{IntakeEvent, UserId};
use crate::render::OutgoingMessage;

pub use cli::CliChannel;
pub use telegram::TelegramChannel;

/// A decoded inbound update, already validated into an [`IntakeEvent`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct InboundUpdate {
    pub user_id: UserId,
    /// Where replies go.
    pub chat_id: String,
    pub event: IntakeEvent,
    /// Set for button presses; the transport must acknowledge these.
    pub callback_id: Option<String>,
}

impl InboundUpdate {
    pub fn new(user_id: UserId, chat_id: impl Into<String>, event: IntakeEvent) -> Self {
        Self {
            user_id,
            chat_id: chat_id.into(),
            event,
            callback_id: None,
        }
    }

    pub fn with_callback_id(mut self, id: impl Into<String>) -> Self {
        self.callback_id = Some(id.into());
        self
    }
}

/// Stream of inbound updates produced by a transport.
pub type UpdateStream = Pin<Box<dyn Stream<Item = InboundUpdate> + Send>>;

/// A chat platform the bot talks through.
#[async_trait]
pub trait ChatTransport: Send + Sync {
    fn name(&self) -> &str;

    /// Start receiving updates.
    async fn start(&self) -> Result<UpdateStream, ChannelError>;

    /// Deliver a message to a chat.
    async fn send(&self, chat_id: &str, message: &OutgoingMessage) -> Result<(), ChannelError>;

    /// Acknowledge a button press so the client stops its spinner.
    async fn acknowledge(&self, _callback_id: &str) -> Result<(), ChannelError> {
        Ok(())
    }

    async fn health_check(&self) -> Result<(), ChannelError> {
        Ok(())
    }
}
