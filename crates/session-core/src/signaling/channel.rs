use async_trait::async_trait;
use futures::stream::BoxStream;

use super::messages::SignalingMessage;
use crate::errors::Result;
use crate::types::Identity;

/// What a subscription yields
#[derive(Debug, Clone, PartialEq)]
pub enum SignalingEvent {
    Message(SignalingMessage),
    /// The relay dropped this client; no further messages follow
    Disconnected { reason: String },
}

/// Messages addressed to one identity. End of stream means disconnected.
pub type SignalingSubscription = BoxStream<'static, SignalingEvent>;

/// Relay for signaling messages between call participants
#[async_trait]
pub trait SignalingChannel: Send + Sync {
    /// Relay a message to its recipient
    async fn send(&self, message: SignalingMessage) -> Result<()>;

    /// Receive messages addressed to `identity`
    async fn subscribe(&self, identity: &Identity) -> Result<SignalingSubscription>;
}
