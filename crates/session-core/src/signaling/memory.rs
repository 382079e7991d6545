use async_trait::async_trait;
use futures::StreamExt;
use parking_lot::Mutex;
use std::collections::{HashMap, HashSet};
use std::sync::Arc;
use tokio::sync::mpsc;
use tracing::{debug, warn};

use super::channel::{SignalingChannel, SignalingEvent, SignalingSubscription};
use super::messages::SignalingMessage;
use crate::errors::{Result, SessionError};
use crate::types::Identity;

#[derive(Default)]
struct HubState {
    subscribers: HashMap<Identity, Vec<mpsc::UnboundedSender<SignalingEvent>>>,
    disconnected: HashSet<Identity>,
    log: Vec<SignalingMessage>,
}

/// In-process relay routing messages by their `to` field
///
/// Behaves like a socket relay: messages to an identity nobody is
/// subscribed as are dropped, and a disconnected client can neither send
/// nor receive.
#[derive(Clone, Default)]
pub struct InMemorySignalingHub {
    state: Arc<Mutex<HubState>>,
}

impl InMemorySignalingHub {
    pub fn new() -> Self {
        Self::default()
    }

    /// A channel handle acting on behalf of `identity`
    pub fn client(&self, identity: impl Into<Identity>) -> Arc<HubClient> {
        Arc::new(HubClient {
            identity: identity.into(),
            hub: self.clone(),
        })
    }

    /// Drop every subscription of `identity` and refuse its sends
    pub fn disconnect(&self, identity: &Identity) {
        let senders = {
            let mut state = self.state.lock();
            state.disconnected.insert(identity.clone());
            state.subscribers.remove(identity).unwrap_or_default()
        };
        for tx in senders {
            let _ = tx.send(SignalingEvent::Disconnected {
                reason: format!("{} disconnected from relay", identity),
            });
        }
        debug!("Disconnected {} from signaling hub", identity);
    }

    /// Every message accepted by the hub, in send order
    pub fn sent_messages(&self) -> Vec<SignalingMessage> {
        self.state.lock().log.clone()
    }

    pub fn messages_to(&self, identity: &Identity) -> Vec<SignalingMessage> {
        self.state
            .lock()
            .log
            .iter()
            .filter(|m| m.recipient() == identity)
            .cloned()
            .collect()
    }

    fn route(&self, sender: &Identity, message: SignalingMessage) -> Result<()> {
        let mut state = self.state.lock();
        if state.disconnected.contains(sender) {
            return Err(SessionError::SignalingLost(format!(
                "{} is disconnected from the relay",
                sender
            )));
        }
        state.log.push(message.clone());

        let recipient = message.recipient().clone();
        match state.subscribers.get_mut(&recipient) {
            Some(senders) => {
                senders.retain(|tx| tx.send(SignalingEvent::Message(message.clone())).is_ok());
                debug!("Relayed {} from {} to {}", message.type_name(), sender, recipient);
            }
            None => warn!("No subscriber for {}, dropping {}", recipient, message.type_name()),
        }
        Ok(())
    }

    fn register(&self, identity: &Identity) -> Result<mpsc::UnboundedReceiver<SignalingEvent>> {
        let mut state = self.state.lock();
        if state.disconnected.contains(identity) {
            return Err(SessionError::SignalingLost(format!(
                "{} is disconnected from the relay",
                identity
            )));
        }
        let (tx, rx) = mpsc::unbounded_channel();
        state.subscribers.entry(identity.clone()).or_default().push(tx);
        Ok(rx)
    }
}

/// One participant's connection to an [`InMemorySignalingHub`]
pub struct HubClient {
    identity: Identity,
    hub: InMemorySignalingHub,
}

impl HubClient {
    pub fn identity(&self) -> &Identity {
        &self.identity
    }
}

#[async_trait]
impl SignalingChannel for HubClient {
    async fn send(&self, message: SignalingMessage) -> Result<()> {
        self.hub.route(&self.identity, message)
    }

    async fn subscribe(&self, identity: &Identity) -> Result<SignalingSubscription> {
        let rx = self.hub.register(identity)?;
        let stream = futures::stream::unfold(rx, |mut rx| async move {
            rx.recv().await.map(|event| (event, rx))
        });
        Ok(stream.boxed())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::{EndReason, SignalPayload};
    use serde_json::json;

    fn offer(to: &str, from: &str) -> SignalingMessage {
        SignalingMessage::IncomingCall {
            to: to.into(),
            from: from.into(),
            signal: SignalPayload::new(json!({"type": "offer", "sdp": "D1"})),
        }
    }

    #[tokio::test]
    async fn test_routes_by_recipient() {
        let hub = InMemorySignalingHub::new();
        let doctor = hub.client("doc-1");
        let patient = hub.client("pat-7");
        let mut inbox = patient.subscribe(patient.identity()).await.unwrap();

        doctor.send(offer("pat-7", "doc-1")).await.unwrap();
        doctor.send(offer("someone-else", "doc-1")).await.unwrap();

        assert_eq!(inbox.next().await, Some(SignalingEvent::Message(offer("pat-7", "doc-1"))));
        assert_eq!(hub.sent_messages().len(), 2);
        assert_eq!(hub.messages_to(&"pat-7".into()).len(), 1);
    }

    #[tokio::test]
    async fn test_disconnect_notifies_and_refuses_sends() {
        let hub = InMemorySignalingHub::new();
        let patient = hub.client("pat-7");
        let mut inbox = patient.subscribe(patient.identity()).await.unwrap();

        hub.disconnect(patient.identity());

        assert!(matches!(inbox.next().await, Some(SignalingEvent::Disconnected { .. })));
        assert_eq!(inbox.next().await, None);

        let result = patient
            .send(SignalingMessage::CallEnded {
                to: "doc-1".into(),
                from: "pat-7".into(),
                reason: EndReason::Hangup,
            })
            .await;
        assert!(matches!(result, Err(SessionError::SignalingLost(_))));
        assert!(hub.sent_messages().is_empty());
    }
}
