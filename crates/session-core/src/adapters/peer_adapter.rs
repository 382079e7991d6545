use async_trait::async_trait;
use tokio::sync::mpsc;

use crate::errors::Result;
use crate::state_table::EventType;
use crate::types::{MediaStream, Role, SessionId, SignalPayload};

/// Parameters for creating a peer connection
#[derive(Debug, Clone)]
pub struct PeerRequest {
    pub session_id: SessionId,
    pub role: Role,
    pub local_stream: MediaStream,
}

/// Callbacks a peer connection reports back
#[derive(Debug, Clone, PartialEq)]
pub enum PeerEvent {
    /// Offer (Initiator) or answer (Responder) ready to relay; once per round
    LocalDescriptionReady(SignalPayload),
    RemoteStream(MediaStream),
    Failed(String),
}

impl PeerEvent {
    fn into_event_type(self) -> EventType {
        match self {
            PeerEvent::LocalDescriptionReady(signal) => EventType::LocalDescriptionReady { signal },
            PeerEvent::RemoteStream(stream) => EventType::RemoteStream { stream },
            PeerEvent::Failed(message) => EventType::HandshakeFailed { message },
        }
    }
}

/// Posts peer events into the manager's adapter queue, tagged with the
/// session they belong to
#[derive(Debug, Clone)]
pub struct PeerEventSender {
    session_id: SessionId,
    tx: mpsc::UnboundedSender<(SessionId, EventType)>,
}

impl PeerEventSender {
    pub(crate) fn new(session_id: SessionId, tx: mpsc::UnboundedSender<(SessionId, EventType)>) -> Self {
        Self { session_id, tx }
    }

    pub fn session_id(&self) -> &SessionId {
        &self.session_id
    }

    /// Returns false once the manager has shut down
    pub fn send(&self, event: PeerEvent) -> bool {
        self.tx
            .send((self.session_id.clone(), event.into_event_type()))
            .is_ok()
    }
}

/// Creates the peer connection for a session
#[async_trait]
pub trait PeerConnectionFactory: Send + Sync {
    /// An Initiator connection emits its offer on its own after creation.
    /// A Responder connection emits its answer once it is handed the offer.
    async fn create(&self, request: PeerRequest, events: PeerEventSender) -> Result<Box<dyn PeerConnection>>;
}

/// Handle to one peer connection, owned by the session manager
#[async_trait]
pub trait PeerConnection: Send + Sync {
    /// Hand the remote party's description to the connection
    async fn accept_remote_description(&mut self, signal: SignalPayload) -> Result<()>;

    /// Tear down the connection. Calling it again is a no-op.
    fn release(&mut self);

    fn is_released(&self) -> bool;
}
