use async_trait::async_trait;
use parking_lot::Mutex;
use serde_json::json;
use std::collections::HashSet;
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::sync::Arc;
use std::time::Duration;
use tracing::debug;

use super::media_adapter::MediaDevices;
use super::peer_adapter::{PeerConnection, PeerConnectionFactory, PeerEvent, PeerEventSender, PeerRequest};
use crate::errors::{Result, SessionError};
use crate::types::{MediaConstraints, MediaStream, Role, SignalPayload, StreamId};

/// Counters shared by every connection a [`LoopbackPeerFactory`] creates
#[derive(Debug, Default)]
pub struct LoopbackStats {
    created: AtomicUsize,
    released: AtomicUsize,
    remote_descriptions: AtomicUsize,
}

impl LoopbackStats {
    pub fn created(&self) -> usize {
        self.created.load(Ordering::SeqCst)
    }

    pub fn released(&self) -> usize {
        self.released.load(Ordering::SeqCst)
    }

    pub fn remote_descriptions(&self) -> usize {
        self.remote_descriptions.load(Ordering::SeqCst)
    }

    /// Connections created and not yet released
    pub fn active(&self) -> usize {
        self.created().saturating_sub(self.released())
    }
}

/// In-process peer connections that complete the handshake immediately
///
/// Descriptions are JSON objects `{"type": "offer" | "answer", "sdp": ...}`.
/// A remote stream is reported as soon as the remote description is applied.
#[derive(Clone, Default)]
pub struct LoopbackPeerFactory {
    fail_handshake: Arc<AtomicBool>,
    stats: Arc<LoopbackStats>,
}

impl LoopbackPeerFactory {
    pub fn new() -> Self {
        Self::default()
    }

    /// Make every later remote description fail with a handshake error
    pub fn with_failing_handshake(self) -> Self {
        self.fail_handshake.store(true, Ordering::SeqCst);
        self
    }

    pub fn set_fail_handshake(&self, fail: bool) {
        self.fail_handshake.store(fail, Ordering::SeqCst);
    }

    pub fn stats(&self) -> Arc<LoopbackStats> {
        self.stats.clone()
    }
}

#[async_trait]
impl PeerConnectionFactory for LoopbackPeerFactory {
    async fn create(&self, request: PeerRequest, events: PeerEventSender) -> Result<Box<dyn PeerConnection>> {
        self.stats.created.fetch_add(1, Ordering::SeqCst);
        debug!("Loopback peer created for {} as {}", request.session_id, request.role);

        if request.role == Role::Initiator {
            events.send(PeerEvent::LocalDescriptionReady(description("offer", &request)));
        }

        Ok(Box::new(LoopbackPeer {
            request,
            events,
            fail_handshake: self.fail_handshake.clone(),
            stats: self.stats.clone(),
            released: false,
        }))
    }
}

fn description(kind: &str, request: &PeerRequest) -> SignalPayload {
    SignalPayload::new(json!({
        "type": kind,
        "sdp": format!("v=0 loopback {} {}", request.session_id, request.local_stream.id),
    }))
}

struct LoopbackPeer {
    request: PeerRequest,
    events: PeerEventSender,
    fail_handshake: Arc<AtomicBool>,
    stats: Arc<LoopbackStats>,
    released: bool,
}

#[async_trait]
impl PeerConnection for LoopbackPeer {
    async fn accept_remote_description(&mut self, signal: SignalPayload) -> Result<()> {
        if self.released {
            return Err(SessionError::Handshake("peer connection already released".to_string()));
        }
        if signal.as_value().get("sdp").is_none() {
            return Err(SessionError::Handshake("remote description has no sdp".to_string()));
        }
        self.stats.remote_descriptions.fetch_add(1, Ordering::SeqCst);

        if self.fail_handshake.load(Ordering::SeqCst) {
            self.events
                .send(PeerEvent::Failed("loopback handshake rejected".to_string()));
            return Ok(());
        }

        if self.request.role == Role::Responder {
            self.events
                .send(PeerEvent::LocalDescriptionReady(description("answer", &self.request)));
        }
        let remote = MediaStream::remote(format!("remote-{}", self.request.session_id));
        self.events.send(PeerEvent::RemoteStream(remote));
        Ok(())
    }

    fn release(&mut self) {
        if !self.released {
            self.released = true;
            self.stats.released.fetch_add(1, Ordering::SeqCst);
            debug!("Loopback peer released for {}", self.request.session_id);
        }
    }

    fn is_released(&self) -> bool {
        self.released
    }
}

/// Capture devices that hand out synthetic streams
#[derive(Clone, Default)]
pub struct FakeMediaDevices {
    deny: Arc<AtomicBool>,
    delay: Arc<Mutex<Option<Duration>>>,
    acquired: Arc<AtomicUsize>,
    active: Arc<Mutex<HashSet<StreamId>>>,
}

impl FakeMediaDevices {
    pub fn new() -> Self {
        Self::default()
    }

    /// Every acquisition fails as if the user refused camera access
    pub fn denying() -> Self {
        let devices = Self::default();
        devices.set_deny(true);
        devices
    }

    pub fn with_delay(self, delay: Duration) -> Self {
        *self.delay.lock() = Some(delay);
        self
    }

    pub fn set_deny(&self, deny: bool) {
        self.deny.store(deny, Ordering::SeqCst);
    }

    pub fn acquired_count(&self) -> usize {
        self.acquired.load(Ordering::SeqCst)
    }

    /// Streams handed out and not yet released
    pub fn active_count(&self) -> usize {
        self.active.lock().len()
    }
}

#[async_trait]
impl MediaDevices for FakeMediaDevices {
    async fn acquire(&self, constraints: MediaConstraints) -> Result<MediaStream> {
        let delay = *self.delay.lock();
        if let Some(delay) = delay {
            tokio::time::sleep(delay).await;
        }
        if self.deny.load(Ordering::SeqCst) {
            return Err(SessionError::MediaAcquisition("permission denied".to_string()));
        }

        let stream = MediaStream::local(&constraints);
        self.acquired.fetch_add(1, Ordering::SeqCst);
        self.active.lock().insert(stream.id.clone());
        Ok(stream)
    }

    fn release(&self, stream: &MediaStream) {
        self.active.lock().remove(&stream.id);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::state_table::EventType;
    use crate::types::SessionId;
    use tokio::sync::mpsc;

    fn request(role: Role) -> PeerRequest {
        PeerRequest {
            session_id: SessionId::new(),
            role,
            local_stream: MediaStream::local(&MediaConstraints::default()),
        }
    }

    #[tokio::test]
    async fn test_initiator_offers_on_create() {
        let factory = LoopbackPeerFactory::new();
        let (tx, mut rx) = mpsc::unbounded_channel();
        let req = request(Role::Initiator);
        let sender = PeerEventSender::new(req.session_id.clone(), tx);

        let mut peer = factory.create(req, sender).await.unwrap();

        let (_, event) = rx.recv().await.unwrap();
        match event {
            EventType::LocalDescriptionReady { signal } => {
                assert_eq!(signal.as_value()["type"], "offer");
            }
            other => panic!("unexpected event {:?}", other),
        }

        peer.release();
        peer.release();
        assert!(peer.is_released());
        assert_eq!(factory.stats().released(), 1);
        assert_eq!(factory.stats().active(), 0);
    }

    #[tokio::test]
    async fn test_responder_answers_then_streams() {
        let factory = LoopbackPeerFactory::new();
        let (tx, mut rx) = mpsc::unbounded_channel();
        let req = request(Role::Responder);
        let sender = PeerEventSender::new(req.session_id.clone(), tx);

        let mut peer = factory.create(req, sender).await.unwrap();
        peer.accept_remote_description(SignalPayload::new(json!({"type": "offer", "sdp": "D1"})))
            .await
            .unwrap();

        let (_, first) = rx.recv().await.unwrap();
        let (_, second) = rx.recv().await.unwrap();
        assert!(matches!(first, EventType::LocalDescriptionReady { .. }));
        assert!(matches!(second, EventType::RemoteStream { .. }));
    }

    #[tokio::test]
    async fn test_failing_handshake_reports_failure() {
        let factory = LoopbackPeerFactory::new().with_failing_handshake();
        let (tx, mut rx) = mpsc::unbounded_channel();
        let req = request(Role::Responder);
        let sender = PeerEventSender::new(req.session_id.clone(), tx);

        let mut peer = factory.create(req, sender).await.unwrap();
        peer.accept_remote_description(SignalPayload::new(json!({"type": "offer", "sdp": "D1"})))
            .await
            .unwrap();

        let (_, event) = rx.recv().await.unwrap();
        assert!(matches!(event, EventType::HandshakeFailed { .. }));
    }

    #[tokio::test]
    async fn test_fake_media_tracks_active_streams() {
        let devices = FakeMediaDevices::new();
        let stream = devices.acquire(MediaConstraints::default()).await.unwrap();
        assert_eq!(devices.active_count(), 1);

        devices.release(&stream);
        assert_eq!(devices.active_count(), 0);
        assert_eq!(devices.acquired_count(), 1);

        devices.set_deny(true);
        let err = devices.acquire(MediaConstraints::default()).await.unwrap_err();
        assert!(matches!(err, SessionError::MediaAcquisition(_)));
    }
}
