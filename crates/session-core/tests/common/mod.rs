//! Shared helpers for session-core integration tests
#![allow(dead_code)]

use async_trait::async_trait;
use medcall_session_core::prelude::*;
use parking_lot::Mutex;
use serde_json::json;
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::broadcast;

pub const WAIT: Duration = Duration::from_secs(2);

pub fn init_tracing() {
    let _ = tracing_subscriber::fmt()
        .with_env_filter("medcall_session_core=debug")
        .with_test_writer()
        .try_init();
}

pub fn offer(sdp: &str) -> SignalPayload {
    SignalPayload::new(json!({"type": "offer", "sdp": sdp}))
}

pub fn answer(sdp: &str) -> SignalPayload {
    SignalPayload::new(json!({"type": "answer", "sdp": sdp}))
}

pub async fn build_party(
    hub: &InMemorySignalingHub,
    identity: &str,
    peers: impl PeerConnectionFactory + 'static,
    media: FakeMediaDevices,
    config: CallConfig,
) -> CallSessionManager {
    CallSessionManagerBuilder::new()
        .with_config(config)
        .with_local_identity(identity)
        .with_signaling(hub.client(identity))
        .with_peer_factory(peers)
        .with_media_devices(media)
        .build()
        .await
        .expect("manager builds")
}

/// A participant running on loopback peers and fake devices
pub struct Party {
    pub manager: CallSessionManager,
    pub peers: LoopbackPeerFactory,
    pub media: FakeMediaDevices,
}

impl Party {
    pub async fn new(hub: &InMemorySignalingHub, identity: &str, config: CallConfig) -> Self {
        Self::with_collaborators(hub, identity, LoopbackPeerFactory::new(), FakeMediaDevices::new(), config)
            .await
    }

    pub async fn with_collaborators(
        hub: &InMemorySignalingHub,
        identity: &str,
        peers: LoopbackPeerFactory,
        media: FakeMediaDevices,
        config: CallConfig,
    ) -> Self {
        let manager = build_party(hub, identity, peers.clone(), media.clone(), config).await;
        Self { manager, peers, media }
    }

    pub async fn media_ready(&self) -> MediaStream {
        self.manager.request_local_media().await.expect("media requested");
        self.manager
            .wait_for_local_media(WAIT)
            .await
            .expect("media acquired")
    }

    pub async fn wait_for(&self, state: CallState) -> CallState {
        self.manager
            .wait_for_state(|s| s == state, WAIT)
            .await
            .unwrap_or_else(|e| panic!("{} never reached {}: {}", self.manager.local_identity(), state, e))
    }
}

/// Run a doctor -> patient call up to `Connected` on both sides
pub async fn connect(doctor: &Party, patient: &Party) {
    doctor.media_ready().await;
    patient.media_ready().await;

    doctor
        .manager
        .place_call(patient.manager.local_identity().clone())
        .await
        .expect("call placed");
    patient.wait_for(CallState::IncomingRinging).await;
    patient.manager.accept_call().await.expect("call accepted");

    doctor.wait_for(CallState::Connected).await;
    patient.wait_for(CallState::Connected).await;
}

pub fn drain(rx: &mut broadcast::Receiver<CallEvent>) -> Vec<CallEvent> {
    let mut events = Vec::new();
    while let Ok(event) = rx.try_recv() {
        events.push(event);
    }
    events
}

#[derive(Default)]
struct ScriptedState {
    requests: Vec<PeerRequest>,
    senders: Vec<PeerEventSender>,
    remote_descriptions: Vec<SignalPayload>,
    released: usize,
}

/// Peer connections whose callbacks the test fires by hand
#[derive(Clone, Default)]
pub struct ScriptedPeerFactory {
    state: Arc<Mutex<ScriptedState>>,
}

impl ScriptedPeerFactory {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn created(&self) -> usize {
        self.state.lock().requests.len()
    }

    pub fn last_request(&self) -> Option<PeerRequest> {
        self.state.lock().requests.last().cloned()
    }

    pub fn remote_descriptions(&self) -> Vec<SignalPayload> {
        self.state.lock().remote_descriptions.clone()
    }

    pub fn released(&self) -> usize {
        self.state.lock().released
    }

    /// Fire a callback from the most recently created connection
    pub fn emit(&self, event: PeerEvent) {
        let sender = self.state.lock().senders.last().cloned();
        let sender = sender.expect("a peer connection was created");
        assert!(sender.send(event), "manager is gone");
    }
}

#[async_trait]
impl PeerConnectionFactory for ScriptedPeerFactory {
    async fn create(&self, request: PeerRequest, events: PeerEventSender) -> Result<Box<dyn PeerConnection>> {
        {
            let mut state = self.state.lock();
            state.requests.push(request);
            state.senders.push(events);
        }
        Ok(Box::new(ScriptedPeer {
            state: self.state.clone(),
            released: false,
        }))
    }
}

struct ScriptedPeer {
    state: Arc<Mutex<ScriptedState>>,
    released: bool,
}

#[async_trait]
impl PeerConnection for ScriptedPeer {
    async fn accept_remote_description(&mut self, signal: SignalPayload) -> Result<()> {
        self.state.lock().remote_descriptions.push(signal);
        Ok(())
    }

    fn release(&mut self) {
        if !self.released {
            self.released = true;
            self.state.lock().released += 1;
        }
    }

    fn is_released(&self) -> bool {
        self.released
    }
}
