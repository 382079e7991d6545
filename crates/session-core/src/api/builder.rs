use std::sync::Arc;
use tokio::sync::{broadcast, mpsc};

use super::manager::CallSessionManager;
use crate::adapters::{MediaDevices, PeerConnectionFactory};
use crate::config::CallConfig;
use crate::errors::{Result, SessionError};
use crate::signaling::SignalingChannel;
use crate::state_machine::{ActionContext, StateMachine};
use crate::types::{AppointmentContext, Identity};

/// Fluent construction of a [`CallSessionManager`]
///
/// ```no_run
/// # use std::sync::Arc;
/// # use medcall_session_core::prelude::*;
/// # async fn example() -> Result<()> {
/// let hub = InMemorySignalingHub::new();
/// let manager = CallSessionManagerBuilder::new()
///     .with_local_identity("doc-1")
///     .with_signaling(hub.client("doc-1"))
///     .with_peer_factory(LoopbackPeerFactory::new())
///     .with_media_devices(FakeMediaDevices::new())
///     .build()
///     .await?;
/// # Ok(())
/// # }
/// ```
#[derive(Default)]
pub struct CallSessionManagerBuilder {
    config: CallConfig,
    local_identity: Option<Identity>,
    signaling: Option<Arc<dyn SignalingChannel>>,
    peers: Option<Arc<dyn PeerConnectionFactory>>,
    media: Option<Arc<dyn MediaDevices>>,
}

impl CallSessionManagerBuilder {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_config(mut self, config: CallConfig) -> Self {
        self.config = config;
        self
    }

    pub fn with_local_identity(mut self, identity: impl Into<Identity>) -> Self {
        self.local_identity = Some(identity.into());
        self
    }

    /// Use the identity of whoever is looking at the consultation screen
    pub fn with_appointment(self, appointment: &AppointmentContext) -> Self {
        self.with_local_identity(appointment.local_identity().clone())
    }

    pub fn with_signaling(mut self, channel: Arc<dyn SignalingChannel>) -> Self {
        self.signaling = Some(channel);
        self
    }

    pub fn with_peer_factory(mut self, factory: impl PeerConnectionFactory + 'static) -> Self {
        self.peers = Some(Arc::new(factory));
        self
    }

    pub fn with_media_devices(mut self, devices: impl MediaDevices + 'static) -> Self {
        self.media = Some(Arc::new(devices));
        self
    }

    /// Subscribe to signaling and start the manager's background tasks
    pub async fn build(self) -> Result<CallSessionManager> {
        self.config.validate()?;
        let local_identity = self
            .local_identity
            .ok_or_else(|| SessionError::Config("local identity is required".to_string()))?;
        let signaling = self
            .signaling
            .ok_or_else(|| SessionError::Config("signaling channel is required".to_string()))?;
        let peers = self
            .peers
            .ok_or_else(|| SessionError::Config("peer connection factory is required".to_string()))?;
        let media = self
            .media
            .ok_or_else(|| SessionError::Config("media devices are required".to_string()))?;

        // One subscription for the manager's whole lifetime
        let subscription = signaling.subscribe(&local_identity).await?;

        let (events_tx, _) = broadcast::channel(self.config.event_channel_capacity);
        let (adapter_tx, adapter_rx) = mpsc::unbounded_channel();
        let ctx = ActionContext {
            config: self.config.clone(),
            signaling,
            peers,
            media,
            adapter_tx,
        };
        let machine = StateMachine::new(ctx, events_tx);

        Ok(CallSessionManager::start(
            local_identity,
            self.config,
            machine,
            subscription,
            adapter_rx,
        ))
    }
}
