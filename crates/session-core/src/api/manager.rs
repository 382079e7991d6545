//! The call session manager
//!
//! Thin wrapper over the state machine: every operation becomes an
//! [`EventType`] processed against the single active call. Two background
//! tasks feed it, one draining the signaling subscription and one draining
//! adapter completions.

use futures::StreamExt;
use parking_lot::Mutex as SyncMutex;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::{broadcast, mpsc, watch, Mutex};
use tokio::task::JoinHandle;
use tracing::{debug, error, info, warn};

use super::events::CallEvent;
use crate::config::CallConfig;
use crate::errors::{Result, SessionError};
use crate::session_store::{SessionState, TransitionRecord};
use crate::signaling::{SignalingEvent, SignalingMessage, SignalingSubscription};
use crate::state_machine::{ActiveCall, StateMachine};
use crate::state_table::EventType;
use crate::types::{
    CallState, EndReason, Identity, MediaStream, Role, SessionId, SignalPayload,
};

const NO_SESSION: &str = "NoSession";

struct ManagerInner {
    local_identity: Identity,
    config: CallConfig,
    machine: StateMachine,
    active: Mutex<Option<ActiveCall>>,
    signaling_up: AtomicBool,
}

/// Manages the video call of one participant
///
/// Holds at most one call session. A session that reached `Ended` or
/// `Failed` stays inspectable until the next media request or incoming
/// call replaces it, or until [`reset`](Self::reset).
pub struct CallSessionManager {
    inner: Arc<ManagerInner>,
    tasks: SyncMutex<Vec<JoinHandle<()>>>,
}

impl CallSessionManager {
    pub(crate) fn start(
        local_identity: Identity,
        config: CallConfig,
        machine: StateMachine,
        subscription: SignalingSubscription,
        adapter_rx: mpsc::UnboundedReceiver<(SessionId, EventType)>,
    ) -> Self {
        let inner = Arc::new(ManagerInner {
            local_identity,
            config,
            machine,
            active: Mutex::new(None),
            signaling_up: AtomicBool::new(true),
        });

        let tasks = vec![
            tokio::spawn(run_adapter_loop(inner.clone(), adapter_rx)),
            tokio::spawn(run_signaling_loop(inner.clone(), subscription)),
        ];
        info!("Call session manager started for {}", inner.local_identity);

        Self {
            inner,
            tasks: SyncMutex::new(tasks),
        }
    }

    pub fn local_identity(&self) -> &Identity {
        &self.inner.local_identity
    }

    pub fn config(&self) -> &CallConfig {
        &self.inner.config
    }

    pub fn is_signaling_connected(&self) -> bool {
        self.inner.signaling_up.load(Ordering::SeqCst)
    }

    // ===== Call operations =====

    /// Start capturing local audio and video
    ///
    /// Returns once capture is requested. Completion is reported through
    /// `LocalStreamReady` or `CallFailed`.
    pub async fn request_local_media(&self) -> Result<()> {
        let mut guard = self.inner.active.lock().await;
        let call = self.inner.current_or_fresh(&mut guard);
        self.inner.machine.process_event(call, EventType::RequestMedia).await?;
        Ok(())
    }

    /// Call `target` using the local media already bound to the session
    pub async fn place_call(&self, target: impl Into<Identity>) -> Result<()> {
        if !self.is_signaling_connected() {
            return Err(SessionError::SignalingLost(
                "signaling channel is disconnected".to_string(),
            ));
        }
        let target = target.into();
        info!("Placing call from {} to {}", self.inner.local_identity, target);
        self.inner.dispatch(EventType::PlaceCall { target }).await
    }

    pub async fn accept_call(&self) -> Result<()> {
        self.inner.dispatch(EventType::AcceptCall).await
    }

    pub async fn decline_call(&self) -> Result<()> {
        self.inner.dispatch(EventType::DeclineCall).await
    }

    /// Hang up. Always succeeds once the session is over or absent.
    pub async fn end_call(&self) -> Result<()> {
        let mut guard = self.inner.active.lock().await;
        match guard.as_mut() {
            Some(call) if !call.session.is_terminal() => {
                self.inner.machine.process_event(call, EventType::EndCall).await?;
                Ok(())
            }
            _ => {
                debug!("end_call with no active call");
                Ok(())
            }
        }
    }

    /// Deliver an offer as if it came from the signaling channel
    pub async fn on_incoming_signal(&self, from: impl Into<Identity>, signal: SignalPayload) -> Result<()> {
        self.inner.handle_incoming_call(from.into(), signal).await
    }

    pub async fn on_remote_answer(&self, signal: SignalPayload) -> Result<()> {
        self.inner.dispatch(EventType::RemoteAnswer { signal }).await
    }

    pub async fn on_remote_stream(&self, stream: MediaStream) -> Result<()> {
        self.inner.dispatch(EventType::RemoteStream { stream }).await
    }

    /// Deliver a `call-ended` notice. Notices from anyone but the current
    /// remote party are ignored.
    pub async fn on_remote_end(&self, from: impl Into<Identity>, reason: EndReason) -> Result<()> {
        self.inner.handle_remote_end(from.into(), reason).await
    }

    /// Discard a finished session so the screen returns to its pre-call state
    pub async fn reset(&self) -> Result<()> {
        let mut guard = self.inner.active.lock().await;
        if let Some(call) = guard.as_ref() {
            if !call.session.is_terminal() {
                return Err(SessionError::precondition("reset", call.session.call_state));
            }
        }
        *guard = None;
        self.inner.machine.announce_state(CallState::Idle);
        Ok(())
    }

    /// End any active call and stop the background tasks
    pub async fn shutdown(&self) -> Result<()> {
        let result = self.end_call().await;
        for task in self.tasks.lock().drain(..) {
            task.abort();
        }
        info!("Call session manager for {} shut down", self.inner.local_identity);
        result
    }

    // ===== Observers =====

    pub async fn state(&self) -> CallState {
        self.read(|s| s.call_state).await.unwrap_or(CallState::Idle)
    }

    pub async fn session_id(&self) -> Option<SessionId> {
        self.read(|s| s.session_id.clone()).await
    }

    pub async fn role(&self) -> Option<Role> {
        self.read(|s| s.role).await.flatten()
    }

    pub async fn local_stream(&self) -> Option<MediaStream> {
        self.read(|s| s.local_stream.clone()).await.flatten()
    }

    pub async fn remote_stream(&self) -> Option<MediaStream> {
        self.read(|s| s.remote_stream.clone()).await.flatten()
    }

    pub async fn pending_remote_signal(&self) -> Option<SignalPayload> {
        self.read(|s| s.pending_remote_signal.clone()).await.flatten()
    }

    /// Copy of the current session, if any
    pub async fn snapshot(&self) -> Option<SessionState> {
        self.read(SessionState::clone).await
    }

    pub async fn history(&self) -> Vec<TransitionRecord> {
        self.read(|s| s.history().records()).await.unwrap_or_default()
    }

    pub fn watch_state(&self) -> watch::Receiver<CallState> {
        self.inner.machine.watch_state()
    }

    pub fn subscribe(&self) -> broadcast::Receiver<CallEvent> {
        self.inner.machine.subscribe_events()
    }

    /// Wait until the call state satisfies `predicate`
    pub async fn wait_for_state<F>(&self, predicate: F, timeout: Duration) -> Result<CallState>
    where
        F: Fn(CallState) -> bool,
    {
        self.wait_for(
            timeout,
            |session| {
                let state = session.map_or(CallState::Idle, |s| s.call_state);
                predicate(state).then_some(Ok(state))
            },
            || SessionError::Internal(format!("timed out after {:?} waiting for call state", timeout)),
        )
        .await
    }

    /// Wait until local media is bound to the session or acquisition fails
    pub async fn wait_for_local_media(&self, timeout: Duration) -> Result<MediaStream> {
        self.wait_for(
            timeout,
            |session| {
                let Some(session) = session else {
                    return Some(Err(SessionError::precondition("wait_for_local_media", NO_SESSION)));
                };
                if let Some(stream) = &session.local_stream {
                    return Some(Ok(stream.clone()));
                }
                match session.call_state {
                    CallState::Failed(_) => Some(Err(SessionError::MediaAcquisition(
                        session.failure.clone().unwrap_or_else(|| session.call_state.to_string()),
                    ))),
                    CallState::Ended => Some(Err(SessionError::precondition(
                        "wait_for_local_media",
                        CallState::Ended,
                    ))),
                    _ => None,
                }
            },
            || SessionError::MediaAcquisition(format!("no local media after {:?}", timeout)),
        )
        .await
    }

    async fn read<T>(&self, f: impl FnOnce(&SessionState) -> T) -> Option<T> {
        let guard = self.inner.active.lock().await;
        guard.as_ref().map(|call| f(&call.session))
    }

    async fn wait_for<T, F, E>(&self, timeout: Duration, mut check: F, on_timeout: E) -> Result<T>
    where
        F: FnMut(Option<&SessionState>) -> Option<Result<T>>,
        E: FnOnce() -> SessionError,
    {
        // Subscribe before the first check so no event slips in between
        let mut events = self.subscribe();
        let deadline = tokio::time::Instant::now() + timeout;
        loop {
            {
                let guard = self.inner.active.lock().await;
                if let Some(result) = check(guard.as_ref().map(|call| &call.session)) {
                    return result;
                }
            }
            match tokio::time::timeout_at(deadline, events.recv()).await {
                Ok(Ok(_)) | Ok(Err(broadcast::error::RecvError::Lagged(_))) => continue,
                Ok(Err(broadcast::error::RecvError::Closed)) => {
                    return Err(SessionError::Internal("call session manager shut down".to_string()));
                }
                Err(_) => return Err(on_timeout()),
            }
        }
    }
}

impl Drop for CallSessionManager {
    fn drop(&mut self) {
        for task in self.tasks.lock().drain(..) {
            task.abort();
        }
    }
}

impl ManagerInner {
    /// The current call, replaced by a fresh session if absent or finished
    fn current_or_fresh<'a>(&self, slot: &'a mut Option<ActiveCall>) -> &'a mut ActiveCall {
        if matches!(slot.as_ref(), Some(call) if call.session.is_terminal()) {
            *slot = None;
        }
        slot.get_or_insert_with(|| {
            let session = SessionState::new(self.local_identity.clone(), self.config.history_limit);
            debug!("Created session {} for {}", session.session_id, self.local_identity);
            self.machine.announce_state(session.call_state);
            ActiveCall::new(session)
        })
    }

    /// Process an event against the current call without creating one
    async fn dispatch(&self, event: EventType) -> Result<()> {
        let mut guard = self.active.lock().await;
        let Some(call) = guard.as_mut() else {
            return Err(SessionError::precondition(event.type_name(), NO_SESSION));
        };
        self.machine.process_event(call, event).await?;
        Ok(())
    }

    async fn handle_incoming_call(&self, from: Identity, signal: SignalPayload) -> Result<()> {
        let mut guard = self.active.lock().await;
        let call = self.current_or_fresh(&mut guard);
        let busy_in = call.session.call_state;
        let same_party = call.session.remote_identity.as_ref() == Some(&from);

        let event = EventType::IncomingSignal {
            from: from.clone(),
            signal,
        };
        match self.machine.process_event(call, event).await {
            Ok(state) => {
                info!("Incoming call from {} for {}, now {}", from, self.local_identity, state);
                Ok(())
            }
            Err(err) if err.is_precondition() => {
                drop(guard);
                warn!("Rejecting call from {} as busy in state {}", from, busy_in);
                // A repeated offer from the current remote party is not a second caller
                if self.config.reply_busy && !same_party {
                    self.reply_busy(from).await;
                }
                Err(err)
            }
            Err(err) => Err(err),
        }
    }

    async fn reply_busy(&self, to: Identity) {
        let message = SignalingMessage::CallEnded {
            to,
            from: self.local_identity.clone(),
            reason: EndReason::Busy,
        };
        if let Err(e) = self.machine.context().signaling.send(message).await {
            warn!("Failed to send busy reply: {}", e);
        }
    }

    async fn handle_remote_end(&self, from: Identity, reason: EndReason) -> Result<()> {
        let mut guard = self.active.lock().await;
        match guard.as_mut() {
            Some(call)
                if !call.session.is_terminal() && call.session.remote_identity.as_ref() == Some(&from) =>
            {
                info!("Remote party {} ended the call ({:?})", from, reason);
                self.machine.process_event(call, EventType::RemoteEnded { reason }).await?;
                Ok(())
            }
            _ => {
                debug!("Ignoring call-ended from {}: not the current remote party", from);
                Ok(())
            }
        }
    }

    async fn handle_signal(&self, message: SignalingMessage) {
        if message.recipient() != &self.local_identity {
            debug!("Ignoring {} addressed to {}", message.type_name(), message.recipient());
            return;
        }
        let type_name = message.type_name();
        let result = match message {
            SignalingMessage::IncomingCall { from, signal, .. } => self.handle_incoming_call(from, signal).await,
            SignalingMessage::CallAnswered { signal, .. } => self.dispatch(EventType::RemoteAnswer { signal }).await,
            SignalingMessage::CallEnded { from, reason, .. } => self.handle_remote_end(from, reason).await,
        };
        match result {
            Ok(()) => {}
            Err(err) if err.is_precondition() => warn!("Discarded {}: {}", type_name, err),
            Err(err) => error!("Handling {} failed: {}", type_name, err),
        }
    }

    async fn handle_signaling_lost(&self, reason: String) {
        self.signaling_up.store(false, Ordering::SeqCst);
        warn!("Signaling lost for {}: {}", self.local_identity, reason);

        let mut guard = self.active.lock().await;
        if let Some(call) = guard.as_mut() {
            if call.session.is_terminal() {
                return;
            }
            if let Err(err) = self.machine.process_event(call, EventType::SignalingLost { reason }).await {
                debug!("Signaling loss did not affect session: {}", err);
            }
        }
    }

    async fn handle_adapter_event(&self, session_id: SessionId, event: EventType) {
        let mut guard = self.active.lock().await;
        let call = match guard.as_mut() {
            Some(call) if call.session.session_id == session_id && !call.session.is_terminal() => call,
            _ => {
                warn!("Discarding stale {} for session {}", event.type_name(), session_id);
                self.release_unclaimed(event);
                return;
            }
        };

        match self.machine.process_event(call, event.clone()).await {
            Ok(state) => debug!("Session {} is {} after adapter event", session_id, state),
            Err(err) if err.is_precondition() => {
                warn!("Discarding {} for session {}: {}", event.type_name(), session_id, err);
                self.release_unclaimed(event);
            }
            Err(err) => error!("Session {} failed: {}", session_id, err),
        }
    }

    /// Release media that no session took ownership of
    fn release_unclaimed(&self, event: EventType) {
        if let EventType::MediaAcquired { stream } = event {
            debug!("Releasing unclaimed local stream {}", stream.id);
            self.machine.context().media.release(&stream);
        }
    }
}

async fn run_adapter_loop(inner: Arc<ManagerInner>, mut rx: mpsc::UnboundedReceiver<(SessionId, EventType)>) {
    while let Some((session_id, event)) = rx.recv().await {
        inner.handle_adapter_event(session_id, event).await;
    }
    debug!("Adapter event loop for {} stopped", inner.local_identity);
}

async fn run_signaling_loop(inner: Arc<ManagerInner>, mut subscription: SignalingSubscription) {
    while let Some(event) = subscription.next().await {
        match event {
            SignalingEvent::Message(message) => inner.handle_signal(message).await,
            SignalingEvent::Disconnected { reason } => {
                inner.handle_signaling_lost(reason).await;
                return;
            }
        }
    }
    inner
        .handle_signaling_lost("signaling subscription closed".to_string())
        .await;
}
