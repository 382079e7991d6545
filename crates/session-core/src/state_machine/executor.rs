use std::sync::Arc;
use tokio::sync::{broadcast, watch};
use tracing::{debug, error, info};

use super::actions::{execute_action, ActionContext};
use super::guards::check_guard;
use crate::adapters::PeerConnection;
use crate::api::events::CallEvent;
use crate::errors::{Result, SessionError};
use crate::session_store::SessionState;
use crate::state_table::{Action, EventTemplate, EventType, MasterStateTable, MASTER_TABLE};
use crate::types::{CallState, EndReason, FailureReason};

/// The session together with the peer connection it exclusively owns
pub struct ActiveCall {
    pub session: SessionState,
    pub connection: Option<Box<dyn PeerConnection>>,
}

impl ActiveCall {
    pub fn new(session: SessionState) -> Self {
        Self {
            session,
            connection: None,
        }
    }
}

/// Runs events through the state table against the active call
pub struct StateMachine {
    table: Arc<MasterStateTable>,
    ctx: ActionContext,
    events_tx: broadcast::Sender<CallEvent>,
    state_tx: watch::Sender<CallState>,
}

impl StateMachine {
    pub fn new(ctx: ActionContext, events_tx: broadcast::Sender<CallEvent>) -> Self {
        Self::with_table(MASTER_TABLE.clone(), ctx, events_tx)
    }

    pub fn with_table(
        table: Arc<MasterStateTable>,
        ctx: ActionContext,
        events_tx: broadcast::Sender<CallEvent>,
    ) -> Self {
        let (state_tx, _) = watch::channel(CallState::Idle);
        Self {
            table,
            ctx,
            events_tx,
            state_tx,
        }
    }

    pub fn context(&self) -> &ActionContext {
        &self.ctx
    }

    pub fn subscribe_events(&self) -> broadcast::Receiver<CallEvent> {
        self.events_tx.subscribe()
    }

    pub fn watch_state(&self) -> watch::Receiver<CallState> {
        self.state_tx.subscribe()
    }

    /// Point state watchers at a session that was created or discarded
    /// outside of a transition
    pub fn announce_state(&self, state: CallState) {
        self.state_tx.send_replace(state);
    }

    /// Process an event against the active call
    ///
    /// A terminal session or a missing transition is a precondition error
    /// and leaves the call untouched. An action error fails the session.
    /// Returns the state the call is in afterwards.
    pub async fn process_event(&self, call: &mut ActiveCall, event: EventType) -> Result<CallState> {
        let old_state = call.session.call_state;
        let kind = event.kind();
        debug!(
            "Processing {:?} for session {} in state {}",
            kind, call.session.session_id, old_state
        );

        if old_state.is_terminal() {
            return Err(SessionError::precondition(event.type_name(), old_state));
        }

        let transition = self
            .table
            .find(call.session.role, old_state, kind, |guard| check_guard(guard, call, &event))
            .cloned()
            .ok_or_else(|| SessionError::precondition(event.type_name(), old_state))?;

        let mut actions_executed = Vec::with_capacity(transition.actions.len());
        for action in &transition.actions {
            if let Err(err) = execute_action(action, &event, call, &self.ctx).await {
                error!(
                    "Action {:?} failed for session {}: {}",
                    action, call.session.session_id, err
                );
                actions_executed.push(action.clone());
                self.fail_session(call, &event, actions_executed, &err).await;
                return Err(err);
            }
            actions_executed.push(action.clone());
        }

        let next_state = transition.next_state.unwrap_or(old_state);
        call.session.transition_to(next_state, kind, actions_executed);
        if next_state != old_state {
            info!(
                "Session {} {} -> {} on {:?}",
                call.session.session_id, old_state, next_state, kind
            );
        }

        let mut events_published = Vec::new();
        if next_state != old_state {
            self.state_tx.send_replace(next_state);
            events_published.push(CallEvent::StateChanged {
                session_id: call.session.session_id.clone(),
                old_state,
                new_state: next_state,
            });
        }
        events_published.extend(
            transition
                .publish_events
                .iter()
                .filter_map(|template| build_event(*template, &call.session)),
        );
        self.publish(&events_published);

        Ok(next_state)
    }

    /// Move the call to `Failed` after an action error, releasing everything it holds
    async fn fail_session(
        &self,
        call: &mut ActiveCall,
        event: &EventType,
        actions: Vec<Action>,
        err: &SessionError,
    ) {
        if !matches!(err.failure_reason(), FailureReason::SignalingLost) {
            let notify = Action::NotifyRemoteEnd(EndReason::Error);
            let _ = execute_action(&notify, event, call, &self.ctx).await;
        }
        if let Some(mut connection) = call.connection.take() {
            connection.release();
        }
        let session = &mut call.session;
        if let Some(stream) = session.local_stream.take() {
            self.ctx.media.release(&stream);
        }
        session.remote_stream = None;
        session.pending_remote_signal = None;
        session.failure = Some(err.to_string());

        let old_state = session.call_state;
        let reason = err.failure_reason();
        let new_state = CallState::Failed(reason);
        session.transition_to(new_state, event.kind(), actions);
        self.state_tx.send_replace(new_state);

        self.publish(&[
            CallEvent::StateChanged {
                session_id: session.session_id.clone(),
                old_state,
                new_state,
            },
            CallEvent::CallFailed {
                session_id: session.session_id.clone(),
                reason,
                message: err.to_string(),
            },
        ]);
    }

    fn publish(&self, events: &[CallEvent]) {
        for event in events {
            // No receivers is fine; the UI may not be listening yet
            let _ = self.events_tx.send(event.clone());
        }
    }
}

fn build_event(template: EventTemplate, session: &SessionState) -> Option<CallEvent> {
    let session_id = session.session_id.clone();
    let event = match template {
        EventTemplate::IncomingCall => CallEvent::IncomingCall {
            session_id,
            from: session.remote_identity.clone()?,
        },
        EventTemplate::LocalStreamReady => CallEvent::LocalStreamReady {
            session_id,
            stream: session.local_stream.clone()?,
        },
        EventTemplate::RemoteStreamReady => CallEvent::RemoteStreamReady {
            session_id,
            stream: session.remote_stream.clone()?,
        },
        EventTemplate::CallConnected => CallEvent::CallConnected {
            session_id,
            remote: session.remote_identity.clone()?,
        },
        EventTemplate::CallEnded => CallEvent::CallEnded {
            session_id,
            reason: session.termination,
        },
        EventTemplate::CallFailed => CallEvent::CallFailed {
            session_id,
            reason: match session.call_state {
                CallState::Failed(reason) => reason,
                _ => FailureReason::Internal,
            },
            message: session
                .failure
                .clone()
                .unwrap_or_else(|| session.call_state.to_string()),
        },
    };
    Some(event)
}
