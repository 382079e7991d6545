use std::sync::Arc;
use tokio::sync::mpsc;
use tracing::{debug, info, warn};

use super::executor::ActiveCall;
use crate::adapters::{MediaDevices, PeerConnectionFactory, PeerEventSender, PeerRequest};
use crate::config::CallConfig;
use crate::errors::{Result, SessionError};
use crate::signaling::{SignalingChannel, SignalingMessage};
use crate::state_table::{Action, EventType};
use crate::types::{SessionId, TerminationReason};

/// Collaborators available to actions
pub struct ActionContext {
    pub config: CallConfig,
    pub signaling: Arc<dyn SignalingChannel>,
    pub peers: Arc<dyn PeerConnectionFactory>,
    pub media: Arc<dyn MediaDevices>,
    /// Completions posted back to the manager, tagged with their session
    pub adapter_tx: mpsc::UnboundedSender<(SessionId, EventType)>,
}

fn missing(what: &str, event: &EventType) -> SessionError {
    SessionError::Internal(format!("{} not available for {}", what, event.type_name()))
}

fn as_handshake(err: SessionError) -> SessionError {
    match err {
        SessionError::Handshake(_) => err,
        other => SessionError::Handshake(other.to_string()),
    }
}

/// Execute an action from the state table
pub async fn execute_action(
    action: &Action,
    event: &EventType,
    call: &mut ActiveCall,
    ctx: &ActionContext,
) -> Result<()> {
    debug!("Executing action {:?} for session {}", action, call.session.session_id);
    let session = &mut call.session;

    match action {
        // Media actions
        Action::AcquireLocalMedia => {
            spawn_media_acquisition(session.session_id.clone(), ctx);
        }
        Action::StoreLocalStream => {
            let EventType::MediaAcquired { stream } = event else {
                return Err(missing("local stream", event));
            };
            info!("Local media bound to session {}", session.session_id);
            session.local_stream = Some(stream.clone());
        }
        Action::ReleaseMedia => {
            if let Some(stream) = session.local_stream.take() {
                ctx.media.release(&stream);
                debug!("Released local stream {}", stream.id);
            }
            session.remote_stream = None;
        }

        // Session bookkeeping
        Action::AssumeRole(role) => match session.role {
            None => session.role = Some(*role),
            Some(current) if current == *role => {}
            Some(current) => {
                return Err(SessionError::Internal(format!(
                    "session {} is already {}",
                    session.session_id, current
                )));
            }
        },
        Action::StoreRemoteIdentity => {
            let remote = match event {
                EventType::PlaceCall { target } => target,
                EventType::IncomingSignal { from, .. } => from,
                _ => return Err(missing("remote identity", event)),
            };
            session.remote_identity = Some(remote.clone());
        }
        Action::StorePendingSignal => {
            let EventType::IncomingSignal { signal, .. } = event else {
                return Err(missing("incoming signal", event));
            };
            session.pending_remote_signal = Some(signal.clone());
        }
        Action::ClearPendingSignal => {
            session.pending_remote_signal = None;
        }
        Action::RecordFailure => {
            let message = match event {
                EventType::MediaFailed { message } | EventType::HandshakeFailed { message } => message,
                EventType::SignalingLost { reason } => reason,
                _ => return Err(missing("failure message", event)),
            };
            session.failure = Some(message.clone());
        }
        Action::RecordTermination(reason) => {
            session.termination = Some(*reason);
        }
        Action::RecordRemoteTermination => {
            let EventType::RemoteEnded { reason } = event else {
                return Err(missing("end reason", event));
            };
            session.termination = Some(TerminationReason::from(*reason));
        }

        // Peer connection actions
        Action::CreatePeerConnection => {
            let role = session.role.ok_or_else(|| missing("role", event))?;
            let local_stream = session
                .local_stream
                .clone()
                .ok_or_else(|| missing("local stream", event))?;
            let request = PeerRequest {
                session_id: session.session_id.clone(),
                role,
                local_stream,
            };
            let sender = PeerEventSender::new(session.session_id.clone(), ctx.adapter_tx.clone());
            let connection = ctx.peers.create(request, sender).await.map_err(as_handshake)?;
            info!("Created {} peer connection for session {}", role, session.session_id);
            call.connection = Some(connection);
        }
        Action::ConsumePendingSignal => {
            let signal = session
                .pending_remote_signal
                .take()
                .ok_or_else(|| missing("pending signal", event))?;
            session.remote_description = Some(signal.clone());
            let connection = call.connection.as_mut().ok_or_else(|| missing("peer connection", event))?;
            connection.accept_remote_description(signal).await.map_err(as_handshake)?;
        }
        Action::ApplyRemoteDescription => {
            let EventType::RemoteAnswer { signal } = event else {
                return Err(missing("remote description", event));
            };
            session.remote_description = Some(signal.clone());
            let connection = call.connection.as_mut().ok_or_else(|| missing("peer connection", event))?;
            connection
                .accept_remote_description(signal.clone())
                .await
                .map_err(as_handshake)?;
        }
        Action::StoreRemoteStream => {
            let EventType::RemoteStream { stream } = event else {
                return Err(missing("remote stream", event));
            };
            info!("Remote media bound to session {}", session.session_id);
            session.remote_stream = Some(stream.clone());
        }
        Action::ReleaseConnection => {
            if let Some(mut connection) = call.connection.take() {
                connection.release();
                debug!("Released peer connection for session {}", call.session.session_id);
            }
        }

        // Signaling actions
        Action::SendOffer | Action::SendAnswer => {
            let EventType::LocalDescriptionReady { signal } = event else {
                return Err(missing("local description", event));
            };
            let to = session
                .remote_identity
                .clone()
                .ok_or_else(|| missing("remote identity", event))?;
            session.local_description = Some(signal.clone());

            let message = if *action == Action::SendOffer {
                SignalingMessage::IncomingCall {
                    to,
                    from: session.local_identity.clone(),
                    signal: signal.clone(),
                }
            } else {
                SignalingMessage::CallAnswered {
                    to,
                    signal: signal.clone(),
                }
            };
            info!("Sending {} for session {}", message.type_name(), session.session_id);
            ctx.signaling.send(message).await?;
        }
        Action::NotifyRemoteEnd(reason) => {
            if !ctx.config.notify_remote_on_end {
                debug!("Not notifying remote of {:?} for session {}", reason, session.session_id);
                return Ok(());
            }
            let Some(to) = session.remote_identity.clone() else {
                return Ok(());
            };
            let message = SignalingMessage::CallEnded {
                to,
                from: session.local_identity.clone(),
                reason: *reason,
            };
            // The session is ending either way
            if let Err(e) = ctx.signaling.send(message).await {
                warn!("Failed to send call-ended for session {}: {}", session.session_id, e);
            }
        }
    }

    Ok(())
}

/// Start capture in the background and post the outcome to the adapter queue
fn spawn_media_acquisition(session_id: SessionId, ctx: &ActionContext) {
    let media = ctx.media.clone();
    let tx = ctx.adapter_tx.clone();
    let constraints = ctx.config.media;
    let limit = ctx.config.media_timeout();

    tokio::spawn(async move {
        let result = match limit {
            Some(limit) => match tokio::time::timeout(limit, media.acquire(constraints)).await {
                Ok(result) => result,
                Err(_) => Err(SessionError::MediaAcquisition(format!(
                    "no camera or microphone within {}ms",
                    limit.as_millis()
                ))),
            },
            None => media.acquire(constraints).await,
        };

        let event = match result {
            Ok(stream) => EventType::MediaAcquired { stream },
            Err(e) => {
                warn!("Media acquisition failed for session {}: {}", session_id, e);
                let message = match e {
                    SessionError::MediaAcquisition(message) => message,
                    other => other.to_string(),
                };
                EventType::MediaFailed { message }
            }
        };

        if let Err(mpsc::error::SendError((_, event))) = tx.send((session_id, event)) {
            if let EventType::MediaAcquired { stream } = event {
                media.release(&stream);
            }
        }
    });
}
