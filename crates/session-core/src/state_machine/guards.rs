use super::executor::ActiveCall;
use crate::state_table::{EventType, Guard};

/// Evaluate a transition guard against the active call and the event
pub fn check_guard(guard: &Guard, call: &ActiveCall, event: &EventType) -> bool {
    let session = &call.session;
    match guard {
        Guard::HasLocalMedia => session.local_stream.is_some(),
        Guard::NoLocalMedia => session.local_stream.is_none(),
        Guard::HasPendingSignal => session.pending_remote_signal.is_some(),
        Guard::NoPendingSignal => session.pending_remote_signal.is_none(),
        Guard::HasConnection => call.connection.is_some(),
        Guard::NoConnection => call.connection.is_none(),
        Guard::HasRemoteIdentity => session.remote_identity.is_some(),
        Guard::FromRemoteParty => match event {
            EventType::IncomingSignal { from, .. } => session.remote_identity.as_ref() == Some(from),
            _ => false,
        },
    }
}
