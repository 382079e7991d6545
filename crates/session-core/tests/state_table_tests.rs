use medcall_session_core::state_table::{
    build_master_table, Action, EventKind, Guard, TableRole, MASTER_TABLE,
};
use medcall_session_core::types::{CallState, FailureReason, Role};

const ALL_EVENTS: &[EventKind] = &[
    EventKind::RequestMedia,
    EventKind::PlaceCall,
    EventKind::AcceptCall,
    EventKind::DeclineCall,
    EventKind::EndCall,
    EventKind::MediaAcquired,
    EventKind::MediaFailed,
    EventKind::IncomingSignal,
    EventKind::RemoteAnswer,
    EventKind::RemoteEnded,
    EventKind::SignalingLost,
    EventKind::LocalDescriptionReady,
    EventKind::RemoteStream,
    EventKind::HandshakeFailed,
];

const ROLES: &[Option<Role>] = &[None, Some(Role::Initiator), Some(Role::Responder)];

#[test]
fn test_table_validates() {
    let table = build_master_table();
    assert!(table.validate().is_ok(), "{:?}", table.validate());
    assert_eq!(table.transition_count(), MASTER_TABLE.transition_count());
}

#[test]
fn test_no_exit_from_terminal_states() {
    let terminal = [
        CallState::Ended,
        CallState::Failed(FailureReason::MediaAcquisition),
        CallState::Failed(FailureReason::Handshake),
        CallState::Failed(FailureReason::SignalingLost),
        CallState::Failed(FailureReason::Internal),
    ];
    for state in terminal {
        for role in ROLES {
            for event in ALL_EVENTS {
                assert!(
                    !MASTER_TABLE.has_transition(*role, state, *event),
                    "{} has an exit on {:?} for {:?}",
                    state,
                    event,
                    role
                );
            }
        }
    }
}

#[test]
fn test_every_live_state_can_be_hung_up() {
    let live = [
        (None, CallState::Idle),
        (None, CallState::AwaitingLocalMedia),
        (Some(Role::Responder), CallState::AwaitingLocalMedia),
        (Some(Role::Initiator), CallState::Outgoing),
        (Some(Role::Responder), CallState::IncomingRinging),
        (Some(Role::Initiator), CallState::Negotiating),
        (Some(Role::Responder), CallState::Negotiating),
        (Some(Role::Initiator), CallState::Connected),
        (Some(Role::Responder), CallState::Connected),
    ];
    for (role, state) in live {
        let transition = MASTER_TABLE
            .find(role, state, EventKind::EndCall, |_| true)
            .unwrap_or_else(|| panic!("no end_call from {} as {:?}", state, role));
        assert_eq!(transition.next_state, Some(CallState::Ended));
        assert!(transition.actions.contains(&Action::ReleaseMedia));
    }
}

#[test]
fn test_connected_requires_remote_stream_with_connection() {
    for role in ROLES {
        for event in ALL_EVENTS {
            for state in [CallState::Idle, CallState::AwaitingLocalMedia, CallState::Outgoing, CallState::IncomingRinging] {
                if let Some(t) = MASTER_TABLE.find(*role, state, *event, |_| true) {
                    assert_ne!(t.next_state, Some(CallState::Connected));
                }
            }
        }
    }
    let into_connected = MASTER_TABLE
        .find(Some(Role::Initiator), CallState::Negotiating, EventKind::RemoteStream, |_| true)
        .unwrap();
    assert_eq!(into_connected.guards, vec![Guard::HasConnection]);
}

#[test]
fn test_decline_never_creates_connection() {
    for event in [EventKind::DeclineCall, EventKind::EndCall] {
        let transition = MASTER_TABLE
            .find(Some(Role::Responder), CallState::IncomingRinging, event, |_| true)
            .unwrap();
        assert!(!transition.actions.contains(&Action::CreatePeerConnection));
        assert!(transition.actions.contains(&Action::ClearPendingSignal));
    }
}

#[test]
fn test_place_call_needs_media_and_no_role_specific_override() {
    let transition = MASTER_TABLE
        .find(None, CallState::Idle, EventKind::PlaceCall, |_| true)
        .unwrap();
    assert!(transition.guards.contains(&Guard::HasLocalMedia));
    assert!(MASTER_TABLE
        .candidates(&medcall_session_core::state_table::StateKey {
            role: TableRole::Initiator,
            state: CallState::Idle,
            event: EventKind::PlaceCall,
        })
        .is_empty());
}

#[test]
fn test_peer_failure_fails_every_negotiated_state() {
    for (role, state) in [
        (Role::Initiator, CallState::Outgoing),
        (Role::Initiator, CallState::Negotiating),
        (Role::Responder, CallState::Negotiating),
        (Role::Initiator, CallState::Connected),
        (Role::Responder, CallState::Connected),
    ] {
        let transition = MASTER_TABLE
            .find(Some(role), state, EventKind::HandshakeFailed, |_| true)
            .unwrap_or_else(|| panic!("no handshake failure exit from {} as {}", state, role));
        assert_eq!(transition.next_state, Some(CallState::Failed(FailureReason::Handshake)));
        assert!(transition.actions.contains(&Action::ReleaseConnection));
        assert!(transition.actions.contains(&Action::ReleaseMedia));
    }
}

#[test]
fn test_only_current_caller_can_replace_ringing_offer() {
    let candidates = MASTER_TABLE.candidates(&medcall_session_core::state_table::StateKey {
        role: TableRole::Responder,
        state: CallState::IncomingRinging,
        event: EventKind::IncomingSignal,
    });
    assert_eq!(candidates.len(), 1);
    assert_eq!(candidates[0].guards, vec![Guard::FromRemoteParty]);
    assert_eq!(candidates[0].actions, vec![Action::StorePendingSignal]);
    assert_eq!(candidates[0].next_state, None);

    // A different sender finds nothing and is answered as busy
    assert!(MASTER_TABLE
        .find(
            Some(Role::Responder),
            CallState::IncomingRinging,
            EventKind::IncomingSignal,
            |guard| *guard != Guard::FromRemoteParty,
        )
        .is_none());
}
