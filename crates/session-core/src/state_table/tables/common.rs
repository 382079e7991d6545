use crate::state_table::{
    Action, EventKind, EventTemplate, Guard, StateTableBuilder, TableRole, Transition,
};
use crate::types::{CallState, EndReason, FailureReason, Role, TerminationReason};

/// Add transitions that apply whatever the session's role is
pub fn add_common_transitions(builder: &mut StateTableBuilder) {
    // Idle -> AwaitingLocalMedia: capture requested
    builder.add_transition(
        TableRole::Any,
        CallState::Idle,
        EventKind::RequestMedia,
        Transition {
            guards: vec![Guard::NoLocalMedia],
            actions: vec![Action::AcquireLocalMedia],
            next_state: Some(CallState::AwaitingLocalMedia),
            publish_events: vec![],
        },
    );

    // AwaitingLocalMedia -> Idle: capture granted, nothing else pending
    builder.add_transition(
        TableRole::Any,
        CallState::AwaitingLocalMedia,
        EventKind::MediaAcquired,
        Transition {
            guards: vec![],
            actions: vec![Action::StoreLocalStream],
            next_state: Some(CallState::Idle),
            publish_events: vec![EventTemplate::LocalStreamReady],
        },
    );

    // AwaitingLocalMedia -> Failed: capture denied or unavailable
    builder.add_transition(
        TableRole::Any,
        CallState::AwaitingLocalMedia,
        EventKind::MediaFailed,
        Transition {
            guards: vec![],
            actions: vec![Action::RecordFailure, Action::ReleaseMedia],
            next_state: Some(CallState::Failed(FailureReason::MediaAcquisition)),
            publish_events: vec![EventTemplate::CallFailed],
        },
    );

    // An offer that arrives while capture is in flight is parked until media is ready
    builder.add_in_state_actions(
        TableRole::Any,
        CallState::AwaitingLocalMedia,
        EventKind::IncomingSignal,
        vec![Guard::NoPendingSignal],
        vec![
            Action::AssumeRole(Role::Responder),
            Action::StoreRemoteIdentity,
            Action::StorePendingSignal,
        ],
        vec![],
    );

    // Idle -> Outgoing: place a call with local media ready
    builder.add_transition(
        TableRole::Any,
        CallState::Idle,
        EventKind::PlaceCall,
        Transition {
            guards: vec![Guard::HasLocalMedia, Guard::NoConnection],
            actions: vec![
                Action::AssumeRole(Role::Initiator),
                Action::StoreRemoteIdentity,
                Action::CreatePeerConnection,
            ],
            next_state: Some(CallState::Outgoing),
            publish_events: vec![],
        },
    );

    // Idle -> IncomingRinging: an offer arrived
    builder.add_transition(
        TableRole::Any,
        CallState::Idle,
        EventKind::IncomingSignal,
        Transition {
            guards: vec![],
            actions: vec![
                Action::AssumeRole(Role::Responder),
                Action::StoreRemoteIdentity,
                Action::StorePendingSignal,
            ],
            next_state: Some(CallState::IncomingRinging),
            publish_events: vec![EventTemplate::IncomingCall],
        },
    );

    // Hanging up before any call exists just drops the capture
    for state in [CallState::Idle, CallState::AwaitingLocalMedia] {
        builder.add_transition(
            TableRole::Any,
            state,
            EventKind::EndCall,
            Transition {
                guards: vec![],
                actions: vec![
                    Action::RecordTermination(TerminationReason::LocalHangup),
                    Action::ReleaseMedia,
                ],
                next_state: Some(CallState::Ended),
                publish_events: vec![EventTemplate::CallEnded],
            },
        );
    }

    // Negotiating -> Connected: remote media arrived
    builder.add_transition(
        TableRole::Any,
        CallState::Negotiating,
        EventKind::RemoteStream,
        Transition {
            guards: vec![Guard::HasConnection],
            actions: vec![Action::StoreRemoteStream],
            next_state: Some(CallState::Connected),
            publish_events: vec![EventTemplate::RemoteStreamReady, EventTemplate::CallConnected],
        },
    );

    for state in [CallState::Outgoing, CallState::Negotiating, CallState::Connected] {
        // -> Failed: adapter could not complete the handshake or lost the peer
        builder.add_transition(
            TableRole::Any,
            state,
            EventKind::HandshakeFailed,
            Transition {
                guards: vec![],
                actions: vec![
                    Action::RecordFailure,
                    Action::NotifyRemoteEnd(EndReason::Error),
                    Action::ReleaseConnection,
                    Action::ReleaseMedia,
                ],
                next_state: Some(CallState::Failed(FailureReason::Handshake)),
                publish_events: vec![EventTemplate::CallFailed],
            },
        );
    }

    for state in [CallState::Outgoing, CallState::Negotiating, CallState::Connected] {
        // -> Ended: local hangup
        builder.add_transition(
            TableRole::Any,
            state,
            EventKind::EndCall,
            Transition {
                guards: vec![],
                actions: vec![
                    Action::NotifyRemoteEnd(EndReason::Hangup),
                    Action::RecordTermination(TerminationReason::LocalHangup),
                    Action::ReleaseConnection,
                    Action::ReleaseMedia,
                ],
                next_state: Some(CallState::Ended),
                publish_events: vec![EventTemplate::CallEnded],
            },
        );

        // -> Ended: the remote party ended the call
        builder.add_transition(
            TableRole::Any,
            state,
            EventKind::RemoteEnded,
            Transition {
                guards: vec![],
                actions: vec![
                    Action::RecordRemoteTermination,
                    Action::ReleaseConnection,
                    Action::ReleaseMedia,
                ],
                next_state: Some(CallState::Ended),
                publish_events: vec![EventTemplate::CallEnded],
            },
        );
    }

    for state in [
        CallState::Outgoing,
        CallState::IncomingRinging,
        CallState::Negotiating,
        CallState::Connected,
    ] {
        // -> Failed: signaling channel dropped mid-call
        builder.add_transition(
            TableRole::Any,
            state,
            EventKind::SignalingLost,
            Transition {
                guards: vec![],
                actions: vec![
                    Action::RecordFailure,
                    Action::ClearPendingSignal,
                    Action::ReleaseConnection,
                    Action::ReleaseMedia,
                ],
                next_state: Some(CallState::Failed(FailureReason::SignalingLost)),
                publish_events: vec![EventTemplate::CallFailed],
            },
        );
    }
}
