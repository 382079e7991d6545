use crate::state_table::{
    Action, EventKind, EventTemplate, Guard, StateTableBuilder, TableRole, Transition,
};
use crate::types::{CallState, EndReason, FailureReason, TerminationReason};

/// Add transitions for the party receiving the call
pub fn add_responder_transitions(builder: &mut StateTableBuilder) {
    // AwaitingLocalMedia -> IncomingRinging: capture granted with an offer parked
    builder.add_transition(
        TableRole::Responder,
        CallState::AwaitingLocalMedia,
        EventKind::MediaAcquired,
        Transition {
            guards: vec![Guard::HasPendingSignal],
            actions: vec![Action::StoreLocalStream],
            next_state: Some(CallState::IncomingRinging),
            publish_events: vec![EventTemplate::LocalStreamReady, EventTemplate::IncomingCall],
        },
    );

    // AwaitingLocalMedia -> Ended: caller gave up before we were ready
    builder.add_transition(
        TableRole::Responder,
        CallState::AwaitingLocalMedia,
        EventKind::RemoteEnded,
        Transition {
            guards: vec![],
            actions: vec![
                Action::ClearPendingSignal,
                Action::RecordRemoteTermination,
                Action::ReleaseMedia,
            ],
            next_state: Some(CallState::Ended),
            publish_events: vec![EventTemplate::CallEnded],
        },
    );

    // AwaitingLocalMedia -> Ended: local hangup with an offer parked counts as a decline
    builder.add_transition(
        TableRole::Responder,
        CallState::AwaitingLocalMedia,
        EventKind::EndCall,
        Transition {
            guards: vec![],
            actions: vec![
                Action::ClearPendingSignal,
                Action::NotifyRemoteEnd(EndReason::Declined),
                Action::RecordTermination(TerminationReason::LocalDecline),
                Action::ReleaseMedia,
            ],
            next_state: Some(CallState::Ended),
            publish_events: vec![EventTemplate::CallEnded],
        },
    );

    // AwaitingLocalMedia -> Failed: signaling dropped with an offer parked
    builder.add_transition(
        TableRole::Responder,
        CallState::AwaitingLocalMedia,
        EventKind::SignalingLost,
        Transition {
            guards: vec![],
            actions: vec![
                Action::RecordFailure,
                Action::ClearPendingSignal,
                Action::ReleaseMedia,
            ],
            next_state: Some(CallState::Failed(FailureReason::SignalingLost)),
            publish_events: vec![EventTemplate::CallFailed],
        },
    );

    // The same caller redialled before we were ready: keep only the newest offer
    builder.add_in_state_actions(
        TableRole::Responder,
        CallState::AwaitingLocalMedia,
        EventKind::IncomingSignal,
        vec![Guard::HasPendingSignal, Guard::FromRemoteParty],
        vec![Action::StorePendingSignal],
        vec![],
    );

    // IncomingRinging: a fresh offer from the caller replaces the one we would answer
    builder.add_in_state_actions(
        TableRole::Responder,
        CallState::IncomingRinging,
        EventKind::IncomingSignal,
        vec![Guard::FromRemoteParty],
        vec![Action::StorePendingSignal],
        vec![],
    );

    // IncomingRinging: the callee may start capture after the phone rang
    builder.add_in_state_actions(
        TableRole::Responder,
        CallState::IncomingRinging,
        EventKind::RequestMedia,
        vec![Guard::NoLocalMedia],
        vec![Action::AcquireLocalMedia],
        vec![],
    );

    builder.add_in_state_actions(
        TableRole::Responder,
        CallState::IncomingRinging,
        EventKind::MediaAcquired,
        vec![Guard::NoLocalMedia],
        vec![Action::StoreLocalStream],
        vec![EventTemplate::LocalStreamReady],
    );

    builder.add_transition(
        TableRole::Responder,
        CallState::IncomingRinging,
        EventKind::MediaFailed,
        Transition {
            guards: vec![],
            actions: vec![
                Action::RecordFailure,
                Action::ClearPendingSignal,
                Action::NotifyRemoteEnd(EndReason::Error),
                Action::ReleaseMedia,
            ],
            next_state: Some(CallState::Failed(FailureReason::MediaAcquisition)),
            publish_events: vec![EventTemplate::CallFailed],
        },
    );

    // IncomingRinging -> Negotiating: answer with the parked offer
    builder.add_transition(
        TableRole::Responder,
        CallState::IncomingRinging,
        EventKind::AcceptCall,
        Transition {
            guards: vec![Guard::HasLocalMedia, Guard::HasPendingSignal, Guard::NoConnection],
            actions: vec![Action::CreatePeerConnection, Action::ConsumePendingSignal],
            next_state: Some(CallState::Negotiating),
            publish_events: vec![],
        },
    );

    // IncomingRinging -> Ended: decline (end_call while ringing is a decline too)
    for event in [EventKind::DeclineCall, EventKind::EndCall] {
        builder.add_transition(
            TableRole::Responder,
            CallState::IncomingRinging,
            event,
            Transition {
                guards: vec![],
                actions: vec![
                    Action::ClearPendingSignal,
                    Action::NotifyRemoteEnd(EndReason::Declined),
                    Action::RecordTermination(TerminationReason::LocalDecline),
                    Action::ReleaseMedia,
                ],
                next_state: Some(CallState::Ended),
                publish_events: vec![EventTemplate::CallEnded],
            },
        );
    }

    // IncomingRinging -> Ended: caller hung up before we answered
    builder.add_transition(
        TableRole::Responder,
        CallState::IncomingRinging,
        EventKind::RemoteEnded,
        Transition {
            guards: vec![],
            actions: vec![
                Action::ClearPendingSignal,
                Action::RecordRemoteTermination,
                Action::ReleaseMedia,
            ],
            next_state: Some(CallState::Ended),
            publish_events: vec![EventTemplate::CallEnded],
        },
    );

    // Negotiating: adapter produced the answer, relay it as call-answered
    builder.add_in_state_actions(
        TableRole::Responder,
        CallState::Negotiating,
        EventKind::LocalDescriptionReady,
        vec![Guard::HasRemoteIdentity],
        vec![Action::SendAnswer],
        vec![],
    );
}
