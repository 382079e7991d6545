use crate::state_table::{Action, EventKind, Guard, StateTableBuilder, TableRole, Transition};
use crate::types::CallState;

/// Add transitions for the party placing the call
pub fn add_initiator_transitions(builder: &mut StateTableBuilder) {
    // Outgoing: adapter produced the offer, relay it as incoming-call
    builder.add_in_state_actions(
        TableRole::Initiator,
        CallState::Outgoing,
        EventKind::LocalDescriptionReady,
        vec![Guard::HasRemoteIdentity],
        vec![Action::SendOffer],
        vec![],
    );

    // Outgoing -> Negotiating: callee answered
    builder.add_transition(
        TableRole::Initiator,
        CallState::Outgoing,
        EventKind::RemoteAnswer,
        Transition {
            guards: vec![Guard::HasConnection],
            actions: vec![Action::ApplyRemoteDescription],
            next_state: Some(CallState::Negotiating),
            publish_events: vec![],
        },
    );
}
