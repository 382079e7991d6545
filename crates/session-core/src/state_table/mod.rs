//! Table-driven call state machine definition
//!
//! Every legal `(role, state, event)` combination is listed once in
//! [`MASTER_TABLE`]. Anything missing from the table is rejected by the
//! executor as a precondition failure.

pub mod builder;
pub mod tables;
pub mod types;

pub use builder::StateTableBuilder;
pub use types::*;

use lazy_static::lazy_static;
use std::sync::Arc;

lazy_static! {
    /// The master state table - single source of truth for all transitions
    pub static ref MASTER_TABLE: Arc<MasterStateTable> = Arc::new(build_master_table());
}

/// Build the complete master state table
pub fn build_master_table() -> MasterStateTable {
    let mut builder = StateTableBuilder::new();
    tables::add_common_transitions(&mut builder);
    tables::add_initiator_transitions(&mut builder);
    tables::add_responder_transitions(&mut builder);
    let table = builder.build();

    if let Err(errors) = table.validate() {
        tracing::error!("Invalid call state table: {:?}", errors);
    }
    tracing::debug!("Built call state table with {} transitions", table.transition_count());
    table
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::{CallState, FailureReason, Role};

    #[test]
    fn test_master_table_is_valid() {
        assert!(MASTER_TABLE.validate().is_ok());
        assert!(MASTER_TABLE.transition_count() > 20);
    }

    #[test]
    fn test_role_specific_overrides_any() {
        let guards_pass = |_: &Guard| true;
        let responder = MASTER_TABLE
            .find(
                Some(Role::Responder),
                CallState::AwaitingLocalMedia,
                EventKind::MediaAcquired,
                guards_pass,
            )
            .unwrap();
        assert_eq!(responder.next_state, Some(CallState::IncomingRinging));

        let unassigned = MASTER_TABLE
            .find(None, CallState::AwaitingLocalMedia, EventKind::MediaAcquired, guards_pass)
            .unwrap();
        assert_eq!(unassigned.next_state, Some(CallState::Idle));
    }

    #[test]
    fn test_failed_guard_falls_through_to_any() {
        // Responder without a parked offer behaves like a plain capture
        let transition = MASTER_TABLE
            .find(
                Some(Role::Responder),
                CallState::AwaitingLocalMedia,
                EventKind::MediaAcquired,
                |guard| *guard != Guard::HasPendingSignal,
            )
            .unwrap();
        assert_eq!(transition.next_state, Some(CallState::Idle));
    }

    #[test]
    fn test_terminal_states_have_no_exits() {
        for state in [CallState::Ended, CallState::Failed(FailureReason::Handshake)] {
            for event in [EventKind::EndCall, EventKind::PlaceCall, EventKind::RemoteStream] {
                assert!(!MASTER_TABLE.has_transition(Some(Role::Initiator), state, event));
            }
        }
    }

    #[test]
    fn test_initiator_cannot_accept() {
        assert!(!MASTER_TABLE.has_transition(
            Some(Role::Initiator),
            CallState::IncomingRinging,
            EventKind::AcceptCall
        ));
        assert!(MASTER_TABLE.has_transition(
            Some(Role::Responder),
            CallState::IncomingRinging,
            EventKind::AcceptCall
        ));
    }
}
