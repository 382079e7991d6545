use super::types::{
    Action, EventKind, EventTemplate, Guard, MasterStateTable, StateKey, TableRole, Transition,
};
use crate::types::CallState;

/// Builder for assembling the master state table
pub struct StateTableBuilder {
    table: MasterStateTable,
}

impl StateTableBuilder {
    pub fn new() -> Self {
        Self {
            table: MasterStateTable::new(),
        }
    }

    /// Add a full transition
    pub fn add_transition(
        &mut self,
        role: TableRole,
        state: CallState,
        event: EventKind,
        transition: Transition,
    ) -> &mut Self {
        self.table.insert(StateKey { role, state, event }, transition);
        self
    }

    /// Add a transition that runs actions without leaving the state
    pub fn add_in_state_actions(
        &mut self,
        role: TableRole,
        state: CallState,
        event: EventKind,
        guards: Vec<Guard>,
        actions: Vec<Action>,
        publish_events: Vec<EventTemplate>,
    ) -> &mut Self {
        self.add_transition(
            role,
            state,
            event,
            Transition {
                guards,
                actions,
                next_state: None,
                publish_events,
            },
        )
    }

    pub fn build(self) -> MasterStateTable {
        self.table
    }
}

impl Default for StateTableBuilder {
    fn default() -> Self {
        Self::new()
    }
}
