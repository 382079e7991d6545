use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::collections::VecDeque;

use crate::state_table::{Action, EventKind};
use crate::types::CallState;

/// One executed transition
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TransitionRecord {
    pub timestamp: DateTime<Utc>,
    pub from_state: CallState,
    pub event: EventKind,
    pub to_state: CallState,
    pub actions: Vec<Action>,
}

/// Bounded transition log for a session
#[derive(Debug, Clone)]
pub struct SessionHistory {
    records: VecDeque<TransitionRecord>,
    limit: usize,
    total_transitions: u64,
}

impl SessionHistory {
    pub fn new(limit: usize) -> Self {
        Self {
            records: VecDeque::with_capacity(limit.min(64)),
            limit: limit.max(1),
            total_transitions: 0,
        }
    }

    pub fn record(&mut self, record: TransitionRecord) {
        if self.records.len() == self.limit {
            self.records.pop_front();
        }
        self.records.push_back(record);
        self.total_transitions += 1;
    }

    /// Records oldest first
    pub fn records(&self) -> Vec<TransitionRecord> {
        self.records.iter().cloned().collect()
    }

    pub fn last(&self) -> Option<&TransitionRecord> {
        self.records.back()
    }

    pub fn len(&self) -> usize {
        self.records.len()
    }

    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }

    /// Transitions recorded since creation, including evicted ones
    pub fn total_transitions(&self) -> u64 {
        self.total_transitions
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn record(to_state: CallState) -> TransitionRecord {
        TransitionRecord {
            timestamp: Utc::now(),
            from_state: CallState::Idle,
            event: EventKind::RequestMedia,
            to_state,
            actions: vec![],
        }
    }

    #[test]
    fn test_history_is_bounded() {
        let mut history = SessionHistory::new(2);
        history.record(record(CallState::AwaitingLocalMedia));
        history.record(record(CallState::Idle));
        history.record(record(CallState::Outgoing));

        assert_eq!(history.len(), 2);
        assert_eq!(history.total_transitions(), 3);
        assert_eq!(history.records()[0].to_state, CallState::Idle);
        assert_eq!(history.last().map(|r| r.to_state), Some(CallState::Outgoing));
    }
}
