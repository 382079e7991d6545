use serde::{Deserialize, Serialize};
use std::collections::{HashMap, HashSet};

use crate::types::{
    CallState, EndReason, Identity, MediaStream, Role, SignalPayload, TerminationReason,
};

/// Role selector used by state table keys
#[derive(Debug, Clone, Copy, Hash, Eq, PartialEq, Serialize, Deserialize)]
pub enum TableRole {
    Initiator,
    Responder,
    /// Applies whatever the session's role is, including no role yet
    Any,
}

impl From<Role> for TableRole {
    fn from(role: Role) -> Self {
        match role {
            Role::Initiator => TableRole::Initiator,
            Role::Responder => TableRole::Responder,
        }
    }
}

/// Key for looking up transitions in the state table
#[derive(Debug, Clone, Copy, Hash, Eq, PartialEq, Serialize, Deserialize)]
pub struct StateKey {
    pub role: TableRole,
    pub state: CallState,
    pub event: EventKind,
}

/// Events that drive a call session
///
/// UI operations, signaling messages and adapter callbacks are all turned
/// into one of these before they reach the state machine.
#[derive(Debug, Clone, PartialEq)]
pub enum EventType {
    // UI operations
    RequestMedia,
    PlaceCall { target: Identity },
    AcceptCall,
    DeclineCall,
    EndCall,

    // Media collaborator
    MediaAcquired { stream: MediaStream },
    MediaFailed { message: String },

    // Signaling channel
    IncomingSignal { from: Identity, signal: SignalPayload },
    RemoteAnswer { signal: SignalPayload },
    RemoteEnded { reason: EndReason },
    SignalingLost { reason: String },

    // Peer connection adapter
    LocalDescriptionReady { signal: SignalPayload },
    RemoteStream { stream: MediaStream },
    HandshakeFailed { message: String },
}

/// Payload-free discriminant of [`EventType`], used as the table key
#[derive(Debug, Clone, Copy, Hash, Eq, PartialEq, Serialize, Deserialize)]
pub enum EventKind {
    RequestMedia,
    PlaceCall,
    AcceptCall,
    DeclineCall,
    EndCall,
    MediaAcquired,
    MediaFailed,
    IncomingSignal,
    RemoteAnswer,
    RemoteEnded,
    SignalingLost,
    LocalDescriptionReady,
    RemoteStream,
    HandshakeFailed,
}

impl EventType {
    pub fn kind(&self) -> EventKind {
        match self {
            EventType::RequestMedia => EventKind::RequestMedia,
            EventType::PlaceCall { .. } => EventKind::PlaceCall,
            EventType::AcceptCall => EventKind::AcceptCall,
            EventType::DeclineCall => EventKind::DeclineCall,
            EventType::EndCall => EventKind::EndCall,
            EventType::MediaAcquired { .. } => EventKind::MediaAcquired,
            EventType::MediaFailed { .. } => EventKind::MediaFailed,
            EventType::IncomingSignal { .. } => EventKind::IncomingSignal,
            EventType::RemoteAnswer { .. } => EventKind::RemoteAnswer,
            EventType::RemoteEnded { .. } => EventKind::RemoteEnded,
            EventType::SignalingLost { .. } => EventKind::SignalingLost,
            EventType::LocalDescriptionReady { .. } => EventKind::LocalDescriptionReady,
            EventType::RemoteStream { .. } => EventKind::RemoteStream,
            EventType::HandshakeFailed { .. } => EventKind::HandshakeFailed,
        }
    }

    /// Operation name used in precondition errors and logs
    pub fn type_name(&self) -> &'static str {
        self.kind().name()
    }
}

impl EventKind {
    pub fn name(&self) -> &'static str {
        match self {
            EventKind::RequestMedia => "request_local_media",
            EventKind::PlaceCall => "place_call",
            EventKind::AcceptCall => "accept_call",
            EventKind::DeclineCall => "decline_call",
            EventKind::EndCall => "end_call",
            EventKind::MediaAcquired => "media_acquired",
            EventKind::MediaFailed => "media_failed",
            EventKind::IncomingSignal => "on_incoming_signal",
            EventKind::RemoteAnswer => "on_remote_answer",
            EventKind::RemoteEnded => "on_remote_end",
            EventKind::SignalingLost => "signaling_lost",
            EventKind::LocalDescriptionReady => "local_description_ready",
            EventKind::RemoteStream => "on_remote_stream",
            EventKind::HandshakeFailed => "handshake_failed",
        }
    }
}

/// Transition definition - what happens when an event occurs in a state
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Transition {
    /// Conditions that must be true for this transition
    pub guards: Vec<Guard>,

    /// Actions to execute, in order
    pub actions: Vec<Action>,

    /// Next state (if changing)
    pub next_state: Option<CallState>,

    /// UI events to publish after the transition
    pub publish_events: Vec<EventTemplate>,
}

/// Guards that must be satisfied for a transition
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum Guard {
    HasLocalMedia,
    NoLocalMedia,
    HasPendingSignal,
    NoPendingSignal,
    HasConnection,
    NoConnection,
    HasRemoteIdentity,
    /// The event was sent by the party the session is already talking to
    FromRemoteParty,
}

/// Actions to execute during a transition
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum Action {
    // Media
    AcquireLocalMedia,
    StoreLocalStream,
    /// Release the local capture and forget both streams
    ReleaseMedia,

    // Session bookkeeping
    AssumeRole(Role),
    StoreRemoteIdentity,
    StorePendingSignal,
    ClearPendingSignal,
    RecordFailure,
    RecordTermination(TerminationReason),
    /// Record the reason carried by a remote `call-ended`
    RecordRemoteTermination,

    // Peer connection
    CreatePeerConnection,
    ConsumePendingSignal,
    ApplyRemoteDescription,
    StoreRemoteStream,
    ReleaseConnection,

    // Signaling
    SendOffer,
    SendAnswer,
    NotifyRemoteEnd(EndReason),
}

/// UI events a transition publishes, besides the implicit state change
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum EventTemplate {
    IncomingCall,
    LocalStreamReady,
    RemoteStreamReady,
    CallConnected,
    CallEnded,
    CallFailed,
}

/// States that must always have exit transitions
const CORE_STATES_REQUIRING_EXITS: &[CallState] = &[
    CallState::Idle,
    CallState::AwaitingLocalMedia,
    CallState::Outgoing,
    CallState::IncomingRinging,
    CallState::Negotiating,
    CallState::Connected,
];

/// Master state table containing all transitions
///
/// Each key holds an ordered list of candidates; the first one whose guards
/// pass is taken. Keys for a concrete role shadow `TableRole::Any` keys.
pub struct MasterStateTable {
    transitions: HashMap<StateKey, Vec<Transition>>,
}

impl MasterStateTable {
    pub fn new() -> Self {
        Self {
            transitions: HashMap::new(),
        }
    }

    pub fn insert(&mut self, key: StateKey, transition: Transition) {
        self.transitions.entry(key).or_default().push(transition);
    }

    /// Candidates for `key`, without falling back to `TableRole::Any`
    pub fn candidates(&self, key: &StateKey) -> &[Transition] {
        self.transitions.get(key).map(Vec::as_slice).unwrap_or(&[])
    }

    /// Find the transition to take for a session
    ///
    /// `guard_ok` evaluates guards against the session. Role-specific
    /// candidates are tried before `Any` candidates.
    pub fn find<F>(
        &self,
        role: Option<Role>,
        state: CallState,
        event: EventKind,
        mut guard_ok: F,
    ) -> Option<&Transition>
    where
        F: FnMut(&Guard) -> bool,
    {
        let mut roles = Vec::with_capacity(2);
        if let Some(role) = role {
            roles.push(TableRole::from(role));
        }
        roles.push(TableRole::Any);

        for table_role in roles {
            let key = StateKey { role: table_role, state, event };
            for transition in self.candidates(&key) {
                if transition.guards.iter().all(|guard| guard_ok(guard)) {
                    return Some(transition);
                }
            }
        }
        None
    }

    /// Whether any transition exists for the key, ignoring guards
    pub fn has_transition(&self, role: Option<Role>, state: CallState, event: EventKind) -> bool {
        self.find(role, state, event, |_| true).is_some()
    }

    pub fn transition_count(&self) -> usize {
        self.transitions.values().map(Vec::len).sum()
    }

    /// Collect all states referenced in this state table
    pub fn collect_used_states(&self) -> HashSet<CallState> {
        let mut states = HashSet::new();
        for (key, transitions) in &self.transitions {
            states.insert(key.state);
            for transition in transitions {
                if let Some(next_state) = transition.next_state {
                    states.insert(next_state);
                }
            }
        }
        states
    }

    pub fn validate(&self) -> Result<(), Vec<String>> {
        let mut errors = Vec::new();

        for (key, transitions) in &self.transitions {
            if key.state.is_terminal() {
                errors.push(format!("Terminal state {} has an exit on {:?}", key.state, key.event));
            }
            if transitions.is_empty() {
                errors.push(format!("Key {:?} has no transitions", key));
            }
        }

        let used_states = self.collect_used_states();
        for state in CORE_STATES_REQUIRING_EXITS {
            if !used_states.contains(state) {
                continue;
            }
            let has_exit = self.transitions.keys().any(|k| k.state == *state);
            if !has_exit {
                errors.push(format!("Core state {} has no exit transitions", state));
            }
        }

        if errors.is_empty() {
            Ok(())
        } else {
            Err(errors)
        }
    }
}

impl Default for MasterStateTable {
    fn default() -> Self {
        Self::new()
    }
}
