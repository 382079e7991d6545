use serde::{Deserialize, Serialize};

use crate::errors::Result;
use crate::types::{EndReason, Identity, SignalPayload};

/// Wire messages relayed by the signaling channel
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "kebab-case")]
pub enum SignalingMessage {
    /// Caller's offer, delivered to `to`
    IncomingCall {
        to: Identity,
        from: Identity,
        signal: SignalPayload,
    },
    /// Callee's answer, delivered back to the caller
    CallAnswered { to: Identity, signal: SignalPayload },
    CallEnded {
        to: Identity,
        from: Identity,
        reason: EndReason,
    },
}

impl SignalingMessage {
    /// Identity the relay delivers this message to
    pub fn recipient(&self) -> &Identity {
        match self {
            SignalingMessage::IncomingCall { to, .. }
            | SignalingMessage::CallAnswered { to, .. }
            | SignalingMessage::CallEnded { to, .. } => to,
        }
    }

    pub fn type_name(&self) -> &'static str {
        match self {
            SignalingMessage::IncomingCall { .. } => "incoming-call",
            SignalingMessage::CallAnswered { .. } => "call-answered",
            SignalingMessage::CallEnded { .. } => "call-ended",
        }
    }

    pub fn to_json(&self) -> Result<String> {
        Ok(serde_json::to_string(self)?)
    }

    pub fn from_json(text: &str) -> Result<Self> {
        Ok(serde_json::from_str(text)?)
    }
}
