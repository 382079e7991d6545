//! Core types for call sessions
//!
//! Identifiers, call states, media handles and opaque signaling payloads
//! shared by the state table, the executor and the adapters.

use serde::{Deserialize, Serialize};
use std::fmt;

/// Opaque identity of a call participant (doctor or patient id)
#[derive(Debug, Clone, Hash, Eq, PartialEq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Identity(pub String);

impl Identity {
    pub fn new(id: impl Into<String>) -> Self {
        Self(id.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for Identity {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl From<&str> for Identity {
    fn from(id: &str) -> Self {
        Self(id.to_string())
    }
}

impl From<String> for Identity {
    fn from(id: String) -> Self {
        Self(id)
    }
}

/// Session ID type
#[derive(Debug, Clone, Hash, Eq, PartialEq, Serialize, Deserialize)]
pub struct SessionId(pub String);

impl SessionId {
    pub fn new() -> Self {
        Self(format!("session-{}", uuid::Uuid::new_v4()))
    }
}

impl Default for SessionId {
    fn default() -> Self {
        Self::new()
    }
}

impl fmt::Display for SessionId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Handshake role, fixed for the lifetime of a session once assigned
#[derive(Debug, Clone, Copy, Hash, Eq, PartialEq, Serialize, Deserialize)]
pub enum Role {
    /// Produces the first description (the party placing the call)
    Initiator,
    /// Answers the initiator's description (the party receiving the call)
    Responder,
}

impl fmt::Display for Role {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Role::Initiator => write!(f, "initiator"),
            Role::Responder => write!(f, "responder"),
        }
    }
}

/// Why a session ended up in `Failed`
#[derive(Debug, Clone, Copy, Hash, Eq, PartialEq, Serialize, Deserialize)]
pub enum FailureReason {
    MediaAcquisition,
    Handshake,
    SignalingLost,
    Internal,
}

impl fmt::Display for FailureReason {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let text = match self {
            FailureReason::MediaAcquisition => "camera or microphone unavailable",
            FailureReason::Handshake => "connection could not be established",
            FailureReason::SignalingLost => "call dropped",
            FailureReason::Internal => "internal error",
        };
        write!(f, "{}", text)
    }
}

/// Call states
#[derive(Debug, Clone, Copy, Hash, Eq, PartialEq, Serialize, Deserialize)]
pub enum CallState {
    /// Session created, nothing in flight
    Idle,
    /// Local capture requested, not yet granted
    AwaitingLocalMedia,
    /// Offer being generated or sent, waiting for the answer
    Outgoing,
    /// An offer arrived and the user has not answered yet
    IncomingRinging,
    /// Descriptions exchanged, waiting for remote media
    Negotiating,
    /// Remote media is flowing
    Connected,
    Ended,
    Failed(FailureReason),
}

impl CallState {
    pub fn is_terminal(&self) -> bool {
        matches!(self, CallState::Ended | CallState::Failed(_))
    }

    /// States in which a call with a remote party is in progress
    pub fn is_engaged(&self) -> bool {
        matches!(
            self,
            CallState::Outgoing | CallState::IncomingRinging | CallState::Negotiating | CallState::Connected
        )
    }
}

impl fmt::Display for CallState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            CallState::Failed(reason) => write!(f, "Failed({:?})", reason),
            other => write!(f, "{:?}", other),
        }
    }
}

/// Why a session ended normally
#[derive(Debug, Clone, Copy, Hash, Eq, PartialEq, Serialize, Deserialize)]
pub enum TerminationReason {
    LocalHangup,
    LocalDecline,
    RemoteHangup,
    RemoteDeclined,
    RemoteBusy,
    /// The remote side hit an error and told us so
    RemoteError,
}

impl From<EndReason> for TerminationReason {
    fn from(reason: EndReason) -> Self {
        match reason {
            EndReason::Hangup => TerminationReason::RemoteHangup,
            EndReason::Declined => TerminationReason::RemoteDeclined,
            EndReason::Busy => TerminationReason::RemoteBusy,
            EndReason::Error => TerminationReason::RemoteError,
        }
    }
}

/// Reason carried by a `call-ended` signaling message
#[derive(Debug, Clone, Copy, Hash, Eq, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum EndReason {
    Declined,
    Hangup,
    Error,
    Busy,
}

/// Opaque connection description produced by a peer connection adapter
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct SignalPayload(pub serde_json::Value);

impl SignalPayload {
    pub fn new(value: serde_json::Value) -> Self {
        Self(value)
    }

    pub fn as_value(&self) -> &serde_json::Value {
        &self.0
    }
}

impl From<serde_json::Value> for SignalPayload {
    fn from(value: serde_json::Value) -> Self {
        Self(value)
    }
}

/// Identifier of a media stream handle
#[derive(Debug, Clone, Hash, Eq, PartialEq, Serialize, Deserialize)]
pub struct StreamId(pub String);

impl StreamId {
    pub fn new() -> Self {
        Self(format!("stream-{}", uuid::Uuid::new_v4()))
    }
}

impl Default for StreamId {
    fn default() -> Self {
        Self::new()
    }
}

impl fmt::Display for StreamId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

#[derive(Debug, Clone, Copy, Hash, Eq, PartialEq, Serialize, Deserialize)]
pub enum StreamOrigin {
    Local,
    Remote,
}

/// Handle to an audio/video stream owned by a media collaborator
#[derive(Debug, Clone, Hash, Eq, PartialEq, Serialize, Deserialize)]
pub struct MediaStream {
    pub id: StreamId,
    pub origin: StreamOrigin,
    pub has_audio: bool,
    pub has_video: bool,
}

impl MediaStream {
    pub fn local(constraints: &MediaConstraints) -> Self {
        Self {
            id: StreamId::new(),
            origin: StreamOrigin::Local,
            has_audio: constraints.audio,
            has_video: constraints.video,
        }
    }

    pub fn remote(id: impl Into<String>) -> Self {
        Self {
            id: StreamId(id.into()),
            origin: StreamOrigin::Remote,
            has_audio: true,
            has_video: true,
        }
    }
}

/// Capture constraints for local media
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct MediaConstraints {
    pub audio: bool,
    pub video: bool,
}

impl Default for MediaConstraints {
    fn default() -> Self {
        Self { audio: true, video: true }
    }
}

/// The appointment a video consultation belongs to
///
/// Doctors call patients and patients call doctors; which id is local
/// depends on who is looking at the consultation screen.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AppointmentContext {
    pub appointment_id: String,
    pub doctor_id: Identity,
    pub patient_id: Identity,
    pub is_doctor: bool,
}

impl AppointmentContext {
    pub fn new(
        appointment_id: impl Into<String>,
        doctor_id: impl Into<Identity>,
        patient_id: impl Into<Identity>,
        is_doctor: bool,
    ) -> Self {
        Self {
            appointment_id: appointment_id.into(),
            doctor_id: doctor_id.into(),
            patient_id: patient_id.into(),
            is_doctor,
        }
    }

    pub fn local_identity(&self) -> &Identity {
        if self.is_doctor {
            &self.doctor_id
        } else {
            &self.patient_id
        }
    }

    pub fn remote_identity(&self) -> &Identity {
        if self.is_doctor {
            &self.patient_id
        } else {
            &self.doctor_id
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_terminal_states() {
        assert!(CallState::Ended.is_terminal());
        assert!(CallState::Failed(FailureReason::Handshake).is_terminal());
        assert!(!CallState::Connected.is_terminal());
        assert!(!CallState::Idle.is_terminal());
    }

    #[test]
    fn test_engaged_states() {
        assert!(CallState::Outgoing.is_engaged());
        assert!(CallState::Connected.is_engaged());
        assert!(!CallState::Idle.is_engaged());
        assert!(!CallState::AwaitingLocalMedia.is_engaged());
        assert!(!CallState::Ended.is_engaged());
    }

    #[test]
    fn test_appointment_identities() {
        let doctor_view = AppointmentContext::new("appt-1", "doc-1", "pat-7", true);
        assert_eq!(doctor_view.local_identity().as_str(), "doc-1");
        assert_eq!(doctor_view.remote_identity().as_str(), "pat-7");

        let patient_view = AppointmentContext::new("appt-1", "doc-1", "pat-7", false);
        assert_eq!(patient_view.local_identity().as_str(), "pat-7");
        assert_eq!(patient_view.remote_identity().as_str(), "doc-1");
    }

    #[test]
    fn test_local_stream_follows_constraints() {
        let stream = MediaStream::local(&MediaConstraints { audio: true, video: false });
        assert_eq!(stream.origin, StreamOrigin::Local);
        assert!(stream.has_audio);
        assert!(!stream.has_video);
    }
}
