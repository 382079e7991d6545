//! Collaborator contracts the state machine drives
//!
//! The real-time transport and the capture devices live outside this crate.
//! The loopback implementations run both sides of a call in-process.

pub mod loopback;
pub mod media_adapter;
pub mod peer_adapter;

pub use loopback::{FakeMediaDevices, LoopbackPeerFactory, LoopbackStats};
pub use media_adapter::MediaDevices;
pub use peer_adapter::{PeerConnection, PeerConnectionFactory, PeerEvent, PeerEventSender, PeerRequest};
