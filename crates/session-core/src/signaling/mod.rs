//! Signaling protocol between the two parties of a call
//!
//! Messages are relayed by an external channel keyed by participant
//! identity. The manager owns exactly one subscription for its lifetime.

pub mod channel;
pub mod memory;
pub mod messages;

pub use channel::{SignalingChannel, SignalingEvent, SignalingSubscription};
pub use memory::{HubClient, InMemorySignalingHub};
pub use messages::SignalingMessage;
