//! # medcall-session-core
//!
//! Call session management for peer-to-peer video consultations between a
//! doctor and a patient.
//!
//! The crate owns the call lifecycle and the signaling protocol. The
//! real-time transport, the capture devices and the signaling relay are
//! collaborators behind traits in [`adapters`] and [`signaling`].
//!
//! ## Architecture
//!
//! ```text
//! UI operations ─┐
//! signaling ─────┼─> EventType ─> StateMachine ─> MASTER_TABLE lookup
//! adapters ──────┘                    │
//!                                     ├─> guards / actions
//!                                     └─> CallEvent broadcast + state watch
//! ```
//!
//! Every legal transition is listed in [`state_table::MASTER_TABLE`],
//! keyed by role, state and event. Operations that have no entry for the
//! session's current state are rejected with
//! [`SessionError::Precondition`] and leave the session untouched.
//!
//! ## Example
//!
//! ```no_run
//! use medcall_session_core::prelude::*;
//!
//! # async fn example() -> Result<()> {
//! let hub = InMemorySignalingHub::new();
//! let doctor = CallSessionManagerBuilder::new()
//!     .with_local_identity("doc-1")
//!     .with_signaling(hub.client("doc-1"))
//!     .with_peer_factory(LoopbackPeerFactory::new())
//!     .with_media_devices(FakeMediaDevices::new())
//!     .build()
//!     .await?;
//!
//! doctor.request_local_media().await?;
//! doctor.wait_for_local_media(std::time::Duration::from_secs(5)).await?;
//! doctor.place_call("pat-7").await?;
//! # Ok(())
//! # }
//! ```

pub mod adapters;
pub mod api;
pub mod config;
pub mod errors;
pub mod session_store;
pub mod signaling;
pub mod state_machine;
pub mod state_table;
pub mod types;

pub use api::{CallEvent, CallSessionManager, CallSessionManagerBuilder};
pub use config::CallConfig;
pub use errors::{Result, SessionError};
pub use types::*;

pub mod prelude {
    pub use crate::adapters::{
        FakeMediaDevices, LoopbackPeerFactory, MediaDevices, PeerConnection, PeerConnectionFactory,
        PeerEvent, PeerEventSender, PeerRequest,
    };
    pub use crate::api::{CallEvent, CallSessionManager, CallSessionManagerBuilder};
    pub use crate::config::CallConfig;
    pub use crate::errors::{Result, SessionError};
    pub use crate::signaling::{
        InMemorySignalingHub, SignalingChannel, SignalingEvent, SignalingMessage,
    };
    pub use crate::types::*;
}
