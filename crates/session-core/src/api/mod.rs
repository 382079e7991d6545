//! Public API for the consultation screen
//!
//! [`CallSessionManager`] is the only entry point a UI needs: it accepts
//! the user's call operations, consumes signaling on its own, and reports
//! progress through [`CallEvent`]s and a state watch.

pub mod builder;
pub mod events;
pub mod manager;

pub use builder::CallSessionManagerBuilder;
pub use events::CallEvent;
pub use manager::CallSessionManager;
