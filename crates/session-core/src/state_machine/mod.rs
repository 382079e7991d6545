pub mod actions;
pub mod executor;
pub mod guards;

pub use actions::ActionContext;
pub use executor::{ActiveCall, StateMachine};
