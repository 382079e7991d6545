pub mod history;
pub mod state;

pub use history::{SessionHistory, TransitionRecord};
pub use state::SessionState;
