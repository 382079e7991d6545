//! Error types shared by the MedCall infrastructure

pub mod types;

pub use types::{Error, Result};
