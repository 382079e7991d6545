//! Common infrastructure for the MedCall stack
//!
//! Shared pieces every MedCall crate and binary leans on:
//!
//! - [`logging`] - `tracing-subscriber` setup with env-filter and optional JSON output
//! - [`config`] - layered configuration loading (TOML file + `MEDCALL_*` environment)
//! - [`errors`] - the infrastructure error type

pub mod config;
pub mod errors;
pub mod logging;

pub use config::{load_config, ConfigSource};
pub use errors::{Error, Result};
pub use logging::{parse_log_level, setup_logging, LoggingConfig};
