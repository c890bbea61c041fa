//! Common utilities and types shared across the check service crates.

pub mod error;
pub mod logging;

pub use error::{Error, ProbeError, Result, TIMEOUT_CODE};
