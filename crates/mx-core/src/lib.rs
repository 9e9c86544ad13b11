//! # mx-core
//!
//! Shared error type and canonical domain types for the medexp workspace.

#![warn(missing_docs)]
#![warn(clippy::all)]

pub mod error;
pub mod types;

pub use error::{Error, Result};
pub use types::{StateFips, StateYear};

/// Crate version, reported by `medexp version`.
pub const VERSION: &str = env!("CARGO_PKG_VERSION");
