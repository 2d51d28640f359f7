//! pulse core: transport-agnostic wire contracts and error types.
//!
//! This crate defines the JSON envelope, the typed client/server events of the
//! presence and relay protocol, and the error surface shared by the gateway.
//! It carries no transport or runtime dependencies.
//!
//! # Defensive guarantees
//! Panics, `unwrap`, and `expect` are compile-denied here
//! (`#![deny(clippy::panic, clippy::unwrap_used, clippy::expect_used)]`).
//! All fallible paths must surface as `PulseError`/`Result` so a hostile
//! client can never crash the process with a malformed frame.

#![deny(clippy::unwrap_used)]
#![deny(clippy::expect_used)]
#![deny(clippy::panic)]

pub mod error;
pub mod protocol;

/// Shared result type.
pub use error::{PulseError, Result};
