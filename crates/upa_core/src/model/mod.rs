//! Domain model for the user directory.
//!
//! # Responsibility
//! - Define the records, drafts and edition context shared by the controller
//!   and every gateway adapter.
//! - Decode persisted collections through one explicit, lossy-but-safe step.
//!
//! # Invariants
//! - A `UserRecord::id` is assigned once by a gateway and never rewritten.
//! - Credentials never appear on a `UserRecord`.

pub mod codec;
pub mod user;
