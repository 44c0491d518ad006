//! Repository contracts and SQLite persistence for user rows.
//!
//! # Responsibility
//! - Keep SQL details behind a use-case oriented contract.
//! - Translate storage failures into semantic errors (`NotFound`,
//!   `LoginTaken`) the gateways can report.
//!
//! # Invariants
//! - Repository APIs never return credential hashes on `UserRecord`s.
//! - Read paths reject invalid persisted rows instead of masking them.

pub mod user_repo;
