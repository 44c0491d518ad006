//! Core logic for the UPA user directory.
//! This crate is the single source of truth for directory invariants:
//! draft validation, identifying-field uniqueness, and how every operation
//! outcome becomes a status message.

pub mod config;
pub mod controller;
pub mod credential;
pub mod db;
pub mod error;
pub mod gateway;
pub mod logging;
pub mod model;
pub mod repo;
pub mod validation;

pub use config::{open_gateway, AppConfig, ConfigError, StoreConfig};
pub use controller::message::{describe_error, MessageTone, StatusMessage, GENERIC_FAILURE};
pub use controller::{DirectorySnapshot, UserDirectoryController};
pub use error::{DirectoryError, ErrorKind};
pub use gateway::{
    CommandChannel, CommandFailure, CommandGateway, CommandRouter, Confirmation, GatewayError,
    GatewayResult, LocalGateway, NewUser, SqliteGateway, UserGateway, UserUpdate,
};
pub use logging::{default_log_level, init_logging, logging_status, LoggingError};
pub use model::user::{DraftField, Edition, UserDraft, UserId, UserRecord};
pub use repo::user_repo::{RepoError, RepoResult, SqliteUserRepository, UserRepository};
pub use validation::{normalize, validate, IdentifierKind, ValidationError};

/// Returns the core crate version.
pub fn core_version() -> &'static str {
    env!("CARGO_PKG_VERSION")
}
