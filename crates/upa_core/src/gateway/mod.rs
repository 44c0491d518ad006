//! Persistence gateway contract and its adapters.
//!
//! # Responsibility
//! - Define the asynchronous boundary the controller persists through.
//! - Provide interchangeable adapters: in-process store, SQLite store, and a
//!   named-command channel.
//!
//! # Invariants
//! - Every operation is atomic from the caller's point of view.
//! - `create` assigns a fresh unique id.
//! - `update`/`delete` on an unknown id fail with `GatewayError::NotFound`.
//! - Identifying-field uniqueness is enforced case-insensitively with
//!   `GatewayError::Conflict`.

use crate::model::user::{UserDraft, UserId, UserRecord};
use crate::repo::user_repo::RepoError;
use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use std::error::Error;
use std::fmt::{Display, Formatter};

pub mod command;
pub mod local;
pub mod sqlite;

pub use command::{CommandChannel, CommandFailure, CommandGateway, CommandRouter};
pub use local::LocalGateway;
pub use sqlite::SqliteGateway;

pub const CREATED_MESSAGE: &str = "User created successfully.";
pub const UPDATED_MESSAGE: &str = "User updated successfully.";
pub const DELETED_MESSAGE: &str = "User removed successfully.";

pub type GatewayResult<T> = Result<T, GatewayError>;

/// Failure reported by a gateway adapter.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum GatewayError {
    /// The boundary refused the operation with a user-facing message.
    Rejected(String),
    NotFound(UserId),
    /// Identifying field already used by another record.
    Conflict(String),
    /// Durable storage failed. Detail is for logs only.
    Storage(String),
    /// The command channel failed to deliver or answer. Detail is for logs only.
    Transport(String),
    /// A reply did not have the expected shape.
    Malformed(String),
}

impl GatewayError {
    /// Text that may be shown to a user verbatim, if this error carries any.
    pub fn user_message(&self) -> Option<String> {
        match self {
            Self::Rejected(_) | Self::NotFound(_) | Self::Conflict(_) => Some(self.to_string()),
            Self::Storage(_) | Self::Transport(_) | Self::Malformed(_) => None,
        }
    }
}

impl Display for GatewayError {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Rejected(message) => write!(f, "{message}"),
            Self::NotFound(id) => write!(f, "User {id} was not found."),
            Self::Conflict(login) => write!(f, "`{login}` is already in use by another user."),
            Self::Storage(detail) => write!(f, "storage failure: {detail}"),
            Self::Transport(detail) => write!(f, "command channel failure: {detail}"),
            Self::Malformed(detail) => write!(f, "malformed reply: {detail}"),
        }
    }
}

impl Error for GatewayError {}

impl From<RepoError> for GatewayError {
    fn from(value: RepoError) -> Self {
        match value {
            RepoError::NotFound(id) => Self::NotFound(id),
            RepoError::LoginTaken(login) => Self::Conflict(login),
            other => Self::Storage(other.to_string()),
        }
    }
}

/// Payload for `UserGateway::create`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct NewUser {
    pub name: String,
    pub login: String,
    #[serde(default)]
    pub role: Option<String>,
    pub credential: String,
}

impl NewUser {
    /// Builds a payload from a normalized draft.
    pub fn from_draft(draft: &UserDraft) -> Self {
        Self {
            name: draft.name.clone(),
            login: draft.login.clone(),
            role: draft.role_value(),
            credential: draft.credential.clone(),
        }
    }

    pub(crate) fn to_draft(&self) -> UserDraft {
        UserDraft {
            name: self.name.clone(),
            login: self.login.clone(),
            credential: self.credential.clone(),
            role: self.role.clone().unwrap_or_default(),
        }
    }
}

/// Payload for `UserGateway::update`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct UserUpdate {
    pub id: UserId,
    pub name: String,
    pub login: String,
    #[serde(default)]
    pub role: Option<String>,
    /// `None` keeps the stored credential.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub credential: Option<String>,
}

impl UserUpdate {
    /// Builds a payload from a normalized draft for record `id`.
    pub fn from_draft(id: UserId, draft: &UserDraft) -> Self {
        Self {
            id,
            name: draft.name.clone(),
            login: draft.login.clone(),
            role: draft.role_value(),
            credential: draft.credential_value(),
        }
    }

    pub(crate) fn to_draft(&self) -> UserDraft {
        UserDraft {
            name: self.name.clone(),
            login: self.login.clone(),
            credential: self.credential.clone().unwrap_or_default(),
            role: self.role.clone().unwrap_or_default(),
        }
    }
}

/// Successful write acknowledgement.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Confirmation {
    pub id: UserId,
    pub message: String,
}

impl Confirmation {
    pub fn new(id: UserId, message: impl Into<String>) -> Self {
        Self {
            id,
            message: message.into(),
        }
    }
}

/// Asynchronous persistence boundary consumed by the controller.
#[async_trait]
pub trait UserGateway: Send + Sync {
    async fn list(&self) -> GatewayResult<Vec<UserRecord>>;
    async fn create(&self, user: &NewUser) -> GatewayResult<Confirmation>;
    async fn update(&self, update: &UserUpdate) -> GatewayResult<Confirmation>;
    async fn delete(&self, id: UserId) -> GatewayResult<Confirmation>;
}
