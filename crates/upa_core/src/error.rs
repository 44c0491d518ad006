//! Directory-level error taxonomy.
//!
//! Every failure the controller can observe is folded into `DirectoryError`
//! and tagged with an `ErrorKind` so one mapper can turn it into a status
//! message.

use crate::gateway::GatewayError;
use crate::validation::ValidationError;
use std::error::Error;
use std::fmt::{Display, Formatter};

/// Discriminant consumed by the status-message mapper.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorKind {
    Validation,
    Uniqueness,
    Gateway,
    Unknown,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum DirectoryError {
    /// Draft broke a local rule; the gateway was not contacted.
    Validation(ValidationError),
    /// Identifying field collides with another loaded record.
    Uniqueness { login: String },
    Gateway(GatewayError),
    /// Failure of unrecognized shape. The detail is never shown to users.
    Unknown(String),
}

impl DirectoryError {
    pub fn kind(&self) -> ErrorKind {
        match self {
            Self::Validation(_) => ErrorKind::Validation,
            Self::Uniqueness { .. } => ErrorKind::Uniqueness,
            Self::Gateway(_) => ErrorKind::Gateway,
            Self::Unknown(_) => ErrorKind::Unknown,
        }
    }

    /// Wraps any foreign error as `Unknown`.
    pub fn unknown(err: impl Error) -> Self {
        Self::Unknown(err.to_string())
    }
}

impl Display for DirectoryError {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Validation(err) => write!(f, "{err}"),
            Self::Uniqueness { login } => write!(f, "`{login}` is already in use by another user."),
            Self::Gateway(err) => write!(f, "{err}"),
            Self::Unknown(detail) => write!(f, "unexpected failure: {detail}"),
        }
    }
}

impl Error for DirectoryError {
    fn source(&self) -> Option<&(dyn Error + 'static)> {
        match self {
            Self::Validation(err) => Some(err),
            Self::Gateway(err) => Some(err),
            Self::Uniqueness { .. } | Self::Unknown(_) => None,
        }
    }
}

impl From<ValidationError> for DirectoryError {
    fn from(value: ValidationError) -> Self {
        Self::Validation(value)
    }
}

impl From<GatewayError> for DirectoryError {
    fn from(value: GatewayError) -> Self {
        Self::Gateway(value)
    }
}
