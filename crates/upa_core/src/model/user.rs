//! User record, form draft and edition context.
//!
//! # Responsibility
//! - Define the canonical `UserRecord` returned by gateways.
//! - Define the always-present `UserDraft` edited by the form.
//!
//! # Invariants
//! - `UserDraft::default()` is the empty draft the form resets to.
//! - `login` comparisons are case-insensitive across the collection.

use serde::{Deserialize, Serialize};

/// Stable identifier assigned by the persistence boundary.
pub type UserId = i64;

/// Directory entry as exposed to the view.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct UserRecord {
    pub id: UserId,
    pub name: String,
    /// Identifying field. Holds a login handle or an email address depending
    /// on the configured `IdentifierKind`.
    pub login: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub role: Option<String>,
    /// Unix epoch milliseconds. Present when sourced from durable storage.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub created_at: Option<i64>,
}

impl UserRecord {
    /// Returns whether `login` matches this record, ignoring case.
    pub fn has_login(&self, login: &str) -> bool {
        self.login.to_lowercase() == login.to_lowercase()
    }
}

/// In-progress form state mirroring the editable subset of a record.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct UserDraft {
    pub name: String,
    pub login: String,
    /// Empty in edit mode means "keep the stored credential".
    pub credential: String,
    /// Empty means "no role".
    pub role: String,
}

impl UserDraft {
    /// Builds a draft from an existing record. The credential is never copied
    /// back into a form.
    pub fn from_record(record: &UserRecord) -> Self {
        Self {
            name: record.name.clone(),
            login: record.login.clone(),
            credential: String::new(),
            role: record.role.clone().unwrap_or_default(),
        }
    }

    /// Returns a mutable handle to one field.
    pub fn field_mut(&mut self, field: DraftField) -> &mut String {
        match field {
            DraftField::Name => &mut self.name,
            DraftField::Login => &mut self.login,
            DraftField::Credential => &mut self.credential,
            DraftField::Role => &mut self.role,
        }
    }

    /// Role as stored on a record: `None` when blank.
    pub fn role_value(&self) -> Option<String> {
        let role = self.role.trim();
        if role.is_empty() {
            None
        } else {
            Some(role.to_string())
        }
    }

    /// Credential as sent on update: `None` when blank.
    pub fn credential_value(&self) -> Option<String> {
        if self.credential.is_empty() {
            None
        } else {
            Some(self.credential.clone())
        }
    }
}

/// Editable draft fields addressed by `update_field`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum DraftField {
    Name,
    Login,
    Credential,
    Role,
}

/// Whether the form creates a new record or updates an existing one.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum Edition {
    #[default]
    Creating,
    Editing(UserId),
}

impl Edition {
    /// Returns the edited id, if any.
    pub fn editing_id(self) -> Option<UserId> {
        match self {
            Self::Creating => None,
            Self::Editing(id) => Some(id),
        }
    }

    pub fn is_editing(self) -> bool {
        matches!(self, Self::Editing(_))
    }

    /// Returns whether this context currently targets `id`.
    pub fn targets(self, id: UserId) -> bool {
        self.editing_id() == Some(id)
    }
}
