//! Draft normalization and validation rules.
//!
//! # Responsibility
//! - Normalize form drafts before they reach any gateway.
//! - Report the first violated rule with a stable message.
//!
//! # Invariants
//! - `normalize` is pure, total and idempotent.
//! - Rule order is fixed: required fields, then name length, then the
//!   identifying field, then credential length.

use crate::model::user::UserDraft;
use once_cell::sync::Lazy;
use regex::Regex;
use std::error::Error;
use std::fmt::{Display, Formatter};

pub const NAME_MIN_CHARS: usize = 3;
pub const NAME_MAX_CHARS: usize = 80;
pub const LOGIN_MIN_CHARS: usize = 4;
pub const LOGIN_MAX_CHARS: usize = 32;
pub const CREDENTIAL_MIN_CHARS: usize = 8;
pub const CREDENTIAL_MAX_CHARS: usize = 64;

static LOGIN_RE: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"^[a-z0-9._-]+$").expect("valid login regex"));
static EMAIL_RE: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"^[^\s@]+@[^\s@]+\.[^\s@]+$").expect("valid email regex"));

/// Which shape the identifying field must have.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum IdentifierKind {
    /// Short handle made of `a-z 0-9 . _ -`.
    #[default]
    Login,
    /// Basic `local@domain.tld` address.
    Email,
}

impl IdentifierKind {
    /// Parses `login` / `email`, case-insensitively.
    pub fn parse(value: &str) -> Option<Self> {
        match value.trim().to_ascii_lowercase().as_str() {
            "login" => Some(Self::Login),
            "email" | "e-mail" => Some(Self::Email),
            _ => None,
        }
    }

    pub fn as_str(self) -> &'static str {
        match self {
            Self::Login => "login",
            Self::Email => "email",
        }
    }
}

/// First violated draft rule.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ValidationError {
    MissingName,
    MissingLogin,
    MissingCredential,
    NameTooShort,
    NameTooLong,
    InvalidLogin,
    LoginTooShort,
    LoginTooLong,
    InvalidEmail,
    CredentialLength,
}

impl Display for ValidationError {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::MissingName => write!(f, "Please fill in the name."),
            Self::MissingLogin => write!(f, "Please fill in the login."),
            Self::MissingCredential => write!(f, "A password is required to create a user."),
            Self::NameTooShort => write!(
                f,
                "The name must have at least {NAME_MIN_CHARS} characters."
            ),
            Self::NameTooLong => write!(
                f,
                "The name must have at most {NAME_MAX_CHARS} characters."
            ),
            Self::InvalidLogin => write!(
                f,
                "The login may only contain letters, digits, dots, dashes and underscores."
            ),
            Self::LoginTooShort => write!(
                f,
                "The login must have at least {LOGIN_MIN_CHARS} characters."
            ),
            Self::LoginTooLong => write!(
                f,
                "The login must have at most {LOGIN_MAX_CHARS} characters."
            ),
            Self::InvalidEmail => write!(f, "Please provide a valid e-mail address."),
            Self::CredentialLength => write!(
                f,
                "The password must have between {CREDENTIAL_MIN_CHARS} and {CREDENTIAL_MAX_CHARS} characters."
            ),
        }
    }
}

impl Error for ValidationError {}

/// Trims every field and lower-cases the identifying field.
pub fn normalize(draft: &UserDraft) -> UserDraft {
    UserDraft {
        name: draft.name.trim().to_string(),
        login: draft.login.trim().to_lowercase(),
        credential: draft.credential.trim().to_string(),
        role: draft.role.trim().to_string(),
    }
}

/// Checks a normalized draft and returns the first violated rule.
///
/// `editing` relaxes the credential requirement: a blank credential while
/// editing keeps the stored one.
pub fn validate(
    draft: &UserDraft,
    editing: bool,
    identifier: IdentifierKind,
) -> Result<(), ValidationError> {
    if draft.name.is_empty() {
        return Err(ValidationError::MissingName);
    }
    if draft.login.is_empty() {
        return Err(ValidationError::MissingLogin);
    }
    if !editing && draft.credential.is_empty() {
        return Err(ValidationError::MissingCredential);
    }

    let name_chars = draft.name.chars().count();
    if name_chars < NAME_MIN_CHARS {
        return Err(ValidationError::NameTooShort);
    }
    if name_chars > NAME_MAX_CHARS {
        return Err(ValidationError::NameTooLong);
    }

    validate_identifier(draft.login.as_str(), identifier)?;

    let credential_chars = draft.credential.chars().count();
    if credential_chars > 0
        && !(CREDENTIAL_MIN_CHARS..=CREDENTIAL_MAX_CHARS).contains(&credential_chars)
    {
        return Err(ValidationError::CredentialLength);
    }

    Ok(())
}

fn validate_identifier(login: &str, identifier: IdentifierKind) -> Result<(), ValidationError> {
    match identifier {
        IdentifierKind::Login => {
            if !LOGIN_RE.is_match(login) {
                return Err(ValidationError::InvalidLogin);
            }
            let chars = login.chars().count();
            if chars < LOGIN_MIN_CHARS {
                return Err(ValidationError::LoginTooShort);
            }
            if chars > LOGIN_MAX_CHARS {
                return Err(ValidationError::LoginTooLong);
            }
            Ok(())
        }
        IdentifierKind::Email => {
            if EMAIL_RE.is_match(login) {
                Ok(())
            } else {
                Err(ValidationError::InvalidEmail)
            }
        }
    }
}
