//! Status messages and the error-to-message mapper.
//!
//! # Invariants
//! - Validation, uniqueness and user-facing gateway errors surface verbatim.
//! - Storage, transport, malformed and unknown failures surface only as
//!   `GENERIC_FAILURE`.

use crate::error::DirectoryError;

pub const GENERIC_FAILURE: &str = "The operation could not be completed.";

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MessageTone {
    Success,
    Failure,
}

/// Outcome notice shown until the next operation replaces it.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StatusMessage {
    pub tone: MessageTone,
    pub title: String,
    pub description: String,
}

impl StatusMessage {
    pub fn success(title: impl Into<String>, description: impl Into<String>) -> Self {
        Self {
            tone: MessageTone::Success,
            title: title.into(),
            description: description.into(),
        }
    }

    pub fn failure(title: impl Into<String>, description: impl Into<String>) -> Self {
        Self {
            tone: MessageTone::Failure,
            title: title.into(),
            description: description.into(),
        }
    }

    pub fn is_failure(&self) -> bool {
        self.tone == MessageTone::Failure
    }
}

/// Maps any directory error to text safe to show a user.
pub fn describe_error(err: &DirectoryError) -> String {
    match err {
        DirectoryError::Validation(_) | DirectoryError::Uniqueness { .. } => err.to_string(),
        DirectoryError::Gateway(gateway) => gateway
            .user_message()
            .unwrap_or_else(|| GENERIC_FAILURE.to_string()),
        DirectoryError::Unknown(_) => GENERIC_FAILURE.to_string(),
    }
}

#[cfg(test)]
mod tests {
    use super::{describe_error, StatusMessage, GENERIC_FAILURE};
    use crate::error::{DirectoryError, ErrorKind};
    use crate::gateway::GatewayError;
    use crate::validation::ValidationError;

    #[test]
    fn typed_errors_surface_their_message() {
        let validation = DirectoryError::from(ValidationError::NameTooShort);
        assert_eq!(validation.kind(), ErrorKind::Validation);
        assert_eq!(
            describe_error(&validation),
            ValidationError::NameTooShort.to_string()
        );

        let rejected = DirectoryError::from(GatewayError::Rejected("Invalid data".to_string()));
        assert_eq!(describe_error(&rejected), "Invalid data");

        let taken = DirectoryError::Uniqueness {
            login: "joao".to_string(),
        };
        assert_eq!(taken.kind(), ErrorKind::Uniqueness);
        assert!(describe_error(&taken).contains("joao"));
    }

    #[test]
    fn collision_text_does_not_assume_the_identifier_kind() {
        let email = "ana.silva@exemplo.com";
        let taken = DirectoryError::Uniqueness {
            login: email.to_string(),
        };
        let conflict = DirectoryError::from(GatewayError::Conflict(email.to_string()));

        for err in [taken, conflict] {
            let text = describe_error(&err);
            assert!(text.contains(email));
            assert!(!text.to_lowercase().contains("login"), "{text}");
        }
    }

    #[test]
    fn raw_failures_map_to_generic_text() {
        let storage = DirectoryError::from(GatewayError::Storage(
            "database disk image is malformed".to_string(),
        ));
        assert_eq!(describe_error(&storage), GENERIC_FAILURE);

        let transport = DirectoryError::from(GatewayError::Transport("EOF".to_string()));
        assert_eq!(describe_error(&transport), GENERIC_FAILURE);

        let unknown = DirectoryError::unknown(std::fmt::Error);
        assert_eq!(unknown.kind(), ErrorKind::Unknown);
        assert_eq!(describe_error(&unknown), GENERIC_FAILURE);
    }

    #[test]
    fn tone_helpers() {
        assert!(StatusMessage::failure("t", "d").is_failure());
        assert!(!StatusMessage::success("t", "d").is_failure());
    }
}
