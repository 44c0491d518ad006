//! User-directory CRUD controller.
//!
//! # Responsibility
//! - Own the loaded collection, the form draft, the edition context, the
//!   loading flag and the last status message.
//! - Orchestrate load/save/remove through a `UserGateway` and turn every
//!   outcome into a `StatusMessage`.
//!
//! # Invariants
//! - Views only read snapshots; the operations below are the only writers.
//! - Failures never clear `records`, and a failed save keeps the draft and
//!   edition so the user can retry.
//! - State is published through a `watch` cell: publishing with no
//!   subscribers is a no-op, so late gateway replies after a view is gone
//!   are harmless.
//! - The state cell is never borrowed across an `.await`.

pub mod message;

use crate::error::DirectoryError;
use crate::gateway::{Confirmation, NewUser, UserGateway, UserUpdate};
use crate::model::user::{DraftField, Edition, UserDraft, UserId, UserRecord};
use crate::validation::{normalize, validate, IdentifierKind};
use log::{info, warn};
use message::{describe_error, StatusMessage};
use std::sync::Arc;
use tokio::sync::watch;

pub const LOAD_FAILED_TITLE: &str = "Could not load users";
pub const SAVE_FAILED_TITLE: &str = "Could not save";
pub const REMOVE_FAILED_TITLE: &str = "Could not remove";
pub const SAVED_TITLE: &str = "Success";
pub const REMOVED_TITLE: &str = "User removed";

/// Read-only view of the controller state.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct DirectorySnapshot {
    pub records: Vec<UserRecord>,
    pub draft: UserDraft,
    pub edition: Edition,
    pub loading: bool,
    pub message: Option<StatusMessage>,
}

impl DirectorySnapshot {
    /// Heading for the form in the current edition context.
    pub fn form_title(&self) -> &'static str {
        if self.edition.is_editing() {
            "Edit user"
        } else {
            "Create user"
        }
    }

    /// Label for the submit affordance in the current edition context.
    pub fn submit_label(&self) -> &'static str {
        if self.edition.is_editing() {
            "Update"
        } else {
            "Save"
        }
    }
}

/// Controller mediating between a form-driven view and a gateway.
pub struct UserDirectoryController<G: ?Sized> {
    gateway: Arc<G>,
    identifier: IdentifierKind,
    state: watch::Sender<DirectorySnapshot>,
}

impl<G: ?Sized> std::fmt::Debug for UserDirectoryController<G> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("UserDirectoryController")
            .field("identifier", &self.identifier)
            .field("state", &*self.state.borrow())
            .finish_non_exhaustive()
    }
}

impl<G: UserGateway + ?Sized> UserDirectoryController<G> {
    /// Creates a controller with an empty collection. Call `load` (or use
    /// `init`) to populate it.
    pub fn new(gateway: Arc<G>, identifier: IdentifierKind) -> Self {
        let (state, _) = watch::channel(DirectorySnapshot::default());
        Self {
            gateway,
            identifier,
            state,
        }
    }

    /// Creates a controller and performs the initial load.
    pub async fn init(gateway: Arc<G>, identifier: IdentifierKind) -> Self {
        let controller = Self::new(gateway, identifier);
        // A load failure is already reported through the status message.
        let _ = controller.load().await;
        controller
    }

    pub fn identifier(&self) -> IdentifierKind {
        self.identifier
    }

    /// Clones the current state.
    pub fn snapshot(&self) -> DirectorySnapshot {
        self.state.borrow().clone()
    }

    /// Returns a receiver notified after every state change.
    pub fn subscribe(&self) -> watch::Receiver<DirectorySnapshot> {
        self.state.subscribe()
    }

    /// Re-reads the collection from the gateway.
    ///
    /// On failure the previous `records` are kept and a failure message is
    /// set. `loading` is cleared either way.
    pub async fn load(&self) -> Result<(), DirectoryError> {
        self.state.send_modify(|state| state.loading = true);

        match self.gateway.list().await {
            Ok(records) => {
                info!(
                    "event=directory_load module=controller status=ok records={}",
                    records.len()
                );
                self.state.send_modify(|state| {
                    state.records = records;
                    state.loading = false;
                });
                Ok(())
            }
            Err(err) => {
                let err = DirectoryError::from(err);
                warn!("event=directory_load module=controller status=error error={err}");
                let message = StatusMessage::failure(LOAD_FAILED_TITLE, describe_error(&err));
                self.state.send_modify(|state| {
                    state.loading = false;
                    state.message = Some(message);
                });
                Err(err)
            }
        }
    }

    /// Writes one draft field. Validation is deferred to `save`.
    pub fn update_field(&self, field: DraftField, value: impl Into<String>) {
        let value = value.into();
        self.state
            .send_modify(|state| *state.draft.field_mut(field) = value);
    }

    /// Validates the draft and creates or updates the record.
    ///
    /// The outcome is always reported through the status message as well; the
    /// returned value is for callers that need the confirmation or the error
    /// kind.
    pub async fn save(&self) -> Result<Confirmation, DirectoryError> {
        let (draft, edition) = {
            let state = self.state.borrow();
            (normalize(&state.draft), state.edition)
        };

        if let Err(violation) = validate(&draft, edition.is_editing(), self.identifier) {
            return Err(self.report_failure(SAVE_FAILED_TITLE, violation.into()));
        }

        if self.login_collides(&draft.login, edition.editing_id()) {
            return Err(self.report_failure(
                SAVE_FAILED_TITLE,
                DirectoryError::Uniqueness {
                    login: draft.login.clone(),
                },
            ));
        }

        let result = match edition {
            Edition::Creating => self.gateway.create(&NewUser::from_draft(&draft)).await,
            Edition::Editing(id) => {
                self.gateway
                    .update(&UserUpdate::from_draft(id, &draft))
                    .await
            }
        };

        match result {
            Ok(confirmation) => {
                info!(
                    "event=directory_save module=controller status=ok id={} mode={}",
                    confirmation.id,
                    if edition.is_editing() { "update" } else { "create" }
                );
                let message = StatusMessage::success(SAVED_TITLE, confirmation.message.clone());
                self.state.send_modify(|state| {
                    state.draft = UserDraft::default();
                    state.edition = Edition::Creating;
                    state.message = Some(message);
                });
                // A reload failure replaces the success message on its own.
                let _ = self.load().await;
                Ok(confirmation)
            }
            Err(err) => Err(self.report_failure(SAVE_FAILED_TITLE, err.into())),
        }
    }

    /// Switches to edit mode for `record`, copying its fields into the draft
    /// with a blank credential.
    pub fn start_edit(&self, record: &UserRecord) {
        let draft = UserDraft::from_record(record);
        self.state.send_modify(|state| {
            state.edition = Edition::Editing(record.id);
            state.draft = draft;
            state.message = None;
        });
    }

    /// Returns to create mode with an empty draft. Leaves `records` and the
    /// message alone.
    pub fn cancel_edit(&self) {
        self.state.send_modify(|state| {
            state.draft = UserDraft::default();
            state.edition = Edition::Creating;
        });
    }

    /// Drops the current status message.
    pub fn clear_message(&self) {
        self.state.send_if_modified(|state| state.message.take().is_some());
    }

    /// Deletes record `id` and re-synchronizes the collection.
    pub async fn remove(&self, id: UserId) -> Result<Confirmation, DirectoryError> {
        let label = self.record_label(id);

        match self.gateway.delete(id).await {
            Ok(confirmation) => {
                info!("event=directory_remove module=controller status=ok id={id}");
                let message = StatusMessage::success(REMOVED_TITLE, confirmation.message.clone());
                self.state.send_modify(|state| {
                    if state.edition.targets(id) {
                        state.draft = UserDraft::default();
                        state.edition = Edition::Creating;
                    }
                    state.message = Some(message);
                });
                let _ = self.load().await;
                Ok(confirmation)
            }
            Err(err) => {
                let err = DirectoryError::from(err);
                warn!("event=directory_remove module=controller status=error id={id} error={err}");
                let message = StatusMessage::failure(
                    REMOVE_FAILED_TITLE,
                    format!("User {label} could not be removed. {}", describe_error(&err)),
                );
                self.state
                    .send_modify(|state| state.message = Some(message));
                Err(err)
            }
        }
    }

    fn login_collides(&self, login: &str, except: Option<UserId>) -> bool {
        self.state
            .borrow()
            .records
            .iter()
            .any(|record| Some(record.id) != except && record.has_login(login))
    }

    fn record_label(&self, id: UserId) -> String {
        self.state
            .borrow()
            .records
            .iter()
            .find(|record| record.id == id)
            .map(|record| format!("`{}`", record.login))
            .unwrap_or_else(|| format!("#{id}"))
    }

    fn report_failure(&self, title: &str, err: DirectoryError) -> DirectoryError {
        warn!(
            "event=directory_failure module=controller status=error kind={:?} error={}",
            err.kind(),
            err
        );
        let message = StatusMessage::failure(title, describe_error(&err));
        self.state
            .send_modify(|state| state.message = Some(message));
        err
    }
}
