//! Durable gateway over the SQLite user repository.
//!
//! # Invariants
//! - One connection, guarded by a mutex; each operation is one statement.
//! - Credentials are Argon2-hashed before they reach the repository.

use crate::credential::hash_credential;
use crate::db::{open_db, open_db_in_memory, DbResult};
use crate::gateway::{
    Confirmation, GatewayError, GatewayResult, NewUser, UserGateway, UserUpdate, CREATED_MESSAGE,
    DELETED_MESSAGE, UPDATED_MESSAGE,
};
use crate::model::user::{UserId, UserRecord};
use crate::repo::user_repo::{
    NewUserRow, RepoResult, SqliteUserRepository, UserChanges, UserRepository,
};
use async_trait::async_trait;
use log::{error, info};
use rusqlite::Connection;
use std::path::Path;
use std::sync::Mutex;

const CREDENTIAL_REJECTED: &str = "Could not process the credential.";
const CREDENTIAL_REQUIRED: &str = "A password is required to create a user.";

/// Gateway persisting users in a migrated SQLite database.
#[derive(Debug)]
pub struct SqliteGateway {
    conn: Mutex<Connection>,
}

impl SqliteGateway {
    /// Opens (and migrates) the database file at `path`.
    pub fn open(path: impl AsRef<Path>) -> DbResult<Self> {
        open_db(path).map(Self::from_connection)
    }

    pub fn in_memory() -> DbResult<Self> {
        open_db_in_memory().map(Self::from_connection)
    }

    /// Wraps an already migrated connection.
    pub fn from_connection(conn: Connection) -> Self {
        Self {
            conn: Mutex::new(conn),
        }
    }

    /// Runs `f` against a repository bound to the guarded connection.
    pub fn with_repo<T>(
        &self,
        f: impl FnOnce(&SqliteUserRepository<'_>) -> RepoResult<T>,
    ) -> GatewayResult<T> {
        let conn = self
            .conn
            .lock()
            .map_err(|_| GatewayError::Storage("connection lock poisoned".to_string()))?;
        let repo = SqliteUserRepository::new(&conn);
        f(&repo).map_err(|err| {
            let mapped = GatewayError::from(err);
            if let GatewayError::Storage(detail) = &mapped {
                error!("event=sqlite_gateway module=gateway status=error error={detail}");
            }
            mapped
        })
    }
}

#[async_trait]
impl UserGateway for SqliteGateway {
    async fn list(&self) -> GatewayResult<Vec<UserRecord>> {
        self.with_repo(|repo| repo.list_users())
    }

    async fn create(&self, user: &NewUser) -> GatewayResult<Confirmation> {
        if user.credential.is_empty() {
            return Err(GatewayError::Rejected(CREDENTIAL_REQUIRED.to_string()));
        }
        let credential_hash = hash_credential(&user.credential).map_err(|err| {
            error!("event=credential_hash module=gateway status=error error={err}");
            GatewayError::Rejected(CREDENTIAL_REJECTED.to_string())
        })?;

        let row = NewUserRow {
            name: user.name.clone(),
            login: user.login.clone(),
            role: user.role.clone(),
            credential_hash,
        };
        let id = self.with_repo(|repo| repo.insert_user(&row))?;
        info!("event=user_create module=gateway status=ok id={id}");
        Ok(Confirmation::new(id, CREATED_MESSAGE))
    }

    async fn update(&self, update: &UserUpdate) -> GatewayResult<Confirmation> {
        let credential_hash = match update.credential.as_deref() {
            Some(credential) if !credential.is_empty() => {
                Some(hash_credential(credential).map_err(|err| {
                    error!("event=credential_hash module=gateway status=error error={err}");
                    GatewayError::Rejected(CREDENTIAL_REJECTED.to_string())
                })?)
            }
            _ => None,
        };

        let changes = UserChanges {
            id: update.id,
            name: update.name.clone(),
            login: update.login.clone(),
            role: update.role.clone(),
            credential_hash,
        };
        self.with_repo(|repo| repo.update_user(&changes))?;
        info!("event=user_update module=gateway status=ok id={}", update.id);
        Ok(Confirmation::new(update.id, UPDATED_MESSAGE))
    }

    async fn delete(&self, id: UserId) -> GatewayResult<Confirmation> {
        self.with_repo(|repo| repo.delete_user(id))?;
        info!("event=user_delete module=gateway status=ok id={id}");
        Ok(Confirmation::new(id, DELETED_MESSAGE))
    }
}
