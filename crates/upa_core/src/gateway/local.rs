//! In-process gateway for the local-only directory.
//!
//! # Responsibility
//! - Keep the collection in a process-local map keyed by id.
//! - Optionally mirror the collection to a JSON file after every write.
//!
//! # Invariants
//! - Ids are generated here, strictly increasing, never reused. The highest
//!   id ever issued is persisted with the file, so deleted ids stay retired
//!   across reopen.
//! - Id exhaustion fails `create` with a storage error; it never wraps.
//! - A write that cannot be persisted is rolled back in memory, so the map and
//!   the file never diverge.
//! - Credentials are accepted but never stored.

use crate::gateway::{
    Confirmation, GatewayError, GatewayResult, NewUser, UserGateway, UserUpdate, CREATED_MESSAGE,
    DELETED_MESSAGE, UPDATED_MESSAGE,
};
use crate::model::codec::{decode_snapshot, encode_snapshot, Snapshot};
use crate::model::user::{UserId, UserRecord};
use async_trait::async_trait;
use log::{info, warn};
use std::collections::BTreeMap;
use std::path::{Path, PathBuf};
use std::sync::{Mutex, MutexGuard};
use std::time::{SystemTime, UNIX_EPOCH};

#[derive(Debug, Default)]
struct LocalState {
    records: BTreeMap<UserId, UserRecord>,
    /// Highest id ever issued or loaded; 0 for a fresh store.
    last_id: UserId,
}

impl LocalState {
    fn from_snapshot(snapshot: Snapshot) -> Self {
        let highest = snapshot.records.iter().map(|record| record.id).max().unwrap_or(0);
        Self {
            records: snapshot
                .records
                .into_iter()
                .map(|record| (record.id, record))
                .collect(),
            last_id: snapshot.last_id.max(highest),
        }
    }

    fn login_taken(&self, login: &str, except: Option<UserId>) -> bool {
        self.records
            .values()
            .any(|record| Some(record.id) != except && record.has_login(login))
    }
}

/// Gateway backed by an in-process map, with optional JSON file persistence.
#[derive(Debug)]
pub struct LocalGateway {
    state: Mutex<LocalState>,
    path: Option<PathBuf>,
}

impl LocalGateway {
    /// Creates an empty, memory-only store.
    pub fn in_memory() -> Self {
        Self::with_records(Vec::new())
    }

    /// Creates a memory-only store seeded with `records`.
    pub fn with_records(records: Vec<UserRecord>) -> Self {
        Self {
            state: Mutex::new(LocalState::from_snapshot(Snapshot {
                last_id: 0,
                records,
            })),
            path: None,
        }
    }

    /// Opens a store mirrored to `path`.
    ///
    /// A missing or unreadable file yields an empty collection; malformed
    /// entries are dropped by the snapshot codec.
    pub fn open(path: impl Into<PathBuf>) -> Self {
        let path = path.into();
        let snapshot = match std::fs::read_to_string(&path) {
            Ok(raw) => decode_snapshot(&raw),
            Err(err) if err.kind() == std::io::ErrorKind::NotFound => Snapshot::default(),
            Err(err) => {
                warn!(
                    "event=local_store_open module=gateway status=error path={} error={}",
                    path.display(),
                    err
                );
                Snapshot::default()
            }
        };
        info!(
            "event=local_store_open module=gateway status=ok path={} records={} last_id={}",
            path.display(),
            snapshot.records.len(),
            snapshot.last_id
        );

        Self {
            state: Mutex::new(LocalState::from_snapshot(snapshot)),
            path: Some(path),
        }
    }

    fn lock(&self) -> GatewayResult<MutexGuard<'_, LocalState>> {
        self.state
            .lock()
            .map_err(|_| GatewayError::Storage("local store lock poisoned".to_string()))
    }

    fn persist(&self, state: &LocalState) -> GatewayResult<()> {
        let Some(path) = self.path.as_deref() else {
            return Ok(());
        };
        let records = state.records.values().cloned().collect::<Vec<_>>();
        write_snapshot(path, state.last_id, &records).map_err(|err| {
            warn!(
                "event=local_store_write module=gateway status=error path={} error={}",
                path.display(),
                err
            );
            GatewayError::Storage(err.to_string())
        })
    }
}

#[async_trait]
impl UserGateway for LocalGateway {
    async fn list(&self) -> GatewayResult<Vec<UserRecord>> {
        let state = self.lock()?;
        Ok(state.records.values().rev().cloned().collect())
    }

    async fn create(&self, user: &NewUser) -> GatewayResult<Confirmation> {
        let mut state = self.lock()?;
        if state.login_taken(&user.login, None) {
            return Err(GatewayError::Conflict(user.login.clone()));
        }

        let Some(id) = state.last_id.checked_add(1) else {
            warn!("event=local_store_create module=gateway status=error error_code=id_space_exhausted");
            return Err(GatewayError::Storage("id space exhausted".to_string()));
        };
        let previous_last_id = state.last_id;
        state.last_id = id;
        state.records.insert(
            id,
            UserRecord {
                id,
                name: user.name.clone(),
                login: user.login.clone(),
                role: user.role.clone(),
                created_at: Some(now_epoch_ms()),
            },
        );
        if let Err(err) = self.persist(&state) {
            state.records.remove(&id);
            state.last_id = previous_last_id;
            return Err(err);
        }

        Ok(Confirmation::new(id, CREATED_MESSAGE))
    }

    async fn update(&self, update: &UserUpdate) -> GatewayResult<Confirmation> {
        let mut state = self.lock()?;
        if !state.records.contains_key(&update.id) {
            return Err(GatewayError::NotFound(update.id));
        }
        if state.login_taken(&update.login, Some(update.id)) {
            return Err(GatewayError::Conflict(update.login.clone()));
        }

        let Some(record) = state.records.get_mut(&update.id) else {
            return Err(GatewayError::NotFound(update.id));
        };
        let previous = record.clone();
        record.name = update.name.clone();
        record.login = update.login.clone();
        record.role = update.role.clone();

        if let Err(err) = self.persist(&state) {
            state.records.insert(previous.id, previous);
            return Err(err);
        }

        Ok(Confirmation::new(update.id, UPDATED_MESSAGE))
    }

    async fn delete(&self, id: UserId) -> GatewayResult<Confirmation> {
        let mut state = self.lock()?;
        let Some(removed) = state.records.remove(&id) else {
            return Err(GatewayError::NotFound(id));
        };

        if let Err(err) = self.persist(&state) {
            state.records.insert(id, removed);
            return Err(err);
        }

        Ok(Confirmation::new(id, DELETED_MESSAGE))
    }
}

fn write_snapshot(path: &Path, last_id: UserId, records: &[UserRecord]) -> std::io::Result<()> {
    let encoded = encode_snapshot(last_id, records).map_err(std::io::Error::other)?;
    if let Some(parent) = path.parent().filter(|parent| !parent.as_os_str().is_empty()) {
        std::fs::create_dir_all(parent)?;
    }
    let mut tmp = path.as_os_str().to_owned();
    tmp.push(".tmp");
    let tmp = PathBuf::from(tmp);
    std::fs::write(&tmp, encoded)?;
    std::fs::rename(&tmp, path)
}

fn now_epoch_ms() -> i64 {
    SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .map(|elapsed| i64::try_from(elapsed.as_millis()).unwrap_or(i64::MAX))
        .unwrap_or(0)
}
