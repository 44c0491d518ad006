//! Snapshot codec for persisted user collections.
//!
//! # Responsibility
//! - Turn a stored or received JSON document into a well-formed
//!   `Vec<UserRecord>`.
//! - Serialize the collection back for durable local storage, together with
//!   the highest id ever issued.
//!
//! # Invariants
//! - Decoding never fails: malformed entries are dropped, an unreadable
//!   document yields an empty collection.
//! - Decoded ids are positive and unique; the first occurrence wins.
//! - A decoded snapshot's `last_id` is never below any decoded record id.

use crate::model::user::{UserId, UserRecord};
use log::warn;
use serde::Serialize;
use serde_json::{Map, Value};
use std::collections::BTreeSet;

/// Stored form of a local collection.
///
/// `last_id` is the high-water mark of issued ids, so ids of deleted records
/// are not handed out again after a reopen.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Snapshot {
    pub last_id: UserId,
    pub records: Vec<UserRecord>,
}

#[derive(Serialize)]
struct SnapshotDocument<'a> {
    last_id: UserId,
    users: &'a [UserRecord],
}

/// Decodes a stored snapshot.
///
/// Accepts `{"last_id": N, "users": [...]}` as well as a bare list of users,
/// the layout written before the high-water mark existed.
pub fn decode_snapshot(raw: &str) -> Snapshot {
    let Some(document) = parse_document(raw) else {
        return Snapshot::default();
    };

    let (stored_last_id, records) = match document {
        Value::Object(mut fields) => {
            let stored = stored_last_id(&fields);
            let records = match fields.remove("users") {
                Some(users) => decode_value(users),
                None => {
                    warn!("event=snapshot_decode module=codec status=error error_code=missing_users");
                    Vec::new()
                }
            };
            (stored, records)
        }
        list => (0, decode_value(list)),
    };

    let highest = records.iter().map(|record| record.id).max().unwrap_or(0);
    Snapshot {
        last_id: stored_last_id.max(highest),
        records,
    }
}

/// Encodes a snapshot for storage.
pub fn encode_snapshot(last_id: UserId, records: &[UserRecord]) -> Result<String, serde_json::Error> {
    serde_json::to_string_pretty(&SnapshotDocument {
        last_id,
        users: records,
    })
}

fn stored_last_id(fields: &Map<String, Value>) -> UserId {
    match fields.get("last_id") {
        None => 0,
        Some(value) => match value.as_i64().filter(|id| *id >= 0) {
            Some(id) => id,
            None => {
                warn!("event=snapshot_decode module=codec status=partial error_code=invalid_last_id");
                0
            }
        },
    }
}

/// Decodes a persisted collection, dropping entries with the wrong shape.
pub fn decode_records(raw: &str) -> Vec<UserRecord> {
    parse_document(raw).map(decode_value).unwrap_or_default()
}

/// Decodes an already-parsed document with the same rules as `decode_records`.
pub fn decode_value(document: Value) -> Vec<UserRecord> {
    let Value::Array(entries) = document else {
        warn!("event=snapshot_decode module=codec status=error error_code=not_a_list");
        return Vec::new();
    };

    let total = entries.len();
    let mut seen = BTreeSet::new();
    let records = entries
        .into_iter()
        .filter_map(|entry| serde_json::from_value::<UserRecord>(entry).ok())
        .filter(is_well_formed)
        .filter(|record| seen.insert(record.id))
        .collect::<Vec<_>>();

    let dropped = total - records.len();
    if dropped > 0 {
        warn!(
            "event=snapshot_decode module=codec status=partial kept={} dropped={}",
            records.len(),
            dropped
        );
    }
    records
}

fn parse_document(raw: &str) -> Option<Value> {
    serde_json::from_str::<Value>(raw)
        .map_err(|err| {
            warn!(
                "event=snapshot_decode module=codec status=error error_code=unreadable_document error={}",
                err
            );
        })
        .ok()
}

fn is_well_formed(record: &UserRecord) -> bool {
    record.id > 0 && !record.name.trim().is_empty() && !record.login.trim().is_empty()
}
