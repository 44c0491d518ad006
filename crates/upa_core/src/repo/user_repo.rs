//! User repository contract and SQLite implementation.
//!
//! # Invariants
//! - Every write is one SQL statement, so callers never observe partial rows.
//! - `login` uniqueness is enforced by the `idx_users_login` index and
//!   surfaces as `RepoError::LoginTaken`.

use crate::db::DbError;
use crate::model::user::{UserId, UserRecord};
use rusqlite::{params, Connection, OptionalExtension, Row};
use std::error::Error;
use std::fmt::{Display, Formatter};

const USER_SELECT_SQL: &str = "SELECT
    id,
    name,
    login,
    role,
    created_at
FROM users";

pub type RepoResult<T> = Result<T, RepoError>;

#[derive(Debug)]
pub enum RepoError {
    Db(DbError),
    NotFound(UserId),
    LoginTaken(String),
    InvalidData(String),
}

impl Display for RepoError {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Db(err) => write!(f, "{err}"),
            Self::NotFound(id) => write!(f, "user not found: {id}"),
            Self::LoginTaken(login) => write!(f, "login already in use: {login}"),
            Self::InvalidData(message) => write!(f, "invalid persisted user data: {message}"),
        }
    }
}

impl Error for RepoError {
    fn source(&self) -> Option<&(dyn Error + 'static)> {
        match self {
            Self::Db(err) => Some(err),
            _ => None,
        }
    }
}

impl From<DbError> for RepoError {
    fn from(value: DbError) -> Self {
        Self::Db(value)
    }
}

impl From<rusqlite::Error> for RepoError {
    fn from(value: rusqlite::Error) -> Self {
        Self::Db(DbError::Sqlite(value))
    }
}

/// Row data for a new user. The credential is already hashed.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NewUserRow {
    pub name: String,
    pub login: String,
    pub role: Option<String>,
    pub credential_hash: String,
}

/// Full replacement of a user's profile fields.
///
/// `credential_hash = None` keeps the stored hash.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct UserChanges {
    pub id: UserId,
    pub name: String,
    pub login: String,
    pub role: Option<String>,
    pub credential_hash: Option<String>,
}

/// Repository interface for user CRUD operations.
pub trait UserRepository {
    /// Lists every user, newest first.
    fn list_users(&self) -> RepoResult<Vec<UserRecord>>;
    fn get_user(&self, id: UserId) -> RepoResult<Option<UserRecord>>;
    /// Case-insensitive lookup by identifying field.
    fn find_by_login(&self, login: &str) -> RepoResult<Option<UserRecord>>;
    fn insert_user(&self, row: &NewUserRow) -> RepoResult<UserId>;
    fn update_user(&self, changes: &UserChanges) -> RepoResult<()>;
    fn delete_user(&self, id: UserId) -> RepoResult<()>;
}

/// SQLite-backed user repository.
pub struct SqliteUserRepository<'conn> {
    conn: &'conn Connection,
}

impl<'conn> SqliteUserRepository<'conn> {
    pub fn new(conn: &'conn Connection) -> Self {
        Self { conn }
    }
}

impl UserRepository for SqliteUserRepository<'_> {
    fn list_users(&self) -> RepoResult<Vec<UserRecord>> {
        let mut stmt = self
            .conn
            .prepare(&format!("{USER_SELECT_SQL} ORDER BY created_at DESC, id DESC;"))?;
        let mut rows = stmt.query([])?;
        let mut users = Vec::new();

        while let Some(row) = rows.next()? {
            users.push(parse_user_row(row)?);
        }

        Ok(users)
    }

    fn get_user(&self, id: UserId) -> RepoResult<Option<UserRecord>> {
        let mut stmt = self
            .conn
            .prepare(&format!("{USER_SELECT_SQL} WHERE id = ?1;"))?;
        let mut rows = stmt.query([id])?;
        match rows.next()? {
            Some(row) => Ok(Some(parse_user_row(row)?)),
            None => Ok(None),
        }
    }

    fn find_by_login(&self, login: &str) -> RepoResult<Option<UserRecord>> {
        let id = self
            .conn
            .query_row(
                "SELECT id FROM users WHERE login = ?1 COLLATE NOCASE;",
                [login.trim().to_lowercase()],
                |row| row.get::<_, UserId>(0),
            )
            .optional()?;

        match id {
            Some(id) => self.get_user(id),
            None => Ok(None),
        }
    }

    fn insert_user(&self, row: &NewUserRow) -> RepoResult<UserId> {
        self.conn
            .execute(
                "INSERT INTO users (name, login, role, credential_hash)
                 VALUES (?1, ?2, ?3, ?4);",
                params![
                    row.name.as_str(),
                    row.login.as_str(),
                    row.role.as_deref(),
                    row.credential_hash.as_str(),
                ],
            )
            .map_err(|err| map_write_error(err, row.login.as_str()))?;

        Ok(self.conn.last_insert_rowid())
    }

    fn update_user(&self, changes: &UserChanges) -> RepoResult<()> {
        let changed = self
            .conn
            .execute(
                "UPDATE users
                 SET
                    name = ?1,
                    login = ?2,
                    role = ?3,
                    credential_hash = COALESCE(?4, credential_hash),
                    updated_at = (CAST(strftime('%s', 'now') AS INTEGER) * 1000)
                 WHERE id = ?5;",
                params![
                    changes.name.as_str(),
                    changes.login.as_str(),
                    changes.role.as_deref(),
                    changes.credential_hash.as_deref(),
                    changes.id,
                ],
            )
            .map_err(|err| map_write_error(err, changes.login.as_str()))?;

        if changed == 0 {
            return Err(RepoError::NotFound(changes.id));
        }

        Ok(())
    }

    fn delete_user(&self, id: UserId) -> RepoResult<()> {
        let changed = self.conn.execute("DELETE FROM users WHERE id = ?1;", [id])?;
        if changed == 0 {
            return Err(RepoError::NotFound(id));
        }

        Ok(())
    }
}

fn parse_user_row(row: &Row<'_>) -> RepoResult<UserRecord> {
    let id: UserId = row.get("id")?;
    if id <= 0 {
        return Err(RepoError::InvalidData(format!(
            "invalid id value `{id}` in users.id"
        )));
    }

    let login: String = row.get("login")?;
    if login.trim().is_empty() {
        return Err(RepoError::InvalidData(format!(
            "empty login for user {id} in users.login"
        )));
    }

    Ok(UserRecord {
        id,
        name: row.get("name")?,
        login,
        role: row.get("role")?,
        created_at: row.get("created_at")?,
    })
}

fn map_write_error(err: rusqlite::Error, login: &str) -> RepoError {
    match &err {
        rusqlite::Error::SqliteFailure(failure, _)
            if failure.extended_code == rusqlite::ffi::SQLITE_CONSTRAINT_UNIQUE =>
        {
            RepoError::LoginTaken(login.to_string())
        }
        _ => err.into(),
    }
}
