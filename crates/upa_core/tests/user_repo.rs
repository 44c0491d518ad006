use rusqlite::Connection;
use upa_core::db::open_db_in_memory;
use upa_core::repo::user_repo::{NewUserRow, UserChanges};
use upa_core::{RepoError, SqliteUserRepository, UserRepository};

fn row(name: &str, login: &str) -> NewUserRow {
    NewUserRow {
        name: name.to_string(),
        login: login.to_string(),
        role: None,
        credential_hash: format!("hash-of-{login}"),
    }
}

fn stored_hash(conn: &Connection, id: i64) -> String {
    conn.query_row(
        "SELECT credential_hash FROM users WHERE id = ?1",
        [id],
        |row| row.get(0),
    )
    .unwrap()
}

#[test]
fn insert_and_get_roundtrip() {
    let conn = open_db_in_memory().unwrap();
    let repo = SqliteUserRepository::new(&conn);

    let mut new_row = row("Ana Silva", "ana.silva");
    new_row.role = Some("admin".to_string());
    let id = repo.insert_user(&new_row).unwrap();

    let loaded = repo.get_user(id).unwrap().unwrap();
    assert_eq!(loaded.id, id);
    assert_eq!(loaded.name, "Ana Silva");
    assert_eq!(loaded.login, "ana.silva");
    assert_eq!(loaded.role.as_deref(), Some("admin"));
    assert!(loaded.created_at.unwrap() > 0);
}

#[test]
fn list_returns_newest_first() {
    let conn = open_db_in_memory().unwrap();
    let repo = SqliteUserRepository::new(&conn);

    let first = repo.insert_user(&row("Ana Silva", "ana.silva")).unwrap();
    let second = repo.insert_user(&row("Joao Souza", "joao")).unwrap();

    let ids = repo
        .list_users()
        .unwrap()
        .into_iter()
        .map(|user| user.id)
        .collect::<Vec<_>>();
    assert_eq!(ids, vec![second, first]);
}

#[test]
fn login_uniqueness_ignores_case() {
    let conn = open_db_in_memory().unwrap();
    let repo = SqliteUserRepository::new(&conn);

    repo.insert_user(&row("Ana Silva", "ana.silva")).unwrap();
    let err = repo.insert_user(&row("Other Ana", "ANA.SILVA")).unwrap_err();
    assert!(matches!(err, RepoError::LoginTaken(login) if login == "ANA.SILVA"));

    let found = repo.find_by_login(" Ana.Silva ").unwrap().unwrap();
    assert_eq!(found.name, "Ana Silva");
    assert!(repo.find_by_login("nobody").unwrap().is_none());
}

#[test]
fn update_replaces_fields_and_keeps_hash_when_absent() {
    let conn = open_db_in_memory().unwrap();
    let repo = SqliteUserRepository::new(&conn);
    let id = repo.insert_user(&row("Ana Silva", "ana.silva")).unwrap();

    repo.update_user(&UserChanges {
        id,
        name: "Ana Maria Silva".to_string(),
        login: "ana.maria".to_string(),
        role: Some("staff".to_string()),
        credential_hash: None,
    })
    .unwrap();

    let loaded = repo.get_user(id).unwrap().unwrap();
    assert_eq!(loaded.name, "Ana Maria Silva");
    assert_eq!(loaded.login, "ana.maria");
    assert_eq!(loaded.role.as_deref(), Some("staff"));
    assert_eq!(stored_hash(&conn, id), "hash-of-ana.silva");

    repo.update_user(&UserChanges {
        id,
        name: "Ana Maria Silva".to_string(),
        login: "ana.maria".to_string(),
        role: None,
        credential_hash: Some("rotated".to_string()),
    })
    .unwrap();
    assert_eq!(stored_hash(&conn, id), "rotated");
}

#[test]
fn update_into_taken_login_is_rejected() {
    let conn = open_db_in_memory().unwrap();
    let repo = SqliteUserRepository::new(&conn);
    repo.insert_user(&row("Ana Silva", "ana.silva")).unwrap();
    let joao = repo.insert_user(&row("Joao Souza", "joao")).unwrap();

    let err = repo
        .update_user(&UserChanges {
            id: joao,
            name: "Joao Souza".to_string(),
            login: "ana.silva".to_string(),
            role: None,
            credential_hash: None,
        })
        .unwrap_err();
    assert!(matches!(err, RepoError::LoginTaken(_)));
    assert_eq!(repo.get_user(joao).unwrap().unwrap().login, "joao");
}

#[test]
fn unknown_ids_fail_instead_of_silently_succeeding() {
    let conn = open_db_in_memory().unwrap();
    let repo = SqliteUserRepository::new(&conn);

    let update_err = repo
        .update_user(&UserChanges {
            id: 42,
            name: "Ghost".to_string(),
            login: "ghost".to_string(),
            role: None,
            credential_hash: None,
        })
        .unwrap_err();
    assert!(matches!(update_err, RepoError::NotFound(42)));

    let delete_err = repo.delete_user(42).unwrap_err();
    assert!(matches!(delete_err, RepoError::NotFound(42)));
}

#[test]
fn delete_removes_the_row() {
    let conn = open_db_in_memory().unwrap();
    let repo = SqliteUserRepository::new(&conn);
    let id = repo.insert_user(&row("Ana Silva", "ana.silva")).unwrap();

    repo.delete_user(id).unwrap();
    assert!(repo.get_user(id).unwrap().is_none());
    assert!(repo.list_users().unwrap().is_empty());
}

#[test]
fn invalid_persisted_rows_are_rejected() {
    let conn = open_db_in_memory().unwrap();
    conn.execute(
        "INSERT INTO users (name, login, credential_hash) VALUES ('Broken', '   ', 'x');",
        [],
    )
    .unwrap();
    let repo = SqliteUserRepository::new(&conn);

    let err = repo.list_users().unwrap_err();
    assert!(matches!(err, RepoError::InvalidData(_)));
}
