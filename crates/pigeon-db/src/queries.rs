use crate::Database;
use crate::models::UserRow;
use anyhow::Result;
use rusqlite::{Connection, ErrorCode};
use tracing::debug;

/// Result of adding a friend by username.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FriendOutcome {
    Added,
    AlreadyFriends,
    NotFound,
    IsSelf,
}

impl FriendOutcome {
    pub fn added(self) -> bool {
        self == FriendOutcome::Added
    }
}

const USER_COLUMNS: &str = "id, username, password, avatar";

impl Database {
    // -- Users --

    /// Insert a new account. Returns `None` if the username is already taken.
    pub fn create_user(&self, username: &str, password_hash: &str) -> Result<Option<i64>> {
        self.with_conn(|conn| {
            match conn.execute(
                "INSERT INTO users (username, password) VALUES (?1, ?2)",
                (username, password_hash),
            ) {
                Ok(_) => Ok(Some(conn.last_insert_rowid())),
                Err(rusqlite::Error::SqliteFailure(e, _))
                    if e.code == ErrorCode::ConstraintViolation =>
                {
                    debug!("Username '{}' already taken", username);
                    Ok(None)
                }
                Err(e) => Err(e.into()),
            }
        })
    }

    pub fn get_user_by_username(&self, username: &str) -> Result<Option<UserRow>> {
        self.with_conn(|conn| query_user(conn, "username", &username))
    }

    pub fn get_user_by_id(&self, id: i64) -> Result<Option<UserRow>> {
        self.with_conn(|conn| query_user(conn, "id", &id))
    }

    /// Replace the stored avatar path. Returns false if the account does not exist.
    pub fn set_avatar(&self, user_id: i64, avatar: &str) -> Result<bool> {
        self.with_conn(|conn| {
            let changed = conn.execute(
                "UPDATE users SET avatar = ?1 WHERE id = ?2",
                rusqlite::params![avatar, user_id],
            )?;
            Ok(changed > 0)
        })
    }

    // -- Friends --

    /// Add a directed edge `user_id -> <account named nickname>`.
    ///
    /// Unknown nicknames and the caller's own name are no-ops. Adding an
    /// existing friend again leaves the relation unchanged.
    pub fn add_friend_by_username(&self, user_id: i64, nickname: &str) -> Result<FriendOutcome> {
        self.with_tx(|conn| {
            let Some(target) = query_user(conn, "username", &nickname)? else {
                return Ok(FriendOutcome::NotFound);
            };
            if target.id == user_id {
                return Ok(FriendOutcome::IsSelf);
            }

            let inserted = conn.execute(
                "INSERT OR IGNORE INTO friends (user_id, friend_id) VALUES (?1, ?2)",
                rusqlite::params![user_id, target.id],
            )?;

            Ok(if inserted > 0 {
                FriendOutcome::Added
            } else {
                FriendOutcome::AlreadyFriends
            })
        })
    }

    /// Accounts this user has added, in the order they were added.
    /// Does not include accounts that only added this user.
    pub fn list_friends(&self, user_id: i64) -> Result<Vec<UserRow>> {
        self.with_conn(|conn| {
            let mut stmt = conn.prepare(
                "SELECT u.id, u.username, u.password, u.avatar
                 FROM friends f
                 JOIN users u ON f.friend_id = u.id
                 WHERE f.user_id = ?1
                 ORDER BY f.rowid",
            )?;

            let rows = stmt
                .query_map([user_id], map_user)?
                .collect::<std::result::Result<Vec<_>, _>>()?;

            Ok(rows)
        })
    }
}

fn query_user(
    conn: &Connection,
    column: &str,
    value: &dyn rusqlite::types::ToSql,
) -> Result<Option<UserRow>> {
    let mut stmt = conn.prepare(&format!(
        "SELECT {} FROM users WHERE {} = ?1",
        USER_COLUMNS, column
    ))?;

    let row = stmt.query_row([value], map_user).optional()?;

    Ok(row)
}

fn map_user(row: &rusqlite::Row<'_>) -> rusqlite::Result<UserRow> {
    Ok(UserRow {
        id: row.get(0)?,
        username: row.get(1)?,
        password: row.get(2)?,
        avatar: row.get(3)?,
    })
}

/// Extension trait for optional query results
trait OptionalExt<T> {
    fn optional(self) -> Result<Option<T>>;
}

impl<T> OptionalExt<T> for std::result::Result<T, rusqlite::Error> {
    fn optional(self) -> Result<Option<T>> {
        match self {
            Ok(val) => Ok(Some(val)),
            Err(rusqlite::Error::QueryReturnedNoRows) => Ok(None),
            Err(e) => Err(e.into()),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pigeon_types::models::DEFAULT_AVATAR;
    use tempfile::TempDir;

    fn open_db() -> (TempDir, Database) {
        let dir = tempfile::tempdir().unwrap();
        let db = Database::open(&dir.path().join("users.db")).unwrap();
        (dir, db)
    }

    fn friend_names(db: &Database, user_id: i64) -> Vec<String> {
        db.list_friends(user_id)
            .unwrap()
            .into_iter()
            .map(|u| u.username)
            .collect()
    }

    #[test]
    fn duplicate_username_is_rejected() {
        let (_dir, db) = open_db();

        let first = db.create_user("alice", "hash-1").unwrap();
        assert!(first.is_some());

        let second = db.create_user("alice", "hash-2").unwrap();
        assert_eq!(second, None);

        let count: i64 = db
            .with_conn(|conn| {
                Ok(conn.query_row(
                    "SELECT COUNT(*) FROM users WHERE username = 'alice'",
                    [],
                    |r| r.get(0),
                )?)
            })
            .unwrap();
        assert_eq!(count, 1);

        // The original password survives.
        let stored = db.get_user_by_username("alice").unwrap().unwrap();
        assert_eq!(stored.password, "hash-1");
    }

    #[test]
    fn new_users_get_default_avatar() {
        let (_dir, db) = open_db();
        let id = db.create_user("bob", "hash").unwrap().unwrap();

        let user = db.get_user_by_id(id).unwrap().unwrap();
        assert_eq!(user.username, "bob");
        assert_eq!(user.avatar, DEFAULT_AVATAR);
    }

    #[test]
    fn set_avatar_replaces_path() {
        let (_dir, db) = open_db();
        let id = db.create_user("carol", "hash").unwrap().unwrap();

        assert!(db.set_avatar(id, "/static/avatars/av_1_me.png").unwrap());
        let user = db.get_user_by_id(id).unwrap().unwrap();
        assert_eq!(user.avatar, "/static/avatars/av_1_me.png");

        assert!(!db.set_avatar(id + 100, "/static/avatars/x.png").unwrap());
    }

    #[test]
    fn friend_edges_are_directed() {
        let (_dir, db) = open_db();
        let a = db.create_user("a", "hash").unwrap().unwrap();
        let b = db.create_user("b", "hash").unwrap().unwrap();

        assert_eq!(db.add_friend_by_username(a, "b").unwrap(), FriendOutcome::Added);

        assert_eq!(friend_names(&db, a), vec!["b"]);
        assert!(friend_names(&db, b).is_empty());

        assert_eq!(db.add_friend_by_username(b, "a").unwrap(), FriendOutcome::Added);
        assert_eq!(friend_names(&db, b), vec!["a"]);
    }

    #[test]
    fn add_friend_ignores_unknown_and_self() {
        let (_dir, db) = open_db();
        let a = db.create_user("a", "hash").unwrap().unwrap();

        assert_eq!(db.add_friend_by_username(a, "ghost").unwrap(), FriendOutcome::NotFound);
        assert_eq!(db.add_friend_by_username(a, "a").unwrap(), FriendOutcome::IsSelf);
        assert!(friend_names(&db, a).is_empty());
    }

    #[test]
    fn repeated_add_friend_keeps_single_edge() {
        let (_dir, db) = open_db();
        let a = db.create_user("a", "hash").unwrap().unwrap();
        db.create_user("b", "hash").unwrap().unwrap();

        assert!(db.add_friend_by_username(a, "b").unwrap().added());
        assert_eq!(
            db.add_friend_by_username(a, "b").unwrap(),
            FriendOutcome::AlreadyFriends
        );
        assert_eq!(friend_names(&db, a), vec!["b"]);
    }

    #[test]
    fn friends_listed_in_insertion_order() {
        let (_dir, db) = open_db();
        let a = db.create_user("a", "hash").unwrap().unwrap();
        for name in ["zed", "mia", "kim"] {
            db.create_user(name, "hash").unwrap().unwrap();
        }
        for name in ["zed", "mia", "kim"] {
            db.add_friend_by_username(a, name).unwrap();
        }

        assert_eq!(friend_names(&db, a), vec!["zed", "mia", "kim"]);
    }

    #[test]
    fn open_creates_missing_parent_dirs() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("data").join("nested").join("users.db");

        let db = Database::open(&path).unwrap();
        db.create_user("erin", "hash").unwrap().unwrap();
        assert!(path.exists());
    }

    #[test]
    fn failed_transaction_leaves_no_trace() {
        let (_dir, db) = open_db();
        let a = db.create_user("a", "hash").unwrap().unwrap();
        let b = db.create_user("b", "hash").unwrap().unwrap();

        let result: Result<()> = db.with_tx(|conn| {
            conn.execute(
                "INSERT INTO friends (user_id, friend_id) VALUES (?1, ?2)",
                rusqlite::params![a, b],
            )?;
            anyhow::bail!("abort after insert")
        });
        assert!(result.is_err());
        assert!(friend_names(&db, a).is_empty());
    }

    #[test]
    fn reopening_keeps_accounts() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("users.db");
        {
            let db = Database::open(&path).unwrap();
            db.create_user("dave", "hash").unwrap().unwrap();
        }

        let db = Database::open(&path).unwrap();
        assert!(db.get_user_by_username("dave").unwrap().is_some());
        assert_eq!(db.create_user("dave", "hash").unwrap(), None);
    }
}
