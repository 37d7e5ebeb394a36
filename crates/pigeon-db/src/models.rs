use pigeon_types::models::User;

/// Database row types — these map directly to SQLite rows.
/// Distinct from pigeon-types API models to keep the DB layer independent.
pub struct UserRow {
    pub id: i64,
    pub username: String,
    /// Argon2 PHC string.
    pub password: String,
    pub avatar: String,
}

impl From<UserRow> for User {
    fn from(row: UserRow) -> Self {
        User {
            id: row.id,
            username: row.username,
            avatar: row.avatar,
        }
    }
}
