use anyhow::Result;
use rusqlite::Connection;
use tracing::info;

pub fn run(conn: &Connection) -> Result<()> {
    conn.execute_batch(
        "
        CREATE TABLE IF NOT EXISTS users (
            id          INTEGER PRIMARY KEY AUTOINCREMENT,
            username    TEXT NOT NULL UNIQUE,
            password    TEXT NOT NULL,
            avatar      TEXT NOT NULL DEFAULT '/static/avatars/default.png',
            created_at  TEXT NOT NULL DEFAULT (datetime('now'))
        );

        -- Directed edges: user_id added friend_id.
        CREATE TABLE IF NOT EXISTS friends (
            user_id     INTEGER NOT NULL REFERENCES users(id),
            friend_id   INTEGER NOT NULL REFERENCES users(id),
            created_at  TEXT NOT NULL DEFAULT (datetime('now')),
            UNIQUE(user_id, friend_id)
        );

        CREATE INDEX IF NOT EXISTS idx_friends_user
            ON friends(user_id);
        ",
    )?;

    info!("Database migrations complete");
    Ok(())
}
