use anyhow::Result;
use rusqlite::Connection;
use tracing::info;

pub fn run(conn: &Connection) -> Result<()> {
    conn.execute_batch(
        "
        CREATE TABLE IF NOT EXISTS users (
            id            TEXT PRIMARY KEY,
            username      TEXT NOT NULL UNIQUE,
            password      TEXT NOT NULL,
            display_name  TEXT NOT NULL,
            avatar        TEXT,
            created_at    TEXT NOT NULL
        );

        CREATE TABLE IF NOT EXISTS habits (
            id           TEXT PRIMARY KEY,
            owner_id     TEXT NOT NULL REFERENCES users(id) ON DELETE CASCADE,
            title        TEXT NOT NULL,
            description  TEXT,
            active       INTEGER NOT NULL DEFAULT 1,
            created_at   TEXT NOT NULL
        );

        CREATE INDEX IF NOT EXISTS idx_habits_owner
            ON habits(owner_id);

        -- One completion per habit per calendar day; the toggle relies on it.
        CREATE TABLE IF NOT EXISTS completions (
            id            TEXT PRIMARY KEY,
            habit_id      TEXT NOT NULL REFERENCES habits(id) ON DELETE CASCADE,
            user_id       TEXT NOT NULL REFERENCES users(id) ON DELETE CASCADE,
            date          TEXT NOT NULL,
            completed_at  TEXT NOT NULL,
            UNIQUE(habit_id, date)
        );

        CREATE INDEX IF NOT EXISTS idx_completions_user_date
            ON completions(user_id, date);

        CREATE TABLE IF NOT EXISTS follows (
            follower_id   TEXT NOT NULL REFERENCES users(id) ON DELETE CASCADE,
            following_id  TEXT NOT NULL REFERENCES users(id) ON DELETE CASCADE,
            created_at    TEXT NOT NULL,
            PRIMARY KEY (follower_id, following_id)
        );

        CREATE INDEX IF NOT EXISTS idx_follows_following
            ON follows(following_id);

        CREATE TABLE IF NOT EXISTS supports (
            from_user_id   TEXT NOT NULL REFERENCES users(id) ON DELETE CASCADE,
            completion_id  TEXT NOT NULL REFERENCES completions(id) ON DELETE CASCADE,
            created_at     TEXT NOT NULL,
            PRIMARY KEY (from_user_id, completion_id)
        );
        ",
    )?;

    info!("Database migrations complete");
    Ok(())
}
