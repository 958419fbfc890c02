use anyhow::Result;
use rusqlite::Connection;
use tracing::info;

pub fn run(conn: &Connection) -> Result<()> {
    conn.execute_batch("CREATE TABLE IF NOT EXISTS schema_version (version INTEGER NOT NULL);")?;

    let version: i64 =
        conn.query_row("SELECT COALESCE(MAX(version), 0) FROM schema_version", [], |r| r.get(0))?;

    if version < 1 {
        info!("Running migration v1 (initial schema)");
        conn.execute_batch(
            "
            BEGIN;

            CREATE TABLE users (
                id          INTEGER PRIMARY KEY AUTOINCREMENT,
                username    TEXT NOT NULL UNIQUE,
                password    TEXT NOT NULL,
                first_name  TEXT NOT NULL DEFAULT '',
                last_name   TEXT NOT NULL DEFAULT '',
                is_staff    INTEGER NOT NULL DEFAULT 0,
                date_joined TEXT NOT NULL
            );

            CREATE TABLE chapters (
                id          INTEGER PRIMARY KEY AUTOINCREMENT,
                name        TEXT NOT NULL,
                description TEXT NOT NULL DEFAULT ''
            );

            CREATE TABLE categories (
                id          INTEGER PRIMARY KEY AUTOINCREMENT,
                chapter_id  INTEGER NOT NULL REFERENCES chapters(id) ON DELETE CASCADE,
                name        TEXT NOT NULL,
                description TEXT NOT NULL DEFAULT ''
            );

            CREATE INDEX idx_categories_chapter ON categories(chapter_id);

            -- Users who own themes or messages cannot be deleted.
            CREATE TABLE themes (
                id          INTEGER PRIMARY KEY AUTOINCREMENT,
                category_id INTEGER NOT NULL REFERENCES categories(id) ON DELETE CASCADE,
                name        TEXT NOT NULL,
                status      INTEGER NOT NULL DEFAULT 1,
                user_id     INTEGER NOT NULL REFERENCES users(id) ON DELETE RESTRICT,
                created_at  TEXT NOT NULL
            );

            CREATE INDEX idx_themes_category ON themes(category_id, created_at);
            CREATE INDEX idx_themes_user ON themes(user_id);

            CREATE TABLE messages (
                id          INTEGER PRIMARY KEY AUTOINCREMENT,
                user_id     INTEGER NOT NULL REFERENCES users(id) ON DELETE RESTRICT,
                theme_id    INTEGER NOT NULL REFERENCES themes(id) ON DELETE CASCADE,
                content     TEXT NOT NULL,
                created_at  TEXT NOT NULL,
                updated_at  TEXT NOT NULL
            );

            CREATE INDEX idx_messages_theme ON messages(theme_id, created_at);
            CREATE INDEX idx_messages_user ON messages(user_id);

            -- No UNIQUE(user_id, message_id): repeated likes are kept as separate rows.
            CREATE TABLE message_relations (
                id          INTEGER PRIMARY KEY AUTOINCREMENT,
                user_id     INTEGER NOT NULL REFERENCES users(id) ON DELETE CASCADE,
                message_id  INTEGER NOT NULL REFERENCES messages(id) ON DELETE CASCADE,
                liked       INTEGER NOT NULL DEFAULT 0
            );

            CREATE INDEX idx_relations_message ON message_relations(message_id);

            INSERT INTO schema_version (version) VALUES (1);

            COMMIT;
            ",
        )?;
    }

    if version < 2 {
        info!("Running migration v2 (token revocation)");
        conn.execute_batch(
            "
            BEGIN;

            -- Bumped on logout; tokens carry the value they were issued with.
            ALTER TABLE users ADD COLUMN token_version INTEGER NOT NULL DEFAULT 0;

            INSERT INTO schema_version (version) VALUES (2);

            COMMIT;
            ",
        )?;
    }

    info!("Database migrations complete");
    Ok(())
}
