use anyhow::Result;
use rusqlite::Connection;
use tracing::info;

pub fn run(conn: &Connection) -> Result<()> {
    conn.execute_batch(
        "
        CREATE TABLE IF NOT EXISTS users (
            id              TEXT PRIMARY KEY,
            firebase_uid    TEXT UNIQUE,
            username        TEXT NOT NULL UNIQUE,
            email           TEXT NOT NULL DEFAULT '',
            first_name      TEXT NOT NULL DEFAULT '',
            last_name       TEXT NOT NULL DEFAULT '',
            profile_image   TEXT NOT NULL DEFAULT '',
            phone_number    TEXT NOT NULL DEFAULT '',
            location        TEXT NOT NULL DEFAULT '',
            created_at      TEXT NOT NULL DEFAULT (datetime('now')),
            updated_at      TEXT NOT NULL DEFAULT (datetime('now'))
        );

        -- Legacy listing table, read-only from the API
        CREATE TABLE IF NOT EXISTS items (
            id              TEXT PRIMARY KEY,
            title           TEXT NOT NULL,
            location        TEXT NOT NULL,
            image           TEXT NOT NULL DEFAULT '',
            wanted_items    TEXT NOT NULL DEFAULT '',
            created_at      TEXT NOT NULL DEFAULT (datetime('now'))
        );

        CREATE TABLE IF NOT EXISTS products (
            id              TEXT PRIMARY KEY,
            owner_id        TEXT NOT NULL REFERENCES users(id),
            title           TEXT NOT NULL,
            description     TEXT NOT NULL DEFAULT '',
            category        TEXT NOT NULL,
            image           TEXT NOT NULL DEFAULT '',
            wanted_items    TEXT NOT NULL DEFAULT '',
            location        TEXT NOT NULL DEFAULT '',
            status          TEXT NOT NULL DEFAULT 'available',
            can_sell        INTEGER NOT NULL DEFAULT 0,
            likes_count     INTEGER NOT NULL DEFAULT 0,
            created_at      TEXT NOT NULL DEFAULT (datetime('now')),
            updated_at      TEXT NOT NULL DEFAULT (datetime('now'))
        );

        CREATE INDEX IF NOT EXISTS idx_products_owner
            ON products(owner_id, created_at);
        CREATE INDEX IF NOT EXISTS idx_products_status
            ON products(status, created_at);

        -- One like per (user, product); the toggle relies on this constraint
        CREATE TABLE IF NOT EXISTS product_likes (
            id          TEXT PRIMARY KEY,
            user_id     TEXT NOT NULL REFERENCES users(id),
            product_id  TEXT NOT NULL REFERENCES products(id) ON DELETE CASCADE,
            created_at  TEXT NOT NULL DEFAULT (datetime('now')),
            UNIQUE(user_id, product_id)
        );

        -- starter_id is the non-owner participant; the unique pair makes
        -- find-or-create safe under concurrent requests
        CREATE TABLE IF NOT EXISTS chat_rooms (
            id          TEXT PRIMARY KEY,
            product_id  TEXT REFERENCES products(id) ON DELETE SET NULL,
            starter_id  TEXT NOT NULL REFERENCES users(id),
            created_at  TEXT NOT NULL DEFAULT (datetime('now')),
            updated_at  TEXT NOT NULL DEFAULT (datetime('now')),
            UNIQUE(product_id, starter_id)
        );

        CREATE TABLE IF NOT EXISTS chat_participants (
            room_id     TEXT NOT NULL REFERENCES chat_rooms(id),
            user_id     TEXT NOT NULL REFERENCES users(id),
            PRIMARY KEY (room_id, user_id)
        );

        CREATE INDEX IF NOT EXISTS idx_participants_user
            ON chat_participants(user_id);

        CREATE TABLE IF NOT EXISTS messages (
            id              TEXT PRIMARY KEY,
            chat_room_id    TEXT NOT NULL REFERENCES chat_rooms(id),
            sender_id       TEXT NOT NULL REFERENCES users(id),
            content         TEXT NOT NULL,
            is_read         INTEGER NOT NULL DEFAULT 0,
            created_at      TEXT NOT NULL DEFAULT (datetime('now'))
        );

        CREATE INDEX IF NOT EXISTS idx_messages_room
            ON messages(chat_room_id, created_at);
        ",
    )?;

    info!("Database migrations complete");
    Ok(())
}
