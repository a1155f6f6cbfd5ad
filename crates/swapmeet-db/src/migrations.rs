use anyhow::Result;
use rusqlite::Connection;
use tracing::info;

pub fn run(conn: &Connection) -> Result<()> {
    conn.execute_batch(
        "
        CREATE TABLE IF NOT EXISTS users (
            id          TEXT PRIMARY KEY,
            username    TEXT NOT NULL UNIQUE,
            email       TEXT NOT NULL UNIQUE,
            password    TEXT NOT NULL,
            created_at  TEXT NOT NULL DEFAULT (datetime('now'))
        );

        CREATE TABLE IF NOT EXISTS products (
            id          TEXT PRIMARY KEY,
            title       TEXT NOT NULL,
            description TEXT NOT NULL,
            category    TEXT NOT NULL,
            condition   TEXT NOT NULL
                CHECK (condition IN ('New', 'Like New', 'Good', 'Fair', 'Poor')),
            price       REAL NOT NULL DEFAULT 0 CHECK (price >= 0),
            image_url   TEXT NOT NULL,
            owner_id    TEXT NOT NULL REFERENCES users(id),
            status      TEXT NOT NULL DEFAULT 'available'
                CHECK (status IN ('available', 'traded', 'reserved')),
            created_at  TEXT NOT NULL
        );

        CREATE INDEX IF NOT EXISTS idx_products_created
            ON products(created_at);
        ",
    )?;

    info!("Database migrations complete");
    Ok(())
}
