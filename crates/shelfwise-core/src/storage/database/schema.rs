use rusqlite::Connection;

use crate::error::Result;

pub const SCHEMA_VERSION: u32 = 2;

pub fn apply_pragmas(conn: &Connection) -> Result<()> {
    conn.execute_batch(
        "
        PRAGMA journal_mode = WAL;
        PRAGMA synchronous = NORMAL;
        PRAGMA foreign_keys = ON;
        ",
    )?;
    Ok(())
}

pub fn create_migrations_table(conn: &Connection) -> Result<()> {
    conn.execute_batch(
        "
        CREATE TABLE IF NOT EXISTS schema_migrations (
            version    INTEGER PRIMARY KEY,
            applied_at TEXT NOT NULL
        );
        ",
    )?;
    Ok(())
}

/// `file_path` is not unique; the importer enforces case-insensitive uniqueness.
pub fn create_book_tables(conn: &Connection) -> Result<()> {
    conn.execute_batch(
        "
        CREATE TABLE IF NOT EXISTS books (
            id                 INTEGER PRIMARY KEY AUTOINCREMENT,
            version            INTEGER NOT NULL DEFAULT 1,
            title              TEXT NOT NULL,
            author             TEXT,
            publisher          TEXT,
            description        TEXT,
            isbn               TEXT,
            publication_year   INTEGER,
            file_path          TEXT NOT NULL,
            file_extensions    TEXT NOT NULL DEFAULT '[]',
            imported_at        TEXT NOT NULL,
            last_opened_at     TEXT,
            is_new             INTEGER NOT NULL DEFAULT 1,
            is_info_incomplete INTEGER NOT NULL DEFAULT 1,
            is_favorite        INTEGER NOT NULL DEFAULT 0,
            tags               TEXT NOT NULL DEFAULT '[]'
        );

        CREATE INDEX IF NOT EXISTS idx_books_file_path ON books(file_path COLLATE NOCASE);
        CREATE INDEX IF NOT EXISTS idx_books_title     ON books(title COLLATE NOCASE);
        ",
    )?;
    Ok(())
}

pub fn create_category_tables(conn: &Connection) -> Result<()> {
    conn.execute_batch(
        "
        CREATE TABLE IF NOT EXISTS categories (
            id        INTEGER PRIMARY KEY AUTOINCREMENT,
            name      TEXT NOT NULL,
            parent_id INTEGER REFERENCES categories(id) ON DELETE RESTRICT
        );

        CREATE TABLE IF NOT EXISTS category_books (
            category_id INTEGER NOT NULL REFERENCES categories(id) ON DELETE CASCADE,
            book_id     INTEGER NOT NULL REFERENCES books(id) ON DELETE CASCADE,
            PRIMARY KEY (category_id, book_id)
        );

        CREATE INDEX IF NOT EXISTS idx_categories_parent ON categories(parent_id);
        ",
    )?;
    Ok(())
}
