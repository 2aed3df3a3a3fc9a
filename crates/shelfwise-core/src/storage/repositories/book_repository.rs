use std::sync::MutexGuard;

use chrono::{DateTime, Utc};
use rusqlite::types::Type;
use rusqlite::{Connection, OptionalExtension, params};
use tracing::{debug, warn};

use crate::error::{Result, ShelfError};
use crate::models::{BookId, BookRecord, BookView};

use super::Repository;

pub trait BookRepository: Repository<Entity = BookRecord, Id = BookId> {
    fn list_all(&self) -> Result<Vec<BookRecord>>;

    /// Insert a new record and return the id assigned to it. Any id already
    /// present on `record` is ignored.
    fn add(&self, record: &BookRecord) -> Result<BookId>;

    /// Write `record` back if its version still matches the stored one.
    /// Returns `false` when another writer updated or removed it first.
    fn update(&self, record: &BookRecord) -> Result<bool>;

    fn list_all_file_paths(&self) -> Result<Vec<String>>;

    /// Case-insensitive substring match over title, author and description.
    /// A blank query returns everything.
    fn search(&self, query: &str) -> Result<Vec<BookRecord>>;

    fn list_view(&self, view: BookView) -> Result<Vec<BookRecord>> {
        Ok(view.apply(self.list_all()?))
    }
}

pub(crate) const BOOK_COLUMNS: &str =
    "b.id, b.version, b.title, b.author, b.publisher, b.description,
     b.isbn, b.publication_year, b.file_path, b.file_extensions, b.imported_at,
     b.last_opened_at, b.is_new, b.is_info_incomplete, b.is_favorite, b.tags";

pub struct SqliteBookRepository<'a> {
    conn: MutexGuard<'a, Connection>,
}

impl<'a> SqliteBookRepository<'a> {
    pub fn new(conn: MutexGuard<'a, Connection>) -> Self {
        Self { conn }
    }

    pub fn count(&self) -> Result<usize> {
        let count: i64 = self
            .conn
            .query_row("SELECT COUNT(*) FROM books", [], |row| row.get(0))?;
        Ok(count as usize)
    }

    pub(crate) fn row_to_record(row: &rusqlite::Row) -> rusqlite::Result<BookRecord> {
        let extensions_str: String = row.get(9)?;
        let tags_str: String = row.get(15)?;

        Ok(BookRecord {
            id: Some(row.get(0)?),
            version: row.get(1)?,
            title: row.get(2)?,
            author: row.get(3)?,
            publisher: row.get(4)?,
            description: row.get(5)?,
            isbn: row.get(6)?,
            publication_year: row.get(7)?,
            file_path: row.get(8)?,
            file_extensions: serde_json::from_str(&extensions_str).unwrap_or_default(),
            imported_at: parse_timestamp(10, &row.get::<_, String>(10)?)?,
            last_opened_at: row
                .get::<_, Option<String>>(11)?
                .map(|s| parse_timestamp(11, &s))
                .transpose()?,
            is_new: row.get(12)?,
            is_info_incomplete: row.get(13)?,
            is_favorite: row.get(14)?,
            tags: serde_json::from_str(&tags_str).unwrap_or_default(),
        })
    }

    fn query_records(&self, sql: &str, params: impl rusqlite::Params) -> Result<Vec<BookRecord>> {
        let mut stmt = self.conn.prepare(sql)?;
        let rows = stmt.query_map(params, Self::row_to_record)?;
        rows.collect::<std::result::Result<Vec<_>, _>>().map_err(Into::into)
    }
}

fn parse_timestamp(idx: usize, raw: &str) -> rusqlite::Result<DateTime<Utc>> {
    DateTime::parse_from_rfc3339(raw)
        .map(|dt| dt.with_timezone(&Utc))
        .map_err(|e| rusqlite::Error::FromSqlConversionFailure(idx, Type::Text, Box::new(e)))
}

fn escape_like(query: &str) -> String {
    let mut escaped = String::with_capacity(query.len());
    for c in query.chars() {
        if matches!(c, '\\' | '%' | '_') {
            escaped.push('\\');
        }
        escaped.push(c);
    }
    escaped
}

fn validate(record: &BookRecord) -> Result<()> {
    if record.title.trim().is_empty() {
        return Err(ShelfError::Validation(format!(
            "book title must not be blank ({})",
            record.file_path
        )));
    }
    Ok(())
}

impl<'a> Repository for SqliteBookRepository<'a> {
    type Entity = BookRecord;
    type Id = BookId;

    fn find_by_id(&self, id: &Self::Id) -> Result<Option<Self::Entity>> {
        let sql = format!("SELECT {BOOK_COLUMNS} FROM books b WHERE b.id = ?1");
        let record = self
            .conn
            .query_row(&sql, params![id], Self::row_to_record)
            .optional()?;
        Ok(record)
    }

    /// Upsert that bypasses the version check. Records without an id are inserted.
    fn save(&self, record: &Self::Entity) -> Result<()> {
        let Some(id) = record.id else {
            self.add(record)?;
            return Ok(());
        };
        validate(record)?;

        self.conn.execute(
            "INSERT INTO books
                (id, version, title, author, publisher, description, isbn, publication_year,
                 file_path, file_extensions, imported_at, last_opened_at,
                 is_new, is_info_incomplete, is_favorite, tags)
             VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10, ?11, ?12, ?13, ?14, ?15, ?16)
             ON CONFLICT(id) DO UPDATE SET
                version = excluded.version, title = excluded.title, author = excluded.author,
                publisher = excluded.publisher, description = excluded.description,
                isbn = excluded.isbn, publication_year = excluded.publication_year,
                file_path = excluded.file_path, file_extensions = excluded.file_extensions,
                imported_at = excluded.imported_at, last_opened_at = excluded.last_opened_at,
                is_new = excluded.is_new, is_info_incomplete = excluded.is_info_incomplete,
                is_favorite = excluded.is_favorite, tags = excluded.tags",
            params![
                id,
                record.version,
                record.title,
                record.author,
                record.publisher,
                record.description,
                record.isbn,
                record.publication_year,
                record.file_path,
                serde_json::to_string(&record.file_extensions)?,
                record.imported_at.to_rfc3339(),
                record.last_opened_at.map(|t| t.to_rfc3339()),
                record.is_new,
                record.is_info_incomplete,
                record.is_favorite,
                serde_json::to_string(&record.tags)?,
            ],
        )?;
        Ok(())
    }

    fn delete(&self, id: &Self::Id) -> Result<bool> {
        let affected = self.conn.execute("DELETE FROM books WHERE id = ?1", params![id])?;
        Ok(affected > 0)
    }
}

impl<'a> BookRepository for SqliteBookRepository<'a> {
    fn list_all(&self) -> Result<Vec<BookRecord>> {
        let sql = format!("SELECT {BOOK_COLUMNS} FROM books b ORDER BY b.id");
        self.query_records(&sql, [])
    }

    fn add(&self, record: &BookRecord) -> Result<BookId> {
        validate(record)?;

        self.conn.execute(
            "INSERT INTO books
                (version, title, author, publisher, description, isbn, publication_year,
                 file_path, file_extensions, imported_at, last_opened_at,
                 is_new, is_info_incomplete, is_favorite, tags)
             VALUES (1, ?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10, ?11, ?12, ?13, ?14)",
            params![
                record.title,
                record.author,
                record.publisher,
                record.description,
                record.isbn,
                record.publication_year,
                record.file_path,
                serde_json::to_string(&record.file_extensions)?,
                record.imported_at.to_rfc3339(),
                record.last_opened_at.map(|t| t.to_rfc3339()),
                record.is_new,
                record.is_info_incomplete,
                record.is_favorite,
                serde_json::to_string(&record.tags)?,
            ],
        )?;

        let id = self.conn.last_insert_rowid();
        debug!("inserted book #{id}: {}", record.title);
        Ok(id)
    }

    fn update(&self, record: &BookRecord) -> Result<bool> {
        let id = record.id.ok_or_else(|| {
            ShelfError::Validation(format!("cannot update unsaved book '{}'", record.title))
        })?;
        validate(record)?;

        let affected = self.conn.execute(
            "UPDATE books SET
                version = version + 1,
                title = ?3, author = ?4, publisher = ?5, description = ?6,
                isbn = ?7, publication_year = ?8, file_path = ?9, file_extensions = ?10,
                last_opened_at = ?11, is_new = ?12, is_info_incomplete = ?13,
                is_favorite = ?14, tags = ?15
             WHERE id = ?1 AND version = ?2",
            params![
                id,
                record.version,
                record.title,
                record.author,
                record.publisher,
                record.description,
                record.isbn,
                record.publication_year,
                record.file_path,
                serde_json::to_string(&record.file_extensions)?,
                record.last_opened_at.map(|t| t.to_rfc3339()),
                record.is_new,
                record.is_info_incomplete,
                record.is_favorite,
                serde_json::to_string(&record.tags)?,
            ],
        )?;

        if affected == 0 {
            warn!(
                "book #{id} not updated: stored version differs from {} or row is gone",
                record.version
            );
            return Ok(false);
        }
        Ok(true)
    }

    fn list_all_file_paths(&self) -> Result<Vec<String>> {
        let mut stmt = self.conn.prepare("SELECT file_path FROM books")?;
        let rows = stmt.query_map([], |row| row.get::<_, String>(0))?;
        rows.collect::<std::result::Result<Vec<_>, _>>().map_err(Into::into)
    }

    fn search(&self, query: &str) -> Result<Vec<BookRecord>> {
        let query = query.trim();
        if query.is_empty() {
            return self.list_all();
        }

        let pattern = format!("%{}%", escape_like(&query.to_lowercase()));
        let sql = format!(
            "SELECT {BOOK_COLUMNS} FROM books b
             WHERE lower(b.title) LIKE ?1 ESCAPE '\\'
                OR lower(coalesce(b.author, '')) LIKE ?1 ESCAPE '\\'
                OR lower(coalesce(b.description, '')) LIKE ?1 ESCAPE '\\'
             ORDER BY b.id"
        );
        self.query_records(&sql, params![pattern])
    }
}
