mod connection;
mod migrations;
mod schema;

pub use connection::ConnectionPool;
pub use migrations::{Migration, get_applied_versions, run_migrations};
pub use schema::SCHEMA_VERSION;

use std::path::Path;

use tracing::debug;

use crate::error::{Result, ShelfError};
use crate::models::{BookId, BookRecord, BookView, Category, CategoryId};

use super::repositories::{
    BookRepository, CategoryRepository, Repository, SqliteBookRepository, SqliteCategoryRepository,
};

pub fn open_database(path: &Path) -> Result<ConnectionPool> {
    if let Some(parent) = path.parent() {
        if !parent.as_os_str().is_empty() {
            std::fs::create_dir_all(parent)?;
        }
    }

    let pool = ConnectionPool::open(path)?;
    {
        let conn = pool.get_connection();
        migrations::run_migrations(&conn)?;
    }
    debug!("opened catalog at {}", path.display());
    Ok(pool)
}

pub fn open_in_memory() -> Result<ConnectionPool> {
    let pool = ConnectionPool::open_in_memory()?;
    {
        let conn = pool.get_connection();
        migrations::run_migrations(&conn)?;
    }
    Ok(pool)
}

/// Catalog handle. Repositories borrow the single connection, so hold at most
/// one of them at a time.
pub struct Database {
    pool: ConnectionPool,
}

impl Database {
    pub fn open(path: &Path) -> Result<Self> {
        let pool = open_database(path)?;
        Ok(Self { pool })
    }

    pub fn open_in_memory() -> Result<Self> {
        let pool = open_in_memory()?;
        Ok(Self { pool })
    }

    pub fn path(&self) -> Option<&str> {
        self.pool.path()
    }

    pub fn books(&self) -> SqliteBookRepository<'_> {
        SqliteBookRepository::new(self.pool.get_connection())
    }

    pub fn categories(&self) -> SqliteCategoryRepository<'_> {
        SqliteCategoryRepository::new(self.pool.get_connection())
    }

    // ─── Books ──────────────────────────────────────────────

    pub fn get_book(&self, id: BookId) -> Result<BookRecord> {
        self.books()
            .find_by_id(&id)?
            .ok_or_else(|| ShelfError::BookNotFound(id.to_string()))
    }

    pub fn list_books(&self, view: BookView) -> Result<Vec<BookRecord>> {
        self.books().list_view(view)
    }

    pub fn search_books(&self, query: &str) -> Result<Vec<BookRecord>> {
        self.books().search(query)
    }

    /// Persist `record` and fail with `Conflict` when another writer got there first.
    pub fn update_book(&self, record: &BookRecord) -> Result<()> {
        if self.books().update(record)? {
            Ok(())
        } else {
            Err(ShelfError::Conflict(format!(
                "book #{} was changed or removed by another writer",
                record.id.unwrap_or_default()
            )))
        }
    }

    pub fn delete_book(&self, id: BookId) -> Result<()> {
        if !self.books().delete(&id)? {
            return Err(ShelfError::BookNotFound(id.to_string()));
        }
        Ok(())
    }

    // ─── Categories ─────────────────────────────────────────

    pub fn get_category(&self, id: CategoryId) -> Result<Category> {
        self.categories()
            .find_by_id(&id)?
            .ok_or_else(|| ShelfError::CategoryNotFound(id.to_string()))
    }

    pub fn delete_category(&self, id: CategoryId) -> Result<()> {
        if !self.categories().delete(&id)? {
            return Err(ShelfError::CategoryNotFound(id.to_string()));
        }
        Ok(())
    }

    pub fn books_in_category(&self, id: CategoryId) -> Result<Vec<BookRecord>> {
        self.categories().books_in(id)
    }
}
