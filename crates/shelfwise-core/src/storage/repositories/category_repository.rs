use std::sync::MutexGuard;

use rusqlite::{Connection, params};
use tracing::{debug, info};

use crate::error::{Result, ShelfError};
use crate::models::{BookId, BookRecord, Category, CategoryId, DEFAULT_CATEGORY_NAME};

use super::Repository;
use super::book_repository::{BOOK_COLUMNS, SqliteBookRepository};

pub trait CategoryRepository: Repository<Entity = Category, Id = CategoryId> {
    /// Create a category under `parent_id`, or at the root when `None`.
    fn create(&self, name: &str, parent_id: Option<CategoryId>) -> Result<Category>;
    fn list_all(&self) -> Result<Vec<Category>>;
    fn list_roots(&self) -> Result<Vec<Category>>;
    fn list_children(&self, parent_id: CategoryId) -> Result<Vec<Category>>;
    /// Returns `None` when the category does not exist.
    fn rename(&self, id: CategoryId, new_name: &str) -> Result<Option<Category>>;
    fn get_or_create_default(&self) -> Result<Category>;
    /// Replace the category's book membership with `book_ids`.
    fn assign_books(&self, id: CategoryId, book_ids: &[BookId]) -> Result<Category>;
    fn books_in(&self, id: CategoryId) -> Result<Vec<BookRecord>>;
}

pub struct SqliteCategoryRepository<'a> {
    conn: MutexGuard<'a, Connection>,
}

impl<'a> SqliteCategoryRepository<'a> {
    pub fn new(conn: MutexGuard<'a, Connection>) -> Self {
        Self { conn }
    }

    fn book_ids_of(&self, id: CategoryId) -> Result<Vec<BookId>> {
        let mut stmt = self
            .conn
            .prepare("SELECT book_id FROM category_books WHERE category_id = ?1 ORDER BY book_id")?;
        let rows = stmt.query_map(params![id], |row| row.get::<_, BookId>(0))?;
        rows.collect::<std::result::Result<Vec<_>, _>>().map_err(Into::into)
    }

    fn query_categories(&self, sql: &str, params: impl rusqlite::Params) -> Result<Vec<Category>> {
        let mut stmt = self.conn.prepare(sql)?;
        let rows = stmt.query_map(params, |row| {
            Ok(Category {
                id: row.get(0)?,
                name: row.get(1)?,
                parent_id: row.get(2)?,
                book_ids: Vec::new(),
            })
        })?;
        let mut categories = rows.collect::<std::result::Result<Vec<_>, _>>()?;
        for category in &mut categories {
            category.book_ids = self.book_ids_of(category.id)?;
        }
        Ok(categories)
    }

    fn require(&self, id: CategoryId) -> Result<Category> {
        self.find_by_id(&id)?
            .ok_or_else(|| ShelfError::CategoryNotFound(id.to_string()))
    }

    fn book_exists(&self, id: BookId) -> Result<bool> {
        let exists = self
            .conn
            .prepare("SELECT 1 FROM books WHERE id = ?1")?
            .exists(params![id])?;
        Ok(exists)
    }

    fn replace_membership(&self, id: CategoryId, book_ids: &[BookId]) -> Result<()> {
        let tx = self.conn.unchecked_transaction()?;
        tx.execute("DELETE FROM category_books WHERE category_id = ?1", params![id])?;
        for book_id in book_ids {
            tx.execute(
                "INSERT OR IGNORE INTO category_books (category_id, book_id) VALUES (?1, ?2)",
                params![id, book_id],
            )?;
        }
        tx.commit()?;
        Ok(())
    }
}

fn validate_name(name: &str) -> Result<&str> {
    let name = name.trim();
    if name.is_empty() {
        return Err(ShelfError::Validation("category name must not be blank".to_string()));
    }
    Ok(name)
}

impl<'a> Repository for SqliteCategoryRepository<'a> {
    type Entity = Category;
    type Id = CategoryId;

    fn find_by_id(&self, id: &Self::Id) -> Result<Option<Self::Entity>> {
        let result = self.conn.query_row(
            "SELECT id, name, parent_id FROM categories WHERE id = ?1",
            params![id],
            |row| {
                Ok(Category {
                    id: row.get(0)?,
                    name: row.get(1)?,
                    parent_id: row.get(2)?,
                    book_ids: Vec::new(),
                })
            },
        );

        match result {
            Ok(mut category) => {
                category.book_ids = self.book_ids_of(category.id)?;
                Ok(Some(category))
            }
            Err(rusqlite::Error::QueryReturnedNoRows) => Ok(None),
            Err(e) => Err(e.into()),
        }
    }

    fn save(&self, category: &Self::Entity) -> Result<()> {
        let name = validate_name(&category.name)?;
        if category.parent_id == Some(category.id) {
            return Err(ShelfError::Validation(format!(
                "category #{} cannot be its own parent",
                category.id
            )));
        }

        self.conn.execute(
            "INSERT INTO categories (id, name, parent_id) VALUES (?1, ?2, ?3)
             ON CONFLICT(id) DO UPDATE SET name = excluded.name, parent_id = excluded.parent_id",
            params![category.id, name, category.parent_id],
        )?;
        self.replace_membership(category.id, &category.book_ids)
    }

    /// Deleting a category that still has subcategories is refused.
    fn delete(&self, id: &Self::Id) -> Result<bool> {
        let children: i64 = self.conn.query_row(
            "SELECT COUNT(*) FROM categories WHERE parent_id = ?1",
            params![id],
            |row| row.get(0),
        )?;
        if children > 0 {
            return Err(ShelfError::Validation(format!(
                "category #{id} still has {children} subcategories"
            )));
        }

        let deleted = self.conn.execute("DELETE FROM categories WHERE id = ?1", params![id])?;
        Ok(deleted > 0)
    }
}

impl<'a> CategoryRepository for SqliteCategoryRepository<'a> {
    fn create(&self, name: &str, parent_id: Option<CategoryId>) -> Result<Category> {
        let name = validate_name(name)?;
        if let Some(pid) = parent_id {
            self.require(pid)?;
        }

        self.conn.execute(
            "INSERT INTO categories (name, parent_id) VALUES (?1, ?2)",
            params![name, parent_id],
        )?;
        let id = self.conn.last_insert_rowid();
        debug!("created category #{id} '{name}'");

        Ok(Category {
            id,
            name: name.to_string(),
            parent_id,
            book_ids: Vec::new(),
        })
    }

    fn list_all(&self) -> Result<Vec<Category>> {
        self.query_categories("SELECT id, name, parent_id FROM categories ORDER BY id", [])
    }

    fn list_roots(&self) -> Result<Vec<Category>> {
        self.query_categories(
            "SELECT id, name, parent_id FROM categories WHERE parent_id IS NULL ORDER BY id",
            [],
        )
    }

    fn list_children(&self, parent_id: CategoryId) -> Result<Vec<Category>> {
        self.query_categories(
            "SELECT id, name, parent_id FROM categories WHERE parent_id = ?1 ORDER BY id",
            params![parent_id],
        )
    }

    fn rename(&self, id: CategoryId, new_name: &str) -> Result<Option<Category>> {
        let name = validate_name(new_name)?;
        let updated = self.conn.execute(
            "UPDATE categories SET name = ?1 WHERE id = ?2",
            params![name, id],
        )?;
        if updated == 0 {
            return Ok(None);
        }
        self.find_by_id(&id)
    }

    fn get_or_create_default(&self) -> Result<Category> {
        let existing = self.conn.query_row(
            "SELECT id FROM categories WHERE name = ?1 AND parent_id IS NULL ORDER BY id LIMIT 1",
            params![DEFAULT_CATEGORY_NAME],
            |row| row.get::<_, CategoryId>(0),
        );

        match existing {
            Ok(id) => self.require(id),
            Err(rusqlite::Error::QueryReturnedNoRows) => {
                info!("creating default category");
                self.create(DEFAULT_CATEGORY_NAME, None)
            }
            Err(e) => Err(e.into()),
        }
    }

    fn assign_books(&self, id: CategoryId, book_ids: &[BookId]) -> Result<Category> {
        self.require(id)?;
        for &book_id in book_ids {
            if !self.book_exists(book_id)? {
                return Err(ShelfError::BookNotFound(book_id.to_string()));
            }
        }

        self.replace_membership(id, book_ids)?;
        debug!("category #{id} now holds {} books", book_ids.len());
        self.require(id)
    }

    fn books_in(&self, id: CategoryId) -> Result<Vec<BookRecord>> {
        self.require(id)?;
        let sql = format!(
            "SELECT {BOOK_COLUMNS} FROM books b
             JOIN category_books cb ON cb.book_id = b.id
             WHERE cb.category_id = ?1
             ORDER BY b.id"
        );
        let mut stmt = self.conn.prepare(&sql)?;
        let rows = stmt.query_map(params![id], SqliteBookRepository::row_to_record)?;
        rows.collect::<std::result::Result<Vec<_>, _>>().map_err(Into::into)
    }
}
