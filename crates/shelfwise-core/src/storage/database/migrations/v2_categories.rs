use rusqlite::Connection;

use super::Migration;
use crate::error::Result;
use crate::storage::database::schema;

pub struct V2Categories;

impl Migration for V2Categories {
    fn version(&self) -> u32 {
        2
    }

    fn description(&self) -> &'static str {
        "Category tree and category membership"
    }

    fn up(&self, conn: &Connection) -> Result<()> {
        schema::create_category_tables(conn)
    }
}
