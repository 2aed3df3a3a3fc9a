use serde::{Deserialize, Serialize};

use crate::models::book::BookId;

pub type CategoryId = i64;

/// Name of the category books land in when nothing else is chosen.
pub const DEFAULT_CATEGORY_NAME: &str = "Default";

/// A node in the user's category tree.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Category {
    pub id: CategoryId,
    pub name: String,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub parent_id: Option<CategoryId>,

    #[serde(default)]
    pub book_ids: Vec<BookId>,
}

impl Category {
    pub fn is_root(&self) -> bool {
        self.parent_id.is_none()
    }
}

/// A category with its descendants resolved, for tree display.
#[derive(Debug, Clone, Serialize)]
pub struct CategoryNode {
    pub category: Category,
    pub children: Vec<CategoryNode>,
}

impl CategoryNode {
    /// Build the forest of root categories from a flat list.
    pub fn build_forest(categories: &[Category]) -> Vec<CategoryNode> {
        categories
            .iter()
            .filter(|c| c.is_root())
            .map(|root| Self::build(root, categories))
            .collect()
    }

    fn build(category: &Category, all: &[Category]) -> CategoryNode {
        let children = all
            .iter()
            .filter(|c| c.parent_id == Some(category.id))
            .map(|child| Self::build(child, all))
            .collect();
        CategoryNode {
            category: category.clone(),
            children,
        }
    }
}
