use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::models::tag::Tag;

/// Identity assigned by the persistence layer on insert.
pub type BookId = i64;

// ─── BookRecord ─────────────────────────────────────────────

/// A catalog entry for one book file.
///
/// `id` stays `None` until the record has been handed to a repository's
/// `add`. Records loaded transiently for a directory comparison never get one.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct BookRecord {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub id: Option<BookId>,

    /// Optimistic-concurrency token, bumped on every successful update.
    #[serde(default = "default_version")]
    pub version: u32,

    pub title: String,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub author: Option<String>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub publisher: Option<String>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub isbn: Option<String>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub publication_year: Option<i32>,

    /// Absolute path of the file on disk.
    pub file_path: String,

    /// Extensions (with leading dot) this work is available in.
    #[serde(default)]
    pub file_extensions: Vec<String>,

    pub imported_at: DateTime<Utc>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub last_opened_at: Option<DateTime<Utc>>,

    #[serde(default)]
    pub is_new: bool,

    #[serde(default)]
    pub is_info_incomplete: bool,

    #[serde(default)]
    pub is_favorite: bool,

    #[serde(default)]
    pub tags: Vec<Tag>,
}

fn default_version() -> u32 {
    1
}

impl BookRecord {
    /// Create an unsaved record with the minimal required fields.
    pub fn new(title: impl Into<String>, file_path: impl Into<String>) -> Self {
        let mut record = Self {
            id: None,
            version: 1,
            title: title.into(),
            author: None,
            publisher: None,
            description: None,
            isbn: None,
            publication_year: None,
            file_path: file_path.into(),
            file_extensions: Vec::new(),
            imported_at: Utc::now(),
            last_opened_at: None,
            is_new: true,
            is_info_incomplete: false,
            is_favorite: false,
            tags: Vec::new(),
        };
        record.is_info_incomplete = record.has_missing_info();
        record
    }

    /// True when title, author or publisher is blank.
    pub fn has_missing_info(&self) -> bool {
        is_blank(Some(&self.title))
            || is_blank(self.author.as_deref())
            || is_blank(self.publisher.as_deref())
    }

    pub fn has_tag(&self, name: &str) -> bool {
        self.tags.iter().any(|t| t.name() == name)
    }

    /// Add a tag unless one with the same name is already attached.
    /// Returns whether the tag was added.
    pub fn add_tag(&mut self, tag: Tag) -> bool {
        if self.has_tag(&tag.name()) {
            return false;
        }
        self.tags.push(tag);
        true
    }

    /// Add an extension unless it is already listed.
    pub fn add_extension(&mut self, ext: &str) -> bool {
        if self.file_extensions.iter().any(|e| e == ext) {
            return false;
        }
        self.file_extensions.push(ext.to_string());
        true
    }

    /// Record that the book was just opened.
    pub fn mark_opened(&mut self) {
        self.last_opened_at = Some(Utc::now());
        self.is_new = false;
    }

    pub fn author_or_empty(&self) -> &str {
        self.author.as_deref().unwrap_or("")
    }
}

fn is_blank(value: Option<&str>) -> bool {
    value.is_none_or(|s| s.trim().is_empty())
}

// ─── Browsing views ────────────────────────────────────────

/// Predefined slices of the collection used for browsing.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum BookView {
    #[default]
    All,
    New,
    Incomplete,
    Favorites,
    Recent,
}

impl BookView {
    /// Filter and order a loaded collection for this view.
    pub fn apply(self, records: Vec<BookRecord>) -> Vec<BookRecord> {
        match self {
            Self::All => records,
            Self::New => records.into_iter().filter(|r| r.is_new).collect(),
            Self::Incomplete => records.into_iter().filter(|r| r.is_info_incomplete).collect(),
            Self::Favorites => records.into_iter().filter(|r| r.is_favorite).collect(),
            Self::Recent => {
                let mut opened: Vec<BookRecord> = records
                    .into_iter()
                    .filter(|r| r.last_opened_at.is_some())
                    .collect();
                opened.sort_by(|a, b| b.last_opened_at.cmp(&a.last_opened_at));
                opened
            }
        }
    }
}

impl std::fmt::Display for BookView {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::All => write!(f, "all"),
            Self::New => write!(f, "new"),
            Self::Incomplete => write!(f, "incomplete"),
            Self::Favorites => write!(f, "favorites"),
            Self::Recent => write!(f, "recent"),
        }
    }
}

impl std::str::FromStr for BookView {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "all" => Ok(Self::All),
            "new" => Ok(Self::New),
            "incomplete" => Ok(Self::Incomplete),
            "favorites" => Ok(Self::Favorites),
            "recent" => Ok(Self::Recent),
            _ => Err(format!("Invalid view: {s}")),
        }
    }
}

// ─── Tests ─────────────────────────────────────────────────

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Duration;

    #[test]
    fn test_new_record_flags_missing_info() {
        let record = BookRecord::new("Dune", "/books/Dune.epub");
        assert!(record.id.is_none());
        assert!(record.is_new);
        assert!(record.is_info_incomplete);
        assert!(!record.is_favorite);
    }

    #[test]
    fn test_complete_record_has_no_missing_info() {
        let mut record = BookRecord::new("Dune", "/books/Dune.epub");
        record.author = Some("Frank Herbert".to_string());
        record.publisher = Some("Chilton".to_string());
        assert!(!record.has_missing_info());

        record.publisher = Some("   ".to_string());
        assert!(record.has_missing_info());
    }

    #[test]
    fn test_add_tag_dedups_by_name() {
        let mut record = BookRecord::new("Dune", "/books/Dune.epub");
        assert!(record.add_tag(Tag::Format("epub".to_string())));
        assert!(!record.add_tag(Tag::from_name("format:epub")));
        assert!(record.add_tag(Tag::user("sci-fi")));
        assert_eq!(record.tags.len(), 2);
    }

    #[test]
    fn test_add_extension_keeps_order() {
        let mut record = BookRecord::new("Dune", "/books/Dune.epub");
        record.add_extension(".epub");
        record.add_extension(".pdf");
        assert!(!record.add_extension(".epub"));
        assert_eq!(record.file_extensions, vec![".epub", ".pdf"]);
    }

    #[test]
    fn test_mark_opened_clears_new() {
        let mut record = BookRecord::new("Dune", "/books/Dune.epub");
        record.mark_opened();
        assert!(!record.is_new);
        assert!(record.last_opened_at.is_some());
    }

    #[test]
    fn test_recent_view_orders_by_last_opened() {
        let now = Utc::now();
        let mut a = BookRecord::new("A", "/a.pdf");
        a.last_opened_at = Some(now - Duration::hours(2));
        let mut b = BookRecord::new("B", "/b.pdf");
        b.last_opened_at = Some(now);
        let c = BookRecord::new("C", "/c.pdf");

        let recent = BookView::Recent.apply(vec![a, b, c]);
        let titles: Vec<&str> = recent.iter().map(|r| r.title.as_str()).collect();
        assert_eq!(titles, vec!["B", "A"]);
    }

    #[test]
    fn test_view_from_str() {
        assert_eq!("favorites".parse::<BookView>(), Ok(BookView::Favorites));
        assert!("everything".parse::<BookView>().is_err());
    }
}
