use std::hash::{Hash, Hasher};

use serde::{Deserialize, Serialize};

const FORMAT_PREFIX: &str = "format:";
const INCOMPLETE_INFO_NAME: &str = "incomplete metadata";

/// A tag attached to a book.
///
/// Derived tags are kept as variants; only their persisted name uses the
/// `format:<ext>` convention. Two tags are equal when their names are equal.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(from = "String", into = "String")]
pub enum Tag {
    /// File format, extension without the leading dot.
    Format(String),
    /// Title, author or publisher was blank when the record was created.
    IncompleteInfo,
    /// Free-form user tag.
    User(String),
}

impl Tag {
    pub fn user(name: impl Into<String>) -> Self {
        Self::from_name(&name.into())
    }

    /// Format tag for an extension, with or without the leading dot.
    pub fn format(ext: &str) -> Self {
        Self::Format(ext.trim_start_matches('.').to_lowercase())
    }

    /// Parse a persisted tag name.
    pub fn from_name(name: &str) -> Self {
        if let Some(ext) = name.strip_prefix(FORMAT_PREFIX) {
            Self::Format(ext.to_string())
        } else if name == INCOMPLETE_INFO_NAME {
            Self::IncompleteInfo
        } else {
            Self::User(name.to_string())
        }
    }

    pub fn name(&self) -> String {
        match self {
            Self::Format(ext) => format!("{FORMAT_PREFIX}{ext}"),
            Self::IncompleteInfo => INCOMPLETE_INFO_NAME.to_string(),
            Self::User(name) => name.clone(),
        }
    }

    /// Derived tags are computed at record creation, not edited by users.
    pub fn is_derived(&self) -> bool {
        !matches!(self, Self::User(_))
    }
}

impl PartialEq for Tag {
    fn eq(&self, other: &Self) -> bool {
        self.name() == other.name()
    }
}

impl Eq for Tag {}

impl Hash for Tag {
    fn hash<H: Hasher>(&self, state: &mut H) {
        self.name().hash(state);
    }
}

impl std::fmt::Display for Tag {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.name())
    }
}

impl From<String> for Tag {
    fn from(name: String) -> Self {
        Self::from_name(&name)
    }
}

impl From<Tag> for String {
    fn from(tag: Tag) -> Self {
        tag.name()
    }
}
