//! Best-guess title/author extraction from bare file names.
//!
//! Handles the common `Author - Title` and `Title - Author` naming schemes.
//! The short side of the first hyphen is taken to be a person name.

use serde::Serialize;

/// Parts shorter than this may be read as an author name.
const MAX_AUTHOR_LEN: usize = 20;

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct TitleAuthor {
    pub title: String,
    pub author: Option<String>,
}

/// Guess title and author from a file stem (extension already stripped).
///
/// Splits on the first `-` only. When the first part is shorter than the
/// second and under 20 characters it is the author; otherwise it is the
/// title. Without a hyphen the whole trimmed stem is the title.
pub fn guess_title_author(stem: &str) -> TitleAuthor {
    match stem.split_once('-') {
        Some((first, second)) => {
            let first = first.trim();
            let second = second.trim();
            let first_len = first.chars().count();
            if first_len < second.chars().count() && first_len < MAX_AUTHOR_LEN {
                TitleAuthor {
                    title: second.to_string(),
                    author: Some(first.to_string()),
                }
            } else {
                TitleAuthor {
                    title: first.to_string(),
                    author: Some(second.to_string()),
                }
            }
        }
        None => TitleAuthor {
            title: stem.trim().to_string(),
            author: None,
        },
    }
}
