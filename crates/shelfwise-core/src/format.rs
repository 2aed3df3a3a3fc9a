use std::path::Path;

use serde::{Deserialize, Serialize};

/// Book file formats the catalog accepts.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum BookFormat {
    Pdf,
    Mobi,
    Epub,
    Txt,
    Azw3,
}

impl BookFormat {
    /// Detect format from an extension, with or without the leading dot.
    pub fn from_extension(ext: &str) -> Option<Self> {
        match ext.trim_start_matches('.').to_lowercase().as_str() {
            "pdf" => Some(Self::Pdf),
            "mobi" => Some(Self::Mobi),
            "epub" => Some(Self::Epub),
            "txt" => Some(Self::Txt),
            "azw3" => Some(Self::Azw3),
            _ => None,
        }
    }

    /// Detect format from a path's extension.
    pub fn from_path(path: &str) -> Option<Self> {
        dotted_extension(path).and_then(|ext| Self::from_extension(&ext))
    }

    /// Extension including the leading dot, e.g. `.epub`.
    pub fn dotted(self) -> &'static str {
        match self {
            Self::Pdf => ".pdf",
            Self::Mobi => ".mobi",
            Self::Epub => ".epub",
            Self::Txt => ".txt",
            Self::Azw3 => ".azw3",
        }
    }
}

impl std::fmt::Display for BookFormat {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.dotted().trim_start_matches('.'))
    }
}

/// Check if a path names a recognized book file. Total: empty paths and
/// paths without an extension are simply not books.
pub fn is_supported_book(path: &str) -> bool {
    BookFormat::from_path(path).is_some()
}

/// Lower-cased extension of the final path component, including the dot.
///
/// The extension is everything from the last `.` of the file name, so a bare
/// `.pdf` has an empty stem and the extension `.pdf`. A trailing dot is no
/// extension.
pub fn dotted_extension(path: &str) -> Option<String> {
    split_file_name(path).map(|(_, ext)| ext.to_lowercase())
}

/// Split the final path component into stem and dotted extension.
pub fn split_file_name(path: &str) -> Option<(String, String)> {
    let name = Path::new(path).file_name()?.to_string_lossy();
    let dot = name.rfind('.')?;
    if dot + 1 == name.len() {
        return None;
    }
    Some((name[..dot].to_string(), name[dot..].to_string()))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_is_supported_book() {
        assert!(is_supported_book("/books/test.pdf"));
        assert!(is_supported_book("/books/test.epub"));
        assert!(is_supported_book("/books/test.mobi"));
        assert!(is_supported_book("/books/test.txt"));
        assert!(is_supported_book("/books/test.azw3"));
        assert!(!is_supported_book("/books/test.djvu"));
        assert!(!is_supported_book("/books/cover.jpg"));
        assert!(!is_supported_book("/books/README"));
    }

    #[test]
    fn test_is_supported_book_ignores_case() {
        assert!(is_supported_book("/books/LOUD.PDF"));
        assert!(is_supported_book("/books/Mixed.EpUb"));
    }

    #[test]
    fn test_empty_path_is_not_a_book() {
        assert!(!is_supported_book(""));
        assert!(!is_supported_book("/books/"));
        assert!(!is_supported_book("/books/trailing."));
    }

    #[test]
    fn test_dotfile_extension_counts() {
        assert!(is_supported_book("/books/.pdf"));
        assert!(is_supported_book(".EPUB"));
        assert_eq!(
            split_file_name("/books/.pdf"),
            Some((String::new(), ".pdf".to_string()))
        );
    }

    #[test]
    fn test_from_extension() {
        assert_eq!(BookFormat::from_extension("PDF"), Some(BookFormat::Pdf));
        assert_eq!(BookFormat::from_extension(".azw3"), Some(BookFormat::Azw3));
        assert_eq!(BookFormat::from_extension("fb2"), None);
        assert_eq!(BookFormat::Epub.to_string(), "epub");
    }

    #[test]
    fn test_dotted_extension_lowercases() {
        assert_eq!(dotted_extension("/a/B.PDF").as_deref(), Some(".pdf"));
        assert_eq!(dotted_extension("/a/archive.tar.gz").as_deref(), Some(".gz"));
        assert_eq!(dotted_extension("/a/noext"), None);
        assert_eq!(dotted_extension("/a.dir/noext"), None);
    }
}
