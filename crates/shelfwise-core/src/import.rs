//! Turning candidate file paths into catalog records.
//!
//! `import_candidates()` filters by format, drops paths already known to the
//! catalog (case-insensitive), builds minimal records from file names and
//! persists them one at a time. `parse_candidates()` builds the same records
//! without touching the catalog, for directory comparisons.

use std::collections::HashSet;
use std::path::Path;

use serde::Serialize;
use tracing::{debug, info, warn};

use crate::error::{Result, ShelfError};
use crate::format::{is_supported_book, split_file_name};
use crate::fs_source::FileSource;
use crate::heuristic::guess_title_author;
use crate::models::{BookRecord, Tag};
use crate::storage::repositories::BookRepository;

// ─── Known paths ───────────────────────────────────────────

/// Case-insensitive snapshot of file paths already in the catalog.
#[derive(Debug, Clone, Default)]
pub struct KnownPaths {
    folded: HashSet<String>,
}

impl KnownPaths {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn from_paths<I, S>(paths: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        Self {
            folded: paths.into_iter().map(|p| fold_path(p.as_ref())).collect(),
        }
    }

    pub fn contains(&self, path: &str) -> bool {
        self.folded.contains(&fold_path(path))
    }

    /// Returns false if the path (in any letter case) was already present.
    pub fn insert(&mut self, path: &str) -> bool {
        self.folded.insert(fold_path(path))
    }

    pub fn len(&self) -> usize {
        self.folded.len()
    }

    pub fn is_empty(&self) -> bool {
        self.folded.is_empty()
    }
}

fn fold_path(path: &str) -> String {
    path.to_lowercase()
}

// ─── Outcome ───────────────────────────────────────────────

#[derive(Debug, Clone, Serialize)]
pub struct ImportFailure {
    pub path: String,
    pub reason: String,
}

/// Per-batch report. Every candidate lands in exactly one of the four lists.
#[derive(Debug, Clone, Default, Serialize)]
pub struct ImportOutcome {
    /// Records created and persisted, in input order, with ids assigned.
    pub imported: Vec<BookRecord>,
    /// Paths rejected by the format filter.
    pub unsupported: Vec<String>,
    /// Paths already known, or repeated within this batch.
    pub duplicates: Vec<String>,
    /// Paths whose record could not be built or persisted.
    pub failed: Vec<ImportFailure>,
}

impl ImportOutcome {
    pub fn total_candidates(&self) -> usize {
        self.imported.len() + self.unsupported.len() + self.duplicates.len() + self.failed.len()
    }

    /// Candidates that did not result in a new record.
    pub fn not_imported(&self) -> usize {
        self.total_candidates() - self.imported.len()
    }
}

// ─── Import ────────────────────────────────────────────────

/// Import candidate paths into the catalog held by `repo`.
///
/// The set of known paths is read from the repository once, before the batch
/// starts. A failure on one candidate is logged and recorded in the outcome;
/// it never aborts the batch.
pub fn import_candidates<R>(repo: &R, paths: &[String]) -> Result<ImportOutcome>
where
    R: BookRepository + ?Sized,
{
    let known = KnownPaths::from_paths(repo.list_all_file_paths()?);
    debug!("catalog already tracks {} file paths", known.len());
    Ok(import_with_known(repo, paths, &known))
}

/// Import against an explicit snapshot of known paths. The snapshot is only
/// read; paths accepted in this batch are tracked separately.
pub fn import_with_known<R>(repo: &R, paths: &[String], known: &KnownPaths) -> ImportOutcome
where
    R: BookRepository + ?Sized,
{
    info!("importing {} candidate files", paths.len());

    let mut outcome = ImportOutcome::default();
    let mut accepted = KnownPaths::new();

    for path in paths {
        if !is_supported_book(path) {
            debug!("skipping unsupported file: {path}");
            outcome.unsupported.push(path.clone());
            continue;
        }

        if known.contains(path) || accepted.contains(path) {
            info!("skipping already imported book: {path}");
            outcome.duplicates.push(path.clone());
            continue;
        }

        let persisted = build_record(path).and_then(|mut record| {
            let id = repo.add(&record)?;
            record.id = Some(id);
            Ok(record)
        });

        match persisted {
            Ok(record) => {
                info!("imported '{}' as #{}", record.title, record.id.unwrap_or_default());
                accepted.insert(path);
                outcome.imported.push(record);
            }
            Err(e) => {
                warn!("failed to import {path}: {e}");
                outcome.failed.push(ImportFailure {
                    path: path.clone(),
                    reason: e.to_string(),
                });
            }
        }
    }

    info!(
        "import finished: {}/{} imported, {} duplicates, {} unsupported, {} failed",
        outcome.imported.len(),
        outcome.total_candidates(),
        outcome.duplicates.len(),
        outcome.unsupported.len(),
        outcome.failed.len(),
    );
    outcome
}

/// Build an unsaved record for a book file from its name alone.
///
/// Title and author come from the file stem, the extension becomes the only
/// entry in `file_extensions`, and the derived tags are attached.
pub fn build_record(path: &str) -> Result<BookRecord> {
    let (stem, ext) = split_file_name(path)
        .ok_or_else(|| ShelfError::Validation(format!("path has no extension: {path}")))?;
    let ext = ext.to_lowercase();

    let guess = guess_title_author(&stem);
    let mut record = BookRecord::new(guess.title, path);
    record.author = guess.author.filter(|a| !a.trim().is_empty());
    record.file_extensions = vec![ext.clone()];
    record.is_new = true;

    record.add_tag(Tag::format(&ext));
    record.is_info_incomplete = record.has_missing_info();
    if record.is_info_incomplete {
        record.add_tag(Tag::IncompleteInfo);
    }

    Ok(record)
}

// ─── Transient parsing ─────────────────────────────────────

/// Build records for supported files without persisting or deduplicating
/// them. Each record's description carries the file size; files whose size
/// cannot be read are logged and skipped.
pub fn parse_candidates<F>(fs: &F, paths: &[String]) -> Vec<BookRecord>
where
    F: FileSource + ?Sized,
{
    let candidates: Vec<&String> = paths.iter().filter(|p| is_supported_book(p)).collect();
    let candidate_count = candidates.len();
    info!("parsing metadata for {candidate_count} book files");

    let mut records = Vec::with_capacity(candidates.len());
    for path in candidates {
        let parsed = build_record(path).and_then(|mut record| {
            let size = fs.file_len(Path::new(path))?;
            record.description = Some(format!("File size: {}", format_file_size(size)));
            Ok(record)
        });

        match parsed {
            Ok(record) => {
                debug!("parsed '{}' from {path}", record.title);
                records.push(record);
            }
            Err(e) => warn!("failed to parse {path}: {e}"),
        }
    }

    info!("parsed {}/{candidate_count} book files", records.len());
    records
}

/// Human-readable byte count, e.g. `1.50 KB`.
pub fn format_file_size(bytes: u64) -> String {
    const SUFFIXES: [&str; 5] = ["B", "KB", "MB", "GB", "TB"];

    let mut number = bytes as f64;
    let mut unit = 0;
    while unit < SUFFIXES.len() - 1 && (number / 1024.0).round_ties_even() >= 1.0 {
        number /= 1024.0;
        unit += 1;
    }

    format!("{number:.2} {}", SUFFIXES[unit])
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::storage::database::Database;
    use std::cell::RefCell;
    use std::path::PathBuf;

    fn paths(items: &[&str]) -> Vec<String> {
        items.iter().map(|s| s.to_string()).collect()
    }

    #[test]
    fn test_build_record_from_author_title_name() {
        let record =
            build_record("/books/Ursula Le Guin - The Left Hand of Darkness.EPUB").unwrap();
        assert_eq!(record.title, "The Left Hand of Darkness");
        assert_eq!(record.author.as_deref(), Some("Ursula Le Guin"));
        assert_eq!(record.file_extensions, vec![".epub"]);
        assert!(record.is_new);
        assert!(record.id.is_none());
        assert!(record.has_tag("format:epub"));
    }

    #[test]
    fn test_build_record_flags_missing_publisher() {
        let record = build_record("/books/Moby Dick.txt").unwrap();
        assert!(record.author.is_none());
        assert!(record.is_info_incomplete);
        assert!(record.has_tag("incomplete metadata"));
        assert_eq!(record.tags.len(), 2);
    }

    #[test]
    fn test_import_persists_new_records() {
        let db = Database::open_in_memory().unwrap();
        let repo = db.books();

        let outcome = import_candidates(
            &repo,
            &paths(&["/lib/A - First Book.pdf", "/lib/Second.epub", "/lib/cover.jpg"]),
        )
        .unwrap();

        assert_eq!(outcome.imported.len(), 2);
        assert_eq!(outcome.unsupported, vec!["/lib/cover.jpg"]);
        assert!(outcome.imported.iter().all(|r| r.id.is_some()));
        assert_eq!(repo.list_all().unwrap().len(), 2);
    }

    #[test]
    fn test_reimport_known_path_any_case_yields_nothing() {
        let db = Database::open_in_memory().unwrap();
        let repo = db.books();

        import_candidates(&repo, &paths(&["/lib/Dune.epub"])).unwrap();
        let again =
            import_candidates(&repo, &paths(&["/LIB/dune.EPUB", "/lib/Dune.epub"])).unwrap();

        assert!(again.imported.is_empty());
        assert_eq!(again.duplicates.len(), 2);
        assert_eq!(repo.list_all().unwrap().len(), 1);
    }

    #[test]
    fn test_duplicates_within_one_batch() {
        let db = Database::open_in_memory().unwrap();
        let repo = db.books();

        let outcome =
            import_candidates(&repo, &paths(&["/lib/Dune.epub", "/lib/DUNE.epub"])).unwrap();
        assert_eq!(outcome.imported.len(), 1);
        assert_eq!(outcome.imported[0].file_path, "/lib/Dune.epub");
        assert_eq!(outcome.duplicates, vec!["/lib/DUNE.epub"]);
    }

    #[test]
    fn test_known_snapshot_is_not_modified() {
        let db = Database::open_in_memory().unwrap();
        let repo = db.books();
        let known = KnownPaths::from_paths(["/lib/old.pdf"]);

        let outcome = import_with_known(&repo, &paths(&["/lib/new.pdf"]), &known);
        assert_eq!(outcome.imported.len(), 1);
        assert_eq!(known.len(), 1);
        assert!(!known.contains("/lib/new.pdf"));
    }

    #[test]
    fn test_outcome_accounts_for_every_candidate() {
        let db = Database::open_in_memory().unwrap();
        let repo = db.books();
        let known = KnownPaths::from_paths(["/lib/known.mobi"]);
        let candidates = paths(&[
            "/lib/known.mobi",
            "/lib/fresh.azw3",
            "/lib/notes.docx",
            "",
            "/lib/fresh.AZW3",
        ]);

        let outcome = import_with_known(&repo, &candidates, &known);
        assert_eq!(outcome.total_candidates(), candidates.len());
        assert_eq!(outcome.imported.len(), 1);
        assert_eq!(outcome.not_imported(), 4);
    }

    /// Repository whose `add` fails for titles containing "broken".
    struct FlakyRepo {
        added: RefCell<Vec<String>>,
    }

    impl crate::storage::repositories::Repository for FlakyRepo {
        type Entity = BookRecord;
        type Id = crate::models::BookId;

        fn find_by_id(&self, _id: &Self::Id) -> Result<Option<BookRecord>> {
            Ok(None)
        }

        fn save(&self, _entity: &BookRecord) -> Result<()> {
            Ok(())
        }

        fn delete(&self, _id: &Self::Id) -> Result<bool> {
            Ok(false)
        }
    }

    impl BookRepository for FlakyRepo {
        fn list_all(&self) -> Result<Vec<BookRecord>> {
            Ok(Vec::new())
        }

        fn add(&self, record: &BookRecord) -> Result<crate::models::BookId> {
            if record.title.contains("broken") {
                return Err(ShelfError::Validation("disk full".to_string()));
            }
            let mut added = self.added.borrow_mut();
            added.push(record.file_path.clone());
            Ok(added.len() as i64)
        }

        fn update(&self, _record: &BookRecord) -> Result<bool> {
            Ok(false)
        }

        fn list_all_file_paths(&self) -> Result<Vec<String>> {
            Ok(Vec::new())
        }

        fn search(&self, _query: &str) -> Result<Vec<BookRecord>> {
            Ok(Vec::new())
        }
    }

    #[test]
    fn test_persistence_failure_does_not_abort_batch() {
        let repo = FlakyRepo {
            added: RefCell::new(Vec::new()),
        };
        let outcome = import_candidates(
            &repo,
            &paths(&["/lib/one.pdf", "/lib/broken.pdf", "/lib/three.pdf"]),
        )
        .unwrap();

        assert_eq!(outcome.imported.len(), 2);
        assert_eq!(outcome.failed.len(), 1);
        assert_eq!(outcome.failed[0].path, "/lib/broken.pdf");
        assert!(outcome.failed[0].reason.contains("disk full"));
        assert_eq!(outcome.imported[1].id, Some(2));
    }

    #[test]
    fn test_failed_path_can_be_retried_in_same_batch() {
        let repo = FlakyRepo {
            added: RefCell::new(Vec::new()),
        };
        let outcome =
            import_candidates(&repo, &paths(&["/lib/broken.pdf", "/lib/broken.pdf"])).unwrap();
        assert_eq!(outcome.failed.len(), 2);
        assert!(outcome.duplicates.is_empty());
    }

    /// FileSource with fixed sizes; unknown paths fail.
    struct FakeFs(Vec<(&'static str, u64)>);

    impl FileSource for FakeFs {
        fn list_files(&self, _root: &Path, _recursive: bool) -> Result<Vec<PathBuf>> {
            Ok(self.0.iter().map(|(p, _)| PathBuf::from(p)).collect())
        }

        fn file_len(&self, path: &Path) -> Result<u64> {
            self.0
                .iter()
                .find(|(p, _)| Path::new(p) == path)
                .map(|(_, len)| *len)
                .ok_or_else(|| std::io::Error::from(std::io::ErrorKind::NotFound).into())
        }
    }

    #[test]
    fn test_parse_candidates_adds_size_and_skips_failures() {
        let fs = FakeFs(vec![("/left/J.Doe - Book A.pdf", 2048)]);
        let records = parse_candidates(
            &fs,
            &paths(&["/left/J.Doe - Book A.pdf", "/left/gone.epub", "/left/image.png"]),
        );

        assert_eq!(records.len(), 1);
        assert_eq!(records[0].title, "Book A");
        assert_eq!(records[0].description.as_deref(), Some("File size: 2.00 KB"));
        assert!(records[0].id.is_none());
    }

    #[test]
    fn test_dotfile_book_fails_import_on_blank_title() {
        let db = Database::open_in_memory().unwrap();
        let repo = db.books();

        let outcome =
            import_candidates(&repo, &paths(&["/books/.pdf", "/books/Real.pdf"])).unwrap();
        assert!(outcome.unsupported.is_empty());
        assert_eq!(outcome.imported.len(), 1);
        assert_eq!(outcome.failed.len(), 1);
        assert_eq!(outcome.failed[0].path, "/books/.pdf");
        assert!(outcome.failed[0].reason.contains("blank"));
        assert_eq!(repo.list_all().unwrap().len(), 1);
    }

    #[test]
    fn test_dotfile_book_is_parsed_with_empty_title() {
        let fs = FakeFs(vec![("/books/.pdf", 10)]);
        let records = parse_candidates(&fs, &paths(&["/books/.pdf"]));

        assert_eq!(records.len(), 1);
        assert_eq!(records[0].title, "");
        assert_eq!(records[0].file_extensions, vec![".pdf"]);
        assert!(records[0].is_info_incomplete);
    }

    #[test]
    fn test_format_file_size() {
        assert_eq!(format_file_size(0), "0.00 B");
        assert_eq!(format_file_size(512), "512.00 B");
        assert_eq!(format_file_size(1536), "1.50 KB");
        assert_eq!(format_file_size(5 * 1024 * 1024), "5.00 MB");
        assert_eq!(format_file_size(3 * 1024u64.pow(5)), "3072.00 TB");
    }
}
