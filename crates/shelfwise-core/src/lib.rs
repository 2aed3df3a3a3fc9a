pub mod aggregate;
pub mod config;
pub mod error;
pub mod format;
pub mod fs_source;
pub mod heuristic;
pub mod import;
pub mod matcher;
pub mod models;
pub mod similarity;
pub mod storage;
pub mod viewer;

pub use config::AppConfig;
pub use error::{ExitCode, Result, ShelfError};
pub use models::*;

pub use aggregate::merge_by_title;
pub use format::{BookFormat, is_supported_book};
pub use fs_source::{FileSource, LocalFileSource};
pub use heuristic::{TitleAuthor, guess_title_author};
pub use import::{
    ImportFailure, ImportOutcome, KnownPaths, format_file_size, import_candidates,
    parse_candidates,
};
pub use matcher::{
    Comparison, MatchBucket, MatchCounts, MatchPair, MatchTier, TieredMatcher, compare_collections,
};
pub use similarity::similarity;

pub use storage::database::{ConnectionPool, Database, open_database, open_in_memory};
pub use storage::repositories::{
    BookRepository, CategoryRepository, Repository, SqliteBookRepository,
    SqliteCategoryRepository,
};
