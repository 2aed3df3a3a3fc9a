use thiserror::Error;

/// All errors that can occur in shelfwise-core.
#[derive(Debug, Error)]
pub enum ShelfError {
    #[error("Book not found: {0}")]
    BookNotFound(String),

    #[error("Category not found: {0}")]
    CategoryNotFound(String),

    #[error("Directory does not exist: {0}")]
    DirectoryNotFound(String),

    #[error("Validation error: {0}")]
    Validation(String),

    #[error("Stale write: {0}")]
    Conflict(String),

    #[error("Config error: {0}")]
    ConfigError(String),

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("Database error: {0}")]
    Database(#[from] rusqlite::Error),

    #[error("TOML parse error: {0}")]
    TomlParse(#[from] toml::de::Error),

    #[error("TOML serialize error: {0}")]
    TomlSerialize(#[from] toml::ser::Error),
}

impl ShelfError {
    /// Map an error onto the exit code the CLI reports for it.
    pub fn exit_code(&self) -> ExitCode {
        match self {
            Self::BookNotFound(_) | Self::CategoryNotFound(_) | Self::DirectoryNotFound(_) => {
                ExitCode::NotFound
            }
            Self::Validation(_) => ExitCode::InvalidArgs,
            Self::Conflict(_) => ExitCode::Conflict,
            _ => ExitCode::GeneralError,
        }
    }
}

/// Exit codes used by the `shelfwise` binary.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[repr(i32)]
pub enum ExitCode {
    Success = 0,
    GeneralError = 1,
    NotFound = 2,
    InvalidArgs = 3,
    Conflict = 7,
}

pub type Result<T> = std::result::Result<T, ShelfError>;
