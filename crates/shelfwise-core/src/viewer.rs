use std::path::Path;

use crate::error::{Result, ShelfError};
use crate::models::BookRecord;

/// Open a record's file with the system default application.
pub fn open_record(record: &BookRecord) -> Result<()> {
    let path = Path::new(&record.file_path);
    if !path.exists() {
        return Err(ShelfError::Io(std::io::Error::new(
            std::io::ErrorKind::NotFound,
            format!("book file is missing: {}", record.file_path),
        )));
    }

    tracing::debug!("opening {}", record.file_path);
    open::that(path)?;
    Ok(())
}

/// Open a record's file with a specific application.
pub fn open_record_with(record: &BookRecord, app_name: &str) -> Result<()> {
    open::with(&record.file_path, app_name)?;
    Ok(())
}
