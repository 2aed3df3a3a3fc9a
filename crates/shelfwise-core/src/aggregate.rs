use std::collections::HashMap;

use tracing::debug;

use crate::models::BookRecord;

/// Collapse records of the same work into one display entity each.
///
/// Records are grouped by case-folded title. The first record of a group (in
/// input order) is the primary; the other members' extensions and tags are
/// appended to it when not already present. Groups come out in the order
/// their first member was seen. The input is left untouched.
pub fn merge_by_title(records: &[BookRecord]) -> Vec<BookRecord> {
    let mut group_of: HashMap<String, usize> = HashMap::new();
    let mut merged: Vec<BookRecord> = Vec::new();

    for record in records {
        let key = record.title.to_lowercase();
        match group_of.get(&key) {
            Some(&idx) => merge_into(&mut merged[idx], record),
            None => {
                group_of.insert(key, merged.len());
                merged.push(record.clone());
            }
        }
    }

    debug!("merged {} records into {} titles", records.len(), merged.len());
    merged
}

fn merge_into(primary: &mut BookRecord, other: &BookRecord) {
    for ext in &other.file_extensions {
        primary.add_extension(ext);
    }
    for tag in &other.tags {
        primary.add_tag(tag.clone());
    }
}
