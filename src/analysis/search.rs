//! Search predicate for the response table.
//!
//! Filtering only narrows what a view lists. Statistics are computed over the
//! full snapshot regardless of the search term.

use crate::models::ResponseRecord;

/// Case-insensitive substring match against the display name or the group.
///
/// An empty term matches every record.
pub fn matches(record: &ResponseRecord, term: &str) -> bool {
    if term.is_empty() {
        return true;
    }

    let needle = term.to_lowercase();
    record.display_name.to_lowercase().contains(&needle)
        || record.group.to_lowercase().contains(&needle)
}

/// Records matching `term`, in their original order.
pub fn filter_records<'a>(records: &'a [ResponseRecord], term: &str) -> Vec<&'a ResponseRecord> {
    records.iter().filter(|r| matches(r, term)).collect()
}
