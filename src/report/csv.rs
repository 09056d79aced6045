//! CSV export of stored responses.

use crate::models::ResponseRecord;
use anyhow::{Context, Result};
use std::path::Path;

/// Column headers, in export order.
pub const CSV_HEADERS: [&str; 5] = ["Display Name", "Group", "Contact", "Category", "Created At"];

/// Build the CSV export: a header row, then one fully quoted row per record.
///
/// Pending timestamps and missing categories export as empty values.
pub fn generate_csv(records: &[ResponseRecord]) -> String {
    let mut lines = Vec::with_capacity(records.len() + 1);
    lines.push(CSV_HEADERS.join(","));

    for record in records {
        let created_at = record
            .created_at
            .resolved()
            .map(|ts| ts.to_rfc3339())
            .unwrap_or_default();

        let row = [
            record.display_name.as_str(),
            record.group.as_str(),
            record.contact.as_str(),
            record.category.as_deref().unwrap_or(""),
            created_at.as_str(),
        ]
        .iter()
        .map(|value| quote(value))
        .collect::<Vec<_>>()
        .join(",");

        lines.push(row);
    }

    lines.join("\n")
}

/// Write the CSV export to `path`.
pub fn write_csv(records: &[ResponseRecord], path: &Path) -> Result<()> {
    std::fs::write(path, generate_csv(records))
        .with_context(|| format!("Failed to write CSV export to {}", path.display()))
}

fn quote(value: &str) -> String {
    format!("\"{}\"", value.replace('"', "\"\""))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::{CreatedAt, RecordId};
    use chrono::{TimeZone, Utc};
    use tempfile::TempDir;

    fn create_test_record(name: &str, created_at: CreatedAt) -> ResponseRecord {
        ResponseRecord {
            id: RecordId::new(name),
            display_name: name.to_string(),
            group: "1st Battery".to_string(),
            contact: "(11) 99999-9999".to_string(),
            category: Some("Employee".to_string()),
            created_at,
        }
    }

    #[test]
    fn test_header_and_rows() {
        let ts = Utc.with_ymd_and_hms(2024, 5, 1, 14, 30, 0).unwrap();
        let records = vec![
            create_test_record("Sd Silva", CreatedAt::Resolved(ts)),
            create_test_record("Cb Souza", CreatedAt::Pending),
        ];

        let csv = generate_csv(&records);
        let lines: Vec<_> = csv.lines().collect();

        assert_eq!(lines.len(), 3);
        assert_eq!(lines[0], "Display Name,Group,Contact,Category,Created At");
        assert_eq!(
            lines[1],
            "\"Sd Silva\",\"1st Battery\",\"(11) 99999-9999\",\"Employee\",\"2024-05-01T14:30:00+00:00\""
        );
        assert!(lines[2].ends_with(",\"\""));
    }

    #[test]
    fn test_embedded_quotes_are_doubled() {
        let mut record = create_test_record("Sd \"Tiger\" Silva", CreatedAt::Pending);
        record.category = None;

        let csv = generate_csv(&[record]);

        assert!(csv.contains("\"Sd \"\"Tiger\"\" Silva\""));
        assert!(csv.contains("\"(11) 99999-9999\",\"\","));
    }

    #[test]
    fn test_empty_export_has_header_only() {
        assert_eq!(generate_csv(&[]), CSV_HEADERS.join(","));
    }

    #[test]
    fn test_write_csv() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("export.csv");

        write_csv(&[create_test_record("Sd Silva", CreatedAt::Pending)], &path).unwrap();

        let content = std::fs::read_to_string(&path).unwrap();
        assert!(content.starts_with("Display Name,"));
    }
}
