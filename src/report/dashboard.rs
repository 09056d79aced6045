//! Dashboard rendering.
//!
//! Both dashboards are driven purely by aggregate stats plus the raw record
//! list. The public view shows shares only; the detail view adds counts and
//! the response table.

use crate::analysis::filter_records;
use crate::models::{AggregateStats, ResponseRecord};
use anyhow::Result;
use serde_json::json;

/// Width of the percentage bars in the public view.
const BAR_WIDTH: usize = 30;

/// Render the public results view.
pub fn render_public_view(stats: &AggregateStats, decimals: u32) -> String {
    let mut output = String::new();

    output.push_str("# Survey Results\n\n");
    output.push_str(&format!("**{} votes**\n\n", stats.total));

    for row in stats.breakdown() {
        output.push_str(&format!("## {}\n\n", row.category));
        output.push_str(&format!(
            "{}  {}%\n\n",
            percentage_bar(row.percentage),
            format_percentage(row.percentage, decimals)
        ));
    }

    output.push_str("---\n\n");
    output.push_str("*Updates automatically as responses arrive.*\n");

    output
}

/// Render the detail view for administrators.
///
/// `search` narrows the response table only; the summary always covers the
/// full record list.
pub fn render_admin_view(
    records: &[ResponseRecord],
    stats: &AggregateStats,
    search: &str,
    decimals: u32,
) -> String {
    let mut output = String::new();

    output.push_str("# Responses Dashboard\n\n");
    output.push_str(&generate_summary_section(stats, decimals));
    output.push_str(&generate_table_section(records, search));

    output
}

/// Generate the summary section with counts and shares.
fn generate_summary_section(stats: &AggregateStats, decimals: u32) -> String {
    let mut section = String::new();

    section.push_str("## Summary\n\n");
    section.push_str("| Category | Responses | Share |\n");
    section.push_str("|:---|:---:|:---:|\n");
    section.push_str(&format!("| **Total** | **{}** | |\n", stats.total));

    for row in stats.breakdown() {
        section.push_str(&format!(
            "| {} | {} | {}% |\n",
            escape_cell(&row.category),
            row.count,
            format_percentage(row.percentage, decimals)
        ));
    }

    if stats.unaccounted() > 0 {
        section.push_str(&format!(
            "| *Other / missing* | {} | |\n",
            stats.unaccounted()
        ));
    }
    section.push('\n');

    section
}

/// Generate the response table.
fn generate_table_section(records: &[ResponseRecord], search: &str) -> String {
    let mut section = String::new();

    section.push_str("## Responses\n\n");
    if !search.is_empty() {
        section.push_str(&format!("*Filter: \"{}\"*\n\n", search));
    }

    let visible = filter_records(records, search);
    if visible.is_empty() {
        section.push_str("No responses found.\n\n");
        return section;
    }

    section.push_str("| Time | Name | Group | Contact | Category |\n");
    section.push_str("|:---|:---|:---|:---|:---|\n");

    for record in visible {
        section.push_str(&format!(
            "| {} | {} | {} | `{}` | {} |\n",
            record.created_at,
            escape_cell(&record.display_name),
            escape_cell(&record.group),
            escape_cell(&record.contact),
            escape_cell(record.category.as_deref().unwrap_or("-")),
        ));
    }
    section.push('\n');

    section
}

/// Render the confirmation shown after a successful submission.
pub fn render_confirmation() -> String {
    let mut output = String::new();

    output.push_str("# Thank you!\n\n");
    output.push_str("Your response has been recorded.\n");
    output.push_str("Thanks for taking part in the survey.\n");

    output
}

/// Stats as pretty JSON.
pub fn generate_stats_json(stats: &AggregateStats) -> Result<String> {
    serde_json::to_string_pretty(stats).map_err(Into::into)
}

/// Stats plus the filtered response list as pretty JSON.
pub fn generate_admin_json(
    records: &[ResponseRecord],
    stats: &AggregateStats,
    search: &str,
) -> Result<String> {
    let value = json!({
        "stats": stats,
        "responses": filter_records(records, search),
    });
    serde_json::to_string_pretty(&value).map_err(Into::into)
}

fn format_percentage(value: f64, decimals: u32) -> String {
    format!("{:.*}", decimals as usize, value)
}

fn percentage_bar(percentage: f64) -> String {
    let filled = ((percentage.clamp(0.0, 100.0) / 100.0) * BAR_WIDTH as f64).round() as usize;
    format!("{}{}", "█".repeat(filled), "░".repeat(BAR_WIDTH - filled))
}

fn escape_cell(value: &str) -> String {
    value.replace('|', "\\|").replace('\n', " ")
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::analysis::compute_stats_with_precision;
    use crate::models::{CategorySet, CreatedAt, RecordId};
    use chrono::{TimeZone, Utc};

    fn categories() -> CategorySet {
        CategorySet::new(["Employee", "Public Service", "Own Business"]).unwrap()
    }

    fn create_test_records() -> Vec<ResponseRecord> {
        vec![
            ResponseRecord {
                id: RecordId::new("1"),
                display_name: "Sd Silva".to_string(),
                group: "1st Battery".to_string(),
                contact: "(11) 99999-9999".to_string(),
                category: Some("Employee".to_string()),
                created_at: CreatedAt::Resolved(
                    Utc.with_ymd_and_hms(2024, 5, 1, 14, 30, 0).unwrap(),
                ),
            },
            ResponseRecord {
                id: RecordId::new("2"),
                display_name: "Cb Souza".to_string(),
                group: "2nd Battery".to_string(),
                contact: "+55 11 98888-7777".to_string(),
                category: Some("Employee".to_string()),
                created_at: CreatedAt::Pending,
            },
            ResponseRecord {
                id: RecordId::new("3"),
                display_name: "Sd Lima".to_string(),
                group: "1st Battery".to_string(),
                contact: "11 97777 6666".to_string(),
                category: Some("Public Service".to_string()),
                created_at: CreatedAt::Pending,
            },
        ]
    }

    #[test]
    fn test_public_view_shows_shares_in_configured_order() {
        let records = create_test_records();
        let stats = compute_stats_with_precision(&records, &categories(), 1);

        let view = render_public_view(&stats, 1);

        assert!(view.contains("**3 votes**"));
        assert!(view.contains("66.7%"));
        assert!(view.contains("33.3%"));
        assert!(view.contains("0.0%"));
        let employee = view.find("## Employee").unwrap();
        let own_business = view.find("## Own Business").unwrap();
        assert!(employee < own_business);
    }

    #[test]
    fn test_admin_view_renders_pending_and_counts() {
        let records = create_test_records();
        let stats = compute_stats_with_precision(&records, &categories(), 0);

        let view = render_admin_view(&records, &stats, "", 0);

        assert!(view.contains("| **Total** | **3** | |"));
        assert!(view.contains("| Employee | 2 | 67% |"));
        assert!(view.contains("14:30 - 2024-05-01"));
        assert!(view.contains("| pending | Cb Souza |"));
    }

    #[test]
    fn test_admin_search_filters_table_not_summary() {
        let records = create_test_records();
        let stats = compute_stats_with_precision(&records, &categories(), 0);

        let view = render_admin_view(&records, &stats, "souza", 0);

        assert!(view.contains("Cb Souza"));
        assert!(!view.contains("Sd Silva"));
        assert!(view.contains("| **Total** | **3** | |"));
    }

    #[test]
    fn test_admin_view_empty_filter_result() {
        let records = create_test_records();
        let stats = compute_stats_with_precision(&records, &categories(), 0);

        let view = render_admin_view(&records, &stats, "nobody", 0);

        assert!(view.contains("No responses found."));
    }

    #[test]
    fn test_percentage_bar() {
        assert_eq!(percentage_bar(0.0).chars().filter(|c| *c == '█').count(), 0);
        assert_eq!(percentage_bar(100.0).chars().filter(|c| *c == '█').count(), BAR_WIDTH);
        assert_eq!(percentage_bar(50.0).chars().count(), BAR_WIDTH);
    }

    #[test]
    fn test_generate_stats_json() {
        let stats = compute_stats_with_precision(&create_test_records(), &categories(), 1);
        let json = generate_stats_json(&stats).unwrap();

        assert!(json.contains("\"total\": 3"));
        assert!(json.contains("\"count_by_category\""));
        assert!(json.contains("\"percentage_by_category\""));
    }

    #[test]
    fn test_generate_admin_json_filters_responses() {
        let records = create_test_records();
        let stats = compute_stats_with_precision(&records, &categories(), 0);

        let json = generate_admin_json(&records, &stats, "lima").unwrap();
        let value: serde_json::Value = serde_json::from_str(&json).unwrap();

        assert_eq!(value["responses"].as_array().unwrap().len(), 1);
        assert_eq!(value["stats"]["total"], 3);
    }
}
