//! Response aggregation and statistics.
//!
//! Statistics are always recomputed from a full snapshot. Nothing here keeps
//! state between calls.

use crate::models::{AggregateStats, CategorySet, ResponseRecord};
use indexmap::IndexMap;

/// Decimal places used for percentages unless a view asks otherwise.
pub const DEFAULT_DECIMALS: u32 = 1;

/// Most decimal places a percentage is rounded to. Larger requests are capped.
pub const MAX_DECIMALS: u32 = 6;

/// Compute aggregate statistics with the default one-decimal rounding.
pub fn compute_stats(records: &[ResponseRecord], categories: &CategorySet) -> AggregateStats {
    compute_stats_with_precision(records, categories, DEFAULT_DECIMALS)
}

/// Compute aggregate statistics, rounding percentages to `decimals` places.
///
/// Records with a missing or unknown category count toward `total` only.
pub fn compute_stats_with_precision(
    records: &[ResponseRecord],
    categories: &CategorySet,
    decimals: u32,
) -> AggregateStats {
    let mut count_by_category: IndexMap<String, usize> = categories
        .iter()
        .map(|category| (category.to_string(), 0))
        .collect();

    for record in records {
        if let Some(count) = record
            .category
            .as_deref()
            .and_then(|category| count_by_category.get_mut(category))
        {
            *count += 1;
        }
    }

    let total = records.len();
    let percentage_by_category = count_by_category
        .iter()
        .map(|(category, &count)| (category.clone(), percentage(count, total, decimals)))
        .collect();

    AggregateStats {
        total,
        count_by_category,
        percentage_by_category,
    }
}

/// Share of `count` in `total` as a rounded percentage; zero for an empty total.
pub fn percentage(count: usize, total: usize, decimals: u32) -> f64 {
    if total == 0 {
        return 0.0;
    }

    round_to(count as f64 / total as f64 * 100.0, decimals)
}

/// Round half away from zero to a fixed number of decimal places, at most
/// [`MAX_DECIMALS`].
pub fn round_to(value: f64, decimals: u32) -> f64 {
    let factor = 10f64.powi(decimals.min(MAX_DECIMALS) as i32);
    (value * factor).round() / factor
}
