//! Analysis modules.
//!
//! Aggregation over full snapshots, plus the search predicate used by the
//! detail view.

pub mod aggregator;
pub mod search;

pub use aggregator::*;
pub use search::*;
