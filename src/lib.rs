//! Surveyboard - survey intake with live result dashboards.
//!
//! Responses are validated, appended to a document store, and aggregated into
//! per-category counts and shares. Live views recompute the stats from every
//! snapshot the store delivers.

pub mod analysis;
pub mod auth;
pub mod cli;
pub mod config;
pub mod feed;
pub mod models;
pub mod report;
pub mod store;
pub mod submission;
