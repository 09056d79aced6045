//! Report views.
//!
//! Text and JSON dashboards, the submission confirmation, and the CSV export.

pub mod csv;
pub mod dashboard;

pub use csv::{generate_csv, write_csv};
pub use dashboard::{
    generate_admin_json, generate_stats_json, render_admin_view, render_confirmation,
    render_public_view,
};
