//! Milestone KPIs for project stages.
//!
//! Reads a wide stage table (one row per stage, five milestone dates),
//! derives the month counts between consecutive milestones and reshapes them
//! into a long table with one row per (stage, KPI).
pub mod config;
pub mod dates;
pub mod error;
pub mod kpi;
pub mod loader;
pub mod logging;
pub mod output;
pub mod reports;
pub mod types;
pub mod util;
