// src/models/mod.rs

//! Domain models for the fund updater.
//!
//! This module contains all data structures used throughout the application,
//! organized by their primary purpose.

mod config;
mod outcome;
mod scheme;

// Re-export all public types
pub use config::{
    ApiConfig, Config, DatabaseConfig, FetchConfig, FilterConfig, MissingIdPolicy, OutputConfig,
};
pub use outcome::{
    DetailResult, FetchOutcome, NAV_DATE_FORMAT, RejectReason, ResultSet, RunSummary,
};
pub use scheme::{MasterEntry, NavEntry, RecordRef, SchemeDetail, SchemeMeta};
