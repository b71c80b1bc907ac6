//! Service layer for the fund updater.
//!
//! This module contains the network-facing logic for:
//! - Master list retrieval (`fetch_master_list`, `prepare_refs`)
//! - Per-scheme detail fetching (`SchemeFetcher`)
//! - Retry budgeting (`RetryPolicy`)

mod details;
mod master;
mod retry;

pub use details::SchemeFetcher;
pub use master::{PreparedRefs, fetch_master_list, prepare_refs};
pub use retry::RetryPolicy;
