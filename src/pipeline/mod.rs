//! Pipeline entry points for fund updates.
//!
//! - `run_update`: One full update, from master list to sinks
//! - `run_daily`: Repeat `run_update` at a fixed local time each day

pub mod aggregate;
pub mod date_rule;
pub mod dispatch;
pub mod progress;
pub mod schedule;
pub mod update;

pub use aggregate::ResultAggregator;
pub use date_rule::{Clock, DateRule, FixedClock, SystemClock, parse_nav_date};
pub use dispatch::{BoundedDispatcher, Completion, Fetch};
pub use progress::{ProgressSnapshot, ProgressTracker};
pub use schedule::{next_run_after, parse_daily_time, run_daily};
pub use update::{CollectedRun, UpdateReport, collect_active, run_update, run_update_with_clock};
