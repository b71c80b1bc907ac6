//! Daily scheduling of fund updates.
//!
//! Runs are independent: nothing carries over from one day to the next.

use chrono::{Days, Local, NaiveDateTime, NaiveTime};

use crate::error::{AppError, Result};
use crate::models::Config;
use crate::pipeline::run_update;
use crate::storage::ResultSink;

/// Parse a daily run time in `HH:MM` (24-hour) form.
pub fn parse_daily_time(raw: &str) -> Result<NaiveTime> {
    NaiveTime::parse_from_str(raw.trim(), "%H:%M")
        .map_err(|e| AppError::config(format!("invalid schedule time '{raw}' (expected HH:MM): {e}")))
}

/// The first occurrence of `at` strictly after `now`.
pub fn next_run_after(now: NaiveDateTime, at: NaiveTime) -> NaiveDateTime {
    let today = now.date().and_time(at);
    if today > now {
        return today;
    }
    now.date()
        .checked_add_days(Days::new(1))
        .map(|tomorrow| tomorrow.and_time(at))
        .unwrap_or(today)
}

/// Run an update every day at `at` local time until Ctrl-C.
///
/// A failed run is logged and the scheduler waits for the next slot.
pub async fn run_daily(config: &Config, at: NaiveTime, sinks: &[Box<dyn ResultSink>]) -> Result<()> {
    config.validate()?;
    log::info!("Scheduler started; updating every day at {}", at.format("%H:%M"));

    loop {
        let now = Local::now().naive_local();
        let next = next_run_after(now, at);
        let wait = (next - now).to_std().unwrap_or_default();
        log::info!("Next update at {}", next.format("%Y-%m-%d %H:%M"));

        tokio::select! {
            _ = tokio::time::sleep(wait) => {}
            _ = tokio::signal::ctrl_c() => {
                log::info!("Scheduler shutting down");
                return Ok(());
            }
        }

        log::info!("Starting scheduled fund update");
        match run_update(config, sinks).await {
            Ok(report) if report.all_sinks_ok() => log::info!(
                "Scheduled update complete: {} active of {}",
                report.summary.accepted,
                report.summary.total
            ),
            Ok(report) => log::warn!(
                "Scheduled update finished with sink failures: {} active of {}",
                report.summary.accepted,
                report.summary.total
            ),
            Err(e) => log::error!("Scheduled update failed: {}", e),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::NaiveDate;

    fn at(d: u32, h: u32, m: u32) -> NaiveDateTime {
        NaiveDate::from_ymd_opt(2026, 10, d)
            .unwrap()
            .and_hms_opt(h, m, 0)
            .unwrap()
    }

    #[test]
    fn test_next_run_later_today() {
        let time = parse_daily_time("09:45").unwrap();
        assert_eq!(next_run_after(at(15, 8, 0), time), at(15, 9, 45));
    }

    #[test]
    fn test_next_run_tomorrow_when_passed_or_equal() {
        let time = parse_daily_time("09:45").unwrap();
        assert_eq!(next_run_after(at(15, 9, 45), time), at(16, 9, 45));
        assert_eq!(next_run_after(at(15, 22, 0), time), at(16, 9, 45));
    }

    #[test]
    fn test_next_run_crosses_month() {
        let time = parse_daily_time("07:00").unwrap();
        let expected = NaiveDate::from_ymd_opt(2026, 11, 1)
            .unwrap()
            .and_hms_opt(7, 0, 0)
            .unwrap();
        assert_eq!(next_run_after(at(31, 8, 0), time), expected);
    }

    #[test]
    fn test_parse_daily_time_rejects_garbage() {
        assert!(parse_daily_time("9.45").is_err());
        assert!(parse_daily_time("25:00").is_err());
        assert!(parse_daily_time(" 23:59 ").is_ok());
    }
}
