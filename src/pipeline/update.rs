// src/pipeline/update.rs

//! Fund update pipeline.
//!
//! master list → bounded fetch → progress + aggregation → sinks

use std::sync::Arc;

use chrono::{DateTime, Utc};
use futures::StreamExt;
use reqwest::Client;

use crate::error::Result;
use crate::models::{Config, FetchOutcome, ResultSet, RunSummary};
use crate::pipeline::{
    BoundedDispatcher, Clock, Completion, ProgressTracker, ResultAggregator, SystemClock,
};
use crate::services::{SchemeFetcher, fetch_master_list, prepare_refs};
use crate::storage::{ResultSink, SinkReport, publish_all};
use crate::utils::http::create_async_client;
use crate::utils::log::{header, sub_item, summary};

/// Results of the fetch and filter stages, before publishing.
#[derive(Debug)]
pub struct CollectedRun {
    pub results: ResultSet,
    pub summary: RunSummary,
    pub started_at: DateTime<Utc>,
    pub finished_at: DateTime<Utc>,
}

/// Everything a finished update produced.
#[derive(Debug)]
pub struct UpdateReport {
    pub results: ResultSet,
    pub summary: RunSummary,
    pub sinks: Vec<SinkReport>,
    pub started_at: DateTime<Utc>,
    pub finished_at: DateTime<Utc>,
}

impl UpdateReport {
    pub fn all_sinks_ok(&self) -> bool {
        self.sinks.iter().all(SinkReport::is_ok)
    }
}

/// Run one full update against the system clock.
pub async fn run_update(config: &Config, sinks: &[Box<dyn ResultSink>]) -> Result<UpdateReport> {
    run_update_with_clock(config, sinks, Arc::new(SystemClock)).await
}

/// Run one full update, evaluating recency against `clock`.
///
/// Configuration problems and an unavailable master list abort the run
/// before any scheme is fetched and before any sink is touched. Sink
/// failures are reported in [`UpdateReport::sinks`] and never abort.
pub async fn run_update_with_clock(
    config: &Config,
    sinks: &[Box<dyn ResultSink>],
    clock: Arc<dyn Clock>,
) -> Result<UpdateReport> {
    config.validate()?;
    let client = create_async_client(config)?;

    header("Fund update starting");
    let collected = collect_active(config, &client, clock).await?;
    log_summary(&collected);

    let sink_reports = publish_all(sinks, &collected.results).await;

    Ok(UpdateReport {
        results: collected.results,
        summary: collected.summary,
        sinks: sink_reports,
        started_at: collected.started_at,
        finished_at: Utc::now(),
    })
}

/// Fetch the master list, then fetch and classify every scheme.
pub async fn collect_active(
    config: &Config,
    client: &Client,
    clock: Arc<dyn Clock>,
) -> Result<CollectedRun> {
    let started_at = Utc::now();
    let base_url = config.api.base_url()?;

    log::info!("Fetching the master list from {}", base_url);
    let entries = fetch_master_list(client, &base_url).await?;
    let prepared = prepare_refs(&entries, config.fetch.missing_id_policy);

    log::info!(
        "Found {} schemes to check ({} without a code, {} duplicates)",
        prepared.total(),
        prepared.missing,
        prepared.duplicates.len()
    );

    let tracker = ProgressTracker::new(prepared.total());
    let mut aggregator = ResultAggregator::new();

    for reason in prepared.pre_rejections() {
        let outcome = FetchOutcome::Rejected(reason);
        tracker.on_completion(&outcome);
        aggregator.add(outcome);
    }

    let fetcher = Arc::new(SchemeFetcher::from_config(config, client.clone())?.with_clock(clock));
    let dispatcher = BoundedDispatcher::new(config.fetch.concurrency);
    let every = config.output.progress_every.max(1);

    let mut completions = dispatcher.run(prepared.refs, fetcher);
    while let Some(Completion { record, outcome }) = completions.next().await {
        log::debug!("Scheme {}: {}", record, outcome.label());
        tracker.on_completion(&outcome);
        aggregator.add(outcome);

        let snapshot = tracker.snapshot();
        if snapshot.processed % every == 0 || snapshot.is_complete() {
            log::info!(
                "Processing: {}/{} funds | Found: {} active",
                snapshot.processed,
                snapshot.total,
                snapshot.accepted
            );
        }
    }

    let (results, summary) = aggregator.finalize();
    debug_assert_eq!(summary.total, tracker.snapshot().total);
    debug_assert!(summary.is_consistent());

    Ok(CollectedRun {
        results,
        summary,
        started_at,
        finished_at: Utc::now(),
    })
}

fn log_summary(run: &CollectedRun) {
    let s = run.summary;
    summary(
        "Final results",
        &[
            ("Total", s.total.to_string()),
            ("Active", s.accepted.to_string()),
            ("Inactive/Failed", s.other().to_string()),
        ],
    );
    sub_item(&format!(
        "{} stale, {} without usable data, {} failed after retries",
        s.stale,
        s.rejected - s.stale,
        s.failed
    ));
    sub_item(&format!(
        "Took {}s",
        (run.finished_at - run.started_at).num_seconds()
    ));
}
