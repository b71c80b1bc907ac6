//! Bounded-concurrency dispatch of scheme fetches.
//!
//! A producer task walks the scheme list, acquiring a permit from the gate
//! before spawning each fetch. The permit travels with the fetch and is
//! returned once its outcome has been handed to the consumer, so no more
//! than `capacity` fetches exist at any time. Outcomes arrive on a single
//! channel in completion order.

use std::panic::AssertUnwindSafe;
use std::sync::Arc;

use async_trait::async_trait;
use futures::FutureExt;
use tokio::sync::{Semaphore, mpsc};
use tokio_stream::wrappers::ReceiverStream;

use crate::models::{FetchOutcome, RecordRef};

/// Produces exactly one outcome for a scheme and never fails.
#[async_trait]
pub trait Fetch: Send + Sync + 'static {
    async fn fetch(&self, record: &RecordRef) -> FetchOutcome;
}

/// One finished fetch.
#[derive(Debug, Clone)]
pub struct Completion {
    pub record: RecordRef,
    pub outcome: FetchOutcome,
}

/// Runs fetches under a counting permit gate.
#[derive(Debug, Clone)]
pub struct BoundedDispatcher {
    gate: Arc<Semaphore>,
    capacity: usize,
}

impl BoundedDispatcher {
    /// `capacity` is clamped to at least one.
    pub fn new(capacity: usize) -> Self {
        let capacity = capacity.max(1);
        Self {
            gate: Arc::new(Semaphore::new(capacity)),
            capacity,
        }
    }

    /// Permits currently free.
    pub fn available(&self) -> usize {
        self.gate.available_permits()
    }

    /// Fetch every scheme, yielding one [`Completion`] per input in
    /// completion order. The stream ends once every fetch has reported.
    pub fn run<F: Fetch>(&self, refs: Vec<RecordRef>, fetcher: Arc<F>) -> ReceiverStream<Completion> {
        let (tx, rx) = mpsc::channel(self.capacity);
        let gate = Arc::clone(&self.gate);

        tokio::spawn(async move {
            for record in refs {
                // The gate is never closed, so this only waits.
                let Ok(permit) = Arc::clone(&gate).acquire_owned().await else {
                    break;
                };
                let tx = tx.clone();
                let fetcher = Arc::clone(&fetcher);

                tokio::spawn(async move {
                    let outcome = AssertUnwindSafe(fetcher.fetch(&record))
                        .catch_unwind()
                        .await
                        .unwrap_or_else(|_| {
                            log::error!("Scheme {}: fetch panicked", record);
                            FetchOutcome::Failed {
                                attempts: 0,
                                last_error: "fetch panicked".to_string(),
                            }
                        });

                    if tx.send(Completion { record, outcome }).await.is_err() {
                        log::debug!("Completion dropped: consumer went away");
                    }
                    drop(permit);
                });
            }
        });

        ReceiverStream::new(rx)
    }
}
