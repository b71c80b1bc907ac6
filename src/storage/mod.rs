//! Result sinks.
//!
//! Every run hands the same [`ResultSet`] to each sink in turn:
//!
//! - `local`: JSON backup file, overwritten each run
//! - `sqlite`: database table, replaced wholesale each run
//!
//! Sinks are independent. A failing sink is reported and the remaining
//! sinks still run.

pub mod local;
pub mod sqlite;

use async_trait::async_trait;

use crate::error::Result;
use crate::models::ResultSet;

// Re-export for convenience
pub use local::JsonBackup;
pub use sqlite::SqliteSink;

/// What a sink did with a result set.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Publication {
    /// Results were written
    Written {
        count: usize,
        location: String,
        /// Prior records removed, for sinks that replace
        replaced: Option<u64>,
    },
    /// The sink chose not to write
    Skipped { reason: String },
}

/// Trait for result set destinations.
#[async_trait]
pub trait ResultSink: Send + Sync {
    /// Short name used in logs and reports.
    fn name(&self) -> &str;

    /// Publish the finished result set.
    async fn publish(&self, results: &ResultSet) -> Result<Publication>;
}

/// Outcome of publishing to one sink.
#[derive(Debug)]
pub struct SinkReport {
    pub sink: String,
    pub result: std::result::Result<Publication, String>,
}

impl SinkReport {
    pub fn is_ok(&self) -> bool {
        self.result.is_ok()
    }
}

/// Publish to every sink. A failure is logged and recorded, never propagated.
pub async fn publish_all(sinks: &[Box<dyn ResultSink>], results: &ResultSet) -> Vec<SinkReport> {
    let mut reports = Vec::with_capacity(sinks.len());

    for sink in sinks {
        let result = match sink.publish(results).await {
            Ok(publication) => {
                match &publication {
                    Publication::Written {
                        count,
                        location,
                        replaced,
                    } => {
                        if let Some(replaced) = replaced {
                            log::info!(
                                "{}: replaced {} records with {} at {}",
                                sink.name(),
                                replaced,
                                count,
                                location
                            );
                        } else {
                            log::info!("{}: wrote {} records to {}", sink.name(), count, location);
                        }
                    }
                    Publication::Skipped { reason } => {
                        log::warn!("{}: skipped ({})", sink.name(), reason);
                    }
                }
                Ok(publication)
            }
            Err(error) => {
                log::error!("{}: publish failed: {}", sink.name(), error);
                Err(error.to_string())
            }
        };

        reports.push(SinkReport {
            sink: sink.name().to_string(),
            result,
        });
    }

    reports
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::AppError;

    struct Broken;

    #[async_trait]
    impl ResultSink for Broken {
        fn name(&self) -> &str {
            "broken"
        }

        async fn publish(&self, _results: &ResultSet) -> Result<Publication> {
            Err(AppError::sink("broken", "connection refused"))
        }
    }

    struct Counting;

    #[async_trait]
    impl ResultSink for Counting {
        fn name(&self) -> &str {
            "counting"
        }

        async fn publish(&self, results: &ResultSet) -> Result<Publication> {
            Ok(Publication::Written {
                count: results.len(),
                location: "memory".into(),
                replaced: None,
            })
        }
    }

    #[tokio::test]
    async fn test_failed_sink_does_not_block_others() {
        let sinks: Vec<Box<dyn ResultSink>> = vec![Box::new(Broken), Box::new(Counting)];
        let reports = publish_all(&sinks, &ResultSet::default()).await;

        assert_eq!(reports.len(), 2);
        assert!(!reports[0].is_ok());
        assert!(reports[0].result.as_ref().unwrap_err().contains("connection refused"));
        assert_eq!(
            reports[1].result,
            Ok(Publication::Written {
                count: 0,
                location: "memory".into(),
                replaced: None
            })
        );
    }
}
