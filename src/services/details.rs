// src/services/details.rs

//! Per-scheme detail fetcher.
//!
//! Fetches `{base_url}/{code}`, classifies the latest NAV entry with the
//! recency rule, and retries transient faults with linear backoff. Every
//! path ends in a [`FetchOutcome`]; nothing is raised to the caller.

use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use chrono::{NaiveDateTime, Utc};
use reqwest::{Client, StatusCode};
use thiserror::Error;
use url::Url;

use crate::models::{Config, DetailResult, FetchOutcome, RecordRef, RejectReason, SchemeDetail};
use crate::pipeline::{Clock, DateRule, Fetch, SystemClock, parse_nav_date};
use crate::services::RetryPolicy;

/// A transient fault on one attempt. Consumes one retry.
#[derive(Debug, Error)]
enum AttemptError {
    #[error("status {0}")]
    Status(StatusCode),

    #[error("timed out")]
    Timeout,

    #[error("request error: {0}")]
    Request(reqwest::Error),

    #[error("unreadable body: {0}")]
    Body(reqwest::Error),
}

impl From<reqwest::Error> for AttemptError {
    fn from(error: reqwest::Error) -> Self {
        if error.is_timeout() {
            Self::Timeout
        } else {
            Self::Request(error)
        }
    }
}

/// Fetches and classifies a single scheme.
pub struct SchemeFetcher {
    client: Client,
    base_url: Url,
    rule: DateRule,
    retry: RetryPolicy,
    request_delay: Duration,
    clock: Arc<dyn Clock>,
}

impl SchemeFetcher {
    pub fn new(client: Client, base_url: Url, rule: DateRule, retry: RetryPolicy) -> Self {
        Self {
            client,
            base_url,
            rule,
            retry,
            request_delay: Duration::ZERO,
            clock: Arc::new(SystemClock),
        }
    }

    /// Build a fetcher from the application configuration.
    pub fn from_config(config: &Config, client: Client) -> crate::error::Result<Self> {
        Ok(Self::new(
            client,
            config.api.base_url()?,
            DateRule::new(config.filter.threshold_days),
            RetryPolicy::from_config(&config.fetch),
        )
        .with_request_delay(config.fetch.request_delay()))
    }

    /// Pause before the first attempt of every scheme.
    pub fn with_request_delay(mut self, delay: Duration) -> Self {
        self.request_delay = delay;
        self
    }

    /// Evaluate the recency rule against a different clock.
    pub fn with_clock(mut self, clock: Arc<dyn Clock>) -> Self {
        self.clock = clock;
        self
    }

    /// Detail endpoint for one scheme.
    pub fn endpoint(&self, record: &RecordRef) -> Url {
        let mut url = self.base_url.clone();
        if let Ok(mut segments) = url.path_segments_mut() {
            segments.pop_if_empty().push(record.as_str());
        }
        url
    }

    /// One request. `Ok` means a 200 with a well-formed body.
    async fn attempt(&self, url: &Url) -> Result<SchemeDetail, AttemptError> {
        let response = self.client.get(url.clone()).send().await?;

        let status = response.status();
        if status != StatusCode::OK {
            return Err(AttemptError::Status(status));
        }

        response.json::<SchemeDetail>().await.map_err(|e| {
            if e.is_timeout() {
                AttemptError::Timeout
            } else {
                AttemptError::Body(e)
            }
        })
    }

    /// Classify a successful response. Pure apart from `recorded_at`.
    pub fn classify(
        &self,
        record: &RecordRef,
        detail: &SchemeDetail,
        now: NaiveDateTime,
    ) -> FetchOutcome {
        let Some(latest) = detail.latest() else {
            return FetchOutcome::Rejected(RejectReason::NoDetails);
        };

        let raw_date = latest.date.clone().unwrap_or_default();
        let Some(observed) = parse_nav_date(&raw_date) else {
            return FetchOutcome::Rejected(RejectReason::MalformedDate(raw_date));
        };

        if !self.rule.is_recent(observed, now) {
            return FetchOutcome::Rejected(RejectReason::Stale { observed });
        }

        let Some(value) = latest.value() else {
            return FetchOutcome::Rejected(RejectReason::MalformedValue(latest.raw_value()));
        };

        FetchOutcome::Accepted(DetailResult {
            identifier: record.clone(),
            display_name: detail.display_name(),
            value,
            observed_at: observed,
            recorded_at: Utc::now(),
        })
    }
}

#[async_trait]
impl Fetch for SchemeFetcher {
    async fn fetch(&self, record: &RecordRef) -> FetchOutcome {
        let url = self.endpoint(record);
        let attempts = self.retry.attempts();

        if !self.request_delay.is_zero() {
            tokio::time::sleep(self.request_delay).await;
        }

        let mut last_error = String::new();
        for attempt in 1..=attempts {
            match self.attempt(&url).await {
                Ok(detail) => {
                    let outcome = self.classify(record, &detail, self.clock.now());
                    if let FetchOutcome::Rejected(reason) = &outcome {
                        log::debug!("Scheme {}: rejected ({})", record, reason);
                    }
                    return outcome;
                }
                Err(error) => {
                    log::warn!(
                        "Scheme {}: {} (attempt {}/{})",
                        record,
                        error,
                        attempt,
                        attempts
                    );
                    last_error = error.to_string();
                }
            }

            if let Some(delay) = self.retry.backoff(attempt) {
                tokio::time::sleep(delay).await;
            }
        }

        log::error!(
            "Scheme {}: failed permanently after {} attempts: {}",
            record,
            attempts,
            last_error
        );
        FetchOutcome::Failed {
            attempts,
            last_error,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::pipeline::FixedClock;
    use chrono::NaiveDate;
    use serde_json::json;
    use wiremock::matchers::{method, path};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    fn now() -> NaiveDateTime {
        NaiveDate::from_ymd_opt(2026, 10, 15)
            .unwrap()
            .and_hms_opt(9, 45, 0)
            .unwrap()
    }

    fn fetcher_for(server: &MockServer, attempts: u32) -> SchemeFetcher {
        let base = Url::parse(&format!("{}/mf", server.uri())).unwrap();
        SchemeFetcher::new(
            Client::new(),
            base,
            DateRule::new(14),
            RetryPolicy::new(attempts, Duration::from_millis(5)),
        )
        .with_clock(Arc::new(FixedClock(now())))
    }

    fn scheme(code: &str) -> RecordRef {
        RecordRef::new(code).unwrap()
    }

    #[test]
    fn test_endpoint_appends_code() {
        let fetcher = SchemeFetcher::new(
            Client::new(),
            Url::parse("https://api.mfapi.in/mf").unwrap(),
            DateRule::new(14),
            RetryPolicy::new(1, Duration::ZERO),
        );
        assert_eq!(
            fetcher.endpoint(&scheme("119551")).as_str(),
            "https://api.mfapi.in/mf/119551"
        );
    }

    #[test]
    fn test_classify_variants() {
        let fetcher = SchemeFetcher::new(
            Client::new(),
            Url::parse("https://api.mfapi.in/mf").unwrap(),
            DateRule::new(14),
            RetryPolicy::new(1, Duration::ZERO),
        );
        let code = scheme("1");
        let classify = |body: serde_json::Value| {
            let detail: SchemeDetail = serde_json::from_value(body).unwrap();
            fetcher.classify(&code, &detail, now())
        };

        match classify(json!({"meta": {"scheme_name": "Fresh"}, "data": [{"date": "15-10-2026", "nav": "10.5"}]})) {
            FetchOutcome::Accepted(result) => {
                assert_eq!(result.display_name, "Fresh");
                assert_eq!(result.value, 10.5);
                assert_eq!(result.observed_at, now().date());
            }
            other => panic!("expected accepted, got {other:?}"),
        }

        assert_eq!(
            classify(json!({"data": []})),
            FetchOutcome::Rejected(RejectReason::NoDetails)
        );
        assert_eq!(
            classify(json!({"data": [{"date": "2026/10/15", "nav": "1"}]})),
            FetchOutcome::Rejected(RejectReason::MalformedDate("2026/10/15".to_string()))
        );
        assert_eq!(
            classify(json!({"data": [{"date": "30-09-2026", "nav": "1"}]})),
            FetchOutcome::Rejected(RejectReason::Stale {
                observed: NaiveDate::from_ymd_opt(2026, 9, 30).unwrap()
            })
        );
        assert_eq!(
            classify(json!({"data": [{"date": "14-10-2026", "nav": "N.A."}]})),
            FetchOutcome::Rejected(RejectReason::MalformedValue("N.A.".to_string()))
        );
    }

    #[tokio::test]
    async fn test_fetch_accepts_recent_scheme() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/mf/100027"))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({
                "meta": {"scheme_name": "Alpha Growth"},
                "data": [{"date": "01-10-2026", "nav": "45.1200"}]
            })))
            .expect(1)
            .mount(&server)
            .await;

        let outcome = fetcher_for(&server, 4).fetch(&scheme("100027")).await;
        let FetchOutcome::Accepted(result) = outcome else {
            panic!("expected accepted outcome");
        };
        assert_eq!(result.identifier.as_str(), "100027");
        assert_eq!(result.display_name, "Alpha Growth");
        assert_eq!(result.value, 45.12);
    }

    #[tokio::test]
    async fn test_fetch_empty_details_rejected_without_retry() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/mf/200"))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({"meta": {}, "data": []})))
            .expect(1)
            .mount(&server)
            .await;
        Mock::given(method("GET"))
            .and(path("/mf/201"))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({"status": "SUCCESS"})))
            .expect(1)
            .mount(&server)
            .await;

        let fetcher = fetcher_for(&server, 4);
        assert_eq!(
            fetcher.fetch(&scheme("200")).await,
            FetchOutcome::Rejected(RejectReason::NoDetails)
        );
        assert_eq!(
            fetcher.fetch(&scheme("201")).await,
            FetchOutcome::Rejected(RejectReason::NoDetails)
        );
    }

    #[tokio::test]
    async fn test_fetch_stale_rejected_without_retry() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/mf/300"))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({
                "data": [{"date": "01-01-2024", "nav": "9.0"}]
            })))
            .expect(1)
            .mount(&server)
            .await;

        let outcome = fetcher_for(&server, 4).fetch(&scheme("300")).await;
        assert!(matches!(
            outcome,
            FetchOutcome::Rejected(RejectReason::Stale { .. })
        ));
    }

    #[tokio::test]
    async fn test_fetch_persistent_500_fails_after_all_attempts() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/mf/500"))
            .respond_with(ResponseTemplate::new(500))
            .expect(4)
            .mount(&server)
            .await;

        let outcome = fetcher_for(&server, 4).fetch(&scheme("500")).await;
        match outcome {
            FetchOutcome::Failed {
                attempts,
                last_error,
            } => {
                assert_eq!(attempts, 4);
                assert!(last_error.contains("500"));
            }
            other => panic!("expected failed, got {other:?}"),
        }
    }

    #[tokio::test]
    async fn test_fetch_malformed_body_is_retried() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/mf/400"))
            .respond_with(ResponseTemplate::new(200).set_body_string("not json"))
            .expect(3)
            .mount(&server)
            .await;

        let outcome = fetcher_for(&server, 3).fetch(&scheme("400")).await;
        assert!(matches!(outcome, FetchOutcome::Failed { attempts: 3, .. }));
    }

    #[tokio::test]
    async fn test_fetch_recovers_after_transient_fault() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/mf/600"))
            .respond_with(ResponseTemplate::new(503))
            .up_to_n_times(2)
            .expect(2)
            .mount(&server)
            .await;
        Mock::given(method("GET"))
            .and(path("/mf/600"))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({
                "meta": {"scheme_name": "Recovered"},
                "data": [{"date": "15-10-2026", "nav": "1.0"}]
            })))
            .expect(1)
            .mount(&server)
            .await;

        let outcome = fetcher_for(&server, 4).fetch(&scheme("600")).await;
        assert!(outcome.is_accepted());
    }

    #[tokio::test]
    async fn test_fetch_timeout_consumes_retry() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/mf/700"))
            .respond_with(
                ResponseTemplate::new(200)
                    .set_body_json(json!({"data": [{"date": "15-10-2026", "nav": "1"}]}))
                    .set_delay(Duration::from_millis(500)),
            )
            .expect(2)
            .mount(&server)
            .await;

        let client = Client::builder()
            .timeout(Duration::from_millis(50))
            .build()
            .unwrap();
        let base = Url::parse(&format!("{}/mf", server.uri())).unwrap();
        let fetcher = SchemeFetcher::new(
            client,
            base,
            DateRule::new(14),
            RetryPolicy::new(2, Duration::from_millis(5)),
        );

        let outcome = fetcher.fetch(&scheme("700")).await;
        assert!(matches!(outcome, FetchOutcome::Failed { attempts: 2, ref last_error } if last_error == "timed out"));
    }
}
