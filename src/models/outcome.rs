//! Per-scheme outcomes and run-level summaries.

use std::fmt;

use chrono::{DateTime, NaiveDate, Utc};
use serde::{Deserialize, Serialize};

use super::scheme::RecordRef;

/// Textual format of NAV observation dates (`DD-MM-YYYY`).
pub const NAV_DATE_FORMAT: &str = "%d-%m-%Y";

/// An active scheme: fetched successfully and recent enough to publish.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct DetailResult {
    /// Scheme code
    #[serde(rename = "code")]
    pub identifier: RecordRef,

    /// Scheme name, `"N/A"` when the API omits it
    #[serde(rename = "name")]
    pub display_name: String,

    /// Latest NAV
    #[serde(rename = "nav")]
    pub value: f64,

    /// Date of the latest NAV
    #[serde(rename = "date", with = "nav_date")]
    pub observed_at: NaiveDate,

    /// When this scheme was processed
    #[serde(rename = "last_updated_on")]
    pub recorded_at: DateTime<Utc>,
}

/// Why a scheme was filtered out. Rejections are normal outcomes, not faults.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RejectReason {
    /// Detail list missing, not an array, or empty
    NoDetails,
    /// Latest entry's date is not `DD-MM-YYYY`
    MalformedDate(String),
    /// Latest entry's NAV is not a non-negative number
    MalformedValue(String),
    /// Latest NAV is older than the recency threshold
    Stale { observed: NaiveDate },
    /// Master-list entry carried no scheme code
    MissingIdentifier,
    /// Master-list entry repeats a code already dispatched
    Duplicate(RecordRef),
}

impl RejectReason {
    pub fn is_stale(&self) -> bool {
        matches!(self, Self::Stale { .. })
    }
}

impl fmt::Display for RejectReason {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::NoDetails => write!(f, "no NAV data"),
            Self::MalformedDate(raw) => write!(f, "unparseable NAV date '{raw}'"),
            Self::MalformedValue(raw) => write!(f, "invalid NAV value '{raw}'"),
            Self::Stale { observed } => {
                write!(f, "stale NAV dated {}", observed.format(NAV_DATE_FORMAT))
            }
            Self::MissingIdentifier => write!(f, "missing scheme code"),
            Self::Duplicate(code) => write!(f, "duplicate scheme code {code}"),
        }
    }
}

/// Terminal classification of one scheme. Exactly one per scheme per run.
#[derive(Debug, Clone, PartialEq)]
pub enum FetchOutcome {
    Accepted(DetailResult),
    Rejected(RejectReason),
    /// Every attempt hit a transient fault; carries the last one
    Failed { attempts: u32, last_error: String },
}

impl FetchOutcome {
    pub fn is_accepted(&self) -> bool {
        matches!(self, Self::Accepted(_))
    }

    pub fn label(&self) -> &'static str {
        match self {
            Self::Accepted(_) => "accepted",
            Self::Rejected(_) => "rejected",
            Self::Failed { .. } => "failed",
        }
    }
}

/// Counts for a finished run.
///
/// `rejected` and `failed` together make up the non-accepted remainder, so
/// `accepted + other() == total` always holds for a summary built by
/// [`RunSummary::record`].
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct RunSummary {
    pub total: usize,
    pub accepted: usize,
    pub rejected: usize,
    pub failed: usize,
    /// Subset of `rejected` that was stale rather than malformed
    pub stale: usize,
}

impl RunSummary {
    /// Count one outcome.
    pub fn record(&mut self, outcome: &FetchOutcome) {
        self.total += 1;
        match outcome {
            FetchOutcome::Accepted(_) => self.accepted += 1,
            FetchOutcome::Rejected(reason) => {
                self.rejected += 1;
                if reason.is_stale() {
                    self.stale += 1;
                }
            }
            FetchOutcome::Failed { .. } => self.failed += 1,
        }
    }

    /// Inactive or failed schemes.
    pub fn other(&self) -> usize {
        self.total - self.accepted
    }

    /// Whether every counted outcome falls in exactly one bucket.
    pub fn is_consistent(&self) -> bool {
        self.accepted + self.rejected + self.failed == self.total
    }
}

/// Accepted results of one run, in completion order.
///
/// Built fresh per run by the aggregator and handed to every sink as-is.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
#[serde(transparent)]
pub struct ResultSet {
    results: Vec<DetailResult>,
}

impl ResultSet {
    pub fn new(results: Vec<DetailResult>) -> Self {
        Self { results }
    }

    pub fn len(&self) -> usize {
        self.results.len()
    }

    pub fn is_empty(&self) -> bool {
        self.results.is_empty()
    }

    pub fn iter(&self) -> std::slice::Iter<'_, DetailResult> {
        self.results.iter()
    }

    pub fn as_slice(&self) -> &[DetailResult] {
        &self.results
    }
}

impl<'a> IntoIterator for &'a ResultSet {
    type Item = &'a DetailResult;
    type IntoIter = std::slice::Iter<'a, DetailResult>;

    fn into_iter(self) -> Self::IntoIter {
        self.results.iter()
    }
}

/// Serde adapter for `DD-MM-YYYY` dates.
mod nav_date {
    use chrono::NaiveDate;
    use serde::{Deserialize, Deserializer, Serializer, de::Error};

    use super::NAV_DATE_FORMAT;

    pub fn serialize<S: Serializer>(date: &NaiveDate, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.collect_str(&date.format(NAV_DATE_FORMAT))
    }

    pub fn deserialize<'de, D: Deserializer<'de>>(deserializer: D) -> Result<NaiveDate, D::Error> {
        let raw = String::deserialize(deserializer)?;
        NaiveDate::parse_from_str(&raw, NAV_DATE_FORMAT).map_err(D::Error::custom)
    }
}
