// src/services/master.rs

//! Master scheme list retrieval.

use std::collections::HashSet;

use reqwest::Client;
use url::Url;

use crate::error::{AppError, Result};
use crate::models::{MasterEntry, MissingIdPolicy, RecordRef, RejectReason};

/// Fetch the full scheme catalog.
///
/// Any failure is fatal for the run: a partial catalog is never used.
pub async fn fetch_master_list(client: &Client, base_url: &Url) -> Result<Vec<MasterEntry>> {
    let response = client
        .get(base_url.clone())
        .send()
        .await
        .map_err(AppError::master_list)?;

    let status = response.status();
    if !status.is_success() {
        return Err(AppError::master_list(format!(
            "HTTP {} from {}",
            status, base_url
        )));
    }

    response
        .json::<Vec<MasterEntry>>()
        .await
        .map_err(|e| AppError::master_list(format!("invalid master list body: {e}")))
}

/// Scheme references ready for dispatch.
#[derive(Debug, Default)]
pub struct PreparedRefs {
    /// Unique references in master-list order
    pub refs: Vec<RecordRef>,
    /// Entries without a usable scheme code
    pub missing: usize,
    /// Repeats of an earlier code; the code is fetched once and each
    /// repeat is reported as rejected
    pub duplicates: Vec<RecordRef>,
    pub policy: MissingIdPolicy,
}

impl PreparedRefs {
    /// Outcomes this run will account for.
    pub fn total(&self) -> usize {
        self.refs.len() + self.duplicates.len() + self.counted_missing()
    }

    /// Entries lacking a code that must be reported as rejected.
    pub fn counted_missing(&self) -> usize {
        match self.policy {
            MissingIdPolicy::Count => self.missing,
            MissingIdPolicy::Exclude => 0,
        }
    }

    /// Outcomes decided without a fetch: missing codes under
    /// [`MissingIdPolicy::Count`], then every duplicate.
    pub fn pre_rejections(&self) -> impl Iterator<Item = RejectReason> + '_ {
        std::iter::repeat_n(RejectReason::MissingIdentifier, self.counted_missing()).chain(
            self.duplicates
                .iter()
                .map(|record| RejectReason::Duplicate(record.clone())),
        )
    }
}

/// Extract unique scheme references from the master list.
pub fn prepare_refs(entries: &[MasterEntry], policy: MissingIdPolicy) -> PreparedRefs {
    let mut seen = HashSet::new();
    let mut prepared = PreparedRefs {
        policy,
        ..PreparedRefs::default()
    };

    for entry in entries {
        match entry.record_ref() {
            Some(record) if seen.insert(record.clone()) => prepared.refs.push(record),
            Some(record) => {
                log::debug!("Duplicate scheme code {} in master list", record);
                prepared.duplicates.push(record);
            }
            None => prepared.missing += 1,
        }
    }

    prepared
}
