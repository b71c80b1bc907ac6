//! Wire shapes of the scheme API and the identifiers derived from them.

use std::fmt;

use serde::{Deserialize, Serialize};
use serde_json::Value;

/// One entry of the master scheme list.
///
/// Only `schemeCode` is read; every other field is ignored so one odd
/// entry cannot break the whole list. The code arrives as a number from
/// the public API but is accepted as a string too.
#[derive(Debug, Clone, Deserialize, Serialize, Default)]
pub struct MasterEntry {
    #[serde(rename = "schemeCode", default)]
    pub scheme_code: Option<Value>,
}

impl MasterEntry {
    /// The scheme reference for this entry, if it carries a usable code.
    pub fn record_ref(&self) -> Option<RecordRef> {
        match self.scheme_code.as_ref()? {
            Value::Number(n) => RecordRef::new(n.to_string()),
            Value::String(s) => RecordRef::new(s),
            _ => None,
        }
    }
}

/// Identifier of one scheme to fetch. Never empty.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct RecordRef(String);

impl RecordRef {
    /// Build a reference, trimming whitespace. Returns `None` for empty codes.
    pub fn new(code: impl AsRef<str>) -> Option<Self> {
        let code = code.as_ref().trim();
        if code.is_empty() {
            None
        } else {
            Some(Self(code.to_string()))
        }
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for RecordRef {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// Body of `GET {base_url}/{code}`.
///
/// `data` stays untyped so that a missing or non-array value can be told
/// apart from a malformed body.
#[derive(Debug, Clone, Deserialize, Default)]
pub struct SchemeDetail {
    #[serde(default)]
    pub meta: Option<SchemeMeta>,

    #[serde(default)]
    pub data: Option<Value>,
}

/// Scheme metadata block.
#[derive(Debug, Clone, Deserialize, Default)]
pub struct SchemeMeta {
    #[serde(default)]
    pub scheme_name: Option<String>,
}

/// One NAV observation; the API lists the latest first.
#[derive(Debug, Clone, Deserialize, Default)]
pub struct NavEntry {
    #[serde(default)]
    pub date: Option<String>,

    #[serde(default)]
    pub nav: Option<Value>,
}

impl SchemeDetail {
    /// The latest NAV entry, or `None` when the list is absent, not an
    /// array, or empty.
    pub fn latest(&self) -> Option<NavEntry> {
        let first = self.data.as_ref()?.as_array()?.first()?;
        Some(serde_json::from_value(first.clone()).unwrap_or_default())
    }

    /// Scheme display name, `"N/A"` when the API omits it.
    pub fn display_name(&self) -> String {
        self.meta
            .as_ref()
            .and_then(|m| m.scheme_name.as_deref())
            .map(str::trim)
            .filter(|name| !name.is_empty())
            .unwrap_or("N/A")
            .to_string()
    }
}

impl NavEntry {
    /// NAV as a number. The API sends it as a decimal string.
    pub fn value(&self) -> Option<f64> {
        let value = match self.nav.as_ref()? {
            Value::String(s) => s.trim().parse::<f64>().ok()?,
            Value::Number(n) => n.as_f64()?,
            _ => return None,
        };
        (value.is_finite() && value >= 0.0).then_some(value)
    }

    /// Raw NAV text for log messages.
    pub fn raw_value(&self) -> String {
        match &self.nav {
            Some(Value::String(s)) => s.clone(),
            Some(other) => other.to_string(),
            None => String::new(),
        }
    }
}
