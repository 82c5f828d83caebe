use std::collections::BTreeMap;
use std::fmt;

use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::error::TypeError;

/// Schema version written into every newly constructed record.
pub const SCHEMA_VERSION: &str = "1.0.0";

/// JSON members a reader did not recognise, kept so they are written back.
pub type Extensions = BTreeMap<String, serde_json::Value>;

/// The kind of record stored.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum RecordKind {
    Hackathon,
    Project,
    Score,
}

impl fmt::Display for RecordKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Hackathon => write!(f, "hackathon"),
            Self::Project => write!(f, "project"),
            Self::Score => write!(f, "score"),
        }
    }
}

/// A document that can be persisted as a standalone JSON blob.
pub trait Record: Serialize + DeserializeOwned + Send + Sync {
    const KIND: RecordKind;

    /// Identifier stem used when naming the uploaded file.
    fn record_id(&self) -> String;

    /// Schema version carried by the record.
    fn version(&self) -> &str;

    /// Pretty-printed JSON with two-space indentation.
    fn to_pretty_json(&self) -> Result<String, TypeError> {
        serde_json::to_string_pretty(self).map_err(|e| TypeError::Serialization(e.to_string()))
    }

    fn from_json(json: &str) -> Result<Self, TypeError> {
        serde_json::from_str(json).map_err(|e| TypeError::Serialization(e.to_string()))
    }
}

/// Form fields arrive as empty strings when the user skipped them.
pub(crate) fn non_blank(value: Option<String>) -> Option<String> {
    value
        .map(|v| v.trim().to_string())
        .filter(|v| !v.is_empty())
}

pub(crate) fn or_generated_id(value: Option<String>, kind: RecordKind) -> String {
    non_blank(value).unwrap_or_else(|| format!("{kind}-{}", Uuid::now_v7()))
}

/// Trim labels, drop blanks, and drop repeats keeping the first occurrence.
pub(crate) fn dedup_labels(labels: Vec<String>) -> Vec<String> {
    let mut out: Vec<String> = Vec::with_capacity(labels.len());
    for label in labels {
        let label = label.trim();
        if !label.is_empty() && !out.iter().any(|l| l == label) {
            out.push(label.to_string());
        }
    }
    out
}
