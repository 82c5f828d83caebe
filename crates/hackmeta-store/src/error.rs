use std::time::Duration;

use hackmeta_types::ContentId;

use crate::types::UploadReceipt;

/// Errors from content store operations.
#[derive(Debug, thiserror::Error)]
pub enum StoreError {
    /// The storage network could not be reached, or is misconfigured.
    #[error("storage unavailable: {0}")]
    StorageUnavailable(String),

    /// Upload rejected or broken for a reason other than reachability.
    #[error("upload of {path} failed: {reason}")]
    UploadFailed { path: String, reason: String },

    /// Content could not be resolved, read, or decoded.
    #[error("retrieval of {cid} failed: {reason}")]
    RetrievalFailed { cid: ContentId, reason: String },

    /// Pin request failed. When the content had just been uploaded,
    /// `uploaded` carries its receipt so the caller can retry the pin.
    #[error("pin of {cid} failed: {reason}")]
    PinFailed {
        cid: ContentId,
        reason: String,
        uploaded: Option<UploadReceipt>,
    },

    /// A batch upload stopped partway. `completed` holds the entries that
    /// were stored before `source` occurred; nothing was rolled back.
    #[error("batch upload failed after {} entries: {source}", .completed.len())]
    BatchFailed {
        completed: Vec<UploadReceipt>,
        source: Box<StoreError>,
    },

    #[error("invalid content identifier: {0:?}")]
    InvalidContentId(String),

    /// A single attempt exceeded its deadline.
    #[error("{operation} timed out after {after:?}")]
    Timeout { operation: String, after: Duration },

    /// Non-success HTTP status from the storage API, before classification.
    #[error("server returned {status}: {message}")]
    Server { status: u16, message: String },

    #[error("configuration error: {0}")]
    Configuration(String),

    #[error("serialization error: {0}")]
    Serialization(String),
}

impl StoreError {
    /// Whether another attempt of the same request may succeed.
    pub fn is_transient(&self) -> bool {
        match self {
            Self::StorageUnavailable(_) | Self::Timeout { .. } => true,
            Self::Server { status, .. } => *status >= 500 || *status == 429,
            _ => false,
        }
    }

    /// Receipt of content that was stored even though the operation failed.
    pub fn uploaded_receipt(&self) -> Option<&UploadReceipt> {
        match self {
            Self::PinFailed { uploaded, .. } => uploaded.as_ref(),
            _ => None,
        }
    }

    /// Entries a failed batch managed to store.
    pub fn completed_entries(&self) -> &[UploadReceipt] {
        match self {
            Self::BatchFailed { completed, .. } => completed,
            _ => &[],
        }
    }

    /// Classify a final upload error. Reachability keeps its kind;
    /// everything else, timeouts included, becomes `UploadFailed`.
    pub fn into_upload_failure(self, path: &str) -> Self {
        match self {
            Self::StorageUnavailable(_)
            | Self::UploadFailed { .. }
            | Self::BatchFailed { .. }
            | Self::Configuration(_) => self,
            other => Self::UploadFailed {
                path: path.to_string(),
                reason: other.to_string(),
            },
        }
    }

    /// Classify a final fetch error.
    pub fn into_retrieval_failure(self, cid: &ContentId) -> Self {
        match self {
            Self::StorageUnavailable(_)
            | Self::RetrievalFailed { .. }
            | Self::Configuration(_) => self,
            other => Self::RetrievalFailed {
                cid: cid.clone(),
                reason: other.to_string(),
            },
        }
    }

    /// Classify a final pin error. Every pin failure is `PinFailed`.
    pub fn into_pin_failure(self, cid: &ContentId) -> Self {
        match self {
            Self::PinFailed { .. } => self,
            other => Self::PinFailed {
                cid: cid.clone(),
                reason: other.to_string(),
                uploaded: None,
            },
        }
    }

    /// Attach the receipt of the content whose pin failed.
    pub fn with_uploaded(self, receipt: UploadReceipt) -> Self {
        match self {
            Self::PinFailed { cid, reason, .. } => Self::PinFailed {
                cid,
                reason,
                uploaded: Some(receipt),
            },
            other => Self::PinFailed {
                cid: receipt.cid.clone(),
                reason: other.to_string(),
                uploaded: Some(receipt),
            },
        }
    }
}

/// Result alias for store operations.
pub type StoreResult<T> = Result<T, StoreError>;

#[cfg(test)]
mod tests {
    use super::*;

    fn receipt() -> UploadReceipt {
        UploadReceipt {
            cid: ContentId::new("QmTest"),
            path: "a.json".into(),
            size: 3,
            url: "https://ipfs.io/ipfs/QmTest".into(),
        }
    }

    #[test]
    fn transient_classification() {
        assert!(StoreError::StorageUnavailable("down".into()).is_transient());
        assert!(StoreError::Timeout { operation: "add".into(), after: Duration::from_secs(1) }.is_transient());
        assert!(StoreError::Server { status: 503, message: String::new() }.is_transient());
        assert!(StoreError::Server { status: 429, message: String::new() }.is_transient());
        assert!(!StoreError::Server { status: 400, message: String::new() }.is_transient());
        assert!(!StoreError::InvalidContentId("x".into()).is_transient());
    }

    #[test]
    fn upload_failure_keeps_reachability() {
        let err = StoreError::StorageUnavailable("refused".into()).into_upload_failure("a.json");
        assert!(matches!(err, StoreError::StorageUnavailable(_)));

        let err = StoreError::Server { status: 400, message: "bad".into() }.into_upload_failure("a.json");
        assert!(matches!(err, StoreError::UploadFailed { ref path, .. } if path == "a.json"));
    }

    #[test]
    fn upload_timeout_becomes_upload_failed() {
        let err = StoreError::Timeout { operation: "add".into(), after: Duration::from_millis(50) }
            .into_upload_failure("a.json");
        match err {
            StoreError::UploadFailed { path, reason } => {
                assert_eq!(path, "a.json");
                assert!(reason.contains("timed out"), "{reason}");
            }
            other => panic!("expected UploadFailed, got {other:?}"),
        }

        let cid = ContentId::new("QmTest");
        let err = StoreError::Timeout { operation: "cat".into(), after: Duration::from_millis(50) }
            .into_retrieval_failure(&cid);
        assert!(matches!(err, StoreError::RetrievalFailed { .. }));
    }

    #[test]
    fn pin_failure_always_pin_failed() {
        let cid = ContentId::new("QmTest");
        let err = StoreError::StorageUnavailable("refused".into()).into_pin_failure(&cid);
        assert!(matches!(err, StoreError::PinFailed { uploaded: None, .. }));
    }

    #[test]
    fn with_uploaded_attaches_receipt() {
        let cid = ContentId::new("QmTest");
        let err = StoreError::PinFailed { cid, reason: "nope".into(), uploaded: None }
            .with_uploaded(receipt());
        assert_eq!(err.uploaded_receipt(), Some(&receipt()));

        let err = StoreError::Timeout { operation: "pin".into(), after: Duration::from_secs(2) }
            .with_uploaded(receipt());
        assert!(matches!(err, StoreError::PinFailed { .. }));
        assert_eq!(err.uploaded_receipt().map(|r| r.cid.as_str()), Some("QmTest"));
    }

    #[test]
    fn batch_failed_reports_completed() {
        let err = StoreError::BatchFailed {
            completed: vec![receipt()],
            source: Box::new(StoreError::UploadFailed { path: "b".into(), reason: "reset".into() }),
        };
        assert_eq!(err.completed_entries().len(), 1);
        assert!(err.to_string().starts_with("batch upload failed after 1 entries"));
    }
}
