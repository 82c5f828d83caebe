use hackmeta_store::{StoreError, UploadReceipt};
use hackmeta_types::{ContentId, RecordKind, TypeError};
use thiserror::Error;

use crate::stage::RecordStage;

#[derive(Debug, Error)]
pub enum SdkError {
    #[error("store error: {0}")]
    Store(#[from] StoreError),

    #[error("record error: {0}")]
    Types(#[from] TypeError),

    #[error("cannot serialize {kind} {id}: {reason}")]
    Serialize {
        kind: RecordKind,
        id: String,
        reason: String,
    },

    #[error("content {cid} is not a {kind} record: {reason}")]
    Decode {
        cid: ContentId,
        kind: RecordKind,
        reason: String,
    },

    #[error("invalid bundle: {0}")]
    InvalidBundle(String),
}

impl SdkError {
    /// Last stage a record reached before this error stopped its upload.
    /// `None` for errors that do not come from an upload.
    pub fn stage(&self) -> Option<RecordStage> {
        match self {
            Self::Serialize { .. } | Self::Types(_) => Some(RecordStage::Constructed),
            Self::Store(StoreError::PinFailed { uploaded: Some(_), .. }) => Some(RecordStage::PinFailed),
            Self::Store(StoreError::BatchFailed { .. }) => None,
            Self::Store(_) => Some(RecordStage::Serialized),
            Self::Decode { .. } | Self::InvalidBundle(_) => None,
        }
    }

    /// Receipt of content that was stored although the operation failed.
    pub fn uploaded_receipt(&self) -> Option<&UploadReceipt> {
        match self {
            Self::Store(err) => err.uploaded_receipt(),
            _ => None,
        }
    }
}

pub type SdkResult<T> = Result<T, SdkError>;
