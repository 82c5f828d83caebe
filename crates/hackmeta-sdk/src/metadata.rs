use chrono::{DateTime, Utc};
use hackmeta_store::{ContentStore, StoreError, UploadReceipt};
use hackmeta_types::{
    is_valid_content_id, ContentId, HackathonRecord, JudgeScoreRecord, ProjectRecord, Record, RecordKind,
};

use crate::directory::{path_segment, HackathonBundle};
use crate::error::{SdkError, SdkResult};

/// File name a record is uploaded under: `<kind>-<record id>-<unix millis>.json`.
/// Path separators in the id become `_`.
pub fn record_filename(kind: RecordKind, record_id: &str, at: DateTime<Utc>) -> String {
    format!("{kind}-{}-{}.json", path_segment(record_id), at.timestamp_millis())
}

/// Typed record access on top of a content store.
pub struct MetadataStore<S> {
    store: S,
}

impl<S: ContentStore> MetadataStore<S> {
    pub fn new(store: S) -> Self {
        Self { store }
    }

    pub fn store(&self) -> &S {
        &self.store
    }

    pub fn into_inner(self) -> S {
        self.store
    }

    // ---- Records ----

    /// Serialize, upload, then pin `record`.
    ///
    /// If the upload succeeds and the pin does not, the error is
    /// [`StoreError::PinFailed`] carrying the upload receipt; the content
    /// stays on the network and can be pinned again by identifier.
    pub async fn upload_record<R: Record>(&self, record: &R) -> SdkResult<UploadReceipt> {
        let id = record.record_id();
        let json = record.to_pretty_json().map_err(|e| SdkError::Serialize {
            kind: R::KIND,
            id: id.clone(),
            reason: e.to_string(),
        })?;
        let filename = record_filename(R::KIND, &id, Utc::now());

        let receipt = self.store.upload_text(&json, Some(&filename)).await?;
        tracing::info!(kind = %R::KIND, id = %id, cid = %receipt.cid, "record uploaded");

        if let Err(err) = self.store.pin(&receipt.cid).await {
            tracing::warn!(kind = %R::KIND, id = %id, cid = %receipt.cid, error = %err, "record stored but not pinned");
            return Err(err.with_uploaded(receipt).into());
        }
        tracing::info!(kind = %R::KIND, id = %id, cid = %receipt.cid, "record pinned");
        Ok(receipt)
    }

    pub async fn upload_hackathon(&self, hackathon: &HackathonRecord) -> SdkResult<UploadReceipt> {
        self.upload_record(hackathon).await
    }

    pub async fn upload_project(&self, project: &ProjectRecord) -> SdkResult<UploadReceipt> {
        self.upload_record(project).await
    }

    pub async fn upload_score(&self, score: &JudgeScoreRecord) -> SdkResult<UploadReceipt> {
        self.upload_record(score).await
    }

    /// Fetch `cid` and decode it as a record of type `R`.
    pub async fn fetch_record<R: Record>(&self, cid: &ContentId) -> SdkResult<R> {
        let text = self.store.fetch(cid).await?;
        R::from_json(&text).map_err(|e| SdkError::Decode {
            cid: cid.clone(),
            kind: R::KIND,
            reason: e.to_string(),
        })
    }

    /// Pin content again after a [`StoreError::PinFailed`], using the
    /// receipt from [`SdkError::uploaded_receipt`].
    pub async fn retry_pin(&self, receipt: &UploadReceipt) -> SdkResult<()> {
        self.store
            .pin(&receipt.cid)
            .await
            .map_err(|e| e.with_uploaded(receipt.clone()).into())
    }

    // ---- Directories ----

    /// Upload a hackathon with its projects and scores as one directory and
    /// pin the directory root when the network reports one.
    ///
    /// Returns a receipt per record plus the synthesized directory entries.
    /// A pin failure carries the root's receipt.
    pub async fn upload_hackathon_directory(&self, bundle: &HackathonBundle) -> SdkResult<Vec<UploadReceipt>> {
        let entries = bundle.entries()?;
        let receipts = self.store.upload_many(&entries).await?;

        let root_path = bundle.root_path();
        match receipts.iter().find(|r| r.path == root_path) {
            Some(root) => {
                if let Err(err) = self.store.pin(&root.cid).await {
                    tracing::warn!(root = %root_path, cid = %root.cid, error = %err, "directory stored but not pinned");
                    return Err(err.with_uploaded(root.clone()).into());
                }
                tracing::info!(root = %root_path, cid = %root.cid, entries = receipts.len(), "directory pinned");
            }
            None => {
                tracing::info!(root = %root_path, entries = receipts.len(), "directory uploaded without a root entry");
            }
        }
        Ok(receipts)
    }

    // ---- Identifiers ----

    /// Structural check only; says nothing about whether the content exists.
    pub fn validate_identifier(&self, cid: &str) -> bool {
        is_valid_content_id(cid)
    }

    pub fn resolve_url(&self, cid: &ContentId) -> String {
        self.store.resolve_url(cid)
    }
}

impl<S: ContentStore + std::fmt::Debug> std::fmt::Debug for MetadataStore<S> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("MetadataStore").field("store", &self.store).finish()
    }
}
