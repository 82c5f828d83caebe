use async_trait::async_trait;
use hackmeta_types::ContentId;

use crate::error::{StoreError, StoreResult};
use crate::types::{FileEntry, UploadReceipt};

/// Content-addressed blob store.
///
/// All implementations must satisfy these invariants:
/// - Stored content is immutable. The same bytes always produce the same ID.
/// - Failures are returned, never retried silently past the backend's policy.
/// - `resolve_url` is pure formatting and never touches the network.
/// - The store never interprets blob contents.
#[async_trait]
pub trait ContentStore: Send + Sync {
    /// Store `content` and return its receipt.
    ///
    /// `filename` names the entry on the network; `"file"` when absent.
    async fn upload(&self, content: &[u8], filename: Option<&str>) -> StoreResult<UploadReceipt>;

    /// Store UTF-8 text.
    async fn upload_text(&self, content: &str, filename: Option<&str>) -> StoreResult<UploadReceipt> {
        self.upload(content.as_bytes(), filename).await
    }

    /// Store a batch of path-tagged blobs.
    ///
    /// Returns one receipt per entry plus any directory entries the backend
    /// synthesizes from shared path prefixes, in no particular order; match
    /// results by `path`. A failure partway returns
    /// [`StoreError::BatchFailed`] carrying the receipts already stored.
    ///
    /// Default implementation uploads entries one at a time.
    async fn upload_many(&self, files: &[FileEntry]) -> StoreResult<Vec<UploadReceipt>> {
        upload_sequential(self, files).await
    }

    /// Read every byte stored under `cid`.
    async fn fetch_bytes(&self, cid: &ContentId) -> StoreResult<Vec<u8>>;

    /// Read the content stored under `cid` as UTF-8 text.
    async fn fetch(&self, cid: &ContentId) -> StoreResult<String> {
        let bytes = self.fetch_bytes(cid).await?;
        String::from_utf8(bytes).map_err(|e| StoreError::RetrievalFailed {
            cid: cid.clone(),
            reason: format!("content is not UTF-8: {e}"),
        })
    }

    /// Ask the network to retain `cid` indefinitely.
    async fn pin(&self, cid: &ContentId) -> StoreResult<()>;

    /// Gateway URL for reading `cid`.
    fn resolve_url(&self, cid: &ContentId) -> String;
}

/// Upload `files` one by one, stopping at the first failure.
///
/// Entries stored before the failure are reported in
/// [`StoreError::BatchFailed`] and stay stored.
pub async fn upload_sequential<S>(store: &S, files: &[FileEntry]) -> StoreResult<Vec<UploadReceipt>>
where
    S: ContentStore + ?Sized,
{
    let mut completed = Vec::with_capacity(files.len());
    for file in files {
        match store.upload(&file.content, Some(&file.path)).await {
            Ok(receipt) => completed.push(receipt),
            Err(source) => {
                tracing::warn!(
                    path = %file.path,
                    stored = completed.len(),
                    error = %source,
                    "batch upload stopped"
                );
                return Err(StoreError::BatchFailed {
                    completed,
                    source: Box::new(source),
                });
            }
        }
    }
    Ok(completed)
}
