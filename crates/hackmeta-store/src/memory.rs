use std::collections::{BTreeSet, HashMap, HashSet};
use std::sync::RwLock;

use async_trait::async_trait;
use cid::Cid;
use hackmeta_types::ContentId;
use multihash_codetable::{Code, MultihashDigest};

use crate::error::{StoreError, StoreResult};
use crate::gateway::Gateway;
use crate::traits::{upload_sequential, ContentStore};
use crate::types::{FileEntry, UploadReceipt};

/// Multicodec for dag-pb; CIDv1 identifiers with it render as `bafy…`.
const DAG_PB: u64 = 0x70;

/// Injected failures, for exercising callers' error paths.
#[derive(Debug, Default)]
struct Faults {
    offline: bool,
    failing_paths: HashSet<String>,
    pins_fail: bool,
}

/// In-memory, HashMap-based content store.
///
/// Intended for tests and embedding. Identifiers are CIDv1 (dag-pb, sha2-256)
/// over the raw bytes, so they validate like network identifiers, though
/// they differ from what an IPFS node computes for the same bytes.
pub struct InMemoryContentStore {
    blobs: RwLock<HashMap<ContentId, Vec<u8>>>,
    directories: RwLock<HashMap<ContentId, u64>>,
    pins: RwLock<HashSet<ContentId>>,
    faults: RwLock<Faults>,
    gateway: Gateway,
}

impl InMemoryContentStore {
    /// Create a new empty store reading through the default gateway.
    pub fn new() -> Self {
        Self::with_gateway(Gateway::default())
    }

    pub fn with_gateway(gateway: Gateway) -> Self {
        Self {
            blobs: RwLock::new(HashMap::new()),
            directories: RwLock::new(HashMap::new()),
            pins: RwLock::new(HashSet::new()),
            faults: RwLock::new(Faults::default()),
            gateway,
        }
    }

    /// Identifier this store assigns to `data`.
    pub fn compute_cid(data: &[u8]) -> ContentId {
        let hash = Code::Sha2_256.digest(data);
        ContentId::new(Cid::new_v1(DAG_PB, hash).to_string())
    }

    /// Number of blobs currently stored (directories excluded).
    pub fn len(&self) -> usize {
        self.blobs.read().expect("lock poisoned").len()
    }

    pub fn is_empty(&self) -> bool {
        self.blobs.read().expect("lock poisoned").is_empty()
    }

    /// Total bytes across all stored blobs.
    pub fn total_bytes(&self) -> u64 {
        self.blobs
            .read()
            .expect("lock poisoned")
            .values()
            .map(|data| data.len() as u64)
            .sum()
    }

    pub fn contains(&self, cid: &ContentId) -> bool {
        self.blobs.read().expect("lock poisoned").contains_key(cid)
            || self.directories.read().expect("lock poisoned").contains_key(cid)
    }

    pub fn is_pinned(&self, cid: &ContentId) -> bool {
        self.pins.read().expect("lock poisoned").contains(cid)
    }

    pub fn pinned_count(&self) -> usize {
        self.pins.read().expect("lock poisoned").len()
    }

    /// Sorted identifiers of all stored blobs.
    pub fn all_ids(&self) -> Vec<ContentId> {
        let map = self.blobs.read().expect("lock poisoned");
        let mut ids: Vec<ContentId> = map.keys().cloned().collect();
        ids.sort();
        ids
    }

    /// Remove all content and pins. Injected faults are kept.
    pub fn clear(&self) {
        self.blobs.write().expect("lock poisoned").clear();
        self.directories.write().expect("lock poisoned").clear();
        self.pins.write().expect("lock poisoned").clear();
    }

    /// Make every operation fail as if the network were unreachable.
    pub fn set_offline(&self, offline: bool) {
        self.faults.write().expect("lock poisoned").offline = offline;
    }

    /// Make uploads stored under `path` fail at the transport level.
    pub fn fail_uploads_of(&self, path: impl Into<String>) {
        self.faults
            .write()
            .expect("lock poisoned")
            .failing_paths
            .insert(path.into());
    }

    /// Make every pin request fail.
    pub fn fail_pins(&self, fail: bool) {
        self.faults.write().expect("lock poisoned").pins_fail = fail;
    }

    fn check_online(&self) -> StoreResult<()> {
        if self.faults.read().expect("lock poisoned").offline {
            return Err(StoreError::StorageUnavailable("in-memory store is offline".into()));
        }
        Ok(())
    }

    fn receipt(&self, cid: ContentId, path: &str, size: u64) -> UploadReceipt {
        UploadReceipt {
            url: self.gateway.resolve(&cid),
            cid,
            path: path.to_string(),
            size,
        }
    }

    /// Build a directory entry for every shared path prefix in `files`,
    /// deepest first, the way an IPFS node wraps nested paths.
    fn synthesize_directories(&self, files: &[FileEntry], stored: &mut Vec<UploadReceipt>) {
        let dirs: BTreeSet<String> = files.iter().flat_map(FileEntry::parent_dirs).collect();
        let mut dirs: Vec<String> = dirs.into_iter().collect();
        dirs.sort_by_key(|d| std::cmp::Reverse(d.matches('/').count()));

        for dir in dirs {
            let prefix = format!("{dir}/");
            let mut children: Vec<&UploadReceipt> = stored
                .iter()
                .filter(|r| {
                    r.path
                        .strip_prefix(&prefix)
                        .is_some_and(|rest| !rest.is_empty() && !rest.contains('/'))
                })
                .collect();
            children.sort_by(|a, b| a.path.cmp(&b.path));

            let listing: String = children
                .iter()
                .map(|c| format!("{} {} {}\n", &c.path[prefix.len()..], c.cid, c.size))
                .collect();
            let size = children.iter().map(|c| c.size).sum();
            let cid = Self::compute_cid(listing.as_bytes());

            self.directories
                .write()
                .expect("lock poisoned")
                .insert(cid.clone(), size);
            let receipt = self.receipt(cid, &dir, size);
            stored.push(receipt);
        }
    }
}

impl Default for InMemoryContentStore {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl ContentStore for InMemoryContentStore {
    async fn upload(&self, content: &[u8], filename: Option<&str>) -> StoreResult<UploadReceipt> {
        self.check_online()?;
        let path = filename.unwrap_or("file");
        if self
            .faults
            .read()
            .expect("lock poisoned")
            .failing_paths
            .contains(path)
        {
            return Err(StoreError::UploadFailed {
                path: path.to_string(),
                reason: "connection reset by peer".into(),
            });
        }

        let cid = Self::compute_cid(content);
        let mut map = self.blobs.write().expect("lock poisoned");
        // Idempotent: the same identifier always maps to the same bytes.
        map.entry(cid.clone()).or_insert_with(|| content.to_vec());
        drop(map);

        Ok(self.receipt(cid, path, content.len() as u64))
    }

    async fn upload_many(&self, files: &[FileEntry]) -> StoreResult<Vec<UploadReceipt>> {
        let mut stored = upload_sequential(self, files).await?;
        self.synthesize_directories(files, &mut stored);
        Ok(stored)
    }

    async fn fetch_bytes(&self, cid: &ContentId) -> StoreResult<Vec<u8>> {
        self.check_online()?;
        if self.directories.read().expect("lock poisoned").contains_key(cid) {
            return Err(StoreError::RetrievalFailed {
                cid: cid.clone(),
                reason: "this dag node is a directory".into(),
            });
        }
        self.blobs
            .read()
            .expect("lock poisoned")
            .get(cid)
            .cloned()
            .ok_or_else(|| StoreError::RetrievalFailed {
                cid: cid.clone(),
                reason: "content not found".into(),
            })
    }

    async fn pin(&self, cid: &ContentId) -> StoreResult<()> {
        let pin_failed = |reason: &str| StoreError::PinFailed {
            cid: cid.clone(),
            reason: reason.to_string(),
            uploaded: None,
        };
        {
            let faults = self.faults.read().expect("lock poisoned");
            if faults.offline {
                return Err(pin_failed("in-memory store is offline"));
            }
            if faults.pins_fail {
                return Err(pin_failed("pinning service rejected the request"));
            }
        }
        if !self.contains(cid) {
            return Err(pin_failed("content not found"));
        }
        self.pins.write().expect("lock poisoned").insert(cid.clone());
        Ok(())
    }

    fn resolve_url(&self, cid: &ContentId) -> String {
        self.gateway.resolve(cid)
    }
}

impl std::fmt::Debug for InMemoryContentStore {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("InMemoryContentStore")
            .field("blob_count", &self.len())
            .field("pinned", &self.pinned_count())
            .field("gateway", &self.gateway.base())
            .finish()
    }
}
