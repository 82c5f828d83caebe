//! Content-addressed storage for hackathon metadata.
//!
//! Records leave this workspace as byte blobs named by a content identifier
//! (CID). This crate defines the storage seam and what flows across it:
//!
//! - [`ContentStore`] -- upload, batch upload, fetch, pin, gateway URLs
//! - [`UploadReceipt`] -- identifier, path, size and read URL of a stored blob
//! - [`FileEntry`] -- a path-tagged blob for batch uploads
//! - [`StoreError`] -- the failure taxonomy every backend reports in
//!
//! # Backends
//!
//! - [`InMemoryContentStore`] -- `HashMap`-based store for tests and embedding
//! - `hackmeta_ipfs::IpfsClient` -- HTTP client for an IPFS node
//!
//! # Rules
//!
//! 1. Stored content is immutable; an edit is a new upload with a new CID.
//! 2. Identical bytes yield the identical CID.
//! 3. Failures are returned to the caller; a batch that fails midway reports
//!    what was already stored and does not roll it back.
//! 4. Identifier validation and URL formatting never touch the network.

pub mod error;
pub mod gateway;
pub mod memory;
pub mod traits;
pub mod types;

pub use error::{StoreError, StoreResult};
pub use gateway::{Gateway, DEFAULT_ALTERNATE_GATEWAYS, DEFAULT_GATEWAY};
pub use memory::InMemoryContentStore;
pub use traits::{upload_sequential, ContentStore};
pub use types::{Availability, FileEntry, UploadReceipt};

pub use hackmeta_types::{is_valid_content_id, ContentId};
