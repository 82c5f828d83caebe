//! High-level SDK for the hackathon metadata store.
//!
//! [`MetadataStore`] wraps any [`ContentStore`] backend and speaks in typed
//! records: it serializes hackathons, projects and judge scores to
//! pretty-printed JSON, uploads them under descriptive file names, pins
//! them, and decodes them again on the way back.
//!
//! ```ignore
//! let store = MetadataStore::new(IpfsClient::new(IpfsConfig::from_env()?)?);
//! let receipt = store.upload_hackathon(&hackathon).await?;
//! let again: HackathonRecord = store.fetch_record(&receipt.cid).await?;
//! ```

pub mod directory;
pub mod error;
pub mod metadata;
pub mod stage;

pub use directory::HackathonBundle;
pub use error::{SdkError, SdkResult};
pub use metadata::{record_filename, MetadataStore};
pub use stage::RecordStage;

// Re-export key types
pub use hackmeta_store::{
    Availability, ContentStore, FileEntry, Gateway, InMemoryContentStore, StoreError, UploadReceipt,
};
pub use hackmeta_types::{
    is_valid_content_id, ContentId, CriteriaWeights, HackathonForm, HackathonRecord, JudgeScoreRecord,
    ProjectForm, ProjectRecord, Record, RecordKind,
};
