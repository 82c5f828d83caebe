//! Record types for the hackathon metadata store.
//!
//! Every document the platform persists on the content-addressed network is
//! one of three record kinds, each serialized as pretty-printed JSON:
//!
//! - [`HackathonRecord`] -- an event: organizer, schedule, tracks, prizes
//! - [`ProjectRecord`] -- a team's submission to a hackathon
//! - [`JudgeScoreRecord`] -- one judge's weighted scores for one project
//!
//! Records are built from raw form input ([`HackathonForm`], [`ProjectForm`])
//! or decoded from stored JSON. Unknown JSON members survive a decode/encode
//! cycle so newer schema versions are not truncated by older readers.
//!
//! [`ContentId`] names stored content; [`is_valid_content_id`] is the pure
//! format check for the two textual encodings the network hands out.

pub mod content_id;
pub mod error;
pub mod hackathon;
pub mod project;
pub mod record;
pub mod score;

pub use content_id::{is_valid_content_id, ContentId, ContentIdFormat};
pub use error::TypeError;
pub use hackathon::{HackathonForm, HackathonRecord, Organizer, Prize, Track};
pub use project::{ProjectForm, ProjectRecord, TeamMember};
pub use record::{Extensions, Record, RecordKind, SCHEMA_VERSION};
pub use score::{average_overall, CriteriaWeights, JudgeScoreRecord, ScoringCriterion};
