use std::fmt;

use hackmeta_types::ContentId;
use serde::{Deserialize, Serialize};

/// What the network reported for one stored blob or synthesized directory.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct UploadReceipt {
    pub cid: ContentId,
    /// Path or file name the entry was stored under.
    pub path: String,
    /// Size in bytes as reported by the network.
    pub size: u64,
    /// Gateway URL the content can be read from.
    pub url: String,
}

/// A path-tagged blob for [`crate::ContentStore::upload_many`].
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct FileEntry {
    pub path: String,
    pub content: Vec<u8>,
}

impl FileEntry {
    pub fn new(path: impl Into<String>, content: impl Into<Vec<u8>>) -> Self {
        Self {
            path: path.into(),
            content: content.into(),
        }
    }

    /// UTF-8 text entry.
    pub fn text(path: impl Into<String>, content: &str) -> Self {
        Self::new(path, content.as_bytes().to_vec())
    }

    /// Every proper ancestor directory of this entry's path, outermost first.
    /// `a/b/c.json` yields `a` and `a/b`.
    pub fn parent_dirs(&self) -> Vec<String> {
        let mut dirs = Vec::new();
        let mut end = 0;
        while let Some(pos) = self.path[end..].find('/') {
            end += pos;
            if end > 0 {
                dirs.push(self.path[..end].to_string());
            }
            end += 1;
        }
        dirs
    }
}

/// Result of a gateway availability probe.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Availability {
    Available,
    Unavailable,
}

impl Availability {
    pub fn is_available(&self) -> bool {
        matches!(self, Self::Available)
    }
}

impl fmt::Display for Availability {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Available => write!(f, "available"),
            Self::Unavailable => write!(f, "unavailable"),
        }
    }
}
