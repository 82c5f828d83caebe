use std::fmt;

use serde::{Deserialize, Serialize};

/// How far a record got on its way onto the network.
///
/// `Constructed -> Serialized -> Uploaded -> Pinned` is full success.
/// `PinFailed` is partial success: the content is stored and addressable
/// but nothing asks the network to keep it.
#[derive(Clone, Copy, Debug, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RecordStage {
    Constructed,
    Serialized,
    Uploaded,
    Pinned,
    PinFailed,
}

impl RecordStage {
    /// Whether the record is retrievable by identifier at this stage.
    pub fn is_stored(&self) -> bool {
        matches!(self, Self::Uploaded | Self::Pinned | Self::PinFailed)
    }

    pub fn is_terminal(&self) -> bool {
        matches!(self, Self::Pinned | Self::PinFailed)
    }
}

impl fmt::Display for RecordStage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let label = match self {
            Self::Constructed => "constructed",
            Self::Serialized => "serialized",
            Self::Uploaded => "uploaded",
            Self::Pinned => "pinned",
            Self::PinFailed => "pin failed",
        };
        f.write_str(label)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn lifecycle_order() {
        assert!(RecordStage::Constructed < RecordStage::Serialized);
        assert!(RecordStage::Serialized < RecordStage::Uploaded);
        assert!(RecordStage::Uploaded < RecordStage::Pinned);
    }

    #[test]
    fn stored_and_terminal() {
        assert!(!RecordStage::Serialized.is_stored());
        assert!(RecordStage::PinFailed.is_stored());
        assert!(RecordStage::PinFailed.is_terminal());
        assert!(!RecordStage::Uploaded.is_terminal());
    }

    #[test]
    fn display() {
        assert_eq!(RecordStage::PinFailed.to_string(), "pin failed");
        assert_eq!(serde_json::to_string(&RecordStage::PinFailed).unwrap(), "\"pin_failed\"");
    }
}
