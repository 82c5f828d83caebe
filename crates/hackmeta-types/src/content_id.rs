use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

use crate::error::TypeError;

const LEGACY_PREFIX: &str = "Qm";
const LEGACY_BODY_LEN: usize = 44;
const MODERN_PREFIX: &str = "bafy";
const MODERN_BODY_LEN: usize = 55;

/// Textual encoding of a content identifier.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum ContentIdFormat {
    /// CIDv0: `Qm` followed by 44 base58btc characters.
    Legacy,
    /// CIDv1 dag-pb: `bafy` followed by 55 lowercase base32 characters.
    Modern,
}

impl ContentIdFormat {
    /// Detect the encoding of `s`, or `None` if it matches neither shape.
    pub fn detect(s: &str) -> Option<Self> {
        if let Some(body) = s.strip_prefix(LEGACY_PREFIX) {
            if body.len() == LEGACY_BODY_LEN && body.bytes().all(is_base58) {
                return Some(Self::Legacy);
            }
        }
        if let Some(body) = s.strip_prefix(MODERN_PREFIX) {
            if body.len() == MODERN_BODY_LEN && body.bytes().all(is_base32_lower) {
                return Some(Self::Modern);
            }
        }
        None
    }
}

impl fmt::Display for ContentIdFormat {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Legacy => write!(f, "cidv0"),
            Self::Modern => write!(f, "cidv1"),
        }
    }
}

/// Structural check for a content identifier string.
///
/// Only the shape is checked. A `true` result says nothing about whether the
/// identifier resolves to content anywhere on the network.
pub fn is_valid_content_id(s: &str) -> bool {
    ContentIdFormat::detect(s).is_some()
}

// Bitcoin base58 alphabet: no 0, O, I, l.
fn is_base58(c: u8) -> bool {
    matches!(c, b'1'..=b'9' | b'A'..=b'H' | b'J'..=b'N' | b'P'..=b'Z' | b'a'..=b'k' | b'm'..=b'z')
}

// RFC 4648 base32, lowercase.
fn is_base32_lower(c: u8) -> bool {
    matches!(c, b'a'..=b'z' | b'2'..=b'7')
}

/// Identifier naming a blob of stored content.
///
/// `ContentId::new` wraps whatever the network reported without checking it;
/// `ContentId::parse` (and `FromStr`) accept only the two known encodings.
#[derive(Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct ContentId(String);

impl ContentId {
    /// Wrap an identifier as reported by the storage network.
    pub fn new(id: impl Into<String>) -> Self {
        Self(id.into())
    }

    /// Parse and validate user-supplied identifier text.
    pub fn parse(s: &str) -> Result<Self, TypeError> {
        let trimmed = s.trim();
        if is_valid_content_id(trimmed) {
            Ok(Self(trimmed.to_string()))
        } else {
            Err(TypeError::InvalidContentId(s.to_string()))
        }
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }

    /// The encoding of this identifier, if it is one of the known shapes.
    pub fn format(&self) -> Option<ContentIdFormat> {
        ContentIdFormat::detect(&self.0)
    }

    pub fn is_well_formed(&self) -> bool {
        self.format().is_some()
    }

    /// Abbreviated form for log lines: first 6 and last 4 characters.
    pub fn short(&self) -> String {
        if self.0.len() <= 12 || !self.0.is_ascii() {
            return self.0.clone();
        }
        format!("{}…{}", &self.0[..6], &self.0[self.0.len() - 4..])
    }
}

impl fmt::Debug for ContentId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "ContentId({})", self.0)
    }
}

impl fmt::Display for ContentId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl FromStr for ContentId {
    type Err = TypeError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::parse(s)
    }
}

impl AsRef<str> for ContentId {
    fn as_ref(&self) -> &str {
        &self.0
    }
}

impl From<ContentId> for String {
    fn from(id: ContentId) -> Self {
        id.0
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;

    const LEGACY: &str = "QmYwAPJzv5CZsnA625s3Xf2nemtYgPpHdWEz79ojWnPbdG";
    const MODERN: &str = "bafybeigdyrzt5sfp7udm7hu76uh7y26nf3efuylqabf3oclgtqy55fbzdi";

    #[test]
    fn accepts_both_encodings() {
        assert_eq!(ContentIdFormat::detect(LEGACY), Some(ContentIdFormat::Legacy));
        assert_eq!(ContentIdFormat::detect(MODERN), Some(ContentIdFormat::Modern));
        assert!(is_valid_content_id(LEGACY));
        assert!(is_valid_content_id(MODERN));
    }

    #[test]
    fn rejects_empty_and_garbage() {
        assert!(!is_valid_content_id(""));
        assert!(!is_valid_content_id("Qm"));
        assert!(!is_valid_content_id("bafy"));
        assert!(!is_valid_content_id("hello world"));
    }

    #[test]
    fn rejects_right_prefix_wrong_length() {
        assert!(!is_valid_content_id(&LEGACY[..45]));
        assert!(!is_valid_content_id(&format!("{LEGACY}x")));
        assert!(!is_valid_content_id(&MODERN[..58]));
        assert!(!is_valid_content_id(&format!("{MODERN}a")));
    }

    #[test]
    fn rejects_characters_outside_alphabet() {
        // 0, O, I and l are not base58.
        let legacy_zero = format!("Qm0{}", &LEGACY[3..]);
        assert!(!is_valid_content_id(&legacy_zero));
        let legacy_l = format!("Qml{}", &LEGACY[3..]);
        assert!(!is_valid_content_id(&legacy_l));
        // 1, 8 and uppercase are not lowercase base32.
        let modern_one = format!("bafy1{}", &MODERN[5..]);
        assert!(!is_valid_content_id(&modern_one));
        assert!(!is_valid_content_id(&MODERN.to_uppercase()));
    }

    #[test]
    fn parse_trims_and_validates() {
        let id = ContentId::parse(&format!("  {LEGACY}\n")).unwrap();
        assert_eq!(id.as_str(), LEGACY);
        assert_eq!(
            ContentId::parse("nope"),
            Err(TypeError::InvalidContentId("nope".into()))
        );
    }

    #[test]
    fn new_does_not_validate() {
        let id = ContentId::new("bafkreiunchecked");
        assert!(!id.is_well_formed());
        assert_eq!(id.format(), None);
    }

    #[test]
    fn short_form() {
        let id = ContentId::new(MODERN);
        assert_eq!(id.short(), "bafybe…bzdi");
        assert_eq!(ContentId::new("tiny").short(), "tiny");
    }

    #[test]
    fn serde_is_transparent() {
        let id = ContentId::new(LEGACY);
        let json = serde_json::to_string(&id).unwrap();
        assert_eq!(json, format!("\"{LEGACY}\""));
        let parsed: ContentId = serde_json::from_str(&json).unwrap();
        assert_eq!(parsed, id);
    }

    proptest! {
        #[test]
        fn any_legacy_shape_validates(s in "Qm[1-9A-HJ-NP-Za-km-z]{44}") {
            prop_assert!(is_valid_content_id(&s));
        }

        #[test]
        fn any_modern_shape_validates(s in "bafy[a-z2-7]{55}") {
            prop_assert!(is_valid_content_id(&s));
        }

        #[test]
        fn short_modern_body_is_rejected(s in "bafy[a-z2-7]{0,54}") {
            prop_assert!(!is_valid_content_id(&s));
        }

        #[test]
        fn long_legacy_body_is_rejected(s in "Qm[1-9A-HJ-NP-Za-km-z]{45,60}") {
            prop_assert!(!is_valid_content_id(&s));
        }
    }
}
