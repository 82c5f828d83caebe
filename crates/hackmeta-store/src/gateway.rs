use hackmeta_types::ContentId;
use serde::{Deserialize, Serialize};

/// Public gateway reads go through when nothing else is configured.
pub const DEFAULT_GATEWAY: &str = "https://ipfs.io/ipfs";

/// Other public gateways offered to readers as alternatives.
pub const DEFAULT_ALTERNATE_GATEWAYS: [&str; 3] = [
    "https://gateway.pinata.cloud/ipfs",
    "https://cloudflare-ipfs.com/ipfs",
    "https://dweb.link/ipfs",
];

/// HTTP gateway base used to build read URLs for stored content.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(from = "String", into = "String")]
pub struct Gateway {
    base: String,
}

impl Gateway {
    /// Trailing slashes on `base` are dropped so URLs always join with one.
    pub fn new(base: impl Into<String>) -> Self {
        let base = base.into();
        Self {
            base: base.trim_end_matches('/').to_string(),
        }
    }

    pub fn base(&self) -> &str {
        &self.base
    }

    /// `<base>/<cid>`. Pure: no network access.
    pub fn resolve(&self, cid: &ContentId) -> String {
        format!("{}/{}", self.base, cid.as_str())
    }

    /// Read URLs of `cid` on each of `alternates`.
    pub fn alternates(alternates: &[Gateway], cid: &ContentId) -> Vec<String> {
        alternates.iter().map(|g| g.resolve(cid)).collect()
    }

    pub fn default_alternates() -> Vec<Gateway> {
        DEFAULT_ALTERNATE_GATEWAYS.iter().map(|b| Gateway::new(*b)).collect()
    }
}

impl From<String> for Gateway {
    fn from(base: String) -> Self {
        Self::new(base)
    }
}

impl From<Gateway> for String {
    fn from(gateway: Gateway) -> Self {
        gateway.base
    }
}

impl Default for Gateway {
    fn default() -> Self {
        Self::new(DEFAULT_GATEWAY)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const CID: &str = "QmYwAPJzv5CZsnA625s3Xf2nemtYgPpHdWEz79ojWnPbdG";

    #[test]
    fn resolve_joins_with_single_slash() {
        let cid = ContentId::new(CID);
        let expected = format!("https://ipfs.io/ipfs/{CID}");
        assert_eq!(Gateway::new("https://ipfs.io/ipfs").resolve(&cid), expected);
        assert_eq!(Gateway::new("https://ipfs.io/ipfs/").resolve(&cid), expected);
        assert_eq!(Gateway::new("https://ipfs.io/ipfs//").resolve(&cid), expected);
    }

    #[test]
    fn resolve_is_pure() {
        let cid = ContentId::new(CID);
        let a = Gateway::default();
        let b = Gateway::new(DEFAULT_GATEWAY);
        assert_eq!(a.resolve(&cid), b.resolve(&cid));
        assert_eq!(a.resolve(&cid), a.resolve(&cid));
    }

    #[test]
    fn default_alternates_cover_three_gateways() {
        let cid = ContentId::new(CID);
        let urls = Gateway::alternates(&Gateway::default_alternates(), &cid);
        assert_eq!(urls.len(), 3);
        assert_eq!(urls[0], format!("https://gateway.pinata.cloud/ipfs/{CID}"));
        assert!(urls.iter().all(|u| u.ends_with(CID)));
    }

    #[test]
    fn deserializes_from_plain_string() {
        let gw: Gateway = serde_json::from_str("\"https://dweb.link/ipfs/\"").unwrap();
        assert_eq!(gw.base(), "https://dweb.link/ipfs");
        assert_eq!(serde_json::to_string(&gw).unwrap(), "\"https://dweb.link/ipfs\"");
    }
}
