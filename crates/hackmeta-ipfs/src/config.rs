use std::fmt;
use std::path::Path;
use std::time::Duration;

use base64::Engine;
use hackmeta_store::{Gateway, StoreError, StoreResult};
use serde::{Deserialize, Serialize};

use crate::retry::RetryPolicy;

/// Storage API endpoint used when nothing else is configured.
pub const DEFAULT_API_URL: &str = "https://ipfs.infura.io:5001";

pub const ENV_API_URL: &str = "IPFS_API_URL";
pub const ENV_GATEWAY_URL: &str = "IPFS_GATEWAY_URL";
pub const ENV_PROJECT_ID: &str = "IPFS_PROJECT_ID";
pub const ENV_PROJECT_SECRET: &str = "IPFS_PROJECT_SECRET";
pub const ENV_BEARER_TOKEN: &str = "IPFS_BEARER_TOKEN";
pub const ENV_TIMEOUT_SECS: &str = "IPFS_TIMEOUT_SECS";

/// Credentials sent in the `Authorization` header of API calls.
/// Gateway reads are always anonymous.
#[derive(Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "scheme", rename_all = "lowercase")]
pub enum Credentials {
    Basic { project_id: String, secret: String },
    Bearer { token: String },
}

impl Credentials {
    pub fn authorization_header(&self) -> String {
        match self {
            Self::Basic { project_id, secret } => {
                let raw = format!("{project_id}:{secret}");
                format!("Basic {}", base64::engine::general_purpose::STANDARD.encode(raw))
            }
            Self::Bearer { token } => format!("Bearer {token}"),
        }
    }
}

impl fmt::Debug for Credentials {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Basic { project_id, .. } => f
                .debug_struct("Basic")
                .field("project_id", project_id)
                .field("secret", &"<redacted>")
                .finish(),
            Self::Bearer { .. } => f.debug_struct("Bearer").field("token", &"<redacted>").finish(),
        }
    }
}

/// Connection settings for an [`crate::IpfsClient`].
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct IpfsConfig {
    /// Base URL of the Kubo-compatible HTTP API, without `/api/v0`.
    pub api_url: String,
    /// Gateway used to build read URLs.
    pub gateway: Gateway,
    /// Gateways listed as alternatives to `gateway`.
    pub alternate_gateways: Vec<Gateway>,
    pub credentials: Option<Credentials>,
    /// Deadline for a single API attempt.
    #[serde(rename = "request_timeout_ms", with = "millis")]
    pub request_timeout: Duration,
    /// Deadline for an availability probe.
    #[serde(rename = "probe_timeout_ms", with = "millis")]
    pub probe_timeout: Duration,
    pub retry: RetryPolicy,
}

impl Default for IpfsConfig {
    fn default() -> Self {
        Self {
            api_url: DEFAULT_API_URL.to_string(),
            gateway: Gateway::default(),
            alternate_gateways: Gateway::default_alternates(),
            credentials: None,
            request_timeout: Duration::from_secs(30),
            probe_timeout: Duration::from_secs(5),
            retry: RetryPolicy::default(),
        }
    }
}

impl IpfsConfig {
    /// Read configuration from the process environment.
    pub fn from_env() -> StoreResult<Self> {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Build configuration from `lookup`, starting from defaults.
    /// Blank values count as unset.
    pub fn from_lookup<F>(lookup: F) -> StoreResult<Self>
    where
        F: Fn(&str) -> Option<String>,
    {
        Self::default().overlay(lookup)
    }

    /// Parse a TOML document. Missing keys take their defaults.
    pub fn from_toml_str(text: &str) -> StoreResult<Self> {
        let config: Self =
            toml::from_str(text).map_err(|e| StoreError::Configuration(format!("invalid config: {e}")))?;
        config.validate()?;
        Ok(config)
    }

    /// Load a TOML file.
    pub fn load(path: &Path) -> StoreResult<Self> {
        let text = std::fs::read_to_string(path)
            .map_err(|e| StoreError::Configuration(format!("cannot read {}: {e}", path.display())))?;
        Self::from_toml_str(&text)
    }

    /// Layer the process environment over an already loaded configuration.
    pub fn with_env_overrides(self) -> StoreResult<Self> {
        self.overlay(|key| std::env::var(key).ok())
    }

    /// Replace every setting `lookup` provides; keep the rest.
    pub fn overlay<F>(mut self, lookup: F) -> StoreResult<Self>
    where
        F: Fn(&str) -> Option<String>,
    {
        let get = |key: &str| lookup(key).map(|v| v.trim().to_string()).filter(|v| !v.is_empty());

        if let Some(url) = get(ENV_API_URL) {
            self.api_url = url;
        }
        if let Some(base) = get(ENV_GATEWAY_URL) {
            self.gateway = Gateway::new(base);
        }
        if let Some(secs) = get(ENV_TIMEOUT_SECS) {
            let secs: u64 = secs.parse().map_err(|_| {
                StoreError::Configuration(format!("{ENV_TIMEOUT_SECS} must be a whole number of seconds, got {secs:?}"))
            })?;
            self.request_timeout = Duration::from_secs(secs);
        }

        if let Some(secret) = get(ENV_PROJECT_SECRET) {
            self.credentials = Some(Credentials::Basic {
                project_id: get(ENV_PROJECT_ID).unwrap_or_default(),
                secret,
            });
        } else if let Some(token) = get(ENV_BEARER_TOKEN) {
            self.credentials = Some(Credentials::Bearer { token });
        }

        self.validate()?;
        Ok(self)
    }

    pub fn validate(&self) -> StoreResult<()> {
        if !(self.api_url.starts_with("http://") || self.api_url.starts_with("https://")) {
            return Err(StoreError::Configuration(format!(
                "api_url must be an http(s) URL, got {:?}",
                self.api_url
            )));
        }
        if self.request_timeout.is_zero() {
            return Err(StoreError::Configuration("request timeout must be positive".into()));
        }
        if self.probe_timeout.is_zero() {
            return Err(StoreError::Configuration("probe timeout must be positive".into()));
        }
        Ok(())
    }
}

/// Serde helpers storing a `Duration` as whole milliseconds.
pub(crate) mod millis {
    use std::time::Duration;

    use serde::{Deserialize, Deserializer, Serializer};

    pub fn serialize<S: Serializer>(value: &Duration, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_u64(value.as_millis() as u64)
    }

    pub fn deserialize<'de, D: Deserializer<'de>>(deserializer: D) -> Result<Duration, D::Error> {
        u64::deserialize(deserializer).map(Duration::from_millis)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    fn lookup(pairs: &[(&str, &str)]) -> impl Fn(&str) -> Option<String> {
        let map: HashMap<String, String> =
            pairs.iter().map(|(k, v)| (k.to_string(), v.to_string())).collect();
        move |key: &str| map.get(key).cloned()
    }

    #[test]
    fn default_config() {
        let c = IpfsConfig::default();
        assert_eq!(c.api_url, "https://ipfs.infura.io:5001");
        assert_eq!(c.gateway.base(), "https://ipfs.io/ipfs");
        assert_eq!(c.alternate_gateways.len(), 3);
        assert_eq!(c.request_timeout, Duration::from_secs(30));
        assert_eq!(c.probe_timeout, Duration::from_secs(5));
        assert!(c.credentials.is_none());
    }

    #[test]
    fn empty_environment_gives_defaults() {
        let c = IpfsConfig::from_lookup(lookup(&[])).unwrap();
        assert_eq!(c, IpfsConfig::default());
    }

    #[test]
    fn environment_overrides() {
        let c = IpfsConfig::from_lookup(lookup(&[
            (ENV_API_URL, "http://localhost:5001"),
            (ENV_GATEWAY_URL, "http://localhost:8080/ipfs/"),
            (ENV_TIMEOUT_SECS, "12"),
        ]))
        .unwrap();
        assert_eq!(c.api_url, "http://localhost:5001");
        assert_eq!(c.gateway.base(), "http://localhost:8080/ipfs");
        assert_eq!(c.request_timeout, Duration::from_secs(12));
    }

    #[test]
    fn basic_credentials_need_a_secret() {
        let c = IpfsConfig::from_lookup(lookup(&[(ENV_PROJECT_ID, "proj")])).unwrap();
        assert!(c.credentials.is_none());

        let c = IpfsConfig::from_lookup(lookup(&[(ENV_PROJECT_ID, "proj"), (ENV_PROJECT_SECRET, "secret")]))
            .unwrap();
        let creds = c.credentials.unwrap();
        assert_eq!(creds.authorization_header(), "Basic cHJvajpzZWNyZXQ=");
    }

    #[test]
    fn secret_wins_over_bearer_token() {
        let c = IpfsConfig::from_lookup(lookup(&[
            (ENV_PROJECT_SECRET, "s3cr3t"),
            (ENV_PROJECT_ID, "2Nk"),
            (ENV_BEARER_TOKEN, "tok"),
        ]))
        .unwrap();
        assert_eq!(c.credentials.unwrap().authorization_header(), "Basic Mk5rOnMzY3IzdA==");

        let c = IpfsConfig::from_lookup(lookup(&[(ENV_BEARER_TOKEN, "tok")])).unwrap();
        assert_eq!(c.credentials.unwrap().authorization_header(), "Bearer tok");
    }

    #[test]
    fn bad_timeout_is_configuration_error() {
        let err = IpfsConfig::from_lookup(lookup(&[(ENV_TIMEOUT_SECS, "soon")])).unwrap_err();
        assert!(matches!(err, StoreError::Configuration(_)));

        let err = IpfsConfig::from_lookup(lookup(&[(ENV_TIMEOUT_SECS, "0")])).unwrap_err();
        assert!(matches!(err, StoreError::Configuration(_)));
    }

    #[test]
    fn overlay_keeps_unset_settings() {
        let base = IpfsConfig::from_toml_str("api_url = \"http://node:5001\"\nprobe_timeout_ms = 750\n").unwrap();
        let c = base.overlay(lookup(&[(ENV_BEARER_TOKEN, "tok")])).unwrap();
        assert_eq!(c.api_url, "http://node:5001");
        assert_eq!(c.probe_timeout, Duration::from_millis(750));
        assert_eq!(c.credentials, Some(Credentials::Bearer { token: "tok".into() }));
    }

    #[test]
    fn non_http_api_url_rejected() {
        let err = IpfsConfig::from_lookup(lookup(&[(ENV_API_URL, "ftp://node")])).unwrap_err();
        assert!(matches!(err, StoreError::Configuration(_)));
    }

    #[test]
    fn toml_file_shape() {
        let c = IpfsConfig::from_toml_str(
            r#"
api_url = "http://127.0.0.1:5001"
gateway = "http://127.0.0.1:8080/ipfs"
alternate_gateways = ["https://dweb.link/ipfs"]
request_timeout_ms = 2000

[credentials]
scheme = "bearer"
token = "abc"

[retry]
max_attempts = 5
"#,
        )
        .unwrap();
        assert_eq!(c.api_url, "http://127.0.0.1:5001");
        assert_eq!(c.alternate_gateways, vec![Gateway::new("https://dweb.link/ipfs")]);
        assert_eq!(c.request_timeout, Duration::from_secs(2));
        assert_eq!(c.probe_timeout, Duration::from_secs(5));
        assert_eq!(c.credentials, Some(Credentials::Bearer { token: "abc".into() }));
        assert_eq!(c.retry.max_attempts, 5);
        assert_eq!(c.retry.initial_delay, Duration::from_millis(250));
    }

    #[test]
    fn malformed_toml_is_configuration_error() {
        let err = IpfsConfig::from_toml_str("api_url = ").unwrap_err();
        assert!(matches!(err, StoreError::Configuration(_)));
    }

    #[test]
    fn debug_redacts_secrets() {
        let creds = Credentials::Basic { project_id: "proj".into(), secret: "hunter2".into() };
        let debug = format!("{creds:?}");
        assert!(debug.contains("proj"));
        assert!(!debug.contains("hunter2"));
        assert!(!format!("{:?}", Credentials::Bearer { token: "tok".into() }).contains("\"tok\""));
    }
}
