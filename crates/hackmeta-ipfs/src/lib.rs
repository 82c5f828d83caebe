//! IPFS backend for the hackmeta content store.
//!
//! [`IpfsClient`] implements [`hackmeta_store::ContentStore`] over the HTTP
//! RPC API of a Kubo-compatible node (a local daemon or a hosted pinning
//! service), configured through [`IpfsConfig`].
//!
//! # Requests
//!
//! - upload: `POST /api/v0/add?pin=false&progress=false`, multipart
//! - fetch: `POST /api/v0/cat?arg=<cid>`
//! - pin: `POST /api/v0/pin/add?arg=<cid>`
//! - probe: `HEAD <gateway>/<cid>`
//!
//! Every API attempt has its own deadline. Unreachable hosts, timeouts and
//! 5xx/429 responses are retried with exponential backoff per
//! [`RetryPolicy`]; the final error is classified into the store taxonomy.

pub mod client;
pub mod config;
pub mod retry;

pub use client::IpfsClient;
pub use config::{Credentials, IpfsConfig, DEFAULT_API_URL};
pub use retry::RetryPolicy;
