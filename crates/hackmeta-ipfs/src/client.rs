//! HTTP client for a Kubo-compatible IPFS API.

use std::collections::BTreeSet;

use async_trait::async_trait;
use hackmeta_store::{
    Availability, ContentStore, FileEntry, Gateway, StoreError, StoreResult, UploadReceipt,
};
use hackmeta_types::ContentId;
use reqwest::header::{self, HeaderValue};
use reqwest::multipart::{Form, Part};
use reqwest::{Client, RequestBuilder, Response};
use serde::Deserialize;

use crate::config::IpfsConfig;

const DEFAULT_FILENAME: &str = "file";
const DIRECTORY_MIME: &str = "application/x-directory";

/// One line of the `add` response stream.
#[derive(Debug, Deserialize)]
#[serde(untagged)]
enum AddLine {
    Entry(AddEntry),
    Error(ApiError),
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "PascalCase")]
struct AddEntry {
    name: String,
    hash: String,
    #[serde(default)]
    size: String,
}

/// Error body the API returns with a non-success status or in a stream trailer.
#[derive(Debug, Deserialize)]
#[serde(rename_all = "PascalCase")]
struct ApiError {
    message: String,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "PascalCase")]
struct PinResponse {
    #[serde(default)]
    pins: Vec<String>,
}

/// Content store backed by an IPFS node's HTTP RPC API.
///
/// Uploads go to `/api/v0/add` unpinned, reads to `/api/v0/cat` and pins to
/// `/api/v0/pin/add`. Each request attempt is bounded by the configured
/// request timeout and transient failures are retried per
/// [`crate::RetryPolicy`]. Gateway URLs are formatted locally.
pub struct IpfsClient {
    config: IpfsConfig,
    http: Client,
    authorization: Option<HeaderValue>,
}

impl IpfsClient {
    pub fn new(config: IpfsConfig) -> StoreResult<Self> {
        config.validate()?;

        let authorization = match &config.credentials {
            Some(credentials) => {
                let mut value = HeaderValue::from_str(&credentials.authorization_header())
                    .map_err(|e| StoreError::Configuration(format!("invalid credentials: {e}")))?;
                value.set_sensitive(true);
                Some(value)
            }
            None => None,
        };

        let http = Client::builder()
            .build()
            .map_err(|e| StoreError::Configuration(format!("cannot build HTTP client: {e}")))?;

        Ok(Self {
            config,
            http,
            authorization,
        })
    }

    pub fn config(&self) -> &IpfsConfig {
        &self.config
    }

    /// Check whether the gateway serves `cid`.
    ///
    /// Sends a HEAD request bounded by the probe timeout. Any failure,
    /// including the timeout, reads as [`Availability::Unavailable`].
    pub async fn probe(&self, cid: &ContentId) -> Availability {
        let url = self.resolve_url(cid);
        let timeout = self.config.probe_timeout;

        match tokio::time::timeout(timeout, self.http.head(&url).send()).await {
            Ok(Ok(response)) if response.status().is_success() => Availability::Available,
            Ok(Ok(response)) => {
                tracing::debug!(%cid, status = response.status().as_u16(), "gateway probe refused");
                Availability::Unavailable
            }
            Ok(Err(e)) => {
                tracing::debug!(%cid, error = %e, "gateway probe failed");
                Availability::Unavailable
            }
            Err(_) => {
                tracing::debug!(%cid, timeout_ms = timeout.as_millis() as u64, "gateway probe timed out");
                Availability::Unavailable
            }
        }
    }

    /// Read URLs for `cid` on every configured alternate gateway.
    pub fn alternate_urls(&self, cid: &ContentId) -> Vec<String> {
        Gateway::alternates(&self.config.alternate_gateways, cid)
    }

    fn endpoint(&self, command: &str) -> String {
        format!("{}/api/v0/{command}", self.config.api_url.trim_end_matches('/'))
    }

    fn post(&self, url: &str) -> RequestBuilder {
        let request = self.http.post(url);
        match &self.authorization {
            Some(value) => request.header(header::AUTHORIZATION, value.clone()),
            None => request,
        }
    }

    fn receipt(&self, entry: AddEntry, fallback_size: u64) -> StoreResult<UploadReceipt> {
        // Identifiers the node issues are taken as-is.
        let cid = ContentId::new(entry.hash);
        let size = if entry.size.is_empty() {
            fallback_size
        } else {
            entry.size.parse().map_err(|_| StoreError::UploadFailed {
                path: entry.name.clone(),
                reason: format!("node returned an invalid size {:?}", entry.size),
            })?
        };
        Ok(UploadReceipt {
            url: self.config.gateway.resolve(&cid),
            cid,
            path: entry.name,
            size,
        })
    }

    fn batch_form(files: &[FileEntry]) -> StoreResult<Form> {
        let dirs: BTreeSet<String> = files.iter().flat_map(FileEntry::parent_dirs).collect();
        let mut form = Form::new();
        // BTreeSet order puts every directory before its children.
        for dir in dirs {
            let part = Part::bytes(Vec::new())
                .file_name(urlencoding::encode(&dir).into_owned())
                .mime_str(DIRECTORY_MIME)
                .map_err(|e| StoreError::Configuration(e.to_string()))?;
            form = form.part("file", part);
        }
        for file in files {
            let part = Part::bytes(file.content.clone()).file_name(urlencoding::encode(&file.path).into_owned());
            form = form.part("file", part);
        }
        Ok(form)
    }

    /// Classify one NDJSON line of a batch response, appending its receipt.
    fn accept_line(&self, line: &[u8], files: &[FileEntry], completed: &mut Vec<UploadReceipt>) -> StoreResult<()> {
        let line = String::from_utf8_lossy(line);
        let line = line.trim();
        if line.is_empty() {
            return Ok(());
        }
        match serde_json::from_str::<AddLine>(line) {
            Ok(AddLine::Entry(entry)) => {
                let fallback = files
                    .iter()
                    .find(|f| f.path == entry.name)
                    .map_or(0, |f| f.content.len() as u64);
                completed.push(self.receipt(entry, fallback)?);
                Ok(())
            }
            Ok(AddLine::Error(err)) => Err(StoreError::UploadFailed {
                path: next_pending(files, completed),
                reason: err.message,
            }),
            Err(e) => Err(StoreError::UploadFailed {
                path: next_pending(files, completed),
                reason: format!("unreadable response line: {e}"),
            }),
        }
    }
}

/// Path of the first input entry without a receipt yet.
fn next_pending(files: &[FileEntry], completed: &[UploadReceipt]) -> String {
    files
        .iter()
        .find(|f| !completed.iter().any(|r| r.path == f.path))
        .map(|f| f.path.clone())
        .unwrap_or_default()
}

/// Map a transport error: unreachable hosts are `StorageUnavailable`,
/// anything else goes through `other`.
fn transport_error(err: reqwest::Error, other: impl FnOnce(String) -> StoreError) -> StoreError {
    if err.is_connect() {
        StoreError::StorageUnavailable(err.to_string())
    } else {
        other(err.to_string())
    }
}

async fn check_status(response: Response) -> StoreResult<Response> {
    let status = response.status();
    if status.is_success() {
        return Ok(response);
    }
    let body = response.text().await.unwrap_or_default();
    let message = serde_json::from_str::<ApiError>(&body)
        .map(|e| e.message)
        .unwrap_or(body);
    Err(StoreError::Server {
        status: status.as_u16(),
        message,
    })
}

fn batch_failed(completed: Vec<UploadReceipt>, source: StoreError) -> StoreError {
    StoreError::BatchFailed {
        completed,
        source: Box::new(source),
    }
}

#[async_trait]
impl ContentStore for IpfsClient {
    async fn upload(&self, content: &[u8], filename: Option<&str>) -> StoreResult<UploadReceipt> {
        let path = filename.unwrap_or(DEFAULT_FILENAME);
        let url = format!("{}?pin=false&progress=false", self.endpoint("add"));
        let url = url.as_str();
        tracing::debug!(path, bytes = content.len(), "uploading");

        let entry = self
            .config
            .retry
            .run("add", self.config.request_timeout, move || async move {
                let part = Part::bytes(content.to_vec()).file_name(urlencoding::encode(path).into_owned());
                let response = self
                    .post(url)
                    .multipart(Form::new().part("file", part))
                    .send()
                    .await
                    .map_err(|e| {
                        transport_error(e, |reason| StoreError::UploadFailed { path: path.to_string(), reason })
                    })?;
                let body = check_status(response).await?.text().await.map_err(|e| {
                    transport_error(e, |reason| StoreError::UploadFailed { path: path.to_string(), reason })
                })?;

                // A name with separators makes the node also report the
                // wrapping directories; the file's own entry comes first.
                let mut entries = Vec::new();
                for line in body.lines().filter(|l| !l.trim().is_empty()) {
                    match serde_json::from_str::<AddLine>(line) {
                        Ok(AddLine::Entry(entry)) => entries.push(entry),
                        Ok(AddLine::Error(err)) => {
                            return Err(StoreError::UploadFailed { path: path.to_string(), reason: err.message })
                        }
                        Err(e) => {
                            return Err(StoreError::UploadFailed {
                                path: path.to_string(),
                                reason: format!("unreadable response: {e}"),
                            })
                        }
                    }
                }
                if entries.is_empty() {
                    return Err(StoreError::UploadFailed {
                        path: path.to_string(),
                        reason: "node returned no entry".into(),
                    });
                }
                let position = entries.iter().position(|e| e.name == path).unwrap_or(0);
                Ok(entries.swap_remove(position))
            })
            .await
            .map_err(|e| e.into_upload_failure(path))?;

        let mut receipt = self.receipt(entry, content.len() as u64)?;
        receipt.path = path.to_string();
        tracing::debug!(path, cid = %receipt.cid, size = receipt.size, "uploaded");
        Ok(receipt)
    }

    async fn upload_many(&self, files: &[FileEntry]) -> StoreResult<Vec<UploadReceipt>> {
        if files.is_empty() {
            return Ok(Vec::new());
        }
        let url = format!("{}?pin=false&progress=false", self.endpoint("add"));
        let url = url.as_str();
        let timeout = self.config.request_timeout;
        tracing::debug!(entries = files.len(), "uploading batch");

        let mut response = self
            .config
            .retry
            .run("add", timeout, move || async move {
                let form = Self::batch_form(files)?;
                let response = self.post(url).multipart(form).send().await.map_err(|e| {
                    transport_error(e, |reason| StoreError::UploadFailed { path: files[0].path.clone(), reason })
                })?;
                check_status(response).await
            })
            .await
            .map_err(|e| batch_failed(Vec::new(), e.into_upload_failure(&files[0].path)))?;

        // Results stream back one JSON object per line as the node stores
        // each entry; whatever arrived before a failure is reported.
        let mut completed = Vec::new();
        let mut buffer: Vec<u8> = Vec::new();
        loop {
            let chunk = match tokio::time::timeout(timeout, response.chunk()).await {
                Ok(Ok(Some(chunk))) => chunk,
                Ok(Ok(None)) => break,
                Ok(Err(e)) => {
                    let path = next_pending(files, &completed);
                    let err = transport_error(e, |reason| StoreError::UploadFailed { path, reason });
                    return Err(batch_failed(completed, err));
                }
                Err(_) => {
                    let err = StoreError::UploadFailed {
                        path: next_pending(files, &completed),
                        reason: format!("no response from node within {timeout:?}"),
                    };
                    return Err(batch_failed(completed, err));
                }
            };
            buffer.extend_from_slice(&chunk);
            while let Some(pos) = buffer.iter().position(|b| *b == b'\n') {
                let line: Vec<u8> = buffer.drain(..=pos).collect();
                if let Err(err) = self.accept_line(&line, files, &mut completed) {
                    return Err(batch_failed(completed, err));
                }
            }
        }
        if let Err(err) = self.accept_line(&buffer, files, &mut completed) {
            return Err(batch_failed(completed, err));
        }

        if let Some(missing) = files.iter().find(|f| !completed.iter().any(|r| r.path == f.path)) {
            let err = StoreError::UploadFailed {
                path: missing.path.clone(),
                reason: "node reported no result for this entry".into(),
            };
            return Err(batch_failed(completed, err));
        }

        tracing::debug!(entries = completed.len(), "batch uploaded");
        Ok(completed)
    }

    async fn fetch_bytes(&self, cid: &ContentId) -> StoreResult<Vec<u8>> {
        let url = format!("{}?arg={}", self.endpoint("cat"), urlencoding::encode(cid.as_str()));
        let url = url.as_str();
        tracing::debug!(%cid, "fetching");

        let retrieval = |reason: String| StoreError::RetrievalFailed { cid: cid.clone(), reason };
        let bytes = self
            .config
            .retry
            .run("cat", self.config.request_timeout, move || async move {
                let response = self.post(url).send().await.map_err(|e| transport_error(e, retrieval))?;
                let mut response = check_status(response).await?;
                let mut buffer = Vec::new();
                while let Some(chunk) = response.chunk().await.map_err(|e| transport_error(e, retrieval))? {
                    buffer.extend_from_slice(&chunk);
                }
                Ok(buffer)
            })
            .await
            .map_err(|e| e.into_retrieval_failure(cid))?;

        tracing::debug!(%cid, bytes = bytes.len(), "fetched");
        Ok(bytes)
    }

    async fn pin(&self, cid: &ContentId) -> StoreResult<()> {
        let url = format!("{}?arg={}", self.endpoint("pin/add"), urlencoding::encode(cid.as_str()));
        let url = url.as_str();
        tracing::debug!(%cid, "pinning");

        let pin_failed = |reason: String| StoreError::PinFailed { cid: cid.clone(), reason, uploaded: None };
        let pinned = self
            .config
            .retry
            .run("pin", self.config.request_timeout, move || async move {
                let response = self.post(url).send().await.map_err(|e| transport_error(e, pin_failed))?;
                let response = check_status(response).await?;
                let body: PinResponse = response.json().await.map_err(|e| transport_error(e, pin_failed))?;
                Ok(body.pins)
            })
            .await
            .map_err(|e| e.into_pin_failure(cid))?;

        tracing::debug!(%cid, pins = pinned.len(), "pinned");
        Ok(())
    }

    fn resolve_url(&self, cid: &ContentId) -> String {
        self.config.gateway.resolve(cid)
    }
}

impl std::fmt::Debug for IpfsClient {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("IpfsClient")
            .field("api_url", &self.config.api_url)
            .field("gateway", &self.config.gateway.base())
            .field("authenticated", &self.authorization.is_some())
            .finish()
    }
}
