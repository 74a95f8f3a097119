//! Purpose: Provide the HTTP/JSON client for the remote record API.
//! Exports: `RemoteClient`.
//! Role: `RecordApi` implementation over a JSONPlaceholder-style REST resource.
//! Invariants: Collection is `{base}/{resource}`; records are `{base}/{resource}/{id}`.
//! Invariants: Listing uses `_start`/`_limit` query parameters.
//! Invariants: Every failure maps to an `ErrorKind`; transport failures are `Network`.
#![allow(clippy::result_large_err)]

use super::client::{ApiResult, RecordApi};
use crate::config::{CatalogConfig, DEFAULT_RESOURCE, DEFAULT_TIMEOUT};
use crate::core::error::{Error, ErrorKind};
use crate::core::record::{Record, RecordDraft};
use serde::Deserialize;
use serde::Serialize;
use serde::de::DeserializeOwned;
use std::sync::Arc;
use std::time::Duration;
use tracing::debug;
use url::Url;

#[derive(Clone)]
pub struct RemoteClient {
    inner: Arc<RemoteClientInner>,
}

struct RemoteClientInner {
    base_url: Url,
    resource: String,
    timeout: Duration,
    agent: ureq::Agent,
}

#[derive(Deserialize)]
struct ErrorEnvelope {
    error: RemoteError,
}

#[derive(Deserialize)]
struct RemoteError {
    kind: String,
    message: Option<String>,
    hint: Option<String>,
    id: Option<u64>,
}

impl RemoteClient {
    pub fn new(base_url: impl Into<String>) -> ApiResult<Self> {
        let base_url = normalize_base_url(base_url.into())?;
        Ok(Self {
            inner: Arc::new(RemoteClientInner {
                base_url,
                resource: DEFAULT_RESOURCE.to_string(),
                timeout: DEFAULT_TIMEOUT,
                agent: build_agent(DEFAULT_TIMEOUT),
            }),
        })
    }

    pub fn from_config(config: &CatalogConfig) -> ApiResult<Self> {
        config.validate()?;
        Ok(Self::new(config.base_url.clone())?
            .with_resource(config.resource.clone())?
            .with_timeout(config.timeout))
    }

    pub fn with_resource(self, resource: impl Into<String>) -> ApiResult<Self> {
        let resource = resource.into();
        ensure_resource_name(&resource)?;
        Ok(self.rebuild(|inner| inner.resource = resource))
    }

    pub fn with_timeout(self, timeout: Duration) -> Self {
        self.rebuild(|inner| {
            inner.timeout = timeout;
            inner.agent = build_agent(timeout);
        })
    }

    pub fn base_url(&self) -> &Url {
        &self.inner.base_url
    }

    pub fn resource(&self) -> &str {
        &self.inner.resource
    }

    pub fn timeout(&self) -> Duration {
        self.inner.timeout
    }

    fn collection_url(&self) -> ApiResult<Url> {
        build_url(&self.inner.base_url, &[&self.inner.resource])
    }

    fn record_url(&self, id: u64) -> ApiResult<Url> {
        build_url(
            &self.inner.base_url,
            &[&self.inner.resource, &id.to_string()],
        )
    }

    fn request_json<T, R>(&self, request: ureq::Request, body: Option<&T>) -> ApiResult<R>
    where
        T: Serialize,
        R: DeserializeOwned,
    {
        let response = self.send(request.set("Accept", "application/json"), body)?;
        read_json_response(response)
    }

    fn send<T>(&self, request: ureq::Request, body: Option<&T>) -> ApiResult<ureq::Response>
    where
        T: Serialize,
    {
        debug!(method = request.method(), url = request.url(), "remote request");
        let response = match body {
            None => request.call(),
            Some(body) => {
                let payload = serde_json::to_string(body).map_err(|err| {
                    Error::new(ErrorKind::Internal)
                        .with_message("failed to encode request json")
                        .with_source(err)
                })?;
                request
                    .set("Content-Type", "application/json")
                    .send_string(&payload)
            }
        };

        match response {
            Ok(resp) => Ok(resp),
            Err(ureq::Error::Status(code, resp)) => Err(parse_error_response(code, resp)),
            Err(ureq::Error::Transport(err)) => Err(Error::new(ErrorKind::Network)
                .with_message("request failed")
                .with_source(err)),
        }
    }

    fn request(&self, method: &str, url: &Url) -> ureq::Request {
        self.inner.agent.request(method, url.as_str())
    }

    fn rebuild(mut self, change: impl FnOnce(&mut RemoteClientInner)) -> Self {
        if let Some(inner) = Arc::get_mut(&mut self.inner) {
            change(inner);
        } else {
            let mut inner = RemoteClientInner {
                base_url: self.inner.base_url.clone(),
                resource: self.inner.resource.clone(),
                timeout: self.inner.timeout,
                agent: self.inner.agent.clone(),
            };
            change(&mut inner);
            self.inner = Arc::new(inner);
        }
        self
    }
}

impl RecordApi for RemoteClient {
    fn list(&self, offset: usize, limit: usize) -> ApiResult<Vec<Record>> {
        let url = self.collection_url()?;
        let request = self
            .request("GET", &url)
            .query("_start", &offset.to_string())
            .query("_limit", &limit.to_string());
        self.request_json::<(), _>(request, None)
    }

    fn get(&self, id: u64) -> ApiResult<Record> {
        let url = self.record_url(id)?;
        self.request_json::<(), _>(self.request("GET", &url), None)
            .map_err(|err| err.with_id(id))
    }

    fn create(&self, draft: &RecordDraft) -> ApiResult<Record> {
        let url = self.collection_url()?;
        self.request_json(self.request("POST", &url), Some(draft))
    }

    fn update(&self, record: &Record) -> ApiResult<Record> {
        let url = self.record_url(record.id)?;
        self.request_json(self.request("PUT", &url), Some(record))
            .map_err(|err| err.with_id(record.id))
    }

    fn delete(&self, id: u64) -> ApiResult<()> {
        let url = self.record_url(id)?;
        self.send::<()>(self.request("DELETE", &url), None)
            .map(|_response| ())
            .map_err(|err| err.with_id(id))
    }
}

fn build_agent(timeout: Duration) -> ureq::Agent {
    ureq::AgentBuilder::new().timeout(timeout).build()
}

fn normalize_base_url(raw: String) -> ApiResult<Url> {
    let mut url = Url::parse(raw.trim()).map_err(|err| {
        Error::new(ErrorKind::Usage)
            .with_message("invalid remote base url")
            .with_hint("Use an absolute URL like https://jsonplaceholder.typicode.com.")
            .with_source(err)
    })?;
    let scheme = url.scheme();
    if scheme != "http" && scheme != "https" {
        return Err(Error::new(ErrorKind::Usage)
            .with_message("remote base url must use http or https scheme"));
    }
    if url.cannot_be_a_base() {
        return Err(Error::new(ErrorKind::Usage).with_message("remote base url cannot be a base"));
    }
    url.set_query(None);
    url.set_fragment(None);
    Ok(url)
}

// Appends to any path prefix the base url carries.
fn build_url(base_url: &Url, segments: &[&str]) -> ApiResult<Url> {
    let mut url = base_url.clone();
    {
        let mut path = url.path_segments_mut().map_err(|_| {
            Error::new(ErrorKind::Usage).with_message("remote base url cannot be a base")
        })?;
        path.pop_if_empty();
        for segment in segments {
            path.push(segment);
        }
    }
    Ok(url)
}

fn ensure_resource_name(resource: &str) -> ApiResult<()> {
    if resource.is_empty() || resource.contains('/') {
        return Err(Error::new(ErrorKind::Usage)
            .with_message("resource name must be a single non-empty path segment")
            .with_hint("Use a plain name like `posts`."));
    }
    Ok(())
}

fn read_json_response<R>(response: ureq::Response) -> ApiResult<R>
where
    R: DeserializeOwned,
{
    let body = response.into_string().map_err(|err| {
        Error::new(ErrorKind::Network)
            .with_message("failed to read response body")
            .with_source(err)
    })?;
    serde_json::from_str(&body).map_err(|err| {
        Error::new(ErrorKind::Network)
            .with_message("invalid response json")
            .with_source(err)
    })
}

fn parse_error_response(status: u16, response: ureq::Response) -> Error {
    let body = response.into_string().unwrap_or_default();
    if let Ok(envelope) = serde_json::from_str::<ErrorEnvelope>(&body) {
        return error_from_remote(envelope.error);
    }
    let kind = error_kind_from_status(status);
    Error::new(kind).with_message(format!("remote error status {status}"))
}

fn error_from_remote(remote: RemoteError) -> Error {
    let mut err = Error::new(parse_error_kind(&remote.kind));
    if let Some(message) = remote.message {
        err = err.with_message(message);
    }
    if let Some(hint) = remote.hint {
        err = err.with_hint(hint);
    }
    if let Some(id) = remote.id {
        err = err.with_id(id);
    }
    err
}

fn parse_error_kind(kind: &str) -> ErrorKind {
    match kind {
        "Usage" => ErrorKind::Usage,
        "NotFound" => ErrorKind::NotFound,
        _ => ErrorKind::Network,
    }
}

fn error_kind_from_status(status: u16) -> ErrorKind {
    match status {
        400 | 413 | 422 => ErrorKind::Usage,
        404 => ErrorKind::NotFound,
        _ => ErrorKind::Network,
    }
}
