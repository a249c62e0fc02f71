//! Declarative description of an HTTP call.
//!
//! # Design
//! A `Request` is an immutable bundle of `Endpoint`, `Payload` and
//! `Configuration`. `Request::to_http_request` is a pure function of those
//! three values: maps are ordered (`BTreeMap`) so the same input always
//! yields an identical `HttpRequest`.

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};
use url::Url;

use crate::error::ApiError;
use crate::http::{HttpMethod, HttpRequest};

pub const DEFAULT_BASE_URL: &str = "https://api.l7mobile.com";
pub const CONTENT_TYPE: &str = "Content-Type";
pub const APPLICATION_JSON: &str = "application/json";

/// Base URL and headers applied to every request built against it.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Configuration {
    pub base_url: Url,
    #[serde(default)]
    pub default_headers: BTreeMap<String, String>,
}

impl Configuration {
    pub fn new(base_url: Url) -> Self {
        Self {
            base_url,
            default_headers: BTreeMap::new(),
        }
    }

    /// Parse `base_url` and build a configuration with no default headers.
    pub fn parse(base_url: &str) -> Result<Self, ApiError> {
        let url = Url::parse(base_url).map_err(|e| ApiError::InvalidUrl(format!("{base_url}: {e}")))?;
        Ok(Self::new(url))
    }

    pub fn with_header(mut self, name: impl Into<String>, value: impl Into<String>) -> Self {
        self.default_headers.insert(name.into(), value.into());
        self
    }
}

impl Default for Configuration {
    /// The production API with a JSON content type.
    fn default() -> Self {
        let url = Url::parse(DEFAULT_BASE_URL).expect("DEFAULT_BASE_URL is a valid URL");
        Self::new(url).with_header(CONTENT_TYPE, APPLICATION_JSON)
    }
}

/// Path, method and query of a call.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Endpoint {
    pub path: String,
    pub method: HttpMethod,
    pub query: Option<BTreeMap<String, String>>,
}

impl Endpoint {
    pub fn new(path: impl Into<String>, method: HttpMethod) -> Self {
        Self {
            path: path.into(),
            method,
            query: None,
        }
    }

    pub fn get(path: impl Into<String>) -> Self {
        Self::new(path, HttpMethod::Get)
    }

    pub fn post(path: impl Into<String>) -> Self {
        Self::new(path, HttpMethod::Post)
    }

    pub fn with_query(mut self, name: impl Into<String>, value: impl Into<String>) -> Self {
        self.query
            .get_or_insert_with(BTreeMap::new)
            .insert(name.into(), value.into());
        self
    }
}

/// Per-call headers and body.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Payload {
    pub headers: Option<BTreeMap<String, String>>,
    pub body: Option<Vec<u8>>,
}

impl Payload {
    /// No headers, no body.
    pub fn empty() -> Self {
        Self::default()
    }

    pub fn new(headers: Option<BTreeMap<String, String>>, body: Option<Vec<u8>>) -> Self {
        Self { headers, body }
    }

    /// Serialize `value` as the body and mark it as JSON. Fails instead of
    /// sending an empty body when serialization fails.
    pub fn json<T: Serialize + ?Sized>(value: &T) -> Result<Self, ApiError> {
        let body = serde_json::to_vec(value).map_err(ApiError::SerializationError)?;
        Ok(Self::empty()
            .with_header(CONTENT_TYPE, APPLICATION_JSON)
            .with_body(body))
    }

    pub fn with_header(mut self, name: impl Into<String>, value: impl Into<String>) -> Self {
        self.headers
            .get_or_insert_with(BTreeMap::new)
            .insert(name.into(), value.into());
        self
    }

    pub fn with_body(mut self, body: impl Into<Vec<u8>>) -> Self {
        self.body = Some(body.into());
        self
    }
}

/// A complete, immutable description of one HTTP call.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Request {
    pub endpoint: Endpoint,
    pub payload: Payload,
    pub configuration: Configuration,
}

impl Request {
    pub fn new(endpoint: Endpoint, configuration: Configuration) -> Self {
        Self {
            endpoint,
            payload: Payload::empty(),
            configuration,
        }
    }

    pub fn with_payload(mut self, payload: Payload) -> Self {
        self.payload = payload;
        self
    }

    /// Build the transport-level request.
    ///
    /// The endpoint path is appended to the base URL segment by segment
    /// (percent-encoded), then a non-empty query is appended. Empty segments
    /// are kept, so `//` and a trailing `/` survive; an empty path leaves the
    /// base URL as is. `.` and `..` segments are rejected. Headers are
    /// applied in two passes, configuration defaults first and payload
    /// headers second; a later name overrides an earlier one regardless of
    /// case. The body is passed through untouched.
    pub fn to_http_request(&self) -> Result<HttpRequest, ApiError> {
        let mut url = self.configuration.base_url.clone();
        if url.cannot_be_a_base() {
            return Err(ApiError::InvalidUrl(url.to_string()));
        }

        let path = self.endpoint.path.strip_prefix('/').unwrap_or(&self.endpoint.path);
        if !path.is_empty() {
            let segments: Vec<&str> = path.split('/').collect();
            if segments.iter().any(|s| *s == "." || *s == "..") {
                return Err(ApiError::InvalidUrl(format!(
                    "dot segment in path {}",
                    self.endpoint.path
                )));
            }
            url.path_segments_mut()
                .map_err(|_| ApiError::InvalidUrl(self.configuration.base_url.to_string()))?
                .pop_if_empty()
                .extend(segments);
        }

        if let Some(query) = self.endpoint.query.as_ref().filter(|q| !q.is_empty()) {
            url.query_pairs_mut().extend_pairs(query.iter());
        }

        let mut request = HttpRequest::new(self.endpoint.method, url.as_str());
        for (name, value) in &self.configuration.default_headers {
            request.set_header(name, value);
        }
        for (name, value) in self.payload.headers.iter().flatten() {
            request.set_header(name, value);
        }
        request.body = self.payload.body.clone();
        Ok(request)
    }
}
