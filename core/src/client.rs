//! Authenticated HTTP client with a single cached token.
//!
//! # Design
//! `NetworkClient` owns the transport, the clock, and the token cache. The
//! cache sits behind a `tokio::sync::Mutex` that `authenticate` holds for the
//! whole check-fetch-store sequence, so concurrent calls are serialized and
//! a second caller sees the first caller's token instead of fetching again.
//! `send` never touches the cache and runs without the lock.
//!
//! Clones share the cache. Consumers that only need the two operations take
//! a `NetworkService`, which lets tests hand them a stand-in.

use std::sync::Arc;

use async_trait::async_trait;
use tokio::sync::Mutex;
use tracing::{debug, info, warn};

use crate::auth::AuthRequest;
use crate::clock::{Clock, SystemClock};
use crate::error::ApiError;
use crate::http::{HttpRequest, HttpResponse};
use crate::request::{Configuration, Request};
use crate::response::{extract_message, Metadata, Response};
use crate::token::AuthResponse;
use crate::transport::{ReqwestTransport, Transport};

/// The two operations the rest of an application depends on.
#[async_trait]
pub trait NetworkService: Send + Sync {
    async fn authenticate(&self, request: &AuthRequest) -> Result<AuthResponse, ApiError>;
    async fn send(&self, request: &Request) -> Result<Response, ApiError>;
}

#[derive(Clone)]
pub struct NetworkClient {
    transport: Arc<dyn Transport>,
    clock: Arc<dyn Clock>,
    auth_configuration: Configuration,
    token: Arc<Mutex<Option<AuthResponse>>>,
}

impl NetworkClient {
    pub fn new(transport: impl Transport + 'static) -> Self {
        Self {
            transport: Arc::new(transport),
            clock: Arc::new(SystemClock),
            auth_configuration: Configuration::default(),
            token: Arc::new(Mutex::new(None)),
        }
    }

    /// Client over `reqwest` with the system clock and default configuration.
    pub fn live() -> Self {
        Self::new(ReqwestTransport::new())
    }

    pub fn with_clock(mut self, clock: impl Clock + 'static) -> Self {
        self.clock = Arc::new(clock);
        self
    }

    /// Configuration that `AuthRequest`s are projected against.
    pub fn with_configuration(mut self, configuration: Configuration) -> Self {
        self.auth_configuration = configuration;
        self
    }

    pub fn configuration(&self) -> &Configuration {
        &self.auth_configuration
    }

    /// Return the cached token if it is still valid, otherwise run `request`
    /// and cache the token it yields.
    #[tracing::instrument(skip(self, request), fields(kind = request.kind()))]
    pub async fn authenticate(&self, request: &AuthRequest) -> Result<AuthResponse, ApiError> {
        let mut cached = self.token.lock().await;

        if let Some(token) = cached.as_ref() {
            if token.is_valid_at(self.clock.now()) {
                debug!("using cached token");
                return Ok(token.clone());
            }
            debug!(expiry = token.expiry, "cached token expired");
            *cached = None;
        }

        let http_request = request.request(&self.auth_configuration)?.to_http_request()?;
        let response = self.execute(http_request).await?;

        let token: AuthResponse =
            serde_json::from_slice(&response.body).map_err(ApiError::DecodingError)?;
        info!(expiry = token.expiry, "authenticated");
        *cached = Some(token.clone());
        Ok(token)
    }

    /// Execute `request` and wrap the body with status metadata.
    #[tracing::instrument(skip(self, request), fields(method = %request.endpoint.method, path = %request.endpoint.path))]
    pub async fn send(&self, request: &Request) -> Result<Response, ApiError> {
        let http_request = request.to_http_request()?;
        let response = self.execute(http_request).await?;

        let metadata = Metadata {
            status: response.is_success(),
            message: extract_message(&response.body),
            code: Some(response.status),
            timestamp: Some(self.clock.now()),
        };
        Ok(Response::new(metadata, Some(response.body)))
    }

    /// One exchange, classified: transport failure, missing status line,
    /// then non-2xx status.
    async fn execute(&self, request: HttpRequest) -> Result<HttpResponse, ApiError> {
        debug!(method = %request.method, url = %request.url, "sending request");
        let response = self
            .transport
            .execute(request)
            .await
            .map_err(ApiError::Unknown)?;
        check_status(response)
    }
}

#[async_trait]
impl NetworkService for NetworkClient {
    async fn authenticate(&self, request: &AuthRequest) -> Result<AuthResponse, ApiError> {
        NetworkClient::authenticate(self, request).await
    }

    async fn send(&self, request: &Request) -> Result<Response, ApiError> {
        NetworkClient::send(self, request).await
    }
}

/// Map responses without a status line or with a non-2xx status to errors.
fn check_status(response: HttpResponse) -> Result<HttpResponse, ApiError> {
    if !response.has_status_line() {
        warn!(status = response.status, "response has no usable status line");
        return Err(ApiError::InvalidResponse);
    }
    if !response.is_success() {
        warn!(status = response.status, "server rejected request");
        let body = (!response.body.is_empty()).then_some(response.body);
        return Err(ApiError::ServerError {
            status: response.status,
            body,
        });
    }
    Ok(response)
}
