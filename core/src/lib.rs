//! Authenticated HTTP client core.
//!
//! # Overview
//! Describes HTTP calls as immutable values (`Request`), projects the
//! supported authentication flows onto them (`AuthRequest`), and executes
//! them through an injected `Transport`. `NetworkClient` caches a single
//! `AuthResponse` token and classifies every response into success metadata
//! or an `ApiError`.
//!
//! # Design
//! - Request building is pure: `Request::to_http_request` produces a plain
//!   `HttpRequest` and never performs I/O.
//! - The transport and the clock are traits passed in at construction; there
//!   is no global registry.
//! - The token cache is owned by `NetworkClient` and guarded by one async
//!   mutex; `send` never takes it.
//! - No retries: every failure is returned to the caller with its status,
//!   body, or underlying cause.

pub mod auth;
pub mod client;
pub mod clock;
pub mod error;
pub mod http;
pub mod request;
pub mod response;
pub mod token;
pub mod transport;

pub use auth::{AuthRequest, Provider};
pub use client::{NetworkClient, NetworkService};
pub use clock::{Clock, SystemClock};
pub use error::{ApiError, BoxError};
pub use http::{HttpMethod, HttpRequest, HttpResponse};
pub use request::{Configuration, Endpoint, Payload, Request};
pub use response::{Metadata, Response};
pub use token::AuthResponse;
pub use transport::{ReqwestTransport, Transport};
