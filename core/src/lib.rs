//! Transport-agnostic HTTP client core.
//!
//! # Overview
//! Callers describe a call as an `HttpRequest`, send it through an
//! `HttpClient`, and get back either a typed `HttpResponse<T>` or whatever
//! their error handler made of the failure. The network round-trip is
//! delegated to a `Transport`; adapters for concrete libraries live in the
//! `courier-transport` crate.
//!
//! # Design
//! - Request middleware folds over the descriptor before dispatch; response
//!   middleware folds over the decoded envelope on success only.
//! - Every transport failure becomes one `ErrorContext`, handed to exactly
//!   one `ErrorHandler`, which recovers (`Handled::Recovered`) or propagates
//!   (`Handled::Propagate`). The client never retries or swallows errors.
//! - Failures that are not HTTP outcomes (bad URL, undecodable body) skip the
//!   handler and return directly.

pub mod client;
pub mod config;
pub mod error;
pub mod handler;
pub mod http;
pub mod middleware;
pub mod transport;

pub use client::{Client, HttpClient};
pub use config::ClientOptions;
pub use error::{BoxError, Error, ErrorContext, ErrorKind};
pub use handler::{ErrorHandler, Handled, Outcome, PropagateErrors};
pub use crate::http::{HttpMethod, HttpRequest, HttpResponse, RequestConfig, ResponseBody, ResponseType};
pub use middleware::{
    ApiKeyMiddleware, BearerTokenMiddleware, DataTransformMiddleware, LoggingMiddleware, QueryParamsMiddleware,
    RequestIdMiddleware, RequestMiddleware, ResponseMiddleware, TimeoutMiddleware,
};
pub use transport::{Credentials, Timeout, Transport, TransportError};
