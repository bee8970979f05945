//! The seam between the client and whatever performs the network call.
//!
//! # Design
//! The client hands a transport a fully prepared `http::Request<Bytes>`:
//! URL resolved, params in the query, headers merged and body encoded. The
//! transport hands back any response it received, whatever the status; the
//! client decides what counts as success. Only failures where no response
//! exists at all travel through `TransportError`.

use std::future::Future;
use std::time::Duration;

use bytes::Bytes;
use thiserror::Error;

use crate::error::BoxError;

/// Performs one HTTP round-trip.
pub trait Transport: Send + Sync {
    /// Execute `request` and return the response, whatever its status.
    ///
    /// Implementations honor the [`Timeout`] extension when present.
    fn execute(
        &self,
        request: http::Request<Bytes>,
    ) -> impl Future<Output = Result<http::Response<Bytes>, TransportError>> + Send;
}

/// A round-trip that produced no response.
#[derive(Debug, Error)]
pub enum TransportError {
    #[error("request timed out")]
    Timeout,

    /// Connection-level failure: DNS, refused, reset, TLS.
    #[error("network error: {0}")]
    Network(#[source] BoxError),

    /// The transport could not run the request at all. Not an HTTP outcome,
    /// so it is never handed to an error handler.
    #[error("invalid request: {0}")]
    Invalid(#[source] BoxError),
}

/// Request extension carrying the descriptor's timeout.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Timeout(pub Duration);

/// Request extension carrying the descriptor's credentials mode.
///
/// Adapters without an ambient credential store (cookie jar) may ignore it.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum Credentials {
    #[default]
    SameOrigin,
    Include,
}

impl Credentials {
    pub fn from_flag(with_credentials: Option<bool>) -> Self {
        if with_credentials == Some(true) {
            Credentials::Include
        } else {
            Credentials::SameOrigin
        }
    }
}
