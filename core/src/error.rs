//! Error types for the courier client.
//!
//! # Design
//! Two families live here. `ErrorContext` is the normalized description of a
//! failed HTTP call: every transport failure is turned into one before an
//! error handler sees it, so handlers never touch adapter-specific error
//! types. `Error` is what a call returns to its caller: either whatever a
//! handler chose to propagate, or a programming error (bad URL, bad header,
//! undecodable body) that is never routed through a handler.

use std::collections::BTreeMap;
use std::fmt;

use bytes::Bytes;
use thiserror::Error;

use crate::http::{flatten_headers, HttpMethod, HttpRequest, ResponseBody, ResponseType};
use crate::transport::TransportError;

/// Type-erased error source used for foreign errors.
pub type BoxError = Box<dyn std::error::Error + Send + Sync>;

/// Why a call produced an `ErrorContext`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorKind {
    /// A response arrived with a non-2xx status.
    Status,
    /// No response arrived before the request timeout.
    Timeout,
    /// No response arrived at all (DNS, connect, reset).
    Network,
}

/// A failed call, described the same way whichever transport ran it.
#[derive(Debug, Clone, PartialEq)]
pub struct ErrorContext {
    pub kind: ErrorKind,
    /// `None` when no response was received.
    pub status: Option<u16>,
    pub status_text: Option<String>,
    pub data: Option<ResponseBody>,
    /// Empty when no response was received.
    pub headers: BTreeMap<String, String>,
    pub url: String,
    pub method: HttpMethod,
}

impl ErrorContext {
    /// Context for a response that arrived with a non-2xx status.
    pub fn from_response(request: &HttpRequest, response: http::Response<Bytes>) -> Self {
        let (parts, body) = response.into_parts();
        ErrorContext {
            kind: ErrorKind::Status,
            status: Some(parts.status.as_u16()),
            status_text: parts.status.canonical_reason().map(str::to_string),
            data: ResponseBody::sniff(body),
            headers: flatten_headers(&parts.headers),
            url: request.url.clone(),
            method: request.method,
        }
    }

    /// Context for a call that never produced a response.
    pub fn from_transport_error(request: &HttpRequest, error: &TransportError) -> Self {
        let kind = match error {
            TransportError::Timeout => ErrorKind::Timeout,
            _ => ErrorKind::Network,
        };
        ErrorContext {
            kind,
            status: None,
            status_text: Some(error.to_string()),
            data: None,
            headers: BTreeMap::new(),
            url: request.url.clone(),
            method: request.method,
        }
    }

    /// The status code, or 0 when no response was received.
    pub fn status_or_zero(&self) -> u16 {
        self.status.unwrap_or(0)
    }
}

impl fmt::Display for ErrorContext {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} {} failed", self.method, self.url)?;
        if let Some(status) = self.status {
            write!(f, " with status {status}")?;
        }
        if let Some(text) = &self.status_text {
            write!(f, ": {text}")?;
        }
        Ok(())
    }
}

impl std::error::Error for ErrorContext {}

/// Errors returned from a client call.
#[derive(Debug, Error)]
pub enum Error {
    /// An error handler re-raised the failed call's context.
    #[error(transparent)]
    Http(ErrorContext),

    /// An error handler raised an error of its own.
    #[error(transparent)]
    Handler(BoxError),

    #[error("invalid URL {url:?}: {source}")]
    InvalidUrl {
        url: String,
        #[source]
        source: BoxError,
    },

    #[error("invalid header {name:?}")]
    InvalidHeader { name: String },

    #[error("unsupported HTTP method {0:?}")]
    UnsupportedMethod(String),

    /// The request body could not be encoded as JSON.
    #[error("failed to serialize request body: {0}")]
    Serialize(#[from] serde_json::Error),

    /// A successful response body could not be decoded as requested.
    #[error("failed to decode {response_type} response body: {source}")]
    Decode {
        response_type: ResponseType,
        #[source]
        source: BoxError,
    },

    /// The transport failed for a reason other than the HTTP exchange.
    #[error("transport failure: {0}")]
    Transport(#[source] BoxError),

    #[error("invalid client options: {0}")]
    Config(#[from] toml::de::Error),
}

impl Error {
    /// Wrap a handler's own error so it reaches the caller as-is.
    pub fn handler(error: impl Into<BoxError>) -> Self {
        Error::Handler(error.into())
    }

    pub(crate) fn invalid_url(url: &str, source: impl Into<BoxError>) -> Self {
        Error::InvalidUrl {
            url: url.to_string(),
            source: source.into(),
        }
    }

    pub(crate) fn decode(response_type: ResponseType, source: impl Into<BoxError>) -> Self {
        Error::Decode {
            response_type,
            source: source.into(),
        }
    }

    /// The context of a propagated HTTP failure, if this is one.
    pub fn context(&self) -> Option<&ErrorContext> {
        match self {
            Error::Http(context) => Some(context),
            _ => None,
        }
    }
}

impl From<ErrorContext> for Error {
    fn from(context: ErrorContext) -> Self {
        Error::Http(context)
    }
}
