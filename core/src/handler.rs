//! Error handlers and call outcomes.
//!
//! # Design
//! A handler is the only place where failure-branch decisions are made. It
//! receives the normalized `ErrorContext` and answers with `Handled`: either
//! a recovered value that the call returns as `Outcome::Recovered`, or an
//! error the call returns unmodified. The client itself never inspects
//! status codes on behalf of the caller.

use crate::error::{Error, ErrorContext};
use crate::http::HttpResponse;

/// A handler's verdict on a failed call.
#[derive(Debug)]
pub enum Handled<R> {
    /// Stand-in result for the failed call.
    Recovered(R),
    /// Fail the call with this error.
    Propagate(Error),
}

impl<R> Handled<R> {
    /// Fail the call with the context it was given.
    pub fn propagate(context: ErrorContext) -> Self {
        Handled::Propagate(Error::Http(context))
    }
}

impl<R> From<Result<R, Error>> for Handled<R> {
    fn from(result: Result<R, Error>) -> Self {
        match result {
            Ok(value) => Handled::Recovered(value),
            Err(err) => Handled::Propagate(err),
        }
    }
}

/// Strategy invoked exactly once for every failed call.
///
/// `R` is the recovery type shared by every handler attached to a client.
pub trait ErrorHandler<R>: Send + Sync {
    fn handle_error(&self, context: ErrorContext) -> Handled<R>;
}

impl<R, F> ErrorHandler<R> for F
where
    F: Fn(ErrorContext) -> Handled<R> + Send + Sync,
{
    fn handle_error(&self, context: ErrorContext) -> Handled<R> {
        self(context)
    }
}

/// Propagates every failure to the caller.
#[derive(Debug, Clone, Copy, Default)]
pub struct PropagateErrors;

impl<R> ErrorHandler<R> for PropagateErrors {
    fn handle_error(&self, context: ErrorContext) -> Handled<R> {
        Handled::propagate(context)
    }
}

/// Result of a call that did not fail: a response, or a handler's stand-in.
#[derive(Debug, Clone, PartialEq)]
pub enum Outcome<T, R> {
    Response(HttpResponse<T>),
    Recovered(R),
}

impl<T, R> Outcome<T, R> {
    pub fn is_response(&self) -> bool {
        matches!(self, Outcome::Response(_))
    }

    pub fn response(self) -> Option<HttpResponse<T>> {
        match self {
            Outcome::Response(response) => Some(response),
            Outcome::Recovered(_) => None,
        }
    }

    pub fn recovered(self) -> Option<R> {
        match self {
            Outcome::Response(_) => None,
            Outcome::Recovered(value) => Some(value),
        }
    }
}
