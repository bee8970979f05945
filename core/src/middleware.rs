//! Request and response middleware.
//!
//! # Design
//! Middleware are pure functions folded left to right over a value that is
//! moved through the chain, so each step sees exactly the previous step's
//! output. Request middleware runs before dispatch; response middleware runs
//! only on the success path and sees the body already decoded.

use std::collections::BTreeMap;
use std::time::Duration;

use uuid::Uuid;

use crate::http::{insert_header, HttpRequest, HttpResponse, ResponseBody};

/// Rewrites a descriptor before dispatch. Must not perform I/O.
pub trait RequestMiddleware: Send + Sync {
    fn process_request(&self, request: HttpRequest) -> HttpRequest;
}

/// Rewrites a successful, decoded response.
pub trait ResponseMiddleware: Send + Sync {
    fn process_response(&self, response: HttpResponse<ResponseBody>) -> HttpResponse<ResponseBody>;
}

impl<F> RequestMiddleware for F
where
    F: Fn(HttpRequest) -> HttpRequest + Send + Sync,
{
    fn process_request(&self, request: HttpRequest) -> HttpRequest {
        self(request)
    }
}

impl<F> ResponseMiddleware for F
where
    F: Fn(HttpResponse<ResponseBody>) -> HttpResponse<ResponseBody> + Send + Sync,
{
    fn process_response(&self, response: HttpResponse<ResponseBody>) -> HttpResponse<ResponseBody> {
        self(response)
    }
}

/// Apply `chain` in order: `m_n(...m_2(m_1(request)))`.
pub fn apply_request_chain(chain: &[Box<dyn RequestMiddleware>], request: HttpRequest) -> HttpRequest {
    chain.iter().fold(request, |req, middleware| middleware.process_request(req))
}

/// Apply `chain` in order: `m_n(...m_2(m_1(response)))`.
pub fn apply_response_chain(
    chain: &[Box<dyn ResponseMiddleware>],
    response: HttpResponse<ResponseBody>,
) -> HttpResponse<ResponseBody> {
    chain.iter().fold(response, |resp, middleware| middleware.process_response(resp))
}

/// Sets `Authorization: Bearer <token>`.
#[derive(Debug, Clone)]
pub struct BearerTokenMiddleware {
    token: String,
}

impl BearerTokenMiddleware {
    pub fn new(token: impl Into<String>) -> Self {
        Self { token: token.into() }
    }
}

impl RequestMiddleware for BearerTokenMiddleware {
    fn process_request(&self, request: HttpRequest) -> HttpRequest {
        request.with_header("Authorization", format!("Bearer {}", self.token))
    }
}

/// Sends an API key in a header, `X-API-Key` unless told otherwise.
#[derive(Debug, Clone)]
pub struct ApiKeyMiddleware {
    api_key: String,
    header_name: String,
}

impl ApiKeyMiddleware {
    pub const DEFAULT_HEADER: &'static str = "X-API-Key";

    pub fn new(api_key: impl Into<String>) -> Self {
        Self::with_header(api_key, Self::DEFAULT_HEADER)
    }

    pub fn with_header(api_key: impl Into<String>, header_name: impl Into<String>) -> Self {
        Self {
            api_key: api_key.into(),
            header_name: header_name.into(),
        }
    }
}

impl RequestMiddleware for ApiKeyMiddleware {
    fn process_request(&self, request: HttpRequest) -> HttpRequest {
        request.with_header(self.header_name.clone(), self.api_key.clone())
    }
}

/// Merges fixed query params into every request; injected values win.
#[derive(Debug, Clone)]
pub struct QueryParamsMiddleware {
    params: BTreeMap<String, String>,
}

impl QueryParamsMiddleware {
    pub fn new(params: impl IntoIterator<Item = (String, String)>) -> Self {
        Self {
            params: params.into_iter().collect(),
        }
    }
}

impl RequestMiddleware for QueryParamsMiddleware {
    fn process_request(&self, mut request: HttpRequest) -> HttpRequest {
        request.params.extend(self.params.clone());
        request
    }
}

/// Overrides the request timeout.
#[derive(Debug, Clone, Copy)]
pub struct TimeoutMiddleware {
    timeout: Duration,
}

impl TimeoutMiddleware {
    pub fn new(timeout: Duration) -> Self {
        Self { timeout }
    }
}

impl RequestMiddleware for TimeoutMiddleware {
    fn process_request(&self, request: HttpRequest) -> HttpRequest {
        request.with_timeout(self.timeout)
    }
}

/// Tags each request with a fresh `x-request-id` unless one is already set.
#[derive(Debug, Clone, Copy, Default)]
pub struct RequestIdMiddleware;

impl RequestIdMiddleware {
    pub const HEADER: &'static str = "x-request-id";
}

impl RequestMiddleware for RequestIdMiddleware {
    fn process_request(&self, mut request: HttpRequest) -> HttpRequest {
        if request.header(Self::HEADER).is_none() {
            insert_header(&mut request.headers, Self::HEADER.to_string(), Uuid::new_v4().to_string());
        }
        request
    }
}

/// Logs status and headers of every successful response.
///
/// Bodies are not logged; they may carry credentials.
#[derive(Debug, Clone, Copy, Default)]
pub struct LoggingMiddleware;

impl ResponseMiddleware for LoggingMiddleware {
    fn process_response(&self, response: HttpResponse<ResponseBody>) -> HttpResponse<ResponseBody> {
        tracing::info!(status = response.status, headers = ?response.headers, "response received");
        response
    }
}

/// Maps the decoded body through a function.
pub struct DataTransformMiddleware<F> {
    transform: F,
}

impl<F> DataTransformMiddleware<F>
where
    F: Fn(ResponseBody) -> ResponseBody + Send + Sync,
{
    pub fn new(transform: F) -> Self {
        Self { transform }
    }
}

impl<F> ResponseMiddleware for DataTransformMiddleware<F>
where
    F: Fn(ResponseBody) -> ResponseBody + Send + Sync,
{
    fn process_response(&self, response: HttpResponse<ResponseBody>) -> HttpResponse<ResponseBody> {
        response.map(&self.transform)
    }
}
