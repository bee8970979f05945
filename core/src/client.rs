//! The request lifecycle.
//!
//! # Design
//! `HttpClient` is the capability set callers program against: `request`,
//! the verb shortcuts and middleware registration. `Client` is the single
//! implementation; what varies between deployments is the `Transport` it is
//! bound to, so a test can swap in a scripted transport without touching the
//! code under test.
//!
//! A call runs in a fixed order:
//! 1. request middleware, folded in registration order;
//! 2. dispatch preparation (base URL, params, base headers, JSON body);
//! 3. the transport round-trip, the only await point;
//! 4. on 2xx, decoding and response middleware; otherwise exactly one error
//!    handler invocation with a normalized `ErrorContext`.

use std::collections::BTreeMap;
use std::future::Future;

use bytes::Bytes;
use http::header::{HeaderName, HeaderValue, CONTENT_TYPE};
use serde::de::DeserializeOwned;
use serde_json::Value;
use url::Url;

use crate::config::ClientOptions;
use crate::error::{Error, ErrorContext};
use crate::handler::{ErrorHandler, Handled, Outcome};
use crate::http::{insert_header, HttpMethod, HttpRequest, HttpResponse, RequestConfig};
use crate::middleware::{apply_request_chain, apply_response_chain, RequestMiddleware, ResponseMiddleware};
use crate::transport::{Credentials, Timeout, Transport, TransportError};

/// Uniform interface over every transport-backed client.
///
/// `R` is the recovery type produced by the error handlers the client uses.
/// Each verb builds a descriptor from `config` plus its fixed method, URL and
/// body, then calls [`HttpClient::request`]. A `handler` passed to a call
/// replaces the client's default handler for that call only.
pub trait HttpClient<R>: Send + Sync {
    /// Run one call through the full pipeline.
    fn request<T>(
        &self,
        request: HttpRequest,
        handler: Option<&dyn ErrorHandler<R>>,
    ) -> impl Future<Output = Result<Outcome<T, R>, Error>> + Send
    where
        T: DeserializeOwned + Send;

    fn get<T>(
        &self,
        url: &str,
        config: Option<RequestConfig>,
        handler: Option<&dyn ErrorHandler<R>>,
    ) -> impl Future<Output = Result<Outcome<T, R>, Error>> + Send
    where
        T: DeserializeOwned + Send,
    {
        self.request(config.unwrap_or_default().into_request(HttpMethod::Get, url, None), handler)
    }

    fn post<T>(
        &self,
        url: &str,
        data: Option<Value>,
        config: Option<RequestConfig>,
        handler: Option<&dyn ErrorHandler<R>>,
    ) -> impl Future<Output = Result<Outcome<T, R>, Error>> + Send
    where
        T: DeserializeOwned + Send,
    {
        self.request(config.unwrap_or_default().into_request(HttpMethod::Post, url, data), handler)
    }

    fn put<T>(
        &self,
        url: &str,
        data: Option<Value>,
        config: Option<RequestConfig>,
        handler: Option<&dyn ErrorHandler<R>>,
    ) -> impl Future<Output = Result<Outcome<T, R>, Error>> + Send
    where
        T: DeserializeOwned + Send,
    {
        self.request(config.unwrap_or_default().into_request(HttpMethod::Put, url, data), handler)
    }

    fn delete<T>(
        &self,
        url: &str,
        config: Option<RequestConfig>,
        handler: Option<&dyn ErrorHandler<R>>,
    ) -> impl Future<Output = Result<Outcome<T, R>, Error>> + Send
    where
        T: DeserializeOwned + Send,
    {
        self.request(config.unwrap_or_default().into_request(HttpMethod::Delete, url, None), handler)
    }

    fn patch<T>(
        &self,
        url: &str,
        data: Option<Value>,
        config: Option<RequestConfig>,
        handler: Option<&dyn ErrorHandler<R>>,
    ) -> impl Future<Output = Result<Outcome<T, R>, Error>> + Send
    where
        T: DeserializeOwned + Send,
    {
        self.request(config.unwrap_or_default().into_request(HttpMethod::Patch, url, data), handler)
    }

    /// Append to the request chain. There is no removal.
    fn add_request_middleware(&mut self, middleware: impl RequestMiddleware + 'static);

    /// Append to the response chain. There is no removal.
    fn add_response_middleware(&mut self, middleware: impl ResponseMiddleware + 'static);
}

/// A client bound to one transport.
pub struct Client<Tr, R> {
    transport: Tr,
    base_url: Option<Url>,
    headers: BTreeMap<String, String>,
    default_handler: Box<dyn ErrorHandler<R>>,
    request_middleware: Vec<Box<dyn RequestMiddleware>>,
    response_middleware: Vec<Box<dyn ResponseMiddleware>>,
}

impl<Tr, R> Client<Tr, R>
where
    Tr: Transport,
{
    pub fn new(
        transport: Tr,
        options: ClientOptions,
        default_handler: impl ErrorHandler<R> + 'static,
    ) -> Result<Self, Error> {
        let base_url = options
            .base_url
            .as_deref()
            .map(|base| Url::parse(base).map_err(|e| Error::invalid_url(base, e)))
            .transpose()?;

        Ok(Self {
            transport,
            base_url,
            headers: options.headers,
            default_handler: Box::new(default_handler),
            request_middleware: Vec::new(),
            response_middleware: Vec::new(),
        })
    }

    pub fn transport(&self) -> &Tr {
        &self.transport
    }

    pub fn base_url(&self) -> Option<&Url> {
        self.base_url.as_ref()
    }

    /// Resolve `url` as a reference against the base; see
    /// [`ClientOptions::base_url`].
    fn resolve_url(&self, url: &str) -> Result<Url, Error> {
        let resolved = match &self.base_url {
            Some(base) => base.join(url),
            None => Url::parse(url),
        };
        resolved.map_err(|e| Error::invalid_url(url, e))
    }

    /// Turn a descriptor into the transport-level request.
    fn prepare(&self, request: &HttpRequest) -> Result<http::Request<Bytes>, Error> {
        let mut url = self.resolve_url(&request.url)?;
        if !request.params.is_empty() {
            url.query_pairs_mut().extend_pairs(&request.params);
        }

        let mut headers = self.headers.clone();
        for (name, value) in &request.headers {
            insert_header(&mut headers, name.clone(), value.clone());
        }

        let body = match &request.data {
            Some(data) => {
                if !headers.keys().any(|key| key.eq_ignore_ascii_case(CONTENT_TYPE.as_str())) {
                    headers.insert(CONTENT_TYPE.as_str().to_string(), "application/json".to_string());
                }
                Bytes::from(serde_json::to_vec(data)?)
            }
            None => Bytes::new(),
        };

        let mut dispatch = http::Request::new(body);
        *dispatch.method_mut() = request.method.into();
        *dispatch.uri_mut() = url
            .as_str()
            .parse::<http::Uri>()
            .map_err(|e| Error::invalid_url(url.as_str(), e))?;

        for (name, value) in &headers {
            let header_name =
                HeaderName::from_bytes(name.as_bytes()).map_err(|_| Error::InvalidHeader { name: name.clone() })?;
            let header_value = HeaderValue::from_str(value).map_err(|_| Error::InvalidHeader { name: name.clone() })?;
            dispatch.headers_mut().insert(header_name, header_value);
        }

        if let Some(timeout) = request.timeout {
            dispatch.extensions_mut().insert(Timeout(timeout));
        }
        dispatch
            .extensions_mut()
            .insert(Credentials::from_flag(request.with_credentials));

        Ok(dispatch)
    }
}

impl<Tr, R> HttpClient<R> for Client<Tr, R>
where
    Tr: Transport,
    R: Send + 'static,
{
    async fn request<T>(&self, request: HttpRequest, handler: Option<&dyn ErrorHandler<R>>) -> Result<Outcome<T, R>, Error>
    where
        T: DeserializeOwned + Send,
    {
        let request = apply_request_chain(&self.request_middleware, request);
        let dispatch = self.prepare(&request)?;
        let handler: &dyn ErrorHandler<R> = match handler {
            Some(handler) => handler,
            None => self.default_handler.as_ref(),
        };

        tracing::debug!(method = %request.method, url = %dispatch.uri(), "dispatching request");

        let context = match self.transport.execute(dispatch).await {
            Ok(response) if response.status().is_success() => {
                tracing::trace!(status = response.status().as_u16(), "request succeeded");
                let response = HttpResponse::decode(response, request.response_type)?;
                let response = apply_response_chain(&self.response_middleware, response);
                return Ok(Outcome::Response(response.deserialize()?));
            }
            Ok(response) => ErrorContext::from_response(&request, response),
            Err(TransportError::Invalid(source)) => return Err(Error::Transport(source)),
            Err(err) => ErrorContext::from_transport_error(&request, &err),
        };

        tracing::trace!(status = ?context.status, kind = ?context.kind, "request failed");

        match handler.handle_error(context) {
            Handled::Recovered(value) => Ok(Outcome::Recovered(value)),
            Handled::Propagate(err) => Err(err),
        }
    }

    fn add_request_middleware(&mut self, middleware: impl RequestMiddleware + 'static) {
        self.request_middleware.push(Box::new(middleware));
    }

    fn add_response_middleware(&mut self, middleware: impl ResponseMiddleware + 'static) {
        self.response_middleware.push(Box::new(middleware));
    }
}
