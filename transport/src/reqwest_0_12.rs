use bytes::Bytes;
use courier_core::{Timeout, Transport, TransportError};

/// Async transport backed by a `reqwest::Client`.
///
/// The [`Timeout`] extension becomes the per-request timeout and overrides
/// any client-wide timeout. Credentials mode is not applied: cookie handling
/// is a property of the wrapped client.
#[derive(Debug, Clone, Default)]
pub struct ReqwestTransport {
    client: reqwest::Client,
}

impl ReqwestTransport {
    pub fn new(client: reqwest::Client) -> Self {
        Self { client }
    }

    pub fn inner(&self) -> &reqwest::Client {
        &self.client
    }
}

impl From<reqwest::Client> for ReqwestTransport {
    fn from(client: reqwest::Client) -> Self {
        Self::new(client)
    }
}

impl Transport for ReqwestTransport {
    async fn execute(&self, request: http::Request<Bytes>) -> Result<http::Response<Bytes>, TransportError> {
        let timeout = request.extensions().get::<Timeout>().map(|t| t.0);
        let (parts, body) = request.into_parts();
        let mut outgoing = self
            .client
            .request(parts.method, parts.uri.to_string())
            .headers(parts.headers)
            .body(body)
            .build()
            .map_err(classify)?;
        if timeout.is_some() {
            *outgoing.timeout_mut() = timeout;
        }

        tracing::trace!(method = %outgoing.method(), url = %outgoing.url(), "reqwest dispatch");
        let response = self.client.execute(outgoing).await.map_err(classify)?;

        let status = response.status();
        let version = response.version();
        let headers = response.headers().clone();
        let body = response.bytes().await.map_err(classify)?;

        let mut out = http::Response::new(body);
        *out.status_mut() = status;
        *out.version_mut() = version;
        *out.headers_mut() = headers;
        Ok(out)
    }
}

fn classify(err: reqwest::Error) -> TransportError {
    if err.is_timeout() {
        TransportError::Timeout
    } else if err.is_builder() {
        TransportError::Invalid(Box::new(err))
    } else {
        TransportError::Network(Box::new(err))
    }
}
