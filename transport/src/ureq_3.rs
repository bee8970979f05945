use std::io;
use std::time::{Duration, Instant};

use bytes::Bytes;
use courier_core::{Timeout, Transport, TransportError};
use http::header::{self, HeaderName};
use http::{Method, StatusCode};
use ureq::{Agent, AsSendBody};
use url::Url;

/// Redirect hops followed before the chain counts as a network failure.
const MAX_REDIRECTS: usize = 10;

/// Headers dropped when a redirect leaves the current origin.
const SENSITIVE_HEADERS: [HeaderName; 4] = [
    header::AUTHORIZATION,
    header::COOKIE,
    header::PROXY_AUTHORIZATION,
    header::WWW_AUTHENTICATE,
];

/// Blocking `ureq` agent driven from tokio's blocking pool.
///
/// Each request is sent with ureq's status errors and redirect handling
/// switched off, whatever the agent's own configuration. Redirects are
/// followed here with reqwest's default rules: 301, 302, 303, 307 and 308
/// with a usable `Location`, at most ten hops. Any other 3xx comes back as a
/// response. The [`Timeout`] extension bounds the whole chain, and response
/// bodies are read without a size limit.
#[derive(Debug, Clone)]
pub struct UreqTransport {
    agent: Agent,
}

impl UreqTransport {
    pub fn new() -> Self {
        let agent = Agent::config_builder()
            .http_status_as_error(false)
            .max_redirects(0)
            .build()
            .new_agent();
        Self { agent }
    }

    /// Wrap a preconfigured agent (TLS roots, proxy, user agent).
    pub fn with_agent(agent: Agent) -> Self {
        Self { agent }
    }
}

impl Default for UreqTransport {
    fn default() -> Self {
        Self::new()
    }
}

impl Transport for UreqTransport {
    async fn execute(&self, request: http::Request<Bytes>) -> Result<http::Response<Bytes>, TransportError> {
        let agent = self.agent.clone();

        tokio::task::spawn_blocking(move || follow(&agent, request))
            .await
            .map_err(|e| TransportError::Invalid(Box::new(e)))?
    }
}

fn follow(agent: &Agent, mut request: http::Request<Bytes>) -> Result<http::Response<Bytes>, TransportError> {
    let deadline = request.extensions().get::<Timeout>().map(|t| Instant::now() + t.0);

    for _ in 0..=MAX_REDIRECTS {
        let response = send(agent, &request, deadline)?;
        match redirect(&request, &response) {
            Some(next) => {
                tracing::debug!(status = response.status().as_u16(), location = %next.uri(), "following redirect");
                request = next;
            }
            None => return Ok(response),
        }
    }

    Err(TransportError::Network(
        format!("more than {MAX_REDIRECTS} redirects").into(),
    ))
}

fn send(
    agent: &Agent,
    request: &http::Request<Bytes>,
    deadline: Option<Instant>,
) -> Result<http::Response<Bytes>, TransportError> {
    let remaining = match deadline {
        Some(deadline) => {
            let left = deadline.saturating_duration_since(Instant::now());
            if left.is_zero() {
                return Err(TransportError::Timeout);
            }
            Some(left)
        }
        None => None,
    };

    tracing::trace!(method = %request.method(), uri = %request.uri(), "ureq dispatch");
    if request.body().is_empty() {
        run(agent, outgoing(request, ()), remaining)
    } else {
        run(agent, outgoing(request, request.body().to_vec()), remaining)
    }
}

fn run<B: AsSendBody>(
    agent: &Agent,
    request: http::Request<B>,
    timeout: Option<Duration>,
) -> Result<http::Response<Bytes>, TransportError> {
    let mut config = agent
        .configure_request(request)
        .http_status_as_error(false)
        .max_redirects(0);
    if let Some(timeout) = timeout {
        config = config.timeout_global(Some(timeout));
    }

    let (parts, mut body) = agent.run(config.build()).map_err(classify)?.into_parts();
    let bytes = body.with_config().read_to_vec().map_err(classify)?;
    Ok(http::Response::from_parts(parts, Bytes::from(bytes)))
}

/// Copy of `request`'s head with a different body.
fn outgoing<B>(request: &http::Request<Bytes>, body: B) -> http::Request<B> {
    let mut out = http::Request::new(body);
    *out.method_mut() = request.method().clone();
    *out.uri_mut() = request.uri().clone();
    *out.version_mut() = request.version();
    *out.headers_mut() = request.headers().clone();
    out
}

/// The next hop for a redirect response, or `None` when `response` is final.
fn redirect(request: &http::Request<Bytes>, response: &http::Response<Bytes>) -> Option<http::Request<Bytes>> {
    let rewrite_to_get = match response.status() {
        StatusCode::MOVED_PERMANENTLY | StatusCode::FOUND | StatusCode::SEE_OTHER => true,
        StatusCode::TEMPORARY_REDIRECT | StatusCode::PERMANENT_REDIRECT => false,
        _ => return None,
    };
    let location = response.headers().get(header::LOCATION)?.to_str().ok()?;
    let current = Url::parse(&request.uri().to_string()).ok()?;
    let target = current.join(location).ok()?;

    let mut next = outgoing(request, request.body().clone());
    *next.uri_mut() = target.as_str().parse::<http::Uri>().ok()?;

    if rewrite_to_get {
        *next.body_mut() = Bytes::new();
        for name in [
            header::TRANSFER_ENCODING,
            header::CONTENT_ENCODING,
            header::CONTENT_TYPE,
            header::CONTENT_LENGTH,
        ] {
            next.headers_mut().remove(name);
        }
        if *next.method() != Method::GET && *next.method() != Method::HEAD {
            *next.method_mut() = Method::GET;
        }
    }

    if target.origin() != current.origin() {
        for name in SENSITIVE_HEADERS {
            next.headers_mut().remove(name);
        }
    }

    Some(next)
}

/// Only errors raised before anything reached the wire are `Invalid`.
fn classify(err: ureq::Error) -> TransportError {
    match err {
        ureq::Error::Timeout(_) => TransportError::Timeout,
        ureq::Error::Io(e) if e.kind() == io::ErrorKind::TimedOut => TransportError::Timeout,
        e @ (ureq::Error::Http(_)
        | ureq::Error::BadUri(_)
        | ureq::Error::InvalidProxyUrl
        | ureq::Error::RequireHttpsOnly(_)) => TransportError::Invalid(Box::new(e)),
        other => TransportError::Network(Box::new(other)),
    }
}
