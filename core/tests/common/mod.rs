//! Scripted in-memory transport shared by the integration tests.

#![allow(dead_code)]

use std::collections::VecDeque;
use std::sync::{Arc, Mutex};
use std::time::Duration;

use bytes::Bytes;
use courier_core::{Credentials, Timeout, Transport, TransportError};
use serde_json::Value;

/// What the transport answers for one call.
pub enum Reply {
    Response {
        status: u16,
        headers: Vec<(&'static str, &'static str)>,
        body: Bytes,
    },
    Timeout,
    Network,
    Invalid,
}

impl Reply {
    pub fn json(status: u16, body: Value) -> Self {
        Reply::Response {
            status,
            headers: vec![("content-type", "application/json")],
            body: Bytes::from(serde_json::to_vec(&body).unwrap()),
        }
    }

    pub fn raw(status: u16, body: &'static [u8]) -> Self {
        Reply::Response {
            status,
            headers: Vec::new(),
            body: Bytes::from_static(body),
        }
    }
}

/// A request as the transport saw it.
#[derive(Debug, Clone)]
pub struct Sent {
    pub method: http::Method,
    pub uri: String,
    pub headers: http::HeaderMap,
    pub body: Bytes,
    pub timeout: Option<Duration>,
    pub credentials: Option<Credentials>,
}

impl Sent {
    pub fn header(&self, name: &str) -> Option<&str> {
        self.headers.get(name).and_then(|v| v.to_str().ok())
    }

    pub fn json(&self) -> Value {
        serde_json::from_slice(&self.body).unwrap()
    }
}

/// Answers calls from a queue of replies, `200 {}` once the queue is empty.
#[derive(Clone, Default)]
pub struct ScriptedTransport {
    replies: Arc<Mutex<VecDeque<Reply>>>,
    sent: Arc<Mutex<Vec<Sent>>>,
}

impl ScriptedTransport {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn reply(self, reply: Reply) -> Self {
        self.replies.lock().unwrap().push_back(reply);
        self
    }

    pub fn sent(&self) -> Vec<Sent> {
        self.sent.lock().unwrap().clone()
    }

    pub fn last(&self) -> Sent {
        self.sent().pop().expect("no request was sent")
    }
}

impl Transport for ScriptedTransport {
    async fn execute(&self, request: http::Request<Bytes>) -> Result<http::Response<Bytes>, TransportError> {
        let (parts, body) = request.into_parts();
        self.sent.lock().unwrap().push(Sent {
            method: parts.method,
            uri: parts.uri.to_string(),
            headers: parts.headers,
            body,
            timeout: parts.extensions.get::<Timeout>().map(|t| t.0),
            credentials: parts.extensions.get::<Credentials>().copied(),
        });

        let reply = self
            .replies
            .lock()
            .unwrap()
            .pop_front()
            .unwrap_or_else(|| Reply::json(200, serde_json::json!({})));

        match reply {
            Reply::Response { status, headers, body } => {
                let mut builder = http::Response::builder().status(status);
                for (name, value) in headers {
                    builder = builder.header(name, value);
                }
                Ok(builder.body(body).unwrap())
            }
            Reply::Timeout => Err(TransportError::Timeout),
            Reply::Network => Err(TransportError::Network("connection refused".into())),
            Reply::Invalid => Err(TransportError::Invalid("unsupported scheme".into())),
        }
    }
}
