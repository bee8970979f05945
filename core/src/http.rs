//! Request descriptors and response envelopes as plain data.
//!
//! # Design
//! `HttpRequest` describes one call before any transport sees it and
//! `HttpResponse<T>` describes a completed call after decoding. Neither type
//! knows which transport runs the round-trip, so the same values flow through
//! middleware regardless of the adapter bound to the client.
//!
//! Header and param maps are `BTreeMap`s so iteration order (and therefore
//! the dispatched request) is deterministic.

use std::collections::BTreeMap;
use std::fmt;
use std::str::FromStr;
use std::time::Duration;

use bytes::Bytes;
use serde::de::value::BytesDeserializer;
use serde::de::{DeserializeOwned, IntoDeserializer};
use serde::{Deserialize, Deserializer};
use serde_json::Value;

use crate::error::{BoxError, Error};

/// HTTP method for a request.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum HttpMethod {
    Get,
    Post,
    Put,
    Delete,
    Patch,
    Head,
    Options,
}

impl HttpMethod {
    pub fn as_str(self) -> &'static str {
        match self {
            HttpMethod::Get => "GET",
            HttpMethod::Post => "POST",
            HttpMethod::Put => "PUT",
            HttpMethod::Delete => "DELETE",
            HttpMethod::Patch => "PATCH",
            HttpMethod::Head => "HEAD",
            HttpMethod::Options => "OPTIONS",
        }
    }
}

impl fmt::Display for HttpMethod {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for HttpMethod {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_uppercase().as_str() {
            "GET" => Ok(HttpMethod::Get),
            "POST" => Ok(HttpMethod::Post),
            "PUT" => Ok(HttpMethod::Put),
            "DELETE" => Ok(HttpMethod::Delete),
            "PATCH" => Ok(HttpMethod::Patch),
            "HEAD" => Ok(HttpMethod::Head),
            "OPTIONS" => Ok(HttpMethod::Options),
            _ => Err(Error::UnsupportedMethod(s.to_string())),
        }
    }
}

impl From<HttpMethod> for http::Method {
    fn from(method: HttpMethod) -> Self {
        match method {
            HttpMethod::Get => http::Method::GET,
            HttpMethod::Post => http::Method::POST,
            HttpMethod::Put => http::Method::PUT,
            HttpMethod::Delete => http::Method::DELETE,
            HttpMethod::Patch => http::Method::PATCH,
            HttpMethod::Head => http::Method::HEAD,
            HttpMethod::Options => http::Method::OPTIONS,
        }
    }
}

/// How a successful response body is decoded before middleware sees it.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ResponseType {
    #[default]
    Json,
    Text,
    Blob,
    ArrayBuffer,
}

impl fmt::Display for ResponseType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            ResponseType::Json => "json",
            ResponseType::Text => "text",
            ResponseType::Blob => "blob",
            ResponseType::ArrayBuffer => "arraybuffer",
        })
    }
}

/// One HTTP call described as plain data.
///
/// Request middleware receives a descriptor by value and hands back the next
/// one, so a descriptor is never shared between pipeline steps.
#[derive(Debug, Clone, PartialEq)]
pub struct HttpRequest {
    pub method: HttpMethod,
    /// Absolute, or relative to the client's base URL.
    pub url: String,
    pub headers: BTreeMap<String, String>,
    pub params: BTreeMap<String, String>,
    /// Encoded as JSON when the request is dispatched.
    pub data: Option<Value>,
    pub response_type: ResponseType,
    pub timeout: Option<Duration>,
    pub with_credentials: Option<bool>,
}

impl HttpRequest {
    pub fn new(method: HttpMethod, url: impl Into<String>) -> Self {
        Self {
            method,
            url: url.into(),
            headers: BTreeMap::new(),
            params: BTreeMap::new(),
            data: None,
            response_type: ResponseType::default(),
            timeout: None,
            with_credentials: None,
        }
    }

    /// Set a header, replacing any existing key that differs only in case.
    pub fn with_header(mut self, name: impl Into<String>, value: impl Into<String>) -> Self {
        insert_header(&mut self.headers, name.into(), value.into());
        self
    }

    pub fn with_param(mut self, name: impl Into<String>, value: impl Into<String>) -> Self {
        self.params.insert(name.into(), value.into());
        self
    }

    pub fn with_data(mut self, data: Value) -> Self {
        self.data = Some(data);
        self
    }

    pub fn with_response_type(mut self, response_type: ResponseType) -> Self {
        self.response_type = response_type;
        self
    }

    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = Some(timeout);
        self
    }

    pub fn with_credentials(mut self, with_credentials: bool) -> Self {
        self.with_credentials = Some(with_credentials);
        self
    }

    /// Case-insensitive header lookup.
    pub fn header(&self, name: &str) -> Option<&str> {
        self.headers
            .iter()
            .find(|(key, _)| key.eq_ignore_ascii_case(name))
            .map(|(_, value)| value.as_str())
    }
}

/// Insert `name`, dropping any existing key equal to it ignoring ASCII case.
pub(crate) fn insert_header(headers: &mut BTreeMap<String, String>, name: String, value: String) {
    headers.retain(|key, _| !key.eq_ignore_ascii_case(&name));
    headers.insert(name, value);
}

/// Per-call overrides accepted by the verb methods.
///
/// Method, URL and body are supplied by the verb itself; every field here is
/// carried into the built descriptor unchanged.
#[derive(Debug, Clone, Default, PartialEq, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct RequestConfig {
    pub headers: Option<BTreeMap<String, String>>,
    pub params: Option<BTreeMap<String, String>>,
    pub response_type: Option<ResponseType>,
    #[serde(rename = "timeoutMs", deserialize_with = "millis")]
    pub timeout: Option<Duration>,
    pub with_credentials: Option<bool>,
}

fn millis<'de, D: Deserializer<'de>>(deserializer: D) -> Result<Option<Duration>, D::Error> {
    Ok(Option::<u64>::deserialize(deserializer)?.map(Duration::from_millis))
}

impl RequestConfig {
    pub fn into_request(self, method: HttpMethod, url: impl Into<String>, data: Option<Value>) -> HttpRequest {
        HttpRequest {
            method,
            url: url.into(),
            headers: self.headers.unwrap_or_default(),
            params: self.params.unwrap_or_default(),
            data,
            response_type: self.response_type.unwrap_or_default(),
            timeout: self.timeout,
            with_credentials: self.with_credentials,
        }
    }
}

/// A response body after decoding by `ResponseType`.
#[derive(Debug, Clone, PartialEq)]
pub enum ResponseBody {
    Json(Value),
    Text(String),
    Binary(Bytes),
}

impl ResponseBody {
    /// Decode a successful body the way `response_type` asks for.
    ///
    /// An empty JSON body decodes as `null`.
    pub fn decode(body: Bytes, response_type: ResponseType) -> Result<Self, Error> {
        match response_type {
            ResponseType::Json if body.is_empty() => Ok(ResponseBody::Json(Value::Null)),
            ResponseType::Json => serde_json::from_slice(&body)
                .map(ResponseBody::Json)
                .map_err(|e| Error::decode(response_type, e)),
            ResponseType::Text => Ok(ResponseBody::Text(String::from_utf8_lossy(&body).into_owned())),
            ResponseType::Blob | ResponseType::ArrayBuffer => Ok(ResponseBody::Binary(body)),
        }
    }

    /// Best-effort decoding for error bodies, where the server picks the format.
    pub fn sniff(body: Bytes) -> Option<Self> {
        if body.is_empty() {
            return None;
        }
        if let Ok(value) = serde_json::from_slice(&body) {
            return Some(ResponseBody::Json(value));
        }
        match String::from_utf8(body.to_vec()) {
            Ok(text) => Some(ResponseBody::Text(text)),
            Err(_) => Some(ResponseBody::Binary(body)),
        }
    }

    pub fn as_json(&self) -> Option<&Value> {
        match self {
            ResponseBody::Json(value) => Some(value),
            _ => None,
        }
    }

    pub fn as_text(&self) -> Option<&str> {
        match self {
            ResponseBody::Text(text) => Some(text),
            _ => None,
        }
    }

    pub fn as_bytes(&self) -> Option<&Bytes> {
        match self {
            ResponseBody::Binary(bytes) => Some(bytes),
            _ => None,
        }
    }

    /// Deserialize into the caller's type.
    ///
    /// Text bodies deserialize as a string and binary bodies as bytes, so
    /// `String` and `bytes::Bytes` are the natural targets for those.
    pub fn deserialize<T: DeserializeOwned>(self) -> Result<T, BoxError> {
        match self {
            ResponseBody::Json(value) => Ok(serde_json::from_value(value)?),
            ResponseBody::Text(text) => {
                let deserializer: serde::de::value::StringDeserializer<serde::de::value::Error> =
                    text.into_deserializer();
                Ok(T::deserialize(deserializer)?)
            }
            ResponseBody::Binary(bytes) => {
                let deserializer = BytesDeserializer::<serde::de::value::Error>::new(&bytes);
                Ok(T::deserialize(deserializer)?)
            }
        }
    }

    fn response_type(&self) -> ResponseType {
        match self {
            ResponseBody::Json(_) => ResponseType::Json,
            ResponseBody::Text(_) => ResponseType::Text,
            ResponseBody::Binary(_) => ResponseType::ArrayBuffer,
        }
    }
}

/// A completed call, transport details stripped.
#[derive(Debug, Clone, PartialEq)]
pub struct HttpResponse<T> {
    pub data: T,
    pub status: u16,
    /// Lowercase names; repeated headers are joined with `", "`.
    pub headers: BTreeMap<String, String>,
}

impl<T> HttpResponse<T> {
    pub fn map<U>(self, f: impl FnOnce(T) -> U) -> HttpResponse<U> {
        HttpResponse {
            data: f(self.data),
            status: self.status,
            headers: self.headers,
        }
    }
}

impl HttpResponse<ResponseBody> {
    /// Build the envelope from a raw transport response.
    pub fn decode(response: http::Response<Bytes>, response_type: ResponseType) -> Result<Self, Error> {
        let (parts, body) = response.into_parts();
        Ok(HttpResponse {
            data: ResponseBody::decode(body, response_type)?,
            status: parts.status.as_u16(),
            headers: flatten_headers(&parts.headers),
        })
    }

    pub fn deserialize<T: DeserializeOwned>(self) -> Result<HttpResponse<T>, Error> {
        let response_type = self.data.response_type();
        let data = self
            .data
            .deserialize()
            .map_err(|source| Error::Decode { response_type, source })?;
        Ok(HttpResponse {
            data,
            status: self.status,
            headers: self.headers,
        })
    }
}

pub(crate) fn flatten_headers(headers: &http::HeaderMap) -> BTreeMap<String, String> {
    let mut flat: BTreeMap<String, String> = BTreeMap::new();
    for (name, value) in headers {
        let value = String::from_utf8_lossy(value.as_bytes());
        flat.entry(name.as_str().to_string())
            .and_modify(|existing| {
                existing.push_str(", ");
                existing.push_str(&value);
            })
            .or_insert_with(|| value.into_owned());
    }
    flat
}
