//! Client-level options.

use std::collections::BTreeMap;

use serde::Deserialize;

use crate::error::Error;

/// Options fixed for the lifetime of a client.
///
/// `headers` are sent with every request; a descriptor header with the same
/// name (ignoring case) replaces the client-level value.
#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "camelCase", default, deny_unknown_fields)]
pub struct ClientOptions {
    /// Base that request URLs are resolved against, following URL
    /// reference resolution rather than string concatenation.
    ///
    /// Keep the trailing slash on a base with a path: with
    /// `https://h/api/v1/`, `users` resolves to `https://h/api/v1/users`,
    /// while without the slash it resolves to `https://h/api/users`. A URL
    /// with a leading slash replaces the whole path (`/users` goes to
    /// `https://h/users`), and an absolute URL ignores the base.
    pub base_url: Option<String>,
    pub headers: BTreeMap<String, String>,
}

impl ClientOptions {
    pub fn with_base_url(base_url: impl Into<String>) -> Self {
        Self {
            base_url: Some(base_url.into()),
            headers: BTreeMap::new(),
        }
    }

    pub fn header(mut self, name: impl Into<String>, value: impl Into<String>) -> Self {
        self.headers.insert(name.into(), value.into());
        self
    }

    /// Parse options from a TOML document.
    ///
    /// ```toml
    /// baseUrl = "https://api.example.com/v1/"
    ///
    /// [headers]
    /// Accept = "application/json"
    /// ```
    pub fn from_toml_str(source: &str) -> Result<Self, Error> {
        Ok(toml::from_str(source)?)
    }
}
