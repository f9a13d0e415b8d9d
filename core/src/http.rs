//! HTTP request and response values that flow through a wire chain.
//!
//! # Design
//! Both types are immutable once built. Every `with_*` method consumes the
//! value and returns a new one, so a wire that wants to alter a request builds
//! its own copy and the caller's value is never observed changing. Bodies are
//! `Bytes`, which makes clones cheap and shares the underlying buffer
//! read-only.
//!
//! Headers are kept as an ordered list of `(name, value)` pairs. Lookup is
//! case-insensitive and repeated names (e.g. `set-cookie`) keep every value in
//! the order they were added.

use std::fmt;
use std::str::FromStr;

use bytes::Bytes;

use crate::error::WireError;

/// HTTP method for a request.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum HttpMethod {
    Get,
    Head,
    Post,
    Put,
    Patch,
    Delete,
    Options,
}

impl HttpMethod {
    pub fn as_str(&self) -> &'static str {
        match self {
            HttpMethod::Get => "GET",
            HttpMethod::Head => "HEAD",
            HttpMethod::Post => "POST",
            HttpMethod::Put => "PUT",
            HttpMethod::Patch => "PATCH",
            HttpMethod::Delete => "DELETE",
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
    type Err = WireError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_uppercase().as_str() {
            "GET" => Ok(HttpMethod::Get),
            "HEAD" => Ok(HttpMethod::Head),
            "POST" => Ok(HttpMethod::Post),
            "PUT" => Ok(HttpMethod::Put),
            "PATCH" => Ok(HttpMethod::Patch),
            "DELETE" => Ok(HttpMethod::Delete),
            "OPTIONS" => Ok(HttpMethod::Options),
            other => Err(WireError::InvalidRequest(format!("unknown method: {other}"))),
        }
    }
}

/// Ordered, case-insensitive, multi-valued header list.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Headers {
    entries: Vec<(String, String)>,
}

impl Headers {
    pub fn new() -> Self {
        Self::default()
    }

    /// Returns a copy with `value` appended under `name`. Existing values for
    /// the same name are kept.
    pub fn with(mut self, name: &str, value: &str) -> Self {
        self.entries.push((name.to_string(), value.to_string()));
        self
    }

    /// Returns a copy with every value for `name` removed.
    pub fn without(mut self, name: &str) -> Self {
        self.entries.retain(|(n, _)| !n.eq_ignore_ascii_case(name));
        self
    }

    /// First value stored under `name`, in any letter casing.
    pub fn get(&self, name: &str) -> Option<&str> {
        self.entries
            .iter()
            .find(|(n, _)| n.eq_ignore_ascii_case(name))
            .map(|(_, v)| v.as_str())
    }

    /// All values stored under `name`, in insertion order.
    pub fn get_all(&self, name: &str) -> Vec<&str> {
        self.entries
            .iter()
            .filter(|(n, _)| n.eq_ignore_ascii_case(name))
            .map(|(_, v)| v.as_str())
            .collect()
    }

    pub fn contains(&self, name: &str) -> bool {
        self.entries.iter().any(|(n, _)| n.eq_ignore_ascii_case(name))
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, &str)> {
        self.entries.iter().map(|(n, v)| (n.as_str(), v.as_str()))
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

impl<N: Into<String>, V: Into<String>> FromIterator<(N, V)> for Headers {
    fn from_iter<I: IntoIterator<Item = (N, V)>>(iter: I) -> Self {
        Self {
            entries: iter.into_iter().map(|(n, v)| (n.into(), v.into())).collect(),
        }
    }
}

/// An HTTP request described as plain data.
///
/// Built by `Client` helpers or directly with [`HttpRequest::new`]. Wires
/// receive it by reference and pass a new value downstream when they need to
/// change anything.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct HttpRequest {
    method: HttpMethod,
    uri: String,
    headers: Headers,
    body: Option<Bytes>,
}

impl HttpRequest {
    pub fn new(method: HttpMethod, uri: &str) -> Self {
        Self {
            method,
            uri: uri.to_string(),
            headers: Headers::new(),
            body: None,
        }
    }

    pub fn get(uri: &str) -> Self {
        Self::new(HttpMethod::Get, uri)
    }

    pub fn method(&self) -> HttpMethod {
        self.method
    }

    pub fn uri(&self) -> &str {
        &self.uri
    }

    pub fn headers(&self) -> &Headers {
        &self.headers
    }

    pub fn header(&self, name: &str) -> Option<&str> {
        self.headers.get(name)
    }

    pub fn body(&self) -> Option<&Bytes> {
        self.body.as_ref()
    }

    pub fn with_method(mut self, method: HttpMethod) -> Self {
        self.method = method;
        self
    }

    pub fn with_uri(mut self, uri: &str) -> Self {
        self.uri = uri.to_string();
        self
    }

    pub fn with_header(mut self, name: &str, value: &str) -> Self {
        self.headers = self.headers.with(name, value);
        self
    }

    /// Appends every header from `headers`, keeping existing ones.
    pub fn with_headers(mut self, headers: &Headers) -> Self {
        for (name, value) in headers.iter() {
            self.headers = self.headers.with(name, value);
        }
        self
    }

    pub fn without_header(mut self, name: &str) -> Self {
        self.headers = self.headers.without(name);
        self
    }

    pub fn with_body(mut self, body: impl Into<Bytes>) -> Self {
        self.body = Some(body.into());
        self
    }
}

/// An HTTP response described as plain data.
///
/// Produced by a `Transport`, or by a wire rewriting a response it received
/// from further down the chain.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct HttpResponse {
    status: u16,
    headers: Headers,
    body: Bytes,
}

impl HttpResponse {
    pub fn new(status: u16) -> Self {
        Self {
            status,
            headers: Headers::new(),
            body: Bytes::new(),
        }
    }

    pub fn status(&self) -> u16 {
        self.status
    }

    pub fn headers(&self) -> &Headers {
        &self.headers
    }

    pub fn header(&self, name: &str) -> Option<&str> {
        self.headers.get(name)
    }

    pub fn header_values(&self, name: &str) -> Vec<&str> {
        self.headers.get_all(name)
    }

    pub fn body(&self) -> &Bytes {
        &self.body
    }

    /// Body decoded as UTF-8, with invalid sequences replaced.
    pub fn body_text(&self) -> String {
        String::from_utf8_lossy(&self.body).into_owned()
    }

    pub fn with_header(mut self, name: &str, value: &str) -> Self {
        self.headers = self.headers.with(name, value);
        self
    }

    /// Replaces every header.
    pub fn with_headers(mut self, headers: Headers) -> Self {
        self.headers = headers;
        self
    }

    pub fn without_header(mut self, name: &str) -> Self {
        self.headers = self.headers.without(name);
        self
    }

    pub fn with_body(mut self, body: impl Into<Bytes>) -> Self {
        self.body = body.into();
        self
    }

    /// Opt-in status assertion: hands the response back when the status
    /// matches, otherwise fails with `WireError::HttpStatus`.
    pub fn expect_status(self, expected: u16) -> Result<Self, WireError> {
        if self.status == expected {
            return Ok(self);
        }
        Err(WireError::HttpStatus {
            status: self.status,
            body: self.body_text(),
        })
    }
}
