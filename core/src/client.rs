//! Fluent HTTP client bound to a base URI and a wire chain.
//!
//! # Design
//! `Client` holds the base URI, the default headers and the assembled chain
//! behind an `Arc`, so clones are cheap and share one chain (and therefore one
//! cache). Request helpers only build values; `fetch` is the single place a
//! request enters the chain. Building a client never touches the network.

use std::sync::Arc;

use crate::config::{ClientConfig, ConfigError};
use crate::error::WireError;
use crate::http::{Headers, HttpMethod, HttpRequest, HttpResponse};
use crate::transport::UreqTransport;
use crate::wire::{Transport, Wire, WireChain};
use crate::wires::{CachingWire, ContentDecodingWire, RetryWire};

#[derive(Clone)]
pub struct Client {
    base_uri: String,
    default_headers: Headers,
    wire: Arc<dyn Wire>,
}

impl Client {
    pub fn builder(base_uri: &str) -> ClientBuilder {
        ClientBuilder {
            base_uri: base_uri.trim_end_matches('/').to_string(),
            default_headers: Headers::new(),
            chain: WireChain::new(),
        }
    }

    /// Assembles retry, decoding and caching wires as `config` asks, outermost
    /// first, over `transport`. The config is validated first, so a
    /// `ClientConfig::new` value with a bad base URI fails here rather than on
    /// the first fetch.
    pub fn from_config<T: Transport + 'static>(
        config: &ClientConfig,
        transport: T,
    ) -> Result<Self, ConfigError> {
        config.validate().map_err(ConfigError::Validation)?;

        let mut builder = Client::builder(&config.base_uri);
        for (name, value) in &config.default_headers {
            builder = builder.header(name, value);
        }

        if let Some(retry) = config.retry.clone() {
            builder = builder.through(move |next| {
                RetryWire::new(next)
                    .attempts(retry.attempts)
                    .statuses(&retry.statuses)
                    .backoff(
                        std::time::Duration::from_millis(retry.backoff_base_ms),
                        std::time::Duration::from_millis(retry.backoff_max_ms),
                    )
            });
        }
        if config.decode_content {
            builder = builder.through(ContentDecodingWire::new);
        }
        if let Some(cache) = config.cache.clone() {
            builder = builder.through(move |next| CachingWire::new(next, cache.validator));
        }

        tracing::debug!(
            base_uri = %config.base_uri,
            wires = builder.chain.len(),
            "client assembled"
        );
        Ok(builder.build(transport))
    }

    /// Same as `from_config`, over a `UreqTransport` honoring `timeout_ms`.
    pub fn with_ureq(config: &ClientConfig) -> Result<Self, ConfigError> {
        Self::from_config(config, UreqTransport::with_timeout(config.timeout()))
    }

    pub fn base_uri(&self) -> &str {
        &self.base_uri
    }

    pub fn default_headers(&self) -> &Headers {
        &self.default_headers
    }

    /// A request for `path` resolved against the base URI, carrying the
    /// default headers. Absolute `http(s)://` paths are used as they are.
    pub fn request(&self, method: HttpMethod, path: &str) -> HttpRequest {
        HttpRequest::new(method, &self.resolve(path)).with_headers(&self.default_headers)
    }

    pub fn get(&self, path: &str) -> HttpRequest {
        self.request(HttpMethod::Get, path)
    }

    pub fn post(&self, path: &str) -> HttpRequest {
        self.request(HttpMethod::Post, path)
    }

    pub fn put(&self, path: &str) -> HttpRequest {
        self.request(HttpMethod::Put, path)
    }

    pub fn delete(&self, path: &str) -> HttpRequest {
        self.request(HttpMethod::Delete, path)
    }

    /// Runs `request` through the whole chain and waits for the outcome.
    pub fn fetch(&self, request: &HttpRequest) -> Result<HttpResponse, WireError> {
        let result = self.wire.execute(request);
        match &result {
            Ok(response) => tracing::debug!(
                method = %request.method(),
                uri = request.uri(),
                status = response.status(),
                "fetched"
            ),
            Err(e) => tracing::debug!(
                method = %request.method(),
                uri = request.uri(),
                error = %e,
                "fetch failed"
            ),
        }
        result
    }

    fn resolve(&self, path: &str) -> String {
        if path.starts_with("http://") || path.starts_with("https://") {
            return path.to_string();
        }
        let path = path.trim_start_matches('/');
        if path.is_empty() {
            self.base_uri.clone()
        } else {
            format!("{}/{path}", self.base_uri)
        }
    }
}

pub struct ClientBuilder {
    base_uri: String,
    default_headers: Headers,
    chain: WireChain,
}

impl ClientBuilder {
    /// Adds a header to every request built by the client.
    pub fn header(mut self, name: &str, value: &str) -> Self {
        self.default_headers = self.default_headers.with(name, value);
        self
    }

    /// Adds a wire below the ones already added.
    pub fn through<W, F>(mut self, wrap: F) -> Self
    where
        W: Wire + 'static,
        F: FnOnce(Box<dyn Wire>) -> W + Send + 'static,
    {
        self.chain = self.chain.through(wrap);
        self
    }

    pub fn build<T: Transport + 'static>(self, transport: T) -> Client {
        Client {
            base_uri: self.base_uri,
            default_headers: self.default_headers,
            wire: Arc::from(self.chain.build(transport)),
        }
    }
}
