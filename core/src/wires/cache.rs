//! Conditional caching wire.
//!
//! # Overview
//! Keeps the last 200 response for every GET it has seen, together with the
//! validator the origin sent (`last-modified` or `etag`). Later requests for
//! the same key are revalidated with the matching conditional header and a
//! `304 Not Modified` is answered from the cache, so the caller only ever sees
//! 200s with a full body.
//!
//! # State per key
//! ```text
//! Uncached ──200 + validator──▶ Fresh
//! Fresh ──304──▶ Fresh (cached body returned as 200)
//! Fresh ──200 + validator──▶ Fresh (entry replaced)
//! Fresh ──200, no validator──▶ Uncached
//! Fresh ──other status──▶ Fresh (response passed through)
//! Uncached ──304──▶ WireError::CacheProtocol
//! ```
//!
//! # Concurrency
//! Entries live in a `DashMap` as immutable `Arc<CacheEntry>` values. A lookup
//! clones the `Arc` and a store replaces it whole, so concurrent fetches of
//! the same key never see a half-written entry, and unrelated keys only
//! contend when they share a shard. Two racing first fetches both reach the
//! origin and the last store wins.
//!
//! The key is method + URI. Headers that select a representation (`accept`,
//! `accept-language`) are not part of it.

use std::sync::Arc;

use dashmap::DashMap;
use serde::Deserialize;

use crate::error::WireError;
use crate::http::{HttpMethod, HttpRequest, HttpResponse};
use crate::wire::Wire;

const NOT_MODIFIED: u16 = 304;
const OK: u16 = 200;

/// Which validator the wire stores and revalidates with.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum Validator {
    /// `last-modified` answered with `if-modified-since`.
    #[default]
    LastModified,
    /// `etag` answered with `if-none-match`.
    #[serde(rename = "etag")]
    ETag,
}

impl Validator {
    /// Response header carrying the validator.
    pub fn response_header(&self) -> &'static str {
        match self {
            Validator::LastModified => "last-modified",
            Validator::ETag => "etag",
        }
    }

    /// Request header used to revalidate.
    pub fn request_header(&self) -> &'static str {
        match self {
            Validator::LastModified => "if-modified-since",
            Validator::ETag => "if-none-match",
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Hash)]
struct CacheKey {
    method: HttpMethod,
    uri: String,
}

impl CacheKey {
    fn of(request: &HttpRequest) -> Self {
        Self {
            method: request.method(),
            uri: request.uri().to_string(),
        }
    }
}

#[derive(Debug)]
struct CacheEntry {
    validator: String,
    response: HttpResponse,
}

pub struct CachingWire {
    next: Box<dyn Wire>,
    validator: Validator,
    entries: DashMap<CacheKey, Arc<CacheEntry>>,
}

impl CachingWire {
    pub fn new(next: Box<dyn Wire>, validator: Validator) -> Self {
        Self {
            next,
            validator,
            entries: DashMap::new(),
        }
    }

    /// Caches on `last-modified`, revalidates with `if-modified-since`.
    pub fn last_modified(next: Box<dyn Wire>) -> Self {
        Self::new(next, Validator::LastModified)
    }

    /// Caches on `etag`, revalidates with `if-none-match`.
    pub fn etag(next: Box<dyn Wire>) -> Self {
        Self::new(next, Validator::ETag)
    }

    /// Number of keys currently held.
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Validator stored for a GET of `uri`, if any.
    pub fn cached_validator(&self, uri: &str) -> Option<String> {
        let key = CacheKey {
            method: HttpMethod::Get,
            uri: uri.to_string(),
        };
        self.entries.get(&key).map(|e| e.validator.clone())
    }

    fn is_cacheable(&self, request: &HttpRequest) -> bool {
        request.method() == HttpMethod::Get
            && !request.headers().contains(self.validator.request_header())
    }

    fn lookup(&self, key: &CacheKey) -> Option<Arc<CacheEntry>> {
        self.entries.get(key).map(|e| Arc::clone(e.value()))
    }

    /// Records a 200 under `key`, or forgets the key when the origin stopped
    /// sending a validator.
    fn store(&self, key: CacheKey, response: &HttpResponse) {
        match response.header(self.validator.response_header()) {
            Some(validator) => {
                tracing::debug!(uri = %key.uri, validator, "caching response");
                let entry = CacheEntry {
                    validator: validator.to_string(),
                    response: response.clone(),
                };
                self.entries.insert(key, Arc::new(entry));
            }
            None => {
                if self.entries.remove(&key).is_some() {
                    tracing::debug!(uri = %key.uri, "validator gone, dropping cached response");
                }
            }
        }
    }
}

impl Wire for CachingWire {
    fn execute(&self, request: &HttpRequest) -> Result<HttpResponse, WireError> {
        if !self.is_cacheable(request) {
            return self.next.execute(request);
        }

        let key = CacheKey::of(request);
        match self.lookup(&key) {
            None => {
                tracing::debug!(uri = request.uri(), "cache miss");
                let response = self.next.execute(request)?;
                match response.status() {
                    OK => self.store(key, &response),
                    NOT_MODIFIED => {
                        return Err(WireError::CacheProtocol {
                            uri: request.uri().to_string(),
                        })
                    }
                    _ => {}
                }
                Ok(response)
            }
            Some(entry) => {
                let conditional = request
                    .clone()
                    .with_header(self.validator.request_header(), &entry.validator);
                let response = self.next.execute(&conditional)?;
                match response.status() {
                    NOT_MODIFIED => {
                        tracing::debug!(uri = request.uri(), validator = %entry.validator, "not modified, serving cached body");
                        Ok(entry.response.clone())
                    }
                    OK => {
                        tracing::debug!(uri = request.uri(), "resource changed");
                        self.store(key, &response);
                        Ok(response)
                    }
                    _ => Ok(response),
                }
            }
        }
    }
}
