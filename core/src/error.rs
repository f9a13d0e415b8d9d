//! Error types for the wire pipeline.
//!
//! # Design
//! Only conditions a wire knows how to classify get their own variant. The
//! retry wire treats `Transport` as transient; every other variant is final
//! and propagates unchanged through the rest of the chain. A non-2xx status is
//! not an error at this level: it comes back as a normal `HttpResponse` unless
//! the caller opts in through `HttpResponse::expect_status`.

use thiserror::Error;

/// Errors returned by wires, transports and the client.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum WireError {
    /// The origin could not be reached, or the connection failed mid-exchange.
    #[error("transport failed: {0}")]
    Transport(String),

    /// The body declared a content encoding that is unsupported or malformed.
    #[error("cannot decode body: {0}")]
    Decoding(String),

    /// A 304 arrived for a request the caching wire holds no entry for.
    #[error("304 Not Modified for {uri} without a cached entry")]
    CacheProtocol { uri: String },

    /// Raised only by the opt-in status assertion.
    #[error("HTTP {status}: {body}")]
    HttpStatus { status: u16, body: String },

    /// The request cannot be expressed on the wire (bad URI, header or method).
    #[error("invalid request: {0}")]
    InvalidRequest(String),
}

impl WireError {
    /// Whether the retry wire may re-run the chain after this error.
    pub fn is_transient(&self) -> bool {
        matches!(self, WireError::Transport(_))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn only_transport_errors_are_transient() {
        assert!(WireError::Transport("reset".into()).is_transient());
        assert!(!WireError::Decoding("bad gzip".into()).is_transient());
        assert!(!WireError::CacheProtocol { uri: "http://x".into() }.is_transient());
        assert!(!WireError::InvalidRequest("bad uri".into()).is_transient());
    }

    #[test]
    fn display_includes_context() {
        let err = WireError::CacheProtocol {
            uri: "http://localhost/a".into(),
        };
        assert_eq!(
            err.to_string(),
            "304 Not Modified for http://localhost/a without a cached entry"
        );
    }
}
