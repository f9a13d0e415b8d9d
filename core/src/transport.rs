//! Blocking transport over `ureq`.
//!
//! # Design
//! ureq's own status-as-error behavior is disabled so 4xx/5xx responses come
//! back as data and the wires decide what they mean. ureq is built without
//! its `gzip` feature, which leaves `content-encoding` for
//! `ContentDecodingWire` to handle.

use std::time::Duration;

use ureq::Agent;

use crate::error::WireError;
use crate::http::{HttpRequest, HttpResponse};
use crate::wire::Transport;

pub struct UreqTransport {
    agent: Agent,
}

impl UreqTransport {
    pub fn new() -> Self {
        Self::with_timeout(None)
    }

    /// Transport whose every call must complete within `timeout`.
    pub fn with_timeout(timeout: Option<Duration>) -> Self {
        let agent = Agent::config_builder()
            .http_status_as_error(false)
            .timeout_global(timeout)
            .build()
            .new_agent();
        Self { agent }
    }
}

impl Default for UreqTransport {
    fn default() -> Self {
        Self::new()
    }
}

impl Transport for UreqTransport {
    fn send(&self, request: &HttpRequest) -> Result<HttpResponse, WireError> {
        let mut builder = ureq::http::Request::builder()
            .method(request.method().as_str())
            .uri(request.uri());
        for (name, value) in request.headers().iter() {
            builder = builder.header(name, value);
        }

        let result = match request.body() {
            Some(body) => builder
                .body(body.to_vec())
                .map_err(|e| WireError::InvalidRequest(e.to_string()))
                .and_then(|req| self.agent.run(req).map_err(map_error)),
            None => builder
                .body(())
                .map_err(|e| WireError::InvalidRequest(e.to_string()))
                .and_then(|req| self.agent.run(req).map_err(map_error)),
        };
        let (parts, mut body) = result?.into_parts();

        let headers = parts
            .headers
            .iter()
            .map(|(name, value)| {
                (
                    name.as_str().to_string(),
                    String::from_utf8_lossy(value.as_bytes()).into_owned(),
                )
            })
            .collect();
        let bytes = body.read_to_vec().map_err(map_error)?;

        Ok(HttpResponse::new(parts.status.as_u16())
            .with_headers(headers)
            .with_body(bytes))
    }
}

fn map_error(error: ureq::Error) -> WireError {
    match error {
        ureq::Error::BadUri(msg) => WireError::InvalidRequest(msg),
        ureq::Error::Http(e) => WireError::InvalidRequest(e.to_string()),
        other => WireError::Transport(other.to_string()),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::http::HttpMethod;

    #[test]
    fn unreachable_origin_is_transient() {
        // Port 9 (discard) is closed on test machines; the connect fails fast.
        let transport = UreqTransport::with_timeout(Some(Duration::from_secs(2)));
        let err = transport
            .send(&HttpRequest::get("http://127.0.0.1:9/"))
            .unwrap_err();
        assert!(err.is_transient(), "{err}");
    }

    #[test]
    fn malformed_header_is_invalid_request() {
        let transport = UreqTransport::new();
        let request =
            HttpRequest::new(HttpMethod::Get, "http://127.0.0.1:9/").with_header("bad header", "x");
        let err = transport.send(&request).unwrap_err();
        assert!(matches!(err, WireError::InvalidRequest(_)), "{err}");
    }
}
