//! Content-decoding wire.
//!
//! Decompresses bodies declared with `content-encoding: gzip` (or `x-gzip`)
//! and `deflate`, then strips `content-encoding` and the now-stale
//! `content-length`. Unknown encodings and corrupt streams fail with
//! `WireError::Decoding` instead of handing back garbled bytes.

use std::io::Read;

use flate2::read::{MultiGzDecoder, ZlibDecoder};

use crate::error::WireError;
use crate::http::{HttpRequest, HttpResponse};
use crate::wire::Wire;

const ACCEPTED: &str = "gzip, deflate";

/// Compression schemes this wire can undo.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Encoding {
    Identity,
    Gzip,
    Deflate,
}

impl Encoding {
    pub fn parse(token: &str) -> Result<Self, WireError> {
        match token.trim().to_ascii_lowercase().as_str() {
            "" | "identity" => Ok(Encoding::Identity),
            "gzip" | "x-gzip" => Ok(Encoding::Gzip),
            "deflate" => Ok(Encoding::Deflate),
            other => Err(WireError::Decoding(format!("unsupported content-encoding: {other}"))),
        }
    }

    /// Undoes this encoding on `body`. A gzip body may hold several
    /// concatenated members; all of them are decoded.
    pub fn decode(self, body: &[u8]) -> Result<Vec<u8>, WireError> {
        let mut out = Vec::new();
        let read = match self {
            Encoding::Identity => return Ok(body.to_vec()),
            Encoding::Gzip => MultiGzDecoder::new(body).read_to_end(&mut out),
            Encoding::Deflate => ZlibDecoder::new(body).read_to_end(&mut out),
        };
        read.map_err(|e| WireError::Decoding(format!("malformed {self:?} stream: {e}")))?;
        Ok(out)
    }
}

pub struct ContentDecodingWire {
    next: Box<dyn Wire>,
}

impl ContentDecodingWire {
    pub fn new(next: Box<dyn Wire>) -> Self {
        Self { next }
    }
}

impl Wire for ContentDecodingWire {
    fn execute(&self, request: &HttpRequest) -> Result<HttpResponse, WireError> {
        let response = if request.headers().contains("accept-encoding") {
            self.next.execute(request)?
        } else {
            let request = request.clone().with_header("accept-encoding", ACCEPTED);
            self.next.execute(&request)?
        };
        decode_response(response)
    }
}

/// Decodes `response` according to its `content-encoding` header. Repeated
/// header lines count as one comma-separated list.
pub fn decode_response(response: HttpResponse) -> Result<HttpResponse, WireError> {
    if !response.headers().contains("content-encoding") {
        return Ok(response);
    }
    let declared = response.header_values("content-encoding").join(", ");
    // Codings are listed in the order they were applied.
    let encodings = declared
        .split(',')
        .map(Encoding::parse)
        .collect::<Result<Vec<_>, _>>()?;

    if response.body().is_empty() {
        return Ok(response.without_header("content-encoding"));
    }

    let mut body = response.body().to_vec();
    for encoding in encodings.iter().rev() {
        body = encoding.decode(&body)?;
    }
    tracing::debug!(
        encoding = %declared,
        encoded = response.body().len(),
        decoded = body.len(),
        "decoded response body"
    );

    Ok(response
        .without_header("content-encoding")
        .without_header("content-length")
        .with_body(body))
}
