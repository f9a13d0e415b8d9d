//! The `Wire` capability and the chain that stacks wires over a transport.
//!
//! # Design
//! A wire turns a request into a response, usually by handing a (possibly
//! rewritten) request to the wire it owns. Chains are plain ownership: each
//! decorator holds its `next` as a `Box<dyn Wire>`, and the innermost wire
//! adapts a `Transport`. `WireChain` records layers in order and folds them
//! so that the first layer added ends up outermost.
//!
//! ```text
//! Client ─▶ layer[0] ─▶ layer[1] ─▶ … ─▶ TransportWire ─▶ Transport
//! ```

use std::sync::Arc;

use crate::error::WireError;
use crate::http::{HttpRequest, HttpResponse};

/// One decorator in the chain, or its terminal transport adapter.
///
/// Implementations may call their inner wire zero, one or several times. The
/// request is borrowed and never mutated; to change it, build a new one.
pub trait Wire: Send + Sync {
    fn execute(&self, request: &HttpRequest) -> Result<HttpResponse, WireError>;
}

impl<W: Wire + ?Sized> Wire for Box<W> {
    fn execute(&self, request: &HttpRequest) -> Result<HttpResponse, WireError> {
        (**self).execute(request)
    }
}

impl<W: Wire + ?Sized> Wire for Arc<W> {
    fn execute(&self, request: &HttpRequest) -> Result<HttpResponse, WireError> {
        (**self).execute(request)
    }
}

/// Executes a single round-trip against a live endpoint.
///
/// The core never performs I/O itself; everything network-facing sits behind
/// this trait, so tests can swap in `mock::ScriptedTransport`.
pub trait Transport: Send + Sync {
    fn send(&self, request: &HttpRequest) -> Result<HttpResponse, WireError>;
}

impl<T: Transport + ?Sized> Transport for Arc<T> {
    fn send(&self, request: &HttpRequest) -> Result<HttpResponse, WireError> {
        (**self).send(request)
    }
}

/// Terminal wire: forwards to a `Transport` without touching the exchange.
pub struct TransportWire<T> {
    transport: T,
}

impl<T: Transport> TransportWire<T> {
    pub fn new(transport: T) -> Self {
        Self { transport }
    }
}

impl<T: Transport> Wire for TransportWire<T> {
    fn execute(&self, request: &HttpRequest) -> Result<HttpResponse, WireError> {
        tracing::trace!(method = %request.method(), uri = request.uri(), "sending request");
        let response = self.transport.send(request)?;
        tracing::trace!(
            uri = request.uri(),
            status = response.status(),
            bytes = response.body().len(),
            "received response"
        );
        Ok(response)
    }
}

type Layer = Box<dyn FnOnce(Box<dyn Wire>) -> Box<dyn Wire> + Send>;

/// Ordered list of decorators waiting to be stacked over a transport.
#[derive(Default)]
pub struct WireChain {
    layers: Vec<Layer>,
}

impl WireChain {
    pub fn new() -> Self {
        Self::default()
    }

    /// Appends a decorator. `wrap` receives the rest of the chain (everything
    /// added after it, down to the transport) and returns the wire wrapping it.
    pub fn through<W, F>(mut self, wrap: F) -> Self
    where
        W: Wire + 'static,
        F: FnOnce(Box<dyn Wire>) -> W + Send + 'static,
    {
        self.layers.push(Box::new(move |next| Box::new(wrap(next))));
        self
    }

    pub fn len(&self) -> usize {
        self.layers.len()
    }

    pub fn is_empty(&self) -> bool {
        self.layers.is_empty()
    }

    /// Stacks the layers over `transport`, first layer outermost.
    pub fn build<T: Transport + 'static>(self, transport: T) -> Box<dyn Wire> {
        let base: Box<dyn Wire> = Box::new(TransportWire::new(transport));
        self.layers.into_iter().rev().fold(base, |next, wrap| wrap(next))
    }
}
