//! Composable HTTP execution pipeline.
//!
//! # Overview
//! A `Client` sends `HttpRequest` values through a chain of `Wire`
//! decorators that ends in a `Transport`. Behavior such as retries, content
//! decoding and conditional caching is added by stacking wires, each of which
//! can be tested on its own against `mock::ScriptedTransport`.
//!
//! # Design
//! - Requests and responses are immutable values; wires build new ones.
//! - The chain is assembled once and shared behind an `Arc`, so a client can
//!   be cloned and used from many threads.
//! - `fetch` blocks until the chain has produced a response or an error.
//! - Non-2xx statuses are responses, not errors. `HttpResponse::expect_status`
//!   is the opt-in assertion.
//!
//! ```no_run
//! use wire_core::{Client, UreqTransport};
//! use wire_core::wires::{CachingWire, RetryWire};
//!
//! let client = Client::builder("http://localhost:3000")
//!     .through(|next| RetryWire::new(next).attempts(3))
//!     .through(CachingWire::last_modified)
//!     .build(UreqTransport::new());
//!
//! let response = client.fetch(&client.get("/report"))?;
//! println!("{}", response.body_text());
//! # Ok::<(), wire_core::WireError>(())
//! ```

pub mod client;
pub mod config;
pub mod error;
pub mod http;
pub mod mock;
pub mod transport;
pub mod wire;
pub mod wires;

pub use client::{Client, ClientBuilder};
pub use config::{ClientConfig, ConfigError};
pub use error::WireError;
pub use http::{Headers, HttpMethod, HttpRequest, HttpResponse};
pub use transport::UreqTransport;
pub use wire::{Transport, TransportWire, Wire, WireChain};
