//! Decorators that can be stacked over a transport.
//!
//! # Data Flow
//! ```text
//! Client request:
//!     → retry.rs  (re-run on transport failure or 5xx)
//!     → decode.rs (advertise accept-encoding, decompress the body)
//!     → cache.rs  (add the conditional header, resolve 304 from memory)
//!     → Transport
//! ```
//!
//! This is the order `Client::from_config` uses. Any other order is allowed;
//! each wire only relies on the `Wire` contract of its inner wire.

pub mod cache;
pub mod decode;
pub mod retry;

pub use cache::{CachingWire, Validator};
pub use decode::{ContentDecodingWire, Encoding};
pub use retry::RetryWire;
