//! Packet link abstraction for MTU-bounded transports.
//!
//! A link carries small, atomic, in-order packets in both directions and
//! reports the currently negotiated MTU. This is the lowest layer of blerpc:
//! the framing layer in `blerpc-frame` splits messages into packets that fit
//! a [`Link`], and reassembles the packets it reads back.
//!
//! Provided links:
//! - [`MemoryLink`]: in-process pair, for tests and loopback tooling
//! - [`UnixDatagramLink`]: packet-preserving Unix datagram sockets
//! - [`AsyncMemoryLink`]: tokio-backed in-process pair (behind `async`)

pub mod error;
pub mod limits;
pub mod memory;
pub mod traits;

#[cfg(unix)]
pub mod datagram;

#[cfg(feature = "async")]
pub mod async_link;

pub use error::{LinkError, Result};
pub use limits::{max_value_len, ATT_OVERHEAD, DEFAULT_MTU, MAX_GATT_VALUE_LEN, MIN_PAYLOAD};
pub use memory::MemoryLink;
pub use traits::Link;

#[cfg(unix)]
pub use datagram::UnixDatagramLink;

#[cfg(feature = "async")]
pub use async_link::{AsyncLink, AsyncMemoryLink};
