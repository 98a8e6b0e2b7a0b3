//! JSON-RPC over MTU-bounded, GATT-style packet links.
//!
//! blerpc carries arbitrary-length UTF-8 messages over a transport that only
//! supports small atomic writes, splitting them into packets on the way out
//! and rebuilding them on the way in.
//!
//! # Crate Structure
//!
//! - [`link`]: Packet link abstraction and the in-memory / datagram links
//! - [`frame`]: Header codec, fragmenter and reassembler
//! - [`peer`]: JSON-RPC sessions over a framed link (behind `peer` feature)

/// Re-export link types.
pub mod link {
    pub use blerpc_link::*;
}

/// Re-export frame types.
pub mod frame {
    pub use blerpc_frame::*;
}

/// Re-export peer types (requires `peer` feature).
#[cfg(feature = "peer")]
pub mod peer {
    pub use blerpc_peer::*;
}
