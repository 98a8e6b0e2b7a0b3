//! JSON-RPC sessions over framed packet links.
//!
//! This is the "just works" layer: hand a [`Peer`] a connected link and
//! exchange whole JSON-RPC messages, regardless of how small the link's MTU
//! is. Fragmentation, reassembly and MTU tracking happen underneath.

pub mod error;
pub mod jsonrpc;
pub mod peer;

#[cfg(feature = "async")]
pub mod async_peer;

pub use error::{PeerError, Result};
pub use jsonrpc::{
    JsonRpcError, JsonRpcMessage, JsonRpcNotification, JsonRpcRequest, JsonRpcResponse,
    RequestId, JSONRPC_VERSION,
};
pub use peer::{Peer, PeerConfig};

#[cfg(feature = "async")]
pub use async_peer::AsyncPeer;
