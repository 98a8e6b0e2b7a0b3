//! Message fragmentation and reassembly over MTU-bounded packet links.
//!
//! Every packet starts with a one-byte header packing a packet type and a
//! wrapping sequence number. A message that fits in one packet is sent as
//! `SINGLE`; anything larger is sent as `START` (carrying the total length),
//! zero or more `CONT`, and one `END`.
//!
//! The receive side never errors on bad input: a gap, duplicate, reorder or
//! length mismatch drops the in-flight message and the [`Reassembler`]
//! waits for the next `START`.

pub mod config;
pub mod error;
pub mod fragmenter;
pub mod framed;
pub mod header;
pub mod reader;
pub mod reassembler;
pub mod writer;

pub use config::{FrameConfig, SinglePolicy};
pub use error::{FrameError, Result};
pub use fragmenter::{compute_max_payload, packetize, Packetized};
pub use framed::FramedLink;
pub use header::{
    decode_header, encode_header, next_sequence, PacketHeader, PacketType, HEADER_LEN,
    HEADER_SEQ_MASK, HEADER_TYPE_MASK, LENGTH_PREFIX_LEN, START_OVERHEAD, TYPE_CONT, TYPE_END,
    TYPE_SINGLE, TYPE_START,
};
pub use reader::{read_message, MessageReader};
pub use reassembler::{DiscardReason, Reassembler};
pub use writer::{write_message, MessageWriter};

#[cfg(feature = "async")]
pub mod async_io;

#[cfg(feature = "async")]
pub use async_io::{read_message_async, write_message_async};
