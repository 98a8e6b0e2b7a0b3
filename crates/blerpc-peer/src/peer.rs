use std::time::{SystemTime, UNIX_EPOCH};

use blerpc_frame::{FrameConfig, FramedLink, Reassembler};
use blerpc_link::Link;
use serde::de::DeserializeOwned;
use serde::Serialize;
use tracing::{debug, info, warn};

use crate::error::{PeerError, Result};
use crate::jsonrpc::{JsonRpcMessage, JsonRpcRequest, JsonRpcResponse};

/// Peer session configuration.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PeerConfig {
    /// Framing limits and policies for this end.
    pub frame: FrameConfig,
    /// Reject received text that is not a JSON document in [`Peer::recv`].
    pub validate_json: bool,
}

impl Default for PeerConfig {
    fn default() -> Self {
        Self {
            frame: FrameConfig::default(),
            validate_json: true,
        }
    }
}

/// A JSON-RPC session over one link.
///
/// Sends are fragmented for the link's MTU at the time of each send;
/// receives always yield whole messages. Closing the peer drops any
/// partially received message, and every later operation fails with
/// [`PeerError::Closed`].
pub struct Peer<L> {
    id: String,
    framed: FramedLink<L>,
    config: PeerConfig,
    closed: bool,
}

impl<L: Link> Peer<L> {
    /// Start a session on a connected link with default configuration.
    pub fn new(link: L) -> Self {
        Self::with_config(link, PeerConfig::default())
    }

    /// Start a session with explicit configuration.
    pub fn with_config(link: L, config: PeerConfig) -> Self {
        let id = session_id();
        info!(peer_id = %id, mtu = link.mtu(), "peer session started");
        Self {
            id,
            framed: FramedLink::with_config(link, config.frame),
            config,
            closed: false,
        }
    }

    /// Replace the receive-side reassembler (for example to attach an
    /// observer).
    pub fn with_reassembler(mut self, reassembler: Reassembler) -> Self {
        self.framed = self.framed.with_reassembler(reassembler);
        self
    }

    /// Session identifier.
    pub fn id(&self) -> &str {
        &self.id
    }

    /// Send raw text. Returns the number of packets written.
    pub fn send(&mut self, message: &str) -> Result<usize> {
        self.ensure_open()?;
        self.framed.send(message).map_err(PeerError::from_frame)
    }

    /// Serialize `value` as JSON and send it.
    pub fn send_json<T: Serialize + ?Sized>(&mut self, value: &T) -> Result<usize> {
        let text = serde_json::to_string(value)?;
        self.send(&text)
    }

    /// Send a JSON-RPC message.
    pub fn send_message(&mut self, message: &JsonRpcMessage) -> Result<usize> {
        self.send_json(message)
    }

    /// Receive the next message as text (blocking).
    ///
    /// With `validate_json` set, text that does not parse as JSON is
    /// reported as [`PeerError::Json`]; the session stays usable.
    pub fn recv(&mut self) -> Result<String> {
        self.ensure_open()?;
        let text = self.framed.recv().map_err(PeerError::from_frame)?;
        if self.config.validate_json {
            if let Err(err) = serde_json::from_str::<serde::de::IgnoredAny>(&text) {
                warn!(peer_id = %self.id, error = %err, "received non-JSON message");
                return Err(err.into());
            }
        }
        Ok(text)
    }

    /// Receive the next message and deserialize it.
    pub fn recv_json<T: DeserializeOwned>(&mut self) -> Result<T> {
        let text = self.recv()?;
        Ok(serde_json::from_str(&text)?)
    }

    /// Receive and validate the next JSON-RPC message.
    pub fn recv_message(&mut self) -> Result<JsonRpcMessage> {
        let text = self.recv()?;
        JsonRpcMessage::parse(&text)
    }

    /// Send a request and wait for the response with the same id.
    ///
    /// Notifications and responses to other ids that arrive first are
    /// logged and skipped.
    pub fn request(&mut self, request: &JsonRpcRequest) -> Result<JsonRpcResponse> {
        self.send_json(request)?;
        loop {
            match self.recv_message()? {
                JsonRpcMessage::Response(resp) if resp.id == request.id => return Ok(resp),
                other => {
                    warn!(
                        peer_id = %self.id,
                        waiting_for = %request.id,
                        method = other.method(),
                        "skipping unrelated message while waiting for response"
                    );
                }
            }
        }
    }

    /// Close the session and drop partial receive state.
    pub fn close(&mut self) {
        if self.closed {
            return;
        }
        self.framed.reset();
        self.closed = true;
        debug!(peer_id = %self.id, "peer session closed");
    }

    /// True once [`close`](Self::close) has been called.
    pub fn is_closed(&self) -> bool {
        self.closed
    }

    /// Negotiated MTU of the link.
    pub fn mtu(&self) -> usize {
        self.framed.mtu()
    }

    /// Payload size the next send would use.
    pub fn max_payload(&self) -> usize {
        self.framed.max_payload()
    }

    /// Current configuration.
    pub fn config(&self) -> &PeerConfig {
        &self.config
    }

    /// Borrow the framed link.
    pub fn framed(&self) -> &FramedLink<L> {
        &self.framed
    }

    /// Borrow the underlying link.
    pub fn link(&self) -> &L {
        self.framed.get_ref()
    }

    /// Consume the peer and return the underlying link.
    pub fn into_inner(self) -> L {
        self.framed.into_inner()
    }

    fn ensure_open(&self) -> Result<()> {
        if self.closed {
            return Err(PeerError::Closed);
        }
        Ok(())
    }
}

impl<L> std::fmt::Debug for Peer<L> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Peer")
            .field("id", &self.id)
            .field("config", &self.config)
            .field("closed", &self.closed)
            .finish_non_exhaustive()
    }
}

pub(crate) fn session_id() -> String {
    let nanos = SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .map(|d| d.as_nanos())
        .unwrap_or(0);
    format!("session-{}-{nanos}", std::process::id())
}
