use blerpc_frame::{read_message_async, write_message_async, Reassembler};
use blerpc_link::AsyncLink;
use serde::de::DeserializeOwned;
use serde::Serialize;
use tracing::{debug, info};

use crate::error::{PeerError, Result};
use crate::jsonrpc::{JsonRpcMessage, JsonRpcRequest, JsonRpcResponse};
use crate::peer::{session_id, PeerConfig};

/// Async counterpart of [`Peer`](crate::Peer).
pub struct AsyncPeer<L> {
    id: String,
    link: L,
    config: PeerConfig,
    reassembler: Reassembler,
    closed: bool,
}

impl<L: AsyncLink + Send> AsyncPeer<L> {
    /// Start a session on a connected link with default configuration.
    pub fn new(link: L) -> Self {
        Self::with_config(link, PeerConfig::default())
    }

    /// Start a session with explicit configuration.
    pub fn with_config(link: L, config: PeerConfig) -> Self {
        let id = session_id();
        info!(peer_id = %id, mtu = link.mtu(), "async peer session started");
        Self {
            id,
            link,
            reassembler: Reassembler::with_config(&config.frame),
            config,
            closed: false,
        }
    }

    /// Session identifier.
    pub fn id(&self) -> &str {
        &self.id
    }

    /// Send raw text. Returns the number of packets written.
    pub async fn send(&mut self, message: &str) -> Result<usize> {
        self.ensure_open()?;
        write_message_async(&mut self.link, &self.config.frame, message)
            .await
            .map_err(PeerError::from_frame)
    }

    /// Serialize `value` as JSON and send it.
    pub async fn send_json<T: Serialize + ?Sized>(&mut self, value: &T) -> Result<usize> {
        let text = serde_json::to_string(value)?;
        self.send(&text).await
    }

    /// Receive the next message as text.
    pub async fn recv(&mut self) -> Result<String> {
        self.ensure_open()?;
        let text = read_message_async(&mut self.link, &mut self.reassembler)
            .await
            .map_err(PeerError::from_frame)?;
        if self.config.validate_json {
            serde_json::from_str::<serde::de::IgnoredAny>(&text)?;
        }
        Ok(text)
    }

    /// Receive the next message and deserialize it.
    pub async fn recv_json<T: DeserializeOwned>(&mut self) -> Result<T> {
        let text = self.recv().await?;
        Ok(serde_json::from_str(&text)?)
    }

    /// Receive and validate the next JSON-RPC message.
    pub async fn recv_message(&mut self) -> Result<JsonRpcMessage> {
        let text = self.recv().await?;
        JsonRpcMessage::parse(&text)
    }

    /// Send a request and wait for the response with the same id.
    pub async fn request(&mut self, request: &JsonRpcRequest) -> Result<JsonRpcResponse> {
        self.send_json(request).await?;
        loop {
            if let JsonRpcMessage::Response(resp) = self.recv_message().await? {
                if resp.id == request.id {
                    return Ok(resp);
                }
            }
        }
    }

    /// Close the session and drop partial receive state.
    pub fn close(&mut self) {
        if !self.closed {
            self.reassembler = Reassembler::with_config(&self.config.frame);
            self.closed = true;
            debug!(peer_id = %self.id, "async peer session closed");
        }
    }

    /// Consume the peer and return the underlying link.
    pub fn into_inner(self) -> L {
        self.link
    }

    fn ensure_open(&self) -> Result<()> {
        if self.closed {
            return Err(PeerError::Closed);
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use blerpc_link::{AsyncMemoryLink, DEFAULT_MTU};
    use serde_json::json;

    use super::*;

    #[tokio::test]
    async fn async_request_response() {
        let (left, right) = AsyncMemoryLink::pair(DEFAULT_MTU);
        let mut client = AsyncPeer::new(left);
        let mut server = AsyncPeer::new(right);

        let server_task = tokio::spawn(async move {
            let JsonRpcMessage::Request(req) = server.recv_message().await.unwrap() else {
                panic!("expected a request");
            };
            server
                .send_json(&JsonRpcResponse::success(req.id, json!({ "tools": [] })))
                .await
                .unwrap();
        });

        let resp = client
            .request(&JsonRpcRequest::new(1, "tools/list", None))
            .await
            .unwrap();
        assert_eq!(resp.result, Some(json!({ "tools": [] })));
        server_task.await.unwrap();
    }

    #[tokio::test]
    async fn async_closed_peer_rejects_send() {
        let (left, _right) = AsyncMemoryLink::pair(DEFAULT_MTU);
        let mut peer = AsyncPeer::new(left);
        peer.close();
        assert!(matches!(peer.send("{}").await, Err(PeerError::Closed)));
    }
}
