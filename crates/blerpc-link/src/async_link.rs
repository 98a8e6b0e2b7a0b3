use std::future::Future;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;
use std::time::Duration;

use bytes::Bytes;
use tokio::sync::mpsc::{self, UnboundedReceiver, UnboundedSender};

use crate::error::{LinkError, Result};
use crate::limits::max_value_len;

/// Async counterpart of [`Link`](crate::Link).
///
/// Same contract: whole packets, in order, one at a time.
pub trait AsyncLink {
    /// Currently negotiated MTU (including ATT overhead).
    fn mtu(&self) -> usize;

    /// Transmit one packet.
    fn write_packet(&mut self, packet: &[u8]) -> impl Future<Output = Result<()>> + Send;

    /// Receive the next packet.
    fn read_packet(&mut self) -> impl Future<Output = Result<Bytes>> + Send;
}

/// One end of an in-process async packet link backed by tokio channels.
pub struct AsyncMemoryLink {
    tx: UnboundedSender<Bytes>,
    rx: UnboundedReceiver<Bytes>,
    mtu: Arc<AtomicUsize>,
    read_timeout: Option<Duration>,
}

impl AsyncMemoryLink {
    /// Create two connected ends with the given negotiated MTU.
    pub fn pair(mtu: usize) -> (Self, Self) {
        let (left_tx, right_rx) = mpsc::unbounded_channel();
        let (right_tx, left_rx) = mpsc::unbounded_channel();
        let mtu = Arc::new(AtomicUsize::new(mtu));

        let left = Self {
            tx: left_tx,
            rx: left_rx,
            mtu: Arc::clone(&mtu),
            read_timeout: None,
        };
        let right = Self {
            tx: right_tx,
            rx: right_rx,
            mtu,
            read_timeout: None,
        };
        (left, right)
    }

    /// Update the negotiated MTU for both ends.
    pub fn set_mtu(&self, mtu: usize) {
        self.mtu.store(mtu, Ordering::Relaxed);
    }

    /// Set a read timeout. `None` waits forever.
    pub fn set_read_timeout(&mut self, timeout: Option<Duration>) {
        self.read_timeout = timeout;
    }
}

impl AsyncLink for AsyncMemoryLink {
    fn mtu(&self) -> usize {
        self.mtu.load(Ordering::Relaxed)
    }

    async fn write_packet(&mut self, packet: &[u8]) -> Result<()> {
        let max = max_value_len(self.mtu());
        if packet.len() > max {
            return Err(LinkError::PacketTooLarge {
                len: packet.len(),
                max,
            });
        }
        self.tx
            .send(Bytes::copy_from_slice(packet))
            .map_err(|_| LinkError::Closed)
    }

    async fn read_packet(&mut self) -> Result<Bytes> {
        match self.read_timeout {
            None => self.rx.recv().await.ok_or(LinkError::Closed),
            Some(timeout) => match tokio::time::timeout(timeout, self.rx.recv()).await {
                Ok(packet) => packet.ok_or(LinkError::Closed),
                Err(_) => Err(LinkError::Timeout(timeout)),
            },
        }
    }
}

impl std::fmt::Debug for AsyncMemoryLink {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("AsyncMemoryLink")
            .field("mtu", &self.mtu())
            .field("read_timeout", &self.read_timeout)
            .finish()
    }
}
