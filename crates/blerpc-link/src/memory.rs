use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::mpsc::{self, Receiver, RecvTimeoutError, Sender};
use std::sync::Arc;
use std::time::Duration;

use bytes::Bytes;
use tracing::trace;

use crate::error::{LinkError, Result};
use crate::limits::{max_value_len, DEFAULT_MTU};
use crate::traits::Link;

/// One end of an in-process packet link.
///
/// Both ends share the negotiated MTU, so [`MemoryLink::set_mtu`] on either
/// end models an MTU exchange for the whole connection.
pub struct MemoryLink {
    tx: Sender<Bytes>,
    rx: Receiver<Bytes>,
    mtu: Arc<AtomicUsize>,
    read_timeout: Option<Duration>,
}

impl MemoryLink {
    /// Create two connected ends with the given negotiated MTU.
    pub fn pair(mtu: usize) -> (Self, Self) {
        let (left_tx, right_rx) = mpsc::channel();
        let (right_tx, left_rx) = mpsc::channel();
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

    /// Create a connected pair at the default ATT MTU.
    pub fn default_pair() -> (Self, Self) {
        Self::pair(DEFAULT_MTU)
    }

    /// Update the negotiated MTU for both ends.
    pub fn set_mtu(&self, mtu: usize) {
        self.mtu.store(mtu, Ordering::Relaxed);
    }

    /// Set a read timeout for [`Link::read_packet`]. `None` blocks forever.
    pub fn set_read_timeout(&mut self, timeout: Option<Duration>) {
        self.read_timeout = timeout;
    }

    /// Largest packet this link accepts at the current MTU.
    pub fn max_value_len(&self) -> usize {
        max_value_len(self.mtu())
    }
}

impl Link for MemoryLink {
    fn mtu(&self) -> usize {
        self.mtu.load(Ordering::Relaxed)
    }

    fn write_packet(&mut self, packet: &[u8]) -> Result<()> {
        let max = self.max_value_len();
        if packet.len() > max {
            return Err(LinkError::PacketTooLarge {
                len: packet.len(),
                max,
            });
        }
        trace!(len = packet.len(), "memory link write");
        self.tx
            .send(Bytes::copy_from_slice(packet))
            .map_err(|_| LinkError::Closed)
    }

    fn read_packet(&mut self) -> Result<Bytes> {
        match self.read_timeout {
            None => self.rx.recv().map_err(|_| LinkError::Closed),
            Some(timeout) => self.rx.recv_timeout(timeout).map_err(|err| match err {
                RecvTimeoutError::Timeout => LinkError::Timeout(timeout),
                RecvTimeoutError::Disconnected => LinkError::Closed,
            }),
        }
    }
}

impl std::fmt::Debug for MemoryLink {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("MemoryLink")
            .field("mtu", &self.mtu())
            .field("read_timeout", &self.read_timeout)
            .finish()
    }
}
