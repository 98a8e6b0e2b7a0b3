use blerpc_link::Link;

use crate::config::FrameConfig;
use crate::error::Result;
use crate::reader::read_message;
use crate::reassembler::Reassembler;
use crate::writer::write_message;

/// Both directions of message framing over a single link value.
///
/// Send-side state is per call; receive-side state lives in one
/// [`Reassembler`] for the lifetime of the connection.
pub struct FramedLink<L> {
    inner: L,
    config: FrameConfig,
    reassembler: Reassembler,
}

impl<L: Link> FramedLink<L> {
    /// Frame `inner` with the default configuration.
    pub fn new(inner: L) -> Self {
        Self::with_config(inner, FrameConfig::default())
    }

    /// Frame `inner` with an explicit configuration.
    pub fn with_config(inner: L, config: FrameConfig) -> Self {
        let reassembler = Reassembler::with_config(&config);
        Self {
            inner,
            config,
            reassembler,
        }
    }

    /// Replace the receive-side reassembler (for example to attach an
    /// observer).
    pub fn with_reassembler(mut self, reassembler: Reassembler) -> Self {
        self.reassembler = reassembler;
        self
    }

    /// Fragment and send one message. Returns the number of packets written.
    pub fn send(&mut self, message: &str) -> Result<usize> {
        write_message(&mut self.inner, &self.config, message)
    }

    /// Read the next complete message (blocking).
    pub fn recv(&mut self) -> Result<String> {
        read_message(&mut self.inner, &mut self.reassembler)
    }

    /// Drop any partially received message.
    pub fn reset(&mut self) {
        self.reassembler.clear();
    }

    /// Negotiated MTU of the underlying link.
    pub fn mtu(&self) -> usize {
        self.inner.mtu()
    }

    /// Payload size the next send would use.
    pub fn max_payload(&self) -> usize {
        self.config.max_payload(self.inner.mtu())
    }

    /// Current framing configuration.
    pub fn config(&self) -> &FrameConfig {
        &self.config
    }

    /// Inspect the receive-side reassembly state.
    pub fn reassembler(&self) -> &Reassembler {
        &self.reassembler
    }

    /// Borrow the underlying link.
    pub fn get_ref(&self) -> &L {
        &self.inner
    }

    /// Mutably borrow the underlying link.
    pub fn get_mut(&mut self) -> &mut L {
        &mut self.inner
    }

    /// Consume the framer and return the inner link.
    pub fn into_inner(self) -> L {
        self.inner
    }
}

impl<L> std::fmt::Debug for FramedLink<L> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("FramedLink")
            .field("config", &self.config)
            .field("reassembler", &self.reassembler)
            .finish_non_exhaustive()
    }
}
