use bytes::Bytes;

use crate::error::Result;

/// A connected packet link: one atomic write per packet, delivered whole
/// and in order.
///
/// This is the collaborator the framing layer talks to. Discovery,
/// connection setup and characteristic resolution all happen before a
/// `Link` value exists.
pub trait Link {
    /// Currently negotiated MTU (including ATT overhead).
    fn mtu(&self) -> usize;

    /// Transmit one packet. Blocks until the link accepts it.
    fn write_packet(&mut self, packet: &[u8]) -> Result<()>;

    /// Receive the next packet (blocking).
    ///
    /// Returns `Err(LinkError::Closed)` once the other end has gone away and
    /// every packet it sent has been read. Connectionless links cannot see
    /// the other end leave; they block until their read timeout elapses.
    fn read_packet(&mut self) -> Result<Bytes>;
}

impl<L: Link + ?Sized> Link for &mut L {
    fn mtu(&self) -> usize {
        (**self).mtu()
    }

    fn write_packet(&mut self, packet: &[u8]) -> Result<()> {
        (**self).write_packet(packet)
    }

    fn read_packet(&mut self) -> Result<Bytes> {
        (**self).read_packet()
    }
}

impl<L: Link + ?Sized> Link for Box<L> {
    fn mtu(&self) -> usize {
        (**self).mtu()
    }

    fn write_packet(&mut self, packet: &[u8]) -> Result<()> {
        (**self).write_packet(packet)
    }

    fn read_packet(&mut self) -> Result<Bytes> {
        (**self).read_packet()
    }
}
