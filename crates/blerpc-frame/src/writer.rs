use blerpc_link::Link;
use tracing::debug;

use crate::config::FrameConfig;
use crate::error::Result;
use crate::fragmenter::packetize;

/// Packetize `message` for the link's current MTU and write every packet
/// in order. Returns the number of packets written.
///
/// The MTU is read once per message, so a renegotiation takes effect on
/// the next send.
pub fn write_message<L: Link + ?Sized>(
    link: &mut L,
    config: &FrameConfig,
    message: &str,
) -> Result<usize> {
    let mtu = link.mtu();
    let max_payload = config.max_payload(mtu);
    let packetized = packetize(message, max_payload)?;

    for packet in &packetized.packets {
        link.write_packet(packet)?;
    }

    debug!(
        len = message.len(),
        mtu,
        max_payload,
        packets = packetized.len(),
        "message sent"
    );
    Ok(packetized.len())
}

/// Writes complete messages to any [`Link`].
pub struct MessageWriter<L> {
    inner: L,
    config: FrameConfig,
}

impl<L: Link> MessageWriter<L> {
    /// Create a new message writer with default configuration.
    pub fn new(inner: L) -> Self {
        Self::with_config(inner, FrameConfig::default())
    }

    /// Create a new message writer with explicit configuration.
    pub fn with_config(inner: L, config: FrameConfig) -> Self {
        Self { inner, config }
    }

    /// Fragment and send one message. Returns the number of packets written.
    pub fn send(&mut self, message: &str) -> Result<usize> {
        write_message(&mut self.inner, &self.config, message)
    }

    /// Payload size the next send would use.
    pub fn max_payload(&self) -> usize {
        self.config.max_payload(self.inner.mtu())
    }

    /// Borrow the underlying link.
    pub fn get_ref(&self) -> &L {
        &self.inner
    }

    /// Mutably borrow the underlying link.
    pub fn get_mut(&mut self) -> &mut L {
        &mut self.inner
    }

    /// Consume the writer and return the inner link.
    pub fn into_inner(self) -> L {
        self.inner
    }

    /// Current writer configuration.
    pub fn config(&self) -> &FrameConfig {
        &self.config
    }
}

#[cfg(test)]
mod tests {
    use blerpc_link::{LinkError, MemoryLink, DEFAULT_MTU};

    use super::*;
    use crate::error::FrameError;
    use crate::header::{decode_header, PacketType};

    #[test]
    fn short_message_is_one_write() {
        let (left, mut right) = MemoryLink::pair(DEFAULT_MTU);
        let mut writer = MessageWriter::new(left);

        assert_eq!(writer.send("hello").unwrap(), 1);
        let packet = right.read_packet().unwrap();
        assert_eq!(decode_header(packet[0]).0, PacketType::Single);
        assert_eq!(&packet[1..], b"hello");
    }

    #[test]
    fn long_message_uses_link_mtu() {
        let (left, mut right) = MemoryLink::pair(DEFAULT_MTU);
        let mut writer = MessageWriter::new(left);
        assert_eq!(writer.max_payload(), 20);

        let message = "m".repeat(100);
        let sent = writer.send(&message).unwrap();
        // 15 + 19 * 4 + 9
        assert_eq!(sent, 6);

        let packets: Vec<_> = (0..sent).map(|_| right.read_packet().unwrap()).collect();
        assert!(packets.iter().all(|p| p.len() <= 20));
        assert_eq!(decode_header(packets[5][0]).0, PacketType::End);
    }

    #[test]
    fn renegotiated_mtu_applies_to_next_send() {
        let (left, _right) = MemoryLink::pair(DEFAULT_MTU);
        let mut writer = MessageWriter::new(left);
        let message = "r".repeat(100);

        assert_eq!(writer.send(&message).unwrap(), 6);
        writer.get_ref().set_mtu(247);
        assert_eq!(writer.max_payload(), 244);
        assert_eq!(writer.send(&message).unwrap(), 1);
    }

    #[test]
    fn floor_above_link_capacity_surfaces_link_error() {
        let (left, _right) = MemoryLink::pair(10);
        let mut writer = MessageWriter::new(left);

        let err = writer.send(&"a".repeat(50)).unwrap_err();
        assert!(matches!(
            err,
            FrameError::Link(LinkError::PacketTooLarge { len: 20, max: 7 })
        ));
    }

    #[test]
    fn closed_link_surfaces_as_link_error() {
        let (left, right) = MemoryLink::pair(DEFAULT_MTU);
        drop(right);
        let mut writer = MessageWriter::new(left);
        assert!(matches!(
            writer.send("bye"),
            Err(FrameError::Link(LinkError::Closed))
        ));
    }

    #[test]
    fn too_small_payload_is_reported_before_writing() {
        let (left, mut right) = MemoryLink::pair(DEFAULT_MTU);
        right.set_read_timeout(Some(std::time::Duration::from_millis(10)));
        let config = FrameConfig {
            min_payload: 0,
            max_gatt_value_len: 4,
            ..FrameConfig::default()
        };
        let mut writer = MessageWriter::with_config(left, config);

        let err = writer.send("does not fit").unwrap_err();
        assert!(matches!(err, FrameError::MtuTooSmall { max_payload: 4, .. }));
        assert!(matches!(right.read_packet(), Err(LinkError::Timeout(_))));
    }

    #[test]
    fn accessors_and_into_inner() {
        let (left, _right) = MemoryLink::pair(DEFAULT_MTU);
        let mut writer = MessageWriter::new(left);

        assert_eq!(writer.config(), &FrameConfig::default());
        let _ = writer.get_mut();
        let inner = writer.into_inner();
        assert_eq!(inner.mtu(), DEFAULT_MTU);
    }
}
