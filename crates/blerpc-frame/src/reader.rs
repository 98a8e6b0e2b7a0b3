use blerpc_link::Link;

use crate::config::FrameConfig;
use crate::error::Result;
use crate::reassembler::Reassembler;

/// Read packets from `link` into `reassembler` until a message completes.
///
/// Link errors propagate; anything the reassembler discards along the way
/// is absorbed and reading continues.
pub fn read_message<L: Link + ?Sized>(
    link: &mut L,
    reassembler: &mut Reassembler,
) -> Result<String> {
    loop {
        let packet = link.read_packet()?;
        if let Some(message) = reassembler.feed(&packet) {
            return Ok(message);
        }
    }
}

/// Reads complete messages from any [`Link`].
///
/// Handles fragmentation internally: callers always get whole messages.
pub struct MessageReader<L> {
    inner: L,
    reassembler: Reassembler,
}

impl<L: Link> MessageReader<L> {
    /// Create a new message reader with default configuration.
    pub fn new(inner: L) -> Self {
        Self::with_config(inner, FrameConfig::default())
    }

    /// Create a new message reader with explicit configuration.
    pub fn with_config(inner: L, config: FrameConfig) -> Self {
        Self::with_reassembler(inner, Reassembler::with_config(&config))
    }

    /// Create a reader around a preconfigured reassembler (for example one
    /// with an observer attached).
    pub fn with_reassembler(inner: L, reassembler: Reassembler) -> Self {
        Self { inner, reassembler }
    }

    /// Read the next complete message (blocking).
    pub fn read_message(&mut self) -> Result<String> {
        read_message(&mut self.inner, &mut self.reassembler)
    }

    /// Drop any partially received message.
    pub fn reset(&mut self) {
        self.reassembler.clear();
    }

    /// Inspect the reassembly state.
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

    /// Consume the reader and return the inner link.
    pub fn into_inner(self) -> L {
        self.inner
    }
}

#[cfg(test)]
mod tests {
    use std::sync::{Arc, Mutex};
    use std::time::Duration;

    use blerpc_link::{LinkError, MemoryLink, DEFAULT_MTU};

    use super::*;
    use crate::error::FrameError;
    use crate::fragmenter::packetize;
    use crate::header::{encode_header, PacketType};
    use crate::reassembler::DiscardReason;
    use crate::writer::MessageWriter;

    #[test]
    fn read_single_message() {
        let (left, right) = MemoryLink::pair(DEFAULT_MTU);
        let mut writer = MessageWriter::new(left);
        let mut reader = MessageReader::new(right);

        writer.send("ping").unwrap();
        assert_eq!(reader.read_message().unwrap(), "ping");
    }

    #[test]
    fn read_fragmented_messages_in_order() {
        let (left, right) = MemoryLink::pair(DEFAULT_MTU);
        let mut writer = MessageWriter::new(left);
        let mut reader = MessageReader::new(right);

        let long = r#"{"jsonrpc":"2.0","id":7,"method":"config_wifi","params":{"ssid":"home","password":"hunter22"}}"#;
        writer.send("one").unwrap();
        writer.send(long).unwrap();
        writer.send("three").unwrap();

        assert_eq!(reader.read_message().unwrap(), "one");
        assert_eq!(reader.read_message().unwrap(), long);
        assert_eq!(reader.read_message().unwrap(), "three");
        assert!(reader.reassembler().is_idle());
    }

    #[test]
    fn skips_broken_sequence_and_reads_next_message() {
        let (mut left, right) = MemoryLink::pair(DEFAULT_MTU);
        let seen = Arc::new(Mutex::new(Vec::new()));
        let sink = Arc::clone(&seen);
        let reassembler =
            Reassembler::new().with_observer(move |reason| sink.lock().unwrap().push(*reason));
        let mut reader = MessageReader::with_reassembler(right, reassembler);

        let broken = packetize(&"b".repeat(60), 20).unwrap();
        left.write_packet(&broken.packets[0]).unwrap();
        left.write_packet(&broken.packets[2]).unwrap();
        left.write_packet(&broken.packets[3]).unwrap();
        for packet in packetize("intact", 20).unwrap().packets {
            left.write_packet(&packet).unwrap();
        }

        assert_eq!(reader.read_message().unwrap(), "intact");
        assert_eq!(
            *seen.lock().unwrap(),
            vec![DiscardReason::SequenceMismatch {
                expected: 1,
                found: 2
            }]
        );
    }

    #[test]
    fn reset_drops_partial_message() {
        let (mut left, right) = MemoryLink::pair(DEFAULT_MTU);
        let mut reader = MessageReader::new(right);

        let start = [encode_header(PacketType::Start, 0), 0, 0, 0, 8, b'p', b'a'];
        left.write_packet(&start).unwrap();
        left.write_packet(&[encode_header(PacketType::Single, 0), b'x']).unwrap();
        assert_eq!(reader.read_message().unwrap(), "x");
        assert_eq!(reader.reassembler().buffered_len(), Some(2));

        reader.reset();
        assert!(reader.reassembler().is_idle());
    }

    #[test]
    fn closed_link_ends_reading() {
        let (left, right) = MemoryLink::pair(DEFAULT_MTU);
        let mut writer = MessageWriter::new(left);
        let mut reader = MessageReader::new(right);

        writer.send(&"partial ".repeat(10)).unwrap();
        drop(writer);

        // the whole message was queued before the drop
        assert!(reader.read_message().is_ok());
        assert!(matches!(
            reader.read_message(),
            Err(FrameError::Link(LinkError::Closed))
        ));
    }

    #[test]
    fn read_timeout_propagates() {
        let (_left, mut right) = MemoryLink::pair(DEFAULT_MTU);
        right.set_read_timeout(Some(Duration::from_millis(10)));
        let mut reader = MessageReader::new(right);

        assert!(matches!(
            reader.read_message(),
            Err(FrameError::Link(LinkError::Timeout(_)))
        ));
    }

    #[test]
    fn reader_and_writer_on_separate_threads() {
        let (left, right) = MemoryLink::pair(185);
        let mut writer = MessageWriter::new(left);
        let mut reader = MessageReader::new(right);

        let reader_thread = std::thread::spawn(move || {
            (0..16)
                .map(|_| reader.read_message().unwrap())
                .collect::<Vec<_>>()
        });

        let expected: Vec<String> = (0..16).map(|i| format!("msg-{i}-").repeat(i * 10)).collect();
        for message in &expected {
            writer.send(message).unwrap();
        }

        assert_eq!(reader_thread.join().unwrap(), expected);
    }

    #[cfg(unix)]
    #[test]
    fn round_trip_over_datagram_link() {
        let (left, right) = blerpc_link::UnixDatagramLink::pair(DEFAULT_MTU).unwrap();
        let mut writer = MessageWriter::new(left);
        let mut reader = MessageReader::new(right);

        let message = "datagram ".repeat(30);
        writer.send(&message).unwrap();
        assert_eq!(reader.read_message().unwrap(), message);
    }

    #[cfg(unix)]
    #[test]
    fn dropped_datagram_peer_ends_reading() {
        let (left, right) = blerpc_link::UnixDatagramLink::pair(DEFAULT_MTU).unwrap();
        let mut writer = MessageWriter::new(left);
        let mut reader = MessageReader::new(right);

        writer.send(&"tail ".repeat(12)).unwrap();
        drop(writer);

        assert_eq!(reader.read_message().unwrap(), "tail ".repeat(12));
        assert!(matches!(
            reader.read_message(),
            Err(FrameError::Link(LinkError::Closed))
        ));
    }
}
