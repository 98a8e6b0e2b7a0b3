use blerpc_link::AsyncLink;
use tracing::debug;

use crate::config::FrameConfig;
use crate::error::Result;
use crate::fragmenter::packetize;
use crate::reassembler::Reassembler;

/// Async counterpart of [`write_message`](crate::write_message).
pub async fn write_message_async<L: AsyncLink + Send>(
    link: &mut L,
    config: &FrameConfig,
    message: &str,
) -> Result<usize> {
    let mtu = link.mtu();
    let max_payload = config.max_payload(mtu);
    let packetized = packetize(message, max_payload)?;

    for packet in &packetized.packets {
        link.write_packet(packet).await?;
    }

    debug!(len = message.len(), mtu, packets = packetized.len(), "message sent");
    Ok(packetized.len())
}

/// Async counterpart of [`read_message`](crate::read_message).
pub async fn read_message_async<L: AsyncLink + Send>(
    link: &mut L,
    reassembler: &mut Reassembler,
) -> Result<String> {
    loop {
        let packet = link.read_packet().await?;
        if let Some(message) = reassembler.feed(&packet) {
            return Ok(message);
        }
    }
}
