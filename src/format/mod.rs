//! Compressed packet input
//!
//! Containers are outside this crate; packets arrive already demuxed.

pub mod packet;

pub use packet::{Packet, PacketFlags};

/// Split a raw elementary stream into fixed-size packets.
///
/// A `packet_size` of zero yields the whole input as one packet. Packet
/// timestamps count packets from zero.
pub fn split_packets(data: &[u8], packet_size: usize) -> Vec<Packet> {
    if data.is_empty() {
        return Vec::new();
    }
    if packet_size == 0 {
        return vec![Packet::from_slice(data, 0)];
    }
    data.chunks(packet_size)
        .enumerate()
        .map(|(i, chunk)| Packet::from_slice(chunk, i as i64))
        .collect()
}
