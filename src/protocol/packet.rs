use std::io::{BufRead, Write};

use zerocopy::{FromBytes, FromZeros, Immutable, IntoBytes, KnownLayout};

use crate::error::{Error, Result};

/// Largest payload a single packet can carry. Longer payloads are split.
pub const MAX_PACKET_PAYLOAD: usize = 0xFF_FFFF;

/// MySQL packet header (zero-copy)
///
/// Layout matches MySQL wire protocol:
/// - length: 3 bytes (little-endian, payload length)
/// - sequence_id: 1 byte
#[repr(C, packed)]
#[derive(Debug, Clone, Copy, FromBytes, KnownLayout, Immutable, IntoBytes)]
pub struct PacketHeader {
    pub length: [u8; 3],
    pub sequence_id: u8,
}

impl PacketHeader {
    pub fn encode(length: usize, sequence_id: u8) -> Self {
        let len = u32::to_le_bytes(length as u32);
        Self {
            length: [len[0], len[1], len[2]],
            sequence_id,
        }
    }

    pub fn length(&self) -> usize {
        u32::from_le_bytes([self.length[0], self.length[1], self.length[2], 0]) as usize
    }

    pub fn from_bytes(data: &[u8]) -> Result<&Self> {
        if data.len() < 4 {
            return Err(Error::UnexpectedEof);
        }
        Self::ref_from_bytes(&data[..4]).map_err(|_| Error::InvalidPacket)
    }
}

/// Read a complete payload, concatenating packets if they span multiple 16MB chunks.
/// Returns the sequence_id of the last packet read.
#[tracing::instrument(skip_all)]
pub fn read_payload<R: BufRead>(reader: &mut R, buffer: &mut Vec<u8>) -> Result<u8> {
    buffer.clear();

    let mut header = PacketHeader::new_zeroed();
    let mut current_length = MAX_PACKET_PAYLOAD;
    let mut sequence_id = 0;

    while current_length == MAX_PACKET_PAYLOAD {
        reader.read_exact(header.as_mut_bytes())?;
        current_length = header.length();
        sequence_id = header.sequence_id;

        let start = buffer.len();
        buffer.resize(start + current_length, 0);
        reader.read_exact(&mut buffer[start..])?;
    }

    tracing::trace!(len = buffer.len(), sequence_id, "read payload");
    Ok(sequence_id)
}

/// Write one command payload starting at sequence id 0.
///
/// `packet` holds 4 reserved header bytes followed by the payload. The common case
/// (payload below 16MB) fills the reserved bytes in place and issues a single write.
#[tracing::instrument(skip_all)]
pub fn write_payload<W: Write>(writer: &mut W, packet: &mut [u8]) -> Result<()> {
    if packet.len() < 4 {
        return Err(Error::LibraryBug(crate::error::eyre!(
            "write buffer lost its reserved header: {} < 4",
            packet.len()
        )));
    }
    let payload_len = packet.len() - 4;

    if payload_len < MAX_PACKET_PAYLOAD {
        let header = PacketHeader::encode(payload_len, 0);
        packet[..4].copy_from_slice(header.as_bytes());
        writer.write_all(packet)?;
    } else {
        let mut sequence_id = 0_u8;
        let mut last_len = 0;
        for chunk in packet[4..].chunks(MAX_PACKET_PAYLOAD) {
            writer.write_all(PacketHeader::encode(chunk.len(), sequence_id).as_bytes())?;
            writer.write_all(chunk)?;
            sequence_id = sequence_id.wrapping_add(1);
            last_len = chunk.len();
        }
        // a payload that ends exactly on the boundary is terminated by an empty packet
        if last_len == MAX_PACKET_PAYLOAD {
            writer.write_all(PacketHeader::encode(0, sequence_id).as_bytes())?;
        }
    }

    writer.flush()?;
    tracing::trace!(len = payload_len, "wrote payload");
    Ok(())
}

#[cfg(test)]
mod tests {
    use std::io::Cursor;

    use super::*;

    #[test]
    fn header_encode_decode() {
        let header = PacketHeader::encode(0x01_02_03, 7);
        assert_eq!(header.as_bytes(), &[0x03, 0x02, 0x01, 7]);
        assert_eq!(header.length(), 0x01_02_03);

        let parsed = PacketHeader::from_bytes(&[5, 0, 0, 1, 0xAA]).unwrap();
        assert_eq!(parsed.length(), 5);
        assert_eq!(parsed.sequence_id, 1);
    }

    #[test]
    fn write_small_payload_fills_reserved_header() {
        let mut packet = vec![0, 0, 0, 0, 0x03, b'S'];
        let mut out = Vec::new();
        write_payload(&mut out, &mut packet).unwrap();
        assert_eq!(out, vec![2, 0, 0, 0, 0x03, b'S']);
    }

    #[test]
    fn read_single_packet() {
        let mut reader = Cursor::new(vec![3, 0, 0, 4, b'a', b'b', b'c', 9, 9]);
        let mut buffer = Vec::new();
        let seq = read_payload(&mut reader, &mut buffer).unwrap();
        assert_eq!(seq, 4);
        assert_eq!(buffer, b"abc");
    }

    #[test]
    fn read_reassembles_max_size_packets() {
        let mut wire = Vec::new();
        wire.extend_from_slice(PacketHeader::encode(MAX_PACKET_PAYLOAD, 0).as_bytes());
        wire.resize(wire.len() + MAX_PACKET_PAYLOAD, b'x');
        wire.extend_from_slice(PacketHeader::encode(2, 1).as_bytes());
        wire.extend_from_slice(b"yz");

        let mut buffer = Vec::new();
        let seq = read_payload(&mut Cursor::new(wire), &mut buffer).unwrap();
        assert_eq!(seq, 1);
        assert_eq!(buffer.len(), MAX_PACKET_PAYLOAD + 2);
        assert_eq!(&buffer[MAX_PACKET_PAYLOAD..], b"yz");
    }

    #[test]
    fn read_truncated_stream_is_io_error() {
        let mut reader = Cursor::new(vec![10, 0, 0, 0, b'a']);
        let mut buffer = Vec::new();
        assert!(matches!(
            read_payload(&mut reader, &mut buffer),
            Err(Error::IoError(_))
        ));
    }
}
