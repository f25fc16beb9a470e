use crate::constant::{CapabilityFlags, ServerStatusFlags};
use crate::error::{Error, Result};
use crate::protocol::packet::MAX_PACKET_PAYLOAD;
use crate::protocol::primitive::*;
use zerocopy::byteorder::little_endian::U16 as U16LE;
use zerocopy::{FromBytes, Immutable, KnownLayout};

pub const OK_HEADER: u8 = 0x00;
pub const EOF_HEADER: u8 = 0xFE;
pub const ERR_HEADER: u8 = 0xFF;
pub const LOCAL_INFILE_HEADER: u8 = 0xFB;

/// Packet type detection
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PacketType {
    Ok,
    Err,
    Eof,
    ResultSet,
}

/// Detect packet type from the first byte
pub fn detect_packet_type(payload: &[u8]) -> Result<PacketType> {
    match payload.first() {
        None => Err(Error::InvalidPacket),
        Some(&ERR_HEADER) => Ok(PacketType::Err),
        Some(&EOF_HEADER) if payload.len() < 9 => Ok(PacketType::Eof),
        Some(&OK_HEADER) => Ok(PacketType::Ok),
        Some(_) => Ok(PacketType::ResultSet),
    }
}

/// Whether a packet read in the row phase terminates the result set.
///
/// A row can only start with 0xFE when its first value is at least 2^24 bytes long,
/// which forces the payload to the maximum packet size. The terminator is always shorter.
pub fn is_row_terminator(payload: &[u8]) -> bool {
    payload.first() == Some(&EOF_HEADER) && payload.len() < MAX_PACKET_PAYLOAD
}

/// OK packet payload bytes
///
/// Layout: 0x00 (or 0xFE as a result set terminator) followed by variable-length fields:
/// - affected_rows: length-encoded integer
/// - last_insert_id: length-encoded integer
/// - status_flags: 2 bytes
/// - warnings: 2 bytes
/// - info: variable-length string
#[derive(Debug, Clone, Copy)]
pub struct OkPayloadBytes<'a>(pub &'a [u8]);

impl<'a> OkPayloadBytes<'a> {
    pub fn bytes(&self) -> &'a [u8] {
        self.0
    }
}

#[derive(Debug, Clone, Copy)]
pub struct ErrPayloadBytes<'a>(pub &'a [u8]);

/// Acknowledgement of a command that produced no rows
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct OkPayload {
    pub affected_rows: u64,
    pub last_insert_id: u64,
    pub status_flags: ServerStatusFlags,
    pub warnings: u16,
    pub info: String,
}

impl OkPayload {
    /// Decode an OK payload according to the negotiated capabilities
    pub fn parse(bytes: OkPayloadBytes<'_>, capabilities: CapabilityFlags) -> Result<Self> {
        let (header, data) = read_int_1(bytes.bytes())?;
        if header != OK_HEADER && header != EOF_HEADER {
            return Err(Error::InvalidPacket);
        }

        let (affected_rows, rest) = read_int_lenenc(data)?;
        let (last_insert_id, mut rest) = read_int_lenenc(rest)?;

        let mut status_flags = 0;
        let mut warnings = 0;
        if capabilities.contains(CapabilityFlags::CLIENT_PROTOCOL_41) {
            let (flags, data) = read_int_2(rest)?;
            let (count, data) = read_int_2(data)?;
            status_flags = flags;
            warnings = count;
            rest = data;
        } else if capabilities.contains(CapabilityFlags::CLIENT_TRANSACTIONS) {
            let (flags, data) = read_int_2(rest)?;
            status_flags = flags;
            rest = data;
        }

        let info = if capabilities.contains(CapabilityFlags::CLIENT_SESSION_TRACK) {
            if rest.is_empty() {
                &[][..]
            } else {
                read_string_lenenc(rest)?.0
            }
        } else {
            rest
        };

        Ok(OkPayload {
            affected_rows,
            last_insert_id,
            status_flags: ServerStatusFlags::from_bits_truncate(status_flags),
            warnings,
            info: String::from_utf8_lossy(info).into_owned(),
        })
    }
}

/// ERR packet response
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("ERROR {} ({}): {}", self.error_code, self.sql_state, self.message)]
pub struct ErrPayload {
    pub error_code: u16,
    pub sql_state: String,
    pub message: String,
}

impl TryFrom<ErrPayloadBytes<'_>> for ErrPayload {
    type Error = Error;

    fn try_from(bytes: ErrPayloadBytes<'_>) -> Result<Self> {
        let (header, data) = read_int_1(bytes.0)?;
        if header != ERR_HEADER {
            return Err(Error::InvalidPacket);
        }

        let (error_code, data) = read_int_2(data)?;

        // SQL state marker '#' is present with CLIENT_PROTOCOL_41
        let (sql_state, rest) = match data.split_first() {
            Some((&b'#', state)) => {
                let (state_bytes, rest) = read_string_fix(state, 5)?;
                (String::from_utf8_lossy(state_bytes).into_owned(), rest)
            }
            _ => (String::new(), data),
        };

        Ok(ErrPayload {
            error_code,
            sql_state,
            message: String::from_utf8_lossy(rest).into_owned(),
        })
    }
}

/// Decode an ERR payload into the error to hand back to the caller.
///
/// A payload that cannot be decoded turns into the decoding error itself.
impl From<ErrPayloadBytes<'_>> for Error {
    fn from(value: ErrPayloadBytes<'_>) -> Self {
        match ErrPayload::try_from(value) {
            Ok(err_payload) => Error::ServerError(err_payload),
            Err(err) => err,
        }
    }
}

/// EOF packet response (zero-copy)
///
/// Layout matches MySQL wire protocol after header byte 0xFE:
/// - warnings: 2 bytes (little-endian)
/// - status_flags: 2 bytes (little-endian)
#[repr(C, packed)]
#[derive(Debug, Clone, Copy, FromBytes, KnownLayout, Immutable)]
pub struct EofPacket {
    pub warnings: U16LE,
    pub status_flags: U16LE,
}

impl EofPacket {
    pub fn status_flags(&self) -> ServerStatusFlags {
        ServerStatusFlags::from_bits_truncate(self.status_flags.get())
    }
}

/// Read EOF packet (header byte 0xFE, length < 9) - zero-copy
pub fn read_eof_packet(payload: &[u8]) -> Result<&EofPacket> {
    let (header, data) = read_int_1(payload)?;
    if header != EOF_HEADER {
        return Err(Error::InvalidPacket);
    }
    let (bytes, _rest) = read_string_fix(data, 4)?;
    EofPacket::ref_from_bytes(bytes).map_err(|_| Error::InvalidPacket)
}

/// Status flags of a result set terminator.
///
/// With `CLIENT_DEPRECATE_EOF` the terminator is an OK packet with a 0xFE header,
/// otherwise it is a classic EOF packet.
pub fn terminator_status(payload: &[u8], capabilities: CapabilityFlags) -> Result<ServerStatusFlags> {
    if capabilities.contains(CapabilityFlags::CLIENT_DEPRECATE_EOF) {
        Ok(OkPayload::parse(OkPayloadBytes(payload), capabilities)?.status_flags)
    } else {
        Ok(read_eof_packet(payload)?.status_flags())
    }
}
