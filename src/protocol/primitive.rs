use crate::error::{Error, Result};
use zerocopy::FromBytes;
use zerocopy::byteorder::little_endian::{U16 as U16LE, U64 as U64LE};

/// Read 1-byte integer
pub fn read_int_1(data: &[u8]) -> Result<(u8, &[u8])> {
    match data.split_first() {
        Some((&value, rest)) => Ok((value, rest)),
        None => Err(Error::UnexpectedEof),
    }
}

/// Read 2-byte little-endian integer
pub fn read_int_2(data: &[u8]) -> Result<(u16, &[u8])> {
    if data.len() < 2 {
        return Err(Error::UnexpectedEof);
    }
    let (bytes, rest) = data.split_at(2);
    let value = U16LE::ref_from_bytes(bytes)
        .map_err(|_| Error::InvalidPacket)?
        .get();
    Ok((value, rest))
}

/// Read 3-byte little-endian integer
pub fn read_int_3(data: &[u8]) -> Result<(u32, &[u8])> {
    if data.len() < 3 {
        return Err(Error::UnexpectedEof);
    }
    let (bytes, rest) = data.split_at(3);
    let value = u32::from_le_bytes([bytes[0], bytes[1], bytes[2], 0]);
    Ok((value, rest))
}

/// Read 8-byte little-endian integer
pub fn read_int_8(data: &[u8]) -> Result<(u64, &[u8])> {
    if data.len() < 8 {
        return Err(Error::UnexpectedEof);
    }
    let (bytes, rest) = data.split_at(8);
    let value = U64LE::ref_from_bytes(bytes)
        .map_err(|_| Error::InvalidPacket)?
        .get();
    Ok((value, rest))
}

/// Read length-encoded integer
///
/// 0xFB (NULL in a row) and 0xFF are not valid integer prefixes here.
pub fn read_int_lenenc(data: &[u8]) -> Result<(u64, &[u8])> {
    let (first, rest) = read_int_1(data)?;
    match first {
        0xFC => {
            let (val, rest) = read_int_2(rest)?;
            Ok((u64::from(val), rest))
        }
        0xFD => {
            let (val, rest) = read_int_3(rest)?;
            Ok((u64::from(val), rest))
        }
        0xFE => read_int_8(rest),
        0xFB | 0xFF => Err(Error::InvalidPacket),
        val => Ok((u64::from(val), rest)),
    }
}

/// Read fixed-length string
pub fn read_string_fix(data: &[u8], len: usize) -> Result<(&[u8], &[u8])> {
    if data.len() < len {
        return Err(Error::UnexpectedEof);
    }
    Ok(data.split_at(len))
}

/// Read length-encoded string
pub fn read_string_lenenc(data: &[u8]) -> Result<(&[u8], &[u8])> {
    let (len, rest) = read_int_lenenc(data)?;
    let len = usize::try_from(len).map_err(|_| Error::InvalidPacket)?;
    read_string_fix(rest, len)
}

/// Write 1-byte integer
pub fn write_int_1(out: &mut Vec<u8>, value: u8) {
    out.push(value);
}

/// Write 2-byte little-endian integer
pub fn write_int_2(out: &mut Vec<u8>, value: u16) {
    out.extend_from_slice(&value.to_le_bytes());
}

/// Write 3-byte little-endian integer
pub fn write_int_3(out: &mut Vec<u8>, value: u32) {
    out.extend_from_slice(&value.to_le_bytes()[..3]);
}

/// Write 4-byte little-endian integer
pub fn write_int_4(out: &mut Vec<u8>, value: u32) {
    out.extend_from_slice(&value.to_le_bytes());
}

/// Write 8-byte little-endian integer
pub fn write_int_8(out: &mut Vec<u8>, value: u64) {
    out.extend_from_slice(&value.to_le_bytes());
}

/// Write length-encoded integer
pub fn write_int_lenenc(out: &mut Vec<u8>, value: u64) {
    if value < 251 {
        out.push(value as u8);
    } else if value < (1 << 16) {
        out.push(0xfc);
        write_int_2(out, value as u16);
    } else if value < (1 << 24) {
        out.push(0xfd);
        write_int_3(out, value as u32);
    } else {
        out.push(0xfe);
        write_int_8(out, value);
    }
}

/// Write length-encoded bytes
pub fn write_bytes_lenenc(out: &mut Vec<u8>, data: &[u8]) {
    write_int_lenenc(out, data.len() as u64);
    out.extend_from_slice(data);
}

/// Write length-encoded string
pub fn write_string_lenenc(out: &mut Vec<u8>, s: &str) {
    write_bytes_lenenc(out, s.as_bytes());
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn lenenc_integer_widths() {
        for value in [0_u64, 250, 251, 65_535, 65_536, 16_777_215, 16_777_216] {
            let mut out = Vec::new();
            write_int_lenenc(&mut out, value);
            let (decoded, rest) = read_int_lenenc(&out).unwrap();
            assert_eq!(decoded, value);
            assert!(rest.is_empty());
        }
    }

    #[test]
    fn lenenc_rejects_null_marker() {
        assert!(matches!(read_int_lenenc(&[0xFB]), Err(Error::InvalidPacket)));
    }

    #[test]
    fn truncated_lenenc_string() {
        // claims 5 bytes, carries 2
        assert!(matches!(
            read_string_lenenc(&[5, b'a', b'b']),
            Err(Error::UnexpectedEof)
        ));
    }

    #[test]
    fn empty_input() {
        assert!(matches!(read_int_1(&[]), Err(Error::UnexpectedEof)));
        assert!(matches!(read_int_lenenc(&[]), Err(Error::UnexpectedEof)));
    }
}
