use std::ops::Range;

use crate::error::{Error, Result};
use crate::protocol::primitive::read_int_lenenc;

/// Marker byte of a NULL value in a text protocol row
pub const NULL_VALUE: u8 = 0xFB;

/// The payload part of a text protocol row packet.
///
/// Every column value is either the NULL marker or a length-encoded string.
#[derive(Debug, Clone, Copy)]
pub struct TextRowPayload<'a>(pub &'a [u8]);

impl<'a> TextRowPayload<'a> {
    /// Decode the value that starts at `offset`.
    ///
    /// Returns the byte range of the value inside the payload (`None` for NULL)
    /// and the offset of the next value.
    pub fn read_value(&self, offset: usize) -> Result<(Option<Range<usize>>, usize)> {
        let data = self.0.get(offset..).ok_or(Error::UnexpectedEof)?;
        if data.first() == Some(&NULL_VALUE) {
            return Ok((None, offset + 1));
        }

        let (len, rest) = read_int_lenenc(data)?;
        let len = usize::try_from(len).map_err(|_| Error::InvalidPacket)?;
        if rest.len() < len {
            return Err(Error::UnexpectedEof);
        }

        let start = self.0.len() - rest.len();
        Ok((Some(start..start + len), start + len))
    }

    pub fn bytes(&self) -> &'a [u8] {
        self.0
    }
}
