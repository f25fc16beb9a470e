use crate::constant::{ColumnFlags, ColumnType};
use crate::error::{Error, Result, eyre};
use crate::protocol::primitive::*;
use zerocopy::byteorder::little_endian::{U16 as U16LE, U32 as U32LE};
use zerocopy::{FromBytes, FromZeros, Immutable, KnownLayout};

/// Represents a payload part of a column definition packet
#[derive(Debug, Clone, Copy)]
pub struct ColumnDefinitionBytes<'a>(pub &'a [u8]);

/// Fixed-size tail of Column Definition packet (12 bytes)
#[repr(C, packed)]
#[derive(Debug, Clone, Copy, FromBytes, KnownLayout, Immutable)]
pub struct ColumnDefinitionTail {
    charset: U16LE,
    column_length: U32LE,
    column_type: u8,
    flags: U16LE,
    decimals: u8,
    reserved: U16LE,
}

impl ColumnDefinitionTail {
    pub fn charset(&self) -> u16 {
        self.charset.get()
    }

    pub fn column_length(&self) -> u32 {
        self.column_length.get()
    }

    pub fn column_type(&self) -> Result<ColumnType> {
        ColumnType::from_u8(self.column_type).ok_or_else(|| {
            Error::LibraryBug(eyre!("unknown column type: 0x{:02X}", self.column_type))
        })
    }

    pub fn flags(&self) -> ColumnFlags {
        ColumnFlags::from_bits_truncate(self.flags.get())
    }

    pub fn decimals(&self) -> u8 {
        self.decimals
    }
}

/// Column descriptor of a result set, owned so that it outlives the packet buffer
#[derive(Debug, Clone)]
pub struct ColumnDefinition {
    pub schema: String,
    pub table: String,
    pub org_table: String,
    /// Column name or alias as the client sees it
    pub name: String,
    pub org_name: String,
    pub tail: ColumnDefinitionTail,
}

impl ColumnDefinition {
    /// A bare descriptor with only a name, for result sets built in memory
    pub fn named(name: impl Into<String>) -> Self {
        Self {
            schema: String::new(),
            table: String::new(),
            org_table: String::new(),
            name: name.into(),
            org_name: String::new(),
            tail: ColumnDefinitionTail::new_zeroed(),
        }
    }
}

fn lossy(bytes: &[u8]) -> String {
    String::from_utf8_lossy(bytes).into_owned()
}

impl TryFrom<ColumnDefinitionBytes<'_>> for ColumnDefinition {
    type Error = Error;

    fn try_from(bytes: ColumnDefinitionBytes<'_>) -> Result<Self> {
        let data = bytes.0;

        let (_catalog, data) = read_string_lenenc(data)?;
        let (schema, data) = read_string_lenenc(data)?;
        let (table, data) = read_string_lenenc(data)?;
        let (org_table, data) = read_string_lenenc(data)?;
        let (name, data) = read_string_lenenc(data)?;
        let (org_name, data) = read_string_lenenc(data)?;

        // length of the fixed fields is always 0x0c
        let (_length, data) = read_int_lenenc(data)?;
        let (tail_bytes, _default_values) = read_string_fix(data, 12)?;
        let tail = ColumnDefinitionTail::read_from_bytes(tail_bytes)
            .map_err(|_| Error::InvalidPacket)?;

        Ok(Self {
            schema: lossy(schema),
            table: lossy(table),
            org_table: lossy(org_table),
            name: lossy(name),
            org_name: lossy(org_name),
            tail,
        })
    }
}
