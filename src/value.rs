//! Text-to-value coercion for the row cursor.
//!
//! The text protocol sends every non-NULL value as its textual representation, so
//! each typed accessor of [`Rows`](crate::rows::Rows) is one `FromText` conversion.

use std::num::ParseFloatError;
use std::str::FromStr;

use simdutf8::basic::from_utf8;

use crate::error::{Error, Result};

/// Types a text protocol column value can be coerced into.
///
/// `Default` is the zero value the cursor hands out for NULL and for failed coercions.
pub trait FromText: Sized + Default {
    fn from_text(bytes: &[u8]) -> Result<Self>;
}

impl FromText for Vec<u8> {
    fn from_text(bytes: &[u8]) -> Result<Self> {
        Ok(bytes.to_vec())
    }
}

impl FromText for String {
    fn from_text(bytes: &[u8]) -> Result<Self> {
        Ok(from_utf8(bytes)?.to_owned())
    }
}

impl FromText for i8 {
    fn from_text(bytes: &[u8]) -> Result<Self> {
        Ok(from_utf8(bytes)?.parse()?)
    }
}

impl FromText for i16 {
    fn from_text(bytes: &[u8]) -> Result<Self> {
        Ok(from_utf8(bytes)?.parse()?)
    }
}

impl FromText for i32 {
    fn from_text(bytes: &[u8]) -> Result<Self> {
        Ok(from_utf8(bytes)?.parse()?)
    }
}

impl FromText for i64 {
    fn from_text(bytes: &[u8]) -> Result<Self> {
        Ok(from_utf8(bytes)?.parse()?)
    }
}

/// `str::parse` saturates to infinity; only a spelled-out infinity may produce one.
fn parse_float<F>(bytes: &[u8]) -> Result<F>
where
    F: FromStr<Err = ParseFloatError> + Into<f64> + Copy,
{
    let text = from_utf8(bytes)?;
    let value: F = text.parse()?;
    if value.into().is_infinite() {
        let unsigned = text.strip_prefix(['+', '-']).unwrap_or(text);
        if !unsigned.eq_ignore_ascii_case("inf") && !unsigned.eq_ignore_ascii_case("infinity") {
            return Err(Error::FloatOutOfRange(text.to_owned()));
        }
    }
    Ok(value)
}

impl FromText for f32 {
    fn from_text(bytes: &[u8]) -> Result<Self> {
        parse_float(bytes)
    }
}

impl FromText for f64 {
    fn from_text(bytes: &[u8]) -> Result<Self> {
        parse_float(bytes)
    }
}

/// Accepts `1`/`true` and `0`/`false`, case-sensitive.
impl FromText for bool {
    fn from_text(bytes: &[u8]) -> Result<Self> {
        match bytes {
            b"1" | b"true" => Ok(true),
            b"0" | b"false" => Ok(false),
            _ => Err(Error::ParseBoolError(
                String::from_utf8_lossy(bytes).into_owned(),
            )),
        }
    }
}
