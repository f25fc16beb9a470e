//! A sequential row cursor and command dispatcher for the MySQL text protocol.
//!
//! [`sync::Conn::query`] returns a [`Rows`] cursor that reads one row at a time and
//! coerces column values on demand. [`sync::Conn::exec`] runs statements that only
//! acknowledge with affected rows and a last insert id.

mod buffer;
pub mod constant;
pub mod error;
mod opts;
pub mod protocol;
pub mod rows;
pub mod sync;
pub mod value;

pub use opts::Opts;
pub use rows::{BufferedResultSet, RowStream, Rows};

#[cfg(test)]
mod value_test;
