//! Sequential row cursor over a text protocol result set.
//!
//! ```ignore
//! let mut rows = conn.query("SELECT id, name FROM dogs")?;
//! while rows.next_row() {
//!     let id = rows.i64();
//!     let name = rows.string();
//! }
//! if let Some(err) = rows.last_error() {
//!     // a read or a coercion failed somewhere in the iteration
//! }
//! ```

use std::collections::{HashMap, VecDeque};
use std::ops::Range;

use auto_impl::auto_impl;

use crate::error::{Error, Result};
use crate::protocol::TextRowPayload;
use crate::protocol::command::ColumnDefinition;
use crate::value::FromText;

/// A single-pass source of raw row payloads with a fixed set of columns
#[auto_impl(&mut, Box)]
pub trait RowStream {
    fn columns(&self) -> &[ColumnDefinition];

    /// Read the next row payload into `buffer`.
    ///
    /// Returns `Ok(false)` once the stream is exhausted. An `Err` means the stream is
    /// broken and must not be polled again.
    fn next_row(&mut self, buffer: &mut Vec<u8>) -> Result<bool>;
}

/// Rows already held in memory
#[derive(Debug, Clone, Default)]
pub struct BufferedResultSet {
    columns: Vec<ColumnDefinition>,
    rows: VecDeque<Vec<u8>>,
}

impl BufferedResultSet {
    pub fn new(columns: Vec<ColumnDefinition>) -> Self {
        Self {
            columns,
            rows: VecDeque::new(),
        }
    }

    /// Append one text protocol row payload
    pub fn push_row(&mut self, payload: Vec<u8>) {
        self.rows.push_back(payload);
    }
}

impl RowStream for BufferedResultSet {
    fn columns(&self) -> &[ColumnDefinition] {
        &self.columns
    }

    fn next_row(&mut self, buffer: &mut Vec<u8>) -> Result<bool> {
        match self.rows.pop_front() {
            Some(row) => {
                *buffer = row;
                Ok(true)
            }
            None => Ok(false),
        }
    }
}

#[derive(Debug, Clone)]
struct ColumnValue {
    row: u64,
    range: Range<usize>,
    null: bool,
}

/// Cursor over the rows of one result set.
///
/// Call [`next_row`](Self::next_row) before reading the first row and keep calling it
/// until it returns `false`. Within a row, every accessor consumes the next column
/// value in the order the server sent them. Failures do not interrupt the iteration;
/// check [`last_error`](Self::last_error) once the rows are drained.
pub struct Rows<S> {
    stream: S,
    packet: Vec<u8>,
    offset: usize,
    read_columns: usize,
    row: u64,
    eof: bool,

    err_read: Option<Error>,
    err_parse: Option<Error>,

    columns: HashMap<String, ColumnValue>,
}

impl<S: RowStream> Rows<S> {
    pub fn new(stream: S) -> Self {
        let num_columns = stream.columns().len();
        Self {
            stream,
            packet: Vec::new(),
            offset: 0,
            // nothing to read before the first row
            read_columns: num_columns,
            row: 0,
            eof: false,
            err_read: None,
            err_parse: None,
            columns: HashMap::with_capacity(num_columns),
        }
    }

    /// Column descriptors in server order
    pub fn columns(&self) -> &[ColumnDefinition] {
        self.stream.columns()
    }

    /// Whether the stream signaled its end
    pub fn is_exhausted(&self) -> bool {
        self.eof
    }

    /// Move the cursor to the next row.
    ///
    /// Returns `false` when no rows are left or reading the stream failed; both states
    /// are final.
    pub fn next_row(&mut self) -> bool {
        if self.eof || self.err_read.is_some() {
            return false;
        }

        match self.stream.next_row(&mut self.packet) {
            Ok(true) => {
                self.offset = 0;
                self.read_columns = 0;
                self.row += 1;
                true
            }
            Ok(false) => {
                self.eof = true;
                self.leave_row();
                false
            }
            Err(err) => {
                tracing::debug!(error = %err, "row stream broken");
                self.err_read = Some(err);
                self.leave_row();
                false
            }
        }
    }

    /// Next column value as raw bytes and a NULL indicator.
    ///
    /// All other accessors are based on this one. Once every column of the row has
    /// been read, it keeps returning an empty NULL value.
    pub fn null_bytes(&mut self) -> (&[u8], bool) {
        match self.read_next() {
            Some(range) => (&self.packet[range], false),
            None => (&[][..], true),
        }
    }

    /// Next column value as raw bytes. NULL is an empty slice.
    pub fn bytes(&mut self) -> &[u8] {
        self.null_bytes().0
    }

    /// Next column value coerced into `T`, with a NULL indicator.
    ///
    /// NULL yields `(T::default(), true)` without attempting a coercion. A failed
    /// coercion yields `(T::default(), false)` and is remembered for
    /// [`last_error`](Self::last_error).
    pub fn null_value<T: FromText>(&mut self) -> (T, bool) {
        let Some(range) = self.read_next() else {
            return (T::default(), true);
        };

        match T::from_text(&self.packet[range]) {
            Ok(value) => (value, false),
            Err(err) => {
                tracing::warn!(column = self.read_columns - 1, error = %err, "column value coercion failed");
                self.err_parse = Some(err);
                (T::default(), false)
            }
        }
    }

    /// Next column value coerced into `T`. NULL and failed coercions are `T::default()`.
    pub fn value<T: FromText>(&mut self) -> T {
        self.null_value().0
    }

    pub fn null_string(&mut self) -> (String, bool) {
        self.null_value()
    }

    /// NULL is an empty string.
    pub fn string(&mut self) -> String {
        self.value()
    }

    pub fn null_i8(&mut self) -> (i8, bool) {
        self.null_value()
    }

    pub fn i8(&mut self) -> i8 {
        self.value()
    }

    pub fn null_i16(&mut self) -> (i16, bool) {
        self.null_value()
    }

    pub fn i16(&mut self) -> i16 {
        self.value()
    }

    pub fn null_i32(&mut self) -> (i32, bool) {
        self.null_value()
    }

    pub fn i32(&mut self) -> i32 {
        self.value()
    }

    pub fn null_i64(&mut self) -> (i64, bool) {
        self.null_value()
    }

    pub fn i64(&mut self) -> i64 {
        self.value()
    }

    pub fn null_f32(&mut self) -> (f32, bool) {
        self.null_value()
    }

    pub fn f32(&mut self) -> f32 {
        self.value()
    }

    pub fn null_f64(&mut self) -> (f64, bool) {
        self.null_value()
    }

    pub fn f64(&mut self) -> f64 {
        self.value()
    }

    pub fn null_bool(&mut self) -> (bool, bool) {
        self.null_value()
    }

    /// NULL is `false`.
    pub fn bool(&mut self) -> bool {
        self.value()
    }

    /// Value already read from the current row under `name`.
    ///
    /// When several columns share a name, the one read last wins.
    pub fn decoded(&self, name: &str) -> Option<(&[u8], bool)> {
        let value = self.columns.get(name).filter(|value| value.row == self.row)?;
        let bytes = self.packet.get(value.range.clone())?;
        Some((bytes, value.null))
    }

    /// The failure that ended or tainted the iteration.
    ///
    /// A stream failure takes priority over a coercion failure. Call this after
    /// [`next_row`](Self::next_row) returned `false`.
    pub fn last_error(&self) -> Option<&Error> {
        self.err_read.as_ref().or(self.err_parse.as_ref())
    }

    /// Consume the cursor and return [`last_error`](Self::last_error) by value
    pub fn into_error(self) -> Option<Error> {
        self.err_read.or(self.err_parse)
    }

    /// The packet buffer may hold a terminator now; every further read is NULL.
    fn leave_row(&mut self) {
        self.read_columns = self.stream.columns().len();
        self.row += 1;
    }

    /// Decode the next value of the current row; `None` is NULL.
    fn read_next(&mut self) -> Option<Range<usize>> {
        let column = self.stream.columns().get(self.read_columns)?;

        let (range, offset) = match TextRowPayload(&self.packet).read_value(self.offset) {
            Ok(decoded) => decoded,
            Err(err) => {
                // the rest of this row cannot be located
                tracing::warn!(column = self.read_columns, error = %err, "malformed row payload");
                self.err_parse = Some(err);
                self.read_columns = self.stream.columns().len();
                return None;
            }
        };

        self.offset = offset;
        let value = ColumnValue {
            row: self.row,
            range: range.clone().unwrap_or(offset..offset),
            null: range.is_none(),
        };
        // keys survive across rows; the row number tells stale entries apart
        match self.columns.get_mut(column.name.as_str()) {
            Some(slot) => *slot = value,
            None => {
                self.columns.insert(column.name.clone(), value);
            }
        }
        self.read_columns += 1;
        range
    }
}
