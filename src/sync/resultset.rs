use crate::constant::ServerStatusFlags;
use crate::error::{Error, Result};
use crate::protocol::command::ColumnDefinition;
use crate::protocol::response::{ERR_HEADER, ErrPayloadBytes, is_row_terminator, terminator_status};
use crate::rows::RowStream;
use crate::sync::conn::{Conn, Pending};
use crate::sync::stream::Transport;

/// The row stream of one query, read straight from its connection
pub struct ResultSet<'c, T: Transport> {
    conn: &'c mut Conn<T>,
    columns: Vec<ColumnDefinition>,
    finished: bool,
}

impl<'c, T: Transport> ResultSet<'c, T> {
    pub(crate) fn new(conn: &'c mut Conn<T>, columns: Vec<ColumnDefinition>) -> Self {
        Self {
            conn,
            columns,
            finished: false,
        }
    }

    /// A statement without a result set: no columns, no rows
    pub(crate) fn empty(conn: &'c mut Conn<T>) -> Self {
        Self {
            conn,
            columns: Vec::new(),
            finished: true,
        }
    }

    fn fail(&mut self, err: Error) -> Result<bool> {
        self.finished = true;
        if err.is_conn_broken() {
            self.conn.invalidate(&err);
        } else {
            // the server ends the result set with its error
            self.conn.pending = Pending::None;
        }
        Err(err)
    }
}

impl<T: Transport> RowStream for ResultSet<'_, T> {
    fn columns(&self) -> &[ColumnDefinition] {
        &self.columns
    }

    fn next_row(&mut self, buffer: &mut Vec<u8>) -> Result<bool> {
        if self.finished {
            return Ok(false);
        }

        if let Err(err) = self.conn.transport.read_packet(buffer) {
            return self.fail(err);
        }

        if buffer.first() == Some(&ERR_HEADER) {
            let err = Error::from(ErrPayloadBytes(buffer));
            return self.fail(err);
        }

        if is_row_terminator(buffer) {
            let status = match terminator_status(buffer, self.conn.capability_flags()) {
                Ok(status) => status,
                Err(err) => return self.fail(err),
            };
            self.finished = true;
            self.conn.pending =
                if status.contains(ServerStatusFlags::SERVER_MORE_RESULTS_EXISTS) {
                    Pending::NextResult
                } else {
                    Pending::None
                };
            tracing::debug!("result set ended");
            return Ok(false);
        }

        Ok(true)
    }
}
