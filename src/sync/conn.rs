use std::io::{Read, Write};
use std::net::TcpStream;

use crate::buffer::BufferSet;
use crate::constant::{CapabilityFlags, ServerStatusFlags};
use crate::error::{Error, Result};
use crate::opts::Opts;
use crate::protocol::command::query::{
    Discard, DiscardProgress, QueryResponse, read_query_response, write_query,
};
use crate::protocol::command::utility::{write_ping, write_quit};
use crate::protocol::command::{ColumnDefinition, ColumnDefinitionBytes};
use crate::protocol::primitive::read_int_lenenc;
use crate::protocol::response::{
    ErrPayloadBytes, LOCAL_INFILE_HEADER, OkPayload, OkPayloadBytes, PacketType, detect_packet_type,
    read_eof_packet,
};
use crate::rows::Rows;
use crate::sync::resultset::ResultSet;
use crate::sync::stream::{PacketStream, Transport};

/// What an earlier command left unread on the wire
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) enum Pending {
    None,
    /// Column definitions of a result set nobody asked for
    Columns { remaining: u64 },
    /// Rows of a query whose cursor was dropped early
    Rows,
    /// Further results announced by `SERVER_MORE_RESULTS_EXISTS`
    NextResult,
}

/// A connection that dispatches text protocol commands.
///
/// Only one result set can be read at a time: [`query`](Self::query) returns a cursor
/// that borrows the connection until it is dropped.
pub struct Conn<T: Transport> {
    pub(crate) transport: T,
    buffer_set: BufferSet,
    valid: bool,
    pub(crate) pending: Pending,
}

impl<T: Transport> Conn<T> {
    /// Wrap a transport whose handshake already completed
    pub fn new(transport: T) -> Self {
        Self {
            transport,
            buffer_set: BufferSet::new(),
            valid: true,
            pending: Pending::None,
        }
    }

    /// Whether commands can still be issued.
    ///
    /// A transport failure breaks the connection for good.
    pub fn is_valid(&self) -> bool {
        self.valid
    }

    /// Whether an earlier command left unread results behind
    pub fn has_pending_result(&self) -> bool {
        self.pending != Pending::None
    }

    /// Get the negotiated capability flags
    pub fn capability_flags(&self) -> CapabilityFlags {
        self.transport.capability_flags()
    }

    pub fn transport(&self) -> &T {
        &self.transport
    }

    pub fn into_transport(self) -> T {
        self.transport
    }

    pub(crate) fn invalidate(&mut self, reason: &Error) {
        if self.valid {
            tracing::debug!(error = %reason, "connection invalidated");
        }
        self.valid = false;
    }

    fn ensure_ready(&self) -> Result<()> {
        if !self.valid {
            return Err(Error::ConnectionBroken);
        }
        if self.pending != Pending::None {
            return Err(Error::ResultSetPending);
        }
        Ok(())
    }

    /// Encode one command and send it. A failed write breaks the connection.
    fn send<F>(&mut self, encode: F) -> Result<()>
    where
        F: FnOnce(&mut Vec<u8>),
    {
        self.ensure_ready()?;

        self.buffer_set.reclaim();
        encode(self.buffer_set.new_write_buffer());
        tracing::trace!(len = self.buffer_set.payload_len(), "sending command");

        if let Err(err) = self
            .transport
            .write_command(self.buffer_set.write_buffer_mut())
        {
            self.invalidate(&err);
            return Err(err);
        }
        Ok(())
    }

    /// Read one response packet into the read buffer. A failed read breaks the connection.
    fn read_response(&mut self) -> Result<()> {
        if let Err(err) = self.transport.read_packet(&mut self.buffer_set.read_buffer) {
            self.invalidate(&err);
            return Err(err);
        }
        Ok(())
    }

    /// Execute a query that returns rows.
    ///
    /// A server-reported error leaves the connection usable; any other failure breaks it.
    /// A statement that produces no result set yields a cursor with no columns and no rows.
    ///
    /// The rows must be drained before the next command. Dropping the cursor early
    /// leaves them on the wire until [`discard_pending`](Self::discard_pending) is called.
    #[tracing::instrument(skip_all)]
    pub fn query(&mut self, sql: &str) -> Result<Rows<ResultSet<'_, T>>> {
        self.send(|out| write_query(out, sql))?;

        let columns = match self.read_result_header() {
            Ok(columns) => columns,
            Err(err) => {
                if !matches!(err, Error::ServerError(_)) {
                    self.invalidate(&err);
                }
                return Err(err);
            }
        };

        let result_set = match columns {
            Some(columns) => {
                tracing::debug!(num_columns = columns.len(), "result set started");
                self.pending = Pending::Rows;
                ResultSet::new(self, columns)
            }
            None => ResultSet::empty(self),
        };
        Ok(Rows::new(result_set))
    }

    /// Read the first response of a query; `None` when it is an OK packet.
    fn read_result_header(&mut self) -> Result<Option<Vec<ColumnDefinition>>> {
        let capabilities = self.capability_flags();
        self.read_response()?;

        let column_count = match read_query_response(&self.buffer_set.read_buffer)? {
            QueryResponse::Ok(ok_bytes) => {
                let ok = OkPayload::parse(ok_bytes, capabilities)?;
                self.note_more_results(ok.status_flags);
                return Ok(None);
            }
            QueryResponse::ResultSet { column_count } => column_count,
        };

        let num_columns = usize::try_from(column_count).map_err(|_| Error::InvalidPacket)?;
        let mut columns = Vec::with_capacity(num_columns);
        for _ in 0..num_columns {
            self.read_response()?;
            columns.push(ColumnDefinition::try_from(ColumnDefinitionBytes(
                &self.buffer_set.read_buffer,
            ))?);
        }

        if !capabilities.contains(CapabilityFlags::CLIENT_DEPRECATE_EOF) {
            self.read_response()?;
            read_eof_packet(&self.buffer_set.read_buffer)?;
        }

        Ok(Some(columns))
    }

    fn note_more_results(&mut self, status: ServerStatusFlags) {
        if status.contains(ServerStatusFlags::SERVER_MORE_RESULTS_EXISTS) {
            tracing::debug!("server announced more results");
            self.pending = Pending::NextResult;
        }
    }

    /// Execute a command that returns no rows (INSERT, UPDATE, DELETE, SET, ...).
    ///
    /// ```ignore
    /// match conn.exec("DELETE FROM dogs WHERE id = 1") {
    ///     Ok(ok) => println!("{} rows deleted", ok.affected_rows),
    ///     Err(Error::ServerError(err)) => println!("server refused: {}", err),
    ///     Err(err) => println!("generic error: {}", err),
    /// }
    /// ```
    #[tracing::instrument(skip_all)]
    pub fn exec(&mut self, sql: &str) -> Result<OkPayload> {
        self.send(|out| write_query(out, sql))?;
        self.read_response()?;

        let capabilities = self.capability_flags();
        let payload = &self.buffer_set.read_buffer;
        match detect_packet_type(payload) {
            Ok(PacketType::Ok) => {
                // the whole packet was read, so a decode failure leaves the stream in sync
                let ok = OkPayload::parse(OkPayloadBytes(payload), capabilities)?;
                self.note_more_results(ok.status_flags);
                Ok(ok)
            }
            Ok(PacketType::Err) => Err(ErrPayloadBytes(payload).into()),
            Ok(PacketType::ResultSet) => {
                // the server waits for file contents that will never come
                if payload.first() == Some(&LOCAL_INFILE_HEADER) {
                    let err = Error::Unsupported("LOCAL INFILE queries are not supported".to_string());
                    self.invalidate(&err);
                    return Err(err);
                }
                let column_count = match read_int_lenenc(payload) {
                    Ok((column_count, _rest)) => column_count,
                    Err(err) => {
                        self.invalidate(&err);
                        return Err(err);
                    }
                };
                // the column definitions and rows that follow are discarded on request
                self.pending = Pending::Columns {
                    remaining: column_count,
                };
                Err(Error::BadUsageError(
                    "exec() received a result set; use query() for statements returning rows"
                        .to_string(),
                ))
            }
            Ok(PacketType::Eof) => {
                let err = Error::InvalidPacket;
                self.invalidate(&err);
                Err(err)
            }
            Err(err) => {
                self.invalidate(&err);
                Err(err)
            }
        }
    }

    /// Send a ping to the server to check if the connection is alive
    pub fn ping(&mut self) -> Result<()> {
        self.send(write_ping)?;
        self.read_response()?;

        let payload = &self.buffer_set.read_buffer;
        match detect_packet_type(payload) {
            Ok(PacketType::Ok) => Ok(()),
            Ok(PacketType::Err) => Err(ErrPayloadBytes(payload).into()),
            Ok(_) => {
                let err = Error::InvalidPacket;
                self.invalidate(&err);
                Err(err)
            }
            Err(err) => {
                self.invalidate(&err);
                Err(err)
            }
        }
    }

    /// Read and throw away whatever an earlier command left unread.
    ///
    /// Needed after dropping a cursor before it was exhausted, or after a response
    /// announced more results.
    #[tracing::instrument(skip_all)]
    pub fn discard_pending(&mut self) -> Result<()> {
        if !self.valid {
            return Err(Error::ConnectionBroken);
        }

        let capabilities = self.capability_flags();
        let mut discard = match self.pending {
            Pending::None => return Ok(()),
            Pending::Columns { remaining } => Discard::from_columns(remaining, capabilities),
            Pending::Rows => Discard::from_rows(capabilities),
            Pending::NextResult => Discard::from_next_result(capabilities),
        };

        let mut packets = 0_usize;
        loop {
            self.read_response()?;
            packets += 1;
            match discard.drive(&self.buffer_set.read_buffer) {
                Ok(DiscardProgress::NeedPacket) => {}
                Ok(DiscardProgress::Finished) => {
                    tracing::debug!(packets, "discarded pending result");
                    self.pending = Pending::None;
                    return Ok(());
                }
                Err(err) => {
                    self.invalidate(&err);
                    return Err(err);
                }
            }
        }
    }

    /// Send COM_QUIT. The server closes the session without replying.
    pub fn close(mut self) -> Result<()> {
        if !self.valid {
            return Ok(());
        }
        // unread results do not matter once the session ends
        self.pending = Pending::None;
        self.send(write_quit)
    }
}

impl<S: Read + Write> Conn<PacketStream<S>> {
    /// Wrap a stream whose handshake already completed with `capability_flags`
    pub fn from_stream(stream: S, capability_flags: CapabilityFlags) -> Self {
        Self::new(PacketStream::new(stream, capability_flags))
    }
}

impl Conn<PacketStream<TcpStream>> {
    /// Open a TCP connection and authenticate it with `handshake`.
    ///
    /// The handshake receives the raw stream and returns the negotiated capabilities.
    pub fn connect<O, F>(opts: O, handshake: F) -> Result<Self>
    where
        O: TryInto<Opts>,
        Error: From<O::Error>,
        F: FnOnce(&mut TcpStream, &Opts) -> Result<CapabilityFlags>,
    {
        let opts: Opts = opts.try_into()?;

        let host = opts.host.as_deref().ok_or_else(|| {
            Error::BadConfigError("Missing host in connection options".to_string())
        })?;

        let mut stream = TcpStream::connect((host, opts.port))?;
        stream.set_nodelay(opts.tcp_nodelay)?;
        stream.set_read_timeout(opts.read_timeout)?;
        stream.set_write_timeout(opts.write_timeout)?;

        let capability_flags = handshake(&mut stream, &opts)?;
        tracing::debug!(host, port = opts.port, "connected");

        Ok(Self::from_stream(stream, capability_flags))
    }
}
