//! Scripted server for driving a connection without a MySQL instance

#![allow(dead_code)]

use std::io::{self, Cursor, Read, Write};

use mysql_cursor::constant::{CAPABILITIES_DEFAULT, CapabilityFlags, ServerStatusFlags};
use mysql_cursor::protocol::NULL_VALUE;
use mysql_cursor::protocol::primitive::{
    write_int_2, write_int_3, write_int_4, write_int_lenenc, write_string_lenenc,
};
use mysql_cursor::sync::{Conn, PacketStream};

pub type MockConn = Conn<PacketStream<MockStream>>;

pub fn init_tracing() {
    let _ = tracing_subscriber::fmt()
        .with_max_level(tracing::Level::DEBUG)
        .with_test_writer()
        .try_init();
}

/// Replays canned server bytes and records what the client sends
pub struct MockStream {
    server: Cursor<Vec<u8>>,
    pub written: Vec<u8>,
    pub write_attempts: usize,
    pub fail_writes: bool,
}

impl MockStream {
    pub fn new(server: Vec<u8>) -> Self {
        Self {
            server: Cursor::new(server),
            written: Vec::new(),
            write_attempts: 0,
            fail_writes: false,
        }
    }

    pub fn failing_writes() -> Self {
        Self {
            fail_writes: true,
            ..Self::new(Vec::new())
        }
    }

    /// Whether every canned byte was consumed
    pub fn drained(&self) -> bool {
        self.server.position() as usize == self.server.get_ref().len()
    }

    /// Payloads of the packets the client sent, in order
    pub fn sent_payloads(&self) -> Vec<Vec<u8>> {
        let mut payloads = Vec::new();
        let mut rest = &self.written[..];
        while rest.len() >= 4 {
            let len = u32::from_le_bytes([rest[0], rest[1], rest[2], 0]) as usize;
            payloads.push(rest[4..4 + len].to_vec());
            rest = &rest[4 + len..];
        }
        payloads
    }
}

impl Read for MockStream {
    fn read(&mut self, buf: &mut [u8]) -> io::Result<usize> {
        self.server.read(buf)
    }
}

impl Write for MockStream {
    fn write(&mut self, buf: &[u8]) -> io::Result<usize> {
        self.write_attempts += 1;
        if self.fail_writes {
            return Err(io::Error::new(io::ErrorKind::BrokenPipe, "broken pipe"));
        }
        self.written.extend_from_slice(buf);
        Ok(buf.len())
    }

    fn flush(&mut self) -> io::Result<()> {
        Ok(())
    }
}

/// Frames server payloads into packets with increasing sequence ids
pub struct Script {
    bytes: Vec<u8>,
    sequence_id: u8,
}

impl Default for Script {
    fn default() -> Self {
        Self::new()
    }
}

impl Script {
    pub fn new() -> Self {
        Self {
            bytes: Vec::new(),
            // the command itself was packet 0
            sequence_id: 1,
        }
    }

    pub fn packet(mut self, payload: &[u8]) -> Self {
        write_int_3(&mut self.bytes, payload.len() as u32);
        self.bytes.push(self.sequence_id);
        self.bytes.extend_from_slice(payload);
        self.sequence_id = self.sequence_id.wrapping_add(1);
        self
    }

    /// Column count, definitions, intermediate EOF, rows and the final EOF
    pub fn result_set(self, names: &[&str], rows: &[&[Option<&str>]], status: ServerStatusFlags) -> Self {
        let mut script = self.packet(&column_count(names.len() as u64));
        for name in names {
            script = script.packet(&column(name));
        }
        script = script.packet(&eof(ServerStatusFlags::SERVER_STATUS_AUTOCOMMIT));
        for values in rows {
            script = script.packet(&text_row(values));
        }
        script.packet(&eof(status))
    }

    /// Next command starts a new sequence
    pub fn next_command(mut self) -> Self {
        self.sequence_id = 1;
        self
    }

    pub fn into_conn(self) -> MockConn {
        self.into_conn_with(CAPABILITIES_DEFAULT)
    }

    pub fn into_conn_with(self, capabilities: CapabilityFlags) -> MockConn {
        Conn::from_stream(MockStream::new(self.bytes), capabilities)
    }
}

pub fn ok(affected_rows: u64, last_insert_id: u64, status: ServerStatusFlags) -> Vec<u8> {
    let mut out = vec![0x00];
    write_int_lenenc(&mut out, affected_rows);
    write_int_lenenc(&mut out, last_insert_id);
    write_int_2(&mut out, status.bits());
    write_int_2(&mut out, 0);
    out
}

pub fn err(code: u16, sql_state: &str, message: &str) -> Vec<u8> {
    let mut out = vec![0xFF];
    write_int_2(&mut out, code);
    out.push(b'#');
    out.extend_from_slice(sql_state.as_bytes());
    out.extend_from_slice(message.as_bytes());
    out
}

pub fn eof(status: ServerStatusFlags) -> Vec<u8> {
    let mut out = vec![0xFE];
    write_int_2(&mut out, 0);
    write_int_2(&mut out, status.bits());
    out
}

/// Result set terminator of a session with `CLIENT_DEPRECATE_EOF`
pub fn ok_terminator(status: ServerStatusFlags) -> Vec<u8> {
    let mut out = ok(0, 0, status);
    out[0] = 0xFE;
    out
}

pub fn column_count(count: u64) -> Vec<u8> {
    let mut out = Vec::new();
    write_int_lenenc(&mut out, count);
    out
}

pub fn column(name: &str) -> Vec<u8> {
    let mut out = Vec::new();
    write_string_lenenc(&mut out, "def");
    write_string_lenenc(&mut out, "test");
    write_string_lenenc(&mut out, "dogs");
    write_string_lenenc(&mut out, "dogs");
    write_string_lenenc(&mut out, name);
    write_string_lenenc(&mut out, name);
    out.push(0x0c);
    write_int_2(&mut out, 33);
    write_int_4(&mut out, 255);
    out.push(0xFD);
    write_int_2(&mut out, 0);
    out.push(0);
    write_int_2(&mut out, 0);
    out
}

pub fn text_row(values: &[Option<&str>]) -> Vec<u8> {
    let mut out = Vec::new();
    for value in values {
        match value {
            Some(text) => write_string_lenenc(&mut out, text),
            None => out.push(NULL_VALUE),
        }
    }
    out
}
