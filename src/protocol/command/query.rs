use crate::constant::{CapabilityFlags, CommandByte, ServerStatusFlags};
use crate::error::{Error, Result, eyre};
use crate::protocol::primitive::*;
use crate::protocol::response::{
    ERR_HEADER, ErrPayloadBytes, LOCAL_INFILE_HEADER, OK_HEADER, OkPayload, OkPayloadBytes,
    is_row_terminator, terminator_status,
};

/// Write COM_QUERY command
pub fn write_query(out: &mut Vec<u8>, sql: &str) {
    write_int_1(out, CommandByte::Query as u8);
    out.extend_from_slice(sql.as_bytes());
}

/// Query response variants
#[derive(Debug)]
pub enum QueryResponse<'a> {
    Ok(OkPayloadBytes<'a>),
    ResultSet { column_count: u64 },
}

/// Read COM_QUERY response
/// This can be:
/// - 0xFF: ERR packet (error occurred)
/// - 0x00: OK packet (query succeeded without result set)
/// - 0xFB: LOCAL INFILE packet (not supported)
/// - Otherwise: Result set (first byte is column count as length-encoded integer)
pub fn read_query_response(payload: &[u8]) -> Result<QueryResponse<'_>> {
    match payload.first() {
        None => Err(Error::InvalidPacket),
        Some(&ERR_HEADER) => Err(ErrPayloadBytes(payload).into()),
        Some(&OK_HEADER) => Ok(QueryResponse::Ok(OkPayloadBytes(payload))),
        Some(&LOCAL_INFILE_HEADER) => Err(Error::Unsupported(
            "LOCAL INFILE queries are not supported".to_string(),
        )),
        Some(_) => {
            let (column_count, _rest) = read_int_lenenc(payload)?;
            Ok(QueryResponse::ResultSet { column_count })
        }
    }
}

/// Internal state of the Discard state machine
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum DiscardState {
    /// Expecting the first packet of the next result
    ReadingFirstPacket,
    /// Reading column definitions
    ReadingColumns { remaining: u64 },
    /// Reading the EOF packet that follows column definitions
    ReadingIntermediateEof,
    /// Reading rows
    ReadingRows,
    Finished,
}

/// What the Discard state machine needs next
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DiscardProgress {
    NeedPacket,
    Finished,
}

/// State machine that reads and throws away whatever a query left on the wire.
///
/// It starts either in the middle of a row stream or before the next result of a
/// multi-result response, and finishes at the last terminator or at an ERR packet.
pub struct Discard {
    state: DiscardState,
    capabilities: CapabilityFlags,
}

impl Discard {
    /// Resume inside a row stream whose column definitions were already consumed
    pub fn from_rows(capabilities: CapabilityFlags) -> Self {
        Self {
            state: DiscardState::ReadingRows,
            capabilities,
        }
    }

    /// Resume after a result set header whose `column_count` definitions are still unread
    pub fn from_columns(column_count: u64, capabilities: CapabilityFlags) -> Self {
        Self {
            state: DiscardState::ReadingColumns {
                remaining: column_count,
            },
            capabilities,
        }
    }

    /// Start before the first packet of the next result
    pub fn from_next_result(capabilities: CapabilityFlags) -> Self {
        Self {
            state: DiscardState::ReadingFirstPacket,
            capabilities,
        }
    }

    /// Feed one packet payload
    pub fn drive(&mut self, payload: &[u8]) -> Result<DiscardProgress> {
        if payload.first() == Some(&ERR_HEADER) && self.state != DiscardState::Finished {
            tracing::debug!(error = %Error::from(ErrPayloadBytes(payload)), "discarded error response");
            self.state = DiscardState::Finished;
            return Ok(DiscardProgress::Finished);
        }

        match self.state {
            DiscardState::ReadingFirstPacket => match read_query_response(payload)? {
                QueryResponse::Ok(ok_bytes) => {
                    let ok = OkPayload::parse(ok_bytes, self.capabilities)?;
                    Ok(self.after_result(ok.status_flags))
                }
                QueryResponse::ResultSet { column_count } => {
                    self.state = DiscardState::ReadingColumns {
                        remaining: column_count,
                    };
                    Ok(DiscardProgress::NeedPacket)
                }
            },
            DiscardState::ReadingColumns { remaining } => {
                self.state = if remaining > 1 {
                    DiscardState::ReadingColumns {
                        remaining: remaining - 1,
                    }
                } else if self
                    .capabilities
                    .contains(CapabilityFlags::CLIENT_DEPRECATE_EOF)
                {
                    DiscardState::ReadingRows
                } else {
                    DiscardState::ReadingIntermediateEof
                };
                Ok(DiscardProgress::NeedPacket)
            }
            DiscardState::ReadingIntermediateEof => {
                self.state = DiscardState::ReadingRows;
                Ok(DiscardProgress::NeedPacket)
            }
            DiscardState::ReadingRows => {
                if is_row_terminator(payload) {
                    let status = terminator_status(payload, self.capabilities)?;
                    Ok(self.after_result(status))
                } else {
                    Ok(DiscardProgress::NeedPacket)
                }
            }
            DiscardState::Finished => Err(Error::LibraryBug(eyre!(
                "discard driven after it finished"
            ))),
        }
    }

    fn after_result(&mut self, status: ServerStatusFlags) -> DiscardProgress {
        if status.contains(ServerStatusFlags::SERVER_MORE_RESULTS_EXISTS) {
            self.state = DiscardState::ReadingFirstPacket;
            DiscardProgress::NeedPacket
        } else {
            self.state = DiscardState::Finished;
            DiscardProgress::Finished
        }
    }
}
