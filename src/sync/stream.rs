use std::io::{BufReader, Read, Write};

use auto_impl::auto_impl;

use crate::constant::CapabilityFlags;
use crate::error::Result;
use crate::protocol::packet::{read_payload, write_payload};

/// Packet-level access to an authenticated MySQL session.
///
/// Errors returned from here are transport failures: the dispatcher treats the
/// connection as unusable after any of them.
#[auto_impl(&mut, Box)]
pub trait Transport {
    /// Send one command. `packet` holds 4 reserved header bytes followed by the payload.
    fn write_command(&mut self, packet: &mut [u8]) -> Result<()>;

    /// Read one complete response payload into `buffer`
    fn read_packet(&mut self, buffer: &mut Vec<u8>) -> Result<()>;

    /// Capabilities negotiated during the handshake
    fn capability_flags(&self) -> CapabilityFlags;
}

/// [`Transport`] over a blocking byte stream
pub struct PacketStream<S: Read + Write> {
    stream: BufReader<S>,
    capability_flags: CapabilityFlags,
}

impl<S: Read + Write> PacketStream<S> {
    /// Wrap a stream whose handshake already completed with `capability_flags`
    pub fn new(stream: S, capability_flags: CapabilityFlags) -> Self {
        Self {
            stream: BufReader::new(stream),
            capability_flags,
        }
    }

    pub fn get_ref(&self) -> &S {
        self.stream.get_ref()
    }

    pub fn get_mut(&mut self) -> &mut S {
        self.stream.get_mut()
    }

    /// Unwrap the stream. Bytes buffered but not yet consumed are lost.
    pub fn into_inner(self) -> S {
        self.stream.into_inner()
    }
}

impl<S: Read + Write> Transport for PacketStream<S> {
    fn write_command(&mut self, packet: &mut [u8]) -> Result<()> {
        write_payload(self.stream.get_mut(), packet)
    }

    fn read_packet(&mut self, buffer: &mut Vec<u8>) -> Result<()> {
        read_payload(&mut self.stream, buffer)?;
        Ok(())
    }

    fn capability_flags(&self) -> CapabilityFlags {
        self.capability_flags
    }
}
