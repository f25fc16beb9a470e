/// Capacity kept across commands. A buffer grown past it by one large payload is
/// shrunk back before the next command is encoded.
pub const RETAINED_CAPACITY: usize = 1 << 20;

const HEADER_LEN: usize = 4;

/// Packet buffers owned by one connection.
///
/// `read_buffer` holds the last response payload read outside a cursor. The write
/// buffer starts with `HEADER_LEN` reserved bytes so a command below 16MB goes out
/// in one write without copying.
#[derive(Debug)]
pub struct BufferSet {
    pub read_buffer: Vec<u8>,
    write_buffer: Vec<u8>,
}

impl BufferSet {
    pub fn new() -> Self {
        Self {
            read_buffer: Vec::new(),
            write_buffer: vec![0; HEADER_LEN],
        }
    }

    /// Start a new command: drop the previous payload, keep the header space.
    #[inline]
    pub fn new_write_buffer(&mut self) -> &mut Vec<u8> {
        self.write_buffer.truncate(HEADER_LEN);
        self.write_buffer.resize(HEADER_LEN, 0);
        &mut self.write_buffer
    }

    /// Header space followed by the payload, as `write_payload` expects it
    #[inline]
    pub fn write_buffer_mut(&mut self) -> &mut Vec<u8> {
        &mut self.write_buffer
    }

    #[inline]
    pub fn payload_len(&self) -> usize {
        self.write_buffer.len().saturating_sub(HEADER_LEN)
    }

    /// Release memory left behind by an oversized query or response
    pub fn reclaim(&mut self) {
        if self.read_buffer.capacity() > RETAINED_CAPACITY {
            tracing::trace!(capacity = self.read_buffer.capacity(), "shrinking read buffer");
            self.read_buffer.clear();
            self.read_buffer.shrink_to(RETAINED_CAPACITY);
        }
        if self.write_buffer.capacity() > RETAINED_CAPACITY {
            tracing::trace!(capacity = self.write_buffer.capacity(), "shrinking write buffer");
            self.new_write_buffer();
            self.write_buffer.shrink_to(RETAINED_CAPACITY);
        }
    }
}

impl Default for BufferSet {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn new_write_buffer_reserves_header() {
        let mut buffers = BufferSet::new();
        buffers.new_write_buffer().extend_from_slice(b"\x03SELECT 1");
        assert_eq!(buffers.payload_len(), 9);

        let buf = buffers.new_write_buffer();
        assert_eq!(buf.len(), HEADER_LEN);
        assert_eq!(buffers.payload_len(), 0);
    }

    #[test]
    fn small_buffers_survive_reclaim() {
        let mut buffers = BufferSet::default();
        buffers.read_buffer.extend_from_slice(b"test data");
        buffers.new_write_buffer().extend_from_slice(b"query");

        buffers.reclaim();

        assert_eq!(buffers.read_buffer, b"test data");
        assert_eq!(buffers.payload_len(), 5);
    }

    #[test]
    fn reclaim_shrinks_oversized_buffers() {
        let mut buffers = BufferSet::new();
        buffers.read_buffer.resize(RETAINED_CAPACITY * 4, 0);
        buffers.new_write_buffer().resize(RETAINED_CAPACITY * 2, b'x');

        buffers.reclaim();

        assert!(buffers.read_buffer.is_empty());
        assert!(buffers.read_buffer.capacity() <= RETAINED_CAPACITY);
        assert_eq!(buffers.payload_len(), 0);
        assert!(buffers.write_buffer_mut().capacity() <= RETAINED_CAPACITY);
    }
}
