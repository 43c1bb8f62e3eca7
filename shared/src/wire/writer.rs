use crate::error::WireError;

/// Cursor over a caller-provided output buffer.
///
/// Every write is bounds-checked and fails with [`WireError::BufferFull`]
/// instead of growing; nothing past `position()` is meaningful.
pub struct PacketWriter<'a> {
    buf: &'a mut [u8],
    pos: usize,
}

impl<'a> PacketWriter<'a> {
    pub fn new(buf: &'a mut [u8]) -> Self {
        Self { buf, pos: 0 }
    }

    pub fn position(&self) -> usize {
        self.pos
    }

    pub fn remaining(&self) -> usize {
        self.buf.len() - self.pos
    }

    pub fn put_slice(&mut self, bytes: &[u8]) -> Result<(), WireError> {
        if bytes.len() > self.remaining() {
            return Err(WireError::BufferFull);
        }
        self.buf[self.pos..self.pos + bytes.len()].copy_from_slice(bytes);
        self.pos += bytes.len();
        Ok(())
    }

    pub fn put_u8(&mut self, value: u8) -> Result<(), WireError> {
        self.put_slice(&[value])
    }

    pub fn put_u16(&mut self, value: u16) -> Result<(), WireError> {
        self.put_slice(&value.to_be_bytes())
    }

    pub fn put_u32(&mut self, value: u32) -> Result<(), WireError> {
        self.put_slice(&value.to_be_bytes())
    }

    /// Write a zero placeholder and return its offset for a later [`patch_u16`](Self::patch_u16).
    pub fn reserve_u16(&mut self) -> Result<usize, WireError> {
        let at = self.pos;
        self.put_u16(0)?;
        Ok(at)
    }

    /// Overwrite two already-written bytes at `at`.
    pub fn patch_u16(&mut self, at: usize, value: u16) {
        debug_assert!(at + 2 <= self.pos, "patch outside written region");
        self.buf[at..at + 2].copy_from_slice(&value.to_be_bytes());
    }

    /// Rewind to an earlier commit point, discarding everything after it.
    pub fn truncate(&mut self, pos: usize) {
        if pos < self.pos {
            self.pos = pos;
        }
    }
}
