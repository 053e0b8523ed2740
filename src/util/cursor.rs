//! Explicit read cursor over an in-memory byte slice.
//!
//! All tile formats here are small, fully-buffered containers, so decoding
//! works on a borrowed slice with an explicit position. The cursor is created
//! per decode call and never shared; errors carry the context string of the
//! field being read.

use byteorder::{ByteOrder, LittleEndian};

use super::{Error, Result};

/// Little-endian read cursor over a byte slice.
#[derive(Debug)]
pub struct Cursor<'a> {
    data: &'a [u8],
    pos: usize,
}

impl<'a> Cursor<'a> {
    /// Create a cursor at the start of `data`.
    pub fn new(data: &'a [u8]) -> Self {
        Self { data, pos: 0 }
    }

    /// Current position from the start of the slice.
    #[inline]
    pub fn pos(&self) -> usize {
        self.pos
    }

    /// Bytes left before the end of the slice.
    #[inline]
    pub fn remaining(&self) -> usize {
        self.data.len() - self.pos
    }

    fn check(&self, context: &str, needed: usize) -> Result<()> {
        if needed > self.remaining() {
            return Err(Error::truncated(context, needed, self.remaining()));
        }
        Ok(())
    }

    /// Read exactly 4 magic bytes.
    pub fn read_magic(&mut self, context: &str) -> Result<[u8; 4]> {
        self.check(context, 4)?;
        let mut magic = [0u8; 4];
        magic.copy_from_slice(&self.data[self.pos..self.pos + 4]);
        self.pos += 4;
        Ok(magic)
    }

    /// Read a little-endian u32.
    pub fn read_u32(&mut self, context: &str) -> Result<u32> {
        self.check(context, 4)?;
        let value = LittleEndian::read_u32(&self.data[self.pos..]);
        self.pos += 4;
        Ok(value)
    }

    /// Borrow the next `len` bytes and advance past them.
    pub fn read_slice(&mut self, context: &str, len: usize) -> Result<&'a [u8]> {
        self.check(context, len)?;
        let slice = &self.data[self.pos..self.pos + len];
        self.pos += len;
        Ok(slice)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_sequential_reads() {
        let data = [b'c', b'm', b'p', b't', 1, 0, 0, 0, 0xEF, 0xBE];
        let mut cur = Cursor::new(&data);
        assert_eq!(&cur.read_magic("magic").unwrap(), b"cmpt");
        assert_eq!(cur.read_u32("version").unwrap(), 1);
        assert_eq!(cur.pos(), 8);
        assert_eq!(cur.remaining(), 2);
        assert_eq!(cur.read_slice("tail", 2).unwrap(), &[0xEF, 0xBE]);
    }

    #[test]
    fn test_truncated_read() {
        let data = [1, 2];
        let mut cur = Cursor::new(&data);
        let err = cur.read_u32("version").unwrap_err();
        assert!(matches!(err, Error::Truncated { needed: 4, remaining: 2, .. }));
        // Position is unchanged after a failed read
        assert_eq!(cur.pos(), 0);
    }
}
