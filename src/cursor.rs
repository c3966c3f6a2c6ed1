//! Sequential, length-checked reading over a byte buffer.
//!
//! Every parsing routine in the crate reads through a [`ByteCursor`](struct.ByteCursor.html).
//! Cursors over a whole file only check against the end of the buffer, while cursors scoped to
//! a chunk additionally carry the chunk's declared byte budget, so a malformed event can never
//! read into the next chunk.

use crate::prelude::*;

/// A reader over a borrowed byte buffer.
///
/// Reads return subslices of the original buffer, so parsed data can borrow from it.
#[derive(Clone, Debug)]
pub struct ByteCursor<'a> {
    /// Starts at the current read position, ends at EOF (or at the end of the chunk).
    raw: &'a [u8],
    /// Offset of `raw[0]` in the original buffer, for error reporting.
    offset: usize,
    /// Remaining bytes declared by the enclosing chunk, if any.
    budget: Option<usize>,
}
impl<'a> ByteCursor<'a> {
    /// Create an unbounded cursor at the start of `raw`.
    pub fn new(raw: &'a [u8]) -> ByteCursor<'a> {
        ByteCursor {
            raw,
            offset: 0,
            budget: None,
        }
    }

    /// Create a cursor limited to a budget of `budget` bytes.
    ///
    /// Reads past the budget fail with `ChunkLengthExceeded`, reads within the budget but past
    /// the end of `raw` fail with `TruncatedInput`.
    pub fn with_budget(raw: &'a [u8], budget: usize) -> ByteCursor<'a> {
        ByteCursor {
            raw,
            offset: 0,
            budget: Some(budget),
        }
    }

    /// Byte offset of the read position in the original buffer.
    #[inline]
    pub fn offset(&self) -> usize {
        self.offset
    }

    /// Remaining chunk budget, or `None` if this cursor is not scoped to a chunk.
    #[inline]
    pub fn budget(&self) -> Option<usize> {
        self.budget
    }

    /// How many bytes can still be read: the chunk budget if there is one, otherwise the amount
    /// of buffered bytes.
    #[inline]
    pub fn remaining(&self) -> usize {
        self.budget.unwrap_or(self.raw.len())
    }

    /// Whether there is nothing left to read.
    #[inline]
    pub fn is_empty(&self) -> bool {
        self.remaining() == 0
    }

    /// The bytes left in the underlying buffer (ignoring any budget).
    #[inline]
    pub fn unread(&self) -> &'a [u8] {
        self.raw
    }

    /// Build an error located at the current read position.
    #[inline]
    pub fn error(&self, kind: ErrorKind) -> Error {
        Error::new(kind, self.offset)
    }

    fn check(&self, len: usize) -> Result<()> {
        if let Some(budget) = self.budget {
            ensure!(len <= budget, self.error(ErrorKind::ChunkLengthExceeded));
        }
        ensure!(len <= self.raw.len(), self.error(ErrorKind::TruncatedInput));
        Ok(())
    }

    fn advance(&mut self, len: usize) -> &'a [u8] {
        let (taken, rest) = self.raw.split_at(len);
        self.raw = rest;
        self.offset += len;
        if let Some(budget) = self.budget.as_mut() {
            *budget -= len;
        }
        taken
    }

    /// Read exactly `len` bytes.
    pub fn read_exact(&mut self, len: usize) -> Result<&'a [u8]> {
        self.check(len)?;
        Ok(self.advance(len))
    }

    /// Look at the next byte without consuming it.
    pub fn peek_byte(&self) -> Result<u8> {
        self.check(1)?;
        Ok(self.raw[0])
    }

    fn read_array<const N: usize>(&mut self) -> Result<[u8; N]> {
        let mut out = [0; N];
        out.copy_from_slice(self.read_exact(N)?);
        Ok(out)
    }

    #[inline]
    pub fn read_u8(&mut self) -> Result<u8> {
        Ok(self.read_array::<1>()?[0])
    }

    /// Read a big-endian `u16`.
    #[inline]
    pub fn read_u16(&mut self) -> Result<u16> {
        self.read_array().map(u16::from_be_bytes)
    }

    /// Read a big-endian 24-bit integer.
    pub fn read_u24(&mut self) -> Result<u24> {
        let [a, b, c] = self.read_array()?;
        Ok(u24::new(u32::from_be_bytes([0, a, b, c])))
    }

    /// Read a big-endian `u32`.
    #[inline]
    pub fn read_u32(&mut self) -> Result<u32> {
        self.read_array().map(u32::from_be_bytes)
    }

    /// Read a 7-bit data byte, failing with `InvalidDataByte` if its top bit is set.
    pub fn read_u7(&mut self) -> Result<u7> {
        let offset = self.offset;
        let byte = self.read_u8()?;
        u7::try_from(byte).ok_or_else(|| Error::new(ErrorKind::InvalidDataByte(byte), offset))
    }

    /// Read exactly `len` bytes as a cursor of their own, scoped to a budget of `len`.
    pub fn read_cursor(&mut self, len: usize) -> Result<ByteCursor<'a>> {
        let offset = self.offset;
        let raw = self.read_exact(len)?;
        Ok(ByteCursor {
            raw,
            offset,
            budget: Some(len),
        })
    }

    /// Split off a cursor over the next `len` bytes, scoped to a budget of `len`.
    ///
    /// If the buffer holds less than `len` bytes, the child gets what is left and will report
    /// `TruncatedInput` once it reads past it.
    pub fn split_chunk(&mut self, len: usize) -> ByteCursor<'a> {
        let available = len.min(self.raw.len()).min(self.remaining());
        let child = ByteCursor {
            raw: &self.raw[..available],
            offset: self.offset,
            budget: Some(len),
        };
        self.advance(available);
        child
    }
}
