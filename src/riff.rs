//! There's an abomination called RMID, MIDI embedded in a RIFF file.
//! Support for these files is provided by unwrapping the input slice, stripping away the RIFF
//! wrappers around the raw SMF file.

use crate::prelude::*;

/// Iterates over little-endian-length RIFF chunks, honoring the padding byte after odd lengths.
struct ChunkIter<'a>(ByteCursor<'a>);
impl<'a> Iterator for ChunkIter<'a> {
    type Item = Result<(&'a [u8], &'a [u8])>;
    fn next(&mut self) -> Option<Self::Item> {
        if self.0.is_empty() {
            return None;
        }
        Some(self.read_chunk())
    }
}
impl<'a> ChunkIter<'a> {
    fn read_chunk(&mut self) -> Result<(&'a [u8], &'a [u8])> {
        let id = self.0.read_exact(4)?;
        let mut len = [0; 4];
        len.copy_from_slice(self.0.read_exact(4)?);
        let len = u32::from_le_bytes(len) as usize;
        let data = self.0.read_exact(len)?;
        if len % 2 == 1 && !self.0.is_empty() {
            self.0.read_u8()?;
        }
        Ok((id, data))
    }
}

/// Strip the RIFF wrapper if there is one, otherwise return the input untouched.
pub(crate) fn unwrap(raw: &[u8]) -> Result<&[u8]> {
    if !raw.starts_with(b"RIFF") {
        return Ok(raw);
    }
    let invalid = |msg| Error::new(ErrorKind::InvalidRiff(msg), 0);
    let (_id, riff) = ChunkIter(ByteCursor::new(raw))
        .next()
        .ok_or_else(|| invalid("no main riff chunk"))?
        .map_err(|_| invalid("truncated main riff chunk"))?;
    let mut riff = ByteCursor::new(riff);
    let formtype = riff
        .read_exact(4)
        .map_err(|_| invalid("failed to read riff formtype"))?;
    ensure!(formtype == b"RMID", invalid("not an rmid riff file"));
    for chunk in ChunkIter(riff) {
        let (id, data) = chunk.map_err(|_| invalid("truncated riff chunk"))?;
        if id == b"data" {
            return Ok(data);
        }
    }
    bail!(invalid("no rmid data chunk"))
}
