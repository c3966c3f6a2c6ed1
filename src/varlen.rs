//! MIDI variable-length quantities.
//!
//! Each byte contributes its low 7 bits, most significant group first, and every byte except
//! the last has its top bit set. At most 4 bytes (28 bits) are allowed.

use crate::prelude::*;

/// The maximum amount of bytes a variable-length quantity may span.
pub const MAX_LEN: usize = 4;

/// Read a variable-length quantity.
///
/// Fails with `MalformedVariableLength` if the 4th byte still has its continuation bit set.
pub fn read(raw: &mut ByteCursor) -> Result<u28> {
    let start = raw.offset();
    let mut int: u32 = 0;
    for _ in 0..MAX_LEN {
        let byte = raw.read_u8()?;
        int <<= 7;
        int |= bit_range(byte, 0..7) as u32;
        if bit_range(byte, 7..8) == 0 {
            //Since we did at max 4 reads of 7 bits each, there MUST be at max 28 bits in this int
            return Ok(u28::from(int));
        }
    }
    Err(Error::new(ErrorKind::MalformedVariableLength, start))
}

/// Reads a slice represented in the input as a variable-length `len` followed by `len` bytes.
pub(crate) fn read_slice<'a>(raw: &mut ByteCursor<'a>) -> Result<&'a [u8]> {
    let len = read(raw)?.as_int();
    raw.read_exact(len as usize)
}

/// Append the variable-length encoding of `int` to `out`, using the shortest representation.
pub fn write(int: u28, out: &mut Vec<u8>) {
    let int = int.as_int();
    let mut skipping = true;
    for i in (0..MAX_LEN as u32).rev() {
        let byte = ((int >> (i * 7)) & 0x7F) as u8;
        if skipping && byte == 0 && i != 0 {
            //Skip these leading zeros
        } else {
            skipping = false;
            out.push(if i == 0 { byte } else { byte | 0x80 });
        }
    }
}

