//! Delta-varbyte codec for `SORTED` (non-compact) bodies: consecutive codes
//! are stored as the delta from their predecessor, in pairs, each pair
//! prefixed by one control byte carrying two 3-bit length codes.

use crate::error::Result;
use std::io::{Read, Write};

/// Maps a delta's minimal byte width to a 3-bit control code. Deltas needing
/// 7 or 8 bytes both collapse to code `7` (always written as 8 bytes) —
/// giving up a little compression on the rare 7-byte delta in exchange for
/// two usable bits per control byte instead of four.
pub fn byte_code(delta: u64) -> u8 {
    if delta == 0 {
        return 0;
    }
    let needed = 8 - (delta.leading_zeros() / 8) as u8;
    if needed <= 6 {
        needed
    } else {
        7
    }
}

/// The actual number of bytes written on the wire for a given control code.
pub fn code_to_len(code: u8) -> usize {
    if code == 7 {
        8
    } else {
        code as usize
    }
}

pub fn pack_control(c1: u8, c2: u8) -> u8 {
    debug_assert!(c1 < 8 && c2 < 8);
    (c1 << 3) | c2
}

pub fn unpack_control(byte: u8) -> (u8, u8) {
    ((byte >> 3) & 0b111, byte & 0b111)
}

pub fn write_payload<W: Write>(w: &mut W, delta: u64, len: usize) -> Result<()> {
    if len == 0 {
        return Ok(());
    }
    let bytes = delta.to_le_bytes();
    w.write_all(&bytes[..len])?;
    Ok(())
}

pub fn read_payload<R: Read>(r: &mut R, len: usize) -> Result<u64> {
    if len == 0 {
        return Ok(0);
    }
    let mut buf = [0u8; 8];
    r.read_exact(&mut buf[..len])?;
    Ok(u64::from_le_bytes(buf))
}

/// Writes one pair of deltas (or a single trailing delta) as the format
/// describes: a control byte followed by up to two variable-length payloads.
pub fn write_pair<W: Write>(w: &mut W, d1: u64, d2: Option<u64>) -> Result<()> {
    let c1 = byte_code(d1);
    let c2 = d2.map(byte_code).unwrap_or(0);
    w.write_all(&[pack_control(c1, c2)])?;
    write_payload(w, d1, code_to_len(c1))?;
    if let Some(d2) = d2 {
        write_payload(w, d2, code_to_len(c2))?;
    }
    Ok(())
}

/// Reads one pair. `has_second` must reflect whether this is the last, odd
/// code of the stream (the reader knows the total count from the header).
pub fn read_pair<R: Read>(r: &mut R, has_second: bool) -> Result<(u64, Option<u64>)> {
    let mut ctrl = [0u8; 1];
    r.read_exact(&mut ctrl)?;
    let (c1, c2) = unpack_control(ctrl[0]);
    let d1 = read_payload(r, code_to_len(c1))?;
    let d2 = if has_second {
        Some(read_payload(r, code_to_len(c2))?)
    } else {
        None
    };
    Ok((d1, d2))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn zero_delta_uses_zero_bytes() {
        assert_eq!(byte_code(0), 0);
        assert_eq!(code_to_len(byte_code(0)), 0);
    }

    #[test]
    fn large_delta_uses_eight_bytes() {
        assert_eq!(code_to_len(byte_code(u64::MAX)), 8);
    }

    #[test]
    fn pair_round_trips() {
        let mut buf = Vec::new();
        write_pair(&mut buf, 1, Some(256)).unwrap();
        let (d1, d2) = read_pair(&mut &buf[..], true).unwrap();
        assert_eq!(d1, 1);
        assert_eq!(d2, Some(256));
    }

    #[test]
    fn odd_trailing_pair_has_no_second_payload() {
        let mut buf = Vec::new();
        write_pair(&mut buf, 65537, None).unwrap();
        let (d1, d2) = read_pair(&mut &buf[..], false).unwrap();
        assert_eq!(d1, 65537);
        assert_eq!(d2, None);
    }
}
