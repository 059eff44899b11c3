//! The `.unik` reader: inverts whichever body encoding the header's flags
//! select.

use super::header::Header;
use super::varbyte;
use crate::error::{Result, UnikError};
use byteorder::{LittleEndian, ReadBytesExt};
use std::io::Read;

pub struct Reader<R: Read> {
    inner: R,
    pub header: Header,
    last_code: u64,
    /// The pair's second code and its already-read taxid, when a `SORTED`
    /// pair yielded two codes at once.
    buffered: Option<(u64, u32)>,
    read_count: u64,
    total: Option<u64>,
}

impl<R: Read> Reader<R> {
    pub fn new(mut inner: R) -> Result<Self> {
        let header = Header::read_from(&mut inner)?;
        let total = match header.number {
            Some(n) if n >= 0 => Some(n as u64),
            _ => None,
        };
        if header.is_sorted() && total.is_none() {
            return Err(UnikError::NumberUnknown(
                "a SORTED file must carry a known number".into(),
            ));
        }
        Ok(Reader {
            inner,
            header,
            last_code: 0,
            buffered: None,
            read_count: 0,
            total,
        })
    }

    /// Reads the next code, or `None` at a clean end of stream.
    pub fn read_code(&mut self) -> Result<Option<u64>> {
        self.read_code_with_taxid().map(|opt| opt.map(|(code, _)| code))
    }

    /// Reads the next code and its taxid. When the file has no taxid
    /// section, the taxid returned is the header's `globalTaxid` (or `0`).
    /// `globalTaxid`, when set, always wins over any per-code bytes that
    /// happen to be present.
    pub fn read_code_with_taxid(&mut self) -> Result<Option<(u64, u32)>> {
        let next = if self.header.is_sorted() {
            self.next_sorted()?
        } else {
            self.next_unsorted()?
        };
        let Some((code, raw_taxid)) = next else { return Ok(None) };
        let taxid = self.header.global_taxid.unwrap_or(raw_taxid);
        self.read_count += 1;
        Ok(Some((code, taxid)))
    }

    fn read_taxid_byte(&mut self) -> Result<u32> {
        let width = self.header.taxid_width();
        let mut buf = [0u8; 4];
        self.inner.read_exact(&mut buf[..width])?;
        Ok(u32::from_le_bytes(buf))
    }

    /// `SORTED` bodies pair two codes per control byte. When taxids are
    /// interleaved, both halves' taxid bytes follow the pair's varbyte
    /// payloads (mirroring [`super::writer::Writer`]'s pairing), so the
    /// second half's `(code, taxid)` is read eagerly here and buffered.
    fn next_sorted(&mut self) -> Result<Option<(u64, u32)>> {
        if let Some(item) = self.buffered.take() {
            return Ok(Some(item));
        }
        let total = self.total.expect("checked in new()");
        if self.read_count >= total {
            return Ok(None);
        }
        let has_second = total - self.read_count >= 2;
        let (d1, d2) = varbyte::read_pair(&mut self.inner, has_second)?;
        let code1 = self.last_code.wrapping_add(d1);
        let code2 = d2.map(|delta| code1.wrapping_add(delta));
        self.last_code = code2.unwrap_or(code1);

        let taxid_needed = self.header.includes_taxid() && self.header.global_taxid.is_none();
        let taxid1 = if taxid_needed { self.read_taxid_byte()? } else { 0 };
        let taxid2 = if code2.is_some() && taxid_needed { self.read_taxid_byte()? } else { 0 };

        if let Some(c2) = code2 {
            self.buffered = Some((c2, taxid2));
        }
        Ok(Some((code1, taxid1)))
    }

    fn next_unsorted(&mut self) -> Result<Option<(u64, u32)>> {
        let code = if self.header.is_compact() {
            let nbytes = (2 * self.header.k as usize + 7) / 8;
            let mut buf = [0u8; 8];
            let read = self.inner.read(&mut buf[..nbytes])?;
            if read == 0 {
                return Ok(None);
            }
            if read < nbytes {
                self.inner.read_exact(&mut buf[read..nbytes])?;
            }
            u64::from_le_bytes(buf)
        } else {
            match self.inner.read_u64::<LittleEndian>() {
                Ok(code) => code,
                Err(e) if e.kind() == std::io::ErrorKind::UnexpectedEof => return Ok(None),
                Err(e) => return Err(e.into()),
            }
        };

        let taxid = if self.header.includes_taxid() && self.header.global_taxid.is_none() {
            self.read_taxid_byte()?
        } else {
            0
        };
        Ok(Some((code, taxid)))
    }

    /// Consumes the remainder of the stream, returning all codes.
    pub fn read_all(&mut self) -> Result<Vec<u64>> {
        let mut out = Vec::new();
        while let Some(code) = self.read_code()? {
            out.push(code);
        }
        Ok(out)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::unikfile::header::{CANONICAL, HAS_NUMBER, INCLUDE_TAXID, SORTED};
    use crate::unikfile::writer::Writer;
    use std::io::Cursor;

    #[test]
    fn sorted_round_trips_even_count() {
        let mut header = Header::new(16);
        header.set_flag(SORTED, true);
        header.set_flag(HAS_NUMBER, true);
        let mut writer = Writer::new(Cursor::new(Vec::new()), header).unwrap();
        for code in [1u64, 2, 257, 65537] {
            writer.write_code(code).unwrap();
        }
        let cursor = writer.finalize().unwrap();

        let mut reader = Reader::new(Cursor::new(cursor.into_inner())).unwrap();
        let codes = reader.read_all().unwrap();
        assert_eq!(codes, vec![1, 2, 257, 65537]);
    }

    #[test]
    fn sorted_round_trips_odd_count() {
        let mut header = Header::new(16);
        header.set_flag(SORTED, true);
        header.set_flag(HAS_NUMBER, true);
        let mut writer = Writer::new(Cursor::new(Vec::new()), header).unwrap();
        for code in [1u64, 2, 257, 65537, 65538] {
            writer.write_code(code).unwrap();
        }
        let cursor = writer.finalize().unwrap();

        let mut reader = Reader::new(Cursor::new(cursor.into_inner())).unwrap();
        let codes = reader.read_all().unwrap();
        assert_eq!(codes, vec![1, 2, 257, 65537, 65538]);
    }

    #[test]
    fn sorted_body_is_smaller_than_fixed_width() {
        let mut header = Header::new(16);
        header.set_flag(SORTED, true);
        header.set_flag(HAS_NUMBER, true);
        let mut writer = Writer::new(Cursor::new(Vec::new()), header).unwrap();
        for code in [1u64, 2, 257, 65537, 65538] {
            writer.write_code(code).unwrap();
        }
        let cursor = writer.finalize().unwrap();
        let buf = cursor.into_inner();
        let header_len = Header::read_from(&mut &buf[..]).unwrap().serialized_len();
        let body_len = buf.len() - header_len;
        assert!(body_len < 5 * 8);
    }

    #[test]
    fn hashed_round_trips() {
        let mut header = Header::new(31);
        header.set_flag(crate::unikfile::header::HASHED, true);
        let mut writer = Writer::new(Cursor::new(Vec::new()), header).unwrap();
        writer.write_code(123456789).unwrap();
        writer.write_code(987654321).unwrap();
        let buf = writer.into_inner().unwrap().into_inner();

        let mut reader = Reader::new(Cursor::new(buf)).unwrap();
        assert_eq!(reader.read_all().unwrap(), vec![123456789, 987654321]);
    }

    #[test]
    fn canonical_flag_survives_round_trip() {
        let mut header = Header::new(4);
        header.set_flag(CANONICAL, true);
        header.set_flag(HAS_NUMBER, true);
        header.number = Some(0);
        let writer = Writer::new(Cursor::new(Vec::new()), header).unwrap();
        let cursor = writer.finalize().unwrap();
        let reader = Reader::new(Cursor::new(cursor.into_inner())).unwrap();
        assert!(reader.header.is_canonical());
    }

    #[test]
    fn sorted_with_per_code_taxid_round_trips_even_and_odd() {
        let mut header = Header::new(4);
        header.set_flag(SORTED, true);
        header.set_flag(HAS_NUMBER, true);
        header.set_flag(INCLUDE_TAXID, true);
        header.max_taxid = Some(1000);
        let mut writer = Writer::new(Cursor::new(Vec::new()), header).unwrap();
        for (code, taxid) in [(1u64, 10u32), (2, 10), (3, 20)] {
            writer.write_code_with_taxid(code, taxid).unwrap();
        }
        let cursor = writer.finalize().unwrap();

        let mut reader = Reader::new(Cursor::new(cursor.into_inner())).unwrap();
        let mut out = Vec::new();
        while let Some(pair) = reader.read_code_with_taxid().unwrap() {
            out.push(pair);
        }
        assert_eq!(out, vec![(1, 10), (2, 10), (3, 20)]);
    }

    #[test]
    fn global_taxid_overrides_any_per_code_bytes() {
        let mut header = Header::new(4);
        header.set_flag(SORTED, true);
        header.set_flag(HAS_NUMBER, true);
        header.set_flag(crate::unikfile::header::HAS_GLOBAL_TAXID, true);
        header.global_taxid = Some(99);
        let mut writer = Writer::new(Cursor::new(Vec::new()), header).unwrap();
        writer.write_code(1).unwrap();
        writer.write_code(2).unwrap();
        let cursor = writer.finalize().unwrap();

        let mut reader = Reader::new(Cursor::new(cursor.into_inner())).unwrap();
        let mut out = Vec::new();
        while let Some(pair) = reader.read_code_with_taxid().unwrap() {
            out.push(pair);
        }
        assert_eq!(out, vec![(1, 99), (2, 99)]);
    }
}
