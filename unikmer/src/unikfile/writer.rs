//! The `.unik` writer: buffered, mode-aware, and able to patch its own
//! header's `number` field after the fact when the sink supports seeking.

use super::header::{Header, COMPACT, HAS_NUMBER, INCLUDE_TAXID, SORTED};
use super::varbyte;
use crate::error::{Result, UnikError};
use byteorder::{LittleEndian, WriteBytesExt};
use std::io::{BufWriter, Seek, SeekFrom, Write};

/// A `SORTED` writer pairs two codes per control byte; when taxids are
/// interleaved (`INCLUDE_TAXID` without a `globalTaxid`), the first code's
/// taxid can't be written until its pair is complete, since the pair's
/// varbyte bytes land *before* either code's taxid bytes on the wire.
struct PendingSorted {
    delta: u64,
    taxid: Option<u32>,
}

pub struct Writer<W: Write> {
    inner: BufWriter<W>,
    header: Header,
    count: u64,
    pending: Option<PendingSorted>,
    last_code: Option<u64>,
    header_written: bool,
}

impl<W: Write> Writer<W> {
    pub fn new(sink: W, header: Header) -> Result<Self> {
        if header.is_compact() && (header.is_sorted() || header.is_hashed()) {
            return Err(UnikError::ConfigError(
                "COMPACT is incompatible with SORTED and HASHED".into(),
            ));
        }
        let mut writer = Writer {
            inner: BufWriter::new(sink),
            header,
            count: 0,
            pending: None,
            last_code: None,
            header_written: false,
        };
        writer.write_header()?;
        Ok(writer)
    }

    fn write_header(&mut self) -> Result<()> {
        self.header.write_to(&mut self.inner)?;
        self.header_written = true;
        Ok(())
    }

    /// Appends a code. For `SORTED` bodies the caller must present codes in
    /// non-decreasing order; callers that cannot guarantee this should sort
    /// first and use [`Writer::new`] with `SORTED` unset until after sorting.
    pub fn write_code(&mut self, code: u64) -> Result<()> {
        self.write_code_inner(code, None)
    }

    pub fn write_code_with_taxid(&mut self, code: u64, taxid: u32) -> Result<()> {
        self.write_code_inner(code, Some(taxid))
    }

    fn write_code_inner(&mut self, code: u64, taxid: Option<u32>) -> Result<()> {
        if self.header.is_sorted() {
            self.write_sorted(code, taxid)?;
        } else if self.header.is_compact() {
            self.write_compact(code)?;
            self.write_taxid_immediate(taxid)?;
        } else {
            self.inner.write_u64::<LittleEndian>(code)?;
            self.write_taxid_immediate(taxid)?;
        }
        self.count += 1;
        Ok(())
    }

    fn write_taxid_immediate(&mut self, taxid: Option<u32>) -> Result<()> {
        if self.header.includes_taxid() && self.header.global_taxid.is_none() {
            let width = self.header.taxid_width();
            let bytes = taxid.unwrap_or(0).to_le_bytes();
            self.inner.write_all(&bytes[..width])?;
        }
        Ok(())
    }

    fn write_compact(&mut self, code: u64) -> Result<()> {
        let nbytes = (2 * self.header.k as usize + 7) / 8;
        let bytes = code.to_le_bytes();
        self.inner.write_all(&bytes[..nbytes])?;
        Ok(())
    }

    /// Buffers one half of a delta pair; once both halves of a pair are in
    /// hand, writes the pair's control byte and payloads, then each half's
    /// taxid (in code order) immediately after — so a reader completing the
    /// pair can read the two taxids in the same order it yields the codes.
    fn write_sorted(&mut self, code: u64, taxid: Option<u32>) -> Result<()> {
        let delta = match self.last_code {
            Some(prev) => {
                if code < prev {
                    return Err(UnikError::ConfigError(
                        "codes must be non-decreasing for a SORTED writer".into(),
                    ));
                }
                code - prev
            }
            None => code,
        };
        self.last_code = Some(code);

        match self.pending.take() {
            None => {
                self.pending = Some(PendingSorted { delta, taxid });
            }
            Some(first) => {
                varbyte::write_pair(&mut self.inner, first.delta, Some(delta))?;
                self.write_taxid_immediate(first.taxid)?;
                self.write_taxid_immediate(taxid)?;
            }
        }
        Ok(())
    }

    /// Flushes buffered bytes without touching the header; use when the
    /// sink is not seekable (e.g. stdout).
    pub fn flush(&mut self) -> Result<()> {
        if self.header.is_sorted() {
            if let Some(first) = self.pending.take() {
                varbyte::write_pair(&mut self.inner, first.delta, None)?;
                self.write_taxid_immediate(first.taxid)?;
            }
        }
        self.inner.flush()?;
        Ok(())
    }

    /// Flushes and unwraps the sink without patching the header — the only
    /// option when `W` isn't seekable.
    pub fn into_inner(mut self) -> Result<W> {
        self.flush()?;
        self.inner.into_inner().map_err(|e| UnikError::IOError(e.into_error()))
    }
}

impl<W: Write + Seek> Writer<W> {
    /// Flushes and, if the header reserves a `number` field, seeks back and
    /// patches it with the final count. Returns the underlying sink so the
    /// caller can reuse or inspect it.
    pub fn finalize(mut self) -> Result<W> {
        self.flush()?;
        if self.header.has_flag(HAS_NUMBER) {
            if let Some(offset) = self.header.number_offset() {
                let current = self.inner.stream_position()?;
                self.inner.seek(SeekFrom::Start(offset))?;
                self.inner.write_i64::<byteorder::BigEndian>(self.count as i64)?;
                self.inner.seek(SeekFrom::Start(current))?;
                self.inner.flush()?;
            }
        }
        self.inner.into_inner().map_err(|e| UnikError::IOError(e.into_error()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::unikfile::header::CANONICAL;
    use std::io::Cursor;

    #[test]
    fn rejects_compact_and_sorted_together() {
        let mut header = Header::new(4);
        header.set_flag(COMPACT, true);
        header.set_flag(SORTED, true);
        let result = Writer::new(Cursor::new(Vec::new()), header);
        assert!(matches!(result, Err(UnikError::ConfigError(_))));
    }

    #[test]
    fn finalize_patches_number_in_place() {
        let mut header = Header::new(4);
        header.set_flag(HAS_NUMBER, true);
        header.set_flag(CANONICAL, true);
        header.number = Some(-1);
        let cursor = Cursor::new(Vec::new());
        let mut writer = Writer::new(cursor, header).unwrap();
        writer.write_code(0b0001).unwrap();
        writer.write_code(0b0010).unwrap();
        writer.write_code(0b0011).unwrap();
        let cursor = writer.finalize().unwrap();

        let buf = cursor.into_inner();
        let mut read_header = Header::read_from(&mut &buf[..]).unwrap();
        assert_eq!(read_header.number.take(), Some(3));
    }
}
