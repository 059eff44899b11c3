//! The fixed-size part of a `.unik` file: magic, version, k, and the mode
//! flags bitset that gates which optional sections and which body encoding
//! follow.

use crate::error::{Result, UnikError};
use byteorder::{BigEndian, ReadBytesExt, WriteBytesExt};
use std::io::{Read, Write};

pub const MAGIC: &[u8; 8] = b"UNIKSEQ\0";
pub const MAIN_VERSION: u8 = 1;
pub const MINOR_VERSION: u8 = 0;

pub const CANONICAL: u32 = 1 << 0;
pub const SORTED: u32 = 1 << 1;
pub const COMPACT: u32 = 1 << 2;
pub const HASHED: u32 = 1 << 3;
pub const INCLUDE_TAXID: u32 = 1 << 4;
pub const SCALED: u32 = 1 << 5;
pub const HAS_GLOBAL_TAXID: u32 = 1 << 6;
pub const HAS_DESCRIPTION: u32 = 1 << 7;
/// Beyond the flags named in the entity model: gates whether `number` is
/// serialized at all, so a one-shot streaming writer that never learns a
/// final count (sink isn't seekable and was never patched) can omit it
/// rather than force a bogus `-1`.
pub const HAS_NUMBER: u32 = 1 << 8;

#[derive(Debug, Clone)]
pub struct Header {
    pub main_version: u8,
    pub minor_version: u8,
    pub k: u8,
    pub flags: u32,
    pub global_taxid: Option<u32>,
    pub max_taxid: Option<u32>,
    pub scale: Option<u32>,
    pub number: Option<i64>,
    pub description: Option<String>,
}

impl Header {
    pub fn new(k: u8) -> Self {
        Header {
            main_version: MAIN_VERSION,
            minor_version: MINOR_VERSION,
            k,
            flags: 0,
            global_taxid: None,
            max_taxid: None,
            scale: None,
            number: None,
            description: None,
        }
    }

    pub fn has_flag(&self, flag: u32) -> bool {
        self.flags & flag != 0
    }

    pub fn set_flag(&mut self, flag: u32, on: bool) {
        if on {
            self.flags |= flag;
        } else {
            self.flags &= !flag;
        }
    }

    pub fn is_canonical(&self) -> bool {
        self.has_flag(CANONICAL)
    }
    pub fn is_sorted(&self) -> bool {
        self.has_flag(SORTED)
    }
    pub fn is_compact(&self) -> bool {
        self.has_flag(COMPACT)
    }
    pub fn is_hashed(&self) -> bool {
        self.has_flag(HASHED)
    }
    pub fn includes_taxid(&self) -> bool {
        self.has_flag(INCLUDE_TAXID)
    }
    pub fn is_scaled(&self) -> bool {
        self.has_flag(SCALED)
    }

    /// Width in bytes of a per-code taxid, derived from `maxTaxid`.
    pub fn taxid_width(&self) -> usize {
        let max = self.max_taxid.unwrap_or(0) as u64;
        for width in 1..=4 {
            if max < (1u64 << (8 * width)) {
                return width;
            }
        }
        4
    }

    /// Two headers must agree on these fields to be fed to the same
    /// aggregate operation or index build.
    pub fn compatible_with(&self, other: &Header) -> Result<()> {
        if self.k != other.k {
            return Err(UnikError::IncompatibleHeader(format!(
                "k mismatch: {} vs {}",
                self.k, other.k
            )));
        }
        if self.is_canonical() != other.is_canonical() {
            return Err(UnikError::IncompatibleHeader("canonical mismatch".into()));
        }
        if self.is_hashed() != other.is_hashed() {
            return Err(UnikError::IncompatibleHeader("hashed mismatch".into()));
        }
        if self.is_scaled() != other.is_scaled() {
            return Err(UnikError::IncompatibleHeader("scaled mismatch".into()));
        }
        if self.is_scaled() && self.scale != other.scale {
            return Err(UnikError::IncompatibleHeader("scale mismatch".into()));
        }
        Ok(())
    }

    pub fn write_to<W: Write>(&self, w: &mut W) -> Result<()> {
        w.write_all(MAGIC)?;
        w.write_u8(self.main_version)?;
        w.write_u8(self.minor_version)?;
        w.write_u8(self.k)?;
        w.write_u32::<BigEndian>(self.flags)?;
        if self.has_flag(HAS_GLOBAL_TAXID) {
            w.write_u32::<BigEndian>(self.global_taxid.unwrap_or(0))?;
        }
        if self.has_flag(INCLUDE_TAXID) {
            w.write_u32::<BigEndian>(self.max_taxid.unwrap_or(0))?;
        }
        if self.has_flag(SCALED) {
            w.write_u32::<BigEndian>(self.scale.unwrap_or(1))?;
        }
        if self.has_flag(HAS_NUMBER) {
            w.write_i64::<BigEndian>(self.number.unwrap_or(-1))?;
        }
        if self.has_flag(HAS_DESCRIPTION) {
            let desc = self.description.as_deref().unwrap_or("");
            let bytes = desc.as_bytes();
            let len = bytes.len().min(255) as u8;
            w.write_u8(len)?;
            w.write_all(&bytes[..len as usize])?;
        }
        Ok(())
    }

    /// Byte length of everything written by [`write_to`], used by the index
    /// block writer to compute the matrix's start offset.
    pub fn serialized_len(&self) -> usize {
        let mut len = 8 + 1 + 1 + 1 + 4;
        if self.has_flag(HAS_GLOBAL_TAXID) {
            len += 4;
        }
        if self.has_flag(INCLUDE_TAXID) {
            len += 4;
        }
        if self.has_flag(SCALED) {
            len += 4;
        }
        if self.has_flag(HAS_NUMBER) {
            len += 8;
        }
        if self.has_flag(HAS_DESCRIPTION) {
            len += 1 + self.description.as_deref().unwrap_or("").len().min(255);
        }
        len
    }

    /// Byte offset of the `number` field from the start of the header, if
    /// present — used by the writer to seek back and patch the final count
    /// once a streaming write completes.
    pub fn number_offset(&self) -> Option<u64> {
        if !self.has_flag(HAS_NUMBER) {
            return None;
        }
        let mut offset = 8 + 1 + 1 + 1 + 4;
        if self.has_flag(HAS_GLOBAL_TAXID) {
            offset += 4;
        }
        if self.has_flag(INCLUDE_TAXID) {
            offset += 4;
        }
        if self.has_flag(SCALED) {
            offset += 4;
        }
        Some(offset as u64)
    }

    pub fn read_from<R: Read>(r: &mut R) -> Result<Self> {
        let mut magic = [0u8; 8];
        r.read_exact(&mut magic)?;
        if &magic != MAGIC {
            return Err(UnikError::InvalidFileFormat("bad magic".into()));
        }
        let main_version = r.read_u8()?;
        let minor_version = r.read_u8()?;
        if main_version != MAIN_VERSION {
            return Err(UnikError::IncompatibleHeader(format!(
                "unsupported main version {main_version}"
            )));
        }
        let k = r.read_u8()?;
        if k == 0 {
            return Err(UnikError::InvalidFileFormat("k must be nonzero".into()));
        }
        let flags = r.read_u32::<BigEndian>()?;

        let mut header = Header {
            main_version,
            minor_version,
            k,
            flags,
            global_taxid: None,
            max_taxid: None,
            scale: None,
            number: None,
            description: None,
        };

        if header.has_flag(HAS_GLOBAL_TAXID) {
            header.global_taxid = Some(r.read_u32::<BigEndian>()?);
        }
        if header.has_flag(INCLUDE_TAXID) {
            header.max_taxid = Some(r.read_u32::<BigEndian>()?);
        }
        if header.has_flag(SCALED) {
            header.scale = Some(r.read_u32::<BigEndian>()?);
        }
        if header.has_flag(HAS_NUMBER) {
            header.number = Some(r.read_i64::<BigEndian>()?);
        }
        if header.has_flag(HAS_DESCRIPTION) {
            let len = r.read_u8()? as usize;
            let mut buf = vec![0u8; len];
            r.read_exact(&mut buf)?;
            header.description = Some(String::from_utf8_lossy(&buf).into_owned());
        }

        Ok(header)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn header_round_trips_with_all_optional_sections() {
        let mut header = Header::new(21);
        header.set_flag(CANONICAL, true);
        header.set_flag(SORTED, true);
        header.set_flag(HAS_NUMBER, true);
        header.number = Some(42);
        header.set_flag(HAS_DESCRIPTION, true);
        header.description = Some("sample".to_string());

        let mut buf = Vec::new();
        header.write_to(&mut buf).unwrap();
        assert_eq!(buf.len(), header.serialized_len());

        let read = Header::read_from(&mut &buf[..]).unwrap();
        assert_eq!(read.k, 21);
        assert!(read.is_canonical());
        assert!(read.is_sorted());
        assert_eq!(read.number, Some(42));
        assert_eq!(read.description.as_deref(), Some("sample"));
    }

    #[test]
    fn rejects_bad_magic() {
        let buf = [0u8; 16];
        assert!(matches!(
            Header::read_from(&mut &buf[..]),
            Err(UnikError::InvalidFileFormat(_))
        ));
    }

    #[test]
    fn taxid_width_grows_with_max_taxid() {
        let mut header = Header::new(4);
        header.max_taxid = Some(200);
        assert_eq!(header.taxid_width(), 1);
        header.max_taxid = Some(70000);
        assert_eq!(header.taxid_width(), 3);
    }
}
