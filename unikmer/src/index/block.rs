//! The on-disk index block: a small header (names, sizes, dimensions)
//! immediately followed by the `numSigs x numRowBytes` signature matrix.

use crate::error::{Result, UnikError};
use byteorder::{BigEndian, ReadBytesExt, WriteBytesExt};
use memmap2::Mmap;
use std::fs::File;
use std::io::{Read, Write};

pub const BLOCK_MAGIC: &[u8; 8] = b"UNIKIDX\0";
pub const BLOCK_VERSION: u32 = 1;

#[derive(Debug, Clone)]
pub struct IndexHeader {
    pub version: u32,
    pub k: u8,
    pub canonical: bool,
    pub num_hashes: u8,
    pub num_sigs: u64,
    pub num_row_bytes: u32,
    pub names: Vec<String>,
    pub sizes: Vec<u64>,
}

impl IndexHeader {
    pub fn new(k: u8, canonical: bool, num_hashes: u8, num_sigs: u64, names: Vec<String>, sizes: Vec<u64>) -> Result<Self> {
        if names.len() != sizes.len() {
            return Err(UnikError::ConfigError("names and sizes must have equal length".into()));
        }
        let num_row_bytes = ((names.len() + 7) / 8) as u32;
        Ok(IndexHeader {
            version: BLOCK_VERSION,
            k,
            canonical,
            num_hashes,
            num_sigs,
            num_row_bytes,
            names,
            sizes,
        })
    }

    pub fn write_to<W: Write>(&self, w: &mut W) -> Result<()> {
        w.write_all(BLOCK_MAGIC)?;
        w.write_u32::<BigEndian>(self.version)?;
        w.write_u8(self.k)?;
        w.write_u8(self.canonical as u8)?;
        w.write_u8(self.num_hashes)?;
        w.write_u64::<BigEndian>(self.num_sigs)?;
        w.write_u32::<BigEndian>(self.num_row_bytes)?;
        w.write_u32::<BigEndian>(self.names.len() as u32)?;
        for name in &self.names {
            let bytes = name.as_bytes();
            let len = bytes.len().min(255) as u8;
            w.write_u8(len)?;
            w.write_all(&bytes[..len as usize])?;
        }
        for &size in &self.sizes {
            w.write_u64::<BigEndian>(size)?;
        }
        Ok(())
    }

    pub fn read_from<R: Read>(r: &mut R) -> Result<Self> {
        let mut magic = [0u8; 8];
        r.read_exact(&mut magic)?;
        if &magic != BLOCK_MAGIC {
            return Err(UnikError::InvalidFileFormat("bad index block magic".into()));
        }
        let version = r.read_u32::<BigEndian>()?;
        if version != BLOCK_VERSION {
            return Err(UnikError::IncompatibleHeader(format!(
                "unsupported index block version {version}"
            )));
        }
        let k = r.read_u8()?;
        let canonical = r.read_u8()? != 0;
        let num_hashes = r.read_u8()?;
        let num_sigs = r.read_u64::<BigEndian>()?;
        let num_row_bytes = r.read_u32::<BigEndian>()?;
        let name_count = r.read_u32::<BigEndian>()? as usize;

        let mut names = Vec::with_capacity(name_count);
        for _ in 0..name_count {
            let len = r.read_u8()? as usize;
            let mut buf = vec![0u8; len];
            r.read_exact(&mut buf)?;
            names.push(String::from_utf8_lossy(&buf).into_owned());
        }
        let mut sizes = Vec::with_capacity(name_count);
        for _ in 0..name_count {
            sizes.push(r.read_u64::<BigEndian>()?);
        }

        Ok(IndexHeader { version, k, canonical, num_hashes, num_sigs, num_row_bytes, names, sizes })
    }

    /// Serialized byte length of everything before the signature matrix —
    /// the matrix's `offset0`.
    pub fn serialized_len(&self) -> usize {
        let mut len = 8 + 4 + 1 + 1 + 1 + 8 + 4 + 4;
        for name in &self.names {
            len += 1 + name.as_bytes().len().min(255);
        }
        len += 8 * self.sizes.len();
        len
    }
}

/// A read-only, memory-mapped view over a built block file. The matrix is
/// never mutated through the mapping.
pub struct BlockReader {
    pub header: IndexHeader,
    mmap: Mmap,
    offset0: usize,
}

impl BlockReader {
    pub fn open(path: &std::path::Path) -> Result<Self> {
        let file = File::open(path)?;
        let mmap = unsafe { Mmap::map(&file)? };
        let header = IndexHeader::read_from(&mut &mmap[..])?;
        let offset0 = header.serialized_len();
        Ok(BlockReader { header, mmap, offset0 })
    }

    /// The row at signature position `sig`, `numRowBytes` long.
    pub fn row(&self, sig: u64) -> &[u8] {
        let start = self.offset0 + (sig as usize) * self.header.num_row_bytes as usize;
        let end = start + self.header.num_row_bytes as usize;
        &self.mmap[start..end]
    }
}

/// A buffered (non-mmap) block writer: header then matrix, rows already
/// merged by the builder.
pub fn write_block<W: Write>(w: &mut W, header: &IndexHeader, matrix: &[u8]) -> Result<()> {
    header.write_to(w)?;
    w.write_all(matrix)?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn header_round_trips() {
        let header = IndexHeader::new(
            21,
            true,
            3,
            1024,
            vec!["a".into(), "b".into(), "c".into()],
            vec![10, 20, 30],
        )
        .unwrap();
        let mut buf = Vec::new();
        header.write_to(&mut buf).unwrap();
        assert_eq!(buf.len(), header.serialized_len());
        let read = IndexHeader::read_from(&mut &buf[..]).unwrap();
        assert_eq!(read.names, header.names);
        assert_eq!(read.sizes, header.sizes);
        assert_eq!(read.num_row_bytes, 1);
    }

    #[test]
    fn rejects_mismatched_names_and_sizes() {
        let result = IndexHeader::new(21, true, 3, 1024, vec!["a".into()], vec![1, 2]);
        assert!(matches!(result, Err(UnikError::ConfigError(_))));
    }
}
