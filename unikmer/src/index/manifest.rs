//! The index manifest (`_db.yml`): the shared parameters every block in a
//! database agrees on, plus the full file list in stable order.
//!
//! Multiple manifest schemas have existed; this module only ever writes and
//! accepts the current one (carrying `sizes`, `block_size`, `hashed`,
//! `scaled`, `scale`, `minimizer_w`, `syncmer_s`). Older manifests are
//! rejected with [`UnikError::IncompatibleHeader`] rather than silently
//! guessed at.

use crate::error::{Result, UnikError};
use serde::{Deserialize, Serialize};
use std::fs::File;
use std::io::{BufReader, BufWriter};
use std::path::Path;

pub const CURRENT_MANIFEST_VERSION: u32 = 2;

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct UnikIndexDB {
    pub version: u32,
    pub k: u8,
    pub canonical: bool,
    #[serde(default)]
    pub hashed: bool,
    #[serde(default)]
    pub scaled: bool,
    #[serde(default)]
    pub scale: Option<u32>,
    pub num_hashes: u8,
    pub fpr: f64,
    pub block_size: u32,
    pub total_kmers: u64,
    pub files: Vec<String>,
    pub names: Vec<String>,
    pub sizes: Vec<u64>,
    #[serde(default)]
    pub minimizer_w: Option<u32>,
    #[serde(default)]
    pub syncmer_s: Option<u32>,
}

impl UnikIndexDB {
    pub fn validate(&self) -> Result<()> {
        if self.version < CURRENT_MANIFEST_VERSION {
            return Err(UnikError::IncompatibleHeader(format!(
                "manifest schema version {} predates the supported version {}; rebuild the index",
                self.version, CURRENT_MANIFEST_VERSION
            )));
        }
        if self.names.len() != self.sizes.len() {
            return Err(UnikError::InvalidFileFormat(
                "manifest names and sizes length mismatch".into(),
            ));
        }
        Ok(())
    }

    pub fn write_to(&self, path: &Path) -> Result<()> {
        let file = File::create(path)?;
        serde_yaml::to_writer(BufWriter::new(file), self)
            .map_err(|e| UnikError::InvalidFileFormat(format!("failed to write manifest: {e}")))
    }

    pub fn read_from(path: &Path) -> Result<Self> {
        let file = File::open(path)?;
        let db: UnikIndexDB = serde_yaml::from_reader(BufReader::new(file))
            .map_err(|e| UnikError::InvalidFileFormat(format!("failed to parse manifest: {e}")))?;
        db.validate()?;
        Ok(db)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::tempdir;

    fn sample() -> UnikIndexDB {
        UnikIndexDB {
            version: CURRENT_MANIFEST_VERSION,
            k: 21,
            canonical: true,
            hashed: false,
            scaled: false,
            scale: None,
            num_hashes: 3,
            fpr: 0.01,
            block_size: 64,
            total_kmers: 1000,
            files: vec!["a.unik".into(), "b.unik".into()],
            names: vec!["a".into(), "b".into()],
            sizes: vec![500, 500],
            minimizer_w: None,
            syncmer_s: None,
        }
    }

    #[test]
    fn round_trips_through_yaml() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("_db.yml");
        sample().write_to(&path).unwrap();
        let read = UnikIndexDB::read_from(&path).unwrap();
        assert_eq!(read.k, 21);
        assert_eq!(read.names, vec!["a", "b"]);
    }

    #[test]
    fn tolerates_unknown_keys() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("_db.yml");
        std::fs::write(
            &path,
            format!(
                "version: {}\nk: 21\ncanonical: true\nnum_hashes: 3\nfpr: 0.01\nblock_size: 64\ntotal_kmers: 10\nfiles: []\nnames: []\nsizes: []\nfuture_field: 42\n",
                CURRENT_MANIFEST_VERSION
            ),
        )
        .unwrap();
        let read = UnikIndexDB::read_from(&path).unwrap();
        assert_eq!(read.k, 21);
    }

    #[test]
    fn rejects_old_schema_version() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("_db.yml");
        std::fs::write(
            &path,
            "version: 1\nk: 21\ncanonical: true\nnum_hashes: 3\nfpr: 0.01\nblock_size: 64\ntotal_kmers: 10\nfiles: []\nnames: []\nsizes: []\n",
        )
        .unwrap();
        let result = UnikIndexDB::read_from(&path);
        assert!(matches!(result, Err(UnikError::IncompatibleHeader(_))));
    }
}
