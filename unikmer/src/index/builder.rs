//! Partitions a sorted `.unik` file list into blocks, Bloom-stamps each
//! block's files into a signature matrix, and writes the manifest tying the
//! blocks together.

use super::block::{write_block, IndexHeader};
use super::manifest::{UnikIndexDB, CURRENT_MANIFEST_VERSION};
use crate::concurrency::FileSemaphore;
use crate::error::{Result, UnikError};
use crate::hash::hash_locations;
use crate::unikfile::Reader;
use rayon::prelude::*;
use std::fs::File;
use std::io::{BufReader, BufWriter};
use std::path::{Path, PathBuf};

#[derive(Debug, Clone)]
pub struct FileEntry {
    pub path: PathBuf,
    pub name: String,
    pub kmers: u64,
}

#[derive(Debug, Clone)]
pub struct BuildParams {
    pub k: u8,
    pub fpr: f64,
    pub num_hashes: u8,
    /// 0 means "auto": `ceil(sqrt(N)/8)*8`, clamped to `[8, N]`.
    pub block_size: u32,
    pub kmer_threshold1: u64,
    pub kmer_threshold2: u64,
    pub max_open_files: usize,
    pub in_memory: bool,
    pub canonical: bool,
    pub hashed: bool,
    pub scaled: bool,
    pub scale: Option<u32>,
}

impl Default for BuildParams {
    fn default() -> Self {
        BuildParams {
            k: 31,
            fpr: 0.01,
            num_hashes: 3,
            block_size: 0,
            kmer_threshold1: u64::MAX,
            kmer_threshold2: u64::MAX,
            max_open_files: 512,
            in_memory: true,
            canonical: true,
            hashed: false,
            scaled: false,
            scale: None,
        }
    }
}

/// Streams `files` (already sorted ascending by `kmers`) into blocks,
/// applying the two escalation thresholds as it walks.
pub fn form_blocks(files: Vec<FileEntry>, params: &BuildParams) -> Vec<Vec<FileEntry>> {
    let n = files.len();
    let mut s_block = if params.block_size == 0 {
        let auto = ((n as f64).sqrt() / 8.0).ceil() as u32 * 8;
        auto.clamp(8, n.max(8) as u32) as usize
    } else {
        params.block_size as usize
    };

    let mut blocks = Vec::new();
    let mut current: Vec<FileEntry> = Vec::new();
    let mut escalated = false;

    for file in files {
        if file.kmers > params.kmer_threshold2 {
            if !current.is_empty() {
                blocks.push(std::mem::take(&mut current));
            }
            blocks.push(vec![file]);
            continue;
        }
        if file.kmers > params.kmer_threshold1 && !escalated {
            escalated = true;
            s_block = 8;
            current.push(file);
            blocks.push(std::mem::take(&mut current));
            continue;
        }
        current.push(file);
        if current.len() >= s_block {
            blocks.push(std::mem::take(&mut current));
        }
    }
    if !current.is_empty() {
        blocks.push(current);
    }
    blocks
}

/// `numSigs = ceil(maxElements * ratio)`, `ratio = -numHashes / ln(1 -
/// fpr^(1/numHashes))`.
pub fn signature_size(max_elements: u64, num_hashes: u8, fpr: f64) -> u64 {
    let h = num_hashes as f64;
    let ratio = -h / (1.0 - fpr.powf(1.0 / h)).ln();
    (max_elements as f64 * ratio).ceil() as u64
}

fn stamp_file(
    entry: &FileEntry,
    slot: usize,
    num_sigs: u64,
    num_hashes: u8,
    sem: &FileSemaphore,
    sigs: &mut [u8],
) -> Result<()> {
    let _permit = sem.acquire();
    let file = File::open(&entry.path)?;
    let mut reader = Reader::new(BufReader::new(file))?;
    let already_hashed = reader.header.is_hashed();
    while let Some(code) = reader.read_code()? {
        let hashed_code = if already_hashed { code } else { crate::hash::hash64(code) };
        for loc in hash_locations(hashed_code, num_hashes as usize, num_sigs) {
            sigs[loc as usize] |= 1 << (7 - slot);
        }
    }
    Ok(())
}

/// Builds one batch's (`<=8` files) signature bitmap in parallel over its
/// files — a batch is exclusively owned by its worker until merged.
fn build_batch(files: &[FileEntry], num_sigs: u64, num_hashes: u8, sem: &FileSemaphore) -> Result<Vec<u8>> {
    let sigs = std::sync::Mutex::new(vec![0u8; num_sigs as usize]);
    files
        .par_iter()
        .enumerate()
        .try_for_each(|(slot, entry)| -> Result<()> {
            let mut local = vec![0u8; num_sigs as usize];
            stamp_file(entry, slot, num_sigs, num_hashes, sem, &mut local)?;
            let mut shared = sigs.lock().expect("sigs mutex poisoned");
            for (dst, src) in shared.iter_mut().zip(local.iter()) {
                *dst |= *src;
            }
            Ok(())
        })?;
    Ok(sigs.into_inner().expect("sigs mutex poisoned"))
}

/// Merges per-batch signature bytes column-wise into one `numSigs x
/// nBatches`-byte matrix.
fn merge_batches(batches: &[Vec<u8>], num_sigs: u64) -> Vec<u8> {
    let n_batches = batches.len();
    let mut matrix = vec![0u8; num_sigs as usize * n_batches];
    for (batch_idx, batch) in batches.iter().enumerate() {
        for sig in 0..num_sigs as usize {
            matrix[sig * n_batches + batch_idx] = batch[sig];
        }
    }
    matrix
}

/// Builds one block: batches of <=8 files each, Bloom-stamped in parallel,
/// merged into a single matrix and written with its header.
pub fn build_block(block_files: &[FileEntry], params: &BuildParams, sem: &FileSemaphore, out_path: &Path) -> Result<()> {
    let max_elements = block_files.iter().map(|f| f.kmers).max().unwrap_or(0);
    let num_sigs = signature_size(max_elements, params.num_hashes, params.fpr).max(1);

    let batch_results: Result<Vec<Vec<u8>>> = block_files
        .chunks(8)
        .collect::<Vec<_>>()
        .par_iter()
        .map(|chunk| build_batch(chunk, num_sigs, params.num_hashes, sem))
        .collect();
    let batches = batch_results?;

    let matrix = merge_batches(&batches, num_sigs);
    let names: Vec<String> = block_files.iter().map(|f| f.name.clone()).collect();
    let sizes: Vec<u64> = block_files.iter().map(|f| f.kmers).collect();
    let header = IndexHeader::new(params.k, params.canonical, params.num_hashes, num_sigs, names, sizes)?;

    let file = File::create(out_path)?;
    let mut writer = BufWriter::new(file);
    write_block(&mut writer, &header, &matrix)?;
    Ok(())
}

/// Orchestrates the whole build: forms blocks, builds each one (outer pool
/// over blocks, inner pool over batches, sharing rayon's global thread
/// pool), and writes the manifest.
pub fn build_index(files: Vec<FileEntry>, params: BuildParams, out_dir: &Path, db_name: &str) -> Result<UnikIndexDB> {
    if files.is_empty() {
        return Err(UnikError::ConfigError("no input files to index".into()));
    }
    let mut sorted = files;
    sorted.sort_by_key(|f| f.kmers);

    let blocks = form_blocks(sorted, &params);
    let sem = FileSemaphore::new(params.max_open_files.max(1));

    std::fs::create_dir_all(out_dir)?;
    let block_paths: Result<Vec<PathBuf>> = blocks
        .par_iter()
        .enumerate()
        .map(|(i, block_files)| -> Result<PathBuf> {
            let path = out_dir.join(format!("block_{i:05}.idx"));
            build_block(block_files, &params, &sem, &path)?;
            Ok(path)
        })
        .collect();
    let mut block_paths = block_paths?;
    block_paths.sort();

    let mut names = Vec::new();
    let mut sizes = Vec::new();
    let mut total_kmers = 0u64;
    for block in &blocks {
        for entry in block {
            names.push(entry.name.clone());
            sizes.push(entry.kmers);
            total_kmers += entry.kmers;
        }
    }

    let db = UnikIndexDB {
        version: CURRENT_MANIFEST_VERSION,
        k: params.k,
        canonical: params.canonical,
        hashed: params.hashed,
        scaled: params.scaled,
        scale: params.scale,
        num_hashes: params.num_hashes,
        fpr: params.fpr,
        block_size: params.block_size,
        total_kmers,
        files: block_paths.iter().map(|p| p.file_name().unwrap().to_string_lossy().into_owned()).collect(),
        names,
        sizes,
        minimizer_w: None,
        syncmer_s: None,
    };
    db.write_to(&out_dir.join(format!("{db_name}_db.yml")))?;
    Ok(db)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn entry(name: &str, kmers: u64) -> FileEntry {
        FileEntry { path: PathBuf::from(name), name: name.to_string(), kmers }
    }

    #[test]
    fn threshold2_creates_a_singleton_block() {
        let mut params = BuildParams::default();
        params.block_size = 4;
        params.kmer_threshold2 = 1000;

        let mut files: Vec<FileEntry> = (0..10).map(|i| entry(&format!("tiny{i}"), 10)).collect();
        files.push(entry("huge", 5000));
        files.extend((10..20).map(|i| entry(&format!("tiny{i}"), 10)));

        let blocks = form_blocks(files, &params);
        assert_eq!(blocks.iter().filter(|b| b.len() == 1 && b[0].name == "huge").count(), 1);
    }

    #[test]
    fn auto_block_size_is_a_multiple_of_eight_at_least_eight() {
        let params = BuildParams { block_size: 0, ..Default::default() };
        let files: Vec<FileEntry> = (0..100).map(|i| entry(&format!("f{i}"), 10)).collect();
        let blocks = form_blocks(files, &params);
        assert!(blocks.iter().all(|b| b.len() <= 100));
        assert!(blocks[0].len() >= 8 || blocks.len() == 1);
    }

    #[test]
    fn signature_size_grows_with_elements() {
        let small = signature_size(10, 3, 0.01);
        let large = signature_size(1000, 3, 0.01);
        assert!(large > small);
    }
}
