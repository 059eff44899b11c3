//! Answers "which of this block's files contain these k-mers" queries by
//! ANDing per-hash rows and running a position popcount over batches of the
//! AND results.

use super::block::BlockReader;
use super::popcount::{accumulate_batch, flatten_counts, TILE_ROWS};
use crate::hash::hash_locations;

#[derive(Debug, Clone, Copy)]
pub struct SearchParams {
    pub query_coverage: f64,
    pub target_coverage: f64,
}

#[derive(Debug, Clone, PartialEq)]
pub struct Match {
    pub name: String,
    pub count: u64,
    pub query_coverage: f64,
    pub target_coverage: f64,
}

/// ANDs together the `numHashes` rows a single query code maps to.
fn and_rows(block: &BlockReader, code: u64) -> Vec<u8> {
    let locs = hash_locations(code, block.header.num_hashes as usize, block.header.num_sigs);
    let mut acc: Option<Vec<u8>> = None;
    for loc in locs {
        let row = block.row(loc);
        acc = Some(match acc {
            None => row.to_vec(),
            Some(mut a) => {
                for (x, &y) in a.iter_mut().zip(row.iter()) {
                    *x &= y;
                }
                a
            }
        });
    }
    acc.unwrap_or_else(|| vec![0u8; block.header.num_row_bytes as usize])
}

/// Queries a single block with an already-prepared list of query codes
/// (hashed by the caller when the database is `hashed`). Codes may repeat;
/// repeats are counted with multiplicity.
pub fn search_block(block: &BlockReader, queries: &[u64], params: SearchParams) -> Vec<Match> {
    let num_row_bytes = block.header.num_row_bytes as usize;
    let num_names = block.header.names.len();
    let mut counts = vec![[0u64; 8]; num_row_bytes];

    let mut tile: Vec<Vec<u8>> = Vec::with_capacity(TILE_ROWS);
    for &code in queries {
        tile.push(and_rows(block, code));
        if tile.len() == TILE_ROWS {
            accumulate_batch(&tile, num_row_bytes, &mut counts);
            tile.clear();
        }
    }
    if !tile.is_empty() {
        accumulate_batch(&tile, num_row_bytes, &mut counts);
    }

    let m = flatten_counts(&counts, num_names);
    let total_queries = queries.len() as f64;

    let mut matches = Vec::new();
    for (i, &hits) in m.iter().enumerate() {
        if hits == 0 {
            continue;
        }
        let qcov = hits as f64 / total_queries;
        if qcov < params.query_coverage {
            continue;
        }
        let tcov = hits as f64 / block.header.sizes[i].max(1) as f64;
        if tcov < params.target_coverage {
            continue;
        }
        matches.push(Match {
            name: block.header.names[i].clone(),
            count: hits,
            query_coverage: qcov,
            target_coverage: tcov,
        });
    }
    matches
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::index::builder::{build_block, BuildParams, FileEntry};
    use crate::unikfile::header::{Header, HAS_NUMBER, SORTED};
    use crate::unikfile::Writer;
    use std::fs::File;
    use std::io::BufWriter;
    use tempfile::tempdir;

    fn write_unik(path: &std::path::Path, k: u8, codes: &[u64]) {
        let mut header = Header::new(k);
        header.set_flag(SORTED, true);
        header.set_flag(HAS_NUMBER, true);
        let file = File::create(path).unwrap();
        let mut writer = Writer::new(BufWriter::new(file), header).unwrap();
        let mut sorted = codes.to_vec();
        sorted.sort_unstable();
        for code in sorted {
            writer.write_code(code).unwrap();
        }
        writer.finalize().unwrap();
    }

    #[test]
    fn exact_self_query_hits_full_coverage() {
        let dir = tempdir().unwrap();
        let a_path = dir.path().join("a.unik");
        let a_codes: Vec<u64> = (0..10).collect();
        write_unik(&a_path, 16, &a_codes);

        let b_path = dir.path().join("b.unik");
        write_unik(&b_path, 16, &(100..110).collect::<Vec<_>>());

        let c_path = dir.path().join("c.unik");
        write_unik(&c_path, 16, &(200..210).collect::<Vec<_>>());

        let entries = vec![
            FileEntry { path: a_path, name: "a".into(), kmers: 10 },
            FileEntry { path: b_path, name: "b".into(), kmers: 10 },
            FileEntry { path: c_path, name: "c".into(), kmers: 10 },
        ];
        let mut params = BuildParams::default();
        params.k = 16;
        params.num_hashes = 2;
        params.fpr = 0.01;
        params.block_size = 8;

        let block_path = dir.path().join("block_00000.idx");
        let sem = crate::concurrency::FileSemaphore::new(8);
        build_block(&entries, &params, &sem, &block_path).unwrap();

        let block = BlockReader::open(&block_path).unwrap();
        let hashed_queries: Vec<u64> = a_codes.iter().map(|&c| crate::hash::hash64(c)).collect();
        let search_params = SearchParams { query_coverage: 1.0, target_coverage: 1.0 };
        let matches = search_block(&block, &hashed_queries, search_params);

        assert_eq!(matches.len(), 1);
        assert_eq!(matches[0].name, "a");
        assert_eq!(matches[0].count, 10);
    }
}
