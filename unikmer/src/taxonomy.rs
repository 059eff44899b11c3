//! NCBI taxonomy support for `rfilter`: loading `nodes.dmp`, walking
//! ancestor paths, and computing the LCA of a set of taxids.

use crate::error::{Result, UnikError};
use std::collections::HashMap;
use std::io::{BufRead, BufReader, Read};

pub const ROOT_TAXID: u32 = 1;

#[derive(Debug, Default)]
pub struct Taxonomy {
    parent_map: HashMap<u32, u32>,
    rank_map: HashMap<u32, String>,
    known_ranks: Vec<String>,
    path_cache: HashMap<u32, Vec<u32>>,
}

fn parse_dmp_line(line: &str) -> Option<(u32, u32, String)> {
    let mut fields = line.split("\t|\t");
    let taxid: u32 = fields.next()?.trim().parse().ok()?;
    let parent: u32 = fields.next()?.trim().parse().ok()?;
    let rank = fields.next()?.trim().to_string();
    Some((taxid, parent, rank))
}

impl Taxonomy {
    /// Parses an NCBI-style `nodes.dmp` (tab-pipe-tab delimited:
    /// `taxid | parent_taxid | rank | ...`).
    pub fn parse_nodes_file<R: Read>(reader: R) -> Result<Self> {
        let mut parent_map = HashMap::new();
        let mut rank_map = HashMap::new();
        let mut known_ranks = Vec::new();

        for line in BufReader::new(reader).lines() {
            let line = line?;
            let (taxid, parent, rank) = parse_dmp_line(&line).ok_or_else(|| {
                UnikError::InvalidFileFormat(format!("malformed nodes.dmp line: {line}"))
            })?;
            parent_map.insert(taxid, parent);
            if !known_ranks.contains(&rank) {
                known_ranks.push(rank.clone());
            }
            rank_map.insert(taxid, rank);
        }

        Ok(Taxonomy { parent_map, rank_map, known_ranks, path_cache: HashMap::new() })
    }

    pub fn rank_of(&self, taxid: u32) -> Option<&str> {
        self.rank_map.get(&taxid).map(|s| s.as_str())
    }

    pub fn known_ranks(&self) -> &[String] {
        &self.known_ranks
    }

    /// Ancestor path from `taxid` up to the root, inclusive of both ends;
    /// cached since `rfilter` and `lca` both walk it repeatedly.
    fn path_to_root(&mut self, taxid: u32) -> Vec<u32> {
        if let Some(path) = self.path_cache.get(&taxid) {
            return path.clone();
        }
        let mut path = Vec::new();
        let mut current = taxid;
        loop {
            path.push(current);
            if current == ROOT_TAXID {
                break;
            }
            match self.parent_map.get(&current) {
                Some(&parent) if parent != current => current = parent,
                _ => break,
            }
        }
        self.path_cache.insert(taxid, path.clone());
        path
    }

    /// The lowest common ancestor of two taxids: walk both root paths and
    /// take the last taxid shared by a common prefix (both paths are stored
    /// root-last, so this compares from the end inward).
    pub fn lca(&mut self, a: u32, b: u32) -> u32 {
        if a == b {
            return a;
        }
        let path_a = self.path_to_root(a);
        let path_b = self.path_to_root(b);
        let set_b: std::collections::HashSet<u32> = path_b.iter().copied().collect();
        for &ancestor in &path_a {
            if set_b.contains(&ancestor) {
                return ancestor;
            }
        }
        ROOT_TAXID
    }

    /// Folds `lca` over a whole slice of taxids — used to merge the taxid of
    /// a k-mer observed under multiple taxids into a single consensus.
    pub fn lca_of_all(&mut self, taxids: &[u32]) -> u32 {
        let mut iter = taxids.iter().copied();
        let Some(first) = iter.next() else { return ROOT_TAXID };
        iter.fold(first, |acc, taxid| self.lca(acc, taxid))
    }

    /// True if `taxid`'s rank (or an ancestor's) matches `allowed_ranks`, in
    /// the order given — the `rfilter` DSL's "ordered rank filter".
    pub fn rank_passes(&mut self, taxid: u32, allowed_ranks: &[String]) -> bool {
        let path = self.path_to_root(taxid);
        for ancestor in path {
            if let Some(rank) = self.rank_of(ancestor) {
                if allowed_ranks.iter().any(|r| r == rank) {
                    return true;
                }
            }
        }
        false
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sample_nodes() -> &'static str {
        "1\t|\t1\t|\tno rank\t|\n\
         2\t|\t1\t|\tsuperkingdom\t|\n\
         9\t|\t2\t|\tgenus\t|\n\
         10\t|\t9\t|\tspecies\t|\n\
         11\t|\t9\t|\tspecies\t|\n"
    }

    #[test]
    fn parses_nodes_and_computes_lca() {
        let mut tax = Taxonomy::parse_nodes_file(sample_nodes().as_bytes()).unwrap();
        assert_eq!(tax.lca(10, 11), 9);
        assert_eq!(tax.lca(10, 2), 2);
        assert_eq!(tax.lca(10, 10), 10);
    }

    #[test]
    fn lca_of_all_folds_across_many_taxids() {
        let mut tax = Taxonomy::parse_nodes_file(sample_nodes().as_bytes()).unwrap();
        assert_eq!(tax.lca_of_all(&[10, 11, 9]), 9);
    }

    #[test]
    fn rank_passes_checks_ancestors() {
        let mut tax = Taxonomy::parse_nodes_file(sample_nodes().as_bytes()).unwrap();
        assert!(tax.rank_passes(10, &["genus".to_string()]));
        assert!(!tax.rank_passes(10, &["family".to_string()]));
    }
}
