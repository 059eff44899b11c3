//! K-mer-set algebra kernels operating over one or more `.unik` files —
//! union, intersection, difference, uniq/count, sort, and taxid-bucketed
//! split.

use crate::error::{Result, UnikError};
use crate::unikfile::header::Header;
use crate::unikfile::{Reader, Writer};
use rayon::prelude::*;
use std::collections::HashMap;
use std::fs::File;
use std::io::{BufReader, BufWriter};
use std::path::Path;

pub(crate) fn open_reader(path: &Path) -> Result<Reader<BufReader<File>>> {
    let file = File::open(path)?;
    Reader::new(BufReader::new(file))
}

/// **Union (concat)**: appends every file's codes in order. The first
/// file's `k` fixes the output; any later mismatch is fatal.
pub fn concat(paths: &[&Path], out: &mut Writer<impl std::io::Write>) -> Result<u64> {
    let mut k = None;
    let mut total = 0u64;
    for path in paths {
        let mut reader = open_reader(path)?;
        match k {
            None => k = Some(reader.header.k),
            Some(k0) if k0 != reader.header.k => {
                return Err(UnikError::IncompatibleHeader(format!(
                    "{}: k={} does not match first file's k={}",
                    path.display(),
                    reader.header.k,
                    k0
                )))
            }
            _ => {}
        }
        while let Some(code) = reader.read_code()? {
            out.write_code(code)?;
            total += 1;
        }
    }
    Ok(total)
}

/// **Intersection**: load the first file into a mark map, then for each
/// later file mark codes present and drop everything unmarked at the end of
/// that file. Terminates early (emitting nothing further) once the map is
/// empty.
pub fn intersect(paths: &[&Path]) -> Result<Vec<u64>> {
    if paths.is_empty() {
        return Ok(Vec::new());
    }
    let mut marks: HashMap<u64, bool> = {
        let mut reader = open_reader(paths[0])?;
        let mut map = HashMap::new();
        while let Some(code) = reader.read_code()? {
            map.insert(code, false);
        }
        map
    };

    for path in &paths[1..] {
        if marks.is_empty() {
            return Ok(Vec::new());
        }
        let mut reader = open_reader(path)?;
        while let Some(code) = reader.read_code()? {
            if let Some(flag) = marks.get_mut(&code) {
                *flag = true;
            }
        }
        marks.retain(|_, &mut marked| marked);
        marks.values_mut().for_each(|flag| *flag = false);
    }

    let mut result: Vec<u64> = marks.into_keys().collect();
    result.sort_unstable();
    Ok(result)
}

/// **Difference**: codes of the first file minus every later file's codes.
/// Files after the first are processed in parallel, each worker holding its
/// own clone of the running set; the final result is the intersection of
/// all workers' remaining sets (equivalently, codes surviving every
/// worker's deletions).
pub fn difference(paths: &[&Path]) -> Result<Vec<u64>> {
    if paths.is_empty() {
        return Ok(Vec::new());
    }
    let base: std::collections::HashSet<u64> = {
        let mut reader = open_reader(paths[0])?;
        let mut set = std::collections::HashSet::new();
        while let Some(code) = reader.read_code()? {
            set.insert(code);
        }
        set
    };

    let rest = &paths[1..];
    let results: Result<Vec<std::collections::HashSet<u64>>> = rest
        .par_iter()
        .map(|path| -> Result<std::collections::HashSet<u64>> {
            let mut remaining = base.clone();
            let mut reader = open_reader(path)?;
            while let Some(code) = reader.read_code()? {
                remaining.remove(&code);
            }
            Ok(remaining)
        })
        .collect();

    let sets = results?;
    let mut final_set = base;
    for set in sets {
        final_set = final_set.intersection(&set).copied().collect();
    }
    let mut out: Vec<u64> = final_set.into_iter().collect();
    out.sort_unstable();
    Ok(out)
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum UniqMode {
    /// Every distinct code, once.
    All,
    /// Only codes seen at least twice.
    RepeatedOnly,
    /// Only codes seen exactly once.
    UniqueOnly,
}

/// **Uniq/count**: a two-state seen-map (`false` = seen once, `true` = seen
/// ≥ twice) drives all three modes without a separate counting pass.
pub fn uniq(paths: &[&Path], mode: UniqMode) -> Result<Vec<u64>> {
    let mut seen: HashMap<u64, bool> = HashMap::new();
    for path in paths {
        let mut reader = open_reader(path)?;
        while let Some(code) = reader.read_code()? {
            seen.entry(code).and_modify(|seen_twice| *seen_twice = true).or_insert(false);
        }
    }
    let mut out: Vec<u64> = match mode {
        UniqMode::All => seen.into_keys().collect(),
        UniqMode::RepeatedOnly => seen.into_iter().filter(|&(_, twice)| twice).map(|(c, _)| c).collect(),
        UniqMode::UniqueOnly => seen.into_iter().filter(|&(_, twice)| !twice).map(|(c, _)| c).collect(),
    };
    out.sort_unstable();
    Ok(out)
}

/// **Sort**: collect, sort ascending, optionally dedup in one pass against
/// a `last` register.
pub fn sort(path: &Path, dedup: bool) -> Result<Vec<u64>> {
    let mut reader = open_reader(path)?;
    let mut codes = reader.read_all()?;
    codes.sort_unstable();
    if dedup {
        let mut out = Vec::with_capacity(codes.len());
        let mut last: Option<u64> = None;
        for code in codes {
            if last != Some(code) {
                out.push(code);
                last = Some(code);
            }
        }
        Ok(out)
    } else {
        Ok(codes)
    }
}

/// Writes a previously-sorted code slice to `out`, setting the `SORTED`
/// flag and the final count.
pub fn write_sorted_codes(codes: &[u64], mut header: Header, sink: impl std::io::Write + std::io::Seek) -> Result<()> {
    header.set_flag(crate::unikfile::header::SORTED, true);
    header.set_flag(crate::unikfile::header::HAS_NUMBER, true);
    header.number = Some(-1);
    let mut writer = Writer::new(sink, header)?;
    for &code in codes {
        writer.write_code(code)?;
    }
    writer.finalize()?;
    Ok(())
}

/// **tsplit**: streams a single sorted, taxid-bearing file, bucketing codes
/// by taxid into one `.unik` file per taxid seen, each `SORTED` (the input
/// already is) with the bucket's taxid promoted to `globalTaxid`.
pub fn tsplit(path: &Path, out_dir: &Path) -> Result<Vec<(u32, u64)>> {
    let mut reader = open_reader(path)?;
    if !reader.header.is_sorted() {
        return Err(UnikError::NotSorted);
    }
    let k = reader.header.k;

    let mut buckets: HashMap<u32, Vec<u64>> = HashMap::new();
    while let Some((code, taxid)) = reader.read_code_with_taxid()? {
        buckets.entry(taxid).or_default().push(code);
    }

    let mut summary = Vec::new();
    for (taxid, codes) in buckets {
        let mut header = Header::new(k);
        header.set_flag(crate::unikfile::header::HAS_GLOBAL_TAXID, true);
        header.global_taxid = Some(taxid);
        let path = out_dir.join(format!("{taxid}.unik"));
        let file = File::create(&path)?;
        write_sorted_codes(&codes, header, file)?;
        summary.push((taxid, codes.len() as u64));
    }
    summary.sort_by_key(|&(taxid, _)| taxid);
    Ok(summary)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::unikfile::header::{HAS_NUMBER, SORTED};
    use tempfile::tempdir;

    fn write_unik(path: &Path, k: u8, codes: &[u64]) {
        let mut header = Header::new(k);
        header.set_flag(HAS_NUMBER, true);
        header.number = Some(-1);
        let file = File::create(path).unwrap();
        let mut writer = Writer::new(BufWriter::new(file), header).unwrap();
        for &code in codes {
            writer.write_code(code).unwrap();
        }
        writer.finalize().unwrap();
    }

    #[test]
    fn concat_appends_in_order() {
        let dir = tempdir().unwrap();
        let a = dir.path().join("a.unik");
        let b = dir.path().join("b.unik");
        write_unik(&a, 4, &[1, 2]);
        write_unik(&b, 4, &[3, 4]);

        let out_path = dir.path().join("out.unik");
        let mut header = Header::new(4);
        header.set_flag(HAS_NUMBER, true);
        let out_file = File::create(&out_path).unwrap();
        let mut writer = Writer::new(BufWriter::new(out_file), header).unwrap();
        let total = concat(&[a.as_path(), b.as_path()], &mut writer).unwrap();
        writer.finalize().unwrap();
        assert_eq!(total, 4);
    }

    #[test]
    fn intersect_of_disjoint_sets_is_empty() {
        let dir = tempdir().unwrap();
        let a = dir.path().join("a.unik");
        let b = dir.path().join("b.unik");
        write_unik(&a, 4, &[0b0000_0000, 0b0101_0101]);
        write_unik(&b, 4, &[0b1010_1010, 0b1111_1111]);

        let result = intersect(&[a.as_path(), b.as_path()]).unwrap();
        assert!(result.is_empty());
    }

    #[test]
    fn difference_of_identical_sets_is_empty() {
        let dir = tempdir().unwrap();
        let a = dir.path().join("a.unik");
        write_unik(&a, 4, &[1, 2, 3]);

        let result = difference(&[a.as_path(), a.as_path()]).unwrap();
        assert!(result.is_empty());
    }

    #[test]
    fn uniq_repeated_only_keeps_duplicates() {
        let dir = tempdir().unwrap();
        let a = dir.path().join("a.unik");
        write_unik(&a, 4, &[1, 1, 2, 3, 3, 3]);

        let repeated = uniq(&[a.as_path()], UniqMode::RepeatedOnly).unwrap();
        assert_eq!(repeated, vec![1, 3]);

        let unique = uniq(&[a.as_path()], UniqMode::UniqueOnly).unwrap();
        assert_eq!(unique, vec![2]);
    }

    #[test]
    fn sort_dedup_removes_repeats() {
        let dir = tempdir().unwrap();
        let a = dir.path().join("a.unik");
        write_unik(&a, 4, &[3, 1, 2, 1, 3]);

        let sorted = sort(&a, true).unwrap();
        assert_eq!(sorted, vec![1, 2, 3]);
    }

    #[test]
    fn tsplit_requires_sorted_input() {
        let dir = tempdir().unwrap();
        let a = dir.path().join("a.unik");
        write_unik(&a, 4, &[1, 2]);
        let result = tsplit(&a, dir.path());
        assert!(matches!(result, Err(UnikError::NotSorted)));
    }

    #[test]
    fn tsplit_buckets_by_taxid() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("in.unik");
        let mut header = Header::new(4);
        header.set_flag(SORTED, true);
        header.set_flag(HAS_NUMBER, true);
        header.set_flag(crate::unikfile::header::INCLUDE_TAXID, true);
        header.max_taxid = Some(1000);
        let file = File::create(&path).unwrap();
        let mut writer = Writer::new(BufWriter::new(file), header).unwrap();
        writer.write_code_with_taxid(1, 10).unwrap();
        writer.write_code_with_taxid(2, 10).unwrap();
        writer.write_code_with_taxid(3, 20).unwrap();
        writer.finalize().unwrap();

        let summary = tsplit(&path, dir.path()).unwrap();
        assert_eq!(summary, vec![(10, 2), (20, 1)]);
    }
}
