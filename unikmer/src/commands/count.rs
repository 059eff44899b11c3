//! `count`: FASTA/FASTQ -> `.unik`.

use crate::args::CountArgs;
use crate::error::Result;
use crate::setops::UniqMode;
use crate::source::{HashedSource, KmerSource, MinimizerSource, PlainSource, ScanParams, SyncmerSource};
use crate::unikfile::header::{
    CANONICAL, HAS_GLOBAL_TAXID, HAS_NUMBER, HASHED, INCLUDE_TAXID, SCALED, SORTED,
};
use crate::unikfile::{Header, Writer};
use regex::Regex;
use std::collections::HashMap;
use std::fs::File;
use std::io::BufWriter;
use unikseq::{detect_file_format, dyn_reader, read_parallel, FastaReader, FastqReader, Reader, SeqFormat};

fn scan_params(args: &CountArgs) -> ScanParams {
    ScanParams {
        k: args.k as usize,
        canonical: args.canonical,
        scale: args.scale,
        minimizer_w: args.minimizer_w,
        syncmer_s: args.syncmer_s,
    }
}

fn make_source(seq: &[u8], args: &CountArgs) -> KmerSource {
    let params = scan_params(args);
    if args.minimizer_w.is_some() {
        KmerSource::Minimizer(MinimizerSource::new(seq, params))
    } else if args.syncmer_s.is_some() {
        KmerSource::Syncmer(SyncmerSource::new(seq, params))
    } else if args.hashed || args.scale.is_some() {
        KmerSource::Hashed(HashedSource::new(seq, params))
    } else {
        KmerSource::Plain(PlainSource::new(seq, params))
    }
}

fn parse_taxid_from_id(id: &str, regexp: &Option<String>) -> Option<u32> {
    let pattern = regexp.as_deref().unwrap_or(r"(\d+)");
    let re = Regex::new(pattern).ok()?;
    let caps = re.captures(id)?;
    caps.get(1)?.as_str().parse().ok()
}

fn scan_file(path: &std::path::Path, args: &CountArgs) -> Result<Vec<(u64, Option<u32>)>> {
    let fmt = detect_file_format(path)?;
    let mut reader: Box<dyn Reader> = match fmt {
        SeqFormat::Fasta => Box::new(FastaReader::from_path(path, 0)?),
        SeqFormat::Fastq => Box::new(FastqReader::from_path(path, 0)?),
    };

    let want_taxid = args.taxid.is_some() || args.parse_taxid;
    let threads = args.threads.max(3);

    read_parallel(
        reader.as_mut(),
        threads,
        threads * 2,
        |seqs| -> Vec<(u64, Option<u32>)> {
            let mut out = Vec::new();
            for seq in &seqs {
                let taxid = if let Some(fixed) = args.taxid {
                    Some(fixed)
                } else if want_taxid {
                    parse_taxid_from_id(&seq.id, &args.parse_taxid_regexp)
                } else {
                    None
                };
                for (code, _idx) in make_source(&seq.seq, args) {
                    out.push((code, taxid));
                }
            }
            out
        },
        |collector| {
            let mut all = Vec::new();
            while let Some(mut batch) = collector.next() {
                all.append(&mut batch);
            }
            all
        },
    )
    .map_err(Into::into)
}

pub fn run(args: &CountArgs) -> Result<()> {
    let mut all_codes: Vec<(u64, Option<u32>)> = Vec::new();
    for input in &args.inputs {
        all_codes.extend(scan_file(input, args)?);
    }

    if args.repeated || args.unique {
        // `--unique` dedups to the distinct k-mer set (one entry per code,
        // regardless of multiplicity); `--repeated` keeps only codes seen
        // at least twice. The seen-exactly-once filter this two-state map
        // could also express is reserved for the `uniq` kernel elsewhere.
        let mode = if args.repeated { UniqMode::RepeatedOnly } else { UniqMode::All };
        let mut seen: HashMap<u64, bool> = HashMap::new();
        for (code, _) in &all_codes {
            seen.entry(*code).and_modify(|twice| *twice = true).or_insert(false);
        }
        let keep: std::collections::HashSet<u64> = match mode {
            UniqMode::All => seen.into_keys().collect(),
            UniqMode::RepeatedOnly => seen.into_iter().filter(|&(_, twice)| twice).map(|(c, _)| c).collect(),
            UniqMode::UniqueOnly => seen.into_iter().filter(|&(_, twice)| !twice).map(|(c, _)| c).collect(),
        };
        // Keep one instance per surviving code rather than every repeat.
        let mut first_seen = std::collections::HashSet::with_capacity(keep.len());
        all_codes.retain(|(code, _)| keep.contains(code) && first_seen.insert(*code));
    }

    if args.sort || args.repeated || args.unique {
        all_codes.sort_by_key(|&(code, _)| code);
    }

    let mut header = Header::new(args.k);
    header.set_flag(CANONICAL, args.canonical);
    header.set_flag(HASHED, args.hashed || args.scale.is_some());
    header.set_flag(SCALED, args.scale.is_some());
    header.scale = args.scale;
    header.set_flag(SORTED, args.sort || args.repeated || args.unique);
    header.set_flag(HAS_NUMBER, true);
    header.number = Some(-1);

    if let Some(fixed_taxid) = args.taxid {
        header.set_flag(HAS_GLOBAL_TAXID, true);
        header.global_taxid = Some(fixed_taxid);
    } else if args.parse_taxid {
        header.set_flag(INCLUDE_TAXID, true);
        let max_taxid = all_codes.iter().filter_map(|(_, t)| *t).max().unwrap_or(0);
        header.max_taxid = Some(max_taxid);
    }

    let file = File::create(&args.out)?;
    if header.is_sorted() {
        let mut writer = Writer::new(file, header)?;
        for (code, taxid) in &all_codes {
            match taxid {
                Some(t) => writer.write_code_with_taxid(*code, *t)?,
                None => writer.write_code(*code)?,
            }
        }
        writer.finalize()?;
    } else {
        let mut writer = Writer::new(BufWriter::new(file), header)?;
        for (code, taxid) in &all_codes {
            match taxid {
                Some(t) => writer.write_code_with_taxid(*code, *t)?,
                None => writer.write_code(*code)?,
            }
        }
        writer.flush()?;
    }

    Ok(())
}
