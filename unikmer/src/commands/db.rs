//! `db index` / `db search`: build and query the BIGSI-style signature
//! index.

use crate::args::{DbArgs, DbIndexArgs, DbSearchArgs, DbAction};
use crate::concurrency::get_file_limit;
use crate::error::{Result, UnikError};
use crate::index::{build_index, search_block, BlockReader, BuildParams, FileEntry, Match, SearchParams, UnikIndexDB};
use crate::setops::open_reader;
use crate::source::{KmerSource, PlainSource, ScanParams};
use rayon::prelude::*;
use std::path::{Path, PathBuf};
use unikseq::{detect_file_format, read_parallel, FastaReader, FastqReader, Reader, SeqFormat};
use walkdir::WalkDir;

pub fn run(args: &DbArgs) -> Result<()> {
    match &args.action {
        DbAction::Index(index_args) => run_index(index_args),
        DbAction::Search(search_args) => run_search(search_args),
    }
}

fn run_index(args: &DbIndexArgs) -> Result<()> {
    if args.inputs.is_empty() {
        return Err(UnikError::ConfigError("db index requires at least one input".into()));
    }

    let pool = rayon::ThreadPoolBuilder::new()
        .num_threads(args.threads.max(1))
        .build()
        .map_err(|e| UnikError::ConfigError(format!("failed to build thread pool: {e}")))?;

    let first_header = open_reader(&args.inputs[0])?.header;
    // Leave some headroom under the OS's own limit for stdio, the manifest
    // file, and whatever else the process already has open.
    let fd_headroom = 16;
    let max_open_files = args.max_open_files.min(get_file_limit().saturating_sub(fd_headroom).max(1));
    if max_open_files < args.max_open_files {
        log::warn!(
            "--max-open-files {} exceeds this process's open-file limit; using {} instead",
            args.max_open_files,
            max_open_files
        );
    }
    let params = BuildParams {
        k: first_header.k,
        fpr: args.fpr,
        num_hashes: args.num_hashes,
        block_size: args.block_size,
        kmer_threshold1: args.kmer_threshold1,
        kmer_threshold2: args.kmer_threshold2,
        max_open_files,
        canonical: first_header.is_canonical(),
        hashed: first_header.is_hashed(),
        scaled: first_header.is_scaled(),
        scale: first_header.scale,
        ..Default::default()
    };

    let entries: Result<Vec<FileEntry>> = args
        .inputs
        .iter()
        .map(|path| -> Result<FileEntry> {
            let header = open_reader(path)?.header;
            header.compatible_with(&first_header)?;
            let kmers = match header.number {
                Some(n) if n >= 0 => n as u64,
                _ => {
                    return Err(UnikError::NumberUnknown(format!(
                        "{}: index build requires a known k-mer count",
                        path.display()
                    )))
                }
            };
            let name = path
                .file_stem()
                .map(|s| s.to_string_lossy().into_owned())
                .unwrap_or_else(|| path.display().to_string());
            Ok(FileEntry { path: path.clone(), name, kmers })
        })
        .collect();
    let entries = entries?;

    let db = pool.install(|| build_index(entries, params, &args.out_dir, &args.name))?;
    log::info!(
        "wrote index {} with {} files across {} blocks",
        args.name,
        db.names.len(),
        db.files.len()
    );
    Ok(())
}

fn find_manifest(index_dir: &Path) -> Result<PathBuf> {
    let mut found = None;
    for entry in WalkDir::new(index_dir).max_depth(1).into_iter().flatten() {
        let path = entry.path();
        if path.extension().and_then(|e| e.to_str()) == Some("yml")
            && path.file_name().and_then(|n| n.to_str()).is_some_and(|n| n.ends_with("_db.yml"))
        {
            found = Some(path.to_path_buf());
            break;
        }
    }
    found.ok_or_else(|| UnikError::ConfigError(format!("no *_db.yml manifest found under {}", index_dir.display())))
}

fn scan_queries(path: &Path, k: u8, canonical: bool) -> Result<Vec<u64>> {
    let fmt = detect_file_format(path)?;
    let mut reader: Box<dyn Reader> = match fmt {
        SeqFormat::Fasta => Box::new(FastaReader::from_path(path, 0)?),
        SeqFormat::Fastq => Box::new(FastqReader::from_path(path, 0)?),
    };
    let params = ScanParams::new(k as usize, canonical);
    let threads = num_cpus::get().max(3);

    read_parallel(
        reader.as_mut(),
        threads,
        threads * 2,
        move |seqs| -> Vec<u64> {
            let mut out = Vec::new();
            for seq in &seqs {
                for (code, _idx) in KmerSource::Plain(PlainSource::new(&seq.seq, params)) {
                    out.push(code);
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

fn run_search(args: &DbSearchArgs) -> Result<()> {
    let manifest_path = find_manifest(&args.index_dir)?;
    let db = UnikIndexDB::read_from(&manifest_path)?;

    let pool = rayon::ThreadPoolBuilder::new()
        .num_threads(args.threads.max(1))
        .build()
        .map_err(|e| UnikError::ConfigError(format!("failed to build thread pool: {e}")))?;

    let mut queries = scan_queries(&args.queries, db.k, db.canonical)?;
    if db.hashed {
        queries = queries.into_iter().map(crate::hash::hash64).collect();
    }

    let search_params = SearchParams { query_coverage: args.query_cov, target_coverage: args.target_cov };
    let matches: Result<Vec<Vec<Match>>> = pool.install(|| {
        db.files
            .par_iter()
            .map(|file_name| -> Result<Vec<Match>> {
                let block_path = args.index_dir.join(file_name);
                let block = BlockReader::open(&block_path)?;
                Ok(search_block(&block, &queries, search_params))
            })
            .collect()
    });

    for m in matches?.into_iter().flatten() {
        println!(
            "{}\t{}\tqcov={:.4}\ttcov={:.4}",
            m.name, m.count, m.query_coverage, m.target_coverage
        );
    }
    Ok(())
}
