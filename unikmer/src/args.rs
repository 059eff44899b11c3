//! Clap-derive command surface. One struct per subcommand, mirroring the
//! shape of the CLI described in the file format's own documentation rather
//! than a generic options blob.

use clap::{Args, Parser, Subcommand};
use std::path::PathBuf;

#[derive(Parser, Debug)]
#[command(name = "unikmer", version, about = "k-mer set toolkit and BIGSI-style signature index")]
pub struct Cli {
    #[command(subcommand)]
    pub command: Command,
}

#[derive(Subcommand, Debug)]
pub enum Command {
    /// FASTA/FASTQ -> .unik
    Count(CountArgs),
    /// Union of .unik files
    Concat(ConcatArgs),
    /// Intersection of .unik files
    Inter(InterArgs),
    /// Difference of .unik files
    Diff(DiffArgs),
    /// Sort (optionally dedup) a .unik file
    Sort(SortArgs),
    /// Keep one in every w codes
    Sample(SampleArgs),
    /// Split a sorted, taxid-bearing .unik by taxid
    Tsplit(TsplitArgs),
    /// Keep codes whose taxid's rank passes an ordered-rank filter
    Rfilter(RfilterArgs),
    /// Build or search the signature index
    Db(DbArgs),
    /// Header inspection
    Info(InfoArgs),
    /// Print the k-mer count of a .unik file
    Num(NumArgs),
}

#[derive(Args, Debug)]
pub struct CountArgs {
    pub inputs: Vec<PathBuf>,
    #[arg(short, long, value_parser = clap::value_parser!(u8).range(1..=32), default_value_t = 21)]
    pub k: u8,
    #[arg(long)]
    pub canonical: bool,
    #[arg(long)]
    pub circular: bool,
    #[arg(long)]
    pub hashed: bool,
    #[arg(long)]
    pub scale: Option<u32>,
    #[arg(long)]
    pub minimizer_w: Option<usize>,
    #[arg(long)]
    pub syncmer_s: Option<usize>,
    #[arg(long)]
    pub sort: bool,
    #[arg(long, conflicts_with = "unique")]
    pub repeated: bool,
    #[arg(long, conflicts_with = "repeated")]
    pub unique: bool,
    #[arg(long)]
    pub linear: bool,
    #[arg(long)]
    pub taxid: Option<u32>,
    #[arg(long)]
    pub parse_taxid: bool,
    #[arg(long)]
    pub parse_taxid_regexp: Option<String>,
    #[arg(short, long)]
    pub out: PathBuf,
    #[arg(short, long, value_parser = clap::value_parser!(usize).range(3..), default_value_t = default_threads())]
    pub threads: usize,
}

#[derive(Args, Debug)]
pub struct ConcatArgs {
    pub inputs: Vec<PathBuf>,
    #[arg(short, long)]
    pub out: PathBuf,
}

#[derive(Args, Debug)]
pub struct InterArgs {
    pub inputs: Vec<PathBuf>,
    #[arg(short, long)]
    pub out: PathBuf,
}

#[derive(Args, Debug)]
pub struct DiffArgs {
    pub inputs: Vec<PathBuf>,
    #[arg(short, long)]
    pub out: PathBuf,
}

#[derive(Args, Debug)]
pub struct SortArgs {
    pub input: PathBuf,
    #[arg(short, long)]
    pub out: PathBuf,
    #[arg(short, long)]
    pub unique: bool,
}

#[derive(Args, Debug)]
pub struct SampleArgs {
    pub input: PathBuf,
    #[arg(short, long)]
    pub out: PathBuf,
    #[arg(short, long, value_parser = clap::value_parser!(u64).range(1..), default_value_t = 2)]
    pub window: u64,
    #[arg(short, long, default_value_t = 0)]
    pub start: u64,
}

#[derive(Args, Debug)]
pub struct TsplitArgs {
    pub input: PathBuf,
    #[arg(short, long)]
    pub out_dir: PathBuf,
}

#[derive(Args, Debug)]
pub struct RfilterArgs {
    pub input: PathBuf,
    #[arg(short, long)]
    pub out: PathBuf,
    #[arg(long)]
    pub nodes_dmp: PathBuf,
    #[arg(long, value_delimiter = ',')]
    pub ranks: Vec<String>,
}

#[derive(Args, Debug)]
pub struct DbArgs {
    #[command(subcommand)]
    pub action: DbAction,
}

#[derive(Subcommand, Debug)]
pub enum DbAction {
    Index(DbIndexArgs),
    Search(DbSearchArgs),
}

#[derive(Args, Debug)]
pub struct DbIndexArgs {
    pub inputs: Vec<PathBuf>,
    #[arg(short, long)]
    pub out_dir: PathBuf,
    #[arg(long, default_value = "unikmer")]
    pub name: String,
    #[arg(long, value_parser = clap::value_parser!(u8).range(1..=255), default_value_t = 3)]
    pub num_hashes: u8,
    #[arg(long, default_value_t = 0.01)]
    pub fpr: f64,
    #[arg(long, default_value_t = 0)]
    pub block_size: u32,
    #[arg(long, default_value_t = u64::MAX)]
    pub kmer_threshold1: u64,
    #[arg(long, default_value_t = u64::MAX)]
    pub kmer_threshold2: u64,
    #[arg(long, value_parser = clap::value_parser!(usize).range(1..), default_value_t = 512)]
    pub max_open_files: usize,
    #[arg(short, long, value_parser = clap::value_parser!(usize).range(3..), default_value_t = default_threads())]
    pub threads: usize,
}

#[derive(Args, Debug)]
pub struct DbSearchArgs {
    pub index_dir: PathBuf,
    pub queries: PathBuf,
    #[arg(long, default_value_t = 1.0)]
    pub query_cov: f64,
    #[arg(long, default_value_t = 0.0)]
    pub target_cov: f64,
    #[arg(short, long, value_parser = clap::value_parser!(usize).range(1..), default_value_t = default_threads())]
    pub threads: usize,
    #[arg(long, default_value_t = true)]
    pub mmap: bool,
}

#[derive(Args, Debug)]
pub struct InfoArgs {
    pub inputs: Vec<PathBuf>,
}

#[derive(Args, Debug)]
pub struct NumArgs {
    pub input: PathBuf,
}

fn default_threads() -> usize {
    num_cpus::get().max(3)
}
