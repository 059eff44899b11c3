mod fasta;
mod fastq;
mod parallel;
mod reader;
mod seq;

pub use fasta::FastaReader;
pub use fastq::FastqReader;
pub use parallel::{read_parallel, ParallelResult};
pub use reader::{detect_file_format, dyn_reader, open_file, Reader, BUFSIZE};
pub use seq::{SeqFormat, Sequence};
