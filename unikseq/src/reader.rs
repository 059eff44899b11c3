use crate::seq::{SeqFormat, Sequence};
use flate2::read::GzDecoder;
use std::fs::File;
use std::io::{self, Read, Result, Seek};
use std::path::Path;

pub const BUFSIZE: usize = 8 * 1024 * 1024;

/// Opens `path`, transparently wrapping it in a gzip decoder when its first
/// two bytes are the gzip magic. Everything downstream sees plain bytes.
pub fn dyn_reader<P: AsRef<Path>>(path: P) -> Result<Box<dyn Read + Send>> {
    let mut file = open_file(path)?;
    if is_gzipped(&mut file)? {
        Ok(Box::new(GzDecoder::new(file)))
    } else {
        Ok(Box::new(file))
    }
}

fn is_gzipped(file: &mut File) -> Result<bool> {
    let mut buffer = [0; 2];
    file.read_exact(&mut buffer)?;
    file.rewind()?;
    Ok(buffer == [0x1F, 0x8B])
}

pub fn open_file<P: AsRef<Path>>(path: P) -> Result<File> {
    File::open(&path).map_err(|e| {
        if e.kind() == io::ErrorKind::NotFound {
            io::Error::new(e.kind(), format!("file not found: {:?}", path.as_ref()))
        } else {
            e
        }
    })
}

pub fn trim_end(buffer: &mut Vec<u8>) {
    while let Some(&b'\n' | &b'\r') = buffer.last() {
        buffer.pop();
    }
}

/// Sniffs the first non-empty byte of a file to tell FASTA from FASTQ without
/// consuming the caller's own reader.
pub fn detect_file_format<P: AsRef<Path>>(path: P) -> Result<SeqFormat> {
    let mut reader = dyn_reader(path)?;
    let mut buf = [0u8; 1];
    loop {
        let n = reader.read(&mut buf)?;
        if n == 0 {
            return Err(io::Error::new(io::ErrorKind::UnexpectedEof, "empty input"));
        }
        match buf[0] {
            b'>' => return Ok(SeqFormat::Fasta),
            b'@' => return Ok(SeqFormat::Fastq),
            b'\n' | b'\r' => continue,
            other => {
                return Err(io::Error::new(
                    io::ErrorKind::InvalidData,
                    format!("unrecognized sequence format, first byte {:?}", other as char),
                ))
            }
        }
    }
}

/// A batch-producing record source. Implementors hand back `Some` batches of
/// up to some internal limit until the input is exhausted, then `None` once.
pub trait Reader: Send {
    fn next(&mut self) -> Result<Option<Vec<Sequence>>>;
}
