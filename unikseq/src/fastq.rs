use crate::reader::{dyn_reader, trim_end, Reader, BUFSIZE};
use crate::seq::{SeqFormat, Sequence};
use std::io::{BufRead, BufReader, Read, Result};
use std::path::Path;

/// Streams FASTQ records (4 lines each), discarding quality scores — this
/// crate only ever hands bases on to a k-mer source.
pub struct FastqReader<R>
where
    R: Read + Send,
{
    reader: BufReader<R>,
    file_index: usize,
    reads_index: usize,
    header: Vec<u8>,
    seq: Vec<u8>,
    plus: Vec<u8>,
    qual: Vec<u8>,
    batch_size: usize,
}

impl<R> FastqReader<R>
where
    R: Read + Send,
{
    pub fn new(reader: R, file_index: usize) -> Self {
        Self::with_capacity(reader, file_index, BUFSIZE, 30)
    }

    pub fn with_capacity(reader: R, file_index: usize, capacity: usize, batch_size: usize) -> Self {
        assert!(capacity >= 3);
        Self {
            reader: BufReader::with_capacity(capacity, reader),
            file_index,
            reads_index: 0,
            header: Vec::new(),
            seq: Vec::new(),
            plus: Vec::new(),
            qual: Vec::new(),
            batch_size,
        }
    }

    fn next_record(&mut self) -> Result<Option<Sequence>> {
        self.header.clear();
        if self.reader.read_until(b'\n', &mut self.header)? == 0 {
            return Ok(None);
        }
        self.seq.clear();
        self.reader.read_until(b'\n', &mut self.seq)?;
        trim_end(&mut self.seq);

        self.plus.clear();
        self.reader.read_until(b'\n', &mut self.plus)?;

        self.qual.clear();
        self.reader.read_until(b'\n', &mut self.qual)?;

        let id = unsafe {
            let slice = if self.header.starts_with(b"@") {
                &self.header[1..]
            } else {
                &self.header[..]
            };
            let s = std::str::from_utf8_unchecked(slice);
            let first_space = s.as_bytes().iter().position(|&c| c == b' ' || c == b'\n' || c == b'\r').unwrap_or(s.len());
            s[..first_space].to_owned()
        };
        self.reads_index += 1;

        Ok(Some(Sequence {
            file_index: self.file_index,
            reads_index: self.reads_index,
            id,
            seq: std::mem::take(&mut self.seq),
            format: SeqFormat::Fastq,
        }))
    }
}

impl FastqReader<Box<dyn Read + Send>> {
    pub fn from_path<P: AsRef<Path>>(path: P, file_index: usize) -> Result<Self> {
        Ok(Self::new(dyn_reader(path)?, file_index))
    }
}

impl<R: Read + Send> Reader for FastqReader<R> {
    fn next(&mut self) -> Result<Option<Vec<Sequence>>> {
        let mut seqs = Vec::new();
        for _ in 0..self.batch_size {
            match self.next_record()? {
                Some(seq) => seqs.push(seq),
                None => break,
            }
        }
        Ok(if seqs.is_empty() { None } else { Some(seqs) })
    }
}
