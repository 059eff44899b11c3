use crate::reader::{dyn_reader, trim_end, Reader, BUFSIZE};
use crate::seq::{SeqFormat, Sequence};
use std::io::{BufRead, BufReader, Read, Result};
use std::path::Path;

/// Streams FASTA records in batches of `batch_size`.
pub struct FastaReader<R>
where
    R: Read + Send,
{
    reader: BufReader<R>,
    file_index: usize,
    reads_index: usize,
    header: Vec<u8>,
    seq: Vec<u8>,
    batch_size: usize,
}

impl<R> FastaReader<R>
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
            batch_size,
        }
    }

    fn read_next(&mut self) -> Result<Option<()>> {
        self.header.clear();
        if self.reader.read_until(b'\n', &mut self.header)? == 0 {
            return Ok(None);
        }
        self.seq.clear();
        if self.reader.read_until(b'>', &mut self.seq)? == 0 {
            return Ok(None);
        }
        trim_end(&mut self.seq);
        Ok(Some(()))
    }

    fn next_record(&mut self) -> Result<Option<Sequence>> {
        if self.read_next()?.is_none() {
            return Ok(None);
        }

        let id = unsafe {
            let slice = if self.header.starts_with(b">") {
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
            format: SeqFormat::Fasta,
        }))
    }
}

impl FastaReader<Box<dyn Read + Send>> {
    pub fn from_path<P: AsRef<Path>>(path: P, file_index: usize) -> Result<Self> {
        Ok(Self::new(dyn_reader(path)?, file_index))
    }
}

impl<R: Read + Send> Reader for FastaReader<R> {
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
