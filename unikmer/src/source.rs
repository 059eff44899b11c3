//! A `KmerSource` is a finite, non-restartable lazy sequence of `(code,
//! index)` pairs pulled from a raw base sequence, with the
//! `Plain`/`Hashed`/`Minimizer`/`Syncmer` modes all expressed behind one
//! capability rather than four unrelated iterator types.

use crate::hash::hash64;
use crate::kmer::{canonical_code, KmerCode};
use std::collections::VecDeque;

/// Shared scanning parameters: k-mer width, whether to canonicalize, and
/// the optional scaling/minimizer/syncmer knobs layered on top.
#[derive(Debug, Clone, Copy)]
pub struct ScanParams {
    pub k: usize,
    pub canonical: bool,
    pub scale: Option<u32>,
    pub minimizer_w: Option<usize>,
    pub syncmer_s: Option<usize>,
}

impl ScanParams {
    pub fn new(k: usize, canonical: bool) -> Self {
        ScanParams { k, canonical, scale: None, minimizer_w: None, syncmer_s: None }
    }
}

fn code_of(params: &ScanParams, raw: u64) -> u64 {
    if params.canonical {
        canonical_code(raw, params.k)
    } else {
        raw
    }
}

/// Scans every valid k-mer window of `seq` in order, skipping windows that
/// straddle a non-ACGT byte rather than failing the whole sequence.
fn plain_codes(seq: &[u8], params: &ScanParams) -> Vec<(u64, usize)> {
    let k = params.k;
    if seq.len() < k {
        return Vec::new();
    }
    let mut out = Vec::with_capacity(seq.len() - k + 1);
    let mut i = 0;
    while i + k <= seq.len() {
        match KmerCode::encode(&seq[i..i + k], k) {
            Ok(kmer) => {
                out.push((code_of(params, kmer.code), i));
                i += 1;
            }
            Err(_) => {
                // Skip to just past the offending base rather than retry
                // byte-by-byte through known-bad territory.
                i += 1;
            }
        }
    }
    out
}

/// Passes codes through unmodified (beyond optional canonicalization).
pub struct PlainSource {
    codes: std::vec::IntoIter<(u64, usize)>,
}

impl PlainSource {
    pub fn new(seq: &[u8], params: ScanParams) -> Self {
        PlainSource { codes: plain_codes(seq, &params).into_iter() }
    }
}

impl Iterator for PlainSource {
    type Item = (u64, usize);
    fn next(&mut self) -> Option<Self::Item> {
        self.codes.next()
    }
}

/// Applies the invertible 64-bit hash to every code, optionally retaining
/// only hashes below `u64::MAX / scale` (random subsampling proportional to
/// `1/scale`).
pub struct HashedSource {
    codes: std::vec::IntoIter<(u64, usize)>,
    scale: Option<u32>,
}

impl HashedSource {
    pub fn new(seq: &[u8], params: ScanParams) -> Self {
        let scale = params.scale;
        let codes = plain_codes(seq, &params)
            .into_iter()
            .map(|(c, i)| (hash64(c), i))
            .filter(move |(h, _)| match scale {
                Some(s) if s > 1 => *h < u64::MAX / s as u64,
                _ => true,
            })
            .collect::<Vec<_>>()
            .into_iter();
        HashedSource { codes, scale }
    }
}

impl Iterator for HashedSource {
    type Item = (u64, usize);
    fn next(&mut self) -> Option<Self::Item> {
        self.codes.next()
    }
}

/// Emits the hash-minimal k-mer in every sliding window of `w` consecutive
/// k-mers, skipping repeats of the same minimizer in adjacent windows (so
/// the stream density drops roughly `w`-fold rather than emitting every
/// window's pick verbatim).
pub struct MinimizerSource {
    window: VecDeque<(u64, usize)>,
    all: std::vec::IntoIter<(u64, usize)>,
    w: usize,
    last_emitted: Option<u64>,
    done: bool,
}

impl MinimizerSource {
    pub fn new(seq: &[u8], params: ScanParams) -> Self {
        let w = params.minimizer_w.unwrap_or(1).max(1);
        let mut p = params;
        p.scale = None;
        let codes = plain_codes(seq, &p)
            .into_iter()
            .map(|(c, i)| (hash64(c), i))
            .collect::<Vec<_>>();
        MinimizerSource {
            window: VecDeque::with_capacity(w),
            all: codes.into_iter(),
            w,
            last_emitted: None,
            done: false,
        }
    }

    fn window_min(&self) -> Option<(u64, usize)> {
        self.window.iter().copied().min_by_key(|(h, _)| *h)
    }
}

impl Iterator for MinimizerSource {
    type Item = (u64, usize);
    fn next(&mut self) -> Option<Self::Item> {
        if self.done {
            return None;
        }
        loop {
            while self.window.len() < self.w {
                match self.all.next() {
                    Some(item) => self.window.push_back(item),
                    None => {
                        self.done = true;
                        break;
                    }
                }
            }
            if self.window.is_empty() {
                self.done = true;
                return None;
            }
            let candidate = self.window_min();
            self.window.pop_front();
            if let Some((hash, idx)) = candidate {
                if self.last_emitted != Some(hash) {
                    self.last_emitted = Some(hash);
                    return Some((hash, idx));
                }
                if self.done && self.window.is_empty() {
                    return None;
                }
                continue;
            }
            return None;
        }
    }
}

/// Emits a k-mer only when its minimal `s`-mer (the hash-minimal length-`s`
/// substring within the k-mer, `s < k`) sits at the very start of the
/// window — the open/closed syncmer scheme, anchored at the leftmost
/// position.
pub struct SyncmerSource {
    seq: Vec<u8>,
    pos: usize,
    params: ScanParams,
    s: usize,
}

impl SyncmerSource {
    pub fn new(seq: &[u8], params: ScanParams) -> Self {
        let s = params.syncmer_s.unwrap_or(params.k.saturating_sub(1).max(1)).min(params.k);
        SyncmerSource { seq: seq.to_vec(), pos: 0, params, s }
    }

    fn min_smer_offset(&self, window: &[u8]) -> usize {
        let s = self.s;
        if window.len() < s {
            return 0;
        }
        let mut best_offset = 0;
        let mut best_hash = u64::MAX;
        for offset in 0..=window.len() - s {
            if let Ok(smer) = KmerCode::encode(&window[offset..offset + s], s) {
                let h = hash64(canonical_code(smer.code, s));
                if h < best_hash {
                    best_hash = h;
                    best_offset = offset;
                }
            }
        }
        best_offset
    }
}

impl Iterator for SyncmerSource {
    type Item = (u64, usize);
    fn next(&mut self) -> Option<Self::Item> {
        let k = self.params.k;
        while self.pos + k <= self.seq.len() {
            let window = &self.seq[self.pos..self.pos + k];
            let offset = self.min_smer_offset(window);
            let idx = self.pos;
            self.pos += 1;
            if offset == 0 {
                if let Ok(kmer) = KmerCode::encode(window, k) {
                    return Some((code_of(&self.params, kmer.code), idx));
                }
            }
        }
        None
    }
}

/// The four scanning modes behind one type, so callers that only know "give
/// me the next code" don't need to match on the scheme.
pub enum KmerSource {
    Plain(PlainSource),
    Hashed(HashedSource),
    Minimizer(MinimizerSource),
    Syncmer(SyncmerSource),
}

impl Iterator for KmerSource {
    type Item = (u64, usize);
    fn next(&mut self) -> Option<Self::Item> {
        match self {
            KmerSource::Plain(s) => s.next(),
            KmerSource::Hashed(s) => s.next(),
            KmerSource::Minimizer(s) => s.next(),
            KmerSource::Syncmer(s) => s.next(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn plain_emits_every_window_in_order() {
        let params = ScanParams::new(4, false);
        let source = PlainSource::new(b"ACGTACGT", params);
        let indices: Vec<_> = source.map(|(_, i)| i).collect();
        assert_eq!(indices, vec![0, 1, 2, 3, 4]);
    }

    #[test]
    fn plain_skips_illegal_base() {
        let params = ScanParams::new(3, false);
        let source = PlainSource::new(b"ACNGT", params);
        let count = source.count();
        assert_eq!(count, 1);
    }

    #[test]
    fn hashed_applies_scale_filter() {
        let mut params = ScanParams::new(4, false);
        params.scale = Some(1);
        let unscaled: Vec<_> = HashedSource::new(b"ACGTACGT", params).collect();
        params.scale = Some(1000);
        let scaled: Vec<_> = HashedSource::new(b"ACGTACGT", params).collect();
        assert!(scaled.len() <= unscaled.len());
    }

    #[test]
    fn minimizer_reduces_density() {
        let mut params = ScanParams::new(4, false);
        params.minimizer_w = Some(3);
        let source = MinimizerSource::new(b"ACGTACGTACGTACGT", params);
        let emitted: Vec<_> = source.collect();
        assert!(!emitted.is_empty());
    }
}
