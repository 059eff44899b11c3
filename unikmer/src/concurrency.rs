//! The small set of concurrency primitives the index builder and
//! set-operation kernels share — a process-wide open-file semaphore, an
//! unordered fan-in collector, and a sequence-numbered ordered collector.

use crossbeam_channel::{bounded, Receiver, Sender};
use std::collections::BinaryHeap;
use std::cmp::Reverse;
use std::sync::Arc;

/// Reads the process's current soft limit on open file descriptors, so a
/// requested `maxOpenFiles` can be clamped to what the OS will actually hand
/// out rather than failing partway through a build.
#[cfg(unix)]
pub fn get_file_limit() -> usize {
    let mut limits = libc::rlimit { rlim_cur: 0, rlim_max: 0 };
    let result = unsafe { libc::getrlimit(libc::RLIMIT_NOFILE, &mut limits) };
    if result == 0 {
        limits.rlim_cur as usize
    } else {
        log::warn!("getrlimit(RLIMIT_NOFILE) failed, falling back to a conservative limit");
        256
    }
}

#[cfg(not(unix))]
pub fn get_file_limit() -> usize {
    8192
}

/// Bounds the number of input files concurrently open across a whole index
/// build or set operation. Acquiring blocks until a permit is free; the
/// permit is released when the returned guard drops.
#[derive(Clone)]
pub struct FileSemaphore {
    send: Sender<()>,
    recv: Receiver<()>,
}

impl FileSemaphore {
    pub fn new(permits: usize) -> Self {
        let (send, recv) = bounded(permits);
        for _ in 0..permits {
            send.send(()).expect("channel just created");
        }
        FileSemaphore { send, recv }
    }

    pub fn acquire(&self) -> FilePermit<'_> {
        self.recv.recv().expect("semaphore channel never closes while held");
        FilePermit { sem: self }
    }
}

pub struct FilePermit<'a> {
    sem: &'a FileSemaphore,
}

impl Drop for FilePermit<'_> {
    fn drop(&mut self) {
        let _ = self.sem.send.send(());
    }
}

/// Drains worker outputs in whatever order they complete. Used when the
/// caller doesn't care about item order (batch signature building, the
/// difference kernel's parallel workers).
pub struct UnorderedCollector<O> {
    recv: Receiver<O>,
}

impl<O> UnorderedCollector<O> {
    pub fn new(recv: Receiver<O>) -> Self {
        UnorderedCollector { recv }
    }

    pub fn collect_all(self) -> Vec<O> {
        self.recv.iter().collect()
    }
}

/// Buffers out-of-order items tagged with a monotonic sequence number and
/// releases them strictly in order — used by `info` over a file list, where
/// output order must match input order even though workers finish out of
/// order.
pub struct OrderedCollector<O> {
    recv: Receiver<(u64, O)>,
    next_seq: u64,
    pending: BinaryHeap<Reverse<SeqItem<O>>>,
}

struct SeqItem<O>(u64, O);

impl<O> PartialEq for SeqItem<O> {
    fn eq(&self, other: &Self) -> bool {
        self.0 == other.0
    }
}
impl<O> Eq for SeqItem<O> {}
impl<O> PartialOrd for SeqItem<O> {
    fn partial_cmp(&self, other: &Self) -> Option<std::cmp::Ordering> {
        Some(self.cmp(other))
    }
}
impl<O> Ord for SeqItem<O> {
    fn cmp(&self, other: &Self) -> std::cmp::Ordering {
        self.0.cmp(&other.0)
    }
}

impl<O> OrderedCollector<O> {
    pub fn new(recv: Receiver<(u64, O)>) -> Self {
        OrderedCollector { recv, next_seq: 0, pending: BinaryHeap::new() }
    }

    /// Drains the channel, yielding items in sequence-number order.
    pub fn collect_in_order(mut self) -> Vec<O> {
        let mut out = Vec::new();
        while let Ok((seq, item)) = self.recv.recv() {
            self.pending.push(Reverse(SeqItem(seq, item)));
            while let Some(Reverse(SeqItem(seq, _))) = self.pending.peek() {
                if *seq != self.next_seq {
                    break;
                }
                let Reverse(SeqItem(_, item)) = self.pending.pop().unwrap();
                out.push(item);
                self.next_seq += 1;
            }
        }
        while let Some(Reverse(SeqItem(_, item))) = self.pending.pop() {
            out.push(item);
        }
        out
    }
}

/// A one-shot flag workers check at I/O boundaries to stop scheduling new
/// work after a fatal error elsewhere in the pool.
#[derive(Clone, Default)]
pub struct CancelToken {
    flag: Arc<std::sync::atomic::AtomicBool>,
}

impl CancelToken {
    pub fn new() -> Self {
        CancelToken::default()
    }

    pub fn cancel(&self) {
        self.flag.store(true, std::sync::atomic::Ordering::SeqCst);
    }

    pub fn is_cancelled(&self) -> bool {
        self.flag.load(std::sync::atomic::Ordering::SeqCst)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crossbeam_channel::unbounded;

    #[test]
    fn semaphore_limits_concurrent_permits() {
        let sem = FileSemaphore::new(2);
        let a = sem.acquire();
        let b = sem.acquire();
        drop(a);
        let _c = sem.acquire();
        drop(b);
    }

    #[test]
    fn ordered_collector_restores_sequence() {
        let (send, recv) = unbounded();
        send.send((2u64, "c")).unwrap();
        send.send((0u64, "a")).unwrap();
        send.send((1u64, "b")).unwrap();
        drop(send);
        let collector = OrderedCollector::new(recv);
        assert_eq!(collector.collect_in_order(), vec!["a", "b", "c"]);
    }

    #[test]
    fn cancel_token_observable_across_clones() {
        let token = CancelToken::new();
        let clone = token.clone();
        assert!(!clone.is_cancelled());
        token.cancel();
        assert!(clone.is_cancelled());
    }
}
