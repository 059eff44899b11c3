use crate::reader::Reader;
use crate::seq::Sequence;
use crossbeam_channel::bounded;
use scoped_threadpool::Pool;
use std::io::Result;
use std::sync::Arc;

/// Handed to the collector closure; `next()` drains whatever the worker
/// threads have finished so far, in arbitrary completion order.
pub struct ParallelResult<O>
where
    O: Send,
{
    recv: crossbeam_channel::Receiver<O>,
}

impl<O> ParallelResult<O>
where
    O: Send,
{
    #[inline]
    pub fn next(&mut self) -> Option<O> {
        self.recv.recv().ok()
    }
}

/// Fans a single record reader out over `n_threads - 2` worker threads (one
/// thread reads, one collects, the rest run `work`), bounded by `buffer_len`
/// in-flight batches.
pub fn read_parallel<W, O, F, Out>(
    reader: &mut dyn Reader,
    n_threads: usize,
    buffer_len: usize,
    work: W,
    func: F,
) -> Result<Out>
where
    O: Send,
    W: Send + Sync + Fn(Vec<Sequence>) -> O,
    F: FnOnce(&mut ParallelResult<O>) -> Out + Send,
    Out: Send,
{
    assert!(n_threads > 2);
    assert!(n_threads <= buffer_len);

    let (sender, receiver) = bounded::<Vec<Sequence>>(buffer_len);
    let (done_send, done_recv) = bounded::<O>(buffer_len);
    let receiver = Arc::new(receiver);
    let done_send = Arc::new(done_send);
    let mut pool = Pool::new(n_threads as u32);

    let mut parallel_result = ParallelResult { recv: done_recv };
    let mut out = None;

    pool.scoped(|scope| {
        scope.execute(move || {
            while let Ok(Some(seqs)) = reader.next() {
                if sender.send(seqs).is_err() {
                    break;
                }
            }
        });

        for _ in 0..n_threads - 2 {
            let receiver = Arc::clone(&receiver);
            let work = &work;
            let done_send = Arc::clone(&done_send);
            scope.execute(move || {
                while let Ok(seqs) = receiver.recv() {
                    let output = work(seqs);
                    if done_send.send(output).is_err() {
                        break;
                    }
                }
            });
        }

        drop(done_send);
        out = Some(func(&mut parallel_result));
    });

    Ok(out.expect("collector closure always runs"))
}
