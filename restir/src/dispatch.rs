use std::num::NonZeroUsize;
use std::thread;

/// Runs one independent task per item and returns once all of them are done.
///
/// Every task gets exclusive access to its own item only; anything else it
/// needs must be captured by shared reference, which makes races between the
/// tasks of a single dispatch impossible.
pub trait Dispatch: Sync {
    fn dispatch<T, F>(&self, items: &mut [T], f: F)
    where
        T: Send,
        F: Fn(usize, &mut T) + Sync;
}

/// Dispatcher that runs all the tasks on the calling thread.
#[derive(Clone, Copy, Debug, Default)]
pub struct Serial;

impl Dispatch for Serial {
    fn dispatch<T, F>(&self, items: &mut [T], f: F)
    where
        T: Send,
        F: Fn(usize, &mut T) + Sync,
    {
        for (idx, item) in items.iter_mut().enumerate() {
            f(idx, item);
        }
    }
}

/// Dispatcher that splits items into contiguous chunks, one per thread.
#[derive(Clone, Copy, Debug)]
pub struct Threaded {
    threads: NonZeroUsize,
}

impl Threaded {
    pub fn new(threads: NonZeroUsize) -> Self {
        Self { threads }
    }

    pub fn threads(&self) -> usize {
        self.threads.get()
    }
}

impl Default for Threaded {
    fn default() -> Self {
        let threads = thread::available_parallelism()
            .unwrap_or(NonZeroUsize::MIN);

        Self::new(threads)
    }
}

impl Dispatch for Threaded {
    fn dispatch<T, F>(&self, items: &mut [T], f: F)
    where
        T: Send,
        F: Fn(usize, &mut T) + Sync,
    {
        if items.is_empty() {
            return;
        }

        let chunk_size = items.len().div_ceil(self.threads.get());
        let f = &f;

        thread::scope(|scope| {
            for (chunk_idx, chunk) in items.chunks_mut(chunk_size).enumerate()
            {
                scope.spawn(move || {
                    let offset = chunk_idx * chunk_size;

                    for (idx, item) in chunk.iter_mut().enumerate() {
                        f(offset + idx, item);
                    }
                });
            }
        });
    }
}
