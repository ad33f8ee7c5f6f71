use std::mem;

/// Pair of buffers where one holds the data being produced right now and the
/// other one holds what's been produced previously (during the previous frame
/// or the previous iteration).
#[derive(Clone, Debug, Default, PartialEq)]
pub struct DoubleBuffered<T> {
    curr: T,
    prev: T,
}

impl<T> DoubleBuffered<T> {
    pub fn new(curr: T, prev: T) -> Self {
        Self { curr, prev }
    }

    pub fn curr(&self) -> &T {
        &self.curr
    }

    pub fn curr_mut(&mut self) -> &mut T {
        &mut self.curr
    }

    pub fn prev(&self) -> &T {
        &self.prev
    }

    pub fn prev_mut(&mut self) -> &mut T {
        &mut self.prev
    }

    /// Returns the current buffer for writing together with the previous
    /// buffer for reading.
    pub fn split_mut(&mut self) -> (&mut T, &T) {
        (&mut self.curr, &self.prev)
    }

    /// Swaps current and previous buffers; doesn't copy any data.
    pub fn swap(&mut self) {
        mem::swap(&mut self.curr, &mut self.prev);
    }
}

impl<T> DoubleBuffered<Vec<T>>
where
    T: Clone + Default,
{
    pub fn with_len(len: usize) -> Self {
        Self::new(vec![T::default(); len], vec![T::default(); len])
    }

    /// Resets both buffers to their default values.
    pub fn clear(&mut self) {
        self.curr.fill(T::default());
        self.prev.fill(T::default());
    }
}
