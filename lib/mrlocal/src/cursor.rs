//! Pull-style iteration over a finalized partition.

use crate::sort::SortedPartition;
use std::iter::FusedIterator;

/// Values of a single key, pulled one at a time.
///
/// `None` marks the end of the values and keeps being returned on every
/// later call. The sequence cannot be restarted:
///
/// ```compile_fail
/// fn restartable<T: Clone>() {}
/// restartable::<mrlocal::Values<'static>>();
/// ```
#[derive(Debug)]
pub struct Values<'a> {
    partition: Option<&'a SortedPartition>,
    pos: usize,
    end: usize,
}

impl<'a> Values<'a> {
    fn empty() -> Self {
        Self { partition: None, pos: 0, end: 0 }
    }

    pub fn next_value(&mut self) -> Option<&'a [u8]> {
        let partition = self.partition?;
        if self.pos >= self.end {
            return None;
        }
        let v = partition.value_at(self.pos);
        self.pos += 1;
        Some(v)
    }

    pub fn remaining(&self) -> usize {
        self.end - self.pos
    }
}

impl<'a> Iterator for Values<'a> {
    type Item = &'a [u8];

    fn next(&mut self) -> Option<Self::Item> {
        self.next_value()
    }

    fn size_hint(&self) -> (usize, Option<usize>) {
        (self.remaining(), Some(self.remaining()))
    }
}

impl ExactSizeIterator for Values<'_> {}
impl FusedIterator for Values<'_> {}

/// Per-partition reduce state: which key run is current and how far into
/// its values the reducer has pulled.
#[derive(Debug)]
pub struct ReduceCursor<'a> {
    partition: &'a SortedPartition,
    next_run: usize,
    current: Values<'a>,
}

impl<'a> ReduceCursor<'a> {
    pub(crate) fn new(partition: &'a SortedPartition) -> Self {
        Self { partition, next_run: 0, current: Values::empty() }
    }

    /// Moves to the next distinct key, dropping whatever was left unread of
    /// the previous one. `None` once every key has been visited.
    pub fn advance_key(&mut self) -> Option<&'a [u8]> {
        match self.partition.run(self.next_run) {
            Some(run) => {
                self.next_run += 1;
                let key = self.partition.key_at(run.start);
                self.current = Values { partition: Some(self.partition), pos: run.start, end: run.end };
                Some(key)
            }
            None => {
                self.current = Values::empty();
                None
            }
        }
    }

    pub fn next_value(&mut self) -> Option<&'a [u8]> {
        self.current.next_value()
    }

    pub fn values(&mut self) -> &mut Values<'a> {
        &mut self.current
    }
}
