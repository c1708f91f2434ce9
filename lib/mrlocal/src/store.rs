//! Intermediate partition store.
//!
//! During the map phase every partition is an append-only arena behind its
//! own mutex, so emitters only contend when they route to the same bucket.
//! [`PartitionStore::finalize_all`] seals the partitions and hands back a
//! read-only [`SortedStore`] for the reduce phase.

use crate::api::Partitioner;
use crate::constants::DEFAULT_RECORD_CAPACITY;
use crate::error::{MrError, Result};
use crate::sort::{sort_and_group, SortedPartition, SortedStore};
use rayon::prelude::*;
use std::sync::{Arc, Mutex, PoisonError};
use tracing::debug;

/// Location of one copied pair inside a partition arena.
#[derive(Clone, Copy, Debug)]
pub(crate) struct Record {
    pub chunk: u32,
    pub offset: u32,
    pub key_len: u32,
    pub value_len: u32,
}

/// Chunked byte arena. Chunks never move once allocated, so record offsets
/// stay valid; the whole thing is released at once when the store drops.
#[derive(Debug, Default)]
pub(crate) struct Arena {
    chunks: Vec<Vec<u8>>,
    chunk_bytes: usize,
}

impl Arena {
    fn new(chunk_bytes: usize) -> Self {
        Self { chunks: Vec::new(), chunk_bytes }
    }

    fn push(&mut self, key: &[u8], value: &[u8]) -> Result<Record> {
        let need = key.len() + value.len();
        let key_len = u32::try_from(key.len()).map_err(|_| MrError::Resource("key larger than 4 GiB".into()))?;
        let value_len = u32::try_from(value.len()).map_err(|_| MrError::Resource("value larger than 4 GiB".into()))?;

        let fits = self.chunks.last().is_some_and(|c| c.capacity() - c.len() >= need);
        if !fits {
            let mut chunk = Vec::new();
            chunk
                .try_reserve_exact(need.max(self.chunk_bytes))
                .map_err(|e| MrError::Resource(format!("arena chunk of {} bytes: {}", need.max(self.chunk_bytes), e)))?;
            self.chunks.try_reserve(1).map_err(|e| MrError::Resource(format!("arena chunk list: {}", e)))?;
            self.chunks.push(chunk);
        }

        let chunk_idx = self.chunks.len() - 1;
        let chunk = &mut self.chunks[chunk_idx];
        let offset = u32::try_from(chunk.len()).map_err(|_| MrError::Resource("arena chunk larger than 4 GiB".into()))?;
        chunk.extend_from_slice(key);
        chunk.extend_from_slice(value);
        Ok(Record { chunk: chunk_idx as u32, offset, key_len, value_len })
    }

    pub(crate) fn key(&self, r: &Record) -> &[u8] {
        let start = r.offset as usize;
        &self.chunks[r.chunk as usize][start..start + r.key_len as usize]
    }

    pub(crate) fn value(&self, r: &Record) -> &[u8] {
        let start = r.offset as usize + r.key_len as usize;
        &self.chunks[r.chunk as usize][start..start + r.value_len as usize]
    }

    pub(crate) fn bytes_used(&self) -> usize {
        self.chunks.iter().map(Vec::len).sum()
    }
}

/// One bucket of intermediate pairs, unsorted until finalize.
#[derive(Debug)]
pub(crate) struct Partition {
    pub arena: Arena,
    pub records: Vec<Record>,
    sealed: bool,
}

impl Partition {
    fn new(chunk_bytes: usize) -> Self {
        Self { arena: Arena::new(chunk_bytes), records: Vec::new(), sealed: false }
    }

    fn append(&mut self, key: &[u8], value: &[u8]) -> Result<()> {
        if self.sealed {
            return Err(MrError::NotMapping);
        }
        self.records.try_reserve(if self.records.is_empty() { DEFAULT_RECORD_CAPACITY } else { 1 })
            .map_err(|e| MrError::Resource(format!("record index: {}", e)))?;
        let record = self.arena.push(key, value)?;
        self.records.push(record);
        Ok(())
    }

    /// Leaves an empty sealed partition behind and returns the contents.
    fn seal(&mut self, chunk_bytes: usize) -> Partition {
        std::mem::replace(self, Partition { sealed: true, ..Partition::new(chunk_bytes) })
    }
}

pub struct PartitionStore {
    partitions: Vec<Mutex<Partition>>,
    partitioner: Arc<dyn Partitioner>,
    chunk_bytes: usize,
}

impl PartitionStore {
    pub fn new(num_partitions: usize, partitioner: Arc<dyn Partitioner>, chunk_bytes: usize) -> Result<Self> {
        if num_partitions == 0 {
            return Err(MrError::Config("store needs at least one partition".into()));
        }
        let mut partitions = Vec::new();
        partitions
            .try_reserve_exact(num_partitions)
            .map_err(|e| MrError::Resource(format!("{} partitions: {}", num_partitions, e)))?;
        partitions.extend((0..num_partitions).map(|_| Mutex::new(Partition::new(chunk_bytes))));
        Ok(Self { partitions, partitioner, chunk_bytes })
    }

    pub fn num_partitions(&self) -> usize {
        self.partitions.len()
    }

    pub fn partition_of(&self, key: &[u8]) -> Result<usize> {
        let n = self.partitions.len();
        let p = self.partitioner.partition(key, n);
        if p >= n {
            return Err(MrError::PartitionOutOfRange { partition: p, num_partitions: n });
        }
        Ok(p)
    }

    /// Copies `key` and `value` into the owning partition's arena.
    pub fn emit(&self, key: &[u8], value: &[u8]) -> Result<()> {
        // hash outside the lock
        let p = self.partition_of(key)?;
        let mut part = self.partitions[p].lock().map_err(|_| MrError::Poisoned(p))?;
        part.append(key, value)
    }

    fn sum_over<F: Fn(&Partition) -> usize>(&self, f: F) -> u64 {
        self.partitions
            .iter()
            .map(|m| f(&*m.lock().unwrap_or_else(PoisonError::into_inner)) as u64)
            .sum()
    }

    /// Pairs stored so far; zero again once finalized.
    pub fn total_emits(&self) -> u64 {
        self.sum_over(|part| part.records.len())
    }

    /// Key plus value bytes copied so far.
    pub fn total_bytes(&self) -> u64 {
        self.sum_over(|part| part.arena.bytes_used())
    }

    /// Seals every partition, then sorts and groups each one by key.
    ///
    /// Only call once all emitters are done; later emits fail with
    /// [`MrError::NotMapping`].
    pub fn finalize_all(&self, parallel: bool) -> Result<SortedStore> {
        let mut taken = Vec::with_capacity(self.partitions.len());
        for (p, m) in self.partitions.iter().enumerate() {
            let mut part = m.lock().map_err(|_| MrError::Poisoned(p))?;
            taken.push(part.seal(self.chunk_bytes));
        }
        debug!(partitions = taken.len(), parallel, "finalizing partitions");

        let sorted: Vec<SortedPartition> = if parallel {
            taken.into_par_iter().map(sort_and_group).collect()
        } else {
            taken.into_iter().map(sort_and_group).collect()
        };
        Ok(SortedStore::new(sorted))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::partition::DefaultHashPartitioner;

    fn store(n: usize, chunk: usize) -> PartitionStore {
        PartitionStore::new(n, Arc::new(DefaultHashPartitioner), chunk).unwrap()
    }

    #[test]
    fn arena_spills_into_new_chunks() {
        let mut arena = Arena::new(8);
        let a = arena.push(b"abc", b"de").unwrap();
        let b = arena.push(b"fgh", b"ij").unwrap();
        // oversized record gets a dedicated chunk
        let c = arena.push(b"a-much-longer-key", b"value").unwrap();
        assert_eq!(a.chunk, 0);
        assert_eq!(b.chunk, 1);
        assert_eq!(c.chunk, 2);
        assert_eq!(arena.key(&a), b"abc");
        assert_eq!(arena.value(&b), b"ij");
        assert_eq!(arena.key(&c), b"a-much-longer-key");
        assert_eq!(arena.value(&c), b"value");
        assert_eq!(arena.bytes_used(), 5 + 5 + 22);
    }

    #[test]
    fn empty_keys_and_values_are_kept() {
        let s = store(1, 16);
        s.emit(b"", b"").unwrap();
        s.emit(b"k", b"").unwrap();
        let sorted = s.finalize_all(false).unwrap();
        assert_eq!(sorted.len(), 2);
        let mut cur = sorted.cursor(0).unwrap();
        assert_eq!(cur.advance_key(), Some(&b""[..]));
        assert_eq!(cur.next_value(), Some(&b""[..]));
        assert_eq!(cur.advance_key(), Some(&b"k"[..]));
    }

    #[test]
    fn caller_buffers_can_be_reused() {
        let s = store(2, 4);
        let mut buf = Vec::new();
        for i in 0..10u8 {
            buf.clear();
            buf.extend_from_slice(&[b'k', b'0' + i]);
            s.emit(&buf, &buf).unwrap();
        }
        let sorted = s.finalize_all(true).unwrap();
        let mut seen = Vec::new();
        for p in 0..2 {
            let mut cur = sorted.cursor(p).unwrap();
            while let Some(k) = cur.advance_key() {
                assert_eq!(cur.next_value(), Some(k));
                seen.push(k.to_vec());
            }
        }
        seen.sort();
        assert_eq!(seen.len(), 10);
        assert_eq!(seen[9], b"k9".to_vec());
    }

    #[test]
    fn emit_after_finalize_is_rejected() {
        let s = store(3, 64);
        s.emit(b"a", b"1").unwrap();
        let _sorted = s.finalize_all(false).unwrap();
        assert!(matches!(s.emit(b"a", b"1"), Err(MrError::NotMapping)));
    }

    #[test]
    fn out_of_range_partitioner_is_reported() {
        let bad = |_: &[u8], n: usize| n;
        let s = PartitionStore::new(4, Arc::new(bad), 64).unwrap();
        assert!(matches!(
            s.emit(b"a", b"1"),
            Err(MrError::PartitionOutOfRange { partition: 4, num_partitions: 4 })
        ));
        assert_eq!(s.total_emits(), 0);
    }

    #[test]
    fn counters_track_emits_and_bytes() {
        let s = store(2, 64);
        s.emit(b"ab", b"cde").unwrap();
        s.emit(b"x", b"").unwrap();
        assert_eq!(s.total_emits(), 2);
        assert_eq!(s.total_bytes(), 6);
    }

    #[test]
    fn counters_survive_a_poisoned_partition() {
        let s = store(1, 64);
        s.emit(b"k", b"v").unwrap();
        let _ = std::thread::scope(|scope| {
            scope
                .spawn(|| {
                    let _part = s.partitions[0].lock().unwrap();
                    panic!("poison the partition");
                })
                .join()
        });
        assert!(s.partitions[0].is_poisoned());
        assert_eq!(s.total_emits(), 1);
        assert_eq!(s.total_bytes(), 2);
    }

    #[test]
    fn zero_partitions_is_a_config_error() {
        let r = PartitionStore::new(0, Arc::new(DefaultHashPartitioner), 64);
        assert!(matches!(r, Err(MrError::Config(_))));
    }
}
