use crate::cursor::ReduceCursor;
use crate::store::{Arena, Partition, Record};
use std::ops::Range;

/// A finalized partition: records sorted by key, segmented into runs of
/// equal key. Read-only from here on.
#[derive(Debug)]
pub struct SortedPartition {
    arena: Arena,
    records: Vec<Record>,
    runs: Vec<Range<usize>>,
}

impl SortedPartition {
    pub fn len(&self) -> usize {
        self.records.len()
    }

    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }

    /// Number of distinct keys.
    pub fn num_keys(&self) -> usize {
        self.runs.len()
    }

    pub(crate) fn run(&self, idx: usize) -> Option<Range<usize>> {
        self.runs.get(idx).cloned()
    }

    pub(crate) fn key_at(&self, record: usize) -> &[u8] {
        self.arena.key(&self.records[record])
    }

    pub(crate) fn value_at(&self, record: usize) -> &[u8] {
        self.arena.value(&self.records[record])
    }
}

// Stable sort by raw key bytes; duplicates keep emission order within a
// partition as a tie-break only.
pub(crate) fn sort_and_group(part: Partition) -> SortedPartition {
    let Partition { arena, mut records, .. } = part;
    records.sort_by(|a, b| arena.key(a).cmp(arena.key(b)));

    let mut runs = Vec::new();
    let mut start = 0usize;
    for i in 1..=records.len() {
        if i == records.len() || arena.key(&records[i]) != arena.key(&records[start]) {
            runs.push(start..i);
            start = i;
        }
    }
    SortedPartition { arena, records, runs }
}

/// All partitions after the map barrier, indexed by partition number.
#[derive(Debug)]
pub struct SortedStore {
    partitions: Vec<SortedPartition>,
}

impl SortedStore {
    pub(crate) fn new(partitions: Vec<SortedPartition>) -> Self {
        Self { partitions }
    }

    pub fn num_partitions(&self) -> usize {
        self.partitions.len()
    }

    /// Total records across partitions.
    pub fn len(&self) -> usize {
        self.partitions.iter().map(SortedPartition::len).sum()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    pub fn num_keys(&self) -> usize {
        self.partitions.iter().map(SortedPartition::num_keys).sum()
    }

    pub fn partition(&self, idx: usize) -> Option<&SortedPartition> {
        self.partitions.get(idx)
    }

    /// Fresh reduce cursor over partition `idx`, if it exists.
    pub fn cursor(&self, idx: usize) -> Option<ReduceCursor<'_>> {
        self.partition(idx).map(ReduceCursor::new)
    }
}
