use crate::map_phase::MapWorkerStats;
use crate::reduce_phase::ReduceWorkerStats;
use crate::sort::SortedStore;
use serde::Serialize;

#[derive(Default, Clone, Debug, Serialize)]
pub struct MapStats {
    pub workers: usize,
    pub inputs: u64,
    pub total_emits: u64,
    pub total_bytes: u64,
    pub min_worker_ms: u64,
    pub max_worker_ms: u64,
    pub wall_ms: u64,
}

#[derive(Default, Clone, Debug, Serialize)]
pub struct FinalizeStats {
    pub partitions: usize,
    pub records: u64,
    pub keys: u64,
    pub wall_ms: u64,
}

#[derive(Default, Clone, Debug, Serialize)]
pub struct ReduceStats {
    pub reducers: usize,
    pub keys: u64,
    pub values_pulled: u64,
    pub min_worker_ms: u64,
    pub max_worker_ms: u64,
    pub wall_ms: u64,
}

/// What a completed run did, phase by phase.
#[derive(Default, Clone, Debug, Serialize)]
pub struct RunReport {
    pub map: MapStats,
    pub finalize: FinalizeStats,
    pub reduce: ReduceStats,
}

impl RunReport {
    pub fn new() -> Self { Self::default() }

    pub(crate) fn record_map(&mut self, per_worker: &[MapWorkerStats], total_emits: u64, total_bytes: u64, wall_ms: u64) {
        self.map = MapStats {
            workers: per_worker.len(),
            inputs: per_worker.iter().map(|w| w.inputs).sum(),
            total_emits,
            total_bytes,
            min_worker_ms: per_worker.iter().map(|w| w.wall_ms).min().unwrap_or(0),
            max_worker_ms: per_worker.iter().map(|w| w.wall_ms).max().unwrap_or(0),
            wall_ms,
        };
    }

    pub(crate) fn record_finalize(&mut self, store: &SortedStore, wall_ms: u64) {
        self.finalize = FinalizeStats {
            partitions: store.num_partitions(),
            records: store.len() as u64,
            keys: store.num_keys() as u64,
            wall_ms,
        };
    }

    pub(crate) fn record_reduce(&mut self, per_worker: &[ReduceWorkerStats], wall_ms: u64) {
        self.reduce = ReduceStats {
            reducers: per_worker.len(),
            keys: per_worker.iter().map(|w| w.keys).sum(),
            values_pulled: per_worker.iter().map(|w| w.values_pulled).sum(),
            min_worker_ms: per_worker.iter().map(|w| w.wall_ms).min().unwrap_or(0),
            max_worker_ms: per_worker.iter().map(|w| w.wall_ms).max().unwrap_or(0),
            wall_ms,
        };
    }
}
