use crate::api::Reducer;
use crate::cursor::ReduceCursor;
use crate::error::{MrError, Phase, Result};
use crate::sort::SortedStore;
use crate::utils::elapsed_ms;
use std::panic::{catch_unwind, AssertUnwindSafe};
use std::sync::atomic::{AtomicBool, Ordering};
use std::thread;
use std::time::Instant;
use tracing::{debug, error};

#[derive(Clone, Debug)]
pub(crate) struct ReduceWorkerStats {
    pub partition: usize,
    pub keys: u64,
    pub values_pulled: u64,
    pub wall_ms: u64,
}

/// One worker per partition; returns once every worker has exited. The
/// first failing worker stops its siblings at their next key.
pub(crate) fn run_reduce_phase<R: Reducer + ?Sized>(reducer: &R, store: &SortedStore) -> Result<Vec<ReduceWorkerStats>> {
    let num_reducers = store.num_partitions();
    let abort = AtomicBool::new(false);
    let abort = &abort;
    thread::scope(|s| {
        let mut handles = Vec::with_capacity(num_reducers);
        let mut spawn_err = None;
        for partition in 0..num_reducers {
            let spawned = thread::Builder::new()
                .name(format!("mr-reduce-{}", partition))
                .spawn_scoped(s, move || reduce_worker(partition, reducer, store, abort));
            match spawned {
                Ok(h) => handles.push(h),
                Err(e) => {
                    error!(partition, "failed to spawn reduce worker: {}", e);
                    abort.store(true, Ordering::Release);
                    spawn_err = Some(MrError::Spawn { phase: Phase::Reduce, source: e });
                    break;
                }
            }
        }

        let mut stats = Vec::with_capacity(handles.len());
        let mut first_err = spawn_err;
        for (partition, h) in handles.into_iter().enumerate() {
            let res = h.join().unwrap_or(Err(MrError::WorkerPanicked { phase: Phase::Reduce, worker: partition }));
            match res {
                Ok(st) => stats.push(st),
                Err(e) => {
                    if first_err.is_none() { first_err = Some(e); }
                }
            }
        }
        match first_err {
            Some(e) => Err(e),
            None => Ok(stats),
        }
    })
}

fn reduce_worker<R: Reducer + ?Sized>(
    partition: usize,
    reducer: &R,
    store: &SortedStore,
    abort: &AtomicBool,
) -> Result<ReduceWorkerStats> {
    let start = Instant::now();
    let sorted = store.partition(partition).ok_or(MrError::PartitionOutOfRange {
        partition,
        num_partitions: store.num_partitions(),
    })?;
    let mut cursor = ReduceCursor::new(sorted);
    debug!(partition, records = sorted.len(), "reduce worker starting");
    let mut keys = 0u64;
    let mut values_pulled = 0u64;
    loop {
        if abort.load(Ordering::Acquire) {
            // the failing sibling carries the error
            debug!(partition, keys, "reduce worker stopping after a sibling failed");
            break;
        }
        let Some(key) = cursor.advance_key() else { break };
        let values = cursor.values();
        let before = values.remaining();
        let res = catch_unwind(AssertUnwindSafe(|| reducer.reduce(key, values, partition)));
        match res {
            Ok(Ok(())) => {}
            Ok(Err(e)) => {
                error!(partition, "reduce failed: {:#}", e);
                abort.store(true, Ordering::Release);
                return Err(MrError::ReduceFailed { partition, source: e });
            }
            Err(_) => {
                error!(partition, "reduce panicked");
                abort.store(true, Ordering::Release);
                return Err(MrError::WorkerPanicked { phase: Phase::Reduce, worker: partition });
            }
        }
        keys += 1;
        values_pulled += before.saturating_sub(cursor.values().remaining()) as u64;
    }
    let wall_ms = elapsed_ms(start);
    debug!(partition, keys, values_pulled, wall_ms, "reduce worker done");
    Ok(ReduceWorkerStats { partition, keys, values_pulled, wall_ms })
}
