use crate::api::Mapper;
use crate::context::WorkerBinding;
use crate::error::{MrError, Phase, Result};
use crate::store::PartitionStore;
use crate::utils::elapsed_ms;
use crate::work_queue::WorkQueue;
use std::panic::{catch_unwind, AssertUnwindSafe};
use std::sync::Arc;
use std::thread;
use std::time::Instant;
use tracing::{debug, error};

#[derive(Clone, Debug)]
pub(crate) struct MapWorkerStats {
    pub worker: usize,
    pub inputs: u64,
    pub wall_ms: u64,
}

/// Runs `num_mappers` workers over the queue and returns once all of them
/// have exited. This join is the map barrier.
pub(crate) fn run_map_phase<M: Mapper + ?Sized>(
    mapper: &M,
    queue: &WorkQueue,
    store: &Arc<PartitionStore>,
    num_mappers: usize,
) -> Result<Vec<MapWorkerStats>> {
    thread::scope(|s| {
        let mut handles = Vec::with_capacity(num_mappers);
        let mut spawn_err = None;
        for worker in 0..num_mappers {
            let store = Arc::clone(store);
            let spawned = thread::Builder::new()
                .name(format!("mr-map-{}", worker))
                .spawn_scoped(s, move || map_worker(worker, mapper, queue, store));
            match spawned {
                Ok(h) => handles.push(h),
                Err(e) => {
                    error!(worker, "failed to spawn map worker: {}", e);
                    queue.close();
                    spawn_err = Some(MrError::Spawn { phase: Phase::Map, source: e });
                    break;
                }
            }
        }

        let mut stats = Vec::with_capacity(handles.len());
        let mut first_err = spawn_err;
        for (worker, h) in handles.into_iter().enumerate() {
            let res = h.join().unwrap_or(Err(MrError::WorkerPanicked { phase: Phase::Map, worker }));
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

fn map_worker<M: Mapper + ?Sized>(
    worker: usize,
    mapper: &M,
    queue: &WorkQueue,
    store: Arc<PartitionStore>,
) -> Result<MapWorkerStats> {
    let start = Instant::now();
    let _binding = WorkerBinding::bind(store);
    debug!(worker, "map worker starting");
    let mut inputs = 0u64;
    while let Some((idx, input)) = queue.take_next() {
        match catch_unwind(AssertUnwindSafe(|| mapper.map(input))) {
            Ok(Ok(())) => inputs += 1,
            Ok(Err(e)) => {
                error!(worker, input_idx = idx, input, "map failed: {:#}", e);
                queue.close();
                return Err(MrError::MapFailed { input: input.to_string(), source: e });
            }
            Err(_) => {
                error!(worker, input_idx = idx, input, "map panicked");
                queue.close();
                return Err(MrError::WorkerPanicked { phase: Phase::Map, worker });
            }
        }
    }
    let wall_ms = elapsed_ms(start);
    debug!(worker, inputs, wall_ms, "map worker done");
    Ok(MapWorkerStats { worker, inputs, wall_ms })
}
