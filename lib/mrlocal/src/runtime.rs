use crate::api::{Mapper, Partitioner, Reducer};
use crate::config::RunConfig;
use crate::context::RunGuard;
use crate::cursor::Values;
use crate::error::{MrError, Result};
use crate::map_phase::run_map_phase;
use crate::partition::DefaultHashPartitioner;
use crate::reduce_phase::run_reduce_phase;
use crate::stats::RunReport;
use crate::store::PartitionStore;
use crate::utils::elapsed_ms;
use crate::work_queue::WorkQueue;
use std::sync::Arc;
use std::time::Instant;
use tracing::{debug, info};

/// Runs one full map, shuffle, reduce cycle and blocks until it is done.
///
/// `num_reducers` is also the number of partitions. Only one run may be in
/// flight per process; a second concurrent call gets
/// [`MrError::RunAlreadyActive`].
pub fn run<I, S, M, R, P>(
    inputs: I,
    map_fn: M,
    num_mappers: usize,
    reduce_fn: R,
    num_reducers: usize,
    partition_fn: P,
) -> Result<RunReport>
where
    I: IntoIterator<Item = S>,
    S: Into<String>,
    M: Fn(&str) -> anyhow::Result<()> + Sync,
    R: Fn(&[u8], &mut Values<'_>, usize) -> anyhow::Result<()> + Sync,
    P: Fn(&[u8], usize) -> usize + Send + Sync + 'static,
{
    Job::new()
        .inputs(inputs)
        .mappers(num_mappers)
        .reducers(num_reducers)
        .partitioner(partition_fn)
        .run(map_fn, reduce_fn)
}

/// Builder form of [`run`], for struct-based strategies and env-driven
/// configuration.
pub struct Job {
    inputs: Vec<String>,
    config: RunConfig,
    partitioner: Arc<dyn Partitioner>,
}

impl Job {
    pub fn new() -> Self {
        Self { inputs: vec![], config: RunConfig::default(), partitioner: Arc::new(DefaultHashPartitioner) }
    }

    pub fn input(mut self, input: impl Into<String>) -> Self {
        self.inputs.push(input.into());
        self
    }

    pub fn inputs<I, S>(mut self, inputs: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.inputs.extend(inputs.into_iter().map(Into::into));
        self
    }

    pub fn config(mut self, config: RunConfig) -> Self {
        self.config = config;
        self
    }

    pub fn mappers(mut self, n: usize) -> Self {
        self.config.num_mappers = n;
        self
    }

    pub fn reducers(mut self, n: usize) -> Self {
        self.config.num_reducers = n;
        self
    }

    pub fn partitioner(mut self, partitioner: impl Partitioner + 'static) -> Self {
        self.partitioner = Arc::new(partitioner);
        self
    }

    pub fn run<M, R>(self, mapper: M, reducer: R) -> Result<RunReport>
    where
        M: Mapper,
        R: Reducer,
    {
        let Job { inputs, config, partitioner } = self;
        config.validate()?;
        if inputs.is_empty() {
            return Err(MrError::Config("input list is empty".into()));
        }

        let store = Arc::new(PartitionStore::new(config.num_reducers, partitioner, config.arena_chunk_bytes)?);
        let guard = RunGuard::acquire(Arc::clone(&store))?;
        let queue = WorkQueue::new(inputs);
        let mut report = RunReport::new();

        info!(
            inputs = queue.len(), num_mappers = config.num_mappers, num_reducers = config.num_reducers,
            "starting map phase"
        );
        let map_start = Instant::now();
        let map_stats = run_map_phase(&mapper, &queue, &store, config.num_mappers)?;
        for w in &map_stats {
            debug!(worker = w.worker, inputs = w.inputs, wall_ms = w.wall_ms, "map worker stats");
        }
        report.record_map(&map_stats, store.total_emits(), store.total_bytes(), elapsed_ms(map_start));
        info!(phase = "map",
              workers = report.map.workers, inputs = report.map.inputs,
              total_emits = report.map.total_emits, total_bytes = report.map.total_bytes,
              min_worker_ms = report.map.min_worker_ms, max_worker_ms = report.map.max_worker_ms,
              wall_ms = report.map.wall_ms,
              "Map phase complete");

        guard.enter_reduce();
        let finalize_start = Instant::now();
        let sorted = store.finalize_all(config.parallel_finalize)?;
        report.record_finalize(&sorted, elapsed_ms(finalize_start));
        info!(phase = "finalize",
              partitions = report.finalize.partitions, records = report.finalize.records,
              keys = report.finalize.keys, wall_ms = report.finalize.wall_ms,
              "Finalize phase complete");

        let reduce_start = Instant::now();
        let reduce_stats = run_reduce_phase(&reducer, &sorted)?;
        for w in &reduce_stats {
            debug!(partition = w.partition, keys = w.keys, values_pulled = w.values_pulled, wall_ms = w.wall_ms, "reduce worker stats");
        }
        report.record_reduce(&reduce_stats, elapsed_ms(reduce_start));
        info!(phase = "reduce",
              reducers = report.reduce.reducers, keys = report.reduce.keys,
              values_pulled = report.reduce.values_pulled,
              min_worker_ms = report.reduce.min_worker_ms, max_worker_ms = report.reduce.max_worker_ms,
              wall_ms = report.reduce.wall_ms,
              "Reduce phase complete");

        // teardown: intermediate data goes with the store
        drop(sorted);
        drop(guard);
        Ok(report)
    }
}

impl Default for Job {
    fn default() -> Self { Self::new() }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::context::run_active;
    use crate::{default_hash_partition, emit};
    use std::collections::BTreeMap;
    use std::sync::Mutex;

    fn noop_map(_: &str) -> anyhow::Result<()> {
        Ok(())
    }

    fn failing_map(_: &str) -> anyhow::Result<()> {
        anyhow::bail!("boom")
    }

    fn noop_reduce(_: &[u8], _: &mut Values<'_>, _: usize) -> anyhow::Result<()> {
        Ok(())
    }

    #[test]
    fn word_count_scenario() {
        let _serial = crate::test_support::serial();
        let contents: BTreeMap<&str, &str> = [("f1", "a b a"), ("f2", "b b a")].into_iter().collect();
        let out = Mutex::new(BTreeMap::new());
        let report = run(
            ["f1", "f2"],
            |input: &str| {
                for w in contents[input].split_whitespace() {
                    emit(w, "1")?;
                }
                Ok(())
            },
            2,
            |key: &[u8], values: &mut Values<'_>, _p: usize| {
                let n = values.count();
                out.lock().unwrap().insert(String::from_utf8(key.to_vec())?, n);
                Ok(())
            },
            3,
            default_hash_partition,
        )
        .unwrap();
        let out = out.into_inner().unwrap();
        assert_eq!(out.get("a"), Some(&3));
        assert_eq!(out.get("b"), Some(&3));
        assert_eq!(out.len(), 2);
        assert_eq!(report.map.total_emits, 6);
        assert_eq!(report.map.inputs, 2);
        assert_eq!(report.finalize.keys, 2);
        assert_eq!(report.reduce.values_pulled, 6);
        assert!(!run_active());
    }

    #[test]
    fn empty_inputs_are_a_config_error() {
        let _serial = crate::test_support::serial();
        let r = Job::new().mappers(1).reducers(1).run(noop_map, noop_reduce);
        assert!(matches!(r, Err(MrError::Config(_))));
    }

    #[test]
    fn slot_released_after_failure() {
        let _serial = crate::test_support::serial();
        let r = Job::new()
            .input("x")
            .mappers(1)
            .reducers(1)
            .run(failing_map, noop_reduce);
        assert!(matches!(r, Err(MrError::MapFailed { .. })));
        assert!(!run_active());
    }
}
