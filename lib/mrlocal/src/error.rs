//! Error type surfaced synchronously from a run.

use std::fmt;
use thiserror::Error;

/// Which pool a worker belonged to.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Phase {
    Map,
    Reduce,
}

impl fmt::Display for Phase {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Phase::Map => f.write_str("map"),
            Phase::Reduce => f.write_str("reduce"),
        }
    }
}

#[derive(Error, Debug)]
pub enum MrError {
    #[error("invalid configuration: {0}")]
    Config(String),

    #[error("resource exhausted: {0}")]
    Resource(String),

    #[error("failed to spawn {phase} worker: {source}")]
    Spawn {
        phase: Phase,
        #[source]
        source: std::io::Error,
    },

    #[error("map failed on input {input:?}: {source}")]
    MapFailed {
        input: String,
        #[source]
        source: anyhow::Error,
    },

    #[error("reduce failed on partition {partition}: {source}")]
    ReduceFailed {
        partition: usize,
        #[source]
        source: anyhow::Error,
    },

    #[error("{phase} worker {worker} panicked")]
    WorkerPanicked { phase: Phase, worker: usize },

    #[error("partition function returned {partition} for {num_partitions} partitions")]
    PartitionOutOfRange { partition: usize, num_partitions: usize },

    #[error("emit called outside the map phase of an active run")]
    NotMapping,

    #[error("another run is already active in this process")]
    RunAlreadyActive,

    #[error("partition {0} lock poisoned")]
    Poisoned(usize),
}

impl MrError {
    /// True for failures raised by user Map/Reduce code rather than the library.
    pub fn is_callback_failure(&self) -> bool {
        matches!(
            self,
            MrError::MapFailed { .. } | MrError::ReduceFailed { .. } | MrError::WorkerPanicked { .. }
        )
    }
}

pub type Result<T> = std::result::Result<T, MrError>;
