//! Single-machine concurrent MapReduce.
//!
//! A fixed pool of mapper threads pulls inputs from a shared queue and
//! contributes pairs with [`emit`]. Pairs land in a per-partition store,
//! which is sorted and grouped by key once every mapper has finished. Then
//! one reducer thread per partition visits each key once, pulling values
//! through [`Values`].

pub mod api;
pub mod config;
pub mod constants;
pub mod context;
pub mod cursor;
pub mod error;
pub mod partition;
pub mod runtime;
pub mod sort;
pub mod stats;
pub mod store;
pub mod utils;
pub mod work_queue;

mod map_phase;
mod reduce_phase;

pub use api::{Mapper, Partitioner, Reducer};
pub use config::RunConfig;
pub use context::emit;
pub use cursor::{ReduceCursor, Values};
pub use error::{MrError, Phase};
pub use partition::{default_hash_partition, DefaultHashPartitioner};
pub use runtime::{run, Job};
pub use sort::{SortedPartition, SortedStore};
pub use stats::RunReport;
pub use store::PartitionStore;
pub use work_queue::WorkQueue;
