//! Centralized environment variable names and default values for run tuning.

// Environment variable names
pub const ENV_NUM_MAPPERS: &str = "MRLOCAL_NUM_MAPPERS";
pub const ENV_NUM_REDUCERS: &str = "MRLOCAL_NUM_REDUCERS";
pub const ENV_ARENA_CHUNK_BYTES: &str = "MRLOCAL_ARENA_CHUNK_BYTES";
pub const ENV_PARALLEL_FINALIZE: &str = "MRLOCAL_PARALLEL_FINALIZE";

// Defaults
// Arena chunk per partition; records larger than this get their own chunk
pub const DEFAULT_ARENA_CHUNK_BYTES: usize = 64 * 1024; // 64 KiB
// Record index starts small, most partitions see many emits
pub const DEFAULT_RECORD_CAPACITY: usize = 1024;
pub const DEFAULT_PARALLEL_FINALIZE: bool = true;

/// Seed of the djb2 string hash used by the default partitioner.
pub const DJB2_SEED: u64 = 5381;
