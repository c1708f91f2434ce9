use crate::constants::*;
use crate::error::{MrError, Result};
use crate::utils::{env_usize, env_var_truthy};
use serde::Serialize;

/// Tuning for one run. Partition count always equals `num_reducers`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct RunConfig {
    pub num_mappers: usize,
    pub num_reducers: usize,
    pub arena_chunk_bytes: usize,
    pub parallel_finalize: bool,
}

impl Default for RunConfig {
    fn default() -> Self {
        let cpus = num_cpus::get().max(1);
        Self {
            num_mappers: cpus,
            num_reducers: cpus,
            arena_chunk_bytes: DEFAULT_ARENA_CHUNK_BYTES,
            parallel_finalize: DEFAULT_PARALLEL_FINALIZE,
        }
    }
}

impl RunConfig {
    pub fn new(num_mappers: usize, num_reducers: usize) -> Self {
        Self { num_mappers, num_reducers, ..Self::default() }
    }

    /// Defaults overridden by `MRLOCAL_*` environment variables.
    pub fn from_env() -> Self {
        let mut cfg = Self::default();
        if let Some(n) = env_usize(ENV_NUM_MAPPERS) { cfg.num_mappers = n; }
        if let Some(n) = env_usize(ENV_NUM_REDUCERS) { cfg.num_reducers = n; }
        if let Some(n) = env_usize(ENV_ARENA_CHUNK_BYTES) { cfg.arena_chunk_bytes = n; }
        if let Some(b) = env_var_truthy(ENV_PARALLEL_FINALIZE) { cfg.parallel_finalize = b; }
        cfg
    }

    pub fn validate(&self) -> Result<()> {
        if self.num_mappers == 0 {
            return Err(MrError::Config("num_mappers must be at least 1".into()));
        }
        if self.num_reducers == 0 {
            return Err(MrError::Config("num_reducers must be at least 1".into()));
        }
        if self.arena_chunk_bytes == 0 {
            return Err(MrError::Config("arena_chunk_bytes must be non-zero".into()));
        }
        Ok(())
    }
}
