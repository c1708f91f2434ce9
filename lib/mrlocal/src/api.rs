use crate::cursor::Values;
use anyhow::Result;

// ========== Core MapReduce traits ==========

/// Map consumes one input identifier and contributes pairs through
/// [`crate::emit`]. Returning an error aborts the whole run.
pub trait Mapper: Sync {
    fn map(&self, input: &str) -> Result<()>;
}

/// Reducer is called once per distinct key of its partition, in key order.
/// It may stop pulling values early; the rest of that key's values are skipped.
pub trait Reducer: Sync {
    fn reduce(&self, key: &[u8], values: &mut Values<'_>, partition: usize) -> Result<()>;
}

/// Routes a key to a bucket in `0..num_partitions`.
///
/// Must be a pure function of its two arguments, otherwise a key's values
/// would be split across reducers.
pub trait Partitioner: Send + Sync {
    fn partition(&self, key: &[u8], num_partitions: usize) -> usize;
}

impl<F> Mapper for F
where
    F: Fn(&str) -> Result<()> + Sync,
{
    fn map(&self, input: &str) -> Result<()> {
        self(input)
    }
}

impl<F> Reducer for F
where
    F: Fn(&[u8], &mut Values<'_>, usize) -> Result<()> + Sync,
{
    fn reduce(&self, key: &[u8], values: &mut Values<'_>, partition: usize) -> Result<()> {
        self(key, values, partition)
    }
}

impl<F> Partitioner for F
where
    F: Fn(&[u8], usize) -> usize + Send + Sync,
{
    fn partition(&self, key: &[u8], num_partitions: usize) -> usize {
        self(key, num_partitions)
    }
}
