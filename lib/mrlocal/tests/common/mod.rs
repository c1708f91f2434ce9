#![allow(dead_code)]

use mrlocal::{Partitioner, Reducer, Values};
use std::collections::BTreeMap;
use std::sync::{Mutex, MutexGuard, PoisonError};

static SERIAL: Mutex<()> = Mutex::new(());

/// Only one run may be active per process, and the test harness runs tests
/// on parallel threads.
pub fn serial() -> MutexGuard<'static, ()> {
    SERIAL.lock().unwrap_or_else(PoisonError::into_inner)
}

/// Every reduce invocation, keyed by (partition, key), with the values it pulled.
#[derive(Default)]
pub struct Collected {
    pub calls: Mutex<Vec<(usize, Vec<u8>, Vec<Vec<u8>>)>>,
}

impl Collected {
    pub fn record(&self, key: &[u8], values: &mut Values<'_>, partition: usize) -> anyhow::Result<()> {
        let vals: Vec<Vec<u8>> = values.map(<[u8]>::to_vec).collect();
        self.calls.lock().unwrap().push((partition, key.to_vec(), vals));
        Ok(())
    }

    pub fn into_calls(self) -> Vec<(usize, Vec<u8>, Vec<Vec<u8>>)> {
        self.calls.into_inner().unwrap()
    }

    /// key -> sorted values, asserting no key was reduced twice.
    pub fn grouped(self) -> BTreeMap<Vec<u8>, Vec<Vec<u8>>> {
        let mut out = BTreeMap::new();
        for (_, key, mut vals) in self.into_calls() {
            vals.sort();
            assert!(out.insert(key.clone(), vals).is_none(), "key {:?} reduced twice", key);
        }
        out
    }
}

/// Single-threaded reference: map everything, group, sort values.
pub fn reference<F>(inputs: &[&str], mut map: F) -> BTreeMap<Vec<u8>, Vec<Vec<u8>>>
where
    F: FnMut(&str, &mut dyn FnMut(&[u8], &[u8])),
{
    let mut out: BTreeMap<Vec<u8>, Vec<Vec<u8>>> = BTreeMap::new();
    for input in inputs {
        map(input, &mut |k, v| out.entry(k.to_vec()).or_default().push(v.to_vec()));
    }
    for vals in out.values_mut() {
        vals.sort();
    }
    out
}

pub struct FirstBytePartitioner;

impl Partitioner for FirstBytePartitioner {
    fn partition(&self, key: &[u8], num_partitions: usize) -> usize {
        key.first().map(|b| *b as usize % num_partitions).unwrap_or(0)
    }
}

/// Struct-form reducer feeding a [`Collected`], for `Job::run`.
pub struct Collecting<'a>(pub &'a Collected);

impl Reducer for Collecting<'_> {
    fn reduce(&self, key: &[u8], values: &mut Values<'_>, partition: usize) -> anyhow::Result<()> {
        self.0.record(key, values, partition)
    }
}
