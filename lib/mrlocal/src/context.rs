//! Process-wide run state, so that user Map code can call [`emit`] without
//! a handle.
//!
//! Only one run may be active per process. Mapper worker threads cache the
//! active store in a thread-local for the duration of the map phase; any
//! other thread falls back to the global slot.

use crate::error::{MrError, Result};
use crate::store::PartitionStore;
use std::cell::RefCell;
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};

enum Slot {
    Idle,
    Mapping(Arc<PartitionStore>),
    Reducing,
}

static ACTIVE: Mutex<Slot> = Mutex::new(Slot::Idle);

thread_local! {
    static WORKER_STORE: RefCell<Option<Arc<PartitionStore>>> = const { RefCell::new(None) };
}

// Nothing user-supplied runs while the slot is locked, so a poisoned lock
// still holds a consistent value.
fn slot() -> MutexGuard<'static, Slot> {
    ACTIVE.lock().unwrap_or_else(PoisonError::into_inner)
}

/// Copies one intermediate pair into the active run's partition store.
///
/// Callable from inside Map. Outside the map phase of an active run it
/// returns [`MrError::NotMapping`].
pub fn emit(key: impl AsRef<[u8]>, value: impl AsRef<[u8]>) -> Result<()> {
    let (key, value) = (key.as_ref(), value.as_ref());
    // no refcount traffic on the worker path
    let handled = WORKER_STORE.with(|w| w.borrow().as_ref().map(|store| store.emit(key, value)));
    if let Some(res) = handled {
        return res;
    }
    let store = match &*slot() {
        Slot::Mapping(store) => Arc::clone(store),
        Slot::Idle | Slot::Reducing => return Err(MrError::NotMapping),
    };
    store.emit(key, value)
}

/// True while a run holds the process-wide slot.
pub fn run_active() -> bool {
    !matches!(&*slot(), Slot::Idle)
}

/// Ownership of the process-wide slot for one run. Dropping it releases the
/// slot, also on error and unwind paths.
pub(crate) struct RunGuard {
    _private: (),
}

impl RunGuard {
    pub(crate) fn acquire(store: Arc<PartitionStore>) -> Result<Self> {
        let mut slot = slot();
        if !matches!(&*slot, Slot::Idle) {
            return Err(MrError::RunAlreadyActive);
        }
        *slot = Slot::Mapping(store);
        Ok(Self { _private: () })
    }

    /// Map barrier passed: emits from now on are rejected.
    pub(crate) fn enter_reduce(&self) {
        *slot() = Slot::Reducing;
    }
}

impl Drop for RunGuard {
    fn drop(&mut self) {
        *slot() = Slot::Idle;
    }
}

/// Installs the store in the current worker thread's cache until dropped.
pub(crate) struct WorkerBinding {
    _private: (),
}

impl WorkerBinding {
    pub(crate) fn bind(store: Arc<PartitionStore>) -> Self {
        WORKER_STORE.with(|w| *w.borrow_mut() = Some(store));
        Self { _private: () }
    }
}

impl Drop for WorkerBinding {
    fn drop(&mut self) {
        WORKER_STORE.with(|w| w.borrow_mut().take());
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::partition::DefaultHashPartitioner;

    fn store() -> Arc<PartitionStore> {
        Arc::new(PartitionStore::new(2, Arc::new(DefaultHashPartitioner), 64).unwrap())
    }

    #[test]
    fn emit_without_run_is_rejected() {
        let _serial = crate::test_support::serial();
        assert!(matches!(emit("k", "v"), Err(MrError::NotMapping)));
    }

    #[test]
    fn guard_lifecycle() {
        let _serial = crate::test_support::serial();
        let s = store();
        {
            let guard = RunGuard::acquire(Arc::clone(&s)).unwrap();
            assert!(run_active());
            assert!(matches!(RunGuard::acquire(store()), Err(MrError::RunAlreadyActive)));

            // not a worker thread: goes through the global slot
            emit("k", "v").unwrap();
            std::thread::spawn(|| emit("k2", b"v2").unwrap()).join().unwrap();
            assert_eq!(s.total_emits(), 2);

            guard.enter_reduce();
            assert!(matches!(emit("k", "v"), Err(MrError::NotMapping)));
        }
        assert!(!run_active());
    }

    #[test]
    fn worker_binding_is_thread_local() {
        let _serial = crate::test_support::serial();
        let s = store();
        std::thread::scope(|scope| {
            scope.spawn(|| {
                let _binding = WorkerBinding::bind(Arc::clone(&s));
                emit(b"a", b"1").unwrap();
            });
        });
        assert_eq!(s.total_emits(), 1);
        // the binding never leaked to this thread
        assert!(matches!(emit("a", "1"), Err(MrError::NotMapping)));
    }
}
