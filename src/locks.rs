//! Per-target mutation locks.
//!
//! Mutations on the same resolved target are serialized; mutations on
//! different targets proceed concurrently. A guard releases its target when
//! dropped, on every exit path.

use crate::analysis::{FunctionHandle, GlobalHandle, VariableHandle};
use crate::error::ToolError;
use std::collections::HashSet;
use std::sync::{Condvar, Mutex, MutexGuard};
use std::time::Duration;
use tokio_util::sync::CancellationToken;
use tracing::debug;

/// How often a waiter re-checks its cancellation token.
const CANCEL_POLL_INTERVAL: Duration = Duration::from_millis(25);

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum TargetKey {
    Function(FunctionHandle),
    Variable(VariableHandle),
    Global(GlobalHandle),
}

#[derive(Debug, Default)]
pub struct TargetLocks {
    held: Mutex<HashSet<TargetKey>>,
    released: Condvar,
}

/// Exclusive hold on one target; released on drop.
#[derive(Debug)]
pub struct TargetGuard<'a> {
    locks: &'a TargetLocks,
    key: TargetKey,
}

impl TargetLocks {
    pub fn new() -> Self {
        Self::default()
    }

    fn lock_held(&self) -> MutexGuard<'_, HashSet<TargetKey>> {
        match self.held.lock() {
            Ok(guard) => guard,
            Err(poisoned) => poisoned.into_inner(),
        }
    }

    /// Block until `key` is free, then take it.
    ///
    /// Gives up with [`ToolError::Cancelled`] once `cancel` fires, without
    /// taking the lock.
    pub fn acquire(
        &self,
        key: TargetKey,
        cancel: &CancellationToken,
    ) -> Result<TargetGuard<'_>, ToolError> {
        let mut held = self.lock_held();
        while held.contains(&key) {
            if cancel.is_cancelled() {
                return Err(ToolError::Cancelled);
            }
            debug!(?key, "Waiting for target lock");
            held = match self.released.wait_timeout(held, CANCEL_POLL_INTERVAL) {
                Ok((guard, _)) => guard,
                Err(poisoned) => poisoned.into_inner().0,
            };
        }
        if cancel.is_cancelled() {
            return Err(ToolError::Cancelled);
        }
        held.insert(key);
        Ok(TargetGuard { locks: self, key })
    }

    #[cfg(test)]
    fn is_held(&self, key: TargetKey) -> bool {
        self.lock_held().contains(&key)
    }
}

impl Drop for TargetGuard<'_> {
    fn drop(&mut self) {
        let mut held = self.locks.lock_held();
        held.remove(&self.key);
        drop(held);
        self.locks.released.notify_all();
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicBool, Ordering};
    use std::sync::Arc;
    use std::thread;

    const F1: TargetKey = TargetKey::Function(FunctionHandle(1));
    const F2: TargetKey = TargetKey::Function(FunctionHandle(2));

    #[test]
    fn guard_releases_on_drop() {
        let locks = TargetLocks::new();
        let token = CancellationToken::new();
        {
            let _guard = locks.acquire(F1, &token).expect("free lock");
            assert!(locks.is_held(F1));
            assert!(!locks.is_held(F2));
        }
        assert!(!locks.is_held(F1));
    }

    #[test]
    fn different_targets_do_not_block() {
        let locks = TargetLocks::new();
        let token = CancellationToken::new();
        let _a = locks.acquire(F1, &token).expect("first");
        let _b = locks.acquire(F2, &token).expect("second target is independent");
    }

    #[test]
    fn same_target_is_exclusive() {
        let locks = Arc::new(TargetLocks::new());
        let inside = Arc::new(AtomicBool::new(false));
        let handles: Vec<_> = (0..4)
            .map(|_| {
                let locks = locks.clone();
                let inside = inside.clone();
                thread::spawn(move || {
                    let token = CancellationToken::new();
                    for _ in 0..20 {
                        let _guard = locks.acquire(F1, &token).expect("lock");
                        assert!(!inside.swap(true, Ordering::SeqCst), "overlapping holders");
                        thread::sleep(Duration::from_micros(200));
                        inside.store(false, Ordering::SeqCst);
                    }
                })
            })
            .collect();
        for h in handles {
            h.join().expect("worker");
        }
        assert!(!locks.is_held(F1));
    }

    #[test]
    fn cancelled_waiter_gives_up() {
        let locks = Arc::new(TargetLocks::new());
        let token = CancellationToken::new();
        let _held = locks.acquire(F1, &token).expect("holder");

        let waiter_token = CancellationToken::new();
        let waiter = {
            let locks = locks.clone();
            let waiter_token = waiter_token.clone();
            thread::spawn(move || locks.acquire(F1, &waiter_token).map(|_| ()))
        };
        thread::sleep(Duration::from_millis(50));
        waiter_token.cancel();
        let outcome = waiter.join().expect("waiter thread");
        assert_eq!(outcome, Err(ToolError::Cancelled));
        assert!(locks.is_held(F1));
    }

    #[test]
    fn guard_is_released_when_holder_panics() {
        let locks = Arc::new(TargetLocks::new());
        let panicking = {
            let locks = locks.clone();
            thread::spawn(move || {
                let _guard = locks
                    .acquire(F1, &CancellationToken::new())
                    .expect("free lock");
                panic!("handler failure");
            })
        };
        assert!(panicking.join().is_err());
        assert!(!locks.is_held(F1));
    }
}
