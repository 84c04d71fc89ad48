//! The single reader-writer lock guarding all engine state.

use std::time::Duration;

use parking_lot::{RwLock, RwLockReadGuard, RwLockWriteGuard};
use tracing::{trace, warn};

use crate::error::{OperationKind, ReasonerError, ReasonerResult};

/// Wraps one `RwLock` and hands out scoped guards.
///
/// Guards release on drop, so every exit path of the caller (including an
/// unwinding panic) releases the lock. No reentrancy: a thread holding a guard
/// must not acquire another one.
pub(crate) struct LockCoordinator<T> {
    lock: RwLock<T>,
    timeout: Option<Duration>,
}

impl<T> LockCoordinator<T> {
    pub(crate) const fn new(value: T, timeout: Option<Duration>) -> Self {
        Self {
            lock: RwLock::new(value),
            timeout,
        }
    }

    /// Acquires shared access, waiting at most the configured timeout.
    pub(crate) fn read(&self, operation: OperationKind) -> ReasonerResult<RwLockReadGuard<'_, T>> {
        trace!(%operation, "acquiring read lock");
        let guard = match self.timeout {
            None => self.lock.read(),
            Some(timeout) => self
                .lock
                .try_read_for(timeout)
                .ok_or_else(|| timed_out(operation, timeout))?,
        };
        trace!(%operation, "read lock held");
        Ok(guard)
    }

    /// Acquires exclusive access, waiting at most the configured timeout.
    pub(crate) fn write(&self, operation: OperationKind) -> ReasonerResult<RwLockWriteGuard<'_, T>> {
        trace!(%operation, "acquiring write lock");
        let guard = match self.timeout {
            None => self.lock.write(),
            Some(timeout) => self
                .lock
                .try_write_for(timeout)
                .ok_or_else(|| timed_out(operation, timeout))?,
        };
        trace!(%operation, "write lock held");
        Ok(guard)
    }

    /// Direct access when the caller already has exclusive ownership.
    pub(crate) fn get_mut(&mut self) -> &mut T {
        self.lock.get_mut()
    }
}

fn timed_out(operation: OperationKind, timeout: Duration) -> ReasonerError {
    let waited_ms = u64::try_from(timeout.as_millis()).unwrap_or(u64::MAX);
    warn!(%operation, waited_ms, "lock acquisition timed out");
    ReasonerError::LockTimeout {
        operation,
        waited_ms,
    }
}
