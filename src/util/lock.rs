use std::sync::{Mutex, MutexGuard};

use tracing::warn;

/// Acquire a mutex, recovering from poisoning instead of propagating the
/// panic. The guarded state is advisory (memos, counters), so a stale view
/// after another thread's panic is acceptable.
pub(crate) fn mutex_lock<'a, T>(
    lock: &'a Mutex<T>,
    target: &'static str,
    op: &'static str,
) -> MutexGuard<'a, T> {
    match lock.lock() {
        Ok(guard) => guard,
        Err(poisoned) => {
            warn!(
                op,
                target_module = target,
                lock_kind = "mutex.lock",
                result = "poisoned_recovered",
                hint = "state may be stale after panic in another thread",
                "Recovered from poisoned lock"
            );
            poisoned.into_inner()
        }
    }
}
