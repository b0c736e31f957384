use std::collections::HashMap;
use std::sync::{Arc, Mutex, MutexGuard};
use tokio::sync::{Mutex as AsyncMutex, OwnedMutexGuard};
use uuid::Uuid;

type PairKey = (Uuid, Uuid);
type LockMap = Mutex<HashMap<PairKey, Arc<AsyncMutex<()>>>>;

/// Idle entries are swept on acquire once the table grows past this.
const SWEEP_THRESHOLD: usize = 1024;

/// Keyed lock table serializing operations on one (voter, target) pair.
///
/// Different pairs never contend. An entry lives only while someone holds or
/// waits for it.
#[derive(Debug, Clone, Default)]
pub struct PairLocks {
    slots: Arc<LockMap>,
}

/// Held for the duration of one vote operation. Dropping it releases the pair.
#[derive(Debug)]
pub struct PairGuard {
    // Field order matters: release the mutex before the slot is pruned.
    _guard: OwnedMutexGuard<()>,
    _slot: Slot,
}

/// Reference to a table entry; removes the entry when it is the last one.
#[derive(Debug)]
struct Slot {
    slots: Arc<LockMap>,
    key: PairKey,
    mutex: Option<Arc<AsyncMutex<()>>>,
}

impl Drop for Slot {
    fn drop(&mut self) {
        let mut slots = lock_map(&self.slots);
        self.mutex.take();

        if slots
            .get(&self.key)
            .is_some_and(|m| Arc::strong_count(m) == 1)
        {
            slots.remove(&self.key);
        }
    }
}

fn lock_map(slots: &LockMap) -> MutexGuard<'_, HashMap<PairKey, Arc<AsyncMutex<()>>>> {
    slots.lock().unwrap_or_else(|e| e.into_inner())
}

impl PairLocks {
    pub fn new() -> Self {
        Self::default()
    }

    /// Wait until no other operation holds `(voter_id, target_id)`.
    pub async fn acquire(&self, voter_id: Uuid, target_id: Uuid) -> PairGuard {
        let key = (voter_id, target_id);

        let mutex = {
            let mut slots = lock_map(&self.slots);
            if slots.len() >= SWEEP_THRESHOLD {
                slots.retain(|_, m| Arc::strong_count(m) > 1);
            }
            slots.entry(key).or_default().clone()
        };

        let slot = Slot {
            slots: self.slots.clone(),
            key,
            mutex: Some(mutex.clone()),
        };
        let guard = mutex.lock_owned().await;

        PairGuard {
            _guard: guard,
            _slot: slot,
        }
    }

    /// Number of pairs currently held or awaited.
    pub fn len(&self) -> usize {
        lock_map(&self.slots).len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}
